use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// clist.byのページングレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ClistResponse<T> {
    #[serde(default)]
    pub meta: ClistMeta,
    pub objects: Vec<T>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ClistMeta {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub total_count: Option<u64>,
}

/// clist.byの問題情報
///
/// 必須フィールド(key, name, url)の欠けたレコードは取り込み側でスキップされる
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClistProblem {
    pub id: i64,
    pub key: Option<String>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub rating: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// clist.byのコンテスト情報
///
/// startとendはタイムゾーンなしのUTC時刻として返される
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClistContest {
    pub id: i64,
    pub event: String,
    pub href: String,
    pub resource: String,
    pub icon: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration: Option<i64>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_deserialize_problem_page() {
        let body = r#"
        {
            "meta": {"limit": 2, "offset": 0, "total_count": 4},
            "objects": [
                {"id": 1, "key": "1A", "name": "Theatre Square", "url": "https://codeforces.com/problemset/problem/1/A", "rating": 1000, "tags": ["math"]},
                {"id": 2, "name": "No Key", "url": "https://example.com/2"}
            ]
        }
        "#;
        let page: ClistResponse<ClistProblem> = serde_json::from_str(body).unwrap();

        assert_eq!(page.meta.total_count, Some(4));
        assert_eq!(page.objects.len(), 2);
        assert_eq!(page.objects[0].key.as_deref(), Some("1A"));
        assert_eq!(page.objects[0].tags, vec![String::from("math")]);
        assert!(page.objects[1].key.is_none());
        assert!(page.objects[1].tags.is_empty());
    }

    #[test]
    fn test_deserialize_contest() {
        let body = r#"
        {
            "id": 12345,
            "event": "Codeforces Round 900",
            "href": "https://codeforces.com/contests/1900",
            "resource": "codeforces.com",
            "icon": null,
            "start": "2024-06-01T12:00:00",
            "end": "2024-06-01T14:00:00",
            "duration": 7200
        }
        "#;
        let contest: ClistContest = serde_json::from_str(body).unwrap();

        assert_eq!(contest.id, 12345);
        assert_eq!(contest.resource, "codeforces.com");
        assert_eq!(contest.duration, Some(7200));
        assert_eq!((contest.end - contest.start).num_seconds(), 7200);
    }
}
