use serde::{Deserialize, Serialize};

/// Codeforces公式APIのproblemset.problemsレスポンス
///
/// statusが"OK"でない場合はresultが入らず、commentに理由が入る
#[derive(Debug, Serialize, Deserialize)]
pub struct ProblemsetResponse {
    pub status: String,
    pub comment: Option<String>,
    pub result: Option<ProblemsetResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProblemsetResult {
    pub problems: Vec<CodeforcesProblem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeforcesProblem {
    pub contest_id: Option<i64>,
    pub index: Option<String>,
    pub name: Option<String>,
    pub rating: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_deserialize_ok_response() {
        let body = r#"
        {
            "status": "OK",
            "result": {
                "problems": [
                    {"contestId": 1, "index": "A", "name": "Theatre Square", "rating": 1000, "tags": ["math"]},
                    {"contestId": 2, "index": "B", "name": "The least round way", "tags": []}
                ]
            }
        }
        "#;
        let res: ProblemsetResponse = serde_json::from_str(body).unwrap();

        assert_eq!(res.status, "OK");
        let problems = res.result.unwrap().problems;
        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0].contest_id, Some(1));
        assert_eq!(problems[0].index.as_deref(), Some("A"));
        assert_eq!(problems[1].rating, None);
    }

    #[test]
    fn test_deserialize_failed_response() {
        let body = r#"{"status": "FAILED", "comment": "problemset with a given name is not found"}"#;
        let res: ProblemsetResponse = serde_json::from_str(body).unwrap();

        assert_eq!(res.status, "FAILED");
        assert!(res.result.is_none());
        assert!(res.comment.is_some());
    }
}
