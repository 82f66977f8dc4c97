use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 対応しているプラットフォームの正規名
///
/// ドメイン名や表記ゆれのある名前はnormalizeで正規化される
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Codeforces,
    LeetCode,
    AtCoder,
    CodeChef,
    GeeksForGeeks,
    HackerRank,
    HackerEarth,
    TopCoder,
    Spoj,
    Uva,
    Unknown,
}

// 括弧書きの注記・数字・記号を取り除くためのパターン
static NOISE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)|[0-9]+|[^A-Za-z\s]").unwrap());

// コンテスト一覧に出すプラットフォームの集合
pub const CONTEST_PLATFORMS: [Platform; 5] = [
    Platform::LeetCode,
    Platform::Codeforces,
    Platform::CodeChef,
    Platform::GeeksForGeeks,
    Platform::AtCoder,
];

impl Platform {
    /// 生のプラットフォーム表記を正規名へ変換するメソッド
    ///
    /// ドメイン名・大文字小文字の揺れ・括弧書きの注記を受け付ける
    /// 正規名を渡した場合はそのまま同じ値が返る(冪等)
    pub fn normalize(raw: &str) -> Platform {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Platform::Unknown;
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "codeforces" | "codeforces.com" => Platform::Codeforces,
            "leetcode" | "leetcode.com" => Platform::LeetCode,
            "atcoder" | "atcoder.jp" => Platform::AtCoder,
            "codechef" | "codechef.com" => Platform::CodeChef,
            "geeksforgeeks" | "geeksforgeeks.org" => Platform::GeeksForGeeks,
            "hackerrank" | "hackerrank.com" => Platform::HackerRank,
            "hackerearth" | "hackerearth.com" => Platform::HackerEarth,
            "topcoder" | "topcoder.com" => Platform::TopCoder,
            "spoj" | "spoj.com" => Platform::Spoj,
            "uva" | "onlinejudge.org" => Platform::Uva,
            _ => {
                let cleaned = NOISE_PATTERN.replace_all(trimmed, "");
                let head = cleaned.split_whitespace().next().unwrap_or_default();
                if head.is_empty() || head.eq_ignore_ascii_case(trimmed) {
                    Platform::Unknown
                } else {
                    Platform::normalize(head)
                }
            }
        }
    }

    /// clist.byのresource idへの対応付け
    pub fn resource_id(&self) -> Option<u32> {
        match self {
            Platform::Codeforces => Some(1),
            Platform::CodeChef => Some(2),
            Platform::TopCoder => Some(12),
            Platform::Spoj => Some(15),
            Platform::Uva => Some(16),
            Platform::HackerRank => Some(65),
            Platform::AtCoder => Some(92),
            Platform::LeetCode => Some(93),
            Platform::GeeksForGeeks => Some(102),
            Platform::HackerEarth => Some(103),
            Platform::Unknown => None,
        }
    }

    /// APIがアイコンを返さなかったときに使うアイコンURL
    pub fn icon_url(&self) -> Option<&'static str> {
        match self {
            Platform::Codeforces => Some("https://codeforces.org/favicon.ico"),
            Platform::AtCoder => Some("https://assets.atcoder.jp/images/favicon.ico"),
            Platform::CodeChef => Some("https://cdn.codechef.com/images/cc-logo.svg"),
            Platform::LeetCode => Some("https://leetcode.com/favicon.ico"),
            Platform::GeeksForGeeks => {
                Some("https://media.geeksforgeeks.org/wp-content/cdn-uploads/gfg_favicon.png")
            }
            _ => None,
        }
    }

    /// resource idが割り当てられているプラットフォームの一覧
    pub fn syncable() -> [Platform; 10] {
        [
            Platform::Codeforces,
            Platform::LeetCode,
            Platform::AtCoder,
            Platform::CodeChef,
            Platform::GeeksForGeeks,
            Platform::HackerRank,
            Platform::HackerEarth,
            Platform::TopCoder,
            Platform::Spoj,
            Platform::Uva,
        ]
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Platform::Codeforces => write!(f, "Codeforces"),
            Platform::LeetCode => write!(f, "LeetCode"),
            Platform::AtCoder => write!(f, "AtCoder"),
            Platform::CodeChef => write!(f, "CodeChef"),
            Platform::GeeksForGeeks => write!(f, "GeeksForGeeks"),
            Platform::HackerRank => write!(f, "HackerRank"),
            Platform::HackerEarth => write!(f, "HackerEarth"),
            Platform::TopCoder => write!(f, "TopCoder"),
            Platform::Spoj => write!(f, "SPOJ"),
            Platform::Uva => write!(f, "UVa"),
            Platform::Unknown => write!(f, "Unknown"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalize_domain_names() {
        assert_eq!(Platform::normalize("codeforces.com"), Platform::Codeforces);
        assert_eq!(Platform::normalize("atcoder.jp"), Platform::AtCoder);
        assert_eq!(Platform::normalize("leetcode.com"), Platform::LeetCode);
        assert_eq!(
            Platform::normalize("geeksforgeeks.org"),
            Platform::GeeksForGeeks
        );
    }

    #[test]
    fn normalize_mixed_case() {
        assert_eq!(Platform::normalize("CODEFORCES"), Platform::Codeforces);
        assert_eq!(Platform::normalize("leetcode"), Platform::LeetCode);
        assert_eq!(Platform::normalize("SpOj"), Platform::Spoj);
    }

    #[test]
    fn normalize_noisy_names() {
        assert_eq!(
            Platform::normalize("Codeforces (Div. 2)"),
            Platform::Codeforces
        );
        assert_eq!(Platform::normalize("AtCoder 2024"), Platform::AtCoder);
    }

    #[test]
    fn normalize_unknown_and_empty() {
        assert_eq!(Platform::normalize(""), Platform::Unknown);
        assert_eq!(Platform::normalize("   "), Platform::Unknown);
        assert_eq!(Platform::normalize("some-judge.example"), Platform::Unknown);
    }

    #[test]
    fn normalize_is_idempotent_on_canonical_names() {
        for platform in Platform::syncable() {
            assert_eq!(Platform::normalize(&platform.to_string()), platform);
        }
        assert_eq!(Platform::normalize("Unknown"), Platform::Unknown);
    }
}
