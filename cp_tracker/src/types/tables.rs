use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub current_streak: i32,
    pub last_solved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 問題カタログの1行
///
/// (platform, problem_id)の組が自然キー
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Problem {
    pub problem_id: String,
    pub platform: String,
    pub title: String,
    pub url: String,
    pub difficulty: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// コンテストの1行
///
/// clist.by由来の行はclist_idを持つ。手動作成の行はclist_idがNULL
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Contest {
    pub id: i64,
    pub clist_id: Option<i64>,
    pub title: String,
    pub platform: String,
    pub platform_icon: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: i64,
    pub url: String,
    pub description: Option<String>,
    pub api_source: String,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FavoriteProblem {
    pub user_id: i64,
    pub problem_id: String,
    pub platform: String,
    pub title: String,
    pub url: Option<String>,
    pub difficulty: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FavoriteContest {
    pub user_id: i64,
    pub identifier: String,
    pub title: String,
    pub platform: String,
    pub start_time: DateTime<Utc>,
    pub url: String,
    pub api_source: Option<String>,
    pub added_at: DateTime<Utc>,
}

/// ユーザごとに1行だけ保持されるデイリーチャレンジの割り当て
///
/// 新しい日の割り当てで上書きされ、履歴は残らない
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DailyChallenge {
    pub user_id: i64,
    pub problem_id: String,
    pub platform: String,
    pub title: String,
    pub url: String,
    pub difficulty: Option<String>,
    pub tags: Vec<String>,
    pub suggested_at: DateTime<Utc>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}
