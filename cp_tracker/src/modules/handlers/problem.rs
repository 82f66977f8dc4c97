use crate::{
    modules::{
        auth::{AuthUser, OptionalAuthUser},
        handlers::ValidatedQuery,
        utils::escape_like,
    },
    types::{platform::Platform, tables::Problem},
};
use axum::{extract::Extension, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use cp_tracker_libs::api::{ErrorResponse, ListResponse, ListStats, MessageResponse};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use sqlx::{postgres::PgRow, FromRow, Pool, Postgres, Row};
use std::collections::HashSet;
use tokio::time::Instant;
use validator::{Validate, ValidationError};

// ソート順に指定できるフィールドの集合
static VALID_SORT_FIELDS: Lazy<HashSet<&str>> = Lazy::new(|| {
    HashSet::from([
        "title",
        "platform",
        "difficulty",
        "problem_id",
        "created_at",
        "updated_at",
    ])
});

fn validate_sort_field(value: &str) -> Result<(), ValidationError> {
    if VALID_SORT_FIELDS.contains(value) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid sort field"))
    }
}

fn validate_sort_order(value: &str) -> Result<(), ValidationError> {
    if value == "asc" || value == "desc" {
        Ok(())
    } else {
        Err(ValidationError::new("invalid sort order"))
    }
}

fn validate_status(value: &str) -> Result<(), ValidationError> {
    if value == "solved" || value == "unsolved" {
        Ok(())
    } else {
        Err(ValidationError::new("invalid status filter"))
    }
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Validate, PartialEq, Eq, Clone, Default)]
pub struct ProblemListParameter {
    #[validate(length(max = 200))]
    pub search: Option<String>,
    pub difficulty: Option<String>,
    pub platform: Option<String>,
    pub tags: Option<String>,
    #[validate(custom = "validate_status")]
    pub status: Option<String>,
    #[validate(custom = "validate_sort_field")]
    pub sort_by: Option<String>,
    #[validate(custom = "validate_sort_order")]
    pub sort_order: Option<String>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 200))]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ProblemItem {
    pub problem_id: String,
    pub platform: String,
    pub title: String,
    pub url: String,
    pub difficulty: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_solved_by_current_user: bool,
    pub is_favorited_by_current_user: bool,
}

#[derive(Debug, PartialEq)]
enum BindValue {
    Text(String),
    Int(i64),
    TextArray(Vec<String>),
}

/// "1400+"のような下限指定をパースする関数
///
/// サフィックスがない・数値でない場合はNone(完全一致フィルタ扱い)
fn parse_min_difficulty(raw: &str) -> Option<i64> {
    raw.strip_suffix('+')?.trim().parse().ok()
}

/// フィルタパラメータからWHERE句とバインド値の列を組み立てる関数
///
/// statusフィルタは認証済み(user_idあり)のときだけ適用される
fn build_filter(
    params: &ProblemListParameter,
    user_id: Option<i64>,
) -> (String, Vec<BindValue>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut binds: Vec<BindValue> = Vec::new();

    if let Some(search) = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        binds.push(BindValue::Text(format!("%{}%", escape_like(search))));
        let n = binds.len();
        conditions.push(format!(
            r#"("title" ILIKE ${n} OR "problem_id" ILIKE ${n})"#
        ));
    }

    if let Some(difficulty) = params
        .difficulty
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty() && !d.eq_ignore_ascii_case("all"))
    {
        match parse_min_difficulty(difficulty) {
            Some(base) => {
                // 評価順を保証するため、数値チェックはCASEで先に行う
                binds.push(BindValue::Int(base));
                conditions.push(format!(
                    r#"(CASE WHEN "difficulty" ~ '^[0-9]+$' THEN "difficulty"::bigint >= ${} ELSE FALSE END)"#,
                    binds.len()
                ));
            }
            None => {
                binds.push(BindValue::Text(difficulty.to_string()));
                conditions.push(format!(r#"lower("difficulty") = lower(${})"#, binds.len()));
            }
        }
    }

    if let Some(platform) = params
        .platform
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.eq_ignore_ascii_case("all"))
    {
        binds.push(BindValue::Text(Platform::normalize(platform).to_string()));
        conditions.push(format!(r#"lower("platform") = lower(${})"#, binds.len()));
    }

    if let Some(tags) = params.tags.as_deref() {
        let tags: Vec<String> = tags
            .split(',')
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
            .collect();
        if !tags.is_empty() {
            binds.push(BindValue::TextArray(tags));
            conditions.push(format!(
                r#"(SELECT array_agg(lower("t")) FROM unnest("tags") AS "t") @> ${}"#,
                binds.len()
            ));
        }
    }

    if let (Some(user_id), Some(status)) = (user_id, params.status.as_deref()) {
        let operator = match status {
            "solved" => Some("EXISTS"),
            "unsolved" => Some("NOT EXISTS"),
            _ => None,
        };
        if let Some(operator) = operator {
            binds.push(BindValue::Int(user_id));
            conditions.push(format!(
                r#"{} (SELECT 1 FROM "solved_problems" WHERE "solved_problems"."user_id" = ${} AND "solved_problems"."platform" = "problems"."platform" AND "solved_problems"."problem_id" = "problems"."problem_id")"#,
                operator,
                binds.len()
            ));
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    (where_clause, binds)
}

fn order_clause(params: &ProblemListParameter) -> String {
    let field = params.sort_by.as_deref().unwrap_or("created_at");
    let direction = match params.sort_order.as_deref() {
        Some("asc") => "ASC",
        _ => "DESC",
    };
    // ソートフィールドはバリデーション済みの許可リストからのみ来る
    format!(
        r#" ORDER BY "{}" {}, "platform" ASC, "problem_id" ASC"#,
        field, direction
    )
}

fn problem_key(platform: &str, problem_id: &str) -> (String, String) {
    (platform.to_lowercase(), problem_id.to_string())
}

/// 取得済みの行にログインユーザの解答済み・お気に入りフラグを付ける関数
///
/// solvedでフィルタ済みなら全行trueで確定し、追加の照合は行わない
fn annotate_items(
    rows: Vec<Problem>,
    authenticated: bool,
    status: Option<&str>,
    solved_keys: &HashSet<(String, String)>,
    favorite_keys: &HashSet<(String, String)>,
) -> Vec<ProblemItem> {
    rows.into_iter()
        .map(|problem| {
            let key = problem_key(&problem.platform, &problem.problem_id);
            let is_solved = if !authenticated {
                false
            } else {
                match status {
                    Some("solved") => true,
                    Some("unsolved") => false,
                    _ => solved_keys.contains(&key),
                }
            };
            let is_favorited = authenticated && favorite_keys.contains(&key);

            ProblemItem {
                problem_id: problem.problem_id,
                platform: problem.platform,
                title: problem.title,
                url: problem.url,
                difficulty: problem.difficulty,
                tags: problem.tags,
                created_at: problem.created_at,
                updated_at: problem.updated_at,
                is_solved_by_current_user: is_solved,
                is_favorited_by_current_user: is_favorited,
            }
        })
        .collect()
}

async fn fetch_user_keys(
    pool: &Pool<Postgres>,
    table: &str,
    user_id: i64,
) -> sqlx::Result<HashSet<(String, String)>> {
    let sql = format!(
        r#"SELECT "platform", "problem_id" FROM "{}" WHERE "user_id" = $1;"#,
        table
    );
    let keys = sqlx::query(&sql)
        .bind(user_id)
        .map(|row: PgRow| problem_key(row.get(0), row.get(1)))
        .fetch_all(pool)
        .await?;

    Ok(HashSet::from_iter(keys))
}

/// 問題カタログの検索エンドポイント
///
/// 認証は任意。認証済みの場合のみstatusフィルタとユーザ別フラグが有効になる
pub async fn list_problems(
    ValidatedQuery(params): ValidatedQuery<ProblemListParameter>,
    OptionalAuthUser(claims): OptionalAuthUser,
    Extension(pool): Extension<Pool<Postgres>>,
) -> (
    StatusCode,
    Json<ListResponse<ProblemListParameter, ProblemItem>>,
) {
    let start_process = Instant::now();
    let user_id = claims.as_ref().map(|claims| claims.id);

    let limit = params.limit.unwrap_or(20);
    let page = params.page.unwrap_or(1);
    let offset = ((page - 1) as i64) * (limit as i64);

    let (where_clause, binds) = build_filter(&params, user_id);

    let count_sql = format!(r#"SELECT COUNT(*) FROM "problems"{};"#, where_clause);
    let mut count_query = sqlx::query(&count_sql);
    for bind in binds.iter() {
        count_query = match bind {
            BindValue::Text(value) => count_query.bind(value),
            BindValue::Int(value) => count_query.bind(value),
            BindValue::TextArray(value) => count_query.bind(value),
        };
    }
    let total: i64 = match count_query
        .map(|row: PgRow| row.get(0))
        .fetch_one(&pool)
        .await
    {
        Ok(total) => total,
        Err(e) => {
            tracing::error!("request failed cause: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ListResponse::error(params, "unexpected error")),
            );
        }
    };

    let rows_sql = format!(
        r#"SELECT * FROM "problems"{}{} LIMIT ${} OFFSET ${};"#,
        where_clause,
        order_clause(&params),
        binds.len() + 1,
        binds.len() + 2
    );
    let mut rows_query = sqlx::query_as::<_, Problem>(&rows_sql);
    for bind in binds.iter() {
        rows_query = match bind {
            BindValue::Text(value) => rows_query.bind(value),
            BindValue::Int(value) => rows_query.bind(value),
            BindValue::TextArray(value) => rows_query.bind(value),
        };
    }
    let rows = match rows_query
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&pool)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            tracing::error!("request failed cause: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ListResponse::error(params, "unexpected error")),
            );
        }
    };

    let mut solved_keys: HashSet<(String, String)> = HashSet::new();
    let mut favorite_keys: HashSet<(String, String)> = HashSet::new();
    if let Some(user_id) = user_id {
        if !rows.is_empty() {
            let status = params.status.as_deref();
            if status != Some("solved") && status != Some("unsolved") {
                solved_keys = match fetch_user_keys(&pool, "solved_problems", user_id).await {
                    Ok(keys) => keys,
                    Err(e) => {
                        tracing::error!("request failed cause: {:?}", e);
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(ListResponse::error(params, "unexpected error")),
                        );
                    }
                };
            }
            favorite_keys = match fetch_user_keys(&pool, "favorite_problems", user_id).await {
                Ok(keys) => keys,
                Err(e) => {
                    tracing::error!("request failed cause: {:?}", e);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(ListResponse::error(params, "unexpected error")),
                    );
                }
            };
        }
    }

    let items = annotate_items(
        rows,
        user_id.is_some(),
        params.status.as_deref(),
        &solved_keys,
        &favorite_keys,
    );

    let time: u32 = Instant::now().duration_since(start_process).as_millis() as u32;
    let count = items.len() as u32;
    let pages = ((total as u32) + limit - 1) / limit;

    tracing::info!(
        target: "querylog",
        "elapsed_time={} hits={} params={}",
        time,
        total,
        serde_json::to_string(&params).unwrap_or(String::from(""))
    );

    let stats = ListStats {
        time,
        total,
        index: page,
        pages,
        count,
        params,
    };

    (
        StatusCode::OK,
        Json(ListResponse {
            stats,
            items,
            message: None,
        }),
    )
}

#[derive(Debug, Deserialize)]
pub struct SolveRequest {
    pub problem_id: Option<String>,
    pub platform: Option<String>,
    pub title: Option<String>,
}

/// 問題を解答済みとして記録するエンドポイント
///
/// 同じ問題の2回目以降の呼び出しは何も書き込まない
pub async fn mark_solved(
    AuthUser(claims): AuthUser,
    Extension(pool): Extension<Pool<Postgres>>,
    Json(body): Json<SolveRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), (StatusCode, Json<ErrorResponse>)> {
    let problem_id = body
        .problem_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let platform = body
        .platform
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let (problem_id, platform) = match (problem_id, platform) {
        (Some(problem_id), Some(platform)) => (problem_id, platform),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("problem id and platform are required")),
            ))
        }
    };

    let platform = Platform::normalize(platform).to_string();
    let result = sqlx::query(
        r#"
        INSERT INTO "solved_problems" ("user_id", "problem_id", "platform", "title")
        VALUES ($1, $2, $3, $4)
        ON CONFLICT ("user_id", "platform", "problem_id") DO NOTHING;
        "#,
    )
    .bind(claims.id)
    .bind(problem_id)
    .bind(&platform)
    .bind(&body.title)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("failed to record solved problem: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("unexpected error")),
        )
    })?;

    if result.rows_affected() == 0 {
        Ok((
            StatusCode::OK,
            Json(MessageResponse::new(true, "problem already marked as solved")),
        ))
    } else {
        Ok((
            StatusCode::CREATED,
            Json(MessageResponse::new(true, "problem marked as solved")),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct AddProblemRequest {
    pub problem_id: Option<String>,
    pub platform: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub difficulty: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// 問題を手動でカタログへ追加するエンドポイント
pub async fn add_problem(
    AuthUser(_claims): AuthUser,
    Extension(pool): Extension<Pool<Postgres>>,
    Json(body): Json<AddProblemRequest>,
) -> Result<(StatusCode, Json<Problem>), (StatusCode, Json<ErrorResponse>)> {
    let (problem_id, platform, title, url) = match (
        body.problem_id.as_deref().map(str::trim),
        body.platform.as_deref().map(str::trim),
        body.title.as_deref().map(str::trim),
        body.url.as_deref().map(str::trim),
    ) {
        (Some(problem_id), Some(platform), Some(title), Some(url))
            if !problem_id.is_empty()
                && !platform.is_empty()
                && !title.is_empty()
                && !url.is_empty() =>
        {
            (
                problem_id,
                Platform::normalize(platform).to_string(),
                title,
                url,
            )
        }
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(
                    "problem_id, platform, title, and url are required",
                )),
            ))
        }
    };

    let internal_error = |e: sqlx::Error| {
        tracing::error!("failed to add problem: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("unexpected error")),
        )
    };

    let exists = sqlx::query(
        r#"SELECT 1 FROM "problems" WHERE "platform" = $1 AND "problem_id" = $2;"#,
    )
    .bind(&platform)
    .bind(problem_id)
    .fetch_optional(&pool)
    .await
    .map_err(internal_error)?;
    if exists.is_some() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(format!(
                "problem with id '{}' on platform '{}' already exists",
                problem_id, platform
            ))),
        ));
    }

    let problem = sqlx::query_as::<_, Problem>(
        r#"
        INSERT INTO "problems" ("problem_id", "platform", "title", "url", "difficulty", "tags")
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *;
        "#,
    )
    .bind(problem_id)
    .bind(&platform)
    .bind(title)
    .bind(url)
    .bind(&body.difficulty)
    .bind(body.tags.clone().unwrap_or_default())
    .fetch_one(&pool)
    .await
    .map_err(internal_error)?;

    Ok((StatusCode::CREATED, Json(problem)))
}

#[derive(Debug, FromRow, Serialize)]
pub struct PlatformStat {
    pub platform: String,
    pub count: i64,
    pub difficulties: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PlatformStatsResponse {
    pub platforms: Vec<PlatformStat>,
    pub total_problems: i64,
    pub total_platforms: usize,
}

/// プラットフォームごとの収録数と難易度の内訳を返すエンドポイント
pub async fn platform_stats(
    Extension(pool): Extension<Pool<Postgres>>,
) -> Result<Json<PlatformStatsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let platforms = sqlx::query_as::<_, PlatformStat>(
        r#"
        SELECT
            "platform",
            COUNT(*) AS "count",
            COALESCE(array_agg(DISTINCT "difficulty") FILTER (WHERE "difficulty" IS NOT NULL), '{}') AS "difficulties"
        FROM "problems"
        GROUP BY "platform"
        ORDER BY "count" DESC;
        "#,
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("failed to aggregate platform stats: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("unexpected error")),
        )
    })?;

    let total_problems = platforms.iter().map(|stat| stat.count).sum();
    let total_platforms = platforms.len();

    Ok(Json(PlatformStatsResponse {
        platforms,
        total_problems,
        total_platforms,
    }))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_deserialize() {
        let query = "search=fft&difficulty=Easy&platform=codeforces&tags=dp,graphs&status=solved&sort_by=title&sort_order=asc&page=2&limit=50";
        let params: ProblemListParameter = serde_structuredqs::from_str(query).unwrap();

        let expected = ProblemListParameter {
            search: Some(String::from("fft")),
            difficulty: Some(String::from("Easy")),
            platform: Some(String::from("codeforces")),
            tags: Some(String::from("dp,graphs")),
            status: Some(String::from("solved")),
            sort_by: Some(String::from("title")),
            sort_order: Some(String::from("asc")),
            page: Some(2),
            limit: Some(50),
        };

        assert_eq!(params, expected);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn empty_query_string() {
        let params: ProblemListParameter = serde_structuredqs::from_str("").unwrap();
        assert_eq!(params, ProblemListParameter::default());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn invalid_sort_field_is_rejected() {
        let params = ProblemListParameter {
            sort_by: Some(String::from("html; DROP TABLE problems")),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn oversized_limit_is_rejected() {
        let params = ProblemListParameter {
            limit: Some(500),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn parse_min_difficulty_accepts_plus_suffix() {
        assert_eq!(parse_min_difficulty("1400+"), Some(1400));
        assert_eq!(parse_min_difficulty("800+"), Some(800));
        assert_eq!(parse_min_difficulty("1400"), None);
        assert_eq!(parse_min_difficulty("Easy+"), None);
    }

    #[test]
    fn empty_filter_builds_no_where_clause() {
        let (where_clause, binds) = build_filter(&ProblemListParameter::default(), None);
        assert!(where_clause.is_empty());
        assert!(binds.is_empty());
    }

    #[test]
    fn search_filter_matches_title_and_problem_id() {
        let params = ProblemListParameter {
            search: Some(String::from("100%")),
            ..Default::default()
        };
        let (where_clause, binds) = build_filter(&params, None);

        assert!(where_clause.contains(r#""title" ILIKE $1 OR "problem_id" ILIKE $1"#));
        assert_eq!(binds, vec![BindValue::Text(String::from("%100\\%%"))]);
    }

    #[test]
    fn minimum_difficulty_filter_compares_numerically() {
        let params = ProblemListParameter {
            difficulty: Some(String::from("1400+")),
            ..Default::default()
        };
        let (where_clause, binds) = build_filter(&params, None);

        assert!(where_clause.contains(r#"THEN "difficulty"::bigint >= $1"#));
        assert_eq!(binds, vec![BindValue::Int(1400)]);
    }

    #[test]
    fn platform_filter_uses_canonical_name() {
        let params = ProblemListParameter {
            platform: Some(String::from("codeforces.com")),
            ..Default::default()
        };
        let (_, binds) = build_filter(&params, None);
        assert_eq!(binds, vec![BindValue::Text(String::from("Codeforces"))]);
    }

    #[test]
    fn tags_filter_requires_all_tags() {
        let params = ProblemListParameter {
            tags: Some(String::from(" DP , Graphs ,")),
            ..Default::default()
        };
        let (where_clause, binds) = build_filter(&params, None);

        assert!(where_clause.contains("@> $1"));
        assert_eq!(
            binds,
            vec![BindValue::TextArray(vec![
                String::from("dp"),
                String::from("graphs")
            ])]
        );
    }

    #[test]
    fn status_filter_requires_authentication() {
        let params = ProblemListParameter {
            status: Some(String::from("solved")),
            ..Default::default()
        };

        let (anonymous, binds) = build_filter(&params, None);
        assert!(!anonymous.contains("solved_problems"));
        assert!(binds.is_empty());

        let (authenticated, binds) = build_filter(&params, Some(42));
        assert!(authenticated.contains(r#"EXISTS (SELECT 1 FROM "solved_problems""#));
        assert_eq!(binds, vec![BindValue::Int(42)]);
    }

    #[test]
    fn unsolved_status_negates_the_subquery() {
        let params = ProblemListParameter {
            status: Some(String::from("unsolved")),
            ..Default::default()
        };
        let (where_clause, _) = build_filter(&params, Some(42));
        assert!(where_clause.contains("NOT EXISTS"));
    }

    #[test]
    fn default_order_is_newest_created_first() {
        assert!(order_clause(&ProblemListParameter::default())
            .contains(r#""created_at" DESC"#));

        let params = ProblemListParameter {
            sort_by: Some(String::from("difficulty")),
            sort_order: Some(String::from("asc")),
            ..Default::default()
        };
        assert!(order_clause(&params).contains(r#""difficulty" ASC"#));
    }

    fn problem(platform: &str, problem_id: &str) -> Problem {
        let now = Utc::now();
        Problem {
            problem_id: String::from(problem_id),
            platform: String::from(platform),
            title: String::from("title"),
            url: String::from("https://example.com"),
            difficulty: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn solved_status_marks_every_row_without_lookup() {
        let rows = vec![problem("Codeforces", "1A"), problem("AtCoder", "abc300_a")];
        let items = annotate_items(
            rows,
            true,
            Some("solved"),
            &HashSet::new(),
            &HashSet::new(),
        );
        assert!(items.iter().all(|item| item.is_solved_by_current_user));
    }

    #[test]
    fn unsolved_status_marks_no_row() {
        let rows = vec![problem("Codeforces", "1A")];
        let solved = HashSet::from([problem_key("Codeforces", "1A")]);
        let items = annotate_items(rows, true, Some("unsolved"), &solved, &HashSet::new());
        assert!(!items[0].is_solved_by_current_user);
    }

    #[test]
    fn annotation_matches_platform_case_insensitively() {
        let rows = vec![problem("Codeforces", "1A"), problem("Codeforces", "2B")];
        let solved = HashSet::from([problem_key("codeforces", "1A")]);
        let favorites = HashSet::from([problem_key("CODEFORCES", "2B")]);
        let items = annotate_items(rows, true, None, &solved, &favorites);

        assert!(items[0].is_solved_by_current_user);
        assert!(!items[0].is_favorited_by_current_user);
        assert!(!items[1].is_solved_by_current_user);
        assert!(items[1].is_favorited_by_current_user);
    }

    #[test]
    fn anonymous_rows_are_never_annotated() {
        let rows = vec![problem("Codeforces", "1A")];
        let solved = HashSet::from([problem_key("Codeforces", "1A")]);
        let items = annotate_items(rows, false, None, &solved, &solved);

        assert!(!items[0].is_solved_by_current_user);
        assert!(!items[0].is_favorited_by_current_user);
    }
}
