use crate::{
    modules::{auth::AuthUser, contests::syncer::ContestSyncer, handlers::ValidatedQuery},
    types::{
        platform::{Platform, CONTEST_PLATFORMS},
        tables::Contest,
    },
};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use cp_tracker_libs::{
    api::{ErrorResponse, ListResponse, ListStats, MessageResponse},
    clist::client::ClistApi,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use std::sync::Arc;
use tokio::time::Instant;
use validator::Validate;

// clist.by由来の行をこの時間より古く取得していたら再取得する
pub const FRESHNESS_WINDOW_MINUTES: i64 = 60;

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Validate, PartialEq, Clone, Default)]
pub struct ContestListParameter {
    pub platform: Option<String>,
    pub show_past: Option<bool>,
    #[validate(range(min = 1, max = 200))]
    pub limit: Option<u32>,
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    pub force_refresh: Option<bool>,
}

/// 再取得が必要かどうかを判定する関数
///
/// 過去分の閲覧では再取得しない。開催予定の照会では、行が1件もないか、
/// clist.by由来の行に鮮度切れがあれば再取得する
pub fn needs_refresh(
    rows: &[Contest],
    show_past: bool,
    force_refresh: bool,
    now: DateTime<Utc>,
) -> bool {
    if force_refresh {
        return true;
    }
    if show_past {
        return false;
    }
    if rows.is_empty() {
        return true;
    }

    rows.iter().any(|contest| {
        contest.api_source == "clist.by"
            && contest
                .last_fetched_at
                .map_or(true, |fetched_at| {
                    now - fetched_at > Duration::minutes(FRESHNESS_WINDOW_MINUTES)
                })
    })
}

struct ContestQuery {
    where_clause: String,
    platform: Option<String>,
    order: &'static str,
    limit: i64,
    offset: i64,
}

fn build_query(params: &ContestListParameter) -> ContestQuery {
    let show_past = params.show_past.unwrap_or(false);
    let limit = params.limit.unwrap_or(100).min(200) as i64;
    let page = params.page.unwrap_or(1).max(1);
    let offset = ((page - 1) as i64) * limit;

    let mut conditions: Vec<String> = Vec::new();
    let platform = params
        .platform
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| Platform::normalize(p).to_string());
    match platform {
        // 個別プラットフォーム指定時は許可リストより優先する
        Some(_) => conditions.push(String::from(r#"lower("platform") = lower($1)"#)),
        None => {
            let allowed = CONTEST_PLATFORMS
                .iter()
                .map(|platform| format!("'{}'", platform.to_string().to_lowercase()))
                .join(", ");
            conditions.push(format!(r#"lower("platform") IN ({})"#, allowed));
        }
    }
    if !show_past {
        conditions.push(String::from(r#""end_time" >= CURRENT_TIMESTAMP"#));
    }

    ContestQuery {
        where_clause: format!(" WHERE {}", conditions.join(" AND ")),
        platform,
        order: if show_past { "DESC" } else { "ASC" },
        limit,
        offset,
    }
}

async fn fetch_contests(
    pool: &Pool<Postgres>,
    query: &ContestQuery,
) -> sqlx::Result<(Vec<Contest>, i64)> {
    let rows_sql = format!(
        r#"SELECT * FROM "contests"{} ORDER BY "start_time" {} LIMIT {} OFFSET {};"#,
        query.where_clause, query.order, query.limit, query.offset
    );
    let mut rows_query = sqlx::query_as::<_, Contest>(&rows_sql);
    if let Some(platform) = query.platform.as_ref() {
        rows_query = rows_query.bind(platform);
    }
    let rows = rows_query.fetch_all(pool).await?;

    let count_sql = format!(r#"SELECT COUNT(*) FROM "contests"{};"#, query.where_clause);
    let mut count_query = sqlx::query(&count_sql);
    if let Some(platform) = query.platform.as_ref() {
        count_query = count_query.bind(platform);
    }
    let total: i64 = count_query
        .map(|row: PgRow| row.get(0))
        .fetch_one(pool)
        .await?;

    Ok((rows, total))
}

/// コンテスト一覧のエンドポイント
///
/// 保存済みデータの鮮度を確認し、必要なら同期を挟んでから応答する
/// 同期に失敗した場合は手元のデータをそのまま返し、リクエストは失敗させない
pub async fn list_contests(
    ValidatedQuery(params): ValidatedQuery<ContestListParameter>,
    Extension(pool): Extension<Pool<Postgres>>,
    Extension(clist): Extension<Arc<dyn ClistApi + Send + Sync>>,
) -> (
    StatusCode,
    Json<ListResponse<ContestListParameter, Contest>>,
) {
    let start_process = Instant::now();
    let query = build_query(&params);

    let (mut rows, mut total) = match fetch_contests(&pool, &query).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("request failed cause: {:?}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ListResponse::error(params, "unexpected error")),
            );
        }
    };

    let show_past = params.show_past.unwrap_or(false);
    let force_refresh = params.force_refresh.unwrap_or(false);
    if needs_refresh(&rows, show_past, force_refresh, Utc::now()) {
        let syncer = ContestSyncer::new(&pool);
        let report = syncer.sync_upcoming(clist.as_ref(), 200).await;
        if !report.success {
            tracing::warn!(
                "contest refresh failed, serving stored rows: {}",
                report.message.unwrap_or_default()
            );
        } else {
            match fetch_contests(&pool, &query).await {
                Ok((fresh_rows, fresh_total)) => {
                    rows = fresh_rows;
                    total = fresh_total;
                }
                Err(e) => {
                    tracing::error!("failed to re-query contests after refresh: {:?}", e);
                }
            }
        }
    }

    let time: u32 = Instant::now().duration_since(start_process).as_millis() as u32;
    let limit = query.limit as u32;
    let count = rows.len() as u32;
    let pages = ((total as u32) + limit - 1) / limit;
    let index = params.page.unwrap_or(1);

    let stats = ListStats {
        time,
        total,
        index,
        pages,
        count,
        params,
    };

    (
        StatusCode::OK,
        Json(ListResponse {
            stats,
            items: rows,
            message: None,
        }),
    )
}

#[derive(Debug, Deserialize)]
pub struct CreateContestRequest {
    pub title: Option<String>,
    pub platform: Option<String>,
    pub platform_icon: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub clist_id: Option<i64>,
}

/// コンテストを手動登録するエンドポイント
///
/// duration_secondsは常にend_time - start_timeから導出する
pub async fn create_contest(
    AuthUser(_claims): AuthUser,
    Extension(pool): Extension<Pool<Postgres>>,
    Json(body): Json<CreateContestRequest>,
) -> Result<(StatusCode, Json<Contest>), (StatusCode, Json<ErrorResponse>)> {
    let title = body.title.as_deref().map(str::trim).unwrap_or_default();
    let platform = body.platform.as_deref().map(str::trim).unwrap_or_default();
    let url = body.url.as_deref().map(str::trim).unwrap_or_default();
    let (start_time, end_time) = match (body.start_time, body.end_time) {
        (Some(start_time), Some(end_time)) => (start_time, end_time),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(
                    "title, platform, start_time, end_time, and url are required",
                )),
            ))
        }
    };
    if title.is_empty() || platform.is_empty() || url.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "title, platform, start_time, end_time, and url are required",
            )),
        ));
    }
    if end_time < start_time {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("end_time must not precede start_time")),
        ));
    }

    let internal_error = |e: sqlx::Error| {
        tracing::error!("failed to create contest: {:?}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("unexpected error")),
        )
    };

    if let Some(clist_id) = body.clist_id {
        let exists = sqlx::query(r#"SELECT 1 FROM "contests" WHERE "clist_id" = $1;"#)
            .bind(clist_id)
            .fetch_optional(&pool)
            .await
            .map_err(internal_error)?;
        if exists.is_some() {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(format!(
                    "contest with clist id {} already exists",
                    clist_id
                ))),
            ));
        }
    }

    let duration_seconds = (end_time - start_time).num_seconds();
    let contest = sqlx::query_as::<_, Contest>(
        r#"
        INSERT INTO "contests" (
            "clist_id", "title", "platform", "platform_icon", "start_time",
            "end_time", "duration_seconds", "url", "description", "api_source"
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'manual')
        RETURNING *;
        "#,
    )
    .bind(body.clist_id)
    .bind(title)
    .bind(platform)
    .bind(&body.platform_icon)
    .bind(start_time)
    .bind(end_time)
    .bind(duration_seconds)
    .bind(url)
    .bind(&body.description)
    .fetch_one(&pool)
    .await
    .map_err(internal_error)?;

    Ok((StatusCode::CREATED, Json(contest)))
}

pub async fn get_contest(
    Path(id): Path<i64>,
    Extension(pool): Extension<Pool<Postgres>>,
) -> Result<Json<Contest>, (StatusCode, Json<ErrorResponse>)> {
    let contest = sqlx::query_as::<_, Contest>(r#"SELECT * FROM "contests" WHERE "id" = $1;"#)
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("failed to fetch contest {}: {:?}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("unexpected error")),
            )
        })?;

    match contest {
        Some(contest) => Ok(Json(contest)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("contest not found")),
        )),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateContestRequest {
    pub title: Option<String>,
    pub platform: Option<String>,
    pub platform_icon: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i64>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub clist_id: Option<i64>,
}

/// コンテスト更新エンドポイント
///
/// start_timeまたはend_timeが変わった場合、durationは必ず再計算される
/// 時刻が変わらない場合に限り、明示指定されたduration_secondsを受け付ける
pub async fn update_contest(
    AuthUser(_claims): AuthUser,
    Path(id): Path<i64>,
    Extension(pool): Extension<Pool<Postgres>>,
    Json(body): Json<UpdateContestRequest>,
) -> Result<Json<Contest>, (StatusCode, Json<ErrorResponse>)> {
    let internal_error = |e: sqlx::Error| {
        tracing::error!("failed to update contest {}: {:?}", id, e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("unexpected error")),
        )
    };

    let contest = sqlx::query_as::<_, Contest>(r#"SELECT * FROM "contests" WHERE "id" = $1;"#)
        .bind(id)
        .fetch_optional(&pool)
        .await
        .map_err(internal_error)?;
    let mut contest = match contest {
        Some(contest) => contest,
        None => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new("contest not found for update")),
            ))
        }
    };

    if let Some(title) = body.title {
        contest.title = title;
    }
    if let Some(platform) = body.platform {
        contest.platform = platform;
    }
    if let Some(platform_icon) = body.platform_icon {
        contest.platform_icon = Some(platform_icon);
    }
    if let Some(url) = body.url {
        contest.url = url;
    }
    if let Some(description) = body.description {
        contest.description = Some(description);
    }
    if let Some(clist_id) = body.clist_id {
        contest.clist_id = Some(clist_id);
    }

    let times_changed = body.start_time.is_some() || body.end_time.is_some();
    if let Some(start_time) = body.start_time {
        contest.start_time = start_time;
    }
    if let Some(end_time) = body.end_time {
        contest.end_time = end_time;
    }
    if times_changed {
        contest.duration_seconds = (contest.end_time - contest.start_time).num_seconds();
    } else if let Some(duration_seconds) = body.duration_seconds {
        contest.duration_seconds = duration_seconds;
    }

    let contest = sqlx::query_as::<_, Contest>(
        r#"
        UPDATE "contests"
        SET
            "clist_id" = $2,
            "title" = $3,
            "platform" = $4,
            "platform_icon" = $5,
            "start_time" = $6,
            "end_time" = $7,
            "duration_seconds" = $8,
            "url" = $9,
            "description" = $10,
            "updated_at" = CURRENT_TIMESTAMP
        WHERE "id" = $1
        RETURNING *;
        "#,
    )
    .bind(id)
    .bind(contest.clist_id)
    .bind(&contest.title)
    .bind(&contest.platform)
    .bind(&contest.platform_icon)
    .bind(contest.start_time)
    .bind(contest.end_time)
    .bind(contest.duration_seconds)
    .bind(&contest.url)
    .bind(&contest.description)
    .fetch_one(&pool)
    .await
    .map_err(internal_error)?;

    Ok(Json(contest))
}

pub async fn delete_contest(
    AuthUser(_claims): AuthUser,
    Path(id): Path<i64>,
    Extension(pool): Extension<Pool<Postgres>>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<ErrorResponse>)> {
    let result = sqlx::query(r#"DELETE FROM "contests" WHERE "id" = $1;"#)
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("failed to delete contest {}: {:?}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("unexpected error")),
            )
        })?;

    if result.rows_affected() == 0 {
        Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("contest not found for deletion")),
        ))
    } else {
        Ok(Json(MessageResponse::new(true, "contest removed")))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_deserialize() {
        let query = "platform=codeforces&show_past=true&limit=50&page=2&force_refresh=true";
        let params: ContestListParameter = serde_structuredqs::from_str(query).unwrap();

        let expected = ContestListParameter {
            platform: Some(String::from("codeforces")),
            show_past: Some(true),
            limit: Some(50),
            page: Some(2),
            force_refresh: Some(true),
        };

        assert_eq!(params, expected);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn empty_query_string() {
        let params: ContestListParameter = serde_structuredqs::from_str("").unwrap();
        assert_eq!(params, ContestListParameter::default());
    }

    fn contest(api_source: &str, fetched_minutes_ago: Option<i64>, now: DateTime<Utc>) -> Contest {
        Contest {
            id: 1,
            clist_id: Some(100),
            title: String::from("Weekly Contest"),
            platform: String::from("Codeforces"),
            platform_icon: None,
            start_time: now + Duration::hours(1),
            end_time: now + Duration::hours(3),
            duration_seconds: 7200,
            url: String::from("https://example.com"),
            description: None,
            api_source: String::from(api_source),
            last_fetched_at: fetched_minutes_ago.map(|minutes| now - Duration::minutes(minutes)),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn fresh_rows_do_not_trigger_refresh() {
        let now = Utc::now();
        let rows = vec![
            contest("clist.by", Some(10), now),
            contest("clist.by", Some(59), now),
        ];
        assert!(!needs_refresh(&rows, false, false, now));
    }

    #[test]
    fn one_stale_row_triggers_refresh() {
        let now = Utc::now();
        let rows = vec![
            contest("clist.by", Some(10), now),
            contest("clist.by", Some(61), now),
        ];
        assert!(needs_refresh(&rows, false, false, now));
    }

    #[test]
    fn exactly_sixty_minutes_is_still_fresh() {
        let now = Utc::now();
        let rows = vec![contest("clist.by", Some(60), now)];
        assert!(!needs_refresh(&rows, false, false, now));
    }

    #[test]
    fn manual_rows_never_become_stale() {
        let now = Utc::now();
        let rows = vec![contest("manual", None, now)];
        assert!(!needs_refresh(&rows, false, false, now));
    }

    #[test]
    fn clist_row_without_fetch_timestamp_is_stale() {
        let now = Utc::now();
        let rows = vec![contest("clist.by", None, now)];
        assert!(needs_refresh(&rows, false, false, now));
    }

    #[test]
    fn empty_upcoming_query_triggers_refresh() {
        assert!(needs_refresh(&[], false, false, Utc::now()));
    }

    #[test]
    fn past_queries_never_refresh() {
        let now = Utc::now();
        let rows = vec![contest("clist.by", Some(120), now)];
        assert!(!needs_refresh(&rows, true, false, now));
        assert!(!needs_refresh(&[], true, false, now));
    }

    #[test]
    fn force_refresh_bypasses_freshness_evaluation() {
        let now = Utc::now();
        let rows = vec![contest("clist.by", Some(1), now)];
        assert!(needs_refresh(&rows, false, true, now));
        assert!(needs_refresh(&rows, true, true, now));
    }

    #[test]
    fn platform_filter_overrides_allowed_set() {
        let params = ContestListParameter {
            platform: Some(String::from("leetcode.com")),
            ..Default::default()
        };
        let query = build_query(&params);
        assert!(query.where_clause.contains(r#"lower("platform") = lower($1)"#));
        assert_eq!(query.platform.as_deref(), Some("LeetCode"));
    }

    #[test]
    fn default_query_restricts_to_tracked_platforms() {
        let query = build_query(&ContestListParameter::default());
        assert!(query.where_clause.contains(r#"lower("platform") IN ("#));
        assert!(query.where_clause.contains("'codeforces'"));
        assert!(query.where_clause.contains(r#""end_time" >= CURRENT_TIMESTAMP"#));
        assert_eq!(query.order, "ASC");
        assert_eq!(query.limit, 100);
    }

    #[test]
    fn past_query_sorts_newest_first_and_keeps_finished_contests() {
        let params = ContestListParameter {
            show_past: Some(true),
            page: Some(3),
            limit: Some(50),
            ..Default::default()
        };
        let query = build_query(&params);
        assert!(!query.where_clause.contains("end_time"));
        assert_eq!(query.order, "DESC");
        assert_eq!(query.offset, 100);
    }
}
