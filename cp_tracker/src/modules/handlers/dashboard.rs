use crate::{modules::auth::AuthUser, types::tables::User};
use axum::{extract::Extension, http::StatusCode, Json};
use cp_tracker_libs::api::ErrorResponse;
use serde::Serialize;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub problems_solved: i64,
    pub favorites_count: i64,
    pub current_streak: i32,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn internal_error(e: sqlx::Error) -> HandlerError {
    tracing::error!("dashboard query failed: {:?}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("unexpected error")),
    )
}

async fn count_rows(pool: &Pool<Postgres>, table: &str, user_id: i64) -> sqlx::Result<i64> {
    let sql = format!(r#"SELECT COUNT(*) FROM "{}" WHERE "user_id" = $1;"#, table);
    sqlx::query(&sql)
        .bind(user_id)
        .map(|row: PgRow| row.get(0))
        .fetch_one(pool)
        .await
}

/// ログインユーザのダッシュボード統計を返すエンドポイント
///
/// 解答数は履歴テーブルを直接数える。ユーザレコード側に複製は持たない
pub async fn stats(
    AuthUser(claims): AuthUser,
    Extension(pool): Extension<Pool<Postgres>>,
) -> Result<Json<DashboardStats>, HandlerError> {
    let user = sqlx::query_as::<_, User>(r#"SELECT * FROM "users" WHERE "user_id" = $1;"#)
        .bind(claims.id)
        .fetch_optional(&pool)
        .await
        .map_err(internal_error)?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("user not found")),
        ))?;

    let problems_solved = count_rows(&pool, "solved_problems", claims.id)
        .await
        .map_err(internal_error)?;
    let favorites_count = count_rows(&pool, "favorite_problems", claims.id)
        .await
        .map_err(internal_error)?;

    Ok(Json(DashboardStats {
        problems_solved,
        favorites_count,
        current_streak: user.current_streak,
    }))
}
