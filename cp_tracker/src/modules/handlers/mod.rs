pub mod contest;
pub mod dashboard;
pub mod daily;
pub mod favorite;
pub mod problem;
pub mod sync;

use axum::{
    async_trait,
    extract::{Extension, FromRequestParts},
    http::StatusCode,
    Json,
};
use cp_tracker_libs::api::ErrorResponse;
use http::request::Parts;
use serde::de::DeserializeOwned;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use validator::Validate;

/// クエリ文字列をパースしてバリデーションまで行うエクストラクタ
///
/// パース失敗・バリデーション違反はともに400で弾く
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let query = parts.uri.query().unwrap_or_default();
        let value: T = serde_structuredqs::from_str(query).map_err(|rejection| {
            tracing::error!("Parsing error: {}", rejection);
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(format!(
                    "invalid format query string: [{}]",
                    rejection
                ))),
            )
        })?;

        value.validate().map_err(|rejection| {
            tracing::error!("Validation error: {}", rejection);
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(
                    format!("Validation error: [{}]", rejection).replace('\n', ", "),
                )),
            )
        })?;

        Ok(ValidatedQuery(value))
    }
}

pub async fn liveness(Extension(pool): Extension<Pool<Postgres>>) -> StatusCode {
    match sqlx::query("SELECT 1;").execute(&pool).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn readiness(Extension(pool): Extension<Pool<Postgres>>) -> StatusCode {
    let catalog_is_ok = sqlx::query(r#"SELECT COUNT(*) FROM "problems";"#)
        .map(|row: PgRow| row.get::<i64, _>(0))
        .fetch_one(&pool)
        .await
        .map(|count| count != 0)
        .unwrap_or(false);

    if catalog_is_ok {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}
