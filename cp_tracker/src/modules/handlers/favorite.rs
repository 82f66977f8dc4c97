use crate::{
    modules::auth::AuthUser,
    types::{
        platform::Platform,
        tables::{FavoriteContest, FavoriteProblem},
    },
};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use cp_tracker_libs::api::ErrorResponse;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Postgres};

#[derive(Debug, Serialize)]
pub struct FavoritesResponse<T: Serialize> {
    pub message: String,
    pub favorites: Vec<T>,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn internal_error(e: sqlx::Error) -> HandlerError {
    tracing::error!("favorites query failed: {:?}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("unexpected error")),
    )
}

async fn list_problem_favorites(
    pool: &Pool<Postgres>,
    user_id: i64,
) -> sqlx::Result<Vec<FavoriteProblem>> {
    sqlx::query_as::<_, FavoriteProblem>(
        r#"SELECT * FROM "favorite_problems" WHERE "user_id" = $1 ORDER BY "added_at" DESC;"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

async fn list_contest_favorites(
    pool: &Pool<Postgres>,
    user_id: i64,
) -> sqlx::Result<Vec<FavoriteContest>> {
    sqlx::query_as::<_, FavoriteContest>(
        r#"SELECT * FROM "favorite_contests" WHERE "user_id" = $1 ORDER BY "added_at" DESC;"#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_favorite_problems(
    AuthUser(claims): AuthUser,
    Extension(pool): Extension<Pool<Postgres>>,
) -> Result<Json<Vec<FavoriteProblem>>, HandlerError> {
    let favorites = list_problem_favorites(&pool, claims.id)
        .await
        .map_err(internal_error)?;
    Ok(Json(favorites))
}

#[derive(Debug, Deserialize)]
pub struct AddFavoriteProblemRequest {
    pub problem_id: Option<String>,
    pub platform: Option<String>,
    pub title: Option<String>,
    pub url: Option<String>,
    pub difficulty: Option<String>,
}

/// 問題をお気に入りに追加するエンドポイント
///
/// 表示用フィールドは追加時点の値を複製して保存する
pub async fn add_favorite_problem(
    AuthUser(claims): AuthUser,
    Extension(pool): Extension<Pool<Postgres>>,
    Json(body): Json<AddFavoriteProblemRequest>,
) -> Result<(StatusCode, Json<FavoritesResponse<FavoriteProblem>>), HandlerError> {
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
    let title = body
        .title
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let (problem_id, platform, title) = match (problem_id, platform, title) {
        (Some(problem_id), Some(platform), Some(title)) => (problem_id, platform, title),
        _ => {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(
                    "problem id, platform, and title are required",
                )),
            ))
        }
    };

    let platform = Platform::normalize(platform).to_string();
    let result = sqlx::query(
        r#"
        INSERT INTO "favorite_problems" ("user_id", "problem_id", "platform", "title", "url", "difficulty")
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT ("user_id", "platform", "problem_id") DO NOTHING;
        "#,
    )
    .bind(claims.id)
    .bind(problem_id)
    .bind(&platform)
    .bind(title)
    .bind(&body.url)
    .bind(&body.difficulty)
    .execute(&pool)
    .await
    .map_err(internal_error)?;

    if result.rows_affected() == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("problem already in favorites")),
        ));
    }

    let favorites = list_problem_favorites(&pool, claims.id)
        .await
        .map_err(internal_error)?;

    Ok((
        StatusCode::CREATED,
        Json(FavoritesResponse {
            message: String::from("problem added to favorites"),
            favorites,
        }),
    ))
}

pub async fn remove_favorite_problem(
    AuthUser(claims): AuthUser,
    Path((platform, problem_id)): Path<(String, String)>,
    Extension(pool): Extension<Pool<Postgres>>,
) -> Result<Json<FavoritesResponse<FavoriteProblem>>, HandlerError> {
    let result = sqlx::query(
        r#"
        DELETE FROM "favorite_problems"
        WHERE "user_id" = $1 AND lower("platform") = lower($2) AND "problem_id" = $3;
        "#,
    )
    .bind(claims.id)
    .bind(&platform)
    .bind(&problem_id)
    .execute(&pool)
    .await
    .map_err(internal_error)?;

    if result.rows_affected() == 0 {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("favorite problem not found")),
        ));
    }

    let favorites = list_problem_favorites(&pool, claims.id)
        .await
        .map_err(internal_error)?;

    Ok(Json(FavoritesResponse {
        message: String::from("problem removed from favorites"),
        favorites,
    }))
}

pub async fn get_favorite_contests(
    AuthUser(claims): AuthUser,
    Extension(pool): Extension<Pool<Postgres>>,
) -> Result<Json<Vec<FavoriteContest>>, HandlerError> {
    let favorites = list_contest_favorites(&pool, claims.id)
        .await
        .map_err(internal_error)?;
    Ok(Json(favorites))
}

#[derive(Debug, Deserialize)]
pub struct AddFavoriteContestRequest {
    // clist.by由来のコンテストはclist_id、手動作成のコンテストは内部idの文字列
    pub identifier: Option<String>,
    pub title: Option<String>,
    pub platform: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub url: Option<String>,
    pub api_source: Option<String>,
}

pub async fn add_favorite_contest(
    AuthUser(claims): AuthUser,
    Extension(pool): Extension<Pool<Postgres>>,
    Json(body): Json<AddFavoriteContestRequest>,
) -> Result<(StatusCode, Json<FavoritesResponse<FavoriteContest>>), HandlerError> {
    let identifier = body
        .identifier
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let title = body
        .title
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let platform = body
        .platform
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let url = body
        .url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let (identifier, title, platform, start_time, url) =
        match (identifier, title, platform, body.start_time, url) {
            (Some(identifier), Some(title), Some(platform), Some(start_time), Some(url)) => {
                (identifier, title, platform, start_time, url)
            }
            _ => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new(
                        "identifier, title, platform, start_time, and url are required",
                    )),
                ))
            }
        };

    let result = sqlx::query(
        r#"
        INSERT INTO "favorite_contests" ("user_id", "identifier", "title", "platform", "start_time", "url", "api_source")
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT ("user_id", "identifier") DO NOTHING;
        "#,
    )
    .bind(claims.id)
    .bind(identifier)
    .bind(title)
    .bind(platform)
    .bind(start_time)
    .bind(url)
    .bind(&body.api_source)
    .execute(&pool)
    .await
    .map_err(internal_error)?;

    if result.rows_affected() == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("contest already in favorites")),
        ));
    }

    let favorites = list_contest_favorites(&pool, claims.id)
        .await
        .map_err(internal_error)?;

    Ok((
        StatusCode::CREATED,
        Json(FavoritesResponse {
            message: String::from("contest added to favorites"),
            favorites,
        }),
    ))
}

pub async fn remove_favorite_contest(
    AuthUser(claims): AuthUser,
    Path(identifier): Path<String>,
    Extension(pool): Extension<Pool<Postgres>>,
) -> Result<Json<FavoritesResponse<FavoriteContest>>, HandlerError> {
    let result = sqlx::query(
        r#"DELETE FROM "favorite_contests" WHERE "user_id" = $1 AND "identifier" = $2;"#,
    )
    .bind(claims.id)
    .bind(&identifier)
    .execute(&pool)
    .await
    .map_err(internal_error)?;

    if result.rows_affected() == 0 {
        return Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("favorite contest not found")),
        ));
    }

    let favorites = list_contest_favorites(&pool, claims.id)
        .await
        .map_err(internal_error)?;

    Ok(Json(FavoritesResponse {
        message: String::from("contest removed from favorites"),
        favorites,
    }))
}
