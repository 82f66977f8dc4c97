use crate::{
    modules::{auth::AuthUser, utils::{is_same_utc_day, next_streak}},
    types::tables::{DailyChallenge, User},
};
use axum::{extract::Extension, http::StatusCode, Json};
use chrono::Utc;
use cp_tracker_libs::api::ErrorResponse;
use serde::Serialize;
use sqlx::{Pool, Postgres};

// デイリーチャレンジ候補を探すときの難易度の優先順
const PREFERRED_DIFFICULTIES: [&str; 8] = [
    "800", "900", "1000", "1100", "1200", "1300", "1400", "1500",
];

// 候補が尽きたときに使うフォールバックのプラットフォーム名
const GENERAL_PLATFORM: &str = "General";

#[derive(Debug, Serialize)]
pub struct DailyChallengeResponse {
    pub message: String,
    pub challenge: DailyChallenge,
    pub current_streak: i32,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn internal_error(e: sqlx::Error) -> HandlerError {
    tracing::error!("daily challenge query failed: {:?}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("unexpected error")),
    )
}

async fn fetch_user(pool: &Pool<Postgres>, user_id: i64) -> Result<User, HandlerError> {
    sqlx::query_as::<_, User>(r#"SELECT * FROM "users" WHERE "user_id" = $1;"#)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(internal_error)?
        .ok_or((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("user not found")),
        ))
}

async fn fetch_assignment(
    pool: &Pool<Postgres>,
    user_id: i64,
) -> Result<Option<DailyChallenge>, HandlerError> {
    sqlx::query_as::<_, DailyChallenge>(
        r#"SELECT * FROM "daily_challenges" WHERE "user_id" = $1;"#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(internal_error)
}

/// 今日のデイリーチャレンジを返すエンドポイント
///
/// 今日の分が既に割り当て済みならそれを返す。未割り当てなら未解答の問題から
/// 1問選んで割り当てを上書きする。ストリークはここでは一切変更しない
pub async fn get_daily_challenge(
    AuthUser(claims): AuthUser,
    Extension(pool): Extension<Pool<Postgres>>,
) -> Result<(StatusCode, Json<DailyChallengeResponse>), HandlerError> {
    let user = fetch_user(&pool, claims.id).await?;
    let now = Utc::now();

    if let Some(challenge) = fetch_assignment(&pool, claims.id).await? {
        if is_same_utc_day(challenge.suggested_at, now) {
            let message = if challenge.completed {
                "today's challenge already completed"
            } else {
                "today's challenge already suggested"
            };
            return Ok((
                StatusCode::OK,
                Json(DailyChallengeResponse {
                    message: String::from(message),
                    challenge,
                    current_streak: user.current_streak,
                }),
            ));
        }
    }

    // 未解答の問題を難易度の優先順に1問ランダムに選ぶ
    let candidate = sqlx::query_as::<_, CandidateProblem>(
        r#"
        SELECT "problem_id", "platform", "title", "url", "difficulty", "tags"
        FROM "problems"
        WHERE "platform" = 'Codeforces'
          AND "difficulty" = ANY($1)
          AND NOT EXISTS (
              SELECT 1 FROM "solved_problems"
              WHERE "solved_problems"."user_id" = $2
                AND "solved_problems"."platform" = "problems"."platform"
                AND "solved_problems"."problem_id" = "problems"."problem_id"
          )
        ORDER BY random()
        LIMIT 1;
        "#,
    )
    .bind(
        PREFERRED_DIFFICULTIES
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<String>>(),
    )
    .bind(claims.id)
    .fetch_optional(&pool)
    .await
    .map_err(internal_error)?;

    let candidate = candidate.unwrap_or_else(|| CandidateProblem {
        problem_id: format!("fallback-{}", now.date_naive()),
        platform: String::from(GENERAL_PLATFORM),
        title: String::from("Solve any practice problem from your favorite platform today!"),
        url: String::from("#"),
        difficulty: Some(String::from("Varies")),
        tags: Vec::new(),
    });

    let challenge = sqlx::query_as::<_, DailyChallenge>(
        r#"
        INSERT INTO "daily_challenges" (
            "user_id", "problem_id", "platform", "title", "url", "difficulty", "tags",
            "suggested_at", "completed", "completed_at"
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, NULL)
        ON CONFLICT ("user_id")
        DO UPDATE SET
            "problem_id" = EXCLUDED."problem_id",
            "platform" = EXCLUDED."platform",
            "title" = EXCLUDED."title",
            "url" = EXCLUDED."url",
            "difficulty" = EXCLUDED."difficulty",
            "tags" = EXCLUDED."tags",
            "suggested_at" = EXCLUDED."suggested_at",
            "completed" = FALSE,
            "completed_at" = NULL
        RETURNING *;
        "#,
    )
    .bind(claims.id)
    .bind(&candidate.problem_id)
    .bind(&candidate.platform)
    .bind(&candidate.title)
    .bind(&candidate.url)
    .bind(&candidate.difficulty)
    .bind(&candidate.tags)
    .bind(now)
    .fetch_one(&pool)
    .await
    .map_err(internal_error)?;

    Ok((
        StatusCode::CREATED,
        Json(DailyChallengeResponse {
            message: String::from("new daily challenge assigned"),
            challenge,
            current_streak: user.current_streak,
        }),
    ))
}

#[derive(Debug, sqlx::FromRow)]
struct CandidateProblem {
    problem_id: String,
    platform: String,
    title: String,
    url: String,
    difficulty: Option<String>,
    tags: Vec<String>,
}

/// デイリーチャレンジを解答済みにしてストリークを更新するエンドポイント
///
/// 割り当て・解答記録・ストリーク更新は1トランザクションで行い、
/// 途中で失敗した場合は何も書き込まれない
pub async fn solve_daily_challenge(
    AuthUser(claims): AuthUser,
    Extension(pool): Extension<Pool<Postgres>>,
) -> Result<Json<DailyChallengeResponse>, HandlerError> {
    let user = fetch_user(&pool, claims.id).await?;
    let now = Utc::now();

    let challenge = fetch_assignment(&pool, claims.id).await?.ok_or((
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("no daily challenge assigned to solve")),
    ))?;

    if !is_same_utc_day(challenge.suggested_at, now) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "this daily challenge is not for today. request today's challenge first",
            )),
        ));
    }
    if challenge.completed {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "today's challenge has already been marked as completed",
            )),
        ));
    }

    let current_streak = next_streak(user.last_solved_at, user.current_streak, now);

    let mut tx = pool.begin().await.map_err(internal_error)?;

    let challenge = sqlx::query_as::<_, DailyChallenge>(
        r#"
        UPDATE "daily_challenges"
        SET "completed" = TRUE, "completed_at" = $2
        WHERE "user_id" = $1
        RETURNING *;
        "#,
    )
    .bind(claims.id)
    .bind(now)
    .fetch_one(&mut tx)
    .await
    .map_err(internal_error)?;

    if challenge.platform != GENERAL_PLATFORM {
        sqlx::query(
            r#"
            INSERT INTO "solved_problems" ("user_id", "problem_id", "platform", "title", "solved_at")
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ("user_id", "platform", "problem_id") DO NOTHING;
            "#,
        )
        .bind(claims.id)
        .bind(&challenge.problem_id)
        .bind(&challenge.platform)
        .bind(&challenge.title)
        .bind(now)
        .execute(&mut tx)
        .await
        .map_err(internal_error)?;
    }

    sqlx::query(
        r#"
        UPDATE "users"
        SET "current_streak" = $2, "last_solved_at" = $3, "updated_at" = CURRENT_TIMESTAMP
        WHERE "user_id" = $1;
        "#,
    )
    .bind(claims.id)
    .bind(current_streak)
    .bind(now)
    .execute(&mut tx)
    .await
    .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;

    Ok(Json(DailyChallengeResponse {
        message: String::from("daily challenge marked as solved, streak updated"),
        challenge,
        current_streak,
    }))
}
