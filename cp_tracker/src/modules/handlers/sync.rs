use crate::modules::{
    auth::AuthUser, contests::syncer::ContestSyncer, problems::syncer::ProblemSyncer,
    report::SyncReport,
};
use axum::{extract::Extension, http::StatusCode, Json};
use cp_tracker_libs::{
    clist::client::{ClistApi, FetchPolicy},
    codeforces::client::CodeforcesApi,
};
use serde::Serialize;
use sqlx::{Pool, Postgres};
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct SyncSummaryResponse {
    pub message: String,
    pub summary: Vec<SyncReport>,
}

/// 全プラットフォームの問題カタログを同期する管理用エンドポイント
///
/// プラットフォームを順番に処理するため数分かかる。呼び出し側は
/// そのレイテンシを受け入れる前提。通常のリクエスト経路からは呼ばない
pub async fn sync_problems(
    AuthUser(claims): AuthUser,
    Extension(pool): Extension<Pool<Postgres>>,
    Extension(clist): Extension<Arc<dyn ClistApi + Send + Sync>>,
    Extension(codeforces): Extension<Arc<dyn CodeforcesApi + Send + Sync>>,
) -> (StatusCode, Json<SyncSummaryResponse>) {
    tracing::info!("full problem sync initiated by {}", claims.username);

    let syncer = ProblemSyncer::new(&pool, FetchPolicy::default());
    let summary = syncer
        .sync_all(clist.as_ref(), codeforces.as_ref())
        .await;

    (
        StatusCode::OK,
        Json(SyncSummaryResponse {
            message: String::from("sync process completed"),
            summary,
        }),
    )
}

/// 開催予定コンテストを同期する管理用エンドポイント
pub async fn sync_contests(
    AuthUser(claims): AuthUser,
    Extension(pool): Extension<Pool<Postgres>>,
    Extension(clist): Extension<Arc<dyn ClistApi + Send + Sync>>,
) -> (StatusCode, Json<SyncSummaryResponse>) {
    tracing::info!("contest sync initiated by {}", claims.username);

    let syncer = ContestSyncer::new(&pool);
    let report = syncer.sync_upcoming(clist.as_ref(), 250).await;
    let message = if report.success {
        String::from("sync process completed")
    } else {
        String::from("sync failed, see report for details")
    };

    (
        StatusCode::OK,
        Json(SyncSummaryResponse {
            message,
            summary: vec![report],
        }),
    )
}
