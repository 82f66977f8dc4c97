use crate::modules::{
    auth::AuthConfig,
    handlers::{contest, daily, dashboard, favorite, liveness, problem, readiness, sync},
    migration::MIGRATOR,
};
use anyhow::{Context, Result};
use axum::{extract::Extension, routing, Router, Server};
use clap::Args;
use cp_tracker_libs::{
    clist::client::{ClistApi, ClistClient, ClistConfig},
    codeforces::client::{CodeforcesApi, CodeforcesClient},
};
use sqlx::{postgres::Postgres, Pool};
use std::{env, net::SocketAddr, sync::Arc};
use tower_http::cors::CorsLayer;

#[derive(Debug, Args)]
pub struct ServerArgs {
    #[arg(long)]
    port: Option<u16>,
}

pub async fn run(args: ServerArgs) -> Result<()> {
    let database_url: String = env::var("DATABASE_URL").with_context(|| {
        let message = "DATABASE_URL must be configured.";
        tracing::error!(message);
        message
    })?;

    let pool: Pool<Postgres> = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .with_context(|| {
            let message = "Failed to create database connection pool.";
            tracing::error!(message);
            message
        })?;

    MIGRATOR.run(&pool).await?;

    let clist_username = env::var("CLIST_USERNAME").with_context(|| {
        let message = "CLIST_USERNAME must be configured.";
        tracing::error!(message);
        message
    })?;
    let clist_api_key = env::var("CLIST_API_KEY").with_context(|| {
        let message = "CLIST_API_KEY must be configured.";
        tracing::error!(message);
        message
    })?;
    let jwt_secret = env::var("JWT_SECRET").with_context(|| {
        let message = "JWT_SECRET must be configured.";
        tracing::error!(message);
        message
    })?;

    let clist_config = ClistConfig::new(clist_username, clist_api_key);
    let clist: Arc<dyn ClistApi + Send + Sync> = Arc::new(ClistClient::new(&clist_config)?);
    let codeforces: Arc<dyn CodeforcesApi + Send + Sync> = Arc::new(CodeforcesClient::new()?);
    let auth = Arc::new(AuthConfig { jwt_secret });

    let app = create_router(pool, clist, codeforces, auth);
    let port = match args.port {
        Some(port) => port,
        None => {
            tracing::warn!("API server will be launched at default port number 8000");
            8000u16
        }
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server start at port {}", port);
    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to bind server.");

    Ok(())
}

fn create_router(
    pool: Pool<Postgres>,
    clist: Arc<dyn ClistApi + Send + Sync>,
    codeforces: Arc<dyn CodeforcesApi + Send + Sync>,
    auth: Arc<AuthConfig>,
) -> Router {
    Router::new()
        .route(
            "/api/problems",
            routing::get(problem::list_problems).post(problem::add_problem),
        )
        .route("/api/problems/solve", routing::post(problem::mark_solved))
        .route("/api/problems/stats", routing::get(problem::platform_stats))
        .route(
            "/api/contests",
            routing::get(contest::list_contests).post(contest::create_contest),
        )
        .route(
            "/api/contests/:id",
            routing::get(contest::get_contest)
                .put(contest::update_contest)
                .delete(contest::delete_contest),
        )
        .route("/api/sync/problems", routing::post(sync::sync_problems))
        .route("/api/sync/contests", routing::post(sync::sync_contests))
        .route(
            "/api/daily-challenge",
            routing::get(daily::get_daily_challenge),
        )
        .route(
            "/api/daily-challenge/solve",
            routing::post(daily::solve_daily_challenge),
        )
        .route(
            "/api/favorites/problems",
            routing::get(favorite::get_favorite_problems).post(favorite::add_favorite_problem),
        )
        .route(
            "/api/favorites/problems/:platform/:problem_id",
            routing::delete(favorite::remove_favorite_problem),
        )
        .route(
            "/api/favorites/contests",
            routing::get(favorite::get_favorite_contests).post(favorite::add_favorite_contest),
        )
        .route(
            "/api/favorites/contests/:identifier",
            routing::delete(favorite::remove_favorite_contest),
        )
        .route("/api/dashboard/stats", routing::get(dashboard::stats))
        .route("/api/liveness", routing::get(liveness))
        .route("/api/readiness", routing::get(readiness))
        .layer(Extension(pool))
        .layer(Extension(clist))
        .layer(Extension(codeforces))
        .layer(Extension(auth))
        .layer(CorsLayer::permissive())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler.");
    };

    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("SIGINT signal received, starting graceful shutdown.");
}
