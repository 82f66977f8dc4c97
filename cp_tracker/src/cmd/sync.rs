use crate::{
    cmd::SyncDomain,
    modules::{
        contests::syncer::ContestSyncer, migration::MIGRATOR, problems::syncer::ProblemSyncer,
    },
    types::platform::Platform,
};
use anyhow::{Context, Result};
use clap::Args;
use cp_tracker_libs::{
    clist::client::{ClistClient, ClistConfig, FetchPolicy},
    codeforces::client::CodeforcesClient,
};
use sqlx::{postgres::Postgres, Pool};
use std::env;

#[derive(Debug, Args)]
pub struct SyncArgs {
    domain: SyncDomain,
    /// 1プラットフォームだけを同期する場合に指定する
    #[arg(long)]
    platform: Option<String>,
}

fn clist_config_from_env() -> Result<ClistConfig> {
    let username = env::var("CLIST_USERNAME").with_context(|| {
        let message = "CLIST_USERNAME must be configured.";
        tracing::error!(message);
        message
    })?;
    let api_key = env::var("CLIST_API_KEY").with_context(|| {
        let message = "CLIST_API_KEY must be configured.";
        tracing::error!(message);
        message
    })?;

    Ok(ClistConfig::new(username, api_key))
}

pub async fn run(args: SyncArgs) -> Result<()> {
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

    let clist = ClistClient::new(&clist_config_from_env()?)?;

    match args.domain {
        SyncDomain::Problems => {
            let syncer = ProblemSyncer::new(&pool, FetchPolicy::default());
            let reports = match args.platform {
                Some(name) => {
                    let platform = Platform::normalize(&name);
                    if platform == Platform::Unknown {
                        anyhow::bail!("unknown platform: {}", name);
                    }
                    if platform == Platform::Codeforces {
                        let codeforces = CodeforcesClient::new()?;
                        vec![syncer.sync_codeforces(&codeforces).await]
                    } else {
                        vec![syncer.sync_platform(&clist, platform).await]
                    }
                }
                None => {
                    let codeforces = CodeforcesClient::new()?;
                    syncer.sync_all(&clist, &codeforces).await
                }
            };

            for report in reports.iter() {
                tracing::info!(
                    "{}",
                    serde_json::to_string(report).unwrap_or(String::from(""))
                );
            }
            if reports.iter().all(|report| !report.success) {
                anyhow::bail!("problem sync failed for every platform");
            }
            Ok(())
        }
        SyncDomain::Contests => {
            let syncer = ContestSyncer::new(&pool);
            let report = syncer.sync_upcoming(&clist, 250).await;
            tracing::info!(
                "{}",
                serde_json::to_string(&report).unwrap_or(String::from(""))
            );
            if !report.success {
                anyhow::bail!(
                    "contest sync failed: {}",
                    report.message.unwrap_or_default()
                );
            }
            Ok(())
        }
    }
}
