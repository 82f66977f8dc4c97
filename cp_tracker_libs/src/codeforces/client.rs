use crate::codeforces::model::{CodeforcesProblem, ProblemsetResponse};
use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;
use tokio::time::Duration;

type Result<T> = std::result::Result<T, CodeforcesError>;

#[derive(Debug, Error)]
pub enum CodeforcesError {
    #[error("failed to request to Codeforces API")]
    RequestError(#[from] reqwest::Error),
    #[error("invalid Codeforces url given")]
    InvalidUrlError(#[from] url::ParseError),
    #[error("Codeforces API returned non-OK status: {0}")]
    BadStatusError(String),
}

#[async_trait]
pub trait CodeforcesApi {
    async fn fetch_problemset(&self) -> Result<Vec<CodeforcesProblem>>;
}

pub struct CodeforcesClient {
    url: Url,
    client: Client,
}

impl CodeforcesClient {
    pub fn new() -> Result<Self> {
        let url = Url::parse("https://codeforces.com/api/problemset.problems")?;
        let client = Client::builder()
            .gzip(true)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(CodeforcesClient { url, client })
    }
}

#[async_trait]
impl CodeforcesApi for CodeforcesClient {
    /// 問題カタログ全体を一括で取得するメソッド
    ///
    /// レスポンスのstatusフィールドが"OK"でなければエラーを返す
    async fn fetch_problemset(&self) -> Result<Vec<CodeforcesProblem>> {
        tracing::info!("Attempting to get problem list from Codeforces...");
        let res = self.client.get(self.url.clone()).send().await?;
        let body: ProblemsetResponse = res.error_for_status()?.json().await?;

        if body.status != "OK" {
            return Err(CodeforcesError::BadStatusError(
                body.comment.unwrap_or_default(),
            ));
        }

        let problems = body
            .result
            .ok_or_else(|| CodeforcesError::BadStatusError(String::from("empty result")))?
            .problems;
        tracing::info!("{} problems collected from Codeforces.", problems.len());

        Ok(problems)
    }
}
