use crate::clist::model::{ClistContest, ClistProblem, ClistResponse};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header::AUTHORIZATION, Client, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::{self, Duration};

type Result<T> = std::result::Result<T, ClistError>;

#[derive(Debug, Error)]
pub enum ClistError {
    #[error("failed to request to clist API")]
    RequestError(#[from] reqwest::Error),
    #[error("failed to deserialize clist response")]
    DeserializeError(#[from] serde_json::Error),
    #[error("invalid clist url given")]
    InvalidUrlError(#[from] url::ParseError),
    #[error("clist API returned status code {0}")]
    UnexpectedStatusError(u16),
}

/// clist.byの認証情報と接続先
///
/// 環境変数を直接参照せず、呼び出し側で構築してクライアントへ渡す
#[derive(Debug, Clone)]
pub struct ClistConfig {
    pub api_username: String,
    pub api_key: String,
    pub base_url: String,
}

impl ClistConfig {
    pub fn new(api_username: impl ToString, api_key: impl ToString) -> Self {
        Self {
            api_username: api_username.to_string(),
            api_key: api_key.to_string(),
            base_url: String::from("https://clist.by/api/v4/"),
        }
    }
}

/// ページング取得のレートリミットポリシー
///
/// 1ページあたりの件数と、ページ間・プラットフォーム間の待機時間を持つ
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub page_size: u32,
    pub interval: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            page_size: 1000,
            interval: Duration::from_secs(6),
        }
    }
}

#[async_trait]
pub trait ClistApi {
    async fn fetch_problem_page(
        &self,
        resource_id: u32,
        limit: u32,
        offset: u32,
    ) -> Result<ClistResponse<ClistProblem>>;

    async fn fetch_upcoming_contests(&self, limit: u32) -> Result<Vec<ClistContest>>;
}

/// offset/limitでページを辿り、短いページが返るまで全件を取得する関数
///
/// レートリミットを守るため、ページ間でpolicy.intervalだけ待機する
pub async fn fetch_all_problems(
    api: &(impl ClistApi + ?Sized),
    resource_id: u32,
    policy: &FetchPolicy,
) -> Result<Vec<ClistProblem>> {
    let mut problems: Vec<ClistProblem> = Vec::new();
    let mut offset = 0u32;

    loop {
        let page = api
            .fetch_problem_page(resource_id, policy.page_size, offset)
            .await?;
        let fetched = page.objects.len() as u32;
        problems.extend(page.objects);
        tracing::info!(
            "{} problems fetched for resource {} (total so far: {})",
            fetched,
            resource_id,
            problems.len()
        );

        if fetched < policy.page_size {
            break;
        }
        offset += policy.page_size;
        time::sleep(policy.interval).await;
    }

    Ok(problems)
}

pub struct ClistClient {
    problem_url: Url,
    contest_url: Url,
    auth_header: String,
    client: Client,
}

impl ClistClient {
    pub fn new(config: &ClistConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let problem_url = base_url.join("problem/")?;
        let contest_url = base_url.join("contest/")?;
        let auth_header = format!("ApiKey {}:{}", config.api_username, config.api_key);
        let client = Client::builder()
            .gzip(true)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(ClistClient {
            problem_url,
            contest_url,
            auth_header,
            client,
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: Url, query: &[(&str, String)]) -> Result<T> {
        let res = self
            .client
            .get(url)
            .header(AUTHORIZATION, &self.auth_header)
            .query(query)
            .send()
            .await?;

        match res.error_for_status_ref() {
            Ok(_) => Ok(res.json().await?),
            Err(_) => Err(ClistError::UnexpectedStatusError(res.status().as_u16())),
        }
    }
}

#[async_trait]
impl ClistApi for ClistClient {
    async fn fetch_problem_page(
        &self,
        resource_id: u32,
        limit: u32,
        offset: u32,
    ) -> Result<ClistResponse<ClistProblem>> {
        self.get(
            self.problem_url.clone(),
            &[
                ("resource_id", resource_id.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("order_by", String::from("id")),
                ("format", String::from("json")),
            ],
        )
        .await
    }

    async fn fetch_upcoming_contests(&self, limit: u32) -> Result<Vec<ClistContest>> {
        let end_gt = Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string();
        let res: ClistResponse<ClistContest> = self
            .get(
                self.contest_url.clone(),
                &[
                    ("end__gt", end_gt),
                    ("order_by", String::from("start")),
                    ("limit", limit.to_string()),
                    ("format", String::from("json")),
                ],
            )
            .await?;

        Ok(res.objects)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clist::model::ClistMeta;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct ScriptedApi {
        pages: Vec<usize>,
        calls: AtomicU32,
    }

    impl ScriptedApi {
        fn new(pages: Vec<usize>) -> Self {
            Self {
                pages,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl ClistApi for ScriptedApi {
        async fn fetch_problem_page(
            &self,
            _resource_id: u32,
            limit: u32,
            offset: u32,
        ) -> Result<ClistResponse<ClistProblem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let index = (offset / limit) as usize;
            let size = self.pages.get(index).copied().unwrap_or(0);
            let objects = (0..size)
                .map(|i| ClistProblem {
                    id: (offset as i64) + i as i64,
                    key: Some(format!("{}-{}", offset, i)),
                    name: Some(String::from("problem")),
                    url: Some(String::from("https://example.com")),
                    rating: None,
                    tags: Vec::new(),
                })
                .collect();

            Ok(ClistResponse {
                meta: ClistMeta::default(),
                objects,
            })
        }

        async fn fetch_upcoming_contests(&self, _limit: u32) -> Result<Vec<ClistContest>> {
            Ok(Vec::new())
        }
    }

    fn policy(page_size: u32) -> FetchPolicy {
        FetchPolicy {
            page_size,
            interval: Duration::from_millis(0),
        }
    }

    #[tokio::test]
    async fn short_final_page_terminates_pagination() {
        let api = ScriptedApi::new(vec![3, 3, 2]);
        let problems = fetch_all_problems(&api, 1, &policy(3)).await.unwrap();

        assert_eq!(problems.len(), 8);
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exact_multiple_needs_one_empty_page() {
        let api = ScriptedApi::new(vec![2, 2]);
        let problems = fetch_all_problems(&api, 1, &policy(2)).await.unwrap();

        assert_eq!(problems.len(), 4);
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn single_short_page() {
        let api = ScriptedApi::new(vec![1]);
        let problems = fetch_all_problems(&api, 1, &policy(100)).await.unwrap();

        assert_eq!(problems.len(), 1);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }
}
