//! Semantic Scholar API client.
//!
//! API Documentation: https://api.semanticscholar.org/api-docs/
//! The public API is flaky under load, so every call retries with a fixed
//! backoff (20 attempts, 1 second apart by default) and only surfaces an
//! error once the attempts are exhausted.
//!
//! The enrichment orchestrator consumes this through the `PaperSource`
//! trait so tests can script responses without a network.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::config::GraphConfig;
use crate::model::Paper;

const BASE_URL: &str = "https://api.semanticscholar.org";
const DEFAULT_FIELDS: &str =
    "paperId,title,authors,abstract,references,referenceCount,citationCount,year,venue";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("all {attempts} attempts failed, last error: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// Async source of paper metadata. Implemented by `SemanticScholarClient`;
/// tests use scripted implementations.
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Batch-fetch full records for the given ids.
    async fn paper_details(&self, ids: &[String]) -> Result<Vec<Paper>, ApiError>;

    /// Ids of papers recommended for the positive seed set.
    async fn recommendations(
        &self,
        positive: &[String],
        negative: &[String],
        limit: usize,
    ) -> Result<Vec<String>, ApiError>;

    /// Ids of papers citing `paper_id`.
    async fn citations(&self, paper_id: &str, limit: usize) -> Result<Vec<String>, ApiError>;

    /// Ids of papers cited by `paper_id`.
    async fn references(&self, paper_id: &str, limit: usize) -> Result<Vec<String>, ApiError>;

    /// Ids of papers written by `author_id`.
    async fn author_papers(&self, author_id: &str, limit: usize) -> Result<Vec<String>, ApiError>;
}

// ---- raw response shapes ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdRecord {
    paper_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationsResponse {
    #[serde(default)]
    recommended_papers: Vec<IdRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CitationEntry {
    citing_paper: Option<IdRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CitationsResponse {
    #[serde(default)]
    data: Vec<CitationEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReferenceEntry {
    cited_paper: Option<IdRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReferencesResponse {
    #[serde(default)]
    data: Vec<ReferenceEntry>,
}

#[derive(Debug, Deserialize)]
struct AuthorPapersResponse {
    #[serde(default)]
    data: Vec<IdRecord>,
}

pub struct SemanticScholarClient {
    client: Client,
    base_url: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl SemanticScholarClient {
    pub fn new(config: &GraphConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        SemanticScholarClient {
            client,
            base_url: BASE_URL.to_string(),
            max_attempts: config.api_max_attempts.max(1),
            retry_delay: Duration::from_millis(config.api_retry_delay_ms),
        }
    }

    /// Point the client somewhere else (local stub server, mirror).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Run `attempt` until it succeeds or `max_attempts` is exhausted, with a
    /// fixed delay between tries. Any failure (network error or non-2xx)
    /// counts as a failed attempt.
    async fn retry<T, F, Fut>(&self, what: &str, attempt: F) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut last = String::new();
        for n in 1..=self.max_attempts {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    eprintln!("[SemanticScholar] {} attempt {}/{} failed: {}", what, n, self.max_attempts, e);
                    last = e.to_string();
                    if n < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
        Err(ApiError::RetriesExhausted { attempts: self.max_attempts, last })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status: status.as_u16(), body });
        }
        Ok(response)
    }
}

#[async_trait]
impl PaperSource for SemanticScholarClient {
    async fn paper_details(&self, ids: &[String]) -> Result<Vec<Paper>, ApiError> {
        if ids.is_empty() {
            return Err(ApiError::InvalidInput("paper id list must be non-empty".to_string()));
        }
        let url = format!(
            "{}/graph/v1/paper/batch?fields={}",
            self.base_url,
            urlencoding::encode(DEFAULT_FIELDS)
        );
        let body = serde_json::json!({ "ids": ids });

        self.retry("paper batch", || async {
            let response = self.client.post(&url).json(&body).send().await?;
            // unknown ids come back as nulls in the array
            let records: Vec<Option<Paper>> = Self::check(response).await?.json().await?;
            let papers: Vec<Paper> = records.into_iter().flatten().collect();
            println!("[SemanticScholar] Fetched details for {}/{} papers", papers.len(), ids.len());
            Ok(papers)
        })
        .await
    }

    async fn recommendations(
        &self,
        positive: &[String],
        negative: &[String],
        limit: usize,
    ) -> Result<Vec<String>, ApiError> {
        if positive.is_empty() {
            return Err(ApiError::InvalidInput("positive id list must be non-empty".to_string()));
        }
        let url = format!(
            "{}/recommendations/v1/papers?limit={}&fields=paperId",
            self.base_url, limit
        );
        let body = serde_json::json!({
            "positivePaperIds": positive,
            "negativePaperIds": negative,
        });

        self.retry("recommendations", || async {
            let response = self.client.post(&url).json(&body).send().await?;
            let parsed: RecommendationsResponse = Self::check(response).await?.json().await?;
            let ids: Vec<String> = parsed
                .recommended_papers
                .into_iter()
                .filter_map(|r| r.paper_id)
                .collect();
            println!("[SemanticScholar] {} recommendations received", ids.len());
            Ok(ids)
        })
        .await
    }

    async fn citations(&self, paper_id: &str, limit: usize) -> Result<Vec<String>, ApiError> {
        if paper_id.is_empty() {
            return Err(ApiError::InvalidInput("paper id must be non-empty".to_string()));
        }
        let url = format!(
            "{}/graph/v1/paper/{}/citations?limit={}&fields=paperId",
            self.base_url,
            urlencoding::encode(paper_id),
            limit
        );

        self.retry("citations", || async {
            let response = self.client.get(&url).send().await?;
            let parsed: CitationsResponse = Self::check(response).await?.json().await?;
            let ids: Vec<String> = parsed
                .data
                .into_iter()
                .filter_map(|e| e.citing_paper.and_then(|r| r.paper_id))
                .collect();
            println!("[SemanticScholar] {} citations for {}", ids.len(), paper_id);
            Ok(ids)
        })
        .await
    }

    async fn references(&self, paper_id: &str, limit: usize) -> Result<Vec<String>, ApiError> {
        if paper_id.is_empty() {
            return Err(ApiError::InvalidInput("paper id must be non-empty".to_string()));
        }
        let url = format!(
            "{}/graph/v1/paper/{}/references?limit={}&fields=paperId",
            self.base_url,
            urlencoding::encode(paper_id),
            limit
        );

        self.retry("references", || async {
            let response = self.client.get(&url).send().await?;
            let parsed: ReferencesResponse = Self::check(response).await?.json().await?;
            let ids: Vec<String> = parsed
                .data
                .into_iter()
                .filter_map(|e| e.cited_paper.and_then(|r| r.paper_id))
                .collect();
            println!("[SemanticScholar] {} references for {}", ids.len(), paper_id);
            Ok(ids)
        })
        .await
    }

    async fn author_papers(&self, author_id: &str, limit: usize) -> Result<Vec<String>, ApiError> {
        if author_id.is_empty() {
            return Err(ApiError::InvalidInput("author id must be non-empty".to_string()));
        }
        let url = format!(
            "{}/graph/v1/author/{}/papers?limit={}&fields=paperId",
            self.base_url,
            urlencoding::encode(author_id),
            limit
        );

        self.retry("author papers", || async {
            let response = self.client.get(&url).send().await?;
            let parsed: AuthorPapersResponse = Self::check(response).await?.json().await?;
            let ids: Vec<String> = parsed.data.into_iter().filter_map(|r| r.paper_id).collect();
            println!("[SemanticScholar] {} papers for author {}", ids.len(), author_id);
            Ok(ids)
        })
        .await
    }
}
