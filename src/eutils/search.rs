//! Paginated PMC search via `esearch.fcgi`.

use std::sync::Arc;

use serde::Deserialize;

use crate::config::Credentials;
use crate::error::HarvestError;
use crate::eutils::EUTILS_BASE;
use crate::utils::{with_retry, HttpClient, RequestPacer, RetryConfig, RetryOutcome};

/// Upper bound on ids requested per `esearch` page.
const ESEARCH_PAGE_SIZE: usize = 500;

/// Ordered search results plus the repository's total match count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHits {
    /// Accession ids in endpoint order, capped at the requested maximum.
    pub ids: Vec<String>,
    /// Total matches the repository reports for the query.
    pub total_available: u64,
}

/// Client for the PMC `esearch` endpoint.
///
/// Searches `db=pmc` directly rather than PubMed, so every hit has full
/// text by construction.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: HttpClient,
    pacer: Arc<RequestPacer>,
    credentials: Credentials,
    retry: RetryConfig,
    base_url: String,
}

impl SearchClient {
    pub fn new(http: HttpClient, pacer: Arc<RequestPacer>, credentials: Credentials) -> Self {
        Self {
            http,
            pacer,
            credentials,
            retry: RetryConfig::default(),
            base_url: EUTILS_BASE.to_string(),
        }
    }

    /// Override the endpoint base URL (for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Resolve `query` into at most `max_results` PMC ids.
    ///
    /// Pages through the endpoint until the cap is reached or the result
    /// set is drained. The reported total comes from the first page even
    /// when fewer ids are ultimately collected. Any page failing past the
    /// retry ceiling is fatal for the whole search.
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<SearchHits, HarvestError> {
        let mut ids: Vec<String> = Vec::new();
        let mut total_available = 0u64;
        let mut first_page = true;

        loop {
            let page_size = ESEARCH_PAGE_SIZE.min(max_results.saturating_sub(ids.len()));
            let page = self.fetch_page(query, ids.len(), page_size).await?;

            if first_page {
                total_available = page.total;
                first_page = false;
            }

            let drained = page.ids.len() < page_size || page_size == 0;
            ids.extend(page.ids);

            if ids.len() >= max_results || drained || ids.len() as u64 >= total_available {
                break;
            }
        }
        ids.truncate(max_results);

        tracing::info!(
            "esearch '{query}' matched {total_available} records, collected {}",
            ids.len()
        );
        Ok(SearchHits {
            ids,
            total_available,
        })
    }

    async fn fetch_page(
        &self,
        query: &str,
        retstart: usize,
        retmax: usize,
    ) -> Result<Page, HarvestError> {
        let url = format!("{}/esearch.fcgi", self.base_url);

        let outcome = with_retry(&self.retry, || {
            let url = url.clone();
            async move {
                self.pacer.acquire().await;

                let mut request = self
                    .http
                    .client()
                    .get(&url)
                    .query(&[("db", "pmc"), ("term", query), ("retmode", "json")])
                    .query(&[
                        ("retmax", retmax.to_string()),
                        ("retstart", retstart.to_string()),
                    ]);
                if let Some(key) = self.credentials.api_key() {
                    request = request.query(&[("api_key", key)]);
                }

                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(HarvestError::from_status(status, "esearch"));
                }

                let envelope: ESearchEnvelope = response
                    .json()
                    .await
                    .map_err(|e| HarvestError::Parse(format!("esearch JSON: {e}")))?;
                Ok(envelope.into_page())
            }
        })
        .await;

        match outcome {
            RetryOutcome::Success(page) => Ok(page),
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => Err(HarvestError::Search(format!(
                "esearch gave up after {attempts} attempts: {last_error}"
            ))),
            RetryOutcome::Permanent(error) => Err(HarvestError::Search(error.to_string())),
        }
    }
}

/// One decoded `esearch` page.
#[derive(Debug)]
struct Page {
    ids: Vec<String>,
    total: u64,
}

#[derive(Debug, Deserialize)]
struct ESearchEnvelope {
    esearchresult: ESearchResult,
}

// NCBI serializes the count as a JSON string.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ESearchResult {
    count: String,
    idlist: Vec<String>,
}

impl ESearchEnvelope {
    fn into_page(self) -> Page {
        let result = self.esearchresult;
        let total = result
            .count
            .parse::<u64>()
            .unwrap_or(result.idlist.len() as u64);
        Page {
            ids: result.idlist,
            total,
        }
    }
}
