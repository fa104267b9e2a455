//! Full-text retrieval via `efetch.fcgi` with bounded retry.

use std::sync::Arc;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::config::Credentials;
use crate::error::HarvestError;
use crate::eutils::EUTILS_BASE;
use crate::models::PmcId;
use crate::utils::{with_retry, HttpClient, RequestPacer, RetryConfig, RetryOutcome};

/// Terminal result of one record fetch.
///
/// Failures are values, not errors: a bad record must never abort the batch
/// it belongs to.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Raw JATS XML, byte-for-byte as served.
    Content(String),
    /// The repository will not serve this record (missing or embargoed).
    Unavailable(String),
    /// Transient failures persisted past the retry ceiling, or an
    /// unexpected non-retryable response.
    Failed { attempts: u32, error: HarvestError },
}

/// Client for the PMC `efetch` endpoint.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: HttpClient,
    pacer: Arc<RequestPacer>,
    credentials: Credentials,
    retry: RetryConfig,
    base_url: String,
}

impl FetchClient {
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

    /// Retrieve the full-text XML for one accession.
    ///
    /// Every attempt passes through the shared pacer, so retries of a
    /// failing record still count against the global request budget.
    /// Timeouts, 5xx, 429, and malformed bodies are retried with doubling
    /// backoff; a missing or embargoed record fails at once with no retry.
    pub async fn fetch(&self, id: &PmcId) -> FetchOutcome {
        let url = format!("{}/efetch.fcgi", self.base_url);

        let outcome = with_retry(&self.retry, || {
            let url = url.clone();
            async move {
                self.pacer.acquire().await;

                let mut request = self.http.client().get(&url).query(&[
                    ("db", "pmc"),
                    ("id", id.numeric()),
                    ("rettype", "full"),
                    ("retmode", "xml"),
                ]);
                if let Some(key) = self.credentials.api_key() {
                    request = request.query(&[("api_key", key)]);
                }

                let response = request.send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(HarvestError::from_status(status, &format!("efetch {id}")));
                }

                let body = response.text().await?;
                // An unavailable record still comes back as HTTP 200, with
                // the refusal embedded in the article set.
                if let Some(reason) = error_banner(&body) {
                    return Err(HarvestError::Unavailable(reason));
                }
                if !body.contains("<article") {
                    return Err(HarvestError::Parse(format!(
                        "efetch {id}: no <article> element in response"
                    )));
                }
                Ok(body)
            }
        })
        .await;

        match outcome {
            RetryOutcome::Success(xml) => FetchOutcome::Content(xml),
            RetryOutcome::Permanent(HarvestError::Unavailable(reason)) => {
                FetchOutcome::Unavailable(reason)
            }
            RetryOutcome::Permanent(HarvestError::NotFound(what)) => {
                FetchOutcome::Unavailable(what)
            }
            RetryOutcome::Permanent(error) => FetchOutcome::Failed { attempts: 1, error },
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => FetchOutcome::Failed {
                attempts,
                error: last_error,
            },
        }
    }
}

/// Extract the `<error>` banner PMC embeds in an otherwise-200 response
/// when a record is unavailable (withdrawn, embargoed, or unknown).
fn error_banner(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut in_error = false;
    let mut reason = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                if depth == 1 && name.as_ref() != b"pmc-articleset" {
                    return None;
                }
                if depth == 2 {
                    match name.as_ref() {
                        b"error" => in_error = true,
                        b"article" => return None,
                        _ => {}
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if depth == 1 && e.local_name().as_ref() == b"error" {
                    return Some("record not available".to_string());
                }
            }
            Ok(Event::Text(t)) if in_error => {
                reason.push_str(&t.unescape().unwrap_or_default());
            }
            Ok(Event::End(e)) => {
                if in_error && e.local_name().as_ref() == b"error" {
                    let reason = reason.trim();
                    return Some(if reason.is_empty() {
                        "record not available".to_string()
                    } else {
                        reason.to_string()
                    });
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => return None,
            Err(_) => return None,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_banner_detected() {
        let xml = r#"<?xml version="1.0"?>
<pmc-articleset>
  <error>The following PMCID is not available: 999</error>
</pmc-articleset>"#;
        assert_eq!(
            error_banner(xml).as_deref(),
            Some("The following PMCID is not available: 999")
        );
    }

    #[test]
    fn empty_error_banner_gets_generic_reason() {
        let xml = "<pmc-articleset><error/></pmc-articleset>";
        assert_eq!(error_banner(xml).as_deref(), Some("record not available"));
    }

    #[test]
    fn article_sets_are_not_banners() {
        let xml = "<pmc-articleset><article><front/></article></pmc-articleset>";
        assert!(error_banner(xml).is_none());
    }

    #[test]
    fn other_roots_are_not_banners() {
        assert!(error_banner("<article><front/></article>").is_none());
        assert!(error_banner("not xml at all").is_none());
    }
}
