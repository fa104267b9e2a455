//! NCBI E-utilities clients for PMC search and full-text fetch.
//!
//! Both clients share one [`HttpClient`](crate::utils::HttpClient) and one
//! [`RequestPacer`](crate::utils::RequestPacer), so search pagination and
//! every per-record fetch attempt draw from the same global request budget.

mod fetch;
mod search;

pub use fetch::{FetchClient, FetchOutcome};
pub use search::{SearchClient, SearchHits};

/// E-utilities base URL.
pub const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
