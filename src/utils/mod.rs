//! HTTP, pacing, and retry utilities shared by the E-utilities clients.
//!
//! - [`HttpClient`]: reqwest wrapper with timeouts and the outbound identity
//! - [`RequestPacer`]: global minimum-interval pacing across all workers
//! - [`RetryConfig`] / [`with_retry`]: exponential backoff around one request

mod http;
mod limiter;
mod retry;

pub use http::{build_user_agent, HttpClient, DEFAULT_USER_AGENT};
pub use limiter::{RequestPacer, INTERVAL_NO_API_KEY, INTERVAL_WITH_API_KEY};
pub use retry::{with_retry, RetryConfig, RetryOutcome};
