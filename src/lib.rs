//! # pmc-harvest
//!
//! Search PubMed Central and download full-text articles as structured JSON.
//!
//! The crate drives the NCBI E-utilities API end to end: a paginated
//! `esearch` resolves a free-text query into PMC accession ids, a bounded
//! worker pool fetches each article's JATS XML through a shared rate
//! limiter, tolerant extraction pulls structured metadata out of the markup,
//! and every record is written atomically as one self-contained JSON
//! artifact, skipping anything already on disk.
//!
//! ## Architecture
//!
//! - [`models`]: Core data structures (ArticleRecord, DownloadStats, ...)
//! - [`eutils`]: E-utilities search and fetch clients
//! - [`extract`]: JATS metadata extraction and plain-text conversion
//! - [`storage`]: Slugged namespaces and atomic artifact writes
//! - [`download`]: The orchestrator tying search, fetch, and storage together
//! - [`utils`]: HTTP client, request pacing, retry with backoff
//! - [`config`]: Configuration management
//!
//! ## Example
//!
//! ```no_run
//! use pmc_harvest::config::Config;
//! use pmc_harvest::download::{Harvester, RunOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let harvester = Harvester::new(&config)?;
//! let stats = harvester
//!     .run(&RunOptions::new("frailty cytokines").max_results(50))
//!     .await?;
//! println!("downloaded {} articles", stats.successful);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod download;
pub mod error;
pub mod eutils;
pub mod extract;
pub mod models;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use download::{Harvester, RunOptions};
pub use error::HarvestError;
pub use models::{ArticleMetadata, ArticleRecord, DownloadStats, OutputFormat};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
