//! Core data structures for harvested articles and run statistics.

mod article;
mod stats;

pub use article::{ArticleMetadata, ArticleRecord, OutputFormat, PmcId, SOURCE_TAG};
pub use stats::{DownloadStats, RunOutcome};
