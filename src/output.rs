//! Result types returned by the batch entry points.

use crate::error::{Url2PdfError, UrlError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of converting one URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlResult {
    /// 1-based position in the URL list.
    pub index: usize,
    pub url: String,
    /// Where the PDF was written. `None` when `error` is set.
    pub output_path: Option<PathBuf>,
    pub error: Option<UrlError>,
    /// WebP images that were re-encoded as JPEG for this page.
    pub webp_converted: usize,
    pub duration_ms: u64,
}

impl UrlResult {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.output_path.is_some()
    }
}

/// Aggregate counters for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_urls: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub webp_converted: usize,
    pub total_duration_ms: u64,
}

/// Everything a batch produced, in URL-list order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    pub results: Vec<UrlResult>,
    pub stats: BatchStats,
}

impl BatchOutput {
    pub(crate) fn from_results(results: Vec<UrlResult>, total_duration_ms: u64) -> Self {
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let stats = BatchStats {
            total_urls: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            webp_converted: results.iter().map(|r| r.webp_converted).sum(),
            total_duration_ms,
        };
        Self { results, stats }
    }

    /// Results that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &UrlError)> {
        self.results
            .iter()
            .filter_map(|r| r.error.as_ref().map(|e| (r.url.as_str(), e)))
    }

    /// Treat any failed URL as an error.
    pub fn into_result(self) -> Result<Self, Url2PdfError> {
        if self.stats.failed == 0 {
            Ok(self)
        } else {
            Err(Url2PdfError::PartialFailure {
                succeeded: self.stats.succeeded,
                failed: self.stats.failed,
                total: self.stats.total_urls,
            })
        }
    }
}
