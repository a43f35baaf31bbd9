//! Error types for the url2pdf library.
//!
//! Two layers of errors reflect two distinct failure modes:
//!
//! * [`Url2PdfError`]: **Fatal**, the batch cannot proceed at all (URL list
//!   missing, renderer not installed, output directory not writable).
//!   Returned as `Err(Url2PdfError)` from the top-level `convert*` functions.
//!
//! * [`UrlError`]: **Non-fatal**, a single URL failed (network error,
//!   renderer crash) but the rest of the batch is fine. Stored inside
//!   [`crate::output::UrlResult`] so callers see partial success instead of
//!   losing the whole batch to one bad page.
//!
//! [`FetchError`] and [`RenderError`] carry the stage-level detail and are
//! wrapped into [`UrlError`] by the batch driver.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the url2pdf library.
#[derive(Debug, Error)]
pub enum Url2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// URL list file was not found at the given path.
    #[error("URL list not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the URL list.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The URL list was opened but reading it failed part-way.
    #[error("Failed to read URL list '{path}': {source}")]
    UrlListRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The URL list contains no non-blank lines.
    #[error("No URLs found in '{path}'")]
    EmptyUrlList { path: PathBuf },

    // ── Renderer errors ───────────────────────────────────────────────────
    /// The HTML-to-PDF renderer could not be started.
    #[error(
        "PDF renderer '{binary}' is not available: {detail}\n\n\
Install wkhtmltopdf (https://wkhtmltopdf.org/downloads.html) or point\n\
--renderer / URL2PDF_RENDERER at an existing binary.\n"
    )]
    RendererNotFound { binary: String, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create the output directory.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every URL in the batch failed; nothing was written.
    #[error("All {total} URLs failed.\nFirst error: {first_error}")]
    AllUrlsFailed { total: usize, first_error: String },

    /// Some URLs succeeded but at least one failed.
    ///
    /// Returned by [`crate::output::BatchOutput::into_result`] when the
    /// caller wants to treat any URL failure as an error.
    #[error("{failed}/{total} URLs failed during conversion")]
    PartialFailure {
        succeeded: usize,
        failed: usize,
        total: usize,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A network failure while fetching a page or one of its images.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchError {
    /// The request exceeded the configured timeout.
    #[error("request to '{url}' timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    /// The server answered with a non-2xx status.
    #[error("'{url}' returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// DNS, TLS, connection or body-decoding failure.
    #[error("request to '{url}' failed: {reason}")]
    Request { url: String, reason: String },

    /// An image body grew past the configured size limit.
    #[error("image '{url}' exceeds the {limit} byte limit")]
    ImageTooLarge { url: String, limit: u64 },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, timeout_secs: u64, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else if let Some(status) = e.status() {
            FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

/// A failure of the external HTML-to-PDF renderer for one document.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum RendererErrorKind {
    /// The binary could not be spawned.
    #[error("could not start renderer: {0}")]
    Spawn(String),

    /// The renderer exited with a non-zero status.
    #[error("renderer exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    /// The renderer did not finish within the render timeout.
    #[error("renderer timed out after {0}s")]
    Timeout(u64),

    /// The renderer reported success but the output is not a PDF.
    #[error("renderer produced no PDF output ({0})")]
    InvalidOutput(String),
}

/// Renderer error annotated with the renderer's name.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{renderer}: {kind}")]
pub struct RenderError {
    pub renderer: String,
    pub kind: RendererErrorKind,
}

/// A non-fatal error for a single URL.
///
/// Stored alongside [`crate::output::UrlResult`] when a URL fails.
/// The batch continues with the next URL.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum UrlError {
    /// The page could not be downloaded.
    #[error("URL {index}: fetch failed: {source}")]
    Fetch {
        index: usize,
        #[source]
        source: FetchError,
    },

    /// The downloaded HTML could not be rewritten or serialised.
    #[error("URL {index}: transform failed: {detail}")]
    Transform { index: usize, detail: String },

    /// The renderer failed for this page.
    #[error("URL {index}: render failed: {source}")]
    Render {
        index: usize,
        #[source]
        source: RenderError,
    },

    /// The temporary HTML or the final PDF could not be written.
    #[error("URL {index}: failed to write '{path}': {detail}")]
    OutputWrite {
        index: usize,
        path: PathBuf,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_display() {
        let e = Url2PdfError::PartialFailure {
            succeeded: 9,
            failed: 1,
            total: 10,
        };
        let msg = e.to_string();
        assert!(msg.contains("1/10"), "got: {msg}");
    }

    #[test]
    fn file_not_found_mentions_path() {
        let e = Url2PdfError::FileNotFound {
            path: PathBuf::from("/nope/urls.txt"),
        };
        assert!(e.to_string().contains("/nope/urls.txt"));
    }

    #[test]
    fn renderer_not_found_display() {
        let e = Url2PdfError::RendererNotFound {
            binary: "wkhtmltopdf".into(),
            detail: "No such file or directory".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("wkhtmltopdf"));
        assert!(msg.contains("No such file"));
    }

    #[test]
    fn url_error_wraps_fetch_detail() {
        let e = UrlError::Fetch {
            index: 3,
            source: FetchError::HttpStatus {
                url: "http://a.example/x".into(),
                status: 404,
            },
        };
        let msg = e.to_string();
        assert!(msg.contains("URL 3"), "got: {msg}");
        assert!(msg.contains("404"), "got: {msg}");
    }

    #[test]
    fn render_error_display() {
        let e = RenderError {
            renderer: "wkhtmltopdf".into(),
            kind: RendererErrorKind::Exit {
                status: "exit status: 1".into(),
                stderr: "Exit with code 1 due to network error".into(),
            },
        };
        let msg = e.to_string();
        assert!(msg.starts_with("wkhtmltopdf:"));
        assert!(msg.contains("network error"));
    }

    #[test]
    fn url_error_serialises() {
        let e = UrlError::Render {
            index: 1,
            source: RenderError {
                renderer: "fake".into(),
                kind: RendererErrorKind::Timeout(5),
            },
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("Timeout"));
    }
}
