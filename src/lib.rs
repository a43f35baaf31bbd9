//! # url2pdf
//!
//! Convert a list of web pages into PDF files, one PDF per URL.
//!
//! ## Why this crate?
//!
//! `wkhtmltopdf` renders HTML through an old QtWebKit: WebP images come out as
//! broken boxes and formulas typeset by KaTeX or modern MathJax show up as raw
//! markup. This crate fetches each page itself, re-encodes WebP images as JPEG,
//! turns KaTeX output back into TeX and injects a MathJax 2 loader the old
//! engine can run, then hands the rewritten page to the renderer.
//!
//! ## Pipeline Overview
//!
//! ```text
//! urls.txt
//!  │
//!  ├─ 1. Input      one URL per line, blank lines skipped
//!  ├─ 2. Fetch      GET the page (browser UA, 30 s timeout, no retries)
//!  ├─ 3. Transform  WebP → JPEG data URIs, KaTeX → TeX, <base> + MathJax
//!  ├─ 4. Render     wkhtmltopdf temp.html tmp.pdf (subprocess, timeout)
//!  └─ 5. Output     atomic rename to output_pdfs/{host}_{path}.pdf
//! ```
//!
//! URLs are handled strictly in sequence. A failing URL is recorded and
//! skipped; the batch only aborts when nothing could possibly succeed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use url2pdf::{convert_batch, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .output_dir("pdfs")
//!         .build()?;
//!     let output = convert_batch("urls.txt", &config).await?;
//!     for (url, err) in output.failures() {
//!         eprintln!("{url}: {err}");
//!     }
//!     eprintln!("{}/{} converted", output.stats.succeeded, output.stats.total_urls);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `url2pdf` binary (clap + indicatif + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! url2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, MathJaxMode, OutputNaming, DEFAULT_MATHJAX_URL,
    DEFAULT_USER_AGENT,
};
pub use convert::{convert_batch, convert_batch_sync, convert_url, convert_urls, transform_html};
pub use error::{FetchError, RenderError, RendererErrorKind, Url2PdfError, UrlError};
pub use output::{BatchOutput, BatchStats, UrlResult};
pub use pipeline::input::{open_url_list, read_url_list};
pub use pipeline::render::{PageRenderer, WkhtmltopdfRenderer};
pub use pipeline::transform::{TransformReport, TransformedDocument};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
