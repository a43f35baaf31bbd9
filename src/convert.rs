//! Batch conversion entry points.
//!
//! URLs are processed strictly one after another: fetch, transform, render,
//! then the next URL. A failing URL is logged and recorded in its
//! [`UrlResult`]; only problems that make every URL fail up front (missing
//! URL list, missing renderer, unwritable output directory) abort the batch.

use crate::config::ConversionConfig;
use crate::error::{RenderError, Url2PdfError, UrlError};
use crate::output::{BatchOutput, UrlResult};
use crate::pipeline::fetch::Fetcher;
use crate::pipeline::images::ImageSource;
use crate::pipeline::input;
use crate::pipeline::naming::{self, NameAllocator};
use crate::pipeline::render::{self, PageRenderer, WkhtmltopdfRenderer};
use crate::pipeline::transform::{self, ImageOutcome, TransformedDocument};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert every URL listed in `url_file` into a PDF.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(BatchOutput)` once every URL has been attempted, even if some failed
/// (check `output.stats.failed`).
///
/// # Errors
/// Returns `Err(Url2PdfError)` only for fatal errors:
/// - URL list missing, unreadable or empty
/// - Renderer not installed
/// - Output directory cannot be created
/// - Every URL failed
pub async fn convert_batch(
    url_file: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<BatchOutput, Url2PdfError> {
    let path = url_file.as_ref();
    info!("Reading URL list: {}", path.display());
    let urls = input::read_url_list(path)?;
    info!("Found {} URLs to process", urls.len());
    convert_urls(&urls, config).await
}

/// Convert an in-memory list of URLs, in order.
///
/// Output names are allocated per call, so two URLs that map to the same
/// file name in one list never overwrite each other.
pub async fn convert_urls<S: AsRef<str>>(
    urls: &[S],
    config: &ConversionConfig,
) -> Result<BatchOutput, Url2PdfError> {
    let total_start = Instant::now();
    let total = urls.len();
    if total == 0 {
        return Ok(BatchOutput::from_results(Vec::new(), 0));
    }

    let batch = Batch::prepare(config).await?;
    let mut names = NameAllocator::new();
    let mut results = Vec::with_capacity(total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    for (i, url) in urls.iter().enumerate() {
        let url = url.as_ref();
        let index = i + 1;
        info!("Processing URL {}/{}: {}", index, total, url);

        if let Some(ref cb) = config.progress_callback {
            cb.on_url_start(index, total, url);
        }

        let file_name = names.allocate(url, index, config.naming);
        let result = batch.convert_one(url, index, &file_name).await;

        if let Some(ref cb) = config.progress_callback {
            match (&result.output_path, &result.error) {
                (Some(pdf), None) => cb.on_url_complete(index, total, url, pdf),
                (_, Some(e)) => cb.on_url_error(index, total, url, &e.to_string()),
                (None, None) => {}
            }
        }
        results.push(result);
    }

    let output = BatchOutput::from_results(results, total_start.elapsed().as_millis() as u64);
    info!(
        "Batch complete: {}/{} URLs converted, {}ms total",
        output.stats.succeeded, output.stats.total_urls, output.stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, output.stats.succeeded);
    }

    if output.stats.succeeded == 0 {
        let first_error = output
            .failures()
            .next()
            .map(|(_, e)| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(Url2PdfError::AllUrlsFailed { total, first_error });
    }

    Ok(output)
}

/// Convert a single URL. `index` is its 1-based position, used for naming.
///
/// A per-URL failure is reported inside the returned [`UrlResult`]; `Err` is
/// reserved for the same fatal conditions as [`convert_batch`].
pub async fn convert_url(
    url: &str,
    index: usize,
    config: &ConversionConfig,
) -> Result<UrlResult, Url2PdfError> {
    let batch = Batch::prepare(config).await?;
    let file_name = naming::file_name(url, index, config.naming);
    Ok(batch.convert_one(url, index, &file_name).await)
}

/// Synchronous wrapper around [`convert_batch`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_batch_sync(
    url_file: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<BatchOutput, Url2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Url2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_batch(url_file, config))
}

/// Rewrite an already-fetched page the way the batch does before rendering.
///
/// Images are downloaded with the same client settings as a batch run.
pub async fn transform_html(
    html: &str,
    page_url: &str,
    config: &ConversionConfig,
) -> Result<TransformedDocument, Url2PdfError> {
    let fetcher = Fetcher::new(config).map_err(|e| Url2PdfError::Internal(e.to_string()))?;
    transform_page(&fetcher, html, page_url, config)
        .await
        .map_err(|e| Url2PdfError::Internal(format!("Failed to serialise HTML: {e}")))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Everything shared by the URLs of one batch.
struct Batch<'a> {
    config: &'a ConversionConfig,
    fetcher: Fetcher,
    renderer: Arc<dyn PageRenderer>,
}

impl<'a> Batch<'a> {
    /// Run the fatal checks: renderer available, output directory writable.
    async fn prepare(config: &'a ConversionConfig) -> Result<Self, Url2PdfError> {
        let renderer = resolve_renderer(config);
        renderer.check_available().await?;

        tokio::fs::create_dir_all(&config.output_dir)
            .await
            .map_err(|e| Url2PdfError::OutputDirFailed {
                path: config.output_dir.clone(),
                source: e,
            })?;

        let fetcher = Fetcher::new(config).map_err(|e| Url2PdfError::Internal(e.to_string()))?;
        Ok(Self {
            config,
            fetcher,
            renderer,
        })
    }

    async fn convert_one(&self, url: &str, index: usize, file_name: &str) -> UrlResult {
        let start = Instant::now();
        let target = self.config.output_dir.join(file_name);

        let (output_path, error, webp_converted) = match self.process(url, index, &target).await {
            Ok(webp_converted) => {
                info!("Created PDF: {}", target.display());
                (Some(target), None, webp_converted)
            }
            Err(e) => {
                warn!("Failed to process {}: {}", url, e);
                (None, Some(e), 0)
            }
        };

        UrlResult {
            index,
            url: url.to_string(),
            output_path,
            error,
            webp_converted,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Fetch, transform and render one page. Returns the WebP conversion count.
    async fn process(&self, url: &str, index: usize, target: &Path) -> Result<usize, UrlError> {
        let html = self
            .fetcher
            .fetch_page(url)
            .await
            .map_err(|source| UrlError::Fetch { index, source })?;

        let doc = transform_page(&self.fetcher, &html, url, self.config)
            .await
            .map_err(|e| UrlError::Transform {
                index,
                detail: e.to_string(),
            })?;
        debug!("Transform report for {}: {:?}", url, doc.report);

        self.render_to_file(&doc.html, index, target).await?;
        Ok(doc.report.webp_converted)
    }

    /// Render through temporary files and move the PDF into place only once
    /// it is known to be valid.
    async fn render_to_file(&self, html: &str, index: usize, target: &Path) -> Result<(), UrlError> {
        let write_err = |path: &Path, e: std::io::Error| UrlError::OutputWrite {
            index,
            path: path.to_path_buf(),
            detail: e.to_string(),
        };

        let html_file = tempfile::Builder::new()
            .prefix("url2pdf-")
            .suffix(".html")
            .tempfile()
            .map_err(|e| write_err(&std::env::temp_dir(), e))?;
        tokio::fs::write(html_file.path(), html)
            .await
            .map_err(|e| write_err(html_file.path(), e))?;

        let pdf_file = tempfile::Builder::new()
            .prefix(".url2pdf-")
            .suffix(".pdf")
            .tempfile_in(&self.config.output_dir)
            .map_err(|e| write_err(&self.config.output_dir, e))?;

        self.renderer
            .render(html_file.path(), pdf_file.path())
            .await
            .map_err(|source| UrlError::Render { index, source })?;

        render::ensure_pdf_output(pdf_file.path())
            .await
            .map_err(|kind| UrlError::Render {
                index,
                source: RenderError {
                    renderer: self.renderer.name().to_string(),
                    kind,
                },
            })?;

        pdf_file
            .persist(target)
            .map_err(|e| write_err(target, e.error))?;
        Ok(())
    }
}

/// Use the injected renderer, or build one from the config.
fn resolve_renderer(config: &ConversionConfig) -> Arc<dyn PageRenderer> {
    match config.renderer {
        Some(ref renderer) => Arc::clone(renderer),
        None => Arc::new(WkhtmltopdfRenderer::from_config(config)),
    }
}

/// Download and convert the page's images, then rewrite the page.
async fn transform_page(
    fetcher: &Fetcher,
    html: &str,
    page_url: &str,
    config: &ConversionConfig,
) -> std::io::Result<TransformedDocument> {
    let mut outcomes = HashMap::new();

    if config.convert_webp {
        for planned in transform::plan_images(html, page_url) {
            let outcome = match &planned.source {
                ImageSource::Remote(image_url) => {
                    match fetcher.fetch_image(image_url, page_url).await {
                        Ok(bytes) => {
                            transform::outcome_for_bytes(&bytes, config.image_quality, image_url)
                        }
                        Err(e) => {
                            if planned.webp_hint {
                                warn!("Failed to fetch WebP image {}: {}", image_url, e);
                            } else {
                                debug!("Failed to fetch image {}: {}", image_url, e);
                            }
                            ImageOutcome::Failed
                        }
                    }
                }
                ImageSource::InlineWebp(bytes) => {
                    transform::outcome_for_bytes(bytes, config.image_quality, "inline WebP")
                }
                // An undecodable WebP data URI must still go.
                ImageSource::Skip if planned.webp_hint => ImageOutcome::Failed,
                ImageSource::Skip => ImageOutcome::Unchanged,
            };
            outcomes.insert(planned.src, outcome);
        }
    }

    let doc = transform::rewrite(html, page_url, &outcomes, config)?;
    if doc.report.webp_converted > 0 {
        info!(
            "Converted {} WebP images on {}",
            doc.report.webp_converted, page_url
        );
    }
    Ok(doc)
}
