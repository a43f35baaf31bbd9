//! Configuration types for URL-to-PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Every knob lives in one struct so the
//! CLI, the library entry points and the tests all share the same defaults.

use crate::error::Url2PdfError;
use crate::pipeline::render::PageRenderer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Browser-like User-Agent sent with every request by default.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// MathJax 2.x loader injected into every page.
///
/// wkhtmltopdf ships an old QtWebKit without MathML or KaTeX font support;
/// MathJax 2 with the CommonHTML output is the last release it can run.
pub const DEFAULT_MATHJAX_URL: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/mathjax/2.7.9/MathJax.js?config=TeX-MML-AM_CHTML";

/// Configuration for a URL-list-to-PDF batch.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use url2pdf::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .output_dir("pdfs")
///     .image_quality(90)
///     .javascript_delay_ms(2000)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Directory the PDFs are written to. Created if missing. Default: `output_pdfs`.
    pub output_dir: PathBuf,

    /// How output file names are derived. Default: [`OutputNaming::UrlDerived`].
    pub naming: OutputNaming,

    /// User-Agent header for page and image requests.
    pub user_agent: String,

    /// Per-request HTTP timeout in seconds. Default: 30.
    pub timeout_secs: u64,

    /// Convert WebP images to JPEG data URIs. Default: true.
    ///
    /// When false the HTML is still parsed and re-serialised, but images are
    /// left exactly as the page references them.
    pub convert_webp: bool,

    /// JPEG quality for converted WebP images. Range: 1–100. Default: 85.
    pub image_quality: u8,

    /// Images larger than this are not downloaded. Default: 10 MiB.
    pub max_image_bytes: u64,

    /// When to inject the MathJax loader. Default: [`MathJaxMode::Always`].
    pub mathjax: MathJaxMode,

    /// MathJax script URL. Default: [`DEFAULT_MATHJAX_URL`].
    pub mathjax_url: String,

    /// Renderer binary used when no [`Self::renderer`] is injected. Default: `wkhtmltopdf`.
    pub renderer_binary: PathBuf,

    /// Milliseconds the renderer waits for page scripts (MathJax) to finish. Default: 10 000.
    pub javascript_delay_ms: u64,

    /// Seconds before a hung renderer process is killed. Default: 300.
    pub render_timeout_secs: u64,

    /// Pre-constructed renderer. Takes precedence over `renderer_binary`.
    pub renderer: Option<Arc<dyn PageRenderer>>,

    /// Optional per-URL progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output_pdfs"),
            naming: OutputNaming::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            convert_webp: true,
            image_quality: 85,
            max_image_bytes: 10 * 1024 * 1024,
            mathjax: MathJaxMode::default(),
            mathjax_url: DEFAULT_MATHJAX_URL.to_string(),
            renderer_binary: PathBuf::from("wkhtmltopdf"),
            javascript_delay_ms: 10_000,
            render_timeout_secs: 300,
            renderer: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("output_dir", &self.output_dir)
            .field("naming", &self.naming)
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .field("convert_webp", &self.convert_webp)
            .field("image_quality", &self.image_quality)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("mathjax", &self.mathjax)
            .field("renderer_binary", &self.renderer_binary)
            .field("javascript_delay_ms", &self.javascript_delay_ms)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("renderer", &self.renderer.as_ref().map(|r| r.name().to_string()))
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn naming(mut self, naming: OutputNaming) -> Self {
        self.config.naming = naming;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs.max(1);
        self
    }

    pub fn convert_webp(mut self, v: bool) -> Self {
        self.config.convert_webp = v;
        self
    }

    pub fn image_quality(mut self, q: u8) -> Self {
        self.config.image_quality = q.clamp(1, 100);
        self
    }

    pub fn max_image_bytes(mut self, n: u64) -> Self {
        self.config.max_image_bytes = n;
        self
    }

    pub fn mathjax(mut self, mode: MathJaxMode) -> Self {
        self.config.mathjax = mode;
        self
    }

    pub fn mathjax_url(mut self, url: impl Into<String>) -> Self {
        self.config.mathjax_url = url.into();
        self
    }

    pub fn renderer_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.renderer_binary = path.into();
        self
    }

    pub fn javascript_delay_ms(mut self, ms: u64) -> Self {
        self.config.javascript_delay_ms = ms;
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs.max(1);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Url2PdfError> {
        let c = &self.config;
        if c.image_quality == 0 || c.image_quality > 100 {
            return Err(Url2PdfError::InvalidConfig(format!(
                "Image quality must be 1–100, got {}",
                c.image_quality
            )));
        }
        if c.max_image_bytes == 0 {
            return Err(Url2PdfError::InvalidConfig(
                "Maximum image size must be > 0 bytes".into(),
            ));
        }
        if c.output_dir.as_os_str().is_empty() {
            return Err(Url2PdfError::InvalidConfig(
                "Output directory must not be empty".into(),
            ));
        }
        if c.renderer.is_none() && c.renderer_binary.as_os_str().is_empty() {
            return Err(Url2PdfError::InvalidConfig(
                "Renderer binary must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How the output PDF for each URL is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputNaming {
    /// `{host}_{path}.pdf`, derived from the URL (default).
    #[default]
    UrlDerived,
    /// `page_{index}.pdf`, by 1-based position in the URL list.
    Sequential,
}

/// When the MathJax loader is injected into a page.
///
/// | Mode | Behaviour |
/// |------|-----------|
/// | `Always` | every page gets the loader (default) |
/// | `Detect` | only pages with math markup or TeX delimiters |
/// | `Never`  | pages are rendered as fetched |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MathJaxMode {
    #[default]
    Always,
    Detect,
    Never,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = ConversionConfig::default();
        assert_eq!(c.output_dir, PathBuf::from("output_pdfs"));
        assert_eq!(c.timeout_secs, 30);
        assert_eq!(c.image_quality, 85);
        assert_eq!(c.javascript_delay_ms, 10_000);
        assert_eq!(c.max_image_bytes, 10 * 1024 * 1024);
        assert!(c.convert_webp);
        assert_eq!(c.mathjax, MathJaxMode::Always);
        assert_eq!(c.naming, OutputNaming::UrlDerived);
        assert_eq!(c.renderer_binary, PathBuf::from("wkhtmltopdf"));
    }

    #[test]
    fn builder_clamps_quality() {
        let c = ConversionConfig::builder().image_quality(0).build().unwrap();
        assert_eq!(c.image_quality, 1);
        let c = ConversionConfig::builder()
            .image_quality(250)
            .build()
            .unwrap();
        assert_eq!(c.image_quality, 100);
    }

    #[test]
    fn builder_rejects_zero_image_limit() {
        let err = ConversionConfig::builder()
            .max_image_bytes(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, Url2PdfError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_empty_output_dir() {
        let err = ConversionConfig::builder()
            .output_dir("")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Output directory"));
    }

    #[test]
    fn debug_does_not_require_renderer_debug() {
        let c = ConversionConfig::default();
        let s = format!("{c:?}");
        assert!(s.contains("output_pdfs"));
    }
}
