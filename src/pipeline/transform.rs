//! Content transformation: make a fetched page renderable.
//!
//! Work is split into two synchronous passes around the asynchronous image
//! downloads, because DOM handles cannot be held across an `.await`:
//!
//! ```text
//! html ──▶ plan_images ──▶ (download + convert, async) ──▶ rewrite ──▶ html
//! ```
//!
//! 1. [`plan_images`] parses the page and lists every distinct `<img src>`.
//! 2. The caller resolves each planned image into an [`ImageOutcome`].
//! 3. [`rewrite`] parses the page again and applies the outcomes together
//!    with formula normalisation, `<base>` and MathJax injection.

use super::dom::{self, HtmlDocument};
use super::images::{self, ImageSource};
use super::math;
use crate::config::ConversionConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// One distinct image reference found in a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedImage {
    /// The `src` attribute exactly as written in the page.
    pub src: String,
    pub source: ImageSource,
    /// The reference names a WebP file (extension or data URI).
    pub webp_hint: bool,
}

/// What happened to one planned image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// Re-encoded; the new `src` value.
    Converted(String),
    /// The bytes are not WebP, or the source is not downloadable.
    Unchanged,
    /// Download or decode failed.
    Failed,
}

/// Counters describing what the transformer changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformReport {
    pub images_inspected: usize,
    pub webp_converted: usize,
    pub images_dropped: usize,
    pub sources_dropped: usize,
    pub formulas_normalised: usize,
    pub mathjax_injected: bool,
}

/// A page ready for the renderer.
#[derive(Debug, Clone)]
pub struct TransformedDocument {
    pub html: String,
    pub report: TransformReport,
}

/// List every distinct `<img src>` in document order.
pub fn plan_images(html: &str, base_url: &str) -> Vec<PlannedImage> {
    let doc = HtmlDocument::parse(html);
    let mut seen = std::collections::HashSet::new();
    let mut planned = Vec::new();

    for img in doc.elements_by_tag("img") {
        let Some(src) = dom::get_attr(&img, "src") else {
            continue;
        };
        if !seen.insert(src.clone()) {
            continue;
        }
        let source = images::resolve_image_source(&src, base_url);
        let webp_hint = images::references_webp(&src);
        planned.push(PlannedImage {
            src,
            source,
            webp_hint,
        });
    }

    debug!("Planned {} distinct images", planned.len());
    planned
}

/// Convert already-downloaded image bytes into an outcome.
pub fn outcome_for_bytes(bytes: &[u8], quality: u8, label: &str) -> ImageOutcome {
    if !images::is_webp(bytes) {
        return ImageOutcome::Unchanged;
    }
    match images::webp_to_jpeg_data_uri(bytes, quality) {
        Ok(uri) => {
            debug!("Converted WebP image: {}", truncate(label, 50));
            ImageOutcome::Converted(uri)
        }
        Err(e) => {
            warn!("Failed to convert WebP image {}: {}", truncate(label, 50), e);
            ImageOutcome::Failed
        }
    }
}

/// Apply image outcomes and formula handling, returning the final HTML.
///
/// `outcomes` is keyed by the raw `src` value. An image that names a WebP
/// file and has no `Converted` outcome is removed; any other image without
/// an entry is left alone. With `convert_webp` disabled the images are not
/// touched at all.
pub fn rewrite(
    html: &str,
    page_url: &str,
    outcomes: &HashMap<String, ImageOutcome>,
    config: &ConversionConfig,
) -> std::io::Result<TransformedDocument> {
    let doc = HtmlDocument::parse(html);
    let mut report = TransformReport::default();

    if config.convert_webp {
        rewrite_images(&doc, outcomes, &mut report);
    }

    // Normalised KaTeX is only visible once MathJax typesets it.
    let load_mathjax = math::wants_mathjax(&doc, config.mathjax);
    if load_mathjax {
        report.formulas_normalised = math::normalise_katex(&doc);
    }
    math::inject_base(&doc, page_url);
    if load_mathjax {
        math::inject_mathjax(&doc, &config.mathjax_url);
    }
    report.mathjax_injected = load_mathjax;

    Ok(TransformedDocument {
        html: doc.to_html()?,
        report,
    })
}

fn rewrite_images(
    doc: &HtmlDocument,
    outcomes: &HashMap<String, ImageOutcome>,
    report: &mut TransformReport,
) {
    for img in doc.elements_by_tag("img") {
        if let Some(srcset) = dom::get_attr(&img, "srcset") {
            if images::references_webp(&srcset) {
                dom::remove_attr(&img, "srcset");
            }
        }

        let Some(src) = dom::get_attr(&img, "src") else {
            continue;
        };
        report.images_inspected += 1;

        match outcomes.get(&src) {
            Some(ImageOutcome::Converted(uri)) => {
                dom::set_attr(&img, "src", uri);
                report.webp_converted += 1;
            }
            // Bytes were checked and are not WebP, whatever the name says.
            Some(ImageOutcome::Unchanged) => {}
            Some(ImageOutcome::Failed) | None if images::references_webp(&src) => {
                // Still WebP and nothing to replace it with.
                dom::detach(&img);
                report.images_dropped += 1;
            }
            Some(ImageOutcome::Failed) | None => {}
        }
    }

    // <picture><source type="image/webp" srcset=…> would win over the <img>.
    let webp_sources = doc.find_elements(|el| {
        el.tag() == "source"
            && (el
                .attr("type")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("image/webp"))
                || el.attr("srcset").is_some_and(|s| images::references_webp(&s))
                || el.attr("src").is_some_and(|s| images::references_webp(&s)))
    });
    for source in webp_sources {
        dom::detach(&source);
        report.sources_dropped += 1;
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((i, _)) => format!("{}...", &s[..i]),
        None => s.to_string(),
    }
}
