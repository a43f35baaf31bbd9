//! Image helpers: resolve `<img>` sources and re-encode WebP as JPEG.
//!
//! The renderer's WebKit predates WebP, so WebP images come out as broken
//! boxes. Any image whose *bytes* are WebP (CDNs often serve WebP under a
//! `.jpg` name when the client advertises support) is decoded, flattened to
//! RGB and embedded back into the page as a `data:image/jpeg` URI.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;
use reqwest::Url;
use tracing::debug;

const DATA_WEBP_PREFIX: &str = "data:image/webp";

/// Where an `<img src>` points, after normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// An absolute http(s) URL to download.
    Remote(String),
    /// An inline `data:image/webp;base64,…` payload, already decoded.
    InlineWebp(Vec<u8>),
    /// Any other data URI or unsupported scheme; left as is.
    Skip,
}

/// Normalise an `<img src>` value against the page URL.
///
/// `//cdn/x.png` becomes `https://cdn/x.png`, relative paths are joined to
/// `base_url`, `data:` URIs are decoded only when they carry WebP.
pub fn resolve_image_source(src: &str, base_url: &str) -> ImageSource {
    let src = src.trim();
    if src.is_empty() {
        return ImageSource::Skip;
    }
    if src.starts_with("data:") {
        return match decode_webp_data_uri(src) {
            Some(bytes) => ImageSource::InlineWebp(bytes),
            None => ImageSource::Skip,
        };
    }
    if let Some(rest) = src.strip_prefix("//") {
        return ImageSource::Remote(format!("https://{rest}"));
    }

    match Url::parse(src) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => ImageSource::Remote(u.into()),
        Ok(_) => ImageSource::Skip,
        Err(_) => match Url::parse(base_url).and_then(|base| base.join(src)) {
            Ok(u) => ImageSource::Remote(u.into()),
            Err(_) => ImageSource::Skip,
        },
    }
}

fn decode_webp_data_uri(src: &str) -> Option<Vec<u8>> {
    let is_webp_uri = src
        .get(..DATA_WEBP_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(DATA_WEBP_PREFIX));
    if !is_webp_uri {
        return None;
    }
    let (meta, payload) = src.split_once(',')?;
    if !meta.to_ascii_lowercase().ends_with(";base64") {
        return None;
    }
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).ok()
}

/// True when a reference names a WebP file by extension or data URI.
///
/// Used for `srcset`/`<source>` values, which are never downloaded.
pub fn references_webp(value: &str) -> bool {
    let v = value.trim().to_ascii_lowercase();
    if v.starts_with(DATA_WEBP_PREFIX) {
        return true;
    }
    // srcset: "a.webp 1x, b.webp 2x"
    v.split(',').any(|candidate| {
        let url = candidate.split_whitespace().next().unwrap_or("");
        let path = url.split(['?', '#']).next().unwrap_or("");
        path.ends_with(".webp")
    })
}

/// Sniff the payload rather than trusting the URL or Content-Type.
pub fn is_webp(bytes: &[u8]) -> bool {
    matches!(image::guess_format(bytes), Ok(ImageFormat::WebP))
}

/// Decode WebP bytes and return a `data:image/jpeg;base64,…` URI.
pub fn webp_to_jpeg_data_uri(bytes: &[u8], quality: u8) -> Result<String, image::ImageError> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::WebP)?;
    let rgb = img.to_rgb8();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(&rgb)?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Re-encoded WebP {}x{} → {} bytes JPEG",
        rgb.width(),
        rgb.height(),
        buf.len()
    );
    Ok(format!("data:image/jpeg;base64,{b64}"))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    /// A tiny lossless WebP for tests.
    pub(crate) fn sample_webp() -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 3, Rgba([200, 10, 10, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::WebP)
            .expect("webp encode");
        buf
    }

    #[test]
    fn protocol_relative_becomes_https() {
        assert_eq!(
            resolve_image_source("//cdn.example/a.png", "http://a.example/p"),
            ImageSource::Remote("https://cdn.example/a.png".into())
        );
    }

    #[test]
    fn relative_is_joined_to_base() {
        assert_eq!(
            resolve_image_source("img/a.png", "http://a.example/dir/page.html"),
            ImageSource::Remote("http://a.example/dir/img/a.png".into())
        );
        assert_eq!(
            resolve_image_source("/a.png", "http://a.example/dir/page.html"),
            ImageSource::Remote("http://a.example/a.png".into())
        );
    }

    #[test]
    fn absolute_passes_through() {
        assert_eq!(
            resolve_image_source("https://x.example/a.webp", "http://a.example/"),
            ImageSource::Remote("https://x.example/a.webp".into())
        );
    }

    #[test]
    fn non_webp_data_uri_is_skipped() {
        assert_eq!(
            resolve_image_source("data:image/png;base64,AAAA", "http://a.example/"),
            ImageSource::Skip
        );
        assert_eq!(resolve_image_source("", "http://a.example/"), ImageSource::Skip);
    }

    #[test]
    fn webp_data_uri_is_decoded() {
        let webp = sample_webp();
        let uri = format!("data:image/webp;base64,{}", STANDARD.encode(&webp));
        assert_eq!(
            resolve_image_source(&uri, "http://a.example/"),
            ImageSource::InlineWebp(webp)
        );
    }

    #[test]
    fn detects_webp_references() {
        assert!(references_webp("a.webp"));
        assert!(references_webp("/img/a.WEBP?w=100"));
        assert!(references_webp("small.jpg 1x, big.webp 2x"));
        assert!(references_webp("data:image/webp;base64,xx"));
        assert!(!references_webp("a.png"));
        assert!(!references_webp("webp.png"));
    }

    #[test]
    fn sniffs_webp_bytes() {
        assert!(is_webp(&sample_webp()));
        assert!(!is_webp(b"\x89PNG\r\n\x1a\n0000"));
        assert!(!is_webp(b""));
    }

    #[test]
    fn converts_webp_to_jpeg_data_uri() {
        let uri = webp_to_jpeg_data_uri(&sample_webp(), 85).expect("convert");
        let b64 = uri
            .strip_prefix("data:image/jpeg;base64,")
            .expect("jpeg data uri");
        let jpeg = STANDARD.decode(b64).expect("valid base64");
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn garbage_is_not_converted() {
        assert!(webp_to_jpeg_data_uri(b"RIFF0000WEBPnope", 85).is_err());
    }
}
