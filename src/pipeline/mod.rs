//! Pipeline stages for URL-to-PDF conversion.
//!
//! Each submodule implements one step, so the HTML rewriting can be tested
//! without a network and the renderer swapped without touching the rest.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ fetch ──▶ transform ──▶ render
//! (lines)   (HTTP)    (DOM edits)   (subprocess)
//!                       │
//!                       ├─ images  WebP sniffing + JPEG re-encode
//!                       ├─ math    KaTeX → TeX, <base>, MathJax loader
//!                       └─ dom     html5ever tree helpers
//! ```
//!
//! 1. [`input`]     : read the URL list, one URL per non-blank line
//! 2. [`fetch`]     : single-attempt page and image downloads
//! 3. [`transform`] : plan image downloads, then rewrite the page
//! 4. [`render`]    : run the HTML-to-PDF renderer per page
//!
//! [`naming`] maps each URL to its output file name.

pub mod dom;
pub mod fetch;
pub mod images;
pub mod input;
pub mod math;
pub mod naming;
pub mod render;
pub mod transform;
