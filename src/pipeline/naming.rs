//! Output file naming.
//!
//! URL-derived names follow `{host}_{path}.pdf`, with dots and colons in the
//! host and slashes in the path turned into underscores, e.g.
//! `http://a.example/docs/intro` → `a_example__docs_intro.pdf`.

use crate::config::OutputNaming;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::collections::HashSet;

/// Path part is cut to this many characters.
const MAX_PATH_CHARS: usize = 50;

static RE_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._%-]").unwrap());

/// Base file name for the URL at 1-based `index`.
pub fn file_name(url: &str, index: usize, naming: OutputNaming) -> String {
    match naming {
        OutputNaming::Sequential => format!("page_{index}.pdf"),
        OutputNaming::UrlDerived => url_derived_name(url, index),
    }
}

fn url_derived_name(url: &str, index: usize) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return format!("page_{index}.pdf");
    };
    let Some(host) = parsed.host_str() else {
        return format!("page_{index}.pdf");
    };

    let mut domain = host.replace([':', '.'], "_");
    if let Some(port) = parsed.port() {
        domain.push('_');
        domain.push_str(&port.to_string());
    }

    // http(s) URLs always parse with at least "/" as their path.
    let path = match parsed.path() {
        "" | "/" => format!("page_{index}"),
        raw => raw.replace('/', "_").chars().take(MAX_PATH_CHARS).collect(),
    };

    let name = format!("{domain}_{path}.pdf");
    RE_UNSAFE.replace_all(&name, "_").into_owned()
}

/// Hands out names, making repeats within one batch unique.
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name for the URL at `index`; a name already handed out gets
    /// `_{index}` appended before the extension, then `_{index}_{n}` with
    /// `n` counting from 2 until the name is free.
    pub fn allocate(&mut self, url: &str, index: usize, naming: OutputNaming) -> String {
        let name = file_name(url, index, naming);
        if self.used.insert(name.clone()) {
            return name;
        }
        let stem = name.strip_suffix(".pdf").unwrap_or(&name);
        let mut unique = format!("{stem}_{index}.pdf");
        let mut n = 2;
        while !self.used.insert(unique.clone()) {
            unique = format!("{stem}_{index}_{n}.pdf");
            n += 1;
        }
        unique
    }
}
