//! Input reading: turn the URL list file into a sequence of URLs.
//!
//! The file is plain text, one URL per line. Lines are trimmed and blank
//! lines skipped; everything else is passed through untouched and left for
//! the fetcher to reject.

use crate::error::Url2PdfError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lazy iterator over the non-blank lines of a URL list.
pub struct UrlLines<R> {
    lines: std::io::Lines<R>,
    path: PathBuf,
}

impl<R: BufRead> UrlLines<R> {
    /// Wrap any buffered reader. `path` is only used in error messages.
    pub fn new(reader: R, path: impl Into<PathBuf>) -> Self {
        Self {
            lines: reader.lines(),
            path: path.into(),
        }
    }
}

impl<R: BufRead> Iterator for UrlLines<R> {
    type Item = Result<String, Url2PdfError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.lines.next()? {
                Ok(line) => {
                    let url = line.trim();
                    if !url.is_empty() {
                        return Some(Ok(url.to_string()));
                    }
                }
                Err(source) => {
                    return Some(Err(Url2PdfError::UrlListRead {
                        path: self.path.clone(),
                        source,
                    }))
                }
            }
        }
    }
}

/// Open a URL list for lazy reading.
///
/// Fails with [`Url2PdfError::FileNotFound`] or
/// [`Url2PdfError::PermissionDenied`] before any line is read.
pub fn open_url_list(path: impl AsRef<Path>) -> Result<UrlLines<BufReader<File>>, Url2PdfError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Url2PdfError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => Url2PdfError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Url2PdfError::UrlListRead {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    Ok(UrlLines::new(BufReader::new(file), path))
}

/// Read the whole URL list, in file order.
///
/// An empty list is fatal: there is nothing to convert.
pub fn read_url_list(path: impl AsRef<Path>) -> Result<Vec<String>, Url2PdfError> {
    let path = path.as_ref();
    let urls = open_url_list(path)?.collect::<Result<Vec<_>, _>>()?;
    if urls.is_empty() {
        return Err(Url2PdfError::EmptyUrlList {
            path: path.to_path_buf(),
        });
    }
    debug!("Read {} URLs from {}", urls.len(), path.display());
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn lines(text: &str) -> Vec<String> {
        UrlLines::new(Cursor::new(text.to_string()), "mem")
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn yields_one_entry_per_line_in_order() {
        let urls = lines("http://a.example/page1\nhttp://a.example/page2\nhttp://b.example/\n");
        assert_eq!(
            urls,
            vec![
                "http://a.example/page1",
                "http://a.example/page2",
                "http://b.example/"
            ]
        );
    }

    #[test]
    fn skips_blank_lines_and_trims() {
        let urls = lines("\n  http://a.example/x  \r\n\n\t\nhttp://a.example/y");
        assert_eq!(urls, vec!["http://a.example/x", "http://a.example/y"]);
    }

    #[test]
    fn malformed_lines_pass_through() {
        let urls = lines("not a url\nftp://x");
        assert_eq!(urls, vec!["not a url", "ftp://x"]);
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let err = read_url_list("/definitely/not/here/urls.txt").unwrap_err();
        assert!(matches!(err, Url2PdfError::FileNotFound { .. }), "got {err:?}");
    }

    #[test]
    fn empty_file_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "   ").unwrap();
        let err = read_url_list(f.path()).unwrap_err();
        assert!(matches!(err, Url2PdfError::EmptyUrlList { .. }));
    }

    #[test]
    fn reads_file_from_disk() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "http://a.example/page1\nhttp://a.example/page2\n").unwrap();
        let urls = read_url_list(f.path()).unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], "http://a.example/page1");
    }
}
