//! PDF rendering: hand a transformed HTML file to an external renderer.
//!
//! The batch driver only sees the [`PageRenderer`] trait. The default
//! implementation, [`WkhtmltopdfRenderer`], spawns one `wkhtmltopdf` process
//! per page through `tokio::process` so a slow page never blocks the runtime
//! and a hung one can be killed when the render timeout fires.

use crate::config::ConversionConfig;
use crate::error::{RenderError, RendererErrorKind, Url2PdfError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

/// Keep this much of the renderer's stderr in error messages.
const STDERR_TAIL_CHARS: usize = 500;

/// Seconds allowed for the `--version` probe.
const PROBE_TIMEOUT_SECS: u64 = 30;

const PDF_MAGIC: &[u8] = b"%PDF";

/// Turns an HTML file on disk into a PDF file on disk.
///
/// Implement this to plug in another renderer or a test double, then pass it
/// via [`crate::ConversionConfigBuilder::renderer`].
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Called once before the batch starts. An error aborts the batch.
    async fn check_available(&self) -> Result<(), Url2PdfError> {
        Ok(())
    }

    /// Render `html_path` into `pdf_path`, overwriting it.
    async fn render(&self, html_path: &Path, pdf_path: &Path) -> Result<(), RenderError>;
}

/// Renders through the `wkhtmltopdf` command-line tool.
#[derive(Debug, Clone)]
pub struct WkhtmltopdfRenderer {
    binary: PathBuf,
    name: String,
    javascript_delay_ms: u64,
    timeout_secs: u64,
}

impl WkhtmltopdfRenderer {
    pub fn new(binary: impl Into<PathBuf>, javascript_delay_ms: u64, timeout_secs: u64) -> Self {
        let binary = binary.into();
        let name = binary
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| binary.display().to_string());
        Self {
            binary,
            name,
            javascript_delay_ms,
            timeout_secs: timeout_secs.max(1),
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(
            config.renderer_binary.clone(),
            config.javascript_delay_ms,
            config.render_timeout_secs,
        )
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn error(&self, kind: RendererErrorKind) -> RenderError {
        RenderError {
            renderer: self.name.clone(),
            kind,
        }
    }
}

#[async_trait]
impl PageRenderer for WkhtmltopdfRenderer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_available(&self) -> Result<(), Url2PdfError> {
        let not_found = |detail: String| Url2PdfError::RendererNotFound {
            binary: self.binary.display().to_string(),
            detail,
        };

        let mut cmd = self.command();
        cmd.arg("--version");
        let output = tokio::time::timeout(Duration::from_secs(PROBE_TIMEOUT_SECS), cmd.output())
            .await
            .map_err(|_| not_found(format!("'--version' did not finish in {PROBE_TIMEOUT_SECS}s")))?
            .map_err(|e| not_found(e.to_string()))?;

        if !output.status.success() {
            return Err(not_found(format!(
                "'--version' exited with {}: {}",
                output.status,
                stderr_tail(&output.stderr)
            )));
        }
        debug!(
            "Renderer available: {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }

    async fn render(&self, html_path: &Path, pdf_path: &Path) -> Result<(), RenderError> {
        let mut cmd = self.command();
        cmd.arg("--javascript-delay")
            .arg(self.javascript_delay_ms.to_string())
            .arg("--no-stop-slow-scripts")
            .arg("--enable-local-file-access")
            .arg("--quiet")
            .arg(html_path)
            .arg(pdf_path);

        debug!(
            "Running {} on {} → {}",
            self.name,
            html_path.display(),
            pdf_path.display()
        );

        // On timeout the output future is dropped, and kill_on_drop reaps the child.
        let output = tokio::time::timeout(Duration::from_secs(self.timeout_secs), cmd.output())
            .await
            .map_err(|_| self.error(RendererErrorKind::Timeout(self.timeout_secs)))?
            .map_err(|e| self.error(RendererErrorKind::Spawn(e.to_string())))?;

        if !output.status.success() {
            return Err(self.error(RendererErrorKind::Exit {
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            }));
        }
        Ok(())
    }
}

/// Check that `path` exists and starts with the PDF header.
pub(crate) async fn ensure_pdf_output(path: &Path) -> Result<(), RendererErrorKind> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| RendererErrorKind::InvalidOutput(e.to_string()))?;
    let mut head = [0u8; 4];
    file.read_exact(&mut head)
        .await
        .map_err(|_| RendererErrorKind::InvalidOutput("file is empty or truncated".into()))?;
    if &head[..] != PDF_MAGIC {
        return Err(RendererErrorKind::InvalidOutput(
            "file does not start with %PDF".into(),
        ));
    }
    Ok(())
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    let count = text.chars().count();
    if count <= STDERR_TAIL_CHARS {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - STDERR_TAIL_CHARS).collect();
    format!("...{tail}")
}
