//! CLI binary for url2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;
use url2pdf::{
    convert_batch, BatchProgressCallback, ConversionConfig, MathJaxMode, OutputNaming,
    ProgressCallback, Url2PdfError,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback. Draws a bar when one is wanted and always
/// records failures for the closing summary.
struct CliProgressCallback {
    /// `None` with `--no-progress`, `--json` or `--quiet`.
    bar: Option<ProgressBar>,
    /// Wall-clock start of the URL currently being processed.
    started: Mutex<Option<Instant>>,
    succeeded: AtomicUsize,
    /// `(url, error)` per failed URL, in list order.
    failures: Mutex<Vec<(String, String)>>,
}

impl CliProgressCallback {
    fn new(show_bar: bool) -> Arc<Self> {
        let bar = show_bar.then(|| {
            let bar = ProgressBar::new(0);
            let style = ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} URLs  \
                 ⏱ {elapsed_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
            bar.set_style(style);
            bar.set_prefix("Converting");
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });

        Arc::new(Self {
            bar,
            started: Mutex::new(None),
            succeeded: AtomicUsize::new(0),
            failures: Mutex::new(Vec::new()),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.started
            .lock()
            .ok()
            .and_then(|mut s| s.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn println(&self, line: String) {
        if let Some(ref bar) = self.bar {
            bar.println(line);
        }
    }

    fn failures(&self) -> Vec<(String, String)> {
        self.failures
            .lock()
            .map(|f| f.clone())
            .unwrap_or_default()
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total: usize) {
        if let Some(ref bar) = self.bar {
            bar.set_length(total as u64);
            bar.reset_eta();
        }
        self.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total} URLs…"))
        ));
    }

    fn on_url_start(&self, _index: usize, _total: usize, url: &str) {
        if let Ok(mut started) = self.started.lock() {
            *started = Some(Instant::now());
        }
        if let Some(ref bar) = self.bar {
            bar.set_message(truncate(url, 60));
        }
    }

    fn on_url_complete(&self, index: usize, total: usize, _url: &str, pdf_path: &Path) {
        self.succeeded.fetch_add(1, Ordering::SeqCst);
        let secs = self.elapsed_secs();
        self.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            index,
            total,
            pdf_path.display(),
            dim(&format!("{secs:.1}s")),
        ));
        if let Some(ref bar) = self.bar {
            bar.inc(1);
        }
    }

    fn on_url_error(&self, index: usize, total: usize, url: &str, error: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push((url.to_string(), error.to_string()));
        }
        let secs = self.elapsed_secs();
        self.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&truncate(error, 80)),
            dim(&format!("{secs:.1}s")),
        ));
        if let Some(ref bar) = self.bar {
            bar.inc(1);
        }
    }

    fn on_batch_complete(&self, _total: usize, _succeeded: usize) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((i, _)) => format!("{}\u{2026}", &s[..i]),
        None => s.to_string(),
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert every URL in urls.txt into output_pdfs/
  url2pdf urls.txt

  # Custom output directory and a shorter JavaScript delay
  url2pdf urls.txt -o pdfs -d 3000

  # Only load MathJax on pages that contain formulas
  url2pdf urls.txt --mathjax detect

  # Name files page_1.pdf, page_2.pdf, ...
  url2pdf urls.txt --naming index

  # Machine-readable results, fail the run if any URL failed
  url2pdf urls.txt --json --strict > results.json

URL LIST FORMAT:
  One URL per line. Leading/trailing whitespace is trimmed and blank lines
  are skipped. URLs are processed in file order, one at a time.

ENVIRONMENT VARIABLES:
  Every option can also be set through URL2PDF_<OPTION>, e.g.
  URL2PDF_OUTPUT_DIR, URL2PDF_DELAY, URL2PDF_RENDERER.
  RUST_LOG overrides the log filter (e.g. RUST_LOG=url2pdf=debug).

SETUP:
  url2pdf shells out to wkhtmltopdf, which must be installed:
    Debian/Ubuntu:  apt install wkhtmltopdf
    macOS:          brew install --cask wkhtmltopdf
  or point --renderer at an existing binary.
"#;

/// Convert a list of web pages into PDF files.
#[derive(Parser, Debug)]
#[command(
    name = "url2pdf",
    version,
    about = "Convert a list of web pages into PDF files",
    long_about = "Fetch every URL listed in a text file, convert WebP images to JPEG, normalise \
math formulas for MathJax, and render each page to its own PDF with wkhtmltopdf.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Text file with one URL per line.
    url_file: PathBuf,

    /// Directory the PDFs are written to (created if missing).
    #[arg(short, long, env = "URL2PDF_OUTPUT_DIR", default_value = "output_pdfs")]
    output_dir: PathBuf,

    /// Milliseconds the renderer waits for page JavaScript (MathJax).
    #[arg(short, long, env = "URL2PDF_DELAY", default_value_t = 10_000)]
    delay: u64,

    /// Leave WebP images untouched.
    #[arg(long, env = "URL2PDF_NO_WEBP_CONVERT")]
    no_webp_convert: bool,

    /// JPEG quality for converted WebP images (1–100).
    #[arg(long, env = "URL2PDF_IMAGE_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    image_quality: u8,

    /// Skip images larger than this many bytes.
    #[arg(long, env = "URL2PDF_MAX_IMAGE_SIZE", default_value_t = 10 * 1024 * 1024)]
    max_image_size: u64,

    /// HTTP timeout per request, in seconds.
    #[arg(long, env = "URL2PDF_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Seconds before a hung renderer is killed.
    #[arg(long, env = "URL2PDF_RENDER_TIMEOUT", default_value_t = 300)]
    render_timeout: u64,

    /// User-Agent header for page and image requests.
    #[arg(long, env = "URL2PDF_USER_AGENT")]
    user_agent: Option<String>,

    /// HTML-to-PDF renderer binary.
    #[arg(long, env = "URL2PDF_RENDERER", default_value = "wkhtmltopdf")]
    renderer: PathBuf,

    /// When to inject the MathJax loader.
    #[arg(long, env = "URL2PDF_MATHJAX", value_enum, default_value = "always")]
    mathjax: MathJaxArg,

    /// How output files are named.
    #[arg(long, env = "URL2PDF_NAMING", value_enum, default_value = "url")]
    naming: NamingArg,

    /// Print the batch result as JSON on stdout.
    #[arg(long, env = "URL2PDF_JSON")]
    json: bool,

    /// Exit non-zero if any URL failed.
    #[arg(long, env = "URL2PDF_STRICT")]
    strict: bool,

    /// Disable progress bar.
    #[arg(long, env = "URL2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "URL2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "URL2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum MathJaxArg {
    Always,
    Detect,
    Never,
}

impl From<MathJaxArg> for MathJaxMode {
    fn from(v: MathJaxArg) -> Self {
        match v {
            MathJaxArg::Always => MathJaxMode::Always,
            MathJaxArg::Detect => MathJaxMode::Detect,
            MathJaxArg::Never => MathJaxMode::Never,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum NamingArg {
    /// {host}_{path}.pdf
    Url,
    /// page_{n}.pdf
    Index,
}

impl From<NamingArg> for OutputNaming {
    fn from(v: NamingArg) -> Self {
        match v {
            NamingArg::Url => OutputNaming::UrlDerived,
            NamingArg::Index => OutputNaming::Sequential,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress = CliProgressCallback::new(show_progress);
    let config = build_config(&cli, Arc::clone(&progress) as ProgressCallback)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let result = convert_batch(&cli.url_file, &config).await;

    if cli.quiet {
        // Failed URLs are errors, so `--quiet` still reports them.
        for line in quiet_failure_lines(&progress.failures()) {
            eprintln!("{line}");
        }
    } else {
        print_summary(&progress);
    }

    let output = match result {
        Ok(output) => output,
        Err(e @ Url2PdfError::AllUrlsFailed { .. }) => {
            return Err(e).context("No PDF was produced");
        }
        Err(e) => {
            return Err(e).with_context(|| {
                format!("Failed to convert URLs from {}", cli.url_file.display())
            });
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    }

    if !cli.quiet {
        eprintln!(
            "{}  {}/{} URLs  {}ms  →  {}",
            if output.stats.failed == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            output.stats.succeeded,
            output.stats.total_urls,
            output.stats.total_duration_ms,
            bold(&cli.output_dir.display().to_string()),
        );
        if output.stats.webp_converted > 0 {
            eprintln!(
                "   {} WebP images converted",
                dim(&output.stats.webp_converted.to_string())
            );
        }
    }

    if cli.strict {
        output.into_result().context("Strict mode")?;
    }

    Ok(())
}

/// Succeeded/failed counts and every failed URL with its error.
fn print_summary(progress: &CliProgressCallback) {
    let failures = progress.failures();
    let succeeded = progress.succeeded.load(Ordering::SeqCst);
    if succeeded == 0 && failures.is_empty() {
        // Fatal error before any URL was attempted.
        return;
    }

    eprintln!();
    eprintln!("{}", bold("Conversion Summary"));
    eprintln!("  Successful: {}", green(&succeeded.to_string()));
    eprintln!(
        "  Failed:     {}",
        if failures.is_empty() {
            "0".to_string()
        } else {
            red(&failures.len().to_string())
        }
    );
    if !failures.is_empty() {
        eprintln!();
        eprintln!("  Failed URLs:");
        for (url, error) in &failures {
            eprintln!("    {} {}", red("✗"), url);
            eprintln!("      {}", dim(error));
        }
    }
    eprintln!();
}

/// Plain `url: error` lines for `--quiet` runs.
fn quiet_failure_lines(failures: &[(String, String)]) -> Vec<String> {
    failures
        .iter()
        .map(|(url, error)| format!("{url}: {error}"))
        .collect()
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: ProgressCallback) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .output_dir(&cli.output_dir)
        .javascript_delay_ms(cli.delay)
        .convert_webp(!cli.no_webp_convert)
        .image_quality(cli.image_quality)
        .max_image_bytes(cli.max_image_size)
        .timeout_secs(cli.timeout)
        .render_timeout_secs(cli.render_timeout)
        .renderer_binary(&cli.renderer)
        .mathjax(cli.mathjax.into())
        .naming(cli.naming.into())
        .progress_callback(progress);

    if let Some(ref ua) = cli.user_agent {
        builder = builder.user_agent(ua.clone());
    }

    builder.build().context("Invalid configuration")
}
