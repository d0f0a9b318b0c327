//! CLI binary for evrak-jpeg.
//!
//! A thin shim over the library crate: reads the files named on the command
//! line, runs them through the batch driver, and writes the JPEGs under
//! names built from the applicant's first and last name.

use anyhow::{Context, Result};
use clap::Parser;
use evrak_jpeg::naming::{self, DOCUMENT_SLOTS};
use evrak_jpeg::{
    convert_batch, BatchOptions, BatchStats, BiometricConfig, ConversionProgressCallback,
    ErrorKind, MediaKind, ProgressCallback, RenderConfig, Slot, SlotError, SourceDocument,
    TargetSize,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

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

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per finished slot. Slots may finish
/// out of order when `--concurrency` is above 1.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<String, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:32.green/238}] {pos:>2}/{len} files  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(SPINNER);

        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, key: &str) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(key))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_slots: usize) {
        self.bar.set_length(total_slots as u64);
        self.bar.reset_eta();
    }

    fn on_slot_start(&self, key: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(key.to_string(), Instant::now());
        }
        self.bar.set_message(key.to_string());
    }

    fn on_slot_complete(&self, key: &str, output_len: usize) {
        let secs = self.elapsed_secs(key);
        self.bar.println(format!(
            "  {} {:<16}  {}  {}",
            green("✓"),
            key,
            dim(&format!("{:>7} KB", output_len / 1024)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_slot_error(&self, key: &str, error: &SlotError) {
        let secs = self.elapsed_secs(key);

        let first_line = error.message.lines().next().unwrap_or_default();
        let msg: String = if first_line.chars().count() > 80 {
            first_line.chars().take(79).chain(['\u{2026}']).collect()
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} {:<16}  {}  {}",
            red("✗"),
            key,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _total_slots: usize, _succeeded: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Three application documents, first page of each
  evrak2jpeg --first-name Ayşe --last-name Yılmaz \
    --doc sabika_kaydi=sabika.pdf --doc diploma=diploma.pdf \
    --doc saglik_raporu=rapor.pdf -o out/

  # Portrait photo at 50x60 mm, keeping the original background
  evrak2jpeg --first-name Ayşe --last-name Yılmaz \
    --photo foto.jpg --size 50x60 --no-whiten

  # Machine-readable summary
  evrak2jpeg --first-name Ali --last-name Veli --doc diploma=d.pdf --json

OUTPUT NAMES:
  <first>_<last>_<slot>.jpeg               one per --doc
  <first>_<last>_biyometrik_<size>.jpeg    for --photo

  Known slots: sabika_kaydi, diploma, saglik_raporu

BACKGROUND WHITENING:
  --photo replaces the background with white by default, which needs a
  segmentation model. The default build ships none, so either pass
  --no-whiten or build with `--features onnx` and pass
  --segmentation-model model.onnx. Without either, the photo fails with
  "segmentation unavailable" and the exit code is non-zero.

PHOTO SIZES (300 DPI):
  35x45   413 × 531 px (default)
  50x60   591 × 709 px

ENVIRONMENT VARIABLES:
  EVRAK_FIRST_NAME, EVRAK_LAST_NAME, EVRAK_PHOTO, EVRAK_SIZE, ...
                          Fallbacks for the matching flags
  PDFIUM_LIB_PATH         Path to libpdfium, or the directory holding it
  RUST_LOG                Override the log filter

SETUP:
  PDF rendering needs the pdfium shared library. Prebuilt binaries:
    https://github.com/bblanchon/pdfium-binaries/releases
  Put it next to the working directory, install it system-wide, or set
  PDFIUM_LIB_PATH. Photos do not need pdfium.
"#;

/// Convert application documents and a portrait photo to JPEG.
#[derive(Parser, Debug)]
#[command(
    name = "evrak2jpeg",
    version,
    about = "Convert application PDFs and a portrait photo to uniformly named JPEGs",
    long_about = "Render the first page of each PDF document to JPEG and normalize a portrait \
photo to a standard photo-ID size, naming every output after the applicant.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Document slot and PDF path, e.g. `diploma=./diploma.pdf` (repeatable).
    #[arg(long = "doc", value_name = "KEY=PATH", value_parser = parse_doc_arg)]
    docs: Vec<DocArg>,

    /// Portrait photo to normalize.
    #[arg(long, env = "EVRAK_PHOTO")]
    photo: Option<PathBuf>,

    /// Applicant's first name, used in output file names.
    #[arg(long, env = "EVRAK_FIRST_NAME")]
    first_name: String,

    /// Applicant's last name, used in output file names.
    #[arg(long, env = "EVRAK_LAST_NAME")]
    last_name: String,

    /// Page render scale relative to the PDF's size in points.
    #[arg(long, env = "EVRAK_SCALE", default_value_t = evrak_jpeg::DEFAULT_SCALE)]
    scale: f32,

    /// JPEG quality in (0, 1].
    #[arg(long, env = "EVRAK_QUALITY", default_value_t = evrak_jpeg::DEFAULT_QUALITY)]
    quality: f32,

    /// Photo size label: 35x45 or 50x60. Unknown labels fall back to 35x45.
    #[arg(long, env = "EVRAK_SIZE", default_value = "35x45")]
    size: String,

    /// Keep the photo's background instead of replacing it with white.
    #[arg(long, env = "EVRAK_NO_WHITEN")]
    no_whiten: bool,

    /// ONNX selfie-segmentation model used for background whitening.
    #[cfg(feature = "onnx")]
    #[arg(long, env = "EVRAK_SEGMENTATION_MODEL")]
    segmentation_model: Option<PathBuf>,

    /// Segmentation model input layout.
    #[cfg(feature = "onnx")]
    #[arg(long, env = "EVRAK_MODEL_VARIANT", value_enum, default_value = "general")]
    model_variant: VariantArg,

    /// Directory the JPEGs are written to.
    #[arg(short, long, env = "EVRAK_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Number of files converted at the same time.
    #[arg(short, long, env = "EVRAK_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Per-file timeout in seconds.
    #[arg(long, env = "EVRAK_TIMEOUT")]
    timeout: Option<u64>,

    /// Print a JSON summary on stdout.
    #[arg(long, env = "EVRAK_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "EVRAK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "EVRAK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "EVRAK_QUIET")]
    quiet: bool,
}

#[cfg(feature = "onnx")]
#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum VariantArg {
    General,
    Landscape,
}

#[cfg(feature = "onnx")]
impl From<VariantArg> for evrak_jpeg::segmentation::ModelVariant {
    fn from(v: VariantArg) -> Self {
        match v {
            VariantArg::General => Self::General,
            VariantArg::Landscape => Self::Landscape,
        }
    }
}

#[derive(Debug, Clone)]
struct DocArg {
    key: String,
    path: PathBuf,
}

/// Parse `KEY=PATH`; the key is sanitised like a name part.
fn parse_doc_arg(s: &str) -> Result<DocArg, String> {
    let (key, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=PATH, got '{s}'"))?;
    let key = naming::sanitize_name_part(key);
    if key.is_empty() {
        return Err(format!("empty slot key in '{s}'"));
    }
    if path.trim().is_empty() {
        return Err(format!("empty path for slot '{key}'"));
    }
    Ok(DocArg {
        key,
        path: PathBuf::from(path.trim()),
    })
}

/// One line of the `--json` summary.
#[derive(Debug, Serialize)]
struct FileSummary {
    key: String,
    source: PathBuf,
    file: Option<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
    bytes: Option<usize>,
    error: Option<SlotError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    identifier: String,
    files: Vec<FileSummary>,
    stats: BatchStats,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs while it is visible.
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

    let identifier = naming::identifier(&cli.first_name, &cli.last_name)
        .context("Cannot build output file names")?;

    if cli.docs.is_empty() && cli.photo.is_none() {
        anyhow::bail!("Nothing to convert: pass at least one --doc KEY=PATH or --photo PATH");
    }

    ensure_unique_keys(&cli.docs)?;

    for doc in &cli.docs {
        if !DOCUMENT_SLOTS.contains(&doc.key.as_str()) {
            warn!("'{}' is not one of the known slots {:?}", doc.key, DOCUMENT_SLOTS);
        }
    }

    // ── Build configs ────────────────────────────────────────────────────
    let render_config = RenderConfig::builder()
        .scale(cli.scale)
        .quality(cli.quality)
        .build()
        .context("Invalid render configuration")?;

    let target_size = TargetSize::from_label(&cli.size);
    let biometric_config = build_biometric_config(&cli, target_size)?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let mut options = BatchOptions::builder().concurrency(cli.concurrency);
    if let Some(secs) = cli.timeout {
        options = options.slot_timeout_secs(secs);
    }
    if let Some(cb) = progress_cb {
        options = options.progress_callback(cb);
    }
    let options = options.build().context("Invalid batch options")?;

    // ── Read inputs ──────────────────────────────────────────────────────
    let mut slots = Vec::new();
    let mut plan: Vec<(PathBuf, String)> = Vec::new();

    for doc in &cli.docs {
        let source = read_source(&doc.path, MediaKind::Pdf).await?;
        slots.push(Slot::rasterize(&doc.key, source, render_config));
        plan.push((doc.path.clone(), naming::slot_filename(&identifier, &doc.key)));
    }

    if let Some(ref photo) = cli.photo {
        let source = read_source(photo, MediaKind::RasterImage).await?;
        slots.push(Slot::biometric("biyometrik", source, biometric_config));
        plan.push((photo.clone(), naming::biometric_filename(&identifier, target_size)));
    }

    // ── Convert ──────────────────────────────────────────────────────────
    let report = convert_batch(slots, &options).await;

    tokio::fs::create_dir_all(&cli.output_dir)
        .await
        .with_context(|| format!("Failed to create output directory {:?}", cli.output_dir))?;

    // ── Write outputs ────────────────────────────────────────────────────
    let mut files = Vec::with_capacity(report.results.len());
    let mut write_failures = 0usize;

    for (result, (source, file_name)) in report.results.iter().zip(plan) {
        let mut summary = FileSummary {
            key: result.key.clone(),
            source,
            file: None,
            width: None,
            height: None,
            bytes: None,
            error: result.error.clone(),
            hint: result.error.as_ref().and_then(|e| hint_for(e.kind)),
        };

        if let Some(ref output) = result.output {
            let target = cli.output_dir.join(&file_name);
            match tokio::task::block_in_place(|| write_atomic(&target, &output.bytes)) {
                Ok(()) => {
                    debug!("Wrote {}", target.display());
                    summary.file = Some(target);
                    summary.width = Some(output.width);
                    summary.height = Some(output.height);
                    summary.bytes = Some(output.len());
                }
                Err(e) => {
                    write_failures += 1;
                    eprintln!("{} {}: {e:#}", red("✗"), result.key);
                }
            }
        }
        files.push(summary);
    }

    let mut stats = report.stats.clone();
    stats.succeeded -= write_failures;
    stats.failed += write_failures;

    // ── Report ───────────────────────────────────────────────────────────
    if cli.json {
        let summary = RunSummary {
            identifier,
            files,
            stats: stats.clone(),
        };
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialise summary")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{json}").context("Failed to write to stdout")?;
    } else if !cli.quiet {
        if !show_progress {
            for f in &files {
                match (&f.file, &f.error) {
                    (Some(path), _) => eprintln!("  {} {}", green("✓"), path.display()),
                    (None, Some(e)) => eprintln!("  {} {}: {}", red("✗"), f.key, e.message),
                    (None, None) => {}
                }
            }
        }
        print_summary(&stats, &cli.output_dir);
        let mut hints: Vec<&str> = files.iter().filter_map(|f| f.hint).collect();
        hints.sort_unstable();
        hints.dedup();
        for hint in hints {
            eprintln!("  {} {}", cyan("hint:"), hint);
        }
    }

    Ok(if stats.failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Two `--doc` flags with one key would write the same output file.
fn ensure_unique_keys(docs: &[DocArg]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for doc in docs {
        if !seen.insert(doc.key.as_str()) {
            anyhow::bail!(
                "Slot '{}' is given more than once; each --doc key must be unique",
                doc.key
            );
        }
    }
    Ok(())
}

/// What the user can change on the command line to get past `kind`.
fn hint_for(kind: ErrorKind) -> Option<&'static str> {
    match kind {
        ErrorKind::SegmentationUnavailable => Some(if cfg!(feature = "onnx") {
            "pass --segmentation-model PATH, or --no-whiten to keep the original background"
        } else {
            "pass --no-whiten to keep the original background"
        }),
        ErrorKind::Timeout => Some("raise --timeout or leave it unset"),
        _ => None,
    }
}

fn build_biometric_config(cli: &Cli, target_size: TargetSize) -> Result<BiometricConfig> {
    #[allow(unused_mut)]
    let mut builder = BiometricConfig::builder()
        .target_size(target_size)
        .whiten_background(!cli.no_whiten)
        .quality(cli.quality);

    #[cfg(feature = "onnx")]
    if let Some(ref model) = cli.segmentation_model {
        let segmenter =
            evrak_jpeg::segmentation::OnnxSegmenter::from_file(model, cli.model_variant.into())
                .context("Failed to load segmentation model")?;
        builder = builder.segmenter(Arc::new(segmenter));
    }

    builder.build().context("Invalid photo configuration")
}

/// Read a file and sniff its kind; bytes that sniff as nothing keep
/// `fallback` so the pipeline reports the decode failure for that slot.
async fn read_source(path: &Path, fallback: MediaKind) -> Result<SourceDocument> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {:?}", path))?;
    match SourceDocument::sniff(bytes.clone()) {
        Ok(doc) => Ok(doc),
        Err(e) => {
            debug!("{}: {}", path.display(), e);
            Ok(SourceDocument::new(bytes, fallback))
        }
    }
}

/// Write via a temp file in the same directory, then rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {:?}", dir))?;
    tmp.write_all(bytes)
        .with_context(|| format!("Failed to write {:?}", path))?;
    tmp.persist(path)
        .with_context(|| format!("Failed to move output into place at {:?}", path))?;
    Ok(())
}

fn print_summary(stats: &BatchStats, output_dir: &Path) {
    if stats.failed == 0 {
        eprintln!(
            "{} {} files converted  {}ms  →  {}",
            green("✔"),
            bold(&stats.succeeded.to_string()),
            stats.total_duration_ms,
            bold(&output_dir.display().to_string()),
        );
    } else {
        eprintln!(
            "{} {}/{} files converted  ({} failed)",
            if stats.succeeded == 0 {
                red("✘")
            } else {
                cyan("⚠")
            },
            bold(&stats.succeeded.to_string()),
            stats.total_slots,
            red(&stats.failed.to_string()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_arg_parses_key_and_path() {
        let d = parse_doc_arg("diploma=./files/d.pdf").unwrap();
        assert_eq!(d.key, "diploma");
        assert_eq!(d.path, PathBuf::from("./files/d.pdf"));
    }

    #[test]
    fn doc_arg_rejects_malformed_values() {
        assert!(parse_doc_arg("diploma").is_err());
        assert!(parse_doc_arg("=x.pdf").is_err());
        assert!(parse_doc_arg("diploma=").is_err());
    }

    #[test]
    fn cli_parses_full_invocation() {
        let cli = Cli::try_parse_from([
            "evrak2jpeg",
            "--first-name",
            "Ayşe",
            "--last-name",
            "Yılmaz",
            "--doc",
            "diploma=d.pdf",
            "--doc",
            "saglik_raporu=r.pdf",
            "--photo",
            "p.jpg",
            "--size",
            "50x60",
            "--no-whiten",
        ])
        .unwrap();
        assert_eq!(cli.docs.len(), 2);
        assert_eq!(cli.size, "50x60");
        assert!(cli.no_whiten);
        assert_eq!(cli.concurrency, 1);
    }

    #[test]
    fn repeated_doc_key_is_rejected() {
        let cli = Cli::try_parse_from([
            "evrak2jpeg",
            "--first-name",
            "Ali",
            "--last-name",
            "Veli",
            "--doc",
            "diploma=a.pdf",
            "--doc",
            "diploma=b.pdf",
        ])
        .unwrap();
        let err = ensure_unique_keys(&cli.docs).unwrap_err();
        assert!(err.to_string().contains("'diploma'"));

        let distinct = [
            parse_doc_arg("diploma=a.pdf").unwrap(),
            parse_doc_arg("saglik_raporu=b.pdf").unwrap(),
        ];
        assert!(ensure_unique_keys(&distinct).is_ok());
    }

    #[test]
    fn missing_segmenter_gets_a_flag_hint() {
        let hint = hint_for(ErrorKind::SegmentationUnavailable).unwrap();
        assert!(hint.contains("--no-whiten"));
        assert!(hint_for(ErrorKind::Decode).is_none());
    }

    #[test]
    fn long_help_explains_whitening_requirements() {
        assert!(AFTER_HELP.contains("BACKGROUND WHITENING"));
        assert!(AFTER_HELP.contains("--no-whiten"));
        assert!(AFTER_HELP.contains("--segmentation-model"));
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.jpeg");
        std::fs::write(&target, b"old").unwrap();
        write_atomic(&target, b"new").unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"new");
    }
}
