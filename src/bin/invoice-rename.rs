//! CLI binary for edgequake-invoice-rename.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `RenameConfig`, runs one batch and prints one line per invoice.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_invoice_rename::{
    run_batch, AttachmentMode, BatchProgressCallback, ProcessedInvoice, ProgressCallback,
    RenameConfig,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
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

// ── CLI progress callback ────────────────────────────────────────────────────

/// Prints one line per invoice, under an indicatif bar when one is shown.
struct CliReporter {
    bar: Option<ProgressBar>,
    input_dir: PathBuf,
}

impl CliReporter {
    fn new(show_bar: bool, input_dir: PathBuf) -> Arc<Self> {
        let bar = show_bar.then(|| {
            let bar = ProgressBar::new(0);
            let style = ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} invoices  \
                 ⏱ {elapsed_precise}  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
            bar.set_style(style);
            bar.set_prefix("Renaming");
            bar
        });
        Arc::new(Self { bar, input_dir })
    }

    fn line(&self, s: String) {
        match self.bar {
            Some(ref bar) => bar.println(s),
            None => eprintln!("{s}"),
        }
    }
}

impl BatchProgressCallback for CliReporter {
    fn on_batch_start(&self, total_files: usize) {
        if let Some(ref bar) = self.bar {
            bar.set_length(total_files as u64);
            bar.enable_steady_tick(Duration::from_millis(80));
        }
        self.line(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Renaming {total_files} invoice(s)…"))
        ));
    }

    fn on_nothing_to_do(&self) {
        self.line(format!(
            "{} Nothing to do: no PDF files in {}",
            dim("·"),
            self.input_dir.display()
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, file_name: &str) {
        if let Some(ref bar) = self.bar {
            bar.set_message(file_name.to_string());
        }
    }

    fn on_file_complete(&self, _index: usize, _total: usize, record: &ProcessedInvoice) {
        self.line(format!(
            "  {} {} → {}  {}",
            green("✓"),
            record.original_name,
            bold(&record.output_name),
            dim(&format!("({}, {})", record.issue_date, record.issuer_name)),
        ));
        if let Some(ref bar) = self.bar {
            bar.inc(1);
        }
    }

    fn on_file_error(&self, _index: usize, _total: usize, file_name: &str, error: &str) {
        // Keep multi-line provider errors on one line.
        let msg = error.lines().collect::<Vec<_>>().join(" ");
        self.line(format!("  {} {}  {}", red("✗"), file_name, red(&msg)));
        if let Some(ref bar) = self.bar {
            bar.inc(1);
        }
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
        let failed = total_files.saturating_sub(success_count);
        if failed == 0 {
            eprintln!(
                "{} {} invoice(s) renamed",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} invoice(s) renamed  ({} failed, left in {})",
                if failed == total_files {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
                self.input_dir.display(),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rename everything in ./in (copies to ./out, originals to ./processed)
  invoice-rename

  # Another installation root
  invoice-rename --root /srv/invoices

  # Teach the model your naming preferences
  invoice-rename --examples "PKN ORLEN S.A. Stacja 4411 => Orlen pb"
  invoice-rename --examples-file naming-examples.txt

  # Provider that cannot read PDFs: send rendered pages instead
  invoice-rename --provider openai --model gpt-4.1-mini --attach pages

  # Machine-readable report
  invoice-rename --json > report.json

LAYOUT:
  <root>/in/          invoices to rename (*.pdf, any case; subdirectories ignored)
  <root>/out/         renamed copies: YYMMDD_issuer.pdf, _1, _2 … on collision
  <root>/processed/   originals after a successful rename

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY                  Gemini API key (required for the default provider)
  GOOGLE_GENERATIVE_AI_API_KEY    Accepted instead of GEMINI_API_KEY
  INVOICE_RENAME_EXAMPLES         Few-shot examples, one "source => target" per line
  PDFIUM_LIB_PATH                 libpdfium to use with --attach pages

EXIT STATUS:
  0 when the batch ran, even if some invoices failed (they stay in in/).
  1 on a configuration error (e.g. no API key) or if in/ cannot be read.
"#;

/// Rename PDF invoices after their issue date and issuer.
#[derive(Parser, Debug)]
#[command(
    name = "invoice-rename",
    version,
    about = "Rename PDF invoices after their issue date and issuer using an LLM",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Installation root holding in/, out/ and processed/.
    #[arg(long, env = "INVOICE_RENAME_ROOT", default_value = ".")]
    root: PathBuf,

    /// LLM model ID.
    #[arg(long, env = "INVOICE_RENAME_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini (default), openai, anthropic, ollama, …
    #[arg(long, env = "INVOICE_RENAME_PROVIDER")]
    provider: Option<String>,

    /// Few-shot examples, one "source => target" per line.
    #[arg(long, env = "INVOICE_RENAME_EXAMPLES")]
    examples: Option<String>,

    /// Read few-shot examples from a file (takes precedence over --examples).
    #[arg(long)]
    examples_file: Option<PathBuf>,

    /// How the invoice is sent to the model.
    #[arg(long, env = "INVOICE_RENAME_ATTACH", value_enum, default_value = "pdf")]
    attach: AttachArg,

    /// Pages rendered with --attach pages.
    #[arg(long, default_value_t = 2)]
    max_pages: usize,

    /// Retries per invoice on extraction failure.
    #[arg(long, env = "INVOICE_RENAME_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "INVOICE_RENAME_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Print the batch report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "INVOICE_RENAME_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum AttachArg {
    Pdf,
    Pages,
}

impl From<AttachArg> for AttachmentMode {
    fn from(v: AttachArg) -> Self {
        match v {
            AttachArg::Pdf => AttachmentMode::Pdf,
            AttachArg::Pages => AttachmentMode::Pages,
        }
    }
}

// Invoices are processed one at a time; one thread is enough.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The per-file lines carry what matters; keep library INFO logs for
    // runs without the progress bar.
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
    let reporter: Option<ProgressCallback> = if cli.quiet || cli.json {
        None
    } else {
        let input_dir = cli.root.join("in");
        Some(CliReporter::new(show_progress, input_dir) as Arc<dyn BatchProgressCallback>)
    };
    let config = build_config(&cli, reporter).await?;

    // ── Run ──────────────────────────────────────────────────────────────
    let report = run_batch(&config).await.context("Batch failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    }

    Ok(())
}

/// Map CLI args to `RenameConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RenameConfig> {
    let examples = match cli.examples_file {
        Some(ref path) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read examples from {:?}", path))?,
        ),
        None => cli.examples.clone(),
    };

    let mut builder = RenameConfig::builder()
        .root(&cli.root)
        .attachment(cli.attach.into())
        .max_pages(cli.max_pages)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout);

    if let Some(examples) = examples {
        builder = builder.examples(examples);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
