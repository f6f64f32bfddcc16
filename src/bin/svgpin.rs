//! CLI binary for svgpin.
//!
//! A thin shim over the library crate that maps CLI flags to `PinConfig`,
//! loads credentials from `.env`, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use svgpin::{
    run, BatchProgressCallback, Credentials, PinConfig, ProgressCallback, RunReport, Variant,
};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Spinner until `on_run_start` tells us how many files there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Listing svgs/…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Pinning");
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total: usize) {
        self.activate_bar(total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Pinning {total} SVG file(s)…"))
        ));
    }

    fn on_asset_start(&self, file_name: &str, _index: usize, _total: usize) {
        self.bar.set_message(file_name.to_string());
    }

    fn on_asset_complete(&self, file_name: &str, index: usize, total: usize, cid: &str) {
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}",
            green("✓"),
            index,
            total,
            file_name,
            dim(cid),
        ));
        self.bar.inc(1);
    }

    fn on_asset_error(&self, file_name: &str, index: usize, total: usize, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let mut m: String = error.chars().take(79).collect();
            m.push('\u{2026}');
            m
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {:<32}  {}",
            red("✗"),
            index,
            total,
            file_name,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total: usize, success_count: usize) {
        let failed = total.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} file(s) pinned",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} file(s) pinned  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"LAYOUT:
  <ROOT>/svgs/            source files (only *.svg, case-sensitive)
  <ROOT>/optimized-svgs/  canonical copies (must exist; canonical mode only)
  <ROOT>/hashes.txt           one CID per pinned file
  <ROOT>/encoded-hashes.txt   one 0x-hex CID per pinned file
  <ROOT>/keccak-hashes.txt    one Keccak-256 digest per pinned file
  <ROOT>/pretty.txt           human-readable block per file (canonical mode only)

  All ledgers are truncated at the start of every run.

EXAMPLES:
  # Canonicalize, pin, and record everything
  svgpin ./collection

  # Pin files as they are; hash the raw bytes
  svgpin --raw ./collection

  # Machine-readable report
  svgpin --json ./collection > report.json

ENVIRONMENT VARIABLES (also read from ./.env):
  IPFS_KEY         Storage-network project key (basic-auth user)
  IPFS_SECRET      Storage-network project secret (basic-auth password)
  SVGPIN_ENDPOINT  Override the IPFS add endpoint
"#;

/// Pin SVG files to IPFS and record CIDs and Keccak digests.
#[derive(Parser, Debug)]
#[command(
    name = "svgpin",
    version,
    about = "Pin SVG files to IPFS and record CIDs and Keccak digests",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder containing `svgs/` (and `optimized-svgs/` unless --raw).
    root: PathBuf,

    /// Skip canonicalization: upload and hash the files unchanged.
    #[arg(long, env = "SVGPIN_RAW")]
    raw: bool,

    /// Run the minimization preset once instead of to a fixed point.
    #[arg(long, env = "SVGPIN_NO_MULTIPASS")]
    no_multipass: bool,

    /// IPFS add endpoint.
    #[arg(long, env = "SVGPIN_ENDPOINT", default_value = svgpin::config::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Per-upload timeout in seconds.
    #[arg(long, env = "SVGPIN_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Print the run report as JSON on stdout.
    #[arg(long, env = "SVGPIN_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "SVGPIN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SVGPIN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SVGPIN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials live in .env next to the collection; a missing file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
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
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    let report = run(&cli.root, &config).await.context("Run aborted")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&report, show_progress);
    }

    Ok(())
}

/// Map CLI args to `PinConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PinConfig> {
    let mut builder = PinConfig::builder()
        .variant(if cli.raw { Variant::Raw } else { Variant::Canonical })
        .multipass(!cli.no_multipass)
        .endpoint(cli.endpoint.clone())
        .upload_timeout_secs(cli.timeout);

    match Credentials::from_env() {
        Some(creds) => builder = builder.credentials(creds),
        None => {
            if let Some(notice) = missing_credentials_notice(cli.quiet) {
                eprintln!("{notice}");
            }
        }
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Printed directly rather than logged: the log filter hides warnings while
/// the progress bar is up.
fn missing_credentials_notice(quiet: bool) -> Option<String> {
    (!quiet).then(|| {
        format!(
            "{} IPFS_KEY / IPFS_SECRET are not set; every upload will fail",
            cyan("⚠")
        )
    })
}

fn print_summary(report: &RunReport, show_progress: bool) {
    let stats = &report.stats;
    // The progress callback already printed per-file lines and a final tick.
    if !show_progress {
        for r in &report.records {
            eprintln!("{}  {}  {}", r.file_name, r.cid, r.digest);
        }
        for f in &report.failures {
            eprintln!("{} {}", red("✗"), f.error);
        }
    }
    eprintln!(
        "{}  {}/{} pinned  {} skipped  {}ms",
        if stats.failed == 0 { green("✔") } else { cyan("⚠") },
        stats.succeeded,
        stats.eligible,
        dim(&stats.skipped.to_string()),
        stats.total_duration_ms,
    );
}
