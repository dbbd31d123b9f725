//! CLI binary for docx2pdf-client.
//!
//! A thin shim over the library crate: maps CLI flags to `ClientConfig`,
//! walks a `ConverterSession` through upload → password → convert, and saves
//! the resulting PDF.

use anyhow::{bail, Context, Result};
use clap::Parser;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Password};
use docx2pdf_client::{
    format_size, format_timestamp, ClientConfig, ConverterError, ConverterSession,
    DownloadTarget, HttpBackend, ProgressCallback, SelectedFile, TransferProgressCallback,
    UploadMetadata, CONVERSION_SUCCESS_MESSAGE, UPLOAD_SUCCESS_MESSAGE,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar for the upload body, one for the PDF download.
struct CliProgressCallback {
    upload: Mutex<Option<ProgressBar>>,
    download: Mutex<Option<ProgressBar>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            upload: Mutex::new(None),
            download: Mutex::new(None),
        })
    }

    fn transfer_bar(prefix: &'static str, total: Option<u64>) -> ProgressBar {
        let bar = match total {
            Some(total) => {
                let bar = ProgressBar::new(total);
                bar.set_style(
                    ProgressStyle::with_template(
                        "{spinner:.cyan} {prefix:.bold}  \
                         [{bar:42.green/238}] {percent:>3}%  {bytes}/{total_bytes}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("█▉▊▋▌▍▎▏  ")
                    .tick_strings(TICKS),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {bytes}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner())
                        .tick_strings(TICKS),
                );
                bar
            }
        };
        bar.set_prefix(prefix);
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    }

    /// Clear any bar still on screen (after success or failure).
    fn finish(&self) {
        for slot in [&self.upload, &self.download] {
            if let Ok(mut guard) = slot.lock() {
                if let Some(bar) = guard.take() {
                    bar.finish_and_clear();
                }
            }
        }
    }
}

impl TransferProgressCallback for CliProgressCallback {
    fn on_upload_start(&self, total_bytes: u64) {
        if let Ok(mut guard) = self.upload.lock() {
            *guard = Some(Self::transfer_bar("Uploading", Some(total_bytes)));
        }
    }

    fn on_upload_progress(&self, _percent: u8, sent: u64, _total: u64) {
        if let Ok(guard) = self.upload.lock() {
            if let Some(bar) = guard.as_ref() {
                bar.set_position(sent);
            }
        }
    }

    fn on_upload_complete(&self, _total_bytes: u64) {
        if let Ok(mut guard) = self.upload.lock() {
            if let Some(bar) = guard.take() {
                bar.finish_and_clear();
            }
        }
    }

    fn on_download_progress(&self, received: u64, total: Option<u64>) {
        if let Ok(mut guard) = self.download.lock() {
            guard
                .get_or_insert_with(|| Self::transfer_bar("Downloading", total))
                .set_position(received);
        }
    }
}

/// Spinner shown while the backend converts.
fn conversion_spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS),
    );
    bar.set_prefix("Converting");
    bar.set_message("waiting for the backend…");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert and save report.pdf in the current directory
  docx2pdf report.docx

  # Password-protect the PDF
  docx2pdf --password secret report.docx -o out/

  # Prompt for the password after the upload (input hidden)
  docx2pdf --ask-password report.docx

  # Only upload and show what the backend reports
  docx2pdf --inspect-only report.docx

  # Print the download URL instead of fetching the PDF
  docx2pdf --no-download --json report.docx

  # Check the backend is reachable
  docx2pdf --health

ENVIRONMENT VARIABLES:
  DOCX2PDF_API_URL        Backend base URL (default http://localhost:5000/api)
  DOCX2PDF_PASSWORD       PDF password
  DOCX2PDF_OUTPUT_DIR     Directory for the downloaded PDF
  DOCX2PDF_TIMEOUT        Request timeout in seconds
  RUST_LOG                Override log filtering (tracing EnvFilter syntax)
"#;

/// Convert DOCX files to PDF through a conversion backend.
#[derive(Parser, Debug)]
#[command(
    name = "docx2pdf",
    version,
    about = "Convert DOCX files to (optionally password-protected) PDF via a conversion backend",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local .docx file to convert.
    #[arg(required_unless_present = "health")]
    input: Option<PathBuf>,

    /// Backend base URL; endpoints are {URL}/upload, {URL}/convert, {URL}/download/{name}.
    #[arg(long, env = "DOCX2PDF_API_URL", default_value = "http://localhost:5000/api")]
    api_url: String,

    /// Password to protect the PDF with. Empty means no password.
    #[arg(short, long, env = "DOCX2PDF_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Prompt for the password after the upload succeeds.
    #[arg(long, conflicts_with = "password")]
    ask_password: bool,

    /// Directory to save the PDF in.
    #[arg(short, long, env = "DOCX2PDF_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Print the download URL instead of fetching the PDF.
    #[arg(long)]
    no_download: bool,

    /// Upload and print metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Check backend health and exit.
    #[arg(long)]
    health: bool,

    /// Output structured JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Disable progress bars.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,

    /// Per-request timeout in seconds.
    #[arg(long, env = "DOCX2PDF_TIMEOUT", default_value_t = 120)]
    timeout: u64,
}

/// `--json` output.
#[derive(Serialize)]
struct Report<'a> {
    metadata: &'a UploadMetadata,
    size_display: String,
    upload_time_display: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    download: Option<&'a DownloadTarget>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_to: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Keep library INFO logs out of the way of the progress bars.
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
    let progress = show_progress.then(CliProgressCallback::new);

    let mut builder = ClientConfig::builder(&cli.api_url).request_timeout_secs(cli.timeout);
    if let Some(cb) = &progress {
        builder = builder.progress_callback(Arc::clone(cb) as ProgressCallback);
    }
    let config = builder.build().context("Invalid configuration")?;
    let backend = Arc::new(HttpBackend::new(config.clone())?);

    // ── Health-only mode ─────────────────────────────────────────────────
    if cli.health {
        let health = backend.health().await?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&health)?);
        } else if !cli.quiet {
            eprintln!(
                "{} {} {}",
                green("✔"),
                bold(health.service.as_deref().unwrap_or("backend")),
                dim(&format!(
                    "{} {}",
                    health.version.as_deref().unwrap_or(""),
                    health.timestamp.as_deref().unwrap_or("")
                )),
            );
        }
        return Ok(());
    }

    let Some(input) = cli.input.as_ref() else {
        bail!("No input file given");
    };

    // ── Upload ───────────────────────────────────────────────────────────
    let file = SelectedFile::from_path(input).await?;
    let mut session = ConverterSession::with_notification_ttl(
        backend.clone(),
        config.notification_ttl,
    );

    let upload = session.select_file(file).await;
    if let Some(cb) = &progress {
        cb.finish();
    }
    let metadata = upload?;

    if !cli.quiet && !cli.json {
        print_metadata(session.success().unwrap_or(UPLOAD_SUCCESS_MESSAGE), &metadata);
    }

    if cli.inspect_only {
        if cli.json {
            print_report(&metadata, None, None)?;
        }
        return Ok(());
    }

    // ── Password dialog ──────────────────────────────────────────────────
    // The session opens the dialog after the upload and closes it only once
    // a conversion succeeds.
    if let Some(pw) = &cli.password {
        session.set_password(pw.clone());
    } else if cli.ask_password && session.is_password_dialog_open() {
        session.set_password(prompt_password()?);
    }

    // ── Convert ──────────────────────────────────────────────────────────
    let target = loop {
        let spinner = show_progress.then(conversion_spinner);
        let result = session.convert().await;
        if let Some(s) = spinner {
            s.finish_and_clear();
        }

        match result {
            Ok(target) => break target,
            Err(e)
                if cli.ask_password
                    && session.is_password_dialog_open()
                    && io::stdin().is_terminal() =>
            {
                eprintln!("{} {}", red("✘"), e.user_message());
                let retry = Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt("Retry the conversion?")
                    .default(true)
                    .interact()
                    .context("Failed to read confirmation")?;
                if !retry {
                    return Err(e.into());
                }
                session.set_password(prompt_password()?);
            }
            Err(e) => return Err(e.into()),
        }
    };

    // ── Download ─────────────────────────────────────────────────────────
    if cli.no_download {
        if cli.json {
            print_report(&metadata, Some(&target), None)?;
        } else {
            println!("{}", target.url);
        }
        return Ok(());
    }

    let saved = backend.download(&target, &cli.output_dir).await;
    if let Some(cb) = &progress {
        cb.finish();
    }
    let saved = saved.map_err(|e| match e {
        ConverterError::OutputWriteFailed { .. } => anyhow::Error::from(e)
            .context(format!("Could not save into {}", cli.output_dir.display())),
        other => other.into(),
    })?;

    if cli.json {
        print_report(&metadata, Some(&target), Some(saved))?;
    } else if !cli.quiet {
        eprintln!(
            "{} {}  →  {}",
            green("✔"),
            session.success().unwrap_or(CONVERSION_SUCCESS_MESSAGE),
            bold(&saved.display().to_string()),
        );
    }

    Ok(())
}

fn print_metadata(notice: &str, metadata: &UploadMetadata) {
    eprintln!("{} {}", green("✔"), bold(notice));
    eprintln!("   Filename:  {}", metadata.filename);
    eprintln!("   Size:      {}", format_size(metadata.size));
    eprintln!(
        "   Uploaded:  {}",
        format_timestamp(metadata.upload_time.as_deref())
    );
}

fn print_report(
    metadata: &UploadMetadata,
    download: Option<&DownloadTarget>,
    saved_to: Option<PathBuf>,
) -> Result<()> {
    let report = Report {
        metadata,
        size_display: format_size(metadata.size),
        upload_time_display: format_timestamp(metadata.upload_time.as_deref()),
        download,
        saved_to,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialise output")?
    );
    Ok(())
}

/// The password dialog: hidden input, blank means no password.
fn prompt_password() -> Result<String> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt("PDF password (leave blank for none)")
        .allow_empty_password(true)
        .interact()
        .context("Failed to read password")
}
