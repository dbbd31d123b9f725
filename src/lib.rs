//! # docx2pdf-client
//!
//! Client for a DOCX → PDF conversion backend: pick a `.docx`, upload it,
//! review the metadata the backend reports, optionally set a password, and
//! fetch the converted PDF.
//!
//! ## Flow Overview
//!
//! ```text
//! .docx
//!  │
//!  ├─ 1. Select    validate the `.docx` suffix locally (no request otherwise)
//!  ├─ 2. Upload    POST /upload (multipart), progress 0–100 %
//!  ├─ 3. Review    filename, size ("12.06 KB"), upload time
//!  ├─ 4. Password  optional; only sent when non-empty
//!  ├─ 5. Convert   POST /convert → result filename
//!  └─ 6. Download  GET /download/{filename}
//! ```
//!
//! The conversion engine, PDF encryption, and file retention all live in the
//! backend; this crate only drives the interaction.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docx2pdf_client::{ClientConfig, ConverterSession, HttpBackend, SelectedFile};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder("http://localhost:5000/api").build()?;
//!     let backend = Arc::new(HttpBackend::new(config.clone())?);
//!     let mut session = ConverterSession::new(backend.clone());
//!
//!     let file = SelectedFile::from_path("report.docx").await?;
//!     let metadata = session.select_file(file).await?;
//!     eprintln!("uploaded {} ({} bytes)", metadata.filename, metadata.size);
//!
//!     session.set_password("secret");
//!     let target = session.convert().await?;
//!     let saved = backend.download(&target, ".").await?;
//!     eprintln!("saved {}", saved.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docx2pdf` binary (clap + anyhow + indicatif + dialoguer + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docx2pdf-client = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod model;
pub mod notification;
pub mod progress;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::ConversionBackend;
pub use client::HttpBackend;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ConverterError, ErrorKind};
pub use format::{format_bytes, format_size, format_timestamp};
pub use model::{
    ConversionRequest, ConvertResponse, DownloadTarget, HealthStatus, SelectedFile,
    UploadMetadata, UploadResponse,
};
pub use notification::{Notifications, Severity};
pub use progress::{NoopProgressCallback, PercentSink, ProgressCallback, TransferProgressCallback};
pub use session::{
    ConverterSession, RequestToken, SessionState, ViewSnapshot, CONVERSION_SUCCESS_MESSAGE,
    UPLOAD_SUCCESS_MESSAGE,
};
