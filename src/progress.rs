//! Progress-callback trait for upload and download transfers.
//!
//! Inject an [`Arc<dyn TransferProgressCallback>`] via
//! [`crate::config::ClientConfigBuilder::progress_callback`] to receive events
//! as the request body is sent and as the converted PDF arrives.
//!
//! # Example
//!
//! ```rust
//! use docx2pdf_client::{ClientConfig, TransferProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicU8, Ordering}};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl TransferProgressCallback for LastPercent {
//!     fn on_upload_progress(&self, percent: u8, _sent: u64, _total: u64) {
//!         self.0.store(percent, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ClientConfig::builder("http://localhost:5000/api")
//!     .progress_callback(Arc::new(LastPercent(AtomicU8::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the HTTP backend while a transfer is running.
///
/// Upload events fire from inside the request body stream, which may be polled
/// on any runtime worker thread, hence `Send + Sync`. All methods default to
/// no-ops.
pub trait TransferProgressCallback: Send + Sync {
    /// Called once before the first byte of the upload is sent.
    fn on_upload_start(&self, total_bytes: u64) {
        let _ = total_bytes;
    }

    /// Called each time a chunk of the file is handed to the transport.
    ///
    /// # Arguments
    /// * `percent`: `round(sent * 100 / total)`, 0–100
    /// * `sent`:    bytes of the file sent so far
    /// * `total`:   file size in bytes
    fn on_upload_progress(&self, percent: u8, sent: u64, total: u64) {
        let _ = (percent, sent, total);
    }

    /// Called once the backend has answered the upload successfully.
    fn on_upload_complete(&self, total_bytes: u64) {
        let _ = total_bytes;
    }

    /// Called for every chunk of the PDF written to disk.
    ///
    /// `total` is the `Content-Length` when the backend sent one.
    fn on_download_progress(&self, received: u64, total: Option<u64>) {
        let _ = (received, total);
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl TransferProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type ProgressCallback = Arc<dyn TransferProgressCallback>;

/// Percentage sink handed to [`crate::backend::ConversionBackend::upload`].
///
/// The session uses it to keep its progress field current.
pub type PercentSink = Arc<dyn Fn(u8) + Send + Sync>;

/// Upload completion as a whole percentage.
///
/// A zero-byte file is complete as soon as it starts.
pub fn percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (sent.min(total) as f64 * 100.0 / total as f64).round();
    pct as u8
}
