//! Error types for the docx2pdf client.
//!
//! Every failure the client can hit falls into one of three buckets, exposed
//! through [`ConverterError::kind`]:
//!
//! * **Validation**: detected locally before any request is made (wrong file
//!   extension, nothing dropped, unreadable local file).
//! * **Request**: the backend answered with a non-2xx status, returned a body
//!   we could not decode, or the transport failed.
//! * **Local**: misuse of the session (operation in the wrong state) or a
//!   problem writing the downloaded PDF.
//!
//! None of them is fatal to a [`crate::session::ConverterSession`]: the session
//! records the error as a notification and returns to an interactive state.

use std::path::PathBuf;
use thiserror::Error;

/// Message shown when a selected file is not a `.docx`.
pub const INVALID_EXTENSION_MESSAGE: &str = "Please upload a .docx file";

/// Fallback message when an upload fails without a server-provided reason.
pub const UPLOAD_FAILED_FALLBACK: &str = "Upload failed";

/// Fallback message when a conversion fails without a server-provided reason.
pub const CONVERSION_FAILED_FALLBACK: &str = "Conversion failed";

/// All errors returned by the docx2pdf client library.
#[derive(Debug, Error)]
pub enum ConverterError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// The selected file name does not end in `.docx`.
    #[error("{}", INVALID_EXTENSION_MESSAGE)]
    InvalidExtension { filename: String },

    /// A drop event carried no files.
    #[error("{}", INVALID_EXTENSION_MESSAGE)]
    NoFileSelected,

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Request errors ────────────────────────────────────────────────────
    /// `POST /upload` failed. `message` is the backend's opaque error string
    /// or [`UPLOAD_FAILED_FALLBACK`].
    #[error("{message}")]
    UploadFailed { message: String, status: Option<u16> },

    /// `POST /convert` failed. `message` is the backend's opaque error string
    /// or [`CONVERSION_FAILED_FALLBACK`].
    #[error("{message}")]
    ConversionFailed { message: String, status: Option<u16> },

    /// Fetching `GET /download/{filename}` failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// The backend health endpoint did not report a healthy service.
    #[error("Backend health check failed: {reason}")]
    HealthCheckFailed { reason: String },

    // ── Local errors ──────────────────────────────────────────────────────
    /// Could not create or write the downloaded PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The operation is not available in the session's current state.
    #[error("Cannot {operation} while the session is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// A request is already in flight.
    #[error("Another request is still in progress")]
    Busy,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used when deciding how to present an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected locally; no request was made.
    Validation,
    /// The backend (or the network in between) failed the request.
    Request,
    /// Session misuse, configuration, or local I/O.
    Local,
}

impl ConverterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConverterError::InvalidExtension { .. }
            | ConverterError::NoFileSelected
            | ConverterError::FileNotFound { .. }
            | ConverterError::PermissionDenied { .. } => ErrorKind::Validation,
            ConverterError::UploadFailed { .. }
            | ConverterError::ConversionFailed { .. }
            | ConverterError::DownloadFailed { .. }
            | ConverterError::HealthCheckFailed { .. } => ErrorKind::Request,
            ConverterError::OutputWriteFailed { .. }
            | ConverterError::InvalidState { .. }
            | ConverterError::Busy
            | ConverterError::InvalidConfig(_)
            | ConverterError::Internal(_) => ErrorKind::Local,
        }
    }

    /// The text a notification displays for this error.
    ///
    /// Backend messages are passed through untouched.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// HTTP status of a failed request, when the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ConverterError::UploadFailed { status, .. }
            | ConverterError::ConversionFailed { status, .. } => *status,
            _ => None,
        }
    }
}
