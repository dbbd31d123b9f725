//! The seam between the session state machine and the network.
//!
//! [`crate::session::ConverterSession`] only ever talks to a
//! `dyn ConversionBackend`. Production code plugs in
//! [`crate::client::HttpBackend`]; tests plug in an in-memory fake that
//! records every call, which is how "no request was made" gets asserted.

use crate::error::ConverterError;
use crate::model::{ConversionRequest, ConvertResponse, SelectedFile, UploadResponse};
use crate::progress::PercentSink;
use async_trait::async_trait;

/// Remote side of a DOCX → PDF conversion.
#[async_trait]
pub trait ConversionBackend: Send + Sync {
    /// Send `file` to the upload endpoint.
    ///
    /// `progress` receives the upload percentage (0–100) as bytes are sent.
    /// Failures come back as [`ConverterError::UploadFailed`].
    async fn upload(
        &self,
        file: &SelectedFile,
        progress: PercentSink,
    ) -> Result<UploadResponse, ConverterError>;

    /// Send the file and optional password to the convert endpoint.
    ///
    /// Failures come back as [`ConverterError::ConversionFailed`].
    async fn convert(&self, request: &ConversionRequest)
        -> Result<ConvertResponse, ConverterError>;

    /// URL the converted file named `filename` can be downloaded from.
    fn download_url(&self, filename: &str) -> String;
}
