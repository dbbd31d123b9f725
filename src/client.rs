//! reqwest implementation of [`ConversionBackend`].
//!
//! Wire contract:
//!
//! | Call | Request | Success body | Failure body |
//! |------|---------|--------------|--------------|
//! | upload   | `POST {api}/upload`, multipart `file` | `{ metadata: {…} }` | `{ error }` |
//! | convert  | `POST {api}/convert`, multipart `file` + optional `password` | `{ filename }` | `{ error }` |
//! | download | `GET {api}/download/{filename}` | PDF bytes | `{ error }` |
//! | health   | `GET {origin}/health` | `{ status: "healthy", … }` | n/a |
//!
//! Error strings from the backend are treated as opaque and passed through to
//! the user unchanged. When there is no usable string (transport failure,
//! HTML error page, missing field) a fixed fallback is used instead and the
//! underlying cause is logged.

use crate::backend::ConversionBackend;
use crate::config::ClientConfig;
use crate::error::{ConverterError, CONVERSION_FAILED_FALLBACK, UPLOAD_FAILED_FALLBACK};
use crate::model::{
    ConversionRequest, ConvertResponse, DownloadTarget, ErrorBody, HealthStatus, SelectedFile,
    UploadResponse,
};
use crate::progress::{percent, PercentSink, ProgressCallback};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// A request that failed before or at the backend.
#[derive(Debug)]
struct RequestFailure {
    message: String,
    status: Option<u16>,
}

impl RequestFailure {
    fn fallback(fallback: &str, status: Option<u16>) -> Self {
        Self {
            message: fallback.to_string(),
            status,
        }
    }
}

/// HTTP client for the conversion backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: ClientConfig,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Result<Self, ConverterError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(concat!("docx2pdf-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConverterError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Stream the converted PDF to `dir/{filename}`.
    ///
    /// The file is written under a hidden `.part` name and renamed into place
    /// once complete, so an interrupted download never leaves a truncated PDF
    /// behind. Only the final path component of the server's filename is used.
    pub async fn download(
        &self,
        target: &DownloadTarget,
        dir: impl AsRef<Path>,
    ) -> Result<PathBuf, ConverterError> {
        let download_failed = |reason: String| ConverterError::DownloadFailed {
            url: target.url.clone(),
            reason,
        };

        let name = Path::new(&target.filename)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| download_failed(format!("invalid filename '{}'", target.filename)))?;

        let dir = dir.as_ref();
        let path = dir.join(&name);
        let tmp_path = dir.join(format!(".{name}.part"));

        info!("Downloading {} → {}", target.url, path.display());

        let response = self
            .client
            .get(&target.url)
            .send()
            .await
            .map_err(|e| download_failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(download_failed(reason));
        }

        let total = response.content_length();
        let write_failed = |source: std::io::Error| ConverterError::OutputWriteFailed {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(dir).await.map_err(write_failed)?;
        let part = PartFile::new(tmp_path.clone());
        let mut out = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(write_failed)?;

        let mut received: u64 = 0;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| download_failed(e.to_string()))?;
            out.write_all(&chunk).await.map_err(write_failed)?;
            received += chunk.len() as u64;
            if let Some(cb) = &self.config.progress_callback {
                cb.on_download_progress(received, total);
            }
        }

        out.flush().await.map_err(write_failed)?;
        drop(out);
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(write_failed)?;
        part.keep();

        info!("Saved {} ({} bytes)", path.display(), received);
        Ok(path)
    }

    /// Query the gateway health endpoint.
    pub async fn health(&self) -> Result<HealthStatus, ConverterError> {
        let url = self.config.health_url();
        debug!("Health check: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ConverterError::HealthCheckFailed {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConverterError::HealthCheckFailed {
                reason: format!("HTTP {status}"),
            });
        }

        let health: HealthStatus = response
            .json()
            .await
            .map_err(|e| ConverterError::HealthCheckFailed {
                reason: format!("unexpected response: {e}"),
            })?;

        if !health.is_healthy() {
            return Err(ConverterError::HealthCheckFailed {
                reason: format!("service reports status '{}'", health.status),
            });
        }
        Ok(health)
    }

    fn file_part(&self, file: &SelectedFile, body: Body) -> Result<Part, ConverterError> {
        Part::stream_with_length(body, file.size())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)
            .map_err(|e| {
                ConverterError::Internal(format!(
                    "Invalid content type '{}': {e}",
                    file.content_type
                ))
            })
    }
}

#[async_trait]
impl ConversionBackend for HttpBackend {
    async fn upload(
        &self,
        file: &SelectedFile,
        progress: PercentSink,
    ) -> Result<UploadResponse, ConverterError> {
        let url = self.config.endpoint(&["upload"]);
        let total = file.size();
        info!("Uploading {} ({} bytes) to {}", file.name, total, url);

        if let Some(cb) = &self.config.progress_callback {
            cb.on_upload_start(total);
        }
        progress(0);

        let body = progress_body(
            file.data.clone(),
            self.config.upload_chunk_size,
            progress.clone(),
            self.config.progress_callback.clone(),
        );
        let form = Form::new().part("file", self.file_part(file, body)?);

        let sent = self.client.post(url).multipart(form).send().await;
        let response: UploadResponse = read_json(sent, UPLOAD_FAILED_FALLBACK, "upload")
            .await
            .map_err(|f| ConverterError::UploadFailed {
                message: f.message,
                status: f.status,
            })?;

        progress(100);
        if let Some(cb) = &self.config.progress_callback {
            cb.on_upload_complete(total);
        }
        info!(
            "Upload accepted: {} ({} bytes)",
            response.metadata.filename, response.metadata.size
        );
        Ok(response)
    }

    async fn convert(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConvertResponse, ConverterError> {
        let url = self.config.endpoint(&["convert"]);
        info!(
            "Converting {} (password protection: {})",
            request.file.name,
            if request.password.is_some() { "yes" } else { "no" }
        );

        let body = Body::from(request.file.data.clone());
        let mut form = Form::new().part("file", self.file_part(&request.file, body)?);
        for (name, value) in request.form_fields() {
            form = form.text(name, value.to_string());
        }

        let sent = self.client.post(url).multipart(form).send().await;
        let response: ConvertResponse = read_json(sent, CONVERSION_FAILED_FALLBACK, "convert")
            .await
            .map_err(|f| ConverterError::ConversionFailed {
                message: f.message,
                status: f.status,
            })?;

        info!("Conversion produced {}", response.filename);
        Ok(response)
    }

    fn download_url(&self, filename: &str) -> String {
        self.config.download_url(filename)
    }
}

/// A `.part` download that is deleted unless [`PartFile::keep`] is called.
///
/// Covers every early return in `download` as well as the future being
/// dropped mid-transfer.
struct PartFile {
    path: PathBuf,
    kept: bool,
}

impl PartFile {
    fn new(path: PathBuf) -> Self {
        Self { path, kept: false }
    }

    /// The file was renamed into place; nothing to clean up.
    fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed partial download {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {e}", self.path.display()),
        }
    }
}

/// Split `data` into chunks and report progress as each one is pulled by the
/// transport.
fn progress_chunks(
    data: Bytes,
    chunk_size: usize,
    sink: PercentSink,
    callback: Option<ProgressCallback>,
) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static {
    let total = data.len() as u64;
    let chunks: Vec<Bytes> = (0..data.len())
        .step_by(chunk_size.max(1))
        .map(|start| data.slice(start..(start + chunk_size).min(data.len())))
        .collect();

    let mut sent: u64 = 0;
    stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len() as u64;
        let pct = percent(sent, total);
        sink(pct);
        if let Some(cb) = &callback {
            cb.on_upload_progress(pct, sent, total);
        }
        Ok(chunk)
    }))
}

fn progress_body(
    data: Bytes,
    chunk_size: usize,
    sink: PercentSink,
    callback: Option<ProgressCallback>,
) -> Body {
    Body::wrap_stream(progress_chunks(data, chunk_size, sink, callback))
}

/// Decode a JSON success body, or turn any failure into a [`RequestFailure`].
async fn read_json<T: DeserializeOwned>(
    sent: Result<Response, reqwest::Error>,
    fallback: &str,
    endpoint: &str,
) -> Result<T, RequestFailure> {
    let response = sent.map_err(|e| {
        warn!("{endpoint}: request failed: {e}");
        RequestFailure::fallback(fallback, e.status().map(|s| s.as_u16()))
    })?;

    let status = response.status();
    let text = response.text().await.map_err(|e| {
        warn!("{endpoint}: could not read response body: {e}");
        RequestFailure::fallback(fallback, Some(status.as_u16()))
    })?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.error)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback.to_string());
        warn!("{endpoint}: HTTP {status}: {message}");
        return Err(RequestFailure {
            message,
            status: Some(status.as_u16()),
        });
    }

    serde_json::from_str(&text).map_err(|e| {
        warn!("{endpoint}: undecodable success body ({e}): {text}");
        RequestFailure::fallback(fallback, Some(status.as_u16()))
    })
}
