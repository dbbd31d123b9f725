//! Configuration for talking to the conversion backend.
//!
//! The backend base URL (`API_URL`) is passed in explicitly when the client is
//! built; the library never reads it from the environment. The CLI maps its
//! flags and `DOCX2PDF_*` variables onto [`ClientConfigBuilder`].

use crate::error::ConverterError;
use crate::progress::ProgressCallback;
use reqwest::Url;
use std::fmt;
use std::time::Duration;

/// How long a notification stays visible before it dismisses itself.
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(6);

/// Smallest upload chunk; keeps progress events from flooding the callback.
const MIN_UPLOAD_CHUNK: usize = 1024;

/// Configuration for a [`crate::client::HttpBackend`] and the session that
/// drives it.
///
/// # Example
/// ```rust
/// use docx2pdf_client::ClientConfig;
///
/// let config = ClientConfig::builder("http://localhost:5000/api/")
///     .request_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.api_url(), "http://localhost:5000/api");
/// assert_eq!(
///     config.download_url("report.pdf"),
///     "http://localhost:5000/api/download/report.pdf"
/// );
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    api_url: Url,

    /// Whole-request timeout for upload and convert, in seconds. Default: 120.
    ///
    /// Conversion runs LibreOffice on the backend and can take a while for
    /// large documents.
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds. Default: 10.
    pub connect_timeout_secs: u64,

    /// Auto-dismiss delay for notifications. Default: 6 s.
    pub notification_ttl: Duration,

    /// Upload body chunk size in bytes; one progress event per chunk. Default: 64 KiB.
    pub upload_chunk_size: usize,

    /// Optional transfer progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_url", &self.api_url())
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("notification_ttl", &self.notification_ttl)
            .field("upload_chunk_size", &self.upload_chunk_size)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn TransferProgressCallback>"),
            )
            .finish()
    }
}

impl ClientConfig {
    /// Create a new builder for the given backend base URL.
    pub fn builder(api_url: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder {
            api_url: api_url.into(),
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
            notification_ttl: DEFAULT_NOTIFICATION_TTL,
            upload_chunk_size: 64 * 1024,
            progress_callback: None,
        }
    }

    /// Base URL without a trailing slash.
    pub fn api_url(&self) -> &str {
        self.api_url.as_str().trim_end_matches('/')
    }

    /// `{api_url}/{segment}/{segment}…`, each segment percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        // Validated in `build()`: http(s) URLs can always be a base.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// URL the converted PDF is served from.
    pub fn download_url(&self, filename: &str) -> String {
        self.endpoint(&["download", filename]).to_string()
    }

    /// The gateway exposes `/health` at the root of the host, not under the
    /// API prefix.
    pub fn health_url(&self) -> Url {
        let mut url = self.api_url.clone();
        url.set_path("/health");
        url.set_query(None);
        url
    }
}

/// Builder for [`ClientConfig`].
pub struct ClientConfigBuilder {
    api_url: String,
    request_timeout_secs: u64,
    connect_timeout_secs: u64,
    notification_ttl: Duration,
    upload_chunk_size: usize,
    progress_callback: Option<ProgressCallback>,
}

impl ClientConfigBuilder {
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn notification_ttl(mut self, ttl: Duration) -> Self {
        self.notification_ttl = ttl;
        self
    }

    pub fn upload_chunk_size(mut self, bytes: usize) -> Self {
        self.upload_chunk_size = bytes.max(MIN_UPLOAD_CHUNK);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating the base URL and timeouts.
    pub fn build(self) -> Result<ClientConfig, ConverterError> {
        let raw = self.api_url.trim();
        let api_url = Url::parse(raw).map_err(|e| {
            ConverterError::InvalidConfig(format!("API URL '{raw}' is invalid: {e}"))
        })?;

        if !matches!(api_url.scheme(), "http" | "https") {
            return Err(ConverterError::InvalidConfig(format!(
                "API URL must use http or https, got '{}'",
                api_url.scheme()
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConverterError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }

        Ok(ClientConfig {
            api_url,
            request_timeout_secs: self.request_timeout_secs,
            connect_timeout_secs: self.connect_timeout_secs.max(1),
            notification_ttl: self.notification_ttl,
            upload_chunk_size: self.upload_chunk_size.max(MIN_UPLOAD_CHUNK),
            progress_callback: self.progress_callback,
        })
    }
}
