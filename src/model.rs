//! Data carried between the session, the backend, and the caller.
//!
//! Nothing here is persisted: a [`SelectedFile`] and its [`UploadMetadata`]
//! live exactly as long as the session keeps them, and a
//! [`ConversionRequest`] only exists for the duration of one convert call.

use crate::error::ConverterError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Suffix every uploadable file must carry (case-sensitive).
pub const DOCX_EXTENSION: &str = ".docx";

/// MIME type sent with the multipart `file` field.
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// A file chosen by the user, held in memory so it can be sent twice
/// (once to `/upload`, again to `/convert`).
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.size())
            .finish()
    }
}

impl SelectedFile {
    /// Wrap an in-memory buffer. The content type defaults to DOCX.
    pub fn from_bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: DOCX_CONTENT_TYPE.to_string(),
            data: data.into(),
        }
    }

    /// Read a local file into memory.
    ///
    /// The extension is not checked here; the session validates it when the
    /// file is selected so that the rejection surfaces as a notification.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ConverterError> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => ConverterError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ConverterError::FileNotFound {
                path: path.to_path_buf(),
            },
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ConverterError::FileNotFound {
                path: PathBuf::from(path),
            })?;

        debug!("Read {} ({} bytes)", path.display(), data.len());
        Ok(Self::from_bytes(name, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// `true` when the name ends in exactly `.docx`.
    pub fn has_docx_extension(&self) -> bool {
        self.name.ends_with(DOCX_EXTENSION)
    }
}

/// Facts the backend reports about an uploaded file.
///
/// The upload service answers with an empty object when it cannot stat the
/// stored file, so every field has a default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadMetadata {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    /// ISO-8601 string; may be absent or unparseable.
    #[serde(default)]
    pub upload_time: Option<String>,
}

/// Body of a successful `POST /upload`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
    /// Unique name under which the backend stored the upload.
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub metadata: UploadMetadata,
}

/// Body of a successful `POST /convert`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub filename: String,
}

/// Error body returned with any non-2xx status. The string is opaque.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// One convert call: the originally selected file plus an optional password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub file: SelectedFile,
    pub password: Option<String>,
}

impl ConversionRequest {
    /// An empty password means "no password" and is dropped.
    pub fn new(file: SelectedFile, password: impl Into<String>) -> Self {
        let password = password.into();
        Self {
            file,
            password: (!password.is_empty()).then_some(password),
        }
    }

    /// Multipart text fields sent alongside the `file` part.
    pub fn form_fields(&self) -> Vec<(&'static str, &str)> {
        self.password
            .as_deref()
            .map(|p| vec![("password", p)])
            .unwrap_or_default()
    }
}

/// Where the converted PDF can be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTarget {
    /// Result filename reported by `/convert`.
    pub filename: String,
    /// `{api_url}/download/{filename}`.
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docx_suffix_is_case_sensitive() {
        assert!(SelectedFile::from_bytes("report.docx", Vec::new()).has_docx_extension());
        assert!(!SelectedFile::from_bytes("report.DOCX", Vec::new()).has_docx_extension());
        assert!(!SelectedFile::from_bytes("report.doc", Vec::new()).has_docx_extension());
        assert!(!SelectedFile::from_bytes("report.docx.pdf", Vec::new()).has_docx_extension());
        assert!(!SelectedFile::from_bytes("", Vec::new()).has_docx_extension());
    }

    #[test]
    fn empty_password_is_not_sent() {
        let file = SelectedFile::from_bytes("a.docx", vec![1, 2, 3]);
        let req = ConversionRequest::new(file, "");
        assert_eq!(req.password, None);
        assert!(req.form_fields().is_empty());
    }

    #[test]
    fn password_is_sent_verbatim() {
        let file = SelectedFile::from_bytes("a.docx", vec![1, 2, 3]);
        let req = ConversionRequest::new(file, "  s3cret ");
        assert_eq!(req.form_fields(), vec![("password", "  s3cret ")]);
    }

    #[test]
    fn upload_response_decodes_backend_shape() {
        let body = r#"{
            "message": "File uploaded successfully",
            "filename": "report_20240101_000000.docx",
            "metadata": {"filename": "report.docx", "size": 12345, "upload_time": "2024-01-01T00:00:00Z"}
        }"#;
        let resp: UploadResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.metadata.filename, "report.docx");
        assert_eq!(resp.metadata.size, 12345);
        assert_eq!(
            resp.metadata.upload_time.as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
        assert_eq!(resp.filename.as_deref(), Some("report_20240101_000000.docx"));
    }

    #[test]
    fn empty_metadata_object_is_tolerated() {
        let resp: UploadResponse = serde_json::from_str(r#"{"metadata": {}}"#).unwrap();
        assert_eq!(resp.metadata, UploadMetadata::default());

        let resp: UploadResponse =
            serde_json::from_str(r#"{"metadata": {"filename": "x.docx", "size": 3, "upload_time": null}}"#)
                .unwrap();
        assert_eq!(resp.metadata.upload_time, None);
    }

    #[test]
    fn error_body_with_unexpected_shape() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail": "nope"}"#).unwrap();
        assert!(body.error.is_none());
    }

    #[tokio::test]
    async fn from_path_reads_name_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("letter.docx");
        std::fs::write(&path, b"PK\x03\x04fake").unwrap();

        let file = SelectedFile::from_path(&path).await.unwrap();
        assert_eq!(file.name, "letter.docx");
        assert_eq!(file.size(), 8);
        assert_eq!(file.content_type, DOCX_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn from_path_missing_file() {
        let err = SelectedFile::from_path("/definitely/not/here.docx")
            .await
            .unwrap_err();
        assert!(matches!(err, ConverterError::FileNotFound { .. }));
    }
}
