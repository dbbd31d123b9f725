//! The upload → review → convert state machine.
//!
//! ```text
//!            select_file (.docx)             upload ok
//!   Idle ───────────────────────▶ Uploading ───────────▶ Ready ◀──────┐
//!    ▲  ◀─────────────────────────────┘  upload failed     │          │
//!    │                                                     │ convert  │ ok / failed
//!    │  reset (from anywhere)                              ▼          │
//!    └──────────────────────────────────────────────── Converting ────┘
//! ```
//!
//! The tagged [`SessionState`] carries the selected file and its metadata, so
//! "metadata without a file" or "loading while idle" cannot be represented.
//! The remaining view flags (password, dialog, drag highlight, progress,
//! notifications) live alongside it in [`ConverterSession`].
//!
//! Each transition is available in two forms:
//!
//! * **Drivers** (`select_file`, `drop_files`, `convert`) run the whole step,
//!   including the backend call. They take `&mut self` across the await, so at
//!   most one request is ever in flight per session.
//! * **Pure transitions** (`begin_upload`/`finish_upload`,
//!   `begin_convert`/`finish_convert`) for hosts that run the request
//!   themselves, e.g. a UI event loop. Each `begin_*` hands out a
//!   [`RequestToken`]; `finish_*` only accepts the token of the request the
//!   session is currently waiting on, so a late reply to a request that was
//!   reset or superseded is refused instead of being attached to another file.
//!
//! Hosts that render notifications schedule `tick` from the earliest expiry:
//!
//! ```rust,no_run
//! # use docx2pdf_client::ConverterSession;
//! # async fn pump(session: &mut ConverterSession) {
//! while let Some(due) = session.notifications().next_expiry() {
//!     tokio::time::sleep_until(due.into()).await;
//!     session.tick(std::time::Instant::now());
//! }
//! # }
//! ```
//!
//! Failures never escape as panics: every error is recorded as a notification
//! and also returned so the caller can react (the CLI uses it for its exit code).

use crate::backend::ConversionBackend;
use crate::error::ConverterError;
use crate::format::{format_size, format_timestamp};
use crate::model::{
    ConversionRequest, ConvertResponse, DownloadTarget, SelectedFile, UploadMetadata,
    UploadResponse,
};
use crate::notification::{Notifications, Severity};
use crate::progress::PercentSink;
use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded successfully";
pub const CONVERSION_SUCCESS_MESSAGE: &str = "File converted successfully";

/// Identifies one upload or convert request issued by a `begin_*` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

/// Where the session is in the conversion lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing selected. Initial state, and where `reset` leads.
    #[default]
    Idle,
    /// `file` is being sent to the upload endpoint.
    Uploading { file: SelectedFile },
    /// The backend accepted `file` and reported `metadata`.
    Ready {
        file: SelectedFile,
        metadata: UploadMetadata,
    },
    /// `file` is being converted.
    Converting {
        file: SelectedFile,
        metadata: UploadMetadata,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Uploading { .. } => "uploading",
            SessionState::Ready { .. } => "ready",
            SessionState::Converting { .. } => "converting",
        }
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        match self {
            SessionState::Idle => None,
            SessionState::Uploading { file }
            | SessionState::Ready { file, .. }
            | SessionState::Converting { file, .. } => Some(file),
        }
    }

    pub fn metadata(&self) -> Option<&UploadMetadata> {
        match self {
            SessionState::Ready { metadata, .. } | SessionState::Converting { metadata, .. } => {
                Some(metadata)
            }
            _ => None,
        }
    }

    /// A request is in flight.
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            SessionState::Uploading { .. } | SessionState::Converting { .. }
        )
    }
}

/// Everything the view renders, in display form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewSnapshot {
    pub state: &'static str,
    pub loading: bool,
    pub upload_progress: u8,
    pub password_dialog_open: bool,
    pub drag_active: bool,
    pub has_password: bool,
    pub filename: Option<String>,
    pub size: Option<u64>,
    pub size_display: Option<String>,
    pub upload_time: Option<String>,
    pub upload_time_display: Option<String>,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// One file's journey from selection to a downloadable PDF.
pub struct ConverterSession {
    backend: Arc<dyn ConversionBackend>,
    state: SessionState,
    password: String,
    password_dialog_open: bool,
    drag_active: bool,
    upload_progress: Arc<AtomicU8>,
    notifications: Notifications,
    /// Bumped by every `begin_*` and by `reset`.
    generation: u64,
}

impl std::fmt::Debug for ConverterSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConverterSession")
            .field("state", &self.state.name())
            .field("password_dialog_open", &self.password_dialog_open)
            .field("drag_active", &self.drag_active)
            .field("upload_progress", &self.upload_progress())
            .field("notifications", &self.notifications)
            .finish_non_exhaustive()
    }
}

impl ConverterSession {
    pub fn new(backend: Arc<dyn ConversionBackend>) -> Self {
        Self::with_notification_ttl(backend, crate::config::DEFAULT_NOTIFICATION_TTL)
    }

    pub fn with_notification_ttl(backend: Arc<dyn ConversionBackend>, ttl: Duration) -> Self {
        Self {
            backend,
            state: SessionState::Idle,
            password: String::new(),
            password_dialog_open: false,
            drag_active: false,
            upload_progress: Arc::new(AtomicU8::new(0)),
            notifications: Notifications::new(ttl),
            generation: 0,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.state.file()
    }

    pub fn metadata(&self) -> Option<&UploadMetadata> {
        self.state.metadata()
    }

    pub fn loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn is_password_dialog_open(&self) -> bool {
        self.password_dialog_open
    }

    pub fn is_drag_active(&self) -> bool {
        self.drag_active
    }

    /// Upload completion, 0–100.
    pub fn upload_progress(&self) -> u8 {
        self.upload_progress.load(Ordering::SeqCst)
    }

    pub fn error(&self) -> Option<&str> {
        self.notifications.error()
    }

    pub fn success(&self) -> Option<&str> {
        self.notifications.success()
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let metadata = self.metadata();
        ViewSnapshot {
            state: self.state.name(),
            loading: self.loading(),
            upload_progress: self.upload_progress(),
            password_dialog_open: self.password_dialog_open,
            drag_active: self.drag_active,
            has_password: !self.password.is_empty(),
            filename: metadata.map(|m| m.filename.clone()),
            size: metadata.map(|m| m.size),
            size_display: metadata.map(|m| format_size(m.size)),
            upload_time: metadata.and_then(|m| m.upload_time.clone()),
            upload_time_display: metadata.map(|m| format_timestamp(m.upload_time.as_deref())),
            error: self.error().map(str::to_string),
            success: self.success().map(str::to_string),
        }
    }

    // ── Drag and drop ────────────────────────────────────────────────────

    pub fn drag_enter(&mut self) {
        self.drag_active = true;
    }

    pub fn drag_leave(&mut self) {
        self.drag_active = false;
    }

    /// Handle a drop: only the first file is considered.
    pub async fn drop_files(
        &mut self,
        files: Vec<SelectedFile>,
    ) -> Result<UploadMetadata, ConverterError> {
        self.drag_active = false;
        match files.into_iter().next() {
            Some(file) => self.select_file(file).await,
            None => Err(self.fail(ConverterError::NoFileSelected)),
        }
    }

    // ── Upload ───────────────────────────────────────────────────────────

    /// Validate `file` and upload it.
    ///
    /// A file without the `.docx` suffix is rejected before any request is
    /// made and the session state is left as it was. Selecting a new file
    /// while `Ready` discards the previous one.
    pub async fn select_file(
        &mut self,
        file: SelectedFile,
    ) -> Result<UploadMetadata, ConverterError> {
        let token = self.begin_upload(file)?;

        let file = match &self.state {
            SessionState::Uploading { file } => file.clone(),
            _ => return Err(ConverterError::Internal("upload did not start".into())),
        };
        let backend = Arc::clone(&self.backend);
        let progress = Arc::clone(&self.upload_progress);
        let sink: PercentSink = Arc::new(move |pct| progress.store(pct.min(100), Ordering::SeqCst));

        let request = InFlight::new(self);
        let result = backend.upload(&file, sink).await;
        request.finish(|session| session.finish_upload(token, result))
    }

    /// Enter `Uploading` with `file`, or reject it.
    ///
    /// Any previous file and its metadata are dropped and the progress
    /// restarts at 0.
    pub fn begin_upload(&mut self, file: SelectedFile) -> Result<RequestToken, ConverterError> {
        if self.loading() {
            return Err(ConverterError::Busy);
        }
        if !file.has_docx_extension() {
            return Err(self.fail(ConverterError::InvalidExtension {
                filename: file.name,
            }));
        }

        info!("Selected {} ({} bytes)", file.name, file.size());
        self.notifications.dismiss(Severity::Error);
        self.password_dialog_open = false;
        self.upload_progress.store(0, Ordering::SeqCst);
        self.state = SessionState::Uploading { file };
        Ok(self.next_token())
    }

    /// Leave `Uploading` with the backend's answer.
    ///
    /// Success moves to `Ready` and opens the password dialog; failure
    /// returns to `Idle` with the error shown.
    pub fn finish_upload(
        &mut self,
        token: RequestToken,
        result: Result<UploadResponse, ConverterError>,
    ) -> Result<UploadMetadata, ConverterError> {
        self.check_token(token, "finish a superseded upload")?;
        let file = match std::mem::take(&mut self.state) {
            SessionState::Uploading { file } => file,
            other => {
                let state = other.name();
                self.state = other;
                return Err(ConverterError::InvalidState {
                    operation: "finish an upload",
                    state,
                });
            }
        };

        match result {
            Ok(response) => {
                let metadata = response.metadata;
                info!(
                    "Upload complete: {} ({})",
                    metadata.filename,
                    format_size(metadata.size)
                );
                self.state = SessionState::Ready {
                    file,
                    metadata: metadata.clone(),
                };
                self.password_dialog_open = true;
                self.notify(Severity::Success, UPLOAD_SUCCESS_MESSAGE);
                Ok(metadata)
            }
            Err(e) => {
                warn!("Upload of {} failed: {}", file.name, e);
                self.state = SessionState::Idle;
                Err(self.fail(e))
            }
        }
    }

    // ── Password dialog ──────────────────────────────────────────────────

    pub fn open_password_dialog(&mut self) -> Result<(), ConverterError> {
        match self.state {
            SessionState::Ready { .. } => {
                self.password_dialog_open = true;
                Ok(())
            }
            SessionState::Uploading { .. } | SessionState::Converting { .. } => {
                Err(ConverterError::Busy)
            }
            SessionState::Idle => Err(ConverterError::InvalidState {
                operation: "set a password",
                state: self.state.name(),
            }),
        }
    }

    pub fn close_password_dialog(&mut self) {
        self.password_dialog_open = false;
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.password = password.into();
    }

    // ── Convert ──────────────────────────────────────────────────────────

    /// Convert the uploaded file, attaching the password if one is set.
    ///
    /// On success the returned [`DownloadTarget`] is where the PDF can be
    /// fetched; the dialog is closed and the password cleared. On failure the
    /// dialog and password are kept so the user can retry.
    pub async fn convert(&mut self) -> Result<DownloadTarget, ConverterError> {
        let (token, request) = self.begin_convert()?;
        let backend = Arc::clone(&self.backend);

        let in_flight = InFlight::new(self);
        let result = backend.convert(&request).await;
        in_flight.finish(|session| session.finish_convert(token, result))
    }

    /// Enter `Converting` and build the request to send.
    pub fn begin_convert(&mut self) -> Result<(RequestToken, ConversionRequest), ConverterError> {
        let (file, metadata) = match std::mem::take(&mut self.state) {
            SessionState::Ready { file, metadata } => (file, metadata),
            other => {
                let busy = other.is_loading();
                let state = other.name();
                self.state = other;
                return Err(if busy {
                    ConverterError::Busy
                } else {
                    ConverterError::InvalidState {
                        operation: "convert",
                        state,
                    }
                });
            }
        };

        self.notifications.dismiss(Severity::Error);
        let request = ConversionRequest::new(file.clone(), self.password.clone());
        debug!(
            "Converting {} (password: {})",
            file.name,
            request.password.is_some()
        );
        self.state = SessionState::Converting { file, metadata };
        Ok((self.next_token(), request))
    }

    /// Leave `Converting` with the backend's answer. Both outcomes return to
    /// `Ready` so the user can convert again or reset.
    pub fn finish_convert(
        &mut self,
        token: RequestToken,
        result: Result<ConvertResponse, ConverterError>,
    ) -> Result<DownloadTarget, ConverterError> {
        self.check_token(token, "finish a superseded conversion")?;
        let (file, metadata) = match std::mem::take(&mut self.state) {
            SessionState::Converting { file, metadata } => (file, metadata),
            other => {
                let state = other.name();
                self.state = other;
                return Err(ConverterError::InvalidState {
                    operation: "finish a conversion",
                    state,
                });
            }
        };
        self.state = SessionState::Ready { file, metadata };

        match result {
            Ok(response) => {
                let target = DownloadTarget {
                    url: self.backend.download_url(&response.filename),
                    filename: response.filename,
                };
                info!("Converted; download from {}", target.url);
                self.password_dialog_open = false;
                self.password.clear();
                self.notify(Severity::Success, CONVERSION_SUCCESS_MESSAGE);
                Ok(target)
            }
            Err(e) => {
                warn!("Conversion failed: {}", e);
                Err(self.fail(e))
            }
        }
    }

    // ── Reset & notifications ────────────────────────────────────────────

    /// Return to the exact initial state.
    pub fn reset(&mut self) {
        debug!("Reset from {}", self.state.name());
        self.generation += 1;
        self.state = SessionState::Idle;
        self.password.clear();
        self.password_dialog_open = false;
        self.drag_active = false;
        self.upload_progress.store(0, Ordering::SeqCst);
        self.notifications.clear();
    }

    pub fn dismiss_error(&mut self) {
        self.notifications.dismiss(Severity::Error);
    }

    pub fn dismiss_success(&mut self) {
        self.notifications.dismiss(Severity::Success);
    }

    /// Auto-dismiss notices that have outlived the TTL.
    pub fn tick(&mut self, now: Instant) -> Vec<Severity> {
        self.notifications.expire(now)
    }

    fn next_token(&mut self) -> RequestToken {
        self.generation += 1;
        RequestToken(self.generation)
    }

    /// Refuse a reply to anything but the request currently in flight.
    fn check_token(
        &self,
        token: RequestToken,
        operation: &'static str,
    ) -> Result<(), ConverterError> {
        if token == RequestToken(self.generation) {
            return Ok(());
        }
        debug!("Ignoring reply for request {} (current {})", token.0, self.generation);
        Err(ConverterError::InvalidState {
            operation,
            state: self.state.name(),
        })
    }

    fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        self.notifications.raise(severity, message, Instant::now());
    }

    /// Record `err` as the visible error and hand it back.
    fn fail(&mut self, err: ConverterError) -> ConverterError {
        self.notify(Severity::Error, err.user_message());
        err
    }

    /// Undo a `begin_*` whose request was abandoned before it finished.
    fn abandon_request(&mut self) {
        self.state = match std::mem::take(&mut self.state) {
            SessionState::Uploading { file } => {
                warn!("Upload of {} abandoned", file.name);
                SessionState::Idle
            }
            SessionState::Converting { file, metadata } => {
                warn!("Conversion of {} abandoned", file.name);
                SessionState::Ready { file, metadata }
            }
            other => other,
        };
    }
}

/// Guarantees the loading state is left even if a driver future is dropped
/// while its request is in flight.
struct InFlight<'a> {
    session: &'a mut ConverterSession,
    done: bool,
}

impl<'a> InFlight<'a> {
    fn new(session: &'a mut ConverterSession) -> Self {
        Self {
            session,
            done: false,
        }
    }

    /// The request finished; run the `finish_*` step on the session.
    fn finish<T>(mut self, step: impl FnOnce(&mut ConverterSession) -> T) -> T {
        self.done = true;
        step(&mut *self.session)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.session.abandon_request();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory backend that records every call.
    #[derive(Default)]
    struct FakeBackend {
        uploads: Mutex<Vec<String>>,
        converts: Mutex<Vec<ConversionRequest>>,
        upload_error: Option<String>,
        convert_error: Option<String>,
    }

    #[async_trait]
    impl ConversionBackend for FakeBackend {
        async fn upload(
            &self,
            file: &SelectedFile,
            progress: PercentSink,
        ) -> Result<UploadResponse, ConverterError> {
            self.uploads.lock().unwrap().push(file.name.clone());
            progress(50);
            progress(100);
            if let Some(message) = &self.upload_error {
                return Err(ConverterError::UploadFailed {
                    message: message.clone(),
                    status: Some(400),
                });
            }
            Ok(UploadResponse {
                metadata: UploadMetadata {
                    filename: file.name.clone(),
                    size: file.size(),
                    upload_time: Some("2024-01-01T00:00:00Z".into()),
                },
                ..Default::default()
            })
        }

        async fn convert(
            &self,
            request: &ConversionRequest,
        ) -> Result<ConvertResponse, ConverterError> {
            self.converts.lock().unwrap().push(request.clone());
            if let Some(message) = &self.convert_error {
                return Err(ConverterError::ConversionFailed {
                    message: message.clone(),
                    status: Some(500),
                });
            }
            Ok(ConvertResponse {
                filename: request.file.name.replace(".docx", ".pdf"),
            })
        }

        fn download_url(&self, filename: &str) -> String {
            format!("http://backend.test/api/download/{filename}")
        }
    }

    fn session_with(backend: FakeBackend) -> (ConverterSession, Arc<FakeBackend>) {
        let backend = Arc::new(backend);
        (ConverterSession::new(backend.clone()), backend)
    }

    fn docx(name: &str, len: usize) -> SelectedFile {
        SelectedFile::from_bytes(name, vec![0u8; len])
    }

    #[tokio::test]
    async fn non_docx_is_rejected_without_request() {
        let (mut session, backend) = session_with(FakeBackend::default());

        for name in ["notes.txt", "report.DOCX", "report.doc", "docx", "report.docx.bak"] {
            let err = session.select_file(docx(name, 10)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert_eq!(session.state(), &SessionState::Idle);
            assert_eq!(session.error(), Some("Please upload a .docx file"));
        }
        assert!(backend.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn successful_upload_shows_metadata_and_opens_dialog() {
        let (mut session, _) = session_with(FakeBackend::default());

        let metadata = session.select_file(docx("report.docx", 12_345)).await.unwrap();
        assert_eq!(metadata.size, 12_345);
        assert_eq!(session.state().name(), "ready");
        assert_eq!(session.metadata(), Some(&metadata));
        assert!(session.is_password_dialog_open());
        assert_eq!(session.success(), Some(UPLOAD_SUCCESS_MESSAGE));
        assert_eq!(session.upload_progress(), 100);
        assert!(!session.loading());

        let view = session.snapshot();
        assert_eq!(view.size_display.as_deref(), Some("12.06 KB"));
        assert_eq!(view.filename.as_deref(), Some("report.docx"));
    }

    #[tokio::test]
    async fn failed_upload_returns_to_idle_with_server_message() {
        let (mut session, _) = session_with(FakeBackend {
            upload_error: Some("File too large".into()),
            ..Default::default()
        });

        let err = session.select_file(docx("big.docx", 10)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Request);
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(session.metadata(), None);
        assert_eq!(session.error(), Some("File too large"));
        assert!(!session.loading());
        assert!(!session.is_password_dialog_open());
    }

    #[tokio::test]
    async fn empty_password_is_not_attached() {
        let (mut session, backend) = session_with(FakeBackend::default());
        session.select_file(docx("report.docx", 10)).await.unwrap();

        session.set_password("");
        session.convert().await.unwrap();

        let converts = backend.converts.lock().unwrap();
        assert_eq!(converts.len(), 1);
        assert_eq!(converts[0].password, None);
        assert!(converts[0].form_fields().is_empty());
    }

    #[tokio::test]
    async fn convert_with_password_yields_download_target() {
        let (mut session, backend) = session_with(FakeBackend::default());
        session.select_file(docx("report.docx", 10)).await.unwrap();

        session.set_password("secret");
        let target = session.convert().await.unwrap();

        assert_eq!(target.filename, "report.pdf");
        assert_eq!(target.url, "http://backend.test/api/download/report.pdf");
        assert_eq!(
            backend.converts.lock().unwrap()[0].password.as_deref(),
            Some("secret")
        );
        assert!(!session.is_password_dialog_open());
        assert_eq!(session.password(), "");
        assert_eq!(session.success(), Some(CONVERSION_SUCCESS_MESSAGE));
        assert_eq!(session.state().name(), "ready");
    }

    #[tokio::test]
    async fn failed_convert_keeps_dialog_and_password() {
        let (mut session, _) = session_with(FakeBackend {
            convert_error: Some("Failed to encrypt PDF".into()),
            ..Default::default()
        });
        session.select_file(docx("report.docx", 10)).await.unwrap();
        session.set_password("secret");

        let err = session.convert().await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to encrypt PDF");
        assert!(session.is_password_dialog_open());
        assert_eq!(session.password(), "secret");
        assert_eq!(session.error(), Some("Failed to encrypt PDF"));
        assert_eq!(session.state().name(), "ready");
        assert!(!session.loading());
    }

    #[tokio::test]
    async fn convert_requires_an_uploaded_file() {
        let (mut session, backend) = session_with(FakeBackend::default());
        let err = session.convert().await.unwrap_err();
        assert!(matches!(err, ConverterError::InvalidState { .. }));
        assert!(backend.converts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reset_restores_initial_state() {
        let (mut session, backend) = session_with(FakeBackend {
            convert_error: Some("nope".into()),
            ..Default::default()
        });
        let initial = session.snapshot();

        session.drag_enter();
        session.select_file(docx("report.docx", 2048)).await.unwrap();
        session.set_password("pw");
        let _ = session.convert().await;
        assert_ne!(session.snapshot(), initial);

        session.reset();
        assert_eq!(session.snapshot(), initial);
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(session.password(), "");

        // Reset from a mid-request state too.
        session.begin_upload(docx("other.docx", 1)).unwrap();
        session.reset();
        assert_eq!(session.snapshot(), ConverterSession::new(backend).snapshot());
    }

    #[tokio::test]
    async fn drop_uses_first_file_and_clears_drag_highlight() {
        let (mut session, backend) = session_with(FakeBackend::default());
        session.drag_enter();
        assert!(session.is_drag_active());

        session
            .drop_files(vec![docx("first.docx", 1), docx("second.docx", 1)])
            .await
            .unwrap();
        assert!(!session.is_drag_active());
        assert_eq!(*backend.uploads.lock().unwrap(), vec!["first.docx"]);
    }

    #[tokio::test]
    async fn empty_drop_is_a_validation_error() {
        let (mut session, backend) = session_with(FakeBackend::default());
        let err = session.drop_files(Vec::new()).await.unwrap_err();
        assert!(matches!(err, ConverterError::NoFileSelected));
        assert_eq!(session.error(), Some("Please upload a .docx file"));
        assert!(backend.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn new_selection_replaces_previous_file() {
        let (mut session, _) = session_with(FakeBackend::default());
        session.select_file(docx("a.docx", 1)).await.unwrap();
        session.select_file(docx("b.docx", 2)).await.unwrap();
        assert_eq!(session.file().map(|f| f.name.as_str()), Some("b.docx"));
        assert_eq!(session.metadata().map(|m| m.size), Some(2));
    }

    #[tokio::test]
    async fn invalid_file_while_ready_keeps_current_upload() {
        let (mut session, _) = session_with(FakeBackend::default());
        session.select_file(docx("a.docx", 1)).await.unwrap();
        assert!(session.select_file(docx("b.pdf", 1)).await.is_err());
        assert_eq!(session.state().name(), "ready");
        assert_eq!(session.file().map(|f| f.name.as_str()), Some("a.docx"));
    }

    #[test]
    fn pure_transitions_guard_against_double_submit() {
        let (mut session, _) = session_with(FakeBackend::default());
        let token = session.begin_upload(docx("a.docx", 1)).unwrap();
        assert!(session.loading());
        assert!(matches!(
            session.begin_upload(docx("b.docx", 1)),
            Err(ConverterError::Busy)
        ));
        assert!(matches!(session.begin_convert(), Err(ConverterError::Busy)));
        assert!(matches!(
            session.open_password_dialog(),
            Err(ConverterError::Busy)
        ));

        session.finish_upload(token, Ok(UploadResponse::default())).unwrap();
        assert!(!session.loading());
        assert!(matches!(
            session.finish_upload(token, Ok(UploadResponse::default())),
            Err(ConverterError::InvalidState { .. })
        ));
    }

    #[test]
    fn late_upload_reply_after_reset_is_refused() {
        let (mut session, _) = session_with(FakeBackend::default());
        let stale = session.begin_upload(docx("a.docx", 100)).unwrap();
        session.reset();
        let current = session.begin_upload(docx("b.docx", 2)).unwrap();
        assert_ne!(stale, current);

        let late = UploadResponse {
            metadata: UploadMetadata {
                filename: "a.docx".into(),
                size: 100,
                upload_time: None,
            },
            ..Default::default()
        };
        assert!(matches!(
            session.finish_upload(stale, Ok(late)),
            Err(ConverterError::InvalidState { .. })
        ));
        assert_eq!(session.state().name(), "uploading");
        assert_eq!(session.file().map(|f| f.name.as_str()), Some("b.docx"));
        assert_eq!(session.metadata(), None);
        assert_eq!(session.error(), None);

        let metadata = session
            .finish_upload(
                current,
                Ok(UploadResponse {
                    metadata: UploadMetadata {
                        filename: "b.docx".into(),
                        size: 2,
                        upload_time: None,
                    },
                    ..Default::default()
                }),
            )
            .unwrap();
        assert_eq!(metadata.filename, "b.docx");
        assert_eq!(session.metadata().map(|m| m.size), Some(2));
    }

    #[test]
    fn late_convert_reply_after_reset_is_refused() {
        let (mut session, _) = session_with(FakeBackend::default());
        let upload = session.begin_upload(docx("a.docx", 1)).unwrap();
        session.finish_upload(upload, Ok(UploadResponse::default())).unwrap();
        let (stale, _) = session.begin_convert().unwrap();
        session.reset();

        let late = Ok(ConvertResponse {
            filename: "a.pdf".into(),
        });
        assert!(matches!(
            session.finish_convert(stale, late),
            Err(ConverterError::InvalidState { .. })
        ));
        assert_eq!(session.state(), &SessionState::Idle);
        assert_eq!(session.success(), None);
    }

    #[tokio::test]
    async fn starting_a_new_upload_clears_previous_metadata() {
        let (mut session, _) = session_with(FakeBackend::default());
        session.select_file(docx("a.docx", 10)).await.unwrap();
        assert_eq!(session.upload_progress(), 100);
        assert!(session.is_password_dialog_open());

        session.begin_upload(docx("b.docx", 20)).unwrap();
        assert_eq!(session.metadata(), None);
        assert_eq!(session.upload_progress(), 0);
        assert!(session.loading());
        assert!(!session.is_password_dialog_open());
        assert_eq!(session.file().map(|f| f.name.as_str()), Some("b.docx"));

        let view = session.snapshot();
        assert_eq!(view.filename, None);
        assert_eq!(view.size_display, None);
    }

    #[test]
    fn password_dialog_needs_ready_state() {
        let (mut session, _) = session_with(FakeBackend::default());
        assert!(session.open_password_dialog().is_err());
        assert!(!session.is_password_dialog_open());

        let token = session.begin_upload(docx("a.docx", 1)).unwrap();
        session.finish_upload(token, Ok(UploadResponse::default())).unwrap();
        session.close_password_dialog();
        session.open_password_dialog().unwrap();
        assert!(session.is_password_dialog_open());
        assert!(session.metadata().is_some());
    }

    #[test]
    fn notifications_auto_dismiss() {
        let (mut session, _) = session_with(FakeBackend::default());
        session.begin_upload(docx("a.txt", 1)).unwrap_err();
        assert!(session.error().is_some());
        let due = session.notifications().next_expiry().unwrap();

        assert!(session.tick(Instant::now()).is_empty());
        let dismissed = session.tick(due);
        assert_eq!(dismissed, vec![Severity::Error]);
        assert_eq!(session.error(), None);
        assert_eq!(session.notifications().next_expiry(), None);
    }

    #[test]
    fn explicit_dismiss() {
        let (mut session, _) = session_with(FakeBackend::default());
        let token = session.begin_upload(docx("a.docx", 1)).unwrap();
        session.finish_upload(token, Ok(UploadResponse::default())).unwrap();
        assert!(session.success().is_some());
        session.dismiss_success();
        assert_eq!(session.success(), None);

        session.begin_upload(docx("a.txt", 1)).unwrap_err();
        session.dismiss_error();
        assert_eq!(session.error(), None);
    }

    #[test]
    fn abandoned_request_leaves_loading_state() {
        let (mut session, _) = session_with(FakeBackend::default());
        session.begin_upload(docx("a.docx", 1)).unwrap();
        drop(InFlight::new(&mut session));
        assert_eq!(session.state(), &SessionState::Idle);

        let token = session.begin_upload(docx("a.docx", 1)).unwrap();
        session.finish_upload(token, Ok(UploadResponse::default())).unwrap();
        session.begin_convert().unwrap();
        drop(InFlight::new(&mut session));
        assert_eq!(session.state().name(), "ready");
    }
}
