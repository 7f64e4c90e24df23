// src/models.rs
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::document::{FileKind, ResultDocument};
use crate::errors::{InspectError, Result};

/// Where a picked file's bytes come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    Path(PathBuf),
    Memory(Bytes),
}

/// A file handed over by the interaction surface, not yet validated.
#[derive(Debug, Clone)]
pub struct PickedFile {
    pub name: String,
    pub size: u64,
    pub source: FileSource,
}

impl PickedFile {
    /// Looks up name and size without reading the contents.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            size: metadata.len(),
            source: FileSource::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            source: FileSource::Memory(bytes),
        }
    }
}

/// One accepted file on its way to the analysis service. Consumed by a single send.
#[derive(Debug)]
pub struct SubmissionRequest {
    pub id: Uuid,
    pub file_name: String,
    pub file_size_bytes: u64,
    pub mime_or_extension: String,
    pub payload: Bytes,
    pub submitted_at: DateTime<Utc>,
}

impl SubmissionRequest {
    pub fn new(file_name: impl Into<String>, payload: Bytes) -> Self {
        let file_name = file_name.into();
        let mime_or_extension = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Self {
            id: Uuid::new_v4(),
            file_size_bytes: payload.len() as u64,
            mime_or_extension,
            file_name,
            payload,
            submitted_at: Utc::now(),
        }
    }

    /// Reads the picked file's contents.
    pub async fn from_picked(file: PickedFile) -> Result<Self> {
        let payload = match file.source {
            FileSource::Memory(bytes) => bytes,
            FileSource::Path(path) => Bytes::from(tokio::fs::read(&path).await?),
        };
        Ok(Self::new(file.name, payload))
    }

    /// Kind implied by the file's extension, used when the service's label is unknown.
    pub fn kind_hint(&self) -> FileKind {
        FileKind::from_file_name(&self.file_name).unwrap_or(FileKind::NativeExecutable)
    }
}

/// The failure shapes a submission can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    /// No response was obtained from the service.
    Network,
    /// Non-2xx status.
    ServerRejected,
    /// 2xx, but the body is not a usable result document.
    Malformed,
    /// 2xx with an explicit `error` field.
    BackendReportedError,
    Timeout,
}

impl FailureKind {
    /// Folds a transport-layer error into its failure kind.
    pub fn classify(err: &InspectError) -> Self {
        match err {
            InspectError::Request(e) if e.is_decode() => FailureKind::Malformed,
            InspectError::Request(e) if e.is_timeout() => FailureKind::Timeout,
            InspectError::Request(_) => FailureKind::Network,
            InspectError::ApiError { .. } => FailureKind::ServerRejected,
            InspectError::ApiResponse(_) => FailureKind::BackendReportedError,
            InspectError::UnexpectedResponse(_) => FailureKind::Malformed,
            InspectError::FileRead(_)
            | InspectError::TomlParse(_)
            | InspectError::Config(_)
            | InspectError::Validation(_) => FailureKind::Network,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Network => write!(f, "Network"),
            FailureKind::ServerRejected => write!(f, "ServerRejected"),
            FailureKind::Malformed => write!(f, "Malformed"),
            FailureKind::BackendReportedError => write!(f, "BackendReportedError"),
            FailureKind::Timeout => write!(f, "Timeout"),
        }
    }
}

/// Terminal state of one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Success(ResultDocument),
    Failure(FailureKind, String),
    Cancelled,
}

impl SubmissionOutcome {
    pub fn from_error(err: InspectError) -> Self {
        let kind = FailureKind::classify(&err);
        let message = match err {
            InspectError::ApiError { status, body } => server_message(status, &body),
            InspectError::ApiResponse(message) => message,
            InspectError::Request(e) if kind == FailureKind::Network => {
                format!("Connection failed - check your network ({})", e)
            }
            other => other.to_string(),
        };
        SubmissionOutcome::Failure(kind, message)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Success(_))
    }
}

/// Message for a non-2xx response: the body's JSON message if it has one,
/// else its raw text, else the status code.
pub fn server_message(status: u16, body: &str) -> String {
    if let Ok(serde_json::Value::Object(fields)) = serde_json::from_str(body) {
        let message = ["message", "error", "detail"]
            .iter()
            .filter_map(|key| fields.get(*key))
            .find_map(|value| value.as_str())
            .filter(|text| !text.trim().is_empty());
        if let Some(message) = message {
            return message.to_string();
        }
    }

    let text = body.trim();
    if text.is_empty() || text.starts_with('{') {
        format!("Server error ({})", status)
    } else {
        text.chars().take(500).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_prefers_json_message() {
        assert_eq!(
            server_message(413, r#"{"message": "Payload too large"}"#),
            "Payload too large"
        );
        assert_eq!(server_message(400, r#"{"error": "No file uploaded"}"#), "No file uploaded");
    }

    #[test]
    fn server_message_falls_back_to_text_then_status() {
        assert_eq!(server_message(502, "Bad gateway\n"), "Bad gateway");
        assert_eq!(server_message(500, ""), "Server error (500)");
        assert_eq!(server_message(500, "{}"), "Server error (500)");
    }

    #[test]
    fn backend_error_keeps_message_verbatim() {
        let outcome = SubmissionOutcome::from_error(InspectError::ApiResponse(
            "scan engine <b>unavailable</b>".to_string(),
        ));
        assert_eq!(
            outcome,
            SubmissionOutcome::Failure(
                FailureKind::BackendReportedError,
                "scan engine <b>unavailable</b>".to_string()
            )
        );
    }

    #[test]
    fn request_metadata_from_name() {
        let request = SubmissionRequest::new("sample.py", Bytes::from_static(b"print(1)"));
        assert_eq!(request.file_size_bytes, 8);
        assert_eq!(request.kind_hint(), FileKind::Script);
        assert!(!request.mime_or_extension.is_empty());
    }
}
