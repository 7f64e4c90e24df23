// src/validator.rs
use serde::Serialize;
use std::fmt;

/// Upper bound on accepted uploads when nothing else is configured.
/// Kept well below [`TRANSPORT_HARD_LIMIT`] so requests are never cut off in transit.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 35 * 1024 * 1024;

/// Largest body the analysis service's front door accepts.
pub const TRANSPORT_HARD_LIMIT: u64 = 45 * 1024 * 1024;

/// Highest limit a config may ask for. The margin under
/// [`TRANSPORT_HARD_LIMIT`] covers multipart framing and headers.
pub const MAX_CONFIGURABLE_FILE_SIZE: u64 = 40 * 1024 * 1024;

/// Script source, compiled bytecode, zipped bytecode archive, native executable.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = [".py", ".pyc", ".pyz", ".exe"];

const MIB: f64 = 1024.0 * 1024.0;

/// One reason a candidate file was turned away before upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    TooLarge { size: u64, limit: u64 },
    UnsupportedType { file_name: String },
    Unreadable { file_name: String, detail: String },
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::TooLarge { size, limit } => write!(
                f,
                "File too large ({:.1} MB). Our limit is {:.0} MB.",
                *size as f64 / MIB,
                *limit as f64 / MIB
            ),
            RejectionReason::UnsupportedType { .. } => write!(
                f,
                "Unsupported file type. We accept: {}",
                SUPPORTED_EXTENSIONS.join(", ")
            ),
            RejectionReason::Unreadable { file_name, detail } => {
                write!(f, "Could not read '{}': {}", file_name, detail)
            }
        }
    }
}

/// Every failed check for a candidate file. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    reasons: Vec<RejectionReason>,
}

impl Rejection {
    pub fn unreadable(file_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            reasons: vec![RejectionReason::Unreadable {
                file_name: file_name.into(),
                detail: detail.into(),
            }],
        }
    }

    pub fn reasons(&self) -> &[RejectionReason] {
        &self.reasons
    }

    pub fn is_too_large(&self) -> bool {
        self.reasons
            .iter()
            .any(|r| matches!(r, RejectionReason::TooLarge { .. }))
    }

    pub fn is_unsupported_type(&self) -> bool {
        self.reasons
            .iter()
            .any(|r| matches!(r, RejectionReason::UnsupportedType { .. }))
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.reasons.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", lines.join(" "))
    }
}

impl std::error::Error for Rejection {}

/// Approves or rejects candidate files by name and size. Pure; no I/O.
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    max_file_size: u64,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}

impl Validator {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Runs both the size and the type check and reports every failure.
    pub fn validate(&self, file_name: &str, file_size_bytes: u64) -> Result<(), Rejection> {
        let mut reasons = Vec::new();

        if file_size_bytes > self.max_file_size {
            reasons.push(RejectionReason::TooLarge {
                size: file_size_bytes,
                limit: self.max_file_size,
            });
        }

        if !is_supported(file_name) {
            reasons.push(RejectionReason::UnsupportedType {
                file_name: file_name.to_string(),
            });
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(Rejection { reasons })
        }
    }
}

/// Case-insensitive suffix match against [`SUPPORTED_EXTENSIONS`].
pub fn is_supported(file_name: &str) -> bool {
    let lowered = file_name.to_lowercase();
    SUPPORTED_EXTENSIONS
        .iter()
        .any(|ext| lowered.ends_with(ext))
}
