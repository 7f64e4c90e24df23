// src/transport/mod.rs

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

use crate::document::ResultDocument;
use crate::errors::Result;
use crate::models::SubmissionRequest;
use crate::transfer::TransferPhase;

pub mod http;

pub use http::HttpTransport;

/// The network seam: sends one submission and returns the parsed result document.
///
/// Implementations must stay cancel-safe. The transfer controller drops the
/// returned future to abort a transfer, and nothing may be delivered afterwards.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Uploads `request` and waits for the analysis result.
    ///
    /// # Errors
    /// Any [`crate::errors::InspectError`]; the controller folds it into a
    /// [`crate::models::SubmissionOutcome::Failure`].
    async fn send(&self, request: SubmissionRequest, progress: PhaseReporter)
    -> Result<ResultDocument>;
}

/// Lets a transport say the payload has left and the service is now analyzing.
#[derive(Clone)]
pub struct PhaseReporter {
    phase: Arc<watch::Sender<TransferPhase>>,
    submission: u64,
}

impl PhaseReporter {
    pub(crate) fn new(phase: Arc<watch::Sender<TransferPhase>>, submission: u64) -> Self {
        Self { phase, submission }
    }

    /// A reporter wired to nothing, for driving a transport directly.
    pub fn detached() -> Self {
        let (phase, _) = watch::channel(TransferPhase::Idle);
        Self::new(Arc::new(phase), 0)
    }

    pub fn submission(&self) -> u64 {
        self.submission
    }

    /// Moves `Uploading(n)` to `Analyzing(n)`. No-op for any other phase,
    /// so a superseded transfer cannot touch a newer submission's state.
    pub fn analyzing(&self) {
        let submission = self.submission;
        self.phase.send_if_modified(|phase| {
            if *phase == TransferPhase::Uploading(submission) {
                *phase = TransferPhase::Analyzing(submission);
                true
            } else {
                false
            }
        });
    }
}
