// src/transfer.rs
//! Owns the single in-flight submission slot.
//!
//! Every submission takes a fresh generation number when it begins. Beginning
//! a new one aborts whatever occupied the slot, and an outcome is only delivered when its
//! generation is still the latest one issued at the moment it settles.

use futures::future::{AbortHandle, AbortRegistration, Abortable, Aborted};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

use crate::models::{FailureKind, SubmissionOutcome, SubmissionRequest};
use crate::transport::{PhaseReporter, Transport};

/// Default wall-clock deadline for one submission.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// What the controller is doing right now, tagged with the submission number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "submission")]
pub enum TransferPhase {
    Idle,
    Uploading(u64),
    Analyzing(u64),
}

impl TransferPhase {
    pub fn submission(&self) -> Option<u64> {
        match self {
            TransferPhase::Idle => None,
            TransferPhase::Uploading(n) | TransferPhase::Analyzing(n) => Some(*n),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        !matches!(self, TransferPhase::Idle)
    }
}

/// Result of one `submit` call.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// The outcome of the most recent submission; hand it to the presenter.
    Current {
        submission: u64,
        outcome: SubmissionOutcome,
    },
    /// A newer submission started before this one settled. Drop it.
    Superseded { submission: u64 },
}

impl Delivery {
    pub fn outcome(&self) -> Option<&SubmissionOutcome> {
        match self {
            Delivery::Current { outcome, .. } => Some(outcome),
            Delivery::Superseded { .. } => None,
        }
    }

    pub fn into_outcome(self) -> Option<SubmissionOutcome> {
        match self {
            Delivery::Current { outcome, .. } => Some(outcome),
            Delivery::Superseded { .. } => None,
        }
    }
}

/// A reserved submission slot, handed from [`TransferController::begin`] to
/// [`TransferController::run`].
#[derive(Debug)]
pub struct Ticket {
    submission: u64,
    abort: AbortHandle,
    registration: AbortRegistration,
}

impl Ticket {
    pub fn submission(&self) -> u64 {
        self.submission
    }
}

struct ActiveTransfer {
    submission: u64,
    abort: AbortHandle,
}

/// Runs at most one cancellable, deadline-bounded submission at a time.
pub struct TransferController<T> {
    transport: Arc<T>,
    deadline: Duration,
    latest: AtomicU64,
    slot: Mutex<Option<ActiveTransfer>>,
    phase: Arc<watch::Sender<TransferPhase>>,
}

impl<T: Transport> TransferController<T> {
    pub fn new(transport: T, deadline: Duration) -> Self {
        let (phase, _) = watch::channel(TransferPhase::Idle);
        Self {
            transport: Arc::new(transport),
            deadline,
            latest: AtomicU64::new(0),
            slot: Mutex::new(None),
            phase: Arc::new(phase),
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Watches phase changes (`Idle`/`Uploading`/`Analyzing`).
    pub fn phase(&self) -> watch::Receiver<TransferPhase> {
        self.phase.subscribe()
    }

    pub fn current_phase(&self) -> TransferPhase {
        *self.phase.borrow()
    }

    pub fn is_busy(&self) -> bool {
        self.lock_slot().is_some()
    }

    /// Sends one submission, cancelling any that is still in flight.
    ///
    /// Exactly one transport call is made. There are no retries.
    pub async fn submit(&self, request: SubmissionRequest) -> Delivery {
        let ticket = self.begin();
        self.run(ticket, request).await
    }

    /// Takes the next generation and claims the slot, aborting its previous
    /// occupant. Nothing is awaited, so the order of `begin` calls is the
    /// order submissions were made in.
    pub fn begin(&self) -> Ticket {
        let submission = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let (abort, registration) = AbortHandle::new_pair();

        {
            let mut slot = self.lock_slot();
            let previous = slot.replace(ActiveTransfer {
                submission,
                abort: abort.clone(),
            });
            if let Some(previous) = previous {
                log::info!(
                    "Submission #{} supersedes #{}, cancelling it",
                    submission,
                    previous.submission
                );
                previous.abort.abort();
            }
        }

        self.phase.send_replace(TransferPhase::Uploading(submission));

        Ticket {
            submission,
            abort,
            registration,
        }
    }

    /// Runs the transfer a ticket reserved. A ticket that was cancelled or
    /// superseded in the meantime settles without calling the transport.
    pub async fn run(&self, ticket: Ticket, request: SubmissionRequest) -> Delivery {
        let Ticket {
            submission,
            abort,
            registration,
        } = ticket;

        log::info!(
            "Submission #{} started: {} ({} bytes) [{}]",
            submission,
            request.file_name,
            request.file_size_bytes,
            request.id
        );

        let reporter = PhaseReporter::new(Arc::clone(&self.phase), submission);
        let transfer = Abortable::new(self.transport.send(request, reporter), registration);

        let outcome = match tokio::time::timeout(self.deadline, transfer).await {
            Err(_elapsed) => {
                abort.abort();
                log::warn!(
                    "Submission #{} timed out after {}s",
                    submission,
                    self.deadline.as_secs()
                );
                SubmissionOutcome::Failure(
                    FailureKind::Timeout,
                    format!(
                        "Server took too long to respond (no result after {}s)",
                        self.deadline.as_secs()
                    ),
                )
            }
            Ok(Err(Aborted)) => {
                log::info!("Submission #{} cancelled", submission);
                SubmissionOutcome::Cancelled
            }
            Ok(Ok(Ok(document))) => SubmissionOutcome::Success(document),
            Ok(Ok(Err(e))) => {
                log::error!("Submission #{} failed: {}", submission, e);
                SubmissionOutcome::from_error(e)
            }
        };

        self.release(submission);

        if !self.is_latest(submission) {
            log::debug!("Dropping outcome of superseded submission #{}", submission);
            return Delivery::Superseded { submission };
        }

        Delivery::Current {
            submission,
            outcome,
        }
    }

    /// Gives a ticket back without sending anything, e.g. when the payload
    /// could not be read. Returns whether it was still the latest submission.
    pub fn abandon(&self, ticket: Ticket) -> bool {
        self.release(ticket.submission);
        self.is_latest(ticket.submission)
    }

    /// Retires whatever is in flight without starting a new transfer. Its
    /// outcome is dropped as superseded.
    pub fn supersede(&self) -> bool {
        let submission = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let previous = self.lock_slot().take();
        self.phase.send_replace(TransferPhase::Idle);
        match previous {
            Some(active) => {
                log::info!(
                    "Submission #{} retired by #{} without a transfer",
                    active.submission,
                    submission
                );
                active.abort.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_latest(&self, submission: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == submission
    }

    /// Aborts the in-flight submission, if any. Its outcome becomes `Cancelled`.
    pub fn cancel(&self) -> bool {
        match self.lock_slot().take() {
            Some(active) => {
                log::info!("Cancelling submission #{}", active.submission);
                active.abort.abort();
                true
            }
            None => false,
        }
    }

    fn release(&self, submission: u64) {
        {
            let mut slot = self.lock_slot();
            if slot.as_ref().map(|active| active.submission) == Some(submission) {
                *slot = None;
            }
        }
        self.phase.send_if_modified(|phase| {
            if phase.submission() == Some(submission) {
                *phase = TransferPhase::Idle;
                true
            } else {
                false
            }
        });
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<ActiveTransfer>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
