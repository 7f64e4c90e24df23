// src/workbench.rs
//! Wires validator, transfer controller and presenter into one chain and
//! keeps the latest view state.

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

use crate::config::AppConfig;
use crate::models::{PickedFile, SubmissionRequest};
use crate::presenter::{Presenter, Tab, ViewState};
use crate::surface::SurfaceHandler;
use crate::transfer::{Delivery, TransferController};
use crate::transport::Transport;
use crate::validator::{Rejection, Validator};

pub struct Workbench<T> {
    validator: Validator,
    controller: TransferController<T>,
    presenter: Presenter,
    view: watch::Sender<ViewState>,
    in_flight_name: Mutex<Option<(u64, String)>>,
}

impl<T: Transport> Workbench<T> {
    pub fn new(config: &AppConfig, transport: T) -> Self {
        let (view, _) = watch::channel(ViewState::idle());
        Self {
            validator: Validator::new(config.max_file_size),
            controller: TransferController::new(transport, config.timeout),
            presenter: Presenter::new(config.display),
            view,
            in_flight_name: Mutex::new(None),
        }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn controller(&self) -> &TransferController<T> {
        &self.controller
    }

    pub fn presenter(&self) -> &Presenter {
        &self.presenter
    }

    pub fn validate(&self, file_name: &str, size: u64) -> Result<(), Rejection> {
        self.validator.validate(file_name, size)
    }

    /// Runs one file through the chain.
    ///
    /// The submission number is taken before the file is read, so a later
    /// pick always wins over an earlier one that is still loading. Returns
    /// the view that was published, or `None` when a newer pick superseded
    /// this one and its outcome was dropped.
    pub async fn submit(&self, file: PickedFile) -> Option<ViewState> {
        if let Err(rejection) = self.validate(&file.name, file.size) {
            return Some(self.reject(&rejection));
        }

        let ticket = self.controller.begin();
        let submission = ticket.submission();
        let name = file.name.clone();
        *self.lock_name() = Some((submission, name.clone()));

        let request = match SubmissionRequest::from_picked(file).await {
            Ok(request) => request,
            Err(e) => {
                log::error!("❌ Could not read {}: {}", name, e);
                if !self.controller.abandon(ticket) {
                    return None;
                }
                let rejection = Rejection::unreadable(&name, e.to_string());
                return Some(self.publish(self.presenter.rejected(&rejection)));
            }
        };

        match self.controller.run(ticket, request).await {
            Delivery::Current { outcome, .. } => {
                Some(self.publish(self.presenter.render(&outcome)))
            }
            Delivery::Superseded { .. } => None,
        }
    }

    /// Shows a validation rejection. The pick counts as the newest one, so
    /// whatever was in flight is cancelled and its outcome dropped.
    pub fn reject(&self, rejection: &Rejection) -> ViewState {
        if self.controller.supersede() {
            log::info!("Rejected pick replaces the submission in flight");
        }
        self.publish(self.presenter.rejected(rejection))
    }

    /// Cancels the in-flight submission, if any.
    pub fn cancel(&self) -> bool {
        self.controller.cancel()
    }

    /// Fires on every published (terminal) view.
    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.view.subscribe()
    }

    /// The view the result area should show right now, including progress
    /// for an in-flight submission.
    pub fn current_view(&self) -> ViewState {
        let phase = self.controller.current_phase();
        if phase.is_in_flight() {
            let name = self
                .lock_name()
                .as_ref()
                .filter(|(submission, _)| phase.submission() == Some(*submission))
                .map(|(_, name)| name.clone());
            return self.presenter.progress(phase, name.as_deref());
        }
        self.view.borrow().clone()
    }

    pub fn select_tab(&self, tab: Tab) -> bool {
        self.view.send_if_modified(|view| view.select_tab(tab))
    }

    pub fn toggle_fragment(&self, index: usize) -> Option<bool> {
        let mut visible = None;
        self.view.send_if_modified(|view| {
            visible = view.toggle_fragment(index);
            visible.is_some()
        });
        visible
    }

    fn publish(&self, view: ViewState) -> ViewState {
        self.view.send_replace(view.clone());
        view
    }

    fn lock_name(&self) -> std::sync::MutexGuard<'_, Option<(u64, String)>> {
        self.in_flight_name
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Transport + 'static> SurfaceHandler for Arc<Workbench<T>> {
    fn validate(&self, file: &PickedFile) -> Result<(), Rejection> {
        Workbench::validate(self, &file.name, file.size)
    }

    fn rejected(&self, rejection: &Rejection) {
        Workbench::reject(self, rejection);
    }

    fn submit(&self, file: PickedFile) {
        let workbench = Arc::clone(self);
        tokio::spawn(async move {
            Workbench::submit(&workbench, file).await;
        });
    }

    fn cancel(&self) -> bool {
        Workbench::cancel(self)
    }
}
