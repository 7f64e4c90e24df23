// src/surface.rs
//! The drop target: one reusable component that turns pointer, drag and
//! picker events into validate / submit / cancel calls.

use crate::models::PickedFile;
use crate::validator::Rejection;

/// The three callbacks a drop zone drives.
pub trait SurfaceHandler {
    fn validate(&self, file: &PickedFile) -> Result<(), Rejection>;

    /// Told about every pick that failed validation.
    fn rejected(&self, _rejection: &Rejection) {}

    /// Starts a submission. Must not block; the outcome arrives elsewhere.
    fn submit(&self, file: PickedFile);

    fn cancel(&self) -> bool;
}

/// Input events scoped to the drop target.
#[derive(Debug, Clone)]
pub enum SurfaceEvent {
    DragEnter,
    DragOver,
    DragLeave,
    Drop(Vec<PickedFile>),
    Click,
    PickerSelected(Vec<PickedFile>),
    CancelPressed,
}

impl SurfaceEvent {
    /// Drag events on the zone must not fall through to the host's
    /// navigate-to-file behavior.
    pub fn prevent_default(&self) -> bool {
        matches!(
            self,
            SurfaceEvent::DragEnter
                | SurfaceEvent::DragOver
                | SurfaceEvent::DragLeave
                | SurfaceEvent::Drop(_)
        )
    }
}

/// What handling one event did.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEffect {
    Ignored,
    DragStateChanged(bool),
    OpenPicker,
    Submitted(String),
    Rejected(Rejection),
    Cancelled(bool),
}

pub struct DropZone<H> {
    handler: H,
    drag_active: bool,
    picker_value: Option<String>,
}

impl<H: SurfaceHandler> DropZone<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            drag_active: false,
            picker_value: None,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn drag_active(&self) -> bool {
        self.drag_active
    }

    /// The picker's current value. Always cleared after a selection is taken.
    pub fn picker_value(&self) -> Option<&str> {
        self.picker_value.as_deref()
    }

    pub fn handle(&mut self, event: SurfaceEvent) -> SurfaceEffect {
        match event {
            SurfaceEvent::DragEnter | SurfaceEvent::DragOver => self.set_drag(true),
            SurfaceEvent::DragLeave => self.set_drag(false),
            SurfaceEvent::Drop(files) => {
                self.drag_active = false;
                self.take_first(files)
            }
            SurfaceEvent::Click => SurfaceEffect::OpenPicker,
            SurfaceEvent::PickerSelected(files) => {
                self.picker_value = files.first().map(|f| f.name.clone());
                let effect = self.take_first(files);
                self.picker_value = None;
                effect
            }
            SurfaceEvent::CancelPressed => SurfaceEffect::Cancelled(self.handler.cancel()),
        }
    }

    fn set_drag(&mut self, active: bool) -> SurfaceEffect {
        if self.drag_active == active {
            return SurfaceEffect::Ignored;
        }
        self.drag_active = active;
        SurfaceEffect::DragStateChanged(active)
    }

    fn take_first(&mut self, files: Vec<PickedFile>) -> SurfaceEffect {
        let Some(file) = files.into_iter().next() else {
            return SurfaceEffect::Ignored;
        };

        if let Err(rejection) = self.handler.validate(&file) {
            log::warn!("Rejected {}: {}", file.name, rejection);
            self.handler.rejected(&rejection);
            return SurfaceEffect::Rejected(rejection);
        }

        let name = file.name.clone();
        self.handler.submit(file);
        SurfaceEffect::Submitted(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::Validator;
    use bytes::Bytes;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        submitted: RefCell<Vec<String>>,
        rejections: RefCell<usize>,
        cancels: RefCell<usize>,
    }

    impl SurfaceHandler for &Recorder {
        fn validate(&self, file: &PickedFile) -> Result<(), Rejection> {
            Validator::default().validate(&file.name, file.size)
        }

        fn rejected(&self, _rejection: &Rejection) {
            *self.rejections.borrow_mut() += 1;
        }

        fn submit(&self, file: PickedFile) {
            self.submitted.borrow_mut().push(file.name);
        }

        fn cancel(&self) -> bool {
            *self.cancels.borrow_mut() += 1;
            true
        }
    }

    fn file(name: &str) -> PickedFile {
        PickedFile::from_bytes(name, Bytes::from_static(b"x = 1"))
    }

    #[test]
    fn drop_takes_only_the_first_file() {
        let recorder = Recorder::default();
        let mut zone = DropZone::new(&recorder);

        let effect = zone.handle(SurfaceEvent::Drop(vec![file("a.py"), file("b.py")]));
        assert_eq!(effect, SurfaceEffect::Submitted("a.py".to_string()));
        assert_eq!(*recorder.submitted.borrow(), vec!["a.py"]);
    }

    #[test]
    fn rejected_file_is_never_submitted() {
        let recorder = Recorder::default();
        let mut zone = DropZone::new(&recorder);

        let effect = zone.handle(SurfaceEvent::Drop(vec![file("notes.txt"), file("ok.py")]));
        assert!(matches!(effect, SurfaceEffect::Rejected(r) if r.is_unsupported_type()));
        assert!(recorder.submitted.borrow().is_empty());
        assert_eq!(*recorder.rejections.borrow(), 1);
    }

    #[test]
    fn drag_state_follows_enter_and_leave() {
        let recorder = Recorder::default();
        let mut zone = DropZone::new(&recorder);

        assert!(SurfaceEvent::DragOver.prevent_default());
        assert!(!SurfaceEvent::Click.prevent_default());

        assert_eq!(zone.handle(SurfaceEvent::DragEnter), SurfaceEffect::DragStateChanged(true));
        assert_eq!(zone.handle(SurfaceEvent::DragOver), SurfaceEffect::Ignored);
        assert!(zone.drag_active());
        assert_eq!(zone.handle(SurfaceEvent::DragLeave), SurfaceEffect::DragStateChanged(false));
        assert!(!zone.drag_active());

        zone.handle(SurfaceEvent::DragEnter);
        zone.handle(SurfaceEvent::Drop(vec![file("a.py")]));
        assert!(!zone.drag_active());
    }

    #[test]
    fn same_file_picked_twice_submits_twice() {
        let recorder = Recorder::default();
        let mut zone = DropZone::new(&recorder);

        assert_eq!(zone.handle(SurfaceEvent::Click), SurfaceEffect::OpenPicker);
        zone.handle(SurfaceEvent::PickerSelected(vec![file("same.pyc")]));
        assert_eq!(zone.picker_value(), None);
        zone.handle(SurfaceEvent::PickerSelected(vec![file("same.pyc")]));

        assert_eq!(*recorder.submitted.borrow(), vec!["same.pyc", "same.pyc"]);
    }

    #[test]
    fn empty_selection_and_cancel() {
        let recorder = Recorder::default();
        let mut zone = DropZone::new(&recorder);

        assert_eq!(zone.handle(SurfaceEvent::PickerSelected(vec![])), SurfaceEffect::Ignored);
        assert_eq!(zone.handle(SurfaceEvent::CancelPressed), SurfaceEffect::Cancelled(true));
        assert_eq!(*recorder.cancels.borrow(), 1);
    }
}
