//! Stage lifecycle events for the view layer.
//!
//! The [`Session`](crate::session::Session) emits a [`StageEvent`] to every
//! registered [`StageObserver`] synchronously, right after a stage is
//! created or deleted. Observers decide placement, pane limits, and what to
//! print; the core does not care.

use crate::lineage::LineageStore;
use crate::models::StageId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEvent {
    Created {
        id: StageId,
        parent_id: Option<StageId>,
        command: String,
        line_count: usize,
    },
    Deleted {
        id: StageId,
    },
}

impl StageEvent {
    pub fn id(&self) -> StageId {
        match self {
            StageEvent::Created { id, .. } | StageEvent::Deleted { id } => *id,
        }
    }
}

/// Receives stage events.
///
/// `store` is the state after the change, so a `Created` observer can read
/// the new stage's content and a `Deleted` observer will no longer find it.
pub trait StageObserver {
    fn on_event(&mut self, event: &StageEvent, store: &LineageStore);
}

/// Discards every event.
impl StageObserver for () {
    fn on_event(&mut self, _event: &StageEvent, _store: &LineageStore) {}
}

impl<T: StageObserver + ?Sized> StageObserver for Box<T> {
    fn on_event(&mut self, event: &StageEvent, store: &LineageStore) {
        (**self).on_event(event, store)
    }
}

/// Observer that keeps every event it sees.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<StageEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[StageEvent] {
        &self.events
    }
}

impl StageObserver for EventLog {
    fn on_event(&mut self, event: &StageEvent, _store: &LineageStore) {
        self.events.push(event.clone());
    }
}
