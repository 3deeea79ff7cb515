//! The session: single owner of the lineage store.
//!
//! A [`Session`] is created when the user starts working and dropped when
//! they stop. It owns the [`LineageStore`], remembers which stage is
//! *current* (the input for the next filter), and forwards every
//! successful create/delete to its [`StageObserver`].
//!
//! All mutation goes through `&mut Session`, so there is exactly one
//! control thread. Gateway runs are the only suspending step; they can be
//! driven in one call with [`Session::filter`], or split with
//! [`Session::prepare_filter`] / [`Session::complete`] when the caller wants
//! to race the run against a cancellation signal. Either way the completion
//! lands back on the session owner.
//!
//! # Outcomes
//!
//! | Gateway result | Stage created | Outcome |
//! |----------------|---------------|---------|
//! | content with at least one non-empty line | yes, becomes current | [`FilterOutcome::Created`] |
//! | blank content | no | [`FilterOutcome::EmptyOutput`] |
//! | [`GatewayError::Cancelled`] | no | [`FilterOutcome::Cancelled`] |
//! | any other error | no | [`FilterOutcome::Failed`] |

use tracing::{debug, info, warn};

use crate::content::Content;
use crate::error::{LineageError, Result};
use crate::events::{StageEvent, StageObserver};
use crate::gateway::{Gateway, GatewayError};
use crate::lineage::LineageStore;
use crate::models::{Stage, StageId};

/// Prefix recorded in front of commands whose output was loaded as a root.
pub const LOAD_COMMAND_PREFIX: &str = "!";

/// What happened to one gateway run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterOutcome {
    Created(StageId),
    Failed(GatewayError),
    EmptyOutput,
    Cancelled,
}

impl FilterOutcome {
    pub fn created(&self) -> Option<StageId> {
        match self {
            FilterOutcome::Created(id) => Some(*id),
            _ => None,
        }
    }

    /// One-line message for the user.
    pub fn notice(&self) -> String {
        match self {
            FilterOutcome::Created(id) => format!("created stage {}", id),
            FilterOutcome::Failed(e) => e.to_string(),
            FilterOutcome::EmptyOutput => "command produced no output".to_string(),
            FilterOutcome::Cancelled => GatewayError::Cancelled.to_string(),
        }
    }
}

/// A gateway run that has been set up but not completed.
///
/// Captures the parent and input at invocation time, so changing the
/// current stage while the command runs does not change where its output
/// is attached.
#[derive(Debug, Clone)]
pub struct PendingFilter {
    parent: Option<StageId>,
    command: String,
    recorded_as: String,
    stdin: Content,
}

impl PendingFilter {
    /// The command text to hand to the gateway.
    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn stdin(&self) -> &Content {
        &self.stdin
    }

    pub fn parent(&self) -> Option<StageId> {
        self.parent
    }
}

pub struct Session<O = ()> {
    store: LineageStore,
    current: Option<StageId>,
    observer: O,
}

impl<O: StageObserver> Session<O> {
    pub fn new(observer: O) -> Self {
        Self {
            store: LineageStore::new(),
            current: None,
            observer,
        }
    }

    pub fn store(&self) -> &LineageStore {
        &self.store
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }

    /// Borrow the observer mutably alongside the store, e.g. to redisplay
    /// an existing stage.
    pub fn with_observer<R>(&mut self, f: impl FnOnce(&mut O, &LineageStore) -> R) -> R {
        f(&mut self.observer, &self.store)
    }

    pub fn current(&self) -> Option<StageId> {
        self.current
    }

    pub fn current_stage(&self) -> Result<&Stage> {
        let id = self.current.ok_or(LineageError::NoCurrentStage)?;
        self.store.get(id)
    }

    /// Make `id` the input for the next filter.
    pub fn focus(&mut self, id: StageId) -> Result<&Stage> {
        let stage = self.store.get(id)?;
        self.current = Some(id);
        Ok(stage)
    }

    /// Whether `id` names a live pipeline stage of this session.
    pub fn is_stage(&self, id: StageId) -> bool {
        self.store.contains(id)
    }

    /// Record a root stage (file or literal input) and make it current.
    pub fn load(&mut self, content: Content, command: impl Into<String>) -> Result<StageId> {
        self.record(content, command.into(), None)
    }

    /// Record a stage produced from `parent` and make it current.
    pub fn record_child(
        &mut self,
        parent: StageId,
        content: Content,
        command: impl Into<String>,
    ) -> Result<StageId> {
        self.store.get(parent)?;
        self.record(content, command.into(), Some(parent))
    }

    fn record(
        &mut self,
        content: Content,
        command: String,
        parent_id: Option<StageId>,
    ) -> Result<StageId> {
        let stage = self.store.create(content, command, parent_id)?;
        let event = StageEvent::Created {
            id: stage.id,
            parent_id: stage.parent_id,
            command: stage.command.clone(),
            line_count: stage.content.line_count(),
        };
        let id = stage.id;
        self.current = Some(id);
        self.observer.on_event(&event, &self.store);
        Ok(id)
    }

    /// Delete one stage. Children keep their parent id. If the stage was
    /// current, there is no current stage afterwards.
    pub fn delete(&mut self, id: StageId) -> Result<Stage> {
        let stage = self.store.delete(id)?;
        if self.current == Some(id) {
            self.current = None;
        }
        self.observer
            .on_event(&StageEvent::Deleted { id }, &self.store);
        Ok(stage)
    }

    /// Set up a run of `command` over the current stage.
    pub fn prepare_filter(&self, command: &str) -> Result<PendingFilter> {
        let parent = self.current_stage()?;
        Ok(PendingFilter {
            parent: Some(parent.id),
            command: command.to_string(),
            recorded_as: command.to_string(),
            stdin: parent.content.clone(),
        })
    }

    /// Set up a run of `command` with no input whose output becomes a root
    /// stage recorded as `!command`.
    pub fn prepare_load(&self, command: &str) -> PendingFilter {
        PendingFilter {
            parent: None,
            command: command.to_string(),
            recorded_as: format!("{}{}", LOAD_COMMAND_PREFIX, command),
            stdin: Content::empty(),
        }
    }

    /// Apply a finished gateway run. Only a non-blank success touches the
    /// store.
    pub fn complete(
        &mut self,
        pending: PendingFilter,
        result: std::result::Result<Content, GatewayError>,
    ) -> Result<FilterOutcome> {
        match result {
            Err(GatewayError::Cancelled) => {
                info!(command = %pending.command, "command cancelled");
                Ok(FilterOutcome::Cancelled)
            }
            Err(e) => {
                warn!(command = %pending.command, error = %e, "command failed");
                Ok(FilterOutcome::Failed(e))
            }
            Ok(content) if content.is_blank() => {
                debug!(command = %pending.command, "command produced no output");
                Ok(FilterOutcome::EmptyOutput)
            }
            Ok(content) => {
                let id = self.record(content, pending.recorded_as, pending.parent)?;
                Ok(FilterOutcome::Created(id))
            }
        }
    }

    /// Run `command` over the current stage and record the result.
    pub async fn filter(&mut self, gateway: &dyn Gateway, command: &str) -> Result<FilterOutcome> {
        let pending = self.prepare_filter(command)?;
        let result = gateway.run(pending.command(), pending.stdin()).await;
        self.complete(pending, result)
    }

    /// Run `command` with empty input and record its output as a root.
    pub async fn load_command(
        &mut self,
        gateway: &dyn Gateway,
        command: &str,
    ) -> Result<FilterOutcome> {
        let pending = self.prepare_load(command);
        let result = gateway.run(pending.command(), pending.stdin()).await;
        self.complete(pending, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use async_trait::async_trait;
    use futures::executor::block_on;
    use std::sync::Mutex;

    /// Returns a fixed result and remembers what it was asked to run.
    struct ScriptedGateway {
        result: std::result::Result<Content, GatewayError>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedGateway {
        fn returning(result: std::result::Result<Content, GatewayError>) -> Self {
            Self {
                result,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Gateway for ScriptedGateway {
        async fn run(
            &self,
            command: &str,
            stdin: &Content,
        ) -> std::result::Result<Content, GatewayError> {
            self.calls
                .lock()
                .unwrap()
                .push((command.to_string(), stdin.to_text()));
            self.result.clone()
        }
    }

    fn loaded() -> Session<EventLog> {
        let mut session = Session::new(EventLog::new());
        session
            .load(Content::from_text("a\nb\nc"), "!load x")
            .unwrap();
        session
    }

    #[test]
    fn test_filter_creates_child_of_current() {
        let mut session = loaded();
        let gw = ScriptedGateway::returning(Ok(Content::from_text("b\n")));

        let outcome = block_on(session.filter(&gw, "grep b")).unwrap();
        let id = outcome.created().unwrap();
        assert_eq!(id.get(), 2);

        let stage = session.store().get(id).unwrap();
        assert_eq!(stage.parent_id, Some(StageId::FIRST));
        assert_eq!(stage.command, "grep b");
        assert_eq!(stage.content.line_count(), 1);
        assert_eq!(session.current(), Some(id));

        let calls = gw.calls.lock().unwrap();
        assert_eq!(calls[0], ("grep b".to_string(), "a\nb\nc\n".to_string()));
    }

    #[test]
    fn test_gateway_failure_leaves_store_unchanged() {
        let mut session = loaded();
        let gw = ScriptedGateway::returning(Err(GatewayError::Failed {
            code: Some(1),
            stderr: String::new(),
        }));

        let outcome = block_on(session.filter(&gw, "false")).unwrap();
        assert!(matches!(outcome, FilterOutcome::Failed(_)));
        assert_eq!(session.store().len(), 1);
        assert_eq!(session.current(), Some(StageId::FIRST));
        assert_eq!(session.observer().events().len(), 1);
    }

    #[test]
    fn test_empty_output_leaves_store_unchanged() {
        let mut session = loaded();
        let gw = ScriptedGateway::returning(Ok(Content::from_text("")));

        let outcome = block_on(session.filter(&gw, "grep zzz")).unwrap();
        assert_eq!(outcome, FilterOutcome::EmptyOutput);
        assert_eq!(outcome.notice(), "command produced no output");
        assert_eq!(session.store().len(), 1);
    }

    #[test]
    fn test_cancelled_run_creates_nothing() {
        let mut session = loaded();
        let gw = ScriptedGateway::returning(Err(GatewayError::Cancelled));

        let outcome = block_on(session.filter(&gw, "sleep 100")).unwrap();
        assert_eq!(outcome, FilterOutcome::Cancelled);
        assert_eq!(session.store().len(), 1);
    }

    #[test]
    fn test_filter_without_current_stage() {
        let mut session: Session = Session::new(());
        let gw = ScriptedGateway::returning(Ok(Content::from_text("x")));
        let err = block_on(session.filter(&gw, "cat")).unwrap_err();
        assert_eq!(err, LineageError::NoCurrentStage);
        assert!(gw.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_load_command_records_bang_prefix_as_root() {
        let mut session = Session::new(EventLog::new());
        let gw = ScriptedGateway::returning(Ok(Content::from_text("pod-a\npod-b\n")));

        let id = block_on(session.load_command(&gw, "kubectl get pods"))
            .unwrap()
            .created()
            .unwrap();
        let stage = session.store().get(id).unwrap();
        assert!(stage.is_root());
        assert_eq!(stage.command, "!kubectl get pods");
        assert_eq!(gw.calls.lock().unwrap()[0].1, "");
    }

    #[test]
    fn test_pending_filter_keeps_parent_from_invocation() {
        let mut session = loaded();
        let pending = session.prepare_filter("sort").unwrap();
        let other = session.load(Content::from_text("z"), "").unwrap();
        assert_eq!(session.current(), Some(other));

        let id = session
            .complete(pending, Ok(Content::from_text("a")))
            .unwrap()
            .created()
            .unwrap();
        assert_eq!(
            session.store().get(id).unwrap().parent_id,
            Some(StageId::FIRST)
        );
    }

    #[test]
    fn test_record_child_of_missing_parent_is_not_found() {
        let mut session = loaded();
        let missing = StageId::from(9);
        let err = session
            .record_child(missing, Content::from_text("b"), "cat")
            .unwrap_err();
        assert_eq!(err, LineageError::NotFound(missing));
        assert_eq!(session.store().len(), 1);
    }

    #[test]
    fn test_events_emitted_for_create_and_delete() {
        let mut session = loaded();
        let child = session
            .record_child(StageId::FIRST, Content::from_text("b"), "grep b")
            .unwrap();
        session.delete(StageId::FIRST).unwrap();

        let events = session.observer().events();
        assert_eq!(events.len(), 3);
        assert_eq!(
            events[1],
            StageEvent::Created {
                id: child,
                parent_id: Some(StageId::FIRST),
                command: "grep b".to_string(),
                line_count: 1,
            }
        );
        assert_eq!(events[2], StageEvent::Deleted { id: StageId::FIRST });
    }

    #[test]
    fn test_deleting_current_clears_it() {
        let mut session = loaded();
        session.delete(StageId::FIRST).unwrap();
        assert_eq!(session.current(), None);
        assert_eq!(
            session.current_stage().unwrap_err(),
            LineageError::NoCurrentStage
        );
        assert!(!session.is_stage(StageId::FIRST));
    }

    #[test]
    fn test_delete_missing_emits_nothing() {
        let mut session = loaded();
        let err = session.delete(StageId::from(9)).unwrap_err();
        assert_eq!(err, LineageError::NotFound(StageId::from(9)));
        assert_eq!(session.observer().events().len(), 1);
    }

    #[test]
    fn test_focus_switches_input() {
        let mut session = loaded();
        session.load(Content::from_text("q"), "").unwrap();
        session.focus(StageId::FIRST).unwrap();
        assert_eq!(session.current(), Some(StageId::FIRST));
        assert!(session.focus(StageId::from(42)).is_err());
        assert_eq!(session.current(), Some(StageId::FIRST));
    }
}
