//! The lineage store: the authoritative table of pipeline stages.
//!
//! Stages are keyed by [`StageId`] in a `BTreeMap`, so iteration is always
//! in ascending id order, which is also creation order because ids are
//! assigned monotonically. Deletion removes exactly one stage; children keep
//! their (now dangling) `parent_id`.
//!
//! The store does no I/O and no locking. It is owned by a single
//! [`Session`](crate::session::Session) and mutated from one logical thread.
//!
//! # Example
//!
//! ```rust
//! use bufpipe_core::content::Content;
//! use bufpipe_core::lineage::LineageStore;
//!
//! let mut store = LineageStore::new();
//! let root = store.create(Content::from_text("a\nb\nc"), "!load x", None).unwrap().id;
//! let child = store.create(Content::from_text("b"), "grep b", Some(root)).unwrap().id;
//!
//! store.delete(root).unwrap();
//! assert_eq!(store.get(child).unwrap().parent_id, Some(root));
//! assert!(store.get(root).is_err());
//! ```

use std::collections::BTreeMap;

use chrono::Utc;
use tracing::debug;

use crate::content::Content;
use crate::error::{LineageError, Result};
use crate::models::{Stage, StageId};

/// In-memory table of stages for one session.
#[derive(Debug)]
pub struct LineageStore {
    stages: BTreeMap<StageId, Stage>,
    /// `None` once the id space is used up.
    next_id: Option<StageId>,
}

impl LineageStore {
    pub fn new() -> Self {
        Self {
            stages: BTreeMap::new(),
            next_id: Some(StageId::FIRST),
        }
    }

    /// Record a new stage and return it.
    ///
    /// The id is one past the last id this store handed out (1 for the
    /// first stage), regardless of deletions in between. `parent_id` is
    /// stored as given; callers pass a stage that exists at this moment.
    pub fn create(
        &mut self,
        content: Content,
        command: impl Into<String>,
        parent_id: Option<StageId>,
    ) -> Result<&Stage> {
        let id = self.next_id.ok_or(LineageError::IdSpaceExhausted)?;
        self.next_id = id.next();

        let stage = Stage {
            id,
            parent_id,
            command: command.into(),
            content,
            created_at: Utc::now(),
        };
        debug!(
            stage = %id,
            parent = ?parent_id.map(StageId::get),
            lines = stage.content.line_count(),
            "stage created"
        );

        let stage: &Stage = self.stages.entry(id).or_insert(stage);
        Ok(stage)
    }

    pub fn get(&self, id: StageId) -> Result<&Stage> {
        self.stages.get(&id).ok_or(LineageError::NotFound(id))
    }

    pub fn contains(&self, id: StageId) -> bool {
        self.stages.contains_key(&id)
    }

    /// All stages, ascending by id.
    pub fn list(&self) -> Vec<&Stage> {
        self.stages.values().collect()
    }

    /// Remove a stage and hand it back; its content is released when the
    /// returned value is dropped. No other stage is modified.
    pub fn delete(&mut self, id: StageId) -> Result<Stage> {
        let stage = self
            .stages
            .remove(&id)
            .ok_or(LineageError::NotFound(id))?;
        debug!(stage = %id, "stage deleted");
        Ok(stage)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stages whose `parent_id` is `id`, ascending. Works for deleted ids
    /// too, which is how orphans of a deleted stage are found.
    pub fn children_of(&self, id: StageId) -> Vec<&Stage> {
        self.stages
            .values()
            .filter(|s| s.parent_id == Some(id))
            .collect()
    }

    /// The stage followed by each existing ancestor, nearest first.
    ///
    /// Stops at a root, or at a stage whose parent has been deleted; in the
    /// latter case the last element's `parent_id` is the dangling id.
    pub fn ancestry(&self, id: StageId) -> Result<Vec<&Stage>> {
        let mut chain = vec![self.get(id)?];
        // Parents always have smaller ids than their children, so this
        // walk terminates.
        while let Some(parent) = chain
            .last()
            .and_then(|s| s.parent_id)
            .and_then(|p| self.stages.get(&p))
        {
            chain.push(parent);
        }
        Ok(chain)
    }

    #[cfg(test)]
    pub(crate) fn with_next_id(next: u64) -> Self {
        Self {
            stages: BTreeMap::new(),
            next_id: Some(StageId::from(next)),
        }
    }
}

impl Default for LineageStore {
    fn default() -> Self {
        Self::new()
    }
}
