//! Core data types: stage identity, stages, and their serializable summary.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::content::Content;

/// Shown in place of the empty command of a file load.
pub const LOADED_LABEL: &str = "(loaded)";

/// The command as displayed to the user: `LOADED_LABEL` when it is empty.
pub fn display_command(command: &str) -> &str {
    if command.is_empty() {
        LOADED_LABEL
    } else {
        command
    }
}

/// Identity of a pipeline stage.
///
/// Positive, assigned in increasing order by the
/// [`LineageStore`](crate::lineage::LineageStore), and never reused while
/// that store is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct StageId(u64);

impl StageId {
    pub const FIRST: StageId = StageId(1);

    pub fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn next(self) -> Option<StageId> {
        self.0.checked_add(1).map(StageId)
    }
}

impl From<u64> for StageId {
    fn from(raw: u64) -> Self {
        StageId(raw)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One recorded pipeline step: content plus the command that produced it
/// and a pointer to the stage it was produced from.
///
/// `parent_id` is historical. It keeps its value after the parent is
/// deleted, so it may name a stage that no longer exists.
#[derive(Debug, Clone)]
pub struct Stage {
    pub id: StageId,
    pub parent_id: Option<StageId>,
    /// Empty for file loads; `!cmd` for command-output loads.
    pub command: String,
    pub content: Content,
    pub created_at: DateTime<Utc>,
}

impl Stage {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn summary(&self) -> StageSummary {
        StageSummary {
            id: self.id,
            parent_id: self.parent_id,
            command: self.command.clone(),
            lines: self.content.line_count(),
            created_at: self.created_at,
        }
    }
}

/// Stage metadata without content, used for JSON export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub id: StageId,
    pub parent_id: Option<StageId>,
    pub command: String,
    pub lines: usize,
    pub created_at: DateTime<Utc>,
}
