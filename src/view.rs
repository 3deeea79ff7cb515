//! Terminal view manager.
//!
//! [`PaneView`] is the [`StageObserver`] used by the interactive session.
//! It keeps a small set of open panes and prints to a writer (stdout in the
//! binary, a `Vec<u8>` in tests):
//!
//! - when a stage is created, a pane is opened for it and a preview is
//!   printed; if that would exceed `view.max_visible` stage panes, the
//!   oldest one is closed first;
//! - when a stage is deleted, its pane (if open) is closed.
//!
//! Whether a pane shows a pipeline stage is recorded explicitly in
//! [`Pane::stage`]; the listing pane has no stage.

use std::collections::VecDeque;
use std::io::Write;

use bufpipe_core::events::{StageEvent, StageObserver};
use bufpipe_core::lineage::LineageStore;
use bufpipe_core::models::{display_command, Stage, StageId};

use crate::config::ViewConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pane {
    /// The stage shown in this pane, or `None` for non-stage panes.
    pub stage: Option<StageId>,
    pub name: String,
}

/// Display name for a stage: `[id] command`, capped at `max_len`
/// characters with a trailing `…` when cut.
pub fn display_name(id: StageId, command: &str, max_len: usize) -> String {
    let full = format!("[{}] {}", id, display_command(command));
    if full.chars().count() <= max_len {
        return full;
    }
    let mut cut: String = full.chars().take(max_len.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

pub struct PaneView<W: Write> {
    out: W,
    config: ViewConfig,
    panes: VecDeque<Pane>,
}

impl<W: Write> PaneView<W> {
    pub fn new(out: W, config: ViewConfig) -> Self {
        Self {
            out,
            config,
            panes: VecDeque::new(),
        }
    }

    pub fn writer(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn panes(&self) -> impl Iterator<Item = &Pane> {
        self.panes.iter()
    }

    /// Stage ids with an open pane, oldest first.
    pub fn visible_stages(&self) -> Vec<StageId> {
        self.panes.iter().filter_map(|p| p.stage).collect()
    }

    pub fn is_visible(&self, id: StageId) -> bool {
        self.panes.iter().any(|p| p.stage == Some(id))
    }

    /// Open (or re-open) a pane for `stage` and print its preview.
    pub fn open(&mut self, stage: &Stage) {
        if let Some(pos) = self.panes.iter().position(|p| p.stage == Some(stage.id)) {
            self.panes.remove(pos);
        }
        while self.visible_stages().len() >= self.config.max_visible {
            let Some(oldest) = self.panes.iter().position(|p| p.stage.is_some()) else {
                break;
            };
            if let Some(pane) = self.panes.remove(oldest) {
                let _ = writeln!(self.out, "(closed {})", pane.name);
            }
        }

        let pane = Pane {
            stage: Some(stage.id),
            name: display_name(stage.id, &stage.command, self.config.name_max_len),
        };
        self.print_preview(&pane, stage);
        self.panes.push_back(pane);
    }

    /// Record that the listing is on screen.
    pub fn open_listing(&mut self) {
        if !self.panes.iter().any(|p| p.stage.is_none()) {
            self.panes.push_back(Pane {
                stage: None,
                name: "[list]".to_string(),
            });
        }
    }

    pub fn close_listing(&mut self) {
        self.panes.retain(|p| p.stage.is_some());
    }

    fn close(&mut self, id: StageId) {
        if let Some(pos) = self.panes.iter().position(|p| p.stage == Some(id)) {
            if let Some(pane) = self.panes.remove(pos) {
                let _ = writeln!(self.out, "(closed {})", pane.name);
            }
        }
    }

    fn print_preview(&mut self, pane: &Pane, stage: &Stage) {
        let total = stage.content.line_count();
        let parent = match stage.parent_id {
            Some(p) => format!(", parent {}", p),
            None => String::new(),
        };
        let _ = writeln!(
            self.out,
            "── {} ({} line{}{}) ──",
            pane.name,
            total,
            if total == 1 { "" } else { "s" },
            parent
        );
        let shown = total.min(self.config.preview_lines);
        for line in &stage.content.lines()[..shown] {
            let _ = writeln!(self.out, "{}", line);
        }
        if shown < total {
            let _ = writeln!(self.out, "… ({} more)", total - shown);
        }
        let _ = self.out.flush();
    }
}

impl<W: Write> StageObserver for PaneView<W> {
    fn on_event(&mut self, event: &StageEvent, store: &LineageStore) {
        match event {
            StageEvent::Created { id, .. } => {
                if let Ok(stage) = store.get(*id) {
                    self.open(stage);
                }
            }
            StageEvent::Deleted { id } => self.close(*id),
        }
    }
}
