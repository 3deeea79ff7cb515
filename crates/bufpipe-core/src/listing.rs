//! Tabular rendering of the lineage store and index-based selection.
//!
//! Rendering is a pure function of a snapshot (an ordered list of
//! [`ListingRow`]s). The interactive [`ListView`] holds one snapshot and a
//! cursor; every selection resolves against the snapshot position, and every
//! deletion updates the snapshot before anything else is resolved, so
//! repeated deletions in one session never drift.
//!
//! # Format
//!
//! ```text
//!  # │ Parent │ Lines │ Command
//! ───┼────────┼───────┼────────────────────────────────
//!  1 │      - │   142 │ !kubectl get pods
//!  2 │      1 │    23 │ jq '.items[].metadata.name'
//! ```
//!
//! Column widths are computed from the data:
//!
//! | Column | Width |
//! |--------|-------|
//! | `#` | widest id (at least 1) |
//! | `Parent` | widest parent id, `-` counts as 1, at least 6 |
//! | `Lines` | widest line count, at least 5 |
//!
//! Commands are printed in full; the rule under `Command` is a fixed run.
//! A [`ListView`] fixes its widths when it is opened or refreshed, so
//! deleting rows rebuilds only the body.

use crate::events::StageObserver;
use crate::lineage::LineageStore;
use crate::models::{display_command, Stage, StageId};
use crate::session::Session;

/// Number of `─` under the `Command` header.
pub const COMMAND_RULE_WIDTH: usize = 32;

const ID_HEADER: &str = "#";
const PARENT_HEADER: &str = "Parent";
const LINES_HEADER: &str = "Lines";
const COMMAND_HEADER: &str = "Command";
const NO_PARENT: &str = "-";

/// One snapshot entry: everything the listing shows about a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub id: StageId,
    pub parent_id: Option<StageId>,
    pub lines: usize,
    pub command: String,
}

impl ListingRow {
    pub fn from_stage(stage: &Stage) -> Self {
        Self {
            id: stage.id,
            parent_id: stage.parent_id,
            lines: stage.content.line_count(),
            command: stage.command.clone(),
        }
    }
}

/// Copy the store's listing, ascending by id.
pub fn snapshot(store: &LineageStore) -> Vec<ListingRow> {
    store.list().into_iter().map(ListingRow::from_stage).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnWidths {
    pub id: usize,
    pub parent: usize,
    pub lines: usize,
}

impl ColumnWidths {
    pub fn compute(rows: &[ListingRow]) -> Self {
        let id = rows
            .iter()
            .map(|r| digits(r.id.get()))
            .max()
            .unwrap_or(1)
            .max(ID_HEADER.len());
        let parent = rows
            .iter()
            .map(|r| r.parent_id.map_or(NO_PARENT.len(), |p| digits(p.get())))
            .max()
            .unwrap_or(1)
            .max(PARENT_HEADER.len());
        let lines = rows
            .iter()
            .map(|r| digits(r.lines as u64))
            .max()
            .unwrap_or(1)
            .max(LINES_HEADER.len());
        Self { id, parent, lines }
    }
}

fn digits(n: u64) -> usize {
    n.to_string().len()
}

/// A rendered listing, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub header: String,
    pub separator: String,
    /// One line per snapshot row, same order.
    pub body: Vec<String>,
}

impl Rendered {
    /// Header, separator and body joined with `\n`, newline-terminated.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for line in self.lines() {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        [self.header.as_str(), self.separator.as_str()]
            .into_iter()
            .chain(self.body.iter().map(String::as_str))
    }
}

/// Render rows into the listing table. Deterministic: the same rows always
/// produce the same bytes.
pub fn render(rows: &[ListingRow]) -> Rendered {
    render_with(rows, &ColumnWidths::compute(rows))
}

/// Render rows against widths computed earlier.
pub fn render_with(rows: &[ListingRow], w: &ColumnWidths) -> Rendered {
    let header = format!(
        " {:>iw$} │ {:>pw$} │ {:>lw$} │ {}",
        ID_HEADER,
        PARENT_HEADER,
        LINES_HEADER,
        COMMAND_HEADER,
        iw = w.id,
        pw = w.parent,
        lw = w.lines,
    );

    let separator = [w.id + 2, w.parent + 2, w.lines + 2, COMMAND_RULE_WIDTH]
        .iter()
        .map(|n| "─".repeat(*n))
        .collect::<Vec<_>>()
        .join("┼");

    let body = rows.iter().map(|r| render_row(r, w)).collect();

    Rendered {
        header,
        separator,
        body,
    }
}

fn render_row(row: &ListingRow, w: &ColumnWidths) -> String {
    let parent = match row.parent_id {
        Some(p) => p.to_string(),
        None => NO_PARENT.to_string(),
    };
    format!(
        " {:>iw$} │ {:>pw$} │ {:>lw$} │ {}",
        row.id,
        parent,
        row.lines,
        display_command(&row.command),
        iw = w.id,
        pw = w.parent,
        lw = w.lines,
    )
}

/// Result of opening a listing.
#[derive(Debug)]
pub enum Listing {
    /// The store has no stages. Not an error; there is just nothing to show.
    Empty,
    View(ListView),
}

/// What one render of a [`ListView`] shows, and which row the cursor
/// resolves to.
#[derive(Debug)]
pub struct Frame<'a> {
    pub rendered: Rendered,
    pub cursor: usize,
    pub selected: Option<&'a ListingRow>,
}

/// Outcome of deleting the selected row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub id: StageId,
    /// False when the stage was already gone from the store; the stale row
    /// was dropped anyway.
    pub existed: bool,
    pub remaining: usize,
}

impl DeleteOutcome {
    /// The caller should close the list view.
    pub fn is_list_empty(&self) -> bool {
        self.remaining == 0
    }
}

/// A snapshot of the store plus a cursor into it.
#[derive(Debug, Clone)]
pub struct ListView {
    rows: Vec<ListingRow>,
    widths: ColumnWidths,
    cursor: usize,
}

impl ListView {
    pub fn open(store: &LineageStore) -> Listing {
        let rows = snapshot(store);
        if rows.is_empty() {
            Listing::Empty
        } else {
            let widths = ColumnWidths::compute(&rows);
            Listing::View(Self {
                rows,
                widths,
                cursor: 0,
            })
        }
    }

    pub fn rows(&self) -> &[ListingRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor to `pos` (0-based), clamped to the last row.
    pub fn set_cursor(&mut self, pos: usize) {
        self.cursor = pos.min(self.rows.len().saturating_sub(1));
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        self.set_cursor(self.cursor + 1);
    }

    /// The row under the cursor, by snapshot position.
    pub fn selected(&self) -> Option<&ListingRow> {
        self.rows.get(self.cursor)
    }

    pub fn widths(&self) -> ColumnWidths {
        self.widths
    }

    pub fn render(&self) -> Rendered {
        render_with(&self.rows, &self.widths)
    }

    pub fn frame(&self) -> Frame<'_> {
        Frame {
            rendered: self.render(),
            cursor: self.cursor,
            selected: self.selected(),
        }
    }

    /// Take a fresh snapshot. Returns `false` when the store is now empty.
    pub fn refresh(&mut self, store: &LineageStore) -> bool {
        self.rows = snapshot(store);
        self.widths = ColumnWidths::compute(&self.rows);
        self.set_cursor(self.cursor);
        !self.rows.is_empty()
    }

    /// Delete the stage under the cursor through `session`, drop its row,
    /// and clamp the cursor. `None` when the view has no rows.
    pub fn delete_selected<O: StageObserver>(
        &mut self,
        session: &mut Session<O>,
    ) -> Option<DeleteOutcome> {
        if self.rows.is_empty() {
            return None;
        }
        let row = self.rows.remove(self.cursor);
        let existed = session.delete(row.id).is_ok();
        self.set_cursor(self.cursor);
        Some(DeleteOutcome {
            id: row.id,
            existed,
            remaining: self.rows.len(),
        })
    }
}
