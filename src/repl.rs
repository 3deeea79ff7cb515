//! Interactive session (`bp session`).
//!
//! Reads one command per line, applies it to a [`Session`], and prints
//! panes, listings and notices to the session writer. Failures of a single
//! command (unknown stage, failing filter, unreadable file) are reported as
//! `error:` lines and never end the loop.
//!
//! ## Commands
//!
//! | Input | Action |
//! |-------|--------|
//! | `load PATH` | load a file as a root stage |
//! | `!CMD` | run CMD with no input; its output becomes a root stage |
//! | `\| CMD`, `filter CMD` | pipe the current stage through CMD |
//! | `list` | show the stage listing |
//! | `up`, `down`, `select N` | move the list cursor |
//! | `delete [N]` | delete the selected (or Nth) listed stage |
//! | `open [N]` | display the selected (or Nth) listed stage and make it current |
//! | `show ID` | print a stage with its ancestry and children |
//! | `use ID` | make stage ID current |
//! | `help`, `quit` | |

use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use bufpipe_core::content::Content;
use bufpipe_core::listing::{ListView, Listing};
use bufpipe_core::models::{display_command, StageId};
use bufpipe_core::session::{FilterOutcome, PendingFilter, Session};

use crate::shell::ShellGateway;
use crate::view::PaneView;

const HELP: &str = "\
commands:
  load PATH        load a file as a new root stage
  !CMD             run CMD and load its output as a new root stage
  | CMD            pipe the current stage through CMD (also: filter CMD)
  list             list all stages
  up | down        move the list cursor
  select N         put the list cursor on row N
  delete [N]       delete the selected (or Nth) row's stage
  open [N]         show the selected (or Nth) row's stage and make it current
  show ID          print stage ID with its ancestry and children
  use ID           make stage ID the current stage
  help             this text
  quit             leave the session";

/// One parsed line of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Nothing,
    Load(PathBuf),
    LoadCommand(String),
    Filter(String),
    List,
    Up,
    Down,
    /// 1-based row of the displayed listing.
    Select(usize),
    Delete(Option<usize>),
    Open(Option<usize>),
    Show(StageId),
    Use(StageId),
    Help,
    Quit,
}

pub fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Nothing);
    }
    if let Some(cmd) = line.strip_prefix('!') {
        return non_empty(cmd, "!").map(Input::LoadCommand);
    }
    if let Some(cmd) = line.strip_prefix('|') {
        return non_empty(cmd, "|").map(Input::Filter);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((w, r)) => (w, r.trim()),
        None => (line, ""),
    };

    match word {
        "load" => non_empty(rest, "load").map(|p| Input::Load(PathBuf::from(p))),
        "filter" => non_empty(rest, "filter").map(Input::Filter),
        "list" | "ls" => Ok(Input::List),
        "up" | "k" => Ok(Input::Up),
        "down" | "j" => Ok(Input::Down),
        "select" => parse_row(rest).map(Input::Select),
        "delete" | "d" => optional_row(rest).map(Input::Delete),
        "open" | "o" => optional_row(rest).map(Input::Open),
        "show" => parse_id(rest).map(Input::Show),
        "use" => parse_id(rest).map(Input::Use),
        "help" | "?" => Ok(Input::Help),
        "quit" | "q" | "exit" => Ok(Input::Quit),
        other => Err(format!("unknown command '{}' (try `help`)", other)),
    }
}

fn non_empty(arg: &str, what: &str) -> Result<String, String> {
    let arg = arg.trim();
    if arg.is_empty() {
        Err(format!("{} needs an argument", what))
    } else {
        Ok(arg.to_string())
    }
}

fn parse_row(arg: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("invalid row number: '{}'", arg)),
    }
}

fn optional_row(arg: &str) -> Result<Option<usize>, String> {
    if arg.is_empty() {
        Ok(None)
    } else {
        parse_row(arg).map(Some)
    }
}

fn parse_id(arg: &str) -> Result<StageId, String> {
    match arg.parse::<u64>() {
        Ok(n) if n >= 1 => Ok(StageId::from(n)),
        _ => Err(format!("invalid stage id: '{}'", arg)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Repl<W: Write> {
    session: Session<PaneView<W>>,
    gateway: ShellGateway,
    list: Option<ListView>,
}

impl<W: Write> Repl<W> {
    pub fn new(session: Session<PaneView<W>>, gateway: ShellGateway) -> Self {
        Self {
            session,
            gateway,
            list: None,
        }
    }

    pub fn session(&self) -> &Session<PaneView<W>> {
        &self.session
    }

    fn out(&mut self) -> &mut W {
        self.session.observer_mut().writer()
    }

    fn say(&mut self, msg: &str) {
        let _ = writeln!(self.out(), "{}", msg);
    }

    fn error(&mut self, msg: &str) {
        let _ = writeln!(self.out(), "error: {}", msg);
    }

    /// Read commands until `quit` or end of input.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, input: R, prompt: bool) -> Result<()> {
        let mut lines = input.lines();
        loop {
            if prompt {
                let out = self.out();
                let _ = write!(out, "bp> ");
                let _ = out.flush();
            }

            let line = tokio::select! {
                line = lines.next_line() => line?,
                _ = tokio::signal::ctrl_c() => {
                    self.say("(use `quit` to leave)");
                    continue;
                }
            };
            let Some(line) = line else {
                break;
            };

            match parse_input(&line) {
                Ok(input) => {
                    if self.handle(input).await? == Flow::Quit {
                        break;
                    }
                }
                Err(msg) => self.error(&msg),
            }
        }
        let _ = self.out().flush();
        Ok(())
    }

    pub async fn handle(&mut self, input: Input) -> Result<Flow> {
        match input {
            Input::Nothing => {}
            Input::Help => self.say(HELP),
            Input::Quit => return Ok(Flow::Quit),
            Input::Load(path) => self.load_file(path).await?,
            Input::LoadCommand(cmd) => {
                let pending = self.session.prepare_load(&cmd);
                self.run_pending(pending).await?;
            }
            Input::Filter(cmd) => match self.session.prepare_filter(&cmd) {
                Ok(pending) => self.run_pending(pending).await?,
                Err(e) => self.error(&e.to_string()),
            },
            Input::List => self.open_list(),
            Input::Up => self.move_cursor(|v| v.move_up()),
            Input::Down => self.move_cursor(|v| v.move_down()),
            Input::Select(row) => self.move_cursor(|v| v.set_cursor(row - 1)),
            Input::Delete(row) => self.delete_row(row),
            Input::Open(row) => self.open_row(row),
            Input::Show(id) => self.show(id),
            Input::Use(id) => match self.session.focus(id) {
                Ok(_) => self.say(&format!("current stage: {}", id)),
                Err(e) => self.error(&e.to_string()),
            },
        }
        Ok(Flow::Continue)
    }

    async fn load_file(&mut self, path: PathBuf) -> Result<()> {
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                self.session.load(Content::from_bytes(&bytes), "")?;
            }
            Err(e) => self.error(&format!("cannot read {}: {}", path.display(), e)),
        }
        Ok(())
    }

    /// Run a prepared command; Ctrl-C while it runs abandons it.
    async fn run_pending(&mut self, pending: PendingFilter) -> Result<()> {
        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };
        let result = self
            .gateway
            .run_until(pending.command(), pending.stdin(), &cancel)
            .await;
        watcher.abort();

        match self.session.complete(pending, result)? {
            FilterOutcome::Created(_) => {}
            FilterOutcome::Failed(e) => self.error(&e.to_string()),
            outcome => self.say(&format!("note: {}", outcome.notice())),
        }
        Ok(())
    }

    fn open_list(&mut self) {
        match ListView::open(self.session.store()) {
            Listing::Empty => {
                self.list = None;
                self.session.observer_mut().close_listing();
                self.say("no stages");
            }
            Listing::View(view) => {
                self.list = Some(view);
                self.session.observer_mut().open_listing();
                self.print_list();
            }
        }
    }

    fn print_list(&mut self) {
        let Some(view) = self.list.as_ref() else {
            return;
        };
        let text = {
            let frame = view.frame();
            let mut text = String::new();
            for (i, line) in frame.rendered.lines().enumerate() {
                // Header and separator occupy the first two lines.
                let marker = if i >= 2 && i - 2 == frame.cursor {
                    "> "
                } else {
                    "  "
                };
                text.push_str(marker);
                text.push_str(line);
                text.push('\n');
            }
            text
        };
        let _ = write!(self.out(), "{}", text);
    }

    fn move_cursor(&mut self, f: impl FnOnce(&mut ListView)) {
        match self.list.as_mut() {
            Some(view) => {
                f(view);
                self.print_list();
            }
            None => self.error("no list open; run `list` first"),
        }
    }

    fn delete_row(&mut self, row: Option<usize>) {
        let Some(view) = self.list.as_mut() else {
            self.error("no list open; run `list` first");
            return;
        };
        if let Some(row) = row {
            if row > view.len() {
                self.error(&format!("no row {}", row));
                return;
            }
            view.set_cursor(row - 1);
        }
        let Some(outcome) = view.delete_selected(&mut self.session) else {
            return;
        };

        if outcome.existed {
            self.say(&format!("deleted stage {}", outcome.id));
        } else {
            self.say(&format!("stage {} was already gone", outcome.id));
        }
        if outcome.is_list_empty() {
            self.list = None;
            self.session.observer_mut().close_listing();
            self.say("list is now empty");
        } else {
            self.print_list();
        }
    }

    fn open_row(&mut self, row: Option<usize>) {
        let Some(view) = self.list.as_mut() else {
            self.error("no list open; run `list` first");
            return;
        };
        if let Some(row) = row {
            if row > view.len() {
                self.error(&format!("no row {}", row));
                return;
            }
            view.set_cursor(row - 1);
        }
        let Some(id) = view.selected().map(|r| r.id) else {
            return;
        };
        if let Err(e) = self.session.focus(id) {
            self.error(&e.to_string());
            return;
        }
        self.session.with_observer(|panes, store| {
            if let Ok(stage) = store.get(id) {
                panes.open(stage);
            }
        });
    }

    fn show(&mut self, id: StageId) {
        let current = self.session.current();
        let text = {
            let store = self.session.store();
            let stage = match store.get(id) {
                Ok(s) => s,
                Err(e) => {
                    let msg = e.to_string();
                    self.error(&msg);
                    return;
                }
            };

            let mut text = String::new();
            text.push_str(&format!("--- Stage {} ---\n", stage.id));
            text.push_str(&format!(
                "command:    {}\n",
                display_command(&stage.command)
            ));
            let parent = match stage.parent_id {
                Some(p) if store.contains(p) => p.to_string(),
                Some(p) => format!("{} (deleted)", p),
                None => "-".to_string(),
            };
            text.push_str(&format!("parent:     {}\n", parent));
            let chain: Vec<String> = store
                .ancestry(id)
                .map(|c| c.iter().map(|s| s.id.to_string()).collect())
                .unwrap_or_default();
            text.push_str(&format!("ancestry:   {}\n", chain.join(" <- ")));
            let children: Vec<String> = store
                .children_of(id)
                .iter()
                .map(|s| s.id.to_string())
                .collect();
            text.push_str(&format!(
                "children:   {}\n",
                if children.is_empty() {
                    "-".to_string()
                } else {
                    children.join(", ")
                }
            ));
            text.push_str(&format!("lines:      {}\n", stage.content.line_count()));
            text.push_str(&format!(
                "created_at: {}\n",
                stage.created_at.format("%Y-%m-%dT%H:%M:%SZ")
            ));
            if current == Some(id) {
                text.push_str("current:    yes\n");
            }
            text.push_str("--- Content ---\n");
            text.push_str(&stage.content.to_text());
            text
        };
        let _ = write!(self.out(), "{}", text);
    }
}
