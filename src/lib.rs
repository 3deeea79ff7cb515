//! # bufpipe
//!
//! Pipe text buffers through shell commands, keeping every intermediate
//! result as a stage with a pointer to the stage it came from.
//!
//! ```text
//! ┌──────────┐  load / !cmd   ┌──────────────┐   list/delete   ┌──────────┐
//! │  Input   │───────────────▶│   Session    │◀───────────────▶│ ListView │
//! │ file/cmd │                │ LineageStore │                 └──────────┘
//! └──────────┘                └──────┬───────┘
//!        ▲      | cmd                │ StageEvent
//!        │                           ▼
//! ┌──────┴───────┐            ┌──────────────┐
//! │ ShellGateway │            │   PaneView   │
//! │  (sh -c)     │            │  (terminal)  │
//! └──────────────┘            └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! bp session --cmd "kubectl get pods"     # interactive
//! bp run --file app.log -f "grep ERROR" -f "sort | uniq -c" --list
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | tracing subscriber setup |
//! | [`shell`] | Shell-backed command gateway |
//! | [`view`] | Terminal panes for stage events |
//! | [`repl`] | Interactive session loop |
//! | [`run`] | One-shot pipelines |
//!
//! The stage model, lineage store and listing renderer live in the
//! `bufpipe-core` crate.

pub mod config;
pub mod logging;
pub mod repl;
pub mod run;
pub mod shell;
pub mod view;
