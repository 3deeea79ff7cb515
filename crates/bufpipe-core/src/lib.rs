//! # bufpipe core
//!
//! Runtime-agnostic logic for bufpipe: immutable contents, the stage
//! lineage store, the listing renderer, the gateway trait, stage events,
//! and the session that owns them.
//!
//! This crate spawns no processes and does no filesystem I/O. The shell
//! gateway, terminal view, configuration, and CLI live in the `bufpipe`
//! app crate.

pub mod content;
pub mod error;
pub mod events;
pub mod gateway;
pub mod lineage;
pub mod listing;
pub mod models;
pub mod session;
