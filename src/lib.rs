//! # cursor-chat-export
//!
//! A CLI tool that exports [Cursor](https://cursor.com) AI chat conversations to local Markdown files.
//!
//! ## What it does
//!
//! Cursor persists AI chat history inside a per-workspace SQLite database
//! (`state.vscdb`), as a JSON blob under a well-known key. This tool finds those
//! databases, parses the blob into a stable chat model, and either previews the
//! conversations on stdout (`discover`) or writes each one out as a standalone
//! Markdown file (`export`, `export-all`).
//!
//! Every database is opened **read-only** — your data is never modified.
//!
//! ## Batch tolerance
//!
//! A discovery scan over hundreds of workspaces keeps going past corrupt or
//! locked databases, unrecognized payload schemas, and malformed individual
//! records. Failures are reported per file; only a bad invocation target
//! (missing root directory, missing database path) fails the run.
//!
//! ## Usage
//!
//! ```sh
//! # Preview chats in every workspace, newest schema first
//! cursor-chat-export discover
//!
//! # Find the workspace where you discussed matplotlib
//! cursor-chat-export discover --search-text matplotlib
//!
//! # Export one workspace database to a directory
//! cursor-chat-export export --output-dir ~/notes/cursor-chats path/to/state.vscdb
//! ```
//!
//! Preferences can be persisted in `~/.config/cursor-chat-export/config.toml`.
//!
//! ## Compatibility
//!
//! Tracks Cursor's internal (undocumented) workspace storage schema. Field
//! names in the payload have drifted across releases; lookup tables in
//! [`store`] and [`model`] list every spelling observed in real captures.

pub mod discover;
pub mod error;
pub mod export;
pub mod model;
pub mod payload;
pub mod render;
pub mod store;
