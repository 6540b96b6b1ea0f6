//! Workspace discovery: walk a directory tree for workspace databases, build
//! their chat models, and summarize each file as a preview or a set of
//! search matches. Per-file failures never abort the walk.

use crate::error::{DecodeError, StoreError};
use crate::model::{self, ChatSession};
use crate::payload;
use crate::render;
use crate::store::WorkspaceDb;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Filename every workspace database is stored under.
pub const DB_FILE_NAME: &str = "state.vscdb";

/// One discovered workspace database and the sessions it yielded.
/// The session list is empty when the chat-data row is absent or the
/// payload's schema is unrecognized.
pub struct WorkspaceSource {
    pub path: PathBuf,
    pub sessions: Vec<ChatSession>,
}

/// Why one file in a scan could not be read.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// A per-file failure, attached to the file it belongs to.
#[derive(Debug)]
pub struct ScanDiagnostic {
    pub path: PathBuf,
    pub error: ScanError,
}

/// Every workspace database path under `root`, in directory-walk order.
pub fn db_paths(root: &Path) -> impl Iterator<Item = PathBuf> + 'static {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == DB_FILE_NAME)
        .map(|entry| entry.into_path())
}

/// Lazily walk `root`, yielding one item per workspace database found.
///
/// Each item's production wraps its own store/decode failure, so a batch
/// scan over hundreds of workspaces tolerates a handful of corrupt or
/// locked files. Finite, depth-unbounded, directory-walk order.
pub fn scan(root: &Path) -> impl Iterator<Item = Result<WorkspaceSource, ScanDiagnostic>> + 'static {
    db_paths(root).map(|path| load_workspace(&path))
}

/// Open one database and build its chat model. The handle is scoped to this
/// call and released on every exit path.
pub fn load_workspace(path: &Path) -> Result<WorkspaceSource, ScanDiagnostic> {
    let sessions = read_sessions(path).map_err(|error| ScanDiagnostic {
        path: path.to_path_buf(),
        error,
    })?;
    Ok(WorkspaceSource {
        path: path.to_path_buf(),
        sessions,
    })
}

fn read_sessions(path: &Path) -> Result<Vec<ChatSession>, ScanError> {
    let db = WorkspaceDb::open(path)?;
    let Some(bytes) = db.chat_payload()? else {
        debug!(path = %path.display(), "no chat data key present");
        return Ok(Vec::new());
    };
    let value = payload::decode(&bytes)?;
    Ok(model::sessions_from_payload(&value))
}

/// What `discover` reports for one database file.
pub enum Discovery {
    /// No search text: a preview of the first session.
    Preview { path: PathBuf, preview: String },
    /// Search text given: the matching messages, one line each.
    Matches { path: PathBuf, lines: Vec<String> },
    /// The file could not be read; the scan continued past it.
    Unreadable { path: PathBuf, reason: String },
}

pub struct DiscoverOptions<'a> {
    /// Case-insensitive substring filter over message text.
    pub search_text: Option<&'a str>,
    /// Cap on the number of databases processed, applied in walk order.
    pub limit: Option<usize>,
}

/// Scan `root` and summarize each workspace database.
///
/// With a search filter, only files containing the text in some message are
/// emitted, with the matching messages as context; non-matching files produce
/// no entry at all. Without one, each file with chat history gets a preview
/// of the first [`render::PREVIEW_MESSAGES`] messages of its first session.
pub fn discover(root: &Path, opts: &DiscoverOptions) -> Vec<Discovery> {
    let mut results = Vec::new();
    let mut processed = 0usize;

    for item in scan(root) {
        if opts.limit.is_some_and(|limit| processed >= limit) {
            break;
        }
        processed += 1;

        match item {
            Err(diagnostic) => results.push(Discovery::Unreadable {
                path: diagnostic.path,
                reason: diagnostic.error.to_string(),
            }),
            Ok(source) => match opts.search_text {
                Some(needle) => {
                    let lines = matching_lines(&source.sessions, needle);
                    if !lines.is_empty() {
                        results.push(Discovery::Matches {
                            path: source.path,
                            lines,
                        });
                    }
                }
                None => {
                    if let Some(first) = source.sessions.first() {
                        results.push(Discovery::Preview {
                            path: source.path,
                            preview: render::render_preview(first, render::PREVIEW_MESSAGES),
                        });
                    } else {
                        debug!(path = %source.path.display(), "no chat history, skipping");
                    }
                }
            },
        }
    }
    results
}

fn matching_lines(sessions: &[ChatSession], needle: &str) -> Vec<String> {
    let needle = needle.to_lowercase();
    let mut lines = Vec::new();
    for session in sessions {
        for message in &session.messages {
            if message.text.to_lowercase().contains(&needle) {
                lines.push(render::preview_line(message));
            }
        }
    }
    lines
}
