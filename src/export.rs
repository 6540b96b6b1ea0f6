//! Export: render every selected session of a workspace database to one
//! Markdown file each. Best-effort per session; a failed write is counted
//! and reported, never fatal to the rest of the export.

use crate::discover;
use crate::error::StoreError;
use crate::model::{self, ChatSession};
use crate::payload;
use crate::render;
use crate::store::WorkspaceDb;
use eyre::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Which sessions of a database to export.
#[derive(Debug, Clone, Default)]
pub enum SessionSelection {
    #[default]
    All,
    /// Newest session by tab timestamp, list position as tiebreak.
    Latest,
    /// 1-based positions into the session list.
    Positions(Vec<usize>),
}

/// One markdown file written by an export pass.
pub struct WrittenFile {
    pub session_id: String,
    pub output_path: PathBuf,
}

/// Outcome of exporting one database.
#[derive(Default)]
pub struct ExportReport {
    pub written: Vec<WrittenFile>,
    pub failed: usize,
}

/// Aggregate outcome of [`export_all`].
#[derive(Default)]
pub struct ExportAllReport {
    pub workspaces: usize,
    pub succeeded: usize,
    pub sessions_written: usize,
}

/// Export the selected sessions of `db_path` into `output_dir`, creating the
/// directory if needed. An empty or undecodable payload exports nothing and
/// still succeeds; only a store-level failure is fatal here, since the
/// caller named this database explicitly.
pub fn export(
    db_path: &Path,
    output_dir: &Path,
    selection: &SessionSelection,
) -> Result<ExportReport> {
    let sessions = readable_sessions(db_path)?;
    let sessions = select(sessions, selection);

    fs::create_dir_all(output_dir).wrap_err_with(|| {
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    })?;

    let mut report = ExportReport::default();
    let mut used_stems: HashSet<String> = HashSet::new();
    for session in &sessions {
        let stem = allocate_stem(&session.id, &mut used_stems);
        let output_path = output_dir.join(format!("{stem}.md"));
        match fs::write(&output_path, render::render_markdown(session)) {
            Ok(()) => report.written.push(WrittenFile {
                session_id: session.id.clone(),
                output_path,
            }),
            Err(e) => {
                warn!(path = %output_path.display(), "failed to write session: {e}");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

/// Export every workspace database under `workspace_root`, one subdirectory
/// per workspace (named after the workspace's storage directory), continuing
/// past per-workspace failures.
pub fn export_all(workspace_root: &Path, output_dir: &Path) -> Result<ExportAllReport> {
    fs::create_dir_all(output_dir).wrap_err_with(|| {
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    })?;

    let mut report = ExportAllReport::default();
    for db_path in discover::db_paths(workspace_root) {
        report.workspaces += 1;
        let workspace_name = db_path
            .parent()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("workspace-{}", report.workspaces));

        match export(&db_path, &output_dir.join(&workspace_name), &SessionSelection::All) {
            Ok(one) => {
                report.succeeded += 1;
                report.sessions_written += one.written.len();
                if one.failed > 0 {
                    warn!(
                        workspace = %workspace_name,
                        failed = one.failed,
                        "some sessions failed to write"
                    );
                }
            }
            Err(e) => {
                warn!(path = %db_path.display(), "workspace export failed: {e:#}");
            }
        }
    }
    Ok(report)
}

fn readable_sessions(db_path: &Path) -> Result<Vec<ChatSession>, StoreError> {
    let db = WorkspaceDb::open(db_path)?;
    let Some(bytes) = db.chat_payload()? else {
        return Ok(Vec::new());
    };
    match payload::decode(&bytes) {
        Ok(value) => Ok(model::sessions_from_payload(&value)),
        Err(e) => {
            warn!(path = %db_path.display(), "chat payload could not be decoded: {e}");
            Ok(Vec::new())
        }
    }
}

fn select(sessions: Vec<ChatSession>, selection: &SessionSelection) -> Vec<ChatSession> {
    match selection {
        SessionSelection::All => sessions,
        SessionSelection::Latest => latest_session(sessions).into_iter().collect(),
        SessionSelection::Positions(positions) => sessions
            .into_iter()
            .enumerate()
            .filter(|(index, _)| positions.contains(&(index + 1)))
            .map(|(_, session)| session)
            .collect(),
    }
}

fn latest_session(sessions: Vec<ChatSession>) -> Option<ChatSession> {
    sessions
        .into_iter()
        .enumerate()
        .max_by_key(|(index, session)| (session.timestamp, *index))
        .map(|(_, session)| session)
}

/// Session ids key output filenames; anything path-unsafe is replaced.
fn sanitize_id(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c| c == '.' || c == '-');
    if cleaned.is_empty() {
        "session".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Duplicate ids get a numeric suffix instead of silently overwriting.
fn allocate_stem(id: &str, used: &mut HashSet<String>) -> String {
    let base = sanitize_id(id);
    if used.insert(base.clone()) {
        return base;
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{base}-{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
