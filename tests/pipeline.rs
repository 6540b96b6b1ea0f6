//! End-to-end tests for the discover/export pipeline against fixture
//! workspace databases built in a temp directory.

use cursor_chat_export::discover::{self, DiscoverOptions, Discovery};
use cursor_chat_export::export::{self, SessionSelection};
use cursor_chat_export::store::{CHAT_DATA_KEYS, WorkspaceDb};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Create `<dir>/state.vscdb` with the standard ItemTable layout, optionally
/// holding `payload` under the current chat-data key.
fn write_workspace_db(dir: &Path, payload: Option<&str>) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let db_path = dir.join("state.vscdb");
    let conn = Connection::open(&db_path).unwrap();
    conn.execute_batch("CREATE TABLE ItemTable (key TEXT PRIMARY KEY, value BLOB)")
        .unwrap();
    if let Some(json) = payload {
        conn.execute(
            "INSERT INTO ItemTable (key, value) VALUES (?1, ?2)",
            (CHAT_DATA_KEYS[0], json),
        )
        .unwrap();
    }
    db_path
}

fn sample_payload(marker: &str) -> String {
    format!(
        r#"{{"tabs":[{{"tabId":"tab-1","chatTitle":"Sample chat","bubbles":[
            {{"type":"user","text":"tell me about {marker}"}},
            {{"type":"ai","text":"sure","codeBlocks":[{{"languageId":"python","code":"import {marker}"}}]}}
        ]}}]}}"#
    )
}

#[test]
fn export_writes_one_file_per_session() {
    let root = TempDir::new().unwrap();
    let payload = r#"{"tabs":[
        {"tabId":"alpha","bubbles":[{"type":"user","text":"hi"}]},
        {"tabId":"beta","chatTitle":"Second","bubbles":[{"type":"ai","text":"hello"}]}
    ]}"#;
    let db_path = write_workspace_db(&root.path().join("ws"), Some(payload));
    let out = root.path().join("exported");

    let report = export::export(&db_path, &out, &SessionSelection::All).unwrap();
    assert_eq!(report.written.len(), 2);
    assert_eq!(report.failed, 0);

    let alpha = fs::read_to_string(out.join("alpha.md")).unwrap();
    assert!(alpha.starts_with("# alpha\n"));
    assert!(alpha.contains("## User"));
    assert!(alpha.contains("hi"));

    let beta = fs::read_to_string(out.join("beta.md")).unwrap();
    assert!(beta.starts_with("# Second\n"));
}

#[test]
fn export_of_workspace_without_chat_row_writes_nothing() {
    let root = TempDir::new().unwrap();
    let db_path = write_workspace_db(&root.path().join("ws"), None);
    let out = root.path().join("exported");

    let report = export::export(&db_path, &out, &SessionSelection::All).unwrap();
    assert!(report.written.is_empty());
    assert_eq!(report.failed, 0);
}

#[test]
fn export_of_undecodable_payload_succeeds_with_nothing_written() {
    let root = TempDir::new().unwrap();
    let db_path = write_workspace_db(&root.path().join("ws"), Some("{not json"));
    let out = root.path().join("exported");

    let report = export::export(&db_path, &out, &SessionSelection::All).unwrap();
    assert!(report.written.is_empty());
}

#[test]
fn export_of_missing_database_is_fatal() {
    let root = TempDir::new().unwrap();
    let out = root.path().join("exported");
    let missing = root.path().join("nope").join("state.vscdb");
    assert!(export::export(&missing, &out, &SessionSelection::All).is_err());
}

#[test]
fn export_latest_tab_picks_the_newest_session() {
    let root = TempDir::new().unwrap();
    let payload = r#"{"tabs":[
        {"tabId":"older","timestamp":1000,"bubbles":[]},
        {"tabId":"newer","timestamp":2000,"bubbles":[]}
    ]}"#;
    let db_path = write_workspace_db(&root.path().join("ws"), Some(payload));
    let out = root.path().join("exported");

    let report = export::export(&db_path, &out, &SessionSelection::Latest).unwrap();
    assert_eq!(report.written.len(), 1);
    assert_eq!(report.written[0].session_id, "newer");
    assert!(out.join("newer.md").exists());
    assert!(!out.join("older.md").exists());
}

#[test]
fn discovery_search_reports_only_matching_files() {
    let root = TempDir::new().unwrap();
    write_workspace_db(&root.path().join("ws-a"), Some(&sample_payload("serde")));
    let matching = write_workspace_db(
        &root.path().join("ws-b"),
        Some(&sample_payload("matplotlib")),
    );
    write_workspace_db(&root.path().join("ws-c"), Some(&sample_payload("tokio")));

    let entries = discover::discover(
        root.path(),
        &DiscoverOptions {
            search_text: Some("MATPLOTLIB"),
            limit: None,
        },
    );

    assert_eq!(entries.len(), 1);
    match &entries[0] {
        Discovery::Matches { path, lines } => {
            assert_eq!(path, &matching);
            assert!(!lines.is_empty());
            assert!(lines.iter().any(|line| line.contains("matplotlib")));
        }
        _ => panic!("expected a match entry"),
    }
}

#[test]
fn discovery_previews_each_workspace_with_history() {
    let root = TempDir::new().unwrap();
    write_workspace_db(&root.path().join("ws-a"), Some(&sample_payload("serde")));
    // No chat row: opens fine, produces no entry.
    write_workspace_db(&root.path().join("ws-b"), None);

    let entries = discover::discover(
        root.path(),
        &DiscoverOptions {
            search_text: None,
            limit: None,
        },
    );

    assert_eq!(entries.len(), 1);
    match &entries[0] {
        Discovery::Preview { preview, .. } => {
            assert!(preview.lines().next().unwrap().starts_with("User: "));
        }
        _ => panic!("expected a preview entry"),
    }
}

#[test]
fn discovery_continues_past_a_corrupt_database() {
    let root = TempDir::new().unwrap();
    write_workspace_db(&root.path().join("ws-good"), Some(&sample_payload("serde")));
    let corrupt_dir = root.path().join("ws-bad");
    fs::create_dir_all(&corrupt_dir).unwrap();
    fs::write(corrupt_dir.join("state.vscdb"), b"this is not a database").unwrap();

    let entries = discover::discover(
        root.path(),
        &DiscoverOptions {
            search_text: None,
            limit: None,
        },
    );

    // Walk order is filesystem-dependent; classify instead of indexing.
    let previews = entries
        .iter()
        .filter(|e| matches!(e, Discovery::Preview { .. }))
        .count();
    let unreadable = entries
        .iter()
        .filter(|e| matches!(e, Discovery::Unreadable { .. }))
        .count();
    assert_eq!(previews, 1);
    assert_eq!(unreadable, 1);
}

#[test]
fn discovery_limit_caps_processed_databases() {
    let root = TempDir::new().unwrap();
    for name in ["ws-a", "ws-b", "ws-c"] {
        write_workspace_db(&root.path().join(name), Some(&sample_payload("serde")));
    }

    let entries = discover::discover(
        root.path(),
        &DiscoverOptions {
            search_text: None,
            limit: Some(2),
        },
    );
    assert_eq!(entries.len(), 2);
}

#[test]
fn export_all_writes_per_workspace_directories() {
    let root = TempDir::new().unwrap();
    let storage = root.path().join("workspaceStorage");
    write_workspace_db(&storage.join("hash-one"), Some(&sample_payload("serde")));
    write_workspace_db(&storage.join("hash-two"), Some(&sample_payload("tokio")));
    // A corrupt workspace is skipped, not fatal.
    let corrupt_dir = storage.join("hash-bad");
    fs::create_dir_all(&corrupt_dir).unwrap();
    fs::write(corrupt_dir.join("state.vscdb"), b"garbage").unwrap();

    let out = root.path().join("out");
    let report = export::export_all(&storage, &out).unwrap();

    assert_eq!(report.workspaces, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.sessions_written, 2);
    assert!(out.join("hash-one").join("tab-1.md").exists());
    assert!(out.join("hash-two").join("tab-1.md").exists());
}

#[test]
fn store_handle_reads_payload_bytes() {
    let root = TempDir::new().unwrap();
    let db_path = write_workspace_db(&root.path().join("ws"), Some(&sample_payload("serde")));

    let db = WorkspaceDb::open(&db_path).unwrap();
    let bytes = db.chat_payload().unwrap().unwrap();
    assert!(std::str::from_utf8(&bytes).unwrap().contains("tab-1"));
    assert_eq!(db.path(), db_path);
}
