use crate::error::StoreError;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::path::{Path, PathBuf};

/// Row keys the chat payload has lived under, newest first.
/// Treated as configuration data; a workspace matches at most one.
pub const CHAT_DATA_KEYS: &[&str] = &[
    "workbench.panel.aichat.view.aichat.chatdata",
    "workbench.panel.composer.view.composer.composerData",
];

/// Read-only handle on one workspace database.
///
/// The connection is released when the value drops, on every exit path.
pub struct WorkspaceDb {
    conn: Connection,
    path: PathBuf,
}

impl WorkspaceDb {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fetch the chat payload bytes with one point lookup per candidate key,
    /// in priority order. `Ok(None)` means the workspace has no chat history
    /// yet — that is not an error.
    pub fn chat_payload(&self) -> Result<Option<Vec<u8>>, StoreError> {
        for key in CHAT_DATA_KEYS {
            let row = self
                .conn
                .query_row(
                    "SELECT value FROM ItemTable WHERE key = ?1",
                    [key],
                    |row| row.get::<_, String>(0).map(String::into_bytes),
                )
                .optional()
                .map_err(|source| StoreError::Query {
                    path: self.path.clone(),
                    source,
                })?;
            if let Some(bytes) = row {
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture_db(payload: Option<(&str, &str)>) -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.vscdb");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE ItemTable (key TEXT PRIMARY KEY, value BLOB)")
            .unwrap();
        if let Some((key, value)) = payload {
            conn.execute(
                "INSERT INTO ItemTable (key, value) VALUES (?1, ?2)",
                (key, value),
            )
            .unwrap();
        }
        (dir, path)
    }

    #[test]
    fn reads_payload_under_primary_key() {
        let (_dir, path) = fixture_db(Some((CHAT_DATA_KEYS[0], r#"{"tabs":[]}"#)));
        let db = WorkspaceDb::open(&path).unwrap();
        assert_eq!(db.chat_payload().unwrap().unwrap(), br#"{"tabs":[]}"#);
    }

    #[test]
    fn falls_back_to_legacy_key() {
        let (_dir, path) = fixture_db(Some((CHAT_DATA_KEYS[1], r#"{"tabs":[]}"#)));
        let db = WorkspaceDb::open(&path).unwrap();
        assert!(db.chat_payload().unwrap().is_some());
    }

    #[test]
    fn absent_key_is_not_an_error() {
        let (_dir, path) = fixture_db(None);
        let db = WorkspaceDb::open(&path).unwrap();
        assert!(db.chat_payload().unwrap().is_none());
    }

    #[test]
    fn wrong_schema_is_a_store_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.vscdb");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE NotItemTable (x TEXT)")
            .unwrap();
        drop(conn);

        let db = WorkspaceDb::open(&path).unwrap();
        assert!(matches!(db.chat_payload(), Err(StoreError::Query { .. })));
    }
}
