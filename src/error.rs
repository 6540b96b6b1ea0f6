use std::path::PathBuf;
use thiserror::Error;

/// Failure opening or querying a workspace database.
///
/// Fatal when the caller named the database explicitly (`export`); contained
/// and reported per file during a batch scan (`discover`, `export-all`).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to open database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to query {path}: {source}")]
    Query {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },
}

/// Failure decoding the stored chat payload bytes.
///
/// Never fatal: callers treat an undecodable payload as "zero sessions
/// extractable" and keep going.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The row exists but holds no data.
    #[error("chat payload is empty")]
    Empty,

    #[error("chat payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
