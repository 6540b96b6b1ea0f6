use clap::{Parser, Subcommand};
use cursor_chat_export::discover::{self, DiscoverOptions, Discovery};
use cursor_chat_export::export::{self, SessionSelection};
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing_subscriber::EnvFilter;

/// Export Cursor editor AI chat history to Markdown files.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/cursor-chat-export/config.toml
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find workspace databases under a directory and preview their chats.
    Discover {
        /// Directory to search for state.vscdb files.
        /// The Cursor workspace storage directory if omitted.
        #[arg(value_name = "ROOT_DIR")]
        root_dir: Option<PathBuf>,

        /// Only report files whose chat history contains this text
        /// (case-insensitive), with the matching messages as context.
        #[arg(long, value_name = "TEXT")]
        search_text: Option<String>,

        /// Maximum number of databases to process.
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Export one workspace database to Markdown files, one per chat session.
    Export {
        /// Path to a state.vscdb file.
        /// The most recently modified workspace is used if omitted.
        #[arg(value_name = "STATE_DB_PATH")]
        db_path: Option<PathBuf>,

        /// Directory the markdown files are written to.
        #[arg(long, value_name = "DIR")]
        output_dir: PathBuf,

        /// Export only the newest tab.
        #[arg(long, conflicts_with = "tabs")]
        latest_tab: bool,

        /// Comma-separated 1-based tab positions to export, e.g. "1,3".
        #[arg(long, value_name = "POSITIONS", value_delimiter = ',')]
        tabs: Option<Vec<usize>>,
    },

    /// Export every workspace database under the storage root.
    ExportAll {
        /// Cursor workspace storage directory. Auto-detected if omitted.
        #[arg(value_name = "WORKSPACE_DIR")]
        workspace_dir: Option<PathBuf>,

        /// Directory the markdown files are written to.
        /// Defaults to ./out if not set in config.
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },
}

#[derive(Deserialize, Default)]
struct FileConfig {
    workspace_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

/// Cursor keeps one state.vscdb per workspace under its config directory.
fn default_workspace_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("Cursor/User/workspaceStorage"))
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        // Search: XDG/OS config dir, then nothing
        dirs::config_dir()
            .map(|d| d.join("cursor-chat-export/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

/// Resolve the workspace storage root (CLI > Config > Auto-detect) and
/// require it to exist: a bad invocation target is the one fatal error.
fn resolve_workspace_dir(explicit: Option<PathBuf>, file_cfg: &FileConfig) -> Result<PathBuf> {
    let dir = explicit
        .or_else(|| file_cfg.workspace_dir.clone())
        .or_else(default_workspace_dir)
        .ok_or_else(|| {
            eyre!(
                "Could not determine the Cursor workspace storage directory.\nPass it explicitly, or set workspace_dir in config.toml."
            )
        })?;
    if !dir.exists() {
        return Err(eyre!(
            "Workspace storage directory not found: {}",
            dir.display()
        ));
    }
    Ok(dir)
}

/// The most recently modified workspace database under `root`, for when
/// `export` is invoked without a database path.
fn latest_workspace_db(root: &Path) -> Result<PathBuf> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for db_path in discover::db_paths(root) {
        let modified = fs::metadata(&db_path)
            .and_then(|meta| meta.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        if newest.as_ref().is_none_or(|(ts, _)| modified > *ts) {
            newest = Some((modified, db_path));
        }
    }
    newest
        .map(|(_, path)| path)
        .ok_or_else(|| eyre!("No {} found under {}", discover::DB_FILE_NAME, root.display()))
}

fn print_discoveries(entries: &[Discovery]) {
    let mut printed = 0usize;
    for entry in entries {
        match entry {
            Discovery::Preview { path, preview } => {
                printed += 1;
                println!("---");
                println!("DATABASE: {}", path.display());
                println!("{preview}");
                println!();
            }
            Discovery::Matches { path, lines } => {
                printed += 1;
                println!("---");
                println!("DATABASE: {}", path.display());
                for line in lines {
                    println!("{line}");
                }
                println!();
            }
            Discovery::Unreadable { path, reason } => {
                eprintln!("Unreadable: {}: {}", path.display(), reason);
            }
        }
    }
    if printed == 0 {
        println!("No results found.");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let file_cfg = load_file_config(cli.config.as_deref())?;

    match cli.command {
        Command::Discover {
            root_dir,
            search_text,
            limit,
        } => {
            let root = resolve_workspace_dir(root_dir, &file_cfg)?;
            let entries = discover::discover(
                &root,
                &DiscoverOptions {
                    search_text: search_text.as_deref(),
                    limit,
                },
            );
            print_discoveries(&entries);
        }

        Command::Export {
            db_path,
            output_dir,
            latest_tab,
            tabs,
        } => {
            let db_path = match db_path {
                Some(path) => path,
                None => {
                    let root = resolve_workspace_dir(None, &file_cfg)?;
                    latest_workspace_db(&root)?
                }
            };
            if !db_path.exists() {
                return Err(eyre!("Database not found at: {}", db_path.display()));
            }

            let selection = if latest_tab {
                SessionSelection::Latest
            } else if let Some(positions) = tabs {
                SessionSelection::Positions(positions)
            } else {
                SessionSelection::All
            };

            let report = export::export(&db_path, &output_dir, &selection)?;
            let mut summary = format!(
                "Done. {} session(s) exported to {}.",
                report.written.len(),
                output_dir.display()
            );
            if report.failed > 0 {
                summary.push_str(&format!(" {} failed.", report.failed));
            }
            eprintln!("{summary}");
        }

        Command::ExportAll {
            workspace_dir,
            output_dir,
        } => {
            let root = resolve_workspace_dir(workspace_dir, &file_cfg)?;
            let output_dir = output_dir
                .or_else(|| file_cfg.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("out"));
            let report = export::export_all(&root, &output_dir)?;
            eprintln!(
                "Done. {}/{} workspace(s) exported, {} session(s) written to {}.",
                report.succeeded,
                report.workspaces,
                report.sessions_written,
                output_dir.display()
            );
        }
    }

    Ok(())
}
