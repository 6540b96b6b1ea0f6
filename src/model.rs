//! In-memory chat model and the tolerant extraction that builds it.
//!
//! The stored payload is loosely typed and its field names have drifted
//! across Cursor releases. Every logical field is looked up through an
//! explicit candidate-key table, tried in priority order (newest spelling
//! first); the first present key wins and a miss falls back to a documented
//! default instead of failing the record.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use tracing::warn;

// ---------------------------------------------------------------------------
// Model types
// ---------------------------------------------------------------------------

/// Conversation turn role.
///
/// Unrecognized role values map to `Unknown` rather than dropping the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    Unknown,
}

impl Role {
    /// Label used in rendered output.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::Unknown => "Unknown",
        }
    }
}

/// An embedded code block associated with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFragment {
    pub language: Option<String>,
    pub content: String,
}

/// One turn in a session.
///
/// A message with no text and no code fragments is still valid and renders
/// as an empty turn; dropping it would silently alter the conversation shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub code_fragments: Vec<CodeFragment>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// One conversation thread ("tab") within a workspace.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSession {
    /// Stable identifier, unique within a workspace. Keys the export filename.
    pub id: String,
    pub title: Option<String>,
    /// Insertion order is conversation order.
    pub messages: Vec<Message>,
    /// Tab-level timestamp, used only to pick the newest tab.
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatSession {
    /// The stored label when present, the session id otherwise.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

// ---------------------------------------------------------------------------
// Candidate-key tables
// ---------------------------------------------------------------------------

// Field spellings observed in real workspace captures, newest first.
// Treated as configuration data: no single name is canonical.
const SESSION_LIST_KEYS: &[&str] = &["tabs", "sessions", "conversations"];
const SESSION_ID_KEYS: &[&str] = &["tabId", "id", "sessionId"];
const SESSION_TITLE_KEYS: &[&str] = &["chatTitle", "title", "name"];
const SESSION_TIME_KEYS: &[&str] = &["timestamp", "lastUpdatedAt", "createdAt"];
const MESSAGE_LIST_KEYS: &[&str] = &["bubbles", "messages"];
const MESSAGE_ROLE_KEYS: &[&str] = &["type", "role"];
const MESSAGE_TEXT_KEYS: &[&str] = &["text", "rawText", "content"];
const MESSAGE_TIME_KEYS: &[&str] = &["timestamp", "createdAt", "cTime"];
const CODE_BLOCK_KEYS: &[&str] = &["codeBlocks", "suggestedCodeBlocks"];
const CODE_LANG_KEYS: &[&str] = &["languageId", "language", "lang"];
const CODE_CONTENT_KEYS: &[&str] = &["code", "content", "text"];

fn first_present<'a>(obj: &'a Map<String, Value>, candidates: &[&str]) -> Option<&'a Value> {
    candidates.iter().find_map(|key| obj.get(*key))
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract every chat session from a decoded workspace payload.
///
/// An unrecognized top-level shape yields an empty list, not an error, so a
/// batch scan over many workspaces keeps progressing. A session record
/// missing its id is skipped with a diagnostic; the id keys the export
/// filename and is never invented.
pub fn sessions_from_payload(payload: &Value) -> Vec<ChatSession> {
    let Some(records) = payload
        .as_object()
        .and_then(|obj| first_present(obj, SESSION_LIST_KEYS))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    let mut sessions = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let Some(obj) = record.as_object() else {
            warn!(index, "skipping session record that is not an object");
            continue;
        };
        let Some(id) = first_present(obj, SESSION_ID_KEYS).and_then(id_string) else {
            warn!(index, "skipping session record without an id");
            continue;
        };

        let title = first_present(obj, SESSION_TITLE_KEYS)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(str::to_string);
        let timestamp = parse_timestamp(first_present(obj, SESSION_TIME_KEYS));
        let messages = first_present(obj, MESSAGE_LIST_KEYS)
            .and_then(Value::as_array)
            .map(|records| records.iter().map(message_from_record).collect())
            .unwrap_or_default();

        sessions.push(ChatSession {
            id,
            title,
            messages,
            timestamp,
        });
    }
    sessions
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Build one message, defaulting every missing or malformed sub-field.
/// A record that is not even an object keeps its slot as an empty turn so
/// ordering and turn count survive.
fn message_from_record(record: &Value) -> Message {
    let Some(obj) = record.as_object() else {
        return Message {
            role: Role::Unknown,
            text: String::new(),
            code_fragments: Vec::new(),
            timestamp: None,
        };
    };

    let role = parse_role(first_present(obj, MESSAGE_ROLE_KEYS));
    let raw_text = first_present(obj, MESSAGE_TEXT_KEYS)
        .and_then(Value::as_str)
        .unwrap_or_default();
    let timestamp = parse_timestamp(first_present(obj, MESSAGE_TIME_KEYS));

    // Newer schemas carry a structured code block list; older ones embed
    // fences directly in the text.
    let mut code_fragments = structured_code_fragments(obj);
    let text = if code_fragments.is_empty() {
        let (narrative, fenced) = split_fenced(raw_text);
        code_fragments = fenced;
        narrative
    } else {
        raw_text.to_string()
    };

    Message {
        role,
        text,
        code_fragments,
        timestamp,
    }
}

fn parse_role(value: Option<&Value>) -> Role {
    match value {
        Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "user" | "human" => Role::User,
            "ai" | "assistant" | "bot" => Role::Assistant,
            _ => Role::Unknown,
        },
        // The earliest captures encode the author as an integer.
        Some(Value::Number(n)) => match n.as_i64() {
            Some(1) => Role::User,
            Some(2) => Role::Assistant,
            _ => Role::Unknown,
        },
        _ => Role::Unknown,
    }
}

fn structured_code_fragments(obj: &Map<String, Value>) -> Vec<CodeFragment> {
    let Some(blocks) = first_present(obj, CODE_BLOCK_KEYS).and_then(Value::as_array) else {
        return Vec::new();
    };
    blocks
        .iter()
        .filter_map(|block| match block {
            Value::String(content) => Some(CodeFragment {
                language: None,
                content: content.clone(),
            }),
            Value::Object(map) => {
                let content = first_present(map, CODE_CONTENT_KEYS)?.as_str()?.to_string();
                let language = first_present(map, CODE_LANG_KEYS)
                    .and_then(Value::as_str)
                    .filter(|lang| !lang.is_empty())
                    .map(str::to_string);
                Some(CodeFragment { language, content })
            }
            _ => None,
        })
        .collect()
}

/// Split fenced code blocks out of narrative text.
///
/// An unterminated fence runs to the end of the text.
fn split_fenced(text: &str) -> (String, Vec<CodeFragment>) {
    if !text.contains("```") {
        return (text.to_string(), Vec::new());
    }

    let mut narrative = String::new();
    let mut fragments = Vec::new();
    let mut fence: Option<(Option<String>, String)> = None;

    for line in text.lines() {
        match &mut fence {
            None => {
                if let Some(rest) = line.trim_start().strip_prefix("```") {
                    let tag = rest.trim();
                    let language = (!tag.is_empty()).then(|| tag.to_string());
                    fence = Some((language, String::new()));
                } else {
                    narrative.push_str(line);
                    narrative.push('\n');
                }
            }
            Some((language, body)) => {
                if line.trim_start().starts_with("```") {
                    fragments.push(CodeFragment {
                        language: language.take(),
                        content: std::mem::take(body),
                    });
                    fence = None;
                } else {
                    body.push_str(line);
                    body.push('\n');
                }
            }
        }
    }
    if let Some((language, body)) = fence {
        fragments.push(CodeFragment {
            language,
            content: body,
        });
    }

    (narrative.trim_end().to_string(), fragments)
}

/// Timestamps appear either as epoch milliseconds or RFC 3339 strings.
fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}
