//! Pure rendering of chat sessions: full Markdown documents and the short
//! preview/match lines used by discovery. No I/O; identical input yields
//! byte-identical output.

use crate::model::{ChatSession, Message};

/// Messages shown per file by `discover` when no search text is given.
pub const PREVIEW_MESSAGES: usize = 10;

/// Longest message excerpt emitted in preview and search-match lines.
const PREVIEW_TEXT_CHARS: usize = 120;

/// Render one session as a standalone Markdown document: a title heading,
/// then one role-labeled block per message with its code fragments as fenced
/// blocks, language-tagged when known.
pub fn render_markdown(session: &ChatSession) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n", session.display_title()));

    for message in &session.messages {
        out.push_str(&format!("\n## {}\n", message.role.label()));
        if !message.text.is_empty() {
            out.push('\n');
            out.push_str(message.text.trim_end());
            out.push('\n');
        }
        for fragment in &message.code_fragments {
            out.push_str(&format!(
                "\n```{}\n",
                fragment.language.as_deref().unwrap_or_default()
            ));
            out.push_str(fragment.content.trim_end_matches('\n'));
            out.push_str("\n```\n");
        }
    }
    out
}

/// Render up to `max_messages` one-line message summaries, newline-joined,
/// no headers.
pub fn render_preview(session: &ChatSession, max_messages: usize) -> String {
    session
        .messages
        .iter()
        .take(max_messages)
        .map(preview_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// One `Role: excerpt` line for a message.
pub fn preview_line(message: &Message) -> String {
    let mut excerpt: String = message.text.chars().take(PREVIEW_TEXT_CHARS).collect();
    if message.text.chars().count() > PREVIEW_TEXT_CHARS {
        excerpt.push('…');
    }
    format!("{}: {}", message.role.label(), excerpt.replace('\n', " "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CodeFragment, Role};

    fn message(role: Role, text: &str) -> Message {
        Message {
            role,
            text: text.to_string(),
            code_fragments: Vec::new(),
            timestamp: None,
        }
    }

    fn sample_session() -> ChatSession {
        let mut assistant = message(Role::Assistant, "hello");
        assistant.code_fragments.push(CodeFragment {
            language: Some("rust".to_string()),
            content: "fn x() {}".to_string(),
        });
        assistant.code_fragments.push(CodeFragment {
            language: None,
            content: "untagged\n".to_string(),
        });
        ChatSession {
            id: "abc".to_string(),
            title: None,
            messages: vec![message(Role::User, "hi"), assistant],
            timestamp: None,
        }
    }

    #[test]
    fn full_render_has_title_and_role_blocks() {
        let doc = render_markdown(&sample_session());
        assert!(doc.starts_with("# abc\n"));
        assert!(doc.contains("\n## User\n\nhi\n"));
        assert!(doc.contains("\n## Assistant\n\nhello\n"));
        assert!(doc.contains("\n```rust\nfn x() {}\n```\n"));
        assert!(doc.contains("\n```\nuntagged\n```\n"));
    }

    #[test]
    fn title_falls_back_to_session_id() {
        let mut session = sample_session();
        assert!(render_markdown(&session).starts_with("# abc\n"));
        session.title = Some("Named".to_string());
        assert!(render_markdown(&session).starts_with("# Named\n"));
    }

    #[test]
    fn render_is_deterministic() {
        let session = sample_session();
        assert_eq!(render_markdown(&session), render_markdown(&session));
    }

    #[test]
    fn empty_turn_still_renders_a_block() {
        let session = ChatSession {
            id: "s".to_string(),
            title: None,
            messages: vec![message(Role::Unknown, "")],
            timestamp: None,
        };
        let doc = render_markdown(&session);
        assert!(doc.contains("\n## Unknown\n"));
    }

    #[test]
    fn preview_respects_message_cap() {
        let session = ChatSession {
            id: "s".to_string(),
            title: None,
            messages: (0..5).map(|i| message(Role::User, &format!("m{i}"))).collect(),
            timestamp: None,
        };
        assert_eq!(render_preview(&session, 3).lines().count(), 3);
        // Fewer messages than the cap: all are returned.
        assert_eq!(render_preview(&session, 10).lines().count(), 5);
    }

    #[test]
    fn preview_lines_are_single_line_and_truncated() {
        let long = "x".repeat(200);
        let line = preview_line(&message(Role::User, &format!("a\nb {long}")));
        assert!(line.starts_with("User: a b "));
        assert!(!line.contains('\n'));
        assert!(line.ends_with('…'));
    }
}
