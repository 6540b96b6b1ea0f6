use crate::error::DecodeError;
use serde_json::Value;

/// Decode the raw bytes of a chat-data row into a JSON value tree.
///
/// Cursor stores the payload as plain UTF-8 JSON. Empty (or whitespace-only)
/// input is reported separately from syntactically invalid input so batch
/// callers can tell "nothing stored yet" apart from corruption.
pub fn decode(raw: &[u8]) -> Result<Value, DecodeError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(DecodeError::Empty);
    }
    Ok(serde_json::from_slice(raw)?)
}
