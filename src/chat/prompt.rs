//! Two-turn prompt template and the reply extraction that depends on it.
//!
//! The template ends with an open assistant turn; after decoding, the reply is
//! whatever follows the last assistant delimiter.

pub const USER_DELIMITER: &str = "User:";
pub const ASSISTANT_DELIMITER: &str = "Assistant:";

pub fn build_prompt(message: &str) -> String {
    format!("{USER_DELIMITER} {message}\n{ASSISTANT_DELIMITER}")
}

/// Text after the last assistant delimiter, trimmed. Falls back to the whole
/// decoded text when the delimiter is absent.
pub fn extract_reply(decoded: &str) -> &str {
    decoded
        .rsplit(ASSISTANT_DELIMITER)
        .next()
        .unwrap_or(decoded)
        .trim()
}
