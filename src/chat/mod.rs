mod handler;
mod prompt;
mod types;

pub use handler::ChatHandler;
pub use prompt::{ASSISTANT_DELIMITER, USER_DELIMITER, build_prompt, extract_reply};
pub use types::{ChatReply, ChatRequest, ChatResponse};
