pub mod chat;
pub mod config;
pub mod error;
pub mod model;
pub mod quantization;
pub mod server;

pub use chat::{ChatHandler, ChatReply, ChatRequest, ChatResponse};
pub use config::{AppConfig, ModelSource};
pub use error::{LoadError, ServiceError};
pub use model::{GenerationCapability, GenerationParameters, LanguageModel, ModelProvider};
pub use server::build_router;
