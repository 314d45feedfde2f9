mod capability;
mod generation;
mod hub;
mod loader;
pub mod sampling;
mod types;

#[cfg(feature = "tch-backend")]
pub mod torch;

#[cfg(test)]
pub(crate) mod test_support;

pub use capability::{Completion, GenerationCapability};
pub use generation::{LanguageModel, generate};
pub use hub::{GENERATION_CONFIG_FILE, ModelFiles, TOKENIZER_FILE, declared_eos_ids};
pub use loader::{ModelProvider, PRECISION, QUANTIZATION};
pub use types::{
    GenerationParameters, GenerationSettings, ModelMetadata, Precision, QuantizationMode,
};
