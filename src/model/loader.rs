use std::{fs, sync::Arc};

use tokenizers::Tokenizer;

use crate::{
    config::AppConfig,
    error::LoadError,
    model::{GenerationCapability, Precision, QuantizationMode, hub},
};

pub const PRECISION: Precision = Precision::Float16;
pub const QUANTIZATION: QuantizationMode = QuantizationMode::Int4;

/// One-shot acquisition of the model and its tokenizer.
pub struct ModelProvider;

impl ModelProvider {
    /// Single best-effort attempt. Any failure is logged and reported as
    /// `None`; there is no retry.
    pub fn load(config: &AppConfig) -> Option<GenerationCapability> {
        tracing::info!(
            model_id = %config.source.model_id,
            revision = ?config.source.revision,
            model_file = %config.model_file,
            "loading model artifacts"
        );

        match Self::try_load(config) {
            Ok(capability) => {
                let meta = capability.metadata();
                tracing::info!(
                    device = %meta.device,
                    precision = ?meta.precision,
                    quantization = %meta.quantization,
                    parameters = meta.parameter_count,
                    quantized_parameters = meta.quantized_parameter_count,
                    weight_bytes = meta.weight_bytes,
                    "model ready"
                );
                Some(capability)
            }
            Err(err) => {
                tracing::error!(error = %err, "error loading model");
                None
            }
        }
    }

    pub fn try_load(config: &AppConfig) -> Result<GenerationCapability, LoadError> {
        let files = hub::fetch(
            &config.source,
            &config.model_file,
            config.cache_dir.as_deref(),
        )?;

        let tokenizer = Tokenizer::from_file(files.tokenizer.as_path())
            .map_err(|e| LoadError::Tokenizer(e.to_string()))?;
        let declared = match files.generation_config.as_deref() {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .map_err(|e| LoadError::Hub(format!("{}: {e}", path.display())))?;
                hub::declared_eos_ids(&raw)?
            }
            None => Vec::new(),
        };
        let model = load_backend(config, &files.model)?;

        let capability =
            GenerationCapability::with_declared_eos(model, Arc::new(tokenizer), &declared)?;
        tracing::debug!(
            eos = capability.parameters().eos_token_id,
            stop_tokens = ?capability.parameters().stop_token_ids,
            "resolved stop tokens"
        );
        Ok(capability)
    }
}

#[cfg(feature = "tch-backend")]
fn load_backend(
    config: &AppConfig,
    module_path: &std::path::Path,
) -> Result<Arc<dyn crate::model::LanguageModel>, LoadError> {
    let model = crate::model::torch::TorchModel::load(
        module_path,
        &config.source,
        PRECISION,
        QUANTIZATION,
    )?;
    Ok(Arc::new(model))
}

#[cfg(not(feature = "tch-backend"))]
fn load_backend(
    _config: &AppConfig,
    _module_path: &std::path::Path,
) -> Result<Arc<dyn crate::model::LanguageModel>, LoadError> {
    Err(LoadError::BackendUnavailable)
}
