use std::fmt;

use serde::Serialize;

/// Weight representation the model is loaded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Float16,
}

impl Precision {
    pub fn bytes_per_param(self) -> f64 {
        match self {
            Precision::Float16 => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuantizationMode {
    Int4,
}

impl QuantizationMode {
    pub fn bits(self) -> u32 {
        match self {
            QuantizationMode::Int4 => 4,
        }
    }
}

impl fmt::Display for QuantizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Sampling configuration shared by every request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationParameters {
    /// Bound on prompt plus generated tokens.
    pub max_length: usize,
    pub num_return_sequences: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub do_sample: bool,
    pub eos_token_id: u32,
    pub pad_token_id: u32,
    /// Every id that ends a sequence; always contains `eos_token_id`.
    pub stop_token_ids: Vec<u32>,
}

impl GenerationParameters {
    pub const MAX_LENGTH: usize = 512;
    pub const TEMPERATURE: f32 = 0.7;
    pub const TOP_P: f32 = 0.95;

    /// Fixed parameters with the end-of-sequence token doubling as padding.
    pub fn with_eos(eos_token_id: u32) -> Self {
        Self::with_stop_tokens(eos_token_id, &[])
    }

    /// Like [`with_eos`](Self::with_eos), with further ids that also end
    /// generation.
    pub fn with_stop_tokens(eos_token_id: u32, extra: &[u32]) -> Self {
        let mut stop_token_ids = vec![eos_token_id];
        for id in extra {
            if !stop_token_ids.contains(id) {
                stop_token_ids.push(*id);
            }
        }
        Self {
            max_length: Self::MAX_LENGTH,
            num_return_sequences: 1,
            temperature: Self::TEMPERATURE,
            top_p: Self::TOP_P,
            do_sample: true,
            eos_token_id,
            pad_token_id: eos_token_id,
            stop_token_ids,
        }
    }

    pub fn is_stop_token(&self, id: u32) -> bool {
        self.stop_token_ids.contains(&id)
    }

    pub fn settings(&self) -> GenerationSettings {
        GenerationSettings {
            eos_token_id: Some(self.eos_token_id),
            pad_token_id: Some(self.pad_token_id),
            stop_token_ids: self.stop_token_ids.clone(),
            ..GenerationSettings::fixed()
        }
    }
}

/// Public view of the generation parameters. Token ids come from the
/// tokenizer and stay empty until a model is loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSettings {
    pub max_length: usize,
    pub num_return_sequences: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub do_sample: bool,
    pub eos_token_id: Option<u32>,
    pub pad_token_id: Option<u32>,
    pub stop_token_ids: Vec<u32>,
}

impl GenerationSettings {
    pub fn fixed() -> Self {
        Self {
            max_length: GenerationParameters::MAX_LENGTH,
            num_return_sequences: 1,
            temperature: GenerationParameters::TEMPERATURE,
            top_p: GenerationParameters::TOP_P,
            do_sample: true,
            eos_token_id: None,
            pad_token_id: None,
            stop_token_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    pub model_id: String,
    pub revision: Option<String>,
    pub device: String,
    pub precision: Precision,
    pub quantization: QuantizationMode,
    /// Logical parameters, counting two per packed 4-bit byte.
    pub parameter_count: u64,
    pub quantized_parameter_count: u64,
    /// Bytes actually held by the loaded weight tensors.
    pub weight_bytes: u64,
    pub artifact_size_bytes: u64,
}
