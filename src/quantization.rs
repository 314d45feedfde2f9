use std::fmt;

use serde::Serialize;

use crate::{error::LoadError, model::ModelMetadata};

/// Storage class of one weight tensor as found in the artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageKind {
    /// `uint8` holding two 4-bit values per byte.
    Packed4Bit,
    Float16,
    /// Any floating type other than f16.
    OtherFloat(String),
    /// Non-float storage that is not a 4-bit pack, such as int8 weights.
    Other(String),
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Packed4Bit => f.write_str("packed 4-bit"),
            StorageKind::Float16 => f.write_str("float16"),
            StorageKind::OtherFloat(kind) | StorageKind::Other(kind) => f.write_str(kind),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TensorStorage {
    pub name: String,
    pub kind: StorageKind,
    /// Stored elements; a packed byte counts once.
    pub elements: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightFootprint {
    /// Logical parameters, two per packed byte.
    pub parameter_count: u64,
    pub quantized_parameter_count: u64,
    pub stored_bytes: u64,
}

/// Checks that an artifact really carries 4-bit weights next to f16 ones:
/// every tensor is either a 4-bit pack or f16, and packs hold at least half
/// of the logical parameters.
pub fn inspect_weights(tensors: &[TensorStorage]) -> Result<WeightFootprint, LoadError> {
    let mut packed = 0u64;
    let mut half = 0u64;
    for tensor in tensors {
        match &tensor.kind {
            StorageKind::Packed4Bit => packed += tensor.elements,
            StorageKind::Float16 => half += tensor.elements,
            StorageKind::OtherFloat(_) => {
                return Err(LoadError::UnsupportedPrecision(format!(
                    "{} is stored as {}, expected float16",
                    tensor.name, tensor.kind
                )));
            }
            StorageKind::Other(_) => {
                return Err(LoadError::UnsupportedQuantization(format!(
                    "{} is stored as {}, expected packed 4-bit",
                    tensor.name, tensor.kind
                )));
            }
        }
    }

    let quantized = packed * 2;
    let total = quantized + half;
    if quantized == 0 || quantized * 2 < total {
        return Err(LoadError::UnsupportedQuantization(format!(
            "artifact is not 4-bit quantized: {quantized} of {total} parameters packed"
        )));
    }

    Ok(WeightFootprint {
        parameter_count: total,
        quantized_parameter_count: quantized,
        stored_bytes: packed + half * 2,
    })
}

/// Weight footprint of the loaded model against its unquantized 16-bit form.
#[derive(Debug, Clone, Serialize)]
pub struct QuantizationSummary {
    pub parameter_count: u64,
    pub quantized_parameter_count: u64,
    pub quantized_fraction_percent: f64,
    pub float16_size_bytes: u64,
    pub quantized_size_bytes: u64,
    pub artifact_size_bytes: u64,
    pub size_reduction_percent: f64,
}

impl QuantizationSummary {
    pub fn from_metadata(model: &ModelMetadata) -> QuantizationSummary {
        let params = model.parameter_count;
        let float16 = (params as f64 * model.precision.bytes_per_param()) as u64;
        let quantized = model.weight_bytes;

        QuantizationSummary {
            parameter_count: params,
            quantized_parameter_count: model.quantized_parameter_count,
            quantized_fraction_percent: percent(model.quantized_parameter_count, params),
            float16_size_bytes: float16,
            quantized_size_bytes: quantized,
            artifact_size_bytes: model.artifact_size_bytes,
            size_reduction_percent: percent(float16.saturating_sub(quantized), float16),
        }
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}
