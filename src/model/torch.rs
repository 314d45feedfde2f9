use std::{fs, path::Path};

use parking_lot::Mutex;
use tch::{Device, IValue, Kind, Tensor, no_grad};

use crate::{
    config::ModelSource,
    error::{LoadError, ServiceError},
    model::{LanguageModel, ModelMetadata, Precision, QuantizationMode},
    quantization::{StorageKind, TensorStorage, inspect_weights},
};

/// TorchScript causal language model returning `[batch, seq, vocab]` logits.
pub struct TorchModel {
    metadata: ModelMetadata,
    device: Device,
    module: Mutex<tch::CModule>,
}

impl TorchModel {
    pub fn load(
        module_path: &Path,
        source: &ModelSource,
        precision: Precision,
        quantization: QuantizationMode,
    ) -> Result<Self, LoadError> {
        if !module_path.exists() {
            return Err(LoadError::Model(format!(
                "model artifact missing: {}",
                module_path.display()
            )));
        }

        let device = Device::cuda_if_available();
        if !device.is_cuda() {
            return Err(LoadError::UnsupportedQuantization(format!(
                "{quantization} weights require a CUDA device"
            )));
        }

        let artifact_size_bytes = fs::metadata(module_path)
            .map_err(|e| LoadError::Model(e.to_string()))?
            .len();
        let mut module = tch::CModule::load_on_device(module_path, device)
            .map_err(|e| LoadError::Model(e.to_string()))?;
        // Weights stay in their stored dtypes; casting would unpack the
        // 4-bit tensors.
        module.set_eval();

        let storage: Vec<TensorStorage> = module
            .named_parameters()
            .map_err(|e| LoadError::Model(e.to_string()))?
            .iter()
            .map(|(name, t)| TensorStorage {
                name: name.clone(),
                kind: storage_kind(t.kind()),
                elements: t.numel() as u64,
            })
            .collect();
        let footprint = inspect_weights(&storage)?;

        Ok(Self {
            metadata: ModelMetadata {
                model_id: source.model_id.clone(),
                revision: source.revision.clone(),
                device: format!("{device:?}"),
                precision,
                quantization,
                parameter_count: footprint.parameter_count,
                quantized_parameter_count: footprint.quantized_parameter_count,
                weight_bytes: footprint.stored_bytes,
                artifact_size_bytes,
            },
            device,
            module: Mutex::new(module),
        })
    }
}

impl LanguageModel for TorchModel {
    fn metadata(&self) -> ModelMetadata {
        self.metadata.clone()
    }

    fn next_token_logits(&self, input_ids: &[u32]) -> Result<Vec<f32>, ServiceError> {
        if input_ids.is_empty() {
            return Err(ServiceError::BadRequest("input sequence is empty".into()));
        }
        let ids: Vec<i64> = input_ids.iter().map(|&id| id as i64).collect();

        no_grad(|| {
            let module = self.module.lock();
            let input = Tensor::from_slice(&ids)
                .reshape([1, ids.len() as i64])
                .to(self.device);

            let output = module
                .forward_is(&[IValue::Tensor(input)])
                .map_err(|e| ServiceError::Inference(e.to_string()))?;

            // Traced HF models return either bare logits or (logits, past, ..).
            let logits = match output {
                IValue::Tensor(t) => t,
                IValue::Tuple(ref items) if !items.is_empty() => match &items[0] {
                    IValue::Tensor(t) => t.shallow_clone(),
                    _ => {
                        return Err(ServiceError::Inference(
                            "expected tensor as first tuple element".into(),
                        ));
                    }
                },
                _ => {
                    return Err(ServiceError::Inference(
                        "unexpected model output format".into(),
                    ));
                }
            };

            let last = logits
                .select(1, -1)
                .squeeze()
                .to_kind(Kind::Float)
                .to(Device::Cpu);
            Vec::<f32>::try_from(&last).map_err(|e| ServiceError::Inference(e.to_string()))
        })
    }
}

fn storage_kind(kind: Kind) -> StorageKind {
    match kind {
        Kind::Uint8 => StorageKind::Packed4Bit,
        Kind::Half => StorageKind::Float16,
        Kind::Float | Kind::Double | Kind::BFloat16 => StorageKind::OtherFloat(format!("{kind:?}")),
        other => StorageKind::Other(format!("{other:?}")),
    }
}
