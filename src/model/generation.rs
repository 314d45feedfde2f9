use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;

use crate::{
    error::ServiceError,
    model::{GenerationParameters, ModelMetadata, sampling::sample_next},
};

/// A loaded causal language model reduced to a single forward step.
pub trait LanguageModel: Send + Sync {
    fn metadata(&self) -> ModelMetadata;

    /// Logits over the vocabulary for the token following `input_ids`.
    fn next_token_logits(&self, input_ids: &[u32]) -> Result<Vec<f32>, ServiceError>;
}

/// Autoregressive generation. Each returned sequence holds the prompt
/// followed by the generated ids, and none is longer than `max_length`.
/// A sequence ends at the first of any stop token.
/// Sequences that stopped early are right-padded with the pad token.
pub fn generate<R: Rng>(
    model: &dyn LanguageModel,
    prompt_ids: &[u32],
    params: &GenerationParameters,
    rng: &mut R,
    cancel: &AtomicBool,
) -> Result<Vec<Vec<u32>>, ServiceError> {
    let mut sequences = Vec::with_capacity(params.num_return_sequences);

    for _ in 0..params.num_return_sequences.max(1) {
        let mut ids = prompt_ids.to_vec();
        while ids.len() < params.max_length {
            if cancel.load(Ordering::SeqCst) {
                return Err(ServiceError::Cancelled);
            }

            let logits = model.next_token_logits(&ids)?;
            let next = sample_next(&logits, params, rng)?;
            ids.push(next);

            if params.is_stop_token(next) {
                break;
            }
        }
        sequences.push(ids);
    }

    let longest = sequences.iter().map(Vec::len).max().unwrap_or(0);
    for seq in &mut sequences {
        seq.resize(longest, params.pad_token_id);
    }

    Ok(sequences)
}
