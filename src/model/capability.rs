use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tokenizers::Tokenizer;
use tokio::task;

use crate::{
    error::{LoadError, ServiceError},
    model::{GenerationParameters, LanguageModel, ModelMetadata, generation::generate},
};

/// End-of-sequence spellings across the tokenizer families we serve.
const EOS_CANDIDATES: &[&str] = &[
    "<|eot_id|>",
    "<|end_of_text|>",
    "</s>",
    "<|endoftext|>",
    "<eos>",
];

/// A loaded model paired with its tokenizer. Only constructible from both
/// halves; immutable for the rest of the process.
pub struct GenerationCapability {
    model: Arc<dyn LanguageModel>,
    tokenizer: Arc<Tokenizer>,
    parameters: GenerationParameters,
    // One generation holds the device at a time.
    device_lock: Mutex<()>,
}

#[derive(Debug, Clone)]
pub struct Completion {
    /// Full decoded sequence, prompt included, special tokens stripped.
    pub text: String,
    pub prompt_tokens: usize,
    pub generated_tokens: usize,
    pub elapsed: Duration,
}

impl GenerationCapability {
    pub fn new(model: Arc<dyn LanguageModel>, tokenizer: Arc<Tokenizer>) -> Result<Self, LoadError> {
        Self::with_declared_eos(model, tokenizer, &[])
    }

    /// `declared` holds end-of-sequence ids from the repository's generation
    /// config. They stop generation together with every end-of-sequence token
    /// found in the vocabulary; the first vocabulary match is also padding.
    pub fn with_declared_eos(
        model: Arc<dyn LanguageModel>,
        tokenizer: Arc<Tokenizer>,
        declared: &[u32],
    ) -> Result<Self, LoadError> {
        let known = resolve_eos_tokens(&tokenizer);
        let eos = known
            .first()
            .or(declared.first())
            .copied()
            .ok_or(LoadError::MissingEosToken)?;
        let stops: Vec<u32> = known.iter().chain(declared).copied().collect();
        Ok(Self {
            model,
            tokenizer,
            parameters: GenerationParameters::with_stop_tokens(eos, &stops),
            device_lock: Mutex::new(()),
        })
    }

    pub fn parameters(&self) -> &GenerationParameters {
        &self.parameters
    }

    pub fn metadata(&self) -> ModelMetadata {
        self.model.metadata()
    }

    /// Blocking: tokenize, generate and decode one prompt.
    pub fn complete(&self, prompt: &str, cancel: &AtomicBool) -> Result<Completion, ServiceError> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| ServiceError::Tokenizer(e.to_string()))?;
        let prompt_ids = encoding.get_ids().to_vec();

        let _device = self.device_lock.lock();
        let start = Instant::now();
        let mut rng = rand::thread_rng();
        let sequences = generate(
            self.model.as_ref(),
            &prompt_ids,
            &self.parameters,
            &mut rng,
            cancel,
        )?;
        let elapsed = start.elapsed();

        let output = sequences
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Inference("model produced no sequence".into()))?;
        let text = self
            .tokenizer
            .decode(&output, true)
            .map_err(|e| ServiceError::Tokenizer(e.to_string()))?;

        Ok(Completion {
            text,
            prompt_tokens: prompt_ids.len(),
            generated_tokens: output.len().saturating_sub(prompt_ids.len()),
            elapsed,
        })
    }

    /// Runs [`complete`](Self::complete) on the blocking pool. When `timeout`
    /// expires the request fails and the generation loop is told to stop.
    pub async fn complete_within(
        self: &Arc<Self>,
        prompt: String,
        timeout: Duration,
    ) -> Result<Completion, ServiceError> {
        let cancel = Arc::new(AtomicBool::new(false));
        let capability = Arc::clone(self);
        let flag = Arc::clone(&cancel);
        let job = task::spawn_blocking(move || capability.complete(&prompt, &flag));

        match tokio::time::timeout(timeout, job).await {
            Ok(joined) => joined
                .map_err(|err| ServiceError::Inference(format!("inference task failed: {err}")))?,
            Err(_) => {
                cancel.store(true, Ordering::SeqCst);
                Err(ServiceError::Timeout(timeout))
            }
        }
    }
}

fn resolve_eos_tokens(tokenizer: &Tokenizer) -> Vec<u32> {
    EOS_CANDIDATES
        .iter()
        .filter_map(|token| tokenizer.token_to_id(token))
        .collect()
}
