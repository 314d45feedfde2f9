//! In-memory tokenizer and scripted model for unit tests.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    thread,
    time::Duration,
};

use parking_lot::Mutex;
use tokenizers::Tokenizer;

use crate::{
    error::ServiceError,
    model::{LanguageModel, ModelMetadata, Precision, QuantizationMode},
};

pub const VOCAB: &[&str] = &[
    "<unk>",
    "<eos>",
    "User:",
    "Assistant:",
    "Hello",
    "Hi",
    "there",
    "boom",
];

/// Whitespace word-level tokenizer over `vocab`; `specials` are stripped on
/// decode.
pub fn tokenizer_with(vocab: &[&str], specials: &[&str]) -> Tokenizer {
    let vocab_json: serde_json::Map<String, serde_json::Value> = vocab
        .iter()
        .enumerate()
        .map(|(id, tok)| (tok.to_string(), serde_json::json!(id)))
        .collect();
    let added: Vec<serde_json::Value> = specials
        .iter()
        .filter_map(|tok| vocab.iter().position(|v| v == tok).map(|id| (id, tok)))
        .map(|(id, tok)| {
            serde_json::json!({
                "id": id,
                "content": tok,
                "single_word": false,
                "lstrip": false,
                "rstrip": false,
                "normalized": false,
                "special": true
            })
        })
        .collect();

    let json = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": added,
        "normalizer": null,
        "pre_tokenizer": { "type": "WhitespaceSplit" },
        "post_processor": null,
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": vocab_json,
            "unk_token": "<unk>"
        }
    });
    Tokenizer::from_bytes(json.to_string().as_bytes()).expect("fixture tokenizer")
}

/// [`VOCAB`] with `<eos>` special.
pub fn word_tokenizer() -> Tokenizer {
    tokenizer_with(VOCAB, &["<eos>"])
}

pub fn tokenizer_without_eos() -> Tokenizer {
    let vocab: Vec<&str> = VOCAB.iter().copied().filter(|t| *t != "<eos>").collect();
    tokenizer_with(&vocab, &[])
}

fn token_id(token: &str) -> u32 {
    VOCAB
        .iter()
        .position(|t| *t == token)
        .expect("token in fixture vocab") as u32
}

pub fn metadata() -> ModelMetadata {
    ModelMetadata {
        model_id: "test/scripted".into(),
        revision: None,
        device: "Cpu".into(),
        precision: Precision::Float16,
        quantization: QuantizationMode::Int4,
        parameter_count: 1_000,
        quantized_parameter_count: 800,
        weight_bytes: 800,
        artifact_size_bytes: 900,
    }
}

/// Answers every prompt with a fixed word sequence followed by `<eos>`, or
/// repeats it forever when built with [`endless`](Self::endless). Prompts
/// containing `boom` fail with an inference error.
pub struct ScriptedModel {
    reply: Vec<u32>,
    repeat: bool,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    /// Message token of the prompt behind every forward step, in call order.
    pub trace: Mutex<Vec<u32>>,
}

impl ScriptedModel {
    pub fn replying(words: &[&str]) -> Self {
        Self {
            reply: words.iter().map(|w| token_id(w)).collect(),
            repeat: false,
            delay: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            trace: Mutex::new(Vec::new()),
        }
    }

    pub fn endless(word: &str) -> Self {
        Self {
            repeat: true,
            ..Self::replying(&[word])
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LanguageModel for ScriptedModel {
    fn metadata(&self) -> ModelMetadata {
        metadata()
    }

    fn next_token_logits(&self, input_ids: &[u32]) -> Result<Vec<f32>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(&message) = input_ids.get(1) {
            self.trace.lock().push(message);
        }
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if input_ids.contains(&token_id("boom")) {
            return Err(ServiceError::Inference("forced fault".into()));
        }

        let assistant = token_id("Assistant:");
        let prompt_end = input_ids
            .iter()
            .rposition(|id| *id == assistant)
            .map(|pos| pos + 1)
            .unwrap_or(input_ids.len());
        let step = input_ids.len() - prompt_end;
        let next = if self.repeat && !self.reply.is_empty() {
            self.reply[step % self.reply.len()]
        } else {
            self.reply.get(step).copied().unwrap_or(token_id("<eos>"))
        };

        let mut logits = vec![0.0; VOCAB.len()];
        logits[next as usize] = 100.0;
        Ok(logits)
    }
}
