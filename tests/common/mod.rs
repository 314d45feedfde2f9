use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode},
};
use tokenizers::Tokenizer;
use tower::ServiceExt;

use llm_chat_service::{
    ChatHandler, GenerationCapability, LanguageModel, ServiceError, build_router,
    model::{ModelMetadata, Precision, QuantizationMode},
};

const VOCAB: &[&str] = &["<unk>", "<eos>", "User:", "Assistant:", "Hello", "Hi", "there", "boom"];

fn id(token: &str) -> u32 {
    VOCAB.iter().position(|t| *t == token).unwrap() as u32
}

pub fn tokenizer() -> Tokenizer {
    let vocab: serde_json::Map<String, serde_json::Value> = VOCAB
        .iter()
        .enumerate()
        .map(|(i, t)| (t.to_string(), serde_json::json!(i)))
        .collect();
    let json = serde_json::json!({
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [{
            "id": id("<eos>"),
            "content": "<eos>",
            "single_word": false,
            "lstrip": false,
            "rstrip": false,
            "normalized": false,
            "special": true
        }],
        "normalizer": null,
        "pre_tokenizer": { "type": "WhitespaceSplit" },
        "post_processor": null,
        "decoder": null,
        "model": { "type": "WordLevel", "vocab": vocab, "unk_token": "<unk>" }
    });
    Tokenizer::from_bytes(json.to_string().as_bytes()).unwrap()
}

/// Replies "Hi there" to anything; prompts mentioning `boom` fault.
pub struct EchoModel;

impl LanguageModel for EchoModel {
    fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            model_id: "test/echo".into(),
            revision: Some("main".into()),
            device: "Cpu".into(),
            precision: Precision::Float16,
            quantization: QuantizationMode::Int4,
            parameter_count: 2_000,
            quantized_parameter_count: 1_600,
            weight_bytes: 1_600,
            artifact_size_bytes: 1_700,
        }
    }

    fn next_token_logits(&self, input_ids: &[u32]) -> Result<Vec<f32>, ServiceError> {
        if input_ids.contains(&id("boom")) {
            return Err(ServiceError::Inference("CUDA out of memory".into()));
        }
        let next = match input_ids.last().copied() {
            Some(last) if last == id("Assistant:") => id("Hi"),
            Some(last) if last == id("Hi") => id("there"),
            _ => id("<eos>"),
        };
        let mut logits = vec![0.0; VOCAB.len()];
        logits[next as usize] = 100.0;
        Ok(logits)
    }
}

pub fn ready_app() -> Router {
    let capability = GenerationCapability::new(Arc::new(EchoModel), Arc::new(tokenizer())).unwrap();
    build_router(ChatHandler::new(Some(capability), Duration::from_secs(5)))
}

pub fn unready_app() -> Router {
    build_router(ChatHandler::new(None, Duration::from_secs(5)))
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response: Response<Body> = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

pub fn post_chat(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}
