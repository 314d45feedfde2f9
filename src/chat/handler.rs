use std::{sync::Arc, time::Duration};

use tracing::{error, info, warn};

use crate::{
    chat::{ChatReply, ChatRequest, ChatResponse, build_prompt, extract_reply},
    error::ServiceError,
    model::GenerationCapability,
};

/// Serves chat requests against whatever the startup load produced. Without a
/// capability every request fails with [`ServiceError::ModelNotLoaded`].
#[derive(Clone)]
pub struct ChatHandler {
    capability: Option<Arc<GenerationCapability>>,
    timeout: Duration,
}

impl ChatHandler {
    pub fn new(capability: Option<GenerationCapability>, timeout: Duration) -> Self {
        Self {
            capability: capability.map(Arc::new),
            timeout,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.capability.is_some()
    }

    pub fn capability(&self) -> Option<&Arc<GenerationCapability>> {
        self.capability.as_ref()
    }

    /// Entry point for raw request bodies. Readiness is checked before the
    /// body is looked at.
    pub async fn handle_body(&self, body: &[u8]) -> ChatResponse {
        let capability = self.ready()?;
        let result = match ChatRequest::from_body(body) {
            Ok(request) => self.respond(capability, &request).await,
            Err(err) => Err(err),
        };
        log_failure(result)
    }

    pub async fn handle(&self, request: &ChatRequest) -> ChatResponse {
        let capability = self.ready()?;
        log_failure(self.respond(capability, request).await)
    }

    fn ready(&self) -> Result<&Arc<GenerationCapability>, ServiceError> {
        self.capability.as_ref().ok_or_else(|| {
            warn!("rejecting chat request: model unavailable");
            ServiceError::ModelNotLoaded
        })
    }

    async fn respond(
        &self,
        capability: &Arc<GenerationCapability>,
        request: &ChatRequest,
    ) -> ChatResponse {
        let prompt = build_prompt(request.message());
        let completion = capability.complete_within(prompt, self.timeout).await?;

        info!(
            prompt_tokens = completion.prompt_tokens,
            generated_tokens = completion.generated_tokens,
            elapsed_ms = completion.elapsed.as_millis() as u64,
            "generation finished"
        );

        Ok(ChatReply::success(extract_reply(&completion.text)))
    }
}

fn log_failure(result: ChatResponse) -> ChatResponse {
    if let Err(err) = &result {
        error!(error = %err, "error generating response");
    }
    result
}
