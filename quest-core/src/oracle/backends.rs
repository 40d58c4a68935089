//! Oracle implementations for the `llm` clients.

use super::{Oracle, OracleError, OracleRequest};
use async_trait::async_trait;
use llm::{ChatRequest, Claude, Message, Ollama};

fn chat_request(request: &OracleRequest) -> ChatRequest {
    let mut chat = ChatRequest::new(vec![Message::user(request.payload.to_string())])
        .with_system(request.system_instruction.clone())
        .with_max_tokens(request.max_tokens);
    if let Some(model) = &request.model {
        chat = chat.with_model(model.clone());
    }
    if let Some(temperature) = request.temperature {
        chat = chat.with_temperature(temperature);
    }
    chat
}

#[async_trait]
impl Oracle for Ollama {
    async fn consult(&self, request: &OracleRequest) -> Result<String, OracleError> {
        Ok(self.complete(&chat_request(request)).await?)
    }
}

#[async_trait]
impl Oracle for Claude {
    async fn consult(&self, request: &OracleRequest) -> Result<String, OracleError> {
        Ok(self.complete(&chat_request(request)).await?)
    }
}
