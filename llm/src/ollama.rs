//! Client for a local Ollama server's `/api/chat` endpoint.

use crate::{api_error, http_client, ChatRequest, Error};
use serde::{Deserialize, Serialize};

const DEFAULT_HOST: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "gemma3:1b";

/// Ollama chat client.
#[derive(Clone)]
pub struct Ollama {
    client: reqwest::Client,
    host: String,
    model: String,
}

impl Ollama {
    /// Create a client for the Ollama server at `host`.
    pub fn new(host: impl Into<String>) -> Result<Self, Error> {
        let host = host.into().trim_end_matches('/').to_string();
        if host.is_empty() {
            return Err(Error::Config("Ollama host is empty".to_string()));
        }

        Ok(Self {
            client: http_client()?,
            host,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Create a client from `OLLAMA_HOST`, falling back to localhost.
    pub fn from_env() -> Result<Self, Error> {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        Self::new(host)
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// The model used when a request does not name one.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a chat request and return the assistant's reply text.
    pub async fn complete(&self, request: &ChatRequest) -> Result<String, Error> {
        let api_request = self.build_api_request(request);

        let response = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        Ok(api_response.message.content)
    }

    fn build_api_request(&self, request: &ChatRequest) -> ApiRequest {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);

        // Ollama takes the system instruction as a leading message
        if let Some(ref system) = request.system {
            messages.push(ApiMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        messages.extend(request.messages.iter().map(|m| ApiMessage {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        }));

        ApiRequest {
            model: request.model.clone().unwrap_or_else(|| self.model.clone()),
            messages,
            stream: false,
            options: ApiOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        }
    }
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<ApiMessage>,
    stream: bool,
    options: ApiOptions,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ApiOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    num_predict: usize,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    message: ApiMessage,
}
