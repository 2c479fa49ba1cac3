use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::attachment::ImagePayload;

/// One request, one reply. Any error is treated by the caller as the
/// endpoint being unreachable; there is no retry and no partial result.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn request_reply(&self, text: &str, image: Option<&ImagePayload>) -> Result<String>;
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<&'a str>>,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for an Ollama-compatible endpoint (`/api/generate`).
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn request_reply(&self, text: &str, image: Option<&ImagePayload>) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: &self.model,
            prompt: text,
            images: image.map(|payload| vec![payload.base64_data()]),
            stream: false,
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "request failed with status: {}",
                response.status()
            ));
        }

        let body: GenerateResponse = response.json().await?;
        Ok(body.response)
    }
}
