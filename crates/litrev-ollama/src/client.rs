//! Ollama HTTP client.

use crate::error::{OllamaError, OllamaResult};
use crate::types::{EmbedRequest, EmbedResponse, ModelInfo, TagsResponse};
use litrev_config::OllamaConfig;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Client for Ollama's embedding API.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    host: String,
    model: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn from_config(config: &OllamaConfig) -> OllamaResult<Self> {
        Self::build(
            &config.host,
            &config.embedding_model,
            Duration::from_secs(config.timeout_seconds),
        )
    }

    /// Client with a two minute request timeout.
    pub fn new(host: impl Into<String>, model: impl Into<String>) -> OllamaResult<Self> {
        Self::build(&host.into(), &model.into(), Duration::from_secs(120))
    }

    fn build(host: &str, model: &str, timeout: Duration) -> OllamaResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Embedding model used for both chunks and queries.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.host, path)
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> OllamaResult<T> {
        let response = request.send().await.map_err(|e| self.classify(e))?;
        let response = self.ensure_success(response).await?;
        Ok(response.json().await?)
    }

    fn classify(&self, e: reqwest::Error) -> OllamaError {
        if e.is_connect() {
            OllamaError::ServerNotRunning {
                host: self.host.clone(),
            }
        } else if e.is_timeout() {
            OllamaError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else {
            OllamaError::Http(e)
        }
    }

    async fn ensure_success(&self, response: Response) -> OllamaResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        if status.as_u16() == 404 || message.contains("not found") {
            Err(OllamaError::ModelNotFound {
                model: self.model.clone(),
            })
        } else {
            Err(OllamaError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// True when the server answers its model listing.
    pub async fn is_available(&self) -> bool {
        self.client
            .get(self.endpoint("tags"))
            .send()
            .await
            .is_ok_and(|resp| resp.status().is_success())
    }

    pub async fn list_models(&self) -> OllamaResult<Vec<ModelInfo>> {
        debug!("Listing models at {}", self.host);
        let tags: TagsResponse = self.call(self.client.get(self.endpoint("tags"))).await?;
        Ok(tags.models)
    }

    /// Whether the configured embedding model is installed.
    pub async fn has_model(&self) -> OllamaResult<bool> {
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| m.matches(&self.model)))
    }

    /// Embed a single query string.
    pub async fn embed(&self, text: &str) -> OllamaResult<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| OllamaError::EmptyEmbedding {
            model: self.model.clone(),
        })
    }

    /// Embed several texts in one request. Vectors come back in input order.
    pub async fn embed_batch(&self, texts: &[String]) -> OllamaResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Embedding {} texts with {}", texts.len(), self.model);

        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };
        let response: EmbedResponse = self
            .call(self.client.post(self.endpoint("embed")).json(&request))
            .await?;

        if response.embeddings.len() != texts.len()
            || response.embeddings.iter().any(|v| v.is_empty())
        {
            return Err(OllamaError::EmptyEmbedding {
                model: self.model.clone(),
            });
        }
        Ok(response.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_default_config() {
        let client = OllamaClient::from_config(&OllamaConfig::default()).unwrap();
        assert_eq!(client.model(), "nomic-embed-text");
        assert_eq!(client.endpoint("embed"), "http://localhost:11434/api/embed");
    }

    #[test]
    fn test_host_trailing_slash_trimmed() {
        let client = OllamaClient::new("http://localhost:11434/", "m").unwrap();
        assert_eq!(client.host(), "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        // Nothing listens on the discard port.
        let client = OllamaClient::new("http://127.0.0.1:9", "m").unwrap();
        assert!(!client.is_available().await);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_the_server() {
        let client = OllamaClient::new("http://127.0.0.1:9", "m").unwrap();
        assert!(client.embed_batch(&[]).await.unwrap().is_empty());
    }
}
