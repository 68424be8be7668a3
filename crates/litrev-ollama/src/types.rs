//! Wire types for the Ollama endpoints the index uses.

use serde::{Deserialize, Serialize};

/// A locally installed model as reported by `/api/tags`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub digest: String,
}

impl ModelInfo {
    /// Whether this entry satisfies a configured model name, with or without a tag.
    pub fn matches(&self, wanted: &str) -> bool {
        match self.name.split_once(':') {
            Some((base, _)) => self.name == wanted || base == wanted,
            None => self.name == wanted,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

/// Body of a batched `/api/embed` call.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct EmbedRequest<'a> {
    pub model: &'a str,
    pub input: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EmbedResponse {
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_request_carries_every_input() {
        let input = vec!["soil carbon".to_string(), "crop yield".to_string()];
        let request = EmbedRequest {
            model: "nomic-embed-text",
            input: &input,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "nomic-embed-text");
        assert_eq!(value["input"][1], "crop yield");
    }

    #[test]
    fn test_tags_response_tolerates_sparse_entries() {
        let tags: TagsResponse =
            serde_json::from_str(r#"{"models":[{"name":"nomic-embed-text:latest"}]}"#).unwrap();
        assert_eq!(tags.models[0].size, 0);
        assert!(tags.models[0].matches("nomic-embed-text"));
        assert!(tags.models[0].matches("nomic-embed-text:latest"));
        assert!(!tags.models[0].matches("nomic"));

        let empty: TagsResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.models.is_empty());
    }
}
