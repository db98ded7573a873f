//! Listing and discovery payloads for both surface protocols.
//!
//! Catalog entries live in `fimgate-core`; this module maps them to the
//! Ollama (`/api/tags`, `/api/show`) and OpenAI (`/v1/models`) shapes.

use chrono::DateTime;
use fimgate_core::{Capability, ModelCatalogEntry};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Body of `GET /`.
pub const OLLAMA_ROOT_RESPONSE: &str = "Ollama is running";

/// Ollama version claimed on `/api/version`.
pub const OLLAMA_COMPAT_VERSION: &str = "0.6.4";

// =============================================================================
// Ollama
// =============================================================================

/// Response from `/api/version`.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaVersionResponse {
    pub version: String,
}

/// Model details shared by tags and show.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaModelDetails {
    pub parent_model: String,
    pub format: String,
    pub family: String,
    pub families: Vec<String>,
    pub parameter_size: String,
    pub quantization_level: String,
}

impl From<&ModelCatalogEntry> for OllamaModelDetails {
    fn from(entry: &ModelCatalogEntry) -> Self {
        Self {
            parent_model: String::new(),
            format: "safetensors".to_string(),
            family: entry.family.to_string(),
            families: vec![entry.family.to_string()],
            parameter_size: entry.parameter_size.to_string(),
            quantization_level: entry.quantization_level.to_string(),
        }
    }
}

/// One entry of `/api/tags`.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaTagEntry {
    pub name: String,
    pub model: String,
    pub modified_at: String,
    pub size: u64,
    pub digest: String,
    pub details: OllamaModelDetails,
}

impl From<&ModelCatalogEntry> for OllamaTagEntry {
    fn from(entry: &ModelCatalogEntry) -> Self {
        Self {
            name: entry.name.to_string(),
            model: entry.name.to_string(),
            modified_at: entry.modified_at.to_string(),
            size: entry.size,
            digest: entry.digest.clone(),
            details: entry.into(),
        }
    }
}

/// Response from `/api/tags`.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaTagsResponse {
    pub models: Vec<OllamaTagEntry>,
}

impl OllamaTagsResponse {
    pub fn from_entries(entries: &[ModelCatalogEntry]) -> Self {
        Self {
            models: entries.iter().map(OllamaTagEntry::from).collect(),
        }
    }
}

/// Request to `/api/show`. Older clients send `name`, newer ones `model`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaShowRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl OllamaShowRequest {
    pub fn effective_model(&self) -> &str {
        self.model
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or_default()
    }
}

/// Response from `/api/show`.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaShowResponse {
    pub modelfile: String,
    pub parameters: String,
    pub template: String,
    pub details: OllamaModelDetails,
    pub model_info: Map<String, Value>,
    pub capabilities: Vec<Capability>,
    pub modified_at: String,
}

impl OllamaShowResponse {
    pub fn from_entry(entry: &ModelCatalogEntry) -> Self {
        Self {
            modelfile: format!("FROM {}\n", entry.name),
            parameters: String::new(),
            template: "{{ .Prompt }}".to_string(),
            details: entry.into(),
            model_info: model_info(entry),
            capabilities: entry.capabilities(),
            modified_at: entry.modified_at.to_string(),
        }
    }
}

/// Synthesised GGUF-style metadata map.
fn model_info(entry: &ModelCatalogEntry) -> Map<String, Value> {
    let mut info = Map::new();
    info.insert("general.architecture".into(), json!(entry.family));
    info.insert("general.basename".into(), json!(entry.name));
    info.insert(
        "general.parameter_count".into(),
        json!(parameter_count(entry.parameter_size)),
    );
    info.insert(
        format!("{}.context_length", entry.family),
        json!(entry.context_length),
    );
    info
}

/// Turn a label like "355B" into a count; unknown labels give 0.
fn parameter_count(label: &str) -> u64 {
    let (digits, scale) = match label.chars().last() {
        Some('B' | 'b') => (&label[..label.len() - 1], 1_000_000_000),
        Some('M' | 'm') => (&label[..label.len() - 1], 1_000_000),
        _ => (label, 1),
    };
    digits.parse::<u64>().map_or(0, |n| n * scale)
}

// =============================================================================
// OpenAI
// =============================================================================

/// Response from `/v1/models`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<ModelInfo>,
}

impl ModelsResponse {
    pub fn from_entries(entries: &[ModelCatalogEntry]) -> Self {
        Self {
            object: "list".to_string(),
            data: entries.iter().map(ModelInfo::from).collect(),
        }
    }
}

/// Information about a single model (OpenAI format).
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

impl From<&ModelCatalogEntry> for ModelInfo {
    fn from(entry: &ModelCatalogEntry) -> Self {
        Self {
            id: entry.name.to_string(),
            object: "model".to_string(),
            created: DateTime::parse_from_rfc3339(entry.modified_at)
                .map_or(0, |dt| dt.timestamp()),
            owned_by: "fimgate".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fimgate_core::ModelCatalog;

    #[test]
    fn test_tags_shape() {
        let tags = OllamaTagsResponse::from_entries(ModelCatalog::global().entries());
        let json = serde_json::to_value(&tags).unwrap();
        let first = &json["models"][0];
        for field in ["model", "name", "modified_at", "size", "digest"] {
            assert!(first.get(field).is_some(), "missing {field}");
        }
        for field in ["family", "parameter_size", "quantization_level"] {
            assert!(first["details"].get(field).is_some(), "missing details.{field}");
        }
    }

    #[test]
    fn test_show_includes_capabilities_and_model_info() {
        let entry = ModelCatalog::global().default_entry();
        let json = serde_json::to_value(OllamaShowResponse::from_entry(entry)).unwrap();
        assert_eq!(json["capabilities"], json!(["tools", "vision"]));
        assert_eq!(json["model_info"]["general.architecture"], "glm4");
        assert_eq!(json["model_info"]["glm4.context_length"], 200_000);
        assert_eq!(json["model_info"]["general.parameter_count"], 355_000_000_000_u64);
    }

    #[test]
    fn test_show_request_prefers_model() {
        let req: OllamaShowRequest =
            serde_json::from_str(r#"{"name":"a","model":"b"}"#).unwrap();
        assert_eq!(req.effective_model(), "b");
        let req: OllamaShowRequest = serde_json::from_str(r#"{"name":"a"}"#).unwrap();
        assert_eq!(req.effective_model(), "a");
        assert_eq!(OllamaShowRequest::default().effective_model(), "");
    }

    #[test]
    fn test_parameter_count() {
        assert_eq!(parameter_count("106B"), 106_000_000_000);
        assert_eq!(parameter_count("350M"), 350_000_000);
        assert_eq!(parameter_count("?"), 0);
    }

    #[test]
    fn test_models_response_created_from_modified_at() {
        let resp = ModelsResponse::from_entries(ModelCatalog::global().entries());
        assert_eq!(resp.object, "list");
        assert!(resp.data.iter().all(|m| m.created > 0));
    }
}
