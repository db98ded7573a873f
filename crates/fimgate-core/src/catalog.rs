//! Static model catalog.
//!
//! The catalog maps client-visible model identifiers to display metadata
//! and to the backend model that actually serves them. It is built once
//! on first access and never mutated afterwards.

use std::fmt;
use std::sync::LazyLock;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Tag appended by Ollama clients that carries no routing information.
const LATEST_TAG: &str = ":latest";

/// Backend model identifiers the upstream accepts.
///
/// Canonical requests can only name one of these, so a client-supplied
/// string never reaches the upstream unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BackendModel {
    #[serde(rename = "glm-4.6")]
    Glm46,
    #[serde(rename = "glm-4.5")]
    Glm45,
    #[serde(rename = "glm-4.5-air")]
    Glm45Air,
}

impl BackendModel {
    /// Model used for every legacy completion (FIM) request.
    pub const FIM: Self = Self::Glm45Air;

    /// Wire identifier sent to the upstream.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Glm46 => "glm-4.6",
            Self::Glm45 => "glm-4.5",
            Self::Glm45Air => "glm-4.5-air",
        }
    }
}

impl fmt::Display for BackendModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature a model advertises to clients for negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Tools,
    Vision,
}

/// One catalog entry.
#[derive(Debug, Clone)]
pub struct ModelCatalogEntry {
    /// Client-visible identifier (unique within the catalog).
    pub name: &'static str,
    /// Backend model that serves requests for this identifier.
    pub backend: BackendModel,
    /// RFC 3339 timestamp reported as `modified_at`.
    pub modified_at: &'static str,
    /// Declared size in bytes.
    pub size: u64,
    /// `sha256` hex digest of the identifier.
    pub digest: String,
    /// Architecture family (e.g. "glm4").
    pub family: &'static str,
    /// Parameter-size label (e.g. "355B").
    pub parameter_size: &'static str,
    /// Quantization label.
    pub quantization_level: &'static str,
    /// Maximum context window in tokens.
    pub context_length: u64,
    top_tier: bool,
}

impl ModelCatalogEntry {
    fn new(
        name: &'static str,
        backend: BackendModel,
        size: u64,
        parameter_size: &'static str,
        context_length: u64,
        top_tier: bool,
    ) -> Self {
        Self {
            name,
            backend,
            modified_at: "2025-09-30T00:00:00Z",
            size,
            digest: sha256_hex(name),
            family: "glm4",
            parameter_size,
            quantization_level: "FP8",
            context_length,
            top_tier,
        }
    }

    /// Whether this is the designated top-tier model.
    pub const fn is_top_tier(&self) -> bool {
        self.top_tier
    }

    /// Capabilities derived from the identifier.
    ///
    /// Every model supports tool use; only the top-tier model adds vision.
    pub fn capabilities(&self) -> Vec<Capability> {
        if self.top_tier {
            vec![Capability::Tools, Capability::Vision]
        } else {
            vec![Capability::Tools]
        }
    }
}

/// Immutable set of known models with a designated default.
#[derive(Debug)]
pub struct ModelCatalog {
    entries: Vec<ModelCatalogEntry>,
    default_index: usize,
}

static CATALOG: LazyLock<ModelCatalog> = LazyLock::new(ModelCatalog::builtin);

impl ModelCatalog {
    /// The process-wide catalog.
    pub fn global() -> &'static Self {
        &CATALOG
    }

    fn builtin() -> Self {
        Self {
            entries: vec![
                ModelCatalogEntry::new(
                    "glm-4.6",
                    BackendModel::Glm46,
                    714_000_000_000,
                    "355B",
                    200_000,
                    true,
                ),
                ModelCatalogEntry::new(
                    "glm-4.5",
                    BackendModel::Glm45,
                    714_000_000_000,
                    "355B",
                    128_000,
                    false,
                ),
                ModelCatalogEntry::new(
                    "glm-4.5-air",
                    BackendModel::Glm45Air,
                    214_000_000_000,
                    "106B",
                    128_000,
                    false,
                ),
            ],
            default_index: 0,
        }
    }

    /// All entries in listing order.
    pub fn entries(&self) -> &[ModelCatalogEntry] {
        &self.entries
    }

    /// The fallback entry (highest-capability model).
    pub fn default_entry(&self) -> &ModelCatalogEntry {
        &self.entries[self.default_index]
    }

    /// Exact lookup after normalisation. Returns `None` for unknown names.
    pub fn lookup(&self, name: &str) -> Option<&ModelCatalogEntry> {
        let name = normalize_model_name(name);
        self.entries.iter().find(|e| e.name == name)
    }

    /// Resolve a name, falling back to the default entry when unknown.
    pub fn resolve(&self, name: &str) -> &ModelCatalogEntry {
        self.lookup(name).unwrap_or_else(|| self.default_entry())
    }

    /// Entry backed by the given backend model.
    pub fn for_backend(&self, backend: BackendModel) -> Option<&ModelCatalogEntry> {
        self.entries.iter().find(|e| e.backend == backend)
    }
}

/// Strip a trailing `:latest` tag.
pub fn normalize_model_name(name: &str) -> &str {
    name.strip_suffix(LATEST_TAG).unwrap_or(name)
}

fn sha256_hex(input: &str) -> String {
    let hash = Sha256::digest(input.as_bytes());
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_known_name_returns_exact_entry() {
        let catalog = ModelCatalog::global();
        for entry in catalog.entries() {
            assert_eq!(catalog.resolve(entry.name).name, entry.name);
        }
    }

    #[test]
    fn resolve_unknown_name_falls_back_to_default() {
        let catalog = ModelCatalog::global();
        let entry = catalog.resolve("unknown-model");
        assert_eq!(entry.name, catalog.default_entry().name);
        assert!(entry.is_top_tier());
        assert!(catalog.lookup("unknown-model").is_none());
    }

    #[test]
    fn latest_tag_is_ignored() {
        let catalog = ModelCatalog::global();
        assert_eq!(catalog.resolve("glm-4.5-air:latest").name, "glm-4.5-air");
        assert_eq!(normalize_model_name("glm-4.5"), "glm-4.5");
    }

    #[test]
    fn exactly_one_entry_has_vision() {
        let catalog = ModelCatalog::global();
        let vision: Vec<_> = catalog
            .entries()
            .iter()
            .filter(|e| e.capabilities().contains(&Capability::Vision))
            .collect();
        assert_eq!(vision.len(), 1);
        assert!(vision[0].is_top_tier());

        for entry in catalog.entries() {
            assert!(entry.capabilities().contains(&Capability::Tools));
        }
    }

    #[test]
    fn identifiers_are_unique() {
        let catalog = ModelCatalog::global();
        let mut names: Vec<_> = catalog.entries().iter().map(|e| e.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), catalog.entries().len());
    }

    #[test]
    fn digest_is_stable_sha256_hex() {
        let catalog = ModelCatalog::global();
        let entry = catalog.resolve("glm-4.5");
        assert_eq!(entry.digest.len(), 64);
        assert_eq!(entry.digest, sha256_hex("glm-4.5"));
    }

    #[test]
    fn fim_backend_is_in_catalog() {
        let catalog = ModelCatalog::global();
        assert!(catalog.for_backend(BackendModel::FIM).is_some());
        assert_eq!(BackendModel::FIM.as_str(), "glm-4.5-air");
    }
}
