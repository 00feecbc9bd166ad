use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path};

use crate::contract::ParamContract;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BubbleKind {
    #[default]
    Service,
    Tool,
    Workflow,
}

/// Credential kinds a bubble needs, optionally refined per operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSpec {
    /// Kinds required when the operation is absent or has no dedicated entry.
    #[serde(default)]
    pub default: Vec<String>,
    #[serde(default)]
    pub operations: IndexMap<String, Vec<String>>,
}

impl CredentialSpec {
    pub fn for_operation(&self, operation: Option<&str>) -> &[String] {
        operation
            .and_then(|op| self.operations.get(op))
            .map(Vec::as_slice)
            .unwrap_or(&self.default)
    }
}

/// Catalog entry for one integration primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleDefinition {
    /// Class name as written in flow source, e.g. `SlackBubble`.
    pub class_name: String,
    pub bubble_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub kind: BubbleKind,
    #[serde(default)]
    pub params: ParamContract,
    #[serde(default)]
    pub credentials: CredentialSpec,
}

impl BubbleDefinition {
    /// Name used for the contract type in diagnostics.
    pub fn params_type_name(&self) -> String {
        match &self.params {
            ParamContract::Object(schema) => schema
                .name
                .clone()
                .unwrap_or_else(|| format!("{}Params", self.class_name)),
            ParamContract::DiscriminatedUnion { .. } => format!("{}Params", self.class_name),
        }
    }
}

pub trait BubbleRegistry: Send + Sync {
    fn resolve(&self, class_name: &str) -> Option<&BubbleDefinition>;

    fn contains(&self, class_name: &str) -> bool {
        self.resolve(class_name).is_some()
    }
}

impl BubbleRegistry for Box<dyn BubbleRegistry> {
    fn resolve(&self, class_name: &str) -> Option<&BubbleDefinition> {
        self.as_ref().resolve(class_name)
    }
}

/// Registry held in memory; seeded programmatically or loaded from a catalog file.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    entries: HashMap<String, BubbleDefinition>,
}

#[derive(Deserialize)]
struct RegistryFile {
    #[serde(default)]
    bubbles: Vec<BubbleDefinition>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, definition: BubbleDefinition) {
        self.entries.insert(definition.class_name.clone(), definition);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_json_str(text: &str) -> anyhow::Result<Self> {
        let file: RegistryFile =
            serde_json::from_str(text).context("invalid bubble registry JSON")?;
        Ok(file.bubbles.into_iter().collect())
    }

    /// Load a registry from disk, accepting JSON by default and TOML when the `toml` feature is enabled.
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let txt = fs::read_to_string(path_ref).with_context(|| {
            format!("unable to read bubble registry at {}", path_ref.display())
        })?;
        if let Ok(file) = serde_json::from_str::<RegistryFile>(&txt) {
            tracing::debug!(
                path = %path_ref.display(),
                bubbles = file.bubbles.len(),
                "loaded bubble registry"
            );
            return Ok(file.bubbles.into_iter().collect());
        }

        #[cfg(feature = "toml")]
        {
            if let Ok(file) = toml::from_str::<RegistryFile>(&txt) {
                return Ok(file.bubbles.into_iter().collect());
            }
        }

        #[cfg(feature = "toml")]
        {
            anyhow::bail!(
                "unsupported registry format in {}: expected JSON or TOML",
                path_ref.display()
            );
        }

        #[cfg(not(feature = "toml"))]
        {
            anyhow::bail!(
                "unsupported registry format in {}: expected JSON (enable `toml` feature for TOML support)",
                path_ref.display()
            );
        }
    }
}

impl FromIterator<BubbleDefinition> for MemoryRegistry {
    fn from_iter<I: IntoIterator<Item = BubbleDefinition>>(iter: I) -> Self {
        let mut registry = MemoryRegistry::default();
        for definition in iter {
            registry.insert(definition);
        }
        registry
    }
}

impl BubbleRegistry for MemoryRegistry {
    fn resolve(&self, class_name: &str) -> Option<&BubbleDefinition> {
        self.entries.get(class_name)
    }
}
