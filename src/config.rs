use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

pub const DEFAULT_BASE_CLASS: &str = "BubbleFlow";
pub const DEFAULT_ENTRY_METHOD: &str = "handle";
pub const DEFAULT_CORE_MODULE: &str = "@bubblelab/bubble-core";
pub const DEFAULT_LONG_TEXT_THRESHOLD: usize = 120;
pub const DEFAULT_MAX_COMPLEXITY: usize = 20;

/// Knobs of the analysis pipeline. Every field has a default so partial config files work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Class every flow must extend.
    pub base_class: String,
    /// Method every flow must implement; the only caller allowed to invoke step methods.
    pub entry_method: String,
    /// Modules whose imported classes are treated as bubbles.
    pub core_modules: Vec<String>,
    /// Class-name suffixes that mark a `new` expression as a bubble instantiation.
    pub primitive_suffixes: Vec<String>,
    /// Strings longer than this (in chars) are surfaced as long text.
    pub long_text_threshold: usize,
    pub lint: LintConfig,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        AnalyzerConfig {
            base_class: DEFAULT_BASE_CLASS.to_string(),
            entry_method: DEFAULT_ENTRY_METHOD.to_string(),
            core_modules: vec![DEFAULT_CORE_MODULE.to_string()],
            primitive_suffixes: vec!["Bubble".to_string()],
            long_text_threshold: DEFAULT_LONG_TEXT_THRESHOLD,
            lint: LintConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintConfig {
    pub max_complexity: usize,
    /// Names of lint rules to skip.
    pub disabled: Vec<String>,
}

impl Default for LintConfig {
    fn default() -> Self {
        LintConfig {
            max_complexity: DEFAULT_MAX_COMPLEXITY,
            disabled: Vec::new(),
        }
    }
}

impl LintConfig {
    pub fn is_enabled(&self, rule: &str) -> bool {
        !self.disabled.iter().any(|name| name == rule)
    }
}

impl AnalyzerConfig {
    /// Load a config file, accepting JSON by default and TOML when the `toml` feature is enabled.
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let txt = fs::read_to_string(path_ref)
            .with_context(|| format!("unable to read analyzer config at {}", path_ref.display()))?;
        if let Ok(value) = serde_json::from_str::<Self>(&txt) {
            return Ok(value);
        }

        #[cfg(feature = "toml")]
        {
            if let Ok(value) = toml::from_str::<Self>(&txt) {
                return Ok(value);
            }
        }

        anyhow::bail!(
            "unsupported config format in {}: expected JSON{}",
            path_ref.display(),
            if cfg!(feature = "toml") { " or TOML" } else { "" }
        )
    }

    pub fn is_primitive_name(&self, class_name: &str) -> bool {
        self.primitive_suffixes
            .iter()
            .any(|suffix| class_name.len() > suffix.len() && class_name.ends_with(suffix.as_str()))
    }
}
