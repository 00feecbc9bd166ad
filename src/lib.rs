//! Static analysis front end for BubbleFlow automations written in TypeScript.
//!
//! A flow is checked by [`FlowAnalyzer::validate`], reduced to editable bubble parameter records
//! by [`FlowAnalyzer::extract`], and rewritten for instrumentation by [`normalize()`]. Every
//! analysis is a pure function of the source text, the bubble registry and the config.
#![forbid(unsafe_code)]

pub mod config;
pub mod contract;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod ir;
pub mod json_output;
pub mod lint;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod registry;
pub mod trigger;
pub mod types;
pub mod validate;

pub(crate) mod literal;
pub(crate) mod syntax;

pub use config::AnalyzerConfig;
pub use credentials::{inject_credentials, resolve_requirements};
pub use error::{AnalysisError, Result};
pub use model::{
    BubbleParameter, BubbleParameterRecord, BubbleParameters, CredentialRequirements, Diagnostic,
    ExtractionResult, ParameterKind, ParameterValue, ValidationResult,
};
pub use normalize::normalize;
pub use registry::{BubbleDefinition, BubbleKind, BubbleRegistry, MemoryRegistry};

use crate::{
    extract::extract_parameters,
    ir::FlowIr,
    lint::{LintRule, builtin_rules},
    parser::{FlowSource, source_hash, syntax_diagnostic},
    trigger::extract_trigger,
    validate::validate_flow,
};

/// Registry, configuration and lint rule set shared by repeated analyses.
pub struct FlowAnalyzer<'r> {
    registry: &'r dyn BubbleRegistry,
    config: AnalyzerConfig,
    lint_rules: Vec<Box<dyn LintRule>>,
}

impl<'r> FlowAnalyzer<'r> {
    pub fn new(registry: &'r dyn BubbleRegistry) -> Self {
        Self::with_config(registry, AnalyzerConfig::default())
    }

    pub fn with_config(registry: &'r dyn BubbleRegistry, config: AnalyzerConfig) -> Self {
        FlowAnalyzer {
            registry,
            config,
            lint_rules: builtin_rules(),
        }
    }

    /// Append a host-specific lint rule; it runs after the built-in ones.
    pub fn with_lint_rule(mut self, rule: impl LintRule + 'static) -> Self {
        self.lint_rules.push(Box::new(rule));
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Every diagnostic for `source`, in rule order. Unparsable input yields exactly one.
    pub fn validate(&self, source: &str) -> ValidationResult {
        match FlowSource::parse(source) {
            Ok(parsed) => {
                let ir = FlowIr::build(&parsed, self.registry, &self.config);
                validate_flow(&ir, self.registry, &self.config, &self.lint_rules)
            }
            Err(err) => ValidationResult::from_errors(vec![syntax_diagnostic(&err)]),
        }
    }

    /// Validate and, when the flow is valid, extract parameters, credential requirements,
    /// the payload input schema and trigger metadata.
    pub fn extract(&self, source: &str) -> ExtractionResult {
        let hash = source_hash(source);
        let parsed = match FlowSource::parse(source) {
            Ok(parsed) => parsed,
            Err(err) => {
                return ExtractionResult::invalid(
                    ValidationResult::from_errors(vec![syntax_diagnostic(&err)]),
                    hash,
                );
            }
        };
        let ir = FlowIr::build(&parsed, self.registry, &self.config);
        let validation = validate_flow(&ir, self.registry, &self.config, &self.lint_rules);
        if !validation.valid {
            return ExtractionResult::invalid(validation, hash);
        }

        let bubble_parameters = extract_parameters(&ir, self.registry, &self.config);
        tracing::debug!(bubbles = bubble_parameters.len(), "extracted flow");
        ExtractionResult {
            valid: true,
            errors: Vec::new(),
            required_credentials: resolve_requirements(&ir, self.registry),
            bubble_parameters,
            input_schema: types::input_schema(&ir),
            trigger: extract_trigger(&ir),
            source_hash: hash,
        }
    }

    /// Credential kinds per bubble class used by `source`, without validating it.
    pub fn required_credentials(&self, source: &str) -> Result<CredentialRequirements> {
        let parsed = FlowSource::parse(source)?;
        let ir = FlowIr::build(&parsed, self.registry, &self.config);
        Ok(resolve_requirements(&ir, self.registry))
    }
}

/// [`FlowAnalyzer::validate`] with the default configuration.
pub fn validate(source: &str, registry: &dyn BubbleRegistry) -> ValidationResult {
    FlowAnalyzer::new(registry).validate(source)
}

/// [`FlowAnalyzer::extract`] with the default configuration.
pub fn extract(source: &str, registry: &dyn BubbleRegistry) -> ExtractionResult {
    FlowAnalyzer::new(registry).extract(source)
}
