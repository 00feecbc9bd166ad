use serde::Serialize;

use crate::model::{Diagnostic, ValidationResult};

#[derive(Serialize, Clone, Debug)]
pub struct JsonDiagnostic {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub col: Option<usize>,
}

impl JsonDiagnostic {
    pub fn from_diagnostic(diagnostic: &Diagnostic, source_path: Option<String>) -> Self {
        JsonDiagnostic {
            code: diagnostic.code.to_string(),
            message: diagnostic.message.clone(),
            source_path,
            line: diagnostic.location.map(|l| l.line),
            col: diagnostic.location.map(|l| l.column),
        }
    }

    pub fn from_message(message: String, source_path: Option<String>) -> Self {
        JsonDiagnostic {
            code: "io".to_string(),
            message,
            source_path,
            line: None,
            col: None,
        }
    }
}

/// Machine-readable verdict for one flow file, as printed by `bubble-flow validate --json`.
#[derive(Serialize, Clone, Debug)]
pub struct LintJsonOutput {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_blake3: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<JsonDiagnostic>,
}

impl LintJsonOutput {
    pub fn from_validation(
        result: &ValidationResult,
        source_path: Option<String>,
        hash_blake3: Option<String>,
    ) -> Self {
        LintJsonOutput {
            ok: result.valid,
            errors: result
                .errors
                .iter()
                .map(|d| JsonDiagnostic::from_diagnostic(d, source_path.clone()))
                .collect(),
            source_path,
            hash_blake3,
        }
    }

    pub fn error(message: String, source_path: Option<String>) -> Self {
        LintJsonOutput {
            ok: false,
            errors: vec![JsonDiagnostic::from_message(message, source_path.clone())],
            source_path,
            hash_blake3: None,
        }
    }

    pub fn into_string(self) -> String {
        serde_json::to_string(&self).unwrap_or_else(|err| {
            format!(r#"{{"ok":false,"errors":[{{"code":"internal","message":"{err}"}}]}}"#)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Location;
    use serde_json::{Value, json};

    #[test]
    fn diagnostics_carry_code_and_position() {
        let result = ValidationResult::from_errors(vec![
            Diagnostic::new("throw-in-entry", "no throws").at(Location { line: 4, column: 5 }),
        ]);
        let out = LintJsonOutput::from_validation(&result, Some("flow.ts".into()), None);
        let value: Value = serde_json::from_str(&out.into_string()).unwrap();
        assert_eq!(
            value,
            json!({
                "ok": false,
                "source_path": "flow.ts",
                "errors": [{
                    "code": "throw-in-entry",
                    "message": "no throws",
                    "source_path": "flow.ts",
                    "line": 4,
                    "col": 5
                }]
            })
        );
    }
}
