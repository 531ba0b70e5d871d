//! Normalized build diagnostic types.

use serde::{Deserialize, Serialize};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    /// Parse the severity word printed by lint tools (`Error`, `warning`, ...).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "error" => Some(Severity::Error),
            "warning" | "warn" => Some(Severity::Warning),
            _ => None,
        }
    }
}

/// Which diagnostic grammar produced a record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// File header line followed by `line:col  Severity: message  rule-id` rows.
    LintStyle,
    /// `file:line:col` followed by a `Type error:` line.
    TypeCheckerStyle,
}

/// A single normalized diagnostic from build output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    /// Source file path, relative to the build root, as printed by the tool.
    pub file: String,

    /// Line number (1-indexed).
    pub line: u32,

    /// Column number (1-indexed).
    pub column: u32,

    /// Human-readable message.
    pub message: String,

    /// Lint rule identifier (e.g. "@typescript-eslint/no-unused-vars").
    pub rule_id: Option<String>,

    pub severity: Severity,

    pub source_format: SourceFormat,

    /// Raw output line(s) the diagnostic was parsed from.
    pub evidence: Option<String>,
}

/// Identity of a diagnostic occurrence: file, line and message.
///
/// Column and rule id are excluded so that reformatting which shifts
/// columns does not make an unresolved defect look new.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiagnosticKey {
    pub file: String,
    pub line: u32,
    pub message: String,
}

impl Diagnostic {
    /// Create a new diagnostic at a location.
    pub fn new(
        file: impl Into<String>,
        line: u32,
        column: u32,
        message: impl Into<String>,
        source_format: SourceFormat,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            message: message.into(),
            rule_id: None,
            severity: Severity::Error,
            source_format,
            evidence: None,
        }
    }

    /// Set rule id.
    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Set evidence snippet.
    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    pub fn key(&self) -> DiagnosticKey {
        DiagnosticKey {
            file: self.file.clone(),
            line: self.line,
            message: self.message.clone(),
        }
    }

    /// Whether two diagnostics describe the same occurrence.
    pub fn same_occurrence(&self, other: &Diagnostic) -> bool {
        self.file == other.file && self.line == other.line && self.message == other.message
    }

    /// Lines of surrounding code to quote when describing this diagnostic.
    ///
    /// Type errors usually need the enclosing declaration; lint findings are
    /// local to their line.
    pub fn context_radius(&self) -> usize {
        match self.source_format {
            SourceFormat::LintStyle => 2,
            SourceFormat::TypeCheckerStyle => 5,
        }
    }

    /// `file:line:column`
    pub fn location(&self) -> String {
        format!("{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Whether two diagnostic lists hold the same multiset of occurrences,
/// independent of order.
pub fn same_diagnostic_set(current: &[Diagnostic], previous: &[Diagnostic]) -> bool {
    if current.len() != previous.len() {
        return false;
    }

    let mut a: Vec<DiagnosticKey> = current.iter().map(Diagnostic::key).collect();
    let mut b: Vec<DiagnosticKey> = previous.iter().map(Diagnostic::key).collect();
    a.sort();
    b.sort();
    a == b
}
