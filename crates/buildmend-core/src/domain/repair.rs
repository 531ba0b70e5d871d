//! Repair records and the deterministic rule catalogue.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::diagnostic::Diagnostic;

/// Deterministic repair rules, one per recognised defect class.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RepairRule {
    /// Drop an unused name from its import statement.
    UnusedImport,
    /// Narrow an explicit `any` annotation to `unknown`.
    ExplicitAny,
    /// Escape quote characters in JSX text.
    UnescapedEntities,
    /// Replace a raw `<head>` element with the framework `Head` component.
    HeadElement,
    /// Merge repeated framework imports into one statement.
    DuplicateFrameworkImport,
    /// Keep only the last `export default` statement.
    DuplicateDefaultExport,
}

impl RepairRule {
    pub fn name(&self) -> &'static str {
        match self {
            RepairRule::UnusedImport => "unused_import",
            RepairRule::ExplicitAny => "explicit_any",
            RepairRule::UnescapedEntities => "unescaped_entities",
            RepairRule::HeadElement => "head_element",
            RepairRule::DuplicateFrameworkImport => "duplicate_framework_import",
            RepairRule::DuplicateDefaultExport => "duplicate_default_export",
        }
    }
}

/// Which path produced a repair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepairStrategy {
    /// Replacement drafted by the text-generation collaborator.
    Generative,
    /// Replacement produced by a deterministic rule.
    Rule { rule: RepairRule },
}

impl std::fmt::Display for RepairStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepairStrategy::Generative => write!(f, "generative"),
            RepairStrategy::Rule { rule } => write!(f, "rule:{}", rule.name()),
        }
    }
}

/// Audit entry for one applied repair. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepairRecord {
    /// File path as reported by the diagnostic.
    pub file: String,

    /// Message of the diagnostic that triggered the repair.
    pub message: String,

    /// Location of the pre-repair snapshot.
    pub backup_path: PathBuf,

    pub strategy: RepairStrategy,

    pub applied_at: DateTime<Utc>,
}

/// Why a diagnostic was left unfixed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnfixedReason {
    /// No strategy produced different content.
    NoChange,
    /// No deterministic rule covers the diagnostic and generation was unavailable.
    NoApplicableRule,
    /// The diagnostic points outside the build root.
    OutsideRoot,
    /// The file could not be read.
    ReadFailed { error: String },
    /// Backup or overwrite failed; the file was left untouched.
    ApplyFailed { error: String },
}

impl std::fmt::Display for UnfixedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnfixedReason::NoChange => write!(f, "repair produced no change"),
            UnfixedReason::NoApplicableRule => write!(f, "no applicable repair rule"),
            UnfixedReason::OutsideRoot => write!(f, "file is outside the build root"),
            UnfixedReason::ReadFailed { error } => write!(f, "read failed: {error}"),
            UnfixedReason::ApplyFailed { error } => write!(f, "apply failed: {error}"),
        }
    }
}

/// A diagnostic whose latest repair attempt did not change anything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnfixedDiagnostic {
    pub diagnostic: Diagnostic,
    pub reason: UnfixedReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_display() {
        assert_eq!(RepairStrategy::Generative.to_string(), "generative");
        assert_eq!(
            RepairStrategy::Rule {
                rule: RepairRule::ExplicitAny
            }
            .to_string(),
            "rule:explicit_any"
        );
    }

    #[test]
    fn test_strategy_serde_shape() {
        let json = serde_json::to_value(RepairStrategy::Rule {
            rule: RepairRule::HeadElement,
        })
        .expect("serialize");
        assert_eq!(json["kind"], "rule");
        assert_eq!(json["rule"], "head_element");
    }

    #[test]
    fn test_unfixed_reason_display() {
        let reason = UnfixedReason::ApplyFailed {
            error: "disk full".to_string(),
        };
        assert_eq!(reason.to_string(), "apply failed: disk full");
    }
}
