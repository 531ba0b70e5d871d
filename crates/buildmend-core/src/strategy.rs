//! Repair strategy selection.
//!
//! For one diagnostic, tries the text-generation collaborator when it is
//! available and allowed, and otherwise (or when the call fails) falls back
//! to the deterministic rule table. Failures never propagate; they come
//! back as [`Selection::Unchanged`] with a reason.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::collaborators::FixGenerator;
use crate::domain::diagnostic::Diagnostic;
use crate::domain::repair::{RepairStrategy, UnfixedReason};
use crate::metrics::SessionCounters;
use crate::rules::{apply_rule, select_rule};

/// Which strategies the selector may use.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RepairMode {
    /// Text generation first, rules as fallback.
    #[default]
    Auto,
    /// Deterministic rules only.
    RulesOnly,
}

/// Result of selecting and running a strategy for one diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Changed {
        content: String,
        strategy: RepairStrategy,
    },
    Unchanged {
        reason: UnfixedReason,
    },
}

/// Picks and runs a repair strategy per diagnostic.
pub struct StrategySelector {
    generator: Option<Arc<dyn FixGenerator>>,
    mode: RepairMode,
}

impl StrategySelector {
    pub fn new(generator: Option<Arc<dyn FixGenerator>>, mode: RepairMode) -> Self {
        Self { generator, mode }
    }

    /// Selector that never calls a generator.
    pub fn rules_only() -> Self {
        Self::new(None, RepairMode::RulesOnly)
    }

    fn usable_generator(&self) -> Option<&dyn FixGenerator> {
        if self.mode == RepairMode::RulesOnly {
            return None;
        }
        self.generator
            .as_deref()
            .filter(|generator| generator.is_available())
    }

    /// Produce new content for the file `diagnostic` points at.
    ///
    /// Generator fallbacks are counted on `counters`.
    pub async fn select_and_repair(
        &self,
        diagnostic: &Diagnostic,
        content: &str,
        counters: &mut SessionCounters,
    ) -> Selection {
        if let Some(generator) = self.usable_generator() {
            let prompt = build_repair_prompt(diagnostic, content);
            match generator.generate_fix(&prompt).await {
                Ok(candidate) if !candidate.trim().is_empty() => {
                    let candidate = match_trailing_newline(candidate, content);
                    if candidate == content {
                        return Selection::Unchanged {
                            reason: UnfixedReason::NoChange,
                        };
                    }
                    return Selection::Changed {
                        content: candidate,
                        strategy: RepairStrategy::Generative,
                    };
                }
                Ok(_) => {
                    warn!(
                        location = %diagnostic.location(),
                        "generator returned empty content; using rules"
                    );
                    counters.inc_generative_fallbacks();
                }
                Err(err) => {
                    warn!(
                        location = %diagnostic.location(),
                        error = %err,
                        "generation failed; using rules"
                    );
                    counters.inc_generative_fallbacks();
                }
            }
        }

        repair_with_rules(diagnostic, content)
    }
}

/// Run the rule table alone.
pub fn repair_with_rules(diagnostic: &Diagnostic, content: &str) -> Selection {
    let Some(rule) = select_rule(diagnostic) else {
        debug!(location = %diagnostic.location(), "no rule matches");
        return Selection::Unchanged {
            reason: UnfixedReason::NoApplicableRule,
        };
    };

    let repaired = apply_rule(rule, diagnostic, content);
    if repaired == content {
        Selection::Unchanged {
            reason: UnfixedReason::NoChange,
        }
    } else {
        Selection::Changed {
            content: repaired,
            strategy: RepairStrategy::Rule { rule },
        }
    }
}

/// Generated text is usually trimmed; keep the file's final newline.
fn match_trailing_newline(mut candidate: String, original: &str) -> String {
    if original.ends_with('\n') && !candidate.ends_with('\n') {
        candidate.push('\n');
    }
    candidate
}

/// Numbered excerpt of `content` around the diagnostic line.
pub fn code_context(diagnostic: &Diagnostic, content: &str) -> String {
    let radius = diagnostic.context_radius();
    let target = diagnostic.line as usize;
    let first = target.saturating_sub(radius).max(1);
    let last = target + radius;

    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(n, _)| (first..=last).contains(n))
        .map(|(n, line)| {
            let marker = if n == target { ">" } else { " " };
            format!("{marker}{n:>5} | {line}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt asking for a complete corrected file.
pub fn build_repair_prompt(diagnostic: &Diagnostic, content: &str) -> String {
    let rule = diagnostic
        .rule_id
        .as_deref()
        .map(|r| format!("\nRule: {r}"))
        .unwrap_or_default();

    format!(
        "You are an expert TypeScript and React engineer. Fix the following build error.\n\
         \n\
         File: {file}\n\
         Position: line {line}, column {column}\n\
         Error: {message}{rule}\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Full file content:\n\
         ```typescript\n\
         {content}\n\
         ```\n\
         \n\
         Reply with the complete corrected file content only, with no explanation and no code fences. Requirements:\n\
         1. Fix the error\n\
         2. Keep behaviour unchanged\n\
         3. Follow TypeScript and React best practices\n\
         4. Keep the formatting consistent\n",
        file = diagnostic.file,
        line = diagnostic.line,
        column = diagnostic.column,
        message = diagnostic.message,
        context = code_context(diagnostic, content),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::diagnostic::SourceFormat;
    use crate::domain::repair::RepairRule;
    use crate::fakes::{FailingFixGenerator, StaticFixGenerator};

    fn any_diag() -> Diagnostic {
        Diagnostic::new("./src/a.tsx", 1, 8, "Unexpected any.", SourceFormat::LintStyle)
            .with_rule("@typescript-eslint/no-explicit-any")
    }

    #[tokio::test]
    async fn test_generator_output_used_when_available() {
        let generator = Arc::new(StaticFixGenerator::new("let a: string;"));
        let selector = StrategySelector::new(Some(generator.clone()), RepairMode::Auto);

        let mut counters = SessionCounters::default();
        let selection = selector
            .select_and_repair(&any_diag(), "let a: any;\n", &mut counters)
            .await;
        assert_eq!(
            selection,
            Selection::Changed {
                content: "let a: string;\n".to_string(),
                strategy: RepairStrategy::Generative,
            }
        );
        assert_eq!(generator.prompts().len(), 1);
        assert!(generator.prompts()[0].contains("Unexpected any."));
        assert_eq!(counters.generative_fallbacks, 0);
    }

    #[tokio::test]
    async fn test_generator_failure_falls_back_to_rules() {
        let selector =
            StrategySelector::new(Some(Arc::new(FailingFixGenerator::new())), RepairMode::Auto);

        let mut counters = SessionCounters::default();
        let selection = selector
            .select_and_repair(&any_diag(), "let a: any;", &mut counters)
            .await;
        assert_eq!(
            selection,
            Selection::Changed {
                content: "let a: unknown;".to_string(),
                strategy: RepairStrategy::Rule {
                    rule: RepairRule::ExplicitAny
                },
            }
        );
        assert_eq!(counters.generative_fallbacks, 1);
    }

    #[tokio::test]
    async fn test_unavailable_generator_is_not_called() {
        let generator = Arc::new(StaticFixGenerator::new("ignored").unavailable());
        let selector = StrategySelector::new(Some(generator.clone()), RepairMode::Auto);

        let selection = selector
            .select_and_repair(&any_diag(), "let a: any;", &mut SessionCounters::default())
            .await;
        assert!(matches!(
            selection,
            Selection::Changed {
                strategy: RepairStrategy::Rule { .. },
                ..
            }
        ));
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_rules_only_mode_skips_generator() {
        let generator = Arc::new(StaticFixGenerator::new("ignored"));
        let selector = StrategySelector::new(Some(generator.clone()), RepairMode::RulesOnly);

        selector
            .select_and_repair(&any_diag(), "let a: any;", &mut SessionCounters::default())
            .await;
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_generator_echo_is_unchanged() {
        let selector = StrategySelector::new(
            Some(Arc::new(StaticFixGenerator::new("let a: any;"))),
            RepairMode::Auto,
        );
        let selection = selector
            .select_and_repair(&any_diag(), "let a: any;\n", &mut SessionCounters::default())
            .await;
        assert_eq!(
            selection,
            Selection::Unchanged {
                reason: UnfixedReason::NoChange
            }
        );
    }

    #[test]
    fn test_no_rule_is_unchanged() {
        let diag = Diagnostic::new(
            "./a.tsx",
            1,
            1,
            "Cannot find name 'x'.",
            SourceFormat::TypeCheckerStyle,
        );
        assert_eq!(
            repair_with_rules(&diag, "x;"),
            Selection::Unchanged {
                reason: UnfixedReason::NoApplicableRule
            }
        );
    }

    #[test]
    fn test_code_context_marks_target_line() {
        let content = "a\nb\nc\nd\ne\nf\ng";
        let diag = Diagnostic::new("./a.tsx", 4, 1, "x", SourceFormat::LintStyle);
        let context = code_context(&diag, content);

        let lines: Vec<&str> = context.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "     2 | b");
        assert_eq!(lines[2], ">    4 | d");
    }

    #[test]
    fn test_prompt_contains_location_and_file() {
        let prompt = build_repair_prompt(&any_diag(), "let a: any;");
        assert!(prompt.contains("File: ./src/a.tsx"));
        assert!(prompt.contains("line 1, column 8"));
        assert!(prompt.contains("Rule: @typescript-eslint/no-explicit-any"));
        assert!(prompt.contains("let a: any;"));
    }
}
