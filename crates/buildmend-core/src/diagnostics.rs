//! Diagnostics parser for build output.
//!
//! Normalizes the combined stdout/stderr of a build into [`Diagnostic`]
//! entries. Build tools interleave several grammars in one stream, so each
//! recognised shape is an independent, tagged branch:
//!
//! - lint-style: a line holding only a source path, followed by
//!   `line:col  Severity: message  rule-id` rows
//! - type-checker-style: `path:line:col` followed by `Type error: message`
//!
//! Parsing is best-effort and never fails; lines that fit neither shape are
//! skipped.

use regex::Regex;

use crate::domain::diagnostic::{Diagnostic, Severity, SourceFormat};

const TYPE_ERROR_PREFIX: &str = "Type error:";

/// Configuration for the diagnostics parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserConfig {
    /// Lines scanned after a file header for its detail rows.
    pub lookahead: usize,

    /// Maximum number of diagnostics to retain per build.
    pub max_diagnostics: usize,

    /// Minimum severity to include.
    pub min_severity: Severity,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            lookahead: 10,
            max_diagnostics: 200,
            min_severity: Severity::Warning,
        }
    }
}

/// Line-oriented parser with its patterns compiled once.
#[derive(Debug, Clone)]
pub struct DiagnosticParser {
    config: ParserConfig,
    ansi: Regex,
    file_header: Regex,
    lint_detail: Regex,
    type_location: Regex,
}

impl Default for DiagnosticParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl DiagnosticParser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            ansi: Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid ANSI pattern"),
            file_header: Regex::new(r"^(\S.*\.[cm]?[jt]sx?)$").expect("valid header pattern"),
            lint_detail: Regex::new(
                r"^(\d+):(\d+)\s+((?i:error|warning)):?\s+(.+?)(?:\s{2,}(@?[\w.-]+(?:/[\w.-]+)*))?$",
            )
            .expect("valid lint detail pattern"),
            type_location: Regex::new(r"^(\S.*\.[cm]?[jt]sx?):(\d+):(\d+)$")
                .expect("valid location pattern"),
        }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse raw build output into diagnostics, in discovery order.
    pub fn parse(&self, raw_output: &str) -> Vec<Diagnostic> {
        let cleaned = self.ansi.replace_all(raw_output, "");
        let lines: Vec<&str> = cleaned.lines().map(str::trim).collect();
        let min_severity = self.config.min_severity;
        let mut diagnostics = Vec::new();

        for (i, line) in lines.iter().enumerate() {
            if let Some(file) = self.file_header_of(line) {
                let block = self.parse_lint_block(&lines, i, file);
                diagnostics.extend(block.into_iter().filter(|d| d.severity >= min_severity));
            } else if let Some(diag) = self.parse_type_error(&lines, i) {
                if diag.severity >= min_severity {
                    diagnostics.push(diag);
                }
            }

            if diagnostics.len() >= self.config.max_diagnostics {
                break;
            }
        }

        diagnostics.truncate(self.config.max_diagnostics);
        diagnostics
    }

    fn file_header_of<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.file_header
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    fn parse_lint_block(&self, lines: &[&str], header: usize, file: &str) -> Vec<Diagnostic> {
        let end = lines.len().min(header + 1 + self.config.lookahead);
        let mut found = Vec::new();

        for detail in &lines[header + 1..end] {
            if detail.is_empty() || detail.starts_with("./") || self.file_header.is_match(detail) {
                break;
            }

            let Some(caps) = self.lint_detail.captures(detail) else {
                continue;
            };
            let (Ok(line), Ok(column)) = (caps[1].parse::<u32>(), caps[2].parse::<u32>()) else {
                continue;
            };
            let severity = Severity::from_label(&caps[3]).unwrap_or(Severity::Error);

            let mut diag =
                Diagnostic::new(file, line, column, caps[4].trim(), SourceFormat::LintStyle)
                    .with_severity(severity)
                    .with_evidence(*detail);
            if let Some(rule) = caps.get(5) {
                diag = diag.with_rule(rule.as_str());
            }
            found.push(diag);
        }

        found
    }

    fn parse_type_error(&self, lines: &[&str], at: usize) -> Option<Diagnostic> {
        let caps = self.type_location.captures(lines[at])?;
        let next = lines.get(at + 1)?;
        let message = next.strip_prefix(TYPE_ERROR_PREFIX)?.trim();

        let line = caps[2].parse::<u32>().ok()?;
        let column = caps[3].parse::<u32>().ok()?;

        Some(
            Diagnostic::new(&caps[1], line, column, message, SourceFormat::TypeCheckerStyle)
                .with_evidence(format!("{}\n{}", lines[at], next)),
        )
    }
}

/// Parse with the default configuration.
pub fn parse_diagnostics(raw_output: &str) -> Vec<Diagnostic> {
    DiagnosticParser::default().parse(raw_output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NEXT_LINT_OUTPUT: &str = "\
> target@0.1.0 build
> next build

Failed to compile.

./src/components/Create.tsx
2:18  Error: 'screen' is defined but never used.  @typescript-eslint/no-unused-vars
14:22  Warning: Unexpected any. Specify a different type.  @typescript-eslint/no-explicit-any

./src/pages/index.tsx
7:5  Error: Do not use `<head>` element. Use `<Head />` from `next/head` instead.  @next/next/no-head-element

info  - Need to disable some ESLint rules? Learn more here: https://nextjs.org/docs
";

    #[test]
    fn test_parses_single_lint_diagnostic() {
        let output = "./src/components/Create.tsx\n2:18  Error: 'screen' is defined but never used.  @typescript-eslint/no-unused-vars\n";
        let diags = parse_diagnostics(output);

        assert_eq!(diags.len(), 1);
        let d = &diags[0];
        assert_eq!(d.file, "./src/components/Create.tsx");
        assert_eq!(d.line, 2);
        assert_eq!(d.column, 18);
        assert_eq!(d.severity, Severity::Error);
        assert_eq!(d.rule_id.as_deref(), Some("@typescript-eslint/no-unused-vars"));
        assert_eq!(d.message, "'screen' is defined but never used.");
        assert_eq!(d.source_format, SourceFormat::LintStyle);
    }

    #[test]
    fn test_parses_multiple_lint_blocks() {
        let diags = parse_diagnostics(NEXT_LINT_OUTPUT);
        assert_eq!(diags.len(), 3);

        assert_eq!(diags[1].severity, Severity::Warning);
        assert_eq!(diags[1].line, 14);
        assert_eq!(diags[2].file, "./src/pages/index.tsx");
        assert_eq!(diags[2].rule_id.as_deref(), Some("@next/next/no-head-element"));
    }

    #[test]
    fn test_parses_type_checker_diagnostic() {
        let output = "Failed to compile.\n\n./src/app/page.tsx:1:8\nType error: Duplicate identifier 'React'.\n\n  1 | import React from 'react';\n";
        let diags = parse_diagnostics(output);

        assert_eq!(diags.len(), 1);
        let d = &diags[0];
        assert_eq!(d.file, "./src/app/page.tsx");
        assert_eq!((d.line, d.column), (1, 8));
        assert_eq!(d.message, "Duplicate identifier 'React'.");
        assert!(d.rule_id.is_none());
        assert_eq!(d.source_format, SourceFormat::TypeCheckerStyle);
    }

    #[test]
    fn test_location_without_type_error_line_is_ignored() {
        let output = "./src/app/page.tsx:1:8\nsomething else entirely\n";
        assert!(parse_diagnostics(output).is_empty());
    }

    #[test]
    fn test_lint_scan_stops_at_blank_line() {
        let output = "./src/a.tsx\n\n3:1  Error: too late  some-rule\n";
        assert!(parse_diagnostics(output).is_empty());
    }

    #[test]
    fn test_lint_scan_respects_lookahead() {
        let mut output = String::from("./src/a.tsx\n");
        for _ in 0..12 {
            output.push_str("noise\n");
        }
        output.push_str("3:1  Error: out of window  some-rule\n");

        assert!(parse_diagnostics(&output).is_empty());
    }

    #[test]
    fn test_strips_ansi_and_crlf() {
        let output = "\x1b[36m./src/a.tsx\x1b[39m\r\n\x1b[33m4:2\x1b[39m  \x1b[31mError\x1b[39m: `\"` can be escaped with `&quot;`.  react/no-unescaped-entities\r\n";
        let diags = parse_diagnostics(output);

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].file, "./src/a.tsx");
        assert_eq!(diags[0].rule_id.as_deref(), Some("react/no-unescaped-entities"));
    }

    #[test]
    fn test_mixed_formats_keep_discovery_order() {
        let output = "./src/b.tsx:3:1\nType error: Cannot find name 'x'.\n\n./src/a.tsx\n1:1  Error: boom  some-rule\n";
        let diags = parse_diagnostics(output);

        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].source_format, SourceFormat::TypeCheckerStyle);
        assert_eq!(diags[1].source_format, SourceFormat::LintStyle);
    }

    #[test]
    fn test_min_severity_filters_warnings() {
        let parser = DiagnosticParser::new(ParserConfig {
            min_severity: Severity::Error,
            ..Default::default()
        });
        let diags = parser.parse(NEXT_LINT_OUTPUT);
        assert_eq!(diags.len(), 2);
        assert!(diags.iter().all(|d| d.severity == Severity::Error));
    }

    #[test]
    fn test_parse_respects_max_diagnostics() {
        let parser = DiagnosticParser::new(ParserConfig {
            max_diagnostics: 1,
            ..Default::default()
        });
        assert_eq!(parser.parse(NEXT_LINT_OUTPUT).len(), 1);
    }

    #[test]
    fn test_severity_filter_applies_before_cap() {
        let parser = DiagnosticParser::new(ParserConfig {
            max_diagnostics: 1,
            min_severity: Severity::Error,
            ..Default::default()
        });
        let output = "./src/a.tsx\n1:1  Warning: w  some-rule\n\n./src/b.tsx\n2:1  Error: e  other-rule\n";
        let diags = parser.parse(output);

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].file, "./src/b.tsx");
        assert_eq!(diags[0].severity, Severity::Error);
    }

    #[test]
    fn test_lint_row_without_rule_id_keeps_full_message() {
        let output = "./src/a.tsx\n1:1  Error: Parsing error: Unexpected token\n";
        let diags = parse_diagnostics(output);

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Parsing error: Unexpected token");
        assert!(diags[0].rule_id.is_none());
    }

    #[test]
    fn test_single_space_does_not_split_off_rule_id() {
        let output = "./src/a.tsx\n3:5  Warning: Unexpected console statement  no-console\n";
        let diags = parse_diagnostics(output);

        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "Unexpected console statement");
        assert_eq!(diags[0].rule_id.as_deref(), Some("no-console"));
    }

    #[test]
    fn test_garbage_yields_nothing() {
        assert!(parse_diagnostics("").is_empty());
        assert!(parse_diagnostics("npm ERR! missing script: build\n").is_empty());
    }

    #[test]
    fn test_parser_config_default() {
        let config = ParserConfig::default();
        assert_eq!(config.lookahead, 10);
        assert_eq!(config.max_diagnostics, 200);
        assert_eq!(config.min_severity, Severity::Warning);
    }
}
