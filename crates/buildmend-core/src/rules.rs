//! Deterministic repair rules.
//!
//! Each [`RepairRule`] is a pure text transform over a whole file. Rule
//! selection is an explicit match on the diagnostic's rule id, falling back
//! to message substrings for defect classes that have no stable id. A
//! diagnostic with no matching rule selects nothing.
//!
//! Line-scoped rules keep the line count unchanged so that later
//! diagnostics in the same round still point at the right lines.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::diagnostic::Diagnostic;
use crate::domain::repair::RepairRule;

const FRAMEWORK_MODULE: &str = "react";
const FRAMEWORK_DEFAULT: &str = "React";
const HEAD_IMPORT: &str = "import Head from 'next/head';";

/// Pick the rule for a diagnostic, if any.
pub fn select_rule(diagnostic: &Diagnostic) -> Option<RepairRule> {
    let by_id = match diagnostic.rule_id.as_deref() {
        Some("@typescript-eslint/no-unused-vars" | "no-unused-vars") => {
            Some(RepairRule::UnusedImport)
        }
        Some("@typescript-eslint/no-explicit-any") => Some(RepairRule::ExplicitAny),
        Some("react/no-unescaped-entities") => Some(RepairRule::UnescapedEntities),
        Some("@next/next/no-head-element") => Some(RepairRule::HeadElement),
        _ => None,
    };
    if by_id.is_some() {
        return by_id;
    }

    let message = diagnostic.message.as_str();
    if message.contains("Duplicate identifier 'React'") {
        Some(RepairRule::DuplicateFrameworkImport)
    } else if message.contains("multiple default exports")
        || (message.contains("Duplicate identifier") && message.contains("export"))
    {
        Some(RepairRule::DuplicateDefaultExport)
    } else {
        None
    }
}

/// Apply `rule` to `content`. Returns the content unchanged when the rule
/// finds nothing to do.
pub fn apply_rule(rule: RepairRule, diagnostic: &Diagnostic, content: &str) -> String {
    match rule {
        RepairRule::UnusedImport => fix_unused_import(diagnostic, content),
        RepairRule::ExplicitAny => map_line(content, diagnostic.line, narrow_any),
        RepairRule::UnescapedEntities => map_line(content, diagnostic.line, escape_jsx_text),
        RepairRule::HeadElement => fix_head_element(content),
        RepairRule::DuplicateFrameworkImport => merge_framework_imports(content),
        RepairRule::DuplicateDefaultExport => keep_last_default_export(content),
    }
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("valid rule pattern"))
}

/// Rewrite the 1-based `line` of `content` with `f`.
fn map_line(content: &str, line: u32, f: impl Fn(&str) -> String) -> String {
    let idx = match (line as usize).checked_sub(1) {
        Some(idx) => idx,
        None => return content.to_string(),
    };
    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
    match lines.get_mut(idx) {
        Some(target) => {
            *target = f(target);
            lines.join("\n")
        }
        None => content.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Unused import
// ---------------------------------------------------------------------------

fn unused_name(message: &str) -> Option<String> {
    static QUOTED: OnceLock<Regex> = OnceLock::new();
    regex(&QUOTED, r"'([A-Za-z_$][\w$]*)'")
        .captures(message)
        .map(|c| c[1].to_string())
}

fn fix_unused_import(diagnostic: &Diagnostic, content: &str) -> String {
    let Some(name) = unused_name(&diagnostic.message) else {
        return content.to_string();
    };
    let Some(idx) = (diagnostic.line as usize).checked_sub(1) else {
        return content.to_string();
    };

    let mut lines: Vec<String> = content.split('\n').map(str::to_string).collect();
    let Some(target) = lines.get(idx) else {
        return content.to_string();
    };

    let replacement = if target.trim_start().starts_with("import ") {
        remove_import_name(target, &name)
    } else if inside_import_block(&lines, idx)
        && binds_name(target.trim().trim_end_matches(','), &name)
    {
        Some(String::new())
    } else {
        None
    };

    match replacement {
        Some(line) => {
            lines[idx] = line;
            lines.join("\n")
        }
        None => content.to_string(),
    }
}

/// Whether an import specifier such as `a`, `a as b` or `type A` binds `name`.
fn binds_name(specifier: &str, name: &str) -> bool {
    let specifier = specifier.trim();
    let local = specifier
        .rsplit_once(" as ")
        .map(|(_, alias)| alias)
        .unwrap_or(specifier);
    let local = local.trim().trim_start_matches("type ").trim();
    local == name
}

/// Whether line `idx` sits between `import {` and its closing brace.
fn inside_import_block(lines: &[String], idx: usize) -> bool {
    for line in lines[..idx].iter().rev() {
        let trimmed = line.trim();
        if trimmed.contains('}') || trimmed.ends_with(';') {
            return false;
        }
        if trimmed.starts_with("import ") {
            return trimmed.contains('{');
        }
    }
    false
}

/// Remove `name` from a single-line import. `None` when the line does not
/// import `name`. An import left with no bindings becomes an empty line.
fn remove_import_name(line: &str, name: &str) -> Option<String> {
    static IMPORT: OnceLock<Regex> = OnceLock::new();
    let caps = regex(&IMPORT, r"^(\s*import\s+(?:type\s+)?)(.+?)(\s+from\s+.+)$").captures(line)?;
    let (prefix, clause, rest) = (&caps[1], caps[2].trim(), &caps[3]);

    let (head, named) = match clause.split_once('{') {
        Some((head, tail)) => {
            let inner = tail.split_once('}').map(|(inner, _)| inner).unwrap_or(tail);
            let named: Vec<String> = inner
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            (head.trim().trim_end_matches(',').trim(), Some(named))
        }
        None => (clause, None),
    };

    let mut changed = false;
    let mut outer: Vec<String> = Vec::new();
    for part in head.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if binds_name(part, name) {
            changed = true;
        } else {
            outer.push(part.to_string());
        }
    }

    let named = named.map(|named| {
        let before = named.len();
        let kept: Vec<String> = named.into_iter().filter(|s| !binds_name(s, name)).collect();
        changed |= kept.len() != before;
        kept
    });

    if !changed {
        return None;
    }

    let mut parts = outer;
    if let Some(named) = named.filter(|n| !n.is_empty()) {
        parts.push(format!("{{ {} }}", named.join(", ")));
    }
    if parts.is_empty() {
        return Some(String::new());
    }
    Some(format!("{prefix}{}{rest}", parts.join(", ")))
}

// ---------------------------------------------------------------------------
// Explicit any
// ---------------------------------------------------------------------------

fn narrow_any(line: &str) -> String {
    static ANY: OnceLock<Regex> = OnceLock::new();
    regex(&ANY, r"(:\s*|\bas\s+|<)any\b")
        .replace_all(line, "${1}unknown")
        .into_owned()
}

// ---------------------------------------------------------------------------
// Unescaped entities
// ---------------------------------------------------------------------------

/// Escape quotes in JSX text, leaving tag attributes and `{...}`
/// expressions alone.
fn escape_jsx_text(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len() + 16);
    let mut in_tag = false;
    let mut attr_quote: Option<char> = None;
    let mut brace_depth = 0usize;

    for (i, &c) in chars.iter().enumerate() {
        if brace_depth > 0 {
            match c {
                '{' => brace_depth += 1,
                '}' => brace_depth -= 1,
                _ => {}
            }
            out.push(c);
            continue;
        }

        if in_tag {
            match attr_quote {
                Some(q) if c == q => attr_quote = None,
                Some(_) => {}
                None if c == '"' || c == '\'' => attr_quote = Some(c),
                None if c == '{' => brace_depth = 1,
                None if c == '>' => in_tag = false,
                None => {}
            }
            out.push(c);
            continue;
        }

        match c {
            '<' if chars
                .get(i + 1)
                .is_some_and(|n| n.is_ascii_alphabetic() || *n == '/' || *n == '>') =>
            {
                in_tag = true;
                out.push(c);
            }
            '{' => {
                brace_depth = 1;
                out.push(c);
            }
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Head element
// ---------------------------------------------------------------------------

fn fix_head_element(content: &str) -> String {
    static HEAD_TAG: OnceLock<Regex> = OnceLock::new();
    static HEAD_IMPORTED: OnceLock<Regex> = OnceLock::new();

    let rewritten = regex(&HEAD_TAG, r"<(/?)head(\s|>|/)").replace_all(content, "<${1}Head${2}");
    if rewritten == content {
        return content.to_string();
    }

    if regex(&HEAD_IMPORTED, r#"import\s+Head\s+from\s+['"]next/head['"]"#).is_match(&rewritten) {
        return rewritten.into_owned();
    }

    // The import goes before the first import, or after leading directives
    // such as 'use client' when the file has no imports.
    let mut lines: Vec<&str> = rewritten.split('\n').collect();
    let at = lines
        .iter()
        .position(|l| l.trim_start().starts_with("import "))
        .unwrap_or_else(|| {
            lines
                .iter()
                .take_while(|l| {
                    let t = l.trim();
                    t.is_empty() || t.starts_with("'use ") || t.starts_with("\"use ")
                })
                .count()
        });
    lines.insert(at, HEAD_IMPORT);
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Duplicate framework import
// ---------------------------------------------------------------------------

fn merge_framework_imports(content: &str) -> String {
    static FRAMEWORK_IMPORT: OnceLock<Regex> = OnceLock::new();
    static NAMED: OnceLock<Regex> = OnceLock::new();

    let import_re = regex(
        &FRAMEWORK_IMPORT,
        &format!(r#"^\s*import\s+(.+?)\s+from\s+['"]{FRAMEWORK_MODULE}['"];?\s*$"#),
    );
    let named_re = regex(&NAMED, r"\{([^}]*)\}");

    let lines: Vec<&str> = content.split('\n').collect();
    // Namespace imports (`* as React`) cannot be merged and are left alone.
    let matches: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| {
            import_re
                .captures(l)
                .is_some_and(|c| !c[1].trim_start().starts_with('*'))
        })
        .map(|(i, _)| i)
        .collect();
    if matches.len() < 2 {
        return content.to_string();
    }

    let mut has_default = false;
    let mut named: Vec<String> = Vec::new();
    for &i in &matches {
        let Some(caps) = import_re.captures(lines[i]) else {
            continue;
        };
        let clause = &caps[1];
        let outer = named_re.replace_all(clause, "");
        if outer.split(',').map(str::trim).any(|p| p == FRAMEWORK_DEFAULT) {
            has_default = true;
        }
        if let Some(inner) = named_re.captures(clause) {
            for name in inner[1].split(',').map(str::trim).filter(|s| !s.is_empty()) {
                if !named.iter().any(|n| n == name) {
                    named.push(name.to_string());
                }
            }
        }
    }

    let mut clause = Vec::new();
    if has_default {
        clause.push(FRAMEWORK_DEFAULT.to_string());
    }
    if !named.is_empty() {
        clause.push(format!("{{ {} }}", named.join(", ")));
    }
    let merged = format!("import {} from '{FRAMEWORK_MODULE}';", clause.join(", "));

    let first = matches[0];
    lines
        .iter()
        .enumerate()
        .filter_map(|(i, l)| {
            if i == first {
                Some(merged.as_str())
            } else if matches.contains(&i) {
                None
            } else {
                Some(*l)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Duplicate default export
// ---------------------------------------------------------------------------

fn keep_last_default_export(content: &str) -> String {
    static BARE_EXPORT: OnceLock<Regex> = OnceLock::new();
    let bare = regex(&BARE_EXPORT, r"^\s*export\s+default\s+[A-Za-z_$][\w$]*\s*;?\s*$");

    let lines: Vec<&str> = content.split('\n').collect();
    let exports: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.trim_start().starts_with("export default"))
        .map(|(i, _)| i)
        .collect();
    let Some((&last, earlier)) = exports.split_last() else {
        return content.to_string();
    };
    if earlier.is_empty() {
        return content.to_string();
    }

    let mut out = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i == last || !earlier.contains(&i) {
            out.push(line.to_string());
        } else if bare.is_match(line) {
            // `export default Name;` carries no declaration; drop it.
        } else {
            // Keep the declaration, drop only the export.
            out.push(line.replacen("export default ", "", 1));
        }
    }
    out.join("\n")
}
