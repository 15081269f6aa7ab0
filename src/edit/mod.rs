//! The editing engine.
//!
//! Every mutating file tool reduces to an [`EditPlan`]: a target file, an
//! optional content-hash precondition, and an ordered list of operations.
//! The engine validates the plan, applies it to an in-memory line buffer,
//! produces a unified diff, and writes atomically unless the caller asked
//! for a preview.

pub mod atomic;
pub mod eol;

pub use atomic::write_atomic;
pub use eol::{Buffer, Eol, split_body};

use regex::{Regex, RegexBuilder};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Bytes probed for NUL when deciding whether a file is binary.
const BINARY_PROBE_BYTES: usize = 8 * 1024;

#[derive(Debug, Error)]
pub enum EditError {
    #[error("invalid edit: {0}")]
    Validation(String),

    #[error("pattern not found: {0}")]
    PatternNotFound(String),

    #[error("pattern matched {count} times; pass occurrence first/last/nth/all")]
    Ambiguous { count: usize },

    #[error("precondition failed: content hash mismatch for {path}")]
    Precondition { path: String },

    #[error("binary file (NUL byte in first 8 KiB): {0}")]
    Binary(String),

    #[error("file is not valid UTF-8: {0}")]
    NotUtf8(String),

    #[error("{path}: {message}")]
    Io { path: String, message: String },
}

impl EditError {
    pub(crate) fn io(path: &Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Where to put inserted lines relative to the located line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    Before,
    After,
}

/// Which match a pattern operator targets. `Unique` is the default: more
/// than one match is an error unless the caller disambiguates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurrence {
    Unique,
    First,
    Last,
    Nth(usize),
    All,
}

/// What to do when a pattern has no match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IfNotFound {
    #[default]
    Error,
    Skip,
    /// Append the body at end of file.
    Create,
}

#[derive(Debug, Clone)]
pub enum EditOp {
    UpdateLines {
        start: usize,
        end: usize,
        body: String,
    },
    DeleteLines {
        start: usize,
        end: usize,
    },
    InsertLines {
        line: usize,
        placement: Placement,
        body: String,
    },
    InsertAtPattern {
        pattern: String,
        placement: Placement,
        occurrence: Occurrence,
        case_insensitive: bool,
        if_not_found: IfNotFound,
        body: String,
    },
    ReplacePattern {
        pattern: String,
        occurrence: Occurrence,
        case_insensitive: bool,
        if_not_found: IfNotFound,
        replacement: String,
    },
    ReplaceAnchor {
        start_pattern: String,
        end_pattern: String,
        case_insensitive: bool,
        if_not_found: IfNotFound,
        body: String,
    },
}

/// A validated edit request. Lives only within a single tool call.
#[derive(Debug, Clone)]
pub struct EditPlan {
    pub path: PathBuf,
    pub ops: Vec<EditOp>,
    pub expected_sha256: Option<String>,
    pub preview_only: bool,
    pub idempotent: bool,
    pub backup: bool,
    pub force: bool,
}

impl EditPlan {
    #[must_use]
    pub fn new(path: PathBuf, ops: Vec<EditOp>) -> Self {
        Self {
            path,
            ops,
            expected_sha256: None,
            preview_only: false,
            idempotent: false,
            backup: false,
            force: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditStatus {
    Applied,
    Preview,
    Noop,
}

#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub status: EditStatus,
    pub diff: String,
    pub sha256: String,
    pub lines_before: usize,
    pub lines_after: usize,
}

/// Lowercase hex SHA-256.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Unified diff of old vs new content, labeled with the file path.
#[must_use]
pub fn unified_diff(old: &str, new: &str, path: &Path) -> String {
    let name = path.display().to_string();
    let diff = similar::TextDiff::from_lines(old, new);
    let mut out = String::new();
    for hunk in diff.unified_diff().header(&name, &name).iter_hunks() {
        out.push_str(&hunk.to_string());
    }
    out
}

/// Whether the first 8 KiB contain a NUL byte.
#[must_use]
pub fn looks_binary(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(BINARY_PROBE_BYTES)].contains(&0)
}

/// Apply a plan to its target file.
///
/// Validation happens before any mutation; filesystem state only changes in
/// the final atomic rename, and only when the plan is not a preview.
pub async fn apply_plan(plan: &EditPlan) -> Result<EditOutcome, EditError> {
    for op in &plan.ops {
        validate_op(op)?;
    }

    let raw = tokio::fs::read(&plan.path)
        .await
        .map_err(|e| EditError::io(&plan.path, &e))?;

    if !plan.force && looks_binary(&raw) {
        return Err(EditError::Binary(plan.path.display().to_string()));
    }

    if let Some(expected) = &plan.expected_sha256 {
        let actual = sha256_hex(&raw);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(EditError::Precondition {
                path: plan.path.display().to_string(),
            });
        }
    }

    let original = String::from_utf8(raw)
        .map_err(|_| EditError::NotUtf8(plan.path.display().to_string()))?;

    let mut buffer = Buffer::parse(&original);
    let lines_before = buffer.line_count();
    for op in &plan.ops {
        apply_op(&mut buffer, op)?;
    }
    let updated = buffer.render();
    let lines_after = buffer.line_count();

    if plan.idempotent && updated == original {
        return Ok(EditOutcome {
            status: EditStatus::Noop,
            diff: String::new(),
            sha256: sha256_hex(updated.as_bytes()),
            lines_before,
            lines_after,
        });
    }

    let diff = unified_diff(&original, &updated, &plan.path);
    let sha256 = sha256_hex(updated.as_bytes());

    if plan.preview_only {
        return Ok(EditOutcome {
            status: EditStatus::Preview,
            diff,
            sha256,
            lines_before,
            lines_after,
        });
    }

    let path = plan.path.clone();
    let backup = plan.backup;
    let bytes = updated.into_bytes();
    tokio::task::spawn_blocking(move || atomic::write_atomic(&path, &bytes, backup))
        .await
        .map_err(|e| EditError::Io {
            path: plan.path.display().to_string(),
            message: e.to_string(),
        })?
        .map_err(|e| EditError::io(&plan.path, &e))?;

    Ok(EditOutcome {
        status: EditStatus::Applied,
        diff,
        sha256,
        lines_before,
        lines_after,
    })
}

/// Structural validation: well-formed locators, compiling regexes, coherent
/// occurrence rules. Range checks against the file happen at application.
fn validate_op(op: &EditOp) -> Result<(), EditError> {
    match op {
        EditOp::UpdateLines { start, end, .. } | EditOp::DeleteLines { start, end } => {
            if *start < 1 {
                return Err(EditError::Validation("line numbers are 1-indexed".into()));
            }
            if end < start {
                return Err(EditError::Validation(format!(
                    "end line {end} precedes start line {start}"
                )));
            }
        }
        EditOp::InsertLines { line, .. } => {
            if *line < 1 {
                return Err(EditError::Validation("line numbers are 1-indexed".into()));
            }
        }
        EditOp::InsertAtPattern {
            pattern,
            occurrence,
            case_insensitive,
            ..
        }
        | EditOp::ReplacePattern {
            pattern,
            occurrence,
            case_insensitive,
            ..
        } => {
            compile_pattern(pattern, *case_insensitive)?;
            if let Occurrence::Nth(0) = occurrence {
                return Err(EditError::Validation("occurrence nth is 1-indexed".into()));
            }
        }
        EditOp::ReplaceAnchor {
            start_pattern,
            end_pattern,
            case_insensitive,
            ..
        } => {
            compile_pattern(start_pattern, *case_insensitive)?;
            compile_pattern(end_pattern, *case_insensitive)?;
        }
    }
    Ok(())
}

/// Patterns are multiline by default: `^` and `$` match line boundaries.
fn compile_pattern(pattern: &str, case_insensitive: bool) -> Result<Regex, EditError> {
    RegexBuilder::new(pattern)
        .multi_line(true)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| EditError::Validation(format!("invalid pattern '{pattern}': {e}")))
}

fn apply_op(buffer: &mut Buffer, op: &EditOp) -> Result<(), EditError> {
    match op {
        EditOp::UpdateLines { start, end, body } => {
            check_span(*start, *end, buffer.line_count())?;
            buffer.lines.splice(start - 1..*end, split_body(body));
        }
        EditOp::DeleteLines { start, end } => {
            check_span(*start, *end, buffer.line_count())?;
            buffer.lines.drain(start - 1..*end);
        }
        EditOp::InsertLines {
            line,
            placement,
            body,
        } => {
            let count = buffer.line_count();
            if *line > count + 1 {
                return Err(EditError::Validation(format!(
                    "insertion line {line} out of range 1..={}",
                    count + 1
                )));
            }
            let index = match placement {
                Placement::Before => line - 1,
                Placement::After => *line,
            };
            if index > count {
                return Err(EditError::Validation(format!(
                    "cannot insert after line {line}: file has {count} lines"
                )));
            }
            let was_empty = buffer.lines.is_empty();
            buffer.lines.splice(index..index, split_body(body));
            if was_empty && body.ends_with('\n') {
                buffer.trailing_newline = true;
            }
        }
        EditOp::InsertAtPattern {
            pattern,
            placement,
            occurrence,
            case_insensitive,
            if_not_found,
            body,
        } => {
            let regex = compile_pattern(pattern, *case_insensitive)?;
            let text = buffer.to_lf_text();
            let matches: Vec<(usize, usize)> =
                regex.find_iter(&text).map(|m| (m.start(), m.end())).collect();
            if matches.is_empty() {
                return not_found(buffer, pattern, *if_not_found, body);
            }
            let selected = select(&matches, *occurrence, pattern)?;
            // Bottom-up so earlier insertions do not shift later offsets.
            for (start, end) in selected.iter().rev() {
                let index = match placement {
                    Placement::Before => text[..*start].matches('\n').count(),
                    Placement::After => {
                        let prefix = &text[..*end];
                        let lines = prefix.matches('\n').count();
                        if prefix.ends_with('\n') { lines } else { lines + 1 }
                    }
                };
                let index = index.min(buffer.line_count());
                buffer.lines.splice(index..index, split_body(body));
            }
        }
        EditOp::ReplacePattern {
            pattern,
            occurrence,
            case_insensitive,
            if_not_found,
            replacement,
        } => {
            let regex = compile_pattern(pattern, *case_insensitive)?;
            let text = buffer.to_lf_text();
            let captures: Vec<regex::Captures> = regex.captures_iter(&text).collect();
            if captures.is_empty() {
                return not_found(buffer, pattern, *if_not_found, replacement);
            }
            let spans: Vec<(usize, usize)> = captures
                .iter()
                .filter_map(|c| c.get(0).map(|m| (m.start(), m.end())))
                .collect();
            let selected = select(&spans, *occurrence, pattern)?;

            // Substitute bottom-up so earlier spans keep their offsets.
            let mut updated = text.clone();
            for &(start, end) in selected.iter().rev() {
                let Some(caps) = spans
                    .iter()
                    .position(|s| *s == (start, end))
                    .and_then(|i| captures.get(i))
                else {
                    continue;
                };
                let mut expanded = String::new();
                caps.expand(replacement, &mut expanded);
                updated.replace_range(start..end, &expanded);
            }
            buffer.set_from_lf_text(&updated);
        }
        EditOp::ReplaceAnchor {
            start_pattern,
            end_pattern,
            case_insensitive,
            if_not_found,
            body,
        } => {
            let start_re = compile_pattern(start_pattern, *case_insensitive)?;
            let end_re = compile_pattern(end_pattern, *case_insensitive)?;

            let start_line = buffer.lines.iter().position(|l| start_re.is_match(l));
            let Some(start_line) = start_line else {
                return not_found(buffer, start_pattern, *if_not_found, body);
            };
            let end_line = buffer.lines[start_line..]
                .iter()
                .position(|l| end_re.is_match(l))
                .map(|offset| start_line + offset);
            let Some(end_line) = end_line else {
                return not_found(buffer, end_pattern, *if_not_found, body);
            };

            buffer.lines.splice(start_line..=end_line, split_body(body));
        }
    }
    Ok(())
}

fn check_span(start: usize, end: usize, count: usize) -> Result<(), EditError> {
    if start < 1 || end > count {
        return Err(EditError::Validation(format!(
            "line span {start}..{end} out of range 1..={count}"
        )));
    }
    Ok(())
}

fn not_found(
    buffer: &mut Buffer,
    pattern: &str,
    if_not_found: IfNotFound,
    body: &str,
) -> Result<(), EditError> {
    match if_not_found {
        IfNotFound::Error => Err(EditError::PatternNotFound(pattern.to_string())),
        IfNotFound::Skip => Ok(()),
        IfNotFound::Create => {
            let at = buffer.line_count();
            let was_empty = buffer.lines.is_empty();
            buffer.lines.splice(at..at, split_body(body));
            if was_empty {
                buffer.trailing_newline = body.ends_with('\n');
            }
            Ok(())
        }
    }
}

fn select(
    matches: &[(usize, usize)],
    occurrence: Occurrence,
    pattern: &str,
) -> Result<Vec<(usize, usize)>, EditError> {
    match occurrence {
        Occurrence::All => Ok(matches.to_vec()),
        Occurrence::Unique => {
            if matches.len() > 1 {
                Err(EditError::Ambiguous {
                    count: matches.len(),
                })
            } else {
                Ok(vec![matches[0]])
            }
        }
        Occurrence::First => Ok(vec![matches[0]]),
        Occurrence::Last => Ok(vec![matches[matches.len() - 1]]),
        Occurrence::Nth(n) => matches.get(n - 1).map(|m| vec![*m]).ok_or_else(|| {
            EditError::PatternNotFound(format!(
                "occurrence {n} of '{pattern}' (only {} matches)",
                matches.len()
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn apply_to(content: &str, ops: Vec<EditOp>) -> (Result<EditOutcome, EditError>, String) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, content).unwrap();
        let outcome = apply_plan(&EditPlan::new(path.clone(), ops)).await;
        let after = std::fs::read_to_string(&path).unwrap();
        (outcome, after)
    }

    fn ten_lines() -> String {
        (1..=10).map(|i| format!("line{i}\n")).collect()
    }

    #[tokio::test]
    async fn test_update_lines() {
        let (outcome, after) = apply_to(
            "a\nb\nc\n",
            vec![EditOp::UpdateLines {
                start: 2,
                end: 2,
                body: "B\n".into(),
            }],
        )
        .await;
        assert_eq!(outcome.unwrap().status, EditStatus::Applied);
        assert_eq!(after, "a\nB\nc\n");
    }

    #[tokio::test]
    async fn test_update_span_with_multiline_body() {
        let (_, after) = apply_to(
            "a\nb\nc\nd\n",
            vec![EditOp::UpdateLines {
                start: 2,
                end: 3,
                body: "x\ny\nz\n".into(),
            }],
        )
        .await;
        assert_eq!(after, "a\nx\ny\nz\nd\n");
    }

    #[tokio::test]
    async fn test_delete_lines() {
        let (_, after) = apply_to(
            "a\nb\nc\n",
            vec![EditOp::DeleteLines { start: 1, end: 2 }],
        )
        .await;
        assert_eq!(after, "c\n");
    }

    #[tokio::test]
    async fn test_line_span_out_of_range() {
        let (outcome, after) = apply_to(
            "a\nb\n",
            vec![EditOp::DeleteLines { start: 1, end: 5 }],
        )
        .await;
        assert!(matches!(outcome.unwrap_err(), EditError::Validation(_)));
        assert_eq!(after, "a\nb\n");
    }

    #[tokio::test]
    async fn test_insert_before_and_after() {
        let (_, after) = apply_to(
            "a\nb\n",
            vec![EditOp::InsertLines {
                line: 2,
                placement: Placement::Before,
                body: "x\n".into(),
            }],
        )
        .await;
        assert_eq!(after, "a\nx\nb\n");

        let (_, after) = apply_to(
            "a\nb\n",
            vec![EditOp::InsertLines {
                line: 2,
                placement: Placement::After,
                body: "x\n".into(),
            }],
        )
        .await;
        assert_eq!(after, "a\nb\nx\n");
    }

    #[tokio::test]
    async fn test_insert_at_end_boundary() {
        let (_, after) = apply_to(
            "a\n",
            vec![EditOp::InsertLines {
                line: 2,
                placement: Placement::Before,
                body: "x\n".into(),
            }],
        )
        .await;
        assert_eq!(after, "a\nx\n");
    }

    #[tokio::test]
    async fn test_insert_then_delete_round_trips() {
        let original = ten_lines();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, &original).unwrap();

        apply_plan(&EditPlan::new(
            path.clone(),
            vec![EditOp::InsertLines {
                line: 3,
                placement: Placement::Before,
                body: "X\n".into(),
            }],
        ))
        .await
        .unwrap();

        apply_plan(&EditPlan::new(
            path.clone(),
            vec![EditOp::DeleteLines { start: 3, end: 3 }],
        ))
        .await
        .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn test_insert_at_pattern_before_and_after() {
        let (_, after) = apply_to(
            "alpha\nbeta\ngamma\n",
            vec![EditOp::InsertAtPattern {
                pattern: "^beta$".into(),
                placement: Placement::Before,
                occurrence: Occurrence::Unique,
                case_insensitive: false,
                if_not_found: IfNotFound::Error,
                body: "inserted\n".into(),
            }],
        )
        .await;
        assert_eq!(after, "alpha\ninserted\nbeta\ngamma\n");

        let (_, after) = apply_to(
            "alpha\nbeta\ngamma\n",
            vec![EditOp::InsertAtPattern {
                pattern: "^beta$".into(),
                placement: Placement::After,
                occurrence: Occurrence::Unique,
                case_insensitive: false,
                if_not_found: IfNotFound::Error,
                body: "inserted\n".into(),
            }],
        )
        .await;
        assert_eq!(after, "alpha\nbeta\ninserted\ngamma\n");
    }

    #[tokio::test]
    async fn test_ambiguous_pattern_defaults_to_error() {
        let (outcome, after) = apply_to(
            "foo\nfoo\n",
            vec![EditOp::ReplacePattern {
                pattern: "foo".into(),
                occurrence: Occurrence::Unique,
                case_insensitive: false,
                if_not_found: IfNotFound::Error,
                replacement: "bar".into(),
            }],
        )
        .await;
        assert!(matches!(
            outcome.unwrap_err(),
            EditError::Ambiguous { count: 2 }
        ));
        assert_eq!(after, "foo\nfoo\n");
    }

    #[tokio::test]
    async fn test_replace_pattern_occurrences() {
        let content = "foo\nbar\nfoo\nbaz\nfoo\n";

        let (_, after) = apply_to(
            content,
            vec![EditOp::ReplacePattern {
                pattern: "foo".into(),
                occurrence: Occurrence::First,
                case_insensitive: false,
                if_not_found: IfNotFound::Error,
                replacement: "X".into(),
            }],
        )
        .await;
        assert_eq!(after, "X\nbar\nfoo\nbaz\nfoo\n");

        let (_, after) = apply_to(
            content,
            vec![EditOp::ReplacePattern {
                pattern: "foo".into(),
                occurrence: Occurrence::Last,
                case_insensitive: false,
                if_not_found: IfNotFound::Error,
                replacement: "X".into(),
            }],
        )
        .await;
        assert_eq!(after, "foo\nbar\nfoo\nbaz\nX\n");

        let (_, after) = apply_to(
            content,
            vec![EditOp::ReplacePattern {
                pattern: "foo".into(),
                occurrence: Occurrence::Nth(2),
                case_insensitive: false,
                if_not_found: IfNotFound::Error,
                replacement: "X".into(),
            }],
        )
        .await;
        assert_eq!(after, "foo\nbar\nX\nbaz\nfoo\n");

        let (_, after) = apply_to(
            content,
            vec![EditOp::ReplacePattern {
                pattern: "foo".into(),
                occurrence: Occurrence::All,
                case_insensitive: false,
                if_not_found: IfNotFound::Error,
                replacement: "X".into(),
            }],
        )
        .await;
        assert_eq!(after, "X\nbar\nX\nbaz\nX\n");
    }

    #[tokio::test]
    async fn test_replace_pattern_capture_groups() {
        let (_, after) = apply_to(
            "name = old\n",
            vec![EditOp::ReplacePattern {
                pattern: r"^(name) = \w+$".into(),
                occurrence: Occurrence::Unique,
                case_insensitive: false,
                if_not_found: IfNotFound::Error,
                replacement: "$1 = new".into(),
            }],
        )
        .await;
        assert_eq!(after, "name = new\n");
    }

    #[tokio::test]
    async fn test_case_insensitive_flag() {
        let (_, after) = apply_to(
            "Hello\n",
            vec![EditOp::ReplacePattern {
                pattern: "hello".into(),
                occurrence: Occurrence::Unique,
                case_insensitive: true,
                if_not_found: IfNotFound::Error,
                replacement: "bye".into(),
            }],
        )
        .await;
        assert_eq!(after, "bye\n");
    }

    #[tokio::test]
    async fn test_if_not_found_skip_and_create() {
        let (outcome, after) = apply_to(
            "a\n",
            vec![EditOp::ReplacePattern {
                pattern: "missing".into(),
                occurrence: Occurrence::Unique,
                case_insensitive: false,
                if_not_found: IfNotFound::Skip,
                replacement: "x".into(),
            }],
        )
        .await;
        assert_eq!(outcome.unwrap().status, EditStatus::Applied);
        assert_eq!(after, "a\n");

        let (_, after) = apply_to(
            "a\n",
            vec![EditOp::InsertAtPattern {
                pattern: "missing".into(),
                placement: Placement::After,
                occurrence: Occurrence::Unique,
                case_insensitive: false,
                if_not_found: IfNotFound::Create,
                body: "appended\n".into(),
            }],
        )
        .await;
        assert_eq!(after, "a\nappended\n");
    }

    #[tokio::test]
    async fn test_replace_anchor_span() {
        let content = "keep\n# begin\nold1\nold2\n# end\ntail\n";
        let (_, after) = apply_to(
            content,
            vec![EditOp::ReplaceAnchor {
                start_pattern: "^# begin$".into(),
                end_pattern: "^# end$".into(),
                case_insensitive: false,
                if_not_found: IfNotFound::Error,
                body: "# begin\nnew\n# end\n".into(),
            }],
        )
        .await;
        assert_eq!(after, "keep\n# begin\nnew\n# end\ntail\n");
    }

    #[tokio::test]
    async fn test_replace_anchor_missing_end_errors() {
        let (outcome, _) = apply_to(
            "# begin\nbody\n",
            vec![EditOp::ReplaceAnchor {
                start_pattern: "^# begin$".into(),
                end_pattern: "^# end$".into(),
                case_insensitive: false,
                if_not_found: IfNotFound::Error,
                body: "x\n".into(),
            }],
        )
        .await;
        assert!(matches!(
            outcome.unwrap_err(),
            EditError::PatternNotFound(p) if p.contains("end")
        ));
    }

    #[tokio::test]
    async fn test_crlf_preserved_through_edits() {
        let (_, after) = apply_to(
            "a\r\nb\r\nc\r\n",
            vec![EditOp::InsertLines {
                line: 2,
                placement: Placement::Before,
                body: "x\n".into(),
            }],
        )
        .await;
        assert_eq!(after, "a\r\nx\r\nb\r\nc\r\n");
    }

    #[tokio::test]
    async fn test_idempotent_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "a\nb\n").unwrap();

        let mut plan = EditPlan::new(
            path.clone(),
            vec![EditOp::ReplacePattern {
                pattern: "a".into(),
                occurrence: Occurrence::First,
                case_insensitive: false,
                if_not_found: IfNotFound::Error,
                replacement: "A".into(),
            }],
        );
        plan.idempotent = true;

        let first = apply_plan(&plan).await.unwrap();
        assert_eq!(first.status, EditStatus::Applied);

        // Rerunning the identical operation now matches nothing to change.
        let mut again = plan.clone();
        again.ops = vec![EditOp::ReplacePattern {
            pattern: "A".into(),
            occurrence: Occurrence::First,
            case_insensitive: false,
            if_not_found: IfNotFound::Error,
            replacement: "A".into(),
        }];
        let second = apply_plan(&again).await.unwrap();
        assert_eq!(second.status, EditStatus::Noop);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "A\nb\n");
    }

    #[tokio::test]
    async fn test_precondition_pass_and_fail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "content\n").unwrap();
        let digest = sha256_hex(b"content\n");

        let mut plan = EditPlan::new(
            path.clone(),
            vec![EditOp::ReplacePattern {
                pattern: "content".into(),
                occurrence: Occurrence::Unique,
                case_insensitive: false,
                if_not_found: IfNotFound::Error,
                replacement: "changed".into(),
            }],
        );
        plan.expected_sha256 = Some(digest);
        apply_plan(&plan).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "changed\n");

        plan.expected_sha256 = Some(sha256_hex(b"something else"));
        let err = apply_plan(&plan).await.unwrap_err();
        assert!(matches!(err, EditError::Precondition { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "changed\n");
    }

    #[tokio::test]
    async fn test_preview_does_not_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "a\nb\n").unwrap();

        let mut plan = EditPlan::new(
            path.clone(),
            vec![EditOp::DeleteLines { start: 1, end: 1 }],
        );
        plan.preview_only = true;

        let outcome = apply_plan(&plan).await.unwrap();
        assert_eq!(outcome.status, EditStatus::Preview);
        assert!(outcome.diff.contains("-a"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[tokio::test]
    async fn test_binary_guard_and_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"text\0more\n").unwrap();

        let mut plan = EditPlan::new(
            path.clone(),
            vec![EditOp::DeleteLines { start: 1, end: 1 }],
        );
        assert!(matches!(
            apply_plan(&plan).await.unwrap_err(),
            EditError::Binary(_)
        ));

        plan.force = true;
        apply_plan(&plan).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"");
    }

    #[tokio::test]
    async fn test_invalid_regex_rejected_before_io() {
        let (outcome, after) = apply_to(
            "a\n",
            vec![EditOp::ReplacePattern {
                pattern: "([unclosed".into(),
                occurrence: Occurrence::Unique,
                case_insensitive: false,
                if_not_found: IfNotFound::Error,
                replacement: "x".into(),
            }],
        )
        .await;
        assert!(matches!(outcome.unwrap_err(), EditError::Validation(_)));
        assert_eq!(after, "a\n");
    }

    #[tokio::test]
    async fn test_multiple_ops_apply_in_order() {
        let (_, after) = apply_to(
            "a\nb\nc\n",
            vec![
                EditOp::DeleteLines { start: 1, end: 1 },
                EditOp::InsertLines {
                    line: 1,
                    placement: Placement::Before,
                    body: "first\n".into(),
                },
            ],
        )
        .await;
        assert_eq!(after, "first\nb\nc\n");
    }
}
