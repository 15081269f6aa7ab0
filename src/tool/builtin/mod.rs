//! The built-in tool set.

mod approve;
mod config;
mod fs;
mod lines;
mod list;
mod meta;
mod patterns;
mod read;
mod search;
mod session;

pub use approve::RequestApprovalTool;
pub use config::GetConfigTool;
pub use fs::{
    CreateDirectoryTool, CreateFileTool, DeleteDirectoryTool, DeleteFileTool, MoveFileTool,
    UpdateFileTool,
};
pub use lines::{DeleteFileLinesTool, InsertFileLinesTool, UpdateFileLinesTool};
pub use list::ListDirectoryTool;
pub use meta::{AnalyzeFileTool, GetFileMetadataTool};
pub use patterns::{InsertAtPatternTool, ReplaceAnchorTool, ReplacePatternTool};
pub use read::ReadFilesTool;
pub use search::SearchFilesTool;
pub use session::StartSessionTool;

use crate::approval::{FileAction, FileActionKind};
use crate::edit::{EditOp, EditOutcome, EditPlan, EditStatus, IfNotFound, Occurrence, Placement};
use crate::tool::{BoundArgs, CallContext, ParamSpec, Registry, ToolError, ToolResult};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Register every built-in tool in its canonical order. The order is what
/// `tools/list` reports.
pub fn register_builtins(registry: &mut Registry) {
    registry.register(Arc::new(StartSessionTool));
    registry.register(Arc::new(GetConfigTool));
    registry.register(Arc::new(ReadFilesTool));
    registry.register(Arc::new(SearchFilesTool));
    registry.register(Arc::new(ListDirectoryTool));
    registry.register(Arc::new(GetFileMetadataTool));
    registry.register(Arc::new(AnalyzeFileTool));
    registry.register(Arc::new(RequestApprovalTool));
    registry.register(Arc::new(CreateFileTool));
    registry.register(Arc::new(CreateDirectoryTool));
    registry.register(Arc::new(MoveFileTool));
    registry.register(Arc::new(UpdateFileTool));
    registry.register(Arc::new(DeleteFileTool));
    registry.register(Arc::new(DeleteDirectoryTool));
    registry.register(Arc::new(UpdateFileLinesTool));
    registry.register(Arc::new(DeleteFileLinesTool));
    registry.register(Arc::new(InsertFileLinesTool));
    registry.register(Arc::new(InsertAtPatternTool));
    registry.register(Arc::new(ReplacePatternTool));
    registry.register(Arc::new(ReplaceAnchorTool));
}

/// The session-token parameter every gated tool declares.
pub(crate) fn session_param() -> ParamSpec {
    ParamSpec::string("session_token", "session token from start_session").required()
}

/// The approval-token parameter every mutating tool declares.
pub(crate) fn approval_param() -> ParamSpec {
    ParamSpec::string("approval_token", "approval token from request_approval")
}

/// Resolve a path argument through the guard, with the uniform denial.
pub(crate) fn resolved_path(
    args: &BoundArgs,
    ctx: &CallContext,
    name: &str,
) -> Result<PathBuf, ToolError> {
    let raw = args
        .str(name)
        .ok_or_else(|| ToolError::InvalidArgs(format!("required argument '{name}' not found")))?;
    resolve_allowed(ctx, Path::new(raw))
}

pub(crate) fn resolve_allowed(ctx: &CallContext, path: &Path) -> Result<PathBuf, ToolError> {
    ctx.guard
        .resolve(path)
        .filter(|resolved| ctx.guard.allowed(resolved))
        .ok_or_else(|| ToolError::AccessDenied(path.display().to_string()))
}

/// Best-effort resolution for action declarations; falls back to the raw
/// path so a mismatch still surfaces through the approval check.
pub(crate) fn action_path(ctx: &CallContext, raw: &str) -> PathBuf {
    let path = Path::new(raw);
    ctx.guard.resolve(path).unwrap_or_else(|| path.to_path_buf())
}

/// One declared mutation, skipped entirely for preview calls.
pub(crate) fn declare_action(
    args: &BoundArgs,
    ctx: &CallContext,
    name: &str,
    kind: FileActionKind,
    purpose: &str,
) -> Vec<FileAction> {
    if args.flag("preview_only") == Some(true) {
        return Vec::new();
    }
    let Some(raw) = args.str(name) else {
        return Vec::new();
    };
    vec![FileAction::new(action_path(ctx, raw), kind, purpose)]
}

/// Options shared by every edit-engine tool.
pub(crate) fn edit_option_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::string(
            "expected_sha256",
            "fail unless the current content hash matches",
        ),
        ParamSpec::bool("preview_only", "produce the diff without writing"),
        ParamSpec::bool("idempotent", "report noop when the edit changes nothing"),
        ParamSpec::bool("backup", "keep the previous content as <name>.bak"),
        ParamSpec::bool("force", "edit even if the file looks binary"),
    ]
}

pub(crate) fn plan_with_options(path: PathBuf, ops: Vec<EditOp>, args: &BoundArgs) -> EditPlan {
    let mut plan = EditPlan::new(path, ops);
    plan.expected_sha256 = args.str("expected_sha256").map(str::to_string);
    plan.preview_only = args.flag("preview_only").unwrap_or(false);
    plan.idempotent = args.flag("idempotent").unwrap_or(false);
    plan.backup = args.flag("backup").unwrap_or(false);
    plan.force = args.flag("force").unwrap_or(false);
    plan
}

pub(crate) fn usize_arg(args: &BoundArgs, name: &str) -> Result<Option<usize>, ToolError> {
    match args.int(name) {
        None => Ok(None),
        Some(value) => usize::try_from(value).map(Some).map_err(|_| {
            ToolError::InvalidArgs(format!("argument '{name}' must be a positive integer"))
        }),
    }
}

pub(crate) fn required_usize(args: &BoundArgs, name: &str) -> Result<usize, ToolError> {
    usize_arg(args, name)?
        .ok_or_else(|| ToolError::InvalidArgs(format!("required argument '{name}' not found")))
}

pub(crate) fn required_str<'a>(args: &'a BoundArgs, name: &str) -> Result<&'a str, ToolError> {
    args.str(name)
        .ok_or_else(|| ToolError::InvalidArgs(format!("required argument '{name}' not found")))
}

/// Parse the `occurrence` argument: `first`, `last`, `all`, or a 1-based
/// index. Absent means "must be unique".
pub(crate) fn occurrence_arg(args: &BoundArgs) -> Result<Occurrence, ToolError> {
    match args.str("occurrence") {
        None => Ok(Occurrence::Unique),
        Some("first") => Ok(Occurrence::First),
        Some("last") => Ok(Occurrence::Last),
        Some("all") => Ok(Occurrence::All),
        Some(other) => match other.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(Occurrence::Nth(n)),
            _ => Err(ToolError::InvalidArgs(format!(
                "argument 'occurrence' must be first, last, all, or a 1-based index (got '{other}')"
            ))),
        },
    }
}

pub(crate) fn if_not_found_arg(args: &BoundArgs) -> Result<IfNotFound, ToolError> {
    match args.str("if_not_found") {
        None | Some("error") => Ok(IfNotFound::Error),
        Some("skip") => Ok(IfNotFound::Skip),
        Some("create") => Ok(IfNotFound::Create),
        Some(other) => Err(ToolError::InvalidArgs(format!(
            "argument 'if_not_found' must be error, skip, or create (got '{other}')"
        ))),
    }
}

pub(crate) fn placement_arg(args: &BoundArgs, default: Placement) -> Result<Placement, ToolError> {
    match args.str("position") {
        None => Ok(default),
        Some("before") => Ok(Placement::Before),
        Some("after") => Ok(Placement::After),
        Some(other) => Err(ToolError::InvalidArgs(format!(
            "argument 'position' must be before or after (got '{other}')"
        ))),
    }
}

/// Uniform JSON result for edit-engine tools.
pub(crate) fn edit_result(path: &Path, outcome: &EditOutcome) -> ToolResult {
    let status = match outcome.status {
        EditStatus::Applied => "applied",
        EditStatus::Preview => "preview",
        EditStatus::Noop => "noop",
    };
    ToolResult::Json(json!({
        "path": path.display().to_string(),
        "status": status,
        "diff": outcome.diff,
        "sha256": outcome.sha256,
        "lines_before": outcome.lines_before,
        "lines_after": outcome.lines_after,
    }))
}
