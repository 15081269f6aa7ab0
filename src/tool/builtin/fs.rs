//! Whole-file and directory mutations.

use crate::approval::{FileAction, FileActionKind, RiskLevel};
use crate::edit::{EditError, looks_binary, sha256_hex, unified_diff, write_atomic};
use crate::tool::builtin::{
    approval_param, declare_action, edit_option_params, required_str, resolved_path, session_param,
};
use crate::tool::{BoundArgs, CallContext, ParamSpec, Tool, ToolError, ToolResult};
use async_trait::async_trait;
use serde_json::json;

pub struct CreateFileTool;

#[async_trait]
impl Tool for CreateFileTool {
    fn name(&self) -> &'static str {
        "create_file"
    }

    fn description(&self) -> &'static str {
        "Create a new file; refuses to overwrite an existing one"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            session_param(),
            ParamSpec::string("filepath", "file to create").required().path(),
            ParamSpec::string("new_content", "initial content").required(),
            approval_param(),
        ]
    }

    fn planned_actions(&self, args: &BoundArgs, ctx: &CallContext) -> Vec<FileAction> {
        declare_action(args, ctx, "filepath", FileActionKind::Create, "create file")
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let path = resolved_path(args, ctx, "filepath")?;
        let content = required_str(args, "new_content")?;

        if path.exists() {
            return Err(ToolError::InvalidArgs(format!(
                "file already exists: {} (use update_file)",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::io(parent, &e))?;
        }

        let bytes = content.as_bytes().to_vec();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&target, &bytes, false))
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?
            .map_err(|e| ToolError::io(&path, &e))?;

        tracing::info!(path = %path.display(), "file created");
        Ok(ToolResult::Json(json!({
            "path": path.display().to_string(),
            "bytes_written": content.len(),
            "sha256": sha256_hex(content.as_bytes()),
        })))
    }
}

pub struct UpdateFileTool;

#[async_trait]
impl Tool for UpdateFileTool {
    fn name(&self) -> &'static str {
        "update_file"
    }

    fn description(&self) -> &'static str {
        "Replace the entire content of an existing file"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::High
    }

    fn params(&self) -> Vec<ParamSpec> {
        let mut params = vec![
            session_param(),
            ParamSpec::string("filepath", "file to replace").required().path(),
            ParamSpec::string("new_content", "replacement content").required(),
            approval_param(),
        ];
        params.extend(edit_option_params());
        params
    }

    fn planned_actions(&self, args: &BoundArgs, ctx: &CallContext) -> Vec<FileAction> {
        declare_action(
            args,
            ctx,
            "filepath",
            FileActionKind::Update,
            "replace file contents",
        )
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let path = resolved_path(args, ctx, "filepath")?;
        let content = required_str(args, "new_content")?;
        let force = args.flag("force").unwrap_or(false);

        let old = tokio::fs::read(&path)
            .await
            .map_err(|e| ToolError::io(&path, &e))?;
        if !force && looks_binary(&old) {
            return Err(EditError::Binary(path.display().to_string()).into());
        }
        if let Some(expected) = args.str("expected_sha256") {
            let actual = sha256_hex(&old);
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(EditError::Precondition {
                    path: path.display().to_string(),
                }
                .into());
            }
        }

        if args.flag("idempotent").unwrap_or(false) && old == content.as_bytes() {
            return Ok(ToolResult::Json(json!({
                "path": path.display().to_string(),
                "status": "noop",
                "sha256": sha256_hex(&old),
            })));
        }

        let diff = unified_diff(&String::from_utf8_lossy(&old), content, &path);
        if args.flag("preview_only").unwrap_or(false) {
            return Ok(ToolResult::Json(json!({
                "path": path.display().to_string(),
                "status": "preview",
                "diff": diff,
                "sha256": sha256_hex(content.as_bytes()),
            })));
        }

        let backup = args.flag("backup").unwrap_or(false);
        let bytes = content.as_bytes().to_vec();
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&target, &bytes, backup))
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?
            .map_err(|e| ToolError::io(&path, &e))?;

        Ok(ToolResult::Json(json!({
            "path": path.display().to_string(),
            "status": "applied",
            "diff": diff,
            "sha256": sha256_hex(content.as_bytes()),
        })))
    }
}

pub struct DeleteFileTool;

#[async_trait]
impl Tool for DeleteFileTool {
    fn name(&self) -> &'static str {
        "delete_file"
    }

    fn description(&self) -> &'static str {
        "Delete a single file"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::High
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            session_param(),
            ParamSpec::string("filepath", "file to delete").required().path(),
            approval_param(),
        ]
    }

    fn planned_actions(&self, args: &BoundArgs, ctx: &CallContext) -> Vec<FileAction> {
        declare_action(args, ctx, "filepath", FileActionKind::Delete, "delete file")
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let path = resolved_path(args, ctx, "filepath")?;
        if path.is_dir() {
            return Err(ToolError::InvalidArgs(format!(
                "is a directory: {} (use delete_directory)",
                path.display()
            )));
        }
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| ToolError::io(&path, &e))?;
        tracing::info!(path = %path.display(), "file deleted");
        Ok(ToolResult::Json(json!({
            "path": path.display().to_string(),
            "deleted": true,
        })))
    }
}

pub struct CreateDirectoryTool;

#[async_trait]
impl Tool for CreateDirectoryTool {
    fn name(&self) -> &'static str {
        "create_directory"
    }

    fn description(&self) -> &'static str {
        "Create a directory, including missing parents"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            session_param(),
            ParamSpec::string("filepath", "directory to create").required().path(),
            approval_param(),
        ]
    }

    fn planned_actions(&self, args: &BoundArgs, ctx: &CallContext) -> Vec<FileAction> {
        declare_action(
            args,
            ctx,
            "filepath",
            FileActionKind::Create,
            "create directory",
        )
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let path = resolved_path(args, ctx, "filepath")?;
        tokio::fs::create_dir_all(&path)
            .await
            .map_err(|e| ToolError::io(&path, &e))?;
        Ok(ToolResult::Json(json!({
            "path": path.display().to_string(),
            "created": true,
        })))
    }
}

pub struct DeleteDirectoryTool;

#[async_trait]
impl Tool for DeleteDirectoryTool {
    fn name(&self) -> &'static str {
        "delete_directory"
    }

    fn description(&self) -> &'static str {
        "Delete a directory; refuses a non-empty one unless recursive is set"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::High
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            session_param(),
            ParamSpec::string("filepath", "directory to delete").required().path(),
            ParamSpec::bool("recursive", "delete contents too"),
            approval_param(),
        ]
    }

    fn planned_actions(&self, args: &BoundArgs, ctx: &CallContext) -> Vec<FileAction> {
        declare_action(
            args,
            ctx,
            "filepath",
            FileActionKind::Delete,
            "delete directory",
        )
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let path = resolved_path(args, ctx, "filepath")?;
        if !path.is_dir() {
            return Err(ToolError::InvalidArgs(format!(
                "not a directory: {}",
                path.display()
            )));
        }

        let recursive = args.flag("recursive").unwrap_or(false);
        if recursive {
            tokio::fs::remove_dir_all(&path)
                .await
                .map_err(|e| ToolError::io(&path, &e))?;
        } else {
            let mut entries = tokio::fs::read_dir(&path)
                .await
                .map_err(|e| ToolError::io(&path, &e))?;
            if entries
                .next_entry()
                .await
                .map_err(|e| ToolError::io(&path, &e))?
                .is_some()
            {
                return Err(ToolError::InvalidArgs(format!(
                    "directory not empty: {} (pass recursive: true)",
                    path.display()
                )));
            }
            tokio::fs::remove_dir(&path)
                .await
                .map_err(|e| ToolError::io(&path, &e))?;
        }

        tracing::info!(path = %path.display(), recursive, "directory deleted");
        Ok(ToolResult::Json(json!({
            "path": path.display().to_string(),
            "deleted": true,
        })))
    }
}

pub struct MoveFileTool;

#[async_trait]
impl Tool for MoveFileTool {
    fn name(&self) -> &'static str {
        "move_file"
    }

    fn description(&self) -> &'static str {
        "Move or rename a file within the allow-listed roots"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            session_param(),
            ParamSpec::string("filepath", "current path").required().path(),
            ParamSpec::string("new_path", "destination path").required().path(),
            approval_param(),
        ]
    }

    fn planned_actions(&self, args: &BoundArgs, ctx: &CallContext) -> Vec<FileAction> {
        let mut actions = declare_action(args, ctx, "filepath", FileActionKind::Delete, "move away");
        actions.extend(declare_action(
            args,
            ctx,
            "new_path",
            FileActionKind::Create,
            "move here",
        ));
        actions
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let from = resolved_path(args, ctx, "filepath")?;
        let to = resolved_path(args, ctx, "new_path")?;

        if to.exists() {
            return Err(ToolError::InvalidArgs(format!(
                "destination already exists: {}",
                to.display()
            )));
        }
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::io(parent, &e))?;
        }
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| ToolError::io(&from, &e))?;

        Ok(ToolResult::Json(json!({
            "from": from.display().to_string(),
            "to": to.display().to_string(),
        })))
    }
}
