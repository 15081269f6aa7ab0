//! Line-addressed edits, all routed through the edit engine.

use crate::approval::{FileAction, FileActionKind, RiskLevel};
use crate::edit::{self, EditOp, Placement};
use crate::tool::builtin::{
    approval_param, declare_action, edit_option_params, edit_result, placement_arg,
    plan_with_options, required_str, required_usize, resolved_path, session_param,
};
use crate::tool::{BoundArgs, CallContext, ParamSpec, Tool, ToolError, ToolResult};
use async_trait::async_trait;

fn line_span_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::int("start_line", "first line of the span (1-indexed, inclusive)").required(),
        ParamSpec::int("end_line", "last line of the span (inclusive)").required(),
    ]
}

pub struct UpdateFileLinesTool;

#[async_trait]
impl Tool for UpdateFileLinesTool {
    fn name(&self) -> &'static str {
        "update_file_lines"
    }

    fn description(&self) -> &'static str {
        "Replace an inclusive line span with new content"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn params(&self) -> Vec<ParamSpec> {
        let mut params = vec![
            session_param(),
            ParamSpec::string("filepath", "file to edit").required().path(),
        ];
        params.extend(line_span_params());
        params.push(ParamSpec::string("new_content", "replacement lines").required());
        params.push(approval_param());
        params.extend(edit_option_params());
        params
    }

    fn planned_actions(&self, args: &BoundArgs, ctx: &CallContext) -> Vec<FileAction> {
        declare_action(args, ctx, "filepath", FileActionKind::Update, "update lines")
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let path = resolved_path(args, ctx, "filepath")?;
        let op = EditOp::UpdateLines {
            start: required_usize(args, "start_line")?,
            end: required_usize(args, "end_line")?,
            body: required_str(args, "new_content")?.to_string(),
        };
        let plan = plan_with_options(path, vec![op], args);
        let outcome = edit::apply_plan(&plan).await?;
        Ok(edit_result(&plan.path, &outcome))
    }
}

pub struct DeleteFileLinesTool;

#[async_trait]
impl Tool for DeleteFileLinesTool {
    fn name(&self) -> &'static str {
        "delete_file_lines"
    }

    fn description(&self) -> &'static str {
        "Remove an inclusive line span"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn params(&self) -> Vec<ParamSpec> {
        let mut params = vec![
            session_param(),
            ParamSpec::string("filepath", "file to edit").required().path(),
        ];
        params.extend(line_span_params());
        params.push(approval_param());
        params.extend(edit_option_params());
        params
    }

    fn planned_actions(&self, args: &BoundArgs, ctx: &CallContext) -> Vec<FileAction> {
        declare_action(args, ctx, "filepath", FileActionKind::Update, "delete lines")
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let path = resolved_path(args, ctx, "filepath")?;
        let op = EditOp::DeleteLines {
            start: required_usize(args, "start_line")?,
            end: required_usize(args, "end_line")?,
        };
        let plan = plan_with_options(path, vec![op], args);
        let outcome = edit::apply_plan(&plan).await?;
        Ok(edit_result(&plan.path, &outcome))
    }
}

pub struct InsertFileLinesTool;

#[async_trait]
impl Tool for InsertFileLinesTool {
    fn name(&self) -> &'static str {
        "insert_file_lines"
    }

    fn description(&self) -> &'static str {
        "Insert content before or after a line number"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn params(&self) -> Vec<ParamSpec> {
        let mut params = vec![
            session_param(),
            ParamSpec::string("filepath", "file to edit").required().path(),
            ParamSpec::int("line_number", "insertion point (1-indexed)").required(),
            ParamSpec::string("new_content", "lines to insert").required(),
            ParamSpec::string("position", "before (default) or after the line"),
            approval_param(),
        ];
        params.extend(edit_option_params());
        params
    }

    fn planned_actions(&self, args: &BoundArgs, ctx: &CallContext) -> Vec<FileAction> {
        declare_action(args, ctx, "filepath", FileActionKind::Update, "insert lines")
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let path = resolved_path(args, ctx, "filepath")?;
        let op = EditOp::InsertLines {
            line: required_usize(args, "line_number")?,
            placement: placement_arg(args, Placement::Before)?,
            body: required_str(args, "new_content")?.to_string(),
        };
        let plan = plan_with_options(path, vec![op], args);
        let outcome = edit::apply_plan(&plan).await?;
        Ok(edit_result(&plan.path, &outcome))
    }
}
