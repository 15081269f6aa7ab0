//! Pattern- and anchor-addressed edits.

use crate::approval::{FileAction, FileActionKind, RiskLevel};
use crate::edit::{self, EditOp, Placement};
use crate::tool::builtin::{
    approval_param, declare_action, edit_option_params, edit_result, if_not_found_arg,
    occurrence_arg, placement_arg, plan_with_options, required_str, resolved_path, session_param,
};
use crate::tool::{BoundArgs, CallContext, ParamSpec, Tool, ToolError, ToolResult};
use async_trait::async_trait;

fn pattern_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::string(
            "occurrence",
            "which match to target: first, last, all, or a 1-based index; omit to require a unique match",
        ),
        ParamSpec::bool("case_insensitive", "match case-insensitively"),
        ParamSpec::string("if_not_found", "error (default), skip, or create"),
    ]
}

pub struct InsertAtPatternTool;

#[async_trait]
impl Tool for InsertAtPatternTool {
    fn name(&self) -> &'static str {
        "insert_at_pattern"
    }

    fn description(&self) -> &'static str {
        "Insert content before or after a regex match"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn params(&self) -> Vec<ParamSpec> {
        let mut params = vec![
            session_param(),
            ParamSpec::string("filepath", "file to edit").required().path(),
            ParamSpec::string("pattern", "regex locating the insertion point").required(),
            ParamSpec::string("new_content", "lines to insert").required(),
            ParamSpec::string("position", "before or after (default) the match"),
            approval_param(),
        ];
        params.extend(pattern_params());
        params.extend(edit_option_params());
        params
    }

    fn planned_actions(&self, args: &BoundArgs, ctx: &CallContext) -> Vec<FileAction> {
        declare_action(
            args,
            ctx,
            "filepath",
            FileActionKind::Update,
            "insert at pattern",
        )
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let path = resolved_path(args, ctx, "filepath")?;
        let op = EditOp::InsertAtPattern {
            pattern: required_str(args, "pattern")?.to_string(),
            placement: placement_arg(args, Placement::After)?,
            occurrence: occurrence_arg(args)?,
            case_insensitive: args.flag("case_insensitive").unwrap_or(false),
            if_not_found: if_not_found_arg(args)?,
            body: required_str(args, "new_content")?.to_string(),
        };
        let plan = plan_with_options(path, vec![op], args);
        let outcome = edit::apply_plan(&plan).await?;
        Ok(edit_result(&plan.path, &outcome))
    }
}

pub struct ReplacePatternTool;

#[async_trait]
impl Tool for ReplacePatternTool {
    fn name(&self) -> &'static str {
        "replace_pattern"
    }

    fn description(&self) -> &'static str {
        "Replace regex matches; $1-style capture references are expanded"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn params(&self) -> Vec<ParamSpec> {
        let mut params = vec![
            session_param(),
            ParamSpec::string("filepath", "file to edit").required().path(),
            ParamSpec::string("pattern", "regex to replace").required(),
            ParamSpec::string("new_content", "substitution text").required(),
            approval_param(),
        ];
        params.extend(pattern_params());
        params.extend(edit_option_params());
        params
    }

    fn planned_actions(&self, args: &BoundArgs, ctx: &CallContext) -> Vec<FileAction> {
        declare_action(
            args,
            ctx,
            "filepath",
            FileActionKind::Update,
            "replace pattern",
        )
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let path = resolved_path(args, ctx, "filepath")?;
        let op = EditOp::ReplacePattern {
            pattern: required_str(args, "pattern")?.to_string(),
            occurrence: occurrence_arg(args)?,
            case_insensitive: args.flag("case_insensitive").unwrap_or(false),
            if_not_found: if_not_found_arg(args)?,
            replacement: required_str(args, "new_content")?.to_string(),
        };
        let plan = plan_with_options(path, vec![op], args);
        let outcome = edit::apply_plan(&plan).await?;
        Ok(edit_result(&plan.path, &outcome))
    }
}

pub struct ReplaceAnchorTool;

#[async_trait]
impl Tool for ReplaceAnchorTool {
    fn name(&self) -> &'static str {
        "replace_anchor"
    }

    fn description(&self) -> &'static str {
        "Replace the inclusive span between a start line and the next end line"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn params(&self) -> Vec<ParamSpec> {
        let mut params = vec![
            session_param(),
            ParamSpec::string("filepath", "file to edit").required().path(),
            ParamSpec::string("start_pattern", "regex matching the first line of the span")
                .required(),
            ParamSpec::string("end_pattern", "regex matching the last line of the span")
                .required(),
            ParamSpec::string("new_content", "replacement lines").required(),
            ParamSpec::bool("case_insensitive", "match case-insensitively"),
            ParamSpec::string("if_not_found", "error (default), skip, or create"),
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
            "replace anchored span",
        )
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let path = resolved_path(args, ctx, "filepath")?;
        let op = EditOp::ReplaceAnchor {
            start_pattern: required_str(args, "start_pattern")?.to_string(),
            end_pattern: required_str(args, "end_pattern")?.to_string(),
            case_insensitive: args.flag("case_insensitive").unwrap_or(false),
            if_not_found: if_not_found_arg(args)?,
            body: required_str(args, "new_content")?.to_string(),
        };
        let plan = plan_with_options(path, vec![op], args);
        let outcome = edit::apply_plan(&plan).await?;
        Ok(edit_result(&plan.path, &outcome))
    }
}
