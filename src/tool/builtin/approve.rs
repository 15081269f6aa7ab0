//! The client-facing face of the approval broker.

use crate::approval::{ApprovalError, FileAction, FileActionKind, Outcome, RiskLevel};
use crate::tool::builtin::{resolve_allowed, session_param};
use crate::tool::{BoundArgs, CallContext, ParamSpec, Tool, ToolError, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;

pub struct RequestApprovalTool;

fn file_action_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::string("path", "absolute path the action touches").required(),
        ParamSpec::string("action", "create, update, or delete").required(),
        ParamSpec::string("purpose", "why, shown to the user").required(),
    ]
}

#[async_trait]
impl Tool for RequestApprovalTool {
    fn name(&self) -> &'static str {
        "request_approval"
    }

    fn description(&self) -> &'static str {
        "Ask the user to approve a set of planned file actions; returns a single-use approval token"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            session_param(),
            ParamSpec::object_array("files", file_action_params(), "the planned file actions")
                .required(),
        ]
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let files = args
            .objects("files")
            .filter(|f| !f.is_empty())
            .ok_or_else(|| ToolError::InvalidArgs("required argument 'files' not found".into()))?;

        let mut actions = Vec::with_capacity(files.len());
        let mut risk = RiskLevel::Medium;
        for file in files {
            let raw_path = file.get("path").and_then(|v| v.as_str()).unwrap_or_default();
            let action = match file.get("action").and_then(|v| v.as_str()) {
                Some("create") => FileActionKind::Create,
                Some("update") => FileActionKind::Update,
                Some("delete") => {
                    risk = RiskLevel::High;
                    FileActionKind::Delete
                }
                other => {
                    return Err(ToolError::InvalidArgs(format!(
                        "argument 'files[].action' must be create, update, or delete (got '{}')",
                        other.unwrap_or("")
                    )));
                }
            };
            let purpose = file
                .get("purpose")
                .and_then(|v| v.as_str())
                .unwrap_or_default();

            // Nested paths do not go through the executor's guard pass.
            let resolved = resolve_allowed(ctx, Path::new(raw_path))?;
            actions.push(FileAction::new(resolved, action, purpose));
        }

        let session_token = ctx.session_token()?;
        let outcome = ctx
            .broker
            .request(session_token, actions, risk, &ctx.auto_approve, &ctx.abort)
            .await;

        match outcome {
            Outcome::Approved { token, expires_at } => Ok(ToolResult::Json(json!({
                "approval_token": token,
                "expires_at": expires_at.to_rfc3339(),
            }))),
            Outcome::Denied => Err(ApprovalError::Denied.into()),
            Outcome::Cancelled => Err(ApprovalError::Cancelled.into()),
        }
    }
}
