//! Onboarding: the one tool callable without a session.

use crate::approval::RiskLevel;
use crate::tool::{BoundArgs, CallContext, ParamSpec, Tool, ToolError, ToolResult};
use async_trait::async_trait;
use serde_json::json;

/// Operating instructions handed to the client alongside its token.
const INSTRUCTIONS: &str = "\
You are connected to scout, a filesystem server with human-in-the-loop \
approval. Pass the session_token returned here on every subsequent tool \
call. Read-only tools (read_files, search_files, list_directory, \
get_file_metadata, analyze_file, get_config) run immediately. Mutating \
tools additionally require an approval_token: first call request_approval \
with the full list of planned file actions, wait for the user's decision, \
then pass the returned token to the mutating tool. Approval tokens are \
single-use and expire after five minutes. Only paths under the server's \
allow-listed roots are accessible.";

pub struct StartSessionTool;

#[async_trait]
impl Tool for StartSessionTool {
    fn name(&self) -> &'static str {
        "start_session"
    }

    fn description(&self) -> &'static str {
        "Start a session and receive the server's operating instructions"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn params(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    fn requires_session(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        _args: &BoundArgs,
        ctx: &CallContext,
    ) -> Result<ToolResult, ToolError> {
        let session = ctx.sessions.create().await;
        tracing::info!(token = %session.token, "session started");
        Ok(ToolResult::Json(json!({
            "session_token": session.token,
            "expires_at": session.expires_at.to_rfc3339(),
            "instructions": INSTRUCTIONS,
        })))
    }
}
