use crate::approval::RiskLevel;
use crate::tool::builtin::session_param;
use crate::tool::{BoundArgs, CallContext, ParamSpec, Tool, ToolError, ToolResult};
use async_trait::async_trait;

pub struct GetConfigTool;

#[async_trait]
impl Tool for GetConfigTool {
    fn name(&self) -> &'static str {
        "get_config"
    }

    fn description(&self) -> &'static str {
        "Show the server configuration, including the allow-listed roots"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![session_param()]
    }

    async fn execute(
        &self,
        _args: &BoundArgs,
        ctx: &CallContext,
    ) -> Result<ToolResult, ToolError> {
        Ok(ToolResult::Json(ctx.config.to_map()))
    }
}
