//! Read-only file inspection: stat view and content analysis.

use crate::approval::RiskLevel;
use crate::edit::{Eol, looks_binary, sha256_hex};
use crate::tool::builtin::{resolved_path, session_param};
use crate::tool::{BoundArgs, CallContext, ParamSpec, Tool, ToolError, ToolResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::time::SystemTime;

fn rfc3339(time: std::io::Result<SystemTime>) -> Option<String> {
    time.ok().map(|t| DateTime::<Utc>::from(t).to_rfc3339())
}

pub struct GetFileMetadataTool;

#[async_trait]
impl Tool for GetFileMetadataTool {
    fn name(&self) -> &'static str {
        "get_file_metadata"
    }

    fn description(&self) -> &'static str {
        "Stat a file or directory"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            session_param(),
            ParamSpec::string("filepath", "path to inspect").required().path(),
        ]
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let path = resolved_path(args, ctx, "filepath")?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| ToolError::io(&path, &e))?;

        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::MetadataExt;
            Some(format!("{:o}", meta.mode() & 0o7777))
        };
        #[cfg(not(unix))]
        let mode: Option<String> = None;

        Ok(ToolResult::Json(json!({
            "path": path.display().to_string(),
            "size": meta.len(),
            "is_dir": meta.is_dir(),
            "is_file": meta.is_file(),
            "readonly": meta.permissions().readonly(),
            "mode": mode,
            "modified": rfc3339(meta.modified()),
            "created": rfc3339(meta.created()),
        })))
    }
}

pub struct AnalyzeFileTool;

#[async_trait]
impl Tool for AnalyzeFileTool {
    fn name(&self) -> &'static str {
        "analyze_file"
    }

    fn description(&self) -> &'static str {
        "Report size, line count, line endings, and SHA-256 of a file"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            session_param(),
            ParamSpec::string("filepath", "file to analyze").required().path(),
        ]
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let path = resolved_path(args, ctx, "filepath")?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ToolError::io(&path, &e))?;

        let binary = looks_binary(&bytes);
        let (lines, eol) = if binary {
            (None, None)
        } else {
            let text = String::from_utf8_lossy(&bytes);
            let eol = match Eol::detect(&text) {
                Eol::Lf => "lf",
                Eol::CrLf => "crlf",
            };
            (Some(crate::edit::Buffer::parse(&text).line_count()), Some(eol))
        };

        // The digest pairs with expected_sha256 on the edit tools.
        Ok(ToolResult::Json(json!({
            "path": path.display().to_string(),
            "size": bytes.len(),
            "binary": binary,
            "lines": lines,
            "eol": eol,
            "sha256": sha256_hex(&bytes),
        })))
    }
}
