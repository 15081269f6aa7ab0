//! Recursive metadata search under a root.

use crate::approval::RiskLevel;
use crate::tool::builtin::read::compile_glob;
use crate::tool::builtin::{resolved_path, session_param};
use crate::tool::{BoundArgs, CallContext, ParamSpec, Tool, ToolError, ToolResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ignore::WalkBuilder;
use serde_json::{Value, json};

pub struct SearchFilesTool;

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &'static str {
        "search_files"
    }

    fn description(&self) -> &'static str {
        "Find files and directories under a root, with name and extension filters"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            session_param(),
            ParamSpec::string("filepath", "directory to search").required().path(),
            ParamSpec::string("pattern", "only include names matching this glob"),
            ParamSpec::string("extension", "only include files with this extension"),
            ParamSpec::bool("recursive", "descend into subdirectories").default_value(json!(true)),
        ]
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let root = resolved_path(args, ctx, "filepath")?;
        if !root.is_dir() {
            return Err(ToolError::InvalidArgs(format!(
                "not a directory: {}",
                root.display()
            )));
        }

        let name_glob = compile_glob(args, "pattern")?;
        let extension = args
            .str("extension")
            .map(|e| e.trim_start_matches('.').to_string());
        let recursive = args.flag("recursive").unwrap_or(true);

        let entries = tokio::task::spawn_blocking(move || {
            // Pre-order depth-first, directory entries sorted byte-wise by
            // name; this ordering is part of the tool's contract.
            let walker = WalkBuilder::new(&root)
                .standard_filters(false)
                .sort_by_file_name(|a, b| a.cmp(b))
                .max_depth(if recursive { None } else { Some(1) })
                .build();

            let mut out = Vec::new();
            for entry in walker.flatten() {
                let path = entry.path();
                if path == root {
                    continue;
                }
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                if let Some(ext) = &extension {
                    if is_dir || path.extension().and_then(|e| e.to_str()) != Some(ext.as_str()) {
                        continue;
                    }
                }
                if let Some(glob) = &name_glob
                    && !path.file_name().is_some_and(|n| glob.is_match(n))
                {
                    continue;
                }

                let meta = entry.metadata().ok();
                let modified = meta
                    .as_ref()
                    .and_then(|m| m.modified().ok())
                    .map(|t| DateTime::<Utc>::from(t).to_rfc3339());
                out.push(json!({
                    "path": path.display().to_string(),
                    "name": entry.file_name().to_string_lossy(),
                    "size": meta.as_ref().map_or(0, std::fs::Metadata::len),
                    "modified": modified,
                    "is_dir": is_dir,
                }));
            }
            out
        })
        .await
        .map_err(|e| ToolError::Execution(e.to_string()))?;

        Ok(ToolResult::Json(json!({
            "count": entries.len(),
            "entries": Value::Array(entries),
        })))
    }
}
