//! Directory listing with include/exclude globs.

use crate::approval::RiskLevel;
use crate::tool::builtin::read::compile_glob;
use crate::tool::builtin::{resolved_path, session_param};
use crate::tool::{BoundArgs, CallContext, ParamSpec, Tool, ToolError, ToolResult};
use async_trait::async_trait;
use ignore::WalkBuilder;
use serde_json::json;

pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &'static str {
        "list_directory"
    }

    fn description(&self) -> &'static str {
        "List a directory, one level or depth-N, honoring ignore files"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            session_param(),
            ParamSpec::string("filepath", "directory to list").required().path(),
            ParamSpec::int("depth", "maximum depth to descend").default_value(json!(1)),
            ParamSpec::string("include", "only include paths matching this glob"),
            ParamSpec::string("exclude", "skip paths matching this glob"),
            ParamSpec::bool("include_hidden", "include dotfiles"),
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

        let depth = usize::try_from(args.int("depth").unwrap_or(1))
            .map_err(|_| ToolError::InvalidArgs("argument 'depth' must be a positive integer".into()))?;
        let include = compile_glob(args, "include")?;
        let exclude = compile_glob(args, "exclude")?;
        let include_hidden = args.flag("include_hidden").unwrap_or(false);

        let entries = tokio::task::spawn_blocking(move || {
            let walker = WalkBuilder::new(&root)
                .hidden(!include_hidden)
                .git_ignore(true)
                .git_global(true)
                .git_exclude(true)
                .max_depth(Some(depth))
                .build();

            let mut entries = Vec::new();
            for entry in walker.flatten() {
                let path = entry.path();
                if path == root {
                    continue;
                }
                let relative = path.strip_prefix(&root).unwrap_or(path);
                if let Some(include) = &include
                    && !include.is_match(relative)
                {
                    continue;
                }
                if let Some(exclude) = &exclude
                    && exclude.is_match(relative)
                {
                    continue;
                }
                let display = relative.to_string_lossy().into_owned();
                if entry.file_type().is_some_and(|t| t.is_dir()) {
                    entries.push(format!("{display}/"));
                } else {
                    entries.push(display);
                }
            }
            entries.sort();
            entries
        })
        .await
        .map_err(|e| ToolError::Execution(e.to_string()))?;

        Ok(ToolResult::Json(json!({
            "count": entries.len(),
            "entries": entries,
        })))
    }
}
