//! Multi-path file reading with filters and size caps.

use crate::approval::RiskLevel;
use crate::edit::looks_binary;
use crate::tool::builtin::{resolve_allowed, session_param};
use crate::tool::{BoundArgs, CallContext, ParamSpec, Tool, ToolError, ToolResult};
use async_trait::async_trait;
use globset::{Glob, GlobMatcher};
use ignore::WalkBuilder;
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};

/// Per-file cap. Larger files are rejected, not truncated.
const MAX_FILE_BYTES: u64 = 1024 * 1024;
/// Cap across one whole call.
const MAX_TOTAL_BYTES: u64 = 8 * 1024 * 1024;
/// Directory recursion ceiling when `recursive` is set.
const DEFAULT_MAX_DEPTH: i64 = 10;

pub struct ReadFilesTool;

#[async_trait]
impl Tool for ReadFilesTool {
    fn name(&self) -> &'static str {
        "read_files"
    }

    fn description(&self) -> &'static str {
        "Read one or more files, or expand directories into their files"
    }

    fn risk(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn params(&self) -> Vec<ParamSpec> {
        vec![
            session_param(),
            ParamSpec::string_array("paths", "files or directories to read")
                .required()
                .path(),
            ParamSpec::bool("recursive", "expand directories recursively"),
            ParamSpec::int("max_depth", "directory expansion depth")
                .default_value(json!(DEFAULT_MAX_DEPTH)),
            ParamSpec::string("extension", "only include files with this extension"),
            ParamSpec::string("pattern", "only include file names matching this glob"),
            ParamSpec::string("exclude", "skip paths matching this glob"),
        ]
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError> {
        let paths = args
            .str_list("paths")
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ToolError::InvalidArgs("required argument 'paths' not found".into()))?;

        let filter = FileFilter::from_args(args)?;
        let recursive = args.flag("recursive").unwrap_or(false);
        let max_depth = if recursive {
            usize::try_from(args.int("max_depth").unwrap_or(DEFAULT_MAX_DEPTH))
                .map_err(|_| ToolError::InvalidArgs("argument 'max_depth' must be a positive integer".into()))?
        } else {
            1
        };

        let mut out = Map::new();
        let mut budget = MAX_TOTAL_BYTES;
        for raw in paths {
            let resolved = resolve_allowed(ctx, Path::new(raw))?;
            let value = if resolved.is_dir() {
                read_directory(&resolved, max_depth, &filter, &mut budget).await?
            } else {
                read_file(&resolved, &mut budget).await?
            };
            out.insert(raw.to_string(), value);
        }

        Ok(ToolResult::Json(Value::Object(out)))
    }
}

struct FileFilter {
    extension: Option<String>,
    name: Option<GlobMatcher>,
    exclude: Option<GlobMatcher>,
}

impl FileFilter {
    fn from_args(args: &BoundArgs) -> Result<Self, ToolError> {
        Ok(Self {
            extension: args
                .str("extension")
                .map(|e| e.trim_start_matches('.').to_string()),
            name: compile_glob(args, "pattern")?,
            exclude: compile_glob(args, "exclude")?,
        })
    }

    fn admits(&self, path: &Path) -> bool {
        if let Some(ext) = &self.extension
            && path.extension().and_then(|e| e.to_str()) != Some(ext.as_str())
        {
            return false;
        }
        if let Some(name) = &self.name
            && !path.file_name().is_some_and(|n| name.is_match(n))
        {
            return false;
        }
        if let Some(exclude) = &self.exclude
            && exclude.is_match(path)
        {
            return false;
        }
        true
    }
}

pub(crate) fn compile_glob(
    args: &BoundArgs,
    name: &str,
) -> Result<Option<GlobMatcher>, ToolError> {
    args.str(name)
        .map(|pattern| {
            Glob::new(pattern)
                .map(|g| g.compile_matcher())
                .map_err(|e| {
                    ToolError::InvalidArgs(format!("invalid glob in '{name}': {e}"))
                })
        })
        .transpose()
}

async fn read_file(path: &Path, budget: &mut u64) -> Result<Value, ToolError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|e| ToolError::io(path, &e))?;
    charge(path, meta.len(), budget)?;

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ToolError::io(path, &e))?;
    let binary = looks_binary(&bytes);
    Ok(json!({
        "size": bytes.len(),
        "binary": binary,
        "content": String::from_utf8_lossy(&bytes),
    }))
}

async fn read_directory(
    root: &Path,
    max_depth: usize,
    filter: &FileFilter,
    budget: &mut u64,
) -> Result<Value, ToolError> {
    let files = collect_files(root.to_path_buf(), max_depth).await?;

    let mut entries = Map::new();
    for path in files {
        if !filter.admits(&path) {
            continue;
        }
        let key = path
            .strip_prefix(root)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();
        entries.insert(key, read_file(&path, budget).await?);
    }
    Ok(json!({ "files": entries }))
}

/// Pre-order walk, entries sorted by name at each level.
async fn collect_files(root: PathBuf, max_depth: usize) -> Result<Vec<PathBuf>, ToolError> {
    tokio::task::spawn_blocking(move || {
        let walker = WalkBuilder::new(&root)
            .standard_filters(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .max_depth(Some(max_depth))
            .build();
        let mut files = Vec::new();
        for entry in walker.flatten() {
            if entry.file_type().is_some_and(|t| t.is_file()) {
                files.push(entry.into_path());
            }
        }
        files
    })
    .await
    .map_err(|e| ToolError::Execution(e.to_string()))
}

fn charge(path: &Path, len: u64, budget: &mut u64) -> Result<(), ToolError> {
    if len > MAX_FILE_BYTES {
        return Err(ToolError::Execution(format!(
            "file too large: {} ({len} bytes, cap {MAX_FILE_BYTES})",
            path.display()
        )));
    }
    if len > *budget {
        return Err(ToolError::Execution(format!(
            "total size cap exceeded at {} (cap {MAX_TOTAL_BYTES} bytes)",
            path.display()
        )));
    }
    *budget -= len;
    Ok(())
}
