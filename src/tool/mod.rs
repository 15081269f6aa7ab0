//! The tool framework: trait, registry, and per-call context.

pub mod builtin;
pub mod params;

pub use params::{BoundArgs, ParamError, ParamKind, ParamSpec, bind, to_input_schema};

use crate::approval::{ApprovalBroker, ApprovalError, FileAction, RiskLevel};
use crate::config::Config;
use crate::edit::EditError;
use crate::guard::PathGuard;
use crate::session::SessionStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid or expired session token")]
    InvalidSession,

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("{0}")]
    InvalidArgs(String),

    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error("{path}: {message}")]
    Io { path: String, message: String },

    #[error("Execution failed: {0}")]
    Execution(String),
}

impl ToolError {
    #[must_use]
    pub fn io(path: &Path, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// What a successful tool call hands back to the transport.
#[derive(Debug, Clone)]
pub enum ToolResult {
    Text(String),
    Json(serde_json::Value),
}

/// Everything a tool may touch during one `tools/call`.
///
/// The context is built per call; `auto_approve` is the "approve similar"
/// bit an `all` answer sets, and it dies with the call.
pub struct CallContext {
    pub config: Arc<Config>,
    pub guard: PathGuard,
    pub sessions: Arc<SessionStore>,
    pub broker: Arc<ApprovalBroker>,
    pub session_token: Option<String>,
    pub auto_approve: AtomicBool,
    pub abort: CancellationToken,
}

impl CallContext {
    /// Token of the session this call authenticated with. Tools behind the
    /// session gate can rely on it being present.
    pub fn session_token(&self) -> Result<&str, ToolError> {
        self.session_token.as_deref().ok_or(ToolError::InvalidSession)
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;

    /// Risk is a property of the tool, assigned here, never per call.
    fn risk(&self) -> RiskLevel;

    fn params(&self) -> Vec<ParamSpec>;

    /// Only the onboarding tool opts out.
    fn requires_session(&self) -> bool {
        true
    }

    /// The mutations this call would perform, for approval-token matching.
    /// Empty means the call mutates nothing (read-only tools, previews).
    fn planned_actions(&self, _args: &BoundArgs, _ctx: &CallContext) -> Vec<FileAction> {
        Vec::new()
    }

    async fn execute(&self, args: &BoundArgs, ctx: &CallContext) -> Result<ToolResult, ToolError>;
}

/// Ordered, name-keyed tool table. Registration order is the enumeration
/// order for `tools/list`; a name collision is a programming error.
#[derive(Default)]
pub struct Registry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<&'static str, usize>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name();
        assert!(
            !self.by_name.contains_key(name),
            "duplicate tool name: {name}"
        );
        self.by_name.insert(name, self.tools.len());
        self.tools.push(tool);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.by_name.get(name).map(|&i| Arc::clone(&self.tools[i]))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
