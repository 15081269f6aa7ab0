//! The server object: shared state plus the tool-call pipeline.

pub mod transport;

use crate::approval::{ApprovalBroker, ApprovalError, ApprovalPrompter, RiskLevel};
use crate::config::Config;
use crate::session::SessionStore;
use crate::tool::{
    self, BoundArgs, CallContext, ParamKind, Registry, Tool, ToolError, ToolResult,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

pub struct Server {
    config: RwLock<Arc<Config>>,
    config_path: PathBuf,
    config_explicit: bool,
    sessions: Arc<SessionStore>,
    broker: Arc<ApprovalBroker>,
    registry: Registry,
    /// Cancellation handle for the call currently holding the dispatcher,
    /// so an interrupt can turn a pending approval prompt into `cancelled`.
    current_call: StdMutex<Option<CancellationToken>>,
}

impl Server {
    #[must_use]
    pub fn new(
        config: Config,
        config_path: PathBuf,
        config_explicit: bool,
        prompter: Arc<dyn ApprovalPrompter>,
    ) -> Self {
        let mut registry = Registry::new();
        tool::builtin::register_builtins(&mut registry);
        Self {
            config: RwLock::new(Arc::new(config)),
            config_path,
            config_explicit,
            sessions: Arc::new(SessionStore::new()),
            broker: Arc::new(ApprovalBroker::new(prompter)),
            registry,
            current_call: StdMutex::new(None),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub async fn config(&self) -> Arc<Config> {
        Arc::clone(&*self.config.read().await)
    }

    /// Reload the config file and swap the whole snapshot under the write
    /// lock. In-flight calls keep the snapshot they started with; the
    /// session store is deliberately untouched.
    pub async fn reload_config(&self) -> anyhow::Result<()> {
        let fresh = Config::load(&self.config_path, self.config_explicit)?;
        *self.config.write().await = Arc::new(fresh);
        tracing::info!(path = %self.config_path.display(), "configuration reloaded");
        Ok(())
    }

    /// Cancel whatever call currently holds the dispatcher (SIGINT path).
    pub fn interrupt(&self) {
        if let Some(token) = self.current_call.lock().unwrap().as_ref() {
            token.cancel();
        }
    }

    fn begin_call(&self) -> CancellationToken {
        let token = CancellationToken::new();
        *self.current_call.lock().unwrap() = Some(token.clone());
        token
    }

    fn end_call(&self) {
        *self.current_call.lock().unwrap() = None;
    }

    /// The `tools/call` pipeline: resolve, session check, bind, path guard,
    /// risk check, execute.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<ToolResult, ToolError> {
        let Some(tool) = self.registry.get(name) else {
            return Err(ToolError::InvalidArgs(format!("unknown tool: {name}")));
        };

        let abort = self.begin_call();
        let result = self.run_pipeline(&tool, arguments, abort).await;
        self.end_call();
        self.broker.sweep().await;
        result
    }

    async fn run_pipeline(
        &self,
        tool: &Arc<dyn Tool>,
        arguments: &serde_json::Map<String, serde_json::Value>,
        abort: CancellationToken,
    ) -> Result<ToolResult, ToolError> {
        // Session check precedes parameter binding so an unauthenticated
        // caller learns nothing about the tool's schema.
        let session_token = if tool.requires_session() {
            let token = arguments
                .get("session_token")
                .and_then(|v| v.as_str())
                .ok_or(ToolError::InvalidSession)?;
            if self.sessions.get(token).await.is_none() {
                return Err(ToolError::InvalidSession);
            }
            self.sessions.touch(token).await;
            Some(token.to_string())
        } else {
            None
        };

        let specs = tool.params();
        let args = tool::bind(&specs, arguments).map_err(|errors| {
            ToolError::InvalidArgs(
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;

        let config = self.config().await;
        let ctx = CallContext {
            guard: config.guard(),
            config,
            sessions: Arc::clone(&self.sessions),
            broker: Arc::clone(&self.broker),
            session_token,
            auto_approve: AtomicBool::new(false),
            abort,
        };

        self.check_paths(&specs, &args, &ctx)?;

        if tool.risk() >= RiskLevel::Medium {
            let actions = tool.planned_actions(&args, &ctx);
            if !actions.is_empty() {
                let approval_token = args
                    .str("approval_token")
                    .ok_or(ToolError::Approval(ApprovalError::Required))?;
                let session = ctx.session_token()?;
                self.broker
                    .consume(approval_token, session, &actions)
                    .await?;
            }
        }

        tool.execute(&args, &ctx).await
    }

    /// Uniform containment check over every declared path parameter.
    fn check_paths(
        &self,
        specs: &[crate::tool::ParamSpec],
        args: &BoundArgs,
        ctx: &CallContext,
    ) -> Result<(), ToolError> {
        for spec in specs {
            if !spec.is_path {
                continue;
            }
            match &spec.kind {
                ParamKind::String => {
                    if let Some(raw) = args.str(spec.name)
                        && !ctx.guard.allowed(Path::new(raw))
                    {
                        return Err(ToolError::AccessDenied(raw.to_string()));
                    }
                }
                ParamKind::StringArray => {
                    for raw in args.str_list(spec.name).unwrap_or_default() {
                        if !ctx.guard.allowed(Path::new(raw)) {
                            return Err(ToolError::AccessDenied(raw.to_string()));
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }
}
