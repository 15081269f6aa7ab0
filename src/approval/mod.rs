//! Human-in-the-loop approval for mutating operations.
//!
//! The broker renders a prompt on the user channel (never the MCP stdio
//! channels), collects a single-character answer, and mints a short-lived,
//! single-use approval token bound to the approved file actions. Consumption
//! verifies the binding before any mutating tool runs.

pub mod prompt;

pub use prompt::{ApprovalPrompter, PromptAnswer, TerminalPrompter};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Approval tokens expire five minutes after issue.
const APPROVAL_TTL_SECS: i64 = 300;

/// Severity assigned to a tool at registration time, not per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileActionKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for FileActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// One planned mutation, shown to the human for review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAction {
    pub path: PathBuf,
    pub action: FileActionKind,
    pub purpose: String,
}

impl FileAction {
    #[must_use]
    pub fn new(path: PathBuf, action: FileActionKind, purpose: impl Into<String>) -> Self {
        Self {
            path,
            action,
            purpose: purpose.into(),
        }
    }

    /// Whether `other` is covered by this approved action. The purpose text
    /// is informational and excluded from matching.
    #[must_use]
    pub fn covers(&self, other: &FileAction) -> bool {
        self.path == other.path && self.action == other.action
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("approval required")]
    Required,

    #[error("denied by user")]
    Denied,

    #[error("cancelled by user")]
    Cancelled,

    #[error("invalid approval token")]
    UnknownToken,

    #[error("approval token already used")]
    AlreadyUsed,

    #[error("approval token expired")]
    Expired,

    #[error("approval token bound to a different session")]
    SessionMismatch,

    #[error("approval token does not cover {0}")]
    ActionMismatch(String),
}

/// Result of asking the human.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Approved { token: String, expires_at: DateTime<Utc> },
    Denied,
    Cancelled,
}

#[derive(Debug)]
struct Grant {
    session_token: String,
    actions: Vec<FileAction>,
    issued_at: DateTime<Utc>,
    used: bool,
}

impl Grant {
    fn is_expired(&self) -> bool {
        Utc::now() - self.issued_at > Duration::seconds(APPROVAL_TTL_SECS)
    }
}

/// Process-wide broker. Only a single prompt may be in flight at a time;
/// concurrent requests queue on the prompt gate in arrival order.
pub struct ApprovalBroker {
    prompter: Arc<dyn ApprovalPrompter>,
    prompt_gate: Mutex<()>,
    grants: Mutex<HashMap<String, Grant>>,
}

impl ApprovalBroker {
    #[must_use]
    pub fn new(prompter: Arc<dyn ApprovalPrompter>) -> Self {
        Self {
            prompter,
            prompt_gate: Mutex::new(()),
            grants: Mutex::new(HashMap::new()),
        }
    }

    /// Ask the human to approve `actions` and mint a token on yes.
    ///
    /// `auto_approve` is the per-call "approve similar" bit: when set by an
    /// earlier `all` answer it suppresses the prompt for the rest of the
    /// current `tools/call`. It never outlives the call. `abort` maps an
    /// interrupt during the prompt to [`Outcome::Cancelled`].
    pub async fn request(
        &self,
        session_token: &str,
        actions: Vec<FileAction>,
        risk: RiskLevel,
        auto_approve: &AtomicBool,
        abort: &CancellationToken,
    ) -> Outcome {
        if auto_approve.load(Ordering::Relaxed) {
            tracing::debug!(count = actions.len(), "auto-approving (all chosen earlier)");
            return self.mint(session_token, actions).await;
        }

        let _gate = self.prompt_gate.lock().await;
        loop {
            let answer = tokio::select! {
                answer = self.prompter.ask(risk, &actions) => answer,
                () = abort.cancelled() => return Outcome::Cancelled,
            };
            match answer {
                PromptAnswer::Yes => return self.mint(session_token, actions).await,
                PromptAnswer::All => {
                    auto_approve.store(true, Ordering::Relaxed);
                    return self.mint(session_token, actions).await;
                }
                PromptAnswer::No => return Outcome::Denied,
                PromptAnswer::Cancel => return Outcome::Cancelled,
                PromptAnswer::Delay => {
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            }
        }
    }

    async fn mint(&self, session_token: &str, actions: Vec<FileAction>) -> Outcome {
        let token = crate::session::generate_token();
        let issued_at = Utc::now();
        let expires_at = issued_at + Duration::seconds(APPROVAL_TTL_SECS);
        self.grants.lock().await.insert(
            token.clone(),
            Grant {
                session_token: session_token.to_string(),
                actions,
                issued_at,
                used: false,
            },
        );
        Outcome::Approved { token, expires_at }
    }

    /// Consume a token for a concrete set of actions.
    ///
    /// Single use: the grant is burned even when the action check fails, so
    /// a rejected token cannot be retried against a different action set.
    pub async fn consume(
        &self,
        token: &str,
        session_token: &str,
        required: &[FileAction],
    ) -> Result<(), ApprovalError> {
        let mut grants = self.grants.lock().await;
        let grant = grants.get_mut(token).ok_or(ApprovalError::UnknownToken)?;

        if grant.used {
            return Err(ApprovalError::AlreadyUsed);
        }
        grant.used = true;

        if grant.is_expired() {
            return Err(ApprovalError::Expired);
        }
        if grant.session_token != session_token {
            return Err(ApprovalError::SessionMismatch);
        }
        for action in required {
            if !grant.actions.iter().any(|approved| approved.covers(action)) {
                return Err(ApprovalError::ActionMismatch(format!(
                    "{} {}",
                    action.action,
                    action.path.display()
                )));
            }
        }
        Ok(())
    }

    /// Drop expired grants. Used grants stay until expiry so a replayed
    /// token still reports "already used" rather than "invalid".
    pub async fn sweep(&self) {
        self.grants.lock().await.retain(|_, grant| !grant.is_expired());
    }
}
