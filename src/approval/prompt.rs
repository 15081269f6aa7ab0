//! The human side of the approval broker.
//!
//! The prompt is a collaborator separate from the MCP transport so the two
//! byte channels can be mocked independently: JSON-RPC frames stay on
//! stdin/stdout, prompts go to stderr and answers come from the controlling
//! terminal.

use crate::approval::{FileAction, RiskLevel};
use async_trait::async_trait;
use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::collections::VecDeque;
use std::io::{IsTerminal, Write};
use std::sync::Mutex;

/// One keypress worth of answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAnswer {
    Yes,
    No,
    All,
    Delay,
    Cancel,
}

#[async_trait]
pub trait ApprovalPrompter: Send + Sync {
    async fn ask(&self, risk: RiskLevel, actions: &[FileAction]) -> PromptAnswer;
}

/// Render the prompt text shown to the human.
#[must_use]
pub fn render_prompt(risk: RiskLevel, actions: &[FileAction]) -> String {
    let mut out = format!("\nscout: approval requested (risk: {risk})\n");
    for action in actions {
        out.push_str(&format!(
            "  {:<6} {}  ({})\n",
            action.action.to_string(),
            action.path.display(),
            action.purpose
        ));
    }
    out.push_str("[y]es / [n]o / [a]ll / [d]elay / [c]ancel: ");
    out
}

fn map_char(c: char) -> Option<PromptAnswer> {
    match c.to_ascii_lowercase() {
        'y' => Some(PromptAnswer::Yes),
        'n' => Some(PromptAnswer::No),
        'a' => Some(PromptAnswer::All),
        'd' => Some(PromptAnswer::Delay),
        'c' => Some(PromptAnswer::Cancel),
        _ => None,
    }
}

/// Restores cooked mode on every exit path, including panics.
struct RawModeGuard;

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Prompts on stderr and reads a single key from the controlling terminal.
///
/// Raw mode is used when a terminal is present (crossterm falls back to
/// `/dev/tty` when stdin is a pipe, which it always is under MCP). Without
/// a terminal the prompt degrades to a line read from `/dev/tty`, and with
/// no tty at all the request is denied.
pub struct TerminalPrompter;

#[async_trait]
impl ApprovalPrompter for TerminalPrompter {
    async fn ask(&self, risk: RiskLevel, actions: &[FileAction]) -> PromptAnswer {
        let rendered = render_prompt(risk, actions);
        tokio::task::spawn_blocking(move || ask_blocking(&rendered))
            .await
            .unwrap_or(PromptAnswer::Cancel)
    }
}

fn ask_blocking(rendered: &str) -> PromptAnswer {
    let mut stderr = std::io::stderr();
    let _ = stderr.write_all(rendered.as_bytes());
    let _ = stderr.flush();

    let answer = if stderr.is_terminal() && terminal::enable_raw_mode().is_ok() {
        let _guard = RawModeGuard;
        read_key()
    } else {
        read_line_fallback()
    };

    // Echo the decision so the menu line is not left dangling.
    let _ = writeln!(
        stderr,
        "{}",
        match answer {
            PromptAnswer::Yes => "yes",
            PromptAnswer::No => "no",
            PromptAnswer::All => "all",
            PromptAnswer::Delay => "delay",
            PromptAnswer::Cancel => "cancel",
        }
    );
    answer
}

fn read_key() -> PromptAnswer {
    loop {
        match crossterm::event::read() {
            Ok(Event::Key(key)) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match key.code {
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return PromptAnswer::Cancel;
                    }
                    KeyCode::Esc => return PromptAnswer::Cancel,
                    KeyCode::Char(c) => {
                        if let Some(answer) = map_char(c) {
                            return answer;
                        }
                    }
                    _ => {}
                }
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(%err, "terminal read failed");
                return PromptAnswer::Cancel;
            }
        }
    }
}

fn read_line_fallback() -> PromptAnswer {
    #[cfg(unix)]
    if let Ok(tty) = std::fs::File::open("/dev/tty") {
        use std::io::BufRead;
        let mut line = String::new();
        let mut reader = std::io::BufReader::new(tty);
        if reader.read_line(&mut line).is_ok()
            && let Some(c) = line.trim().chars().next()
        {
            return map_char(c).unwrap_or(PromptAnswer::No);
        }
        return PromptAnswer::Cancel;
    }

    tracing::warn!("no controlling terminal available; denying approval request");
    PromptAnswer::No
}

/// Always returns the same answer. Used for headless operation and tests.
pub struct StaticPrompter(pub PromptAnswer);

#[async_trait]
impl ApprovalPrompter for StaticPrompter {
    async fn ask(&self, _risk: RiskLevel, _actions: &[FileAction]) -> PromptAnswer {
        self.0
    }
}

/// Replays a fixed sequence of answers; panics when over-asked. Test helper.
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<PromptAnswer>>,
}

impl ScriptedPrompter {
    #[must_use]
    pub fn new(answers: Vec<PromptAnswer>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
        }
    }
}

#[async_trait]
impl ApprovalPrompter for ScriptedPrompter {
    async fn ask(&self, _risk: RiskLevel, _actions: &[FileAction]) -> PromptAnswer {
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .expect("prompter asked more times than scripted")
    }
}

/// Never answers. Exercises the interrupt path in tests.
pub struct PendingPrompter;

#[async_trait]
impl ApprovalPrompter for PendingPrompter {
    async fn ask(&self, _risk: RiskLevel, _actions: &[FileAction]) -> PromptAnswer {
        std::future::pending().await
    }
}
