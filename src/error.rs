use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tool error: {0}")]
    Tool(#[from] crate::tool::ToolError),

    #[error("Edit error: {0}")]
    Edit(#[from] crate::edit::EditError),

    #[error("Approval error: {0}")]
    Approval(#[from] crate::approval::ApprovalError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
