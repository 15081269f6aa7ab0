#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod approval;
pub mod cli;
pub mod config;
pub mod edit;
pub mod error;
pub mod guard;
pub mod server;
pub mod session;
pub mod tool;

/// MCP protocol revision this server speaks. `initialize` rejects anything else.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name reported in `initialize` and used for config discovery.
pub const SERVER_NAME: &str = "scout";
