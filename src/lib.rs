//! Sandbox MCP Bridge - MCP tools for a remote sandbox-management API.
//!
//! This crate exposes a fixed catalogue of Model Context Protocol tools. Each
//! tool turns its typed input into exactly one HTTP request against the
//! sandbox API (control plane or the agent inside a sandbox) and turns the
//! response back into text.
//!
//! Callers authenticate per request with `Authorization: Bearer <token>`. The
//! token is bound to the handling of that request only (see [`credential`]),
//! so concurrent callers never see each other's credentials.
//!
//! # Example
//!
//! ```no_run
//! use sandbox_mcp_bridge::{client::{ApiClient, ApiConfig}, server, tools::SandboxTools};
//!
//! #[tokio::main]
//! async fn main() -> miette::Result<()> {
//!     let client = ApiClient::new(ApiConfig::default())?;
//!     let tools = SandboxTools::new(client);
//!
//!     server::run_http(tools, "127.0.0.1:8080".parse().unwrap(), "/mcp").await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod credential;
pub mod error;
pub mod server;
pub mod tools;

// Re-export commonly used types
pub use client::{ApiClient, ApiConfig};
pub use credential::Credential;
pub use error::{Error, Result, ToolError};
pub use tools::SandboxTools;
