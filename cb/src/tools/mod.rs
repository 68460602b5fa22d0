//! Tool system for the connector-building agent
//!
//! Built-in tools read and mutate the turn's session (manifest text, form
//! fields, task list). Remote tools proxy to the external tool backend. Each
//! turn gets a `ToolContext` wrapping its session.

mod context;
mod error;
mod executor;
mod remote;
mod traits;

pub mod builtin;

pub use context::ToolContext;
pub use error::ToolError;
pub use executor::ToolExecutor;
pub use remote::RemoteTool;
pub use traits::{Tool, ToolResult};
