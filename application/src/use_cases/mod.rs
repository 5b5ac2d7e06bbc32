//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod agent_shell;
pub(crate) mod tool_helpers;
pub mod tool_invoker;
