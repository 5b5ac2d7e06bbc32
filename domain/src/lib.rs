//! Domain layer for agentsh
//!
//! This crate contains the core types of the shell: tool definitions and the
//! immutable tool snapshots handed to each turn, plus session keys and the
//! append-only session records persisted between invocations.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Tools
//!
//! A tool is a [`ToolDefinition`] (name, ordered parameter schema,
//! description) paired with a [`ToolHandler`]. Loaded tools are published as
//! a [`ToolSnapshot`]: once a turn holds a snapshot, reloads never change it.
//!
//! ## Sessions
//!
//! A [`SessionKey`] is derived from a prefix and the current hour, so every
//! invocation within the same hour resumes the same [`SessionRecord`].

pub mod core;
pub mod session;
pub mod tool;

// Re-export commonly used types
pub use core::error::DomainError;
pub use session::{
    clock::{Clock, FixedClock, SystemClock},
    key::SessionKey,
    record::{SessionRecord, ToolInvocation, Turn, TurnRole},
};
pub use tool::{
    entities::{KNOWN_PARAM_TYPES, ToolCall, ToolDefinition, ToolParameter},
    handler::{RegisteredTool, ToolHandler},
    load_error::ToolLoadError,
    snapshot::ToolSnapshot,
    traits::{DefaultToolValidator, ToolValidator},
    value_objects::{ToolError, ToolErrorCode, ToolResult, ToolResultMetadata},
};
