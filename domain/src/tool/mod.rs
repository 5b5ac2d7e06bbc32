//! Tool domain module
//!
//! This module defines the core abstractions of the shell's **Tool System**:
//! how capabilities discovered at runtime are described, validated, invoked
//! and published to the turn loop.
//!
//! # Overview
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ ToolSnapshot │───▶│ ToolCall     │───▶│ ToolResult   │
//! │ (immutable)  │    │ (invocation) │    │ (output)     │
//! └──────┬───────┘    └──────────────┘    └──────────────┘
//!        │
//!        └─ "echo_tool" → RegisteredTool { definition, handler, source }
//! ```
//!
//! Every tool is a [`ToolDefinition`] (name, ordered parameter schema,
//! description) paired with a [`ToolHandler`]. The registry in the
//! infrastructure layer never mutates a published [`ToolSnapshot`]; a reload
//! builds a new one with a higher generation and swaps a single reference.
//!
//! # Key Types
//!
//! - [`ToolDefinition`]: schema for a single tool
//! - [`ToolHandler`]: the capability interface a loaded tool satisfies
//! - [`ToolSnapshot`]: immutable name → tool mapping for one turn
//! - [`ToolCall`] / [`ToolResult`]: invocation and outcome
//! - [`ToolLoadError`]: a single unit that failed to load
//! - [`ToolValidator`]: pure argument validation against the schema

pub mod entities;
pub mod handler;
pub mod load_error;
pub mod snapshot;
pub mod traits;
pub mod value_objects;

pub use entities::{ToolCall, ToolDefinition, ToolParameter};
pub use handler::{RegisteredTool, ToolHandler};
pub use load_error::ToolLoadError;
pub use snapshot::ToolSnapshot;
pub use traits::{DefaultToolValidator, ToolValidator};
pub use value_objects::{ToolError, ToolErrorCode, ToolResult};
