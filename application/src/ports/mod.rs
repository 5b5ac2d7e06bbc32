//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure and presentation adapters
//! must implement.

pub mod reasoning_runtime;
pub mod session_store;
pub mod shell_events;
pub mod tool_source;
