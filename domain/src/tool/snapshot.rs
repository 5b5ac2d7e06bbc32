//! Immutable tool set published to turns

use super::entities::ToolDefinition;
use super::handler::RegisteredTool;
use std::collections::BTreeMap;

/// Name → tool mapping as seen by one turn.
///
/// Snapshots are never mutated after construction. The registry publishes
/// a new snapshot (with a higher [`generation`](Self::generation)) on every
/// change and swaps a single `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ToolSnapshot {
    generation: u64,
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolSnapshot {
    /// Build a snapshot. When two tools share a name, the later one wins.
    pub fn new(generation: u64, tools: impl IntoIterator<Item = RegisteredTool>) -> Self {
        let mut map = BTreeMap::new();
        for tool in tools {
            map.insert(tool.definition.name.clone(), tool);
        }
        Self {
            generation,
            tools: map,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn definitions(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.values().map(|t| &t.definition)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.tools.values()
    }
}
