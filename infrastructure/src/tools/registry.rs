//! Tool Registry
//!
//! The [`ToolRegistry`] turns a directory of tool-definition units into a
//! live, immutable [`ToolSnapshot`] and keeps it current as files change.
//!
//! # Usage
//!
//! ```ignore
//! use agentsh_infrastructure::tools::{CommandToolLoader, ToolRegistry};
//!
//! let registry = ToolRegistry::new().register_loader(CommandToolLoader::new());
//!
//! // Initial scan: invalid units are reported, never fatal
//! let report = registry.load("./tools");
//! for error in &report.errors {
//!     eprintln!("skipped {}", error);
//! }
//!
//! // Each turn captures one snapshot
//! let snapshot = registry.snapshot();
//!
//! // The watcher feeds changes back in
//! registry.apply_change(&path, ChangeKind::Modified);
//! ```
//!
//! # Resolution
//!
//! Every loaded unit carries a load sequence number. When several files
//! declare the same tool name, the most recently loaded one wins; removing
//! it reinstates the next most recent. During the initial scan files load
//! in file-name order, so the last file name wins.
//!
//! # Publication
//!
//! Readers clone an `Arc<ToolSnapshot>` under a short read lock. Writers
//! build a complete new snapshot and swap it in, so a reader sees either the
//! old mapping or the new one, never a mix.

use super::is_ignored;
use super::loader::ToolUnitLoader;
use crate::watcher::ChangeKind;
use agentsh_application::ports::tool_source::ToolSource;
use agentsh_domain::{RegisteredTool, ToolLoadError, ToolSnapshot};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Result of a full directory scan
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub snapshot: Arc<ToolSnapshot>,
    pub errors: Vec<ToolLoadError>,
}

/// Result of applying one filesystem change
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeOutcome {
    /// A unit was (re)loaded; `replaced` is true if the path held a tool before
    Loaded { tool_name: String, replaced: bool },
    Removed { tool_name: String },
    /// The unit failed to load; any tool it previously provided was withdrawn
    Failed {
        error: ToolLoadError,
        withdrawn: Option<String>,
    },
    /// Nothing to do (no loader for the path, or removal of an unknown path)
    Ignored,
}

impl ChangeOutcome {
    pub fn changed_snapshot(&self) -> bool {
        match self {
            ChangeOutcome::Loaded { .. } | ChangeOutcome::Removed { .. } => true,
            ChangeOutcome::Failed { withdrawn, .. } => withdrawn.is_some(),
            ChangeOutcome::Ignored => false,
        }
    }
}

impl fmt::Display for ChangeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeOutcome::Loaded {
                tool_name,
                replaced: false,
            } => write!(f, "loaded {}", tool_name),
            ChangeOutcome::Loaded {
                tool_name,
                replaced: true,
            } => write!(f, "reloaded {}", tool_name),
            ChangeOutcome::Removed { tool_name } => write!(f, "removed {}", tool_name),
            ChangeOutcome::Failed {
                withdrawn: Some(name),
                ..
            } => write!(f, "withdrew {} (unit no longer valid)", name),
            ChangeOutcome::Failed { error, .. } => write!(f, "failed to load {}", error.path().display()),
            ChangeOutcome::Ignored => f.write_str("no change"),
        }
    }
}

struct LoadedUnit {
    tool: RegisteredTool,
    seq: u64,
}

#[derive(Default)]
struct RegistryState {
    directory: Option<PathBuf>,
    units: HashMap<PathBuf, LoadedUnit>,
    errors: BTreeMap<PathBuf, ToolLoadError>,
    next_seq: u64,
    generation: u64,
}

/// Live mapping from tool name to callable tool, backed by a directory.
pub struct ToolRegistry {
    loaders: Vec<Arc<dyn ToolUnitLoader>>,
    current: RwLock<Arc<ToolSnapshot>>,
    state: Mutex<RegistryState>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a new registry with no loaders
    pub fn new() -> Self {
        Self {
            loaders: Vec::new(),
            current: RwLock::new(Arc::new(ToolSnapshot::empty())),
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Register a unit loader
    pub fn register_loader<L: ToolUnitLoader + 'static>(mut self, loader: L) -> Self {
        self.loaders.push(Arc::new(loader));
        self
    }

    /// Register a unit loader (Arc version)
    pub fn register_loader_arc(mut self, loader: Arc<dyn ToolUnitLoader>) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Directory of the last [`load`](Self::load), canonicalized when it exists
    pub fn directory(&self) -> Option<PathBuf> {
        self.lock_state().directory.clone()
    }

    /// Scan `directory` and replace the whole tool set.
    ///
    /// A missing directory yields an empty snapshot and a warning.
    pub fn load(&self, directory: impl AsRef<Path>) -> LoadReport {
        let directory = directory.as_ref();
        let directory = directory
            .canonicalize()
            .unwrap_or_else(|_| directory.to_path_buf());

        let mut state = self.lock_state();
        state.directory = Some(directory.clone());
        state.units.clear();
        state.errors.clear();

        match self.unit_paths(&directory) {
            Ok(paths) => {
                for path in paths {
                    self.load_into(&mut state, &path);
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %directory.display(),
                    error = %e,
                    "Tool directory not readable, starting with no tools"
                );
            }
        }

        let snapshot = self.publish(&mut state);
        let errors: Vec<ToolLoadError> = state.errors.values().cloned().collect();
        tracing::info!(
            path = %directory.display(),
            tools = snapshot.len(),
            errors = errors.len(),
            generation = snapshot.generation(),
            "Loaded tools"
        );

        LoadReport { snapshot, errors }
    }

    /// Apply one filesystem change to the tool set.
    pub fn apply_change(&self, path: &Path, kind: ChangeKind) -> ChangeOutcome {
        let mut state = self.lock_state();

        let outcome = match kind {
            ChangeKind::Removed => {
                state.errors.remove(path);
                match state.units.remove(path) {
                    Some(unit) => ChangeOutcome::Removed {
                        tool_name: unit.tool.definition.name,
                    },
                    None => ChangeOutcome::Ignored,
                }
            }
            ChangeKind::Added | ChangeKind::Modified => {
                if is_ignored(path) || self.loader_for(path).is_none() {
                    return ChangeOutcome::Ignored;
                }
                let previous = state
                    .units
                    .get(path)
                    .map(|u| u.tool.definition.name.clone());
                match self.load_into(&mut state, path) {
                    Ok(tool_name) => ChangeOutcome::Loaded {
                        tool_name,
                        replaced: previous.is_some(),
                    },
                    Err(error) => ChangeOutcome::Failed {
                        error,
                        withdrawn: previous,
                    },
                }
            }
        };

        if outcome.changed_snapshot() {
            let snapshot = self.publish(&mut state);
            tracing::info!(
                path = %path.display(),
                change = %outcome,
                tools = snapshot.len(),
                generation = snapshot.generation(),
                "Tool set updated"
            );
        } else {
            tracing::debug!(path = %path.display(), change = %outcome, "Tool change without effect");
        }
        outcome
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<ToolSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Load errors currently outstanding, ordered by path
    pub fn last_errors(&self) -> Vec<ToolLoadError> {
        self.lock_state().errors.values().cloned().collect()
    }

    /// Unit files the registry holds a tool or an outstanding error for
    pub fn tracked_paths(&self) -> Vec<PathBuf> {
        let state = self.lock_state();
        let mut paths: Vec<PathBuf> = state
            .units
            .keys()
            .chain(state.errors.keys())
            .cloned()
            .collect();
        paths.sort();
        paths.dedup();
        paths
    }

    fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn loader_for(&self, path: &Path) -> Option<&Arc<dyn ToolUnitLoader>> {
        self.loaders.iter().find(|l| l.accepts(path))
    }

    /// Candidate unit files in file-name order
    fn unit_paths(&self, directory: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(directory)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && !is_ignored(path))
            .filter(|path| self.loader_for(path).is_some())
            .collect();
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(paths)
    }

    /// Load one unit into the state, recording success or failure per path.
    fn load_into(&self, state: &mut RegistryState, path: &Path) -> Result<String, ToolLoadError> {
        let Some(loader) = self.loader_for(path) else {
            return Err(ToolLoadError::invalid(path, "no loader accepts this file"));
        };

        let loaded = catch_unwind(AssertUnwindSafe(|| loader.load(path))).unwrap_or_else(|payload| {
            Err(ToolLoadError::Panicked {
                path: path.to_path_buf(),
                message: panic_message(payload.as_ref()),
            })
        });

        match loaded {
            Ok(tool) => {
                let name = tool.definition.name.clone();
                tracing::debug!(tool = %name, path = %path.display(), loader = loader.name(), "Registered tool");
                state.next_seq += 1;
                let seq = state.next_seq;
                state.errors.remove(path);
                state
                    .units
                    .insert(path.to_path_buf(), LoadedUnit { tool, seq });
                Ok(name)
            }
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "Skipping invalid tool unit");
                state.units.remove(path);
                state.errors.insert(path.to_path_buf(), error.clone());
                Err(error)
            }
        }
    }

    /// Build a new snapshot from the loaded units and swap it in.
    fn publish(&self, state: &mut RegistryState) -> Arc<ToolSnapshot> {
        let mut units: Vec<&LoadedUnit> = state.units.values().collect();
        units.sort_by_key(|u| u.seq);

        state.generation += 1;
        let snapshot = Arc::new(ToolSnapshot::new(
            state.generation,
            units.into_iter().map(|u| u.tool.clone()),
        ));

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);
        snapshot
    }
}

impl ToolSource for ToolRegistry {
    fn snapshot(&self) -> Arc<ToolSnapshot> {
        ToolRegistry::snapshot(self)
    }

    fn load_errors(&self) -> Vec<ToolLoadError> {
        self.last_errors()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::CommandToolLoader;
    use agentsh_domain::ToolCall;
    use std::fs;
    use tempfile::TempDir;

    fn unit(name: &str, output: &str) -> String {
        format!(
            "name = \"{name}\"\ndescription = \"test tool\"\ncommand = \"echo {output}\"\n"
        )
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new().register_loader(CommandToolLoader::new())
    }

    fn canonical(dir: &TempDir, file: &str) -> PathBuf {
        dir.path().canonicalize().unwrap().join(file)
    }

    /// Loader that panics on any file called `panic.toml`
    struct PanickyLoader;

    impl ToolUnitLoader for PanickyLoader {
        fn name(&self) -> &str {
            "panicky"
        }
        fn accepts(&self, path: &Path) -> bool {
            path.file_name().is_some_and(|n| n == "panic.toml")
        }
        fn load(&self, _path: &Path) -> Result<RegisteredTool, ToolLoadError> {
            panic!("loader blew up");
        }
    }

    #[test]
    fn test_load_counts_only_valid_units() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("echo_tool.toml"), unit("echo_tool", "hi")).unwrap();
        fs::write(dir.path().join("other.toml"), unit("other", "x")).unwrap();
        fs::write(dir.path().join("broken_tool.toml"), "name = \"broken_tool\"\n").unwrap();
        fs::write(dir.path().join("garbage.toml"), "this is [not toml").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        fs::write(dir.path().join(".hidden.toml"), unit("hidden", "x")).unwrap();

        let registry = registry();
        let report = registry.load(dir.path());

        assert_eq!(report.snapshot.len(), 2);
        assert_eq!(report.snapshot.names(), vec!["echo_tool", "other"]);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors.iter().any(|e| e.tool_name().is_none()
            && e.path().ends_with("broken_tool.toml")));
        assert_eq!(registry.last_errors().len(), 2);
    }

    #[test]
    fn test_tracked_paths_cover_loaded_and_failed_units() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("echo_tool.toml"), unit("echo_tool", "hi")).unwrap();
        fs::write(dir.path().join("broken_tool.toml"), "name = \"broken_tool\"\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = registry();
        registry.load(dir.path());

        assert_eq!(
            registry.tracked_paths(),
            vec![
                canonical(&dir, "broken_tool.toml"),
                canonical(&dir, "echo_tool.toml")
            ]
        );
    }

    #[tokio::test]
    async fn test_duplicate_names_last_file_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.toml"), unit("dup", "first")).unwrap();
        fs::write(dir.path().join("b.toml"), unit("dup", "second")).unwrap();

        let registry = registry();
        let snapshot = registry.load(dir.path()).snapshot;

        assert_eq!(snapshot.len(), 1);
        let tool = snapshot.get("dup").unwrap();
        assert!(tool.source.as_ref().unwrap().ends_with("b.toml"));
        if cfg!(unix) {
            let result = tool.handler.invoke(&ToolCall::new("dup")).await;
            assert_eq!(result.output().map(str::trim), Some("second"));
        }
    }

    #[test]
    fn test_missing_directory_is_empty_not_fatal() {
        let dir = TempDir::new().unwrap();
        let report = registry().load(dir.path().join("does-not-exist"));
        assert!(report.snapshot.is_empty());
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_snapshot_captured_before_change_is_unaffected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("echo_tool.toml"), unit("echo_tool", "hi")).unwrap();
        let registry = registry();
        registry.load(dir.path());

        let before = registry.snapshot();
        fs::write(dir.path().join("weather.toml"), unit("weather", "sunny")).unwrap();
        let outcome = registry.apply_change(&canonical(&dir, "weather.toml"), ChangeKind::Added);

        assert_eq!(
            outcome,
            ChangeOutcome::Loaded {
                tool_name: "weather".into(),
                replaced: false
            }
        );
        assert_eq!(before.names(), vec!["echo_tool"]);
        let after = registry.snapshot();
        assert_eq!(after.names(), vec!["echo_tool", "weather"]);
        assert!(after.generation() > before.generation());
    }

    #[test]
    fn test_remove_and_remove_unknown() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("echo_tool.toml"), unit("echo_tool", "hi")).unwrap();
        let registry = registry();
        registry.load(dir.path());

        let path = canonical(&dir, "echo_tool.toml");
        fs::remove_file(&path).unwrap();
        assert_eq!(
            registry.apply_change(&path, ChangeKind::Removed),
            ChangeOutcome::Removed {
                tool_name: "echo_tool".into()
            }
        );
        assert!(registry.snapshot().is_empty());

        let generation = registry.snapshot().generation();
        assert_eq!(
            registry.apply_change(&path, ChangeKind::Removed),
            ChangeOutcome::Ignored
        );
        assert_eq!(registry.snapshot().generation(), generation);
    }

    #[test]
    fn test_modified_unit_turning_invalid_is_withdrawn() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("echo_tool.toml"), unit("echo_tool", "hi")).unwrap();
        let registry = registry();
        registry.load(dir.path());

        let path = canonical(&dir, "echo_tool.toml");
        fs::write(&path, "name = \"echo_tool\"\n").unwrap();
        let outcome = registry.apply_change(&path, ChangeKind::Modified);

        assert!(matches!(
            outcome,
            ChangeOutcome::Failed { withdrawn: Some(ref name), .. } if name == "echo_tool"
        ));
        assert!(registry.snapshot().is_empty());
        assert_eq!(registry.last_errors().len(), 1);

        fs::write(&path, unit("echo_tool", "hi")).unwrap();
        registry.apply_change(&path, ChangeKind::Modified);
        assert!(registry.snapshot().contains("echo_tool"));
        assert!(registry.last_errors().is_empty());
    }

    #[test]
    fn test_removing_winner_reinstates_other_definition() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.toml"), unit("dup", "first")).unwrap();
        let registry = registry();
        registry.load(dir.path());

        let b = canonical(&dir, "b.toml");
        fs::write(&b, unit("dup", "second")).unwrap();
        registry.apply_change(&b, ChangeKind::Added);
        assert!(registry.snapshot().get("dup").unwrap().source.as_ref().unwrap().ends_with("b.toml"));

        fs::remove_file(&b).unwrap();
        registry.apply_change(&b, ChangeKind::Removed);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("dup").unwrap().source.as_ref().unwrap().ends_with("a.toml"));
    }

    #[test]
    fn test_panicking_loader_is_isolated() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("panic.toml"), unit("p", "x")).unwrap();
        fs::write(dir.path().join("echo_tool.toml"), unit("echo_tool", "hi")).unwrap();

        let registry = ToolRegistry::new()
            .register_loader(PanickyLoader)
            .register_loader(CommandToolLoader::new());
        let report = registry.load(dir.path());

        assert_eq!(report.snapshot.names(), vec!["echo_tool"]);
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            &report.errors[0],
            ToolLoadError::Panicked { message, .. } if message == "loader blew up"
        ));
    }

    #[test]
    fn test_ignored_paths() {
        let dir = TempDir::new().unwrap();
        let registry = registry();
        registry.load(dir.path());

        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        assert_eq!(
            registry.apply_change(&canonical(&dir, "notes.txt"), ChangeKind::Added),
            ChangeOutcome::Ignored
        );
        assert_eq!(
            registry.apply_change(&canonical(&dir, "unit.toml.swp"), ChangeKind::Added),
            ChangeOutcome::Ignored
        );
    }
}
