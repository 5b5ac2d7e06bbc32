//! Registry + watcher against a real directory.

use agentsh_domain::ToolCall;
use agentsh_infrastructure::{
    ChangeKind, ChangeOutcome, CommandToolLoader, ToolChange, ToolRegistry, ToolWatcher,
    WatcherError,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;

const DEBOUNCE: Duration = Duration::from_millis(150);
const WAIT: Duration = Duration::from_secs(10);

fn echo_unit(description: &str) -> String {
    format!(
        r#"name = "echo_tool"
description = "{}"
command = "echo {{text}}"

[[parameters]]
name = "text"
type = "string"
description = "Text to echo"
required = true
"#,
        description
    )
}

const BROKEN_UNIT: &str = r#"name = "broken_tool"
command = "true"
"#;

const FIXED_BROKEN_UNIT: &str = r#"name = "broken_tool"
description = "Now valid"
command = "true"
"#;

fn registry() -> Arc<ToolRegistry> {
    Arc::new(ToolRegistry::new().register_loader(CommandToolLoader::new()))
}

/// Start a watcher from the registry's files that applies every change to
/// `registry` and reports it.
fn watch(
    dir: &Path,
    registry: &Arc<ToolRegistry>,
) -> (
    ToolWatcher,
    mpsc::UnboundedReceiver<(ToolChange, ChangeOutcome)>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let target = Arc::clone(registry);
    let watcher = ToolWatcher::start_from(
        dir,
        DEBOUNCE,
        registry.tracked_paths(),
        move |change: ToolChange| {
            let outcome = target.apply_change(&change.path, change.kind);
            let _ = tx.send((change, outcome));
        },
    )
    .expect("watcher starts");
    (watcher, rx)
}

async fn next_change(
    rx: &mut mpsc::UnboundedReceiver<(ToolChange, ChangeOutcome)>,
    file_name: &str,
) -> (ToolChange, ChangeOutcome) {
    loop {
        let (change, outcome) = timeout(WAIT, rx.recv())
            .await
            .expect("change reported in time")
            .expect("watcher still running");
        if change.path.file_name().and_then(|n| n.to_str()) == Some(file_name) {
            return (change, outcome);
        }
    }
}

/// Give the backend a moment to arm before the first write.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_added_tool_becomes_available() {
    let dir = TempDir::new().unwrap();
    let registry = registry();
    registry.load(dir.path());
    assert!(registry.snapshot().is_empty());

    let (watcher, mut rx) = watch(dir.path(), &registry);
    settle().await;

    std::fs::write(dir.path().join("echo_tool.toml"), echo_unit("Echo text back")).unwrap();
    let (change, outcome) = next_change(&mut rx, "echo_tool.toml").await;

    assert_eq!(change.kind, ChangeKind::Added);
    assert_eq!(
        outcome,
        ChangeOutcome::Loaded {
            tool_name: "echo_tool".into(),
            replaced: false
        }
    );
    let snapshot = registry.snapshot();
    assert!(snapshot.contains("echo_tool"));
    assert_eq!(snapshot.generation(), 2);

    watcher.stop().await;
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_reloaded_tool_is_invocable() {
    let dir = TempDir::new().unwrap();
    let registry = registry();
    registry.load(dir.path());
    let (watcher, mut rx) = watch(dir.path(), &registry);
    settle().await;

    std::fs::write(dir.path().join("echo_tool.toml"), echo_unit("Echo text back")).unwrap();
    next_change(&mut rx, "echo_tool.toml").await;

    let snapshot = registry.snapshot();
    let tool = snapshot.get("echo_tool").unwrap();
    let result = tool
        .handler
        .invoke(&ToolCall::new("echo_tool").with_arg("text", "hello"))
        .await;
    assert!(result.is_success());
    assert_eq!(result.output().map(str::trim), Some("hello"));

    watcher.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_modified_tool_is_replaced() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("echo_tool.toml");
    std::fs::write(&path, echo_unit("first")).unwrap();

    let registry = registry();
    let report = registry.load(dir.path());
    assert_eq!(report.snapshot.len(), 1);
    let before = registry.snapshot();

    let (watcher, mut rx) = watch(dir.path(), &registry);
    settle().await;

    std::fs::write(&path, echo_unit("second")).unwrap();
    let (change, outcome) = next_change(&mut rx, "echo_tool.toml").await;

    assert_eq!(change.kind, ChangeKind::Modified);
    assert!(matches!(outcome, ChangeOutcome::Loaded { replaced: true, .. }));
    let after = registry.snapshot();
    assert_eq!(after.get("echo_tool").unwrap().definition.description, "second");
    // A snapshot captured earlier keeps its own view
    assert_eq!(before.get("echo_tool").unwrap().definition.description, "first");

    watcher.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_removed_tool_disappears() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("echo_tool.toml");
    std::fs::write(&path, echo_unit("Echo text back")).unwrap();

    let registry = registry();
    registry.load(dir.path());
    let (watcher, mut rx) = watch(dir.path(), &registry);
    settle().await;

    std::fs::remove_file(&path).unwrap();
    let (change, outcome) = next_change(&mut rx, "echo_tool.toml").await;

    assert_eq!(change.kind, ChangeKind::Removed);
    assert_eq!(
        outcome,
        ChangeOutcome::Removed {
            tool_name: "echo_tool".into()
        }
    );
    assert!(registry.snapshot().is_empty());

    watcher.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_delete_and_readd_within_window_keeps_tool() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("echo_tool.toml");
    std::fs::write(&path, echo_unit("original")).unwrap();

    let registry = registry();
    registry.load(dir.path());
    let (watcher, mut rx) = watch(dir.path(), &registry);
    settle().await;

    std::fs::remove_file(&path).unwrap();
    std::fs::write(&path, echo_unit("rewritten")).unwrap();

    let (change, _outcome) = next_change(&mut rx, "echo_tool.toml").await;
    assert_eq!(change.kind, ChangeKind::Modified);

    // No trailing removal arrives once the window has passed
    tokio::time::sleep(DEBOUNCE * 4).await;
    while let Ok((change, _)) = rx.try_recv() {
        assert_ne!(change.kind, ChangeKind::Removed);
    }

    let snapshot = registry.snapshot();
    assert_eq!(
        snapshot.get("echo_tool").unwrap().definition.description,
        "rewritten"
    );

    watcher.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_broken_unit_is_isolated_then_fixed() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("echo_tool.toml"), echo_unit("Echo text back")).unwrap();
    std::fs::write(dir.path().join("broken_tool.toml"), BROKEN_UNIT).unwrap();

    let registry = registry();
    let report = registry.load(dir.path());
    assert_eq!(report.snapshot.names(), vec!["echo_tool"]);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].path().ends_with("broken_tool.toml"));

    let (watcher, mut rx) = watch(dir.path(), &registry);
    settle().await;

    std::fs::write(dir.path().join("broken_tool.toml"), FIXED_BROKEN_UNIT).unwrap();
    let (_, outcome) = next_change(&mut rx, "broken_tool.toml").await;

    assert!(matches!(outcome, ChangeOutcome::Loaded { ref tool_name, .. } if tool_name == "broken_tool"));
    assert_eq!(registry.snapshot().names(), vec!["broken_tool", "echo_tool"]);
    assert!(registry.last_errors().is_empty());

    watcher.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_editor_temp_files_are_ignored() {
    let dir = TempDir::new().unwrap();
    let registry = registry();
    registry.load(dir.path());
    let (watcher, mut rx) = watch(dir.path(), &registry);
    settle().await;

    std::fs::write(dir.path().join(".echo_tool.toml.swp"), "junk").unwrap();
    std::fs::write(dir.path().join("echo_tool.toml~"), "junk").unwrap();
    std::fs::write(dir.path().join("echo_tool.toml"), echo_unit("real")).unwrap();

    let (change, _) = next_change(&mut rx, "echo_tool.toml").await;
    assert_eq!(change.kind, ChangeKind::Added);
    while let Ok((change, _)) = rx.try_recv() {
        assert_eq!(
            change.path.file_name().and_then(|n| n.to_str()),
            Some("echo_tool.toml")
        );
    }
    assert_eq!(registry.snapshot().len(), 1);

    watcher.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unit_written_before_watch_starts_is_loaded() {
    let dir = TempDir::new().unwrap();
    let registry = registry();
    registry.load(dir.path());
    assert!(registry.snapshot().is_empty());

    // Lands after the scan but before observation is armed
    std::fs::write(dir.path().join("late.toml"), echo_unit("late")).unwrap();

    let (watcher, mut rx) = watch(dir.path(), &registry);
    let (change, outcome) = next_change(&mut rx, "late.toml").await;

    assert_eq!(change.kind, ChangeKind::Added);
    assert!(matches!(outcome, ChangeOutcome::Loaded { ref tool_name, .. } if tool_name == "echo_tool"));
    assert!(registry.snapshot().contains("echo_tool"));

    watcher.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unit_deleted_before_watch_starts_is_removed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("echo_tool.toml");
    std::fs::write(&path, echo_unit("Echo text back")).unwrap();

    let registry = registry();
    registry.load(dir.path());
    assert_eq!(registry.snapshot().len(), 1);

    std::fs::remove_file(&path).unwrap();

    let (watcher, mut rx) = watch(dir.path(), &registry);
    let (change, outcome) = next_change(&mut rx, "echo_tool.toml").await;

    assert_eq!(change.kind, ChangeKind::Removed);
    assert_eq!(
        outcome,
        ChangeOutcome::Removed {
            tool_name: "echo_tool".into()
        }
    );
    assert!(registry.snapshot().is_empty());

    watcher.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_plain_start_treats_existing_files_as_known() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("echo_tool.toml");
    std::fs::write(&path, echo_unit("first")).unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let watcher = ToolWatcher::start(dir.path(), DEBOUNCE, move |change: ToolChange| {
        let _ = tx.send(change);
    })
    .expect("watcher starts");
    settle().await;

    std::fs::write(&path, echo_unit("second")).unwrap();
    let change = timeout(WAIT, rx.recv())
        .await
        .expect("change reported in time")
        .expect("watcher still running");
    assert_eq!(change.kind, ChangeKind::Modified);

    watcher.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_callbacks_after_stop() {
    let dir = TempDir::new().unwrap();
    let registry = registry();
    registry.load(dir.path());
    let (watcher, mut rx) = watch(dir.path(), &registry);
    settle().await;

    watcher.stop().await;

    std::fs::write(dir.path().join("echo_tool.toml"), echo_unit("late")).unwrap();
    tokio::time::sleep(DEBOUNCE * 4).await;

    assert!(rx.try_recv().is_err());
    assert!(registry.snapshot().is_empty());
}

#[tokio::test]
async fn test_missing_directory_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");

    let result = ToolWatcher::start(&missing, DEBOUNCE, |_| {});
    assert!(matches!(result, Err(WatcherError::MissingDirectory(_))));
}
