//! File-backed session store.
//!
//! One JSON document per session key:
//!
//! ```text
//! sessions/
//! ├── agentsh-2025-03-14-09.session.json
//! ├── agentsh-2025-03-14-10.session.json
//! └── agentsh-2025-03-14-10.session.json.corrupt-1741600000
//! ```
//!
//! Every append rewrites the whole record through a temp file:
//! write `<key>.session.json.tmp`, fsync it, rename it over the record,
//! fsync the directory. A crash at any step leaves the last committed
//! record readable. The rename is the commit point; a failed directory
//! fsync after it is logged, not reported.
//!
//! File work runs on tokio's blocking pool. The per-key lock travels into
//! the blocking closure, so a cancelled caller cannot let a second append
//! start while the first is still writing.

use agentsh_application::ports::session_store::{SessionStore, SessionStoreError};
use agentsh_domain::{SessionKey, SessionRecord, Turn};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

const RECORD_SUFFIX: &str = ".session.json";

/// [`SessionStore`] writing `<dir>/<key>.session.json`.
pub struct FileSessionStore {
    files: RecordFiles,
    /// Per-key append locks
    locks: Mutex<HashMap<SessionKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            files: RecordFiles { dir: dir.into() },
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.files.dir
    }

    pub fn record_path(&self, key: &SessionKey) -> PathBuf {
        self.files.record_path(key)
    }

    fn key_lock(&self, key: &SessionKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.clone()).or_default())
    }
}

/// Run blocking file work off the async workers.
async fn blocking<T, F>(key: &SessionKey, work: F) -> Result<T, SessionStoreError>
where
    F: FnOnce() -> Result<T, SessionStoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| io_error(key, std::io::Error::other(e)))?
}

fn io_error(key: &SessionKey, source: std::io::Error) -> SessionStoreError {
    SessionStoreError::Io {
        key: key.clone(),
        source,
    }
}

/// Synchronous record I/O under one sessions directory
#[derive(Debug, Clone)]
struct RecordFiles {
    dir: PathBuf,
}

impl RecordFiles {
    fn record_path(&self, key: &SessionKey) -> PathBuf {
        self.dir.join(format!("{}{}", key, RECORD_SUFFIX))
    }

    fn temp_path(&self, key: &SessionKey) -> PathBuf {
        self.dir.join(format!("{}{}.tmp", key, RECORD_SUFFIX))
    }

    fn read_record(&self, key: &SessionKey) -> Result<SessionRecord, SessionStoreError> {
        let path = self.record_path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SessionRecord::new(key.clone())),
            Err(e) => return Err(io_error(key, e)),
        };

        let record: SessionRecord =
            serde_json::from_slice(&bytes).map_err(|e| SessionStoreError::StorageCorruption {
                key: key.clone(),
                reason: format!("{}: {}", path.display(), e),
            })?;

        if record.key() != key {
            return Err(SessionStoreError::StorageCorruption {
                key: key.clone(),
                reason: format!(
                    "{} holds session '{}'",
                    path.display(),
                    record.key()
                ),
            });
        }
        Ok(record)
    }

    /// Write the new record to the temp file and flush it to disk.
    ///
    /// The committed record is untouched until [`commit`](Self::commit).
    fn stage(&self, record: &SessionRecord) -> Result<PathBuf, SessionStoreError> {
        let key = record.key();
        fs::create_dir_all(&self.dir).map_err(|e| io_error(key, e))?;

        let json = serde_json::to_vec_pretty(record)
            .map_err(|e| io_error(key, std::io::Error::other(e)))?;

        let temp = self.temp_path(key);
        let mut file = File::create(&temp).map_err(|e| io_error(key, e))?;
        file.write_all(&json).map_err(|e| io_error(key, e))?;
        file.sync_all().map_err(|e| io_error(key, e))?;
        Ok(temp)
    }

    fn commit(&self, key: &SessionKey, temp: &Path) -> Result<(), SessionStoreError> {
        self.commit_with(key, temp, sync_dir)
    }

    /// Rename `temp` over the record, then flush the directory entry.
    ///
    /// Only a failed rename is an error: once it succeeds the new record is
    /// what readers see, and the temp path no longer exists.
    fn commit_with(
        &self,
        key: &SessionKey,
        temp: &Path,
        sync: impl FnOnce(&Path) -> std::io::Result<()>,
    ) -> Result<(), SessionStoreError> {
        fs::rename(temp, self.record_path(key)).map_err(|e| io_error(key, e))?;
        if let Err(e) = sync(&self.dir) {
            warn!(key = %key, error = %e, "Session committed but directory sync failed");
        }
        Ok(())
    }

    fn append(&self, key: &SessionKey, turns: Vec<Turn>) -> Result<(), SessionStoreError> {
        let mut record = self.read_record(key)?;
        let count = turns.len();
        record.extend(turns);
        let temp = self.stage(&record)?;
        if let Err(e) = self.commit(key, &temp) {
            // Rename failed, so the temp file is still ours
            let _ = fs::remove_file(&temp);
            return Err(e);
        }

        debug!(key = %key, appended = count, total = record.len(), "Session committed");
        Ok(())
    }

    fn move_aside(&self, key: &SessionKey) -> Result<bool, SessionStoreError> {
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(false);
        }
        let aside = self.dir.join(format!(
            "{}{}.corrupt-{}",
            key,
            RECORD_SUFFIX,
            chrono::Utc::now().timestamp()
        ));
        fs::rename(&path, &aside).map_err(|e| io_error(key, e))?;
        if let Err(e) = sync_dir(&self.dir) {
            warn!(key = %key, error = %e, "Session moved aside but directory sync failed");
        }
        warn!(key = %key, path = %aside.display(), "Moved session record aside");
        Ok(true)
    }

    fn list(&self) -> Result<Vec<SessionKey>, SessionStoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&SessionKey::from_raw(""), e)),
        };

        let mut keys: Vec<SessionKey> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                e.file_name()
                    .to_str()
                    .and_then(|name| name.strip_suffix(RECORD_SUFFIX))
                    .map(SessionKey::from_raw)
            })
            .collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self, key: &SessionKey) -> Result<SessionRecord, SessionStoreError> {
        let files = self.files.clone();
        let owned = key.clone();
        blocking(key, move || files.read_record(&owned)).await
    }

    async fn append_all(
        &self,
        key: &SessionKey,
        turns: Vec<Turn>,
    ) -> Result<(), SessionStoreError> {
        let guard = self.key_lock(key).lock_owned().await;
        let files = self.files.clone();
        let owned = key.clone();
        blocking(key, move || {
            let _guard = guard;
            files.append(&owned, turns)
        })
        .await
    }

    async fn reset(&self, key: &SessionKey) -> Result<bool, SessionStoreError> {
        let guard = self.key_lock(key).lock_owned().await;
        let files = self.files.clone();
        let owned = key.clone();
        blocking(key, move || {
            let _guard = guard;
            files.move_aside(&owned)
        })
        .await
    }

    async fn list(&self) -> Result<Vec<SessionKey>, SessionStoreError> {
        let files = self.files.clone();
        blocking(&SessionKey::from_raw(""), move || files.list()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentsh_domain::{FixedClock, TurnRole};
    use tempfile::TempDir;

    fn demo_key(hour: u32) -> SessionKey {
        SessionKey::resolve("demo", &FixedClock::at(2025, 3, 14, hour, 30).unwrap())
    }

    #[tokio::test]
    async fn test_load_unseen_key_is_empty_and_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("sessions"));

        let record = store.load(&demo_key(9)).await.unwrap();
        assert!(record.is_empty());
        assert_eq!(record.key(), &demo_key(9));
        assert!(!dir.path().join("sessions").exists());
    }

    #[tokio::test]
    async fn test_append_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        let key = demo_key(9);

        store.append(&key, Turn::user("hello")).await.unwrap();
        store
            .append_all(&key, vec![Turn::agent("hi"), Turn::user("again")])
            .await
            .unwrap();

        let record = store.load(&key).await.unwrap();
        assert_eq!(record.len(), 3);
        assert_eq!(record.last().unwrap().text(), Some("again"));
        assert_eq!(record.turns()[1].role, TurnRole::Agent);
        assert!(store.record_path(&key).ends_with("demo-2025-03-14-09.session.json"));
        assert!(!store.files.temp_path(&key).exists());
    }

    #[tokio::test]
    async fn test_staged_but_uncommitted_append_leaves_record_intact() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        let key = demo_key(9);
        store.append(&key, Turn::user("committed")).await.unwrap();

        // Crash between staging and rename
        let mut next = store.load(&key).await.unwrap();
        next.push(Turn::agent("never committed"));
        let temp = store.files.stage(&next).unwrap();
        assert!(temp.exists());

        let record = store.load(&key).await.unwrap();
        assert_eq!(record.len(), 1);
        assert_eq!(record.last().unwrap().text(), Some("committed"));

        // The next append overwrites the stale temp file
        store.append(&key, Turn::agent("ok")).await.unwrap();
        let record = store.load(&key).await.unwrap();
        assert_eq!(record.len(), 2);
        assert_eq!(record.last().unwrap().text(), Some("ok"));
    }

    #[tokio::test]
    async fn test_corrupt_record_is_reported_not_replaced() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        let key = demo_key(9);
        fs::write(store.record_path(&key), b"{ not json").unwrap();

        let err = store.load(&key).await.unwrap_err();
        assert!(err.is_corruption());

        let err = store.append(&key, Turn::user("x")).await.unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(fs::read(store.record_path(&key)).unwrap(), b"{ not json");
    }

    #[tokio::test]
    async fn test_mismatched_key_is_corruption() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        store.append(&demo_key(9), Turn::user("x")).await.unwrap();
        fs::copy(store.record_path(&demo_key(9)), store.record_path(&demo_key(10))).unwrap();

        let err = store.load(&demo_key(10)).await.unwrap_err();
        assert!(err.to_string().contains("holds session 'demo-2025-03-14-09'"));
    }

    #[tokio::test]
    async fn test_reset_moves_record_aside() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        let key = demo_key(9);
        fs::write(store.record_path(&key), b"garbage").unwrap();

        assert!(store.reset(&key).await.unwrap());
        assert!(store.load(&key).await.unwrap().is_empty());
        assert!(!store.reset(&key).await.unwrap());

        let aside: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".corrupt-"))
            .collect();
        assert_eq!(aside.len(), 1);
    }

    #[tokio::test]
    async fn test_hourly_buckets_are_separate_sessions() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());

        store.append(&demo_key(9), Turn::user("first hour")).await.unwrap();
        assert!(store.load(&demo_key(10)).await.unwrap().is_empty());
        store.append(&demo_key(10), Turn::user("second hour")).await.unwrap();

        assert_eq!(store.load(&demo_key(9)).await.unwrap().len(), 1);
        assert_eq!(store.list().await.unwrap(), vec![demo_key(9), demo_key(10)]);
    }

    #[tokio::test]
    async fn test_concurrent_appends_to_one_key_are_serialised() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FileSessionStore::new(dir.path()));
        let key = demo_key(9);

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                store.append(&key, Turn::user(format!("turn {i}"))).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load(&key).await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_directory_sync_failure_after_rename_still_commits() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        let key = demo_key(9);

        let mut record = SessionRecord::new(key.clone());
        record.push(Turn::user("kept"));
        let temp = store.files.stage(&record).unwrap();

        let result = store.files.commit_with(&key, &temp, |_| {
            Err(std::io::Error::other("fsync not supported"))
        });
        assert!(result.is_ok());
        assert!(!temp.exists());

        let loaded = store.load(&key).await.unwrap();
        assert_eq!(loaded.last().unwrap().text(), Some("kept"));
    }

    #[test]
    fn test_failed_rename_is_an_error_and_skips_sync() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        let key = demo_key(9);
        // A non-empty directory in the record's place makes the rename fail
        fs::create_dir(store.record_path(&key)).unwrap();
        fs::write(store.record_path(&key).join("occupant"), b"x").unwrap();

        let temp = store.files.stage(&SessionRecord::new(key.clone())).unwrap();
        let mut synced = false;
        let err = store
            .files
            .commit_with(&key, &temp, |_| {
                synced = true;
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, SessionStoreError::Io { .. }));
        assert!(!synced);
        assert!(temp.exists());
    }
}
