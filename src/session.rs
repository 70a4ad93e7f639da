//! Checkpoint persistence for conversation sessions.
//!
//! A checkpoint is the history serialized as a bare JSON array of turns,
//! addressed by a [`SessionTag`]. The core only talks to storage through
//! [`CheckpointGateway`]; a file-backed store (`<root>/checkpoints/<tag>.json`)
//! and an in-memory store ship with the crate.

use crate::error::CheckpointError;
use crate::types::{History, SessionTag};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::sync::Mutex;

/// Subdirectory under the store root holding `*.json` checkpoints.
const CHECKPOINTS_DIR: &str = "checkpoints";
const CHECKPOINT_FILE_EXT: &str = "json";

/// Storage backend for history snapshots. Failures propagate; nothing retries.
#[async_trait]
pub trait CheckpointGateway: Send + Sync {
    async fn save(&self, history: &History, tag: &SessionTag) -> Result<(), CheckpointError>;

    /// Snapshot stored under `tag`, or an empty history when there is none.
    async fn load(&self, tag: &SessionTag) -> Result<History, CheckpointError>;

    /// Most recently saved tag, if any.
    async fn latest(&self) -> Result<Option<SessionTag>, CheckpointError>;
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Live conversation owned by the agent loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    /// Checkpoint slot; assigned lazily on first persist.
    pub tag: Option<SessionTag>,
    pub history: History,
}

impl Session {
    pub fn new(history: History) -> Self {
        Self { tag: None, history }
    }

    pub fn with_tag(tag: SessionTag, history: History) -> Self {
        Self {
            tag: Some(tag),
            history,
        }
    }

    /// Current tag, generating one when none is assigned yet.
    pub fn ensure_tag(&mut self) -> &SessionTag {
        self.tag.get_or_insert_with(SessionTag::generate)
    }

    /// Replace the tag with a fresh one so the next persist does not
    /// overwrite the previous checkpoint.
    pub fn fork_tag(&mut self) -> &SessionTag {
        let previous = self.tag.take();
        let current = self.tag.insert(SessionTag::generate());
        tracing::debug!(
            previous = ?previous.as_ref().map(SessionTag::as_str),
            current = current.as_str(),
            "forked session tag"
        );
        current
    }

    /// Save the history under the session tag, assigning one if needed.
    pub async fn persist(
        &mut self,
        gateway: &dyn CheckpointGateway,
    ) -> Result<SessionTag, CheckpointError> {
        let tag = self.ensure_tag().clone();
        gateway.save(&self.history, &tag).await?;
        Ok(tag)
    }

    /// Load the snapshot stored under `tag`.
    pub async fn restore(
        gateway: &dyn CheckpointGateway,
        tag: SessionTag,
    ) -> Result<Self, CheckpointError> {
        let history = gateway.load(&tag).await?;
        Ok(Self::with_tag(tag, history))
    }
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

/// Filesystem-backed checkpoints.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    checkpoints_dir: PathBuf,
}

impl FileCheckpointStore {
    /// Open/create a store rooted under the given directory.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let checkpoints_dir = root.as_ref().join(CHECKPOINTS_DIR);
        tokio::fs::create_dir_all(&checkpoints_dir).await?;
        Ok(Self { checkpoints_dir })
    }

    pub fn dir(&self) -> &Path {
        &self.checkpoints_dir
    }

    /// Tags stored on disk, most recently modified first.
    pub async fn list(&self) -> Result<Vec<SessionTag>, CheckpointError> {
        let mut found: Vec<(SystemTime, SessionTag)> = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.checkpoints_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_checkpoint_file(&path) {
                continue;
            }
            let Some(tag) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| SessionTag::parse(stem).ok())
            else {
                continue;
            };
            // Files that vanish or cannot be stat'ed are skipped.
            let modified = match entry.metadata().await.and_then(|meta| meta.modified()) {
                Ok(modified) => modified,
                Err(_) => continue,
            };
            found.push((modified, tag));
        }
        found.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        Ok(found.into_iter().map(|(_, tag)| tag).collect())
    }

    fn checkpoint_path(&self, tag: &SessionTag) -> PathBuf {
        self.checkpoints_dir
            .join(format!("{}.{CHECKPOINT_FILE_EXT}", tag.as_str()))
    }
}

#[async_trait]
impl CheckpointGateway for FileCheckpointStore {
    async fn save(&self, history: &History, tag: &SessionTag) -> Result<(), CheckpointError> {
        let json = serde_json::to_vec_pretty(history)?;
        let path = self.checkpoint_path(tag);
        // Temp file + rename so a failed write leaves the previous snapshot.
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        tracing::debug!(tag = tag.as_str(), turns = history.len(), "saved checkpoint");
        Ok(())
    }

    async fn load(&self, tag: &SessionTag) -> Result<History, CheckpointError> {
        let path = self.checkpoint_path(tag);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(tag = tag.as_str(), "no checkpoint; starting empty");
                return Ok(History::new());
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn latest(&self) -> Result<Option<SessionTag>, CheckpointError> {
        Ok(self.list().await?.into_iter().next())
    }
}

fn is_checkpoint_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(CHECKPOINT_FILE_EXT)
}

// ---------------------------------------------------------------------------
// Memory store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryState {
    snapshots: HashMap<SessionTag, (u64, History)>,
    next_seq: u64,
}

/// In-process checkpoints, for tests and embedders without a disk.
#[derive(Debug, Default)]
pub struct MemoryCheckpointStore {
    state: Mutex<MemoryState>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.snapshots.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl CheckpointGateway for MemoryCheckpointStore {
    async fn save(&self, history: &History, tag: &SessionTag) -> Result<(), CheckpointError> {
        let mut state = self.state.lock().await;
        state.next_seq += 1;
        let seq = state.next_seq;
        state.snapshots.insert(tag.clone(), (seq, history.clone()));
        Ok(())
    }

    async fn load(&self, tag: &SessionTag) -> Result<History, CheckpointError> {
        let state = self.state.lock().await;
        Ok(state
            .snapshots
            .get(tag)
            .map(|(_, history)| history.clone())
            .unwrap_or_default())
    }

    async fn latest(&self) -> Result<Option<SessionTag>, CheckpointError> {
        let state = self.state.lock().await;
        Ok(state
            .snapshots
            .iter()
            .max_by_key(|(_, (seq, _))| *seq)
            .map(|(tag, _)| tag.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::{call_turn, response_turn, TestTempDir};
    use crate::types::Turn;
    use std::time::Duration;

    fn tag(raw: &str) -> SessionTag {
        SessionTag::parse(raw).unwrap()
    }

    fn sample_history() -> History {
        History::from(vec![
            Turn::user("hello"),
            call_turn("c1", "ls"),
            response_turn("c1", "ls"),
            Turn::model("done"),
        ])
    }

    #[tokio::test]
    async fn file_store_round_trips_history() {
        let dir = TestTempDir::new("checkpoint");
        let store = FileCheckpointStore::open(dir.path()).await.unwrap();
        store.save(&sample_history(), &tag("demo")).await.unwrap();
        let loaded = store.load(&tag("demo")).await.unwrap();
        assert_eq!(loaded, sample_history());

        let raw = std::fs::read_to_string(store.dir().join("demo.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.is_array());
    }

    #[tokio::test]
    async fn missing_checkpoint_loads_empty() {
        let dir = TestTempDir::new("checkpoint-missing");
        let store = FileCheckpointStore::open(dir.path()).await.unwrap();
        assert!(store.load(&tag("nope")).await.unwrap().is_empty());
        assert_eq!(store.latest().await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_checkpoint_is_an_error() {
        let dir = TestTempDir::new("checkpoint-corrupt");
        let store = FileCheckpointStore::open(dir.path()).await.unwrap();
        dir.write_text("checkpoints/broken.json", "{not json");
        let err = store.load(&tag("broken")).await.unwrap_err();
        assert!(matches!(err, CheckpointError::Json(_)));
    }

    #[tokio::test]
    async fn latest_prefers_most_recent_write() {
        let dir = TestTempDir::new("checkpoint-latest");
        let store = FileCheckpointStore::open(dir.path()).await.unwrap();
        store.save(&sample_history(), &tag("first")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        store.save(&sample_history(), &tag("second")).await.unwrap();
        assert_eq!(store.latest().await.unwrap(), Some(tag("second")));
        dir.write_text("checkpoints/notes.txt", "ignored");
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn memory_store_tracks_latest_by_sequence() {
        let store = MemoryCheckpointStore::new();
        assert!(store.is_empty().await);
        store.save(&sample_history(), &tag("a")).await.unwrap();
        store.save(&History::new(), &tag("b")).await.unwrap();
        store.save(&sample_history(), &tag("a")).await.unwrap();
        assert_eq!(store.latest().await.unwrap(), Some(tag("a")));
        assert_eq!(store.len().await, 2);
        assert!(store.load(&tag("b")).await.unwrap().is_empty());
        assert!(store.load(&tag("zzz")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn persist_assigns_tag_lazily_and_reuses_it() {
        let store = MemoryCheckpointStore::new();
        let mut session = Session::new(sample_history());
        assert!(session.tag.is_none());
        let first = session.persist(&store).await.unwrap();
        let second = session.persist(&store).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.len().await, 1);

        let restored = Session::restore(&store, first.clone()).await.unwrap();
        assert_eq!(restored.tag, Some(first));
        assert_eq!(restored.history, sample_history());
    }

    #[tokio::test]
    async fn forked_tag_keeps_previous_checkpoint() {
        let store = MemoryCheckpointStore::new();
        let mut session = Session::new(sample_history());
        let original = session.persist(&store).await.unwrap();
        session.history.push(Turn::user("more"));
        let forked = session.fork_tag().clone();
        assert_ne!(forked, original);
        session.persist(&store).await.unwrap();
        assert_eq!(store.load(&original).await.unwrap(), sample_history());
        assert_eq!(store.load(&forked).await.unwrap().len(), 5);
    }

    #[test]
    fn fork_tag_assigns_a_tag_to_an_untagged_session() {
        let mut session = Session::new(sample_history());
        let forked = session.fork_tag().clone();
        assert_eq!(session.tag, Some(forked.clone()));
        assert_ne!(session.fork_tag().clone(), forked);
    }
}
