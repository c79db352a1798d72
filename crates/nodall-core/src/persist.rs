//! Durable key-value storage for the board document.
//!
//! The board is stored as one JSON document `{ "nodes": [...], "edges": [...] }`
//! under a single key. There is no schema version: whatever parses is
//! accepted, then repaired so the model invariants hold again.

use crate::id::NodeId;
use crate::model::Board;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Storage failure.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage i/o failed for key {key:?}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode board: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
}

/// A string-keyed record store.
pub trait KeyValueStore {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

// ─── In-memory ───────────────────────────────────────────────────────────

/// Volatile storage, for tests and sessions that should not touch disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}

// ─── File-backed ─────────────────────────────────────────────────────────

/// One `<key>.json` file per key inside a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` as the storage root, creating it if needed.
    ///
    /// # Errors
    /// Fails when the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: String::new(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key != "."
            && key != ".."
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        let io = |source| StorageError::Io {
            key: key.to_string(),
            source,
        };
        fs::write(&tmp, value).map_err(io)?;
        fs::rename(&tmp, &path).map_err(io)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

// ─── Board document ──────────────────────────────────────────────────────

/// Serialize `board` and store it under `key`.
///
/// # Errors
/// Propagates encoding and storage failures.
pub fn save_board(
    storage: &mut dyn KeyValueStore,
    key: &str,
    board: &Board,
) -> Result<(), StorageError> {
    let json = serde_json::to_string(board)?;
    storage.set(key, &json)?;
    debug!(
        "persisted board under {key:?} ({} nodes, {} edges)",
        board.nodes.len(),
        board.edges.len()
    );
    Ok(())
}

/// Load the board stored under `key`.
///
/// A missing record yields an empty board. A record that does not parse is
/// discarded with a warning and also yields an empty board; a record that
/// parses is passed through [`repair`].
///
/// # Errors
/// Only storage read failures are returned.
pub fn load_board(storage: &dyn KeyValueStore, key: &str) -> Result<Board, StorageError> {
    let Some(text) = storage.get(key)? else {
        debug!("no stored board under {key:?}, starting empty");
        return Ok(Board::new());
    };
    match serde_json::from_str::<Board>(&text) {
        Ok(mut board) => {
            let fixes = repair(&mut board);
            if fixes > 0 {
                warn!("stored board {key:?} needed {fixes} repair(s)");
            }
            Ok(board)
        }
        Err(e) => {
            warn!("stored board {key:?} is malformed ({e}), resetting to empty");
            Ok(Board::new())
        }
    }
}

/// Restore model invariants on a board of unknown provenance. Returns the
/// number of fixes applied.
///
/// - later nodes/edges reusing an id are dropped;
/// - `parent_id` naming a missing or non-group node is cleared (the
///   position is kept as-is since the old frame is unknown);
/// - edges with a missing endpoint are dropped;
/// - a node stored ahead of its parent is moved to just after it.
pub fn repair(board: &mut Board) -> usize {
    let mut fixes = 0;

    let mut seen: HashSet<NodeId> = HashSet::new();
    board.nodes.retain(|n| {
        let fresh = seen.insert(n.id);
        if !fresh {
            warn!("dropping duplicate node {}", n.id);
            fixes += 1;
        }
        fresh
    });

    let groups: HashSet<NodeId> = board
        .nodes
        .iter()
        .filter(|n| n.is_group())
        .map(|n| n.id)
        .collect();
    for node in &mut board.nodes {
        if let Some(parent) = node.parent_id
            && (!groups.contains(&parent) || parent == node.id)
        {
            warn!("clearing invalid parent {parent} of {}", node.id);
            node.parent_id = None;
            fixes += 1;
        }
    }
    // Break parent cycles by detaching the first node found on one.
    let ids: Vec<NodeId> = board.nodes.iter().map(|n| n.id).collect();
    for id in ids {
        if in_cycle(board, id)
            && let Some(node) = board.node_mut(id)
        {
            warn!("breaking parent cycle at {id}");
            node.parent_id = None;
            fixes += 1;
        }
    }

    let mut edge_ids: HashSet<NodeId> = HashSet::new();
    board.edges.retain(|e| {
        let keep = edge_ids.insert(e.id) && seen.contains(&e.source) && seen.contains(&e.target);
        if !keep {
            warn!("dropping invalid edge {}", e.id);
            fixes += 1;
        }
        keep
    });

    if crate::layout::sort_nodes(board) {
        debug!("re-sorted stored nodes into paint order");
    }
    fixes
}

/// Whether following parents from `id` ever returns to `id`.
fn in_cycle(board: &Board, id: NodeId) -> bool {
    let mut current = board.node(id).and_then(|n| n.parent_id);
    let mut steps = 0;
    while let Some(parent) = current {
        if parent == id {
            return true;
        }
        steps += 1;
        if steps > board.nodes.len() {
            return false;
        }
        current = board.node(parent).and_then(|n| n.parent_id);
    }
    false
}
