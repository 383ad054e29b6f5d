use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { modified: SystemTime },
    Dir(Vec<String>), // List of child names
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    /// Monotonic clock so every write gets a strictly later mtime.
    clock: u64,
}

/// In-memory filesystem with explicit modification times.
///
/// Every `add_file` / `touch` advances an internal clock by one second, so
/// tests get strictly increasing mtimes without sleeping.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

const EPOCH_OFFSET_SECS: u64 = 1_700_000_000;

impl MockFileSystem {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        // Ensure root exists
        entries.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            state: Arc::new(Mutex::new(MockState { entries, clock: 0 })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create (or overwrite) a file and return the modification time it got.
    pub fn add_file(&self, path: impl AsRef<Path>) -> SystemTime {
        let mut state = self.lock();
        let modified = next_tick(&mut state);
        insert_file(&mut state, path.as_ref(), modified);
        modified
    }

    /// Bump the modification time of an existing (or new) file.
    pub fn touch(&self, path: impl AsRef<Path>) -> SystemTime {
        self.add_file(path)
    }

    /// Set an explicit modification time, e.g. to move a file back in time.
    pub fn set_modified(&self, path: impl AsRef<Path>, modified: SystemTime) {
        let mut state = self.lock();
        insert_file(&mut state, path.as_ref(), modified);
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut state = self.lock();
        state.entries.remove(path);
        let parent = parent_of(path);
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if let Some(MockEntry::Dir(children)) = state.entries.get_mut(&parent) {
                children.retain(|c| c != name);
            }
        }
    }
}

fn next_tick(state: &mut MockState) -> SystemTime {
    state.clock += 1;
    SystemTime::UNIX_EPOCH + Duration::from_secs(EPOCH_OFFSET_SECS + state.clock)
}

fn parent_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn insert_file(state: &mut MockState, path: &Path, modified: SystemTime) {
    state
        .entries
        .insert(path.to_path_buf(), MockEntry::File { modified });

    // Ensure parent directories exist implicitly for simplicity in this mock
    if path.parent().is_some() {
        let parent = parent_of(path);
        ensure_dir_entry(&mut state.entries, &parent);
        link_child(&mut state.entries, &parent, path);
    }
}

fn ensure_dir_entry(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
    if entries.contains_key(path) {
        return;
    }
    entries.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
    if let Some(parent) = path.parent() {
        let parent = if parent.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            parent.to_path_buf()
        };

        if parent != path {
            // Avoid infinite loop at root
            ensure_dir_entry(entries, &parent);
            link_child(entries, &parent, path);
        }
    }
}

fn link_child(entries: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
    if let Some(MockEntry::Dir(children)) = entries.get_mut(parent) {
        if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.lock().entries.contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::Dir(_)))
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        match self.lock().entries.get(path) {
            Some(MockEntry::File { modified }) => Ok(*modified),
            Some(MockEntry::Dir(_)) => Ok(SystemTime::UNIX_EPOCH),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.lock().entries.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
