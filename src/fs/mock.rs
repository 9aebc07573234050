// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { content: Vec<u8>, executable: bool },
    Dir,
}

/// In-memory filesystem for tests.
///
/// Clones share the same underlying map, so a test can keep a handle and
/// inspect what a pipeline wrote.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref();
        let mut entries = self.entries();
        Self::ensure_parents(&mut entries, path);
        entries.insert(
            path.to_path_buf(),
            MockEntry::File {
                content: content.into(),
                executable: false,
            },
        );
    }

    /// Create several empty files at once.
    pub fn touch_all<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            self.add_file(path, Vec::new());
        }
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        self.entries().remove(path.as_ref());
    }

    pub fn is_dir(&self, path: impl AsRef<Path>) -> bool {
        matches!(self.entries().get(path.as_ref()), Some(MockEntry::Dir))
    }

    fn ensure_parents(entries: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            entries.entry(dir.to_path_buf()).or_insert(MockEntry::Dir);
            current = dir.parent();
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        match self.entries().get(path) {
            Some(MockEntry::File { content, .. }) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn append(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut entries = self.entries();
        Self::ensure_parents(&mut entries, path);
        match entries.get_mut(path) {
            Some(MockEntry::File { content, .. }) => content.extend_from_slice(contents),
            Some(MockEntry::Dir) => return Err(anyhow!("Is a directory: {:?}", path)),
            None => {
                entries.insert(
                    path.to_path_buf(),
                    MockEntry::File {
                        content: contents.to_vec(),
                        executable: false,
                    },
                );
            }
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.entries().contains_key(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut entries = self.entries();
        if let Some(MockEntry::File { .. }) = entries.get(path) {
            return Err(anyhow!("Not a directory: {:?}", path));
        }
        Self::ensure_parents(&mut entries, path);
        entries.insert(path.to_path_buf(), MockEntry::Dir);
        Ok(())
    }

    fn set_executable(&self, path: &Path) -> Result<()> {
        match self.entries().get_mut(path) {
            Some(MockEntry::File { executable, .. }) => {
                *executable = true;
                Ok(())
            }
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn is_executable(&self, path: &Path) -> bool {
        matches!(
            self.entries().get(path),
            Some(MockEntry::File { executable: true, .. })
        )
    }
}
