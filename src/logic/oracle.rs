use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

/// What lives at a probed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    File,
    Dir,
    Missing,
}

/// File-system existence checks used by routing.
///
/// Implementations must be free of side effects.
pub trait FileExistenceOracle: Send + Sync {
    fn probe(&self, path: &Path) -> io::Result<Entry>;

    fn is_file(&self, path: &Path) -> io::Result<bool> {
        Ok(self.probe(path)? == Entry::File)
    }

    fn is_dir(&self, path: &Path) -> io::Result<bool> {
        Ok(self.probe(path)? == Entry::Dir)
    }
}

/// Probes the real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskOracle;

impl FileExistenceOracle for DiskOracle {
    fn probe(&self, path: &Path) -> io::Result<Entry> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(Entry::Dir),
            Ok(meta) if meta.is_file() => Ok(Entry::File),
            Ok(_) => Ok(Entry::Missing),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Entry::Missing),
            // A path component that is a regular file
            Err(err) if err.kind() == io::ErrorKind::NotADirectory => Ok(Entry::Missing),
            Err(err) => Err(err),
        }
    }
}

/// In-memory directory listing. Every ancestor of a registered file is a directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryOracle {
    files: BTreeSet<PathBuf>,
    dirs: BTreeSet<PathBuf>,
}

impl MemoryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.add_file(path);
        self
    }

    pub fn with_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.add_dir(path);
        self
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.add_ancestors(path);
        self.files.insert(path.to_path_buf());
    }

    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.add_ancestors(path);
        self.dirs.insert(path.to_path_buf());
    }

    fn add_ancestors(&mut self, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            if !ancestor.as_os_str().is_empty() {
                self.dirs.insert(ancestor.to_path_buf());
            }
        }
    }
}

impl FileExistenceOracle for MemoryOracle {
    fn probe(&self, path: &Path) -> io::Result<Entry> {
        if self.dirs.contains(path) {
            Ok(Entry::Dir)
        } else if self.files.contains(path) {
            Ok(Entry::File)
        } else {
            Ok(Entry::Missing)
        }
    }
}
