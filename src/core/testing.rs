//! In-memory filesystem for unit tests

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use super::glob::{split, EntryKind, FileSystem};

/// Every path maps to whether it is a directory; paths use `/`
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    entries: BTreeMap<String, bool>,
    home: Option<PathBuf>,
}

impl MemoryFileSystem {
    /// Creates the files and all their parent directories
    pub fn with_files(files: &[&str]) -> Self {
        let mut fs = Self::default();
        for file in files {
            let parts: Vec<&str> = file.split('/').collect();
            for i in 0..parts.len() {
                fs.entries.insert(parts[..=i].join("/"), i + 1 < parts.len());
            }
        }
        fs
    }

    pub fn with_home(mut self, home: &str) -> Self {
        self.home = Some(PathBuf::from(home));
        self
    }
}

/// Lookup key with `.` components dropped
fn key(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

impl FileSystem for MemoryFileSystem {
    fn entry_kind(&self, path: &Path) -> Option<EntryKind> {
        if path.as_os_str().is_empty() {
            return None;
        }
        self.entries.get(&key(path)).map(|&dir| {
            if dir {
                EntryKind::Directory
            } else {
                EntryKind::File
            }
        })
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.entry_kind(path), Some(EntryKind::Directory))
    }

    fn list_dir(&self, dir: &Path, dirs_only: bool) -> Vec<String> {
        let dir = key(dir);
        self.entries
            .iter()
            .filter(|&(_, &is_dir)| is_dir || !dirs_only)
            .filter_map(|(path, _)| {
                let (parent, name) = split(path);
                (parent == dir).then(|| name.to_string())
            })
            .collect()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home.clone()
    }
}
