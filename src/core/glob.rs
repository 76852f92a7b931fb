//! Shell-style recursive globbing
//!
//! Expansion works directory by directory: the dirname of a pattern is
//! globbed first (directories only), then the basename is expanded inside
//! each resulting directory. A basename of exactly `**` descends recursively.
//! Paths are produced as strings built from the pattern itself, so the
//! regex from [`translate`](super::translate) can re-match them verbatim.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{is_separator, Path, PathBuf, MAIN_SEPARATOR};

use ignore::WalkBuilder;
use regex::Regex;

use super::progress::{Cancelled, Progress};
use super::translate::{has_magic, translate};
use crate::error::{Error, Result};

/// Name used for the directory itself in a recursive `**` expansion
const CURRENT_DIR: &str = ".";

/// Type of a filesystem entry as reported by the entry itself (symlinks not followed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

/// Filesystem oracle used by the glob engine.
///
/// All methods absorb I/O errors: a directory that cannot be read simply has
/// no entries.
pub trait FileSystem {
    /// Kind of the entry at `path` without following symlinks, `None` if absent
    fn entry_kind(&self, path: &Path) -> Option<EntryKind>;

    /// Whether `path` resolves to a directory, following symlinks
    fn is_dir(&self, path: &Path) -> bool;

    /// Names of the entries in `dir` (`""` means the current directory)
    fn list_dir(&self, dir: &Path, dirs_only: bool) -> Vec<String>;

    /// Home directory of the current user, if known
    fn home_dir(&self) -> Option<PathBuf>;

    /// Visits every non-hidden entry below `dir` in pre-order, passing paths
    /// relative to `dir`. Hidden directories are not descended into.
    fn walk(
        &self,
        dir: &Path,
        dirs_only: bool,
        visit: &mut dyn FnMut(&str) -> std::result::Result<(), Cancelled>,
    ) -> std::result::Result<(), Cancelled> {
        let mut stack: Vec<String> = visible_names(self.list_dir(dir, dirs_only))
            .into_iter()
            .rev()
            .collect();

        while let Some(relative) = stack.pop() {
            visit(&relative)?;
            let full = dir.join(&relative);
            let children = visible_names(self.list_dir(&full, dirs_only));
            for name in children.into_iter().rev() {
                stack.push(join(&relative, &name));
            }
        }
        Ok(())
    }
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn entry_kind(&self, path: &Path) -> Option<EntryKind> {
        if path.as_os_str().is_empty() {
            return None;
        }
        let file_type = fs::symlink_metadata(path).ok()?.file_type();
        Some(if file_type.is_symlink() {
            EntryKind::Symlink
        } else if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        })
    }

    fn is_dir(&self, path: &Path) -> bool {
        !path.as_os_str().is_empty() && path.is_dir()
    }

    fn list_dir(&self, dir: &Path, dirs_only: bool) -> Vec<String> {
        let dir = listing_root(dir);
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                if err.kind() == ErrorKind::PermissionDenied {
                    tracing::debug!("Skipping unreadable directory {}: {}", dir.display(), err);
                } else {
                    tracing::trace!("Cannot list {}: {}", dir.display(), err);
                }
                return Vec::new();
            }
        };

        let mut names = Vec::new();
        for entry in entries.flatten() {
            if dirs_only && !entry.path().is_dir() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => tracing::trace!("Skipping non UTF-8 name {:?}", name),
            }
        }
        names
    }

    fn home_dir(&self) -> Option<PathBuf> {
        let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
        std::env::var_os(var)
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
    }

    fn walk(
        &self,
        dir: &Path,
        dirs_only: bool,
        visit: &mut dyn FnMut(&str) -> std::result::Result<(), Cancelled>,
    ) -> std::result::Result<(), Cancelled> {
        let root = listing_root(dir);
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .hidden(true)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!("Error walking {}: {}", root.display(), err);
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            if dirs_only && !entry.path().is_dir() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            match relative.to_str() {
                Some(relative) => visit(relative)?,
                None => tracing::trace!("Skipping non UTF-8 path {:?}", relative),
            }
        }
        Ok(())
    }
}

/// Glob engine over a [`FileSystem`]
#[derive(Debug, Clone, Default)]
pub struct GlobEngine<F = OsFileSystem> {
    fs: F,
}

impl GlobEngine<OsFileSystem> {
    pub fn new() -> Self {
        Self { fs: OsFileSystem }
    }
}

impl<F: FileSystem> GlobEngine<F> {
    pub fn with_file_system(fs: F) -> Self {
        Self { fs }
    }

    pub fn file_system(&self) -> &F {
        &self.fs
    }

    /// Returns every path matching `pattern`, directories included.
    ///
    /// With `recursive`, a path component of exactly `**` matches any number
    /// of nested directories. `progress` is ticked once per visited entry.
    pub fn glob(
        &self,
        pattern: &str,
        recursive: bool,
        progress: &mut dyn Progress,
    ) -> Result<Vec<PathBuf>> {
        let pattern = self.expand_home(pattern)?;
        self.glob_expanded(&pattern, recursive, progress)
    }

    /// Like [`glob`](Self::glob) for a pattern whose `~` was already expanded
    pub fn glob_expanded(
        &self,
        pattern: &str,
        recursive: bool,
        progress: &mut dyn Progress,
    ) -> Result<Vec<PathBuf>> {
        let mut expansion = Expansion {
            fs: &self.fs,
            recursive,
            progress,
            regexes: HashMap::new(),
        };
        let paths = expansion.iglob(pattern, false)?;
        tracing::trace!("Glob '{}' produced {} path(s)", pattern, paths.len());

        Ok(paths
            .into_iter()
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .collect())
    }

    /// Expands a leading `~` or `~/` to the home directory
    pub fn expand_home(&self, pattern: &str) -> Result<String> {
        let Some(rest) = pattern.strip_prefix('~') else {
            return Ok(pattern.to_string());
        };
        if !(rest.is_empty() || rest.starts_with(is_separator)) {
            // `~user` forms are left untouched
            return Ok(pattern.to_string());
        }
        let home = self.fs.home_dir().ok_or(Error::HomeDirectory)?;
        let home = home.to_str().ok_or(Error::HomeDirectory)?;
        let home = home.trim_end_matches(is_separator);
        Ok(if home.is_empty() && !rest.is_empty() {
            rest.to_string()
        } else {
            format!("{}{}", home, rest)
        })
    }
}

/// State of a single glob call
struct Expansion<'a, 'p, F> {
    fs: &'a F,
    recursive: bool,
    progress: &'p mut dyn Progress,
    regexes: HashMap<String, Regex>,
}

impl<F: FileSystem> Expansion<'_, '_, F> {
    fn iglob(&mut self, pathname: &str, dirs_only: bool) -> Result<Vec<String>> {
        let (dirname, basename) = split(pathname);

        if !has_magic(pathname) {
            self.progress.tick()?;
            let found = if basename.is_empty() {
                self.fs.is_dir(Path::new(dirname))
            } else {
                self.fs.entry_kind(Path::new(pathname)).is_some()
            };
            return Ok(if found { vec![pathname.to_string()] } else { Vec::new() });
        }

        if dirname.is_empty() {
            return self.glob_in_dir("", basename, dirs_only);
        }

        let dirs = if dirname != pathname && has_magic(dirname) {
            self.iglob(dirname, true)?
        } else {
            vec![dirname.to_string()]
        };

        let mut results = Vec::new();
        for dir in dirs {
            for name in self.glob_in_dir(&dir, basename, dirs_only)? {
                results.push(join(&dir, &name));
            }
        }
        Ok(results)
    }

    fn glob_in_dir(&mut self, dir: &str, basename: &str, dirs_only: bool) -> Result<Vec<String>> {
        if !has_magic(basename) {
            self.glob0(dir, basename)
        } else if self.recursive && basename == "**" {
            self.glob2(dir, dirs_only)
        } else {
            self.glob1(dir, basename, dirs_only)
        }
    }

    /// Literal basename: a plain existence check
    fn glob0(&mut self, dir: &str, basename: &str) -> Result<Vec<String>> {
        self.progress.tick()?;
        let found = if basename.is_empty() {
            self.fs.is_dir(Path::new(dir))
        } else {
            self.fs.entry_kind(&Path::new(dir).join(basename)).is_some()
        };
        Ok(if found { vec![basename.to_string()] } else { Vec::new() })
    }

    /// Wildcard basename matched against the directory listing
    fn glob1(&mut self, dir: &str, pattern: &str, dirs_only: bool) -> Result<Vec<String>> {
        let mut names = self.fs.list_dir(Path::new(dir), dirs_only);
        if !is_hidden(pattern) {
            names.retain(|name| !is_hidden(name));
        }

        let regex = self.regex(pattern)?.clone();
        let mut matched = Vec::new();
        for name in names {
            self.progress.tick()?;
            if regex.is_match(&name) {
                matched.push(name);
            }
        }
        Ok(matched)
    }

    /// `**`: the directory itself followed by everything below it
    fn glob2(&mut self, dir: &str, dirs_only: bool) -> Result<Vec<String>> {
        let mut names = vec![CURRENT_DIR.to_string()];
        let progress = &mut *self.progress;
        self.fs.walk(Path::new(dir), dirs_only, &mut |relative| {
            progress.tick()?;
            names.push(relative.to_string());
            Ok(())
        })?;
        Ok(names)
    }

    fn regex(&mut self, pattern: &str) -> Result<&Regex> {
        if !self.regexes.contains_key(pattern) {
            let translation = translate(pattern);
            let regex = Regex::new(&translation.regex).map_err(|source| Error::InvalidRegex {
                pattern: pattern.to_string(),
                source,
            })?;
            self.regexes.insert(pattern.to_string(), regex);
        }
        self.regexes
            .get(pattern)
            .ok_or_else(|| Error::Internal(format!("regex for '{}' missing from cache", pattern)))
    }
}

fn listing_root(dir: &Path) -> &Path {
    if dir.as_os_str().is_empty() {
        Path::new(CURRENT_DIR)
    } else {
        dir
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn visible_names(names: Vec<String>) -> Vec<String> {
    names.into_iter().filter(|name| !is_hidden(name)).collect()
}

/// Splits a path into dirname and basename, trimming trailing separators
/// from the dirname unless it consists only of separators.
pub(crate) fn split(path: &str) -> (&str, &str) {
    match path.rfind(is_separator) {
        None => ("", path),
        Some(i) => {
            let head = &path[..=i];
            let tail = &path[i + 1..];
            let trimmed = head.trim_end_matches(is_separator);
            (if trimmed.is_empty() { head } else { trimmed }, tail)
        }
    }
}

/// Joins a directory and a name the way the shell does, without normalizing
pub(crate) fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else if dir.ends_with(is_separator) {
        format!("{}{}", dir, name)
    } else {
        format!("{}{}{}", dir, MAIN_SEPARATOR, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::progress::no_progress;
    use crate::core::testing::MemoryFileSystem;
    use std::collections::BTreeSet;

    fn glob_set<F: FileSystem>(engine: &GlobEngine<F>, pattern: &str) -> BTreeSet<String> {
        engine
            .glob(pattern, true, &mut no_progress())
            .expect("glob should succeed")
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split() {
        assert_eq!(split("a/b/c"), ("a/b", "c"));
        assert_eq!(split("c"), ("", "c"));
        assert_eq!(split("a/"), ("a", ""));
        assert_eq!(split("/c"), ("/", "c"));
        assert_eq!(split("a//c"), ("a", "c"));
    }

    #[test]
    fn test_join() {
        assert_eq!(join("", "x"), "x");
        assert_eq!(join("a", "x"), format!("a{}x", MAIN_SEPARATOR));
        assert_eq!(join("a/", "x"), "a/x");
    }

    #[test]
    fn test_literal_pattern_uses_existence_check() {
        let engine = GlobEngine::with_file_system(MemoryFileSystem::with_files(&["a/b.txt"]));
        assert_eq!(glob_set(&engine, "a/b.txt"), set(&["a/b.txt"]));
        assert!(glob_set(&engine, "a/missing.txt").is_empty());
        assert_eq!(glob_set(&engine, "a/"), set(&["a/"]));
        assert!(glob_set(&engine, "a/b.txt/").is_empty());
    }

    #[test]
    fn test_wildcards_in_dirname_and_basename() {
        let fs = MemoryFileSystem::with_files(&[
            "p1/ab1/foo/c1.png",
            "p1/ab1/foo/c2.png",
            "p1/ab23/foo/c1.png",
            "p1/ab23/foo/c1.jpg",
            "p1/xy/foo/c1.png",
        ]);
        let engine = GlobEngine::with_file_system(fs);
        assert_eq!(
            glob_set(&engine, "p1/ab*/foo/*.png"),
            set(&["p1/ab1/foo/c1.png", "p1/ab1/foo/c2.png", "p1/ab23/foo/c1.png"])
        );
    }

    #[test]
    fn test_hidden_entries_are_skipped_unless_pattern_is_hidden() {
        let fs = MemoryFileSystem::with_files(&["d/.hidden", "d/shown"]);
        let engine = GlobEngine::with_file_system(fs);
        assert_eq!(glob_set(&engine, "d/*"), set(&["d/shown"]));
        assert_eq!(glob_set(&engine, "d/.*"), set(&["d/.hidden"]));
    }

    #[test]
    fn test_recursive_descent_with_default_walk() {
        let fs = MemoryFileSystem::with_files(&["r/a/x.png", "r/a/b/x.png", "r/x.png", "r/.git/x.png"]);
        let engine = GlobEngine::with_file_system(fs);
        assert_eq!(
            glob_set(&engine, "r/**/x.png"),
            set(&["r/./x.png", "r/a/x.png", "r/a/b/x.png"])
        );
        assert_eq!(
            glob_set(&engine, "r/**"),
            set(&["r/.", "r/a", "r/a/x.png", "r/a/b", "r/a/b/x.png", "r/x.png"])
        );
    }

    #[test]
    fn test_non_recursive_double_star_matches_one_level() {
        let fs = MemoryFileSystem::with_files(&["r/a/x.png", "r/a/b/x.png"]);
        let engine = GlobEngine::with_file_system(fs);
        let paths: BTreeSet<String> = engine
            .glob("r/**/x.png", false, &mut no_progress())
            .expect("glob should succeed")
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        assert_eq!(paths, set(&["r/a/x.png"]));
    }

    #[test]
    fn test_home_expansion() {
        let fs = MemoryFileSystem::with_files(&["home/me/pics/a.png"]).with_home("home/me");
        let engine = GlobEngine::with_file_system(fs);
        assert_eq!(glob_set(&engine, "~/pics/*.png"), set(&["home/me/pics/a.png"]));
    }

    #[test]
    fn test_missing_home_is_an_error() {
        let engine = GlobEngine::with_file_system(MemoryFileSystem::default());
        let err = engine
            .glob("~/x", true, &mut no_progress())
            .expect_err("expansion should fail");
        assert!(matches!(err, Error::HomeDirectory));
        // `~user` is not expanded
        assert!(engine.glob("~user/x", true, &mut no_progress()).is_ok());
    }

    #[test]
    fn test_cancellation_propagates() {
        let fs = MemoryFileSystem::with_files(&["r/a/x.png", "r/b/x.png", "r/c/x.png"]);
        let engine = GlobEngine::with_file_system(fs);
        let mut ticks = 0;
        let mut progress = || {
            ticks += 1;
            if ticks > 2 { Err(Cancelled) } else { Ok(()) }
        };
        let err = engine
            .glob("r/**/*.png", true, &mut progress)
            .expect_err("glob should be cancelled");
        assert!(err.is_cancelled());
    }
}
