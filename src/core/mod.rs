//! Core functionality module
//!
//! Contains pattern translation, globbing, matching and the correlation of
//! matches into instances.

pub mod collate;
pub mod glob;
pub mod instances;
pub mod matcher;
pub mod progress;
pub mod translate;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types
pub use collate::{compare_tuples, natural_cmp};
pub use glob::{EntryKind, FileSystem, GlobEngine, OsFileSystem};
pub use instances::{check_wildcard_counts, find_instances, Instance};
pub use matcher::{CompiledPattern, Matcher, PatternMatch, PatternMatcher, PatternMatchingResult};
pub use progress::{no_progress, CancelFlag, Cancelled, Progress, ProgressCounter};
pub use translate::{has_magic, translate, translate_with_separator, Translation};
