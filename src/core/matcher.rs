//! Matching a single pattern against the filesystem
//!
//! The pattern is globbed, then the translated regex is applied to every
//! non-directory result to pull out the values captured by each wildcard.

use std::num::NonZeroUsize;
use std::path::{is_separator, PathBuf, MAIN_SEPARATOR};
use std::sync::Arc;

use lru::LruCache;
use regex::Regex;
use serde::Serialize;

use super::glob::{FileSystem, GlobEngine, OsFileSystem};
use super::progress::Progress;
use super::translate::translate;
use crate::config::MatchingConfig;
use crate::error::{Error, Result};

/// One file matched by a pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternMatch {
    pub path: PathBuf,
    /// Values captured by the pattern's wildcards, in pattern order
    pub magic_expression_matches: Vec<String>,
}

/// All files matched by one pattern, in no particular order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatternMatchingResult {
    pub pattern: String,
    pub num_magic_expressions: usize,
    pub matches: Vec<PatternMatch>,
}

/// Regex compiled from a pattern, with its wildcard count
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pattern: String,
    regex: Regex,
    magic_expressions: usize,
}

impl CompiledPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let translation = translate(pattern);
        let regex = Regex::new(&translation.regex).map_err(|source| Error::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })?;
        if regex.captures_len() != translation.magic_expressions + 1 {
            return Err(Error::Internal(format!(
                "pattern '{}' declares {} wildcard(s) but its regex has {} group(s)",
                pattern,
                translation.magic_expressions,
                regex.captures_len() - 1
            )));
        }
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            magic_expressions: translation.magic_expressions,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn magic_expressions(&self) -> usize {
        self.magic_expressions
    }

    /// Captured wildcard values if `text` matches the whole pattern
    pub fn capture(&self, text: &str) -> Option<Vec<String>> {
        let captures = self.regex.captures(text)?;
        Some(
            captures
                .iter()
                .skip(1)
                .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
                .collect(),
        )
    }
}

/// Something that can turn a pattern into its match set
pub trait Matcher {
    fn match_pattern(
        &mut self,
        pattern: &str,
        progress: &mut dyn Progress,
    ) -> Result<PatternMatchingResult>;
}

/// Matcher backed by the glob engine
pub struct PatternMatcher<F = OsFileSystem> {
    engine: GlobEngine<F>,
    compiled: LruCache<String, Arc<CompiledPattern>>,
}

impl PatternMatcher<OsFileSystem> {
    pub fn new() -> Self {
        Self::with_config(&MatchingConfig::default())
    }

    pub fn with_config(config: &MatchingConfig) -> Self {
        Self::with_engine(GlobEngine::new(), config.compiled_cache_size)
    }
}

impl Default for PatternMatcher<OsFileSystem> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FileSystem> PatternMatcher<F> {
    pub fn with_engine(engine: GlobEngine<F>, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            engine,
            compiled: LruCache::new(capacity),
        }
    }

    /// Compiled form of `pattern`, reusing a cached one when available
    pub fn compile(&mut self, pattern: &str) -> Result<Arc<CompiledPattern>> {
        if let Some(compiled) = self.compiled.get(pattern) {
            return Ok(Arc::clone(compiled));
        }
        let compiled = Arc::new(CompiledPattern::new(pattern)?);
        self.compiled.put(pattern.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> (usize, usize) {
        (self.compiled.len(), self.compiled.cap().get())
    }
}

impl<F: FileSystem> Matcher for PatternMatcher<F> {
    fn match_pattern(
        &mut self,
        pattern: &str,
        progress: &mut dyn Progress,
    ) -> Result<PatternMatchingResult> {
        let native = normalize_separators(pattern);
        let expanded = self.engine.expand_home(&native)?;
        let paths = self.engine.glob_expanded(&expanded, true, progress)?;
        let compiled = self.compile(&expanded)?;

        let mut matches = Vec::with_capacity(paths.len());
        for path in paths {
            if self.engine.file_system().is_dir(&path) {
                continue;
            }
            let text = path.to_str().ok_or_else(|| {
                Error::Internal(format!("glob produced a non UTF-8 path {:?}", path))
            })?;
            let captured = compiled.capture(text).ok_or_else(|| {
                Error::Internal(format!(
                    "path '{}' found by glob does not match pattern '{}'",
                    text, expanded
                ))
            })?;
            if captured.len() != compiled.magic_expressions() {
                return Err(Error::Internal(format!(
                    "path '{}' captured {} value(s), pattern '{}' has {} wildcard(s)",
                    text,
                    captured.len(),
                    expanded,
                    compiled.magic_expressions()
                )));
            }
            matches.push(PatternMatch {
                path,
                magic_expression_matches: captured,
            });
        }

        tracing::debug!("Pattern '{}' matched {} file(s)", pattern, matches.len());
        Ok(PatternMatchingResult {
            pattern: pattern.to_string(),
            num_magic_expressions: compiled.magic_expressions(),
            matches,
        })
    }
}

/// Converts separators to the native one and collapses repeated separators,
/// keeping a leading double separator (UNC and `//` roots)
pub fn normalize_separators(pattern: &str) -> String {
    let mut normalized = String::with_capacity(pattern.len());
    let mut previous_was_separator = false;
    for (i, c) in pattern.chars().enumerate() {
        let separator = is_separator(c);
        if separator && previous_was_separator && i > 1 {
            continue;
        }
        normalized.push(if separator { MAIN_SEPARATOR } else { c });
        previous_was_separator = separator;
    }
    normalized
}
