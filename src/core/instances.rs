//! Correlation of pattern matches into instances
//!
//! An instance is one row of the comparison: a path per pattern, all sharing
//! the same captured wildcard values. Patterns without wildcards contribute
//! their single file to every instance.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::path::PathBuf;

use serde::Serialize;

use super::collate::compare_tuples;
use super::matcher::PatternMatchingResult;
use crate::error::{Error, Result};

/// One correlated tuple of per-pattern paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instance {
    /// One entry per pattern; `None` when that pattern has no file for this instance
    pub paths: Vec<Option<PathBuf>>,
    /// Captured values shared by every wildcarded pattern
    pub magic_expression_matches: Vec<String>,
}

impl Instance {
    pub fn path(&self, pattern_index: usize) -> Option<&PathBuf> {
        self.paths.get(pattern_index).and_then(Option::as_ref)
    }
}

/// Returns the wildcard count shared by all wildcarded patterns, or 0 if
/// none has wildcards. Patterns without wildcards are exempt.
pub fn check_wildcard_counts<'a, I>(counts: I) -> Result<usize>
where
    I: IntoIterator<Item = (&'a str, usize)>,
{
    let mut expected = 0;
    for (pattern, count) in counts {
        if count == 0 {
            continue;
        }
        if expected == 0 {
            expected = count;
        } else if count != expected {
            return Err(Error::InconsistentWildcardCount {
                pattern: pattern.to_string(),
                expected,
                found: count,
            });
        }
    }
    Ok(expected)
}

/// Groups the match sets of several patterns into naturally sorted instances
pub fn find_instances<R>(results: &[R]) -> Result<Vec<Instance>>
where
    R: Borrow<PatternMatchingResult>,
{
    if results.is_empty() {
        return Ok(Vec::new());
    }

    let num_magic_expressions = check_wildcard_counts(
        results
            .iter()
            .map(|r| (r.borrow().pattern.as_str(), r.borrow().num_magic_expressions)),
    )?;
    let pattern_count = results.len();

    if num_magic_expressions == 0 {
        let paths = results
            .iter()
            .map(|r| r.borrow().matches.first().map(|m| m.path.clone()))
            .collect();
        return Ok(vec![Instance {
            paths,
            magic_expression_matches: Vec::new(),
        }]);
    }

    let mut slots: HashMap<&[String], usize> = HashMap::new();
    let mut instances: Vec<Instance> = Vec::new();

    for (pattern_index, result) in results.iter().enumerate() {
        let result = result.borrow();
        if result.num_magic_expressions == 0 {
            continue;
        }
        for m in &result.matches {
            let slot = *slots
                .entry(m.magic_expression_matches.as_slice())
                .or_insert_with(|| {
                    instances.push(Instance {
                        paths: vec![None; pattern_count],
                        magic_expression_matches: m.magic_expression_matches.clone(),
                    });
                    instances.len() - 1
                });
            instances[slot].paths[pattern_index] = Some(m.path.clone());
        }
    }

    for (pattern_index, result) in results.iter().enumerate() {
        let result = result.borrow();
        if result.num_magic_expressions != 0 {
            continue;
        }
        if let [only] = result.matches.as_slice() {
            for instance in &mut instances {
                instance.paths[pattern_index] = Some(only.path.clone());
            }
        }
    }

    instances.sort_by(|a, b| compare_tuples(&a.magic_expression_matches, &b.magic_expression_matches));

    tracing::debug!(
        "Correlated {} pattern(s) into {} instance(s)",
        pattern_count,
        instances.len()
    );
    Ok(instances)
}
