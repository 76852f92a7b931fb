//! Comparison documents
//!
//! A [`Document`] owns the pattern list, caption templates, layout and
//! bookmarks, and keeps the instance list in sync with the patterns. Match
//! results are shared between successive pattern lists so that editing one
//! pattern only rescans that pattern.
//!
//! Instance indices change whenever instances are regenerated; bookmarks and
//! the current instance are therefore carried across by their captured
//! values, never by index.

pub mod captions;
pub mod format;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use captions::{render_captions, update_caption_templates, PATH_PLACEHOLDER};
pub use format::{DocumentFile, DOCUMENT_VERSION};

use crate::config::DocumentConfig;
use crate::core::{
    check_wildcard_counts, find_instances, translate, Instance, Matcher, PatternMatchingResult,
    Progress,
};
use crate::error::{Error, Result};

/// Grid of panels used to display one instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub rows: usize,
    pub columns: usize,
}

impl Layout {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self { rows, columns }
    }

    /// Number of panels, `None` if it does not fit in `usize`
    pub fn panels(&self) -> Option<usize> {
        self.rows.checked_mul(self.columns)
    }

    /// Whether every one of `patterns` gets a panel
    pub fn can_host(&self, patterns: usize) -> bool {
        matches!(self.panels(), Some(panels) if panels > 0 && panels >= patterns)
    }

    /// Smallest near-square grid with at least `panels` panels, wider than tall
    pub fn for_panels(panels: usize) -> Self {
        let panels = panels.max(1);
        let mut columns = 1;
        while columns * columns < panels {
            columns += 1;
        }
        let rows = (panels + columns - 1) / columns;
        Self { rows, columns }
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl FromStr for Layout {
    type Err = String;

    /// Parses `ROWSxCOLUMNS`, e.g. `2x3`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (rows, columns) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected ROWSxCOLUMNS, got '{}'", s))?;
        let rows = rows.trim().parse().map_err(|_| format!("invalid row count '{}'", rows))?;
        let columns = columns
            .trim()
            .parse()
            .map_err(|_| format!("invalid column count '{}'", columns))?;
        let layout = Layout::new(rows, columns);
        match layout.panels() {
            None => Err(format!("layout {}x{} has too many panels", rows, columns)),
            Some(0) => Err("layout must have at least one panel".to_string()),
            Some(_) => Ok(layout),
        }
    }
}

/// Notifications sent to subscribers after a document changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    InstancesChanged,
    BookmarksChanged,
    CurrentInstanceChanged(Option<usize>),
    CaptionsChanged,
    LayoutChanged(Layout),
    ModifiedChanged(bool),
}

pub struct Document {
    matcher: Box<dyn Matcher>,
    patterns: Vec<String>,
    results: Vec<Arc<PatternMatchingResult>>,
    caption_templates: Vec<String>,
    layout: Layout,
    instances: Vec<Instance>,
    bookmarks: BTreeSet<usize>,
    current_instance: Option<usize>,
    modified: bool,
    path: Option<PathBuf>,
    default_caption_template: String,
    key_separator: String,
    subscribers: Vec<Sender<DocumentEvent>>,
}

impl Document {
    /// Creates an empty, unmodified document
    pub fn new(matcher: Box<dyn Matcher>) -> Self {
        Self::with_config(matcher, &DocumentConfig::default())
    }

    pub fn with_config(matcher: Box<dyn Matcher>, config: &DocumentConfig) -> Self {
        Self {
            matcher,
            patterns: Vec::new(),
            results: Vec::new(),
            caption_templates: Vec::new(),
            layout: Layout::default(),
            instances: Vec::new(),
            bookmarks: BTreeSet::new(),
            current_instance: None,
            modified: false,
            path: None,
            default_caption_template: config.default_caption_template.clone(),
            key_separator: config.key_separator.clone(),
            subscribers: Vec::new(),
        }
    }

    /// Opens a saved document and matches its patterns
    pub fn load(path: &Path, matcher: Box<dyn Matcher>, progress: &mut dyn Progress) -> Result<Self> {
        Self::load_with_config(path, matcher, &DocumentConfig::default(), progress)
    }

    pub fn load_with_config(
        path: &Path,
        matcher: Box<dyn Matcher>,
        config: &DocumentConfig,
        progress: &mut dyn Progress,
    ) -> Result<Self> {
        let file = DocumentFile::read(path)?;
        let mut document = Self::with_config(matcher, config);
        document.apply_file(file, progress)?;
        document.path = Some(path.to_path_buf());
        tracing::info!(
            "Loaded document {} with {} pattern(s) and {} instance(s)",
            path.display(),
            document.patterns.len(),
            document.instances.len()
        );
        Ok(document)
    }

    fn apply_file(&mut self, file: DocumentFile, progress: &mut dyn Progress) -> Result<()> {
        let pattern_count = file.patterns.len();
        check_pattern_counts(&file.patterns)?;
        let results = self.match_patterns(&file.patterns, false, progress)?;
        let instances = find_instances(&results)?;

        self.caption_templates = file
            .caption_templates
            .unwrap_or_else(|| vec![self.default_caption_template.clone(); pattern_count]);
        self.layout = match file.layout {
            Some(layout) if layout.can_host(pattern_count) => layout,
            _ => Layout::for_panels(pattern_count),
        };
        self.patterns = file.patterns;
        self.results = results;
        self.install_instances(instances, file.bookmarks, None);
        self.modified = false;
        Ok(())
    }

    /// Writes the document back to the file it was loaded from or last saved to
    pub fn save(&mut self) -> Result<()> {
        let path = self.path.clone().ok_or(Error::NoDocumentPath)?;
        self.save_as(&path)
    }

    pub fn save_as(&mut self, path: &Path) -> Result<()> {
        self.to_file().write(path)?;
        self.path = Some(path.to_path_buf());
        self.set_modified(false);
        tracing::info!("Saved document to {}", path.display());
        Ok(())
    }

    /// Serializable form; bookmarks are stored by captured values
    pub fn to_file(&self) -> DocumentFile {
        DocumentFile {
            version: DOCUMENT_VERSION,
            layout: Some(self.layout),
            patterns: self.patterns.clone(),
            caption_templates: Some(self.caption_templates.clone()),
            bookmarks: self.bookmark_keys(),
        }
    }

    /// Registers an observer; dropped receivers are forgotten on the next event
    pub fn subscribe(&mut self) -> Receiver<DocumentEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Match results per pattern slot
    pub fn pattern_results(&self) -> &[Arc<PatternMatchingResult>] {
        &self.results
    }

    pub fn caption_templates(&self) -> &[String] {
        &self.caption_templates
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn instance(&self, index: usize) -> Result<&Instance> {
        self.instances.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.instances.len(),
        })
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Replaces the pattern list and recomputes instances.
    ///
    /// Only patterns whose string is new get rescanned. On any error,
    /// including cancellation, the document is left untouched.
    pub fn set_patterns(&mut self, patterns: Vec<String>, progress: &mut dyn Progress) -> Result<()> {
        if patterns == self.patterns {
            return Ok(());
        }
        check_pattern_counts(&patterns)?;

        let results = self.match_patterns(&patterns, true, progress)?;
        let instances = find_instances(&results)?;
        let templates = update_caption_templates(
            &self.caption_templates,
            &self.patterns,
            &patterns,
            &self.default_caption_template,
        );

        let bookmark_keys = self.bookmark_keys();
        let current_key = self.current_key();
        let pattern_count = patterns.len();

        self.patterns = patterns;
        self.results = results;
        self.caption_templates = templates;
        if !self.layout.can_host(pattern_count) {
            self.layout = Layout::for_panels(pattern_count);
            self.emit(DocumentEvent::LayoutChanged(self.layout));
        }
        self.install_instances(instances, bookmark_keys, current_key);
        self.emit(DocumentEvent::CaptionsChanged);
        self.set_modified(true);
        Ok(())
    }

    /// Rescans every pattern, e.g. to pick up files created since the last scan
    pub fn regenerate_instances(&mut self, progress: &mut dyn Progress) -> Result<()> {
        let patterns = self.patterns.clone();
        let results = self.match_patterns(&patterns, false, progress)?;
        let instances = find_instances(&results)?;

        let bookmark_keys = self.bookmark_keys();
        let current_key = self.current_key();
        self.results = results;
        self.install_instances(instances, bookmark_keys, current_key);
        Ok(())
    }

    fn match_patterns(
        &mut self,
        patterns: &[String],
        reuse: bool,
        progress: &mut dyn Progress,
    ) -> Result<Vec<Arc<PatternMatchingResult>>> {
        let mut known: HashMap<String, Arc<PatternMatchingResult>> = if reuse {
            self.patterns
                .iter()
                .cloned()
                .zip(self.results.iter().cloned())
                .collect()
        } else {
            HashMap::new()
        };

        let mut results = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let result = match known.get(pattern) {
                Some(result) => {
                    tracing::trace!("Reusing matches for '{}'", pattern);
                    Arc::clone(result)
                }
                None => {
                    let result = Arc::new(self.matcher.match_pattern(pattern, progress)?);
                    known.insert(pattern.clone(), Arc::clone(&result));
                    result
                }
            };
            results.push(result);
        }
        Ok(results)
    }

    fn install_instances(
        &mut self,
        instances: Vec<Instance>,
        bookmark_keys: Vec<Vec<String>>,
        current_key: Option<Vec<String>>,
    ) {
        let (bookmarks, current) = {
            let by_key: HashMap<&[String], usize> = instances
                .iter()
                .enumerate()
                .map(|(i, instance)| (instance.magic_expression_matches.as_slice(), i))
                .collect();
            let bookmarks: BTreeSet<usize> = bookmark_keys
                .iter()
                .filter_map(|key| by_key.get(key.as_slice()).copied())
                .collect();
            let current = current_key
                .and_then(|key| by_key.get(key.as_slice()).copied())
                .or(if instances.is_empty() { None } else { Some(0) });
            (bookmarks, current)
        };

        let dropped = bookmark_keys.len() - bookmarks.len();
        if dropped > 0 {
            tracing::debug!("Dropped {} bookmark(s) with no matching instance", dropped);
        }

        self.instances = instances;
        self.bookmarks = bookmarks;
        self.current_instance = current;
        self.emit(DocumentEvent::InstancesChanged);
        self.emit(DocumentEvent::BookmarksChanged);
        self.emit(DocumentEvent::CurrentInstanceChanged(current));
    }

    /// Caption per panel for the given instance, with `%p` replaced by its path
    pub fn captions(&self, index: usize) -> Result<Vec<String>> {
        let instance = self.instance(index)?;
        Ok(render_captions(&self.caption_templates, instance))
    }

    /// Human-readable identifier made of the instance's captured values
    pub fn instance_key(&self, index: usize) -> Result<String> {
        let instance = self.instance(index)?;
        Ok(instance.magic_expression_matches.join(&self.key_separator))
    }

    /// Index of the instance whose key equals `key`
    pub fn find_instance_by_key(&self, key: &str) -> Option<usize> {
        self.instances
            .iter()
            .position(|instance| instance.magic_expression_matches.join(&self.key_separator) == key)
    }

    pub fn set_caption_templates(&mut self, templates: Vec<String>) -> Result<()> {
        if templates.len() != self.patterns.len() {
            return Err(Error::CaptionTemplateCount {
                expected: self.patterns.len(),
                found: templates.len(),
            });
        }
        if templates != self.caption_templates {
            self.caption_templates = templates;
            self.emit(DocumentEvent::CaptionsChanged);
            self.set_modified(true);
        }
        Ok(())
    }

    pub fn set_layout(&mut self, layout: Layout) -> Result<()> {
        if !layout.can_host(self.patterns.len()) {
            return Err(Error::LayoutTooSmall {
                rows: layout.rows,
                columns: layout.columns,
                patterns: self.patterns.len(),
            });
        }
        if layout != self.layout {
            self.layout = layout;
            self.emit(DocumentEvent::LayoutChanged(layout));
            self.set_modified(true);
        }
        Ok(())
    }

    pub fn bookmarks(&self) -> &BTreeSet<usize> {
        &self.bookmarks
    }

    pub fn is_bookmarked(&self, index: usize) -> bool {
        self.bookmarks.contains(&index)
    }

    /// Captured values of every bookmarked instance, in instance order
    pub fn bookmark_keys(&self) -> Vec<Vec<String>> {
        self.bookmarks
            .iter()
            .filter_map(|&i| self.instances.get(i))
            .map(|instance| instance.magic_expression_matches.clone())
            .collect()
    }

    /// Display keys of every bookmarked instance, in instance order
    pub fn bookmarked_instance_keys(&self) -> Vec<String> {
        self.bookmark_keys()
            .iter()
            .map(|key| key.join(&self.key_separator))
            .collect()
    }

    pub fn add_bookmark(&mut self, index: usize) -> Result<()> {
        self.instance(index)?;
        if self.bookmarks.insert(index) {
            self.bookmarks_changed();
        }
        Ok(())
    }

    pub fn remove_bookmark(&mut self, index: usize) -> Result<()> {
        self.instance(index)?;
        if self.bookmarks.remove(&index) {
            self.bookmarks_changed();
        }
        Ok(())
    }

    /// Flips the bookmark on an instance and returns whether it is now bookmarked
    pub fn toggle_bookmark(&mut self, index: usize) -> Result<bool> {
        self.instance(index)?;
        let bookmarked = if self.bookmarks.remove(&index) {
            false
        } else {
            self.bookmarks.insert(index);
            true
        };
        self.bookmarks_changed();
        Ok(bookmarked)
    }

    pub fn remove_all_bookmarks(&mut self) {
        if !self.bookmarks.is_empty() {
            self.bookmarks.clear();
            self.bookmarks_changed();
        }
    }

    fn bookmarks_changed(&mut self) {
        self.emit(DocumentEvent::BookmarksChanged);
        self.set_modified(true);
    }

    pub fn current_instance(&self) -> Option<usize> {
        self.current_instance
    }

    pub fn set_current_instance(&mut self, index: usize) -> Result<()> {
        self.instance(index)?;
        self.move_to(Some(index));
        Ok(())
    }

    /// Moves to the following instance, wrapping around at the end
    pub fn next_instance(&mut self) -> Option<usize> {
        let len = self.instances.len();
        let next = match self.current_instance {
            _ if len == 0 => None,
            Some(i) => Some((i + 1) % len),
            None => Some(0),
        };
        self.move_to(next)
    }

    /// Moves to the preceding instance, wrapping around at the start
    pub fn previous_instance(&mut self) -> Option<usize> {
        let len = self.instances.len();
        let previous = match self.current_instance {
            _ if len == 0 => None,
            Some(i) => Some((i + len - 1) % len),
            None => Some(len - 1),
        };
        self.move_to(previous)
    }

    /// Moves to the next bookmarked instance after the current one, wrapping around
    pub fn next_bookmark(&mut self) -> Option<usize> {
        let next = match self.current_instance {
            Some(current) => self
                .bookmarks
                .range(current + 1..)
                .next()
                .or_else(|| self.bookmarks.iter().next()),
            None => self.bookmarks.iter().next(),
        }
        .copied();
        match next {
            Some(index) => self.move_to(Some(index)),
            None => self.current_instance,
        }
    }

    /// Moves to the previous bookmarked instance before the current one, wrapping around
    pub fn previous_bookmark(&mut self) -> Option<usize> {
        let previous = match self.current_instance {
            Some(current) => self
                .bookmarks
                .range(..current)
                .next_back()
                .or_else(|| self.bookmarks.iter().next_back()),
            None => self.bookmarks.iter().next_back(),
        }
        .copied();
        match previous {
            Some(index) => self.move_to(Some(index)),
            None => self.current_instance,
        }
    }

    fn move_to(&mut self, index: Option<usize>) -> Option<usize> {
        if index != self.current_instance {
            self.current_instance = index;
            self.emit(DocumentEvent::CurrentInstanceChanged(index));
        }
        index
    }

    fn current_key(&self) -> Option<Vec<String>> {
        self.current_instance
            .and_then(|i| self.instances.get(i))
            .map(|instance| instance.magic_expression_matches.clone())
    }

    fn set_modified(&mut self, modified: bool) {
        if self.modified != modified {
            self.modified = modified;
            self.emit(DocumentEvent::ModifiedChanged(modified));
        }
    }

    fn emit(&mut self, event: DocumentEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

/// Checks wildcard counts up front, before any filesystem work
fn check_pattern_counts(patterns: &[String]) -> Result<usize> {
    check_wildcard_counts(
        patterns
            .iter()
            .map(|pattern| (pattern.as_str(), translate(pattern).magic_expressions)),
    )
}
