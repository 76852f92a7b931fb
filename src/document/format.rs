//! On-disk document format
//!
//! Documents are JSON records:
//!
//! ```json
//! {
//!   "version": 1,
//!   "layout": { "rows": 1, "columns": 2 },
//!   "patterns": ["before/*.png", "after/*.png"],
//!   "captionTemplates": ["%p", "%p"],
//!   "bookmarks": [["frame1"], ["frame7"]]
//! }
//! ```
//!
//! `captionTemplates` and `bookmarks` are optional; `layout` falls back to a
//! layout derived from the number of patterns.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Layout;
use crate::error::{Error, Result};

/// Newest document version this build reads and the one it writes
pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFile {
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    pub patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption_templates: Option<Vec<String>>,
    #[serde(default)]
    pub bookmarks: Vec<Vec<String>>,
}

impl DocumentFile {
    /// Reads and validates a document file
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| Error::io(path, err))?;
        Self::parse(&text, path)
    }

    /// Parses document JSON; `path` is only used in error messages
    pub fn parse(text: &str, path: &Path) -> Result<Self> {
        let file: DocumentFile =
            serde_json::from_str(text).map_err(|err| Error::malformed(path, err.to_string()))?;

        if file.version > DOCUMENT_VERSION {
            return Err(Error::UnsupportedVersion {
                path: path.to_path_buf(),
                version: file.version,
                supported: DOCUMENT_VERSION,
            });
        }
        if let Some(templates) = &file.caption_templates {
            if templates.len() != file.patterns.len() {
                return Err(Error::malformed(
                    path,
                    format!(
                        "{} caption template(s) for {} pattern(s)",
                        templates.len(),
                        file.patterns.len()
                    ),
                ));
            }
        }
        Ok(file)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        fs::write(path, json).map_err(|err| Error::io(path, err))
    }
}
