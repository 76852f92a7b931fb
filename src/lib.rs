pub mod cli;
pub mod config;
pub mod core;
pub mod document;
pub mod error;

pub use crate::core::{
    find_instances, has_magic, translate, CancelFlag, Instance, Matcher, PatternMatch,
    PatternMatcher, PatternMatchingResult, Progress,
};
pub use config::AppConfig;
pub use document::{Document, DocumentEvent, Layout};
pub use error::{Error, Result};
