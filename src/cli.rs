use std::path::PathBuf;
use clap::{Parser, ValueEnum};

use crate::document::Layout;

#[derive(Parser)]
#[command(name = "globcompare")]
#[command(author = "GlobCompare Team")]
#[command(version = "0.2.0")]
#[command(about = "Match wildcard patterns against the filesystem and line up corresponding files")]
#[command(long_about = "GlobCompare expands one or more wildcard patterns, captures what each wildcard matched, and groups files whose captured values agree into instances. Useful for comparing renders, screenshots or logs across directories.")]
pub struct Cli {
    /// Patterns to match, one per panel
    #[arg(value_name = "PATTERN", help = "Wildcard patterns (*, **, ?, [...])")]
    pub patterns: Vec<String>,

    /// Saved document to open
    #[arg(short, long, value_name = "FILE", help = "Open a saved comparison document")]
    pub document: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text", help = "Output format")]
    pub output: OutputFormat,

    /// Caption templates, one per pattern
    #[arg(long = "caption", value_name = "TEMPLATE", help = "Caption template per pattern (%p is the path)")]
    pub captions: Vec<String>,

    /// Panel layout
    #[arg(long, value_name = "RxC", help = "Panel layout, e.g. 2x2")]
    pub layout: Option<Layout>,

    /// Instance keys to toggle bookmarks on
    #[arg(long = "bookmark", value_name = "KEY", help = "Toggle the bookmark on an instance key")]
    pub bookmarks: Vec<String>,

    /// Where to write the resulting document
    #[arg(long, value_name = "FILE", help = "Save the resulting document")]
    pub save: Option<PathBuf>,

    /// Configuration file
    #[arg(long, value_name = "FILE", help = "TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One block per instance with captions
    Text,
    /// JSON output for scripting
    Json,
    /// Key and paths, tab separated
    Compact,
}

impl Cli {
    pub fn setup_logging(&self) {
        let level = if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.patterns.is_empty() && self.document.is_none() {
            return Err("Give at least one pattern or --document".to_string());
        }

        if let Some(document) = &self.document {
            if !document.is_file() {
                return Err(format!("Document does not exist: {}", document.display()));
            }
        }

        if !self.captions.is_empty()
            && !self.patterns.is_empty()
            && self.captions.len() != self.patterns.len()
        {
            return Err(format!(
                "{} caption(s) given for {} pattern(s)",
                self.captions.len(),
                self.patterns.len()
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "globcompare",
            "a/*.png",
            "b/*.png",
            "--output",
            "json",
            "--layout",
            "1x2",
            "--bookmark",
            "3",
            "--bookmark",
            "7",
        ])
        .expect("should parse");

        assert_eq!(cli.patterns, vec!["a/*.png", "b/*.png"]);
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.layout, Some(Layout::new(1, 2)));
        assert_eq!(cli.bookmarks, vec!["3", "7"]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let cli = Cli::try_parse_from(["globcompare"]).expect("should parse");
        assert!(cli.validate().is_err());

        let cli = Cli::try_parse_from(["globcompare", "a/*", "--caption", "x", "--caption", "y"])
            .expect("should parse");
        assert!(cli.validate().is_err());

        assert!(Cli::try_parse_from(["globcompare", "a/*", "--layout", "big"]).is_err());
    }
}
