use clap::Parser;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use globcompare::{
    cli::{Cli, OutputFormat},
    config::AppConfig,
    core::{CancelFlag, PatternMatcher, ProgressCounter},
    Document, Error,
};

/// Exit status used when Ctrl+C interrupts matching
const EXIT_CANCELLED: i32 = 130;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(err) = cli.validate() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    cli.setup_logging();

    let config = AppConfig::load(cli.config.as_deref())?;

    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    ctrlc::set_handler(move || {
        flag.cancel();
    })?;

    match run(&cli, &config, &cancel) {
        Ok(()) => Ok(()),
        Err(err) => match err.downcast_ref::<Error>() {
            Some(e) if e.is_cancelled() => {
                tracing::info!("Matching cancelled");
                std::process::exit(EXIT_CANCELLED);
            }
            Some(e) if e.is_internal() => {
                eprintln!("Internal error: {}", e);
                std::process::exit(2);
            }
            _ => Err(err),
        },
    }
}

fn run(cli: &Cli, config: &AppConfig, cancel: &CancelFlag) -> Result<()> {
    let mut progress = ProgressCounter::new(config.matching.progress_log_interval, cancel.clone());
    let matcher = Box::new(PatternMatcher::with_config(&config.matching));

    let mut document = match &cli.document {
        Some(path) => Document::load_with_config(path, matcher, &config.document, &mut progress)
            .with_context(|| format!("Failed to open document {}", path.display()))?,
        None => Document::with_config(matcher, &config.document),
    };

    if !cli.patterns.is_empty() {
        document.set_patterns(cli.patterns.clone(), &mut progress)?;
    }
    if !cli.captions.is_empty() {
        document.set_caption_templates(cli.captions.clone())?;
    }
    if let Some(layout) = cli.layout {
        document.set_layout(layout)?;
    }
    for key in &cli.bookmarks {
        match document.find_instance_by_key(key) {
            Some(index) => {
                let bookmarked = document.toggle_bookmark(index)?;
                tracing::debug!("Bookmark on '{}' is now {}", key, if bookmarked { "set" } else { "cleared" });
            }
            None => tracing::warn!("No instance with key '{}'", key),
        }
    }

    tracing::info!(
        "{} pattern(s), {} instance(s), {} bookmark(s), {} entries visited",
        document.patterns().len(),
        document.instances().len(),
        document.bookmarks().len(),
        progress.visited()
    );

    match cli.output {
        OutputFormat::Text => print_text(&document, config)?,
        OutputFormat::Json => print_json(&document)?,
        OutputFormat::Compact => print_compact(&document, config)?,
    }

    if let Some(path) = &cli.save {
        document
            .save_as(path)
            .with_context(|| format!("Failed to save document to {}", path.display()))?;
    }

    Ok(())
}

#[derive(Serialize)]
struct InstanceRecord<'a> {
    index: usize,
    key: String,
    bookmarked: bool,
    values: &'a [String],
    paths: &'a [Option<PathBuf>],
    captions: Vec<String>,
}

fn print_text(document: &Document, config: &AppConfig) -> Result<()> {
    for index in 0..document.instances().len() {
        let instance = document.instance(index)?;
        let marker = if document.is_bookmarked(index) { '*' } else { ' ' };
        let key = document.instance_key(index)?;
        println!("{} [{}] {}", marker, index + 1, if key.is_empty() { "-" } else { key.as_str() });

        for (slot, caption) in document.captions(index)?.iter().enumerate() {
            if instance.path(slot).is_some() {
                println!("    {}", caption);
            } else {
                println!("    {}", config.output.missing_placeholder);
            }
        }
    }
    Ok(())
}

fn print_json(document: &Document) -> Result<()> {
    for (index, instance) in document.instances().iter().enumerate() {
        let record = InstanceRecord {
            index,
            key: document.instance_key(index)?,
            bookmarked: document.is_bookmarked(index),
            values: &instance.magic_expression_matches,
            paths: &instance.paths,
            captions: document.captions(index)?,
        };
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(())
}

fn print_compact(document: &Document, config: &AppConfig) -> Result<()> {
    for (index, instance) in document.instances().iter().enumerate() {
        let paths: Vec<String> = instance
            .paths
            .iter()
            .map(|path| match path {
                Some(path) => path.display().to_string(),
                None => config.output.missing_placeholder.clone(),
            })
            .collect();
        println!("{}\t{}", document.instance_key(index)?, paths.join("\t"));
    }
    Ok(())
}
