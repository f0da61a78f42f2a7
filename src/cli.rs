use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{RebaseConfig, UnresolvedBindingPolicy};
use crate::document::RebaseDocument;
use crate::hierarchy::ObjectId;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the document's make-children steps and rebase every asset reference
    Rebase {
        /// Input document (JSON)
        #[arg(long)]
        input: PathBuf,

        /// Where to write the rebased document (defaults to stdout)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Rebase configuration (JSON); missing keys use defaults
        #[arg(long)]
        config: Option<PathBuf>,

        /// Drop clip bindings whose path no longer resolves
        #[arg(long)]
        drop_unresolved_bindings: bool,
    },
    /// Print where old paths point after the document's make-children steps
    Resolve {
        /// Input document (JSON)
        #[arg(long)]
        input: PathBuf,

        /// Object index the paths are relative to
        #[arg(long)]
        anchor: u32,

        /// Paths recorded before the restructuring
        paths: Vec<String>,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Rebase {
            input,
            out,
            config,
            drop_unresolved_bindings,
        } => {
            let mut config = match config {
                Some(path) => load_config(&path)?,
                None => RebaseConfig::default(),
            };
            if drop_unresolved_bindings {
                config.unresolved_clip_bindings = UnresolvedBindingPolicy::Drop;
            }
            rebase(&input, out.as_deref(), &config)?;
        }
        Commands::Resolve {
            input,
            anchor,
            paths,
        } => {
            resolve(&input, ObjectId(anchor), &paths)?;
        }
    }
    Ok(())
}

fn load_document(path: &Path) -> Result<RebaseDocument> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read document {}", path.display()))?;
    RebaseDocument::from_json(&contents)
        .with_context(|| format!("Failed to parse document {}", path.display()))
}

fn load_config(path: &Path) -> Result<RebaseConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config {}", path.display()))
}

fn rebase(input: &Path, out: Option<&Path>, config: &RebaseConfig) -> Result<()> {
    let mut document = load_document(input)?;
    let report = document.apply(config)?;

    eprintln!(
        "Rebased {} references ({} assets created, {} components skipped)",
        report.references_rewritten, report.assets_created, report.components_skipped
    );

    let json = document.to_json_pretty()?;
    match out {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{}", json),
    }
    Ok(())
}

fn resolve(input: &Path, anchor: ObjectId, paths: &[String]) -> Result<()> {
    let document = load_document(input)?;
    let resolved = document.resolve_paths(anchor, paths)?;

    for (path, result) in paths.iter().zip(resolved) {
        match result {
            Some(new_path) => println!("{:?} -> {:?}", path, new_path),
            None => println!("{:?} -> <no mapping>", path),
        }
    }
    Ok(())
}
