//! languoid CLI tool
//!
//! Keeps a languoid repository's directory tree and its flat texts in sync.
//!
//! ## Commands
//!
//! - `lff2tree`: merge the classification and dialects texts into the directory tree
//! - `tree2lff`: regenerate both texts from the directory tree
//! - `show`: print one languoid and its ancestors
//!
//! `lff2tree` validates the complete texts before it touches the tree; a rejected input leaves the
//! tree as it was and exits with status 1.

use clap::{Parser, Subcommand};
use languoid_core::repo::Repository;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "languoid")]
#[command(author, version, about = "Synchronize a languoid tree with its classification and dialects texts", long_about = None)]
struct Cli {
    /// Repository root (holds languoids.toml, the texts and the tree)
    #[arg(short, long, default_value = ".")]
    repo: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge the classification and dialects texts into the tree
    Lff2tree,

    /// Write the classification and dialects texts from the tree
    Tree2lff,

    /// Show the languoid with the given identifier or external code
    Show {
        /// Glottocode or external code
        key: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut repo = Repository::open(&cli.repo)?;

    match cli.command {
        Commands::Lff2tree => match repo.lff2tree() {
            Ok(summary) => {
                if summary.is_empty() {
                    println!("Tree is up to date");
                } else {
                    println!("{summary}");
                }
            }
            Err(e) if e.is_validation() => {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
            Err(e) => return Err(e.into()),
        },
        Commands::Tree2lff => {
            repo.tree2lff()?;
            println!(
                "Wrote {:?} and {:?}",
                repo.classification_path(),
                repo.dialects_path()
            );
        }
        Commands::Show { key } => match repo.languoid(&key)? {
            Some(languoid) => {
                println!("{} {languoid}", languoid.level);
                for ancestor in repo.ancestors(&languoid.id)? {
                    println!("  in {} {ancestor}", ancestor.level);
                }
            }
            None => {
                eprintln!("Error: no languoid for '{key}'");
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
