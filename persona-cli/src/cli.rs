//! Command-line parser.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "persona")]
#[command(about = "Persona chat CLI: manage personas, ingest passages, chat", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage persona categories.
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Create a persona. Instructions and seed are read from files.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        instructions_file: PathBuf,
        #[arg(long)]
        seed_file: PathBuf,
        /// Category id or name.
        #[arg(long)]
        category: String,
        /// Avatar image URL.
        #[arg(long)]
        src: String,
        /// Owner user id.
        #[arg(long)]
        user: String,
        /// Owner display name; defaults to the user id.
        #[arg(long)]
        user_name: Option<String>,
    },
    /// List personas, newest first.
    List {
        /// Category id or name.
        #[arg(long)]
        category: Option<String>,
        /// Case-insensitive name search.
        #[arg(long)]
        search: Option<String>,
    },
    /// Delete a persona and its messages (owner only).
    Delete {
        id: String,
        #[arg(long)]
        user: String,
    },
    /// Index a text file as long-term context for a persona (passages split on blank lines).
    Ingest { persona_id: String, file: PathBuf },
    /// Show the recent history window for a persona and user.
    History {
        persona_id: String,
        #[arg(long)]
        user: String,
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Chat with a persona interactively; an empty line or EOF exits.
    Chat {
        persona_id: String,
        #[arg(long)]
        user: String,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryAction {
    /// Insert the default categories (idempotent).
    Seed,
    List,
}
