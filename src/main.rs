//! # seev CLI
//!
//! Keeps a Markdown worklog with one `## YYYY-MM-DD` entry per day. Writes
//! are section-aware merges: re-sending the same content never duplicates
//! bullets, so scripts and assistants can write freely.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `seev init` | Create the conversation database |
//! | `seev read <date>` | Print a date's entry as JSON |
//! | `seev write <date>` | Merge Markdown (from `--content` or stdin) into an entry |
//! | `seev append [text]` | Append plain bullets under a date (today by default) |
//! | `seev generate <date>` | Draft an entry from git commits and conversations |
//! | `seev conversation ...` | Record and list assistant conversations |
//! | `seev serve` | Start the JSON tool server |
//!
//! ## Examples
//!
//! ```bash
//! printf '### Goals\n- Refactor auth\n' | seev write 2025-10-22
//! seev read 2025-10-22 --file notes/WORKLOG.md
//! seev generate 2025-10-22 --repo ~/src/app --write
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;

use seev::config;
use seev::conversations::{self, ConversationQuery, Role};
use seev::generate::{generate_worklog, write_generated};
use seev::journal;
use seev::{logging, migrate, server};
use seev_core::EntryDate;

#[derive(Parser)]
#[command(
    name = "seev",
    about = "Idempotent Markdown worklog journal",
    version,
    long_about = "seev keeps a daily Markdown worklog. Content is merged section by section \
    into each date's entry, so writing the same thing twice leaves the file unchanged."
)]
struct Cli {
    /// Path to a configuration file (TOML).
    ///
    /// Without it, `./seev.toml`, `~/.config/seev/seev.toml` and
    /// `~/.seev.toml` are tried in order; if none exists defaults are used.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr (overridden by `SEEV_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the conversation database. Idempotent.
    Init,

    /// Print the parsed entry for a date as JSON.
    Read {
        /// Entry date (YYYY-MM-DD).
        date: String,

        /// Journal file (overrides `SEEV_MD_PATH` and config).
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Merge Markdown into a date's entry.
    ///
    /// Content uses `### Section` headings. Bullets already present are
    /// skipped, Metrics are recomputed, and unknown sections are kept.
    Write {
        /// Entry date (YYYY-MM-DD).
        date: String,

        /// Markdown to merge. Read from stdin when omitted.
        #[arg(long)]
        content: Option<String>,

        /// Journal file (overrides `SEEV_MD_PATH` and config).
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Append lines under a date heading without merging.
    Append {
        /// Text to append. Read from stdin when omitted.
        content: Option<String>,

        /// Entry date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,

        /// Write lines as-is instead of turning each into a bullet.
        #[arg(long)]
        preserve_lines: bool,

        /// Journal file (overrides `SEEV_MD_PATH` and config).
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Draft a date's entry from git commits and recorded conversations.
    ///
    /// Prints the Markdown, or merges it into the journal with `--write`.
    Generate {
        /// Entry date (YYYY-MM-DD).
        date: String,

        /// Merge the generated content into the journal.
        #[arg(long)]
        write: bool,

        /// Git working directory. Defaults to the current directory.
        #[arg(long)]
        repo: Option<PathBuf>,

        /// Journal file (overrides `SEEV_MD_PATH` and config).
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Record and inspect assistant conversations.
    Conversation {
        #[command(subcommand)]
        action: ConversationAction,
    },

    /// Start the JSON tool server on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum ConversationAction {
    /// Start a conversation and print its id.
    Add {
        #[arg(long)]
        title: Option<String>,
    },

    /// Add a message to a conversation.
    Message {
        /// Conversation id.
        id: i64,

        /// `user`, `assistant` or `system`.
        role: Role,

        /// Message text. Read from stdin when omitted.
        content: Option<String>,
    },

    /// List conversations, most recently updated first.
    List {
        /// Only conversations created on this date (YYYY-MM-DD).
        #[arg(long)]
        date: Option<String>,

        /// Title substring.
        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        limit: Option<i64>,
    },

    /// Print a conversation and its messages.
    Show { id: i64 },
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read content from stdin")?;
    Ok(buf)
}

fn content_or_stdin(content: Option<String>) -> Result<String> {
    match content {
        Some(c) => Ok(c),
        None => read_stdin(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = config::discover_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized at {}", cfg.db_path().display());
        }
        Commands::Read { date, file } => {
            let snapshot = journal::read_date_entry(&cfg.markdown_path(file.as_deref()), &date)?;
            print_json(&snapshot)?;
        }
        Commands::Write {
            date,
            content,
            file,
        } => {
            // Reject a bad date before waiting on stdin.
            EntryDate::parse(&date)?;
            let content = content_or_stdin(content)?;
            let report =
                journal::write_date_entry(&cfg.markdown_path(file.as_deref()), &date, &content)?;
            print_json(&report)?;
        }
        Commands::Append {
            content,
            date,
            preserve_lines,
            file,
        } => {
            if let Some(d) = &date {
                EntryDate::parse(d)?;
            }
            let content = content_or_stdin(content)?;
            let result = journal::append_to_markdown(
                &cfg.markdown_path(file.as_deref()),
                date.as_deref(),
                &content,
                preserve_lines,
            )?;
            print_json(&result)?;
        }
        Commands::Generate {
            date,
            write,
            repo,
            file,
        } => {
            let date = EntryDate::parse(&date)?;
            let generated = generate_worklog(&cfg, &date, repo.as_deref()).await?;
            if write {
                let report = write_generated(&cfg.markdown_path(file.as_deref()), &generated)?;
                print_json(&report)?;
            } else {
                print!("{}", generated.markdown);
            }
        }
        Commands::Conversation { action } => {
            migrate::run_migrations(&cfg).await?;
            match action {
                ConversationAction::Add { title } => {
                    let id = conversations::create_conversation(&cfg, title.as_deref()).await?;
                    println!("{}", id);
                }
                ConversationAction::Message { id, role, content } => {
                    let content = content_or_stdin(content)?;
                    let message_id = conversations::add_message(&cfg, id, role, &content).await?;
                    println!("{}", message_id);
                }
                ConversationAction::List { date, title, limit } => {
                    let mut query = match date {
                        Some(d) => ConversationQuery::created_on(&EntryDate::parse(&d)?.to_string()),
                        None => ConversationQuery::default(),
                    };
                    query.title_contains = title;
                    query.limit = limit;
                    let found = conversations::query_conversations(&cfg, &query).await?;
                    print_json(&found)?;
                }
                ConversationAction::Show { id } => {
                    let conversation = conversations::get_conversation(&cfg, id)
                        .await?
                        .with_context(|| format!("conversation not found: {}", id))?;
                    let messages = conversations::list_messages(&cfg, id).await?;
                    print_json(&serde_json::json!({
                        "conversation": conversation,
                        "messages": messages,
                    }))?;
                }
            }
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
