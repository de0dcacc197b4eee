use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::Colorize;
use std::io;

mod audio;
mod commands;
mod config;
mod embeddings;
mod ingest;
mod llm;
mod practice;
mod render;
mod storage;

/// ASCII art banner for the application
const BANNER: &str = r#"
  ____  _____ _   _ _  ____   _____
 | __ )| ____| \ | | |/ /\ \ / / _ \
 |  _ \|  _| |  \| | ' /  \ V / | | |
 | |_) | |___| |\  | . \   | || |_| |
 |____/|_____|_| \_|_|\_\  |_| \___/
"#;

/// Print the application banner
fn print_banner() {
    println!("{}", BANNER.cyan().bold());
}

/// Print a styled status line
fn print_status(label: &str, value: &str, icon: &str) {
    println!(
        "  {} {} {}",
        icon,
        format!("{}:", label).dimmed(),
        value.cyan()
    );
}

#[derive(Parser)]
#[command(name = "benkyo")]
#[command(about = "CLI companion for Japanese listening and writing practice")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Index question files into the store
    Index {
        /// Question file or directory (skips interactive prompt if provided)
        path: Option<String>,
    },
    /// Practice listening comprehension
    Listen {
        /// Question section (2 or 3)
        #[arg(long)]
        section: Option<i64>,
        /// Topic to practice
        #[arg(long)]
        topic: Option<String>,
    },
    /// Practice handwritten Japanese with OCR grading
    Write,
    /// Search indexed questions by similarity
    Search {
        /// Search query
        query: Option<String>,
        /// Question section (2 or 3)
        #[arg(long)]
        section: Option<i64>,
        /// Maximum number of results
        #[arg(short = 'n', long, default_value_t = 5)]
        limit: usize,
    },
    /// Look up a stored question by id
    Question {
        /// Question id, e.g. sY7L5cfCWno_2_0
        id: Option<String>,
        /// Question section (2 or 3)
        #[arg(long)]
        section: Option<i64>,
    },
    /// Chat with the Japanese tutor
    Chat,
    /// Configure settings (API keys, preferences)
    Config,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Index { path }) => {
            commands::index::run(path).await?;
        }
        Some(Commands::Listen { section, topic }) => {
            commands::listen::run(section, topic).await?;
        }
        Some(Commands::Write) => {
            commands::write::run().await?;
        }
        Some(Commands::Search {
            query,
            section,
            limit,
        }) => {
            commands::search::run(query, section, limit).await?;
        }
        Some(Commands::Question { id, section }) => {
            commands::question::run(id, section).await?;
        }
        Some(Commands::Chat) => {
            commands::chat::run().await?;
        }
        Some(Commands::Config) => {
            commands::config::run().await?;
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
        }
        None => {
            // No subcommand - show interactive menu
            run_interactive().await?;
        }
    }

    Ok(())
}

/// Count stored questions per section, best-effort (fresh installs have no
/// database yet)
fn question_counts() -> (i64, i64) {
    let counts = || -> Result<(i64, i64)> {
        let config = config::Config::load()?;
        let db = storage::Database::open()?;
        let store = storage::QuestionStore::new(&db, embeddings::provider_from_config(&config));
        Ok((store.count(2)?, store.count(3)?))
    };
    counts().unwrap_or((0, 0))
}

async fn run_interactive() -> Result<()> {
    use inquire::Select;

    // Print the cool banner
    print_banner();

    // Show version and description
    println!(
        "  {} {}",
        "Version:".dimmed(),
        env!("CARGO_PKG_VERSION").cyan()
    );
    println!(
        "  {} {}\n",
        "Powered by:".dimmed(),
        "Groq LLM + VOICEVOX + Local Embeddings".green()
    );

    // Show current status
    println!("{}", "─".repeat(50).dimmed());

    let (section2, section3) = question_counts();
    print_status(
        "Questions",
        &format!("{} (section 2), {} (section 3)", section2, section3),
        "📚",
    );

    // Check API key status
    let has_api_key = config::Config::load()
        .map(|c| c.has_api_key())
        .unwrap_or(false);

    let api_status = if has_api_key {
        "Configured".green().to_string()
    } else {
        "Not set (run 'config')".red().to_string()
    };
    print_status("API Key", &api_status, "🔑");

    println!("{}\n", "─".repeat(50).dimmed());

    let options = vec![
        "🎧  Listening practice",
        "✍️   Writing practice",
        "📥  Index question files",
        "🔍  Search questions",
        "📄  Look up a question",
        "💬  Chat with the tutor",
        "⚙️   Configure settings",
        "🚪  Exit",
    ];

    let selection = Select::new("What would you like to do?", options)
        .with_help_message("Use arrow keys to navigate, Enter to select")
        .prompt()?;

    println!(); // Add spacing

    match selection {
        s if s.contains("Listening practice") => commands::listen::run(None, None).await?,
        s if s.contains("Writing practice") => commands::write::run().await?,
        s if s.contains("Index question") => commands::index::run(None).await?,
        s if s.contains("Search questions") => commands::search::run(None, None, 5).await?,
        s if s.contains("Look up") => commands::question::run(None, None).await?,
        s if s.contains("Chat with") => commands::chat::run().await?,
        s if s.contains("Configure") => commands::config::run().await?,
        s if s.contains("Exit") => {
            println!("{}", "👋 お疲れ様でした！ Happy studying!".cyan());
        }
        _ => unreachable!(),
    }

    Ok(())
}
