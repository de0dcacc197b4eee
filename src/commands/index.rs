use anyhow::Result;
use colored::Colorize;
use inquire::Text;
use std::path::Path;

use super::{create_progress_bar, create_spinner};
use crate::config::Config;
use crate::embeddings;
use crate::storage::{Database, QuestionStore};

pub async fn run(path: Option<String>) -> Result<()> {
    let source = match path {
        Some(p) => p,
        None => Text::new("Enter a question file or directory path:")
            .with_help_message("Files must be named {source}_section{N}.txt")
            .prompt()?,
    };

    println!("\n{} {}", "Indexing:".dimmed(), source);

    let path = Path::new(&source);

    if !path.exists() {
        anyhow::bail!("Path does not exist: {}", source);
    }

    let config = Config::load()?;
    let db = Database::open()?;
    let store = QuestionStore::new(&db, embeddings::provider_from_config(&config));

    if path.is_dir() {
        index_directory(path, &store).await?;
    } else {
        index_file(path, &store).await?;
    }

    Ok(())
}

async fn index_file(path: &Path, store: &QuestionStore<'_>) -> Result<()> {
    let spinner = create_spinner("Parsing and embedding questions...");
    let count = store.index_file(path).await?;
    spinner.finish_and_clear();

    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if count == 0 {
        println!("{} No questions found in {}", "⚠".yellow(), filename);
    } else {
        println!("{} Indexed {} questions from {}", "✓".green(), count, filename);
    }

    Ok(())
}

async fn index_directory(path: &Path, store: &QuestionStore<'_>) -> Result<()> {
    // Collect the question files before starting so progress has a total
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let file_path = entry.path();
        let is_question_file = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains("_section") && n.ends_with(".txt"));
        if file_path.is_file() && is_question_file {
            files.push(file_path);
        }
    }

    if files.is_empty() {
        println!(
            "{} No {{source}}_section{{N}}.txt files found in directory",
            "⚠".yellow()
        );
        return Ok(());
    }

    files.sort();
    println!("Found {} question files\n", files.len());

    let pb = create_progress_bar(files.len() as u64, "Indexing files");

    let mut indexed = 0;
    let mut empty = 0;
    let mut errors = 0;
    let mut total_questions = 0;
    let mut results: Vec<(String, Result<usize, String>)> = Vec::new();

    for file_path in files {
        let filename = file_path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        pb.set_message(format!("Indexing: {}", filename));

        match store.index_file(&file_path).await {
            Ok(0) => {
                results.push((filename, Err("no questions parsed".to_string())));
                empty += 1;
            }
            Ok(count) => {
                results.push((filename, Ok(count)));
                indexed += 1;
                total_questions += count;
            }
            Err(e) => {
                results.push((filename, Err(e.to_string())));
                errors += 1;
            }
        }

        pb.inc(1);
    }

    pb.finish_and_clear();

    // Print results
    println!("\n{}", "Results:".bold());
    println!("{}", "─".repeat(60).dimmed());

    for (filename, result) in results {
        match result {
            Ok(count) => {
                println!("  {} {} ({} questions)", "✓".green(), filename, count);
            }
            Err(ref e) if e == "no questions parsed" => {
                println!("  {} {} ({})", "⊘".yellow(), filename, e);
            }
            Err(e) => {
                println!("  {} {} ({})", "✗".red(), filename, e);
            }
        }
    }

    println!("{}", "─".repeat(60).dimmed());
    println!(
        "\n{} {} files indexed ({} questions), {} empty, {} errors",
        "Summary:".bold(),
        indexed,
        total_questions,
        empty,
        errors
    );

    Ok(())
}
