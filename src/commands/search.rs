use anyhow::Result;
use colored::Colorize;
use inquire::{Select, Text};

use super::create_spinner;
use crate::config::Config;
use crate::embeddings;
use crate::storage::{Database, Question, QuestionStore};

/// Prompt for a section when one wasn't passed on the command line
pub(crate) fn prompt_section(section: Option<i64>) -> Result<i64> {
    if let Some(n) = section {
        return Ok(n);
    }

    let options = vec![
        "Section 2 │ Conversation comprehension",
        "Section 3 │ Phrase matching",
    ];
    let selection = Select::new("Which section?", options).prompt()?;

    Ok(if selection.starts_with("Section 2") { 2 } else { 3 })
}

pub async fn run(query: Option<String>, section: Option<i64>, limit: usize) -> Result<()> {
    let section_num = prompt_section(section)?;

    let query = match query {
        Some(q) => q,
        None => Text::new("Search query:")
            .with_help_message("e.g. 誕生日について質問")
            .prompt()?,
    };

    let config = Config::load()?;
    let db = Database::open()?;
    let store = QuestionStore::new(&db, embeddings::provider_from_config(&config));

    let spinner = create_spinner("Searching similar questions...");
    let results = store.search_similar(section_num, &query, limit).await?;
    spinner.finish_and_clear();

    if results.is_empty() {
        println!(
            "{} No questions indexed for section {}. Run {} first.",
            "⚠".yellow(),
            section_num,
            "benkyo index <path>".cyan()
        );
        return Ok(());
    }

    println!(
        "\n{} similar questions (section {}):\n",
        results.len(),
        section_num
    );

    for (i, result) in results.iter().enumerate() {
        println!(
            "{} {} {}",
            format!("{}.", i + 1).bold(),
            result.question.question_text(),
            format!("(distance {:.4})", result.similarity_score).dimmed()
        );

        match &result.question {
            Question::Section2 { introduction, .. } => {
                println!("   {}", introduction.dimmed());
            }
            Question::Section3 { situation, .. } => {
                println!("   {}", situation.dimmed());
            }
        }
    }

    Ok(())
}
