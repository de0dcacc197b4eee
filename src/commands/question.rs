use anyhow::Result;
use colored::Colorize;
use inquire::Text;

use super::search::prompt_section;
use crate::config::Config;
use crate::embeddings;
use crate::storage::{Database, Question, QuestionStore};

pub async fn run(id: Option<String>, section: Option<i64>) -> Result<()> {
    let section_num = prompt_section(section)?;

    let id = match id {
        Some(id) => id,
        None => Text::new("Question id:")
            .with_help_message("e.g. sY7L5cfCWno_2_0")
            .prompt()?,
    };

    let config = Config::load()?;
    let db = Database::open()?;
    let store = QuestionStore::new(&db, embeddings::provider_from_config(&config));

    match store.get_by_id(section_num, &id)? {
        Some(stored) => {
            println!();
            println!("{} {}", "Id:".bold(), id);
            println!("{} {}", "Section:".bold(), stored.section_num);
            print_question(&stored.question);
        }
        None => {
            println!(
                "{} No question {} in section {}",
                "⚠".yellow(),
                id.cyan(),
                section_num
            );
        }
    }

    Ok(())
}

pub(crate) fn print_question(question: &Question) {
    match question {
        Question::Section2 {
            introduction,
            conversation,
            question,
            options,
        } => {
            println!("{} {}", "Introduction:".bold(), introduction);
            println!("{} {}", "Conversation:".bold(), conversation);
            println!("{} {}", "Question:".bold(), question);
            print_options(options);
        }
        Question::Section3 {
            situation,
            question,
            options,
        } => {
            println!("{} {}", "Situation:".bold(), situation);
            println!("{} {}", "Question:".bold(), question);
            print_options(options);
        }
    }
}

fn print_options(options: &[String; 4]) {
    println!("{}", "Options:".bold());
    for (i, option) in options.iter().enumerate() {
        println!("  {}. {}", i + 1, option);
    }
}
