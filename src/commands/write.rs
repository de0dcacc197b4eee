use anyhow::Result;
use colored::Colorize;
use inquire::{Select, Text};
use std::path::PathBuf;

use super::create_spinner;
use crate::config::Config;
use crate::ingest::ocr;
use crate::llm::GroqClient;
use crate::practice::{Review, WritingSession, grader};
use crate::render::render_markdown;

pub async fn run() -> Result<()> {
    println!();
    println!(
        "    {}",
        "╭──────────────────────────────────────────────────────╮".magenta()
    );
    println!(
        "    {}           {}           {}",
        "│".magenta(),
        "✍️  WRITING PRACTICE ✍️".bold().white(),
        "│".magenta()
    );
    println!(
        "    {}    {}    {}",
        "│".magenta(),
        "Write Japanese by hand, get graded feedback".dimmed(),
        "│".magenta()
    );
    println!(
        "    {}",
        "╰──────────────────────────────────────────────────────╯".magenta()
    );
    println!();

    let config = Config::load()?;
    let api_key = match config.get_api_key() {
        Some(key) => key,
        None => {
            println!(
                "{} No API key configured. Run {} to set up.",
                "Error:".red().bold(),
                "benkyo config".cyan()
            );
            return Ok(());
        }
    };

    let client = GroqClient::new(api_key, config.default_model.clone());
    let mut session = WritingSession::new();

    loop {
        let (word_jp, word_en) = grader::pick_practice_word();

        let spinner = create_spinner("Generating a practice sentence...");
        let sentence = grader::generate_sentence(&client, word_jp).await;
        spinner.finish_and_clear();

        session.start_practice(sentence)?;

        println!(
            "{} {} {}",
            "Practice word:".dimmed(),
            word_jp.bold(),
            format!("({})", word_en).dimmed()
        );
        println!("\n{}", "Translate this sentence into Japanese:".bold());
        println!("  {}\n", session.english_sentence().cyan().bold());
        println!(
            "{}",
            "Write it by hand, photograph it, and enter the image path below.".dimmed()
        );

        let Some(image_path) = prompt_for_image()? else {
            break;
        };
        session.attach_image(image_path.clone())?;

        let spinner = create_spinner("Transcribing your handwriting...");
        let transcription = ocr::extract_japanese_text(&image_path).await;
        spinner.finish_and_clear();

        let transcription = match transcription {
            Ok(text) => text,
            Err(e) => {
                println!("{} {}", "Error:".red().bold(), e);
                println!("{}", "Try again with a clearer photo.".dimmed());
                // Reset so the next round starts a fresh question
                session = WritingSession::new();
                continue;
            }
        };

        let spinner = create_spinner("Translating and grading...");
        let translation = grader::translate_text(&client, &transcription).await;
        let feedback = grader::grade_attempt(
            &client,
            session.english_sentence(),
            &transcription,
            &translation,
        )
        .await;
        spinner.finish_and_clear();

        session.submit_review(Review {
            transcription,
            translation,
            feedback,
        })?;

        present_review(&session);

        let next = Select::new(
            "What next?",
            vec!["✏️  Next question", "🚪  Done"],
        )
        .prompt()?;

        if next.contains("Done") {
            break;
        }
        println!();
    }

    Ok(())
}

/// Ask for a handwriting photo until we get a readable image path. Returns
/// None when the user backs out.
fn prompt_for_image() -> Result<Option<PathBuf>> {
    loop {
        let input = Text::new("Image path:")
            .with_help_message("jpg/png photo of your handwriting, or 'quit'")
            .prompt();

        let input = match input {
            Ok(value) => value,
            Err(
                inquire::InquireError::OperationCanceled
                | inquire::InquireError::OperationInterrupted,
            ) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let input = input.trim();
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            return Ok(None);
        }

        let path = PathBuf::from(input);
        if !path.exists() {
            println!("{} File does not exist: {}", "⚠".yellow(), input);
            continue;
        }
        if !ocr::is_image_file(&path) {
            println!("{} Not a supported image format: {}", "⚠".yellow(), input);
            continue;
        }

        return Ok(Some(path));
    }
}

fn present_review(session: &WritingSession) {
    let Some(review) = session.review() else {
        return;
    };

    println!("{}", "─".repeat(50).dimmed());
    println!("{} {}", "Original sentence:".bold(), session.english_sentence());
    println!("{} {}", "Your writing:".bold(), review.transcription);
    if !review.translation.is_empty() {
        println!("{} {}", "Literal translation:".bold(), review.translation);
    }

    let grade = review.feedback.grade.as_str();
    let grade_display = match grade {
        "S" | "A" => grade.green().bold(),
        "B" | "C" => grade.yellow().bold(),
        _ => grade.red().bold(),
    };
    println!("\n{} {}", "Grade:".bold(), grade_display);

    println!();
    render_markdown(&review.feedback.explanation);

    if !review.feedback.suggestions.is_empty() {
        println!("{}", "Suggestions:".bold());
        for suggestion in &review.feedback.suggestions {
            println!("  - {}", suggestion);
        }
    }
    println!("{}", "─".repeat(50).dimmed());
}
