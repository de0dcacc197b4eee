use anyhow::Result;
use colored::Colorize;
use inquire::{Select, Text};

use super::create_spinner;
use super::search::prompt_section;
use crate::audio::{self, AudioGenerator, VoicevoxClient};
use crate::config::Config;
use crate::embeddings;
use crate::llm::GroqClient;
use crate::practice::QuestionGenerator;
use crate::render::render_markdown;
use crate::storage::{Database, Question, QuestionStore};

pub async fn run(section: Option<i64>, topic: Option<String>) -> Result<()> {
    println!();
    println!(
        "    {}",
        "╭──────────────────────────────────────────────────────╮".cyan()
    );
    println!(
        "    {}          {}          {}",
        "│".cyan(),
        "🎧 LISTENING PRACTICE 🎧".bold().white(),
        "│".cyan()
    );
    println!(
        "    {}   {}   {}",
        "│".cyan(),
        "JLPT-style questions generated from your library".dimmed(),
        "│".cyan()
    );
    println!(
        "    {}",
        "╰──────────────────────────────────────────────────────╯".cyan()
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
    let db = Database::open()?;
    let store = QuestionStore::new(&db, embeddings::provider_from_config(&config));

    if store.count(2)? == 0 && store.count(3)? == 0 {
        println!(
            "{} No questions indexed yet. Run {} first.",
            "⚠".yellow(),
            "benkyo index <path>".cyan()
        );
        return Ok(());
    }

    let generator = QuestionGenerator::new(&store, &client);
    let voicevox = VoicevoxClient::new(config.voicevox_url());

    let mut section = section;
    let mut topic = topic;

    loop {
        let section_num = prompt_section(section.take())?;

        let topic_text = match topic.take() {
            Some(t) => t,
            None => Text::new("Topic:")
                .with_help_message("e.g. 誕生日, 買い物, 学校")
                .prompt()?,
        };

        let spinner = create_spinner("Generating a question...");
        let question = generator
            .generate_similar_question(section_num, &topic_text)
            .await?;
        spinner.finish_and_clear();

        let Some(question) = question else {
            println!(
                "{} Could not generate a question. Check that section {} has indexed \
                 questions and the completion backend is reachable.",
                "⚠".yellow(),
                section_num
            );
            return Ok(());
        };

        let audio_generated = maybe_generate_audio(&voicevox, &question).await;

        present_question(&question, audio_generated);

        let selected = prompt_answer(&question)?;

        let spinner = create_spinner("Checking your answer...");
        let feedback = generator.feedback(&question, selected).await?;
        spinner.finish_and_clear();

        match feedback {
            Some(feedback) => {
                if feedback.correct {
                    println!("\n  {} Correct!", "✓".green().bold());
                } else {
                    let correct_text = question
                        .options()
                        .get(feedback.correct_answer.saturating_sub(1))
                        .map(String::as_str)
                        .unwrap_or("?");
                    println!(
                        "\n  {} Incorrect. Answer: {}) {}",
                        "✗".red().bold(),
                        feedback.correct_answer,
                        correct_text
                    );
                }
                println!();
                render_markdown(&feedback.explanation);
            }
            None => {
                println!(
                    "\n{} Feedback unavailable (completion backend unreachable).",
                    "⚠".yellow()
                );
            }
        }

        // Now that the answer is in, reveal what the audio said
        if audio_generated {
            reveal_transcript(&question);
        }

        println!("{}", "─".repeat(50).dimmed());

        let again = Select::new(
            "Keep practicing?",
            vec!["🔁  Another question", "🚪  Done"],
        )
        .prompt()?;

        if again.contains("Done") {
            break;
        }
        println!();
    }

    Ok(())
}

/// Try to synthesize the exercise audio. Returns true when an audio file was
/// produced (the conversation text stays hidden until after the answer).
async fn maybe_generate_audio(voicevox: &VoicevoxClient, question: &Question) -> bool {
    if !voicevox.is_available().await {
        return false;
    }

    let audio_dir = match Config::data_dir() {
        Ok(dir) => dir.join("audio"),
        Err(_) => return false,
    };

    let generator = match AudioGenerator::new(voicevox.clone(), audio_dir) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("{} audio setup failed: {}", "Warning:".yellow(), e);
            return false;
        }
    };

    let spinner = create_spinner("Synthesizing audio...");
    let parts = audio::conversation_parts(question);
    let result = generator.generate(&parts).await;
    spinner.finish_and_clear();

    match result {
        Ok(path) => {
            println!("{} Audio saved to {}", "🔊".cyan(), path.display());
            println!("{}", "Listen first, then answer below.".dimmed());
            true
        }
        Err(e) => {
            eprintln!(
                "{} audio generation failed ({}), showing text instead",
                "Warning:".yellow(),
                e
            );
            false
        }
    }
}

fn present_question(question: &Question, audio_generated: bool) {
    println!();
    match question {
        Question::Section2 {
            introduction,
            conversation,
            question,
            ..
        } => {
            println!("{} {}", "Introduction:".bold(), introduction);
            if !audio_generated {
                println!("{} {}", "Conversation:".bold(), conversation);
            }
            println!("{} {}", "Question:".bold(), question);
        }
        Question::Section3 {
            situation,
            question,
            ..
        } => {
            println!("{} {}", "Situation:".bold(), situation);
            println!("{} {}", "Question:".bold(), question);
        }
    }
    println!();
}

fn prompt_answer(question: &Question) -> Result<usize> {
    let options: Vec<String> = question
        .options()
        .iter()
        .enumerate()
        .map(|(i, option)| format!("{}) {}", i + 1, option))
        .collect();

    let selection = Select::new("Your answer:", options.clone()).prompt()?;

    let selected = options
        .iter()
        .position(|o| *o == selection)
        .map(|i| i + 1)
        .unwrap_or(1);

    Ok(selected)
}

fn reveal_transcript(question: &Question) {
    if let Question::Section2 { conversation, .. } = question {
        println!();
        println!("{} {}", "Conversation was:".bold(), conversation);
    }
}
