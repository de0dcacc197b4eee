use anyhow::Result;
use colored::Colorize;
use inquire::Text;

use crate::config::Config;
use crate::llm::{ChatOptions, GroqClient, groq::Message};

const TUTOR_SYSTEM_PROMPT: &str = r#"You are a friendly Japanese language tutor helping a learner practice.

Guidelines:
1. Answer questions about Japanese grammar, vocabulary, and usage clearly and concisely
2. When the learner writes Japanese, gently correct mistakes and explain the corrections
3. Give example sentences at JLPT N5-N4 level unless asked for harder material
4. Include readings (hiragana) for any kanji you introduce
5. Encourage the learner to answer in Japanese when appropriate"#;

pub async fn run() -> Result<()> {
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

    let client = GroqClient::new(api_key, config.default_model);

    println!();
    println!(
        "    {}",
        "╭──────────────────────────────────────────────────────╮".cyan()
    );
    println!(
        "    {}            {}            {}",
        "│".cyan(),
        "💬 JAPANESE TUTOR 💬".bold().white(),
        "│".cyan()
    );
    println!(
        "    {}  🤖 Model: {:<43} {}",
        "│".cyan(),
        client.model.yellow(),
        "│".cyan()
    );
    println!(
        "    {}  💡 {} to exit │ Ask about grammar, words, anything  {}",
        "│".cyan(),
        "quit".yellow().bold(),
        "│".cyan()
    );
    println!(
        "    {}",
        "╰──────────────────────────────────────────────────────╯".cyan()
    );
    println!();

    let mut conversation: Vec<Message> = vec![Message {
        role: "system".to_string(),
        content: TUTOR_SYSTEM_PROMPT.to_string(),
    }];

    loop {
        let input = Text::new("You:")
            .with_help_message("Ask a question or type 'quit' to exit")
            .prompt()?;

        let input = input.trim();

        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            println!("{}", "じゃあね！ Goodbye!".dimmed());
            break;
        }

        if input.is_empty() {
            continue;
        }

        conversation.push(Message {
            role: "user".to_string(),
            content: input.to_string(),
        });

        print!("{} ", "Tutor:".green().bold());
        std::io::Write::flush(&mut std::io::stdout()).ok();

        match client
            .chat_stream(&conversation, &ChatOptions::with_max_tokens(512))
            .await
        {
            Ok(response) => {
                println!();
                conversation.push(Message {
                    role: "assistant".to_string(),
                    content: response,
                });
            }
            Err(e) => {
                println!("\n{} {}\n", "Error:".red().bold(), e);
                conversation.pop();
            }
        }
    }

    Ok(())
}
