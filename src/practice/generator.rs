use anyhow::Result;
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::llm::{self, ChatOptions, GroqClient};
use crate::storage::{Question, QuestionStore, SearchResult, Section, default_options};

/// Feedback on a selected answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub correct: bool,
    pub explanation: String,
    pub correct_answer: usize,
}

/// The documented stand-in when the model's feedback cannot be parsed
pub fn fallback_feedback() -> Feedback {
    Feedback {
        correct: false,
        explanation: "Unable to generate detailed feedback. Please try again.".to_string(),
        correct_answer: 1,
    }
}

/// Generates fresh practice questions modeled on stored ones, and grades
/// answers against them.
pub struct QuestionGenerator<'a> {
    store: &'a QuestionStore<'a>,
    llm: &'a GroqClient,
}

impl<'a> QuestionGenerator<'a> {
    pub fn new(store: &'a QuestionStore<'a>, llm: &'a GroqClient) -> Self {
        Self { store, llm }
    }

    /// Generate a new question about `topic`, modeled on the most similar
    /// stored questions. Returns `None` when nothing similar is indexed or
    /// the completion backend produced no usable question.
    pub async fn generate_similar_question(
        &self,
        section_num: i64,
        topic: &str,
    ) -> Result<Option<Question>> {
        let section = Section::from_number(section_num)?;
        let similar = self.store.search_similar(section_num, topic, 3).await?;

        if similar.is_empty() {
            return Ok(None);
        }

        let context = example_context(&similar);
        let prompt = format!(
            "Based on the following example JLPT listening questions, create a new question about {topic}.\n\
             The question should follow the same format but be different from the examples.\n\
             Make sure the question tests listening comprehension and has a clear correct answer.\n\n\
             {context}\n\
             Generate a new question following the exact same format as above. Include all components \
             (Introduction/Situation, Conversation/Question, and Options). Make sure the question is \
             challenging but fair, and the options are plausible but with only one clearly correct \
             answer. Return ONLY the question without any additional text.\n\n\
             New Question:\n"
        );

        let response = match self
            .llm
            .query(&prompt, &ChatOptions::with_max_tokens(2048))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                eprintln!("{} question generation failed: {}", "Warning:".yellow(), e);
                return Ok(None);
            }
        };

        Ok(parse_generated_question(&response, section))
    }

    /// Grade a selected option (1-based). Returns `None` when the completion
    /// backend is unavailable; malformed feedback becomes the documented
    /// fallback instead of an error.
    pub async fn feedback(
        &self,
        question: &Question,
        selected_answer: usize,
    ) -> Result<Option<Feedback>> {
        let prompt = feedback_prompt(question, selected_answer);

        let response = match self
            .llm
            .query(&prompt, &ChatOptions::default())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                eprintln!("{} feedback generation failed: {}", "Warning:".yellow(), e);
                return Ok(None);
            }
        };

        Ok(Some(parse_feedback(&response)))
    }
}

/// Format stored search hits as few-shot examples for the generation prompt
fn example_context(similar: &[SearchResult]) -> String {
    let mut context = String::from("Here are some example JLPT listening questions:\n\n");

    for (idx, result) in similar.iter().enumerate() {
        context.push_str(&format!("Example {}:\n", idx + 1));
        match &result.question {
            Question::Section2 {
                introduction,
                conversation,
                question,
                options,
            } => {
                context.push_str(&format!("Introduction: {introduction}\n"));
                context.push_str(&format!("Conversation: {conversation}\n"));
                context.push_str(&format!("Question: {question}\n"));
                push_options(&mut context, options);
            }
            Question::Section3 {
                situation,
                question,
                options,
            } => {
                context.push_str(&format!("Situation: {situation}\n"));
                context.push_str(&format!("Question: {question}\n"));
                push_options(&mut context, options);
            }
        }
        context.push('\n');
    }

    context
}

fn push_options(context: &mut String, options: &[String; 4]) {
    context.push_str("Options:\n");
    for (i, option) in options.iter().enumerate() {
        context.push_str(&format!("{}. {}\n", i + 1, option));
    }
}

fn feedback_prompt(question: &Question, selected_answer: usize) -> String {
    let mut prompt = String::from(
        "Given this JLPT listening question and the selected answer, provide feedback explaining \
         if it's correct and why. Keep the explanation clear and concise.\n\n",
    );

    match question {
        Question::Section2 {
            introduction,
            conversation,
            question,
            ..
        } => {
            prompt.push_str(&format!("Introduction: {introduction}\n"));
            prompt.push_str(&format!("Conversation: {conversation}\n"));
            prompt.push_str(&format!("Question: {question}\n"));
        }
        Question::Section3 {
            situation,
            question,
            ..
        } => {
            prompt.push_str(&format!("Situation: {situation}\n"));
            prompt.push_str(&format!("Question: {question}\n"));
        }
    }

    prompt.push_str("Options:\n");
    for (i, option) in question.options().iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, option));
    }

    prompt.push_str(&format!("\nSelected Answer: {selected_answer}\n"));
    prompt.push_str("\nProvide feedback in JSON format with these fields:\n");
    prompt.push_str("- correct: true/false\n");
    prompt.push_str("- explanation: brief explanation of why the answer is correct/incorrect\n");
    prompt.push_str("- correct_answer: the number of the correct option (1-4)\n");

    prompt
}

/// Which field a generated-question line opens
fn label_of(line: &str) -> Option<(&'static str, &str)> {
    for label in ["Introduction:", "Conversation:", "Situation:", "Question:", "Options:"] {
        if let Some(rest) = line.strip_prefix(label) {
            return Some((label.trim_end_matches(':'), rest.trim()));
        }
    }
    None
}

/// Parse a generated question out of the model's labeled free text. Unlike
/// the file format, label content may sit on the label line itself, with
/// continuation lines appended. Returns `None` when required fields for the
/// section are missing.
pub fn parse_generated_question(text: &str, section: Section) -> Option<Question> {
    let mut introduction: Option<String> = None;
    let mut conversation: Option<String> = None;
    let mut situation: Option<String> = None;
    let mut question: Option<String> = None;
    let mut options: Vec<String> = Vec::new();
    let mut current: Option<&'static str> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((label, rest)) = label_of(line) {
            current = Some(label);
            if label != "Options" && !rest.is_empty() {
                let slot = match label {
                    "Introduction" => &mut introduction,
                    "Conversation" => &mut conversation,
                    "Situation" => &mut situation,
                    _ => &mut question,
                };
                *slot = Some(rest.to_string());
            }
            continue;
        }

        let first = line.chars().next();
        let numbered = first.is_some_and(|c| c.is_ascii_digit()) && line[1..].starts_with('.');

        if current == Some("Options") && numbered {
            options.push(line[2..].trim().to_string());
        } else if let Some(label) = current {
            let slot = match label {
                "Introduction" => &mut introduction,
                "Conversation" => &mut conversation,
                "Situation" => &mut situation,
                "Question" => &mut question,
                _ => continue,
            };
            match slot {
                Some(value) => {
                    value.push(' ');
                    value.push_str(line);
                }
                None => *slot = Some(line.to_string()),
            }
        }
    }

    let options: [String; 4] = <[String; 4]>::try_from(options).unwrap_or_else(|_| default_options());

    match section {
        Section::Two => Some(Question::Section2 {
            introduction: introduction?,
            conversation: conversation?,
            question: question?,
            options,
        }),
        Section::Three => Some(Question::Section3 {
            situation: situation?,
            question: question?,
            options,
        }),
    }
}

/// Parse the JSON feedback body, substituting the documented fallback when
/// the content is malformed.
pub fn parse_feedback(response: &str) -> Feedback {
    llm::extract_json(response)
        .and_then(|json| serde_json::from_str(json).ok())
        .unwrap_or_else(fallback_feedback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generated_section2_question() {
        let response = "Introduction: 学校で先生と学生が話しています。\n\
                        Conversation: 先生：宿題はできましたか。\n\
                        学生：すみません、まだです。\n\
                        Question: 学生は宿題をしましたか。\n\
                        Options:\n\
                        1. はい、しました\n\
                        2. いいえ、まだです\n\
                        3. 明日します\n\
                        4. わかりません\n";

        let question = parse_generated_question(response, Section::Two).unwrap();
        match question {
            Question::Section2 {
                introduction,
                conversation,
                question,
                options,
            } => {
                assert_eq!(introduction, "学校で先生と学生が話しています。");
                // Continuation line folded into the open field
                assert!(conversation.contains("すみません、まだです。"));
                assert_eq!(question, "学生は宿題をしましたか。");
                assert_eq!(options[1], "いいえ、まだです");
            }
            other => panic!("expected section 2, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_generated_section3_question() {
        let response = "Situation: 図書館で本を借りたいです。\n\
                        Question: 何と言いますか。\n\
                        Options:\n\
                        1. この本を借りてもいいですか。\n\
                        2. この本を返します。\n\
                        3. この本は高いです。\n\
                        4. この本を読みました。\n";

        let question = parse_generated_question(response, Section::Three).unwrap();
        assert!(matches!(question, Question::Section3 { .. }));
    }

    #[test]
    fn test_parse_generated_question_missing_fields_is_none() {
        let response = "Question: 何と言いますか。\n";
        assert!(parse_generated_question(response, Section::Two).is_none());
        assert!(parse_generated_question(response, Section::Three).is_none());
    }

    #[test]
    fn test_parse_generated_question_pads_short_options() {
        let response = "Situation: 状況です。\n\
                        Question: 質問です。\n\
                        Options:\n\
                        1. 一つ目\n\
                        2. 二つ目\n";

        let question = parse_generated_question(response, Section::Three).unwrap();
        assert_eq!(question.options(), &default_options());
    }

    #[test]
    fn test_parse_feedback_json() {
        let response = r#"{"correct": true, "explanation": "よくできました。", "correct_answer": 2}"#;
        let feedback = parse_feedback(response);
        assert!(feedback.correct);
        assert_eq!(feedback.correct_answer, 2);
    }

    #[test]
    fn test_parse_feedback_fenced_json() {
        let response = "```json\n{\"correct\": false, \"explanation\": \"残念。\", \"correct_answer\": 3}\n```";
        let feedback = parse_feedback(response);
        assert!(!feedback.correct);
        assert_eq!(feedback.correct_answer, 3);
    }

    #[test]
    fn test_parse_feedback_malformed_uses_fallback() {
        let feedback = parse_feedback("I think the answer is probably 2?");
        assert_eq!(feedback, fallback_feedback());
    }
}
