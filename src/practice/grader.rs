use colored::Colorize;
use serde::Deserialize;

use crate::llm::{ChatOptions, GroqClient};
use crate::practice::session::GradeFeedback;

/// Starter vocabulary for sentence generation (japanese, english)
const N5_VOCAB: &[(&str, &str)] = &[
    ("食べる", "to eat"),
    ("飲む", "to drink"),
    ("会う", "to meet"),
    ("行く", "to go"),
    ("見る", "to see"),
    ("買う", "to buy"),
    ("読む", "to read"),
    ("本", "book"),
    ("車", "car"),
    ("ラーメン", "ramen"),
    ("寿司", "sushi"),
    ("水", "water"),
    ("学校", "school"),
    ("友達", "friend"),
    ("明日", "tomorrow"),
    ("今日", "today"),
    ("昨日", "yesterday"),
];

/// Pick a practice word, varying by wall clock so repeated sessions rotate
/// through the list without needing a RNG dependency.
pub fn pick_practice_word() -> (&'static str, &'static str) {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() as usize)
        .unwrap_or(0);
    N5_VOCAB[nanos % N5_VOCAB.len()]
}

/// Generate a simple English sentence built around the given word. Falls
/// back to a fixed sentence when the completion backend is unavailable, so
/// practice can always start.
pub async fn generate_sentence(llm: &GroqClient, word: &str) -> String {
    let prompt = format!(
        "Generate a simple sentence using the following word: {word}\n\
         The grammar should be scoped to JLPT N5 grammar.\n\
         You can use the following vocabulary to construct a simple sentence:\n\
         - simple objects e.g. book, car, ramen, sushi\n\
         - simple verbs, to drink, to eat, to meet\n\
         - simple times e.g. tomorrow, today, yesterday\n\n\
         Return only the English sentence."
    );

    match llm
        .query_with_system(
            "You are a Japanese language tutor.",
            &prompt,
            &ChatOptions::default(),
        )
        .await
    {
        Ok(sentence) => sentence.trim().to_string(),
        Err(e) => {
            eprintln!("{} sentence generation failed: {}", "Warning:".yellow(), e);
            "I eat sushi.".to_string()
        }
    }
}

/// Literal translation of the transcribed Japanese, used as grading input.
/// Degrades to an empty string so a translation hiccup never blocks review.
pub async fn translate_text(llm: &GroqClient, japanese_text: &str) -> String {
    let prompt =
        format!("Translate the following Japanese text to English literally: {japanese_text}");

    match llm
        .query_with_system(
            "You are a Japanese translator.",
            &prompt,
            &ChatOptions::default(),
        )
        .await
    {
        Ok(translation) => translation.trim().to_string(),
        Err(e) => {
            eprintln!("{} translation failed: {}", "Warning:".yellow(), e);
            String::new()
        }
    }
}

/// The documented stand-in grade when the model cannot assess the attempt
pub fn fallback_grade() -> GradeFeedback {
    GradeFeedback {
        grade: "C".to_string(),
        explanation: "Unable to properly assess due to system error.".to_string(),
        suggestions: vec!["Please try again.".to_string()],
    }
}

/// Grade a writing attempt. Any failure (backend or malformed JSON) becomes
/// the documented default grade instead of an error.
pub async fn grade_attempt(
    llm: &GroqClient,
    original_english: &str,
    japanese_attempt: &str,
    english_translation: &str,
) -> GradeFeedback {
    let prompt = format!(
        "Grade this Japanese language practice attempt:\n\n\
         Original English sentence: \"{original_english}\"\n\
         User's Japanese writing (transcribed): \"{japanese_attempt}\"\n\
         Literal translation of user's writing: \"{english_translation}\"\n\n\
         Provide:\n\
         1. A letter grade using S, A, B, C, D, F ranking\n\
         2. A brief explanation of whether the attempt accurately conveyed the English sentence\n\
         3. 1-2 specific suggestions for improvement\n\n\
         Format your response as a JSON object with keys: \"grade\", \"explanation\", \"suggestions\""
    );

    match llm
        .query_with_system(
            "You are a Japanese language teacher.",
            &prompt,
            &ChatOptions::default(),
        )
        .await
    {
        Ok(response) => parse_grade_response(&response),
        Err(e) => {
            eprintln!("{} grading failed: {}", "Warning:".yellow(), e);
            fallback_grade()
        }
    }
}

/// Raw shape of the model's grading JSON; suggestions sometimes arrive as a
/// single string rather than a list.
#[derive(Debug, Deserialize)]
struct RawGrade {
    grade: String,
    explanation: String,
    #[serde(default)]
    suggestions: serde_json::Value,
}

pub fn parse_grade_response(response: &str) -> GradeFeedback {
    let Some(json) = crate::llm::extract_json(response) else {
        return fallback_grade();
    };

    let Ok(raw) = serde_json::from_str::<RawGrade>(json) else {
        return fallback_grade();
    };

    let suggestions = match raw.suggestions {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        serde_json::Value::String(s) => vec![s],
        _ => Vec::new(),
    };

    GradeFeedback {
        grade: raw.grade,
        explanation: raw.explanation,
        suggestions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grade_response_with_list() {
        let response = r#"{"grade": "A", "explanation": "Accurate.", "suggestions": ["Use kanji.", "Add です."]}"#;
        let feedback = parse_grade_response(response);
        assert_eq!(feedback.grade, "A");
        assert_eq!(feedback.suggestions.len(), 2);
    }

    #[test]
    fn test_parse_grade_response_with_string_suggestion() {
        let response = r#"{"grade": "B", "explanation": "Close.", "suggestions": "Watch particle use."}"#;
        let feedback = parse_grade_response(response);
        assert_eq!(feedback.suggestions, vec!["Watch particle use.".to_string()]);
    }

    #[test]
    fn test_parse_grade_response_fenced() {
        let response = "Here is the assessment:\n```json\n{\"grade\": \"S\", \"explanation\": \"Perfect.\", \"suggestions\": []}\n```";
        let feedback = parse_grade_response(response);
        assert_eq!(feedback.grade, "S");
        assert!(feedback.suggestions.is_empty());
    }

    #[test]
    fn test_parse_grade_response_malformed_falls_back() {
        let feedback = parse_grade_response("Looks like a B to me!");
        assert_eq!(feedback, fallback_grade());
    }

    #[test]
    fn test_pick_practice_word_in_vocab() {
        let word = pick_practice_word();
        assert!(N5_VOCAB.contains(&word));
    }
}
