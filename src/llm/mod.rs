pub mod groq;

pub use groq::{ChatOptions, GroqClient, LlmError};

/// Pull the first JSON object out of a completion, tolerating code fences
/// and surrounding prose. Returns the brace-delimited slice, if any.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_plain() {
        assert_eq!(extract_json(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn test_extract_json_fenced() {
        let text = "Here you go:\n```json\n{\"grade\": \"A\"}\n```\n";
        assert_eq!(extract_json(text), Some("{\"grade\": \"A\"}"));
    }

    #[test]
    fn test_extract_json_none() {
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} reversed {"), None);
    }
}
