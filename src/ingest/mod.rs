pub mod ocr;

use colored::Colorize;
use std::path::Path;
use thiserror::Error;

use crate::storage::{Question, Section, default_options};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("file name does not match the {{source}}_section{{N}}.txt pattern: {0}")]
    Filename(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Questions parsed out of one flat file, with the source id and section
/// number recovered from its name.
#[derive(Debug)]
pub struct ParsedQuestionFile {
    pub source_id: String,
    pub section_num: i64,
    pub questions: Vec<Question>,
}

/// Parse a `{source_id}_section{N}.txt` question file. Malformed blocks are
/// skipped with a warning; only an unreadable file or an unrecognizable
/// filename is an error.
pub fn parse_question_file(path: &Path) -> Result<ParsedQuestionFile, ParseError> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ParseError::Filename(path.display().to_string()))?;

    let (source_id, section_num) = split_filename(filename)?;
    let content = std::fs::read_to_string(path)?;

    // An out-of-range section can't be shaped into a question variant; the
    // store raises InvalidSection for it when the file is indexed.
    let questions = match Section::from_number(section_num) {
        Ok(section) => parse_question_blocks(&content, section),
        Err(_) => Vec::new(),
    };

    Ok(ParsedQuestionFile {
        source_id,
        section_num,
        questions,
    })
}

/// Split `{source_id}_section{N}[.txt]` into its source id and section number.
pub fn split_filename(filename: &str) -> Result<(String, i64), ParseError> {
    let stem = filename.strip_suffix(".txt").unwrap_or(filename);

    let (source, section) = stem
        .rsplit_once("_section")
        .ok_or_else(|| ParseError::Filename(filename.to_string()))?;

    let section_num: i64 = section
        .parse()
        .map_err(|_| ParseError::Filename(filename.to_string()))?;

    if source.is_empty() {
        return Err(ParseError::Filename(filename.to_string()));
    }

    Ok((source.to_string(), section_num))
}

/// Which narrative field a label line opens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Introduction,
    Conversation,
    Situation,
    Question,
}

impl Field {
    fn from_label(line: &str) -> Option<Self> {
        if line.starts_with("Introduction:") {
            Some(Field::Introduction)
        } else if line.starts_with("Conversation:") {
            Some(Field::Conversation)
        } else if line.starts_with("Situation:") {
            Some(Field::Situation)
        } else if line.starts_with("Question:") {
            Some(Field::Question)
        } else {
            None
        }
    }
}

/// Accumulator for one `<question>`..`</question>` block
#[derive(Debug, Default)]
struct RawBlock {
    introduction: Option<String>,
    conversation: Option<String>,
    situation: Option<String>,
    question: Option<String>,
    options: Vec<String>,
    current: Option<Field>,
}

impl RawBlock {
    fn open(&mut self, field: Field, initial: &str) {
        self.current = Some(field);
        *self.slot(field) = Some(initial.to_string());
    }

    /// Unlabeled lines extend whichever field is currently open
    fn append(&mut self, line: &str) {
        if let Some(field) = self.current {
            let slot = self.slot(field);
            match slot {
                Some(value) => {
                    value.push(' ');
                    value.push_str(line);
                }
                None => *slot = Some(line.to_string()),
            }
        }
    }

    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Introduction => &mut self.introduction,
            Field::Conversation => &mut self.conversation,
            Field::Situation => &mut self.situation,
            Field::Question => &mut self.question,
        }
    }

    fn into_question(self, section: Section) -> Option<Question> {
        // Anything other than exactly four recovered options falls back to
        // the documented default set, never a partial list.
        let options: [String; 4] = match <[String; 4]>::try_from(self.options) {
            Ok(options) => options,
            Err(_) => default_options(),
        };

        match section {
            Section::Two => Some(Question::Section2 {
                introduction: self.introduction?,
                conversation: self.conversation?,
                question: self.question?,
                options,
            }),
            Section::Three => Some(Question::Section3 {
                situation: self.situation?,
                question: self.question?,
                options,
            }),
        }
    }
}

/// Parse `<question>` blocks out of a question file body. Fragments missing
/// required fields for the section are skipped, not fatal.
pub fn parse_question_blocks(content: &str, section: Section) -> Vec<Question> {
    let lines: Vec<&str> = content.lines().collect();
    let mut questions = Vec::new();
    let mut block: Option<RawBlock> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();

        if line.starts_with("<question>") {
            block = Some(RawBlock::default());
        } else if line.starts_with("</question>") {
            if let Some(raw) = block.take() {
                match raw.into_question(section) {
                    Some(question) => questions.push(question),
                    None => {
                        eprintln!(
                            "{} skipping question block missing required section {} fields",
                            "Warning:".yellow(),
                            section.number()
                        );
                    }
                }
            }
        } else if let Some(raw) = block.as_mut() {
            if let Some(field) = Field::from_label(line) {
                // Label content sits on the next physical line
                i += 1;
                if i < lines.len() {
                    raw.open(field, lines[i].trim());
                }
            } else if line.starts_with("Options:") {
                // Consume up to four numbered lines; stop at anything else so
                // a short list cannot swallow the closing tag
                while raw.options.len() < 4 {
                    let Some(next) = lines.get(i + 1).map(|l| l.trim()) else {
                        break;
                    };
                    let numbered = matches!(next.as_bytes().first(), Some(b'1'..=b'4'))
                        && next[1..].starts_with('.');
                    if !numbered {
                        break;
                    }
                    raw.options.push(next[2..].trim().to_string());
                    i += 1;
                }
            } else if !line.is_empty() {
                raw.append(line);
            }
        }

        i += 1;
    }

    questions
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECTION2_BLOCK: &str = "<question>\n\
        Introduction:\n\
        男の人と女の人が話しています。\n\
        Conversation:\n\
        男：明日、映画を見ませんか。\n\
        女：いいですね。何時にしましょうか。\n\
        Question:\n\
        二人は何をしますか。\n\
        Options:\n\
        1. 映画を見る\n\
        2. 買い物をする\n\
        3. 勉強する\n\
        4. 料理を作る\n\
        </question>\n";

    #[test]
    fn test_parse_well_formed_section2_block() {
        let questions = parse_question_blocks(SECTION2_BLOCK, Section::Two);
        assert_eq!(questions.len(), 1);

        match &questions[0] {
            Question::Section2 {
                introduction,
                conversation,
                question,
                options,
            } => {
                assert_eq!(introduction, "男の人と女の人が話しています。");
                assert!(conversation.starts_with("男：明日"));
                assert_eq!(question, "二人は何をしますか。");
                assert_eq!(options[0], "映画を見る");
                assert_eq!(options[3], "料理を作る");
            }
            other => panic!("expected a section 2 question, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_section3_block() {
        let content = "<question>\n\
            Situation:\n\
            友達が引っ越しを手伝ってほしいと言っています。\n\
            Question:\n\
            何と言いますか。\n\
            Options:\n\
            1. 手伝いましょうか。\n\
            2. 手伝ってください。\n\
            3. 手伝いたくないです。\n\
            4. 手伝いました。\n\
            </question>\n";

        let questions = parse_question_blocks(content, Section::Three);
        assert_eq!(questions.len(), 1);
        match &questions[0] {
            Question::Section3 { situation, .. } => {
                assert!(situation.contains("引っ越し"));
            }
            other => panic!("expected a section 3 question, got {other:?}"),
        }
    }

    #[test]
    fn test_continuation_lines_extend_open_field() {
        let content = "<question>\n\
            Introduction:\n\
            first line\n\
            second line\n\
            Conversation:\n\
            dialogue\n\
            Question:\n\
            the question\n\
            Options:\n\
            1. a\n\
            2. b\n\
            3. c\n\
            4. d\n\
            </question>\n";

        let questions = parse_question_blocks(content, Section::Two);
        assert_eq!(questions.len(), 1);
        match &questions[0] {
            Question::Section2 { introduction, .. } => {
                assert_eq!(introduction, "first line second line");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_short_options_replaced_by_default_fallback() {
        let content = "<question>\n\
            Introduction:\n\
            intro\n\
            Conversation:\n\
            conv\n\
            Question:\n\
            q\n\
            Options:\n\
            1. only\n\
            2. two\n\
            </question>\n";

        let questions = parse_question_blocks(content, Section::Two);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].options(), &default_options());
    }

    #[test]
    fn test_malformed_fragment_skipped_not_fatal() {
        let content = format!(
            "<question>\n\
             Introduction:\n\
             orphaned intro with no conversation\n\
             </question>\n\
             {SECTION2_BLOCK}"
        );

        let questions = parse_question_blocks(&content, Section::Two);
        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn test_split_filename() {
        let (source, section) = split_filename("sY7L5cfCWno_section2.txt").unwrap();
        assert_eq!(source, "sY7L5cfCWno");
        assert_eq!(section, 2);

        // Underscores in the source id survive
        let (source, section) = split_filename("my_video_section3.txt").unwrap();
        assert_eq!(source, "my_video");
        assert_eq!(section, 3);

        assert!(split_filename("notes.txt").is_err());
        assert!(split_filename("_sectionX.txt").is_err());
        assert!(split_filename("_section2.txt").is_err());
    }

    #[test]
    fn test_parse_question_file_keeps_out_of_range_section() {
        let dir = std::env::temp_dir().join(format!("benkyo-ingest-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("vid_section5.txt");
        std::fs::write(&path, "<question>\n</question>\n").unwrap();

        let parsed = parse_question_file(&path).unwrap();
        assert_eq!(parsed.section_num, 5);
        assert!(parsed.questions.is_empty());

        let _ = std::fs::remove_file(&path);
    }
}
