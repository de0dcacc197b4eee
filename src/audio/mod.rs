pub mod ffmpeg;
pub mod voicevox;

pub use voicevox::{Speaker, VoicevoxClient};

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::storage::Question;

const LONG_PAUSE_MS: u64 = 2000;
const SHORT_PAUSE_MS: u64 = 500;

/// One spoken part of a rendered listening exercise
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationPart {
    pub speaker: Speaker,
    pub text: String,
}

impl ConversationPart {
    pub fn announcer(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Announcer,
            text: text.into(),
        }
    }

    fn voiced(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }
}

/// A step in the rendered audio timeline
#[derive(Debug, PartialEq)]
pub enum AudioSegment<'a> {
    Speech(&'a ConversationPart),
    Silence(u64),
}

/// Insert the section pauses the exercise format expects: a long pause when
/// the announcer moves to the question or options, a long pause between the
/// introduction and the conversation, and a short pause after every part.
pub fn plan_with_pauses(parts: &[ConversationPart]) -> Vec<AudioSegment<'_>> {
    #[derive(PartialEq)]
    enum SectionMark {
        None,
        Intro,
        Conversation,
        Question,
    }

    let mut plan = Vec::new();
    let mut current = SectionMark::None;

    for part in parts {
        if part.speaker == Speaker::Announcer {
            if part.text.contains("次の") {
                if current != SectionMark::None {
                    plan.push(AudioSegment::Silence(LONG_PAUSE_MS));
                }
                current = SectionMark::Intro;
            } else if part.text.contains("質問") || part.text.contains("選択肢") {
                plan.push(AudioSegment::Silence(LONG_PAUSE_MS));
                current = SectionMark::Question;
            }
        } else if current == SectionMark::Intro {
            plan.push(AudioSegment::Silence(LONG_PAUSE_MS));
            current = SectionMark::Conversation;
        }

        plan.push(AudioSegment::Speech(part));
        plan.push(AudioSegment::Silence(SHORT_PAUSE_MS));
    }

    plan
}

/// Build the spoken part list for a question: announcer framing, the
/// dialogue with alternating voices, then the question and options.
pub fn conversation_parts(question: &Question) -> Vec<ConversationPart> {
    let mut parts = Vec::new();

    match question {
        Question::Section2 {
            introduction,
            conversation,
            question,
            options,
        } => {
            parts.push(ConversationPart::announcer(
                "次の会話を聞いて、質問に答えてください。",
            ));
            parts.push(ConversationPart::announcer(introduction.clone()));

            for (i, line) in conversation
                .split('\n')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .enumerate()
            {
                let speaker = if i % 2 == 0 {
                    Speaker::Male
                } else {
                    Speaker::Female
                };
                parts.push(ConversationPart::voiced(speaker, line));
            }

            parts.push(ConversationPart::announcer(format!("質問。{question}")));
            parts.push(ConversationPart::announcer(spoken_options(options)));
        }
        Question::Section3 {
            situation,
            question,
            options,
        } => {
            parts.push(ConversationPart::announcer(
                "次の説明を聞いて、質問に答えてください。",
            ));
            parts.push(ConversationPart::announcer(situation.clone()));
            parts.push(ConversationPart::announcer(format!("質問。{question}")));
            parts.push(ConversationPart::announcer(spoken_options(options)));
        }
    }

    parts
}

fn spoken_options(options: &[String; 4]) -> String {
    format!(
        "選択肢。1、{}。2、{}。3、{}。4、{}。",
        options[0], options[1], options[2], options[3]
    )
}

/// Renders conversation part lists into a single MP3 under the audio
/// directory.
pub struct AudioGenerator {
    voicevox: VoicevoxClient,
    audio_dir: PathBuf,
}

impl AudioGenerator {
    pub fn new(voicevox: VoicevoxClient, audio_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&audio_dir)
            .with_context(|| format!("Failed to create audio directory: {:?}", audio_dir))?;

        Ok(Self { voicevox, audio_dir })
    }

    /// Generate the complete audio file for a conversation. Temporary part
    /// files are cleaned up best-effort; cached silence files are kept.
    pub async fn generate(&self, parts: &[ConversationPart]) -> Result<PathBuf> {
        if !ffmpeg::check_ffmpeg().await {
            anyhow::bail!(
                "ffmpeg is required for audio generation. Install it with:\n\
                 - Ubuntu: sudo apt install ffmpeg\n\
                 - macOS: brew install ffmpeg"
            );
        }

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let output = self.audio_dir.join(format!("conversation_{timestamp}.mp3"));

        let mut files: Vec<PathBuf> = Vec::new();
        let mut temp_files: Vec<PathBuf> = Vec::new();

        let result = async {
            for segment in plan_with_pauses(parts) {
                match segment {
                    AudioSegment::Silence(ms) => files.push(self.silence(ms).await?),
                    AudioSegment::Speech(part) => {
                        let mp3 = self.render_part(part, temp_files.len()).await?;
                        temp_files.push(mp3.clone());
                        files.push(mp3);
                    }
                }
            }

            ffmpeg::concat_audio(&files, &output).await
        }
        .await;

        for file in &temp_files {
            let _ = std::fs::remove_file(file);
        }

        result?;
        Ok(output)
    }

    /// Synthesize one part to a temporary MP3
    async fn render_part(&self, part: &ConversationPart, index: usize) -> Result<PathBuf> {
        let wav_bytes = self.voicevox.synthesize(&part.text, part.speaker).await?;

        let base = std::env::temp_dir().join(format!(
            "benkyo-part-{}-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_micros(),
            index
        ));
        let wav_path = base.with_extension("wav");
        let mp3_path = base.with_extension("mp3");

        std::fs::write(&wav_path, &wav_bytes).context("Failed to write synthesized audio")?;

        let converted = ffmpeg::wav_to_mp3(&wav_path, &mp3_path).await;
        let _ = std::fs::remove_file(&wav_path);
        converted?;

        Ok(mp3_path)
    }

    /// Silence files are cached per duration and reused across runs
    async fn silence(&self, duration_ms: u64) -> Result<PathBuf> {
        let path = self.audio_dir.join(format!("silence_{duration_ms}ms.mp3"));
        if !path.exists() {
            ffmpeg::write_silence(duration_ms, &path).await?;
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_question() -> Question {
        Question::Section2 {
            introduction: "男の人と女の人が話しています。".to_string(),
            conversation: "明日は何時に行きますか。\n三時に行きましょう。".to_string(),
            question: "二人は何時に行きますか。".to_string(),
            options: [
                "一時".to_string(),
                "二時".to_string(),
                "三時".to_string(),
                "四時".to_string(),
            ],
        }
    }

    #[test]
    fn test_conversation_parts_alternate_voices() {
        let parts = conversation_parts(&sample_question());

        // framing, introduction, two dialogue lines, question, options
        assert_eq!(parts.len(), 6);
        assert_eq!(parts[0].speaker, Speaker::Announcer);
        assert_eq!(parts[2].speaker, Speaker::Male);
        assert_eq!(parts[3].speaker, Speaker::Female);
        assert!(parts[4].text.starts_with("質問。"));
        assert!(parts[5].text.starts_with("選択肢。"));
    }

    #[test]
    fn test_plan_inserts_section_pauses() {
        let parts = conversation_parts(&sample_question());
        let plan = plan_with_pauses(&parts);

        // A long pause before the first dialogue line
        let first_dialogue = plan
            .iter()
            .position(|s| matches!(s, AudioSegment::Speech(p) if p.speaker == Speaker::Male))
            .unwrap();
        assert_eq!(plan[first_dialogue - 1], AudioSegment::Silence(LONG_PAUSE_MS));

        // A long pause before the question announcement
        let question_part = plan
            .iter()
            .position(
                |s| matches!(s, AudioSegment::Speech(p) if p.text.starts_with("質問。")),
            )
            .unwrap();
        assert_eq!(plan[question_part - 1], AudioSegment::Silence(LONG_PAUSE_MS));

        // Every speech segment is followed by a short pause
        for (i, segment) in plan.iter().enumerate() {
            if matches!(segment, AudioSegment::Speech(_)) {
                assert_eq!(plan[i + 1], AudioSegment::Silence(SHORT_PAUSE_MS));
            }
        }
    }

    #[test]
    fn test_plan_section3_has_no_dialogue_pause() {
        let question = Question::Section3 {
            situation: "先生に質問があります。".to_string(),
            question: "何と言いますか。".to_string(),
            options: [
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
            ],
        };

        let parts = conversation_parts(&question);
        assert!(parts.iter().all(|p| p.speaker == Speaker::Announcer));

        let plan = plan_with_pauses(&parts);
        let long_pauses = plan
            .iter()
            .filter(|s| matches!(s, AudioSegment::Silence(ms) if *ms == LONG_PAUSE_MS))
            .count();
        // One before the question, one before the options
        assert_eq!(long_pauses, 2);
    }
}
