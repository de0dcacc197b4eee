use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Where a writing-practice session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Setup,
    Practice,
    Review,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} while in the {phase:?} phase")]
    InvalidTransition { action: &'static str, phase: Phase },
    #[error("no handwriting image attached yet")]
    MissingImage,
}

/// Grading feedback for one writing attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeFeedback {
    pub grade: String,
    pub explanation: String,
    pub suggestions: Vec<String>,
}

/// What the review phase shows: the OCR transcription, its literal
/// translation, and the grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub transcription: String,
    pub translation: String,
    pub feedback: GradeFeedback,
}

/// Explicit, serializable state for one writing-practice session. All phase
/// changes go through the transition methods; invalid ones are errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritingSession {
    phase: Phase,
    english_sentence: String,
    uploaded_image: Option<PathBuf>,
    review: Option<Review>,
}

impl WritingSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::Setup,
            english_sentence: String::new(),
            uploaded_image: None,
            review: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn english_sentence(&self) -> &str {
        &self.english_sentence
    }

    pub fn uploaded_image(&self) -> Option<&PathBuf> {
        self.uploaded_image.as_ref()
    }

    pub fn review(&self) -> Option<&Review> {
        self.review.as_ref()
    }

    /// Enter the practice phase with a fresh sentence. Valid from setup
    /// (first question) and review (next question); clears prior artifacts.
    pub fn start_practice(&mut self, english_sentence: String) -> Result<(), SessionError> {
        match self.phase {
            Phase::Setup | Phase::Review => {
                self.english_sentence = english_sentence;
                self.uploaded_image = None;
                self.review = None;
                self.phase = Phase::Practice;
                Ok(())
            }
            Phase::Practice => Err(SessionError::InvalidTransition {
                action: "start a new question",
                phase: self.phase,
            }),
        }
    }

    /// Attach the handwriting image to grade. Practice phase only.
    pub fn attach_image(&mut self, path: PathBuf) -> Result<(), SessionError> {
        if self.phase != Phase::Practice {
            return Err(SessionError::InvalidTransition {
                action: "attach an image",
                phase: self.phase,
            });
        }
        self.uploaded_image = Some(path);
        Ok(())
    }

    /// Move to the review phase with grading results. Requires an attached
    /// image, mirroring the submit-for-review flow.
    pub fn submit_review(&mut self, review: Review) -> Result<(), SessionError> {
        if self.phase != Phase::Practice {
            return Err(SessionError::InvalidTransition {
                action: "submit for review",
                phase: self.phase,
            });
        }
        if self.uploaded_image.is_none() {
            return Err(SessionError::MissingImage);
        }
        self.review = Some(review);
        self.phase = Phase::Review;
        Ok(())
    }
}

impl Default for WritingSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_review() -> Review {
        Review {
            transcription: "わたしはすしをたべます".to_string(),
            translation: "I eat sushi.".to_string(),
            feedback: GradeFeedback {
                grade: "A".to_string(),
                explanation: "Accurate translation.".to_string(),
                suggestions: vec!["Try using kanji for 寿司.".to_string()],
            },
        }
    }

    #[test]
    fn test_full_session_cycle() {
        let mut session = WritingSession::new();
        assert_eq!(session.phase(), Phase::Setup);

        session.start_practice("I eat sushi.".to_string()).unwrap();
        assert_eq!(session.phase(), Phase::Practice);
        assert_eq!(session.english_sentence(), "I eat sushi.");

        session.attach_image(PathBuf::from("attempt.png")).unwrap();
        session.submit_review(sample_review()).unwrap();
        assert_eq!(session.phase(), Phase::Review);
        assert!(session.review().is_some());

        // Next question: back to practice with artifacts cleared
        session.start_practice("I drink tea.".to_string()).unwrap();
        assert_eq!(session.phase(), Phase::Practice);
        assert!(session.uploaded_image().is_none());
        assert!(session.review().is_none());
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut session = WritingSession::new();

        // Cannot attach or review before practice starts
        assert!(matches!(
            session.attach_image(PathBuf::from("x.png")),
            Err(SessionError::InvalidTransition { .. })
        ));
        assert!(matches!(
            session.submit_review(sample_review()),
            Err(SessionError::InvalidTransition { .. })
        ));

        session.start_practice("sentence".to_string()).unwrap();

        // Cannot restart mid-practice
        assert!(matches!(
            session.start_practice("another".to_string()),
            Err(SessionError::InvalidTransition { .. })
        ));

        // Cannot review without an image
        assert!(matches!(
            session.submit_review(sample_review()),
            Err(SessionError::MissingImage)
        ));
    }
}
