pub mod generator;
pub mod grader;
pub mod session;

pub use generator::{Feedback, QuestionGenerator};
pub use session::{GradeFeedback, Phase, Review, WritingSession};
