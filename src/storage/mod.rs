pub mod db;
pub mod questions;

pub use db::Database;
pub use questions::{
    Question, QuestionStore, SearchResult, Section, StoreError, StoredQuestion, default_options,
};
