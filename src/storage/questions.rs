use chrono::Utc;
use colored::Colorize;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::Database;
use crate::embeddings::{self, EmbeddingProvider, ZeroFallback};
use crate::ingest;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("only sections 2 and 3 are currently supported (got {0})")]
    InvalidSection(i64),
    #[error("question {id} is not a section {expected} question")]
    SectionMismatch { id: String, expected: u8 },
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
    #[error("corrupt payload for question {id}")]
    Payload {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A supported question section. Sections 2 and 3 are the only ones with a
/// defined shape; everything else is rejected at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Two,
    Three,
}

impl Section {
    pub fn from_number(n: i64) -> Result<Self, StoreError> {
        match n {
            2 => Ok(Section::Two),
            3 => Ok(Section::Three),
            other => Err(StoreError::InvalidSection(other)),
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Section::Two => 2,
            Section::Three => 3,
        }
    }

    fn table(self) -> &'static str {
        match self {
            Section::Two => "section2_questions",
            Section::Three => "section3_questions",
        }
    }
}

/// Fallback answer choices substituted whenever a source fails to provide
/// exactly four options.
pub fn default_options() -> [String; 4] {
    [
        "ピザを食べる".to_string(),
        "ハンバーガーを食べる".to_string(),
        "サラダを食べる".to_string(),
        "パスタを食べる".to_string(),
    ]
}

/// One listening-comprehension item. Section 2 questions carry a narrated
/// introduction and a dialogue; section 3 questions a situation. Both end in
/// a question with exactly four answer options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Question {
    Section2 {
        introduction: String,
        conversation: String,
        question: String,
        options: [String; 4],
    },
    Section3 {
        situation: String,
        question: String,
        options: [String; 4],
    },
}

impl Question {
    pub fn section(&self) -> Section {
        match self {
            Question::Section2 { .. } => Section::Two,
            Question::Section3 { .. } => Section::Three,
        }
    }

    pub fn question_text(&self) -> &str {
        match self {
            Question::Section2 { question, .. } | Question::Section3 { question, .. } => question,
        }
    }

    pub fn options(&self) -> &[String; 4] {
        match self {
            Question::Section2 { options, .. } | Question::Section3 { options, .. } => options,
        }
    }

    /// The text that gets embedded: narrative fields joined by newlines.
    /// Options are answer choices, not comprehension content, and are
    /// excluded so retrieval is not biased by distractor overlap.
    pub fn searchable_text(&self) -> String {
        match self {
            Question::Section2 {
                introduction,
                conversation,
                question,
                ..
            } => format!("{introduction}\n{conversation}\n{question}"),
            Question::Section3 {
                situation,
                question,
                ..
            } => format!("{situation}\n{question}"),
        }
    }
}

/// A question reconstructed from the store, tagged with its section so
/// results stay self-describing when callers merge partitions.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredQuestion {
    pub question: Question,
    pub section_num: u8,
}

/// One similarity-search hit. `similarity_score` is the raw cosine distance
/// (lower = more similar) and is not normalized to any fixed range.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub question: Question,
    pub similarity_score: f32,
    pub section_num: u8,
}

/// Persistent, embedding-indexed store of practice questions, partitioned
/// by section.
pub struct QuestionStore<'a> {
    db: &'a Database,
    embedder: ZeroFallback,
}

impl<'a> QuestionStore<'a> {
    /// Build a store over an open database. The embedding provider is chosen
    /// once here and wrapped so that provider failures degrade to zero
    /// vectors instead of surfacing.
    pub fn new(db: &'a Database, provider: Box<dyn EmbeddingProvider>) -> Self {
        Self {
            db,
            embedder: ZeroFallback::new(provider),
        }
    }

    /// Ingest a batch of questions from one source. Assigns each question the
    /// derived id `{source_id}_{section}_{index}` and upserts it, so
    /// re-ingesting the same source overwrites the same keys.
    pub async fn add_questions(
        &self,
        section_num: i64,
        questions: &[Question],
        source_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        let section = Section::from_number(section_num)?;

        let mut ids = Vec::with_capacity(questions.len());
        let mut texts = Vec::with_capacity(questions.len());

        for (idx, question) in questions.iter().enumerate() {
            let id = format!("{}_{}_{}", source_id, section.number(), idx);
            if question.section() != section {
                return Err(StoreError::SectionMismatch {
                    id,
                    expected: section.number(),
                });
            }
            texts.push(question.searchable_text());
            ids.push(id);
        }

        // Never fails: degraded texts get zero vectors and stay indexed
        let vectors = self.embedder.embed_batch(&texts).await;

        let now = Utc::now().to_rfc3339();
        let sql = format!(
            "INSERT INTO {} (question_id, source_id, question_index, payload, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(question_id) DO UPDATE SET
                 payload = excluded.payload,
                 embedding = excluded.embedding,
                 created_at = excluded.created_at",
            section.table()
        );

        for (idx, ((id, question), vector)) in ids.iter().zip(questions).zip(&vectors).enumerate() {
            let payload = serde_json::to_string(question).map_err(|e| StoreError::Payload {
                id: id.clone(),
                source: e,
            })?;

            self.db.conn.execute(
                &sql,
                params![
                    id,
                    source_id,
                    idx as i64,
                    payload,
                    embeddings::embedding_to_bytes(vector),
                    now
                ],
            )?;
        }

        Ok(ids)
    }

    /// Return up to `top_n` stored questions nearest to `query`, ranked by
    /// ascending distance. An empty partition yields an empty vec.
    pub async fn search_similar(
        &self,
        section_num: i64,
        query: &str,
        top_n: usize,
    ) -> Result<Vec<SearchResult>, StoreError> {
        let section = Section::from_number(section_num)?;

        let mut stmt = self.db.conn.prepare(&format!(
            "SELECT question_id, payload, embedding FROM {}",
            section.table()
        ))?;

        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let payload: String = row.get(1)?;
            let blob: Vec<u8> = row.get(2)?;
            Ok((id, payload, embeddings::bytes_to_embedding(&blob)))
        })?;

        let mut vectors = Vec::new();
        let mut payloads = std::collections::HashMap::new();
        for row in rows {
            let (id, payload, embedding) = row?;
            payloads.insert(id.clone(), payload);
            vectors.push((id, embedding));
        }

        if vectors.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await;
        let ranked = embeddings::find_nearest(&query_embedding, &vectors, top_n);

        let mut results = Vec::with_capacity(ranked.len());
        for (id, distance) in ranked {
            match serde_json::from_str::<Question>(&payloads[&id]) {
                Ok(question) => results.push(SearchResult {
                    question,
                    similarity_score: distance,
                    section_num: section.number(),
                }),
                Err(e) => {
                    // Skip the one bad record rather than failing the search
                    eprintln!("{} skipping corrupt question {}: {}", "Warning:".yellow(), id, e);
                }
            }
        }

        Ok(results)
    }

    /// Exact lookup by derived identifier.
    pub fn get_by_id(
        &self,
        section_num: i64,
        question_id: &str,
    ) -> Result<Option<StoredQuestion>, StoreError> {
        let section = Section::from_number(section_num)?;

        let mut stmt = self.db.conn.prepare(&format!(
            "SELECT payload FROM {} WHERE question_id = ?1",
            section.table()
        ))?;

        let mut rows = stmt.query(params![question_id])?;

        match rows.next()? {
            Some(row) => {
                let payload: String = row.get(0)?;
                let question =
                    serde_json::from_str(&payload).map_err(|e| StoreError::Payload {
                        id: question_id.to_string(),
                        source: e,
                    })?;
                Ok(Some(StoredQuestion {
                    question,
                    section_num: section.number(),
                }))
            }
            None => Ok(None),
        }
    }

    /// Count questions in one partition.
    pub fn count(&self, section_num: i64) -> Result<i64, StoreError> {
        let section = Section::from_number(section_num)?;

        let count: i64 = self.db.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", section.table()),
            [],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    /// Parse a `{source_id}_section{N}.txt` file and ingest every question it
    /// yields. Parsing is best-effort: malformed fragments are skipped and an
    /// unreadable or unrecognizable file ingests nothing (with a warning)
    /// instead of aborting. Returns the number of questions ingested.
    pub async fn index_file(&self, path: &Path) -> Result<usize, StoreError> {
        let parsed = match ingest::parse_question_file(path) {
            Ok(parsed) => parsed,
            Err(e) => {
                eprintln!(
                    "{} could not parse questions from {}: {}",
                    "Warning:".yellow(),
                    path.display(),
                    e
                );
                return Ok(0);
            }
        };

        Section::from_number(parsed.section_num)?;

        if parsed.questions.is_empty() {
            return Ok(0);
        }

        let ids = self
            .add_questions(parsed.section_num, &parsed.questions, &parsed.source_id)
            .await?;

        Ok(ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EmbeddingProvider;
    use anyhow::Result as AnyResult;
    use async_trait::async_trait;

    /// Deterministic provider: same text always maps to the same vector.
    struct MockProvider;

    fn mock_vector(text: &str) -> Vec<f32> {
        let mut v = vec![1.0_f32, 0.0, 0.0, 0.0];
        for (i, b) in text.bytes().enumerate() {
            v[i % 4] += b as f32 / 255.0;
        }
        v
    }

    #[async_trait]
    impl EmbeddingProvider for MockProvider {
        async fn embed(&self, text: &str) -> AnyResult<Vec<f32>> {
            Ok(mock_vector(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> AnyResult<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| mock_vector(t)).collect())
        }

        fn model_name(&self) -> &str {
            "mock"
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        async fn embed(&self, _text: &str) -> AnyResult<Vec<f32>> {
            anyhow::bail!("provider unreachable")
        }

        async fn embed_batch(&self, _texts: &[String]) -> AnyResult<Vec<Vec<f32>>> {
            anyhow::bail!("provider unreachable")
        }

        fn model_name(&self) -> &str {
            "failing"
        }

        fn dimensions(&self) -> usize {
            4
        }
    }

    fn section2_question(tag: &str) -> Question {
        Question::Section2 {
            introduction: format!("intro {tag}"),
            conversation: format!("conv {tag}"),
            question: format!("q {tag}"),
            options: [
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
            ],
        }
    }

    fn section3_question(tag: &str) -> Question {
        Question::Section3 {
            situation: format!("situation {tag}"),
            question: format!("q {tag}"),
            options: [
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
            ],
        }
    }

    fn open_store(db: &Database) -> QuestionStore<'_> {
        QuestionStore::new(db, Box::new(MockProvider))
    }

    #[tokio::test]
    async fn test_ingest_then_get_by_id_roundtrip() {
        let db = Database::open_in_memory().unwrap();
        let store = open_store(&db);

        let questions = vec![section2_question("one"), section2_question("two")];
        let ids = store.add_questions(2, &questions, "vidA").await.unwrap();
        assert_eq!(ids, vec!["vidA_2_0", "vidA_2_1"]);

        let fetched = store.get_by_id(2, "vidA_2_1").unwrap().unwrap();
        assert_eq!(fetched.question, questions[1]);
        assert_eq!(fetched.section_num, 2);

        let s3 = vec![section3_question("phrase")];
        store.add_questions(3, &s3, "vidA").await.unwrap();
        let fetched = store.get_by_id(3, "vidA_3_0").unwrap().unwrap();
        assert_eq!(fetched.question, s3[0]);
        assert_eq!(fetched.section_num, 3);
    }

    #[tokio::test]
    async fn test_example_scenario() {
        let db = Database::open_in_memory().unwrap();
        let store = open_store(&db);

        let question = Question::Section2 {
            introduction: "intro A".to_string(),
            conversation: "conv A".to_string(),
            question: "q A".to_string(),
            options: [
                "a".to_string(),
                "b".to_string(),
                "c".to_string(),
                "d".to_string(),
            ],
        };

        let ids = store
            .add_questions(2, std::slice::from_ref(&question), "vid1")
            .await
            .unwrap();
        assert_eq!(ids, vec!["vid1_2_0"]);

        let fetched = store.get_by_id(2, "vid1_2_0").unwrap().unwrap();
        assert_eq!(fetched.question, question);
        assert_eq!(fetched.section_num, 2);
    }

    #[tokio::test]
    async fn test_get_by_id_missing_is_none() {
        let db = Database::open_in_memory().unwrap();
        let store = open_store(&db);

        assert!(store.get_by_id(2, "nope_2_0").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_empty_partition_returns_empty() {
        let db = Database::open_in_memory().unwrap();
        let store = open_store(&db);

        let results = store.search_similar(3, "anything", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_ranks_by_ascending_distance() {
        let db = Database::open_in_memory().unwrap();
        let store = open_store(&db);

        let questions = vec![
            section2_question("alpha"),
            section2_question("beta"),
            section2_question("gamma"),
        ];
        store.add_questions(2, &questions, "vid").await.unwrap();

        // Query with the exact searchable text of one stored question: it
        // must come back first with distance ~0.
        let query = questions[1].searchable_text();
        let results = store.search_similar(2, &query, 3).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].question, questions[1]);
        assert!(results[0].similarity_score.abs() < 1e-5);
        for pair in results.windows(2) {
            assert!(pair[0].similarity_score <= pair[1].similarity_score);
        }
        for r in &results {
            assert_eq!(r.section_num, 2);
        }
    }

    #[tokio::test]
    async fn test_search_caps_at_top_n() {
        let db = Database::open_in_memory().unwrap();
        let store = open_store(&db);

        let questions: Vec<Question> = (0..5)
            .map(|i| section2_question(&format!("item {i}")))
            .collect();
        store.add_questions(2, &questions, "vid").await.unwrap();

        let results = store.search_similar(2, "item", 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_sections_rejected_everywhere() {
        let db = Database::open_in_memory().unwrap();
        let store = open_store(&db);

        for bad in [0_i64, 1, 4] {
            let err = store
                .add_questions(bad, &[section2_question("x")], "vid")
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::InvalidSection(n) if n == bad));

            let err = store.search_similar(bad, "query", 5).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidSection(n) if n == bad));

            let err = store.get_by_id(bad, "vid_2_0").unwrap_err();
            assert!(matches!(err, StoreError::InvalidSection(n) if n == bad));
        }
    }

    #[tokio::test]
    async fn test_section_mismatch_rejected() {
        let db = Database::open_in_memory().unwrap();
        let store = open_store(&db);

        let err = store
            .add_questions(2, &[section3_question("x")], "vid")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SectionMismatch { expected: 2, .. }));
    }

    #[tokio::test]
    async fn test_embedding_failure_still_ingests() {
        let db = Database::open_in_memory().unwrap();
        let store = QuestionStore::new(&db, Box::new(FailingProvider));

        let questions = vec![section2_question("degraded")];
        store.add_questions(2, &questions, "vid").await.unwrap();

        // Degrade, don't block: the record is retrievable afterwards
        let fetched = store.get_by_id(2, "vid_2_0").unwrap().unwrap();
        assert_eq!(fetched.question, questions[0]);

        // And search still works against the zero-vector index
        let results = store.search_similar(2, "degraded", 1).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_reingest_upserts_instead_of_duplicating() {
        let db = Database::open_in_memory().unwrap();
        let store = open_store(&db);

        store
            .add_questions(2, &[section2_question("v1")], "vid")
            .await
            .unwrap();
        store
            .add_questions(2, &[section2_question("v2")], "vid")
            .await
            .unwrap();

        assert_eq!(store.count(2).unwrap(), 1);
        let fetched = store.get_by_id(2, "vid_2_0").unwrap().unwrap();
        assert_eq!(fetched.question, section2_question("v2"));
    }

    #[tokio::test]
    async fn test_index_file_ingests_parsed_questions() {
        let db = Database::open_in_memory().unwrap();
        let store = open_store(&db);

        let dir = std::env::temp_dir().join(format!("benkyo-store-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lesson9_section2.txt");
        std::fs::write(
            &path,
            "<question>\n\
             Introduction:\n\
             男の人と女の人が話しています。\n\
             Conversation:\n\
             明日は何時に会いますか。\n\
             Question:\n\
             二人は何時に会いますか。\n\
             Options:\n\
             1. 一時\n\
             2. 二時\n\
             3. 三時\n\
             4. 四時\n\
             </question>\n",
        )
        .unwrap();

        let count = store.index_file(&path).await.unwrap();
        assert_eq!(count, 1);
        assert!(store.get_by_id(2, "lesson9_2_0").unwrap().is_some());

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_index_file_unreadable_is_warned_not_fatal() {
        let db = Database::open_in_memory().unwrap();
        let store = open_store(&db);

        let missing = std::env::temp_dir().join("benkyo-no-such-file_section2.txt");
        let count = store.index_file(&missing).await.unwrap();
        assert_eq!(count, 0);
    }
}
