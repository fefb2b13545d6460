use std::collections::HashMap;
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::{Question, QuestionDraft, QuestionError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error(transparent)]
    Question(#[from] QuestionError),

    #[error("question id {0} appears more than once")]
    DuplicateId(String),

    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The static question set. Loaded once, never mutated.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    questions: Vec<Question>,
    index: HashMap<QuestionId, usize>,
}

impl Catalog {
    /// Build a catalog from validated questions.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::DuplicateId` if two questions share an id.
    pub fn new(questions: Vec<Question>) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(questions.len());
        for (i, q) in questions.iter().enumerate() {
            if index.insert(q.id().clone(), i).is_some() {
                return Err(CatalogError::DuplicateId(q.id().to_string()));
            }
        }
        Ok(Self { questions, index })
    }

    /// Validate drafts and build a catalog.
    ///
    /// # Errors
    ///
    /// Returns the first `QuestionError` encountered, or `DuplicateId`.
    pub fn from_drafts(drafts: Vec<QuestionDraft>) -> Result<Self, CatalogError> {
        let questions = drafts
            .into_iter()
            .map(QuestionDraft::validate)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(questions)
    }

    /// Parse a JSON array of questions.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Parse` for malformed JSON, or validation errors.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let drafts: Vec<QuestionDraft> = serde_json::from_str(json)?;
        Self::from_drafts(drafts)
    }

    #[must_use]
    pub fn get(&self, id: &QuestionId) -> Option<&Question> {
        self.index.get(id).map(|&i| &self.questions[i])
    }

    #[must_use]
    pub fn contains(&self, id: &QuestionId) -> bool {
        self.index.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    /// Ids in catalog order.
    pub fn ids(&self) -> impl Iterator<Item = &QuestionId> {
        self.questions.iter().map(Question::id)
    }
}
