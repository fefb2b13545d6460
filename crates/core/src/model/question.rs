use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id cannot be empty")]
    EmptyId,

    #[error("question {id} has an empty prompt")]
    EmptyPrompt { id: String },

    #[error("question {id} needs at least two options, got {count}")]
    TooFewOptions { id: String, count: usize },

    #[error("question {id} has a blank option")]
    BlankOption { id: String },

    #[error("question {id} lists option {option:?} more than once")]
    DuplicateOption { id: String, option: String },

    #[error("answer of question {id} is not one of its options")]
    AnswerNotAnOption { id: String },
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question as it appears in a catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl QuestionDraft {
    /// Validate the draft into an immutable `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the id or prompt is blank, options are missing,
    /// blank or duplicated, or the answer does not match any option.
    pub fn validate(self) -> Result<Question, QuestionError> {
        let id = QuestionId::new(self.id.clone()).map_err(|_| QuestionError::EmptyId)?;

        if self.prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt { id: self.id });
        }
        if self.options.len() < 2 {
            return Err(QuestionError::TooFewOptions {
                id: self.id,
                count: self.options.len(),
            });
        }

        let mut seen = HashSet::with_capacity(self.options.len());
        for option in &self.options {
            if option.trim().is_empty() {
                return Err(QuestionError::BlankOption { id: self.id });
            }
            if !seen.insert(option.as_str()) {
                return Err(QuestionError::DuplicateOption {
                    id: self.id.clone(),
                    option: option.clone(),
                });
            }
        }

        if !self.options.iter().any(|o| o == &self.answer) {
            return Err(QuestionError::AnswerNotAnOption { id: self.id });
        }

        Ok(Question {
            id,
            prompt: self.prompt,
            options: self.options,
            answer: self.answer,
            image: self.image.filter(|i| !i.trim().is_empty()),
        })
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question. Immutable once validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    answer: String,
    image: Option<String>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Returns true if `text` is exactly one of this question's options.
    #[must_use]
    pub fn has_option(&self, text: &str) -> bool {
        self.options.iter().any(|o| o == text)
    }
}
