//! Scoring and reconciliation.
//!
//! The same pure function scores a live local attempt and a stored remote
//! record; both reduce to `(question ids, answers by position)`.

use serde::{Deserialize, Serialize};

use crate::model::{AnswersByPosition, Catalog, Position, QuestionId};

/// Minimum percentage shown as "Passed".
pub const DEFAULT_PASS_THRESHOLD: u8 = 70;

/// Correctness of one scored position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub position: Position,
    pub question_id: QuestionId,
    /// `None` when the id is no longer in the catalog.
    pub prompt: Option<String>,
    /// Trimmed answer text; empty when unanswered.
    pub chosen: String,
    pub correct_answer: Option<String>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub correct: u32,
    pub total: u32,
    pub percentage: u8,
    pub items: Vec<ItemOutcome>,
}

impl ScoreReport {
    #[must_use]
    pub fn passed(&self, threshold: u8) -> bool {
        self.percentage >= threshold
    }

    /// Short verdict label for result views.
    #[must_use]
    pub fn verdict(&self, threshold: u8) -> &'static str {
        if self.passed(threshold) {
            "Passed"
        } else {
            "Review recommended"
        }
    }
}

/// Score `answers` against the catalog answers of `question_ids`.
///
/// Index `i` of `question_ids` is compared with position `i + 1`. Both sides are
/// trimmed and compared case-sensitively. Blank answers and ids missing from the
/// catalog count as incorrect; neither is an error.
#[must_use]
pub fn score(
    catalog: &Catalog,
    question_ids: &[QuestionId],
    answers: &AnswersByPosition,
) -> ScoreReport {
    let mut items = Vec::with_capacity(question_ids.len());
    let mut correct = 0_u32;

    for (position, question_id) in Position::range(question_ids.len()).zip(question_ids) {
        let question = catalog.get(question_id);
        let chosen = answers.get(position).trim();
        let is_correct = question
            .is_some_and(|q| !chosen.is_empty() && chosen == q.answer().trim());
        if is_correct {
            correct = correct.saturating_add(1);
        }

        items.push(ItemOutcome {
            position,
            question_id: question_id.clone(),
            prompt: question.map(|q| q.prompt().to_owned()),
            chosen: chosen.to_owned(),
            correct_answer: question.map(|q| q.answer().to_owned()),
            is_correct,
        });
    }

    let total = u32::try_from(items.len()).unwrap_or(u32::MAX);
    ScoreReport {
        correct,
        total,
        percentage: percentage(correct, total),
        items,
    }
}

/// `round(100 * correct / total)`, rounding halves up; `0` when `total == 0`.
#[must_use]
pub fn percentage(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(total));
    let total = u64::from(total);
    let pct = (200 * correct + total) / (2 * total);
    u8::try_from(pct).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionDraft;

    fn catalog() -> Catalog {
        Catalog::from_drafts(vec![
            QuestionDraft {
                id: "Q1".into(),
                prompt: "first".into(),
                options: vec!["A".into(), "B".into(), "C".into()],
                answer: "A".into(),
                image: None,
            },
            QuestionDraft {
                id: "Q2".into(),
                prompt: "second".into(),
                options: vec!["A".into(), "B".into(), "C".into()],
                answer: "B".into(),
                image: None,
            },
        ])
        .unwrap()
    }

    fn ids(raw: &[&str]) -> Vec<QuestionId> {
        raw.iter().map(|s| QuestionId::new(*s).unwrap()).collect()
    }

    fn answers(pairs: &[(u32, &str)]) -> AnswersByPosition {
        pairs
            .iter()
            .map(|(p, v)| (Position::new(*p).unwrap(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn one_of_two_is_fifty_percent() {
        let report = score(&catalog(), &ids(&["Q1", "Q2"]), &answers(&[(1, "A"), (2, "C")]));
        assert_eq!(report.correct, 1);
        assert_eq!(report.total, 2);
        assert_eq!(report.percentage, 50);
        assert!(report.items[0].is_correct);
        assert!(!report.items[1].is_correct);
        assert_eq!(report.items[1].correct_answer.as_deref(), Some("B"));
    }

    #[test]
    fn empty_selection_scores_zero_percent() {
        let report = score(&catalog(), &[], &AnswersByPosition::new());
        assert_eq!(report.total, 0);
        assert_eq!(report.percentage, 0);
        assert!(report.items.is_empty());
    }

    #[test]
    fn whitespace_is_ignored_on_both_sides() {
        let report = score(&catalog(), &ids(&["Q1"]), &answers(&[(1, "  A \n")]));
        assert_eq!(report.correct, 1);
        assert_eq!(report.items[0].chosen, "A");
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let report = score(&catalog(), &ids(&["Q1"]), &answers(&[(1, "a")]));
        assert_eq!(report.correct, 0);
    }

    #[test]
    fn blank_never_matches() {
        let report = score(&catalog(), &ids(&["Q1", "Q2"]), &answers(&[(1, "")]));
        assert_eq!(report.correct, 0);
        assert_eq!(report.items[1].chosen, "");
    }

    #[test]
    fn unknown_ids_count_as_incorrect() {
        let report = score(&catalog(), &ids(&["Q1", "gone"]), &answers(&[(1, "A"), (2, "A")]));
        assert_eq!(report.total, 2);
        assert_eq!(report.correct, 1);
        assert_eq!(report.items[1].prompt, None);
    }

    #[test]
    fn scoring_is_deterministic() {
        let ids = ids(&["Q2", "Q1"]);
        let ans = answers(&[(1, "B"), (2, "B")]);
        assert_eq!(score(&catalog(), &ids, &ans), score(&catalog(), &ids, &ans));
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(25, 25), 100);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn verdict_uses_threshold() {
        let report = score(&catalog(), &ids(&["Q1", "Q2"]), &answers(&[(1, "A"), (2, "B")]));
        assert!(report.passed(DEFAULT_PASS_THRESHOLD));
        assert_eq!(report.verdict(DEFAULT_PASS_THRESHOLD), "Passed");
        let half = score(&catalog(), &ids(&["Q1", "Q2"]), &answers(&[(1, "A")]));
        assert_eq!(half.verdict(DEFAULT_PASS_THRESHOLD), "Review recommended");
    }
}
