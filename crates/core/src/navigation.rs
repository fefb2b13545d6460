//! Forward-navigation guard.
//!
//! A participant may move back freely, but may not move past the first
//! unanswered position.

use crate::model::{AnswersByPosition, Position};

/// Guard over an attempt of `total` positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationGuard {
    total: usize,
}

impl NavigationGuard {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self { total }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Returns true if `position` may be entered given `answers`.
    ///
    /// Position 1 is always enterable; any later position requires every
    /// earlier position to hold a non-blank answer.
    #[must_use]
    pub fn can_enter(&self, position: Position, answers: &AnswersByPosition) -> bool {
        if position == Position::FIRST {
            return true;
        }
        position.index() < self.total
            && Position::range(position.index()).all(|p| answers.is_answered(p))
    }

    /// Where a request for `requested` actually lands.
    ///
    /// Requests past the end are clamped to the last position; requests past
    /// the first unanswered position are redirected to it.
    #[must_use]
    pub fn resolve(&self, requested: Position, answers: &AnswersByPosition) -> Position {
        let last = Position::from_index(self.total.saturating_sub(1)).unwrap_or(Position::FIRST);
        let requested = requested.min(last);
        match answers.first_unanswered(self.total) {
            Some(gap) if gap < requested => gap,
            _ => requested,
        }
    }

    /// "Next"/"Submit" are enabled only when `current` is answered.
    #[must_use]
    pub fn can_advance(&self, current: Position, answers: &AnswersByPosition) -> bool {
        current.index() < self.total && answers.is_answered(current)
    }
}
