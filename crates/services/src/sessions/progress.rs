/// Aggregated view of attempt progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
    pub is_finalized: bool,
}

impl AttemptProgress {
    #[must_use]
    pub fn new(total: usize, answered: usize, is_finalized: bool) -> Self {
        let answered = answered.min(total);
        Self {
            total,
            answered,
            remaining: total - answered,
            is_complete: answered == total,
            is_finalized,
        }
    }
}
