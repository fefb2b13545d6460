//! Selection engine: draws the fixed question subset for an attempt.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::model::{Catalog, QuestionId, Selection};

/// Number of questions in a standard attempt.
pub const DEFAULT_QUESTION_COUNT: usize = 25;

/// Draw `n` distinct questions uniformly at random, without replacement.
///
/// The returned order is the presentation and scoring order. If the catalog
/// has fewer than `n` questions, all of them are returned (shuffled).
#[must_use]
pub fn select_questions<R: Rng + ?Sized>(catalog: &Catalog, n: usize, rng: &mut R) -> Selection {
    let mut ids: Vec<QuestionId> = catalog.ids().cloned().collect();
    let take = n.min(ids.len());
    let (picked, _) = ids.partial_shuffle(rng, take);
    let picked = picked.to_vec();

    // Catalog ids are unique, so a subset of them is too.
    Selection::new(picked).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionDraft;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn catalog(size: usize) -> Catalog {
        Catalog::from_drafts(
            (0..size)
                .map(|i| QuestionDraft {
                    id: format!("q{i}"),
                    prompt: format!("prompt {i}"),
                    options: vec!["yes".into(), "no".into()],
                    answer: "yes".into(),
                    image: None,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn draws_exactly_n_distinct_ids() {
        let catalog = catalog(60);
        let mut rng = StdRng::seed_from_u64(7);
        let selection = select_questions(&catalog, DEFAULT_QUESTION_COUNT, &mut rng);

        assert_eq!(selection.len(), DEFAULT_QUESTION_COUNT);
        let unique: HashSet<_> = selection.ids().iter().collect();
        assert_eq!(unique.len(), DEFAULT_QUESTION_COUNT);
        assert!(selection.ensure_in(&catalog).is_ok());
    }

    #[test]
    fn small_catalog_returns_everything() {
        let catalog = catalog(3);
        let mut rng = StdRng::seed_from_u64(1);
        let selection = select_questions(&catalog, 25, &mut rng);
        assert_eq!(selection.len(), 3);
    }

    #[test]
    fn empty_catalog_gives_empty_selection() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_questions(&Catalog::default(), 25, &mut rng).is_empty());
    }

    #[test]
    fn same_seed_same_order() {
        let catalog = catalog(40);
        let a = select_questions(&catalog, 10, &mut StdRng::seed_from_u64(99));
        let b = select_questions(&catalog, 10, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }
}
