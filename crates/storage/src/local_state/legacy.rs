//! One-shot upgrade of pre-versioned local state.
//!
//! Older builds kept answers keyed by question id under `answers`, or by
//! position under an unscoped `answers_ordered`, and called the run id
//! `quiz_run_id`. The upgrade moves whatever can be recovered into the
//! run-scoped layout, drops the old keys and stamps the schema version.
//! It never runs again once the version is stamped.

use chrono::{DateTime, Utc};
use quiz_core::model::{AnswersByPosition, Position, QuestionId, Run, RunId, Selection};
use std::collections::HashMap;
use tracing::{info, warn};

use super::{LocalState, keys};
use crate::repository::StorageError;

/// What `migrate_legacy` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Schema was already at the current version.
    AlreadyCurrent,
    /// No legacy keys were present; only the version was stamped.
    Fresh,
    /// Legacy keys were folded into the current layout.
    Upgraded { recovered_answers: usize },
}

/// Bring the local schema up to date.
///
/// `now` becomes the start time of a recovered run; the original start time
/// was never recorded, so the recovered run gets a full budget.
///
/// # Errors
///
/// Returns `StorageError` if the backend cannot be read or written.
pub async fn migrate_legacy(
    state: &LocalState,
    now: DateTime<Utc>,
) -> Result<MigrationOutcome, StorageError> {
    if state
        .schema_version()
        .await?
        .is_some_and(|v| v >= keys::SCHEMA_VERSION)
    {
        return Ok(MigrationOutcome::AlreadyCurrent);
    }

    let store = state.store();
    let mut legacy = HashMap::new();
    for key in keys::legacy::ALL {
        if let Some(value) = store.get(key).await? {
            legacy.insert(key, value);
        }
    }

    if legacy.is_empty() {
        state.set_schema_version(keys::SCHEMA_VERSION).await?;
        info!(version = keys::SCHEMA_VERSION, "stamped local schema");
        return Ok(MigrationOutcome::Fresh);
    }

    let mut recovered_answers = 0;
    if let Some(selection) = state.load_selection().await? {
        // The selection is re-saved so `presented_ids` exists even when only
        // `selected_ids` was written by the old build.
        state.save_selection(&selection).await?;

        let run = match state.load_run().await? {
            Some(run) => run,
            None => {
                let run = recover_run(&selection, legacy.get(keys::legacy::RUN_ID), now);
                state.save_run(&run).await?;
                run
            }
        };

        let existing = state.load_answers(run.id()).await?;
        if existing.is_empty() {
            let answers = recover_answers(&selection, &legacy);
            recovered_answers = answers.answered_count();
            if !answers.is_empty() {
                state.save_answers(run.id(), &answers).await?;
            }
        }
    }

    let stale: Vec<String> = keys::legacy::ALL.iter().map(|k| (*k).to_owned()).collect();
    store.remove_all(&stale).await?;
    state.set_schema_version(keys::SCHEMA_VERSION).await?;
    info!(recovered_answers, "upgraded legacy local state");
    Ok(MigrationOutcome::Upgraded { recovered_answers })
}

fn recover_run(selection: &Selection, legacy_id: Option<&String>, now: DateTime<Utc>) -> Run {
    match legacy_id.and_then(|raw| raw.parse::<RunId>().ok()) {
        Some(id) => Run::from_persisted(id, selection.fingerprint(), now),
        None => Run::start(selection, now),
    }
}

/// Prefer position-keyed answers; fall back to mapping id-keyed answers
/// through the selection order.
fn recover_answers(selection: &Selection, legacy: &HashMap<&str, String>) -> AnswersByPosition {
    if let Some(raw) = legacy.get(keys::legacy::ANSWERS_UNSCOPED) {
        match serde_json::from_str::<AnswersByPosition>(raw) {
            Ok(answers) => return answers.normalized(selection.len()),
            Err(e) => warn!(error = %e, "ignoring malformed legacy ordered answers"),
        }
    }

    let Some(raw) = legacy.get(keys::legacy::ANSWERS_BY_ID) else {
        return AnswersByPosition::new();
    };
    let by_id: HashMap<String, Option<String>> = match serde_json::from_str(raw) {
        Ok(map) => map,
        Err(e) => {
            warn!(error = %e, "ignoring malformed legacy answers");
            return AnswersByPosition::new();
        }
    };

    selection
        .ids()
        .iter()
        .enumerate()
        .filter_map(|(index, id): (usize, &QuestionId)| {
            let answer = by_id.get(id.as_str())?.clone()?;
            Some((Position::from_index(index).ok()?, answer))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{InMemoryRepository, LocalStore};
    use quiz_core::time::fixed_now;
    use std::sync::Arc;

    fn setup() -> (InMemoryRepository, LocalState) {
        let repo = InMemoryRepository::new();
        let state = LocalState::new(Arc::new(repo.clone()));
        (repo, state)
    }

    fn pos(v: u32) -> Position {
        Position::new(v).unwrap()
    }

    #[tokio::test]
    async fn empty_store_is_fresh_then_current() {
        let (_, state) = setup();
        assert_eq!(
            migrate_legacy(&state, fixed_now()).await.unwrap(),
            MigrationOutcome::Fresh
        );
        assert_eq!(state.schema_version().await.unwrap(), Some(keys::SCHEMA_VERSION));
        assert_eq!(
            migrate_legacy(&state, fixed_now()).await.unwrap(),
            MigrationOutcome::AlreadyCurrent
        );
    }

    #[tokio::test]
    async fn id_keyed_answers_are_mapped_to_positions() {
        let (repo, state) = setup();
        repo.set(keys::SELECTED_IDS, r#"["Q7","Q3","Q9"]"#).await.unwrap();
        repo.set(keys::legacy::ANSWERS_BY_ID, r#"{"Q3":"B","Q7":"A","Q1":"X"}"#)
            .await
            .unwrap();

        let outcome = migrate_legacy(&state, fixed_now()).await.unwrap();
        assert_eq!(outcome, MigrationOutcome::Upgraded { recovered_answers: 2 });

        let run = state.load_run().await.unwrap().unwrap();
        let answers = state.load_answers(run.id()).await.unwrap();
        assert_eq!(answers.get(pos(1)), "A");
        assert_eq!(answers.get(pos(2)), "B");
        assert_eq!(answers.get(pos(3)), "");
        assert_eq!(repo.get(keys::legacy::ANSWERS_BY_ID).await.unwrap(), None);
        assert!(repo.get(keys::PRESENTED_IDS).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unscoped_ordered_answers_keep_legacy_run_id() {
        let (repo, state) = setup();
        let legacy_id = RunId::generate();
        repo.set(keys::PRESENTED_IDS, r#"["Q1","Q2"]"#).await.unwrap();
        repo.set(keys::legacy::RUN_ID, &legacy_id.to_string()).await.unwrap();
        repo.set(keys::legacy::ANSWERS_UNSCOPED, r#"{"q1":"Yes","q2":"  "}"#)
            .await
            .unwrap();

        let outcome = migrate_legacy(&state, fixed_now()).await.unwrap();
        assert_eq!(outcome, MigrationOutcome::Upgraded { recovered_answers: 1 });

        let run = state.load_run().await.unwrap().unwrap();
        assert_eq!(run.id(), legacy_id);
        assert_eq!(state.load_answers(legacy_id).await.unwrap().get(pos(1)), "Yes");
        for key in keys::legacy::ALL {
            assert_eq!(repo.get(key).await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn legacy_keys_without_selection_are_dropped() {
        let (repo, state) = setup();
        repo.set(keys::legacy::ANSWERS_BY_ID, "{}").await.unwrap();

        let outcome = migrate_legacy(&state, fixed_now()).await.unwrap();
        assert_eq!(outcome, MigrationOutcome::Upgraded { recovered_answers: 0 });
        assert_eq!(
            repo.local_keys().unwrap(),
            vec![keys::SCHEMA_VERSION_KEY.to_string()]
        );
    }
}
