//! Key names of the local-state schema.

use quiz_core::model::RunId;

/// Version stamped after the schema has been brought up to date.
pub const SCHEMA_VERSION: u32 = 2;

pub const SCHEMA_VERSION_KEY: &str = "schema_version";
pub const SELECTED_IDS: &str = "selected_ids";
pub const PRESENTED_IDS: &str = "presented_ids";
pub const RUN_ID: &str = "run_id";
pub const RUN_FINGERPRINT: &str = "run_fingerprint";
pub const RUN_STARTED_AT: &str = "run_started_at";

const ANSWERS_PREFIX: &str = "answers_ordered::";
const FINALIZED_PREFIX: &str = "finalized::";
const DELIVERED_PREFIX: &str = "delivered::";

/// Ledger key for one run.
#[must_use]
pub fn answers(run_id: RunId) -> String {
    format!("{ANSWERS_PREFIX}{run_id}")
}

/// Frozen-result key for one run.
#[must_use]
pub fn finalized(run_id: RunId) -> String {
    format!("{FINALIZED_PREFIX}{run_id}")
}

/// Id of the stored result of one run, written once the save succeeds.
#[must_use]
pub fn delivered(run_id: RunId) -> String {
    format!("{DELIVERED_PREFIX}{run_id}")
}

/// Every key belonging to the attempt of `run_id`, including the shared
/// selection and run keys.
#[must_use]
pub fn attempt(run_id: Option<RunId>) -> Vec<String> {
    let mut keys = vec![
        SELECTED_IDS.to_owned(),
        PRESENTED_IDS.to_owned(),
        RUN_ID.to_owned(),
        RUN_FINGERPRINT.to_owned(),
        RUN_STARTED_AT.to_owned(),
    ];
    if let Some(run_id) = run_id {
        keys.push(answers(run_id));
        keys.push(finalized(run_id));
        keys.push(delivered(run_id));
    }
    keys
}

/// Key names used before the schema was versioned.
pub(crate) mod legacy {
    /// Answers keyed by question id.
    pub const ANSWERS_BY_ID: &str = "answers";
    /// Position-keyed answers not scoped to any run.
    pub const ANSWERS_UNSCOPED: &str = "answers_ordered";
    pub const RUN_ID: &str = "quiz_run_id";
    pub const RUN_FINGERPRINT: &str = "quiz_run_fingerprint";

    pub const ALL: [&str; 4] = [ANSWERS_BY_ID, ANSWERS_UNSCOPED, RUN_ID, RUN_FINGERPRINT];
}
