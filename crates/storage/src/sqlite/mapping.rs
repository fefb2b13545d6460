use quiz_core::model::{AnswersByPosition, QuestionId, ResultId, UserId};
use sqlx::Row;
use uuid::Uuid;

use crate::repository::{NewResultRecord, StorageError, StoredResult};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range")))
}

pub(crate) fn result_id_from_str(s: &str) -> Result<ResultId, StorageError> {
    Uuid::parse_str(s).map(ResultId::from_uuid).map_err(ser)
}

pub(crate) fn question_ids_to_json(ids: &[QuestionId]) -> Result<String, StorageError> {
    serde_json::to_string(ids).map_err(ser)
}

pub(crate) fn answers_to_json(answers: &AnswersByPosition) -> Result<String, StorageError> {
    serde_json::to_string(answers).map_err(ser)
}

pub(crate) fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<StoredResult, StorageError> {
    let id = result_id_from_str(&row.try_get::<String, _>("id").map_err(ser)?)?;
    let user_id = UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?).map_err(ser)?;
    let question_ids: Vec<QuestionId> =
        serde_json::from_str(&row.try_get::<String, _>("question_ids").map_err(ser)?)
            .map_err(ser)?;
    let answers: AnswersByPosition =
        serde_json::from_str(&row.try_get::<String, _>("answers_ordered").map_err(ser)?)
            .map_err(ser)?;
    let percentage = u8::try_from(row.try_get::<i64, _>("percentage").map_err(ser)?)
        .map_err(|_| StorageError::Serialization("percentage out of range".into()))?;

    Ok(StoredResult {
        id,
        record: NewResultRecord {
            user_id,
            user_email: row.try_get("user_email").map_err(ser)?,
            quiz_name: row.try_get("quiz_name").map_err(ser)?,
            question_ids,
            answers,
            score: i64_to_u32("score", row.try_get("score").map_err(ser)?)?,
            total: i64_to_u32("total", row.try_get("total").map_err(ser)?)?,
            percentage,
        },
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}
