use async_trait::async_trait;
use chrono::Utc;
use quiz_core::model::ResultId;

use super::{
    SqliteRepository,
    mapping::{answers_to_json, map_result_row, question_ids_to_json},
};
use crate::repository::{NewResultRecord, ResultRepository, StorageError, StoredResult};

#[async_trait]
impl ResultRepository for SqliteRepository {
    async fn insert_result(&self, record: &NewResultRecord) -> Result<ResultId, StorageError> {
        let id = ResultId::generate();
        sqlx::query(
            r"
            INSERT INTO quiz_results (
                id, user_id, user_email, quiz_name, question_ids, answers_ordered,
                score, total, percentage, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(id.to_string())
        .bind(record.user_id.as_str())
        .bind(record.user_email.as_deref())
        .bind(&record.quiz_name)
        .bind(question_ids_to_json(&record.question_ids)?)
        .bind(answers_to_json(&record.answers)?)
        .bind(i64::from(record.score))
        .bind(i64::from(record.total))
        .bind(i64::from(record.percentage))
        .bind(Utc::now())
        .execute(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(id)
    }

    async fn get_result(&self, id: ResultId) -> Result<StoredResult, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, user_email, quiz_name, question_ids, answers_ordered,
                   score, total, percentage, created_at
            FROM quiz_results
            WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_result_row(&row),
            None => Err(StorageError::NotFound),
        }
    }
}
