use std::sync::Arc;

use practice_core::bulk_import::{self, BulkImportLine, BulkRow};
use practice_core::model::TopicId;
use storage::records::BulkExercisePayload;
use storage::repository::ContentStore;

use crate::error::AuthoringError;

/// Outcome of a bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkImportReport {
    /// Exercises the backend reports as created.
    pub created: usize,
    /// Input lines or rows dropped by validation.
    pub rejected: usize,
}

/// Bulk authoring of multiple-choice exercises for a topic.
#[derive(Clone)]
pub struct AuthoringService {
    content: Arc<dyn ContentStore>,
}

impl AuthoringService {
    #[must_use]
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        Self { content }
    }

    /// Review lines for pasted text, without creating anything.
    #[must_use]
    pub fn preview(raw: &str, title_hint: Option<&str>) -> Vec<String> {
        bulk_import::preview(&bulk_import::parse(raw, title_hint))
    }

    /// Append a builder row to the pasted text as a six-segment line.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::InvalidRow` if the row would be rejected on import.
    pub fn append_row(raw: &str, row: &BulkRow) -> Result<String, AuthoringError> {
        let line = row.validate().ok_or(AuthoringError::InvalidRow)?;
        let trimmed = raw.trim_end();
        if trimmed.is_empty() {
            return Ok(line.to_raw_line());
        }
        Ok(format!("{trimmed}\n{}", line.to_raw_line()))
    }

    /// Parse pasted text and create the valid lines at `level`.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::NoValidLines` when nothing survives validation,
    /// or `AuthoringError::Storage` if the content store rejects the batch.
    pub async fn import_text(
        &self,
        topic_id: TopicId,
        level: u32,
        raw: &str,
        title_hint: Option<&str>,
    ) -> Result<BulkImportReport, AuthoringError> {
        let lines = bulk_import::parse(raw, title_hint);
        let rejected = bulk_import::count_candidate_lines(raw).saturating_sub(lines.len());
        self.create(topic_id, level, &lines, rejected).await
    }

    /// Validate builder rows and create the valid ones at `level`.
    ///
    /// # Errors
    ///
    /// Same as [`AuthoringService::import_text`].
    pub async fn import_rows(
        &self,
        topic_id: TopicId,
        level: u32,
        rows: &[BulkRow],
    ) -> Result<BulkImportReport, AuthoringError> {
        let lines = bulk_import::collect_rows(rows);
        let rejected = rows.len() - lines.len();
        self.create(topic_id, level, &lines, rejected).await
    }

    async fn create(
        &self,
        topic_id: TopicId,
        level: u32,
        lines: &[BulkImportLine],
        rejected: usize,
    ) -> Result<BulkImportReport, AuthoringError> {
        if lines.is_empty() {
            return Err(AuthoringError::NoValidLines);
        }

        let level = level.max(1);
        let payload: Vec<BulkExercisePayload> = lines
            .iter()
            .map(|line| BulkExercisePayload::from_line(line, level))
            .collect();
        let receipt = self.content.bulk_create(topic_id, &payload).await?;
        let created = receipt.count.unwrap_or(payload.len());

        tracing::info!(%topic_id, level, created, rejected, "bulk exercises created");
        Ok(BulkImportReport { created, rejected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_numbers_accepted_lines() {
        let raw = "Capital de Francia | Madrid | París | Roma | Berlín | B\n\
                   solo | dos\n\
                   1 | 2 | 3 | 4 | a";
        assert_eq!(
            AuthoringService::preview(raw, Some("Sumas")),
            vec![
                "1. Capital de Francia | Correcta: B".to_string(),
                "2. Sumas 1 | Correcta: A".to_string(),
            ]
        );
    }

    #[test]
    fn append_row_rejects_invalid_rows() {
        let row = BulkRow {
            question: "2 + 2".into(),
            a: "3".into(),
            b: "4".into(),
            c: "5".into(),
            d: "6".into(),
            correct: "b".into(),
        };
        assert_eq!(
            AuthoringService::append_row("", &row).unwrap(),
            "2 + 2 | 3 | 4 | 5 | 6 | B"
        );
        assert_eq!(
            AuthoringService::append_row("x | a | b | c | d | A\n\n", &row).unwrap(),
            "x | a | b | c | d | A\n2 + 2 | 3 | 4 | 5 | 6 | B"
        );

        let broken = BulkRow {
            correct: "E".into(),
            ..row
        };
        assert!(matches!(
            AuthoringService::append_row("", &broken),
            Err(AuthoringError::InvalidRow)
        ));
    }
}
