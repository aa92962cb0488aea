//! Repository for the `data_entries` table.

use sqlx::PgExecutor;

use crate::models::entry::DataEntryRow;
use crate::store::EntryQuery;

/// Column list for `data_entries` queries.
const COLUMNS: &str = "\
    id, island_id, data_type, source, payload, status, approval_level, \
    change_requests, reviewed_at, reviewed_by, created_at, updated_at, \
    is_active, submitted_at, submitted_by, warnings";

/// Bind every column of a [`DataEntryRow`] in [`COLUMNS`] order. Works for
/// both `query` and `query_as`, which share no bind trait.
macro_rules! bind_row {
    ($query:expr, $row:expr) => {
        $query
            .bind(&$row.id)
            .bind(&$row.island_id)
            .bind(&$row.data_type)
            .bind(&$row.source)
            .bind(&$row.payload)
            .bind(&$row.status)
            .bind(&$row.approval_level)
            .bind(&$row.change_requests)
            .bind($row.reviewed_at)
            .bind(&$row.reviewed_by)
            .bind($row.created_at)
            .bind($row.updated_at)
            .bind($row.is_active)
            .bind($row.submitted_at)
            .bind(&$row.submitted_by)
            .bind(&$row.warnings)
    };
}

/// Provides read and write operations for data entries.
pub struct DataEntryRepo;

impl DataEntryRepo {
    /// Find an entry by its id.
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: &str,
    ) -> Result<Option<DataEntryRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM data_entries WHERE id = $1");
        sqlx::query_as::<_, DataEntryRow>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// List entries matching `filter`, oldest first.
    pub async fn list(
        executor: impl PgExecutor<'_>,
        filter: &EntryQuery,
    ) -> Result<Vec<DataEntryRow>, sqlx::Error> {
        let statuses: Vec<String> = filter
            .statuses
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        let query = format!(
            "SELECT {COLUMNS} FROM data_entries
             WHERE (cardinality($1::text[]) = 0 OR status = ANY($1))
               AND ($2::text IS NULL OR data_type = $2)
               AND ($3::text IS NULL OR lower(island_id) = lower($3))
               AND (NOT $4 OR is_active)
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, DataEntryRow>(&query)
            .bind(statuses)
            .bind(filter.data_type.map(|t| t.as_str()))
            .bind(filter.island_id.as_deref())
            .bind(filter.active_only)
            .fetch_all(executor)
            .await
    }

    /// Current status of an entry, if it exists.
    pub async fn find_status(
        executor: impl PgExecutor<'_>,
        id: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("SELECT status FROM data_entries WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Insert a row unless its id exists. Returns whether a row was written.
    pub async fn insert_if_absent(
        executor: impl PgExecutor<'_>,
        row: &DataEntryRow,
    ) -> Result<bool, sqlx::Error> {
        let query = format!(
            "INSERT INTO data_entries ({COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             ON CONFLICT (id) DO NOTHING"
        );
        let result = bind_row!(sqlx::query(&query), row).execute(executor).await?;
        Ok(result.rows_affected() == 1)
    }

    /// Create or overwrite a row. Overwrites take the server clock for
    /// `updated_at`.
    pub async fn upsert(
        executor: impl PgExecutor<'_>,
        row: &DataEntryRow,
    ) -> Result<DataEntryRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO data_entries ({COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
             ON CONFLICT (id) DO UPDATE SET
                island_id = EXCLUDED.island_id,
                data_type = EXCLUDED.data_type,
                source = EXCLUDED.source,
                payload = EXCLUDED.payload,
                status = EXCLUDED.status,
                approval_level = EXCLUDED.approval_level,
                change_requests = EXCLUDED.change_requests,
                reviewed_at = EXCLUDED.reviewed_at,
                reviewed_by = EXCLUDED.reviewed_by,
                updated_at = NOW(),
                is_active = EXCLUDED.is_active,
                submitted_at = EXCLUDED.submitted_at,
                submitted_by = EXCLUDED.submitted_by,
                warnings = EXCLUDED.warnings
             RETURNING {COLUMNS}"
        );
        bind_row!(sqlx::query_as::<_, DataEntryRow>(&query), row)
            .fetch_one(executor)
            .await
    }

    /// Write the approval fields of a transitioned entry if its stored
    /// status is still `expected_status`. Returns `None` when no row matched.
    ///
    /// `updated_at`, and `reviewed_at` / `submitted_at` when the new state
    /// carries them, take the server clock.
    pub async fn update_approval(
        executor: impl PgExecutor<'_>,
        row: &DataEntryRow,
        expected_status: &str,
        stamp_submitted: bool,
    ) -> Result<Option<DataEntryRow>, sqlx::Error> {
        let query = format!(
            "UPDATE data_entries SET
                status = $2,
                change_requests = $3,
                reviewed_at = CASE WHEN $4 THEN NOW() ELSE NULL END,
                reviewed_by = $5,
                submitted_at = CASE WHEN $6 THEN NOW() ELSE submitted_at END,
                submitted_by = COALESCE($7, submitted_by),
                updated_at = NOW()
             WHERE id = $1 AND status = $8
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DataEntryRow>(&query)
            .bind(&row.id)
            .bind(&row.status)
            .bind(&row.change_requests)
            .bind(row.reviewed_at.is_some())
            .bind(&row.reviewed_by)
            .bind(stamp_submitted)
            .bind(&row.submitted_by)
            .bind(expected_status)
            .fetch_optional(executor)
            .await
    }
}
