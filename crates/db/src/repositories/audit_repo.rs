//! Repository for the append-only `audit_logs` table.

use sqlx::PgExecutor;

use crate::models::audit::AuditLogRow;
use crate::store::AuditQuery;

// ---------------------------------------------------------------------------
// Column lists
// ---------------------------------------------------------------------------

/// Column list for `audit_logs` SELECT queries.
const COLUMNS: &str = "\
    id, user_id, user_email, action, resource_type, resource_id, \
    details, timestamp, ip_address";

// ---------------------------------------------------------------------------
// AuditLogRepo
// ---------------------------------------------------------------------------

/// Provides insert and query operations for audit logs. There is no update
/// or delete.
pub struct AuditLogRepo;

impl AuditLogRepo {
    /// Append one record; `timestamp` is the server clock.
    pub async fn insert(
        executor: impl PgExecutor<'_>,
        row: &AuditLogRow,
    ) -> Result<AuditLogRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_logs ({COLUMNS})
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditLogRow>(&query)
            .bind(&row.id)
            .bind(&row.user_id)
            .bind(&row.user_email)
            .bind(&row.action)
            .bind(&row.resource_type)
            .bind(&row.resource_id)
            .bind(&row.details)
            .bind(&row.ip_address)
            .fetch_one(executor)
            .await
    }

    /// Query records, oldest first.
    pub async fn list(
        executor: impl PgExecutor<'_>,
        filter: &AuditQuery,
    ) -> Result<Vec<AuditLogRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_logs
             WHERE ($1::text IS NULL OR resource_id = $1)
               AND ($2::timestamptz IS NULL OR timestamp >= $2)
             ORDER BY timestamp ASC, id ASC
             LIMIT $3"
        );
        sqlx::query_as::<_, AuditLogRow>(&query)
            .bind(filter.resource_id.as_deref())
            .bind(filter.since)
            .bind(filter.limit)
            .fetch_all(executor)
            .await
    }
}
