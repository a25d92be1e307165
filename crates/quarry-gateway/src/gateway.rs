//! The metadata catalog and guarded query execution.
//!
//! The catalog is an in-memory SQLite table, `documents_all`, kept in sync
//! with the store through [`Gateway::sync_document`] and
//! [`Gateway::remove_document`]. Caller SQL cannot touch it directly: each
//! query runs against a per-call `TEMP VIEW documents` filtered to the
//! calling user, with `PRAGMA query_only` set and an authorizer installed
//! that denies reads of the backing table except through that view.
//!
//! SQLite work is blocking, so every catalog operation hops to
//! `tokio::task::spawn_blocking`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::debug;
use quarry_core::{Error, Result};
use rusqlite::Connection;
use rusqlite::hooks::{AuthAction, AuthContext, Authorization};
use rusqlite::types::ValueRef;
use serde_json::{Map, Value as Json};
use tokio::task;
use uuid::Uuid;

use crate::record::DocumentRecord;
use crate::validate::validate;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents_all (
    id            TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL,
    filename      TEXT NOT NULL,
    file_type     TEXT NOT NULL,
    file_size     INTEGER NOT NULL,
    status        TEXT NOT NULL,
    chunk_count   INTEGER NOT NULL,
    title         TEXT,
    summary       TEXT,
    topics        TEXT,
    document_date TEXT,
    content_hash  TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_all_user ON documents_all(user_id);
";

/// The guarded structured-query gateway.
///
/// Cheap to clone; clones share one catalog connection.
#[derive(Clone)]
pub struct Gateway {
    conn: Arc<Mutex<Connection>>,
}

impl Gateway {
    /// Open an in-memory catalog.
    pub fn open() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::sql(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::sql(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert or update a document's catalog row.
    pub async fn sync_document(&self, record: DocumentRecord) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        run_blocking(move || {
            let topics = serde_json::to_string(&record.topics)
                .map_err(|e| Error::invalid_data(e.to_string()))?;
            let conn = lock(&conn);
            conn.execute(
                "INSERT OR REPLACE INTO documents_all
                 (id, user_id, filename, file_type, file_size, status, chunk_count,
                  title, summary, topics, document_date, content_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                rusqlite::params![
                    record.id.to_string(),
                    record.user_id.to_string(),
                    record.filename,
                    record.file_type,
                    record.file_size,
                    record.status.as_str(),
                    record.chunk_count,
                    record.title,
                    record.summary,
                    topics,
                    record.document_date.map(|d| d.to_string()),
                    record.content_hash,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .map_err(|e| Error::sql(e.to_string()))?;
            debug!("Synced catalog row for document {}", record.id);
            Ok(())
        })
        .await
    }

    /// Remove a document's catalog row. Removing an absent row is a no-op.
    pub async fn remove_document(&self, id: Uuid) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        run_blocking(move || {
            let conn = lock(&conn);
            conn.execute(
                "DELETE FROM documents_all WHERE id = ?1",
                rusqlite::params![id.to_string()],
            )
            .map_err(|e| Error::sql(e.to_string()))?;
            debug!("Removed catalog row for document {id}");
            Ok(())
        })
        .await
    }

    /// Validate and execute a read-only query scoped to `user_id`.
    ///
    /// Returns one JSON object per row, keyed by column name. Blob columns
    /// are base64-encoded. Validation failures and SQL errors are returned
    /// as errors, never as an empty result set.
    pub async fn guarded_query(&self, sql: &str, user_id: Uuid) -> Result<Vec<Json>> {
        let statement = validate(sql)?.to_string();
        debug!("Executing guarded query for user {user_id}");

        let conn = Arc::clone(&self.conn);
        run_blocking(move || {
            let conn = lock(&conn);
            scope_to_user(&conn, user_id)?;
            conn.authorizer(Some(deny_backing_table));
            let result = run_select(&conn, &statement);
            // Restore the connection for subsequent sync calls even when
            // the query failed.
            conn.authorizer(None::<fn(AuthContext<'_>) -> Authorization>);
            let _ = conn.execute_batch(
                "PRAGMA query_only = OFF;
                 DROP VIEW IF EXISTS temp.documents;",
            );
            result
        })
        .await
    }
}

/// Authorizer active while caller SQL runs: `documents_all` is readable only
/// through the `documents` view expansion, so a statement naming the backing
/// table directly fails to prepare.
fn deny_backing_table(ctx: AuthContext<'_>) -> Authorization {
    match ctx.action {
        AuthAction::Read { table_name, .. } if table_name == "documents_all" => {
            if ctx.accessor == Some("documents") {
                Authorization::Allow
            } else {
                Authorization::Deny
            }
        }
        _ => Authorization::Allow,
    }
}

/// Create the per-call scoped view and flip the connection read-only.
///
/// The view is the row-level security analog: the filter lives here, in the
/// storage layer, so the caller's SQL is executed as written.
fn scope_to_user(conn: &MutexGuard<'_, Connection>, user_id: Uuid) -> Result<()> {
    // Uuid's Display is hyphenated hex; safe to splice into DDL, which
    // cannot take bound parameters.
    let setup = format!(
        "DROP VIEW IF EXISTS temp.documents;
         CREATE TEMP VIEW documents AS
             SELECT id, filename, file_type, file_size, status, chunk_count,
                    title, summary, topics, document_date, content_hash,
                    created_at, updated_at
             FROM documents_all WHERE user_id = '{user_id}';
         PRAGMA query_only = ON;"
    );
    conn.execute_batch(&setup)
        .map_err(|e| Error::sql(e.to_string()))
}

fn run_select(conn: &Connection, sql: &str) -> Result<Vec<Json>> {
    let mut stmt = conn.prepare(sql).map_err(|e| Error::sql(e.to_string()))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = stmt.query([]).map_err(|e| Error::sql(e.to_string()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| Error::sql(e.to_string()))? {
        let mut object = Map::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            let value = row.get_ref(i).map_err(|e| Error::sql(e.to_string()))?;
            object.insert(name.clone(), json_value(value));
        }
        out.push(Json::Object(object));
    }
    Ok(out)
}

fn json_value(value: ValueRef<'_>) -> Json {
    match value {
        ValueRef::Null => Json::Null,
        ValueRef::Integer(i) => Json::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Json::Number)
            .unwrap_or(Json::Null),
        ValueRef::Text(t) => Json::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Json::String(BASE64.encode(b)),
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    task::spawn_blocking(f)
        .await
        .map_err(|e| Error::unavailable(format!("catalog worker failed: {e}")))?
}

fn lock(conn: &Arc<Mutex<Connection>>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::{Document, DocumentStatus};

    fn record(user: Uuid, filename: &str) -> DocumentRecord {
        let doc = Document::new(user)
            .with_title(filename)
            .with_status(DocumentStatus::Ready);
        DocumentRecord::from_document(&doc)
            .with_file(filename, "pdf")
            .with_file_size(2048)
            .with_chunk_count(3)
    }

    #[tokio::test]
    async fn test_query_is_scoped_to_user() {
        let gateway = Gateway::open().unwrap();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        gateway.sync_document(record(alice, "alice.pdf")).await.unwrap();
        gateway.sync_document(record(bob, "bob.pdf")).await.unwrap();

        let rows = gateway
            .guarded_query("SELECT filename FROM documents", alice)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["filename"], "alice.pdf");
    }

    #[tokio::test]
    async fn test_backing_table_unreachable_from_caller_sql() {
        let gateway = Gateway::open().unwrap();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        gateway.sync_document(record(alice, "alice.pdf")).await.unwrap();
        gateway.sync_document(record(bob, "bob-private.pdf")).await.unwrap();

        // Naming the backing table directly fails at prepare time.
        let err = gateway
            .guarded_query("SELECT filename, user_id FROM documents_all", alice)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Sql(_)));

        // Same through a subquery.
        let err = gateway
            .guarded_query(
                "SELECT filename FROM documents
                 WHERE filename IN (SELECT filename FROM documents_all)",
                alice,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Sql(_)));

        // The scoped view still answers with only the caller's rows.
        let rows = gateway
            .guarded_query("SELECT filename FROM documents", alice)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["filename"], "alice.pdf");
    }

    #[tokio::test]
    async fn test_aggregate_query() {
        let gateway = Gateway::open().unwrap();
        let user = Uuid::new_v4();
        gateway.sync_document(record(user, "a.pdf")).await.unwrap();
        gateway.sync_document(record(user, "b.pdf")).await.unwrap();

        let rows = gateway
            .guarded_query("SELECT COUNT(*) AS n, SUM(file_size) AS bytes FROM documents", user)
            .await
            .unwrap();
        assert_eq!(rows[0]["n"], 2);
        assert_eq!(rows[0]["bytes"], 4096);
    }

    #[tokio::test]
    async fn test_sync_is_an_upsert() {
        let gateway = Gateway::open().unwrap();
        let user = Uuid::new_v4();
        let mut rec = record(user, "a.pdf");
        gateway.sync_document(rec.clone()).await.unwrap();
        rec.status = DocumentStatus::Error;
        gateway.sync_document(rec).await.unwrap();

        let rows = gateway
            .guarded_query("SELECT status FROM documents", user)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["status"], "error");
    }

    #[tokio::test]
    async fn test_remove_document() {
        let gateway = Gateway::open().unwrap();
        let user = Uuid::new_v4();
        let rec = record(user, "a.pdf");
        let id = rec.id;
        gateway.sync_document(rec).await.unwrap();
        gateway.remove_document(id).await.unwrap();

        let rows = gateway
            .guarded_query("SELECT id FROM documents", user)
            .await
            .unwrap();
        assert!(rows.is_empty());

        // Absent row is a no-op, not an error.
        gateway.remove_document(id).await.unwrap();
    }

    #[tokio::test]
    async fn test_mutation_rejected_before_execution() {
        let gateway = Gateway::open().unwrap();
        let user = Uuid::new_v4();
        gateway.sync_document(record(user, "a.pdf")).await.unwrap();

        let err = gateway
            .guarded_query("DROP TABLE documents_all", user)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MutationRejected(ref k) if k == "DROP"));

        let err = gateway
            .guarded_query("SELECT 1 WHERE EXISTS (SELECT 1); DELETE FROM documents", user)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MutationRejected(ref k) if k == "DELETE"));

        // The catalog row survived both attempts.
        let rows = gateway
            .guarded_query("SELECT id FROM documents", user)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_sql_error_surfaces_not_empty() {
        let gateway = Gateway::open().unwrap();
        let err = gateway
            .guarded_query("SELECT no_such_column FROM documents", Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Sql(_)));
    }

    #[tokio::test]
    async fn test_select_one_and_lowercase_accepted() {
        let gateway = Gateway::open().unwrap();
        let user = Uuid::new_v4();

        let rows = gateway.guarded_query("SELECT 1 AS one", user).await.unwrap();
        assert_eq!(rows[0]["one"], 1);

        // Whitespace- and case-insensitive validation
        let rows = gateway
            .guarded_query("  select * from documents", user)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_connection_writable_after_query() {
        let gateway = Gateway::open().unwrap();
        let user = Uuid::new_v4();
        gateway
            .guarded_query("SELECT 1 AS one", user)
            .await
            .unwrap();
        // query_only was reset, so sync still works.
        gateway.sync_document(record(user, "a.pdf")).await.unwrap();
    }

    #[tokio::test]
    async fn test_json_row_shapes() {
        let gateway = Gateway::open().unwrap();
        let user = Uuid::new_v4();
        gateway.sync_document(record(user, "a.pdf")).await.unwrap();

        let rows = gateway
            .guarded_query(
                "SELECT filename, file_size, summary, topics FROM documents",
                user,
            )
            .await
            .unwrap();
        let row = &rows[0];
        assert!(row["filename"].is_string());
        assert!(row["file_size"].is_i64());
        assert!(row["summary"].is_null());
        assert!(row["topics"].is_string());
    }
}
