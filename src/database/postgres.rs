use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool, Row};
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use super::store::{DatabaseError, DeleteResult, Document, DocumentStore, Filter, UpdateResult, ID_FIELD};
use crate::config::DatabaseConfig;

/// Document store on a single Postgres JSONB table.
///
/// Filters are matched with JSONB containment (`body @> filter`), which gives the same
/// exact-equality semantics as the in-memory store for scalar fields.
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Connect, then create the documents table and its indexes if missing.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| DatabaseError::ConnectionError("DATABASE_URL is not set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        info!("Created database pool (max {} connections)", config.max_connections);

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        let statements = [
            r#"CREATE TABLE IF NOT EXISTS documents (
                id UUID PRIMARY KEY,
                collection TEXT NOT NULL,
                body JSONB NOT NULL
            )"#,
            "CREATE INDEX IF NOT EXISTS documents_collection_idx ON documents (collection)",
            "CREATE INDEX IF NOT EXISTS documents_body_idx ON documents USING GIN (body jsonb_path_ops)",
            "CREATE UNIQUE INDEX IF NOT EXISTS documents_users_username_key ON documents ((body->>'username')) WHERE collection = 'users'",
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn body_from_row(row: &sqlx::postgres::PgRow) -> Result<Document, DatabaseError> {
        let Json(body): Json<Document> = row.try_get("body")?;
        Ok(body)
    }
}

/// Map unique violations to `Duplicate`, everything else passes through.
fn map_write_error(err: sqlx::Error) -> DatabaseError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unique").to_string();
            let field = if constraint.contains("username") {
                "username".to_string()
            } else {
                constraint
            };
            return DatabaseError::Duplicate(field);
        }
    }
    DatabaseError::Sqlx(err)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, DatabaseError> {
        let row = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND body @> $2 LIMIT 1")
            .bind(collection)
            .bind(Json(filter))
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::body_from_row).transpose()
    }

    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, DatabaseError> {
        let rows = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND body @> $2")
            .bind(collection)
            .bind(Json(filter))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::body_from_row).collect()
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<Uuid, DatabaseError> {
        let id = Uuid::new_v4();
        document.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

        sqlx::query("INSERT INTO documents (id, collection, body) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(collection)
            .bind(Json(&document))
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

        Ok(id)
    }

    async fn update_one(&self, collection: &str, filter: &Filter, changes: Document) -> Result<UpdateResult, DatabaseError> {
        if changes.contains_key(ID_FIELD) {
            return Err(DatabaseError::InvalidDocument(format!("'{}' cannot be updated", ID_FIELD)));
        }

        let result = sqlx::query(
            "UPDATE documents SET body = body || $3
             WHERE id = (SELECT id FROM documents WHERE collection = $1 AND body @> $2 LIMIT 1)",
        )
        .bind(collection)
        .bind(Json(filter))
        .bind(Json(&changes))
        .execute(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(UpdateResult { matched_count: result.rows_affected() })
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<DeleteResult, DatabaseError> {
        let result = sqlx::query(
            "DELETE FROM documents
             WHERE id = (SELECT id FROM documents WHERE collection = $1 AND body @> $2 LIMIT 1)",
        )
        .bind(collection)
        .bind(Json(filter))
        .execute(&self.pool)
        .await?;

        Ok(DeleteResult { deleted_count: result.rows_affected() })
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("Closed database pool");
    }
}
