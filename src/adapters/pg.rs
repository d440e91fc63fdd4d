//! Postgres-backed document store.
//!
//! Documents live in a single `documents` table keyed by `(collection, id)`
//! with a JSONB body, mirroring the shape of the hosted document database
//! the storefront was originally built against.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::ports::{Document, DocumentStore};
use crate::{Result, StorefrontError};

#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, collection: &str, data: Value) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        sqlx::query(
            "INSERT INTO documents (collection, id, data, created_at) VALUES ($1, $2, $3, NOW())",
        )
        .bind(collection)
        .bind(&id)
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(|e| StorefrontError::StoreWrite(e.to_string()))?;
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let row: Option<(Value,)> =
            sqlx::query_as("SELECT data FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorefrontError::StoreRead(e.to_string()))?;
        Ok(row.map(|(data,)| Document { id: id.to_string(), data }))
    }

    async fn query(&self, collection: &str) -> Result<Vec<Document>> {
        let rows: Vec<(String, Value)> = sqlx::query_as(
            "SELECT id, data FROM documents WHERE collection = $1 ORDER BY created_at",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorefrontError::StoreRead(e.to_string()))?;
        Ok(rows.into_iter().map(|(id, data)| Document { id, data }).collect())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<()> {
        sqlx::query(
            "INSERT INTO documents (collection, id, data, created_at) VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (collection, id) DO UPDATE SET data = documents.data || EXCLUDED.data",
        )
        .bind(collection)
        .bind(id)
        .bind(&patch)
        .execute(&self.pool)
        .await
        .map_err(|e| StorefrontError::StoreWrite(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorefrontError::StoreWrite(e.to_string()))?;
        Ok(())
    }
}
