use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use super::Document;
use crate::error::Result;

/// Postgres backend: one `documents` table, JSONB bodies.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn get<D: Document>(&self, id: Uuid) -> Result<Option<D>> {
        let body = sqlx::query_scalar::<_, Value>("SELECT body FROM documents WHERE collection = $1 AND id = $2")
            .bind(D::COLLECTION)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(body.map(serde_json::from_value).transpose()?)
    }

    pub async fn put<D: Document>(&self, doc: &D) -> Result<()> {
        let body = serde_json::to_value(doc)?;
        sqlx::query(
            "INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3) \
             ON CONFLICT (collection, id) DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()",
        )
        .bind(D::COLLECTION)
        .bind(doc.document_id())
        .bind(body)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete<D: Document>(&self, id: Uuid) -> Result<bool> {
        let res = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(D::COLLECTION)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn all<D: Document>(&self) -> Result<Vec<D>> {
        let bodies = sqlx::query_scalar::<_, Value>(
            "SELECT body FROM documents WHERE collection = $1 ORDER BY created_at, id",
        )
        .bind(D::COLLECTION)
        .fetch_all(&self.pool)
        .await?;
        decode_all(bodies)
    }

    pub async fn find_by<D: Document>(&self, field: &str, value: &str) -> Result<Vec<D>> {
        let bodies = sqlx::query_scalar::<_, Value>(
            "SELECT body FROM documents WHERE collection = $1 AND body ->> $2 = $3 ORDER BY created_at, id",
        )
        .bind(D::COLLECTION)
        .bind(field)
        .bind(value)
        .fetch_all(&self.pool)
        .await?;
        decode_all(bodies)
    }
}

fn decode_all<D: Document>(bodies: Vec<Value>) -> Result<Vec<D>> {
    bodies.into_iter().map(|b| serde_json::from_value(b).map_err(Into::into)).collect()
}
