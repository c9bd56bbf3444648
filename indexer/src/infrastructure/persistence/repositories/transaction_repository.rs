use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};

use crate::infrastructure::persistence::error::DbError;
use crate::infrastructure::persistence::repositories::escape_literal;

/// Repository for transaction rows, deduplicated by hash
#[derive(Clone)]
pub struct TransactionRepository {
    conn: Arc<DatabaseConnection>,
}

impl TransactionRepository {
    /// Create a new TransactionRepository
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    /// Ensure a row exists for every hash and return the hash to id mapping
    pub async fn upsert_transactions(
        &self,
        hashes: &[String],
    ) -> Result<HashMap<String, i64>, DbError> {
        let mut distinct: Vec<&String> = Vec::new();
        for hash in hashes {
            if !distinct.contains(&hash) {
                distinct.push(hash);
            }
        }

        if distinct.is_empty() {
            return Ok(HashMap::new());
        }

        let mut mapping = HashMap::with_capacity(distinct.len());

        for chunk in distinct.chunks(500) {
            let values: Vec<String> = chunk
                .iter()
                .map(|hash| format!("('{}')", escape_literal(hash)))
                .collect();

            let insert_sql = format!(
                "INSERT INTO tx (hash) VALUES {} ON CONFLICT (hash) DO NOTHING",
                values.join(", ")
            );

            self.conn
                .execute(Statement::from_string(DbBackend::Postgres, insert_sql))
                .await
                .map_err(|e| DbError::batch("tx", e))?;

            let in_list: Vec<String> = chunk
                .iter()
                .map(|hash| format!("'{}'", escape_literal(hash)))
                .collect();

            let select_sql = format!(
                "SELECT id, hash FROM tx WHERE hash IN ({})",
                in_list.join(", ")
            );

            let rows = self
                .conn
                .query_all(Statement::from_string(DbBackend::Postgres, select_sql))
                .await
                .map_err(|e| DbError::batch("tx", e))?;

            for row in rows {
                let id: i64 = row.try_get("", "id")?;
                let hash: String = row.try_get("", "hash")?;
                mapping.insert(hash, id);
            }
        }

        Ok(mapping)
    }
}
