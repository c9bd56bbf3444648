use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};

use crate::domain::services::price_processor::AssetDecimalsSource;
use crate::infrastructure::persistence::error::DbError;
use crate::infrastructure::persistence::repositories::escape_literal;

/// Repository for asset rows
///
/// Assets are created lazily the first time a unit is seen; the upsert is
/// idempotent and returns the surrogate ids for the whole batch.
#[derive(Clone)]
pub struct AssetRepository {
    conn: Arc<DatabaseConnection>,
}

impl AssetRepository {
    /// Create a new AssetRepository
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    /// Ensure a row exists for every unit and return the unit to id mapping
    pub async fn upsert_assets(&self, units: &[String]) -> Result<HashMap<String, i64>, DbError> {
        let mut distinct: Vec<&String> = Vec::new();
        for unit in units {
            if !distinct.contains(&unit) {
                distinct.push(unit);
            }
        }

        if distinct.is_empty() {
            return Ok(HashMap::new());
        }

        let mut mapping = HashMap::with_capacity(distinct.len());

        for chunk in distinct.chunks(500) {
            let values: Vec<String> = chunk
                .iter()
                .map(|unit| format!("('{}')", escape_literal(unit)))
                .collect();

            let insert_sql = format!(
                "INSERT INTO asset (unit) VALUES {} ON CONFLICT (unit) DO NOTHING",
                values.join(", ")
            );

            self.conn
                .execute(Statement::from_string(DbBackend::Postgres, insert_sql))
                .await
                .map_err(|e| DbError::batch("asset", e))?;

            let in_list: Vec<String> = chunk
                .iter()
                .map(|unit| format!("'{}'", escape_literal(unit)))
                .collect();

            let select_sql = format!(
                "SELECT id, unit FROM asset WHERE unit IN ({})",
                in_list.join(", ")
            );

            let rows = self
                .conn
                .query_all(Statement::from_string(DbBackend::Postgres, select_sql))
                .await
                .map_err(|e| DbError::batch("asset", e))?;

            for row in rows {
                let id: i64 = row.try_get("", "id")?;
                let unit: String = row.try_get("", "unit")?;
                mapping.insert(unit, id);
            }
        }

        Ok(mapping)
    }

    /// Known decimals for the given units; units with no stored precision
    /// are absent from the result
    pub async fn get_decimals(&self, units: &[String]) -> Result<HashMap<String, u32>, DbError> {
        if units.is_empty() {
            return Ok(HashMap::new());
        }

        let mut decimals = HashMap::new();

        for chunk in units.chunks(500) {
            let in_list: Vec<String> = chunk
                .iter()
                .map(|unit| format!("'{}'", escape_literal(unit)))
                .collect();

            let sql = format!(
                "SELECT unit, decimals FROM asset WHERE decimals IS NOT NULL AND unit IN ({})",
                in_list.join(", ")
            );

            let rows = self
                .conn
                .query_all(Statement::from_string(DbBackend::Postgres, sql))
                .await
                .map_err(|e| DbError::batch("asset", e))?;

            for row in rows {
                let unit: String = row.try_get("", "unit")?;
                let value: Option<i16> = row.try_get("", "decimals")?;
                if let Some(value) = value {
                    decimals.insert(unit, value.max(0) as u32);
                }
            }
        }

        Ok(decimals)
    }
}

#[async_trait]
impl AssetDecimalsSource for AssetRepository {
    async fn decimals_for(&self, units: &[String]) -> Result<HashMap<String, u32>, DbError> {
        self.get_decimals(units).await
    }
}
