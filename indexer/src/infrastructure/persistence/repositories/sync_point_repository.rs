use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, Statement};

use crate::domain::models::ChainPoint;
use crate::infrastructure::persistence::entities::sync_point;
use crate::infrastructure::persistence::error::DbError;
use crate::infrastructure::persistence::repositories::escape_literal;

/// The single-row key of the sync point table
const SYNC_POINT_ID: i16 = 1;

/// Repository tracking the last fully processed block
#[derive(Clone)]
pub struct SyncPointRepository {
    conn: Arc<DatabaseConnection>,
}

/// The persisted sync position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSyncPoint {
    pub slot: u64,
    pub hash: String,
    /// Chain time of the block in seconds
    pub time: i64,
}

impl PersistedSyncPoint {
    pub fn point(&self) -> ChainPoint {
        ChainPoint::new(self.slot, self.hash.clone())
    }
}

impl SyncPointRepository {
    /// Create a new SyncPointRepository
    pub fn new(conn: Arc<DatabaseConnection>) -> Self {
        Self { conn }
    }

    /// Record the last fully processed block
    pub async fn save(&self, point: &ChainPoint, time: i64) -> Result<(), DbError> {
        let sql = format!(
            "INSERT INTO sync_point (id, slot, hash, time, updated_at) \
             VALUES ({}, {}, '{}', {}, NOW()) \
             ON CONFLICT (id) DO UPDATE SET \
                slot = EXCLUDED.slot, \
                hash = EXCLUDED.hash, \
                time = EXCLUDED.time, \
                updated_at = EXCLUDED.updated_at",
            SYNC_POINT_ID,
            point.slot,
            escape_literal(&point.hash),
            time,
        );

        self.conn
            .execute(Statement::from_string(DbBackend::Postgres, sql))
            .await
            .map_err(|e| DbError::batch("sync_point", e))?;

        Ok(())
    }

    /// The last persisted sync position, if any
    pub async fn get(&self) -> Result<Option<PersistedSyncPoint>, DbError> {
        let result = sync_point::Entity::find_by_id(SYNC_POINT_ID)
            .one(self.conn.as_ref())
            .await?;

        Ok(result.map(|row| PersistedSyncPoint {
            slot: row.slot.max(0) as u64,
            hash: row.hash,
            time: row.time,
        }))
    }
}
