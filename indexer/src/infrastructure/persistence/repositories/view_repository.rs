use std::sync::Arc;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbBackend, Statement};

use log::warn;

use crate::infrastructure::persistence::error::DbError;

/// Repository refreshing derived aggregate views after live price batches
#[derive(Clone)]
pub struct ViewRepository {
    conn: Arc<DatabaseConnection>,
    views: Vec<String>,
}

impl ViewRepository {
    /// Create a new ViewRepository over the configured view names
    pub fn new(conn: Arc<DatabaseConnection>, views: Vec<String>) -> Self {
        Self { conn, views }
    }

    /// Refresh every configured view. A failing view is logged and does not
    /// prevent the remaining views from refreshing.
    pub async fn refresh_views(&self) -> Result<(), DbError> {
        for view in &self.views {
            let sql = format!(
                "REFRESH MATERIALIZED VIEW CONCURRENTLY \"{}\"",
                view.replace('"', "")
            );

            if let Err(e) = self
                .conn
                .execute(Statement::from_string(DbBackend::Postgres, sql))
                .await
            {
                warn!("Failed to refresh view {}: {}", view, e);
            }
        }

        Ok(())
    }

    pub fn has_views(&self) -> bool {
        !self.views.is_empty()
    }
}
