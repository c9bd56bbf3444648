use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use log::{error, info};

use crate::config::AppConfig;
use crate::infrastructure::persistence::error::DbError;

/// Manages database connection pool
pub struct DbPool {
    connection: Arc<DatabaseConnection>,
}

impl DbPool {
    /// Creates a new database connection pool
    pub async fn new(config: &AppConfig) -> Result<Self, DbError> {
        info!("Connecting to database: {}", config.database.url);

        let mut options = ConnectOptions::new(config.database.url.clone());
        options.max_connections(config.database.max_connections);

        match Database::connect(options).await {
            Ok(connection) => {
                info!("Database connection established successfully");
                Ok(DbPool {
                    connection: Arc::new(connection),
                })
            }
            Err(e) => {
                error!("Failed to connect to database: {}", e);
                Err(DbError::Connection(format!(
                    "Failed to connect to database: {}",
                    e
                )))
            }
        }
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> Result<(), DbError> {
        Migrator::up(&*self.connection, None)
            .await
            .map_err(|e| DbError::Migration(e.to_string()))
    }

    /// Returns the database connection
    pub fn get_connection(&self) -> Arc<DatabaseConnection> {
        self.connection.clone()
    }
}
