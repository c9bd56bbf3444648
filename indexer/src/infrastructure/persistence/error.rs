use std::error::Error;
use std::fmt;

/// Error type for the pipeline's database operations.
///
/// Batched statements are the hot path; their failures carry the table so
/// the dispatcher can log and count them per concern.
#[derive(Debug)]
pub enum DbError {
    /// The store could not be reached
    Connection(String),
    /// Applying schema migrations at startup failed
    Migration(String),
    /// A batched statement against one of the pipeline tables failed
    Batch {
        table: &'static str,
        source: sea_orm::DbErr,
    },
    /// Any other SeaORM failure
    SeaOrm(sea_orm::DbErr),
}

impl DbError {
    /// Batched-statement failure against `table`
    pub(crate) fn batch(table: &'static str, source: sea_orm::DbErr) -> Self {
        DbError::Batch { table, source }
    }
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Connection(msg) => write!(f, "Store connection error: {}", msg),
            DbError::Migration(msg) => write!(f, "Migration error: {}", msg),
            DbError::Batch { table, source } => {
                write!(f, "Batch statement on '{}' failed: {}", table, source)
            }
            DbError::SeaOrm(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            DbError::Batch { source, .. } => Some(source),
            DbError::SeaOrm(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sea_orm::DbErr> for DbError {
    fn from(err: sea_orm::DbErr) -> Self {
        DbError::SeaOrm(err)
    }
}
