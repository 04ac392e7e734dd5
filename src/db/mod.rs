pub mod sqlite;
pub mod repository;

pub use sqlite::*;
pub use repository::*;

use rusqlite::ffi;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Invalid stored value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
}

/// Which declarative rule the engine used to reject a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    PrimaryKey,
    Check,
    ForeignKey,
    NotNull,
    Other,
}

impl DatabaseError {
    /// Classify an engine rejection by its extended result code.
    ///
    /// Returns `None` for anything that is not a constraint failure.
    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self {
            DatabaseError::Sqlite(rusqlite::Error::SqliteFailure(err, msg))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Some(match err.extended_code {
                    ffi::SQLITE_CONSTRAINT_UNIQUE => ConstraintKind::Unique,
                    ffi::SQLITE_CONSTRAINT_PRIMARYKEY => ConstraintKind::PrimaryKey,
                    ffi::SQLITE_CONSTRAINT_CHECK => ConstraintKind::Check,
                    ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ConstraintKind::ForeignKey,
                    // ON DELETE RESTRICT fires from SQLite's internal FK trigger program
                    ffi::SQLITE_CONSTRAINT_TRIGGER if is_foreign_key_message(msg.as_deref()) => {
                        ConstraintKind::ForeignKey
                    }
                    ffi::SQLITE_CONSTRAINT_NOTNULL => ConstraintKind::NotNull,
                    _ => ConstraintKind::Other,
                })
            }
            DatabaseError::ConstraintViolation(_) => Some(ConstraintKind::Other),
            _ => None,
        }
    }

    pub(crate) fn not_found(entity_type: &str, id: impl ToString) -> Self {
        DatabaseError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }
}

fn is_foreign_key_message(msg: Option<&str>) -> bool {
    msg.is_some_and(|m| m.starts_with("FOREIGN KEY constraint failed"))
}
