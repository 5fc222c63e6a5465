use rusqlite::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// A UNIQUE, FOREIGN KEY, or CHECK constraint rejected the write.
    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("DB lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Sqlite(rusqlite::Error),
}

impl DbError {
    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity(_))
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(failure, detail)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Self::Integrity(detail.clone().unwrap_or_else(|| failure.to_string()))
            }
            _ => Self::Sqlite(err),
        }
    }
}
