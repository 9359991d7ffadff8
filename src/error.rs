use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RowkeepError {
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Constraint violation: {0}")]
    Constraint(String),
    #[error("Query build error: {0}")]
    QueryBuild(String),
    #[error("Driver error: {0}")]
    Driver(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Lock poisoned: {0}")]
    Lock(String),
    #[error("No open connection")]
    NoConnection,
}

pub type Result<T> = std::result::Result<T, RowkeepError>;

// Helper conversions
impl From<rusqlite::Error> for RowkeepError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(e.to_string())
            }
            _ => Self::Driver(e.to_string()),
        }
    }
}

impl From<config::ConfigError> for RowkeepError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}
