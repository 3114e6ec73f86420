//! Error type for `subreg-store-sqlite`.

use subreg_core::log::LogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("invalid log offset: {0}")]
  Offset(i64),
}

impl From<Error> for LogError {
  fn from(e: Error) -> Self { LogError::Store(Box::new(e)) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
