//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::JsonRejection,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use subreg_core::Error;
use thiserror::Error;
use tracing::warn;

/// The JSON body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
  pub error_code: u32,
  pub message:    String,
}

/// An error returned by an API handler.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub Error);

/// A request body that is missing, not JSON, or the wrong shape is an
/// invalid schema.
impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self(Error::InvalidSchema(rejection.body_text()))
  }
}

/// Status class for each error kind.
pub fn status(err: &Error) -> StatusCode {
  match err {
    Error::SubjectNotFound(_) | Error::SchemaNotFound => StatusCode::NOT_FOUND,
    Error::SubjectNotSoftDeleted { .. }
    | Error::ReferenceExists(_)
    | Error::OperationNotPermitted(_) => StatusCode::CONFLICT,
    Error::InvalidSchema(_) | Error::InvalidSubject(_) => {
      StatusCode::UNPROCESSABLE_ENTITY
    }
    Error::OperationTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
    Error::ForwardingFailed(_) | Error::Store(_) | Error::Internal(_) => {
      StatusCode::INTERNAL_SERVER_ERROR
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = status(&self.0);
    if status.is_server_error() {
      warn!(code = self.0.code(), error = %self.0, "request failed");
    }
    let body = ErrorBody {
      error_code: self.0.code(),
      message:    self.0.to_string(),
    };
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use subreg_core::lifecycle::DeleteMode;

  use super::*;

  #[test]
  fn kinds_map_to_status_classes() {
    let cases = [
      (Error::SubjectNotFound("a".into()), StatusCode::NOT_FOUND),
      (Error::SchemaNotFound, StatusCode::NOT_FOUND),
      (
        Error::SubjectNotSoftDeleted { subject: "a".into(), mode: DeleteMode::Soft },
        StatusCode::CONFLICT,
      ),
      (Error::ReferenceExists("a".into()), StatusCode::CONFLICT),
      (Error::OperationNotPermitted("a".into()), StatusCode::CONFLICT),
      (Error::InvalidSchema("a".into()), StatusCode::UNPROCESSABLE_ENTITY),
      (Error::InvalidSubject("a".into()), StatusCode::UNPROCESSABLE_ENTITY),
      (Error::OperationTimeout("a".into()), StatusCode::GATEWAY_TIMEOUT),
      (Error::ForwardingFailed("a".into()), StatusCode::INTERNAL_SERVER_ERROR),
      (Error::Store("a".into()), StatusCode::INTERNAL_SERVER_ERROR),
      (Error::Internal("a".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, expected) in cases {
      assert_eq!(status(&err), expected, "{err:?}");
    }
  }
}
