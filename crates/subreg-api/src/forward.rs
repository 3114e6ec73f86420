//! [`HttpForwarder`]: sends follower writes to the leader's REST API.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, Url};
use subreg_core::{
  Error, Result,
  log::{ForwardHeaders, Forwarder},
  qualified::QualifiedSubject,
  schema::{RegisteredSchema, SchemaCandidate},
};
use tracing::{debug, warn};

use crate::{error::ErrorBody, subjects::SchemaBody};

/// Forwards writes over HTTP.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
  client: Client,
}

impl HttpForwarder {
  /// A forwarder whose requests give up after `timeout`.
  pub fn new(timeout: Duration) -> Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))?;
    Ok(Self { client })
  }

  /// `{leader}/subjects/{subject}[/{tail}...]`, with the subject as one
  /// percent-encoded segment.
  fn url(leader_url: &str, subject: &QualifiedSubject, tail: &[&str]) -> Result<Url> {
    let mut url = Url::parse(leader_url).map_err(|e| {
      Error::ForwardingFailed(format!("Invalid leader URL '{leader_url}': {e}"))
    })?;
    url
      .path_segments_mut()
      .map_err(|_| {
        Error::ForwardingFailed(format!("Leader URL '{leader_url}' cannot be a base"))
      })?
      .pop_if_empty()
      .push("subjects")
      .push(&subject.to_string())
      .extend(tail);
    Ok(url)
  }

  fn with_headers(req: RequestBuilder, headers: &ForwardHeaders) -> RequestBuilder {
    headers
      .iter()
      .fold(req, |req, (name, value)| req.header(name.as_str(), value.as_str()))
  }

  async fn send(
    req: RequestBuilder,
    operation: &str,
    subject: &QualifiedSubject,
  ) -> Result<Response> {
    let resp = req.send().await.map_err(|e| {
      warn!(%subject, error = %e, "{operation} forward failed");
      if e.is_timeout() {
        Error::OperationTimeout(format!(
          "{operation} operation timed out while waiting for the leader"
        ))
      } else {
        Error::ForwardingFailed(format!("Error while forwarding {operation} to the leader: {e}"))
      }
    })?;

    if resp.status().is_success() {
      return Ok(resp);
    }

    let status = resp.status();
    match resp.json::<ErrorBody>().await {
      Ok(body) => {
        debug!(%subject, %status, code = body.error_code, "leader rejected forwarded {operation}");
        Err(Error::from_code(body.error_code, body.message, &subject.to_string()))
      }
      Err(_) => Err(Error::ForwardingFailed(format!(
        "Leader answered {operation} with {status}"
      ))),
    }
  }

  async fn decode<T: serde::de::DeserializeOwned>(resp: Response, operation: &str) -> Result<T> {
    resp.json().await.map_err(|e| {
      Error::ForwardingFailed(format!("Malformed leader response to {operation}: {e}"))
    })
  }
}

impl Forwarder for HttpForwarder {
  async fn forward_delete<'a>(
    &'a self,
    leader_url: &'a str,
    subject: &'a QualifiedSubject,
    permanent: bool,
    headers: &'a ForwardHeaders,
  ) -> Result<Vec<u32>> {
    let url = Self::url(leader_url, subject, &[])?;
    debug!(%url, permanent, "forwarding delete");
    let req = self
      .client
      .delete(url)
      .query(&[("permanent", permanent.to_string())]);
    let resp = Self::send(Self::with_headers(req, headers), "Delete subject", subject).await?;
    Self::decode(resp, "Delete subject").await
  }

  async fn forward_register<'a>(
    &'a self,
    leader_url: &'a str,
    subject: &'a QualifiedSubject,
    candidate: &'a SchemaCandidate,
    normalize: bool,
    headers: &'a ForwardHeaders,
  ) -> Result<RegisteredSchema> {
    let url = Self::url(leader_url, subject, &["versions"])?;
    debug!(%url, normalize, "forwarding registration");
    let req = self
      .client
      .post(url)
      .query(&[("normalize", normalize.to_string())])
      .json(&SchemaBody::from(candidate));
    let resp = Self::send(Self::with_headers(req, headers), "Register schema", subject).await?;
    Self::decode(resp, "Register schema").await
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn subject(raw: &str) -> QualifiedSubject {
    QualifiedSubject::normalize("default", raw).unwrap()
  }

  #[test]
  fn subject_is_one_encoded_segment() {
    let url = HttpForwarder::url("http://leader:8081/", &subject(":.prod:orders/v"), &[])
      .unwrap();
    assert_eq!(url.as_str(), "http://leader:8081/subjects/:.prod:orders%2Fv");
  }

  #[test]
  fn versions_tail_is_appended() {
    let url = HttpForwarder::url("http://leader:8081", &subject("orders"), &["versions"])
      .unwrap();
    assert_eq!(url.as_str(), "http://leader:8081/subjects/orders/versions");
  }

  #[test]
  fn bad_leader_url_is_forwarding_failure() {
    let err = HttpForwarder::url("not a url", &subject("orders"), &[]).unwrap_err();
    assert!(matches!(err, Error::ForwardingFailed(_)));
  }
}
