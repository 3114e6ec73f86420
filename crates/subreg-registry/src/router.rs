//! Leader forwarding router.
//!
//! Every write asks where it must run. On the leader it runs locally; on a
//! follower it is forwarded to the leader's endpoint, bounded by a timeout.
//! The router never retries: a timeout or a failed forward goes straight
//! back to the caller.

use std::{future::Future, time::Duration};

use subreg_core::{Error, Result, log::Leadership};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  Local,
  Forward { leader_url: String },
}

/// Decide where a write must execute.
pub fn route(leadership: &Leadership) -> Result<Route> {
  match leadership {
    Leadership::Leader => Ok(Route::Local),
    Leadership::Follower { leader_url: Some(url) } => Ok(Route::Forward {
      leader_url: url.clone(),
    }),
    Leadership::Follower { leader_url: None } => Err(Error::ForwardingFailed(
      "Unknown leader; cannot forward the request".into(),
    )),
  }
}

/// Await a forwarded call, converting an elapsed `timeout` into
/// [`Error::OperationTimeout`].
pub async fn bounded<T, Fut>(timeout: Duration, operation: &str, call: Fut) -> Result<T>
where
  Fut: Future<Output = Result<T>>,
{
  match tokio::time::timeout(timeout, call).await {
    Ok(result) => result,
    Err(_) => {
      warn!(operation, timeout_ms = timeout.as_millis() as u64, "forward to leader timed out");
      Err(Error::OperationTimeout(format!(
        "{operation} operation timed out after {}ms waiting for the leader",
        timeout.as_millis()
      )))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn leader_runs_locally() {
    assert_eq!(route(&Leadership::Leader).unwrap(), Route::Local);
  }

  #[test]
  fn follower_forwards_to_known_leader() {
    let route = route(&Leadership::Follower {
      leader_url: Some("http://leader:8081".into()),
    })
    .unwrap();
    assert_eq!(route, Route::Forward { leader_url: "http://leader:8081".into() });
  }

  #[test]
  fn follower_without_leader_fails() {
    let err = route(&Leadership::Follower { leader_url: None }).unwrap_err();
    assert!(matches!(err, Error::ForwardingFailed(_)));
  }

  #[tokio::test]
  async fn slow_call_becomes_timeout() {
    let err = bounded(Duration::from_millis(20), "Delete subject", async {
      tokio::time::sleep(Duration::from_secs(5)).await;
      Ok(())
    })
    .await
    .unwrap_err();
    assert!(matches!(err, Error::OperationTimeout(ref m) if m.starts_with("Delete subject")));
  }

  #[tokio::test]
  async fn fast_call_passes_through() {
    let v = bounded(Duration::from_secs(1), "Register schema", async { Ok(7) })
      .await
      .unwrap();
    assert_eq!(v, 7);
  }
}
