//! Retry-once transport wrapper.
//!
//! A single 429 is absorbed by waiting a fixed interval and reissuing the
//! identical request; anything else is handed back to the caller for
//! classification.

use std::time::{Duration, Instant};

use reqwest::{Client as ReqwestClient, Request, Response, StatusCode};

use crate::observability::{
    CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUEST_RETRIES, CLIENT_REQUESTS,
};
use crate::{Error, Result};

/// Delay before the single retry of a rate-limited request.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(1000);

/// Execute `request`, retrying exactly once if the first response is a 429.
///
/// The second response is returned whatever its status, including another 429.
/// Only failures that prevent any response from arriving become errors here.
pub async fn send_with_retry(
    client: &ReqwestClient,
    request: Request,
    backoff: Duration,
) -> Result<Response> {
    let timeout = request.timeout().map(Duration::as_secs_f64);
    let retry = request.try_clone();

    let response = execute(client, request, timeout).await?;
    if response.status() != StatusCode::TOO_MANY_REQUESTS {
        return Ok(response);
    }
    let Some(retry) = retry else {
        tracing::warn!("rate limited and request body cannot be replayed; not retrying");
        return Ok(response);
    };

    CLIENT_REQUEST_RETRIES.click();
    tracing::warn!(
        url = %retry.url(),
        backoff_ms = backoff.as_millis() as u64,
        "rate limited; retrying once"
    );
    drop(response);
    tokio::time::sleep(backoff).await;
    execute(client, retry, timeout).await
}

async fn execute(
    client: &ReqwestClient,
    request: Request,
    timeout: Option<f64>,
) -> Result<Response> {
    CLIENT_REQUESTS.click();
    let start = Instant::now();
    let method = request.method().clone();
    let url = request.url().clone();
    match client.execute(request).await {
        Ok(response) => {
            CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());
            tracing::debug!(%method, %url, status = response.status().as_u16(), "response");
            Ok(response)
        }
        Err(e) => {
            CLIENT_REQUEST_ERRORS.click();
            tracing::debug!(%method, %url, error = %e, "request failed");
            Err(Error::from_transport(e, timeout))
        }
    }
}
