// Shared HTTP plumbing for the Ollama embedding and generation clients

use std::time::Duration;
use tracing::{debug, warn};

pub(crate) const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub(crate) const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

pub(crate) fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// Whether a failed request is worth retrying: server errors and transport
/// failures are transient, everything else is not.
fn is_transient(error: &ureq::Error) -> bool {
    match error {
        ureq::Error::StatusCode(status) => *status >= 500,
        ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Io(_) => true,
        _ => false,
    }
}

/// Run an HTTP request with bounded retry and doubling backoff.
///
/// The returned error is a reason string for the caller to wrap in its own
/// error variant.
pub(crate) fn request_with_retry<F>(
    retry_attempts: u32,
    mut request_fn: F,
) -> Result<String, String>
where
    F: FnMut() -> Result<String, ureq::Error>,
{
    let mut delay = Duration::from_secs(1);
    let mut last_reason = String::new();

    for attempt in 1..=retry_attempts {
        match request_fn() {
            Ok(body) => return Ok(body),
            Err(error) if is_transient(&error) => {
                warn!(
                    "Transient request failure ({}), attempt {} of {}",
                    error, attempt, retry_attempts
                );
                last_reason = error.to_string();
            }
            Err(ureq::Error::StatusCode(status)) => {
                return Err(format!("HTTP {status}"));
            }
            Err(error) => return Err(error.to_string()),
        }

        if attempt < retry_attempts {
            debug!("Backing off {:?} before retrying", delay);
            std::thread::sleep(delay);
            delay *= 2;
        }
    }

    Err(format!(
        "gave up after {} attempts: {}",
        retry_attempts, last_reason
    ))
}
