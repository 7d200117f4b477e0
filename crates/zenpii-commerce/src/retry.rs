//! Silent retries for quote inputs.

use crate::ApiError;
use std::future::Future;
use tracing::debug;

/// Run `call` up to `1 + retries` times, returning the first success or the last error.
pub(crate) async fn with_retries<T, F, Fut>(
    label: &'static str,
    retries: u32,
    mut call: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut attempt = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < retries => {
                attempt += 1;
                debug!(input = label, attempt, error = %e, "retrying quote input");
            }
            Err(e) => return Err(e),
        }
    }
}
