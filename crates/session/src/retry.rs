use std::time::Duration;

use khmerchat_llm::{ChatHandle, DeltaStream, Part, TransportResult};

/// Bounded exponential backoff around opening a turn stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    /// Wait before retry number `attempt + 1`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Opens a stream on `handle`, retrying overload failures only.
    ///
    /// The stream is handed back as soon as it opens. Chunk errors are the caller's.
    pub async fn send_with_retry(
        &self,
        handle: &dyn ChatHandle,
        parts: &[Part],
    ) -> TransportResult<DeltaStream> {
        let mut attempt = 0;
        loop {
            match handle.send_stream(parts).await {
                Ok(stream) => {
                    if attempt > 0 {
                        tracing::info!(attempt, "stream opened after retry");
                    }
                    return Ok(stream);
                }
                Err(error) if error.kind().is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "model overloaded, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
