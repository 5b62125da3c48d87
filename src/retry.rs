use std::{future::Future, time::Duration};

use tokio::time::sleep;

use crate::{prelude::*, source::FetchError};

/// How many times to try, how long to wait in between, and which failures deserve another try.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,

    /// Wait before the second attempt, doubled before every next one.
    pub initial_backoff: Duration,

    pub is_retryable: fn(&FetchError) -> bool,
}

impl Default for RetryPolicy {
    /// Three attempts with 1 s and 2 s pauses, retrying transient failures only.
    fn default() -> Self {
        Self::exponential(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    pub const fn exponential(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self { max_attempts, initial_backoff, is_retryable: FetchError::is_transient }
    }

    /// Try once and surface the failure as is.
    pub const fn once() -> Self {
        Self::exponential(1, Duration::ZERO)
    }

    /// Pause after the specified failed attempt, counting from one.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff.saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
    }

    pub async fn run<T, F, Fut>(&self, mut attempt_fn: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match attempt_fn().await {
                Ok(value) => return Ok(value),
                Err(error) if !(self.is_retryable)(&error) => return Err(error),
                Err(error) if attempt >= max_attempts => {
                    return if max_attempts == 1 {
                        Err(error)
                    } else {
                        Err(FetchError::Exhausted { attempts: attempt, source: Box::new(error) })
                    };
                }
                Err(error) => {
                    let backoff = self.backoff(attempt);
                    warn!(attempt, max_attempts, ?backoff, error = %error, "retrying…");
                    sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}
