//! Constant-backoff retry for cluster writes

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Fixed attempt budget with a constant pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_interval_ms() -> u64 {
    1000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval_ms: default_interval_ms(),
        }
    }
}

impl RetryPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Run `op` until it succeeds or the attempt budget is spent
    ///
    /// Every error is retried. `on_error` sees each failure with its 1-based
    /// attempt number. Returns the final result and the attempts used.
    pub async fn run<T, E, F, Fut>(&self, mut op: F, mut on_error: impl FnMut(u32, &E)) -> (Result<T, E>, u32)
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return (Ok(value), attempt),
                Err(err) => {
                    on_error(attempt, &err);
                    if attempt >= max_attempts {
                        return (Err(err), attempt);
                    }
                }
            }
            tokio::time::sleep(self.interval()).await;
            attempt += 1;
        }
    }
}
