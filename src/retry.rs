//! Bounded exponential-backoff retry for wallet and RPC calls.
//!
//! Errors are sorted into a [`FailureClass`] by code and message shape rather
//! than by concrete type, since injected wallets and RPC endpoints word the
//! same failure in many different ways. Only [`FailureClass::Transport`] is
//! retried; a user rejection or an "already pending" prompt is returned on the
//! first occurrence.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::wallet::errors::{
    CHAIN_DISCONNECTED_CODE, DISCONNECTED_CODE, REQUEST_PENDING_CODE, USER_REJECTED_CODE,
};

/// Upper bound on a single backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// JSON-RPC internal error; wallets use it to wrap failing upstream endpoints.
const INTERNAL_RPC_CODE: i64 = -32603;

/// How a failed call should be treated by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The human declined the prompt. Never retried.
    UserRejected,
    /// The wallet already has an identical prompt open. Never retried.
    AlreadyPending,
    /// Timeout, endpoint or connectivity problem. Retried with backoff.
    Transport,
    /// Anything else (reverts, malformed requests). Never retried.
    Fatal,
}

impl FailureClass {
    /// Classify a provider failure from its optional code and message.
    pub fn classify(code: Option<i64>, message: &str) -> FailureClass {
        let message = message.to_lowercase();

        if code == Some(USER_REJECTED_CODE)
            || message.contains("user rejected")
            || message.contains("user denied")
            || message.contains("rejected by user")
            || message.contains("user cancelled")
            || message.contains("user canceled")
        {
            return FailureClass::UserRejected;
        }

        if code == Some(REQUEST_PENDING_CODE)
            || message.contains("already pending")
            || message.contains("already processing")
        {
            return FailureClass::AlreadyPending;
        }

        if matches!(
            code,
            Some(INTERNAL_RPC_CODE) | Some(DISCONNECTED_CODE) | Some(CHAIN_DISCONNECTED_CODE)
        ) {
            return FailureClass::Transport;
        }

        if message.contains("timeout")
            || message.contains("timed out")
            || message.contains("network")
            || message.contains("connection")
            || message.contains("connect error")
            || message.contains("failed to fetch")
            || message.contains("error sending request")
            || message.contains("econnrefused")
            || message.contains("econnreset")
            || message.contains("socket hang up")
            || message.contains("bad gateway")
            || message.contains("service unavailable")
            || message.contains("could not coalesce")
            || message.contains("internal json-rpc error")
        {
            return FailureClass::Transport;
        }

        FailureClass::Fatal
    }

    pub fn is_retriable(&self) -> bool {
        matches!(self, FailureClass::Transport)
    }
}

/// Errors the executor knows how to classify.
pub trait Retryable {
    fn failure_class(&self) -> FailureClass;
}

/// Retry settings, usually taken from the `[retry]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryPolicy {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

/// Per-call retry state, created fresh by every [`RetryExecutor::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryContext {
    pub attempt: u32,
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryContext {
    fn new(policy: &RetryPolicy) -> Self {
        Self {
            attempt: 1,
            max_attempts: policy.max_attempts.max(1),
            base_delay: policy.base_delay(),
        }
    }

    /// Delay to wait after the current attempt failed: `base * 2^(attempt-1)`,
    /// capped at [`MAX_BACKOFF`].
    pub fn delay(&self) -> Duration {
        backoff_delay(self.base_delay, self.attempt)
    }

    pub fn is_last(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// Exponential backoff for a 1-based attempt number.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    let factor = 2u32.saturating_pow(exponent);
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

/// Runs fallible async operations with bounded retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails with a non-retriable error, or
    /// the attempt budget is spent.
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(RetryContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.run_with_hook(operation, |_: &E, _: &RetryContext| {}).await
    }

    /// Like [`run`](Self::run), calling `on_retry` after every retriable
    /// failure that will be retried. Callers use the hook to drop cached
    /// transport handles before the next attempt.
    pub async fn run_with_hook<T, E, F, Fut, H>(&self, mut operation: F, mut on_retry: H) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(RetryContext) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        H: FnMut(&E, &RetryContext),
    {
        let mut context = RetryContext::new(&self.policy);

        loop {
            match operation(context).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let class = err.failure_class();
                    if !class.is_retriable() {
                        debug!(
                            "Not retrying after attempt {}/{} ({:?}): {}",
                            context.attempt, context.max_attempts, class, err
                        );
                        return Err(err);
                    }

                    if context.is_last() {
                        warn!(
                            "Giving up after {} attempts: {}",
                            context.max_attempts, err
                        );
                        return Err(err);
                    }

                    let delay = context.delay();
                    warn!(
                        "Attempt {}/{} failed, retrying in {}ms: {}",
                        context.attempt,
                        context.max_attempts,
                        delay.as_millis(),
                        err
                    );
                    on_retry(&err, &context);
                    tokio::time::sleep(delay).await;
                    context.attempt += 1;
                }
            }
        }
    }
}
