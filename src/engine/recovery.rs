//! Bounded retry with exponential backoff and jitter
//!
//! The decision is a pure function of the attempt number and the
//! policy configuration, so it can be tested without sleeping. The
//! engine owns the actual wait.

use rand::Rng;
use std::time::Duration;

/// Retry configuration for one engine instance
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,

    /// Initial delay before the first retry
    pub initial_delay: Duration,

    /// Perturb delays into [0.5, 1.5] x delay to avoid
    /// thundering-herd retries across parallel steps
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            jitter: true,
        }
    }
}

/// What to do about a failed attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryDecision {
    pub retry: bool,
    pub delay: Duration,
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Decide whether attempt number `attempt` (1-based) may be retried
    ///
    /// Stateless; consulted fresh per failing invocation and never
    /// inspects cross-task state.
    pub fn decide(&self, attempt: u32) -> RetryDecision {
        if attempt > self.max_retries {
            return RetryDecision {
                retry: false,
                delay: Duration::ZERO,
            };
        }

        let base = self.initial_delay.as_secs_f64() * 2f64.powi(attempt.saturating_sub(1) as i32);
        let delay = if self.jitter {
            let factor = rand::rng().random_range(0.5..=1.5);
            base * factor
        } else {
            base
        };

        RetryDecision {
            retry: true,
            delay: Duration::from_secs_f64(delay),
        }
    }
}
