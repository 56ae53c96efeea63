//! Failover Policy (§4.H): retry/failover decisions and chain construction,
//! grounded in `original_source/src/a2c/router/failover.py::FailoverService`.

use std::time::Duration;

use crate::registry::{Health, HealthStatus};

pub const RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

#[derive(Debug, Clone, Copy)]
pub struct FailoverPolicy {
	pub max_retries: u32,
	pub retry_delay: Duration,
	pub max_retry_delay: Duration,
	pub latency_threshold: Duration,
}

impl Default for FailoverPolicy {
	fn default() -> Self {
		FailoverPolicy {
			max_retries: 3,
			retry_delay: Duration::from_millis(100),
			max_retry_delay: Duration::from_millis(5000),
			latency_threshold: Duration::from_millis(5000),
		}
	}
}

impl FailoverPolicy {
	pub fn should_retry(&self, status_code: u16) -> bool {
		RETRYABLE_STATUS_CODES.contains(&status_code)
	}

	pub fn should_failover(&self, health: &Health) -> bool {
		match health.status {
			HealthStatus::Unhealthy => true,
			HealthStatus::Degraded => health
				.latency_ms
				.is_some_and(|ms| Duration::from_secs_f64(ms / 1000.0) > self.latency_threshold),
			HealthStatus::Healthy | HealthStatus::Unknown => false,
		}
	}

	/// Ordered provider names to try: primary first (if available), then
	/// the rule's explicit fallback (if any and available), then every
	/// other available provider, each exactly once.
	pub fn build_failover_chain(&self, primary: &str, fallback: Option<&str>, available: &[String]) -> Vec<String> {
		let mut chain = Vec::with_capacity(available.len());
		if available.iter().any(|p| p == primary) {
			chain.push(primary.to_string());
		}
		if let Some(fallback) = fallback {
			if available.iter().any(|p| p == fallback) && !chain.iter().any(|p| p == fallback) {
				chain.push(fallback.to_string());
			}
		}
		for provider in available {
			if !chain.contains(provider) {
				chain.push(provider.clone());
			}
		}
		chain
	}

	/// Exponential backoff: `base * 2^(attempt-1)`, clamped to
	/// `max_retry_delay`. `attempt` is 1-based.
	pub fn retry_delay_for(&self, attempt: u32) -> Duration {
		let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
		let delay = (self.retry_delay.as_millis() as u64).saturating_mul(factor);
		Duration::from_millis(delay.min(self.max_retry_delay.as_millis() as u64))
	}
}
