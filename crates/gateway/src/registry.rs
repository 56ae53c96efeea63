//! Provider Registry (§4.G): a thread-safe named map of configured
//! providers plus their last-observed health, grounded in
//! `original_source/src/a2c/providers/registry.py` and `providers/base.py`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::GatewayError;
use crate::provider::Provider;

pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
	Healthy,
	Degraded,
	Unhealthy,
	Unknown,
}

#[derive(Debug, Clone, Serialize)]
pub struct Health {
	pub status: HealthStatus,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub latency_ms: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

impl Default for Health {
	fn default() -> Self {
		Health {
			status: HealthStatus::Unknown,
			latency_ms: None,
			error: None,
		}
	}
}

/// A registered provider plus its last-observed health snapshot. Health is
/// behind its own `ArcSwap` so a concurrent health probe never blocks a
/// request that's just reading the current status.
pub struct ProviderRecord {
	pub name: String,
	pub provider: Arc<dyn Provider>,
	health: ArcSwap<Health>,
}

impl ProviderRecord {
	pub fn health(&self) -> Arc<Health> {
		self.health.load_full()
	}

	fn set_health(&self, health: Health) {
		self.health.store(Arc::new(health));
	}
}

/// The live set of configured providers. Registration happens once at boot
/// (and on config reload); lookups happen on every request, so the map
/// itself is behind a `parking_lot::Mutex` rather than anything fancier —
/// writes are rare, reads are a single hashmap lookup plus an `ArcSwap`
/// load.
#[derive(Default)]
pub struct ProviderRegistry {
	providers: Mutex<HashMap<String, Arc<ProviderRecord>>>,
}

impl ProviderRegistry {
	pub fn new() -> Self {
		ProviderRegistry::default()
	}

	pub fn register(&self, provider: Arc<dyn Provider>) -> Result<(), GatewayError> {
		let name = provider.name().to_string();
		let mut providers = self.providers.lock();
		if providers.contains_key(&name) {
			return Err(GatewayError::Routing(format!("provider '{name}' already registered")));
		}
		providers.insert(
			name.clone(),
			Arc::new(ProviderRecord {
				name,
				provider,
				health: ArcSwap::from_pointee(Health::default()),
			}),
		);
		Ok(())
	}

	pub fn unregister(&self, name: &str) {
		self.providers.lock().remove(name);
	}

	pub fn get(&self, name: &str) -> Option<Arc<ProviderRecord>> {
		self.providers.lock().get(name).cloned()
	}

	pub fn get_or_err(&self, name: &str) -> Result<Arc<ProviderRecord>, GatewayError> {
		self.get(name).ok_or_else(|| GatewayError::Routing(format!("provider '{name}' not found")))
	}

	pub fn list(&self) -> Vec<Arc<ProviderRecord>> {
		self.providers.lock().values().cloned().collect()
	}

	pub fn list_names(&self) -> Vec<String> {
		self.providers.lock().keys().cloned().collect()
	}

	pub fn list_healthy(&self) -> Vec<Arc<ProviderRecord>> {
		self.list().into_iter().filter(|r| r.health().status == HealthStatus::Healthy).collect()
	}

	/// Probe a single provider and record the result. Never returns
	/// `Err` — probe failures are classified into a `Health`, not
	/// propagated.
	pub async fn check_health(&self, name: &str) -> Result<Health, GatewayError> {
		let record = self.get_or_err(name)?;
		let start = Instant::now();
		let health = match record.provider.health_check().await {
			Ok(()) => Health {
				status: HealthStatus::Healthy,
				latency_ms: Some(start.elapsed().as_secs_f64() * 1000.0),
				error: None,
			},
			Err(e) => classify_probe_error(&e),
		};
		record.set_health(health.clone());
		Ok(health)
	}

	pub async fn check_all_health(&self) {
		for record in self.list() {
			let _ = self.check_health(&record.name).await;
		}
	}

	/// Drives a background probe loop at `interval`, intended to be spawned
	/// onto its own tokio task for the lifetime of the process (§4.G).
	pub async fn run_health_monitor(self: Arc<Self>, interval: Duration) {
		let mut ticker = tokio::time::interval(interval);
		loop {
			ticker.tick().await;
			self.check_all_health().await;
		}
	}
}

/// §4.G probe classification: `401/403 → unhealthy(credentials)`,
/// `429 → degraded(rate-limited)`, timeout → `unhealthy(timeout)`, any other
/// non-2xx → `degraded`.
fn classify_probe_error(err: &GatewayError) -> Health {
	match err {
		GatewayError::Authentication(msg) => Health {
			status: HealthStatus::Unhealthy,
			latency_ms: None,
			error: Some(format!("credentials: {msg}")),
		},
		GatewayError::Timeout(msg) => Health {
			status: HealthStatus::Unhealthy,
			latency_ms: None,
			error: Some(format!("timeout: {msg}")),
		},
		GatewayError::Provider { status: 401, .. } | GatewayError::Provider { status: 403, .. } => Health {
			status: HealthStatus::Unhealthy,
			latency_ms: None,
			error: Some(format!("credentials: {err}")),
		},
		GatewayError::Provider { status: 429, .. } => Health {
			status: HealthStatus::Degraded,
			latency_ms: None,
			error: Some(format!("rate-limited: {err}")),
		},
		GatewayError::Provider { status, .. } if (200..500).contains(status) => Health {
			status: HealthStatus::Degraded,
			latency_ms: None,
			error: Some(err.to_string()),
		},
		_ => Health {
			status: HealthStatus::Unhealthy,
			latency_ms: None,
			error: Some(err.to_string()),
		},
	}
}
