//! Layered configuration (§4 expansion, ambient stack): YAML file plus
//! `A2C_`-prefixed environment overrides, and a background watcher that
//! hot-reloads the routing ruleset, grounded in the teacher's
//! `state_manager.rs::LocalClient::watch_config_file` debounced-`notify`
//! pattern.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::provider::ProviderConfig;
use crate::routing::{Ruleset, RoutingTable};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
	#[serde(default = "default_listen_addr")]
	pub listen_addr: String,
	#[serde(default = "default_log_level")]
	pub log_level: String,
}

fn default_listen_addr() -> String {
	"0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
	"info".to_string()
}

impl Default for ServerConfig {
	fn default() -> Self {
		ServerConfig {
			listen_addr: default_listen_addr(),
			log_level: default_log_level(),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
	#[serde(default)]
	pub server: ServerConfig,
	#[serde(default)]
	pub providers: Vec<ProviderConfig>,
	#[serde(default)]
	pub routing: Ruleset,
	#[serde(default = "default_health_check_interval_secs")]
	pub health_check_interval_secs: u64,
}

fn default_health_check_interval_secs() -> u64 {
	60
}

impl Default for GatewayConfig {
	fn default() -> Self {
		GatewayConfig {
			server: ServerConfig::default(),
			providers: Vec::new(),
			routing: Ruleset::default(),
			health_check_interval_secs: default_health_check_interval_secs(),
		}
	}
}

impl GatewayConfig {
	/// Load from a YAML file, expanding `~` and `$VARS` in the path itself,
	/// then apply `A2C_`-prefixed environment overrides on top.
	pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
		let expanded = shellexpand::full(&path.as_ref().to_string_lossy())?.into_owned();
		let raw = std::fs::read_to_string(&expanded)?;
		let mut config: GatewayConfig = serde_yaml::from_str(&raw)?;
		config.apply_env_overrides();
		Ok(config)
	}

	/// A config with no providers or rules, for `--no-config` boot paths and
	/// tests; env overrides still apply.
	pub fn empty() -> Self {
		let mut config = GatewayConfig::default();
		config.apply_env_overrides();
		config
	}

	/// `A2C_LISTEN_ADDR` and `A2C_LOG_LEVEL` override the matching YAML
	/// fields; provider credentials are almost always supplied this way
	/// rather than checked into the routing file (`A2C_PROVIDER_<NAME>_API_KEY`).
	fn apply_env_overrides(&mut self) {
		if let Ok(addr) = std::env::var("A2C_LISTEN_ADDR") {
			self.server.listen_addr = addr;
		}
		if let Ok(level) = std::env::var("A2C_LOG_LEVEL") {
			self.server.log_level = level;
		}
		if let Ok(interval) = std::env::var("A2C_HEALTH_CHECK_INTERVAL_SECS") {
			if let Ok(parsed) = interval.parse() {
				self.health_check_interval_secs = parsed;
			}
		}
		for provider in &mut self.providers {
			let env_name = provider.name.to_uppercase().replace('-', "_");
			if let Ok(key) = std::env::var(format!("A2C_PROVIDER_{env_name}_API_KEY")) {
				provider.api_key = Some(key);
			}
			if let Ok(base_url) = std::env::var(format!("A2C_PROVIDER_{env_name}_BASE_URL")) {
				provider.base_url = base_url;
			}
		}
	}

	pub fn health_check_interval(&self) -> Duration {
		Duration::from_secs(self.health_check_interval_secs)
	}
}

/// Watches a ruleset YAML file and swaps the live [`RoutingTable`] whenever
/// it changes on disk, debounced by 250ms exactly as the teacher does for
/// its local config source.
pub struct RoutingFileWatcher {
	_debouncer: notify_debouncer_full::Debouncer<notify::RecommendedWatcher, notify_debouncer_full::FileIdMap>,
}

impl RoutingFileWatcher {
	pub fn watch(path: PathBuf, table: Arc<RoutingTable>) -> anyhow::Result<Self> {
		use notify::{EventKind, RecursiveMode};

		let table_for_events = table.clone();
		let watch_path = path.clone();
		let mut debouncer = notify_debouncer_full::new_debouncer(Duration::from_millis(250), None, move |res: notify_debouncer_full::DebounceEventResult| {
			let Ok(events) = res else { return };
			let changed = events.iter().any(|e| matches!(e.kind, EventKind::Modify(_) | EventKind::Create(_)));
			if !changed {
				return;
			}
			match std::fs::read_to_string(&watch_path).ok().and_then(|raw| Ruleset::from_yaml(&raw).ok()) {
				Some(ruleset) => {
					tracing::info!(path = %watch_path.display(), "routing ruleset reloaded");
					table_for_events.swap(ruleset);
				},
				None => tracing::warn!(path = %watch_path.display(), "failed to reload routing ruleset, keeping previous"),
			}
		})?;

		debouncer.watch(&path, RecursiveMode::NonRecursive)?;
		Ok(RoutingFileWatcher { _debouncer: debouncer })
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn env_overrides_take_precedence_over_yaml() {
		let yaml = r#"
server:
  listen_addr: "0.0.0.0:9000"
providers:
  - name: gemini
    kind: generative
    base_url: "https://generativelanguage.googleapis.com"
    default_model: "claude-sonnet-4-5"
"#;
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.yaml");
		std::fs::write(&path, yaml).unwrap();

		unsafe {
			std::env::set_var("A2C_LISTEN_ADDR", "127.0.0.1:1234");
			std::env::set_var("A2C_PROVIDER_GEMINI_API_KEY", "sekret");
		}
		let config = GatewayConfig::load(&path).unwrap();
		unsafe {
			std::env::remove_var("A2C_LISTEN_ADDR");
			std::env::remove_var("A2C_PROVIDER_GEMINI_API_KEY");
		}

		assert_eq!(config.server.listen_addr, "127.0.0.1:1234");
		assert_eq!(config.providers[0].api_key.as_deref(), Some("sekret"));
	}

	#[test]
	fn empty_config_has_sane_defaults() {
		let config = GatewayConfig::empty();
		assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
		assert!(config.providers.is_empty());
		assert_eq!(config.health_check_interval_secs, 60);
	}
}
