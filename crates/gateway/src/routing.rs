//! Routing Engine (§4.F): declarative, priority-ordered request→provider
//! matching, grounded in `original_source/src/a2c/router/rules.py`.
//!
//! A [`Ruleset`] is immutable once built and swapped in atomically via
//! `arc_swap::ArcSwap` so the hot request path never blocks on a config
//! reload (teacher pattern: `agentgateway`'s listener/route config store).

use std::sync::Arc;

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::messages::MessagesRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingRule {
	pub name: String,
	pub provider: String,
	#[serde(default)]
	pub priority: i32,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub agent_type: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub model_pattern: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub thinking_enabled: Option<bool>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub min_context_tokens: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub max_context_tokens: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub fallback_provider: Option<String>,
}

impl RoutingRule {
	/// Compile the `model_pattern` once; invalid patterns never match
	/// instead of panicking the request path.
	fn model_regex(&self) -> Option<Regex> {
		self.model_pattern.as_deref().and_then(|p| Regex::new(&format!("(?i){p}")).ok())
	}

	pub fn matches(&self, request: &MessagesRequest, agent_type: Option<&str>, context_tokens: u64) -> bool {
		if let Some(expected) = &self.agent_type {
			if expected != agent_type.unwrap_or("default") {
				return false;
			}
		}

		if let Some(re) = self.model_regex() {
			if !re.is_match(&request.model) {
				return false;
			}
		}

		if let Some(expected) = self.thinking_enabled {
			if expected != request.thinking_requested() {
				return false;
			}
		}

		if let Some(min) = self.min_context_tokens {
			if context_tokens < min {
				return false;
			}
		}
		if let Some(max) = self.max_context_tokens {
			if context_tokens > max {
				return false;
			}
		}

		true
	}
}

/// An immutable, priority-sorted collection of rules plus the default
/// provider to fall back to when nothing matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ruleset {
	#[serde(default = "default_provider_name")]
	pub default_provider: String,
	#[serde(default)]
	rules: Vec<RoutingRule>,
}

fn default_provider_name() -> String {
	"anthropic".to_string()
}

impl Default for Ruleset {
	fn default() -> Self {
		Ruleset {
			default_provider: default_provider_name(),
			rules: Vec::new(),
		}
	}
}

impl Ruleset {
	pub fn new(default_provider: String, mut rules: Vec<RoutingRule>) -> Self {
		rules.sort_by(|a, b| b.priority.cmp(&a.priority));
		Ruleset { default_provider, rules }
	}

	pub fn rules(&self) -> &[RoutingRule] {
		&self.rules
	}

	/// First matching rule's provider name, in priority order, or the
	/// ruleset's default provider if nothing matches.
	pub fn select_provider(&self, request: &MessagesRequest, agent_type: Option<&str>, context_tokens: u64) -> &str {
		for rule in &self.rules {
			if rule.matches(request, agent_type, context_tokens) {
				return &rule.provider;
			}
		}
		&self.default_provider
	}

	/// The explicit fallback configured on whichever rule matched, if any —
	/// used by the failover policy (§4.H) to seed the failover chain.
	pub fn matching_fallback(&self, request: &MessagesRequest, agent_type: Option<&str>, context_tokens: u64) -> Option<&str> {
		self.rules
			.iter()
			.find(|r| r.matches(request, agent_type, context_tokens))
			.and_then(|r| r.fallback_provider.as_deref())
	}

	/// Parse a ruleset from YAML, the on-disk config format (§4.F).
	pub fn from_yaml(input: &str) -> Result<Self, crate::error::GatewayError> {
		let ruleset: Ruleset =
			serde_yaml::from_str(input).map_err(|e| crate::error::GatewayError::InvalidRequest(format!("invalid ruleset yaml: {e}")))?;
		let built = Ruleset::new(ruleset.default_provider, ruleset.rules);
		built.validate()?;
		Ok(built)
	}

	/// Load-time validation (§4.F): rule `name`/`provider` non-empty, names
	/// unique. `priority` being an integer and "only known match keys" are
	/// enforced structurally by `serde`'s typing and `deny_unknown_fields`.
	pub fn validate(&self) -> Result<(), crate::error::GatewayError> {
		let mut seen = std::collections::HashSet::new();
		for rule in &self.rules {
			if rule.name.trim().is_empty() {
				return Err(crate::error::GatewayError::InvalidRequest("routing rule has an empty name".to_string()));
			}
			if rule.provider.trim().is_empty() {
				return Err(crate::error::GatewayError::InvalidRequest(format!("routing rule '{}' has an empty provider", rule.name)));
			}
			if !seen.insert(rule.name.clone()) {
				return Err(crate::error::GatewayError::InvalidRequest(format!("duplicate routing rule name '{}'", rule.name)));
			}
		}
		Ok(())
	}
}

/// Atomically swappable live ruleset, watched and reloaded by `config.rs`'s
/// file watcher.
pub struct RoutingTable {
	current: ArcSwap<Ruleset>,
}

impl RoutingTable {
	pub fn new(ruleset: Ruleset) -> Self {
		RoutingTable {
			current: ArcSwap::from_pointee(ruleset),
		}
	}

	pub fn load(&self) -> Arc<Ruleset> {
		self.current.load_full()
	}

	pub fn swap(&self, ruleset: Ruleset) {
		self.current.store(Arc::new(ruleset));
	}
}

impl Default for RoutingTable {
	fn default() -> Self {
		RoutingTable::new(Ruleset::default())
	}
}

static DEFAULT_RULESET: Lazy<Ruleset> = Lazy::new(Ruleset::default);

/// A ruleset containing zero usable rules, for callers that just need a
/// well-formed empty table (tests, `--no-config` boot path).
pub fn empty_ruleset() -> Ruleset {
	DEFAULT_RULESET.clone()
}
