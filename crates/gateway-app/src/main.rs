//! `a2c-gateway` binary: loads config, builds the provider registry and
//! routing table, spawns the background health monitor and config watcher,
//! and serves the HTTP surface — the bootstrap counterpart to the teacher's
//! `state_manager.rs`-driven process entry point.

use std::sync::Arc;
use std::time::Instant;

use a2c_gateway::config::{GatewayConfig, RoutingFileWatcher};
use a2c_gateway::dispatcher::Dispatcher;
use a2c_gateway::failover::FailoverPolicy;
use a2c_gateway::provider::{ApiFormat, ProviderConfig};
use a2c_gateway::registry::ProviderRegistry;
use a2c_gateway::routes::{self, AppState};
use a2c_gateway::routing::RoutingTable;
use clap::Parser;

/// AI API router: translates, routes, and fails over Messages-format
/// requests across Generative-Content and Chat-Completions upstreams.
#[derive(Parser, Debug)]
#[command(name = "a2c-gateway", version, about)]
struct Cli {
	/// Path to the YAML config file. Omit to run with no configured
	/// providers and default routing (useful for smoke-testing the HTTP
	/// surface itself).
	#[arg(long)]
	config: Option<String>,

	/// Overrides `server.log_level` from the config file.
	#[arg(long)]
	log_level: Option<String>,
}

fn build_provider(config: &ProviderConfig) -> anyhow::Result<Arc<dyn a2c_gateway::provider::Provider>> {
	use a2c_gateway::provider::completions::CompletionsProvider;
	use a2c_gateway::provider::generative::GenerativeProvider;
	use a2c_gateway::provider::messages::MessagesPassthroughProvider;

	Ok(match config.kind {
		ApiFormat::Messages => Arc::new(MessagesPassthroughProvider::new(config.clone())?),
		ApiFormat::Generative => Arc::new(GenerativeProvider::new(config.clone())?),
		ApiFormat::Completions => Arc::new(CompletionsProvider::new(config.clone())?),
	})
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let config = match &cli.config {
		Some(path) => GatewayConfig::load(path)?,
		None => GatewayConfig::empty(),
	};
	let log_level = cli.log_level.as_deref().unwrap_or(&config.server.log_level);

	tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::new(log_level)).init();

	let registry = Arc::new(ProviderRegistry::new());
	for provider_config in &config.providers {
		let provider = build_provider(provider_config)?;
		registry.register(provider)?;
		tracing::info!(provider = %provider_config.name, "registered provider");
	}

	let routing = Arc::new(RoutingTable::new(config.routing.clone()));
	let dispatcher = Arc::new(Dispatcher::new(
		registry.clone(),
		routing.clone(),
		FailoverPolicy::default(),
		Arc::new(a2c_gateway::debug::TracingDebugSink),
	));

	let health_registry = registry.clone();
	let health_interval = config.health_check_interval();
	tokio::spawn(async move {
		health_registry.run_health_monitor(health_interval).await;
	});

	// Only watch for routing changes if routing was loaded from an actual
	// file — there's nothing on disk to watch for `--no-config` runs.
	let _watcher = if let Some(path) = &cli.config {
		match RoutingFileWatcher::watch(std::path::PathBuf::from(path), routing.clone()) {
			Ok(watcher) => Some(watcher),
			Err(e) => {
				tracing::warn!(error = %e, "failed to start routing file watcher, hot-reload disabled");
				None
			},
		}
	} else {
		None
	};

	let state = AppState {
		dispatcher,
		registry,
		routing,
		started_at: Instant::now(),
	};
	let app = routes::router(state).layer(tower_http::trace::TraceLayer::new_for_http()).layer(
		tower_http::cors::CorsLayer::new()
			.allow_origin(tower_http::cors::Any)
			.allow_methods(tower_http::cors::Any)
			.allow_headers(tower_http::cors::Any),
	);

	let listen_addr = config.server.listen_addr.clone();
	tracing::info!(addr = %listen_addr, "starting server");
	let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
	axum::serve(listener, app).await?;

	Ok(())
}
