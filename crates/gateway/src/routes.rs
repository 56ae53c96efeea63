//! Inbound HTTP surface (§6), grounded in `original_source/src/a2c/server/routes/{anthropic,health,admin}.py`.
//!
//! One axum [`Router`] wires every route onto a shared [`AppState`]; request
//! translation, routing, and failover are delegated straight to
//! [`crate::dispatcher::Dispatcher`] — these handlers are thin adapters
//! between HTTP and the core.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use bytes::Bytes;
use serde::Serialize;
use serde_json::{Value, json};

use crate::dispatcher::Dispatcher;
use crate::error::GatewayError;
use crate::provider::ApiFormat;
use crate::registry::ProviderRegistry;
use crate::routing::RoutingTable;
use crate::types::messages::MessagesRequest;

#[derive(Clone)]
pub struct AppState {
	pub dispatcher: Arc<Dispatcher>,
	pub registry: Arc<ProviderRegistry>,
	pub routing: Arc<RoutingTable>,
	pub started_at: Instant,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/v1/messages", post(post_messages))
		.route("/v1/models", get(list_models))
		.route("/health/live", get(health_live))
		.route("/health/ready", get(health_ready))
		.route("/health/providers", get(health_providers))
		.route("/admin/routing/rules", get(admin_routing_rules))
		.route("/admin/routing/test", get(admin_routing_test))
		.route("/admin/providers", get(admin_providers))
		.route("/admin/providers/{name}/test", post(admin_provider_test))
		.route("/admin/stats", get(admin_stats))
		.with_state(state)
}

fn agent_type_header(headers: &HeaderMap) -> Option<String> {
	headers.get("x-agent-type").and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// `POST /v1/messages` (§6, §4.I): the request-translation engine's only
/// inbound door. `x-api-key`/`anthropic-version` are accepted but ignored
/// for routing purposes; `x-agent-type` feeds the routing engine.
async fn post_messages(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
	let request: MessagesRequest = match serde_json::from_slice(&body) {
		Ok(r) => r,
		Err(e) => return GatewayError::InvalidRequest(format!("invalid JSON: {e}")).into_response(),
	};
	let agent_type = agent_type_header(&headers);
	let is_streaming = request.stream;

	if is_streaming {
		match state.dispatcher.dispatch_stream(&request, agent_type.as_deref()).await {
			Ok(dispatched) => Response::builder()
				.status(StatusCode::OK)
				.header("content-type", "text/event-stream")
				.header("cache-control", "no-cache")
				.header("connection", "keep-alive")
				.header("x-request-id", dispatched.request_id)
				.header("x-provider", dispatched.provider)
				.body(Body::from_stream(dispatched.body))
				.expect("header values are valid ASCII"),
			Err(err) => err.into_response(),
		}
	} else {
		match state.dispatcher.dispatch(&request, agent_type.as_deref()).await {
			Ok(dispatched) => {
				let mut response = Json(dispatched.body).into_response();
				let headers = response.headers_mut();
				if let Ok(v) = dispatched.request_id.parse::<HeaderValue>() {
					headers.insert("x-request-id", v);
				}
				if let Ok(v) = dispatched.provider.parse::<HeaderValue>() {
					headers.insert("x-provider", v);
				}
				response
			},
			Err(err) => err.into_response(),
		}
	}
}

#[derive(Serialize)]
struct ModelInfo {
	id: &'static str,
	provider: String,
	display_name: &'static str,
	supports_thinking: bool,
}

#[derive(Serialize)]
struct ModelsResponse {
	models: Vec<ModelInfo>,
	total: usize,
}

/// `GET /v1/models` (§6): a small static per-provider catalogue, keyed off
/// each provider's declared [`ApiFormat`] rather than a live upstream call.
async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
	let mut models = Vec::new();
	for record in state.registry.list() {
		let catalogue: &[(&str, &str, bool)] = match record.provider.api_format() {
			ApiFormat::Messages => &[
				("claude-opus-4-5", "Claude Opus 4.5", true),
				("claude-sonnet-4-5", "Claude Sonnet 4.5", true),
				("claude-3-5-sonnet-20241022", "Claude 3.5 Sonnet", false),
				("claude-3-haiku-20240307", "Claude 3 Haiku", false),
			],
			ApiFormat::Generative => &[
				("gemini-2.5-pro", "Gemini 2.5 Pro", true),
				("gemini-2.5-flash", "Gemini 2.5 Flash", false),
				("gemini-2.5-flash-lite", "Gemini 2.5 Flash Lite", false),
			],
			ApiFormat::Completions => &[("gpt-4o", "GPT-4o", false), ("gpt-4o-mini", "GPT-4o mini", false)],
		};
		for (id, display_name, supports_thinking) in catalogue {
			models.push(ModelInfo {
				id,
				provider: record.name.clone(),
				display_name,
				supports_thinking: *supports_thinking,
			});
		}
	}
	let total = models.len();
	Json(ModelsResponse { models, total })
}

/// `GET /health/live` (§6): 200 whenever the process can answer at all.
async fn health_live(State(state): State<AppState>) -> Json<Value> {
	Json(json!({ "status": "alive", "uptime_seconds": state.started_at.elapsed().as_secs() }))
}

/// `GET /health/ready` (§6): 200 iff at least one provider is configured or
/// healthy, else 503.
async fn health_ready(State(state): State<AppState>) -> Response {
	let configured = state.registry.list();
	let healthy = state.registry.list_healthy();
	let ready = !configured.is_empty() || !healthy.is_empty();
	let body = json!({
		"status": if ready { "ready" } else { "not_ready" },
		"providers": {
			"total": configured.len(),
			"configured": configured.len(),
			"healthy": healthy.len(),
		},
	});
	let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
	(status, Json(body)).into_response()
}

/// `GET /health/providers` (§6): per-provider health snapshot.
async fn health_providers(State(state): State<AppState>) -> Json<Value> {
	let mut providers = serde_json::Map::new();
	for record in state.registry.list() {
		let health = record.health();
		providers.insert(
			record.name.clone(),
			json!({
				"status": health.status,
				"latency_ms": health.latency_ms,
				"error": health.error,
			}),
		);
	}
	Json(json!({ "providers": providers }))
}

/// `GET /admin/routing/rules` (§6).
async fn admin_routing_rules(State(state): State<AppState>) -> Json<Value> {
	let ruleset = state.routing.load();
	Json(json!({
		"default_provider": ruleset.default_provider,
		"rules": ruleset.rules(),
	}))
}

#[derive(serde::Deserialize)]
struct RoutingTestQuery {
	#[serde(default = "default_test_model")]
	model: String,
	#[serde(default)]
	thinking: bool,
	agent_type: Option<String>,
	#[serde(default)]
	context_tokens: u64,
}

fn default_test_model() -> String {
	"claude-opus-4-5".to_string()
}

/// `GET /admin/routing/test?model=…&thinking=…&agent_type=…&context_tokens=…`
/// (§6): dry-runs the routing engine against a synthetic request.
async fn admin_routing_test(State(state): State<AppState>, Query(query): Query<RoutingTestQuery>) -> Json<Value> {
	use crate::types::messages::{Thinking, ThinkingType};

	let request = MessagesRequest {
		model: query.model.clone(),
		messages: vec![],
		system: None,
		tools: None,
		tool_choice: None,
		thinking: query.thinking.then_some(Thinking::Config {
			kind: ThinkingType::Enabled,
			budget_tokens: None,
		}),
		max_tokens: None,
		temperature: None,
		top_p: None,
		top_k: None,
		stop_sequences: None,
		stream: false,
		metadata: None,
	};

	let ruleset = state.routing.load();
	let provider = ruleset.select_provider(&request, query.agent_type.as_deref(), query.context_tokens);
	let fallback = ruleset.matching_fallback(&request, query.agent_type.as_deref(), query.context_tokens);

	Json(json!({
		"input": {
			"model": query.model,
			"thinking": query.thinking,
			"agent_type": query.agent_type,
			"context_tokens": query.context_tokens,
		},
		"result": {
			"provider": provider,
			"fallback_provider": fallback,
		},
	}))
}

/// `GET /admin/providers` (§6): every registered provider plus its health.
async fn admin_providers(State(state): State<AppState>) -> Json<Value> {
	let mut providers = HashMap::new();
	for record in state.registry.list() {
		let health = record.health();
		providers.insert(
			record.name.clone(),
			json!({
				"api_format": record.provider.api_format(),
				"health": {
					"status": health.status,
					"latency_ms": health.latency_ms,
					"error": health.error,
				},
			}),
		);
	}
	Json(json!({ "providers": providers }))
}

/// `POST /admin/providers/{name}/test` (§6): triggers an on-demand health
/// probe and reports the classified result.
async fn admin_provider_test(State(state): State<AppState>, Path(name): Path<String>) -> Response {
	match state.registry.check_health(&name).await {
		Ok(health) => Json(json!({
			"provider": name,
			"success": health.status == crate::registry::HealthStatus::Healthy,
			"health": {
				"status": health.status,
				"latency_ms": health.latency_ms,
				"error": health.error,
			},
		}))
		.into_response(),
		Err(_) => (StatusCode::NOT_FOUND, Json(json!({ "error": format!("provider '{name}' not found") }))).into_response(),
	}
}

#[derive(serde::Deserialize)]
struct StatsQuery {
	#[serde(default = "default_stats_hours")]
	hours: u32,
}

fn default_stats_hours() -> u32 {
	24
}

/// `GET /admin/stats?hours=N` (§6): the debug-capture persistence layer is
/// out of scope for the core (§1), so this always reports the
/// zeroed/empty shape rather than querying a store that doesn't exist here.
async fn admin_stats(Query(query): Query<StatsQuery>) -> Json<Value> {
	Json(json!({
		"period_hours": query.hours,
		"requests": { "total": 0, "success": 0, "errors": 0 },
		"latency": { "avg_ms": Value::Null },
		"tokens": { "input": 0, "output": 0 },
		"by_provider": {},
	}))
}
