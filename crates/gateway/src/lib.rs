//! `a2c-gateway`: translation, routing, and failover for a single inbound
//! Messages-format HTTP surface fronting Messages, Generative-Content, and
//! Chat-Completions upstreams.
//!
//! [`routes::router`] wires the HTTP surface (§6) onto a
//! [`dispatcher::Dispatcher`], which in turn ties together the
//! [`routing::RoutingTable`], [`registry::ProviderRegistry`], and
//! [`failover::FailoverPolicy`]. Wire-format translation lives under
//! [`translate`] and [`streaming`]; [`types`] holds the three formats'
//! on-the-wire shapes.

pub mod config;
pub mod debug;
pub mod dispatcher;
pub mod error;
pub mod failover;
pub mod provider;
pub mod registry;
pub mod routes;
pub mod routing;
pub mod schema;
pub mod sse;
pub mod streaming;
pub mod token_estimator;
pub mod translate;
pub mod types;
