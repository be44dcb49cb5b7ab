//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::{net::TcpListener, sync::Arc};
// crates.io
use time::Duration;
// self
use swagger_aggregator::{
	aggregator::Aggregator,
	auth::{EnvironmentId, ServiceId, UserAccount, UserId},
	catalog::Environment,
	config::AggregatorConfig,
	store::MemoryStore,
};

pub const MASTER_KEY: &str = "integration-master-key";

pub fn config() -> AggregatorConfig {
	AggregatorConfig::builder(MASTER_KEY)
		.kdf_iterations(1_000)
		.build()
		.expect("Integration configuration should be valid.")
}

pub fn config_with_timeout(timeout: Duration) -> AggregatorConfig {
	AggregatorConfig::builder(MASTER_KEY)
		.kdf_iterations(1_000)
		.upstream_timeout(timeout)
		.build()
		.expect("Integration configuration with a short timeout should be valid.")
}

pub fn aggregator(config: AggregatorConfig) -> (Aggregator, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::default());
	let aggregator = Aggregator::new(config, store.clone(), store.clone(), store.clone())
		.expect("Aggregator should build over the memory store.");

	(aggregator, store)
}

pub fn env_id(id: &str) -> EnvironmentId {
	EnvironmentId::new(id).expect("Environment identifier fixture should be valid.")
}

pub fn environment(id: &str, base_url: &str) -> Environment {
	Environment::new(
		env_id(id),
		ServiceId::new("svc-it").expect("Service identifier fixture should be valid."),
		"dev",
		base_url,
	)
}

pub fn user(id: &str) -> UserAccount {
	UserAccount::new(UserId::new(id).expect("User identifier fixture should be valid."))
}

/// Base URL of a local port with nothing listening on it.
pub fn closed_base_url() -> String {
	let listener = TcpListener::bind("127.0.0.1:0").expect("Ephemeral port should bind.");
	let port = listener.local_addr().expect("Listener should report its address.").port();

	drop(listener);

	format!("http://127.0.0.1:{port}")
}
