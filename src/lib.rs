//! Aggregate OpenAPI documents across service environments, keep per-user secrets encrypted
//! at rest, mint service tokens on demand, and proxy authenticated calls to target services.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod aggregator;
pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod crypto;
pub mod endpoint;
pub mod error;
pub mod fetch;
pub mod http;
pub mod obs;
pub mod proxy;
pub mod store;
pub mod token;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		aggregator::Aggregator,
		auth::{EnvironmentId, ServiceId, UserAccount, UserId},
		catalog::Environment,
		config::AggregatorConfig,
		store::MemoryStore,
	};

	/// Master key shared by test configurations.
	pub const TEST_MASTER_KEY: &str = "test-master-key";
	/// Iteration count used by test configurations so key derivation stays fast.
	pub const TEST_KDF_ITERATIONS: u32 = 1_000;

	/// Builds a configuration with a fixed master key and a cheap key-derivation cost.
	pub fn test_config() -> AggregatorConfig {
		AggregatorConfig::builder(TEST_MASTER_KEY)
			.kdf_iterations(TEST_KDF_ITERATIONS)
			.build()
			.expect("Test configuration should be valid.")
	}

	/// Constructs an [`Aggregator`] wired to a shared in-memory store.
	pub fn build_test_aggregator(config: AggregatorConfig) -> (Aggregator, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());
		let aggregator =
			Aggregator::new(config, store.clone(), store.clone(), store.clone())
				.expect("Test aggregator should build.");

		(aggregator, store)
	}

	/// Builds an environment fixture that points at `base_url`.
	pub fn test_environment(id: &str, base_url: &str) -> Environment {
		Environment::new(
			EnvironmentId::new(id).expect("Environment fixture identifier should be valid."),
			ServiceId::new("svc-fixture").expect("Service fixture identifier should be valid."),
			"dev",
			base_url,
		)
	}

	/// Builds a user fixture with a freshly generated salt.
	pub fn test_user(id: &str) -> UserAccount {
		UserAccount::new(UserId::new(id).expect("User fixture identifier should be valid."))
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		hash::Hash,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::RwLock;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::{Map as JsonMap, Value as JsonValue};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use serde_json;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
