//! Immutable runtime configuration injected into every component at construction.

// std
use std::env;
// self
use crate::{_prelude::*, auth::SecretString, error::ConfigError, token::TokenAlgorithm};

/// Default cache time-to-live for fetched documents.
pub const DEFAULT_CACHE_TTL: Duration = Duration::seconds(600);
/// Default timeout applied to every upstream HTTP call.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::seconds(30);
/// Default PBKDF2 iteration count.
pub const DEFAULT_KDF_ITERATIONS: u32 = 480_000;
/// Default lifetime for generated service tokens, in hours.
pub const DEFAULT_TOKEN_EXPIRE_HOURS: i64 = 24;

/// Runtime configuration shared by the fetcher, cipher, token generator, and proxy.
#[derive(Clone, Debug)]
pub struct AggregatorConfig {
	/// Process-wide master secret mixed into every derived key.
	pub master_key: SecretString,
	/// Maximum age of a cached document before it is re-fetched.
	pub cache_ttl: Duration,
	/// Timeout for document fetches and proxied calls.
	pub upstream_timeout: Duration,
	/// PBKDF2 iteration count.
	pub kdf_iterations: u32,
	/// Default signing algorithm for generated tokens.
	pub token_algorithm: TokenAlgorithm,
	/// Default token lifetime, in hours.
	pub token_expire_hours: i64,
}
impl AggregatorConfig {
	/// Environment variable holding the master encryption key.
	pub const ENV_MASTER_KEY: &'static str = "MASTER_ENCRYPTION_KEY";
	/// Environment variable overriding the cache TTL, in seconds.
	pub const ENV_CACHE_TTL_SECS: &'static str = "SPEC_CACHE_TTL_SECS";
	/// Environment variable overriding the upstream timeout, in seconds.
	pub const ENV_UPSTREAM_TIMEOUT_SECS: &'static str = "UPSTREAM_TIMEOUT_SECS";

	/// Returns a builder seeded with the provided master key and default constants.
	pub fn builder(master_key: impl Into<SecretString>) -> AggregatorConfigBuilder {
		AggregatorConfigBuilder::new(master_key.into())
	}

	/// Loads the configuration from process environment variables.
	///
	/// `MASTER_ENCRYPTION_KEY` is required; the TTL and timeout overrides are optional.
	pub fn from_env() -> Result<Self, ConfigError> {
		let master_key = env::var(Self::ENV_MASTER_KEY)
			.map_err(|_| ConfigError::MissingEnv { var: Self::ENV_MASTER_KEY })?;
		let mut builder = Self::builder(master_key);

		if let Some(secs) = read_secs(Self::ENV_CACHE_TTL_SECS)? {
			builder = builder.cache_ttl(Duration::seconds(secs));
		}
		if let Some(secs) = read_secs(Self::ENV_UPSTREAM_TIMEOUT_SECS)? {
			builder = builder.upstream_timeout(Duration::seconds(secs));
		}

		builder.build()
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if !self.cache_ttl.is_positive() {
			return Err(ConfigError::NonPositiveDuration { field: "cache_ttl" });
		}
		if !self.upstream_timeout.is_positive() {
			return Err(ConfigError::NonPositiveDuration { field: "upstream_timeout" });
		}
		if self.kdf_iterations == 0 {
			return Err(ConfigError::ZeroKdfIterations);
		}
		if self.token_expire_hours <= 0 {
			return Err(ConfigError::NonPositiveExpiry);
		}

		Ok(())
	}

	/// Upstream timeout as a standard library duration for HTTP clients.
	pub(crate) fn upstream_timeout_std(&self) -> std::time::Duration {
		self.upstream_timeout.try_into().unwrap_or(std::time::Duration::from_secs(30))
	}
}

/// Builder for [`AggregatorConfig`] values.
#[derive(Debug)]
pub struct AggregatorConfigBuilder {
	config: AggregatorConfig,
}
impl AggregatorConfigBuilder {
	/// Creates a new builder using the default constants.
	pub fn new(master_key: SecretString) -> Self {
		Self {
			config: AggregatorConfig {
				master_key,
				cache_ttl: DEFAULT_CACHE_TTL,
				upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
				kdf_iterations: DEFAULT_KDF_ITERATIONS,
				token_algorithm: TokenAlgorithm::default(),
				token_expire_hours: DEFAULT_TOKEN_EXPIRE_HOURS,
			},
		}
	}

	/// Overrides the cache TTL.
	pub fn cache_ttl(mut self, ttl: Duration) -> Self {
		self.config.cache_ttl = ttl;

		self
	}

	/// Overrides the upstream timeout.
	pub fn upstream_timeout(mut self, timeout: Duration) -> Self {
		self.config.upstream_timeout = timeout;

		self
	}

	/// Overrides the PBKDF2 iteration count.
	///
	/// Changing it makes previously stored ciphertexts undecryptable.
	pub fn kdf_iterations(mut self, iterations: u32) -> Self {
		self.config.kdf_iterations = iterations;

		self
	}

	/// Overrides the default token signing algorithm.
	pub fn token_algorithm(mut self, algorithm: TokenAlgorithm) -> Self {
		self.config.token_algorithm = algorithm;

		self
	}

	/// Overrides the default token lifetime.
	pub fn token_expire_hours(mut self, hours: i64) -> Self {
		self.config.token_expire_hours = hours;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<AggregatorConfig, ConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

fn read_secs(var: &'static str) -> Result<Option<i64>, ConfigError> {
	match env::var(var) {
		Ok(raw) => raw.trim().parse().map(Some).map_err(|_| ConfigError::InvalidEnv { var }),
		Err(env::VarError::NotPresent) => Ok(None),
		Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidEnv { var }),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_match_published_constants() {
		let config =
			AggregatorConfig::builder("master").build().expect("Defaults should validate.");

		assert_eq!(config.cache_ttl, Duration::minutes(10));
		assert_eq!(config.upstream_timeout, Duration::seconds(30));
		assert_eq!(config.kdf_iterations, 480_000);
		assert_eq!(config.token_algorithm, TokenAlgorithm::Hs256);
		assert_eq!(config.token_expire_hours, 24);
		assert_eq!(config.upstream_timeout_std(), std::time::Duration::from_secs(30));
	}

	#[test]
	fn builder_rejects_non_positive_values() {
		let err = AggregatorConfig::builder("master")
			.cache_ttl(Duration::ZERO)
			.build()
			.expect_err("Zero TTL should be rejected.");

		assert!(matches!(err, ConfigError::NonPositiveDuration { field: "cache_ttl" }));

		let err = AggregatorConfig::builder("master")
			.kdf_iterations(0)
			.build()
			.expect_err("Zero iterations should be rejected.");

		assert!(matches!(err, ConfigError::ZeroKdfIterations));

		let err = AggregatorConfig::builder("master")
			.upstream_timeout(Duration::seconds(-1))
			.build()
			.expect_err("Negative timeout should be rejected.");

		assert!(matches!(err, ConfigError::NonPositiveDuration { field: "upstream_timeout" }));
	}

	#[test]
	fn debug_output_redacts_master_key() {
		let config = AggregatorConfig::builder("very-secret-master").build().expect("Config.");

		assert!(!format!("{config:?}").contains("very-secret-master"));
	}
}
