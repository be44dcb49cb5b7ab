//! Aggregator-level error types shared across fetchers, the proxy, crypto, and stores.

// self
use crate::{_prelude::*, auth::EnvironmentId};

/// Aggregator-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical aggregator error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration or request-shape problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Remote document could not be fetched.
	#[error(transparent)]
	Fetch(#[from] crate::fetch::FetchError),
	/// Stored secret could not be used.
	#[error(transparent)]
	Crypto(#[from] crate::crypto::CryptoError),
	/// Proxied call never produced a response.
	#[error(transparent)]
	Gateway(#[from] crate::proxy::GatewayError),

	/// Referenced record does not exist.
	#[error("{what} `{id}` was not found.")]
	NotFound {
		/// Record kind (environment, secrets).
		what: &'static str,
		/// Identifier that failed to resolve.
		id: String,
	},
	/// Neither a stored nor an inline signing secret is available.
	#[error("No JWT secret is stored for this environment and none was supplied inline.")]
	NoSecretConfigured {
		/// Environment the token was requested for, if any.
		environment: Option<EnvironmentId>,
	},
}
impl Error {
	/// Classifies the failure so an HTTP layer can pick a response status.
	pub fn class(&self) -> ErrorClass {
		match self {
			Self::Fetch(e) if e.is_timeout() => ErrorClass::GatewayTimeout,
			Self::Fetch(_) => ErrorClass::BadGateway,
			Self::Gateway(crate::proxy::GatewayError::TimedOut { .. }) =>
				ErrorClass::GatewayTimeout,
			Self::Gateway(_) => ErrorClass::BadGateway,
			Self::Crypto(_) => ErrorClass::SecretUnusable,
			Self::Config(e) if e.is_request_error() => ErrorClass::BadRequest,
			Self::Config(_) | Self::Storage(_) => ErrorClass::Internal,
			Self::NotFound { .. } => ErrorClass::NotFound,
			Self::NoSecretConfigured { .. } => ErrorClass::BadRequest,
		}
	}
}

/// Coarse failure classes reported to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
	/// Upstream target is down, refused the connection, or returned garbage.
	BadGateway,
	/// Upstream target did not answer within the configured timeout.
	GatewayTimeout,
	/// A stored secret exists but cannot be decrypted or used.
	SecretUnusable,
	/// Referenced record does not exist.
	NotFound,
	/// Caller supplied an unusable request.
	BadRequest,
	/// Local failure unrelated to the request.
	Internal,
}
impl ErrorClass {
	/// HTTP status conventionally used for the class.
	pub const fn http_status(self) -> u16 {
		match self {
			ErrorClass::BadGateway => 502,
			ErrorClass::GatewayTimeout => 504,
			ErrorClass::SecretUnusable => 500,
			ErrorClass::NotFound => 404,
			ErrorClass::BadRequest => 400,
			ErrorClass::Internal => 500,
		}
	}
}

/// Configuration and validation failures raised by the aggregator.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A URL could not be parsed.
	#[error("URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL text.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP method token is not valid.
	#[error("HTTP method `{method}` is invalid.")]
	InvalidMethod {
		/// Offending method text.
		method: String,
	},
	/// Header name or value cannot be sent.
	#[error("Header `{name}` is invalid.")]
	InvalidHeader {
		/// Offending header name.
		name: String,
	},
	/// JSON request body could not be encoded.
	#[error("Request body could not be encoded as JSON.")]
	InvalidBody(#[source] serde_json::Error),
	/// Signing algorithm is not an HMAC algorithm supported by the generator.
	#[error("Signing algorithm `{algorithm}` is not supported.")]
	UnsupportedAlgorithm {
		/// Offending algorithm label.
		algorithm: String,
	},
	/// Token lifetime must be positive.
	#[error("Token lifetime must be a positive number of hours.")]
	NonPositiveExpiry,

	/// A configured duration must be positive.
	#[error("Configured `{field}` must be positive.")]
	NonPositiveDuration {
		/// Configuration field name.
		field: &'static str,
	},
	/// Key derivation needs at least one iteration.
	#[error("Key derivation iteration count must be positive.")]
	ZeroKdfIterations,
	/// Required environment variable is absent.
	#[error("Environment variable `{var}` is not set.")]
	MissingEnv {
		/// Variable name.
		var: &'static str,
	},
	/// Environment variable holds an unusable value.
	#[error("Environment variable `{var}` has an invalid value.")]
	InvalidEnv {
		/// Variable name.
		var: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}

	/// Returns `true` when the failure stems from caller-supplied input.
	pub fn is_request_error(&self) -> bool {
		matches!(
			self,
			Self::InvalidUrl { .. }
				| Self::InvalidMethod { .. }
				| Self::InvalidHeader { .. }
				| Self::InvalidBody(_)
				| Self::UnsupportedAlgorithm { .. }
				| Self::NonPositiveExpiry
		)
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}
