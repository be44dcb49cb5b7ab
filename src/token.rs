//! HMAC-signed service tokens minted from a stored or inline signing secret.
//!
//! These tokens authenticate the aggregator's users against the managed target services; they
//! have nothing to do with how users authenticate to the aggregator itself.

// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	auth::{SecretString, UserSalt},
	config::{AggregatorConfig, DEFAULT_TOKEN_EXPIRE_HOURS},
	crypto::{Ciphertext, CryptoError, SecretCipher},
	error::ConfigError,
};

/// HMAC algorithms supported for service tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenAlgorithm {
	/// HMAC with SHA-256.
	#[default]
	#[serde(rename = "HS256")]
	Hs256,
	/// HMAC with SHA-384.
	#[serde(rename = "HS384")]
	Hs384,
	/// HMAC with SHA-512.
	#[serde(rename = "HS512")]
	Hs512,
}
impl TokenAlgorithm {
	/// JOSE algorithm name.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenAlgorithm::Hs256 => "HS256",
			TokenAlgorithm::Hs384 => "HS384",
			TokenAlgorithm::Hs512 => "HS512",
		}
	}

	fn jose(self) -> Algorithm {
		match self {
			TokenAlgorithm::Hs256 => Algorithm::HS256,
			TokenAlgorithm::Hs384 => Algorithm::HS384,
			TokenAlgorithm::Hs512 => Algorithm::HS512,
		}
	}
}
impl Display for TokenAlgorithm {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for TokenAlgorithm {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		[Self::Hs256, Self::Hs384, Self::Hs512]
			.into_iter()
			.find(|algorithm| algorithm.as_str().eq_ignore_ascii_case(s))
			.ok_or_else(|| ConfigError::UnsupportedAlgorithm { algorithm: s.to_owned() })
	}
}

/// Per-call signing options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenOptions {
	/// Signing algorithm.
	pub algorithm: TokenAlgorithm,
	/// Lifetime in hours; must be positive.
	pub expire_hours: i64,
}
impl TokenOptions {
	/// Options seeded from the configuration defaults.
	pub fn from_config(config: &AggregatorConfig) -> Self {
		Self { algorithm: config.token_algorithm, expire_hours: config.token_expire_hours }
	}
}
impl Default for TokenOptions {
	fn default() -> Self {
		Self { algorithm: TokenAlgorithm::default(), expire_hours: DEFAULT_TOKEN_EXPIRE_HOURS }
	}
}

/// Where the signing secret comes from.
#[derive(Clone, Copy, Debug)]
pub enum SecretSource<'a> {
	/// Encrypted at rest; opened with the caller's salt for this call only.
	Stored {
		/// Sealed secret loaded from the secret store.
		ciphertext: &'a Ciphertext,
		/// Salt of the user who sealed it.
		salt: &'a UserSalt,
	},
	/// Supplied by the caller for this call and never persisted.
	Inline(&'a SecretString),
}

/// Registered claims embedded in every service token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
	/// Subject the target service expects, not necessarily an aggregator user id.
	pub sub: String,
	/// Issued-at, unix seconds.
	pub iat: i64,
	/// Expiry, unix seconds.
	pub exp: i64,
}

/// Human-readable mirror of [`Claims`] with RFC 3339 timestamps.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayPayload {
	/// Subject claim.
	pub sub: String,
	/// Issued-at instant.
	pub iat: String,
	/// Expiry instant.
	pub exp: String,
}

/// Signed token plus its display payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedToken {
	/// Compact JWS.
	pub token: String,
	/// Claims rendered for display; informational only.
	pub payload: DisplayPayload,
}

/// Signs service tokens, decrypting stored secrets through the shared cipher.
#[derive(Clone, Debug)]
pub struct TokenGenerator {
	cipher: SecretCipher,
}
impl TokenGenerator {
	/// Creates a generator that opens stored secrets with `cipher`.
	pub fn new(cipher: SecretCipher) -> Self {
		Self { cipher }
	}

	/// Signs a token for `subject` valid from now for `options.expire_hours`.
	pub fn generate(
		&self,
		source: SecretSource<'_>,
		subject: &str,
		options: TokenOptions,
	) -> Result<GeneratedToken> {
		self.generate_at(source, subject, options, OffsetDateTime::now_utc())
	}

	/// Signs a token issued at `now`.
	pub fn generate_at(
		&self,
		source: SecretSource<'_>,
		subject: &str,
		options: TokenOptions,
		now: OffsetDateTime,
	) -> Result<GeneratedToken> {
		if options.expire_hours <= 0 {
			return Err(ConfigError::NonPositiveExpiry.into());
		}

		let opened;
		let secret = match source {
			SecretSource::Stored { ciphertext, salt } => {
				opened = self.cipher.decrypt(ciphertext, salt)?;

				&opened
			},
			SecretSource::Inline(secret) => secret,
		};
		let issued_at = now.replace_nanosecond(0).unwrap_or(now);
		let expires_at = issued_at + Duration::hours(options.expire_hours);
		let claims = Claims {
			sub: subject.to_owned(),
			iat: issued_at.unix_timestamp(),
			exp: expires_at.unix_timestamp(),
		};
		let token = jsonwebtoken::encode(
			&Header::new(options.algorithm.jose()),
			&claims,
			&EncodingKey::from_secret(secret.expose().as_bytes()),
		)
		.map_err(|e| CryptoError::Signing { message: e.to_string() })?;

		Ok(GeneratedToken {
			token,
			payload: DisplayPayload {
				sub: claims.sub,
				iat: rfc3339(issued_at),
				exp: rfc3339(expires_at),
			},
		})
	}
}

fn rfc3339(at: OffsetDateTime) -> String {
	at.format(&Rfc3339).unwrap_or_else(|_| at.to_string())
}
