//! Facade exposing the aggregator operations to an HTTP layer.
//!
//! [`Aggregator`] owns the fetcher, cipher, token generator, and proxy, and resolves
//! environments and secret records through the persistence contracts it was built with.
//! Every operation runs inside an [`OpSpan`] and records attempt/success/failure counters.

// self
use crate::{
	_prelude::*,
	auth::{EnvironmentId, SecretString, UserAccount},
	cache::SpecCache,
	catalog::{Environment, SpecKind},
	config::AggregatorConfig,
	crypto::SecretCipher,
	endpoint::{self, EndpointInfo},
	fetch::{FetchResult, SpecFetcher},
	http::ReqwestHttpClient,
	obs::{self, OpKind, OpOutcome, OpSpan},
	proxy::{AuthenticatedProxy, ProxyRequest, ProxyResult},
	store::{EnvironmentStore, SecretRecordUpdate, SecretStatus, SecretStore, SpecStore},
	token::{GeneratedToken, SecretSource, TokenGenerator, TokenOptions},
};

/// Plaintext secrets to save; absent fields keep their stored value.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SecretUpdate {
	/// New JWT signing secret.
	#[serde(default)]
	pub jwt_secret: Option<SecretString>,
	/// New admin password.
	#[serde(default)]
	pub admin_password: Option<SecretString>,
}

/// Request for a service token.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenRequest {
	/// Environment whose stored secret signs the token when none is inline.
	#[serde(default, rename = "environment_id")]
	pub environment: Option<EnvironmentId>,
	/// Inline signing secret; takes precedence over the stored one and is never persisted.
	#[serde(default)]
	pub jwt_secret: Option<SecretString>,
	/// Value of the `sub` claim.
	#[serde(rename = "user_id_value")]
	pub subject: String,
	/// Signing options; configuration defaults apply when absent.
	#[serde(default)]
	pub options: Option<TokenOptions>,
}
impl TokenRequest {
	/// Requests a token for `subject` signed with the secret stored for `environment`.
	pub fn stored(environment: EnvironmentId, subject: impl Into<String>) -> Self {
		Self {
			environment: Some(environment),
			jwt_secret: None,
			subject: subject.into(),
			options: None,
		}
	}

	/// Requests a token for `subject` signed with an inline secret.
	pub fn inline(secret: impl Into<SecretString>, subject: impl Into<String>) -> Self {
		Self {
			environment: None,
			jwt_secret: Some(secret.into()),
			subject: subject.into(),
			options: None,
		}
	}
}

/// Entry point for every aggregator operation.
#[derive(Clone)]
pub struct Aggregator {
	config: AggregatorConfig,
	environments: Arc<dyn EnvironmentStore>,
	secrets: Arc<dyn SecretStore>,
	cipher: SecretCipher,
	fetcher: SpecFetcher,
	tokens: TokenGenerator,
	proxy: AuthenticatedProxy,
}
impl Aggregator {
	/// Wires the components against the provided persistence backends.
	///
	/// Builds one HTTP client for document fetches and one for proxied calls, both bounded
	/// by the configured upstream timeout.
	pub fn new(
		config: AggregatorConfig,
		environments: Arc<dyn EnvironmentStore>,
		specs: Arc<dyn SpecStore>,
		secrets: Arc<dyn SecretStore>,
	) -> Result<Self> {
		let timeout = config.upstream_timeout_std();
		let cipher = SecretCipher::from_config(&config);
		let fetcher = SpecFetcher::new(
			ReqwestHttpClient::for_fetch(timeout)?,
			SpecCache::new(specs, config.cache_ttl),
		);
		let proxy = AuthenticatedProxy::new(
			ReqwestHttpClient::for_proxy(timeout)?,
			secrets.clone(),
			cipher.clone(),
			config.upstream_timeout,
		);

		Ok(Self {
			tokens: TokenGenerator::new(cipher.clone()),
			config,
			environments,
			secrets,
			cipher,
			fetcher,
			proxy,
		})
	}

	/// Configuration the aggregator was built with.
	pub fn config(&self) -> &AggregatorConfig {
		&self.config
	}

	/// Returns the environment's document, served from the cache unless `force_refresh`.
	pub async fn fetch_spec(
		&self,
		environment: &EnvironmentId,
		kind: SpecKind,
		force_refresh: bool,
	) -> Result<FetchResult> {
		observe(OpKind::FetchSpec, "fetch_spec", async {
			let environment = self.environment(environment).await?;

			self.fetcher.fetch(&environment, kind, force_refresh).await
		})
		.await
	}

	/// Re-fetches the document from the target, ignoring any cached entry.
	pub async fn refresh_spec(
		&self,
		environment: &EnvironmentId,
		kind: SpecKind,
	) -> Result<FetchResult> {
		self.fetch_spec(environment, kind, true).await
	}

	/// Lists the document's operations in document order.
	pub async fn list_endpoints(
		&self,
		environment: &EnvironmentId,
		kind: SpecKind,
	) -> Result<Vec<EndpointInfo>> {
		observe(OpKind::ListEndpoints, "list_endpoints", async {
			let environment = self.environment(environment).await?;
			let fetched = self.fetcher.fetch(&environment, kind, false).await?;

			Ok(endpoint::parse_endpoints(&fetched.spec))
		})
		.await
	}

	/// Reports which secrets the user has stored for the environment.
	pub async fn secret_status(
		&self,
		user: &UserAccount,
		environment: &EnvironmentId,
	) -> Result<SecretStatus> {
		observe(OpKind::Secrets, "secret_status", async {
			self.environment(environment).await?;

			let record =
				<dyn SecretStore>::fetch(self.secrets.as_ref(), &user.id, environment).await?;

			Ok(record
				.map(|record| record.status())
				.unwrap_or_else(|| SecretStatus::empty(environment.clone())))
		})
		.await
	}

	/// Encrypts and stores the provided secrets, creating the record on first save.
	///
	/// Fields absent from `update` keep their stored value.
	pub async fn save_secrets(
		&self,
		user: &UserAccount,
		environment: &EnvironmentId,
		update: SecretUpdate,
	) -> Result<SecretStatus> {
		observe(OpKind::Secrets, "save_secrets", async {
			self.environment(environment).await?;

			let seal = |secret: Option<SecretString>| {
				secret.map(|secret| self.cipher.encrypt(secret.expose(), &user.salt)).transpose()
			};
			let record = <dyn SecretStore>::merge(self.secrets.as_ref(), SecretRecordUpdate {
				user: user.id.clone(),
				environment: environment.clone(),
				jwt_secret: seal(update.jwt_secret)?,
				admin_password: seal(update.admin_password)?,
				at: OffsetDateTime::now_utc(),
			})
			.await?;

			Ok(record.status())
		})
		.await
	}

	/// Deletes every secret the user stored for the environment.
	pub async fn delete_secrets(
		&self,
		user: &UserAccount,
		environment: &EnvironmentId,
	) -> Result<()> {
		observe(OpKind::Secrets, "delete_secrets", async {
			if <dyn SecretStore>::delete(self.secrets.as_ref(), &user.id, environment).await? {
				Ok(())
			} else {
				Err(Error::NotFound { what: "Secrets", id: environment.to_string() })
			}
		})
		.await
	}

	/// Signs a service token with the inline secret, else the stored one.
	pub async fn generate_token(
		&self,
		user: &UserAccount,
		request: TokenRequest,
	) -> Result<GeneratedToken> {
		observe(OpKind::GenerateToken, "generate_token", async {
			let options =
				request.options.unwrap_or_else(|| TokenOptions::from_config(&self.config));
			let inline = request.jwt_secret.as_ref().filter(|secret| !secret.is_empty());

			if let Some(secret) = inline {
				return self.tokens.generate(
					SecretSource::Inline(secret),
					&request.subject,
					options,
				);
			}

			let no_secret =
				|| Error::NoSecretConfigured { environment: request.environment.clone() };
			let environment = request.environment.as_ref().ok_or_else(no_secret)?;
			let ciphertext = <dyn SecretStore>::fetch(self.secrets.as_ref(), &user.id, environment)
				.await?
				.and_then(|record| record.jwt_secret)
				.ok_or_else(no_secret)?;

			self.tokens.generate(
				SecretSource::Stored { ciphertext: &ciphertext, salt: &user.salt },
				&request.subject,
				options,
			)
		})
		.await
	}

	/// Forwards one call to a target service with the requested auth injected.
	pub async fn execute_proxy(
		&self,
		user: &UserAccount,
		request: ProxyRequest,
	) -> Result<ProxyResult> {
		observe(OpKind::Proxy, "execute_proxy", self.proxy.execute(user, request)).await
	}

	async fn environment(&self, id: &EnvironmentId) -> Result<Environment> {
		<dyn EnvironmentStore>::environment(self.environments.as_ref(), id)
			.await?
			.ok_or_else(|| Error::NotFound { what: "Environment", id: id.to_string() })
	}
}
impl Debug for Aggregator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Aggregator")
			.field("config", &self.config)
			.field("fetcher", &self.fetcher)
			.field("proxy", &self.proxy)
			.finish()
	}
}

async fn observe<T, F>(kind: OpKind, stage: &'static str, fut: F) -> Result<T>
where
	F: Future<Output = Result<T>>,
{
	let span = OpSpan::new(kind, stage);

	obs::record_op_outcome(kind, OpOutcome::Attempt);

	let result = span.instrument(fut).await;

	match &result {
		Ok(_) => obs::record_op_outcome(kind, OpOutcome::Success),
		Err(_) => obs::record_op_outcome(kind, OpOutcome::Failure),
	}

	result
}
