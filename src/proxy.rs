//! Authenticated forwarding of a single HTTP call to a target service.
//!
//! Auth material is injected before the caller's custom headers are applied, so a custom
//! header always wins on a (case-insensitive) name collision. Non-2xx answers from the target
//! are ordinary results; only failures to obtain any answer become [`GatewayError`]s.

// std
use std::time::Instant;
// crates.io
use reqwest::{
	Method,
	header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
// self
use crate::{
	_prelude::*,
	auth::{EnvironmentId, SecretString, UserAccount},
	crypto::SecretCipher,
	error::ConfigError,
	http::{ReqwestHttpClient, TransportFailure},
	obs,
	store::{SecretStore, StoreError},
};

/// Header carrying the admin password.
pub const ADMIN_PASSWORD_HEADER: &str = "x-admin-password";
/// Query parameter carrying the admin password.
pub const ADMIN_PASSWORD_QUERY: &str = "admin_password";

/// Authentication to inject into a proxied call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
	/// `Authorization: Bearer <jwt_token>` when an inline token is supplied.
	Jwt,
	/// Admin password as query parameter and header, inline or from the secret store.
	Admin,
	/// Nothing injected.
	#[default]
	None,
}

/// Request body forwarded to the target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProxyBody {
	/// Sent verbatim.
	Raw(String),
	/// Encoded as JSON.
	Json(JsonValue),
}

/// Everything needed to issue one proxied call.
#[derive(Clone, Debug, Deserialize)]
pub struct ProxyRequest {
	/// Absolute target URL.
	pub url: String,
	/// HTTP method, case-insensitive.
	#[serde(default = "default_method")]
	pub method: String,
	/// Custom headers; applied after injected auth headers.
	#[serde(default)]
	pub headers: BTreeMap<String, String>,
	/// Query parameters appended to the target URL.
	#[serde(default)]
	pub query_params: BTreeMap<String, String>,
	/// Optional body.
	#[serde(default)]
	pub body: Option<ProxyBody>,
	/// Requested auth injection; absent behaves like [`AuthMode::None`].
	#[serde(default)]
	pub auth_mode: Option<AuthMode>,
	/// Pre-generated bearer token for [`AuthMode::Jwt`].
	#[serde(default)]
	pub jwt_token: Option<SecretString>,
	/// Inline admin password for [`AuthMode::Admin`].
	#[serde(default)]
	pub admin_password: Option<SecretString>,
	/// Environment whose stored admin password is used when none is inline.
	#[serde(default, rename = "environment_id")]
	pub environment: Option<EnvironmentId>,
}
impl ProxyRequest {
	/// Creates a `GET` request to `url` with no auth, headers, or body.
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			url: url.into(),
			method: default_method(),
			headers: BTreeMap::new(),
			query_params: BTreeMap::new(),
			body: None,
			auth_mode: None,
			jwt_token: None,
			admin_password: None,
			environment: None,
		}
	}
}

/// Answer of the target service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyResult {
	/// Status returned by the target, 2xx or not.
	pub status_code: u16,
	/// Response headers; repeated names are joined with `, `.
	pub headers: BTreeMap<String, String>,
	/// Response body decoded as text.
	pub body: String,
	/// Milliseconds from dispatch until the full body was received.
	pub elapsed_ms: u64,
	/// URL that was called, including merged query parameters.
	pub request_url: String,
}

/// The proxied call produced no response.
#[derive(Debug, ThisError)]
pub enum GatewayError {
	/// The target refused or could not accept the connection.
	#[error("Cannot connect to target service. Is it running?")]
	CannotConnect {
		/// Target URL as supplied by the caller.
		url: String,
	},
	/// The target did not answer within the upstream timeout.
	#[error("Target service timed out ({}s limit).", .timeout.whole_seconds())]
	TimedOut {
		/// Target URL as supplied by the caller.
		url: String,
		/// Timeout that elapsed.
		timeout: Duration,
	},
	/// Any other transport failure.
	#[error("Request failed: {message}")]
	Failed {
		/// Target URL as supplied by the caller.
		url: String,
		/// Transport-supplied description.
		message: String,
	},
}
impl GatewayError {
	/// Target URL of the failed call.
	pub fn url(&self) -> &str {
		match self {
			Self::CannotConnect { url } | Self::TimedOut { url, .. } | Self::Failed { url, .. } =>
				url,
		}
	}
}

/// Auth material resolved for one call.
#[derive(Clone, Debug, Default)]
pub struct ResolvedAuth {
	/// Bearer token to send in `Authorization`.
	pub bearer: Option<SecretString>,
	/// Admin password to send as query parameter and header.
	pub admin_password: Option<SecretString>,
}

/// Fully assembled outbound call; no I/O has happened yet.
#[derive(Debug)]
pub struct PreparedRequest {
	/// Uppercase method.
	pub method: Method,
	/// Target URL with query parameters merged in.
	pub url: Url,
	/// Outbound headers after auth injection and custom overrides.
	pub headers: HeaderMap,
	/// Encoded body, if any.
	pub body: Option<Vec<u8>>,
}
impl PreparedRequest {
	/// Assembles the outbound call from the caller's request and the resolved auth.
	///
	/// Order matters: injected auth headers go in first, then the JSON content type, then the
	/// caller's headers, each insert replacing any earlier value with the same name. Query
	/// parameters already on the URL are merged with `query_params` (the latter wins per key),
	/// and the admin query parameter is only added when neither source set it.
	pub fn build(request: &ProxyRequest, auth: ResolvedAuth) -> Result<Self, ConfigError> {
		let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
			.map_err(|_| ConfigError::InvalidMethod { method: request.method.clone() })?;
		let mut url = Url::parse(&request.url)
			.map_err(|source| ConfigError::InvalidUrl { url: request.url.clone(), source })?;
		let mut query = url.query_pairs().into_owned().collect::<BTreeMap<_, _>>();

		query.extend(request.query_params.iter().map(|(k, v)| (k.clone(), v.clone())));

		let mut headers = HeaderMap::new();
		if let Some(token) = &auth.bearer {
			let bearer = format!("Bearer {}", token.expose());

			headers.insert(AUTHORIZATION, sensitive(&bearer, AUTHORIZATION.as_str())?);
		}
		if let Some(password) = &auth.admin_password {
			query
				.entry(ADMIN_PASSWORD_QUERY.to_owned())
				.or_insert_with(|| password.expose().to_owned());
			headers.insert(
				HeaderName::from_static(ADMIN_PASSWORD_HEADER),
				sensitive(password.expose(), ADMIN_PASSWORD_HEADER)?,
			);
		}

		let body = match &request.body {
			Some(ProxyBody::Json(value)) => {
				headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

				Some(serde_json::to_vec(value).map_err(ConfigError::InvalidBody)?)
			},
			Some(ProxyBody::Raw(text)) => Some(text.clone().into_bytes()),
			None => None,
		};

		for (name, value) in &request.headers {
			let invalid = || ConfigError::InvalidHeader { name: name.clone() };
			let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
			let value = HeaderValue::from_str(value).map_err(|_| invalid())?;

			headers.insert(name, value);
		}

		url.set_query(None);

		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(&query);
		}

		Ok(Self { method, url, headers, body })
	}
}

/// Executes proxied calls, resolving stored admin passwords through the secret store.
#[derive(Clone)]
pub struct AuthenticatedProxy {
	http: ReqwestHttpClient,
	secrets: Arc<dyn SecretStore>,
	cipher: SecretCipher,
	timeout: Duration,
}
impl AuthenticatedProxy {
	/// Creates a proxy over the provided transport and secret store.
	///
	/// `timeout` is reported in [`GatewayError::TimedOut`]; the transport enforces it.
	pub fn new(
		http: ReqwestHttpClient,
		secrets: Arc<dyn SecretStore>,
		cipher: SecretCipher,
		timeout: Duration,
	) -> Self {
		Self { http, secrets, cipher, timeout }
	}

	/// Resolves auth for `request` according to its [`AuthMode`].
	///
	/// Empty inline values count as absent. For `admin`, a store failure is an error while a
	/// missing or undecryptable stored password simply resolves to none.
	pub async fn resolve_auth(
		&self,
		user: &UserAccount,
		request: &ProxyRequest,
	) -> Result<ResolvedAuth, StoreError> {
		let mut auth = ResolvedAuth::default();

		match request.auth_mode.unwrap_or_default() {
			AuthMode::Jwt => auth.bearer = non_empty(request.jwt_token.as_ref()),
			AuthMode::Admin => {
				let inline = non_empty(request.admin_password.as_ref());

				auth.admin_password = match (inline, &request.environment) {
					(Some(inline), _) => Some(inline),
					(None, Some(environment)) =>
						self.stored_admin_password(user, environment).await?,
					(None, None) => None,
				};
			},
			AuthMode::None => (),
		}

		Ok(auth)
	}

	/// Loads and decrypts the user's stored admin password for `environment`.
	///
	/// Returns `Ok(None)` when no record or no password exists, or when the stored value cannot
	/// be decrypted (after emitting a warning). Store failures propagate.
	pub async fn stored_admin_password(
		&self,
		user: &UserAccount,
		environment: &EnvironmentId,
	) -> Result<Option<SecretString>, StoreError> {
		let record = <dyn SecretStore>::fetch(self.secrets.as_ref(), &user.id, environment).await?;
		let Some(ciphertext) = record.and_then(|record| record.admin_password) else {
			return Ok(None);
		};

		match self.cipher.decrypt(&ciphertext, &user.salt) {
			Ok(password) => Ok(Some(password)),
			Err(_) => {
				obs::warn_unusable_admin_password(environment);

				Ok(None)
			},
		}
	}

	/// Issues exactly one call to the target and returns whatever it answered.
	pub async fn execute(&self, user: &UserAccount, request: ProxyRequest) -> Result<ProxyResult> {
		let auth = self.resolve_auth(user, &request).await?;
		let prepared = PreparedRequest::build(&request, auth)?;
		let request_url = prepared.url.to_string();
		let mut builder =
			self.http.request(prepared.method, prepared.url).headers(prepared.headers);

		if let Some(body) = prepared.body {
			builder = builder.body(body);
		}

		let started = Instant::now();
		let response = builder.send().await.map_err(|e| self.gateway(&request.url, e))?;
		let status_code = response.status().as_u16();
		let headers = flatten_headers(response.headers());
		let body = response.text().await.map_err(|e| self.gateway(&request.url, e))?;
		let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

		Ok(ProxyResult { status_code, headers, body, elapsed_ms, request_url })
	}

	fn gateway(&self, url: &str, e: ReqwestError) -> GatewayError {
		let url = url.to_owned();

		match TransportFailure::from(e) {
			TransportFailure::Connect => GatewayError::CannotConnect { url },
			TransportFailure::Timeout => GatewayError::TimedOut { url, timeout: self.timeout },
			TransportFailure::Other(message) => GatewayError::Failed { url, message },
		}
	}
}
impl Debug for AuthenticatedProxy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedProxy").field("timeout", &self.timeout).finish()
	}
}

fn default_method() -> String {
	"GET".into()
}

fn non_empty(secret: Option<&SecretString>) -> Option<SecretString> {
	secret.filter(|secret| !secret.is_empty()).cloned()
}

fn sensitive(value: &str, name: &str) -> Result<HeaderValue, ConfigError> {
	let mut value =
		HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader { name: name.into() })?;

	value.set_sensitive(true);

	Ok(value)
}

fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
	let mut flat = BTreeMap::<String, String>::new();

	for (name, value) in headers {
		let value = String::from_utf8_lossy(value.as_bytes());

		flat.entry(name.as_str().to_owned())
			.and_modify(|joined| {
				joined.push_str(", ");
				joined.push_str(&value);
			})
			.or_insert_with(|| value.into_owned());
	}

	flat
}
