//! Remote OpenAPI document retrieval with read-through/write-through caching.

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	cache::{CachedSpec, SpecCache, SpecDocument},
	catalog::{Environment, SpecKind},
	http::{ReqwestHttpClient, TransportFailure},
	obs::{self, CacheLookup},
};

/// Failures raised while fetching a remote document. Every variant carries the URL.
#[derive(Debug, ThisError)]
pub enum FetchError {
	/// The target could not be reached.
	#[error("Cannot connect to `{url}`.")]
	Connection {
		/// Document URL.
		url: String,
	},
	/// The target did not answer within the upstream timeout.
	#[error("Timed out fetching `{url}`.")]
	Timeout {
		/// Document URL.
		url: String,
	},
	/// The target answered with a non-2xx status.
	#[error("Fetching `{url}` returned HTTP {status}.")]
	HttpStatus {
		/// Document URL.
		url: String,
		/// Status code returned by the target.
		status: u16,
	},
	/// A 2xx body that is not a usable document: unparseable JSON, not an object, or a
	/// `paths` member that is not an object.
	#[error("Document at `{url}` is not an OpenAPI object: {reason}.")]
	InvalidBody {
		/// Document URL.
		url: String,
		/// Which check failed.
		reason: &'static str,
		/// Structured parsing failure, including the path where parsing stopped.
		#[source]
		source: Option<serde_path_to_error::Error<serde_json::Error>>,
	},
	/// Any other transport failure (body read, protocol error).
	#[error("Fetching `{url}` failed: {message}.")]
	Transport {
		/// Document URL.
		url: String,
		/// Transport-supplied description.
		message: String,
	},
}
impl FetchError {
	/// URL the failed fetch targeted.
	pub fn url(&self) -> &str {
		match self {
			Self::Connection { url }
			| Self::Timeout { url }
			| Self::HttpStatus { url, .. }
			| Self::InvalidBody { url, .. }
			| Self::Transport { url, .. } => url,
		}
	}

	/// Returns `true` when the body could not be parsed as JSON at all.
	pub fn is_malformed_json(&self) -> bool {
		matches!(self, Self::InvalidBody { source: Some(_), .. })
	}

	/// Returns `true` when the target did not answer in time.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}

	fn transport(url: &Url, e: ReqwestError) -> Self {
		let url = url.to_string();

		match TransportFailure::from(e) {
			TransportFailure::Connect => Self::Connection { url },
			TransportFailure::Timeout => Self::Timeout { url },
			TransportFailure::Other(message) => Self::Transport { url, message },
		}
	}
}

/// Where a [`FetchResult`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecSource {
	/// Served from a fresh cache entry.
	Cache,
	/// Freshly fetched from the target service.
	Remote,
}

/// Document returned by [`SpecFetcher::fetch`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
	/// The OpenAPI document.
	pub spec: SpecDocument,
	/// UTC instant the document was fetched from the target.
	pub fetched_at: OffsetDateTime,
	/// Whether the document came from the cache or the network.
	pub source: SpecSource,
}
impl FetchResult {
	/// `fetched_at` rendered as RFC 3339.
	pub fn fetched_at_rfc3339(&self) -> String {
		self.fetched_at.format(&Rfc3339).unwrap_or_else(|_| self.fetched_at.to_string())
	}
}

/// Fetches documents from target services, consulting and refreshing the cache.
#[derive(Clone, Debug)]
pub struct SpecFetcher {
	http: ReqwestHttpClient,
	cache: SpecCache,
}
impl SpecFetcher {
	/// Creates a fetcher over the provided transport and cache.
	///
	/// The transport should not follow redirects; see [`ReqwestHttpClient::for_fetch`].
	pub fn new(http: ReqwestHttpClient, cache: SpecCache) -> Self {
		Self { http, cache }
	}

	/// Cache the fetcher reads from and writes to.
	pub fn cache(&self) -> &SpecCache {
		&self.cache
	}

	/// Returns the environment's document, from the cache when fresh and not forced.
	///
	/// A forced or missed lookup performs exactly one GET; on success the cache entry is
	/// replaced with the new document and the current UTC instant. Failures leave the cache
	/// untouched and are never retried here.
	pub async fn fetch(
		&self,
		environment: &Environment,
		kind: SpecKind,
		force_refresh: bool,
	) -> Result<FetchResult> {
		if !force_refresh {
			if let Some(hit) = self.cache.get(&environment.id, kind).await? {
				obs::record_cache_lookup(CacheLookup::Hit);

				return Ok(FetchResult {
					spec: hit.spec,
					fetched_at: hit.fetched_at,
					source: SpecSource::Cache,
				});
			}
		}

		obs::record_cache_lookup(CacheLookup::Miss);

		let url = environment.spec_url(kind)?;
		let spec = self.fetch_remote(&url).await?;
		let fetched_at = OffsetDateTime::now_utc();

		self.cache
			.put(CachedSpec::new(environment.id.clone(), kind, spec.clone(), fetched_at))
			.await?;

		Ok(FetchResult { spec, fetched_at, source: SpecSource::Remote })
	}

	async fn fetch_remote(&self, url: &Url) -> Result<SpecDocument, FetchError> {
		let response =
			self.http.get(url.clone()).send().await.map_err(|e| FetchError::transport(url, e))?;
		let status = response.status();

		if !status.is_success() {
			return Err(FetchError::HttpStatus { url: url.to_string(), status: status.as_u16() });
		}

		let bytes = response.bytes().await.map_err(|e| FetchError::transport(url, e))?;

		parse_document(url, &bytes)
	}
}

/// Validates a fetched body: a JSON object whose `paths`, when present, is also an object.
pub fn parse_document(url: &Url, bytes: &[u8]) -> Result<SpecDocument, FetchError> {
	let mut deserializer = serde_json::Deserializer::from_slice(bytes);
	let value: JsonValue = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| FetchError::InvalidBody {
			url: url.to_string(),
			reason: "body is not valid JSON",
			source: Some(source),
		})?;

	deserializer.end().map_err(|_| FetchError::InvalidBody {
		url: url.to_string(),
		reason: "trailing characters after the document",
		source: None,
	})?;

	let JsonValue::Object(document) = value else {
		return Err(FetchError::InvalidBody {
			url: url.to_string(),
			reason: "top-level value is not an object",
			source: None,
		});
	};

	if document.get("paths").is_some_and(|paths| !paths.is_object()) {
		return Err(FetchError::InvalidBody {
			url: url.to_string(),
			reason: "`paths` is not an object",
			source: None,
		});
	}

	Ok(document)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url() -> Url {
		Url::parse("http://svc.local/openapi.json").expect("Fixture URL should parse.")
	}

	#[test]
	fn accepts_objects_with_or_without_paths() {
		let with_paths = parse_document(&url(), br#"{"openapi":"3.1.0","paths":{"/a":{}}}"#)
			.expect("Object with paths should be accepted.");
		let without_paths =
			parse_document(&url(), br#"{"swagger":"2.0"}"#).expect("Bare object is accepted.");

		assert!(with_paths.contains_key("paths"));
		assert!(!without_paths.contains_key("paths"));
	}

	#[test]
	fn rejects_non_object_shapes() {
		let bodies: [&[u8]; 4] =
			[br#"[1,2,3]"#, br#""openapi""#, br#"{"paths":[]}"#, br#"{"paths":null}"#];

		for body in bodies {
			let err = parse_document(&url(), body).expect_err("Shape check should fail.");

			assert!(matches!(err, FetchError::InvalidBody { .. }), "Unexpected error: {err:?}.");
			assert_eq!(err.url(), "http://svc.local/openapi.json");
		}
	}

	#[test]
	fn unparseable_body_is_invalid_body_with_parse_source() {
		let err = parse_document(&url(), b"<html>oops</html>").expect_err("HTML is not JSON.");

		assert!(matches!(err, FetchError::InvalidBody { source: Some(_), .. }), "Got {err:?}.");
		assert!(err.is_malformed_json());
		assert!(!err.is_timeout());
		assert!(StdError::source(&err).is_some());

		let err = parse_document(&url(), br#"{"paths":[]}"#).expect_err("Shape check should fail.");

		assert!(!err.is_malformed_json());
		assert!(StdError::source(&err).is_none());
	}

	#[test]
	fn document_key_order_is_preserved() {
		let document = parse_document(&url(), br#"{"paths":{"/z":{},"/a":{},"/m":{}}}"#)
			.expect("Document should parse.");
		let paths = document["paths"].as_object().expect("Paths should be an object.");

		assert_eq!(paths.keys().map(String::as_str).collect::<Vec<_>>(), ["/z", "/a", "/m"]);
	}

	#[test]
	fn source_serializes_lowercase() {
		assert_eq!(
			serde_json::to_value(SpecSource::Remote).expect("Source should serialize."),
			serde_json::json!("remote")
		);
	}
}
