//! reqwest transports shared by the document fetcher and the authenticated proxy.
//!
//! Document fetches never follow redirects: a service that redirects its OpenAPI path is
//! reported through the status it actually returned. Proxied calls follow redirects like a
//! browser would. Both clients carry the configured upstream timeout as a total request
//! deadline covering connect, headers, and the full body.

// std
use std::{ops::Deref, time::Duration as StdDuration};
// crates.io
use reqwest::redirect::Policy;
// self
use crate::{_prelude::*, error::ConfigError};

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	///
	/// The caller owns the redirect and timeout policy of a custom client.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds the client used for document fetches: total timeout, no redirect following.
	pub fn for_fetch(timeout: StdDuration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().timeout(timeout).redirect(Policy::none()).build()?;

		Ok(Self(client))
	}

	/// Builds the client used for proxied calls: total timeout, default redirect policy.
	pub fn for_proxy(timeout: StdDuration) -> Result<Self, ConfigError> {
		let client = ReqwestClient::builder().timeout(timeout).build()?;

		Ok(Self(client))
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Coarse classification of a transport error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum TransportFailure {
	/// The TCP/TLS connection could not be established.
	Connect,
	/// The request deadline elapsed.
	Timeout,
	/// Anything else; the message never includes the request URL.
	Other(String),
}
impl From<ReqwestError> for TransportFailure {
	fn from(e: ReqwestError) -> Self {
		// A deadline that expires during connect reports both flags.
		if e.is_timeout() {
			Self::Timeout
		} else if e.is_connect() {
			Self::Connect
		} else {
			Self::Other(describe(e.without_url()))
		}
	}
}

fn describe(e: ReqwestError) -> String {
	let mut message = e.to_string();
	let mut source = StdError::source(&e);

	while let Some(inner) = source {
		message.push_str(": ");
		message.push_str(&inner.to_string());

		source = inner.source();
	}

	message
}

#[cfg(test)]
mod tests {
	// std
	use std::net::TcpListener;
	// self
	use super::*;

	fn closed_port_url() -> String {
		let listener = TcpListener::bind("127.0.0.1:0").expect("Ephemeral port should bind.");
		let port = listener.local_addr().expect("Listener should have an address.").port();

		drop(listener);

		format!("http://127.0.0.1:{port}/openapi.json")
	}

	#[tokio::test]
	async fn refused_connection_classifies_as_connect() {
		let client = ReqwestHttpClient::for_fetch(StdDuration::from_secs(5))
			.expect("Fetch client should build.");
		let err = client.get(closed_port_url()).send().await.expect_err("Port should be closed.");

		assert_eq!(TransportFailure::from(err), TransportFailure::Connect);
	}

	#[test]
	fn wrapped_client_derefs_to_reqwest() {
		let inner = ReqwestClient::new();
		let wrapped = ReqwestHttpClient::with_client(inner);

		let _: &ReqwestClient = wrapped.as_ref();
		let _ = wrapped.get("http://127.0.0.1/").build().expect("Request should build.");
	}
}
