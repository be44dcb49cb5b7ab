mod common;

// std
use std::time::Duration as StdDuration;
// crates.io
use httpmock::prelude::*;
use serde_json::json;
use time::Duration;
// self
use swagger_aggregator::{
	aggregator::{Aggregator, SecretUpdate},
	auth::{SecretString, UserAccount},
	config::AggregatorConfig,
	error::{Error, ErrorClass},
	proxy::{AuthMode, GatewayError, ProxyBody, ProxyRequest},
	store::MemoryStore,
};

async fn with_stored_admin_password(
	env_id: &str,
	base_url: &str,
	password: &str,
) -> (Aggregator, std::sync::Arc<MemoryStore>, UserAccount) {
	let (aggregator, store) = common::aggregator(common::config());
	let user = common::user("user-proxy");

	store.insert_environment(common::environment(env_id, base_url));
	aggregator
		.save_secrets(&user, &common::env_id(env_id), SecretUpdate {
			jwt_secret: None,
			admin_password: Some(password.into()),
		})
		.await
		.expect("Admin password should be saved.");

	(aggregator, store, user)
}

#[tokio::test]
async fn jwt_mode_injects_bearer_and_returns_target_answer() {
	let server = MockServer::start_async().await;
	let (aggregator, _) = common::aggregator(common::config());
	let user = common::user("user-jwt");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/items").header("authorization", "Bearer inline-token");
			then.status(200).header("x-trace", "abc").body("[1,2,3]");
		})
		.await;
	let mut request = ProxyRequest::new(server.url("/items"));

	request.auth_mode = Some(AuthMode::Jwt);
	request.jwt_token = Some(SecretString::new("inline-token"));

	let result = aggregator.execute_proxy(&user, request).await.expect("Proxy call should work.");

	assert_eq!(result.status_code, 200);
	assert_eq!(result.body, "[1,2,3]");
	assert_eq!(result.headers.get("x-trace").map(String::as_str), Some("abc"));
	assert_eq!(result.request_url, server.url("/items"));

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn custom_authorization_header_overrides_injected_token() {
	let server = MockServer::start_async().await;
	let (aggregator, _) = common::aggregator(common::config());
	let user = common::user("user-override");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/secure").header("authorization", "Bearer custom");
			then.status(204);
		})
		.await;
	let mut request = ProxyRequest::new(server.url("/secure"));

	request.auth_mode = Some(AuthMode::Jwt);
	request.jwt_token = Some(SecretString::new("injected"));
	request.headers.insert("Authorization".into(), "Bearer custom".into());

	let result = aggregator.execute_proxy(&user, request).await.expect("Proxy call should work.");

	assert_eq!(result.status_code, 204);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn admin_mode_uses_stored_password_in_query_and_header() {
	let server = MockServer::start_async().await;
	let (aggregator, _, user) =
		with_stored_admin_password("env-admin", &server.base_url(), "stored-admin").await;
	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/admin/reset")
				.query_param("admin_password", "stored-admin")
				.header("x-admin-password", "stored-admin")
				.header("content-type", "application/json")
				.json_body(json!({ "confirm": true }));
			then.status(202).body("queued");
		})
		.await;
	let mut request = ProxyRequest::new(server.url("/admin/reset"));

	request.method = "post".into();
	request.auth_mode = Some(AuthMode::Admin);
	request.environment = Some(common::env_id("env-admin"));
	request.body = Some(ProxyBody::Json(json!({ "confirm": true })));

	let result = aggregator.execute_proxy(&user, request).await.expect("Proxy call should work.");

	assert_eq!(result.status_code, 202);
	assert_eq!(result.body, "queued");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn caller_admin_query_param_is_preserved() {
	let server = MockServer::start_async().await;
	let (aggregator, _, user) =
		with_stored_admin_password("env-query", &server.base_url(), "stored-admin").await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/admin/stats")
				.query_param("admin_password", "caller-value")
				.header("x-admin-password", "stored-admin");
			then.status(200);
		})
		.await;
	let mut request = ProxyRequest::new(server.url("/admin/stats"));

	request.auth_mode = Some(AuthMode::Admin);
	request.environment = Some(common::env_id("env-query"));
	request.query_params.insert("admin_password".into(), "caller-value".into());

	aggregator.execute_proxy(&user, request).await.expect("Proxy call should work.");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn inline_admin_password_wins_over_stored() {
	let server = MockServer::start_async().await;
	let (aggregator, _, user) =
		with_stored_admin_password("env-inline-admin", &server.base_url(), "stored-admin").await;
	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/admin").header("x-admin-password", "inline-admin");
			then.status(200);
		})
		.await;
	let mut request = ProxyRequest::new(server.url("/admin"));

	request.auth_mode = Some(AuthMode::Admin);
	request.environment = Some(common::env_id("env-inline-admin"));
	request.admin_password = Some(SecretString::new("inline-admin"));

	aggregator.execute_proxy(&user, request).await.expect("Proxy call should work.");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn undecryptable_admin_password_means_no_injection() {
	let server = MockServer::start_async().await;
	let (_, store, user) =
		with_stored_admin_password("env-rotated", &server.base_url(), "stored-admin").await;
	let rotated = Aggregator::new(
		AggregatorConfig::builder("rotated-master-key")
			.kdf_iterations(1_000)
			.build()
			.expect("Rotated configuration should be valid."),
		store.clone(),
		store.clone(),
		store.clone(),
	)
	.expect("Rotated aggregator should build.");
	let mock = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/admin")
				.query_param_missing("admin_password")
				.header_missing("x-admin-password");
			then.status(401).body("unauthorized");
		})
		.await;
	let mut request = ProxyRequest::new(server.url("/admin"));

	request.auth_mode = Some(AuthMode::Admin);
	request.environment = Some(common::env_id("env-rotated"));

	let result = rotated.execute_proxy(&user, request).await.expect("Call should still go out.");

	assert_eq!(result.status_code, 401, "Non-2xx answers are ordinary results.");
	assert_eq!(result.body, "unauthorized");

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn raw_body_and_redirects_are_forwarded() {
	let server = MockServer::start_async().await;
	let (aggregator, _) = common::aggregator(common::config());
	let user = common::user("user-raw");

	server
		.mock_async(|when, then| {
			when.method(GET).path("/old");
			then.status(302).header("location", "/new");
		})
		.await;

	let moved = server
		.mock_async(|when, then| {
			when.method(GET).path("/new");
			then.status(200).body("moved here");
		})
		.await;
	let result = aggregator
		.execute_proxy(&user, ProxyRequest::new(server.url("/old")))
		.await
		.expect("Redirected call should work.");

	assert_eq!(result.body, "moved here");

	moved.assert_calls_async(1).await;

	let raw = server
		.mock_async(|when, then| {
			when.method(PUT).path("/raw").body("plain=text").header_missing("content-type");
			then.status(200);
		})
		.await;
	let mut request = ProxyRequest::new(server.url("/raw"));

	request.method = "PUT".into();
	request.body = Some(ProxyBody::Raw("plain=text".into()));

	aggregator.execute_proxy(&user, request).await.expect("Raw call should work.");

	raw.assert_calls_async(1).await;
}

#[tokio::test]
async fn refused_connection_and_timeout_are_distinct_gateway_errors() {
	let (aggregator, _) =
		common::aggregator(common::config_with_timeout(Duration::milliseconds(500)));
	let user = common::user("user-gateway");
	let err = aggregator
		.execute_proxy(&user, ProxyRequest::new(format!("{}/x", common::closed_base_url())))
		.await
		.expect_err("Closed port should fail.");

	assert!(matches!(err, Error::Gateway(GatewayError::CannotConnect { .. })), "Got {err:?}.");
	assert_eq!(err.class(), ErrorClass::BadGateway);
	assert_eq!(err.to_string(), "Cannot connect to target service. Is it running?");

	let server = MockServer::start_async().await;

	server
		.mock_async(|when, then| {
			when.method(GET).path("/slow");
			then.status(200).delay(StdDuration::from_secs(3));
		})
		.await;

	let err = aggregator
		.execute_proxy(&user, ProxyRequest::new(server.url("/slow")))
		.await
		.expect_err("Slow target should time out.");

	assert!(matches!(err, Error::Gateway(GatewayError::TimedOut { .. })), "Got {err:?}.");
	assert_eq!(err.class(), ErrorClass::GatewayTimeout);
}

#[tokio::test]
async fn invalid_target_url_is_a_bad_request() {
	let (aggregator, _) = common::aggregator(common::config());
	let err = aggregator
		.execute_proxy(&common::user("user-bad"), ProxyRequest::new("not a url"))
		.await
		.expect_err("Unparseable URL should fail.");

	assert_eq!(err.class(), ErrorClass::BadRequest);
}
