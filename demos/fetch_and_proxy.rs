//! Fetches an OpenAPI document from a mock target, lists its endpoints, stores an admin
//! password, and proxies an admin call that receives the password automatically.

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use serde_json::json;
// self
use swagger_aggregator::{
	_preludet::*,
	aggregator::SecretUpdate,
	auth::EnvironmentId,
	catalog::SpecKind,
	proxy::{AuthMode, ProxyRequest},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let spec_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/openapi.json");
			then.status(200).json_body(json!({
				"openapi": "3.1.0",
				"paths": {
					"/admin/reindex": { "post": { "summary": "Rebuild the search index" } },
					"/health": { "get": { "summary": "Liveness probe" } }
				}
			}));
		})
		.await;
	let admin_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/admin/reindex").header("x-admin-password", "demo-admin");
			then.status(202).body("reindex queued");
		})
		.await;
	let (aggregator, store) = build_test_aggregator(test_config());
	let env = EnvironmentId::new("demo-dev")?;
	let user = test_user("demo-user");

	store.insert_environment(test_environment("demo-dev", &server.base_url()));

	for endpoint in aggregator.list_endpoints(&env, SpecKind::Main).await? {
		println!("{} {} ({}).", endpoint.method, endpoint.path, endpoint.summary);
	}

	aggregator
		.save_secrets(&user, &env, SecretUpdate {
			jwt_secret: None,
			admin_password: Some("demo-admin".into()),
		})
		.await?;

	let mut request = ProxyRequest::new(server.url("/admin/reindex"));

	request.method = "POST".into();
	request.auth_mode = Some(AuthMode::Admin);
	request.environment = Some(env);

	let result = aggregator.execute_proxy(&user, request).await?;

	println!("Target answered {} in {}ms: {}.", result.status_code, result.elapsed_ms, result.body);

	spec_mock.assert_async().await;
	admin_mock.assert_async().await;

	Ok(())
}
