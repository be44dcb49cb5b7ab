//! Registered service environments and the document kinds they publish.

// self
use crate::{
	_prelude::*,
	auth::{EnvironmentId, ServiceId},
	error::ConfigError,
};

/// Which OpenAPI document of an environment is addressed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecKind {
	/// Public API document.
	#[default]
	Main,
	/// Administrative API document.
	Admin,
}
impl SpecKind {
	/// Returns a stable label suitable for keys, spans, and query strings.
	pub const fn as_str(self) -> &'static str {
		match self {
			SpecKind::Main => "main",
			SpecKind::Admin => "admin",
		}
	}
}
impl Display for SpecKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for SpecKind {
	type Err = UnknownSpecKind;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"main" => Ok(SpecKind::Main),
			"admin" => Ok(SpecKind::Admin),
			other => Err(UnknownSpecKind(other.to_owned())),
		}
	}
}

/// Error returned when a document kind label is neither `main` nor `admin`.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown document kind `{0}`; expected `main` or `admin`.")]
pub struct UnknownSpecKind(pub String);

/// One deployment of a service with its own base URL and document paths.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
	/// Stable environment identity.
	pub id: EnvironmentId,
	/// Owning service.
	pub service_id: ServiceId,
	/// Display name such as `dev` or `prod`.
	pub name: String,
	/// Base URL of the service in this environment.
	pub base_url: String,
	/// Path of the main document relative to `base_url`.
	pub swagger_path: String,
	/// Path of the admin document relative to `base_url`.
	pub admin_swagger_path: String,
}
impl Environment {
	/// Default main document path.
	pub const DEFAULT_SWAGGER_PATH: &'static str = "/openapi.json";
	/// Default admin document path.
	pub const DEFAULT_ADMIN_SWAGGER_PATH: &'static str = "/admin/openapi.json";

	/// Creates an environment using the default document paths.
	pub fn new(
		id: EnvironmentId,
		service_id: ServiceId,
		name: impl Into<String>,
		base_url: impl Into<String>,
	) -> Self {
		Self {
			id,
			service_id,
			name: name.into(),
			base_url: base_url.into(),
			swagger_path: Self::DEFAULT_SWAGGER_PATH.into(),
			admin_swagger_path: Self::DEFAULT_ADMIN_SWAGGER_PATH.into(),
		}
	}

	/// Overrides the main document path.
	pub fn with_swagger_path(mut self, path: impl Into<String>) -> Self {
		self.swagger_path = path.into();

		self
	}

	/// Overrides the admin document path.
	pub fn with_admin_swagger_path(mut self, path: impl Into<String>) -> Self {
		self.admin_swagger_path = path.into();

		self
	}

	/// Relative path of the requested document.
	pub fn spec_path(&self, kind: SpecKind) -> &str {
		match kind {
			SpecKind::Main => &self.swagger_path,
			SpecKind::Admin => &self.admin_swagger_path,
		}
	}

	/// Absolute document URL: base URL without trailing slashes followed by the kind's path.
	pub fn spec_url(&self, kind: SpecKind) -> Result<Url, ConfigError> {
		let raw = format!("{}{}", self.base_url.trim_end_matches('/'), self.spec_path(kind));

		Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { url: raw, source })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn environment(base_url: &str) -> Environment {
		Environment::new(
			EnvironmentId::new("env-1").expect("Environment fixture should be valid."),
			ServiceId::new("svc-1").expect("Service fixture should be valid."),
			"dev",
			base_url,
		)
	}

	#[test]
	fn spec_url_strips_trailing_slashes_and_selects_path() {
		let env = environment("https://api.example.com//").with_swagger_path("/v2/openapi.json");

		assert_eq!(
			env.spec_url(SpecKind::Main).expect("Main URL should parse.").as_str(),
			"https://api.example.com/v2/openapi.json"
		);
		assert_eq!(
			env.spec_url(SpecKind::Admin).expect("Admin URL should parse.").as_str(),
			"https://api.example.com/admin/openapi.json"
		);
	}

	#[test]
	fn spec_url_reports_invalid_base() {
		let err = environment("not a url").spec_url(SpecKind::Main).expect_err("Should fail.");

		assert!(matches!(err, ConfigError::InvalidUrl { .. }));
	}

	#[test]
	fn spec_kind_labels_round_trip() {
		assert_eq!("admin".parse::<SpecKind>(), Ok(SpecKind::Admin));
		assert_eq!(SpecKind::Main.to_string(), "main");
		assert!("Main".parse::<SpecKind>().is_err());
		assert_eq!(
			serde_json::to_string(&SpecKind::Admin).expect("Kind should serialize."),
			"\"admin\""
		);
	}
}
