//! Persistence contracts for environments, cached documents, and encrypted secrets, plus the
//! in-memory reference backend.

pub mod memory;

pub use memory::MemoryStore;
#[cfg(any(test, feature = "test"))] pub use memory::UnavailableStore;

// self
use crate::{
	_prelude::*,
	auth::{EnvironmentId, UserId},
	cache::CachedSpec,
	catalog::{Environment, SpecKind},
	crypto::Ciphertext,
};

/// Boxed future returned by every persistence call.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Read access to registered environments. Environment CRUD lives outside this crate.
pub trait EnvironmentStore
where
	Self: Send + Sync,
{
	/// Fetches the environment with the provided identity, if present.
	fn environment<'a>(&'a self, id: &'a EnvironmentId) -> StoreFuture<'a, Option<Environment>>;
}

/// Storage for the single cached document per environment + kind.
pub trait SpecStore
where
	Self: Send + Sync,
{
	/// Loads the stored entry regardless of its age.
	fn load<'a>(
		&'a self,
		environment: &'a EnvironmentId,
		kind: SpecKind,
	) -> StoreFuture<'a, Option<CachedSpec>>;

	/// Inserts or replaces the entry for the entry's environment + kind.
	fn upsert(&self, entry: CachedSpec) -> StoreFuture<'_, UpsertOutcome>;
}

/// Storage for encrypted per-user, per-environment secrets.
pub trait SecretStore
where
	Self: Send + Sync,
{
	/// Fetches the record for the user + environment, if present.
	fn fetch<'a>(
		&'a self,
		user: &'a UserId,
		environment: &'a EnvironmentId,
	) -> StoreFuture<'a, Option<UserSecretRecord>>;

	/// Finds or creates the record, then overwrites only the fields present in `update`.
	fn merge(&self, update: SecretRecordUpdate) -> StoreFuture<'_, UserSecretRecord>;

	/// Deletes the record, returning `true` when one existed.
	fn delete<'a>(
		&'a self,
		user: &'a UserId,
		environment: &'a EnvironmentId,
	) -> StoreFuture<'a, bool>;
}

/// Result of writing a cached document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpsertOutcome {
	/// No entry existed for the key.
	Inserted,
	/// The previous entry was replaced.
	Replaced,
	/// The stored entry is newer than the write, which was dropped.
	Stale,
}

/// Error type produced by store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Key of a cached document.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpecKey {
	/// Environment component.
	pub environment: EnvironmentId,
	/// Document kind component.
	pub kind: SpecKind,
}
impl SpecKey {
	/// Builds a key for the environment + kind pair.
	pub fn new(environment: &EnvironmentId, kind: SpecKind) -> Self {
		Self { environment: environment.clone(), kind }
	}
}

/// Key of a secret record.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretKey {
	/// Owning user.
	pub user: UserId,
	/// Environment the secrets apply to.
	pub environment: EnvironmentId,
}
impl SecretKey {
	/// Builds a key for the user + environment pair.
	pub fn new(user: &UserId, environment: &EnvironmentId) -> Self {
		Self { user: user.clone(), environment: environment.clone() }
	}
}

/// Encrypted secrets one user keeps for one environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSecretRecord {
	/// Owning user.
	pub user: UserId,
	/// Environment the secrets apply to.
	pub environment: EnvironmentId,
	/// Sealed JWT signing secret.
	pub jwt_secret: Option<Ciphertext>,
	/// Sealed admin password.
	pub admin_password: Option<Ciphertext>,
	/// Creation instant.
	pub created_at: OffsetDateTime,
	/// Last modification instant.
	pub updated_at: OffsetDateTime,
}
impl UserSecretRecord {
	/// Creates an empty record.
	pub fn new(user: UserId, environment: EnvironmentId, at: OffsetDateTime) -> Self {
		Self {
			user,
			environment,
			jwt_secret: None,
			admin_password: None,
			created_at: at,
			updated_at: at,
		}
	}

	/// Applies the fields present in `update`; absent fields keep their current value.
	pub fn apply(&mut self, update: SecretRecordUpdate) {
		if let Some(jwt_secret) = update.jwt_secret {
			self.jwt_secret = Some(jwt_secret);
		}
		if let Some(admin_password) = update.admin_password {
			self.admin_password = Some(admin_password);
		}

		self.updated_at = update.at;
	}

	/// Existence flags safe to expose to callers.
	pub fn status(&self) -> SecretStatus {
		SecretStatus {
			environment_id: self.environment.clone(),
			has_jwt_secret: self.jwt_secret.is_some(),
			has_admin_password: self.admin_password.is_some(),
		}
	}
}

/// Field-wise update handed to [`SecretStore::merge`].
#[derive(Clone, Debug)]
pub struct SecretRecordUpdate {
	/// Owning user.
	pub user: UserId,
	/// Environment the secrets apply to.
	pub environment: EnvironmentId,
	/// Replacement JWT secret ciphertext, if any.
	pub jwt_secret: Option<Ciphertext>,
	/// Replacement admin password ciphertext, if any.
	pub admin_password: Option<Ciphertext>,
	/// Instant recorded as the modification time.
	pub at: OffsetDateTime,
}

/// Which secrets exist for a user + environment. Never carries secret values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretStatus {
	/// Environment the status refers to.
	pub environment_id: EnvironmentId,
	/// Whether a JWT signing secret is stored.
	pub has_jwt_secret: bool,
	/// Whether an admin password is stored.
	pub has_admin_password: bool,
}
impl SecretStatus {
	/// Status for an environment with nothing stored.
	pub fn empty(environment_id: EnvironmentId) -> Self {
		Self { environment_id, has_jwt_secret: false, has_admin_password: false }
	}
}
