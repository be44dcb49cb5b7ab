//! Thread-safe in-memory store implementing every persistence contract, for local
//! development and tests.

// self
use crate::{
	_prelude::*,
	auth::{EnvironmentId, UserId},
	cache::CachedSpec,
	catalog::{Environment, SpecKind},
	store::{
		EnvironmentStore, SecretKey, SecretRecordUpdate, SecretStore, SpecKey, SpecStore,
		StoreError, StoreFuture, UpsertOutcome, UserSecretRecord,
	},
};

#[derive(Debug, Default)]
struct Tables {
	environments: HashMap<EnvironmentId, Environment>,
	specs: HashMap<SpecKey, CachedSpec>,
	secrets: HashMap<SecretKey, UserSecretRecord>,
}

type SharedTables = Arc<RwLock<Tables>>;

/// Storage backend that keeps environments, cached documents, and secret records in-process.
///
/// Removing an environment cascades to its cached documents and secret records.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(SharedTables);
impl MemoryStore {
	/// Registers or replaces an environment.
	pub fn insert_environment(&self, environment: Environment) {
		self.0.write().environments.insert(environment.id.clone(), environment);
	}

	/// Removes an environment together with its cached documents and secret records.
	pub fn remove_environment(&self, id: &EnvironmentId) -> Option<Environment> {
		let mut tables = self.0.write();
		let removed = tables.environments.remove(id);

		tables.specs.retain(|key, _| key.environment != *id);
		tables.secrets.retain(|key, _| key.environment != *id);

		removed
	}

	/// Number of cached documents currently held, fresh or expired.
	pub fn cached_spec_count(&self) -> usize {
		self.0.read().specs.len()
	}

	/// Number of secret records currently held.
	pub fn secret_record_count(&self) -> usize {
		self.0.read().secrets.len()
	}

	fn upsert_now(tables: SharedTables, entry: CachedSpec) -> UpsertOutcome {
		let key = SpecKey::new(&entry.environment, entry.kind);
		let mut guard = tables.write();
		let outcome = match guard.specs.get(&key) {
			Some(current) if current.fetched_at > entry.fetched_at => return UpsertOutcome::Stale,
			Some(_) => UpsertOutcome::Replaced,
			None => UpsertOutcome::Inserted,
		};

		guard.specs.insert(key, entry);

		outcome
	}

	fn merge_now(tables: SharedTables, update: SecretRecordUpdate) -> UserSecretRecord {
		let key = SecretKey::new(&update.user, &update.environment);
		let mut guard = tables.write();
		let record = guard.secrets.entry(key).or_insert_with(|| {
			UserSecretRecord::new(update.user.clone(), update.environment.clone(), update.at)
		});

		record.apply(update);

		record.clone()
	}
}
impl EnvironmentStore for MemoryStore {
	fn environment<'a>(&'a self, id: &'a EnvironmentId) -> StoreFuture<'a, Option<Environment>> {
		let tables = self.0.clone();

		Box::pin(async move { Ok(tables.read().environments.get(id).cloned()) })
	}
}
impl SpecStore for MemoryStore {
	fn load<'a>(
		&'a self,
		environment: &'a EnvironmentId,
		kind: SpecKind,
	) -> StoreFuture<'a, Option<CachedSpec>> {
		let tables = self.0.clone();
		let key = SpecKey::new(environment, kind);

		Box::pin(async move { Ok(tables.read().specs.get(&key).cloned()) })
	}

	fn upsert(&self, entry: CachedSpec) -> StoreFuture<'_, UpsertOutcome> {
		let tables = self.0.clone();

		Box::pin(async move { Ok(Self::upsert_now(tables, entry)) })
	}
}
impl SecretStore for MemoryStore {
	fn fetch<'a>(
		&'a self,
		user: &'a UserId,
		environment: &'a EnvironmentId,
	) -> StoreFuture<'a, Option<UserSecretRecord>> {
		let tables = self.0.clone();
		let key = SecretKey::new(user, environment);

		Box::pin(async move { Ok(tables.read().secrets.get(&key).cloned()) })
	}

	fn merge(&self, update: SecretRecordUpdate) -> StoreFuture<'_, UserSecretRecord> {
		let tables = self.0.clone();

		Box::pin(async move { Ok(Self::merge_now(tables, update)) })
	}

	fn delete<'a>(
		&'a self,
		user: &'a UserId,
		environment: &'a EnvironmentId,
	) -> StoreFuture<'a, bool> {
		let tables = self.0.clone();
		let key = SecretKey::new(user, environment);

		Box::pin(async move { Ok(tables.write().secrets.remove(&key).is_some()) })
	}
}

/// Store whose every call fails; exercises error propagation in tests.
#[cfg(any(test, feature = "test"))]
#[derive(Clone, Debug, Default)]
pub struct UnavailableStore;
#[cfg(any(test, feature = "test"))]
impl UnavailableStore {
	fn failure<'a, T>() -> StoreFuture<'a, T>
	where
		T: 'a + Send,
	{
		Box::pin(async { Err(StoreError::Backend { message: "store unavailable".into() }) })
	}
}
#[cfg(any(test, feature = "test"))]
impl SecretStore for UnavailableStore {
	fn fetch<'a>(
		&'a self,
		_user: &'a UserId,
		_environment: &'a EnvironmentId,
	) -> StoreFuture<'a, Option<UserSecretRecord>> {
		Self::failure()
	}

	fn merge(&self, _update: SecretRecordUpdate) -> StoreFuture<'_, UserSecretRecord> {
		Self::failure()
	}

	fn delete<'a>(
		&'a self,
		_user: &'a UserId,
		_environment: &'a EnvironmentId,
	) -> StoreFuture<'a, bool> {
		Self::failure()
	}
}
