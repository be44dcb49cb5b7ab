//! TTL-enforcing view over the persisted document cache.
//!
//! The cache keeps exactly one entry per environment + kind. Reads treat entries older than
//! the configured TTL as absent without deleting them; the next successful fetch overwrites
//! them. There is no in-process lock: two concurrent misses may both fetch and both write,
//! and the later write wins. Both writes carry self-consistent document + timestamp pairs.

// self
use crate::{
	_prelude::*,
	auth::EnvironmentId,
	catalog::SpecKind,
	store::{SpecStore, StoreError, UpsertOutcome},
};

/// OpenAPI document as a JSON object with its original key order preserved.
pub type SpecDocument = JsonMap<String, JsonValue>;

/// Last successfully fetched document for an environment + kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CachedSpec {
	/// Environment the document belongs to.
	pub environment: EnvironmentId,
	/// Which document of the environment this is.
	pub kind: SpecKind,
	/// Fetched document.
	pub spec: SpecDocument,
	/// UTC instant of the fetch.
	pub fetched_at: OffsetDateTime,
}
impl CachedSpec {
	/// Creates a cache entry.
	pub fn new(
		environment: EnvironmentId,
		kind: SpecKind,
		spec: SpecDocument,
		fetched_at: OffsetDateTime,
	) -> Self {
		Self { environment, kind, spec, fetched_at }
	}

	/// Age of the entry at `now`.
	pub fn age_at(&self, now: OffsetDateTime) -> Duration {
		now - self.fetched_at
	}
}

/// Read-through cache over a [`SpecStore`] with a fixed time-to-live.
#[derive(Clone)]
pub struct SpecCache {
	store: Arc<dyn SpecStore>,
	ttl: Duration,
}
impl SpecCache {
	/// Wraps a store with the provided TTL.
	pub fn new(store: Arc<dyn SpecStore>, ttl: Duration) -> Self {
		Self { store, ttl }
	}

	/// Configured time-to-live.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Returns the entry when it is still fresh at the current UTC instant.
	pub async fn get(
		&self,
		environment: &EnvironmentId,
		kind: SpecKind,
	) -> Result<Option<CachedSpec>, StoreError> {
		self.get_at(environment, kind, OffsetDateTime::now_utc()).await
	}

	/// Returns the entry when `now - fetched_at <= ttl`.
	pub async fn get_at(
		&self,
		environment: &EnvironmentId,
		kind: SpecKind,
		now: OffsetDateTime,
	) -> Result<Option<CachedSpec>, StoreError> {
		let entry = <dyn SpecStore>::load(self.store.as_ref(), environment, kind).await?;

		Ok(entry.filter(|entry| self.is_fresh(entry, now)))
	}

	/// Replaces the entry for the entry's environment + kind.
	pub async fn put(&self, entry: CachedSpec) -> Result<UpsertOutcome, StoreError> {
		<dyn SpecStore>::upsert(self.store.as_ref(), entry).await
	}

	/// Checks whether `entry` is within the TTL at `now`.
	pub fn is_fresh(&self, entry: &CachedSpec, now: OffsetDateTime) -> bool {
		entry.age_at(now) <= self.ttl
	}
}
impl Debug for SpecCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SpecCache").field("ttl", &self.ttl).finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	use time::macros;
	// self
	use super::*;
	use crate::store::MemoryStore;

	fn environment() -> EnvironmentId {
		EnvironmentId::new("env-cache").expect("Environment fixture should be valid.")
	}

	fn document(title: &str) -> SpecDocument {
		match json!({ "info": { "title": title }, "paths": {} }) {
			JsonValue::Object(map) => map,
			_ => unreachable!("Fixture is an object."),
		}
	}

	fn cache() -> SpecCache {
		SpecCache::new(Arc::new(MemoryStore::default()), Duration::minutes(10))
	}

	#[tokio::test]
	async fn round_trip_within_ttl_returns_exact_entry() {
		let cache = cache();
		let fetched_at = macros::datetime!(2025-11-10 12:00 UTC);
		let entry = CachedSpec::new(environment(), SpecKind::Main, document("v1"), fetched_at);

		assert_eq!(
			cache.put(entry.clone()).await.expect("Put should succeed."),
			UpsertOutcome::Inserted
		);

		let hit = cache
			.get_at(&environment(), SpecKind::Main, fetched_at + Duration::minutes(10))
			.await
			.expect("Get should succeed.")
			.expect("Entry at exactly the TTL is still fresh.");

		assert_eq!(hit, entry);
	}

	#[tokio::test]
	async fn expired_entry_reads_as_absent_but_is_kept() {
		let store = Arc::new(MemoryStore::default());
		let cache = SpecCache::new(store.clone(), Duration::minutes(10));
		let fetched_at = macros::datetime!(2025-11-10 12:00 UTC);

		cache
			.put(CachedSpec::new(environment(), SpecKind::Main, document("v1"), fetched_at))
			.await
			.expect("Put should succeed.");

		let miss = cache
			.get_at(&environment(), SpecKind::Main, fetched_at + Duration::seconds(601))
			.await
			.expect("Get should succeed.");

		assert!(miss.is_none());
		assert_eq!(store.cached_spec_count(), 1);
	}

	#[tokio::test]
	async fn kinds_do_not_share_entries() {
		let cache = cache();
		let now = OffsetDateTime::now_utc();

		cache
			.put(CachedSpec::new(environment(), SpecKind::Admin, document("admin"), now))
			.await
			.expect("Put should succeed.");

		assert!(cache.get(&environment(), SpecKind::Main).await.expect("Get.").is_none());
		assert_eq!(
			cache
				.get(&environment(), SpecKind::Admin)
				.await
				.expect("Get.")
				.expect("Admin entry should be cached.")
				.spec,
			document("admin")
		);
	}

	#[tokio::test]
	async fn older_write_never_rolls_back_fetched_at() {
		let cache = cache();
		let newer = macros::datetime!(2025-11-10 12:05 UTC);
		let older = macros::datetime!(2025-11-10 12:00 UTC);

		cache
			.put(CachedSpec::new(environment(), SpecKind::Main, document("new"), newer))
			.await
			.expect("Put should succeed.");

		let outcome = cache
			.put(CachedSpec::new(environment(), SpecKind::Main, document("old"), older))
			.await
			.expect("Put should succeed.");

		assert_eq!(outcome, UpsertOutcome::Stale);

		let current = cache
			.get_at(&environment(), SpecKind::Main, newer)
			.await
			.expect("Get should succeed.")
			.expect("Newer entry should remain.");

		assert_eq!(current.fetched_at, newer);
		assert_eq!(current.spec, document("new"));
	}
}
