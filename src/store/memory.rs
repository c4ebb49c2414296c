//! Thread-safe in-memory [`KeyValueStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	store::{KeyValueStore, StoreError, StoreFuture, StoreKey, StoredValue},
};

type StoreMap = Arc<RwLock<HashMap<StoreKey, StoredValue>>>;

/// Thread-safe storage backend that keeps entries in-process for tests and demos.
///
/// Expired entries are treated as absent; every write drops all of them, and
/// [`MemoryStore::purge_expired`] does the same on demand.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Removes every expired entry, returning how many were dropped.
	pub fn purge_expired(&self) -> usize {
		let now = OffsetDateTime::now_utc();
		let mut guard = self.0.write();
		let before = guard.len();

		guard.retain(|_, stored| stored.is_live_at(now));

		before - guard.len()
	}

	/// Number of live entries.
	pub fn len(&self) -> usize {
		let now = OffsetDateTime::now_utc();

		self.0.read().values().filter(|stored| stored.is_live_at(now)).count()
	}

	/// Returns true when no live entries remain.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn set_now(
		map: StoreMap,
		key: StoreKey,
		value: String,
		ttl: Option<Duration>,
	) -> Result<(), StoreError> {
		let now = OffsetDateTime::now_utc();
		let stored = StoredValue::new(value, ttl, now)?;
		let mut guard = map.write();

		guard.retain(|_, entry| entry.is_live_at(now));
		guard.insert(key, stored);

		Ok(())
	}

	fn get_now(map: StoreMap, key: &StoreKey) -> Option<String> {
		let now = OffsetDateTime::now_utc();

		map.read().get(key).filter(|stored| stored.is_live_at(now)).map(|stored| stored.value.clone())
	}

	fn take_now(map: StoreMap, key: &StoreKey) -> Option<String> {
		let now = OffsetDateTime::now_utc();

		map.write().remove(key).filter(|stored| stored.is_live_at(now)).map(|stored| stored.value)
	}
}
impl KeyValueStore for MemoryStore {
	fn set<'a>(
		&'a self,
		key: &'a StoreKey,
		value: String,
		ttl: Option<Duration>,
	) -> StoreFuture<'a, ()> {
		let map = self.0.clone();
		let key = key.to_owned();

		Box::pin(async move { Self::set_now(map, key, value, ttl) })
	}

	fn get<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(map, key)) })
	}

	fn take<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<String>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::take_now(map, key)) })
	}

	fn delete<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, bool> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::take_now(map, key).is_some()) })
	}
}
