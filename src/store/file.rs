//! Simple file-backed [`KeyValueStore`] for single-instance deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	store::{KeyValueStore, StoreError, StoreFuture, StoreKey, StoredValue},
};

type Snapshot = HashMap<StoreKey, StoredValue>;

/// Persists relay entries to a JSON file after each mutation.
///
/// Expired entries are skipped on load and dropped from the next snapshot written. Mutations are
/// staged on a copy of the snapshot and only become visible once the file was replaced, so a
/// failed write leaves both the file and the in-memory view untouched. Disk I/O runs on the
/// blocking pool.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Snapshot>>,
	writer: Arc<Mutex<()>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)), writer: Default::default() })
	}

	/// Location of the JSON snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let entries: Vec<(StoreKey, StoredValue)> =
			serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;
		let now = OffsetDateTime::now_utc();

		Ok(entries.into_iter().filter(|(_, stored)| stored.is_live_at(now)).collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
		let entries: Vec<_> = snapshot.iter().collect();
		let serialized =
			serde_json::to_vec_pretty(&entries).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	/// Applies `apply` to a copy of the snapshot and publishes it once persisted.
	///
	/// `apply` reports whether it changed anything; unchanged snapshots skip the write.
	fn mutate<T>(
		&self,
		apply: impl FnOnce(&mut Snapshot, OffsetDateTime) -> (T, bool),
	) -> Result<T, StoreError> {
		let _writer = self.writer.lock();
		let now = OffsetDateTime::now_utc();
		let mut next = self.inner.read().clone();
		let (out, changed) = apply(&mut next, now);

		if !changed {
			return Ok(out);
		}

		next.retain(|_, stored| stored.is_live_at(now));
		self.persist(&next)?;
		*self.inner.write() = next;

		Ok(out)
	}

	fn remove_entry(&self, key: &StoreKey) -> Result<Option<String>, StoreError> {
		self.mutate(|snapshot, now| match snapshot.remove(key) {
			Some(stored) => (stored.is_live_at(now).then_some(stored.value), true),
			None => (None, false),
		})
	}

	fn blocking<T, F>(&self, op: F) -> StoreFuture<'_, T>
	where
		T: 'static + Send,
		F: 'static + Send + FnOnce(&Self) -> Result<T, StoreError>,
	{
		let store = self.clone();

		Box::pin(async move {
			tokio::task::spawn_blocking(move || op(&store)).await.map_err(|e| StoreError::Backend {
				message: format!("File store task failed: {e}"),
			})?
		})
	}
}
impl KeyValueStore for FileStore {
	fn set<'a>(
		&'a self,
		key: &'a StoreKey,
		value: String,
		ttl: Option<Duration>,
	) -> StoreFuture<'a, ()> {
		let key = key.to_owned();

		self.blocking(move |store| {
			let stored = StoredValue::new(value, ttl, OffsetDateTime::now_utc())?;

			store.mutate(|snapshot, _| {
				snapshot.insert(key, stored);

				((), true)
			})
		})
	}

	fn get<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move {
			let now = OffsetDateTime::now_utc();

			Ok(self
				.inner
				.read()
				.get(key)
				.filter(|stored| stored.is_live_at(now))
				.map(|stored| stored.value.clone()))
		})
	}

	fn take<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<String>> {
		let key = key.to_owned();

		self.blocking(move |store| store.remove_entry(&key))
	}

	fn delete<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, bool> {
		let key = key.to_owned();

		self.blocking(move |store| Ok(store.remove_entry(&key)?.is_some()))
	}
}
