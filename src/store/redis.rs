//! Redis-backed [`KeyValueStore`] shared by every relay replica.
//!
//! Pending states are written with `PSETEX` so Redis expires them on its own, and consumed
//! with `GETDEL`, which makes a state single-use even across replicas.

// crates.io
use redis::{AsyncCommands, Client, RedisError, aio::MultiplexedConnection};
// self
use crate::{
	_prelude::*,
	store::{KeyValueStore, StoreError, StoreFuture, StoreKey},
};

/// Store backed by a multiplexed Redis connection.
#[derive(Clone)]
pub struct RedisStore {
	endpoint: String,
	connection: MultiplexedConnection,
}
impl RedisStore {
	/// Connects to `addr` (`host:port` or a full `redis://` URL), authenticating with `password`
	/// when one is provided.
	pub async fn connect(addr: &str, password: Option<&str>) -> Result<Self, StoreError> {
		let raw = if addr.contains("://") { addr.to_owned() } else { format!("redis://{addr}") };
		let mut url = Url::parse(&raw).map_err(|e| StoreError::Backend {
			message: format!("Invalid Redis address {addr}: {e}"),
		})?;

		if let Some(password) = password.filter(|password| !password.is_empty()) {
			url.set_password(Some(password)).map_err(|_| StoreError::Backend {
				message: format!("Redis address {addr} cannot carry a password"),
			})?;
		}

		Self::from_url(&url).await
	}

	/// Connects using a fully-formed Redis URL.
	pub async fn from_url(url: &Url) -> Result<Self, StoreError> {
		let client = Client::open(url.as_str()).map_err(backend_error)?;
		let connection = client.get_multiplexed_async_connection().await.map_err(backend_error)?;
		let endpoint = format!(
			"{}:{}",
			url.host_str().unwrap_or("localhost"),
			url.port().unwrap_or(6379)
		);

		Ok(Self { endpoint, connection })
	}

	/// `host:port` this store talks to.
	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}
}
impl Debug for RedisStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RedisStore").field("endpoint", &self.endpoint).finish()
	}
}
impl KeyValueStore for RedisStore {
	fn set<'a>(
		&'a self,
		key: &'a StoreKey,
		value: String,
		ttl: Option<Duration>,
	) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let mut connection = self.connection.clone();
			let key = key.to_string();

			match ttl {
				Some(ttl) => {
					let millis = ttl_millis(ttl)?;
					let _: () =
						connection.pset_ex(key, value, millis).await.map_err(backend_error)?;
				},
				None => {
					let _: () = connection.set(key, value).await.map_err(backend_error)?;
				},
			}

			Ok(())
		})
	}

	fn get<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move {
			let mut connection = self.connection.clone();

			connection.get(key.to_string()).await.map_err(backend_error)
		})
	}

	fn take<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<String>> {
		Box::pin(async move {
			let mut connection = self.connection.clone();

			connection.get_del(key.to_string()).await.map_err(backend_error)
		})
	}

	fn delete<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, bool> {
		Box::pin(async move {
			let mut connection = self.connection.clone();
			let removed: u64 = connection.del(key.to_string()).await.map_err(backend_error)?;

			Ok(removed > 0)
		})
	}
}

fn backend_error(e: RedisError) -> StoreError {
	StoreError::Backend { message: format!("Redis: {e}") }
}

fn ttl_millis(ttl: Duration) -> Result<u64, StoreError> {
	if !ttl.is_positive() {
		return Err(StoreError::Backend { message: format!("TTL must be positive, got {ttl}") });
	}

	// Sub-millisecond TTLs round up so Redis never sees a zero expiry.
	Ok(u64::try_from(ttl.whole_milliseconds()).unwrap_or(u64::MAX).max(1))
}
