//! Key-value storage contract and built-in backends for pending states and token records.
//!
//! The relay only ever touches one key per logical step, so the contract is a plain
//! get/set/take/delete surface. `take` must be atomic (read and delete in one step); that is what
//! makes a pending state single-use when two callbacks race.

pub mod file;
pub mod memory;
#[cfg(feature = "redis")] pub mod redis;

pub use file::FileStore;
pub use memory::MemoryStore;
#[cfg(feature = "redis")] pub use redis::RedisStore;

// self
use crate::{
	_prelude::*,
	auth::{ClientId, StateToken},
};

/// Boxed future returned by every [`KeyValueStore`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by relay stores.
pub trait KeyValueStore
where
	Self: Send + Sync,
{
	/// Writes or overwrites `key`; a `ttl` makes the entry disappear once it elapses.
	fn set<'a>(
		&'a self,
		key: &'a StoreKey,
		value: String,
		ttl: Option<Duration>,
	) -> StoreFuture<'a, ()>;

	/// Reads the live value stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<String>>;

	/// Atomically reads and deletes the live value stored under `key`.
	fn take<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, Option<String>>;

	/// Deletes `key`, returning whether a live value was removed.
	fn delete<'a>(&'a self, key: &'a StoreKey) -> StoreFuture<'a, bool>;
}

/// Error type produced by [`KeyValueStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend or while decoding stored payloads.
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
	/// The store did not answer within the relay's deadline.
	#[error("Store did not answer within {timeout}.")]
	DeadlineExceeded {
		/// Deadline that elapsed.
		timeout: Duration,
	},
}

/// Keys the relay writes, rendered as `state:<token>` and `oauth:<client id>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoreKey {
	/// Pending authorization awaiting its callback; value is the client id.
	PendingState(StateToken),
	/// Token set persisted for a client id; value is the JSON token record.
	Token(ClientId),
}
impl StoreKey {
	const STATE_PREFIX: &'static str = "state:";
	const TOKEN_PREFIX: &'static str = "oauth:";
}
impl Display for StoreKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::PendingState(state) => write!(f, "{}{state}", Self::STATE_PREFIX),
			Self::Token(client) => write!(f, "{}{client}", Self::TOKEN_PREFIX),
		}
	}
}

/// Value plus optional absolute expiry, shared by the in-process backends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoredValue {
	pub(crate) value: String,
	#[serde(default)]
	pub(crate) expires_at: Option<OffsetDateTime>,
}
impl StoredValue {
	pub(crate) fn new(
		value: String,
		ttl: Option<Duration>,
		now: OffsetDateTime,
	) -> Result<Self, StoreError> {
		let expires_at = match ttl {
			Some(ttl) if !ttl.is_positive() =>
				return Err(StoreError::Backend { message: format!("TTL must be positive, got {ttl}") }),
			Some(ttl) => Some(now + ttl),
			None => None,
		};

		Ok(Self { value, expires_at })
	}

	pub(crate) fn is_live_at(&self, now: OffsetDateTime) -> bool {
		self.expires_at.is_none_or(|deadline| now < deadline)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use std::error::Error as StdError;

	#[test]
	fn store_error_converts_into_relay_error_with_source() {
		let store_error = StoreError::Backend { message: "connection refused".into() };
		let relay_error: Error = store_error.clone().into();

		assert!(matches!(relay_error, Error::Storage(_)));
		assert!(relay_error.to_string().contains("connection refused"));

		let source = StdError::source(&relay_error)
			.expect("Relay error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn keys_render_with_their_prefixes() {
		let state = StoreKey::PendingState(
			StateToken::new("aB3x9").expect("State fixture should be valid."),
		);
		let token =
			StoreKey::Token(ClientId::new("device-42").expect("Client fixture should be valid."));

		assert_eq!(state.to_string(), "state:aB3x9");
		assert_eq!(token.to_string(), "oauth:device-42");
	}

	#[test]
	fn stored_values_expire_at_their_deadline() {
		let now = OffsetDateTime::now_utc();
		let value = StoredValue::new("device-42".into(), Some(Duration::hours(1)), now)
			.expect("Positive TTL should be accepted.");

		assert!(value.is_live_at(now + Duration::minutes(59)));
		assert!(!value.is_live_at(now + Duration::hours(1)));
		assert!(
			StoredValue::new("x".into(), None, now)
				.expect("Entries without TTL should be accepted.")
				.is_live_at(now + Duration::weeks(520))
		);
		assert!(StoredValue::new("x".into(), Some(Duration::ZERO), now).is_err());
	}
}
