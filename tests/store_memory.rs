#![cfg(feature = "reqwest")]

// self
use oauth2_relay::{
	_preludet::*,
	auth::{ClientId, StateToken},
	store::{KeyValueStore, MemoryStore, StoreKey},
};

fn state_key(raw: &str) -> StoreKey {
	StoreKey::PendingState(StateToken::new(raw).expect("State fixture should be valid."))
}

fn token_key(raw: &str) -> StoreKey {
	StoreKey::Token(ClientId::new(raw).expect("Client id fixture should be valid."))
}

#[tokio::test]
async fn set_and_get_round_trip() {
	let store = MemoryStore::default();
	let key = token_key("device-1");

	store.set(&key, "{\"access_token\":\"a\"}".into(), None).await.expect("Set should succeed.");

	let value = store.get(&key).await.expect("Get should succeed.");

	assert_eq!(value.as_deref(), Some("{\"access_token\":\"a\"}"));

	store.set(&key, "overwritten".into(), None).await.expect("Overwrite should succeed.");

	assert_eq!(store.get(&key).await.expect("Get should succeed.").as_deref(), Some("overwritten"));
	assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn namespaces_do_not_collide() {
	let store = MemoryStore::default();

	store.set(&state_key("abcde"), "device-1".into(), None).await.expect("Set should succeed.");

	assert!(store.get(&token_key("abcde")).await.expect("Get should succeed.").is_none());
	assert_eq!(state_key("abcde").to_string(), "state:abcde");
	assert_eq!(token_key("abcde").to_string(), "oauth:abcde");
}

#[tokio::test]
async fn take_is_single_use() {
	let store = MemoryStore::default();
	let key = state_key("Xy7Qz");

	store
		.set(&key, "device-2".into(), Some(Duration::hours(1)))
		.await
		.expect("Set should succeed.");

	assert_eq!(store.take(&key).await.expect("Take should succeed.").as_deref(), Some("device-2"));
	assert!(store.take(&key).await.expect("Second take should succeed.").is_none());
	assert!(store.is_empty());
}

#[tokio::test]
async fn concurrent_takes_yield_exactly_one_winner() {
	let store = Arc::new(MemoryStore::default());
	let key = state_key("Race1");

	store
		.set(&key, "device-3".into(), Some(Duration::hours(1)))
		.await
		.expect("Set should succeed.");

	let handles = (0..16)
		.map(|_| {
			let store = store.clone();
			let key = key.clone();

			tokio::spawn(async move { store.take(&key).await.expect("Take should succeed.") })
		})
		.collect::<Vec<_>>();
	let mut winners = 0;

	for handle in handles {
		if handle.await.expect("Task should not panic.").is_some() {
			winners += 1;
		}
	}

	assert_eq!(winners, 1);
}

#[tokio::test]
async fn expired_entries_are_invisible_and_purgeable() {
	let store = MemoryStore::default();
	let key = state_key("Short");

	store
		.set(&key, "device-4".into(), Some(Duration::milliseconds(30)))
		.await
		.expect("Set should succeed.");
	store.set(&token_key("device-4"), "{}".into(), None).await.expect("Set should succeed.");

	assert!(store.get(&key).await.expect("Get should succeed.").is_some());

	tokio::time::sleep(std::time::Duration::from_millis(80)).await;

	assert!(store.get(&key).await.expect("Get should succeed.").is_none());
	assert_eq!(store.purge_expired(), 1);
	assert!(store.take(&key).await.expect("Take should succeed.").is_none());
	assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn delete_reports_whether_a_value_was_removed() {
	let store = MemoryStore::default();
	let key = token_key("device-5");

	assert!(!store.delete(&key).await.expect("Delete should succeed."));

	store.set(&key, "{}".into(), None).await.expect("Set should succeed.");

	assert!(store.delete(&key).await.expect("Delete should succeed."));
	assert!(store.get(&key).await.expect("Get should succeed.").is_none());
}
