//! OAuth 2.0 authorization-code relay for devices that cannot keep a client secret: state-bound
//! callbacks, key-value token storage, and transparent refresh in one crate.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
#[cfg(feature = "server")] pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
#[cfg(feature = "server")] pub mod server;
pub mod store;
#[cfg(feature = "reqwest")]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for unit and integration tests.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{AccessGuard, ProviderId, ScopeSet},
		flows::{Relay, RelayTimeouts},
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		provider::{
			ClientAuthMethod, DefaultProviderStrategy, GrantType, ProviderDescriptor,
			ProviderStrategy,
		},
		store::{KeyValueStore, MemoryStore},
	};

	/// Relay type alias used by reqwest-backed integration tests.
	pub type ReqwestTestRelay = Relay<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Redirect URI registered by every test relay.
	pub const TEST_REDIRECT_URI: &str = "https://relay.example.com/callback";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a descriptor whose endpoints point at the provided mock server base URL.
	pub fn test_descriptor(authorize_url: &str, token_url: &str) -> ProviderDescriptor {
		ProviderDescriptor::builder(
			ProviderId::new("mock-provider").expect("Mock provider identifier should be valid."),
		)
		.authorization_endpoint(
			Url::parse(authorize_url).expect("Mock authorization endpoint should parse."),
		)
		.token_endpoint(Url::parse(token_url).expect("Mock token endpoint should parse."))
		.support_grants([GrantType::AuthorizationCode, GrantType::RefreshToken])
		.preferred_client_auth_method(ClientAuthMethod::ClientSecretPost)
		.build()
		.expect("Mock provider descriptor should build.")
	}

	/// Constructs a [`Relay`] backed by an in-memory store, default provider strategy, and the
	/// reqwest transport used across integration tests.
	pub fn build_reqwest_test_relay(
		descriptor: ProviderDescriptor,
		access_secret: Option<&str>,
	) -> (ReqwestTestRelay, Arc<MemoryStore>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn KeyValueStore> = store_backend.clone();
		let strategy: Arc<dyn ProviderStrategy> = Arc::new(DefaultProviderStrategy);
		let scope = ScopeSet::new(["streaming", "user-read-playback-state"])
			.expect("Test scope set should be valid.");
		let redirect_uri = Url::parse(TEST_REDIRECT_URI).expect("Test redirect URI should parse.");
		let relay = ReqwestTestRelay::with_http_client(
			store,
			descriptor,
			strategy,
			"relay-client",
			redirect_uri,
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		)
		.with_client_secret("relay-secret")
		.with_scope(scope)
		.with_guard(AccessGuard::new(access_secret))
		.with_timeouts(RelayTimeouts::default());

		(relay, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {httpmock as _, tempfile as _, tower as _};
