//! Relay facade and the three operations it serves: authorize, callback, and token.

pub mod authorize;
pub mod callback;
pub mod common;
pub mod token;

pub use authorize::*;
pub use callback::*;
pub use common::*;
pub use token::*;

// self
use crate::{
	_prelude::*,
	auth::{AccessGuard, ClientId, ScopeSet},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	provider::{ProviderDescriptor, ProviderStrategy},
	store::KeyValueStore,
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

/// Relay specialized for the crate's default reqwest transport stack.
#[cfg(feature = "reqwest")]
pub type ReqwestRelay = Relay<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Pending authorizations expire after one hour unless overridden.
pub const DEFAULT_STATE_TTL: Duration = Duration::hours(1);

/// Coordinates the authorization-code relay against a single provider descriptor.
///
/// The relay owns the HTTP client, key-value store, provider descriptor, strategy, and access
/// guard so each operation only deals with its own step of the handshake. It is cheap to clone;
/// clones share the store, transport, metrics, and singleflight guards.
#[derive(Clone)]
pub struct Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Store holding pending states and token records.
	pub store: Arc<dyn KeyValueStore>,
	/// Provider descriptor that defines OAuth endpoints and quirks.
	pub descriptor: ProviderDescriptor,
	/// Strategy responsible for provider-specific request tweaks and error classification.
	pub strategy: Arc<dyn ProviderStrategy>,
	/// OAuth 2.0 client identifier registered with the provider.
	pub client_id: String,
	/// Client secret registered with the provider.
	pub client_secret: Option<String>,
	/// Fixed scope set requested on every authorization.
	pub scope: ScopeSet,
	/// Fixed redirect URI registered with the provider.
	pub redirect_uri: Url,
	/// Shared-secret check applied to authorize and token requests.
	pub guard: AccessGuard,
	/// Deadlines applied to store and provider calls.
	pub timeouts: RelayTimeouts,
	/// Lifetime of a pending state.
	pub state_ttl: Duration,
	/// Order in which the callback validates state and exchanges the code.
	pub callback_order: CallbackOrder,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	flow_guards: Arc<Mutex<HashMap<ClientId, Arc<AsyncMutex<()>>>>>,
}
impl<C, M> Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a relay that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		store: Arc<dyn KeyValueStore>,
		descriptor: ProviderDescriptor,
		strategy: Arc<dyn ProviderStrategy>,
		client_id: impl Into<String>,
		redirect_uri: Url,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			store,
			descriptor,
			strategy,
			client_id: client_id.into(),
			client_secret: None,
			scope: ScopeSet::default(),
			redirect_uri,
			guard: AccessGuard::disabled(),
			timeouts: RelayTimeouts::default(),
			state_ttl: DEFAULT_STATE_TTL,
			callback_order: CallbackOrder::default(),
			refresh_metrics: Default::default(),
			flow_guards: Default::default(),
		}
	}

	/// Sets or replaces the client secret sent to the token endpoint.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}

	/// Sets the scope set requested on every authorization.
	pub fn with_scope(mut self, scope: ScopeSet) -> Self {
		self.scope = scope;

		self
	}

	/// Replaces the access guard.
	pub fn with_guard(mut self, guard: AccessGuard) -> Self {
		self.guard = guard;

		self
	}

	/// Replaces the store and provider deadlines.
	pub fn with_timeouts(mut self, timeouts: RelayTimeouts) -> Self {
		self.timeouts = timeouts;

		self
	}

	/// Overrides the pending-state lifetime.
	pub fn with_state_ttl(mut self, ttl: Duration) -> Self {
		self.state_ttl = ttl;

		self
	}

	/// Overrides the callback ordering.
	pub fn with_callback_order(mut self, order: CallbackOrder) -> Self {
		self.callback_order = order;

		self
	}
}
#[cfg(feature = "reqwest")]
impl Relay<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a relay that provisions its own reqwest-backed transport.
	///
	/// Use [`Relay::with_client_secret`] to attach the confidential client secret.
	pub fn new(
		store: Arc<dyn KeyValueStore>,
		descriptor: ProviderDescriptor,
		strategy: Arc<dyn ProviderStrategy>,
		client_id: impl Into<String>,
		redirect_uri: Url,
	) -> Self {
		Self::with_http_client(
			store,
			descriptor,
			strategy,
			client_id,
			redirect_uri,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Debug for Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Relay")
			.field("descriptor", &self.descriptor)
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("scope", &self.scope)
			.field("redirect_uri", &self.redirect_uri.as_str())
			.field("guard", &self.guard)
			.field("timeouts", &self.timeouts)
			.field("state_ttl", &self.state_ttl)
			.field("callback_order", &self.callback_order)
			.finish()
	}
}
