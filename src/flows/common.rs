//! Shared helpers for relay operations (deadlines, client ids, facade construction, guards).

// self
use crate::{
	_prelude::*,
	auth::ClientId,
	error::{ConfigError, ProviderError, TransientError},
	flows::Relay,
	http::TokenHttpClient,
	oauth::{BasicFacade, TransportErrorMapper},
	provider::GrantType,
	store::{StoreError, StoreFuture},
};

/// Deadlines applied to every outbound call a relay makes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelayTimeouts {
	/// Upper bound for a single store round trip.
	pub store: Duration,
	/// Upper bound for a single token endpoint call.
	pub provider: Duration,
}
impl Default for RelayTimeouts {
	fn default() -> Self {
		Self { store: Duration::seconds(5), provider: Duration::seconds(15) }
	}
}

/// Runs a store operation under `timeout`.
pub(crate) async fn store_call<T>(timeout: Duration, fut: StoreFuture<'_, T>) -> Result<T, StoreError> {
	match tokio::time::timeout(timeout.unsigned_abs(), fut).await {
		Ok(result) => result,
		Err(_) => Err(StoreError::DeadlineExceeded { timeout }),
	}
}

/// Runs a token endpoint call under `timeout`.
pub(crate) async fn provider_call<T, F>(timeout: Duration, fut: F) -> Result<T, ProviderError>
where
	F: Future<Output = Result<T, ProviderError>>,
{
	match tokio::time::timeout(timeout.unsigned_abs(), fut).await {
		Ok(result) => result,
		Err(_) => Err(TransientError::DeadlineExceeded { timeout }.into()),
	}
}

/// Validates a caller-supplied client id, reporting an absent one as a bad request.
pub(crate) fn parse_client_id(raw: &str) -> Result<ClientId> {
	if raw.is_empty() {
		return Err(Error::bad_request("no id provided"));
	}

	Ok(ClientId::new(raw)?)
}

/// Returns (and creates on demand) the singleflight guard for a client id.
pub(crate) fn flow_guard<C, M>(relay: &Relay<C, M>, client: &ClientId) -> Arc<AsyncMutex<()>>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let mut guards = relay.flow_guards.lock();

	guards.entry(client.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
}

/// Hands back a guard obtained from [`flow_guard`], dropping the map entry once no caller holds it.
pub(crate) fn release_flow_guard<C, M>(
	relay: &Relay<C, M>,
	client: &ClientId,
	guard: Arc<AsyncMutex<()>>,
) where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let mut guards = relay.flow_guards.lock();

	// One reference lives in the map, the other is `guard`.
	if Arc::strong_count(&guard) == 2
		&& guards.get(client).is_some_and(|current| Arc::ptr_eq(current, &guard))
	{
		guards.remove(client);
	}
}

impl<C, M> Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn facade(&self, grant: GrantType) -> Result<BasicFacade<C, M>, ConfigError> {
		if !self.descriptor.supports(grant) {
			return Err(ConfigError::UnsupportedGrant {
				descriptor: self.descriptor.id.to_string(),
				grant: grant.as_str(),
			});
		}

		BasicFacade::from_descriptor(
			&self.descriptor,
			&self.client_id,
			self.client_secret.as_deref(),
			&self.redirect_uri,
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)
	}
}
