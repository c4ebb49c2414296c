//! Authorization initiation: issue a state token and the provider URL that carries it.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, StateToken},
	flows::{Relay, common},
	http::TokenHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, FlowKind},
	store::{KeyValueStore, StoreKey},
};

/// Result of [`Relay::begin_authorization`].
#[derive(Clone, Debug)]
pub struct AuthorizationRequest {
	/// Client id the pending state is bound to.
	pub client_id: ClientId,
	/// Single-use state token embedded in the URL.
	pub state: StateToken,
	/// Provider authorization URL the end user must open.
	pub authorize_url: Url,
}

impl<C, M> Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Issues an authorization URL for `client_id` and records the pending state.
	///
	/// `credential` is the raw `Authorization` header value checked by the access guard. Every
	/// call produces a fresh state; nothing is retried.
	pub async fn begin_authorization(
		&self,
		client_id: &str,
		credential: Option<&str>,
	) -> Result<AuthorizationRequest> {
		obs::observe(FlowKind::Authorize, "begin_authorization", async move {
			self.guard.check(credential)?;

			let client_id = common::parse_client_id(client_id)?;
			let state = StateToken::generate();
			let key = StoreKey::PendingState(state.clone());

			common::store_call(
				self.timeouts.store,
				<dyn KeyValueStore>::set(
					self.store.as_ref(),
					&key,
					client_id.to_string(),
					Some(self.state_ttl),
				),
			)
			.await?;

			#[cfg(feature = "tracing")]
			tracing::info!(client_id = %client_id, "Issued pending authorization state.");

			let authorize_url = self.descriptor.authorization_url(
				&self.client_id,
				&self.redirect_uri,
				&self.scope,
				&state,
			);

			Ok(AuthorizationRequest { client_id, state, authorize_url })
		})
		.await
	}
}
