//! Callback handling: validate the returned state, exchange the code, persist the token set.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, StateToken, TokenRecord},
	error::ProviderError,
	flows::{Relay, common},
	http::TokenHttpClient,
	oauth::{OAuth2Facade, TransportErrorMapper},
	obs::{self, FlowKind},
	provider::GrantType,
	store::{KeyValueStore, StoreError, StoreKey},
};

/// Body returned to the browser once the token set is stored.
pub const CONFIRMATION_MESSAGE: &str = "You may close this tab.";

/// Query parameters the provider appends to the redirect URI.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackParams {
	/// Authorization code to exchange.
	pub code: String,
	/// State token issued by [`Relay::begin_authorization`].
	pub state: String,
	/// OAuth error code when the user or provider denied access.
	pub error: Option<String>,
	/// Human-readable companion to `error`.
	pub error_description: Option<String>,
}

/// Order in which the callback validates the state and exchanges the code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackOrder {
	/// Exchange the code first, then consume the state.
	#[default]
	ExchangeFirst,
	/// Consume the state first; unknown states never reach the provider.
	StateFirst,
}

impl<C, M> Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Completes an authorization: exchanges the code and stores the token set under the client
	/// id bound to `params.state`.
	///
	/// The state is consumed atomically, so two callbacks carrying the same state can never both
	/// succeed. Returns [`CONFIRMATION_MESSAGE`].
	pub async fn handle_callback(&self, params: CallbackParams) -> Result<String> {
		obs::observe(FlowKind::Callback, "handle_callback", async move {
			if params.state.is_empty() {
				return Err(Error::bad_request("no state provided"));
			}
			if let Some(error) = params.error.as_deref().filter(|error| !error.is_empty()) {
				let reason = match params.error_description.as_deref() {
					Some(description) if !description.is_empty() => format!("{error}: {description}"),
					_ => error.to_owned(),
				};

				#[cfg(feature = "tracing")]
				tracing::warn!(%reason, "Provider redirected with an error.");

				return Err(Error::Exchange(ProviderError::Denied { reason }));
			}
			if params.code.is_empty() {
				return Err(Error::bad_request("no code provided"));
			}

			let (client_id, record) = match self.callback_order {
				CallbackOrder::ExchangeFirst => {
					let record = self.exchange_code(&params.code).await?;
					let client_id = self.consume_state(&params.state).await?;

					(client_id, record)
				},
				CallbackOrder::StateFirst => {
					let client_id = self.consume_state(&params.state).await?;
					let record = self.exchange_code(&params.code).await?;

					(client_id, record)
				},
			};
			let payload = record
				.to_json()
				.map_err(|e| StoreError::Serialization { message: e.to_string() })?;

			common::store_call(
				self.timeouts.store,
				<dyn KeyValueStore>::set(
					self.store.as_ref(),
					&StoreKey::Token(client_id.clone()),
					payload,
					None,
				),
			)
			.await?;

			#[cfg(feature = "tracing")]
			tracing::info!(client_id = %client_id, "Stored token set.");

			Ok(CONFIRMATION_MESSAGE.to_owned())
		})
		.await
	}

	async fn exchange_code(&self, code: &str) -> Result<TokenRecord> {
		let facade = self
			.facade(GrantType::AuthorizationCode)
			.map_err(|e| Error::Exchange(ProviderError::Config(e)))?;

		common::provider_call(
			self.timeouts.provider,
			facade.exchange_authorization_code(self.strategy.as_ref(), code),
		)
		.await
		.map_err(Error::Exchange)
	}

	async fn consume_state(&self, raw: &str) -> Result<ClientId> {
		let Ok(state) = StateToken::new(raw) else {
			return Err(Error::UnknownState);
		};
		let taken = common::store_call(
			self.timeouts.store,
			<dyn KeyValueStore>::take(self.store.as_ref(), &StoreKey::PendingState(state)),
		)
		.await?;
		let Some(value) = taken else {
			#[cfg(feature = "tracing")]
			tracing::info!("Callback carried an unknown or expired state.");

			return Err(Error::UnknownState);
		};

		// A pending state always stores a validated client id.
		ClientId::new(&value).map_err(|e| {
			Error::Storage(StoreError::Serialization { message: e.to_string() })
		})
	}
}
