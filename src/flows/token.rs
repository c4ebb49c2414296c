//! Token retrieval with transparent refresh.
//!
//! [`Relay::get_access_token`] returns the stored access token for a client id. Expired token
//! sets are refreshed with the stored refresh token and written back, so the next call is served
//! from the store. Concurrent calls for the same client id wait on a per-client guard and re-read
//! the record afterwards; only the first one reaches the token endpoint.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{ClientId, TokenRecord, TokenSecret},
	error::ProviderError,
	flows::{Relay, common},
	http::TokenHttpClient,
	oauth::{OAuth2Facade, TransportErrorMapper},
	obs::{self, FlowKind},
	provider::GrantType,
	store::{KeyValueStore, StoreError, StoreKey},
};

impl<C, M> Relay<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns a usable access token for `client_id`, refreshing and persisting it if expired.
	///
	/// `credential` is the raw `Authorization` header value checked by the access guard.
	pub async fn get_access_token(
		&self,
		client_id: &str,
		credential: Option<&str>,
	) -> Result<TokenSecret> {
		obs::observe(FlowKind::Token, "get_access_token", async move {
			self.guard.check(credential)?;

			let client_id = common::parse_client_id(client_id)?;
			let record = self.load_record(&client_id).await?;

			if !record.is_expired() {
				return Ok(record.access_token);
			}

			let guard = common::flow_guard(self, &client_id);
			let outcome = {
				let _singleflight = guard.lock().await;

				self.refresh_if_still_expired(&client_id).await
			};

			common::release_flow_guard(self, &client_id, guard);

			outcome
		})
		.await
	}

	async fn refresh_if_still_expired(&self, client_id: &ClientId) -> Result<TokenSecret> {
		// Re-read: whoever held the guard may already have refreshed.
		let record = self.load_record(client_id).await?;

		if !record.is_expired() {
			return Ok(record.access_token);
		}

		self.refresh_metrics.record_attempt();

		match self.refresh_record(client_id, record).await {
			Ok(refreshed) => {
				self.refresh_metrics.record_success();

				Ok(refreshed.access_token)
			},
			Err(e) => {
				self.refresh_metrics.record_failure();

				Err(e)
			},
		}
	}

	async fn load_record(&self, client_id: &ClientId) -> Result<TokenRecord> {
		let raw = common::store_call(
			self.timeouts.store,
			<dyn KeyValueStore>::get(self.store.as_ref(), &StoreKey::Token(client_id.clone())),
		)
		.await?
		.ok_or(Error::NotFound)?;

		TokenRecord::from_json(&raw).map_err(|e| {
			Error::Storage(StoreError::Serialization {
				message: format!("stored token record is malformed at `{}`: {}", e.path(), e.inner()),
			})
		})
	}

	async fn refresh_record(&self, client_id: &ClientId, current: TokenRecord) -> Result<TokenRecord> {
		let refresh_token =
			current.refresh_token.ok_or(Error::Refresh(ProviderError::MissingRefreshToken))?;
		let facade = self
			.facade(GrantType::RefreshToken)
			.map_err(|e| Error::Refresh(ProviderError::Config(e)))?;
		let (mut refreshed, rotated) = common::provider_call(
			self.timeouts.provider,
			facade.refresh_token(self.strategy.as_ref(), refresh_token.expose()),
		)
		.await
		.map_err(Error::Refresh)?;

		if rotated.is_none() {
			refreshed.refresh_token = Some(refresh_token);
		}

		let payload = refreshed
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
		tracing::info!(client_id = %client_id, rotated = rotated.is_some(), "Refreshed token set.");

		Ok(refreshed)
	}
}
