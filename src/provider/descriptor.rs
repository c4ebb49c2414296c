//! Provider descriptor data structures and helpers shared by all flows.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Grant helpers wired into provider descriptors.
pub mod grant;
/// Provider-specific quirk toggles.
pub mod quirks;

pub use builder::*;
pub use grant::*;
pub use quirks::*;

// self
use crate::{
	_prelude::*,
	auth::{ProviderId, ScopeSet, StateToken},
};

/// Spotify's authorization endpoint.
pub const SPOTIFY_AUTHORIZATION_ENDPOINT: &str = "https://accounts.spotify.com/authorize";
/// Spotify's token endpoint.
pub const SPOTIFY_TOKEN_ENDPOINT: &str = "https://accounts.spotify.com/api/token";

/// Preferred client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
	/// Form POST body parameters for `client_id`/`client_secret`.
	ClientSecretPost,
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Authorization endpoint the end user is sent to.
	pub authorization: Url,
	/// Token endpoint used for code exchanges and refreshes.
	pub token: Url,
}

/// Immutable provider descriptor consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Descriptor identifier.
	pub id: ProviderId,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Supported grant flags.
	pub supported_grants: SupportedGrants,
	/// Preferred client authentication mechanism.
	pub preferred_client_auth_method: ClientAuthMethod,
	/// Provider-specific quirks.
	pub quirks: ProviderQuirks,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id)
	}

	/// Descriptor for Spotify's accounts service, optionally overriding its endpoints.
	pub fn spotify(
		authorization: Option<Url>,
		token: Option<Url>,
	) -> Result<Self, ProviderDescriptorError> {
		let parse = |raw: &str| {
			Url::parse(raw).map_err(|e| ProviderDescriptorError::InvalidEndpoint {
				url: raw.to_owned(),
				reason: e.to_string(),
			})
		};
		let authorization = match authorization {
			Some(url) => url,
			None => parse(SPOTIFY_AUTHORIZATION_ENDPOINT)?,
		};
		let token = match token {
			Some(url) => url,
			None => parse(SPOTIFY_TOKEN_ENDPOINT)?,
		};
		let id = ProviderId::new("spotify")
			.map_err(|e| ProviderDescriptorError::InvalidIdentifier { reason: e.to_string() })?;

		Self::builder(id)
			.authorization_endpoint(authorization)
			.token_endpoint(token)
			.support_grants([GrantType::AuthorizationCode, GrantType::RefreshToken])
			.preferred_client_auth_method(ClientAuthMethod::ClientSecretBasic)
			.build()
	}

	/// Checks whether the descriptor supports a given grant.
	pub fn supports(&self, grant: GrantType) -> bool {
		self.supported_grants.supports(grant)
	}

	/// Builds the authorization URL an end user must visit to grant access.
	///
	/// Carries `response_type=code`, `client_id`, `redirect_uri`, `scope` (joined with the
	/// descriptor's delimiter, omitted when empty) and `state`.
	pub fn authorization_url(
		&self,
		client_id: &str,
		redirect_uri: &Url,
		scope: &ScopeSet,
		state: &StateToken,
	) -> Url {
		let mut url = self.endpoints.authorization.clone();
		let mut pairs = url.query_pairs_mut();

		pairs.append_pair("response_type", "code");
		pairs.append_pair("client_id", client_id);
		pairs.append_pair("redirect_uri", redirect_uri.as_str());

		if let Some(scope_value) = scope.joined(self.quirks.scope_delimiter) {
			pairs.append_pair("scope", &scope_value);
		}

		pairs.append_pair("state", state);

		drop(pairs);

		url
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn spotify_preset_uses_accounts_service() {
		let descriptor =
			ProviderDescriptor::spotify(None, None).expect("Spotify preset should build.");

		assert_eq!(descriptor.endpoints.authorization.as_str(), SPOTIFY_AUTHORIZATION_ENDPOINT);
		assert_eq!(descriptor.endpoints.token.as_str(), SPOTIFY_TOKEN_ENDPOINT);
		assert!(descriptor.supports(GrantType::AuthorizationCode));
		assert!(descriptor.supports(GrantType::RefreshToken));
		assert_eq!(descriptor.preferred_client_auth_method, ClientAuthMethod::ClientSecretBasic);
	}

	#[test]
	fn authorization_url_carries_every_parameter() {
		let descriptor =
			ProviderDescriptor::spotify(None, None).expect("Spotify preset should build.");
		let redirect =
			Url::parse("https://relay.example.com/callback").expect("Redirect fixture should parse.");
		let scope =
			ScopeSet::new(["streaming", "user-read-playback-state"]).expect("Scope should be valid.");
		let state = StateToken::new("aB3x9").expect("State fixture should be valid.");
		let url = descriptor.authorization_url("app-client", &redirect, &scope, &state);
		let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();

		assert_eq!(url.host_str(), Some("accounts.spotify.com"));
		assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
		assert_eq!(pairs.get("client_id").map(String::as_str), Some("app-client"));
		assert_eq!(
			pairs.get("redirect_uri").map(String::as_str),
			Some("https://relay.example.com/callback")
		);
		assert_eq!(
			pairs.get("scope").map(String::as_str),
			Some("streaming user-read-playback-state")
		);
		assert_eq!(pairs.get("state").map(String::as_str), Some("aB3x9"));
	}

	#[test]
	fn authorization_url_honors_custom_scope_delimiters() {
		let mut descriptor =
			ProviderDescriptor::spotify(None, None).expect("Spotify preset should build.");

		descriptor.quirks.scope_delimiter = ',';

		let redirect =
			Url::parse("https://relay.example.com/callback").expect("Redirect fixture should parse.");
		let state = StateToken::generate();
		let with_scope = descriptor.authorization_url(
			"app-client",
			&redirect,
			&ScopeSet::new(["b", "a"]).expect("Scope should be valid."),
			&state,
		);
		let without_scope =
			descriptor.authorization_url("app-client", &redirect, &ScopeSet::default(), &state);

		assert!(with_scope.query_pairs().any(|(k, v)| k == "scope" && v == "a,b"));
		assert!(!without_scope.query_pairs().any(|(k, _)| k == "scope"));
	}
}
