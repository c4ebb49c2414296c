#![cfg(feature = "reqwest")]

// self
use oauth2_relay::{
	_preludet::*,
	auth::{ProviderId, ScopeSet, StateToken},
	provider::{
		ClientAuthMethod, DefaultProviderStrategy, GrantType, ProviderDescriptor,
		ProviderDescriptorBuilder, ProviderDescriptorError, ProviderErrorContext,
		ProviderErrorKind, ProviderQuirks, ProviderStrategy, SPOTIFY_AUTHORIZATION_ENDPOINT,
		SPOTIFY_TOKEN_ENDPOINT,
	},
};

fn url(value: &str) -> Url {
	Url::parse(value).expect("Failed to parse provider URL fixture.")
}

fn builder(id: &str) -> ProviderDescriptorBuilder {
	let provider_id =
		ProviderId::new(id).expect("Failed to build provider identifier for descriptor test.");

	ProviderDescriptor::builder(provider_id)
}

#[test]
fn descriptor_rejects_insecure_endpoints_and_missing_grants() {
	let err = builder("no-grants")
		.authorization_endpoint(url("https://example.com/auth"))
		.token_endpoint(url("https://example.com/token"))
		.support_grant(GrantType::RefreshToken)
		.build()
		.expect_err("Descriptor builder should require the authorization code grant.");

	assert!(matches!(err, ProviderDescriptorError::MissingAuthorizationCodeGrant));

	let err = builder("insecure")
		.authorization_endpoint(url("http://example.com/auth"))
		.token_endpoint(url("https://example.com/token"))
		.support_grant(GrantType::AuthorizationCode)
		.build()
		.expect_err("Descriptor builder should reject insecure authorization endpoints.");

	assert!(matches!(
		err,
		ProviderDescriptorError::InsecureEndpoint { endpoint: "authorization", .. }
	));

	let err = builder("no-token")
		.authorization_endpoint(url("https://example.com/auth"))
		.support_grant(GrantType::AuthorizationCode)
		.build()
		.expect_err("Descriptor builder should require a token endpoint.");

	assert!(matches!(err, ProviderDescriptorError::MissingTokenEndpoint));
}

#[test]
fn spotify_preset_uses_accounts_service_defaults() {
	let descriptor = ProviderDescriptor::spotify(None, None).expect("Spotify preset should build.");

	assert_eq!(descriptor.id.as_ref(), "spotify");
	assert_eq!(descriptor.endpoints.authorization.as_str(), SPOTIFY_AUTHORIZATION_ENDPOINT);
	assert_eq!(descriptor.endpoints.token.as_str(), SPOTIFY_TOKEN_ENDPOINT);
	assert!(descriptor.supports(GrantType::AuthorizationCode));
	assert!(descriptor.supports(GrantType::RefreshToken));
	assert_eq!(descriptor.preferred_client_auth_method, ClientAuthMethod::ClientSecretBasic);
	assert_eq!(descriptor.quirks.scope_delimiter, ' ');

	let overridden =
		ProviderDescriptor::spotify(None, Some(url("https://accounts.internal/api/token")))
			.expect("Overridden preset should build.");

	assert_eq!(overridden.endpoints.token.as_str(), "https://accounts.internal/api/token");
}

#[test]
fn authorization_url_joins_scopes_with_the_provider_delimiter() {
	let descriptor = builder("commas")
		.authorization_endpoint(url("https://example.com/auth?prompt=consent"))
		.token_endpoint(url("https://example.com/token"))
		.support_grant(GrantType::AuthorizationCode)
		.quirks(ProviderQuirks { scope_delimiter: ',' })
		.build()
		.expect("Descriptor should build.");
	let scope = ScopeSet::new(["b", "a"]).expect("Scope fixture should be valid.");
	let state = StateToken::new("Ab3dE").expect("State fixture should be valid.");
	let built = descriptor.authorization_url(
		"client-1",
		&url("https://relay.example.com/callback"),
		&scope,
		&state,
	);
	let pairs: HashMap<_, _> = built.query_pairs().into_owned().collect();

	assert_eq!(pairs.get("prompt"), Some(&"consent".into()));
	assert_eq!(pairs.get("scope"), Some(&"a,b".into()));
	assert_eq!(pairs.get("state"), Some(&"Ab3dE".into()));
	assert_eq!(pairs.get("client_id"), Some(&"client-1".into()));
}

#[test]
fn default_strategy_prefers_oauth_error_fields() {
	let strategy = DefaultProviderStrategy;
	let ctx = ProviderErrorContext::new(GrantType::AuthorizationCode)
		.with_http_status(400)
		.with_oauth_error("invalid_grant");

	assert_eq!(strategy.classify_token_error(&ctx), ProviderErrorKind::InvalidGrant);

	let ctx = ProviderErrorContext::new(GrantType::AuthorizationCode)
		.with_http_status(401)
		.with_oauth_error("invalid_client");

	assert_eq!(strategy.classify_token_error(&ctx), ProviderErrorKind::InvalidClient);

	let ctx = ProviderErrorContext::new(GrantType::AuthorizationCode)
		.with_http_status(400)
		.with_oauth_error("access_denied");

	assert_eq!(strategy.classify_token_error(&ctx), ProviderErrorKind::Denied);
}

#[test]
fn default_strategy_falls_back_to_status_and_body() {
	let strategy = DefaultProviderStrategy;
	let ctx = ProviderErrorContext::new(GrantType::RefreshToken).with_http_status(401);

	assert_eq!(strategy.classify_token_error(&ctx), ProviderErrorKind::InvalidClient);

	let body_ctx = ProviderErrorContext::new(GrantType::RefreshToken)
		.with_body_preview("error=insufficient_scope");

	assert_eq!(strategy.classify_token_error(&body_ctx), ProviderErrorKind::InsufficientScope);

	let network_ctx = ProviderErrorContext::network_failure(GrantType::RefreshToken);

	assert_eq!(strategy.classify_token_error(&network_ctx), ProviderErrorKind::Transient);

	let unavailable = ProviderErrorContext::new(GrantType::AuthorizationCode).with_http_status(503);

	assert_eq!(strategy.classify_token_error(&unavailable), ProviderErrorKind::Transient);
}

#[test]
fn default_strategy_reads_error_description_when_missing_error_code() {
	let strategy = DefaultProviderStrategy;
	let ctx = ProviderErrorContext::new(GrantType::AuthorizationCode)
		.with_http_status(500)
		.with_error_description("invalid_grant: code already used");

	assert_eq!(strategy.classify_token_error(&ctx), ProviderErrorKind::InvalidGrant);
}

#[test]
fn custom_strategy_can_augment_token_requests() {
	struct MarketStrategy;
	impl ProviderStrategy for MarketStrategy {
		fn classify_token_error(&self, _ctx: &ProviderErrorContext) -> ProviderErrorKind {
			ProviderErrorKind::InvalidGrant
		}

		fn augment_token_request(&self, grant: GrantType, form: &mut BTreeMap<String, String>) {
			form.insert("market".into(), format!("for:{grant}"));
		}
	}

	let strategy = MarketStrategy;
	let mut form = BTreeMap::new();

	strategy.augment_token_request(GrantType::RefreshToken, &mut form);

	assert_eq!(form.get("market").map(String::as_str), Some("for:refresh_token"));

	let mut untouched = BTreeMap::new();

	DefaultProviderStrategy.augment_token_request(GrantType::AuthorizationCode, &mut untouched);

	assert!(untouched.is_empty());
}
