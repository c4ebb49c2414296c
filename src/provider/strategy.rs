//! Provider strategy hooks that customize token requests and classify their failures.
//!
//! Implementations decorate outgoing token requests and normalize error mapping without tying
//! the relay to any particular HTTP client.

// self
use crate::{_prelude::*, error::ProviderError, provider::descriptor::GrantType};

/// Strategy hook that lets providers decorate requests and classify errors.
///
/// Implementors must be `Send + Sync`; the hooks only see crate-owned data so downstream crates
/// never depend on reqwest types.
pub trait ProviderStrategy: Send + Sync {
	/// Maps a failed token request into the relay's error categories.
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;

	/// Adds provider-specific form parameters before a token request is dispatched.
	///
	/// The default implementation adds nothing.
	fn augment_token_request(&self, _grant: GrantType, _form: &mut BTreeMap<String, String>) {}
}

/// Canonical provider error categories used by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// Provider rejected the grant (bad or reused code, revoked refresh token).
	InvalidGrant,
	/// Client authentication failed.
	InvalidClient,
	/// Provider refused the configured scopes.
	InsufficientScope,
	/// The user or provider denied access.
	Denied,
	/// Failure is temporary; a later attempt may succeed.
	Transient,
}
impl ProviderErrorKind {
	/// Builds the [`ProviderError`] for this category. `Transient` is handled by the caller
	/// because it carries response metadata.
	pub(crate) fn into_error(self, reason: String) -> Option<ProviderError> {
		match self {
			Self::InvalidGrant => Some(ProviderError::InvalidGrant { reason }),
			Self::InvalidClient => Some(ProviderError::InvalidClient { reason }),
			Self::InsufficientScope => Some(ProviderError::InsufficientScope { reason }),
			Self::Denied => Some(ProviderError::Denied { reason }),
			Self::Transient => None,
		}
	}
}

/// Context handed to [`ProviderStrategy::classify_token_error`].
///
/// Only primitive data is kept (status code, OAuth fields, body preview) so strategies stay
/// decoupled from the HTTP client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Grant type associated with the failing request.
	pub grant_type: GrantType,
	/// HTTP status code returned by the provider, when available.
	pub http_status: Option<u16>,
	/// Provider-supplied OAuth `error` field.
	pub oauth_error: Option<String>,
	/// Provider-supplied OAuth `error_description` field.
	pub error_description: Option<String>,
	/// Preview of the response body for non-JSON payloads.
	pub body_preview: Option<String>,
	/// Indicates whether the failure originated from the network/transport layer.
	pub network_error: bool,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a new context scoped to the provided grant type.
	pub fn new(grant_type: GrantType) -> Self {
		Self {
			grant_type,
			http_status: None,
			oauth_error: None,
			error_description: None,
			body_preview: None,
			network_error: false,
		}
	}

	/// Convenience constructor for transport-level/network failures.
	pub fn network_failure(grant_type: GrantType) -> Self {
		Self { network_error: true, ..Self::new(grant_type) }
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the OAuth error code returned by the provider.
	pub fn with_oauth_error(mut self, error: impl Into<String>) -> Self {
		self.oauth_error = Some(error.into());

		self
	}

	/// Adds the OAuth `error_description` field.
	pub fn with_error_description(mut self, description: impl Into<String>) -> Self {
		self.error_description = Some(description.into());

		self
	}

	/// Adds a body preview, truncated to a fixed number of characters.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		let body = body.into();
		let mut preview: String = body.chars().take(Self::BODY_PREVIEW_LIMIT).collect();

		if preview.len() < body.len() {
			preview.push('…');
		}

		self.body_preview = Some(preview);

		self
	}
}

/// OAuth error codes and the category each one maps to.
const OAUTH_ERROR_CODES: &[(&str, ProviderErrorKind)] = &[
	("invalid_grant", ProviderErrorKind::InvalidGrant),
	("invalid_request", ProviderErrorKind::InvalidGrant),
	("invalid_client", ProviderErrorKind::InvalidClient),
	("unauthorized_client", ProviderErrorKind::InvalidClient),
	("invalid_scope", ProviderErrorKind::InsufficientScope),
	("insufficient_scope", ProviderErrorKind::InsufficientScope),
	("access_denied", ProviderErrorKind::Denied),
	("temporarily_unavailable", ProviderErrorKind::Transient),
	("server_error", ProviderErrorKind::Transient),
];

/// Default strategy following RFC 6749 error codes.
///
/// Structured OAuth fields win, then hints found in the description or body text, then the HTTP
/// status. Network failures are always transient.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl Display for DefaultProviderStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-provider-strategy")
	}
}
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_token_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if ctx.network_error {
			return ProviderErrorKind::Transient;
		}

		ctx.oauth_error
			.as_deref()
			.and_then(exact_code)
			.or_else(|| ctx.error_description.as_deref().and_then(exact_code))
			.or_else(|| ctx.error_description.as_deref().and_then(embedded_code))
			.or_else(|| ctx.body_preview.as_deref().and_then(embedded_code))
			.unwrap_or_else(|| classify_status(ctx.http_status))
	}
}

fn exact_code(value: &str) -> Option<ProviderErrorKind> {
	let value = value.trim();

	OAUTH_ERROR_CODES
		.iter()
		.find(|(code, _)| value.eq_ignore_ascii_case(code))
		.map(|(_, kind)| *kind)
}

fn embedded_code(text: &str) -> Option<ProviderErrorKind> {
	let lowered = text.to_ascii_lowercase();

	OAUTH_ERROR_CODES.iter().find(|(code, _)| lowered.contains(code)).map(|(_, kind)| *kind)
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(400 | 404 | 410) => ProviderErrorKind::InvalidGrant,
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(403) => ProviderErrorKind::InsufficientScope,
		_ => ProviderErrorKind::Transient,
	}
}
