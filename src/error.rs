//! Relay-level error types shared across flows, providers, and stores.

// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
///
/// Every variant maps onto exactly one failure a caller of the HTTP surface can observe; nothing
/// here is retried internally.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Missing or mismatched access credential.
	#[error("Unauthorized.")]
	Unauthorized,
	/// A required request parameter is missing or malformed.
	#[error("Bad request: {reason}.")]
	BadRequest {
		/// What was wrong with the request.
		reason: String,
	},
	/// The returned state is unknown, expired, or already consumed.
	#[error("Unknown or expired state.")]
	UnknownState,
	/// No token record exists for the requested client id.
	#[error("No token record exists for this client id.")]
	NotFound,
	/// The provider rejected or failed the authorization-code exchange.
	#[error("Authorization code exchange failed: {0}")]
	Exchange(#[source] ProviderError),
	/// The provider rejected or failed the refresh of an expired token set.
	#[error("Token refresh failed: {0}")]
	Refresh(#[source] ProviderError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(#[from] crate::store::StoreError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}
impl Error {
	/// Shorthand for [`Error::BadRequest`].
	pub fn bad_request(reason: impl Into<String>) -> Self {
		Self::BadRequest { reason: reason.into() }
	}
}
impl From<crate::auth::IdentifierError> for Error {
	fn from(e: crate::auth::IdentifierError) -> Self {
		Self::bad_request(e.to_string().trim_end_matches('.'))
	}
}

/// Failures reported while talking to the identity provider's token endpoint.
#[derive(Debug, ThisError)]
pub enum ProviderError {
	/// Local configuration problem detected while preparing the request.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Provider rejected the grant (e.g., bad code or refresh token).
	#[error("Provider rejected the grant: {reason}.")]
	InvalidGrant {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// Provider refused the configured scopes.
	#[error("Provider refused the requested scopes: {reason}.")]
	InsufficientScope {
		/// Provider-supplied reason string.
		reason: String,
	},
	/// The user or provider denied the authorization request before a code was issued.
	#[error("Authorization was denied: {reason}.")]
	Denied {
		/// Provider-supplied `error`/`error_description` summary.
		reason: String,
	},
	/// Stored token set carries no refresh token, so it cannot be renewed.
	#[error("Stored token set has no refresh token.")]
	MissingRefreshToken,
}
impl ProviderError {
	/// Returns true when the failure originates from local configuration rather than upstream.
	pub fn is_local(&self) -> bool {
		matches!(self, Self::Config(_))
	}
}

/// Configuration and validation failures raised by the relay.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Descriptor does not enable the requested grant.
	#[error("Descriptor `{descriptor}` does not enable the {grant} grant.")]
	UnsupportedGrant {
		/// Provider identifier string.
		descriptor: String,
		/// Disabled grant label.
		grant: &'static str,
	},
	/// Scope configuration cannot be normalized.
	#[error("Configured scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token response could not be turned into a token record.
	#[error("Token response could not be turned into a token record.")]
	TokenRecord(#[from] crate::auth::TokenRecordBuilderError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Provider returned an unexpected but non-fatal response.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	TokenEndpoint {
		/// Provider- or relay-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with malformed JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	TokenResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// The provider call did not complete within its deadline.
	#[error("Token endpoint did not answer within {timeout}.")]
	DeadlineExceeded {
		/// Deadline that elapsed.
		timeout: Duration,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::ClientId;

	#[test]
	fn identifier_errors_become_bad_requests() {
		let err: Error = ClientId::new("").expect_err("Empty client id must be rejected.").into();

		assert!(matches!(err, Error::BadRequest { .. }));
		assert_eq!(err.to_string(), "Bad request: Client identifier cannot be empty.");
	}

	#[test]
	fn provider_errors_keep_their_source() {
		let err = Error::Refresh(ProviderError::MissingRefreshToken);
		let source = StdError::source(&err).expect("Refresh errors should expose their cause.");

		assert_eq!(source.to_string(), "Stored token set has no refresh token.");
		assert_eq!(err.to_string(), "Token refresh failed: Stored token set has no refresh token.");
	}

	#[test]
	fn config_failures_are_local() {
		assert!(ProviderError::Config(ConfigError::ExpiresInOutOfRange).is_local());
		assert!(!ProviderError::InvalidGrant { reason: "stale".into() }.is_local());
	}
}
