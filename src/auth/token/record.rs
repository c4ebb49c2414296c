//! Token set records, their lifecycle helpers, and builders.
//!
//! Records are stored as JSON with the field names `access_token`, `token_type`,
//! `refresh_token` and `expiry` (RFC 3339), so existing `oauth:<id>` entries keep decoding.

// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError};
use time::format_description::well_known::Rfc3339;
// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Tokens are treated as expired this long before their recorded expiry.
pub const EXPIRY_SKEW: Duration = Duration::seconds(10);

const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Current lifecycle status for a token record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token is usable.
	Active,
	/// Token reached its expiry (minus [`EXPIRY_SKEW`]) and must be refreshed.
	Expired,
}

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TokenRecordBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
}

/// Access/refresh token set persisted for one client id.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenRecord {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Token type reported by the provider (usually `Bearer`).
	#[serde(default = "default_token_type")]
	pub token_type: String,
	/// Refresh token secret, if the provider issued one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Absolute expiry; `None` means the token never expires.
	#[serde(
		default,
		skip_serializing_if = "Option::is_none",
		serialize_with = "serialize_expiry",
		deserialize_with = "deserialize_expiry"
	)]
	pub expiry: Option<OffsetDateTime>,
}
impl TokenRecord {
	/// Returns a builder for constructing records from provider responses.
	pub fn builder() -> TokenRecordBuilder {
		TokenRecordBuilder::default()
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		match self.expiry {
			Some(expiry) if expiry - EXPIRY_SKEW <= instant => TokenStatus::Expired,
			_ => TokenStatus::Active,
		}
	}

	/// Convenience helper that checks the status using the current UTC instant.
	pub fn status(&self) -> TokenStatus {
		self.status_at(OffsetDateTime::now_utc())
	}

	/// Returns `true` if the record has expired at the provided instant.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Expired)
	}

	/// Returns `true` if the record is expired relative to the current clock.
	pub fn is_expired(&self) -> bool {
		matches!(self.status(), TokenStatus::Expired)
	}

	/// Serializes the record into the JSON payload kept in the store.
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}

	/// Parses a stored JSON payload, reporting the failing field path on error.
	pub fn from_json(
		payload: &str,
	) -> Result<Self, serde_path_to_error::Error<serde_json::Error>> {
		let mut de = serde_json::Deserializer::from_str(payload);

		serde_path_to_error::deserialize(&mut de)
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &"<redacted>")
			.field("token_type", &self.token_type)
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expiry", &self.expiry)
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug, Default)]
pub struct TokenRecordBuilder {
	access_token: Option<TokenSecret>,
	token_type: Option<String>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenRecordBuilder {
	/// Sets the instant `expires_in` is measured from (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the token type reported by the provider.
	pub fn token_type(mut self, token_type: impl Into<String>) -> Self {
		self.token_type = Some(token_type.into());

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self.access_token.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let expiry = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => Some(instant),
			(None, Some(delta)) => Some(self.issued_at.unwrap_or_else(OffsetDateTime::now_utc) + delta),
			(None, None) => None,
		};
		let token_type = self
			.token_type
			.filter(|value| !value.is_empty())
			.unwrap_or_else(default_token_type);

		Ok(TokenRecord { access_token, token_type, refresh_token: self.refresh_token, expiry })
	}
}

fn default_token_type() -> String {
	DEFAULT_TOKEN_TYPE.into()
}

fn serialize_expiry<S>(expiry: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	match expiry {
		Some(instant) => {
			let formatted = instant.format(&Rfc3339).map_err(serde::ser::Error::custom)?;

			serializer.serialize_str(&formatted)
		},
		None => serializer.serialize_none(),
	}
}

fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
	D: Deserializer<'de>,
{
	let Some(raw) = <Option<String>>::deserialize(deserializer)? else {
		return Ok(None);
	};
	let instant = OffsetDateTime::parse(&raw, &Rfc3339).map_err(DeError::custom)?;

	// A zero timestamp (0001-01-01T00:00:00Z) means "no expiry".
	if instant.year() <= 1 { Ok(None) } else { Ok(Some(instant)) }
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn status_respects_expiry_skew() {
		let record = TokenRecord::builder()
			.access_token("access")
			.refresh_token("refresh")
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Token record builder should succeed.");

		assert_eq!(record.status_at(macros::datetime!(2025-01-01 00:59:49 UTC)), TokenStatus::Active);
		assert_eq!(record.status_at(macros::datetime!(2025-01-01 00:59:50 UTC)), TokenStatus::Expired);
		assert_eq!(record.status_at(macros::datetime!(2025-01-01 02:00 UTC)), TokenStatus::Expired);
	}

	#[test]
	fn records_without_expiry_never_expire() {
		let record = TokenRecord::builder()
			.access_token("forever")
			.build()
			.expect("Token record builder should succeed without expiry.");

		assert_eq!(record.expiry, None);
		assert!(!record.is_expired_at(macros::datetime!(2999-01-01 00:00 UTC)));
	}

	#[test]
	fn builder_handles_relative_expiry_and_token_type() {
		let record = TokenRecord::builder()
			.access_token("secret")
			.token_type("")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Token record builder should support relative expiry calculations.");

		assert_eq!(record.expiry, Some(macros::datetime!(2025-01-01 00:30 UTC)));
		assert_eq!(record.token_type, "Bearer");
		assert_eq!(
			TokenRecord::builder().build().expect_err("Access token is mandatory."),
			TokenRecordBuilderError::MissingAccessToken
		);
	}

	#[test]
	fn json_layout_uses_standard_token_field_names() {
		let record = TokenRecord::builder()
			.access_token("access")
			.token_type("Bearer")
			.refresh_token("refresh")
			.expires_at(macros::datetime!(2025-01-01 01:00 UTC))
			.build()
			.expect("Token record builder should succeed.");
		let json = record.to_json().expect("Record should serialize.");

		assert_eq!(
			json,
			"{\"access_token\":\"access\",\"token_type\":\"Bearer\",\"refresh_token\":\"refresh\",\"expiry\":\"2025-01-01T01:00:00Z\"}"
		);
	}

	#[test]
	fn parses_legacy_payloads_with_offsets_and_zero_expiry() {
		let payload = "{\"access_token\":\"a\",\"token_type\":\"Bearer\",\"refresh_token\":\"r\",\"expiry\":\"2024-05-01T12:00:00.123456789+02:00\"}";
		let record = TokenRecord::from_json(payload).expect("Legacy payload should parse.");

		assert_eq!(record.access_token.expose(), "a");
		assert_eq!(record.refresh_token.as_ref().map(TokenSecret::expose), Some("r"));
		assert_eq!(
			record.expiry.map(OffsetDateTime::unix_timestamp),
			Some(macros::datetime!(2024-05-01 10:00 UTC).unix_timestamp())
		);

		let zero = "{\"access_token\":\"a\",\"token_type\":\"Bearer\",\"expiry\":\"0001-01-01T00:00:00Z\"}";

		assert_eq!(TokenRecord::from_json(zero).expect("Zero expiry should parse.").expiry, None);
	}

	#[test]
	fn parse_errors_name_the_failing_field() {
		let err = TokenRecord::from_json("{\"access_token\":\"a\",\"expiry\":\"yesterday\"}")
			.expect_err("Malformed expiry must fail.");

		assert_eq!(err.path().to_string(), "expiry");
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let record = TokenRecord::builder()
			.access_token("very-secret")
			.refresh_token("also-secret")
			.build()
			.expect("Token record builder should succeed.");
		let rendered = format!("{record:?}");

		assert!(!rendered.contains("very-secret"));
		assert!(!rendered.contains("also-secret"));
	}
}
