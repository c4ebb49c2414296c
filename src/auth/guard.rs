//! Shared-secret gate for the client-facing relay operations.

// crates.io
use subtle::ConstantTimeEq;
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Compares inbound credentials against an optional shared secret.
///
/// Without a secret the guard is disabled and every request passes; the server logs this as an
/// insecure mode at startup.
#[derive(Clone, Default)]
pub struct AccessGuard {
	secret: Option<TokenSecret>,
}
impl AccessGuard {
	/// Creates a guard; empty secrets are treated as "not configured".
	pub fn new<S>(secret: Option<S>) -> Self
	where
		S: Into<String>,
	{
		let secret = secret.map(Into::into).filter(|value| !value.is_empty()).map(TokenSecret::new);

		Self { secret }
	}

	/// Guard that lets every request through.
	pub fn disabled() -> Self {
		Self::default()
	}

	/// Returns true when a secret is configured.
	pub fn is_enabled(&self) -> bool {
		self.secret.is_some()
	}

	/// Checks the inbound credential, failing with [`Error::Unauthorized`] on mismatch.
	pub fn check(&self, credential: Option<&str>) -> Result<()> {
		let Some(secret) = &self.secret else {
			return Ok(());
		};

		match credential {
			Some(value) if constant_time_eq(secret.expose(), value) => Ok(()),
			_ => {
				#[cfg(feature = "tracing")]
				tracing::warn!(credential_present = credential.is_some(), "Rejected request credential.");

				Err(Error::Unauthorized)
			},
		}
	}
}
impl Debug for AccessGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessGuard").field("enabled", &self.is_enabled()).finish()
	}
}

fn constant_time_eq(expected: &str, actual: &str) -> bool {
	let expected = expected.as_bytes();
	let actual = actual.as_bytes();

	// Length is not secret; only the content comparison must not short-circuit.
	expected.len() == actual.len() && bool::from(expected.ct_eq(actual))
}
