//! Correlation state tokens that bind an authorization redirect to the client that started it.

// std
use std::{borrow::Borrow, ops::Deref};
// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{
	_prelude::*,
	auth::id::{IdentifierError, def_id, validate_view},
};

/// Number of characters in a freshly generated state token.
pub const STATE_TOKEN_LEN: usize = 5;

def_id! { StateToken, "Opaque state value that must round-trip through the provider redirect.", "State" }
impl StateToken {
	/// Generates a new token of [`STATE_TOKEN_LEN`] alphanumeric characters.
	///
	/// Each character is drawn uniformly from `[A-Za-z0-9]` using the thread-local
	/// cryptographically secure generator, so concurrent callers never share generator state.
	pub fn generate() -> Self {
		Self(random_string(STATE_TOKEN_LEN))
	}
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}
