//! Command-line and environment configuration for the relay binary.
//!
//! Every flag can also be supplied through its environment variable, which is how the relay is
//! usually deployed. Misconfiguration surfaces while building the relay, before the listener binds.

// std
use std::{net::SocketAddr, path::PathBuf};
// crates.io
use clap::Parser;
// self
use crate::{
	_prelude::*,
	auth::{AccessGuard, ScopeSet, ScopeValidationError},
	error::ConfigError,
	flows::{CallbackOrder, RelayTimeouts, ReqwestRelay},
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	provider::{DefaultProviderStrategy, ProviderDescriptor, ProviderStrategy},
	store::{FileStore, KeyValueStore, MemoryStore},
};

/// Scopes requested when `--scopes` is not given.
pub const DEFAULT_SCOPES: &str =
	"streaming,user-read-playback-state,user-modify-playback-state,user-read-currently-playing";

/// Relay settings parsed from flags and environment variables.
#[derive(Clone, Parser)]
#[command(name = "oauth2-relay", version, about)]
pub struct Config {
	/// Address the HTTP server binds to.
	#[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8888")]
	pub listen: SocketAddr,
	/// Shared secret callers must send in the `Authorization` header.
	#[arg(long, env = "AUTH_KEY", hide_env_values = true)]
	pub auth_key: Option<String>,
	/// OAuth client id registered with the provider.
	#[arg(long, env = "SPOTIFY_CLIENT_ID")]
	pub client_id: String,
	/// OAuth client secret registered with the provider.
	#[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
	pub client_secret: String,
	/// Redirect URI registered with the provider; must route to `/callback`.
	#[arg(long, env = "REDIRECT_URI", default_value = "https://tnl.ncbr.wtf/callback")]
	pub redirect_uri: Url,
	/// Comma-separated scopes requested on every authorization.
	#[arg(long, env = "OAUTH_SCOPES", default_value = DEFAULT_SCOPES)]
	pub scopes: String,
	/// Overrides the provider authorization endpoint.
	#[arg(long, env = "OAUTH_AUTHORIZATION_ENDPOINT")]
	pub authorization_endpoint: Option<Url>,
	/// Overrides the provider token endpoint.
	#[arg(long, env = "OAUTH_TOKEN_ENDPOINT")]
	pub token_endpoint: Option<Url>,
	/// Redis `host:port` (or `redis://` URL) used as the shared store.
	#[arg(long, env = "REDIS_ADDR")]
	pub redis_addr: Option<String>,
	/// Redis password.
	#[arg(long, env = "REDIS_AUTH", hide_env_values = true)]
	pub redis_auth: Option<String>,
	/// JSON snapshot file used as the store when Redis is not configured.
	#[arg(long, env = "STORE_PATH")]
	pub store_path: Option<PathBuf>,
	/// Lifetime of a pending authorization state, in seconds.
	#[arg(long, env = "STATE_TTL_SECS", default_value_t = 3_600)]
	pub state_ttl_secs: u32,
	/// Deadline for a single store round trip, in seconds.
	#[arg(long, env = "STORE_TIMEOUT_SECS", default_value_t = 5)]
	pub store_timeout_secs: u32,
	/// Deadline for a single token endpoint call, in seconds.
	#[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value_t = 15)]
	pub provider_timeout_secs: u32,
	/// Consume the state before exchanging the code on callbacks.
	#[arg(long, env = "VALIDATE_STATE_FIRST")]
	pub validate_state_first: bool,
	/// Emit logs as JSON lines.
	#[arg(long, env = "LOG_JSON")]
	pub log_json: bool,
}
impl Config {
	/// Parses the comma-separated scope list; an empty list is rejected.
	pub fn scope(&self) -> Result<ScopeSet, ConfigError> {
		let scope = ScopeSet::new(
			self.scopes.split(',').map(str::trim).filter(|scope| !scope.is_empty()),
		)?;

		if scope.is_empty() {
			return Err(ScopeValidationError::Empty.into());
		}

		Ok(scope)
	}

	/// Spotify descriptor with any endpoint overrides applied.
	pub fn descriptor(&self) -> Result<ProviderDescriptor, ConfigError> {
		Ok(ProviderDescriptor::spotify(
			self.authorization_endpoint.clone(),
			self.token_endpoint.clone(),
		)?)
	}

	/// Deadlines derived from the timeout flags.
	pub fn timeouts(&self) -> RelayTimeouts {
		RelayTimeouts {
			store: Duration::seconds(self.store_timeout_secs.into()),
			provider: Duration::seconds(self.provider_timeout_secs.into()),
		}
	}

	/// Opens the configured store: Redis, then the file snapshot, then process memory.
	pub async fn store(&self) -> Result<Arc<dyn KeyValueStore>> {
		if let Some(addr) = &self.redis_addr {
			return self.redis_store(addr).await;
		}
		if let Some(path) = &self.store_path {
			let store = FileStore::open(path)?;

			#[cfg(feature = "tracing")]
			tracing::info!(path = %store.path().display(), "Using file store.");

			return Ok(Arc::new(store));
		}

		#[cfg(feature = "tracing")]
		tracing::warn!("Using in-memory store; token sets do not survive a restart.");

		Ok(Arc::new(MemoryStore::default()))
	}

	#[cfg(feature = "redis")]
	async fn redis_store(&self, addr: &str) -> Result<Arc<dyn KeyValueStore>> {
		let store = crate::store::RedisStore::connect(addr, self.redis_auth.as_deref()).await?;

		#[cfg(feature = "tracing")]
		tracing::info!(endpoint = store.endpoint(), "Using Redis store.");

		Ok(Arc::new(store))
	}

	#[cfg(not(feature = "redis"))]
	async fn redis_store(&self, addr: &str) -> Result<Arc<dyn KeyValueStore>> {
		Err(crate::store::StoreError::Backend {
			message: format!("Redis store requested for {addr} but the `redis` feature is disabled"),
		}
		.into())
	}

	/// Builds the relay described by this configuration.
	pub async fn relay(&self) -> Result<ReqwestRelay> {
		let scope = self.scope()?;
		let descriptor = self.descriptor()?;
		let timeouts = self.timeouts();
		let http_client = ReqwestHttpClient::with_timeout(timeouts.provider)?;
		let strategy: Arc<dyn ProviderStrategy> = Arc::new(DefaultProviderStrategy);
		let store = self.store().await?;
		let order = if self.validate_state_first {
			CallbackOrder::StateFirst
		} else {
			CallbackOrder::ExchangeFirst
		};

		Ok(ReqwestRelay::with_http_client(
			store,
			descriptor,
			strategy,
			self.client_id.clone(),
			self.redirect_uri.clone(),
			http_client,
			Arc::new(ReqwestTransportErrorMapper),
		)
		.with_client_secret(self.client_secret.clone())
		.with_scope(scope)
		.with_guard(AccessGuard::new(self.auth_key.clone()))
		.with_timeouts(timeouts)
		.with_state_ttl(Duration::seconds(self.state_ttl_secs.into()))
		.with_callback_order(order))
	}
}
impl Debug for Config {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Config")
			.field("listen", &self.listen)
			.field("auth_key_set", &self.auth_key.is_some())
			.field("client_id", &self.client_id)
			.field("redirect_uri", &self.redirect_uri.as_str())
			.field("scopes", &self.scopes)
			.field("redis_addr", &self.redis_addr)
			.field("store_path", &self.store_path)
			.field("validate_state_first", &self.validate_state_first)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn parse(extra: &[&str]) -> Config {
		let mut args = vec!["oauth2-relay", "--client-id", "cid", "--client-secret", "csecret"];

		args.extend_from_slice(extra);

		Config::try_parse_from(args).expect("Arguments should parse.")
	}

	#[test]
	fn defaults_match_the_deployed_service() {
		let config = parse(&[]);

		assert_eq!(config.listen.port(), 8888);
		assert_eq!(config.redirect_uri.as_str(), "https://tnl.ncbr.wtf/callback");
		assert_eq!(config.state_ttl_secs, 3_600);
		assert!(!config.validate_state_first);
		assert_eq!(config.timeouts(), RelayTimeouts::default());

		let scope = config.scope().expect("Default scopes should be valid.");

		assert_eq!(scope.len(), 4);
		assert!(scope.contains("user-read-currently-playing"));
	}

	#[test]
	fn scope_list_is_comma_separated_and_must_not_be_empty() {
		let scope = parse(&["--scopes", "streaming, user-read-email"])
			.scope()
			.expect("Scopes should parse.");

		assert_eq!(scope.joined(' ').as_deref(), Some("streaming user-read-email"));
		assert!(matches!(
			parse(&["--scopes", " , "]).scope(),
			Err(ConfigError::InvalidScope(ScopeValidationError::Empty))
		));
	}

	#[test]
	fn insecure_endpoint_overrides_are_rejected() {
		let config = parse(&["--token-endpoint", "http://accounts.example.com/api/token"]);

		assert!(matches!(config.descriptor(), Err(ConfigError::Descriptor(_))));
	}

	#[test]
	fn debug_output_hides_secrets() {
		let rendered = format!("{:?}", parse(&["--auth-key", "hunter2"]));

		assert!(!rendered.contains("hunter2"));
		assert!(!rendered.contains("csecret"));
	}

	#[tokio::test]
	async fn store_path_selects_the_file_store() {
		let dir = tempfile::tempdir().expect("Temp dir should be created.");
		let path = dir.path().join("relay.json");
		let config = parse(&["--store-path", path.to_str().expect("Temp path should be UTF-8.")]);
		let relay = config.relay().await.expect("Relay should build.");

		assert_eq!(relay.state_ttl, Duration::hours(1));
		assert_eq!(relay.scope.len(), 4);
	}
}
