//! HTTP surface of the relay: `/url`, `/callback`, `/token`, and `/health`.
//!
//! Handlers are thin: they pull the raw `Authorization` header and query parameters out of the
//! request and hand them to [`ReqwestRelay`]. Every [`Error`] maps onto exactly one status code.

// crates.io
use axum::{
	Router,
	extract::{Query, State},
	http::{HeaderMap, StatusCode, header::AUTHORIZATION},
	response::{IntoResponse, Response},
	routing::get,
};
use color_eyre::eyre::Report;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
// self
use crate::{
	_prelude::*,
	config::Config,
	flows::{CallbackParams, ReqwestRelay},
};

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "oauth2_relay=info,info";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IdQuery {
	id: String,
}

/// Builds the relay router over a shared relay.
pub fn router(relay: Arc<ReqwestRelay>) -> Router {
	Router::new()
		.route("/url", get(authorize))
		.route("/callback", get(callback))
		.route("/token", get(token))
		.route("/health", get(health))
		.layer(TraceLayer::new_for_http())
		.with_state(relay)
}

/// Installs the global `tracing` subscriber, honoring `RUST_LOG`.
pub fn init_tracing(json: bool) -> color_eyre::Result<()> {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
	let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

	if json { builder.json().try_init() } else { builder.try_init() }.map_err(Report::msg)
}

/// Builds the relay from `config` and serves it until Ctrl-C.
pub async fn serve(config: Config) -> color_eyre::Result<()> {
	init_tracing(config.log_json)?;

	let relay = Arc::new(config.relay().await?);

	if !relay.guard.is_enabled() {
		tracing::warn!("AUTH_KEY is not set; the relay is running in insecure mode.");
	}

	let listener = TcpListener::bind(config.listen).await?;

	tracing::info!(addr = %listener.local_addr()?, "Relay listening.");

	axum::serve(listener, router(relay)).with_graceful_shutdown(shutdown_signal()).await?;

	Ok(())
}

/// HTTP status reported for each relay error.
pub fn status_code(error: &Error) -> StatusCode {
	match error {
		Error::Unauthorized => StatusCode::UNAUTHORIZED,
		Error::BadRequest { .. } => StatusCode::FORBIDDEN,
		Error::UnknownState => StatusCode::BAD_REQUEST,
		Error::NotFound => StatusCode::NOT_FOUND,
		Error::Exchange(e) | Error::Refresh(e) =>
			if e.is_local() {
				StatusCode::INTERNAL_SERVER_ERROR
			} else {
				StatusCode::BAD_GATEWAY
			},
		Error::Storage(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

impl IntoResponse for Error {
	fn into_response(self) -> Response {
		let status = status_code(&self);

		if status.is_server_error() {
			tracing::error!(error = %self, status = status.as_u16(), "Request failed.");
		}

		(status, self.to_string()).into_response()
	}
}

async fn authorize(
	State(relay): State<Arc<ReqwestRelay>>,
	headers: HeaderMap,
	Query(query): Query<IdQuery>,
) -> Result<String> {
	let request = relay.begin_authorization(&query.id, credential(&headers)).await?;

	Ok(request.authorize_url.into())
}

async fn callback(
	State(relay): State<Arc<ReqwestRelay>>,
	Query(params): Query<CallbackParams>,
) -> Result<String> {
	relay.handle_callback(params).await
}

async fn token(
	State(relay): State<Arc<ReqwestRelay>>,
	headers: HeaderMap,
	Query(query): Query<IdQuery>,
) -> Result<String> {
	let token = relay.get_access_token(&query.id, credential(&headers)).await?;

	Ok(token.into_string())
}

async fn health() -> &'static str {
	"ok"
}

fn credential(headers: &HeaderMap) -> Option<&str> {
	headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
}

async fn shutdown_signal() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "Failed to listen for Ctrl-C.");
	}

	tracing::info!("Shutting down.");
}
