#![cfg(feature = "server")]

// crates.io
use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode, header::AUTHORIZATION},
};
use httpmock::prelude::*;
use tower::ServiceExt;
// self
use oauth2_relay::{_preludet::*, flows::CONFIRMATION_MESSAGE, server};

const AUTH_KEY: &str = "device-fleet-key";

async fn get_text(app: &Router, uri: &str, auth: Option<&str>) -> (StatusCode, String) {
	let mut request = Request::builder().uri(uri);

	if let Some(auth) = auth {
		request = request.header(AUTHORIZATION, auth);
	}

	let response = app
		.clone()
		.oneshot(request.body(Body::empty()).expect("Request should build."))
		.await
		.expect("Router should respond.");
	let status = response.status();
	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Body should be readable.");

	(status, String::from_utf8(bytes.to_vec()).expect("Body should be UTF-8."))
}

fn state_of(authorize_url: &str) -> String {
	Url::parse(authorize_url)
		.expect("Body should be a URL.")
		.query_pairs()
		.find(|(key, _)| key == "state")
		.map(|(_, value)| value.into_owned())
		.expect("URL should carry a state.")
}

#[tokio::test]
async fn http_surface_relays_a_full_authorization() {
	let server = MockServer::start_async().await;
	let descriptor = test_descriptor(&server.url("/authorize"), &server.url("/token"));
	let (relay, _) = build_reqwest_test_relay(descriptor, Some(AUTH_KEY));
	let app = server::router(Arc::new(relay));
	let (status, _) = get_text(&app, "/token?id=speaker-1", Some(AUTH_KEY)).await;

	assert_eq!(status, StatusCode::NOT_FOUND);

	let (status, url) = get_text(&app, "/url?id=speaker-1", Some(AUTH_KEY)).await;

	assert_eq!(status, StatusCode::OK);

	let state = state_of(&url);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token").form_urlencoded_tuple("code", "browser-code");
			then.status(200)
				.header("content-type", "application/json")
				.body(
					"{\"access_token\":\"speaker-access\",\"refresh_token\":\"speaker-refresh\",\"token_type\":\"Bearer\",\"expires_in\":3600}",
				);
		})
		.await;
	let (status, body) =
		get_text(&app, &format!("/callback?code=browser-code&state={state}"), None).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, CONFIRMATION_MESSAGE);

	mock.assert_async().await;

	let (status, token) = get_text(&app, "/token?id=speaker-1", Some(AUTH_KEY)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(token, "speaker-access");

	let (status, _) =
		get_text(&app, &format!("/callback?code=browser-code&state={state}"), None).await;

	assert_eq!(status, StatusCode::BAD_REQUEST, "A consumed state must not be accepted twice.");
}

#[tokio::test]
async fn provider_failures_surface_as_bad_gateway() {
	let server = MockServer::start_async().await;
	let descriptor = test_descriptor(&server.url("/authorize"), &server.url("/token"));
	let (relay, _) = build_reqwest_test_relay(descriptor, None);
	let app = server::router(Arc::new(relay));
	let (_, url) = get_text(&app, "/url?id=speaker-2", None).await;
	let state = state_of(&url);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(503).body("upstream unavailable");
		})
		.await;
	let (status, _) = get_text(&app, &format!("/callback?code=any&state={state}"), None).await;

	mock.assert_async().await;

	assert_eq!(status, StatusCode::BAD_GATEWAY);

	let (status, body) =
		get_text(&app, &format!("/callback?state={state}&error=access_denied"), None).await;

	assert_eq!(status, StatusCode::BAD_GATEWAY);
	assert!(body.contains("access_denied"));
}
