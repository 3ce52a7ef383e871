//! The `portal-auth` endpoint.
//!
//! A single route, `/portal-auth`, dispatches on the `action` query
//! parameter and forwards to the member API:
//!
//! | action             | upstream                              |
//! |--------------------|---------------------------------------|
//! | `login` (default)  | `POST member-auth/login`              |
//! | `me`               | `GET member-auth/me`                  |
//! | `members-by-email` | `GET member-auth/members-by-email`    |
//! | `register`         | `POST member-auth/register`           |
//!
//! Successful upstream bodies are relayed unchanged. Upstream rejections are
//! relayed with the upstream status as `{error, details}`.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::any,
};
use rootcause::Report;
use seed_portal_access::PortalApiConfig;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::error::ProxyError;

/// Shared proxy state.
#[derive(Debug)]
pub struct ProxyState {
    client: reqwest::Client,
    upstream: PortalApiConfig,
}

impl ProxyState {
    /// Creates the state for forwarding to `upstream`.
    pub fn new(upstream: PortalApiConfig) -> Result<Self, Report<ProxyError>> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = upstream.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| ProxyError::Upstream {
            endpoint: upstream.base_url().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { client, upstream })
    }

    /// Returns the upstream configuration.
    #[must_use]
    pub fn upstream(&self) -> &PortalApiConfig {
        &self.upstream
    }
}

/// Builds the proxy router.
pub fn app(state: Arc<ProxyState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::AUTHORIZATION,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
            header::CONTENT_TYPE,
        ]);

    Router::new()
        .route("/portal-auth", any(portal_auth))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Login,
    Me,
    MembersByEmail,
    Register,
}

impl Action {
    fn parse(raw: Option<&str>) -> Result<Self, ProxyError> {
        match raw.filter(|a| !a.is_empty()).unwrap_or("login") {
            "login" => Ok(Self::Login),
            "me" => Ok(Self::Me),
            "members-by-email" => Ok(Self::MembersByEmail),
            "register" => Ok(Self::Register),
            other => Err(ProxyError::UnknownAction {
                action: other.to_string(),
            }),
        }
    }

    fn url(self, upstream: &PortalApiConfig) -> String {
        match self {
            Self::Login => upstream.login_url(),
            Self::Me => upstream.profile_url(),
            Self::MembersByEmail => upstream.members_url(),
            Self::Register => upstream.register_url(),
        }
    }

    /// Error message used when the upstream rejection carries none.
    fn failure_message(self) -> &'static str {
        match self {
            Self::Login => "Login failed",
            Self::Me => "Failed to fetch user info",
            Self::MembersByEmail => "Failed to fetch memberships",
            Self::Register => "Registration failed",
        }
    }
}

#[derive(Debug, Deserialize)]
struct PortalAuthQuery {
    action: Option<String>,
    email: Option<String>,
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn portal_auth(
    State(state): State<Arc<ProxyState>>,
    method: Method,
    Query(query): Query<PortalAuthQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Preflights carrying CORS headers are answered by the layer.
    if method == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    let result = match Action::parse(query.action.as_deref()) {
        Ok(action) => forward(&state, action, query.email.as_deref(), &headers, &body).await,
        Err(e) => Err(e.into()),
    };
    match result {
        Ok(response) => response,
        Err(report) => report.current_context().clone().into_response(),
    }
}

#[instrument(skip(state, email, headers, body))]
async fn forward(
    state: &ProxyState,
    action: Action,
    email: Option<&str>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, Report<ProxyError>> {
    let url = action.url(&state.upstream);
    let request = match action {
        Action::Login => {
            let login: LoginBody = parse_body(body)?;
            info!(email = %login.email, "forwarding login");
            state.client.post(&url).json(&json!({
                "email": login.email,
                "password": login.password,
            }))
        }
        Action::Me => state
            .client
            .get(&url)
            .header(header::AUTHORIZATION, authorization(headers)?),
        Action::MembersByEmail => {
            let authorization = authorization(headers)?;
            let email = email
                .filter(|e| !e.is_empty())
                .ok_or(ProxyError::MissingParameter { name: "email" })?;
            state
                .client
                .get(&url)
                .query(&[("email", email)])
                .header(header::AUTHORIZATION, authorization)
        }
        Action::Register => {
            let registration: Map<String, Value> = parse_body(body)?;
            state.client.post(&url).json(&registration)
        }
    };
    relay(action, &url, request).await
}

/// Sends the upstream request and turns its answer into the proxy response.
async fn relay(
    action: Action,
    endpoint: &str,
    request: reqwest::RequestBuilder,
) -> Result<Response, Report<ProxyError>> {
    let failed = |reason: String| ProxyError::Upstream {
        endpoint: endpoint.to_string(),
        reason,
    };

    let response = request
        .header(header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?;
    let status = response.status();
    let data: Value = response.json().await.map_err(|e| failed(e.to_string()))?;
    info!(status = status.as_u16(), "upstream responded");

    if !status.is_success() {
        warn!(status = status.as_u16(), details = %data, "upstream rejected request");
        let message = data
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or(action.failure_message())
            .to_string();
        return Ok((status, Json(json!({ "error": message, "details": data }))).into_response());
    }

    Ok((StatusCode::OK, Json(data)).into_response())
}

fn authorization(headers: &HeaderMap) -> Result<HeaderValue, ProxyError> {
    headers
        .get(header::AUTHORIZATION)
        .cloned()
        .ok_or(ProxyError::MissingAuthorization)
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProxyError> {
    serde_json::from_slice(body).map_err(|e| ProxyError::InvalidBody {
        reason: e.to_string(),
    })
}
