use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::body::Body;
use axum::extract::{ConnectInfo, DefaultBodyLimit, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Request};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use tower_http::limit::RequestBodyLimitLayer;

use super::error::GatewayError;
use super::handlers::{
    delete_handler, docs_handler, health_handler, query_handler, upload_handler,
};
use super::server::AppState;

/// Bearer token check. The expected token is stored as a blake3 digest so the
/// comparison runs over fixed-length values regardless of input length.
#[derive(Clone)]
struct ApiToken {
    digest: Option<blake3::Hash>,
}

impl ApiToken {
    fn new(token: Option<&str>) -> Self {
        Self {
            digest: token.map(|t| blake3::hash(t.as_bytes())),
        }
    }

    fn permits(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = self.digest else {
            return true;
        };
        let presented = blake3::hash(bearer_token(headers).unwrap_or_default().as_bytes());
        bool::from(presented.as_bytes().ct_eq(expected.as_bytes()))
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

const MAX_TRACKED_CLIENTS: usize = 10_000;
const RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Clone, Copy)]
struct Window {
    requests: u32,
    opened_at: Instant,
}

/// Fixed-window request counter keyed by client IP. A limit of zero disables it.
#[derive(Clone)]
struct RateLimiter {
    limit: u32,
    windows: Arc<Mutex<HashMap<IpAddr, Window>>>,
}

impl RateLimiter {
    fn new(limit: u32) -> Self {
        Self {
            limit,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn admit(&self, ip: IpAddr, now: Instant) -> bool {
        if self.limit == 0 {
            return true;
        }
        let mut windows = self.windows.lock().await;
        if windows.len() >= MAX_TRACKED_CLIENTS && !windows.contains_key(&ip) {
            windows.retain(|_, w| now.duration_since(w.opened_at) < RATE_WINDOW);
        }
        let window = windows.entry(ip).or_insert(Window {
            requests: 0,
            opened_at: now,
        });
        if now.duration_since(window.opened_at) >= RATE_WINDOW {
            *window = Window {
                requests: 0,
                opened_at: now,
            };
        }
        window.requests += 1;
        window.requests <= self.limit
    }
}

fn client_ip<B>(req: &Request<B>) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ci| ci.0.ip())
}

/// Builds the route table. Only `/health` is reachable without the bearer token
/// and outside the rate limit, so load balancers can poll it freely.
pub(crate) fn build_router(
    state: AppState,
    auth_token: Option<String>,
    rate_limit: u32,
    max_body_size: usize,
) -> Router {
    let protected = Router::new()
        .route("/upload", post(upload_handler))
        .route("/query", post(query_handler))
        .route("/generate-docs", post(docs_handler))
        .route("/repos/{id}", delete(delete_handler))
        .layer(middleware::from_fn_with_state(
            RateLimiter::new(rate_limit),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            ApiToken::new(auth_token.as_deref()),
            auth_middleware,
        ))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(DefaultBodyLimit::max(max_body_size));

    Router::new()
        .route("/health", get(health_handler))
        .merge(protected)
        .with_state(state)
}

async fn auth_middleware(
    State(token): State<ApiToken>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !token.permits(req.headers()) {
        tracing::debug!(path = %req.uri().path(), "rejected unauthenticated request");
        return GatewayError::Unauthorized.into_response();
    }
    next.run(req).await
}

async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(&req);
    if !limiter.admit(ip, Instant::now()).await {
        tracing::debug!(%ip, "rate limit exceeded");
        return GatewayError::RateLimited.into_response();
    }
    next.run(req).await
}
