use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use repolens_core::QaService;
use repolens_llm::any::AnyProvider;
use tokio::sync::watch;

use crate::error::GatewayError;
use crate::router::build_router;

const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub(crate) struct AppState {
    pub service: Arc<QaService<AnyProvider>>,
    pub started_at: Instant,
}

pub struct GatewayServer {
    addr: SocketAddr,
    auth_token: Option<String>,
    rate_limit: u32,
    max_body_size: usize,
    eviction_interval: Duration,
    service: Arc<QaService<AnyProvider>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl GatewayServer {
    #[must_use]
    pub fn new(
        bind: &str,
        port: u16,
        service: Arc<QaService<AnyProvider>>,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let addr: SocketAddr = format!("{bind}:{port}").parse().unwrap_or_else(|e| {
            tracing::warn!("invalid bind '{bind}': {e}, falling back to 127.0.0.1:{port}");
            SocketAddr::from(([127, 0, 0, 1], port))
        });

        if bind == "0.0.0.0" {
            tracing::warn!("gateway binding to 0.0.0.0, uploaded code is reachable from the network");
        }

        Self {
            addr,
            auth_token: None,
            rate_limit: 120,
            max_body_size: 16 * 1024 * 1024,
            eviction_interval: DEFAULT_EVICTION_INTERVAL,
            service,
            shutdown_rx,
        }
    }

    #[must_use]
    pub fn with_auth(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, limit: u32) -> Self {
        self.rate_limit = limit;
        self
    }

    #[must_use]
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// How often idle repositories are swept. Zero disables the sweep.
    #[must_use]
    pub fn with_eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = interval;
        self
    }

    /// Start the HTTP gateway server.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or encounters a fatal I/O error.
    pub async fn serve(self) -> Result<(), GatewayError> {
        let state = AppState {
            service: Arc::clone(&self.service),
            started_at: Instant::now(),
        };

        let router = build_router(state, self.auth_token, self.rate_limit, self.max_body_size);

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| GatewayError::Bind(self.addr.to_string(), e))?;
        tracing::info!("gateway listening on {}", self.addr);

        if !self.eviction_interval.is_zero() {
            tokio::spawn(evict_idle_loop(
                self.service,
                self.eviction_interval,
                self.shutdown_rx.clone(),
            ));
        }

        let mut shutdown_rx = self.shutdown_rx;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            while !*shutdown_rx.borrow_and_update() {
                if shutdown_rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
            tracing::info!("gateway shutting down");
        })
        .await
        .map_err(|e| GatewayError::Server(format!("{e}")))?;

        Ok(())
    }
}

async fn evict_idle_loop(
    service: Arc<QaService<AnyProvider>>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                service.evict_idle().await;
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
    tracing::debug!("idle eviction stopped");
}

#[cfg(test)]
mod tests {
    use repolens_core::Config;
    use repolens_llm::mock::MockProvider;

    use super::*;

    fn service() -> Arc<QaService<AnyProvider>> {
        Arc::new(QaService::new(
            Arc::new(AnyProvider::Mock(MockProvider::default())),
            &Config::default(),
        ))
    }

    #[test]
    fn server_builder_chain() {
        let (_stx, srx) = watch::channel(false);
        let server = GatewayServer::new("127.0.0.1", 8090, service(), srx)
            .with_auth(Some("token".into()))
            .with_rate_limit(60)
            .with_max_body_size(512)
            .with_eviction_interval(Duration::ZERO);

        assert_eq!(server.rate_limit, 60);
        assert_eq!(server.max_body_size, 512);
        assert!(server.auth_token.is_some());
        assert!(server.eviction_interval.is_zero());
    }

    #[test]
    fn server_invalid_bind_fallback() {
        let (_stx, srx) = watch::channel(false);
        let server = GatewayServer::new("not_an_ip", 9999, service(), srx);
        assert_eq!(server.addr.port(), 9999);
    }

    #[tokio::test]
    async fn eviction_loop_stops_on_shutdown() {
        let (stx, srx) = watch::channel(false);
        let handle = tokio::spawn(evict_idle_loop(service(), Duration::from_millis(5), srx));
        tokio::time::sleep(Duration::from_millis(20)).await;
        stx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
