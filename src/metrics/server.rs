//! HTTP endpoint exposing the gauge registry for pull-based collection.

use std::sync::Arc;

use anyhow::{Context, Result};
use poem::listener::TcpListener;
use poem::web::Data;
use poem::{get, handler, EndpointExt, Route, Server};
use tokio::sync::oneshot;
use tracing::info;

use super::MetricStore;

#[handler]
fn scrape(store: Data<&Arc<MetricStore>>) -> String {
    store.render()
}

/// Serves `GET /metrics` from the shared [`MetricStore`].
pub struct MetricsServer {
    store: Arc<MetricStore>,
    listen_addr: String,
}

impl MetricsServer {
    pub fn new(store: Arc<MetricStore>, listen_addr: String) -> Self {
        Self { store, listen_addr }
    }

    /// Run until the server fails or the shutdown signal fires.
    pub async fn run(self, mut shutdown_rx: oneshot::Receiver<()>) -> Result<()> {
        info!("serving metrics on http://{}/metrics", self.listen_addr);

        let app = Route::new().at("/metrics", get(scrape)).data(self.store);
        let listener = TcpListener::bind(&self.listen_addr);

        tokio::select! {
            result = Server::new(listener).run(app) => {
                result.context("metrics server failed")
            }
            _ = &mut shutdown_rx => {
                info!("metrics server shutdown requested");
                Ok(())
            }
        }
    }
}
