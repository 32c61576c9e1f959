//! Best-effort mirroring of increments to the aggregation service.
//!
//! Every increment is posted once. A failed post is logged and dropped: there is no retry and
//! no queue, and the local store is never touched by the outcome.

use std::{future::Future, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use crate::{daemon::storage::entities::Increment, server::types::RealtimeUpdate};

/// Relative to the server url, so a server mounted under a path prefix keeps it.
pub const REALTIME_UPDATE_PATH: &str = "api/realtime-update";

/// Upper bound for any request to the aggregation service.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves an API path against `server_url`, treating the url as a directory even without a
/// trailing slash.
pub fn api_url(server_url: &Url, path: &str) -> Result<Url> {
    let mut base = server_url.clone();
    if !base.path().ends_with('/') {
        base.set_path(&format!("{}/", base.path()));
    }
    base.join(path)
        .with_context(|| format!("Invalid server url {server_url}"))
}

/// Delivers one update to the aggregation service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IncrementTransport: Send + Sync {
    async fn post(&self, update: RealtimeUpdate) -> Result<()>;
}

/// Posts updates as JSON over HTTP.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(server_url: &Url) -> Result<Self> {
        let endpoint = api_url(server_url, REALTIME_UPDATE_PATH)?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl IncrementTransport for HttpTransport {
    async fn post(&self, update: RealtimeUpdate) -> Result<()> {
        self.client
            .post(self.endpoint.clone())
            .json(&update)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct SyncClient {
    transport: Arc<dyn IncrementTransport>,
}

impl SyncClient {
    pub fn new(transport: Arc<dyn IncrementTransport>) -> Self {
        Self { transport }
    }

    pub fn http(server_url: &Url) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(server_url)?)))
    }

    /// Builds the delivery of `increment`. The returned future never fails and owns
    /// everything it needs, so callers can spawn it and forget about it.
    pub fn send(&self, increment: &Increment) -> impl Future<Output = ()> + Send + 'static {
        let transport = self.transport.clone();
        let update = RealtimeUpdate::from(increment);
        async move {
            let domain = update.domain.clone();
            let seconds = update.seconds;
            match transport.post(update).await {
                Ok(()) => debug!(%domain, seconds, "Synced increment"),
                Err(e) => warn!(%domain, seconds, "Backend sync failed: {e:?}"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use tokio::net::TcpListener;
    use url::Url;

    use crate::{
        daemon::storage::{
            document_store::{DocumentBackend, MemoryStore},
            entities::{Category, Increment},
        },
        server::{build_router, store::RemoteAggregateStore, ApiState},
        utils::clock::DefaultClock,
    };

    use super::{
        api_url, HttpTransport, IncrementTransport, MockIncrementTransport, SyncClient,
        REALTIME_UPDATE_PATH,
    };

    fn increment() -> Increment {
        Increment {
            domain: "github.com".into(),
            category: Category::Productive,
            seconds: 120,
        }
    }

    #[test]
    fn test_api_url_keeps_path_prefix() -> Result<()> {
        let cases = [
            ("http://localhost:3001", "http://localhost:3001/api/realtime-update"),
            ("http://localhost:3001/", "http://localhost:3001/api/realtime-update"),
            ("http://host/sitetime", "http://host/sitetime/api/realtime-update"),
            ("http://host/sitetime/", "http://host/sitetime/api/realtime-update"),
        ];
        for (server_url, expected) in cases {
            let url = api_url(&Url::parse(server_url)?, REALTIME_UPDATE_PATH)?;
            assert_eq!(url.as_str(), expected);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_send_maps_category_to_flag() {
        let mut transport = MockIncrementTransport::new();
        transport
            .expect_post()
            .withf(|update| {
                update.domain == "github.com"
                    && update.seconds == 120
                    && update.productive == Some(true)
            })
            .times(1)
            .returning(|_| Ok(()));

        SyncClient::new(Arc::new(transport)).send(&increment()).await;
    }

    #[tokio::test]
    async fn test_send_swallows_transport_failure() {
        let mut transport = MockIncrementTransport::new();
        transport
            .expect_post()
            .times(1)
            .returning(|_| Err(anyhow!("connection refused")));

        SyncClient::new(Arc::new(transport)).send(&increment()).await;
    }

    #[tokio::test]
    async fn test_http_transport_reaches_service() -> Result<()> {
        let store = Arc::new(
            RemoteAggregateStore::open(DocumentBackend::Memory(MemoryStore::new()), "default")
                .await?,
        );
        let state = ApiState::new(store.clone(), "default", Arc::new(DefaultClock));
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        let server =
            tokio::spawn(async move { axum::serve(listener, build_router(state, &[])).await });

        let transport = HttpTransport::new(&Url::parse(&format!("http://{address}"))?)?;
        transport.post((&increment()).into()).await?;

        let time_data = store.time_data("default").await?;
        assert_eq!(time_data.values().map(|day| day.productive).sum::<u64>(), 120);

        server.abort();
        Ok(())
    }

    #[tokio::test]
    async fn test_http_transport_reports_unreachable_service() -> Result<()> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        let address = listener.local_addr()?;
        drop(listener);

        let transport = HttpTransport::new(&Url::parse(&format!("http://{address}"))?)?;
        assert!(transport.post((&increment()).into()).await.is_err());
        Ok(())
    }
}
