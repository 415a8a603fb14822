//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own catalog database and its
//! own stub of the remote provider.

use super::remote_stub::{spawn_remote_stub, StubCounters};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tunescore_server::catalog_store::SqliteCatalogStore;
use tunescore_server::musicbrainz::{MusicBrainzClient, RemoteClientConfig};
use tunescore_server::ratings::RatingAggregator;
use tunescore_server::resolver::CatalogResolver;
use tunescore_server::server::{make_app, RequestsLoggingLevel, ServerConfig};

const SERVER_READY_TIMEOUT_MS: u64 = 5_000;
const SERVER_READY_POLL_INTERVAL_MS: u64 = 10;

/// Test server instance with isolated catalog database and remote stub.
///
/// When dropped, the server gracefully shuts down and temp resources are
/// cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Store handle for direct database assertions in tests
    pub store: Arc<SqliteCatalogStore>,

    /// Hit counters of the remote provider stub
    pub remote_counters: Arc<StubCounters>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port, wired to a fresh remote
    /// stub.
    pub async fn spawn() -> Self {
        let (stub_base_url, remote_counters) = spawn_remote_stub().await;

        let temp_db_dir = TempDir::new().expect("Failed to create temp db dir");
        let db_path = temp_db_dir.path().join("catalog.db");
        let store =
            Arc::new(SqliteCatalogStore::new(&db_path).expect("Failed to open catalog store"));

        let remote = Arc::new(
            MusicBrainzClient::new(RemoteClientConfig {
                metadata_base_url: stub_base_url.clone(),
                cover_art_base_url: format!("{}/cover", stub_base_url),
                user_agent: "tunescore-e2e/0.0".to_string(),
                request_interval: Duration::from_millis(1),
                request_timeout: Duration::from_secs(5),
                cache_ttl: Duration::from_secs(600),
                cache_capacity: 256,
            })
            .expect("Failed to build remote client"),
        );

        let resolver = Arc::new(CatalogResolver::new(store.clone(), remote));
        let aggregator = Arc::new(RatingAggregator::new(store.clone()));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
        };
        let app = make_app(config, resolver, aggregator);

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .expect("Server failed");
        });

        let server = Self {
            base_url,
            store,
            remote_counters,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;
        server
    }

    /// Waits for the server to become ready by polling the home route.
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    return;
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
