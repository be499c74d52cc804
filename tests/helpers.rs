// Shared test helpers for starting the API against fake collaborators.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use conn_watch::config::{Credentials, ServerConfig};
use conn_watch::error_handling::HarvestError;
use conn_watch::geoip::{GeoProvider, IpApiProvider, SystemClock};
use conn_watch::harvest::CommandRunner;
use conn_watch::server::{serve, AppState};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// What the fake harvest command does.
#[allow(dead_code)] // Not every test file uses every behaviour
pub enum Harvest {
    Output(String),
    ExitFailure,
    Timeout,
}

/// Runner returning canned output instead of spawning `nsenter`.
pub struct FakeRunner {
    behaviour: Harvest,
    pub calls: AtomicUsize,
}

impl FakeRunner {
    pub fn new(behaviour: Harvest) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self) -> Result<String, HarvestError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            Harvest::Output(out) => Ok(out.clone()),
            Harvest::ExitFailure => Err(HarvestError::ExitStatus {
                code: Some(1),
                stderr: "nsenter: Operation not permitted".to_string(),
            }),
            Harvest::Timeout => Err(HarvestError::Timeout(Duration::from_secs(5))),
        }
    }
}

/// A running API server. Dropping it stops the server.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    _shutdown: oneshot::Sender<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Server config pointing the geolocation provider at `geo_endpoint`.
#[allow(dead_code)]
pub fn test_config(geo_endpoint: &str, password: Option<&str>) -> ServerConfig {
    ServerConfig {
        geo_endpoint: geo_endpoint.to_string(),
        geo_timeout: Duration::from_secs(2),
        credentials: password.map(|p| Credentials {
            username: "admin".to_string(),
            password: p.to_string(),
        }),
        ..Default::default()
    }
}

/// Starts the API on an ephemeral port with `runner` and the real ipapi.co
/// client aimed at `config.geo_endpoint`.
pub async fn start_server(runner: Arc<dyn CommandRunner>, config: ServerConfig) -> TestServer {
    let client = reqwest::Client::builder()
        .build()
        .expect("Failed to build geo client");
    let provider: Arc<dyn GeoProvider> = Arc::new(IpApiProvider::new(
        client,
        config.geo_endpoint.clone(),
        config.geo_timeout,
    ));
    let state = AppState::with_parts(runner, provider, Arc::new(SystemClock), &config);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local addr");

    let (tx, rx) = oneshot::channel::<()>();
    let server_state = state.clone();
    tokio::spawn(async move {
        let shutdown = async move {
            let _ = rx.await;
        };
        if let Err(e) = serve(listener, server_state, shutdown).await {
            eprintln!("test server error: {}", e);
        }
    });

    TestServer {
        addr,
        state,
        _shutdown: tx,
    }
}
