//! Poller tests against a wiremock stand-in for the connection API.

use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use conn_watch::config::{Credentials, WatchConfig};
use conn_watch::poller::{
    render_to_string, ApiClient, CellState, ConnectionTable, CycleOutcome, PollPhase, Poller,
    TableView,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Keeps a copy of every rendered table.
#[derive(Default)]
struct RecordingView {
    frames: Mutex<Vec<ConnectionTable>>,
}

impl RecordingView {
    fn frames(&self) -> Vec<ConnectionTable> {
        self.frames.lock().unwrap().clone()
    }
}

impl TableView for RecordingView {
    fn render(&self, table: &ConnectionTable) {
        self.frames.lock().unwrap().push(table.clone());
    }
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn watch_config(api: &MockServer) -> WatchConfig {
    WatchConfig {
        api_url: api.uri(),
        interval: Duration::from_millis(50),
        request_timeout: Duration::from_secs(2),
        credentials: None,
    }
}

fn poller(config: &WatchConfig, view: Arc<RecordingView>) -> Poller {
    let client = ApiClient::new(config).expect("client should build");
    Poller::new(client, view, config.interval)
}

fn two_connections() -> serde_json::Value {
    json!({
        "connections": [
            { "remote_ip": "8.8.8.8", "remote_port": 51000, "local_port": 443, "status": "ESTABLISHED" },
            { "remote_ip": "1.1.1.1", "remote_port": 40000, "local_port": 443, "status": "ESTABLISHED" },
            { "remote_ip": "8.8.8.8", "remote_port": 51001, "local_port": 443, "status": "ESTABLISHED" }
        ],
        "unique_ips": ["8.8.8.8", "1.1.1.1"],
        "total_connections": 3,
        "unique_ip_count": 2
    })
}

async fn mount_connections(api: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/connections"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(api)
        .await;
}

#[tokio::test]
async fn test_table_renders_before_locations_arrive() {
    let api = MockServer::start().await;
    mount_connections(&api, two_connections()).await;
    Mock::given(method("GET"))
        .and(path("/api/ip-info/8.8.8.8"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "ip": "8.8.8.8",
                    "city": "Mountain View",
                    "country": "United States",
                    "org": "GOOGLE"
                }))
                .set_delay(Duration::from_millis(400)),
        )
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ip-info/1.1.1.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ip": "1.1.1.1",
            "city": "Sydney",
            "country": "Australia"
        })))
        .expect(1)
        .mount(&api)
        .await;

    let view = Arc::new(RecordingView::default());
    let poller = poller(&watch_config(&api), view.clone());

    let outcome = poller.poll_once().await;
    assert_eq!(outcome, CycleOutcome::Rendered { enrichments: 2 });

    // rows are up with every location loading, before any lookup answered
    let frames = view.frames();
    let rendered = frames
        .iter()
        .find(|t| t.phase() == PollPhase::Rendered)
        .expect("table rendered before enrichment");
    assert_eq!(rendered.rows().len(), 3);
    assert_eq!(rendered.cell(ip("8.8.8.8")), Some(&CellState::Loading));
    assert_eq!(rendered.cell(ip("1.1.1.1")), Some(&CellState::Loading));

    poller.wait_for_enrichments().await;

    // the fast lookup was shown while the slow one was still loading
    let frames = view.frames();
    assert!(frames.iter().any(|t| {
        matches!(t.cell(ip("1.1.1.1")), Some(CellState::Resolved(_)))
            && t.cell(ip("8.8.8.8")) == Some(&CellState::Loading)
    }));

    let table = poller.snapshot();
    assert_eq!(table.phase(), PollPhase::Idle);
    assert_eq!(
        table.location_text(ip("8.8.8.8")),
        "Mountain View, United States (GOOGLE)"
    );
    assert_eq!(table.location_text(ip("1.1.1.1")), "Sydney, Australia");
    assert!(render_to_string(&table, false).contains("Sydney, Australia"));
}

#[tokio::test]
async fn test_fetch_failure_shows_banner() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/connections"))
        .respond_with(
            ResponseTemplate::new(503)
                .set_body_json(json!({ "error": "connection data unavailable" })),
        )
        .mount(&api)
        .await;

    let view = Arc::new(RecordingView::default());
    let poller = poller(&watch_config(&api), view.clone());

    assert_eq!(poller.poll_once().await, CycleOutcome::Failed);
    let table = poller.snapshot();
    assert_eq!(table.banner(), Some("connection data unavailable"));
    assert!(table.rows().is_empty());

    let requests = api.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() == "/api/connections"));
}

#[tokio::test]
async fn test_failed_lookup_shows_raw_ip() {
    let api = MockServer::start().await;
    mount_connections(&api, two_connections()).await;
    Mock::given(method("GET"))
        .and(path("/api/ip-info/8.8.8.8"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&api)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/ip-info/1.1.1.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ip": "1.1.1.1" })))
        .mount(&api)
        .await;

    let view = Arc::new(RecordingView::default());
    let poller = poller(&watch_config(&api), view);
    poller.poll_once().await;
    poller.wait_for_enrichments().await;

    let table = poller.snapshot();
    assert_eq!(table.cell(ip("8.8.8.8")), Some(&CellState::Unavailable));
    assert_eq!(table.location_text(ip("8.8.8.8")), "8.8.8.8");
    // an answer without location data also falls back to the address
    assert_eq!(table.location_text(ip("1.1.1.1")), "1.1.1.1");
}

#[tokio::test]
async fn test_empty_list_renders_without_lookups() {
    let api = MockServer::start().await;
    mount_connections(
        &api,
        json!({ "connections": [], "unique_ips": [], "total_connections": 0, "unique_ip_count": 0 }),
    )
    .await;

    let view = Arc::new(RecordingView::default());
    let poller = poller(&watch_config(&api), view);
    assert_eq!(
        poller.poll_once().await,
        CycleOutcome::Rendered { enrichments: 0 }
    );

    let table = poller.snapshot();
    assert!(table.banner().is_none());
    assert!(table.rows().is_empty());
    assert_eq!(api.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_credentials_are_sent() {
    let api = MockServer::start().await;
    // admin:secret
    Mock::given(method("GET"))
        .and(path("/api/connections"))
        .and(header("authorization", "Basic YWRtaW46c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "connections": [], "unique_ips": []
        })))
        .expect(1)
        .mount(&api)
        .await;

    let mut config = watch_config(&api);
    config.credentials = Some(Credentials {
        username: "admin".to_string(),
        password: "secret".to_string(),
    });
    let poller = poller(&config, Arc::new(RecordingView::default()));
    assert_eq!(
        poller.poll_once().await,
        CycleOutcome::Rendered { enrichments: 0 }
    );
}

#[tokio::test]
async fn test_run_polls_until_cancelled() {
    let api = MockServer::start().await;
    mount_connections(
        &api,
        json!({ "connections": [], "unique_ips": [] }),
    )
    .await;

    let poller = Arc::new(poller(&watch_config(&api), Arc::new(RecordingView::default())));
    let cancel = CancellationToken::new();
    let task = {
        let poller = poller.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { poller.run(cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(220)).await;
    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("poller did not stop")
        .expect("poller task panicked");

    let polled = api.received_requests().await.unwrap().len();
    assert!(polled >= 2, "expected several cycles, got {}", polled);

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(api.received_requests().await.unwrap().len(), polled);
}

#[tokio::test]
async fn test_cancel_lets_in_flight_lookups_finish() {
    let api = MockServer::start().await;
    mount_connections(
        &api,
        json!({
            "connections": [
                { "remote_ip": "8.8.8.8", "remote_port": 51000, "local_port": 443, "status": "ESTABLISHED" }
            ],
            "unique_ips": ["8.8.8.8"]
        }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/api/ip-info/8.8.8.8"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "ip": "8.8.8.8", "city": "Mountain View" }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&api)
        .await;

    let mut config = watch_config(&api);
    // only the immediate first tick fires during the test
    config.interval = Duration::from_secs(60);
    let view = Arc::new(RecordingView::default());
    let poller = Arc::new(poller(&config, view.clone()));
    let cancel = CancellationToken::new();
    let task = {
        let poller = poller.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { poller.run(cancel).await })
    };

    // wait until the first cycle has rendered its rows
    tokio::time::timeout(Duration::from_secs(2), async {
        while !view
            .frames()
            .iter()
            .any(|t| matches!(t.phase(), PollPhase::Enriching { .. }))
        {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("first cycle never rendered");
    assert_eq!(poller.snapshot().cell(ip("8.8.8.8")), Some(&CellState::Loading));

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("poller did not stop")
        .expect("poller task panicked");

    // run returned only after the outstanding lookup updated its cell
    let table = poller.snapshot();
    assert!(matches!(
        table.cell(ip("8.8.8.8")),
        Some(CellState::Resolved(geo)) if geo.city.as_deref() == Some("Mountain View")
    ));
    assert_eq!(table.phase(), PollPhase::Idle);
    let lookups = api
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/api/ip-info/8.8.8.8")
        .count();
    assert_eq!(lookups, 1);
}
