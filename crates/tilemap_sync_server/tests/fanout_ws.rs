//! Live fan-out over a real WebSocket.
//!
//! Spins up the API router on an ephemeral port, subscribes with
//! `tokio-tungstenite` and checks that committed batches are pushed, and that
//! a pushed cursor resumes catch-up without gaps.

use axum::Router;
use futures::StreamExt;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tilemap_core::{Delta, TileRegistry};
use tilemap_sync_server::{
    db::Database,
    handlers::api::{ApiState, api_routes},
    room::RoomId,
    sync::{FanOut, SyncService},
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::{connect_async, tungstenite::Message};

const TOWN: &str = r#"{
    "mapSize": { "width": 4, "height": 4 },
    "tiles": { "grass": { "zIndex": 0 }, "tree": { "zIndex": 1 } }
}"#;

struct TestServer {
    addr: SocketAddr,
    sync: Arc<SyncService>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    async fn start(fanout: bool) -> Self {
        let registry = Arc::new(TileRegistry::from_json_str(TOWN).expect("catalog"));
        let db = Database::open_in_memory().expect("in-memory sqlite");
        let mut sync = SyncService::new(db, registry);
        if fanout {
            sync = sync.with_fanout(Arc::new(FanOut::new(16)));
        }
        let sync = Arc::new(sync);

        let app = Router::new().nest(
            "/api",
            api_routes(ApiState {
                sync: sync.clone(),
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            sync,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    fn subscribe_url(&self, room: &str) -> String {
        format!("ws://{}/api/subscribe?room={}", self.addr, room)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

fn room(id: &str) -> RoomId {
    RoomId::parse(id).unwrap()
}

async fn next_batch<S>(ws: &mut S) -> Value
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for batch")
        .expect("socket closed")
        .expect("socket error");
    match msg {
        Message::Text(text) => serde_json::from_str(text.as_str()).expect("batch json"),
        other => panic!("unexpected message: {:?}", other),
    }
}

#[tokio::test]
async fn subscriber_receives_committed_batches() {
    let server = TestServer::start(true).await;
    let (mut ws, _) = connect_async(server.subscribe_url("post-1"))
        .await
        .expect("Failed to connect");

    let outcome = server
        .sync
        .submit(
            &room("post-1"),
            vec![Delta::add(1, 1, "grass"), Delta::add(9, 9, "tree")],
        )
        .unwrap();

    let batch = next_batch(&mut ws).await;
    assert_eq!(
        batch["deltas"],
        json!([
            { "type": "ADD_TILE", "payload": { "x": 1, "y": 1, "tileId": "grass" } },
            { "type": "ADD_TILE", "payload": { "x": 9, "y": 9, "tileId": "tree" } }
        ])
    );
    assert_eq!(batch["cursor"].as_i64(), outcome.committed);
}

#[tokio::test]
async fn subscribers_only_see_their_room() {
    let server = TestServer::start(true).await;
    let (mut ws, _) = connect_async(server.subscribe_url("post-2"))
        .await
        .expect("Failed to connect");

    server
        .sync
        .submit(&room("post-1"), vec![Delta::add(0, 0, "grass")])
        .unwrap();
    server
        .sync
        .submit(&room("post-2"), vec![Delta::add(3, 3, "tree")])
        .unwrap();

    let batch = next_batch(&mut ws).await;
    assert_eq!(
        batch["deltas"],
        json!([{ "type": "ADD_TILE", "payload": { "x": 3, "y": 3, "tileId": "tree" } }])
    );
}

#[tokio::test]
async fn pushed_cursor_resumes_catch_up() {
    let server = TestServer::start(true).await;
    let (mut ws, _) = connect_async(server.subscribe_url("post-1"))
        .await
        .expect("Failed to connect");

    server
        .sync
        .submit(&room("post-1"), vec![Delta::add(0, 0, "grass")])
        .unwrap();
    let pushed = next_batch(&mut ws).await["cursor"].as_i64().expect("cursor");

    // Subscriber goes away; the next batch is only recoverable via catch-up.
    drop(ws);
    server
        .sync
        .submit(&room("post-1"), vec![Delta::add(0, 0, "tree")])
        .unwrap();

    let caught_up = server.sync.catch_up(&room("post-1"), pushed).unwrap();
    assert_eq!(caught_up.deltas, vec![Delta::add(0, 0, "tree")]);
}

#[tokio::test]
async fn subscribe_is_not_found_when_fanout_is_disabled() {
    let server = TestServer::start(false).await;
    match connect_async(server.subscribe_url("post-1")).await {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 404);
        }
        other => panic!("expected 404, got {:?}", other.map(|(_, response)| response.status())),
    }
}

#[tokio::test]
async fn subscribe_requires_a_room() {
    let server = TestServer::start(true).await;
    let url = format!("ws://{}/api/subscribe", server.addr);
    match connect_async(url).await {
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            assert_eq!(response.status(), 400);
        }
        other => panic!("expected 400, got {:?}", other.map(|(_, response)| response.status())),
    }
}
