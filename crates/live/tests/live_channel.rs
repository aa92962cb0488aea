//! Drives a [`LiveUpdateChannel`] against a local WebSocket server.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use islandboard_core::assembler::IslandViewAssembler;
use islandboard_core::island;
use islandboard_core::view::DataOrigin;
use islandboard_events::{ConnectionState, DashboardEvent, EventBus};
use islandboard_live::{LiveConfig, LiveUpdateChannel};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

type ServerStream = WebSocketStream<tokio::net::TcpStream>;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    (listener, url)
}

async fn accept(listener: &TcpListener) -> ServerStream {
    let (tcp, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(tcp).await.unwrap()
}

/// Read the next text frame as JSON.
async fn next_json(ws: &mut ServerStream) -> Value {
    loop {
        match ws.next().await.expect("stream open").unwrap() {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            _ => continue,
        }
    }
}

fn lottery_update(island: &str, numbers: &[u32]) -> Message {
    Message::Text(
        json!({
            "type": "lottery_update",
            "island": island,
            "data": {
                "island": island,
                "operator": "Supreme Ventures",
                "games": [{ "game": "Lotto", "numbers": numbers, "draw_date": "2024-06-01" }],
                "last_updated": "2024-06-01T20:00:00Z"
            }
        })
        .to_string(),
    )
}

fn config(url: String) -> LiveConfig {
    LiveConfig::new(url).with_reconnect_delay(Duration::from_millis(50))
}

async fn wait_for<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn subscribes_to_every_island_and_applies_valid_patches() {
    let (listener, url) = bind().await;
    let assembler = Arc::new(IslandViewAssembler::new(false, Utc::now()));
    let bus = Arc::new(EventBus::default());
    let mut events = bus.subscribe();

    let channel = LiveUpdateChannel::start(config(url), Arc::clone(&assembler), Arc::clone(&bus));

    let mut ws = accept(&listener).await;
    let subscribe = next_json(&mut ws).await;
    let expected: Vec<&str> = island::island_ids().collect();
    assert_eq!(subscribe["type"], "subscribe");
    assert_eq!(subscribe["islands"], json!(expected));

    ws.send(Message::Text("{ not json".into())).await.unwrap();
    ws.send(Message::Text(json!({"type": "lottery_update", "island": "jamaica"}).to_string()))
        .await
        .unwrap();
    ws.send(Message::Text(json!({"type": "hotel_update", "island": "jamaica", "data": {}}).to_string()))
        .await
        .unwrap();
    ws.send(lottery_update("jamaica", &[3, 11, 19, 24, 30, 37]))
        .await
        .unwrap();

    wait_for(|| {
        let assembler = Arc::clone(&assembler);
        async move {
            assembler
                .island("jamaica")
                .await
                .is_some_and(|r| r.origin == DataOrigin::Unreviewed)
        }
    })
    .await;

    let record = assembler.island("jamaica").await.unwrap();
    assert_eq!(record.games.len(), 1);
    assert_eq!(record.games[0].numbers, [3, 11, 19, 24, 30, 37]);
    assert_eq!(channel.state(), ConnectionState::Connected);

    // Only the valid frame produced a patch.
    let mut patched = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, DashboardEvent::IslandPatched { .. }) {
            patched += 1;
        }
    }
    assert_eq!(patched, 1);

    channel.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn repeated_patch_does_not_bump_the_version() {
    let (listener, url) = bind().await;
    let assembler = Arc::new(IslandViewAssembler::new(false, Utc::now()));
    let channel = LiveUpdateChannel::start(
        config(url),
        Arc::clone(&assembler),
        Arc::new(EventBus::default()),
    );

    let mut ws = accept(&listener).await;
    next_json(&mut ws).await;

    ws.send(lottery_update("trinidad", &[1, 2, 3, 4, 5])).await.unwrap();
    wait_for(|| {
        let assembler = Arc::clone(&assembler);
        async move { assembler.island("trinidad").await.is_some_and(|r| !r.is_empty()) }
    })
    .await;
    let version = assembler.snapshot().await.version;

    ws.send(lottery_update("trinidad", &[1, 2, 3, 4, 5])).await.unwrap();
    // A different island afterwards proves the duplicate was processed.
    ws.send(lottery_update("barbados", &[6, 7, 8, 9, 10])).await.unwrap();
    wait_for(|| {
        let assembler = Arc::clone(&assembler);
        async move { assembler.island("barbados").await.is_some_and(|r| !r.is_empty()) }
    })
    .await;

    assert_eq!(assembler.snapshot().await.version, version + 1);
    channel.shutdown(Duration::from_secs(5)).await.unwrap();
}

#[tokio::test]
async fn reconnects_and_resubscribes_after_the_server_drops() {
    let (listener, url) = bind().await;
    let bus = Arc::new(EventBus::default());
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();

    let server = tokio::spawn(async move {
        for _ in 0..2 {
            let mut ws = accept(&listener).await;
            seen_tx.send(next_json(&mut ws).await).unwrap();
            ws.close(None).await.unwrap();
        }
        // Hold the listener so later attempts queue instead of failing.
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let channel = LiveUpdateChannel::start(
        config(url),
        Arc::new(IslandViewAssembler::new(false, Utc::now())),
        Arc::clone(&bus),
    );

    for _ in 0..2 {
        let subscribe = tokio::time::timeout(Duration::from_secs(5), seen_rx.recv())
            .await
            .expect("subscribe in time")
            .unwrap();
        assert_eq!(subscribe["type"], "subscribe");
        assert_eq!(
            subscribe["islands"].as_array().unwrap().len(),
            island::ISLANDS.len()
        );
    }

    channel.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_eq!(channel.state(), ConnectionState::Disconnected);
    server.abort();
}

#[tokio::test]
async fn shutdown_closes_the_socket() {
    let (listener, url) = bind().await;
    let channel = LiveUpdateChannel::start(
        config(url),
        Arc::new(IslandViewAssembler::new(false, Utc::now())),
        Arc::new(EventBus::default()),
    );

    let mut ws = accept(&listener).await;
    next_json(&mut ws).await;
    let mut state = channel.subscribe_state();
    state
        .wait_for(|s| *s == ConnectionState::Connected)
        .await
        .unwrap();

    channel.shutdown(Duration::from_secs(5)).await.unwrap();

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "client should close its socket on shutdown");
}
