//! End-to-end session tests against an in-process WebSocket venue.
//!
//! Each test binds a real listener on a loopback port, speaks the wire
//! protocol from the server side, and drives the client through it.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use arena_client::{ArenaClient, ClientConfig, ConnState};

fn test_config(addr: SocketAddr, name: &str) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.server_url = format!("http://{}", addr);
    config.connection.reconnect_delay = Duration::from_millis(100);
    config.connection.connect_retry_delay = Duration::from_millis(100);
    let mut token_path = std::env::temp_dir();
    token_path.push(format!("arena-session-flow-{}-{}", std::process::id(), name));
    token_path.push("token.json");
    config.auth.token_path = token_path;
    config
}

fn bootstrap_ok_frame() -> String {
    json!({
        "type": "bootstrap_ok",
        "user": {"id": 1, "username": "default"},
        "account": {
            "id": 1, "user_id": 1, "name": "default",
            "initial_capital": "10000", "current_cash": "10000", "frozen_cash": "0"
        }
    })
    .to_string()
}

fn snapshot_full_frame() -> String {
    json!({
        "type": "snapshot_full",
        "overview": {
            "account": {
                "id": 1, "user_id": 1, "name": "default",
                "initial_capital": "10000", "current_cash": "9500", "frozen_cash": "100"
            },
            "return_rate": "-0.05",
            "total_notional_value": "9500",
            "positions_notional_value": "500"
        },
        "positions": [{
            "id": 1, "account_id": 1, "symbol": "BTC", "market": "US",
            "quantity": "5", "available_quantity": "5", "avg_cost": "100",
            "last_price": "101"
        }],
        "orders": [],
        "all_asset_curves": [{
            "account_id": 1, "account_name": "default", "points": []
        }]
    })
    .to_string()
}

/// Accept connections forever; count them and forward every text frame to
/// the returned channel. Answers `bootstrap` with `bootstrap_ok` and
/// `get_snapshot` with a full snapshot.
async fn spawn_scripted_venue() -> (SocketAddr, Arc<AtomicUsize>, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();

    let counter = Arc::clone(&connections);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let frame_tx = frame_tx.clone();
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    if let Message::Text(text) = message {
                        let reply = if text.contains("\"bootstrap\"") {
                            Some(bootstrap_ok_frame())
                        } else if text.contains("\"get_snapshot\"") {
                            Some(snapshot_full_frame())
                        } else {
                            None
                        };
                        let _ = frame_tx.send(text);
                        if let Some(reply) = reply {
                            if ws.send(Message::Text(reply)).await.is_err() {
                                return;
                            }
                        }
                    }
                }
            });
        }
    });

    (addr, connections, frame_rx)
}

async fn wait_until(mut condition: impl FnMut() -> bool, what: &str) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("timed out waiting for {}", what);
}

#[tokio::test]
async fn test_bootstrap_then_snapshot_populates_state() {
    let (addr, _connections, mut frames) = spawn_scripted_venue().await;
    let client = ArenaClient::new(test_config(addr, "bootstrap")).unwrap();
    client.ensure_connected();
    client.wait_until_open().await.unwrap();

    // First outbound frame is the bootstrap handshake
    let first = frames.recv().await.unwrap();
    assert!(first.contains("\"type\":\"bootstrap\""));
    assert!(first.contains("\"username\":\"default\""));

    // bootstrap_ok triggers the pull; the snapshot lands in state
    let second = frames.recv().await.unwrap();
    assert!(second.contains("\"type\":\"get_snapshot\""));

    wait_until(
        || {
            let state = client.snapshot();
            state.is_bootstrapped() && state.overview.is_some()
        },
        "snapshot to be applied",
    )
    .await;

    let state = client.snapshot();
    assert_eq!(state.positions.len(), 1);
    assert_eq!(state.positions[0].symbol, "BTC");
    assert_eq!(state.asset_curves.len(), 1);

    client.shutdown();
}

#[tokio::test]
async fn test_ensure_connected_twice_opens_one_connection() {
    let (addr, connections, _frames) = spawn_scripted_venue().await;
    let client = ArenaClient::new(test_config(addr, "single")).unwrap();
    client.ensure_connected();
    client.ensure_connected();
    client.wait_until_open().await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(connections.load(Ordering::SeqCst), 1);

    client.shutdown();
}

#[tokio::test]
async fn test_abnormal_drop_triggers_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&connections);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                // First session: read the bootstrap, then drop the socket
                // without a close frame
                if n == 1 {
                    let _ = ws.next().await;
                    return;
                }
                // Later sessions stay up
                while let Some(Ok(message)) = ws.next().await {
                    if let Message::Text(text) = message {
                        if text.contains("\"bootstrap\"") {
                            let _ = ws.send(Message::Text(bootstrap_ok_frame())).await;
                        }
                    }
                }
            });
        }
    });

    let client = ArenaClient::new(test_config(addr, "reconnect")).unwrap();
    client.ensure_connected();
    client.wait_until_open().await.unwrap();

    wait_until(
        || connections.load(Ordering::SeqCst) >= 2,
        "reconnect after abnormal drop",
    )
    .await;

    client.shutdown();
}

#[tokio::test]
async fn test_normal_close_does_not_reconnect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&connections);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                // Read the bootstrap, then close deliberately
                let _ = ws.next().await;
                let _ = ws
                    .send(Message::Close(Some(CloseFrame {
                        code: CloseCode::Normal,
                        reason: "done".into(),
                    })))
                    .await;
            });
        }
    });

    let client = ArenaClient::new(test_config(addr, "no-reconnect")).unwrap();
    client.ensure_connected();
    client.wait_until_open().await.unwrap();

    // Well past the 100ms reconnect delay
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(connections.load(Ordering::SeqCst), 1);
    assert_eq!(client.conn_state(), ConnState::Closed);
}

#[tokio::test]
async fn test_order_needs_confirmation_then_goes_out_with_token() {
    use arena_common::{OrderType, Side};
    use arena_client::{ClientError, OrderRequest};
    use rust_decimal::Decimal;

    let (addr, _connections, mut frames) = spawn_scripted_venue().await;
    let client = ArenaClient::new(test_config(addr, "order")).unwrap();
    client.clear_session_token().await.unwrap();
    client.ensure_connected();
    client.wait_until_open().await.unwrap();

    wait_until(|| client.snapshot().overview.is_some(), "bootstrap + snapshot").await;
    // Drain the handshake frames
    while frames.try_recv().is_ok() {}

    let draft = OrderRequest {
        symbol: "BTC".to_string(),
        market: "US".to_string(),
        side: Side::Long,
        order_type: OrderType::Limit,
        price: Some(Decimal::from(100)),
        quantity: Decimal::from(2),
        leverage: 1,
        session_token: None,
    };

    // No cached token yet: the confirmation step is required
    let result = client.place_order(draft.clone()).await;
    assert!(matches!(result, Err(ClientError::ConfirmationRequired)));

    // Confirmation always succeeds on a paper venue
    client.confirm_and_place(draft.clone()).await.unwrap();
    let frame = frames.recv().await.unwrap();
    assert!(frame.contains("\"type\":\"place_order\""));
    assert!(frame.contains("session_token"));

    // The token is now cached, so a plain place works
    client.place_order(draft).await.unwrap();
    let frame = frames.recv().await.unwrap();
    assert!(frame.contains("\"type\":\"place_order\""));

    client.clear_session_token().await.unwrap();
    client.shutdown();
}

#[tokio::test]
async fn test_gate_rejects_locally_without_touching_the_wire() {
    use arena_common::{OrderType, Side};
    use arena_client::{ClientError, OrderRequest};
    use rust_decimal::Decimal;

    let (addr, _connections, mut frames) = spawn_scripted_venue().await;
    let client = ArenaClient::new(test_config(addr, "gate")).unwrap();
    client.ensure_connected();
    client.wait_until_open().await.unwrap();
    wait_until(|| client.snapshot().overview.is_some(), "bootstrap + snapshot").await;
    while frames.try_recv().is_ok() {}

    // available_cash is 9400 (9500 - 100 frozen); 100 units at 100 = 10000
    let draft = OrderRequest {
        symbol: "BTC".to_string(),
        market: "US".to_string(),
        side: Side::Long,
        order_type: OrderType::Limit,
        price: Some(Decimal::from(100)),
        quantity: Decimal::from(100),
        leverage: 1,
        session_token: None,
    };
    let result = client.confirm_and_place(draft).await;
    assert!(matches!(result, Err(ClientError::Rejected(_))));

    // Nothing went out
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(frames.try_recv().is_err());

    client.clear_session_token().await.unwrap();
    client.shutdown();
}
