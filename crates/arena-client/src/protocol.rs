//! Wire protocol for the venue's WebSocket channel.
//!
//! Text frames, JSON-encoded, tagged by a `type` field in both directions.
//! Inbound messages are a closed tagged-variant type with an explicit
//! unknown-tag fallback; decoding is exhaustive and a parse failure never
//! escapes as a panic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use arena_common::{
    Account, AiDecision, AssetCurveSeries, Order, OrderType, Overview, Position, Side, Trade, User,
};

/// Errors raised while decoding an inbound frame.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Payload shared by the three snapshot variants.
///
/// `trades`, `ai_decisions` and `all_asset_curves` are optional on the wire;
/// absent lists reconcile to empty (the venue owns the truth, the client
/// never merges).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPayload {
    pub overview: Overview,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub orders: Vec<Order>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trades: Option<Vec<Trade>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_decisions: Option<Vec<AiDecision>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_asset_curves: Option<Vec<AssetCurveSeries>>,
}

/// Inbound message from the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Bootstrap handshake answered; carries the identity this connection
    /// now represents (idempotent across reconnects).
    BootstrapOk {
        #[serde(default)]
        user: Option<User>,
        #[serde(default)]
        account: Option<Account>,
    },
    /// Wholesale state replacement, asset curves untouched.
    Snapshot(SnapshotPayload),
    /// Wholesale state replacement including asset-curve series.
    SnapshotFull(SnapshotPayload),
    /// Cheaper snapshot path, identical semantics to `Snapshot`.
    SnapshotFast(SnapshotPayload),
    /// Delta path: replaces only the trade list.
    Trades {
        #[serde(default)]
        trades: Vec<Trade>,
    },
    /// An order filled; the client must pull a fresh snapshot.
    OrderFilled,
    /// An order was accepted and is pending; pull a fresh snapshot.
    OrderPending,
    UserSwitched { user: User },
    AccountSwitched { account: Account },
    /// Backend-reported failure; surfaced, never mutates state.
    Error { message: String },
    /// Forward-compatibility: tags this client does not know are ignored.
    #[serde(other)]
    Unknown,
}

impl ServerMessage {
    /// Decode a text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// A draft order as submitted over the wire after gate approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub market: String,
    pub side: Side,
    pub order_type: OrderType,
    /// Present for LIMIT orders only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub leverage: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

/// Outbound command to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Sent once per successful connection establishment.
    Bootstrap {
        username: String,
        initial_capital: Decimal,
    },
    /// Pull-after-push: requested after every state-changing event.
    GetSnapshot,
    PlaceOrder(OrderRequest),
    SwitchUser { username: String },
    SwitchAccount { account_id: i64 },
}

impl ClientCommand {
    /// Serialize to a text frame.
    pub fn encode(&self) -> String {
        // ClientCommand contains no map keys or non-string-keyed data that
        // could fail serialization.
        serde_json::to_string(self).expect("command serialization cannot fail")
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::Bootstrap { .. } => "bootstrap",
            ClientCommand::GetSnapshot => "get_snapshot",
            ClientCommand::PlaceOrder(_) => "place_order",
            ClientCommand::SwitchUser { .. } => "switch_user",
            ClientCommand::SwitchAccount { .. } => "switch_account",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decode_bootstrap_ok() {
        let frame = r#"{"type":"bootstrap_ok","user":{"id":1,"username":"default"}}"#;
        let msg = ServerMessage::decode(frame).unwrap();
        match msg {
            ServerMessage::BootstrapOk { user, account } => {
                assert_eq!(user.unwrap().username, "default");
                assert!(account.is_none());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_decode_snapshot_variants() {
        let overview = r#"{
            "account": {"id":1,"user_id":1,"name":"default","initial_capital":"10000",
                        "current_cash":"9000","frozen_cash":"100"},
            "return_rate":"0.01","total_notional_value":"10100",
            "positions_notional_value":"1100"
        }"#;
        for tag in ["snapshot", "snapshot_full", "snapshot_fast"] {
            let frame = format!(
                r#"{{"type":"{}","overview":{},"positions":[],"orders":[]}}"#,
                tag, overview
            );
            let msg = ServerMessage::decode(&frame).unwrap();
            let payload = match msg {
                ServerMessage::Snapshot(p)
                | ServerMessage::SnapshotFull(p)
                | ServerMessage::SnapshotFast(p) => p,
                other => panic!("unexpected message: {:?}", other),
            };
            assert!(payload.trades.is_none());
            assert_eq!(payload.overview.account.current_cash, dec!(9000));
        }
    }

    #[test]
    fn test_decode_error_message() {
        let msg = ServerMessage::decode(r#"{"type":"error","message":"insufficient cash"}"#);
        assert_eq!(
            msg.unwrap(),
            ServerMessage::Error {
                message: "insufficient cash".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_tag_is_ignored_not_an_error() {
        let msg = ServerMessage::decode(r#"{"type":"leaderboard_update","rows":[]}"#).unwrap();
        assert_eq!(msg, ServerMessage::Unknown);
    }

    #[test]
    fn test_malformed_frame_is_an_error() {
        assert!(ServerMessage::decode("{not json").is_err());
        assert!(ServerMessage::decode(r#"{"no_type_field":1}"#).is_err());
    }

    #[test]
    fn test_encode_place_order_omits_absent_price() {
        let cmd = ClientCommand::PlaceOrder(OrderRequest {
            symbol: "BTC".to_string(),
            market: "US".to_string(),
            side: Side::Long,
            order_type: OrderType::Market,
            price: None,
            quantity: dec!(2),
            leverage: 1,
            session_token: Some("paper-trading-session".to_string()),
        });
        let json = cmd.encode();
        assert!(json.contains(r#""type":"place_order""#));
        assert!(json.contains(r#""side":"LONG""#));
        assert!(!json.contains("price"));
    }

    #[test]
    fn test_encode_bootstrap_and_switches() {
        let cmd = ClientCommand::Bootstrap {
            username: "default".to_string(),
            initial_capital: dec!(10000),
        };
        assert!(cmd.encode().contains(r#""type":"bootstrap""#));
        assert_eq!(cmd.name(), "bootstrap");

        let cmd = ClientCommand::SwitchAccount { account_id: 3 };
        assert!(cmd.encode().contains(r#""account_id":3"#));

        assert_eq!(ClientCommand::GetSnapshot.encode(), r#"{"type":"get_snapshot"}"#);
    }
}
