//! Domain types mirrored from the venue's wire format.
//!
//! Snapshots wholesale-replace these collections on the client, so every type
//! here is a plain data carrier: no interior mutability, no client-side
//! bookkeeping fields.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side.
///
/// LONG/SHORT open a position; BUY/SELL close one (BUY covers a short,
/// SELL closes a long). The venue carries all four on the same field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
    Buy,
    Sell,
}

impl Side {
    /// True for sides that open a new position.
    pub fn is_opening(&self) -> bool {
        matches!(self, Side::Long | Side::Short)
    }

    /// True for sides that close an existing position.
    pub fn is_closing(&self) -> bool {
        !self.is_opening()
    }

    /// Human-readable action label.
    pub fn action_label(&self) -> &'static str {
        match self {
            Side::Long => "Open Long",
            Side::Short => "Open Short",
            Side::Buy => "Close Short",
            Side::Sell => "Close Long",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Market,
    Limit,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
        }
    }
}

/// Order lifecycle status.
///
/// `filled_quantity` is monotonically non-decreasing until a terminal status
/// is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    PartiallyFilled,
    Filled,
    Cancelled,
}

impl OrderStatus {
    /// True once the order can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "PENDING"),
            OrderStatus::PartiallyFilled => write!(f, "PARTIALLY_FILLED"),
            OrderStatus::Filled => write!(f, "FILLED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A venue user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
}

/// A trading account belonging to a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(default)]
    pub account_type: String,
    pub initial_capital: Decimal,
    pub current_cash: Decimal,
    pub frozen_cash: Decimal,
}

impl Account {
    /// Cash actually spendable: current minus frozen, floored at zero.
    pub fn available_cash(&self) -> Decimal {
        (self.current_cash - self.frozen_cash).max(Decimal::ZERO)
    }
}

/// Account overview pushed with every snapshot.
///
/// Fully replaced (never merged) on each snapshot message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub account: Account,
    pub return_rate: Decimal,
    pub total_notional_value: Decimal,
    pub positions_notional_value: Decimal,
    /// Total assets (cash + positions), when the venue includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_assets: Option<Decimal>,
}

/// An open position, keyed by (symbol, market).
///
/// Invariant (venue-enforced): `available_quantity <= quantity`. The
/// difference is reserved by open closing orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: i64,
    pub account_id: i64,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub market: String,
    pub quantity: Decimal,
    pub available_quantity: Decimal,
    pub avg_cost: Decimal,
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notional_value: Option<Decimal>,
}

fn default_leverage() -> u32 {
    1
}

/// An order as reported by the venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    #[serde(default)]
    pub order_no: String,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub market: String,
    pub side: Side,
    pub order_type: OrderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    pub filled_quantity: Decimal,
    pub status: OrderStatus,
}

/// An immutable execution record. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: i64,
    pub order_id: i64,
    pub account_id: i64,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub market: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub commission: Decimal,
    pub trade_time: DateTime<Utc>,
}

/// An immutable log entry describing an automated rebalance decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiDecision {
    pub id: i64,
    pub account_id: i64,
    /// What the model decided to do (e.g. "open_long", "reduce", "hold").
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// The order this decision produced, when one was placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// One point of an account's asset curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetCurvePoint {
    pub timestamp: DateTime<Utc>,
    pub total_assets: Decimal,
}

/// Asset curve for one account, pushed only with `snapshot_full`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetCurveSeries {
    pub account_id: i64,
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub points: Vec<AssetCurvePoint>,
}
