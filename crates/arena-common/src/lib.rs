//! Shared types for the arena paper-trading client.
//!
//! CRITICAL: All prices, quantities and cash values use
//! `rust_decimal::Decimal`. NEVER use f64 for financial math.

pub mod types;

pub use types::{
    Account, AiDecision, AssetCurvePoint, AssetCurveSeries, Order, OrderStatus, OrderType,
    Overview, Position, Side, Trade, User,
};
