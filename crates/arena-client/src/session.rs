//! In-memory session state.
//!
//! A faithful materialization of the most recent backend snapshot plus the
//! identity established by the bootstrap handshake. The reducer in
//! `handler` is the only writer; everything else reads.

use rust_decimal::Decimal;

use arena_common::{
    Account, AiDecision, AssetCurveSeries, Order, Overview, Position, Trade, User,
};

/// Snapshot-backed client state.
///
/// Collections are wholesale-replaced by snapshots (never merged), so any
/// field here may be momentarily stale between a local action and the next
/// snapshot. That is by construction: the backend owns the truth.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    /// Identity from `bootstrap_ok` / `user_switched`.
    pub user: Option<User>,
    /// Active account from `bootstrap_ok` / `account_switched`.
    pub account: Option<Account>,
    pub overview: Option<Overview>,
    pub positions: Vec<Position>,
    pub orders: Vec<Order>,
    pub trades: Vec<Trade>,
    pub ai_decisions: Vec<AiDecision>,
    /// Only `snapshot_full` carries these; other snapshots leave them alone.
    pub asset_curves: Vec<AssetCurveSeries>,
    /// All accounts of the current user, fetched over HTTP on identity
    /// changes.
    pub accounts: Vec<Account>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once the bootstrap handshake has been answered.
    pub fn is_bootstrapped(&self) -> bool {
        self.user.is_some()
    }

    /// The position for a (symbol, market) pair, if one is open.
    pub fn position(&self, symbol: &str, market: &str) -> Option<&Position> {
        self.positions
            .iter()
            .find(|p| p.symbol == symbol && p.market == market)
    }

    /// Last known price for a symbol, taken from the open position if any.
    pub fn last_price(&self, symbol: &str, market: &str) -> Option<Decimal> {
        self.position(symbol, market).and_then(|p| p.last_price)
    }

    /// The account the gate checks cash against: the snapshot overview's
    /// account when present (fresher), otherwise the bootstrap account.
    pub fn active_account(&self) -> Option<&Account> {
        self.overview
            .as_ref()
            .map(|o| &o.account)
            .or(self.account.as_ref())
    }
}
