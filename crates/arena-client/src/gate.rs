//! Pre-trade order gate.
//!
//! Cheap local checks that run before an order goes out on the wire, so
//! obviously-invalid orders fail immediately instead of round-tripping to
//! the backend. The backend re-validates everything; a gate pass is not a
//! guarantee of acceptance.
//!
//! Checks run against snapshot state, which may be momentarily stale. That
//! is accepted: the gate filters the obviously wrong, the backend has the
//! final word.

use rust_decimal::Decimal;
use thiserror::Error;

use arena_common::{Account, OrderType, Position, Side};

use crate::protocol::OrderRequest;

/// Smallest price the affordability divisor is allowed to take, so a zero
/// or dust price cannot blow up the estimate.
const MIN_EFFECTIVE_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 4);

/// Why an order was rejected locally.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderRejection {
    #[error("limit price must be positive")]
    InvalidPrice,
    #[error("quantity must be positive")]
    InvalidQuantity,
    #[error("insufficient cash: need {required}, have {available}")]
    InsufficientCash {
        required: Decimal,
        available: Decimal,
    },
    #[error("insufficient position: closing {requested}, available {available}")]
    InsufficientPosition {
        requested: Decimal,
        available: Decimal,
    },
    #[error("no price available for margin check")]
    NoMarketPrice,
    #[error("no account selected")]
    NoAccount,
}

impl OrderRejection {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            OrderRejection::InvalidPrice => "invalid_price",
            OrderRejection::InvalidQuantity => "invalid_quantity",
            OrderRejection::InsufficientCash { .. } => "insufficient_cash",
            OrderRejection::InsufficientPosition { .. } => "insufficient_position",
            OrderRejection::NoMarketPrice => "no_market_price",
            OrderRejection::NoAccount => "no_account",
        }
    }
}

/// Validate a draft order against the current snapshot.
///
/// `live_price` is the freshest known price for the symbol (used for MARKET
/// margin math); for LIMIT orders the limit price is the basis.
pub fn validate_order(
    draft: &OrderRequest,
    account: Option<&Account>,
    positions: &[Position],
    live_price: Option<Decimal>,
) -> Result<(), OrderRejection> {
    if draft.order_type == OrderType::Limit && draft.price.unwrap_or(Decimal::ZERO) <= Decimal::ZERO
    {
        return Err(OrderRejection::InvalidPrice);
    }
    if draft.quantity <= Decimal::ZERO {
        return Err(OrderRejection::InvalidQuantity);
    }

    if draft.side.is_opening() {
        let account = account.ok_or(OrderRejection::NoAccount)?;
        let basis = effective_price(draft.order_type, draft.price, live_price);
        // A MARKET open with no known price has no margin basis; without
        // this the cash check would trivially pass on a zero notional
        if basis <= Decimal::ZERO {
            return Err(OrderRejection::NoMarketPrice);
        }
        let notional = basis * draft.quantity;
        // Margin requirement scales down with leverage above 1x.
        let required = if draft.leverage > 1 {
            notional / Decimal::from(draft.leverage)
        } else {
            notional
        };
        let available = account.available_cash();
        if required > available {
            return Err(OrderRejection::InsufficientCash {
                required,
                available,
            });
        }
    } else {
        let available = positions
            .iter()
            .find(|p| p.symbol == draft.symbol && p.market == draft.market)
            .map(|p| p.available_quantity)
            .unwrap_or(Decimal::ZERO);
        if draft.quantity > available {
            return Err(OrderRejection::InsufficientPosition {
                requested: draft.quantity,
                available,
            });
        }
    }

    Ok(())
}

/// Largest opening quantity the account can afford at the given terms,
/// floored to a whole number of units.
pub fn max_affordable_quantity(
    available_cash: Decimal,
    leverage: u32,
    order_type: OrderType,
    limit_price: Option<Decimal>,
    live_price: Option<Decimal>,
) -> Decimal {
    let basis = effective_price(order_type, limit_price, live_price);
    let divisor = basis.max(MIN_EFFECTIVE_PRICE);
    let buying_power = available_cash * Decimal::from(leverage.max(1));
    (buying_power / divisor).floor()
}

/// Price basis for margin math: the limit price for LIMIT orders, the live
/// price (falling back to any entered price) for MARKET orders.
fn effective_price(
    order_type: OrderType,
    limit_price: Option<Decimal>,
    live_price: Option<Decimal>,
) -> Decimal {
    match order_type {
        OrderType::Limit => limit_price.unwrap_or(Decimal::ZERO),
        OrderType::Market => live_price.or(limit_price).unwrap_or(Decimal::ZERO),
    }
}
