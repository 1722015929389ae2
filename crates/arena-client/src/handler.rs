//! Protocol reducer.
//!
//! `apply` is a pure function from (state, inbound message) to a list of
//! effects. It performs no IO itself; the connection layer executes the
//! effects. This keeps every message-handling rule unit-testable without a
//! socket.
//!
//! ## Pull-after-push
//!
//! Events that signal a state change without carrying the new state
//! (`order_filled`, `order_pending`, `user_switched`, `account_switched`)
//! produce a `get_snapshot` effect rather than a local mutation guess.

use tracing::{debug, warn};

use crate::notice::Notice;
use crate::protocol::{ClientCommand, ServerMessage, SnapshotPayload};
use crate::session::SessionState;

/// Side effect requested by the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a command on the WebSocket.
    Send(ClientCommand),
    /// Re-fetch the account list over HTTP (identity changed).
    RefreshAccounts,
    /// Surface an event to the embedding application.
    Notify(Notice),
}

/// Apply one decoded message to the session state.
pub fn apply(state: &mut SessionState, message: ServerMessage) -> Vec<Effect> {
    match message {
        ServerMessage::BootstrapOk { user, account } => {
            if let Some(user) = user {
                state.user = Some(user);
            }
            if let Some(account) = account {
                state.account = Some(account);
            }
            vec![
                Effect::Notify(Notice::Connected),
                Effect::RefreshAccounts,
                Effect::Send(ClientCommand::GetSnapshot),
            ]
        }
        ServerMessage::Snapshot(payload) | ServerMessage::SnapshotFast(payload) => {
            apply_snapshot(state, payload, false);
            vec![]
        }
        ServerMessage::SnapshotFull(payload) => {
            apply_snapshot(state, payload, true);
            vec![]
        }
        ServerMessage::Trades { trades } => {
            state.trades = trades;
            vec![]
        }
        ServerMessage::OrderFilled => vec![
            Effect::Notify(Notice::OrderFilled),
            Effect::Send(ClientCommand::GetSnapshot),
        ],
        ServerMessage::OrderPending => vec![
            Effect::Notify(Notice::OrderPending),
            Effect::Send(ClientCommand::GetSnapshot),
        ],
        ServerMessage::UserSwitched { user } => {
            let username = user.username.clone();
            state.user = Some(user);
            // No snapshot pull here: the account_switched that follows a
            // user switch carries its own
            vec![
                Effect::Notify(Notice::UserSwitched { username }),
                Effect::RefreshAccounts,
            ]
        }
        ServerMessage::AccountSwitched { account } => {
            let name = account.name.clone();
            state.account = Some(account);
            vec![
                Effect::Notify(Notice::AccountSwitched { name }),
                Effect::RefreshAccounts,
                Effect::Send(ClientCommand::GetSnapshot),
            ]
        }
        ServerMessage::Error { message } => {
            warn!(error = %message, "server reported error");
            vec![Effect::Notify(Notice::ServerError { message })]
        }
        ServerMessage::Unknown => {
            debug!("ignoring frame with unknown tag");
            vec![]
        }
    }
}

/// Decode and apply one raw text frame. Malformed frames are logged and
/// dropped; a bad frame must never take the session down.
pub fn handle_frame(state: &mut SessionState, text: &str) -> Vec<Effect> {
    match ServerMessage::decode(text) {
        Ok(message) => apply(state, message),
        Err(err) => {
            warn!(error = %err, "dropping malformed frame");
            vec![]
        }
    }
}

fn apply_snapshot(state: &mut SessionState, payload: SnapshotPayload, full: bool) {
    state.overview = Some(payload.overview);
    state.positions = payload.positions;
    state.orders = payload.orders;
    // Absent lists reconcile to empty; the backend owns the truth.
    state.trades = payload.trades.unwrap_or_default();
    state.ai_decisions = payload.ai_decisions.unwrap_or_default();
    if full {
        if let Some(curves) = payload.all_asset_curves {
            state.asset_curves = curves;
        }
    }
}
