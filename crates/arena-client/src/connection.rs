//! WebSocket connection management.
//!
//! One long-lived task owns the socket: it establishes the connection,
//! sends the bootstrap handshake, pumps frames through the reducer, and
//! reconnects after abnormal closes. Connection state is published on a
//! watch channel so callers can observe transitions without polling.
//!
//! ## Reconnect policy
//!
//! A close with code 1000 (normal) or 1001 (going away) is deliberate and
//! ends the task. Anything else, including transport errors and closes
//! without a frame, schedules a reconnect after `reconnect_delay`. A
//! connection that cannot be established at all retries after
//! `connect_retry_delay`. Session state is kept across reconnects; the
//! bootstrap handshake re-establishes identity and the first snapshot
//! reconciles the rest.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::config::{BootstrapConfig, ConnectionTuning};
use crate::handler::{self, Effect};
use crate::notice::Notice;
use crate::protocol::ClientCommand;
use crate::session::SessionState;

/// Observable connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Closed,
    Connecting,
    Open,
    /// A deliberate close is in flight.
    Closing,
}

impl std::fmt::Display for ConnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnState::Closed => write!(f, "closed"),
            ConnState::Connecting => write!(f, "connecting"),
            ConnState::Open => write!(f, "open"),
            ConnState::Closing => write!(f, "closing"),
        }
    }
}

/// Whether a session that ended with this close frame should reconnect.
///
/// Codes 1000 and 1001 are deliberate closes; everything else, including a
/// missing frame, counts as abnormal.
pub fn should_reconnect(frame: Option<&CloseFrame<'_>>) -> bool {
    match frame {
        Some(frame) => !matches!(frame.code, CloseCode::Normal | CloseCode::Away),
        None => true,
    }
}

/// How one connected session ended.
enum SessionEnd {
    /// Peer closed with the given frame (or none).
    Closed(Option<CloseFrame<'static>>),
    /// Transport error.
    Failed,
    /// Shutdown was requested.
    Shutdown,
}

/// Everything the connection task needs; consumed by [`run`].
pub struct ConnectionActor {
    pub ws_url: String,
    pub bootstrap: BootstrapConfig,
    pub tuning: ConnectionTuning,
    pub session: Arc<RwLock<SessionState>>,
    pub api: ApiClient,
    pub command_rx: mpsc::Receiver<ClientCommand>,
    pub state_tx: watch::Sender<ConnState>,
    pub notice_tx: mpsc::UnboundedSender<Notice>,
    pub shutdown: broadcast::Receiver<()>,
}

/// Run the connection loop until shutdown or a deliberate close.
pub async fn run(mut actor: ConnectionActor) {
    loop {
        let _ = actor.state_tx.send(ConnState::Connecting);
        info!(url = %actor.ws_url, "connecting to venue");

        let connect = tokio::time::timeout(
            actor.tuning.connect_timeout,
            tokio_tungstenite::connect_async(actor.ws_url.as_str()),
        );
        let stream = tokio::select! {
            result = connect => match result {
                Ok(Ok((stream, _response))) => stream,
                Ok(Err(err)) => {
                    warn!(error = %err, "connection failed");
                    if wait_or_shutdown(actor.tuning.connect_retry_delay, &mut actor.shutdown).await {
                        break;
                    }
                    continue;
                }
                Err(_elapsed) => {
                    warn!("connection handshake timed out");
                    if wait_or_shutdown(actor.tuning.connect_retry_delay, &mut actor.shutdown).await {
                        break;
                    }
                    continue;
                }
            },
            _ = actor.shutdown.recv() => break,
        };

        let _ = actor.state_tx.send(ConnState::Open);
        info!("connected, bootstrapping session");

        let end = run_session(&mut actor, stream).await;
        let _ = actor.state_tx.send(ConnState::Closed);

        match end {
            SessionEnd::Shutdown => {
                info!("shutdown requested, closing connection");
                break;
            }
            SessionEnd::Closed(frame) if !should_reconnect(frame.as_ref()) => {
                info!("venue closed the session normally");
                break;
            }
            SessionEnd::Closed(frame) => {
                let code = frame.as_ref().map(|f| u16::from(f.code));
                warn!(close_code = ?code, "session ended abnormally, reconnecting");
                let _ = actor.notice_tx.send(Notice::Reconnecting);
                if wait_or_shutdown(actor.tuning.reconnect_delay, &mut actor.shutdown).await {
                    break;
                }
            }
            SessionEnd::Failed => {
                let _ = actor.notice_tx.send(Notice::Reconnecting);
                if wait_or_shutdown(actor.tuning.reconnect_delay, &mut actor.shutdown).await {
                    break;
                }
            }
        }
    }
    let _ = actor.state_tx.send(ConnState::Closed);
}

/// Sleep for `delay` unless shutdown fires first. Returns true on shutdown.
async fn wait_or_shutdown(delay: std::time::Duration, shutdown: &mut broadcast::Receiver<()>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = shutdown.recv() => true,
    }
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Pump one connected session until it ends.
async fn run_session(actor: &mut ConnectionActor, mut stream: WsStream) -> SessionEnd {
    let bootstrap = ClientCommand::Bootstrap {
        username: actor.bootstrap.username.clone(),
        initial_capital: actor.bootstrap.initial_capital,
    };
    if let Err(err) = stream.send(Message::Text(bootstrap.encode())).await {
        warn!(error = %err, "failed to send bootstrap");
        return SessionEnd::Failed;
    }

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let effects = {
                        let mut session = actor.session.write();
                        handler::handle_frame(&mut session, &text)
                    };
                    if let Err(end) = execute_effects(actor, &mut stream, effects).await {
                        return end;
                    }
                }
                Some(Ok(Message::Ping(payload))) => {
                    if stream.send(Message::Pong(payload)).await.is_err() {
                        return SessionEnd::Failed;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    return SessionEnd::Closed(frame);
                }
                Some(Ok(_)) => {
                    // Binary/pong frames are not part of the protocol
                    debug!("ignoring non-text frame");
                }
                Some(Err(err)) => {
                    warn!(error = %err, "websocket read failed");
                    return SessionEnd::Failed;
                }
                None => return SessionEnd::Closed(None),
            },
            command = actor.command_rx.recv() => match command {
                Some(command) => {
                    debug!(command = command.name(), "sending command");
                    if stream.send(Message::Text(command.encode())).await.is_err() {
                        return SessionEnd::Failed;
                    }
                }
                // All senders dropped: the client is gone
                None => return SessionEnd::Shutdown,
            },
            _ = actor.shutdown.recv() => {
                let _ = actor.state_tx.send(ConnState::Closing);
                let _ = stream.send(Message::Close(None)).await;
                return SessionEnd::Shutdown;
            }
        }
    }
}

/// Execute reducer effects. Send failures end the session; HTTP refreshes
/// run detached and only log on failure.
async fn execute_effects(
    actor: &ConnectionActor,
    stream: &mut WsStream,
    effects: Vec<Effect>,
) -> Result<(), SessionEnd> {
    for effect in effects {
        match effect {
            Effect::Send(command) => {
                debug!(command = command.name(), "sending command");
                if stream.send(Message::Text(command.encode())).await.is_err() {
                    return Err(SessionEnd::Failed);
                }
            }
            Effect::Notify(notice) => {
                let _ = actor.notice_tx.send(notice);
            }
            Effect::RefreshAccounts => {
                let user_id = actor.session.read().user.as_ref().map(|u| u.id);
                let Some(user_id) = user_id else { continue };
                let api = actor.api.clone();
                let session = Arc::clone(&actor.session);
                tokio::spawn(async move {
                    match api.get_accounts(user_id).await {
                        Ok(accounts) => session.write().accounts = accounts,
                        Err(err) => warn!(error = %err, "account refresh failed"),
                    }
                });
            }
        }
    }
    Ok(())
}
