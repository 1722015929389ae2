//! The client handle.
//!
//! `ArenaClient` is the single owned entry point an application holds: it
//! owns the connection task, the shared session state, the token manager
//! and the HTTP client. Cloneable handles are deliberately not provided;
//! embedders share the client behind their own Arc if they need to.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch, Mutex as AsyncMutex};
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError};
use crate::auth::{AuthError, SessionAuth};
use crate::config::{ClientConfig, ConfigError};
use crate::connection::{self, ConnState, ConnectionActor};
use crate::gate::{self, OrderRejection};
use crate::notice::Notice;
use crate::protocol::{ClientCommand, OrderRequest};
use crate::session::SessionState;

/// Outbound command buffer; the session loop drains it promptly.
const COMMAND_BUFFER: usize = 64;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("order rejected: {0}")]
    Rejected(#[from] OrderRejection),
    #[error("trade confirmation required")]
    ConfirmationRequired,
    #[error("not connected to venue")]
    NotConnected,
    #[error("session not bootstrapped yet")]
    NotBootstrapped,
}

/// Owned client for the venue's real-time channel.
pub struct ArenaClient {
    config: ClientConfig,
    api: ApiClient,
    session: Arc<RwLock<SessionState>>,
    // Async mutex: verification holds the lock across the HTTP round trip
    auth: AsyncMutex<SessionAuth>,
    command_tx: mpsc::Sender<ClientCommand>,
    state_rx: watch::Receiver<ConnState>,
    notice_tx: mpsc::UnboundedSender<Notice>,
    notice_rx: Mutex<Option<mpsc::UnboundedReceiver<Notice>>>,
    shutdown_tx: broadcast::Sender<()>,
    /// Consumed by the first `ensure_connected`; spawning twice is a no-op.
    pending_actor: Mutex<Option<ConnectionActor>>,
}

impl ArenaClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let api = ApiClient::new(&config.server_url)?;
        let ws_url = api.ws_url()?.to_string();
        let auth = SessionAuth::load(&config.auth);
        let session = Arc::new(RwLock::new(SessionState::new()));

        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (state_tx, state_rx) = watch::channel(ConnState::Closed);
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = broadcast::channel(1);

        let actor = ConnectionActor {
            ws_url,
            bootstrap: config.bootstrap.clone(),
            tuning: config.connection.clone(),
            session: Arc::clone(&session),
            api: api.clone(),
            command_rx,
            state_tx,
            notice_tx: notice_tx.clone(),
            shutdown: shutdown_tx.subscribe(),
        };

        Ok(Self {
            config,
            api,
            session,
            auth: AsyncMutex::new(auth),
            command_tx,
            state_rx,
            notice_tx,
            notice_rx: Mutex::new(Some(notice_rx)),
            shutdown_tx,
            pending_actor: Mutex::new(Some(actor)),
        })
    }

    // ========================================================================
    // Connection lifecycle
    // ========================================================================

    /// Start the connection task. Safe to call more than once; only the
    /// first call spawns.
    pub fn ensure_connected(&self) {
        let actor = self.pending_actor.lock().take();
        match actor {
            Some(actor) => {
                info!(url = %actor.ws_url, "starting connection task");
                tokio::spawn(connection::run(actor));
            }
            None => debug!("connection task already running"),
        }
    }

    /// Current connection state.
    pub fn conn_state(&self) -> ConnState {
        *self.state_rx.borrow()
    }

    /// A watch receiver for observing connection-state transitions.
    pub fn watch_conn_state(&self) -> watch::Receiver<ConnState> {
        self.state_rx.clone()
    }

    /// Wait until the connection is open.
    pub async fn wait_until_open(&self) -> Result<(), ClientError> {
        let mut rx = self.state_rx.clone();
        loop {
            if *rx.borrow() == ConnState::Open {
                return Ok(());
            }
            if rx.changed().await.is_err() {
                return Err(ClientError::NotConnected);
            }
        }
    }

    /// Request a deliberate close. The connection task will not reconnect.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// The notice stream. Yields once; later calls return `None`.
    pub fn take_notices(&self) -> Option<mpsc::UnboundedReceiver<Notice>> {
        self.notice_rx.lock().take()
    }

    // ========================================================================
    // State access
    // ========================================================================

    /// A point-in-time copy of the session state.
    pub fn snapshot(&self) -> SessionState {
        self.session.read().clone()
    }

    /// The HTTP surface, for request/response operations.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Pull a fresh snapshot.
    pub async fn request_snapshot(&self) -> Result<(), ClientError> {
        self.send(ClientCommand::GetSnapshot).await
    }

    pub async fn switch_user(&self, username: &str) -> Result<(), ClientError> {
        self.send(ClientCommand::SwitchUser {
            username: username.to_string(),
        })
        .await
    }

    pub async fn switch_account(&self, account_id: i64) -> Result<(), ClientError> {
        self.send(ClientCommand::SwitchAccount { account_id }).await
    }

    /// Gate-check a draft order and submit it.
    ///
    /// Fails with [`ClientError::ConfirmationRequired`] when no valid
    /// session token is cached; call [`confirm_and_place`] to run the
    /// confirmation step and submit in one go.
    ///
    /// [`confirm_and_place`]: ArenaClient::confirm_and_place
    pub async fn place_order(&self, draft: OrderRequest) -> Result<(), ClientError> {
        self.gate_check(&draft)?;
        let token = self
            .auth
            .lock()
            .await
            .token()
            .map(str::to_string)
            .ok_or(ClientError::ConfirmationRequired)?;
        self.submit(draft, token).await
    }

    /// Run the confirmation step (always succeeds on this venue), then
    /// gate-check and submit.
    pub async fn confirm_and_place(&self, draft: OrderRequest) -> Result<(), ClientError> {
        self.gate_check(&draft)?;
        let user_id = self
            .session
            .read()
            .user
            .as_ref()
            .map(|u| u.id)
            .ok_or(ClientError::NotBootstrapped)?;
        let token = self.auth.lock().await.confirm_intent(user_id)?;
        self.submit(draft, token).await
    }

    /// Check the cached confirmation token against the backend; a token it
    /// no longer recognizes is cleared. Run once at startup so a revoked
    /// token cannot bypass the confirmation step until its TTL expires.
    pub async fn verify_session(&self) -> Result<bool, ClientError> {
        Ok(self.auth.lock().await.verify(&self.api).await?)
    }

    /// Drop the cached confirmation token.
    pub async fn clear_session_token(&self) -> Result<(), ClientError> {
        Ok(self.auth.lock().await.clear()?)
    }

    /// Largest opening quantity the active account can afford at the given
    /// terms.
    pub fn max_affordable_quantity(
        &self,
        order_type: arena_common::OrderType,
        limit_price: Option<rust_decimal::Decimal>,
        symbol: &str,
        market: &str,
        leverage: u32,
    ) -> rust_decimal::Decimal {
        let session = self.session.read();
        let available = session
            .active_account()
            .map(|a| a.available_cash())
            .unwrap_or_default();
        let live = session.last_price(symbol, market);
        gate::max_affordable_quantity(available, leverage, order_type, limit_price, live)
    }

    fn gate_check(&self, draft: &OrderRequest) -> Result<(), ClientError> {
        let session = self.session.read();
        let live = session.last_price(&draft.symbol, &draft.market);
        gate::validate_order(draft, session.active_account(), &session.positions, live)?;
        Ok(())
    }

    async fn submit(&self, mut draft: OrderRequest, token: String) -> Result<(), ClientError> {
        draft.session_token = Some(token);
        self.send(ClientCommand::PlaceOrder(draft)).await?;
        let _ = self.notice_tx.send(Notice::OrderSubmitted);
        Ok(())
    }

    async fn send(&self, command: ClientCommand) -> Result<(), ClientError> {
        if self.conn_state() != ConnState::Open {
            let _ = self.notice_tx.send(Notice::NotConnected);
            return Err(ClientError::NotConnected);
        }
        self.command_tx
            .send(command)
            .await
            .map_err(|_| ClientError::NotConnected)
    }
}
