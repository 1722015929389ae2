//! Real-time state-synchronization client for the arena paper-trading
//! venue.
//!
//! The venue pushes authoritative state snapshots over a WebSocket; this
//! crate maintains a local materialization of that state, runs cheap
//! pre-trade checks before orders go out, and survives connection drops by
//! reconnecting and re-bootstrapping.
//!
//! ## Layout
//!
//! - [`config`] - file/env/CLI layered configuration
//! - [`protocol`] - tagged wire messages, both directions
//! - [`session`] - the materialized session state
//! - [`handler`] - pure reducer from inbound messages to effects
//! - [`gate`] - pre-trade order validation
//! - [`connection`] - socket ownership, bootstrap, reconnect policy
//! - [`auth`] - trade-confirmation session tokens
//! - [`api`] - the venue's HTTP surface
//! - [`client`] - the owned entry-point handle

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod gate;
pub mod handler;
pub mod notice;
pub mod protocol;
pub mod session;

pub use client::{ArenaClient, ClientError};
pub use config::ClientConfig;
pub use connection::ConnState;
pub use gate::OrderRejection;
pub use notice::{Notice, NoticeLevel};
pub use protocol::{ClientCommand, OrderRequest, ServerMessage};
pub use session::SessionState;
