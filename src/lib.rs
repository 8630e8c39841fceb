//! tradevault: an encrypted per-user trading session core.
//!
//! Each user gets one durable [`record::UserRecord`] — wallet, trade
//! settings, append-only ledger, and conversation state — sealed at rest by
//! the [`vault`] codec and served through the [`store::RecordStore`]. The
//! [`agent::Router`] turns transport events into session flows, leaning on
//! two injected collaborators: a [`gateway::PriceGateway`] for metadata and
//! prices and a [`executor::TradeExecutor`] for swaps. PnL is computed
//! purely over the ledger in [`pnl`].

pub mod agent;
pub mod config;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod ledger;
pub mod pnl;
pub mod record;
pub mod session;
pub mod store;
pub mod vault;
pub mod wallet;

pub use error::{Error, Result};
