//! The per-user record: wallet, trade settings, ledger, conversation state.
//!
//! One `UserRecord` exists per user identity. The record store owns the
//! canonical encrypted-at-rest representation; everything here is the
//! in-memory shape.

use serde::{Deserialize, Serialize};

use crate::ledger::TradeEvent;
use crate::session::ConversationState;
use crate::wallet::Wallet;

/// Per-user trading preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeSettings {
    /// Buy slippage tolerance in basis points.
    #[serde(default = "default_slippage_bps")]
    pub buy_slippage_bps: u32,

    /// Sell slippage tolerance in basis points.
    #[serde(default = "default_slippage_bps")]
    pub sell_slippage_bps: u32,

    /// Priority fee in lamports added to swap transactions.
    #[serde(default)]
    pub priority_fee_lamports: u64,
}

fn default_slippage_bps() -> u32 {
    50
}

impl Default for TradeSettings {
    fn default() -> Self {
        Self {
            buy_slippage_bps: default_slippage_bps(),
            sell_slippage_bps: default_slippage_bps(),
            priority_fee_lamports: 0,
        }
    }
}

/// One user's complete session record.
///
/// `transactions` is append-only: there is deliberately no mutable accessor,
/// only [`UserRecord::append_trade`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserRecord {
    /// The user's wallet, if one has been created or imported. A wallet
    /// whose stored material fails reconstruction is treated as absent.
    #[serde(default)]
    pub wallet: Option<Wallet>,

    #[serde(default)]
    pub settings: TradeSettings,

    #[serde(default)]
    transactions: Vec<TradeEvent>,

    /// The pending freeform-input expectation, or `None`.
    #[serde(default)]
    pub state: Option<ConversationState>,
}

impl UserRecord {
    /// The ledger, in chronological (insertion) order.
    pub fn transactions(&self) -> &[TradeEvent] {
        &self.transactions
    }

    /// Append a trade event. Prior events are never mutated or removed.
    pub fn append_trade(&mut self, event: TradeEvent) {
        self.transactions.push(event);
    }

    /// Whether a reconstructed signing wallet is available.
    pub fn has_signing_wallet(&self) -> bool {
        self.wallet
            .as_ref()
            .is_some_and(|w| w.signing_key().is_some())
    }
}
