//! Agent event surface: what the transport delivers and what it gets back.
//!
//! The chat transport is an external collaborator. It feeds [`UserEvent`]s
//! into the [`router`] and renders the returned [`Reply`] however it likes;
//! this core never talks to the transport directly. Callers must process
//! events for one user serially: the state machine assumes at most one
//! pending input per user at a time. Events for different users are
//! independent and may interleave freely.

mod router;

pub use router::Router;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An inbound user action as delivered by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum UserEvent {
    /// A slash command, e.g. `/start` or `/positions`.
    Command(String),
    /// Freeform text. Consumed by the pending conversation state if one is
    /// active, otherwise interpreted directly (as a token address lookup).
    Text(String),
    /// A structured menu selection. Dispatched independently of state.
    Action(Action),
}

/// Structured menu selections.
///
/// Serialized form doubles as transport callback data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    CreateWallet,
    ImportWallet,
    ShowWallet,
    SetBuySlippage,
    SetSellSlippage,
    SetPriorityFee,
    /// Buy with a preset settlement-asset amount.
    Buy {
        token_address: String,
        sol_amount: Decimal,
    },
    /// Buy with a user-supplied amount (enters the awaiting state).
    BuyCustom { token_address: String },
    /// Sell the entire net holding.
    SellAll { token_address: String },
    /// Sell a user-supplied amount (enters the awaiting state).
    SellCustom { token_address: String },
    /// Position valuation via the price gateway.
    Position { token_address: String },
}

/// One button the transport may render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuButton {
    pub label: String,
    pub action: Action,
}

impl MenuButton {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            action,
        }
    }
}

/// Outbound rendering request: text plus an optional structured menu.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reply {
    pub text: String,
    pub menu: Vec<MenuButton>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            menu: Vec::new(),
        }
    }

    pub fn with_menu(mut self, menu: Vec<MenuButton>) -> Self {
        self.menu = menu;
        self
    }
}
