//! Conversation state machine: the single pending freeform-input
//! expectation for a user.
//!
//! Each variant carries exactly the context its handler needs, so a handler
//! can never find itself waiting on a context key that was never stashed.
//! Exactly one state is active per user at a time; entering a new state
//! replaces the previous one wholesale. The very next freeform input is
//! consumed exclusively by the active state's handler, which clears the
//! state on both success and failure before persisting.

use serde::{Deserialize, Serialize};

/// The pending freeform-input expectation, with its typed context payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationState {
    /// Next input: base58 private-key material to import.
    AwaitingPrivateKey,
    /// Next input: buy slippage as a percentage.
    AwaitingBuySlippage,
    /// Next input: sell slippage as a percentage.
    AwaitingSellSlippage,
    /// Next input: priority fee in lamports.
    AwaitingPriorityFee,
    /// Next input: a SOL amount to spend buying `token_address`.
    AwaitingBuyAmount { token_address: String },
    /// Next input: a token amount of `token_address` to sell.
    AwaitingSellAmount { token_address: String },
}

impl ConversationState {
    /// Prompt text for the transport layer to render when entering the state.
    pub fn prompt(&self) -> String {
        match self {
            Self::AwaitingPrivateKey => {
                "Send your base58 private key. It is stored encrypted at rest.".to_string()
            }
            Self::AwaitingBuySlippage => "Send the buy slippage percentage (e.g. 0.5).".to_string(),
            Self::AwaitingSellSlippage => {
                "Send the sell slippage percentage (e.g. 0.5).".to_string()
            }
            Self::AwaitingPriorityFee => "Send the priority fee in lamports.".to_string(),
            Self::AwaitingBuyAmount { token_address } => {
                format!("Send the SOL amount to spend on {token_address}.")
            }
            Self::AwaitingSellAmount { token_address } => {
                format!("Send the token amount of {token_address} to sell.")
            }
        }
    }
}
