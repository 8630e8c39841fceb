//! Trade executor collaborator: performs swaps and reports realized amounts.
//!
//! The live on-chain executor is outside this core. `PaperExecutor` ships as
//! the default: it fills deterministically at the gateway reference price so
//! the full session flow (state machine, ledger append, persistence) is
//! exercised end to end without broadcasting anything.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use ed25519_dalek::SigningKey;
use rust_decimal::Decimal;

use crate::error::ExecutionError;
use crate::gateway::PriceGateway;

/// Mint address of the settlement asset (wrapped SOL).
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// A swap to execute: spend `amount` of `input_mint` for `output_mint`.
#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub input_mint: String,
    pub output_mint: String,
    /// Whole-unit amount of the input asset.
    pub amount: Decimal,
    pub slippage_bps: u32,
    pub priority_fee_lamports: u64,
}

/// Realized result of a successful swap.
#[derive(Debug, Clone, PartialEq)]
pub struct SwapReceipt {
    /// Input actually consumed, whole-unit.
    pub input_amount: Decimal,
    /// Output actually received, whole-unit.
    pub output_amount: Decimal,
    pub tx_signature: String,
}

/// Swap execution seam. One call per user action; a failed call appends
/// nothing to the ledger.
#[async_trait]
pub trait TradeExecutor: Send + Sync {
    async fn execute_swap(
        &self,
        request: SwapRequest,
        signer: &SigningKey,
    ) -> Result<SwapReceipt, ExecutionError>;
}

/// Deterministic paper executor filling at the gateway reference price.
pub struct PaperExecutor {
    gateway: Arc<dyn PriceGateway>,
}

impl PaperExecutor {
    pub fn new(gateway: Arc<dyn PriceGateway>) -> Self {
        Self { gateway }
    }

    async fn reference_price_in_sol(&self, token_mint: &str) -> Result<Decimal, ExecutionError> {
        let metadata = self
            .gateway
            .token_metadata(token_mint)
            .await
            .map_err(|e| ExecutionError::Swap {
                reason: format!("no reference price: {e}"),
            })?;
        let sol_usd = self
            .gateway
            .sol_usd_price()
            .await
            .map_err(|e| ExecutionError::Swap {
                reason: format!("no SOL price: {e}"),
            })?;
        metadata
            .price_in_sol(sol_usd)
            .filter(|price| *price > Decimal::ZERO)
            .ok_or_else(|| ExecutionError::Swap {
                reason: format!("unusable reference price for {token_mint}"),
            })
    }
}

#[async_trait]
impl TradeExecutor for PaperExecutor {
    async fn execute_swap(
        &self,
        request: SwapRequest,
        _signer: &SigningKey,
    ) -> Result<SwapReceipt, ExecutionError> {
        if request.amount <= Decimal::ZERO {
            return Err(ExecutionError::Swap {
                reason: format!("non-positive input amount {}", request.amount),
            });
        }

        let output_amount = if request.input_mint == SOL_MINT {
            // Buy: SOL in, tokens out.
            let price = self.reference_price_in_sol(&request.output_mint).await?;
            request.amount / price
        } else if request.output_mint == SOL_MINT {
            // Sell: tokens in, SOL out.
            let price = self.reference_price_in_sol(&request.input_mint).await?;
            request.amount * price
        } else {
            return Err(ExecutionError::Swap {
                reason: "paper execution only supports SOL-denominated swaps".to_string(),
            });
        };

        Ok(SwapReceipt {
            input_amount: request.amount,
            output_amount,
            tx_signature: format!("paper-{}", Utc::now().timestamp_nanos_opt().unwrap_or(0)),
        })
    }
}
