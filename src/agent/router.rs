//! Event router: resolves inbound events against conversation state and
//! runs the session flows.
//!
//! Dispatch order: freeform text is consumed by the pending conversation
//! state if one is active, otherwise interpreted directly as a token
//! lookup. Structured actions dispatch independently of the current state
//! and may themselves enter a new state. Every mutation path persists
//! through the record store before the reply is returned, so the cache and
//! the durable copy never diverge for longer than one request.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use secrecy::ExposeSecret;

use crate::error::{Error, LedgerError, ValidationError};
use crate::executor::{SwapRequest, TradeExecutor, SOL_MINT};
use crate::gateway::PriceGateway;
use crate::ledger::{self, TradeEvent, TradeKind};
use crate::pnl::{self, PnlOutcome};
use crate::record::UserRecord;
use crate::session::ConversationState;
use crate::store::RecordStore;
use crate::wallet::Wallet;

use super::{Action, MenuButton, Reply, UserEvent};

/// Priority fee cap: one SOL worth of lamports.
const MAX_PRIORITY_FEE_LAMPORTS: u64 = 1_000_000_000;

/// Preset buy amounts offered in the token menu, in SOL.
const PRESET_BUY_AMOUNTS_SOL: [Decimal; 3] = [dec!(0.1), dec!(0.5), dec!(1)];

/// How many ledger entries the history view shows.
const HISTORY_LIMIT: usize = 10;

/// The session router. One instance serves all users; callers serialize
/// events per user.
pub struct Router {
    store: Arc<RecordStore>,
    gateway: Arc<dyn PriceGateway>,
    executor: Arc<dyn TradeExecutor>,
}

impl Router {
    pub fn new(
        store: Arc<RecordStore>,
        gateway: Arc<dyn PriceGateway>,
        executor: Arc<dyn TradeExecutor>,
    ) -> Self {
        Self {
            store,
            gateway,
            executor,
        }
    }

    /// Handle one inbound event and produce a rendering request.
    ///
    /// Never panics and never escalates: every failure becomes reply text.
    pub async fn handle(&self, user_id: &str, event: UserEvent) -> Reply {
        match self.dispatch(user_id, event).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "event handling failed");
                Reply::text(format!("Something went wrong: {e}"))
            }
        }
    }

    async fn dispatch(&self, user_id: &str, event: UserEvent) -> Result<Reply, Error> {
        let mut record = self.store.load(user_id).await?;

        match event {
            UserEvent::Text(input) => {
                let input = input.trim().to_string();
                if let Some(state) = record.state.take() {
                    self.complete_pending(user_id, &mut record, state, &input)
                        .await
                } else {
                    self.token_overview(&record, &input).await
                }
            }
            UserEvent::Command(cmd) => Ok(self.command(&record, &cmd)),
            UserEvent::Action(action) => self.action(user_id, &mut record, action).await,
        }
    }

    // ==================== Pending-input completion ====================

    /// Consume the one pending freeform input.
    ///
    /// The state was already taken off the record; on both success and
    /// failure the cleared state is persisted before the reply goes out, so
    /// the machine can never get stuck waiting on a turn that already
    /// happened.
    async fn complete_pending(
        &self,
        user_id: &str,
        record: &mut UserRecord,
        state: ConversationState,
        input: &str,
    ) -> Result<Reply, Error> {
        let reply = match state {
            ConversationState::AwaitingPrivateKey => match Wallet::import(input) {
                Ok(wallet) => {
                    let public_key = wallet.public_key.clone();
                    record.wallet = Some(wallet);
                    Reply::text(format!("Wallet imported. Public key: {public_key}"))
                }
                Err(e) => Reply::text(format!(
                    "Could not import that key: {e}. Use the menu to try again."
                )),
            },
            ConversationState::AwaitingBuySlippage => match parse_slippage_bps(input) {
                Ok(bps) => {
                    record.settings.buy_slippage_bps = bps;
                    Reply::text(format!("Buy slippage set to {bps} bps."))
                }
                Err(e) => Reply::text(format!("{e}. Use the menu to try again.")),
            },
            ConversationState::AwaitingSellSlippage => match parse_slippage_bps(input) {
                Ok(bps) => {
                    record.settings.sell_slippage_bps = bps;
                    Reply::text(format!("Sell slippage set to {bps} bps."))
                }
                Err(e) => Reply::text(format!("{e}. Use the menu to try again.")),
            },
            ConversationState::AwaitingPriorityFee => match parse_priority_fee(input) {
                Ok(lamports) => {
                    record.settings.priority_fee_lamports = lamports;
                    Reply::text(format!("Priority fee set to {lamports} lamports."))
                }
                Err(e) => Reply::text(format!("{e}. Use the menu to try again.")),
            },
            ConversationState::AwaitingBuyAmount { token_address } => {
                match parse_positive_amount(input) {
                    Ok(sol_amount) => self.execute_buy(record, &token_address, sol_amount).await,
                    Err(e) => Reply::text(format!("{e}. Use the menu to try again.")),
                }
            }
            ConversationState::AwaitingSellAmount { token_address } => {
                match parse_positive_amount(input) {
                    Ok(token_amount) => {
                        self.execute_sell(record, &token_address, token_amount).await
                    }
                    Err(e) => Reply::text(format!("{e}. Use the menu to try again.")),
                }
            }
        };

        self.store.save(user_id, record).await?;
        Ok(reply)
    }

    // ==================== Commands (read-only) ====================

    fn command(&self, record: &UserRecord, raw: &str) -> Reply {
        let cmd = raw
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        match cmd.as_str() {
            "/start" | "/help" => Reply::text(
                "Send a token mint address to see it, or use the menu below.",
            )
            .with_menu(main_menu()),
            "/wallet" => self.show_wallet(record),
            "/positions" => self.show_positions(record),
            "/history" => self.show_history(record),
            "/settings" => show_settings(record),
            _ => Reply::text("Unknown command. Try /start, /wallet, /positions, /history, or /settings."),
        }
    }

    fn show_wallet(&self, record: &UserRecord) -> Reply {
        match &record.wallet {
            Some(wallet) => Reply::text(format!(
                "Wallet public key: {}\nSecret material: [encrypted at rest]",
                wallet.public_key
            )),
            None => Reply::text("No wallet yet.").with_menu(wallet_menu()),
        }
    }

    fn show_positions(&self, record: &UserRecord) -> Reply {
        let positions = ledger::held_positions(record.transactions());
        if positions.is_empty() {
            return Reply::text("No open positions.");
        }
        let mut text = String::from("Open positions:\n");
        let mut menu = Vec::new();
        for position in positions {
            text.push_str(&format!(
                "{} ({}): {} held\n",
                position.token_symbol, position.token_address, position.net_held
            ));
            menu.push(MenuButton::new(
                format!("{} PnL", position.token_symbol),
                Action::Position {
                    token_address: position.token_address,
                },
            ));
        }
        Reply::text(text.trim_end().to_string()).with_menu(menu)
    }

    fn show_history(&self, record: &UserRecord) -> Reply {
        let events = record.transactions();
        if events.is_empty() {
            return Reply::text("No trades yet.");
        }
        let mut text = String::from("Recent trades:\n");
        for event in events.iter().rev().take(HISTORY_LIMIT) {
            text.push_str(&format!(
                "{} {} {} {} for {} SOL\n",
                event.timestamp.format("%Y-%m-%d %H:%M"),
                event.kind.as_str(),
                event.token_amount,
                event.token_symbol,
                event.counter_asset_amount,
            ));
        }
        Reply::text(text.trim_end().to_string())
    }

    // ==================== Structured actions ====================

    async fn action(
        &self,
        user_id: &str,
        record: &mut UserRecord,
        action: Action,
    ) -> Result<Reply, Error> {
        match action {
            Action::CreateWallet => {
                if let Some(wallet) = &record.wallet {
                    return Ok(Reply::text(format!(
                        "You already have a wallet: {}",
                        wallet.public_key
                    )));
                }
                let wallet = Wallet::generate();
                let public_key = wallet.public_key.clone();
                let secret = wallet.secret_material.expose_secret().to_string();
                record.wallet = Some(wallet);
                self.store.save(user_id, record).await?;
                Ok(Reply::text(format!(
                    "Wallet created.\nPublic key: {public_key}\nPrivate key (back it up now, it is shown only once): {secret}"
                )))
            }
            Action::ImportWallet => {
                self.enter_state(user_id, record, ConversationState::AwaitingPrivateKey)
                    .await
            }
            Action::ShowWallet => Ok(self.show_wallet(record)),
            Action::SetBuySlippage => {
                self.enter_state(user_id, record, ConversationState::AwaitingBuySlippage)
                    .await
            }
            Action::SetSellSlippage => {
                self.enter_state(user_id, record, ConversationState::AwaitingSellSlippage)
                    .await
            }
            Action::SetPriorityFee => {
                self.enter_state(user_id, record, ConversationState::AwaitingPriorityFee)
                    .await
            }
            Action::Buy {
                token_address,
                sol_amount,
            } => {
                let reply = self.execute_buy(record, &token_address, sol_amount).await;
                self.store.save(user_id, record).await?;
                Ok(reply)
            }
            Action::BuyCustom { token_address } => {
                self.enter_state(
                    user_id,
                    record,
                    ConversationState::AwaitingBuyAmount { token_address },
                )
                .await
            }
            Action::SellAll { token_address } => {
                let available =
                    ledger::holdings_for(record.transactions(), &token_address).net_held();
                if available <= Decimal::ZERO {
                    return Ok(Reply::text("Nothing to sell for that token."));
                }
                let reply = self.execute_sell(record, &token_address, available).await;
                self.store.save(user_id, record).await?;
                Ok(reply)
            }
            Action::SellCustom { token_address } => {
                self.enter_state(
                    user_id,
                    record,
                    ConversationState::AwaitingSellAmount { token_address },
                )
                .await
            }
            Action::Position { token_address } => {
                Ok(self.position_report(record, &token_address).await)
            }
        }
    }

    /// Enter an awaiting state, persist it, and prompt.
    async fn enter_state(
        &self,
        user_id: &str,
        record: &mut UserRecord,
        state: ConversationState,
    ) -> Result<Reply, Error> {
        let prompt = state.prompt();
        record.state = Some(state);
        self.store.save(user_id, record).await?;
        Ok(Reply::text(prompt))
    }

    // ==================== Trade flows ====================

    /// Spend `sol_amount` buying `token_address`. Appends to the ledger only
    /// on a successful fill; the caller persists.
    async fn execute_buy(
        &self,
        record: &mut UserRecord,
        token_address: &str,
        sol_amount: Decimal,
    ) -> Reply {
        let Some(signer) = record.wallet.as_ref().and_then(|w| w.signing_key()).cloned() else {
            return Reply::text("No wallet available. Create or import one first.")
                .with_menu(wallet_menu());
        };

        // Metadata snapshot for the ledger entry. A trade with no metadata
        // would write an unlabelled event, so the buy degrades instead.
        let metadata = match self.gateway.token_metadata(token_address).await {
            Ok(metadata) => metadata,
            Err(e) => {
                return Reply::text(format!(
                    "Token metadata unavailable, trade not executed: {e}"
                ));
            }
        };

        let request = SwapRequest {
            input_mint: SOL_MINT.to_string(),
            output_mint: token_address.to_string(),
            amount: sol_amount,
            slippage_bps: record.settings.buy_slippage_bps,
            priority_fee_lamports: record.settings.priority_fee_lamports,
        };

        match self.executor.execute_swap(request, &signer).await {
            Ok(receipt) => {
                record.append_trade(TradeEvent {
                    kind: TradeKind::Buy,
                    token_address: token_address.to_string(),
                    token_symbol: metadata.symbol.clone(),
                    token_decimals: metadata.decimals,
                    counter_asset_amount: receipt.input_amount,
                    token_amount: receipt.output_amount,
                    timestamp: Utc::now(),
                });
                Reply::text(format!(
                    "Bought {} {} for {} SOL. Tx: {}",
                    receipt.output_amount, metadata.symbol, receipt.input_amount,
                    receipt.tx_signature
                ))
            }
            Err(e) => Reply::text(e.to_string()),
        }
    }

    /// Sell `token_amount` of `token_address`. Validates against net
    /// holdings and the smallest representable unit before touching the
    /// executor; appends only on a successful fill. The caller persists.
    async fn execute_sell(
        &self,
        record: &mut UserRecord,
        token_address: &str,
        token_amount: Decimal,
    ) -> Reply {
        let Some(signer) = record.wallet.as_ref().and_then(|w| w.signing_key()).cloned() else {
            return Reply::text("No wallet available. Create or import one first.")
                .with_menu(wallet_menu());
        };

        let available = ledger::holdings_for(record.transactions(), token_address).net_held();
        if token_amount > available {
            let e = LedgerError::InsufficientHoldings {
                requested: token_amount,
                available,
            };
            return Reply::text(format!("{e}."));
        }

        // Holdings are positive here, so the token has at least one ledger
        // entry carrying its decimals snapshot.
        let Some(snapshot) = record
            .transactions()
            .iter()
            .rev()
            .find(|e| e.token_address == token_address)
            .map(|e| (e.token_symbol.clone(), e.token_decimals))
        else {
            return Reply::text("Nothing to sell for that token.");
        };
        let (symbol, decimals) = snapshot;

        let minimum = ledger::smallest_unit(decimals);
        if token_amount < minimum {
            let e = LedgerError::BelowMinimumUnit {
                amount: token_amount,
                minimum,
            };
            return Reply::text(format!("{e}."));
        }

        let request = SwapRequest {
            input_mint: token_address.to_string(),
            output_mint: SOL_MINT.to_string(),
            amount: token_amount,
            slippage_bps: record.settings.sell_slippage_bps,
            priority_fee_lamports: record.settings.priority_fee_lamports,
        };

        match self.executor.execute_swap(request, &signer).await {
            Ok(receipt) => {
                record.append_trade(TradeEvent {
                    kind: TradeKind::Sell,
                    token_address: token_address.to_string(),
                    token_symbol: symbol.clone(),
                    token_decimals: decimals,
                    counter_asset_amount: receipt.output_amount,
                    token_amount: receipt.input_amount,
                    timestamp: Utc::now(),
                });
                Reply::text(format!(
                    "Sold {} {} for {} SOL. Tx: {}",
                    receipt.input_amount, symbol, receipt.output_amount, receipt.tx_signature
                ))
            }
            Err(e) => Reply::text(e.to_string()),
        }
    }

    // ==================== Read-only views ====================

    /// Freeform text with no pending state: interpret as a token lookup.
    async fn token_overview(&self, record: &UserRecord, input: &str) -> Result<Reply, Error> {
        if !looks_like_mint(input) {
            return Ok(Reply::text(
                "That doesn't look like a token mint address. Send a mint address, or use /help.",
            )
            .with_menu(main_menu()));
        }

        let holdings = ledger::holdings_for(record.transactions(), input);

        let mut menu: Vec<MenuButton> = PRESET_BUY_AMOUNTS_SOL
            .iter()
            .map(|amount| {
                MenuButton::new(
                    format!("Buy {amount} SOL"),
                    Action::Buy {
                        token_address: input.to_string(),
                        sol_amount: *amount,
                    },
                )
            })
            .collect();
        menu.push(MenuButton::new(
            "Buy custom",
            Action::BuyCustom {
                token_address: input.to_string(),
            },
        ));
        if holdings.is_held() {
            menu.push(MenuButton::new(
                "Sell all",
                Action::SellAll {
                    token_address: input.to_string(),
                },
            ));
            menu.push(MenuButton::new(
                "Sell custom",
                Action::SellCustom {
                    token_address: input.to_string(),
                },
            ));
            menu.push(MenuButton::new(
                "Position",
                Action::Position {
                    token_address: input.to_string(),
                },
            ));
        }

        let text = match self.gateway.token_metadata(input).await {
            Ok(metadata) => {
                let mut text = format!(
                    "{} at {} USD\nLiquidity: {} USD, 24h volume: {} USD",
                    metadata.symbol, metadata.price_usd, metadata.liquidity_usd,
                    metadata.volume_24h_usd,
                );
                if !metadata.mint_authority_disabled || !metadata.freeze_authority_disabled {
                    text.push_str("\nWarning: mint or freeze authority still enabled.");
                }
                if holdings.is_held() {
                    text.push_str(&format!("\nYou hold {}.", holdings.net_held()));
                }
                text
            }
            Err(e) => format!("Metadata unavailable: {e}"),
        };

        Ok(Reply::text(text).with_menu(menu))
    }

    /// Value a position via the gateway. Degrades to an explicit
    /// "unavailable" reply on any gateway fault; never fabricates a price.
    async fn position_report(&self, record: &UserRecord, token_address: &str) -> Reply {
        let metadata = match self.gateway.token_metadata(token_address).await {
            Ok(metadata) => metadata,
            Err(e) => return Reply::text(format!("PnL unavailable: {e}")),
        };
        let sol_usd = match self.gateway.sol_usd_price().await {
            Ok(price) => price,
            Err(e) => return Reply::text(format!("PnL unavailable: {e}")),
        };
        let Some(price_in_sol) = metadata.price_in_sol(sol_usd) else {
            return Reply::text("PnL unavailable: no usable SOL price.");
        };

        match pnl::compute_pnl(record.transactions(), token_address, price_in_sol) {
            PnlOutcome::NoHoldings => Reply::text(format!("No holdings in {}.", metadata.symbol)),
            PnlOutcome::Report(report) => {
                let percent = report
                    .pnl_percent
                    .map(|p| format!("{}%", p.round_dp(2).normalize()))
                    .unwrap_or_else(|| "n/a (zero net cost)".to_string());
                Reply::text(format!(
                    "{}: holding {}\nAvg cost: {} SOL\nValue: {} SOL\nPnL: {} SOL ({})",
                    metadata.symbol,
                    report.net_held.normalize(),
                    report.avg_cost_basis.round_dp(9).normalize(),
                    report.current_value.round_dp(9).normalize(),
                    report.pnl_absolute.round_dp(9).normalize(),
                    percent,
                ))
            }
        }
    }
}

// ==================== Menus ====================

fn main_menu() -> Vec<MenuButton> {
    vec![
        MenuButton::new("Create wallet", Action::CreateWallet),
        MenuButton::new("Import wallet", Action::ImportWallet),
        MenuButton::new("Show wallet", Action::ShowWallet),
        MenuButton::new("Buy slippage", Action::SetBuySlippage),
        MenuButton::new("Sell slippage", Action::SetSellSlippage),
        MenuButton::new("Priority fee", Action::SetPriorityFee),
    ]
}

fn wallet_menu() -> Vec<MenuButton> {
    vec![
        MenuButton::new("Create wallet", Action::CreateWallet),
        MenuButton::new("Import wallet", Action::ImportWallet),
    ]
}

fn show_settings(record: &UserRecord) -> Reply {
    Reply::text(format!(
        "Buy slippage: {} bps\nSell slippage: {} bps\nPriority fee: {} lamports",
        record.settings.buy_slippage_bps,
        record.settings.sell_slippage_bps,
        record.settings.priority_fee_lamports,
    ))
    .with_menu(vec![
        MenuButton::new("Buy slippage", Action::SetBuySlippage),
        MenuButton::new("Sell slippage", Action::SetSellSlippage),
        MenuButton::new("Priority fee", Action::SetPriorityFee),
    ])
}

// ==================== Input parsing ====================

fn parse_decimal(input: &str) -> Result<Decimal, ValidationError> {
    input
        .trim()
        .parse::<Decimal>()
        .map_err(|_| ValidationError::NotNumeric {
            input: input.trim().to_string(),
        })
}

/// A strictly positive decimal amount.
fn parse_positive_amount(input: &str) -> Result<Decimal, ValidationError> {
    let amount = parse_decimal(input)?;
    if amount <= Decimal::ZERO {
        return Err(ValidationError::OutOfRange {
            field: "amount",
            message: format!("{amount} must be greater than zero"),
        });
    }
    Ok(amount)
}

/// A slippage percentage in (0, 100], converted to basis points.
fn parse_slippage_bps(input: &str) -> Result<u32, ValidationError> {
    let percent = parse_decimal(input)?;
    if percent <= Decimal::ZERO || percent > dec!(100) {
        return Err(ValidationError::OutOfRange {
            field: "slippage",
            message: format!("{percent}% must be within (0, 100]"),
        });
    }
    (percent * dec!(100))
        .round()
        .to_u32()
        .ok_or(ValidationError::OutOfRange {
            field: "slippage",
            message: "does not convert to basis points".to_string(),
        })
}

/// A priority fee in whole lamports, capped at one SOL.
fn parse_priority_fee(input: &str) -> Result<u64, ValidationError> {
    let lamports = input
        .trim()
        .parse::<u64>()
        .map_err(|_| ValidationError::NotNumeric {
            input: input.trim().to_string(),
        })?;
    if lamports > MAX_PRIORITY_FEE_LAMPORTS {
        return Err(ValidationError::OutOfRange {
            field: "priority fee",
            message: format!("{lamports} exceeds the cap of {MAX_PRIORITY_FEE_LAMPORTS} lamports"),
        });
    }
    Ok(lamports)
}

/// Plausibility check for a base58 32-byte mint address.
fn looks_like_mint(input: &str) -> bool {
    if input.len() < 32 || input.len() > 44 || input.contains(char::is_whitespace) {
        return false;
    }
    bs58::decode(input)
        .into_vec()
        .map(|bytes| bytes.len() == 32)
        .unwrap_or(false)
}
