//! Append-only trade ledger and derived-holdings queries.
//!
//! Events are immutable once appended and insertion order is chronological
//! order. All monetary fields are `Decimal`: values that feed the ledger or
//! PnL output never touch native floating point, so repeated buys and sells
//! cannot accumulate rounding drift.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    Buy,
    Sell,
}

impl TradeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// One executed trade, immutable once appended.
///
/// `token_symbol` and `token_decimals` are a denormalized snapshot of the
/// metadata at trade time. They may go stale; display paths re-fetch lazily
/// but history is never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub kind: TradeKind,
    pub token_address: String,
    pub token_symbol: String,
    pub token_decimals: u32,
    /// Settlement asset (SOL) moved: spent on a buy, received on a sell.
    pub counter_asset_amount: Decimal,
    /// Traded asset moved, whole-unit decimal.
    pub token_amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Bought/sold totals for one token across a ledger slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Holdings {
    pub bought_total: Decimal,
    pub sold_total: Decimal,
}

impl Holdings {
    pub fn net_held(&self) -> Decimal {
        self.bought_total - self.sold_total
    }

    /// A token is currently held iff more was bought than sold.
    pub fn is_held(&self) -> bool {
        self.net_held() > Decimal::ZERO
    }
}

/// A token with positive net holdings, with its latest ledger snapshot of
/// symbol and decimals.
#[derive(Debug, Clone, PartialEq)]
pub struct HeldPosition {
    pub token_address: String,
    pub token_symbol: String,
    pub token_decimals: u32,
    pub net_held: Decimal,
}

/// Sum token amounts over matching buys and sells.
pub fn holdings_for(events: &[TradeEvent], token_address: &str) -> Holdings {
    let mut holdings = Holdings::default();
    for event in events.iter().filter(|e| e.token_address == token_address) {
        match event.kind {
            TradeKind::Buy => holdings.bought_total += event.token_amount,
            TradeKind::Sell => holdings.sold_total += event.token_amount,
        }
    }
    holdings
}

/// Net settlement asset spent on a token: buys minus sells.
pub fn net_settlement_spent(events: &[TradeEvent], token_address: &str) -> Decimal {
    events
        .iter()
        .filter(|e| e.token_address == token_address)
        .map(|e| match e.kind {
            TradeKind::Buy => e.counter_asset_amount,
            TradeKind::Sell => -e.counter_asset_amount,
        })
        .sum()
}

/// Enumerate tokens with positive net holdings, in first-traded order.
pub fn held_positions(events: &[TradeEvent]) -> Vec<HeldPosition> {
    let mut order: Vec<&str> = Vec::new();
    for event in events {
        if !order.contains(&event.token_address.as_str()) {
            order.push(&event.token_address);
        }
    }

    order
        .into_iter()
        .filter_map(|address| {
            let holdings = holdings_for(events, address);
            if !holdings.is_held() {
                return None;
            }
            // Latest event wins for the denormalized snapshot.
            let latest = events
                .iter()
                .rev()
                .find(|e| e.token_address == address)?;
            Some(HeldPosition {
                token_address: address.to_string(),
                token_symbol: latest.token_symbol.clone(),
                token_decimals: latest.token_decimals,
                net_held: holdings.net_held(),
            })
        })
        .collect()
}

/// The smallest representable whole-unit amount for a token with the given
/// decimals (e.g. 6 decimals -> 0.000001).
pub fn smallest_unit(decimals: u32) -> Decimal {
    Decimal::new(1, decimals)
}
