//! Pure PnL computation over a ledger slice and a live price.
//!
//! Never mutates stored state and never touches native floating point. The
//! percentage figure is explicitly optional: when the net cost basis is
//! non-positive (e.g. the position was acquired at zero net cost after
//! profitable partial sells), the ratio is undefined and reported as `None`
//! rather than a saturating sentinel. The absolute figure is always valid.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::ledger::{self, TradeEvent};

/// Result of a PnL computation for one token.
#[derive(Debug, Clone, PartialEq)]
pub enum PnlOutcome {
    /// Net holdings are zero or negative; there is no position to value.
    NoHoldings,
    Report(PnlReport),
}

/// Valuation of a currently held position.
#[derive(Debug, Clone, PartialEq)]
pub struct PnlReport {
    pub net_held: Decimal,
    pub net_settlement_spent: Decimal,
    /// Net settlement spent divided by net held.
    pub avg_cost_basis: Decimal,
    /// Net held valued at the current price.
    pub current_value: Decimal,
    pub pnl_absolute: Decimal,
    /// Percentage gain on net cost; `None` when net cost is non-positive.
    pub pnl_percent: Option<Decimal>,
}

/// Compute cost basis, current value, and profit/loss for `token_address`.
///
/// `current_price` is the settlement-asset price per whole token unit.
pub fn compute_pnl(
    events: &[TradeEvent],
    token_address: &str,
    current_price: Decimal,
) -> PnlOutcome {
    let net_held = ledger::holdings_for(events, token_address).net_held();
    // Normalization guards against a net position that rounds to zero at the
    // working precision: dividing by it would blow up the cost basis.
    if net_held.normalize() <= Decimal::ZERO {
        return PnlOutcome::NoHoldings;
    }

    let net_settlement_spent = ledger::net_settlement_spent(events, token_address);
    let avg_cost_basis = net_settlement_spent / net_held;
    let current_value = net_held * current_price;
    let pnl_absolute = current_value - net_settlement_spent;

    let pnl_percent = if net_settlement_spent > Decimal::ZERO {
        Some(pnl_absolute / net_settlement_spent * dec!(100))
    } else {
        None
    };

    PnlOutcome::Report(PnlReport {
        net_held,
        net_settlement_spent,
        avg_cost_basis,
        current_value,
        pnl_absolute,
        pnl_percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TradeKind;
    use chrono::Utc;

    fn event(kind: TradeKind, sol: Decimal, tokens: Decimal) -> TradeEvent {
        TradeEvent {
            kind,
            token_address: "mint".to_string(),
            token_symbol: "TOK".to_string(),
            token_decimals: 6,
            counter_asset_amount: sol,
            token_amount: tokens,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn averaged_cost_basis_and_fifty_percent_gain() {
        // Buy 100 for 1.0 SOL, then 100 more for 3.0 SOL: net spent 4.0,
        // net held 200, avg cost 0.02/unit. At 0.03/unit the position is
        // worth 6.0, a gain of 2.0 (50%).
        let events = vec![
            event(TradeKind::Buy, dec!(1.0), dec!(100)),
            event(TradeKind::Buy, dec!(3.0), dec!(100)),
        ];

        match compute_pnl(&events, "mint", dec!(0.03)) {
            PnlOutcome::Report(report) => {
                assert_eq!(report.net_held, dec!(200));
                assert_eq!(report.net_settlement_spent, dec!(4.0));
                assert_eq!(report.avg_cost_basis, dec!(0.02));
                assert_eq!(report.current_value, dec!(6.00));
                assert_eq!(report.pnl_absolute, dec!(2.00));
                assert_eq!(report.pnl_percent, Some(dec!(50)));
            }
            other => panic!("expected a report, got {other:?}"),
        }
    }

    #[test]
    fn lone_sell_yields_no_holdings_not_negative_value() {
        let events = vec![event(TradeKind::Sell, dec!(1.0), dec!(50))];
        assert_eq!(compute_pnl(&events, "mint", dec!(0.03)), PnlOutcome::NoHoldings);
    }

    #[test]
    fn empty_slice_yields_no_holdings() {
        assert_eq!(compute_pnl(&[], "mint", dec!(1)), PnlOutcome::NoHoldings);
    }

    #[test]
    fn fully_exited_position_yields_no_holdings() {
        let events = vec![
            event(TradeKind::Buy, dec!(2.0), dec!(100)),
            event(TradeKind::Sell, dec!(3.0), dec!(100)),
        ];
        assert_eq!(compute_pnl(&events, "mint", dec!(0.05)), PnlOutcome::NoHoldings);
    }

    #[test]
    fn zero_net_cost_reports_undefined_percentage() {
        // Sells already recouped the full cost but tokens remain: the
        // percentage ratio is undefined, the absolute gain is not.
        let events = vec![
            event(TradeKind::Buy, dec!(2.0), dec!(100)),
            event(TradeKind::Sell, dec!(2.0), dec!(40)),
        ];

        match compute_pnl(&events, "mint", dec!(0.05)) {
            PnlOutcome::Report(report) => {
                assert_eq!(report.net_held, dec!(60));
                assert_eq!(report.net_settlement_spent, Decimal::ZERO);
                assert_eq!(report.pnl_absolute, dec!(3.00));
                assert_eq!(report.pnl_percent, None);
            }
            other => panic!("expected a report, got {other:?}"),
        }
    }

    #[test]
    fn other_tokens_do_not_leak_into_the_computation() {
        let mut events = vec![event(TradeKind::Buy, dec!(1.0), dec!(100))];
        events.push(TradeEvent {
            token_address: "other".to_string(),
            ..event(TradeKind::Buy, dec!(9.0), dec!(900))
        });

        match compute_pnl(&events, "mint", dec!(0.01)) {
            PnlOutcome::Report(report) => {
                assert_eq!(report.net_held, dec!(100));
                assert_eq!(report.net_settlement_spent, dec!(1.0));
            }
            other => panic!("expected a report, got {other:?}"),
        }
    }
}
