// ═══════════════════════════════════════════════════════════════════
// Model Tests — Trade, Distribution, fingerprints, Ratio, Ledger
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

use ledger_vault_core::errors::CoreError;
use ledger_vault_core::fingerprint;
use ledger_vault_core::models::corporate_action::{CorporateActionKind, Ratio};
use ledger_vault_core::models::decimal::{fixed4, parse_fixed, round4, round_to_units};
use ledger_vault_core::models::distribution::{Distribution, DistributionCategory};
use ledger_vault_core::models::ledger::Ledger;
use ledger_vault_core::models::position::{Classification, PositionMetrics, DEFAULT_KIND};
use ledger_vault_core::models::trade::{normalize_ticker, Trade, TradeSide};

// ── Helpers ─────────────────────────────────────────────────────────

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn buy(ticker: &str, qty: &str, price: &str, on: NaiveDate) -> Trade {
    Trade::new(on, TradeSide::Buy, "XP", ticker, d(qty), d(price), d(qty) * d(price))
}

fn sell(ticker: &str, qty: &str, price: &str, on: NaiveDate) -> Trade {
    Trade::new(on, TradeSide::Sell, "XP", ticker, d(qty), d(price), d(qty) * d(price))
}

// ═══════════════════════════════════════════════════════════════════
// Decimal helpers
// ═══════════════════════════════════════════════════════════════════

mod decimal {
    use super::*;

    #[test]
    fn round4_half_away_from_zero() {
        assert_eq!(round4(d("1.23455")), d("1.2346"));
        assert_eq!(round4(d("-1.23455")), d("-1.2346"));
        assert_eq!(round4(d("1.23454")), d("1.2345"));
    }

    #[test]
    fn fixed4_pads_and_rounds() {
        assert_eq!(fixed4(d("2.8")), "2.8000");
        assert_eq!(fixed4(d("2800")), "2800.0000");
        assert_eq!(fixed4(d("0.123456")), "0.1235");
    }

    #[test]
    fn round_to_units_rounds_half_up() {
        assert_eq!(round_to_units(d("119.5")), 120);
        assert_eq!(round_to_units(d("119.4999")), 119);
        assert_eq!(round_to_units(d("0")), 0);
    }

    #[test]
    fn parse_fixed_accepts_fixed_strings() {
        assert_eq!(parse_fixed("28.0000", "price").unwrap(), d("28"));
        assert_eq!(parse_fixed(" 0.5000 ", "price").unwrap(), d("0.5"));
    }

    #[test]
    fn parse_fixed_rejects_garbage() {
        let err = parse_fixed("abc", "quantity").unwrap_err();
        assert!(matches!(err, CoreError::Deserialization(_)));
        assert!(err.to_string().contains("quantity"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// TradeSide / DistributionCategory labels
// ═══════════════════════════════════════════════════════════════════

mod labels {
    use super::*;

    #[test]
    fn trade_side_parses_english_and_broker_labels() {
        assert_eq!(TradeSide::from_str("Buy").unwrap(), TradeSide::Buy);
        assert_eq!(TradeSide::from_str(" compra ").unwrap(), TradeSide::Buy);
        assert_eq!(TradeSide::from_str("SELL").unwrap(), TradeSide::Sell);
        assert_eq!(TradeSide::from_str("Venda").unwrap(), TradeSide::Sell);
    }

    #[test]
    fn trade_side_rejects_unknown() {
        let err = TradeSide::from_str("Transfer").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn trade_side_display() {
        assert_eq!(TradeSide::Buy.to_string(), "Buy");
        assert_eq!(TradeSide::Sell.to_string(), "Sell");
    }

    #[test]
    fn category_parses_broker_labels() {
        assert_eq!(
            DistributionCategory::from_str("Rendimento").unwrap(),
            DistributionCategory::Income
        );
        assert_eq!(
            DistributionCategory::from_str("Dividendo").unwrap(),
            DistributionCategory::Dividend
        );
        assert_eq!(
            DistributionCategory::from_str("Juros Sobre Capital Próprio").unwrap(),
            DistributionCategory::TaxAdvantagedInterest
        );
        assert_eq!(
            DistributionCategory::from_str("JCP").unwrap(),
            DistributionCategory::TaxAdvantagedInterest
        );
        assert_eq!(
            DistributionCategory::from_str("Resgate").unwrap(),
            DistributionCategory::Redemption
        );
    }

    #[test]
    fn category_parses_its_own_display() {
        for category in DistributionCategory::ALL {
            assert_eq!(
                DistributionCategory::from_str(&category.to_string()).unwrap(),
                category
            );
        }
    }

    #[test]
    fn category_rejects_unknown() {
        let err = DistributionCategory::from_str("Bonus").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Trade
// ═══════════════════════════════════════════════════════════════════

mod trade {
    use super::*;

    #[test]
    fn normalizes_ticker_and_institution() {
        let t = Trade::new(
            date(2024, 1, 10),
            TradeSide::Buy,
            "  XP Investimentos ",
            " petr4 ",
            d("10"),
            d("30"),
            d("300"),
        );
        assert_eq!(t.ticker(), "PETR4");
        assert_eq!(t.institution(), "XP Investimentos");
        assert_eq!(normalize_ticker(" itsa4f"), "ITSA4F");
    }

    #[test]
    fn rounds_numbers_to_four_places() {
        let t = buy("ITSA4", "1.00005", "9.87654", date(2024, 1, 10));
        assert_eq!(t.quantity(), d("1.0001"));
        assert_eq!(t.price(), d("9.8765"));
    }

    #[test]
    fn ids_are_unique_even_for_identical_content() {
        let a = buy("ITSA4", "10", "9", date(2024, 1, 10));
        let b = buy("ITSA4", "10", "9", date(2024, 1, 10));
        assert_ne!(a.id(), b.id());
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn is_buy() {
        assert!(buy("A", "1", "1", date(2024, 1, 1)).is_buy());
        assert!(!sell("A", "1", "1", date(2024, 1, 1)).is_buy());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Fingerprints
// ═══════════════════════════════════════════════════════════════════

mod fingerprints {
    use super::*;

    fn base() -> Trade {
        Trade::new(date(2024, 1, 10), TradeSide::Buy, "XP", "PETR4", d("10"), d("30"), d("300"))
    }

    #[test]
    fn is_hex_sha256() {
        let fp = base().fingerprint().to_string();
        assert_eq!(fp.len(), 64);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(fp, fingerprint::of_trade(&base()));
    }

    #[test]
    fn equal_fields_give_equal_fingerprints() {
        let a = base();
        let b = Trade::new(date(2024, 1, 10), TradeSide::Buy, "XP", "petr4", d("10.0"), d("30.00"), d("300"));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn changing_any_field_changes_the_fingerprint() {
        let fp = base().fingerprint().to_string();
        let variants = [
            Trade::new(date(2024, 1, 11), TradeSide::Buy, "XP", "PETR4", d("10"), d("30"), d("300")),
            Trade::new(date(2024, 1, 10), TradeSide::Sell, "XP", "PETR4", d("10"), d("30"), d("300")),
            Trade::new(date(2024, 1, 10), TradeSide::Buy, "Rico", "PETR4", d("10"), d("30"), d("300")),
            Trade::new(date(2024, 1, 10), TradeSide::Buy, "XP", "PETR3", d("10"), d("30"), d("300")),
            Trade::new(date(2024, 1, 10), TradeSide::Buy, "XP", "PETR4", d("11"), d("30"), d("300")),
            Trade::new(date(2024, 1, 10), TradeSide::Buy, "XP", "PETR4", d("10"), d("31"), d("300")),
            Trade::new(date(2024, 1, 10), TradeSide::Buy, "XP", "PETR4", d("10"), d("30"), d("301")),
        ];
        for v in &variants {
            assert_ne!(v.fingerprint(), fp, "{v:?} should hash differently");
        }
    }

    #[test]
    fn distribution_fingerprint_covers_category() {
        let a = Distribution::new(date(2024, 5, 15), DistributionCategory::Income, "HGLG11", d("10"), d("1.1"), d("11"));
        let b = Distribution::new(date(2024, 5, 15), DistributionCategory::Dividend, "HGLG11", d("10"), d("1.1"), d("11"));
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), fingerprint::of_distribution(&a));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Ratio / CorporateActionKind
// ═══════════════════════════════════════════════════════════════════

mod ratio {
    use super::*;

    #[test]
    fn parses_and_displays() {
        let r: Ratio = "10:1".parse().unwrap();
        assert_eq!(r, Ratio::new(10, 1));
        assert_eq!(r.to_string(), "10:1");
        assert_eq!(" 1 : 2 ".parse::<Ratio>().unwrap(), Ratio::new(1, 2));
    }

    #[test]
    fn rejects_malformed() {
        for raw in ["10", "10:0", "0:1", "a:b", "10-1", ""] {
            assert!(raw.parse::<Ratio>().is_err(), "{raw:?} should not parse");
        }
    }

    #[test]
    fn reverse_split_factor() {
        let f = CorporateActionKind::ReverseSplit.factor(Ratio::new(10, 1)).unwrap();
        assert_eq!(f, d("10"));
    }

    #[test]
    fn split_factor() {
        let f = CorporateActionKind::Split.factor(Ratio::new(1, 4)).unwrap();
        assert_eq!(f, d("4"));
    }

    #[test]
    fn shape_must_match_kind() {
        assert!(CorporateActionKind::ReverseSplit.factor(Ratio::new(1, 10)).is_err());
        assert!(CorporateActionKind::ReverseSplit.factor(Ratio::new(1, 1)).is_err());
        assert!(CorporateActionKind::Split.factor(Ratio::new(10, 1)).is_err());
        assert!(CorporateActionKind::Split.factor(Ratio::new(2, 3)).is_err());
    }
}

// ═══════════════════════════════════════════════════════════════════
// PositionMetrics
// ═══════════════════════════════════════════════════════════════════

mod metrics {
    use super::*;

    #[test]
    fn sells_reduce_quantity_but_not_cost() {
        let trades = vec![
            buy("A", "100", "10", date(2024, 1, 1)),
            buy("A", "50", "13", date(2024, 1, 2)),
            sell("A", "30", "20", date(2024, 1, 3)),
        ];
        let m = PositionMetrics::compute(&trades, &[]).unwrap();
        assert_eq!(m.held_quantity, 120);
        assert_eq!(m.average_cost, d("11"));
        assert_eq!(m.invested_capital, d("1650"));
        assert_eq!(m.total_income, Decimal::ZERO);
    }

    #[test]
    fn average_cost_is_order_independent() {
        let a = buy("A", "7", "3.33", date(2024, 1, 1));
        let b = buy("A", "13", "4.17", date(2024, 2, 1));
        let c = buy("A", "2", "9.01", date(2024, 3, 1));
        let forward = PositionMetrics::compute([&a, &b, &c], &[]).unwrap();
        let backward = PositionMetrics::compute([&c, &b, &a], &[]).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn no_buys_means_zero_cost() {
        let m = PositionMetrics::compute(&Vec::<Trade>::new(), &[]).unwrap();
        assert_eq!(m, PositionMetrics::default());
    }

    #[test]
    fn overflowing_cost_basis_is_a_validation_error() {
        let huge = d("1000000000000000");
        let trade = Trade::new(date(2024, 1, 1), TradeSide::Buy, "XP", "A", huge, huge, d("1"));
        let err = PositionMetrics::compute([&trade], &[]).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ref m) if m.contains("out of range")));
    }

    #[test]
    fn income_sums_distributions() {
        let ds = vec![
            Distribution::new(date(2024, 1, 15), DistributionCategory::Income, "A", d("10"), d("1.1"), d("11")),
            Distribution::new(date(2024, 2, 15), DistributionCategory::Income, "A", d("10"), d("1.05"), d("10.5")),
        ];
        let m = PositionMetrics::compute(&Vec::<Trade>::new(), &ds).unwrap();
        assert_eq!(m.total_income, d("21.5"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Ledger (read side)
// ═══════════════════════════════════════════════════════════════════

mod ledger {
    use super::*;

    #[test]
    fn new_ledger_is_empty() {
        let ledger = Ledger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.trade_count(), 0);
        assert_eq!(ledger.distribution_count(), 0);
        assert!(ledger.position("PETR4").is_none());
    }

    #[test]
    fn default_classification() {
        let c = Classification::default();
        assert_eq!(c.kind, DEFAULT_KIND);
        assert!(c.sub_type.is_none());
        assert!(c.segment.is_none());
    }
}
