// ═══════════════════════════════════════════════════════════════════
// Integration Tests — Wallet facade end to end, through the vault
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

use ledger_vault_core::errors::CoreError;
use ledger_vault_core::models::corporate_action::Ratio;
use ledger_vault_core::models::distribution::{Distribution, DistributionCategory};
use ledger_vault_core::models::position::Classification;
use ledger_vault_core::models::trade::{Trade, TradeSide};
use ledger_vault_core::storage::encryption::KdfParams;
use ledger_vault_core::storage::session::{SessionCache, SessionResume};
use ledger_vault_core::storage::vault::{Vault, VaultOptions};
use ledger_vault_core::Wallet;

// ── Helpers ─────────────────────────────────────────────────────────

const PASSWORD: &str = "a long enough passphrase";

fn d(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn options() -> VaultOptions {
    VaultOptions {
        kdf: KdfParams {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        },
        ..VaultOptions::default()
    }
}

/// A statement row as an import adapter would hand it over.
fn row(on: NaiveDate, side: &str, ticker: &str, qty: &str, price: &str) -> Trade {
    Trade::new(
        on,
        side.parse::<TradeSide>().unwrap(),
        "NU INVEST",
        ticker,
        d(qty),
        d(price),
        d(qty) * d(price),
    )
}

fn statement() -> Vec<Trade> {
    vec![
        row(date(2023, 3, 1), "Compra", "MGLU3", "1000", "2.80"),
        row(date(2023, 5, 2), "Compra", "ITSA4", "100", "8.50"),
        row(date(2023, 5, 3), "Compra", "ITSA4F", "7", "8.60"),
        row(date(2023, 6, 1), "Compra", "MXRF11", "200", "10.40"),
        row(date(2023, 6, 20), "Compra", "MXRF12", "30", "9.90"),
        row(date(2023, 6, 21), "Venda", "MXRF12", "10", "0.30"),
        row(date(2023, 9, 1), "Compra", "MGLU3", "50", "28.00"),
        row(date(2023, 10, 2), "Venda", "ITSA4", "20", "9.10"),
    ]
}

// ═══════════════════════════════════════════════════════════════════
// Wallet facade
// ═══════════════════════════════════════════════════════════════════

mod wallet {
    use super::*;

    #[test]
    fn new_wallet_is_clean_and_empty() {
        let w = Wallet::new();
        assert!(!w.is_dirty());
        assert!(w.ledger().is_empty());
        assert!(w.active_positions().is_empty());
    }

    #[test]
    fn mutations_mark_dirty() {
        let mut w = Wallet::new();
        w.add_trades(statement()).unwrap();
        assert!(w.is_dirty());
    }

    #[test]
    fn all_duplicate_batch_does_not_mark_dirty() {
        let mut w = Wallet::from_ledger(Default::default());
        w.add_trades(statement()).unwrap();
        let mut again = Wallet::from_ledger(w.ledger().clone());
        let outcome = again.add_trades(statement()).unwrap();
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.duplicates, 8);
        assert!(!again.is_dirty());
    }

    #[test]
    fn failed_mutation_does_not_mark_dirty() {
        let mut w = Wallet::new();
        assert!(w.merge_fractional("ITSA4F").is_err());
        assert!(!w.is_dirty());
    }

    #[test]
    fn debug_shows_counts_only() {
        let mut w = Wallet::new();
        w.add_trades(statement()).unwrap();
        let debug = format!("{w:?}");
        assert!(debug.contains("Wallet"));
        assert!(debug.contains("trades: 8"));
        assert!(debug.contains("dirty: true"));
    }

    #[test]
    fn can_sell_guards_oversell() {
        let mut w = Wallet::new();
        w.add_trades(statement()).unwrap();
        assert!(w.can_sell("ITSA4", d("80")).is_ok());
        assert!(matches!(
            w.can_sell("ITSA4", d("81")),
            Err(CoreError::InsufficientQuantity { held: 80, .. })
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Full workflow
// ═══════════════════════════════════════════════════════════════════

mod workflow {
    use super::*;

    #[test]
    fn import_adjust_reclassify_save_unlock() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("vault");

        let mut vault = Vault::create(&dir, PASSWORD, &options()).unwrap();
        {
            let w = vault.wallet_mut();
            let outcome = w.add_trades(statement()).unwrap();
            assert_eq!(outcome.added, 8);

            w.add_distributions(vec![
                Distribution::new(
                    date(2023, 7, 14),
                    "Rendimento".parse::<DistributionCategory>().unwrap(),
                    "MXRF11",
                    d("200"),
                    d("0.10"),
                    d("20"),
                ),
                Distribution::new(
                    date(2023, 8, 21),
                    "Juros Sobre Capital Próprio".parse().unwrap(),
                    "ITSA4",
                    d("107"),
                    d("0.0179"),
                    d("1.9153"),
                ),
            ])
            .unwrap();

            let split = w
                .apply_reverse_split("MGLU3", "10:1".parse::<Ratio>().unwrap(), date(2023, 8, 1))
                .unwrap();
            assert_eq!(split.quantity_after, 150);

            let merge = w.merge_fractional("ITSA4F").unwrap();
            assert_eq!(merge.target_quantity_after, 87);

            let conversion = w.convert_subscription("MXRF12", "MXRF11").unwrap();
            assert_eq!(conversion.sales_discarded, 1);
            assert_eq!(conversion.parent_quantity_after, 230);

            w.set_classification(
                "MXRF11",
                Classification {
                    kind: "variable income".into(),
                    sub_type: Some("real estate funds".into()),
                    segment: Some("paper".into()),
                },
            )
            .unwrap();
            assert!(w.is_dirty());
        }
        vault.save().unwrap();
        assert!(!vault.wallet().is_dirty());

        let snapshot = vault.wallet().ledger().clone();
        vault.lock().unwrap();

        let reopened = Vault::open(&dir).unwrap().unlock(PASSWORD).unwrap();
        let w = reopened.wallet();
        assert!(!w.is_dirty());
        assert_eq!(w.ledger().trade_count(), snapshot.trade_count());
        assert_eq!(w.ledger().distribution_count(), 2);

        let mglu = w.position("MGLU3").unwrap();
        assert_eq!(mglu.held_quantity(), 150);
        assert_eq!(mglu.average_cost(), d("28"));
        let pre = w
            .trades_for("MGLU3")
            .into_iter()
            .find(|t| t.date() == date(2023, 3, 1))
            .unwrap();
        assert_eq!(pre.quantity(), d("100"));
        assert_eq!(pre.amount(), d("2800"));

        assert!(w.position("ITSA4F").is_none());
        assert!(w.position("MXRF12").is_none());
        assert_eq!(
            w.position("MXRF11").unwrap().classification().segment.as_deref(),
            Some("paper")
        );

        let income = w.income_by_category();
        assert_eq!(income[&DistributionCategory::Income], d("20"));
        assert_eq!(income[&DistributionCategory::TaxAdvantagedInterest], d("1.9153"));
        assert_eq!(w.income_by_year()[&2023], d("21.9153"));

        for p in snapshot.positions() {
            assert_eq!(w.position(p.ticker()).unwrap().metrics(), p.metrics());
        }
    }

    #[test]
    fn closed_positions_keep_history() {
        let mut w = Wallet::new();
        w.add_trades(vec![
            row(date(2023, 1, 2), "Buy", "VALE3", "10", "70"),
            row(date(2023, 2, 2), "Sell", "VALE3", "10", "75"),
            row(date(2023, 1, 2), "Buy", "PETR4", "5", "30"),
        ])
        .unwrap();

        let closed: Vec<_> = w.closed_positions().iter().map(|p| p.ticker().to_string()).collect();
        assert_eq!(closed, vec!["VALE3"]);
        assert_eq!(w.trades_for("VALE3").len(), 2);
        assert_eq!(w.group_by_classification(true).values().map(Vec::len).sum::<usize>(), 1);
        assert_eq!(w.group_by_classification(false).values().map(Vec::len).sum::<usize>(), 2);
    }

    #[test]
    fn link_subscription_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("vault");

        let mut vault = Vault::create(&dir, PASSWORD, &options()).unwrap();
        vault.wallet_mut().add_trades(statement()).unwrap();
        vault.wallet_mut().link_subscription("MXRF12", "MXRF11").unwrap();
        vault.save().unwrap();
        vault.lock().unwrap();

        let reopened = Vault::open(&dir).unwrap().unlock(PASSWORD).unwrap();
        assert_eq!(
            reopened.wallet().position("MXRF12").unwrap().subscription_of(),
            Some("MXRF11")
        );
    }

    #[test]
    fn session_resume_then_save_without_password() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("vault");

        let mut vault = Vault::create(&dir, PASSWORD, &options()).unwrap();
        vault.wallet_mut().add_trades(statement()).unwrap();
        vault.save().unwrap();
        vault.cache_session().unwrap();
        drop(vault);

        let Some(SessionResume::Unlocked(mut resumed)) = SessionCache::resume(&dir).unwrap() else {
            panic!("expected an unlocked session");
        };
        resumed
            .wallet_mut()
            .apply_split("ITSA4", Ratio::new(1, 2), date(2024, 1, 1))
            .unwrap();
        resumed.save().unwrap();
        resumed.lock().unwrap();
        assert!(SessionCache::resume(&dir).unwrap().is_none());

        let reopened = Vault::open(&dir).unwrap().unlock(PASSWORD).unwrap();
        assert_eq!(reopened.wallet().position("ITSA4").unwrap().held_quantity(), 160);
    }

    #[test]
    fn unlock_with_wrong_password_yields_no_wallet() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("vault");
        Vault::create(&dir, PASSWORD, &options()).unwrap().lock().unwrap();

        let locked = Vault::open(&dir).unwrap();
        for attempt in ["", "a long enough passphrasE", "guess guess guess"] {
            assert!(matches!(locked.unlock(attempt), Err(CoreError::Authentication)));
        }
    }
}
