//! Purchase verification against scripted payment history.

use super::harness::{key, merchant, sol, transfer_tx, TestHarness, NETWORK_FEE};
use std::collections::HashMap;
use studycake_entitlements::catalog;
use studycake_entitlements::payment::{EntitlementStatus, PurchaseRecord};
use studycake_entitlements::{EntitlementConfig, Lamports, TxSignature};

const TENTH: u64 = 100_000_000;

#[tokio::test]
async fn test_no_payment_is_not_purchased() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .ledger
        .land(transfer_tx("unrelated", wallet, key(9), TENTH));

    let owned = harness
        .service
        .purchases()
        .verify_purchase(&wallet, 1, sol("0.1"))
        .await;

    assert!(!owned);
    assert!(harness.service.purchases().cache().get_cached().is_empty());
}

#[tokio::test]
async fn test_payment_found_and_cached() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .ledger
        .land(transfer_tx("pay-1", wallet, merchant(), TENTH));

    let status = harness
        .service
        .purchases()
        .check_purchase(&wallet, 1, sol("0.1"))
        .await;
    assert_eq!(status, EntitlementStatus::Verified);

    let cached = harness.service.purchases().cache().get_cached();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].owner, Some(wallet));
    assert_eq!(cached[0].course_id, 1);
    assert_eq!(cached[0].signature, TxSignature::from("pay-1"));
    assert_eq!(cached[0].amount, Lamports(TENTH));
}

#[tokio::test]
async fn test_second_check_uses_cached_signature() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    for i in 0..5 {
        harness
            .ledger
            .land(transfer_tx(&format!("noise-{i}"), wallet, key(9), 42));
    }
    harness
        .ledger
        .land(transfer_tx("pay-1", wallet, merchant(), TENTH));

    let purchases = harness.service.purchases();
    assert!(purchases.verify_purchase(&wallet, 1, sol("0.1")).await);

    harness.ledger.reset_calls();
    let status = purchases.check_purchase(&wallet, 1, sol("0.1")).await;

    assert_eq!(status, EntitlementStatus::CachedAsVerified);
    let calls = harness.ledger.calls();
    assert_eq!(calls.signatures, 0);
    assert_eq!(calls.transactions, 1);
}

#[tokio::test]
async fn test_vanished_cached_transaction_falls_back_to_scan() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness.service.purchases().cache().cache(PurchaseRecord {
        owner: Some(wallet),
        course_id: 1,
        signature: TxSignature::from("pruned"),
        timestamp: 0,
        amount: Lamports(TENTH),
    });
    harness
        .ledger
        .land(transfer_tx("pay-2", wallet, merchant(), TENTH));

    let status = harness
        .service
        .purchases()
        .check_purchase(&wallet, 1, sol("0.1"))
        .await;

    assert_eq!(status, EntitlementStatus::Verified);
    assert_eq!(harness.ledger.calls().signatures, 1);
    let cached = harness.service.purchases().cache().get_cached();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].signature, TxSignature::from("pay-2"));
}

#[tokio::test]
async fn test_underpayment_by_one_lamport_is_rejected() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .ledger
        .land(transfer_tx("short", wallet, merchant(), TENTH - 1));

    assert!(
        !harness
            .service
            .purchases()
            .verify_purchase(&wallet, 1, sol("0.1"))
            .await
    );
}

#[tokio::test]
async fn test_fee_inclusive_deduction_does_not_match() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .ledger
        .land(transfer_tx("with-fee", wallet, merchant(), TENTH + NETWORK_FEE));

    assert!(
        !harness
            .service
            .purchases()
            .verify_purchase(&wallet, 1, sol("0.1"))
            .await
    );
}

#[tokio::test]
async fn test_failed_payment_is_rejected() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    let mut tx = transfer_tx("failed", wallet, merchant(), TENTH);
    tx.err = Some(serde_json::json!({ "InstructionError": [0, "Custom"] }));
    harness.ledger.land(tx);

    assert!(
        !harness
            .service
            .purchases()
            .verify_purchase(&wallet, 1, sol("0.1"))
            .await
    );
}

#[tokio::test(start_paused = true)]
async fn test_hung_fetches_time_out_to_false() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .ledger
        .land(transfer_tx("pay-1", wallet, merchant(), TENTH));
    harness.ledger.hang_all();

    let owned = harness
        .service
        .purchases()
        .verify_purchase(&wallet, 1, sol("0.1"))
        .await;

    assert!(!owned);
    assert!(harness.service.purchases().cache().get_cached().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_one_hung_fetch_does_not_hide_a_match() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .ledger
        .land(transfer_tx("pay-1", wallet, merchant(), TENTH));
    harness
        .ledger
        .land(transfer_tx("stuck", wallet, key(9), 7));
    harness.ledger.hang("stuck");

    assert!(
        harness
            .service
            .purchases()
            .verify_purchase(&wallet, 1, sol("0.1"))
            .await
    );
}

#[tokio::test]
async fn test_unconfigured_merchant_makes_no_calls() {
    let harness = TestHarness::unconfigured();
    let wallet = key(1);
    harness
        .ledger
        .land(transfer_tx("pay-1", wallet, merchant(), TENTH));

    let status = harness
        .service
        .purchases()
        .check_purchase(&wallet, 1, sol("0.1"))
        .await;

    assert_eq!(status, EntitlementStatus::Misconfigured);
    assert_eq!(harness.ledger.calls().total(), 0);
}

#[tokio::test]
async fn test_history_failure_is_not_purchased() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .ledger
        .land(transfer_tx("pay-1", wallet, merchant(), TENTH));
    harness.ledger.fail_history();

    assert!(
        !harness
            .service
            .purchases()
            .verify_purchase(&wallet, 1, sol("0.1"))
            .await
    );
}

#[tokio::test]
async fn test_first_match_in_signature_order_is_cached() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .ledger
        .land(transfer_tx("older", wallet, merchant(), TENTH));
    harness
        .ledger
        .land(transfer_tx("newer", wallet, merchant(), TENTH));

    assert!(
        harness
            .service
            .purchases()
            .verify_purchase(&wallet, 1, sol("0.1"))
            .await
    );

    let cached = harness.service.purchases().cache().get_cached();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].signature, TxSignature::from("newer"));
}

#[tokio::test]
async fn test_scan_respects_signature_limit() {
    let mut config = EntitlementConfig::default();
    config.merchant.address = Some(merchant().to_string());
    config.rpc.signature_limit = 3;
    let harness = TestHarness::setup_with_config(config);
    let wallet = key(1);

    harness
        .ledger
        .land(transfer_tx("old-payment", wallet, merchant(), TENTH));
    for i in 0..3 {
        harness
            .ledger
            .land(transfer_tx(&format!("recent-{i}"), wallet, key(9), 42));
    }

    assert!(
        !harness
            .service
            .purchases()
            .verify_purchase(&wallet, 1, sol("0.1"))
            .await
    );
    assert_eq!(harness.ledger.calls().transactions, 3);
}

#[tokio::test]
async fn test_other_wallets_cache_is_not_reused() {
    let harness = TestHarness::setup();
    let alice = key(1);
    let bob = key(2);
    harness
        .ledger
        .land(transfer_tx("alice-pays", alice, merchant(), TENTH));

    let purchases = harness.service.purchases();
    assert!(purchases.verify_purchase(&alice, 1, sol("0.1")).await);

    harness.ledger.reset_calls();
    assert!(!purchases.verify_purchase(&bob, 1, sol("0.1")).await);
    assert_eq!(harness.ledger.calls().signatures, 1);
    assert_eq!(purchases.cache().get_cached().len(), 1);
}

#[tokio::test]
async fn test_batch_returns_purchased_courses_in_order() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .ledger
        .land(transfer_tx("pay-101", wallet, merchant(), 350_000_000));
    harness
        .ledger
        .land(transfer_tx("pay-2", wallet, merchant(), TENTH));

    let prices = catalog::price_table();
    let purchases = harness.service.purchases();

    // Payments carry no course id; the 0.1 SOL payment counts for course 3.
    let sequential = purchases
        .get_purchased_courses(&wallet, &[101, 3, 102], &prices)
        .await;
    assert_eq!(sequential, vec![101, 3]);

    let concurrent = purchases
        .get_purchased_courses_concurrent(&wallet, &[101, 3, 102], &prices, 2)
        .await;
    assert_eq!(concurrent, vec![101, 3]);
}

#[tokio::test]
async fn test_batch_skips_courses_without_a_price() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .ledger
        .land(transfer_tx("pay-1", wallet, merchant(), TENTH));

    let mut prices = HashMap::new();
    prices.insert(1, Lamports(TENTH));

    let owned = harness
        .service
        .purchases()
        .get_purchased_courses(&wallet, &[1, 999], &prices)
        .await;

    assert_eq!(owned, vec![1]);
}

#[tokio::test]
async fn test_catalog_sweep_finds_sale_priced_course() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .ledger
        .land(transfer_tx("pay-102", wallet, merchant(), 450_000_000));

    let owned = harness.service.purchased_catalog_courses(&wallet).await;

    assert_eq!(owned, vec![102]);
}

#[tokio::test]
async fn test_zero_concurrency_still_checks_every_course() {
    let mut config = EntitlementConfig::default();
    config.merchant.address = Some(merchant().to_string());
    config.batch.concurrency = 0;
    let harness = TestHarness::setup_with_config(config);
    let wallet = key(1);
    harness
        .ledger
        .land(transfer_tx("pay-103", wallet, merchant(), 400_000_000));

    let direct = harness
        .service
        .purchases()
        .get_purchased_courses_concurrent(&wallet, &[102, 103], &catalog::price_table(), 0)
        .await;
    assert_eq!(direct, vec![103]);

    let swept = harness.service.purchased_catalog_courses(&wallet).await;
    assert_eq!(swept, vec![103]);
}
