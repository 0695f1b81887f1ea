//! Course NFT ownership checks against a scripted asset index.

use super::harness::{collection, course_token, key, TestHarness};
use studycake_entitlements::payment::{EntitlementStatus, NftRecord};

#[tokio::test]
async fn test_token_found_and_cached() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .assets
        .mint(course_token(key(50), wallet, Some(collection()), 2));

    let status = harness.service.nfts().check_nft_ownership(&wallet, 2).await;
    assert_eq!(status, EntitlementStatus::Verified);

    let cached = harness.service.nfts().cache().get_cached();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].owner, Some(wallet));
    assert_eq!(cached[0].mint_address, key(50));
    assert_eq!(cached[0].course_id, 2);
}

#[tokio::test]
async fn test_second_check_reads_cached_mint() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .assets
        .mint(course_token(key(50), wallet, Some(collection()), 2));

    let nfts = harness.service.nfts();
    assert!(nfts.verify_nft_ownership(&wallet, 2).await);

    harness.assets.reset_calls();
    let status = nfts.check_nft_ownership(&wallet, 2).await;

    assert_eq!(status, EntitlementStatus::CachedAsVerified);
    let calls = harness.assets.calls();
    assert_eq!(calls.asset_lookups, 1);
    assert_eq!(calls.owner_lookups, 0);
}

#[tokio::test]
async fn test_transferred_token_no_longer_grants_access() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .assets
        .mint(course_token(key(50), wallet, Some(collection()), 2));

    let nfts = harness.service.nfts();
    assert!(nfts.verify_nft_ownership(&wallet, 2).await);

    harness.assets.transfer(&key(50), key(2));
    assert!(!nfts.verify_nft_ownership(&wallet, 2).await);
    assert!(nfts.verify_nft_ownership(&key(2), 2).await);
}

#[tokio::test]
async fn test_stale_cache_entry_is_replaced() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness.service.nfts().cache().cache(NftRecord {
        owner: Some(wallet),
        mint_address: key(40),
        course_id: 2,
        timestamp: 0,
    });
    harness
        .assets
        .mint(course_token(key(50), wallet, Some(collection()), 2));

    let status = harness.service.nfts().check_nft_ownership(&wallet, 2).await;

    assert_eq!(status, EntitlementStatus::Verified);
    let cached = harness.service.nfts().cache().get_cached();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].mint_address, key(50));
}

#[tokio::test]
async fn test_unconfigured_collection_makes_no_calls() {
    let harness = TestHarness::unconfigured();
    let wallet = key(1);
    harness
        .assets
        .mint(course_token(key(50), wallet, Some(collection()), 2));

    let status = harness.service.nfts().check_nft_ownership(&wallet, 2).await;

    assert_eq!(status, EntitlementStatus::Misconfigured);
    assert_eq!(harness.assets.calls().total(), 0);
}

#[tokio::test]
async fn test_token_from_other_collection_is_ignored() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .assets
        .mint(course_token(key(50), wallet, Some(key(77)), 2));
    harness.assets.mint(course_token(key(51), wallet, None, 2));

    assert!(!harness.service.nfts().verify_nft_ownership(&wallet, 2).await);
}

#[tokio::test]
async fn test_token_for_other_course_is_ignored() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .assets
        .mint(course_token(key(50), wallet, Some(collection()), 3));

    assert!(!harness.service.nfts().verify_nft_ownership(&wallet, 2).await);
}

#[tokio::test]
async fn test_batch_lists_held_courses() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .assets
        .mint(course_token(key(50), wallet, Some(collection()), 1));
    harness
        .assets
        .mint(course_token(key(51), wallet, Some(collection()), 103));
    harness
        .assets
        .mint(course_token(key(52), key(2), Some(collection()), 4));

    let owned = harness
        .service
        .nfts()
        .get_owned_course_nfts(&wallet, &[1, 4, 103])
        .await;

    assert_eq!(owned, vec![1, 103]);
}

#[tokio::test(start_paused = true)]
async fn test_hung_index_times_out_to_false() {
    let harness = TestHarness::setup();
    let wallet = key(1);
    harness
        .assets
        .mint(course_token(key(50), wallet, Some(collection()), 2));
    harness.assets.hang();

    assert!(!harness.service.nfts().verify_nft_ownership(&wallet, 2).await);
    assert!(harness.service.nfts().cache().get_cached().is_empty());
}
