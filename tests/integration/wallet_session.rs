use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::assert_ok;

use chainmate::config::RestorePolicy;
use chainmate::session::{SessionStatus, Subscription};
use chainmate::storage::{MemorySessionStore, SessionStore};
use chainmate::wallet::errors::{ProviderError, WalletError};
use chainmate::wallet::guard::NetworkGuard;
use chainmate::wallet::locator::InjectedProviders;
use chainmate::wallet::provider::{ProviderEvent, ProviderInfo, WalletProvider};
use chainmate::wallet::types::{ChainId, WalletKind, WalletState};

use crate::common::mock_provider::MockProvider;
use crate::common::test_data::{address, black, deploy_contract, on_chain_guard, white, Harness, LOCAL_CHAIN};

fn connected_wallet() -> MockProvider {
    MockProvider::metamask().with_account(&white(), LOCAL_CHAIN)
}

async fn next(subscription: &mut Subscription) -> chainmate::session::SessionSnapshot {
    tokio::time::timeout(Duration::from_secs(2), subscription.next())
        .await
        .expect("snapshot not published in time")
        .expect("session closed")
}

#[tokio::test]
async fn test_connect_publishes_and_persists() {
    let harness = Harness::start(connected_wallet(), NetworkGuard::unconfigured());

    let report = assert_ok!(harness.session.connect().await);
    assert_eq!(report.wallet.address, white());
    assert_eq!(report.wallet.chain_id, ChainId::new(LOCAL_CHAIN));
    assert!(report.warnings.is_empty());

    let snapshot = harness.session.current();
    assert!(snapshot.is_connected());
    assert_eq!(snapshot.version, 2);
    assert_eq!(harness.session.wallet(), Some(report.wallet.clone()));
    assert_eq!(harness.store.load().unwrap(), Some(report.wallet));

    let methods: Vec<String> = harness.provider.calls().into_iter().map(|call| call.method).collect();
    assert_eq!(methods, vec!["eth_requestAccounts", "eth_chainId"]);
}

#[tokio::test]
async fn test_subscriber_sees_connecting_then_connected() {
    let harness = Harness::start(connected_wallet(), NetworkGuard::unconfigured());
    let mut subscription = harness.session.subscribe().await.unwrap();
    assert!(subscription.try_next().is_none());

    harness.session.connect().await.unwrap();

    let connecting = next(&mut subscription).await;
    assert_eq!(connecting.status, SessionStatus::Connecting);
    assert!(connecting.wallet.is_none());
    let connected = next(&mut subscription).await;
    assert_eq!(connected.status, SessionStatus::Connected);
    assert!(connected.version > connecting.version);
}

#[tokio::test]
async fn test_user_rejection_is_distinguished_and_leaves_no_state() {
    let provider = MockProvider::metamask();
    provider.fail("eth_requestAccounts", ProviderError::user_rejected());
    let harness = Harness::start(provider, NetworkGuard::unconfigured());

    let error = harness.session.connect().await.unwrap_err();
    assert!(matches!(error, WalletError::UserRejected(_)));
    assert_eq!(harness.session.current().status, SessionStatus::Disconnected);
    assert!(harness.session.wallet().is_none());
    assert!(harness.store.load().unwrap().is_none());
    assert_eq!(harness.provider.call_count("eth_requestAccounts"), 1);
}

#[tokio::test]
async fn test_missing_provider_fails_without_requests() {
    let imitator = MockProvider::new(ProviderInfo::new(
        "Phantom",
        vec![WalletKind::MetaMask, WalletKind::Phantom],
    ))
    .with_account(&white(), LOCAL_CHAIN);
    let harness = Harness::start(imitator, NetworkGuard::unconfigured());

    let error = harness.session.connect().await.unwrap_err();
    assert!(matches!(
        &error,
        WalletError::ProviderUnavailable { detected, .. } if detected == &vec![WalletKind::Phantom]
    ));
    assert!(harness.provider.calls().is_empty());
}

#[tokio::test]
async fn test_guard_failures_only_warn_on_connect() {
    let provider = MockProvider::metamask().with_account(&white(), "0x1");
    provider.respond("eth_getCode", json!("0x"));
    let harness = Harness::start(provider, on_chain_guard());

    let report = harness.session.connect().await.unwrap();
    assert_eq!(report.warnings.len(), 2);
    assert!(matches!(report.warnings[0], WalletError::NetworkMismatch { .. }));
    assert!(matches!(report.warnings[1], WalletError::ContractNotFound(_)));
    assert!(harness.session.current().is_connected());
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let harness = Harness::start(connected_wallet(), NetworkGuard::unconfigured());

    harness.session.connect().await.unwrap();
    let version = harness.session.current().version;
    let again = harness.session.connect().await.unwrap();

    assert_eq!(again.wallet.address, white());
    assert_eq!(harness.session.current().version, version);
    assert_eq!(harness.provider.call_count("eth_requestAccounts"), 1);
}

#[tokio::test]
async fn test_account_changes_are_observed_in_order() {
    let harness = Harness::start(connected_wallet(), NetworkGuard::unconfigured());
    harness.session.connect().await.unwrap();
    let mut subscription = harness.session.subscribe().await.unwrap();

    let current = next(&mut subscription).await;
    assert_eq!(current.wallet.unwrap().address, white());

    harness.provider.switch_account(&address(2));
    harness.provider.switch_account(&address(3));

    let first = next(&mut subscription).await;
    let second = next(&mut subscription).await;
    assert_eq!(first.wallet.unwrap().address, address(2));
    assert_eq!(second.wallet.unwrap().address, address(3));
    assert_eq!(second.version, first.version + 1);

    assert_eq!(harness.session.wallet().unwrap().address, address(3));
    assert_eq!(harness.store.load().unwrap().unwrap().address, address(3));
}

#[tokio::test]
async fn test_revoked_accounts_disconnect_and_clear_storage() {
    let harness = Harness::start(connected_wallet(), NetworkGuard::unconfigured());
    harness.session.connect().await.unwrap();
    let mut subscription = harness.session.subscribe().await.unwrap();
    next(&mut subscription).await;

    harness.provider.emit(ProviderEvent::AccountsChanged(Vec::new()));

    let snapshot = next(&mut subscription).await;
    assert_eq!(snapshot.status, SessionStatus::Disconnected);
    assert!(snapshot.wallet.is_none());
    assert!(harness.store.load().unwrap().is_none());
    assert!(harness.session.active_provider().is_none());
}

#[tokio::test]
async fn test_provider_disconnect_event_disconnects() {
    let harness = Harness::start(connected_wallet(), NetworkGuard::unconfigured());
    harness.session.connect().await.unwrap();
    let mut subscription = harness.session.subscribe().await.unwrap();
    next(&mut subscription).await;

    harness.provider.emit(ProviderEvent::Disconnect);

    assert_eq!(next(&mut subscription).await.status, SessionStatus::Disconnected);
}

#[tokio::test]
async fn test_chain_switch_is_revalidated() {
    let provider = connected_wallet();
    deploy_contract(&provider);
    let harness = Harness::start(provider, on_chain_guard());
    harness.session.connect().await.unwrap();
    let mut subscription = harness.session.subscribe().await.unwrap();
    next(&mut subscription).await;

    let invalidations = harness.cache.invalidation_count();
    harness.provider.switch_chain("0x1");

    let snapshot = next(&mut subscription).await;
    assert_eq!(snapshot.status, SessionStatus::Disconnected);
    assert!(harness.cache.invalidation_count() > invalidations);
    assert!(harness.store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_chain_switch_updates_unguarded_session() {
    let harness = Harness::start(connected_wallet(), NetworkGuard::unconfigured());
    harness.session.connect().await.unwrap();
    let mut subscription = harness.session.subscribe().await.unwrap();
    next(&mut subscription).await;

    harness.provider.switch_chain("137");

    let snapshot = next(&mut subscription).await;
    assert!(snapshot.is_connected());
    assert_eq!(snapshot.wallet.unwrap().chain_id, ChainId::new("0x89"));
    assert_eq!(harness.store.load().unwrap().unwrap().chain_id, ChainId::new("0x89"));
}

#[tokio::test]
async fn test_reconnect_leaves_one_listener() {
    let harness = Harness::start(connected_wallet(), NetworkGuard::unconfigured());
    harness.session.connect().await.unwrap();
    harness.session.disconnect().await.unwrap();
    harness.session.connect().await.unwrap();

    let mut subscription = harness.session.subscribe().await.unwrap();
    next(&mut subscription).await;

    harness.provider.switch_account(&black());
    let snapshot = next(&mut subscription).await;
    assert_eq!(snapshot.wallet.unwrap().address, black());

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(subscription.try_next().is_none());
    assert_eq!(harness.session.current().version, snapshot.version);
}

#[tokio::test]
async fn test_reconnect_is_a_fresh_cycle() {
    let harness = Harness::start(connected_wallet(), NetworkGuard::unconfigured());
    harness.session.connect().await.unwrap();
    let mut subscription = harness.session.subscribe().await.unwrap();
    let first = next(&mut subscription).await;
    assert!(first.is_connected());

    harness.session.disconnect().await.unwrap();
    assert!(harness.store.load().unwrap().is_none());
    harness.session.connect().await.unwrap();

    let disconnected = next(&mut subscription).await;
    let connecting = next(&mut subscription).await;
    let connected = next(&mut subscription).await;
    assert_eq!(disconnected.status, SessionStatus::Disconnected);
    assert_eq!(connecting.status, SessionStatus::Connecting);
    assert_eq!(connected.status, SessionStatus::Connected);
    assert!(disconnected.version > first.version);
    assert!(connecting.version > disconnected.version);
    assert!(connected.version > connecting.version);
    assert_eq!(connected.wallet.as_ref().unwrap().address, white());

    assert_eq!(harness.provider.call_count("eth_requestAccounts"), 2);
    assert_eq!(harness.store.load().unwrap(), connected.wallet);
}

#[tokio::test]
async fn test_pending_prompt_does_not_block_the_session() {
    let harness = Harness::start(connected_wallet(), NetworkGuard::unconfigured());
    harness.provider.hold("eth_requestAccounts");

    let session = harness.session.clone();
    let connect = tokio::spawn(async move { session.connect().await });
    while harness.provider.call_count("eth_requestAccounts") == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(harness.session.current().status, SessionStatus::Connecting);

    let mut subscription = tokio::time::timeout(Duration::from_secs(2), harness.session.subscribe())
        .await
        .expect("subscribe blocked by pending prompt")
        .unwrap();
    assert_eq!(next(&mut subscription).await.status, SessionStatus::Connecting);

    tokio::time::timeout(Duration::from_secs(2), harness.session.disconnect())
        .await
        .expect("disconnect blocked by pending prompt")
        .unwrap();
    assert_eq!(next(&mut subscription).await.status, SessionStatus::Disconnected);

    let outcome = connect.await.unwrap();
    assert!(matches!(outcome, Err(WalletError::ConnectCancelled)));
}

#[tokio::test]
async fn test_late_approval_after_disconnect_is_ignored() {
    let harness = Harness::start(connected_wallet(), NetworkGuard::unconfigured());
    harness.provider.hold("eth_requestAccounts");

    let session = harness.session.clone();
    let connect = tokio::spawn(async move { session.connect().await });
    while harness.provider.call_count("eth_requestAccounts") == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    harness.session.disconnect().await.unwrap();
    let version = harness.session.current().version;

    harness.provider.release("eth_requestAccounts");
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(matches!(connect.await.unwrap(), Err(WalletError::ConnectCancelled)));
    assert_eq!(harness.session.current().status, SessionStatus::Disconnected);
    assert_eq!(harness.session.current().version, version);
    assert!(harness.session.wallet().is_none());
    assert!(harness.store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_connects_share_one_prompt() {
    let harness = Harness::start(connected_wallet(), NetworkGuard::unconfigured());
    harness.provider.hold("eth_requestAccounts");

    let first = {
        let session = harness.session.clone();
        tokio::spawn(async move { session.connect().await })
    };
    while harness.provider.call_count("eth_requestAccounts") == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    // join! polls the connect first, so it reaches the mailbox before the
    // subscribe that gates the release.
    let release = async {
        harness.session.subscribe().await.unwrap();
        harness.provider.release("eth_requestAccounts");
    };
    let (second, ()) = tokio::join!(harness.session.connect(), release);

    let first = first.await.unwrap().unwrap();
    let second = second.unwrap();
    assert_eq!(first.wallet, second.wallet);
    assert_eq!(harness.provider.call_count("eth_requestAccounts"), 1);
    assert!(harness.session.current().is_connected());
}

#[tokio::test]
async fn test_reconnect_sees_reinjected_provider() {
    let harness = Harness::start(connected_wallet(), NetworkGuard::unconfigured());
    harness.session.connect().await.unwrap();
    harness.session.disconnect().await.unwrap();

    harness.injection.set(InjectedProviders::Absent);
    let error = harness.session.connect().await.unwrap_err();
    assert!(matches!(error, WalletError::ProviderUnavailable { .. }));
    assert_eq!(harness.session.current().status, SessionStatus::Disconnected);

    let provider: Arc<dyn WalletProvider> = harness.provider.clone();
    harness.injection.set(InjectedProviders::Single(provider));
    assert_ok!(harness.session.connect().await);
    assert!(harness.session.current().is_connected());
    assert_eq!(harness.provider.call_count("eth_requestAccounts"), 2);
}

#[tokio::test]
async fn test_disconnect_ignores_later_events() {
    let harness = Harness::start(connected_wallet(), NetworkGuard::unconfigured());
    harness.session.connect().await.unwrap();
    harness.session.disconnect().await.unwrap();
    let version = harness.session.current().version;

    harness.provider.switch_account(&black());
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(harness.session.current().version, version);
    assert!(harness.session.wallet().is_none());
}

#[tokio::test]
async fn test_stored_session_is_discarded_by_default() {
    let stale = WalletState::connected(black(), ChainId::new(LOCAL_CHAIN));
    let harness = Harness::start_with_store(
        connected_wallet(),
        NetworkGuard::unconfigured(),
        MemorySessionStore::with_state(stale),
        RestorePolicy::Discard,
    );

    assert!(harness.session.restored_hint().is_none());
    assert!(harness.store.load().unwrap().is_none());
    assert_eq!(harness.session.current().status, SessionStatus::Disconnected);
}

#[tokio::test]
async fn test_advisory_restore_is_a_hint_only() {
    let stale = WalletState::connected(black(), ChainId::new(LOCAL_CHAIN));
    let harness = Harness::start_with_store(
        connected_wallet(),
        NetworkGuard::unconfigured(),
        MemorySessionStore::with_state(stale.clone()),
        RestorePolicy::Advisory,
    );

    assert_eq!(harness.session.restored_hint(), Some(&stale));
    assert!(!harness.session.current().is_connected());
    assert!(harness.session.wallet().is_none());
    assert!(harness.provider.calls().is_empty());
}
