use regex::Regex;
use std::sync::Arc;

use chainmate::game::{GameError, GameLobby};
use chainmate::storage::{GameRecord, GameStatus, GameStore, PlayerColor, START_POSITION};
use chainmate::wallet::errors::WalletError;
use chainmate::wallet::guard::NetworkGuard;
use chainmate::wallet::types::Address;

use crate::common::mock_provider::MockProvider;
use crate::common::test_data::{
    address, black, deploy_contract, on_chain_guard, white, Harness, LOCAL_CHAIN,
};
use crate::common::test_doubles::FailingGameStore;

/// A connected player with their own session, sharing `store` with others.
struct Seat {
    harness: Harness,
    lobby: GameLobby,
}

async fn seat(player: &Address, store: &Arc<FailingGameStore>) -> Seat {
    let provider = MockProvider::metamask().with_account(player, LOCAL_CHAIN);
    let harness = Harness::start(provider, NetworkGuard::unconfigured());
    harness.session.connect().await.unwrap();
    let lobby = GameLobby::new(Arc::new(harness.submitter()), store.clone());
    Seat { harness, lobby }
}

#[tokio::test]
async fn test_create_open_game() {
    let store = Arc::new(FailingGameStore::new());
    let alice = seat(&white(), &store).await;

    let game = alice.lobby.create_game(None).await.unwrap();

    assert!(Regex::new(r"^game_[0-9a-z]+$").unwrap().is_match(&game.id));
    assert_eq!(game.player1, white());
    assert!(game.player2.is_none());
    assert_eq!(game.status, GameStatus::Waiting);
    assert_eq!(game.current_player, PlayerColor::White);
    assert_eq!(game.position, START_POSITION);
    assert!(game.move_history.is_empty());
    assert_eq!(store.get_game(&game.id).unwrap(), game);
}

#[tokio::test]
async fn test_create_with_opponent_is_active() {
    let store = Arc::new(FailingGameStore::new());
    let alice = seat(&white(), &store).await;

    let game = alice.lobby.create_game(Some(&black())).await.unwrap();

    assert_eq!(game.player2, Some(black()));
    assert_eq!(game.status, GameStatus::Active);
}

#[tokio::test]
async fn test_create_on_chain_uses_contract_id() {
    let provider = MockProvider::metamask().with_account(&white(), LOCAL_CHAIN);
    deploy_contract(&provider);
    let harness = Harness::start(provider, on_chain_guard());
    harness.session.connect().await.unwrap();
    let store = Arc::new(FailingGameStore::new());
    let lobby = GameLobby::new(Arc::new(harness.submitter()), store.clone());

    let game = lobby.create_game(None).await.unwrap();

    assert!(game.id.ends_with("07"));
    assert_eq!(harness.provider.call_count("eth_sendTransaction"), 1);
    assert!(store.get_game(&game.id).is_ok());
}

#[tokio::test]
async fn test_create_survives_storage_failure() {
    let store = Arc::new(FailingGameStore::new());
    store.fail_writes(true);
    let alice = seat(&white(), &store).await;

    let game = alice.lobby.create_game(None).await.unwrap();

    assert_eq!(game.player1, white());
    assert!(matches!(
        alice.lobby.load_game(&game.id),
        Err(GameError::GameNotFound(_))
    ));
}

#[tokio::test]
async fn test_create_requires_connection() {
    let store = Arc::new(FailingGameStore::new());
    let alice = seat(&white(), &store).await;
    alice.harness.session.disconnect().await.unwrap();

    let error = alice.lobby.create_game(None).await.unwrap_err();
    assert!(matches!(error, GameError::Wallet(WalletError::NotConnected)));
}

#[tokio::test]
async fn test_join_takes_the_black_seat() {
    let store = Arc::new(FailingGameStore::new());
    let alice = seat(&white(), &store).await;
    let bob = seat(&black(), &store).await;

    let created = alice.lobby.create_game(None).await.unwrap();
    let joined = bob.lobby.join_game(&created.id).await.unwrap();

    assert_eq!(joined.player2, Some(black()));
    assert_eq!(joined.status, GameStatus::Active);
    assert_eq!(store.get_game(&created.id).unwrap().player2, Some(black()));

    let again = bob.lobby.join_game(&created.id).await.unwrap();
    assert_eq!(again.player2, Some(black()));
}

#[tokio::test]
async fn test_cannot_join_own_game() {
    let store = Arc::new(FailingGameStore::new());
    let alice = seat(&white(), &store).await;
    let created = alice.lobby.create_game(None).await.unwrap();

    let error = alice.lobby.join_game(&created.id).await.unwrap_err();
    assert!(matches!(error, GameError::OwnGame(_)));
}

#[tokio::test]
async fn test_full_game_rejects_third_player() {
    let store = Arc::new(FailingGameStore::new());
    let alice = seat(&white(), &store).await;
    let bob = seat(&black(), &store).await;
    let carol = seat(&address(0xc3), &store).await;

    let created = alice.lobby.create_game(None).await.unwrap();
    bob.lobby.join_game(&created.id).await.unwrap();

    let error = carol.lobby.join_game(&created.id).await.unwrap_err();
    assert!(matches!(error, GameError::GameFull(_)));
    assert_eq!(store.get_game(&created.id).unwrap().player2, Some(black()));
}

#[tokio::test]
async fn test_claimed_seat_reports_full() {
    let store = Arc::new(FailingGameStore::new());
    store.seed(&GameRecord::new("g1", white(), None, 1));
    let carol = seat(&address(0xc3), &store).await;

    let bob_won = store.claim_second_seat("g1", &black(), 2).unwrap();
    assert!(bob_won);

    let error = carol.lobby.join_game("g1").await.unwrap_err();
    assert!(matches!(error, GameError::GameFull(_)));
}

#[tokio::test]
async fn test_join_survives_storage_failure() {
    let store = Arc::new(FailingGameStore::new());
    store.seed(&GameRecord::new("g1", white(), None, 1));
    store.fail_writes(true);
    let bob = seat(&black(), &store).await;

    let joined = bob.lobby.join_game("g1").await.unwrap();

    assert_eq!(joined.player2, Some(black()));
    assert_eq!(joined.status, GameStatus::Active);
    assert!(store.get_game("g1").unwrap().player2.is_none());
}

#[tokio::test]
async fn test_games_for_player_newest_first() {
    let store = Arc::new(FailingGameStore::new());
    store.seed(&GameRecord::new("old", white(), None, 10));
    store.seed(&GameRecord::new("new", black(), Some(white()), 20));
    store.seed(&GameRecord::new("unrelated", black(), None, 30));
    let alice = seat(&white(), &store).await;

    let ids: Vec<String> = alice
        .lobby
        .my_games()
        .unwrap()
        .into_iter()
        .map(|game| game.id)
        .collect();
    assert_eq!(ids, vec!["new".to_string(), "old".to_string()]);
    assert_eq!(alice.lobby.games_for(&address(0x42)).unwrap().len(), 0);
}
