use tempfile::TempDir;

use chainmate::storage::schema::CURRENT_SCHEMA_VERSION;
use chainmate::storage::{
    Database, GameRecord, GameStatus, GameStore, PlayerColor, StorageError, START_POSITION,
};

use crate::common::test_data::{address, black, white, AFTER_E4};

/// Test helper to create a database in a fresh temporary directory
fn create_test_database() -> (Database, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db = Database::open(&dir.path().join("chainmate.sqlite")).expect("Failed to open database");
    (db, dir)
}

#[test]
fn test_database_initialization() {
    let (db, dir) = create_test_database();

    assert_eq!(db.schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
    assert!(dir.path().join("chainmate.sqlite").exists());
}

#[test]
fn test_insert_and_get_round_trip() {
    let (db, _dir) = create_test_database();
    let game = GameRecord::new("g1", white(), Some(black()), 1_700_000_000_000);

    db.insert_game(&game).unwrap();
    let loaded = db.get_game("g1").unwrap();

    assert_eq!(loaded, game);
    assert_eq!(loaded.position, START_POSITION);
    assert_eq!(loaded.status, GameStatus::Active);
}

#[test]
fn test_duplicate_insert_is_rejected() {
    let (db, _dir) = create_test_database();
    let game = GameRecord::new("g1", white(), None, 1);

    db.insert_game(&game).unwrap();
    assert!(matches!(
        db.insert_game(&game),
        Err(StorageError::DuplicateGame(id)) if id == "g1"
    ));
}

#[test]
fn test_missing_game() {
    let (db, _dir) = create_test_database();
    assert!(matches!(
        db.get_game("nope"),
        Err(StorageError::GameNotFound(id)) if id == "nope"
    ));
    assert!(matches!(
        db.update_game(&GameRecord::new("nope", white(), None, 1)),
        Err(StorageError::GameNotFound(_))
    ));
}

#[test]
fn test_update_persists_moves_and_result() {
    let (db, _dir) = create_test_database();
    let mut game = GameRecord::new("g1", white(), Some(black()), 1);
    db.insert_game(&game).unwrap();

    game.position = AFTER_E4.to_string();
    game.move_history = vec!["e4".to_string()];
    game.current_player = PlayerColor::Black;
    game.status = GameStatus::Finished;
    game.winner = Some(white());
    game.updated_at = 2;
    db.update_game(&game).unwrap();

    let loaded = db.get_game("g1").unwrap();
    assert_eq!(loaded.move_history, vec!["e4".to_string()]);
    assert_eq!(loaded.current_player, PlayerColor::Black);
    assert_eq!(loaded.winner, Some(white()));
    assert_eq!(loaded.created_at, 1);
    assert_eq!(loaded.updated_at, 2);
}

#[test]
fn test_second_seat_compare_and_set() {
    let (db, _dir) = create_test_database();
    db.insert_game(&GameRecord::new("g1", white(), None, 1)).unwrap();

    assert!(db.claim_second_seat("g1", &black(), 5).unwrap());
    assert!(!db.claim_second_seat("g1", &address(0xc3), 6).unwrap());

    let game = db.get_game("g1").unwrap();
    assert_eq!(game.player2, Some(black()));
    assert_eq!(game.status, GameStatus::Active);
    assert_eq!(game.updated_at, 5);
}

#[test]
fn test_games_for_player_matches_either_seat() {
    let (db, _dir) = create_test_database();
    db.insert_game(&GameRecord::new("as_white", white(), None, 10)).unwrap();
    db.insert_game(&GameRecord::new("as_black", black(), Some(white()), 30)).unwrap();
    db.insert_game(&GameRecord::new("other", black(), None, 20)).unwrap();

    let ids: Vec<String> = db
        .games_for_player(&white())
        .unwrap()
        .into_iter()
        .map(|game| game.id)
        .collect();
    assert_eq!(ids, vec!["as_black".to_string(), "as_white".to_string()]);
}

#[test]
fn test_addresses_are_matched_case_insensitively() {
    let (db, _dir) = create_test_database();
    let mixed = chainmate::wallet::types::Address::parse("0xABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap();
    db.insert_game(&GameRecord::new("g1", mixed, None, 1)).unwrap();

    let lower = chainmate::wallet::types::Address::parse("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
    assert_eq!(db.games_for_player(&lower).unwrap().len(), 1);
}

#[test]
fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("chainmate.sqlite");

    {
        let db = Database::open(&path).unwrap();
        db.insert_game(&GameRecord::new("g1", white(), None, 1)).unwrap();
    }

    let db = Database::open(&path).unwrap();
    assert_eq!(db.get_game("g1").unwrap().player1, white());
    assert_eq!(db.schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
}

fn after_e4(mut game: GameRecord) -> GameRecord {
    game.position = AFTER_E4.to_string();
    game.move_history.push("e4".to_string());
    game.current_player = PlayerColor::Black;
    game.updated_at = 3;
    game
}

#[test]
fn test_record_move_leaves_seats_alone() {
    let (db, _dir) = create_test_database();
    let open = GameRecord::new("g1", white(), None, 1);
    db.insert_game(&open).unwrap();
    assert!(db.claim_second_seat("g1", &black(), 2).unwrap());

    let stored = db.record_move(&after_e4(open), 0).unwrap();

    assert_eq!(stored.player2, Some(black()));
    assert_eq!(stored.status, GameStatus::Active);
    assert_eq!(stored.move_history, vec!["e4".to_string()]);
    assert_eq!(stored.current_player, PlayerColor::Black);
    assert_eq!(stored.updated_at, 3);
    assert_eq!(db.get_game("g1").unwrap(), stored);
}

#[test]
fn test_record_move_rejects_stale_history() {
    let (db, _dir) = create_test_database();
    let game = GameRecord::new("g1", white(), Some(black()), 1);
    db.insert_game(&game).unwrap();
    db.record_move(&after_e4(game.clone()), 0).unwrap();

    let mut other = game;
    other.move_history.push("d4".to_string());
    assert!(matches!(
        db.record_move(&other, 0),
        Err(StorageError::MoveConflict { expected: 0, .. })
    ));
    assert_eq!(db.get_game("g1").unwrap().move_history, vec!["e4".to_string()]);
}

#[test]
fn test_record_move_finishes_game() {
    let (db, _dir) = create_test_database();
    let game = GameRecord::new("g1", white(), Some(black()), 1);
    db.insert_game(&game).unwrap();

    let mut finished = after_e4(game);
    finished.status = GameStatus::Finished;
    finished.winner = Some(white());
    let stored = db.record_move(&finished, 0).unwrap();

    assert_eq!(stored.status, GameStatus::Finished);
    assert_eq!(stored.winner, Some(white()));
    assert!(matches!(
        db.record_move(&GameRecord::new("nope", white(), None, 1), 0),
        Err(StorageError::GameNotFound(_))
    ));
}
