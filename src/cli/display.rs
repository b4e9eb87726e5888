use crate::config::Config;
use crate::session::{SessionSnapshot, SessionStatus};
use crate::storage::models::{current_timestamp, GameRecord, GameStatus, PlayerColor};
use crate::wallet::types::{Address, WalletState};

/// Shorten long ids for table columns.
pub fn short_id(id: &str) -> String {
    if id.chars().count() > 14 {
        let head: String = id.chars().take(14).collect();
        format!("{}...", head)
    } else {
        id.to_string()
    }
}

pub fn display_config(config: &Config, hint: Option<&WalletState>) {
    println!("{}", "=".repeat(60));
    println!("{:^60}", "CHAINMATE STATUS");
    println!("{}", "=".repeat(60));
    println!("Wallet:          {}", config.wallet_kind);
    println!("RPC endpoint:    {}", config.rpc_url);
    println!(
        "Expected chain:  {}",
        match (&config.chain.network_name, &config.chain.expected_chain_id) {
            (Some(name), Some(id)) => format!("{} ({})", name, id),
            (None, Some(id)) => id.clone(),
            _ => "any".to_string(),
        }
    );
    println!(
        "Game contract:   {}",
        config
            .chain
            .contract_address
            .as_deref()
            .unwrap_or("none (offline mode)")
    );
    println!("Database:        {}", config.database_path().display());
    println!("Session restore: {:?}", config.session.restore);
    println!("{}", "-".repeat(60));
    match hint {
        Some(wallet) => println!(
            "Last session:    {} on chain {}",
            wallet.address, wallet.chain_id
        ),
        None => println!("Last session:    none"),
    }
}

pub fn display_snapshot(snapshot: &SessionSnapshot) {
    let status = match snapshot.status {
        SessionStatus::Disconnected => "disconnected",
        SessionStatus::Connecting => "connecting",
        SessionStatus::Connected => "connected",
    };
    match &snapshot.wallet {
        Some(wallet) if snapshot.is_connected() => println!(
            "[{}] {} {} on chain {}",
            snapshot.version, status, wallet.address, wallet.chain_id
        ),
        _ => println!("[{}] {}", snapshot.version, status),
    }
}

pub fn display_game(game: &GameRecord, viewer: Option<&Address>) {
    println!("{}", "=".repeat(60));
    println!("{:^60}", format!("GAME {}", short_id(&game.id)));
    println!("{}", "=".repeat(60));
    println!("White:    {}", game.player1);
    println!(
        "Black:    {}",
        game.player2
            .as_ref()
            .map(Address::to_string)
            .unwrap_or_else(|| "(open seat)".to_string())
    );
    println!("Status:   {}", game.status);
    println!("Position: {}", game.position);
    println!("{}", "-".repeat(60));

    if game.move_history.is_empty() {
        println!("No moves played yet.");
    } else {
        for (number, pair) in game.move_history.chunks(2).enumerate() {
            match pair {
                [white, black] => println!("{:>3}. {:<8} {}", number + 1, white, black),
                [white] => println!("{:>3}. {}", number + 1, white),
                _ => {}
            }
        }
    }
    println!("{}", "-".repeat(60));

    match game.status {
        GameStatus::Finished => match &game.winner {
            Some(winner) => println!("Winner: {}", winner),
            None => println!("Drawn."),
        },
        GameStatus::Waiting => println!("Waiting for an opponent to join."),
        GameStatus::Active => {
            let to_move = game.current_player;
            let yours = viewer.and_then(|address| game.color_of(address)) == Some(to_move);
            if yours {
                println!("It's your move ({}).", to_move);
            } else {
                println!("{} to move.", capitalize(to_move));
            }
        }
    }
}

pub fn display_games_list(games: &[GameRecord], viewer: &Address) {
    println!("{}", "=".repeat(80));
    println!("{:^80}", "CHESS GAMES");
    println!("{}", "=".repeat(80));
    println!(
        "{:<18} {:<16} {:<6} {:<9} {:<6} {:<12}",
        "GAME ID", "OPPONENT", "COLOR", "STATUS", "MOVES", "UPDATED"
    );
    println!("{}", "-".repeat(80));

    for game in games {
        let color = game.color_of(viewer);
        let opponent = match color {
            Some(PlayerColor::White) => game.player2.as_ref().map(Address::short),
            Some(PlayerColor::Black) => Some(game.player1.short()),
            None => None,
        }
        .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<18} {:<16} {:<6} {:<9} {:<6} {:<12}",
            short_id(&game.id),
            opponent,
            color.map(|c| c.as_str()).unwrap_or("-"),
            game.status.as_str(),
            game.move_history.len(),
            format_timestamp(game.updated_at)
        );
    }

    println!("{}", "-".repeat(80));
    println!("Total games: {}", games.len());
}

/// Relative age of a millisecond timestamp.
pub fn format_timestamp(millis: i64) -> String {
    let elapsed = (current_timestamp() - millis).max(0) / 1000;
    if elapsed < 60 {
        "Just now".to_string()
    } else if elapsed < 3600 {
        format!("{}m ago", elapsed / 60)
    } else if elapsed < 86400 {
        format!("{}h ago", elapsed / 3600)
    } else {
        format!("{}d ago", elapsed / 86400)
    }
}

fn capitalize(color: PlayerColor) -> &'static str {
    match color {
        PlayerColor::White => "White",
        PlayerColor::Black => "Black",
    }
}
