use crate::cli::display;
use crate::cli::error_handler::{create_input_validation_error, CliResult};
use crate::config::Config;
use crate::game::GameLobby;
use crate::session::WalletSession;
use crate::storage::{Database, GameStore, SessionStore};
use crate::transactions::{TransactionSubmitter, TransportCache};
use crate::wallet::locator::{ProviderLocator, StaticInjection};
use crate::wallet::provider::WalletProvider;
use crate::wallet::types::{Address, WalletState};
use crate::wallet::HttpRpcProvider;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Main application state
pub struct App {
    /// Application configuration
    pub config: Config,
    provider: Arc<HttpRpcProvider>,
    session: WalletSession,
    lobby: GameLobby,
}

impl App {
    /// Wire storage, provider, session and lobby from `config`. Spawns the
    /// session actor, so it must run inside a Tokio runtime.
    pub fn new(config: Config) -> Result<Self> {
        Self::ensure_data_dir(&config.data_dir).context("Failed to create data directory")?;

        let database = Arc::new(
            Database::open(&config.database_path()).context("Failed to initialize database")?,
        );
        let guard = config.network_guard()?;

        let provider = Arc::new(HttpRpcProvider::new(
            config.rpc_url.clone(),
            config.wallet_kind,
        ));
        let injected: Arc<dyn WalletProvider> = provider.clone();
        let locator = Arc::new(ProviderLocator::new(
            Arc::new(StaticInjection::single(injected)),
            config.wallet_kind,
        ));

        let cache = Arc::new(TransportCache::new());
        let session_store: Arc<dyn SessionStore> = database.clone();
        let session = WalletSession::start(
            locator,
            guard.clone(),
            session_store,
            cache.clone(),
            config.session.restore,
        );

        let submitter = Arc::new(TransactionSubmitter::new(
            session.clone(),
            guard,
            cache,
            config.retry,
            config.receipts,
        ));
        let game_store: Arc<dyn GameStore> = database;
        let lobby = GameLobby::new(submitter, game_store);

        Ok(App {
            config,
            provider,
            session,
            lobby,
        })
    }

    /// Ensure data directory exists with proper permissions
    pub fn ensure_data_dir(data_dir: &Path) -> Result<()> {
        if !data_dir.exists() {
            std::fs::create_dir_all(data_dir).with_context(|| {
                format!("Failed to create data directory: {}", data_dir.display())
            })?;
        }

        let test_file = data_dir.join(".write_test");
        std::fs::write(&test_file, "test")
            .with_context(|| format!("Data directory is not writable: {}", data_dir.display()))?;
        std::fs::remove_file(&test_file).context("Failed to clean up write test file")?;

        Ok(())
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    /// Connect in-process and print any advisory warnings.
    async fn connect(&self) -> CliResult<WalletState> {
        let report = self.session.connect().await?;
        for warning in &report.warnings {
            println!("⚠️  {}", warning);
        }
        Ok(report.wallet)
    }

    /// Handle the 'status' command
    pub async fn handle_status(&self) -> CliResult<()> {
        display::display_config(&self.config, self.session.restored_hint());
        Ok(())
    }

    /// Handle the 'connect' command
    pub async fn handle_connect(&self) -> CliResult<()> {
        let wallet = self.connect().await?;
        println!("✅ Connected {} on chain {}", wallet.address, wallet.chain_id);
        if self.config.chain.contract_address.is_none() {
            println!("No game contract configured; games will be created offline.");
        }
        Ok(())
    }

    /// Handle the 'disconnect' command
    pub async fn handle_disconnect(&self) -> CliResult<()> {
        self.session.disconnect().await?;
        println!("Disconnected. The stored session was cleared.");
        Ok(())
    }

    /// Handle the 'watch' command
    pub async fn handle_watch(&self) -> CliResult<()> {
        self.connect().await?;
        let mut subscription = self.session.subscribe().await?;
        let watcher = self.provider.watch_changes(self.config.watch_interval());
        info!("Watching {} for wallet changes", self.config.rpc_url);
        println!("Watching for wallet changes. Press Ctrl-C to stop.");

        loop {
            tokio::select! {
                snapshot = subscription.next() => match snapshot {
                    Some(snapshot) => display::display_snapshot(&snapshot),
                    None => break,
                },
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        warn!("Failed to listen for Ctrl-C: {}", e);
                    }
                    break;
                }
            }
        }

        watcher.abort();
        subscription.unsubscribe();
        Ok(())
    }

    /// Handle the 'create-game' command
    pub async fn handle_create_game(&self, opponent: Option<String>) -> CliResult<()> {
        let opponent = match opponent {
            Some(raw) => Some(
                Address::parse(&raw)
                    .map_err(|e| create_input_validation_error("opponent", &raw, &e.to_string()))?,
            ),
            None => None,
        };

        self.connect().await?;
        let game = self.lobby.create_game(opponent.as_ref()).await?;
        println!("✅ Created game {}", game.id);
        if game.player2.is_none() {
            println!("Share the id; your opponent joins with 'chainmate join {}'.", game.id);
        }
        Ok(())
    }

    /// Handle the 'join' command
    pub async fn handle_join(&self, game_id: &str) -> CliResult<()> {
        let wallet = self.connect().await?;
        let game = self.lobby.join_game(game_id).await?;
        println!("✅ Joined game {} as black", game.id);
        display::display_game(&game, Some(&wallet.address));
        Ok(())
    }

    /// Handle the 'show' command
    pub async fn handle_show(&self, game_id: &str) -> CliResult<()> {
        let game = self.lobby.load_game(game_id)?;
        let viewer = self.session.wallet().map(|wallet| wallet.address);
        display::display_game(&game, viewer.as_ref());
        Ok(())
    }

    /// Handle the 'games' command
    pub async fn handle_games(&self) -> CliResult<()> {
        let wallet = self.connect().await?;
        let games = self.lobby.games_for(&wallet.address)?;

        if games.is_empty() {
            println!("No games found.");
            println!("Use 'chainmate create-game' to start a new game.");
            return Ok(());
        }

        display::display_games_list(&games, &wallet.address);
        println!();
        println!("Use 'chainmate show <id>' to view a specific game.");
        Ok(())
    }
}
