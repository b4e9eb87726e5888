use chainmate::cli::{display_error_and_exit, exit_code, App, Cli, CliResult, Commands};
use chainmate::config::Config;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

async fn run(cli: Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => Config::load_with(Some(path.as_path()), |key| std::env::var(key).ok())?,
        None => Config::load()?,
    };
    debug!("Loaded configuration: {:?}", config);

    let app = App::new(config)?;

    match cli.command {
        Commands::Status => app.handle_status().await,
        Commands::Connect => app.handle_connect().await,
        Commands::Disconnect => app.handle_disconnect().await,
        Commands::Watch => app.handle_watch().await,
        Commands::CreateGame { opponent } => app.handle_create_game(opponent).await,
        Commands::Join { game_id } => app.handle_join(&game_id).await,
        Commands::Show { game_id } => app.handle_show(&game_id).await,
        Commands::Games => app.handle_games().await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chainmate=info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        let code = exit_code(&error);
        display_error_and_exit(error, code);
    }
}
