use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use spotbar::{app::App, cli, config, error};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with Spotify API
    Auth,

    /// Remove stored credentials
    Logout,

    /// Show stored credential status
    Status,

    /// Show what is playing right now
    Now,

    /// Toggle play/pause on the active device
    PlayPause,

    /// Skip to the next track
    Next,

    /// Go back to the previous track
    Prev,

    /// Save or unsave the current track
    Like,

    /// Follow playback continuously and control it from stdin
    Watch,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Command::Completions(opt) = &cli.command {
        let mut cmd = Cli::command_for_update();
        let name = cmd.get_name().to_string();
        generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
        return;
    }

    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }
    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => error!("{}", e),
    };
    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => error!("{}", e),
    };

    match cli.command {
        Command::Auth => cli::auth(&app).await,
        Command::Logout => cli::logout(&app).await,
        Command::Status => cli::status(&app).await,
        Command::Now => cli::now(&app).await,
        Command::PlayPause => cli::play_pause(&app).await,
        Command::Next => cli::next(&app).await,
        Command::Prev => cli::prev(&app).await,
        Command::Like => cli::like(&app).await,
        Command::Watch => cli::watch(&app).await,
        Command::Completions(_) => {}
    }
}
