use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use worldping_core::CoreError;

mod commands;

#[derive(Parser)]
#[command(name = "worldping", version, about = "WorldPing device CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Device identity
    Device {
        #[command(subcommand)]
        action: commands::device::DeviceAction,
    },
    /// Record a post for streak tracking
    Post(commands::post::PostArgs),
    /// Streak state
    Streak {
        #[command(subcommand)]
        action: commands::streak::StreakAction,
    },
    /// List earned achievements
    Achievements,
    /// Render the gate-applied feed
    Feed(commands::feed::FeedArgs),
    /// Unlock random messages from the feed
    Unlock(commands::feed::UnlockArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("WORLDPING_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Device { action } => commands::device::run(action),
        Commands::Post(args) => commands::post::run(args),
        Commands::Streak { action } => commands::streak::run(action),
        Commands::Achievements => commands::streak::achievements(),
        Commands::Feed(args) => commands::feed::run_feed(args),
        Commands::Unlock(args) => commands::feed::run_unlock(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        let unsaved = e
            .downcast_ref::<CoreError>()
            .is_some_and(CoreError::is_persistence_failure);
        if unsaved {
            eprintln!("error: your progress could not be saved this time ({e})");
        } else {
            eprintln!("error: {e}");
        }
        std::process::exit(1);
    }
}
