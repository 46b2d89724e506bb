use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;

#[derive(Parser)]
#[command(name = "dopamine-cli", version, about = "Dopamine CLI")]
pub struct Cli {
    /// User id to act as (defaults to `session.user_id` from the config)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the activity catalog
    Catalog {
        #[command(subcommand)]
        action: commands::catalog::CatalogAction,
    },
    /// Cart management
    Cart {
        #[command(subcommand)]
        action: commands::cart::CartAction,
    },
    /// Checkout and order completion
    Order {
        #[command(subcommand)]
        action: commands::order::OrderAction,
    },
    /// Completion statistics and streaks
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// User profile
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// User-authored activities
    Activity {
        #[command(subcommand)]
        action: commands::activity::ActivityAction,
    },
    /// Live countdown
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("DOPAMINE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let user = cli.user;
    let result = match cli.command {
        Commands::Catalog { action } => commands::catalog::run(action, user),
        Commands::Cart { action } => commands::cart::run(action, user),
        Commands::Order { action } => commands::order::run(action, user),
        Commands::Stats { action } => commands::stats::run(action, user),
        Commands::Profile { action } => commands::profile::run(action, user),
        Commands::Activity { action } => commands::activity::run(action, user),
        Commands::Timer { action } => commands::timer::run(action, user).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "dopamine-cli", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
