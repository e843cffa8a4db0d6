use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dodo", version, about = "Dodo habit and task tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Habit management, completions and timers
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Task categories
    Category {
        #[command(subcommand)]
        action: commands::category::CategoryAction,
    },
    /// Show level and XP
    Profile,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Habit { action } => commands::habit::run(action),
        Commands::Task { action } => commands::task::run(action),
        Commands::Category { action } => commands::category::run(action),
        Commands::Profile => commands::profile::run(),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
