//! playtime: command-line client for the playtime daemon.
//!
//! Stands in for the chat gateway when driving the daemon by hand or from
//! scripts: it sends presence snapshots and chat commands over the daemon
//! socket and prints the rendered replies.
//!
//! ## Subcommands
//!
//! - `presence`: Send a user's full presence snapshot
//! - `command`: Send raw chat message text
//! - `report` / `reset`: Shorthand for `!mygames` / `!cleargames`
//! - `health`, `shutdown`: Daemon lifecycle

mod commands;
mod daemon_client;
mod logging;

use clap::{Parser, Subcommand};
use playtime_daemon_protocol::{Activity, Verb};
use std::process::ExitCode;

use commands::PresenceArgs;
use daemon_client::DaemonClient;

#[derive(Parser)]
#[command(name = "playtime")]
#[command(about = "Game play-time tracker client")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a presence snapshot (omit activities to mark the user idle)
    Presence {
        #[arg(value_name = "USER_ID")]
        user_id: String,

        /// Game currently being played (repeatable)
        #[arg(long = "game", value_name = "NAME")]
        games: Vec<String>,

        /// Non-default activity as KIND:NAME, e.g. listening:Spotify (repeatable)
        #[arg(long = "activity", value_name = "KIND:NAME", value_parser = commands::parse_activity)]
        activities: Vec<Activity>,

        /// Mark the author as a bot; the daemon ignores bot presence
        #[arg(long)]
        bot: bool,

        #[arg(long)]
        username: Option<String>,
    },

    /// Send chat message text as a command
    Command {
        #[arg(value_name = "USER_ID")]
        user_id: String,

        #[arg(value_name = "TEXT")]
        text: String,

        #[arg(long)]
        display_name: Option<String>,
    },

    /// Show a user's play-time totals
    Report {
        #[arg(value_name = "USER_ID")]
        user_id: String,

        #[arg(long)]
        display_name: Option<String>,
    },

    /// Clear a user's history
    Reset {
        #[arg(value_name = "USER_ID")]
        user_id: String,

        #[arg(long)]
        display_name: Option<String>,
    },

    /// Daemon health and ledger stats
    Health,

    /// Save and stop the daemon
    Shutdown,
}

fn main() -> ExitCode {
    // Held until `main` returns so buffered log lines are flushed.
    let _logging_guard = logging::init();
    let cli = Cli::parse();
    finish(run(cli))
}

fn run(cli: Cli) -> Result<Option<String>, String> {
    let client = DaemonClient::from_env()?;
    tracing::debug!(socket = %client.socket().display(), "Using daemon socket");

    match cli.command {
        Commands::Presence {
            user_id,
            games,
            activities,
            bot,
            username,
        } => commands::presence(
            &client,
            PresenceArgs {
                user_id,
                username,
                bot,
                games,
                activities,
            },
        ),
        Commands::Command {
            user_id,
            text,
            display_name,
        } => commands::command(&client, user_id, text, display_name),
        Commands::Report {
            user_id,
            display_name,
        } => commands::verb(&client, user_id, Verb::Report, display_name),
        Commands::Reset {
            user_id,
            display_name,
        } => commands::verb(&client, user_id, Verb::Reset, display_name),
        Commands::Health => commands::health(&client),
        Commands::Shutdown => commands::shutdown(&client),
    }
}

fn finish(result: Result<Option<String>, String>) -> ExitCode {
    match result {
        Ok(Some(output)) => {
            println!("{}", output.trim_end());
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "playtime command failed");
            eprintln!("playtime: {}", err);
            ExitCode::FAILURE
        }
    }
}
