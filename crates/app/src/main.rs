//! Jeetspace admin - operator tooling for voice rooms
//!
//! Opens the room database, wires the media provider and runs one
//! maintenance command.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

mod commands;
mod state;

use commands::Format;
use state::AppState;

#[derive(Parser, Debug)]
#[command(name = "jeetspace-admin")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long, env = "JEETSPACE_CONFIG")]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List public rooms, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Show a room with its live roster
    Show { room: Uuid },
    /// Show a room's recent history
    History {
        room: Uuid,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Stop new joins
    Close {
        room: Uuid,
        /// Act as this wallet instead of the configured admin
        #[arg(long = "as")]
        wallet: Option<String>,
    },
    /// Allow joins again
    Open {
        room: Uuid,
        #[arg(long = "as")]
        wallet: Option<String>,
    },
    /// Delete a room and its members, bans and history
    Delete {
        room: Uuid,
        #[arg(long = "as")]
        wallet: Option<String>,
    },
    /// Find durable users by username prefix
    Users {
        prefix: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Delete expired login sessions
    PruneSessions,
    /// Delete every room matching each name (admin only)
    DeleteByName {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Eject a live provider session from a room
    Eject {
        room: Uuid,
        session: String,
        #[arg(long = "as")]
        wallet: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<bool> {
    let state = AppState::new(args.config.as_deref())?;
    tracing::debug!(path = %state.db_path.display(), "Using database");

    let format = if args.json { Format::Json } else { Format::Text };
    let mut out = io::stdout().lock();

    match args.command {
        Command::List { limit, offset } => commands::list(&state, &mut out, format, limit, offset)?,
        Command::Show { room } => commands::show(&state, &mut out, format, room)?,
        Command::History { room, limit } => {
            commands::history(&state, &mut out, format, room, limit)?
        }
        Command::Users { prefix, limit } => {
            commands::users(&state, &mut out, format, &prefix, limit)?
        }
        Command::PruneSessions => commands::prune_sessions(&state, &mut out)?,
        Command::Close { room, wallet } => {
            commands::set_closed(&state, &mut out, room, wallet.as_deref(), true)?
        }
        Command::Open { room, wallet } => {
            commands::set_closed(&state, &mut out, room, wallet.as_deref(), false)?
        }
        Command::Delete { room, wallet } => {
            commands::delete(&state, &mut out, room, wallet.as_deref())?
        }
        Command::DeleteByName { names } => {
            return commands::delete_by_names(&state, &mut out, &names);
        }
        Command::Eject {
            room,
            session,
            wallet,
        } => commands::eject(&state, &mut out, room, &session, wallet.as_deref()).await?,
    }
    Ok(true)
}
