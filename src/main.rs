//! Binary entry point that glues the SQLite-backed domain model to the TUI.
//! Summarizing the bootstrapping pipeline here keeps the intent obvious when
//! revisiting the code: we set up file logging, bring up the database, hydrate
//! the initial app state, and drive the Ratatui event loop until the user
//! exits. The `view` subcommand instead opens somebody else's pamphlet
//! read-only through their share reference.
use std::fs::{self, OpenOptions};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use song_pamphlet_manager::{
    data_dir, ensure_schema, fetch_creators, fetch_pamphlets, fetch_songs, load_identity,
    pamphlet_exists, resolve_reference, run_app, App,
};

const LOG_FILE_NAME: &str = "manager.log";

#[derive(Parser, Debug)]
struct CliArgs {
    #[clap(subcommand)]
    command: Option<ManagerCommand>,
}

#[derive(Subcommand, Debug)]
enum ManagerCommand {
    /// Open a shared pamphlet read-only using its owner's reference.
    View {
        /// Share reference handed out by the pamphlet's owner.
        reference: String,
        /// Name of the pamphlet to open.
        pamphlet: String,
    },
}

/// Initialize persistence, load cached data, and launch the Ratatui event
/// loop.
///
/// Returning a `Result` bubbles up fatal initialization problems (for example
/// the user removing the writable data directory) to the terminal instead of
/// crashing silently.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging()?;

    let conn = ensure_schema()?;

    match args.command {
        Some(ManagerCommand::View {
            reference,
            pamphlet,
        }) => run_shared_view(conn, &reference, &pamphlet),
        None => run_manager(conn),
    }
}

/// Normal management mode. Without a stored identity the app starts on the
/// welcome screen and creates one when the user confirms.
fn run_manager(conn: Connection) -> Result<()> {
    let identity = load_identity()?;

    let (pamphlets, creators) = match &identity {
        Some(identity) => (
            fetch_pamphlets(&conn, &identity.user_id)?,
            fetch_creators(&conn, &identity.user_id)?,
        ),
        None => (Vec::new(), Vec::new()),
    };

    let mut app = App::new(conn, identity, pamphlets, creators);
    run_app(&mut app)
}

/// Read-only viewing mode for a pamphlet shared by reference. The reference
/// resolves to its owner first so a stale or mistyped token fails with a clear
/// message instead of an empty carousel.
fn run_shared_view(conn: Connection, reference: &str, pamphlet: &str) -> Result<()> {
    let owner = match resolve_reference(&conn, reference)? {
        Some(owner) => owner,
        None => bail!("No pamphlet owner matches reference '{reference}'."),
    };

    if !pamphlet_exists(&conn, &owner, pamphlet)? {
        bail!("The owner of reference '{reference}' has no pamphlet named '{pamphlet}'.");
    }

    let songs = fetch_songs(&conn, &owner, pamphlet)?;
    info!(pamphlet, songs = songs.len(), "opening shared pamphlet");

    let mut app = App::shared(conn, pamphlet.to_string(), songs);
    run_app(&mut app)
}

/// Route logs to a file under the data directory. The TUI owns stdout, so the
/// usual console writer would scribble over the interface.
fn init_logging() -> Result<()> {
    let dir = data_dir()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create data directory at {}", dir.display()))?;

    let log_path = dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file at {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false),
        )
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("failed to initialize logging")?;

    Ok(())
}
