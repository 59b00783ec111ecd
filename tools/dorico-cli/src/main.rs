//! Dorico CLI: drive a running Dorico from the terminal.
//!
//! ## Usage
//!
//! ```bash
//! # Show the Dorico version (Dorico asks once to allow the client)
//! dorico info
//!
//! # Reuse the session token printed by an earlier run
//! dorico --session-token 1a2b3c flows
//!
//! # Run a command with parameters
//! dorico command Edit.Transpose Interval=2 Direction=kUp
//!
//! # Print pushed events until Ctrl-C
//! DORICO_LOG=debug dorico watch
//! ```

mod actions;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dorico_remote::{CommsConfig, ConnectionArgs, DoricoRemote};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "DORICO_LOG";

/// Dorico remote-control client
#[derive(Parser, Debug)]
#[command(name = "dorico")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebSocket address of Dorico
    #[arg(long, env = "DORICO_ADDRESS", default_value = "ws://127.0.0.1:4560")]
    address: String,

    /// Name Dorico shows when asking to allow the connection
    #[arg(long, default_value = "Dorico CLI")]
    client_name: String,

    /// Token from an earlier session
    #[arg(long, env = "DORICO_SESSION_TOKEN")]
    session_token: Option<String>,

    /// Reply timeout in milliseconds (0 waits forever)
    #[arg(long, default_value = "30000")]
    timeout_ms: u64,

    /// Log filter used when DORICO_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Print Dorico's variant and version
    Info,
    /// List available commands
    Commands {
        /// Only show commands whose name contains this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// List flows in the active score
    Flows,
    /// List layouts in the active score
    Layouts,
    /// Print the current status
    Status,
    /// Print pushed events until Ctrl-C
    Watch,
    /// Run a command, e.g. `command NoteInput.Pitch Pitch=C OctaveValue=4`
    Command {
        name: String,
        /// Parameters as Name=Value
        parameters: Vec<String>,
    },
    /// Print pitch data for a MIDI number or a note name such as `F#4`
    Note {
        note: String,
        /// Spell black keys with flats
        #[arg(long)]
        flats: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    if let Action::Note { note, flats } = &args.action {
        return actions::print_note(note, *flats);
    }

    let config = CommsConfig {
        address: args.address.clone(),
        request_timeout_ms: (args.timeout_ms > 0).then_some(args.timeout_ms),
        ..CommsConfig::default()
    };
    let mut connection = config.connection_args();
    connection.session_token = args.session_token.clone();

    let remote = DoricoRemote::new(config).context("invalid configuration")?;
    connect(&remote, &args.client_name, &connection).await?;

    let result = match args.action {
        Action::Info => actions::info(&remote).await,
        Action::Commands { filter } => actions::commands(&remote, filter.as_deref()).await,
        Action::Flows => actions::flows(&remote).await,
        Action::Layouts => actions::layouts(&remote).await,
        Action::Status => actions::status(&remote).await,
        Action::Watch => actions::watch(&remote).await,
        Action::Command { name, parameters } => {
            actions::command(&remote, &name, &parameters).await
        }
        Action::Note { .. } => Ok(()),
    };

    if remote.is_connected() {
        remote.disconnect().await.context("disconnect failed")?;
    }
    result
}

async fn connect(remote: &DoricoRemote, client_name: &str, args: &ConnectionArgs) -> Result<()> {
    remote
        .connect(client_name, args)
        .await
        .with_context(|| format!("could not connect to Dorico at {}", args.address))?;

    if args.session_token.is_none() {
        if let Some(token) = remote.session_token() {
            eprintln!("session token: {token} (pass --session-token to skip the prompt)");
        }
    }
    info!(timeout = ?remote.timeout().map(|d| d.as_millis()), "Connected");
    Ok(())
}

fn init_tracing(fallback: &str) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(fallback))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install logger: {e}"))
}
