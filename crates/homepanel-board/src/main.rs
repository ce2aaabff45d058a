//! HomePanel board client: entry point.
//!
//! A command-line front end for the device/room board of the smart-home
//! panel.  It talks to the same REST + realtime backend as the browser panel.
//!
//! # Usage
//!
//! ```text
//! homepanel-board [OPTIONS] <COMMAND>
//!
//! Commands:
//!   show                        Print the board
//!   apply <PLAN>                Replay a plan of drops as one edit session and save it
//!   watch                       Follow realtime events and print the board on change
//!   create-room <NAME>          Create a room
//!   rename-room <ROOM> <NAME>   Rename a room (needs --confirm)
//!   delete-room <ROOM>          Delete a room (needs --confirm)
//!   config                      Print the effective configuration
//!
//! Options:
//!   --config <PATH>        Config file [default: platform config dir]
//!   --base-url <URL>       Backend root URL            [env: HOMEPANEL_BASE_URL]
//!   --realtime-url <URL>   Realtime WebSocket URL      [env: HOMEPANEL_REALTIME_URL]
//!   --csrf-token <TOKEN>   Fixed CSRF token            [env: HOMEPANEL_CSRF_TOKEN]
//! ```
//!
//! Flags override the config file; `RUST_LOG` overrides the configured log
//! level.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use homepanel_board::application::{
    fetch_board, AdminOutcome, DragEffect, EditPlan, EditSessionManager, PanelApi, RoomAdmin,
    SaveOutcome,
};
use homepanel_board::domain::{CsrfSource, PanelConfig};
use homepanel_board::infrastructure::{config_file, csrf, http_api::HttpPanelApi, realtime};
use homepanel_core::{Board, ColumnKey, UNASSIGNED_LABEL};

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "homepanel-board",
    about = "Headless HomePanel board client",
    version
)]
struct Cli {
    /// Config file to read instead of the platform default.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Root URL of the REST backend.
    #[arg(long, global = true, env = "HOMEPANEL_BASE_URL")]
    base_url: Option<String>,

    /// URL of the realtime WebSocket.
    #[arg(long, global = true, env = "HOMEPANEL_REALTIME_URL")]
    realtime_url: Option<String>,

    /// Fixed CSRF token; replaces the configured token source.
    #[arg(long, global = true, env = "HOMEPANEL_CSRF_TOKEN", hide_env_values = true)]
    csrf_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print rooms and devices in board order.
    Show,
    /// Replay a TOML plan of drops as one edit session and save it.
    Apply {
        plan: PathBuf,
    },
    /// Follow realtime events and print the board whenever it changes.
    Watch,
    /// Create a room.
    CreateRoom { name: String },
    /// Rename a room (identifier or name).  Without --confirm the action is
    /// only armed.
    RenameRoom {
        room: String,
        name: String,
        #[arg(long)]
        confirm: bool,
    },
    /// Delete a room (identifier or name); its devices become unassigned.
    /// Without --confirm the action is only armed.
    DeleteRoom {
        room: String,
        #[arg(long)]
        confirm: bool,
    },
    /// Print the effective configuration.
    Config {
        /// Also write it to the config file.
        #[arg(long)]
        write: bool,
    },
}

impl Cli {
    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => config_file::config_file_path().context("locating config file"),
        }
    }

    /// File values with flag overrides applied.
    fn panel_config(&self) -> anyhow::Result<PanelConfig> {
        let path = self.config_path()?;
        let mut config = config_file::load_config(&path)
            .with_context(|| format!("loading {}", path.display()))?;
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(url) = &self.realtime_url {
            config.realtime_url = url.clone();
        }
        if let Some(token) = &self.csrf_token {
            config.csrf = CsrfSource::Static {
                token: token.clone(),
            };
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.panel_config()?;

    // Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    if let Command::Config { write } = &cli.command {
        let path = cli.config_path()?;
        if *write {
            config_file::save_config(&path, &config)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "config written");
        }
        println!("# {}", path.display());
        println!("{config:#?}");
        return Ok(());
    }

    let client = reqwest::Client::new();
    let token = csrf::resolve(&config, &client)
        .await
        .context("resolving CSRF token")?;
    let api: Arc<dyn PanelApi> = Arc::new(HttpPanelApi::new(client, &config, token));

    let board = fetch_board(api.as_ref())
        .await
        .with_context(|| format!("loading board from {}", config.base_url))?;
    let sessions = Arc::new(EditSessionManager::with_board(Arc::clone(&api), board));

    match cli.command {
        Command::Show => print_board(&sessions.board()),
        Command::Apply { plan } => apply_plan(&sessions, &plan).await?,
        Command::Watch => watch(&sessions, &config.realtime_url).await?,
        Command::CreateRoom { name } => {
            let admin = RoomAdmin::new(api, sessions, config.confirm_window);
            admin.create_room(&name).await.context("creating room")?;
            println!("Room {name:?} created");
        }
        Command::RenameRoom {
            room,
            name,
            confirm,
        } => {
            let column = column_for(&sessions.board(), &room)?;
            let admin = RoomAdmin::new(api, sessions, config.confirm_window);
            let now = Instant::now();
            let mut outcome = admin.request_rename(&column, &name, now).await?;
            if confirm && matches!(outcome, AdminOutcome::Armed { .. }) {
                outcome = admin.request_rename(&column, &name, Instant::now()).await?;
            }
            report_admin(outcome, &format!("Room {room:?} renamed to {name:?}"));
        }
        Command::DeleteRoom { room, confirm } => {
            let column = column_for(&sessions.board(), &room)?;
            let admin = RoomAdmin::new(api, sessions, config.confirm_window);
            let now = Instant::now();
            let mut outcome = admin.request_delete(&column, now).await?;
            if confirm && matches!(outcome, AdminOutcome::Armed { .. }) {
                outcome = admin.request_delete(&column, Instant::now()).await?;
            }
            report_admin(outcome, &format!("Room {room:?} deleted"));
        }
        Command::Config { .. } => {}
    }
    Ok(())
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn apply_plan(sessions: &EditSessionManager, path: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading plan {}", path.display()))?;
    let plan = EditPlan::from_toml(&text)
        .with_context(|| format!("parsing plan {}", path.display()))?;
    if plan.is_empty() {
        println!("Plan is empty; nothing to do");
        return Ok(());
    }

    let session = sessions.enter_edit_mode()?;
    info!(session = %session, "applying plan {}", path.display());
    for event in plan.events(&sessions.board()) {
        match sessions.handle_drag(event.clone()) {
            Ok(DragEffect::DeviceMoved(mv)) => println!(
                "  move {} -> {} #{}",
                mv.device_id,
                mv.room.as_ref().map_or(UNASSIGNED_LABEL, |r| r.name.as_str()),
                mv.position
            ),
            Ok(DragEffect::ColumnsReordered(order)) => println!(
                "  rooms -> {}",
                order
                    .iter()
                    .map(|e| e.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Ok(DragEffect::Ignored) => {}
            Err(e) => {
                warn!(?event, "drop skipped: {e}");
                println!("  skipped: {e}");
            }
        }
    }

    match sessions.save().await {
        SaveOutcome::Completed(report) => {
            for notice in report.notices() {
                println!("{notice}");
            }
            if !report.is_clean() {
                bail!("some changes were not saved");
            }
        }
        other => bail!("save did not run: {other:?}"),
    }
    Ok(())
}

async fn watch(sessions: &Arc<EditSessionManager>, url: &str) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::channel(32);
    let url_owned = url.to_string();
    let subscriber = tokio::spawn(async move { realtime::subscribe(&url_owned, tx).await });

    print_board(&sessions.board());
    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                info!(event = event.name(), "board update");
                sessions.apply_event(event);
                print_board(&sessions.board());
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                subscriber.abort();
                return Ok(());
            }
        }
    }

    subscriber
        .await
        .context("realtime task panicked")?
        .with_context(|| format!("realtime channel {url}"))
}

fn report_admin(outcome: AdminOutcome, done: &str) {
    match outcome {
        AdminOutcome::Armed { .. } => {
            println!("Armed. Re-run with --confirm to go ahead.");
        }
        AdminOutcome::Done => println!("{done}"),
        AdminOutcome::Unchanged => println!("Nothing to change"),
    }
}

/// Resolves a room argument (identifier first, then name).
fn column_for(board: &Board, room: &str) -> anyhow::Result<ColumnKey> {
    if room == UNASSIGNED_LABEL {
        return Ok(ColumnKey::Unassigned);
    }
    board
        .rooms()
        .find(|r| r.id.as_ref().is_some_and(|id| id.as_str() == room))
        .or_else(|| board.rooms().find(|r| r.name == room))
        .map(|r| ColumnKey::Room(r.key()))
        .with_context(|| format!("no room {room:?}"))
}

fn print_board(board: &Board) {
    for column in board.columns() {
        let id = column
            .room()
            .and_then(|r| r.id.as_ref())
            .map(|id| format!(" [{id}]"))
            .unwrap_or_default();
        println!("{}{id}", column.title());
        for device_id in column.devices() {
            if let Some(device) = board.device(device_id) {
                println!("  - {:<24} {:<10} ({})", device.name, device.kind, device.id);
            }
        }
    }
}
