mod cli;
mod config;
mod db;
mod fetcher;
mod logger;
mod service;
mod session;
mod state;
mod store;
mod users;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use jukebox_core::collab::SnapshotStore;
use jukebox_core::scheduler::RoundRobinScheduler;
use jukebox_core::{PlayerCoordinator, QueueManager};
use jukebox_proto::ytb_be_player_server::YtbBePlayerServer;
use jukebox_proto::ytb_backend_server::YtbBackendServer;
use service::{BackendService, PlayerService};
use session::SessionTracker;
use state::AppState;
use store::FileSnapshotStore;
use tokio_util::sync::CancellationToken;
use tonic::transport::server::TcpIncoming;
use tonic::transport::Server;
use users::CachingUserDirectory;

#[macro_use]
extern crate log;

fn main() -> Result<()> {
    if let Err(err) = actual_main() {
        error!("Error: {err:?}");
        return Err(err);
    }

    Ok(())
}

#[tokio::main]
async fn actual_main() -> Result<()> {
    let args = cli::Args::parse();
    let _logger_handle = logger::setup(&args);
    let config_path = PathBuf::from(config::FILE_NAME);
    let config = config::ServerConfig::load(Some(&config_path), &args)?;

    info!("Server starting...");

    let db = Arc::new(db::UserRoomDb::open(&config.database)?);
    let users = Arc::new(CachingUserDirectory::new(db.clone()));
    let api_key = load_api_key(config.api_key_file.as_deref())?;
    let fetcher = Arc::new(fetcher::LinkSongFetcher::new(api_key));
    let snapshot_store: Arc<dyn SnapshotStore> = Arc::new(FileSnapshotStore);

    let queue = Arc::new(QueueManager::new(RoundRobinScheduler::new()));
    if let Some(load_path) = &args.load {
        for (index, song) in snapshot_store.load(load_path)?.into_iter().enumerate() {
            info!("{:3}. {{ {song:?} }}", index + 1);
            queue.add_song(song);
        }
    } else {
        for song in snapshot_store.load(&config.snapshot)? {
            queue.add_song(song);
        }
    }

    let coordinator = PlayerCoordinator::new(queue.clone());

    let state = Arc::new(AppState {
        queue,
        coordinator,
        users,
        fetcher,
        db,
        snapshot_store,
        snapshot_path: config.snapshot.clone(),
        sessions: SessionTracker::default(),
    });

    let cancel_token = CancellationToken::new();
    let shutdown = cancel_token.clone();
    ctrlc::set_handler(move || {
        shutdown.cancel();
    })
    .context("failed to set Ctrl-C handler")?;

    let (incoming, addr) = tcp_stream(config.bind_address()).await?;
    info!("Server listening on {addr}");

    let sessions = state.sessions.clone();
    let coordinator = state.coordinator.clone();
    let server = Server::builder()
        .add_service(YtbBackendServer::new(BackendService::new(state.clone())))
        .add_service(YtbBePlayerServer::new(PlayerService::new(state)))
        .serve_with_incoming_shutdown(incoming, cancel_token.cancelled_owned());

    server.await?;

    coordinator.stop();
    info!("Waiting for in-flight player connections to finish...");
    sessions.drain().await;

    info!("Bye");
    Ok(())
}

fn load_api_key(path: Option<&std::path::Path>) -> Result<Option<String>> {
    let Some(path) = path else { return Ok(None) };
    let key = std::fs::read_to_string(path)
        .with_context(|| format!("reading API key from {}", path.display()))?;
    Ok(Some(key.trim().to_string()))
}

/// Bind a listener up front so the server's actual address can be logged
/// even when the caller asked for an ephemeral port.
async fn tcp_stream(addr: std::net::SocketAddr) -> Result<(TcpIncoming, std::net::SocketAddr)> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("error binding address: {addr}"))?;
    let bound = listener.local_addr()?;
    let stream = TcpIncoming::from_listener(listener, true, None)
        .map_err(|err| anyhow::anyhow!(err))?;
    Ok((stream, bound))
}
