//! The bidirectional `SongPlayer` stream: registers the connection with the
//! coordinator, forwards its commands to the client, and feeds the client's
//! ready/status messages back in.
//!
//! Grounded in `internal/backend/server.go`'s `SongPlayer` handler: a
//! receive goroutine that signals a local stop channel on disconnect, and a
//! main task that waits for it, removes the player, and clears now-playing
//! if it was the last one connected.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use jukebox_core::{Command, Status};
use log::{info, warn};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio_stream::{Stream, StreamExt};
use tonic::Status as RpcStatus;

use crate::state::AppState;

/// Tracks the number of in-flight `SongPlayer` sessions so shutdown can
/// drain them before the gRPC server stops accepting requests, the way the
/// original backend's `streamWG.Wait()` does before `GracefulStop`.
#[derive(Clone, Default)]
pub struct SessionTracker {
    count: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl SessionTracker {
    pub fn enter(&self) -> SessionGuard {
        self.count.fetch_add(1, Ordering::SeqCst);
        SessionGuard { tracker: self.clone() }
    }

    /// Waits until every in-flight session has exited.
    pub async fn drain(&self) {
        loop {
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            self.idle.notified().await;
        }
    }
}

pub struct SessionGuard {
    tracker: SessionTracker,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if self.tracker.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tracker.idle.notify_waiters();
        }
    }
}

fn to_wire_control(command: Command) -> jukebox_proto::PlayerControl {
    match command {
        Command::Play(song) => jukebox_proto::PlayerControl {
            command: jukebox_proto::CommandType::CommandPlay as i32,
            song: Some(jukebox_proto::Song::from(song)),
        },
        Command::Pause => jukebox_proto::PlayerControl {
            command: jukebox_proto::CommandType::CommandPause as i32,
            song: None,
        },
        Command::Next(song) => jukebox_proto::PlayerControl {
            command: jukebox_proto::CommandType::CommandNext as i32,
            song: song.map(jukebox_proto::Song::from),
        },
    }
}

/// Drives one player connection end to end. Spawned by the `SongPlayer`
/// handler with the outbound sink already wired to the tonic response
/// stream. Generic over the inbound stream type so tests can drive it with
/// a plain channel instead of a live `tonic::Streaming`.
pub async fn run<I>(state: Arc<AppState>, mut inbound: I, outbound: mpsc::Sender<Result<jukebox_proto::PlayerControl, RpcStatus>>)
where
    I: Stream<Item = Result<jukebox_proto::PlayerStatus, RpcStatus>> + Unpin,
{
    let _guard = state.sessions.enter();
    let (id, mut commands) = state.coordinator.add_player();
    info!("player {id} connected");

    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let forward = tokio::spawn(async move {
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else { break };
                    if outbound.send(Ok(to_wire_control(command))).await.is_err() {
                        break;
                    }
                }
                _ = &mut stop_rx => break,
            }
        }
    });

    while let Some(result) = inbound.next().await {
        match result {
            Ok(status) => {
                let command = jukebox_proto::CommandType::try_from(status.command)
                    .unwrap_or(jukebox_proto::CommandType::CommandNone);
                if command == jukebox_proto::CommandType::CommandReady {
                    state.coordinator.receive_from_player(id, Status::Ready);
                }
            }
            Err(err) => {
                warn!("error receiving from player {id}: {err}");
                break;
            }
        }
    }

    let _ = stop_tx.send(());
    let _ = forward.await;

    info!("player {id} disconnected");
    if state.coordinator.remove_player(id) == 0 {
        state.queue.clear_now_playing();
    }
}
