//! Fans player status in, control commands out, and pops the next song only
//! once every connected player has reported ready. Mirrors `playerManager`'s
//! `Start` select loop in the original backend, generalized onto
//! `tokio::sync::mpsc` channels.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::queue_manager::QueueManager;
use crate::scheduler::Scheduler;
use crate::song::Song;

/// A control command delivered to every connected player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Every connected player reported ready; the all-ready gate popped
    /// `song` off the queue, so start playing it now.
    Play(Song),
    /// An explicit skip/next request popped this song off the queue, or
    /// `None` if the queue was empty.
    Next(Option<Song>),
    Pause,
}

/// A status message a session handler feeds into the coordinator's fan-in.
pub enum Status {
    Ready,
}

struct PlayerHandle {
    outbound: mpsc::UnboundedSender<Command>,
    ready: bool,
}

/// Owns the fan-in/fan-out wiring for one room's players. `add_player` and
/// `remove_player` may be called concurrently with the running coordinator
/// task; they only touch the players map, never the channels.
pub struct PlayerCoordinator<S: Scheduler> {
    queue: Arc<QueueManager<S>>,
    players: parking_lot::RwLock<HashMap<u32, PlayerHandle>>,
    next_player_id: AtomicU32,
    fan_in: mpsc::UnboundedSender<(u32, Status)>,
    fan_out: mpsc::UnboundedSender<Command>,
    stop: CancellationToken,
}

impl<S: Scheduler + Sync + 'static> PlayerCoordinator<S> {
    pub fn new(queue: Arc<QueueManager<S>>) -> Arc<Self> {
        let (fan_in_tx, fan_in_rx) = mpsc::unbounded_channel();
        let (fan_out_tx, fan_out_rx) = mpsc::unbounded_channel();
        let (next_song_tx, next_song_rx) = mpsc::unbounded_channel();

        let coordinator = Arc::new(Self {
            queue,
            players: parking_lot::RwLock::new(HashMap::new()),
            next_player_id: AtomicU32::new(1),
            fan_in: fan_in_tx,
            fan_out: fan_out_tx,
            stop: CancellationToken::new(),
        });

        tokio::spawn(
            coordinator
                .clone()
                .run(fan_in_rx, fan_out_rx, next_song_tx, next_song_rx),
        );

        coordinator
    }

    /// Register a new player session. Returns the assigned player id and the
    /// receiver its session handler should forward to its outbound gRPC
    /// stream.
    pub fn add_player(&self) -> (u32, mpsc::UnboundedReceiver<Command>) {
        let id = self.next_player_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.players
            .write()
            .insert(id, PlayerHandle { outbound: tx, ready: false });
        (id, rx)
    }

    /// Remove a player session. Returns the number of sessions remaining.
    pub fn remove_player(&self, id: u32) -> usize {
        let mut players = self.players.write();
        players.remove(&id);
        players.len()
    }

    /// Feed a status message from a connected player into the fan-in.
    pub fn receive_from_player(&self, id: u32, status: Status) {
        // the receiver is held by `run`, which outlives every call here
        let _ = self.fan_in.send((id, status));
    }

    /// Broadcast a command to every connected player via the fan-out.
    pub fn send_to_players(&self, command: Command) {
        let _ = self.fan_out.send(command);
    }

    /// Stop the coordinator task. Idempotent and safe to call from a
    /// shutdown sequence regardless of whether the task has already
    /// exited on its own (e.g. every fan-in/fan-out sender dropped).
    pub fn stop(&self) {
        self.stop.cancel();
    }

    fn players_ready(players: &HashMap<u32, PlayerHandle>) -> bool {
        !players.is_empty() && players.values().all(|p| p.ready)
    }

    /// One coordinator task, single-threaded over three sources: fan-in
    /// (player status), fan-out (a caller wants to broadcast), and
    /// next-song (a background pop task completed).
    async fn run(
        self: Arc<Self>,
        mut fan_in: mpsc::UnboundedReceiver<(u32, Status)>,
        mut fan_out: mpsc::UnboundedReceiver<Command>,
        next_song_tx: mpsc::UnboundedSender<Option<Song>>,
        mut next_song: mpsc::UnboundedReceiver<Option<Song>>,
    ) {
        loop {
            tokio::select! {
                () = self.stop.cancelled() => {
                    debug!("coordinator stop requested");
                    return;
                }
                status = fan_in.recv() => {
                    let Some((id, Status::Ready)) = status else {
                        debug!("fan-in closed, coordinator stopping");
                        return;
                    };
                    self.on_ready(id, &next_song_tx);
                }
                command = fan_out.recv() => {
                    let Some(command) = command else {
                        debug!("fan-out closed, coordinator stopping");
                        return;
                    };
                    self.dispatch(command);
                }
                song = next_song.recv() => {
                    // Mirrors the original's `nextSong` case: only a
                    // successful pop resets readiness and is dispatched, as
                    // `Play`. An empty pop (the queue was raced away by a
                    // concurrent explicit `pop()`) does neither.
                    let Some(maybe_song) = song else { return };
                    if let Some(song) = maybe_song {
                        self.reset_readiness();
                        self.dispatch(Command::Play(song));
                    }
                }
            }
        }
    }

    /// A player just reported ready. If every registered player is now
    /// ready, launch a background task that waits for the queue to be
    /// non-empty, re-checks all-ready (players may come and go during the
    /// wait), pops, and feeds the result to `next_song_tx`.
    fn on_ready(self: &Arc<Self>, id: u32, next_song_tx: &mpsc::UnboundedSender<Option<Song>>) {
        {
            let mut players = self.players.write();
            if let Some(player) = players.get_mut(&id) {
                player.ready = true;
            }
            if !Self::players_ready(&players) {
                return;
            }
        }

        let coordinator = self.clone();
        let next_song_tx = next_song_tx.clone();
        tokio::spawn(async move {
            coordinator.queue.wait_for_more_songs().await;

            if !Self::players_ready(&coordinator.players.read()) {
                // a player disconnected or went un-ready while we waited
                return;
            }

            let song = coordinator.queue.pop_queue();
            let _ = next_song_tx.send(song);
        });
    }

    /// Deliver `command` to every connected player, one send per player so a
    /// slow or gone outbound channel can't stall the coordinator.
    fn dispatch(&self, command: Command) {
        for (id, player) in self.players.read().iter() {
            if player.outbound.send(command.clone()).is_err() {
                warn!("player {id} gone while dispatching {command:?}");
            }
        }
    }

    fn reset_readiness(&self) {
        for player in self.players.write().values_mut() {
            player.ready = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::FifoScheduler;
    use crate::song::{ServiceKind, SongMetadata};
    use std::time::Duration;

    fn song(id: u32) -> Song {
        Song {
            song_id: id,
            title: format!("t{id}"),
            service: ServiceKind::None,
            service_id: String::new(),
            user_id: 1,
            username: "u1".into(),
            room_id: 1,
            metadata: SongMetadata::default(),
        }
    }

    async fn recv_next(rx: &mut mpsc::UnboundedReceiver<Command>) -> Command {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for a command")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn broadcasts_next_song_only_once_every_player_is_ready() {
        let queue = Arc::new(QueueManager::new(FifoScheduler::new()));
        let coordinator = PlayerCoordinator::new(queue.clone());

        let (id_a, mut rx_a) = coordinator.add_player();
        let (id_b, mut rx_b) = coordinator.add_player();

        queue.add_song(song(1));

        assert!(
            tokio::time::timeout(Duration::from_millis(100), rx_a.recv())
                .await
                .is_err(),
            "no player reported ready yet"
        );

        coordinator.receive_from_player(id_a, Status::Ready);
        assert!(
            tokio::time::timeout(Duration::from_millis(100), rx_a.recv())
                .await
                .is_err(),
            "only one of two players is ready"
        );

        coordinator.receive_from_player(id_b, Status::Ready);

        assert_eq!(recv_next(&mut rx_a).await, Command::Play(song(1)));
        assert_eq!(recv_next(&mut rx_b).await, Command::Play(song(1)));
    }

    #[tokio::test]
    async fn disconnect_during_wait_suppresses_the_broadcast() {
        let queue = Arc::new(QueueManager::new(FifoScheduler::new()));
        let coordinator = PlayerCoordinator::new(queue.clone());

        let (id_a, mut rx_a) = coordinator.add_player();
        let (id_b, _rx_b) = coordinator.add_player();

        coordinator.receive_from_player(id_a, Status::Ready);
        coordinator.receive_from_player(id_b, Status::Ready);

        // both ready with an empty queue: the background task is now parked
        // in wait_for_more_songs. Player 2 leaves before a song arrives.
        tokio::time::sleep(Duration::from_millis(20)).await;
        coordinator.remove_player(id_b);

        queue.add_song(song(1));

        assert!(
            tokio::time::timeout(Duration::from_millis(200), rx_a.recv())
                .await
                .is_err(),
            "re-check after disconnect must suppress the broadcast"
        );
    }

    #[tokio::test]
    async fn pause_is_broadcast_to_every_player_unconditionally() {
        let queue = Arc::new(QueueManager::new(FifoScheduler::new()));
        let coordinator = PlayerCoordinator::new(queue);

        let (_id, mut rx) = coordinator.add_player();
        coordinator.send_to_players(Command::Pause);

        assert_eq!(recv_next(&mut rx).await, Command::Pause);
    }

    #[tokio::test]
    async fn last_player_leaving_clears_now_playing_via_session_handler_contract() {
        // the coordinator itself does not clear now-playing; that is the
        // streaming session handler's responsibility once remove_player
        // reports zero remaining players (see jukebox-server::session).
        let queue = Arc::new(QueueManager::new(FifoScheduler::new()));
        let coordinator = PlayerCoordinator::new(queue.clone());

        let (id, _rx) = coordinator.add_player();
        assert_eq!(coordinator.remove_player(id), 0);
    }

    #[tokio::test]
    async fn empty_pop_from_the_ready_gate_is_not_dispatched() {
        let queue = Arc::new(QueueManager::new(FifoScheduler::new()));
        let coordinator = PlayerCoordinator::new(queue.clone());

        let (id, mut rx) = coordinator.add_player();
        coordinator.receive_from_player(id, Status::Ready);

        // Neither of these yields to the executor, so the background pop
        // task (parked in `wait_for_more_songs`) cannot run until the
        // `.await` below -- by then the song this add unblocked it with has
        // already been taken by our own pop, so its own `pop_queue()` finds
        // the queue empty.
        queue.add_song(song(1));
        queue.pop_queue();

        assert!(
            tokio::time::timeout(Duration::from_millis(100), rx.recv())
                .await
                .is_err(),
            "an empty pop must not be dispatched or reset readiness"
        );
    }

    #[tokio::test]
    async fn stop_ends_the_coordinator_task() {
        let queue = Arc::new(QueueManager::new(FifoScheduler::new()));
        let coordinator = PlayerCoordinator::new(queue);

        coordinator.stop();
        // give the task a chance to observe the cancellation and return
        tokio::time::sleep(Duration::from_millis(20)).await;
        // the receiving end is gone now, so this send is silently dropped
        coordinator.send_to_players(Command::Pause);

        let (_id, mut rx) = coordinator.add_player();
        assert!(
            tokio::time::timeout(Duration::from_millis(100), rx.recv())
                .await
                .is_err(),
            "a stopped coordinator must not dispatch"
        );
    }
}
