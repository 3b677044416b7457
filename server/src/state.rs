//! Shared application state threaded through every RPC handler.
//!
//! Collects the kernel's queue/coordinator with the server's collaborator
//! implementations (database, user cache, fetcher, snapshot store) behind
//! one `Arc` so `service.rs` and `session.rs` only need a single clone.

use std::path::PathBuf;
use std::sync::Arc;

use jukebox_core::collab::{SnapshotStore, SongFetcher, UserDirectory};
use jukebox_core::scheduler::RoundRobinScheduler;
use jukebox_core::{PlayerCoordinator, QueueManager};

use crate::db::UserRoomDb;
use crate::session::SessionTracker;

pub struct AppState {
    pub queue: Arc<QueueManager<RoundRobinScheduler>>,
    pub coordinator: Arc<PlayerCoordinator<RoundRobinScheduler>>,
    pub users: Arc<dyn UserDirectory>,
    pub fetcher: Arc<dyn SongFetcher>,
    pub db: Arc<UserRoomDb>,
    pub snapshot_store: Arc<dyn SnapshotStore>,
    pub snapshot_path: PathBuf,
    pub sessions: SessionTracker,
}

impl AppState {
    /// Snapshot the queue's current contents to disk, logging but not
    /// failing the RPC on write errors the way the original backend's
    /// fire-and-forget `SavePlaylist` call after each mutation does.
    pub fn snapshot(&self) {
        let songs = self.queue.get_playlist();
        if let Err(err) = self.snapshot_store.save(&songs, &self.snapshot_path) {
            log::warn!("failed to write queue snapshot: {err:#}");
        }
    }
}
