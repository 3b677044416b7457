//! Trait boundaries the kernel depends on but does not implement: looking up
//! usernames, resolving a submitted link into playable song metadata, and
//! persisting a queue snapshot. Concrete implementations live in the server
//! crate so the kernel stays free of I/O dependencies (sqlite, HTTP, the
//! filesystem).

use std::path::Path;

use crate::song::Song;

/// Maps authenticated user ids to display names and room membership.
///
/// Grounded in `UserCache`/`DbManager` from the original backend: a cache
/// in front of a persistent store.
pub trait UserDirectory: Send + Sync {
    /// Look up a known user's `(username, room_id)`.
    fn resolve(&self, user_id: u32) -> Option<(String, u32)>;

    /// Register a username in a room, returning the assigned `user_id`.
    /// Re-logging in with the same username in the same room returns the
    /// existing id rather than creating a duplicate.
    fn login(&self, username: &str, room_id: u32) -> anyhow::Result<u32>;
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("link did not match a supported source")]
    UnsupportedLink,
    #[error("upstream lookup failed: {0}")]
    Upstream(#[from] anyhow::Error),
}

/// Resolves a user-submitted link or path into a playable [`Song`] body
/// (everything except `song_id`, `user_id`, `username`, `room_id`, which the
/// caller fills in once the database has assigned an id).
pub trait SongFetcher: Send + Sync {
    fn fetch(&self, submission: &str) -> Result<Song, FetchError>;
}

/// Persists and restores a queue's contents across restarts.
pub trait SnapshotStore: Send + Sync {
    fn save(&self, songs: &[Song], path: &Path) -> anyhow::Result<()>;
    fn load(&self, path: &Path) -> anyhow::Result<Vec<Song>>;
}
