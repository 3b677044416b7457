//! Coordination kernel for the jukebox backend.
//!
//! This crate holds the parts of the system that are pure logic over shared
//! in-memory state: song ordering ([`scheduler`]), the queue and now-playing
//! slot ([`queue_manager`]), fanning commands out to connected players
//! ([`coordinator`]), and the wire codec for queue snapshots ([`snapshot`]).
//! Everything that talks to the filesystem, a database, or the network lives
//! behind the traits in [`collab`] and is implemented by the server crate.

pub mod collab;
pub mod coordinator;
pub mod queue_manager;
pub mod scheduler;
pub mod snapshot;
pub mod song;

pub use coordinator::{Command, PlayerCoordinator, Status};
pub use queue_manager::QueueManager;
pub use scheduler::{FifoScheduler, RemoveError, RoundRobinScheduler, Scheduler};
pub use song::{ServiceKind, Song, SongMetadata};
