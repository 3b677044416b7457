//! Pure song ordering. Implementations do no locking of their own — the
//! [`crate::queue_manager::QueueManager`] provides exclusion.

mod fifo;
mod round_robin;

pub use fifo::FifoScheduler;
pub use round_robin::RoundRobinScheduler;

use crate::song::Song;

/// A submission's round-robin round number. The sentinel `MARKED_FOR_REMOVAL`
/// floats an entry to the front of the sort order so `remove` can pop it off
/// without a second removal code path.
pub const MARKED_FOR_REMOVAL: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RemoveError {
    #[error("song not found in queue")]
    NotFound,
    #[error("song belongs to a different user")]
    Forbidden,
}

/// An ordering policy for the song queue. Non-blocking, no internal locking.
pub trait Scheduler: Send {
    /// Enqueue a song under this scheduler's ordering policy.
    fn push(&mut self, song: Song);

    /// Dequeue the highest-priority entry, or `None` if the queue is empty.
    fn pop(&mut self) -> Option<Song>;

    /// Number of songs currently queued.
    fn length(&self) -> usize;

    /// Remove the single entry matching both `song_id` and `user_id`.
    fn remove(&mut self, song_id: u32, user_id: u32) -> Result<(), RemoveError>;

    /// Snapshot the queue in scheduled order.
    fn front(&self) -> Vec<&Song>;
}
