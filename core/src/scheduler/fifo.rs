use crate::song::Song;

use super::{RemoveError, Scheduler};

/// Straight insertion-order scheduler. Ties broken by insertion order.
#[derive(Debug, Default)]
pub struct FifoScheduler {
    queue: Vec<Song>,
}

impl FifoScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self { queue: Vec::new() }
    }
}

impl Scheduler for FifoScheduler {
    fn push(&mut self, song: Song) {
        self.queue.push(song);
    }

    fn pop(&mut self) -> Option<Song> {
        if self.queue.is_empty() {
            None
        } else {
            Some(self.queue.remove(0))
        }
    }

    fn length(&self) -> usize {
        self.queue.len()
    }

    fn remove(&mut self, song_id: u32, user_id: u32) -> Result<(), RemoveError> {
        let Some(index) = self.queue.iter().position(|s| s.song_id == song_id) else {
            return Err(RemoveError::NotFound);
        };

        if self.queue[index].user_id != user_id {
            return Err(RemoveError::Forbidden);
        }

        self.queue.remove(index);
        Ok(())
    }

    fn front(&self) -> Vec<&Song> {
        self.queue.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::{ServiceKind, SongMetadata};
    use pretty_assertions::assert_eq;

    fn song(id: u32, user: u32) -> Song {
        Song {
            song_id: id,
            title: format!("t{id}"),
            service: ServiceKind::None,
            service_id: String::new(),
            user_id: user,
            username: format!("u{user}"),
            room_id: 1,
            metadata: SongMetadata::default(),
        }
    }

    #[test]
    fn empty_pop_returns_none() {
        let mut s = FifoScheduler::new();
        assert_eq!(s.pop(), None);
        assert_eq!(s.length(), 0);
    }

    #[test]
    fn pops_in_insertion_order() {
        let mut s = FifoScheduler::new();
        s.push(song(1, 1));
        s.push(song(2, 1));
        s.push(song(3, 2));
        assert_eq!(s.pop().unwrap().song_id, 1);
        assert_eq!(s.pop().unwrap().song_id, 2);
        assert_eq!(s.pop().unwrap().song_id, 3);
        assert_eq!(s.pop(), None);
    }

    #[test]
    fn remove_wrong_owner_is_forbidden() {
        let mut s = FifoScheduler::new();
        s.push(song(7, 42));
        assert_eq!(s.remove(7, 99), Err(RemoveError::Forbidden));
        assert_eq!(s.length(), 1);
    }

    #[test]
    fn remove_missing_song_is_not_found() {
        let mut s = FifoScheduler::new();
        assert_eq!(s.remove(1, 1), Err(RemoveError::NotFound));
    }

    #[test]
    fn remove_decrements_length_by_one() {
        let mut s = FifoScheduler::new();
        s.push(song(1, 1));
        s.push(song(2, 1));
        assert!(s.remove(1, 1).is_ok());
        assert_eq!(s.length(), 1);
        assert_eq!(s.front()[0].song_id, 2);
    }
}
