use crate::song::Song;

use super::{RemoveError, Scheduler, MARKED_FOR_REMOVAL};

struct Submission {
    song: Song,
    round: i64,
    /// Monotonic submission sequence, standing in for a wall-clock
    /// timestamp as the `(round, submitted_at)` tie-breaker — a counter
    /// can't collide the way two back-to-back `Instant::now()` calls
    /// occasionally do on coarser clocks.
    seq: u64,
}

/// Round-robin scheduler: interleaves songs across submitters, preserving
/// submission order within a round.
#[derive(Default)]
pub struct RoundRobinScheduler {
    queue: Vec<Submission>,
    last_round_used: std::collections::HashMap<u32, i64>,
    current_round: i64,
    next_seq: u64,
}

impl RoundRobinScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            last_round_used: std::collections::HashMap::new(),
            current_round: 0,
            next_seq: 0,
        }
    }

    fn sort(&mut self) {
        self.queue
            .sort_by(|a, b| a.round.cmp(&b.round).then(a.seq.cmp(&b.seq)));
    }
}

impl Scheduler for RoundRobinScheduler {
    fn push(&mut self, song: Song) {
        let round = match self.last_round_used.get(&song.user_id) {
            Some(&last) => (last + 1).max(self.current_round),
            None => self.current_round,
        };
        self.last_round_used.insert(song.user_id, round);

        let seq = self.next_seq;
        self.next_seq += 1;

        self.queue.push(Submission { song, round, seq });
        self.sort();
    }

    fn pop(&mut self) -> Option<Song> {
        if self.queue.is_empty() {
            return None;
        }
        let sub = self.queue.remove(0);
        self.current_round = self.current_round.max(sub.round);
        Some(sub.song)
    }

    fn length(&self) -> usize {
        self.queue.len()
    }

    fn remove(&mut self, song_id: u32, user_id: u32) -> Result<(), RemoveError> {
        let Some(index) = self.queue.iter().position(|s| s.song.song_id == song_id) else {
            return Err(RemoveError::NotFound);
        };

        if self.queue[index].song.user_id != user_id {
            return Err(RemoveError::Forbidden);
        }

        self.queue[index].round = MARKED_FOR_REMOVAL;
        self.sort();
        self.pop();

        // give the user deleting a song back one of their rounds
        if let Some(last) = self.last_round_used.get_mut(&user_id) {
            *last -= 1;
        }

        Ok(())
    }

    fn front(&self) -> Vec<&Song> {
        self.queue.iter().map(|s| &s.song).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::{ServiceKind, SongMetadata};
    use pretty_assertions::assert_eq;

    fn song(id: u32, user: u32, title: &str) -> Song {
        Song {
            song_id: id,
            title: title.to_string(),
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
        let mut s = RoundRobinScheduler::new();
        assert_eq!(s.pop(), None);
        assert_eq!(s.length(), 0);
    }

    #[test]
    fn pop_order_matches_round_robin_fairness() {
        let mut s = RoundRobinScheduler::new();
        s.push(song(1, 1, "a1"));
        s.push(song(2, 1, "a2"));
        s.push(song(3, 2, "b1"));
        s.push(song(4, 3, "c1"));
        s.push(song(5, 1, "a3"));
        s.push(song(6, 2, "b2"));

        let mut popped = Vec::new();
        while let Some(song) = s.pop() {
            popped.push(song.title);
        }

        assert_eq!(popped, vec!["a1", "b1", "c1", "a2", "b2", "a3"]);
    }

    #[test]
    fn remove_refunds_round_so_next_submission_plays_sooner() {
        let mut s = RoundRobinScheduler::new();
        s.push(song(1, 1, "a1"));
        s.push(song(2, 1, "a2"));
        s.push(song(3, 2, "b1"));
        s.push(song(4, 3, "c1"));
        s.push(song(5, 1, "a3"));
        s.push(song(6, 2, "b2"));

        assert_eq!(s.pop().unwrap().title, "a1");
        s.remove(2, 1).unwrap(); // remove a2, owned by user 1

        assert_eq!(s.pop().unwrap().title, "b1");
        assert_eq!(s.pop().unwrap().title, "c1");

        // a4 pushed here should play immediately after b2, per the refund
        s.push(song(7, 1, "a4"));

        assert_eq!(s.pop().unwrap().title, "b2");
        assert_eq!(s.pop().unwrap().title, "a3");
        assert_eq!(s.pop().unwrap().title, "a4");
    }

    #[test]
    fn remove_wrong_owner_is_forbidden_and_leaves_length_unchanged() {
        let mut s = RoundRobinScheduler::new();
        s.push(song(7, 42, "x"));
        assert_eq!(s.remove(7, 99), Err(RemoveError::Forbidden));
        assert_eq!(s.length(), 1);
    }

    #[test]
    fn remove_missing_song_is_not_found() {
        let mut s = RoundRobinScheduler::new();
        assert_eq!(s.remove(1, 1), Err(RemoveError::NotFound));
    }

    #[test]
    fn same_user_songs_pop_in_submission_order() {
        let mut s = RoundRobinScheduler::new();
        s.push(song(1, 1, "a1"));
        s.push(song(2, 1, "a2"));
        s.push(song(3, 1, "a3"));

        assert_eq!(s.pop().unwrap().title, "a1");
        assert_eq!(s.pop().unwrap().title, "a2");
        assert_eq!(s.pop().unwrap().title, "a3");
    }
}
