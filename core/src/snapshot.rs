//! Wire-format codec for queue snapshots. No filesystem I/O here — see
//! `collab::SnapshotStore` for the trait the server crate implements against
//! real storage.

use prost::Message;

use crate::song::Song;

/// Encode songs, in order, as a length-delimited `Playlist` record: a
/// varint byte length followed by the message itself, so a reader never
/// has to know the record's size up front.
#[must_use]
pub fn encode_playlist(songs: &[Song]) -> Vec<u8> {
    let playlist = jukebox_proto::Playlist {
        songs: songs.iter().cloned().map(jukebox_proto::Song::from).collect(),
    };
    playlist.encode_length_delimited_to_vec()
}

/// Decode a previously encoded playlist, preserving song order.
pub fn decode_playlist(bytes: &[u8]) -> Result<Vec<Song>, prost::DecodeError> {
    let playlist = jukebox_proto::Playlist::decode_length_delimited(bytes)?;
    Ok(playlist.songs.into_iter().map(Song::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::{ServiceKind, SongMetadata};
    use pretty_assertions::assert_eq;

    fn song(id: u32) -> Song {
        Song {
            song_id: id,
            title: format!("t{id}"),
            service: ServiceKind::Youtube,
            service_id: "abc123".into(),
            user_id: 7,
            username: "alice".into(),
            room_id: 3,
            metadata: SongMetadata { thumbnail: "https://x/y.jpg".into(), duration: "3:45".into() },
        }
    }

    #[test]
    fn round_trips_order_and_fields() {
        let songs = vec![song(1), song(2), song(3)];
        let encoded = encode_playlist(&songs);
        let decoded = decode_playlist(&encoded).unwrap();
        assert_eq!(decoded, songs);
    }

    #[test]
    fn empty_playlist_round_trips() {
        let encoded = encode_playlist(&[]);
        let decoded = decode_playlist(&encoded).unwrap();
        assert!(decoded.is_empty());
    }
}
