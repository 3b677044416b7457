//! The domain-level [`Song`] record, kept separate from the generated wire
//! types the way `termusiclib::player` keeps `PlayerProgress` separate from
//! `protobuf::PlayerTime`.

use serde::{Deserialize, Serialize};

/// Which media service a song's `service_id` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceKind {
    None,
    Local,
    Youtube,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongMetadata {
    pub thumbnail: String,
    pub duration: String,
}

/// An immutable-once-enqueued playable item.
///
/// Two distinct songs may share every field except `song_id`; `song_id` is
/// assigned by the database on insert, never by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub song_id: u32,
    pub title: String,
    pub service: ServiceKind,
    pub service_id: String,
    pub user_id: u32,
    pub username: String,
    pub room_id: u32,
    pub metadata: SongMetadata,
}

impl From<ServiceKind> for jukebox_proto::ServiceType {
    fn from(value: ServiceKind) -> Self {
        match value {
            ServiceKind::None => jukebox_proto::ServiceType::ServiceNone,
            ServiceKind::Local => jukebox_proto::ServiceType::ServiceLocal,
            ServiceKind::Youtube => jukebox_proto::ServiceType::ServiceYoutube,
        }
    }
}

impl From<jukebox_proto::ServiceType> for ServiceKind {
    fn from(value: jukebox_proto::ServiceType) -> Self {
        match value {
            jukebox_proto::ServiceType::ServiceNone => ServiceKind::None,
            jukebox_proto::ServiceType::ServiceLocal => ServiceKind::Local,
            jukebox_proto::ServiceType::ServiceYoutube => ServiceKind::Youtube,
        }
    }
}

impl From<Song> for jukebox_proto::Song {
    fn from(song: Song) -> Self {
        Self {
            song_id: song.song_id,
            title: song.title,
            service: jukebox_proto::ServiceType::from(song.service) as i32,
            service_id: song.service_id,
            user_id: song.user_id,
            username: song.username,
            room_id: song.room_id,
            metadata: Some(jukebox_proto::Metadata {
                thumbnail: song.metadata.thumbnail,
                duration: song.metadata.duration,
            }),
        }
    }
}

impl From<jukebox_proto::Song> for Song {
    fn from(song: jukebox_proto::Song) -> Self {
        let service = jukebox_proto::ServiceType::try_from(song.service)
            .unwrap_or(jukebox_proto::ServiceType::ServiceNone);
        Self {
            song_id: song.song_id,
            title: song.title,
            service: service.into(),
            service_id: song.service_id,
            user_id: song.user_id,
            username: song.username,
            room_id: song.room_id,
            metadata: song
                .metadata
                .map(|m| SongMetadata {
                    thumbnail: m.thumbnail,
                    duration: m.duration,
                })
                .unwrap_or_default(),
        }
    }
}
