//! `tonic::async_trait` implementations of the two RPC services: the unary
//! request surface (`YtbBackend`) and the streaming player connection
//! (`YtbBePlayer`, which just hands off to [`crate::session`]).
//!
//! Every handler returns `Ok` with an `Error{success, message}` wire value
//! on a domain failure rather than a `tonic::Status` -- the request surface
//! never turns a "song not found" or "wrong user" into a transport error.

use std::pin::Pin;
use std::sync::Arc;

use jukebox_core::collab::FetchError;
use jukebox_core::scheduler::RemoveError;
use jukebox_core::{Command, Song as DomainSong};
use jukebox_proto::ytb_be_player_server::YtbBePlayer;
use jukebox_proto::ytb_backend_server::YtbBackend;
use jukebox_proto::{
    Empty, Error as WireError, Eviction, FilePath, Playlist, PlayerControl, PlayerStatus, Room,
    Song, Submission, User,
};
use log::{info, warn};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

use crate::session;
use crate::state::AppState;

pub struct BackendService {
    state: Arc<AppState>,
}

impl BackendService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    fn success(message: impl Into<String>) -> WireError {
        WireError { success: true, message: message.into() }
    }

    fn failure(message: impl Into<String>) -> WireError {
        WireError { success: false, message: message.into() }
    }
}

#[tonic::async_trait]
impl YtbBackend for BackendService {
    async fn send_song(&self, request: Request<Submission>) -> Result<Response<WireError>, Status> {
        let submission = request.into_inner();
        info!("submission: {{ link: {}, user_id: {} }}", submission.link, submission.user_id);

        let Some((username, room_id)) = self.state.users.resolve(submission.user_id) else {
            return Ok(Response::new(Self::failure("song submitted by unknown user")));
        };

        let fetched = match self.state.fetcher.fetch(&submission.link) {
            Ok(song) => song,
            Err(FetchError::UnsupportedLink) => {
                return Ok(Response::new(Self::failure(
                    "failed to fetch metadata for your song, please check your link",
                )));
            }
            Err(FetchError::Upstream(err)) => {
                warn!("song fetch failed: {err:#}");
                return Ok(Response::new(Self::failure(
                    "failed to fetch metadata for your song, please check your link",
                )));
            }
        };

        let song_id = match self.state.db.add_song(
            &fetched.title,
            wire_service_name(fetched.service),
            &fetched.service_id,
            submission.user_id,
        ) {
            Ok(id) => id,
            Err(err) => {
                warn!("failed to record song in database: {err:#}");
                return Ok(Response::new(Self::failure("failed to save your song")));
            }
        };

        let song = DomainSong { song_id, username, room_id, user_id: submission.user_id, ..fetched };
        info!("song data: {{ {song:?} }}");
        self.state.queue.add_song(song);
        self.state.snapshot();

        Ok(Response::new(Self::success("success")))
    }

    async fn get_playlist(&self, _request: Request<Empty>) -> Result<Response<Playlist>, Status> {
        let songs = self.state.queue.get_playlist();
        Ok(Response::new(Playlist {
            songs: songs.into_iter().map(jukebox_proto::Song::from).collect(),
        }))
    }

    async fn login_user(&self, request: Request<User>) -> Result<Response<User>, Status> {
        let request = request.into_inner();
        match self.state.users.login(&request.username, request.room_id) {
            Ok(user_id) => Ok(Response::new(User {
                user_id,
                username: request.username,
                room_id: request.room_id,
                err: Some(Self::success("success")),
            })),
            Err(err) => {
                warn!("login failed: {err:#}");
                Ok(Response::new(User {
                    user_id: 0,
                    username: request.username,
                    room_id: request.room_id,
                    err: Some(Self::failure("failed to log in")),
                }))
            }
        }
    }

    async fn pop_queue(&self, _request: Request<Empty>) -> Result<Response<Song>, Status> {
        let popped = self.state.queue.pop_queue();
        self.state.snapshot();
        match popped {
            Some(song) => {
                info!("popped song: {song:?}");
                Ok(Response::new(song.into()))
            }
            None => {
                info!("queue is empty, nothing to pop");
                Ok(Response::new(Song::default()))
            }
        }
    }

    async fn save_playlist(&self, request: Request<FilePath>) -> Result<Response<WireError>, Status> {
        let path = request.into_inner().path;
        let songs = self.state.queue.get_playlist();
        match self.state.snapshot_store.save(&songs, std::path::Path::new(&path)) {
            Ok(()) => {
                info!("saved current playlist to: {path}");
                Ok(Response::new(Self::success("success")))
            }
            Err(err) => Ok(Response::new(Self::failure(err.to_string()))),
        }
    }

    async fn remove_song(&self, request: Request<Eviction>) -> Result<Response<WireError>, Status> {
        let eviction = request.into_inner();
        match self.state.queue.remove_song(eviction.song_id, eviction.user_id) {
            Ok(()) => {
                info!("removed song: {{ song_id: {}, user_id: {} }}", eviction.song_id, eviction.user_id);
                self.state.snapshot();
                Ok(Response::new(Self::success("success")))
            }
            Err(err) => {
                let message = match err {
                    RemoveError::NotFound => "song not found".to_string(),
                    RemoveError::Forbidden => "you did not submit this song".to_string(),
                };
                warn!("failed to remove song from playlist: {message}");
                Ok(Response::new(Self::failure(message)))
            }
        }
    }

    async fn get_now_playing(&self, _request: Request<Empty>) -> Result<Response<Song>, Status> {
        Ok(Response::new(self.state.queue.now_playing().map_or_else(
            Song::default,
            jukebox_proto::Song::from,
        )))
    }

    async fn next_song(&self, _request: Request<Empty>) -> Result<Response<WireError>, Status> {
        let song = self.state.queue.pop_queue();
        self.state.coordinator.send_to_players(Command::Next(song));
        Ok(Response::new(Self::success("success")))
    }

    async fn pause_song(&self, _request: Request<Empty>) -> Result<Response<WireError>, Status> {
        self.state.coordinator.send_to_players(Command::Pause);
        Ok(Response::new(Self::success("success")))
    }

    async fn create_room(&self, request: Request<Room>) -> Result<Response<Room>, Status> {
        let name = request.into_inner().name;
        if self.state.db.get_room_by_name(&name).map_err(|e| Status::internal(e.to_string()))?.is_some()
        {
            return Ok(Response::new(Room {
                id: 0,
                name,
                err: Some(Self::failure("room already exists")),
            }));
        }

        match self.state.db.add_room(&name) {
            Ok(room) => Ok(Response::new(Room {
                id: room.room_id,
                name: room.name,
                err: Some(Self::success("success")),
            })),
            Err(err) => {
                warn!("failed to create a new room: {{ name: {name}, error: {err:#} }}");
                Ok(Response::new(Room { id: 0, name, err: Some(Self::failure("failed to create room")) }))
            }
        }
    }

    async fn get_room(&self, request: Request<Room>) -> Result<Response<Room>, Status> {
        let name = request.into_inner().name;
        match self.state.db.get_room_by_name(&name) {
            Ok(Some(room)) => Ok(Response::new(Room {
                id: room.room_id,
                name: room.name,
                err: Some(Self::success("success")),
            })),
            Ok(None) => Ok(Response::new(Room { id: 0, name, err: Some(Self::failure("room does not exist")) })),
            Err(err) => Ok(Response::new(Room { id: 0, name, err: Some(Self::failure(err.to_string())) })),
        }
    }
}

fn wire_service_name(service: jukebox_core::song::ServiceKind) -> &'static str {
    match service {
        jukebox_core::song::ServiceKind::None => "none",
        jukebox_core::song::ServiceKind::Local => "local",
        jukebox_core::song::ServiceKind::Youtube => "youtube",
    }
}

pub struct PlayerService {
    state: Arc<AppState>,
}

impl PlayerService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl YtbBePlayer for PlayerService {
    type SongPlayerStream = Pin<Box<dyn tokio_stream::Stream<Item = Result<PlayerControl, Status>> + Send>>;

    async fn song_player(
        &self,
        request: Request<Streaming<PlayerStatus>>,
    ) -> Result<Response<Self::SongPlayerStream>, Status> {
        let (tx, rx) = mpsc::channel(16);
        let state = self.state.clone();
        tokio::spawn(session::run(state, request.into_inner(), tx));
        Ok(Response::new(Box::pin(ReceiverStream::new(rx))))
    }
}
