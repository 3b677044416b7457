//! Resolves a submitted link or local path into playable song metadata.
//!
//! Grounded in `song_fetcher.go`: a local `.mp3`/`.flac` path is read with
//! a tag library, a YouTube link has its video id extracted by regex and is
//! looked up through an API key when one is configured, falling back to the
//! `yt-dlp` command-line extractor otherwise.

use std::process::Command;
use std::sync::OnceLock;

use jukebox_core::collab::{FetchError, SongFetcher};
use jukebox_core::song::{ServiceKind, Song, SongMetadata};
use lofty::prelude::{Accessor, TaggedFileExt};
use lofty::probe::Probe;
use log::warn;
use regex::Regex;
use serde::Deserialize;

fn valid_file() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^/.*\.(mp3|flac)$").unwrap())
}

fn valid_youtube() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(https?://)?(www\.)?(m\.)?(youtube\.com|youtu\.be)(/\S+)$").unwrap()
    })
}

fn full_youtube_link() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(https?://)?(www\.)?(m\.)?youtube\.com/watch(\S+)$").unwrap()
    })
}

fn short_youtube_link() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(https?://)?(www\.)?youtu\.be/([A-Za-z0-9_-]+)").unwrap())
}

fn video_query_param() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"v=([A-Za-z0-9_-]+)").unwrap())
}

fn extract_video_id(link: &str) -> Option<String> {
    if let Some(caps) = full_youtube_link().captures(link) {
        let _ = caps;
        video_query_param()
            .captures(link)
            .map(|c| c[1].to_string())
    } else if let Some(caps) = short_youtube_link().captures(link) {
        Some(caps[3].to_string())
    } else {
        None
    }
}

pub struct LinkSongFetcher {
    api_key: Option<String>,
}

impl LinkSongFetcher {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    fn fetch_youtube(&self, link: &str) -> Result<Song, FetchError> {
        let video_id = extract_video_id(link).ok_or(FetchError::UnsupportedLink)?;

        match &self.api_key {
            Some(key) => self.fetch_youtube_via_api(&video_id, key),
            None => self.fetch_youtube_via_yt_dlp(&video_id, link),
        }
    }

    fn fetch_youtube_via_api(&self, video_id: &str, key: &str) -> Result<Song, FetchError> {
        #[derive(Deserialize)]
        struct VideosResponse {
            items: Vec<VideoItem>,
        }
        #[derive(Deserialize)]
        struct VideoItem {
            snippet: Snippet,
            #[serde(rename = "contentDetails")]
            content_details: ContentDetails,
        }
        #[derive(Deserialize)]
        struct Snippet {
            title: String,
        }
        #[derive(Deserialize)]
        struct ContentDetails {
            duration: String,
        }

        let response: VideosResponse = ureq::get("https://www.googleapis.com/youtube/v3/videos")
            .query("part", "snippet,contentDetails")
            .query("id", video_id)
            .query("key", key)
            .call()
            .map_err(|err| FetchError::Upstream(err.into()))?
            .into_json()
            .map_err(|err| FetchError::Upstream(err.into()))?;

        let item = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Upstream(anyhow::anyhow!("no metadata for {video_id}")))?;

        Ok(Song {
            song_id: 0,
            title: item.snippet.title,
            service: ServiceKind::Youtube,
            service_id: video_id.to_string(),
            user_id: 0,
            username: String::new(),
            room_id: 0,
            metadata: SongMetadata {
                thumbnail: format!("https://i.ytimg.com/vi/{video_id}/mqdefault.jpg"),
                duration: item.content_details.duration,
            },
        })
    }

    fn fetch_youtube_via_yt_dlp(&self, video_id: &str, link: &str) -> Result<Song, FetchError> {
        let output = Command::new("yt-dlp")
            .args(["--print", "title", link])
            .output()
            .map_err(|err| FetchError::Upstream(err.into()))?;

        if !output.status.success() {
            warn!("yt-dlp exited with status {}", output.status);
            return Err(FetchError::Upstream(anyhow::anyhow!(
                "yt-dlp failed for {link}"
            )));
        }

        let title = String::from_utf8_lossy(&output.stdout).trim().to_string();

        Ok(Song {
            song_id: 0,
            title,
            service: ServiceKind::Youtube,
            service_id: video_id.to_string(),
            user_id: 0,
            username: String::new(),
            room_id: 0,
            metadata: SongMetadata {
                thumbnail: format!("https://i.ytimg.com/vi/{video_id}/mqdefault.jpg"),
                duration: String::new(),
            },
        })
    }

    fn fetch_local(&self, path: &str) -> Result<Song, FetchError> {
        let tagged_file = Probe::open(path)
            .map_err(|err| FetchError::Upstream(err.into()))?
            .read(false)
            .map_err(|err| FetchError::Upstream(err.into()))?;

        let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());
        let artist = tag.and_then(|t| t.artist()).unwrap_or_default().to_string();
        let title = tag.and_then(|t| t.title()).unwrap_or_default().to_string();

        Ok(Song {
            song_id: 0,
            title: format!("{artist} - {title}"),
            service: ServiceKind::Local,
            service_id: path.to_string(),
            user_id: 0,
            username: String::new(),
            room_id: 0,
            metadata: SongMetadata::default(),
        })
    }
}

impl SongFetcher for LinkSongFetcher {
    fn fetch(&self, submission: &str) -> Result<Song, FetchError> {
        if valid_youtube().is_match(submission) {
            self.fetch_youtube(submission)
        } else if valid_file().is_match(submission) {
            self.fetch_local(submission)
        } else {
            Err(FetchError::UnsupportedLink)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_full_length_link() {
        let id = extract_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(id.as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn extracts_id_from_short_link() {
        let id = extract_video_id("https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(id.as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[test]
    fn non_youtube_link_has_no_extractable_id() {
        assert_eq!(extract_video_id("https://example.com/video"), None);
    }

    #[test]
    fn unsupported_submission_is_rejected() {
        let fetcher = LinkSongFetcher::new(None);
        assert!(matches!(
            fetcher.fetch("not a link or a path"),
            Err(FetchError::UnsupportedLink)
        ));
    }

    #[test]
    fn relative_file_path_is_not_a_valid_local_file() {
        assert!(!valid_file().is_match("rick.mp3"));
        assert!(valid_file().is_match("/home/user/rick.mp3"));
    }
}
