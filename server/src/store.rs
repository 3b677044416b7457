//! Filesystem-backed [`SnapshotStore`]: writes the queue's prost-encoded
//! bytes atomically (write to a sibling temp file, then rename) so a crash
//! mid-write never leaves a half-written snapshot behind.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use jukebox_core::collab::SnapshotStore;
use jukebox_core::snapshot::{decode_playlist, encode_playlist};
use jukebox_core::song::Song;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

pub struct FileSnapshotStore;

impl SnapshotStore for FileSnapshotStore {
    fn save(&self, songs: &[Song], path: &Path) -> Result<()> {
        let bytes = encode_playlist(songs);
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, &bytes)
            .with_context(|| format!("writing snapshot to {}", tmp_path.display()))?;

        #[cfg(unix)]
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o644))
            .with_context(|| format!("setting permissions on {}", tmp_path.display()))?;

        fs::rename(&tmp_path, path)
            .with_context(|| format!("installing snapshot at {}", path.display()))?;
        Ok(())
    }

    /// A missing snapshot file is not an error; a fresh server simply starts
    /// with an empty queue.
    fn load(&self, path: &Path) -> Result<Vec<Song>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("reading snapshot at {}", path.display()))
            }
        };

        decode_playlist(&bytes).with_context(|| format!("decoding snapshot at {}", path.display()))
    }
}
