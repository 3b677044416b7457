use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[clap(name = "jukebox-server", author, version, about, long_about = None)]
pub struct Args {
    /// Bind on 0.0.0.0 instead of 127.0.0.1. Only ever turns this on; leave
    /// it unset to use whatever `server.toml` says.
    #[arg(long)]
    pub all: bool,

    /// Port to listen on, overriding `server.toml` if set.
    #[arg(long)]
    pub port: Option<u16>,

    /// Existing snapshot file to pre-populate the queue from.
    #[arg(long)]
    pub load: Option<PathBuf>,

    /// Path to the user/room/song sqlite database, overriding `server.toml`
    /// if set.
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Path to a file containing the video-service API key. If absent, the
    /// fetcher falls back to a command-line extractor.
    #[arg(long = "apiKey")]
    pub api_key: Option<PathBuf>,

    /// Path the queue is snapshotted to after every mutation, overriding
    /// `server.toml` if set.
    #[arg(long)]
    pub snapshot: Option<PathBuf>,

    #[clap(flatten)]
    pub log_options: LogOptions,
}

const DEFAULT_LOGFILE_FILENAME: &str = "jukebox-server.log";

#[derive(Debug, Parser, Clone, PartialEq)]
pub struct LogOptions {
    /// Enable logging to a file, automatically enabled if `log-file` is set.
    #[arg(long = "log-to-file", env = "JUKEBOX_LOGTOFILE", default_value_t = false)]
    pub log_to_file: bool,

    /// Set logging file.
    #[arg(long = "log-file", default_value_os_t = default_logfile_path(), env = "JUKEBOX_LOGFILE")]
    pub log_file: PathBuf,

    /// Use colored logging for files, e.g. for `tail -f`.
    #[arg(long = "log-filecolor", env = "JUKEBOX_LOGFILE_COLOR")]
    pub file_color_log: bool,
}

fn default_logfile_path() -> PathBuf {
    std::env::temp_dir().join(DEFAULT_LOGFILE_FILENAME)
}
