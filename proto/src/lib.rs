//! Generated gRPC types for the jukebox coordination kernel.
//!
//! Kept as a thin wrapper crate around [`tonic::include_proto!`], the same
//! pattern `termusiclib::player` uses to isolate generated code behind a
//! `#[allow(clippy::pedantic)]` boundary.

#[allow(clippy::pedantic, clippy::all)]
mod generated {
    tonic::include_proto!("jukebox");
}

pub use generated::*;
