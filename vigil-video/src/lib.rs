//! Video containers and the frame-request helper.
//!
//! [VideoClip] is a time-indexed in-memory frame store; [VideoHelper]
//! translates seek requests against a clip into delivered frames or
//! explicit discards while tracking per-requestor progress; [VideoArchive]
//! is a clip loaded from an on-disk frame index together with its helper.
//!
//! Frame delivery failures (nothing at the requested position, no progress
//! over the previous request, unusable pixel payload) are data, not errors:
//! they travel back through the reply channel as an explicit empty reply,
//! or not at all for anonymous requests. `Err` is reserved for archive
//! construction problems (missing file, malformed index).

use std::path::PathBuf;

mod archive;
mod clip;
mod helper;
pub mod index;

pub use archive::{ArchiveReader, VideoArchive};
pub use clip::VideoClip;
pub use helper::VideoHelper;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("not a frame index (magic {found:?})")]
    BadMagic { found: String },
    #[error("unsupported frame index version {version}")]
    UnsupportedVersion { version: u32 },
    #[error("archive \"{0}\" contains no frames")]
    EmptyArchive(PathBuf),
    #[error("frame entry {index} carries neither time nor frame number")]
    InvalidFrameEntry { index: usize },
    #[error("frame entry {index} pixel data is {got} bytes, expected {expected}")]
    ShortFrameData {
        index: usize,
        got: usize,
        expected: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
