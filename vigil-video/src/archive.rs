use tracing::info;

use vigil_types::{FrameMetadata, RequestorId, SeekMode, SeekRequest, Timestamp};

use crate::{index, Error, Result, VideoClip, VideoHelper};

/// Object-safe interface to an opened archive.
///
/// A source worker thread owns the reader and is the only caller of its
/// `&mut` methods; the handle side never touches it directly. Archive
/// providers hand out boxed readers, so a source can run against any
/// archive flavor without knowing its format.
pub trait ArchiveReader: Send {
    fn uri(&self) -> &str;
    fn frame_range(&self) -> Option<(Timestamp, Timestamp)>;
    /// Metadata for every frame, in time order. May be empty for sources
    /// that do not know their frames up front.
    fn metadata(&self) -> Vec<FrameMetadata>;
    /// Resolves `request` and delivers the frame (or an explicit discard)
    /// through the request's reply channel.
    fn request_frame(&mut self, request: &SeekRequest);
    fn clear_last_request(&mut self, requestor: RequestorId);
    fn find_time(&self, frame_number: u32, mode: SeekMode) -> Option<Timestamp>;
}

/// A static archive: a clip loaded from an on-disk frame index plus the
/// per-requestor request helper.
#[derive(Debug)]
pub struct VideoArchive {
    uri: String,
    clip: VideoClip,
    helper: VideoHelper,
}

impl VideoArchive {
    /// Opens the frame index at `uri` (a filesystem path).
    pub fn open(uri: &str) -> Result<Self> {
        let clip = index::load_clip(uri)?;
        info!(uri, frames = clip.frame_count(), "opened video archive");
        Ok(Self {
            uri: uri.to_string(),
            clip,
            helper: VideoHelper::new(),
        })
    }

    /// Wraps an already-built clip; used by stream ingest and tests.
    pub fn from_clip(uri: impl Into<String>, clip: VideoClip) -> Result<Self> {
        let uri = uri.into();
        if clip.is_empty() {
            return Err(Error::EmptyArchive(uri.into()));
        }
        Ok(Self {
            uri,
            clip,
            helper: VideoHelper::new(),
        })
    }

    pub fn clip(&self) -> &VideoClip {
        &self.clip
    }
}

impl ArchiveReader for VideoArchive {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn frame_range(&self) -> Option<(Timestamp, Timestamp)> {
        self.clip.frame_range()
    }

    fn metadata(&self) -> Vec<FrameMetadata> {
        self.clip.metadata()
    }

    fn request_frame(&mut self, request: &SeekRequest) {
        if let Some(frame) = self.helper.update_frame(&self.clip, request) {
            request.send_reply(frame);
        }
    }

    fn clear_last_request(&mut self, requestor: RequestorId) {
        self.helper.clear_last_request(requestor);
    }

    fn find_time(&self, frame_number: u32, mode: SeekMode) -> Option<Timestamp> {
        VideoHelper::find_time(&self.clip, frame_number, mode)
    }
}
