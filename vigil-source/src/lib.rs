//! Video sources: worker threads serving coalesced seek requests, and the
//! provider-discovery service that matches archive locators to readers.
//!
//! A [VideoSource] owns one worker thread per opened archive. The handle
//! side only enqueues commands and reads snapshots; every touch of the
//! archive itself happens on the worker, so per-requestor request state
//! needs no locking. Seek requests arriving in the same dispatch window are
//! coalesced per requestor ([RequestCoalescer]): the latest request wins
//! and at most one frame is decoded per requestor per flush.
//!
//! [SourceService] finds the right [ArchiveProvider] for an opaque locator
//! with a two-phase quick-test/thorough-test scan, so cheap matches
//! short-circuit and misleading file names still resolve.

mod coalescer;
mod service;
mod stream;
mod video_source;

pub use coalescer::RequestCoalescer;
pub use service::{
    ArchivePluginInfo, ArchiveProvider, ArchiveSourceKind, FrameIndexProvider, SourceCreateMode,
    SourceService,
};
pub use stream::StreamSource;
pub use video_source::VideoSource;

use vigil_types::{FrameMetadata, Timestamp};

/// Lifecycle of a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceStatus {
    /// No archive or stream is attached.
    #[default]
    NoSource,
    /// An archive is attached and no request is being serviced.
    ArchivedIdle,
    /// The worker is servicing a flush of pending requests.
    ArchivedActive,
    /// A stream source has started but has not yet delivered data.
    StreamingPending,
    /// Stream data is arriving.
    StreamingActive,
    /// The stream is connected but currently quiet.
    StreamingIdle,
    /// The stream has ended; archived frames remain requestable.
    StreamingStopped,
}

impl SourceStatus {
    pub fn is_streaming(&self) -> bool {
        matches!(
            self,
            SourceStatus::StreamingPending
                | SourceStatus::StreamingActive
                | SourceStatus::StreamingIdle
                | SourceStatus::StreamingStopped
        )
    }
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SourceStatus::NoSource => "no source",
            SourceStatus::ArchivedIdle => "archived (idle)",
            SourceStatus::ArchivedActive => "archived (active)",
            SourceStatus::StreamingPending => "streaming (pending)",
            SourceStatus::StreamingActive => "streaming (active)",
            SourceStatus::StreamingIdle => "streaming (idle)",
            SourceStatus::StreamingStopped => "streaming (stopped)",
        };
        f.write_str(name)
    }
}

/// Asynchronous notifications emitted by a source worker.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    StatusChanged(SourceStatus),
    FrameRangeAvailable(Timestamp, Timestamp),
    MetadataAvailable(Vec<FrameMetadata>),
}
