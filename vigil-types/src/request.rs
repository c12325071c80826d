use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::{SeekMode, Timestamp, VideoFrame};

/// Process-unique identity of a requesting party, used as the coalescing
/// key for pending seek requests.
pub type RequestorId = u64;

static NEXT_REQUESTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Reply to a seek request. `frame: None` is the explicit "no frame"
/// marker delivered when a request with a non-negative id could not be
/// satisfied, so the caller's queue is never left hanging.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReply {
    pub request_id: i64,
    pub frame: Option<VideoFrame>,
}

/// The logical owner of pending frame requests.
///
/// Sources hold the requestor only weakly; once the caller drops its `Arc`
/// the per-requestor tracking state can be purged and any late reply is
/// silently discarded.
#[derive(Debug)]
pub struct Requestor {
    id: RequestorId,
    reply_tx: Sender<FrameReply>,
}

impl Requestor {
    /// Creates a requestor and the receiving half of its reply channel.
    pub fn new() -> (Arc<Requestor>, Receiver<FrameReply>) {
        let (reply_tx, reply_rx) = unbounded();
        let id = NEXT_REQUESTOR_ID.fetch_add(1, Ordering::Relaxed);
        (Arc::new(Requestor { id, reply_tx }), reply_rx)
    }

    pub fn id(&self) -> RequestorId {
        self.id
    }

    pub fn send(&self, reply: FrameReply) {
        // A gone receiver means the caller stopped listening; nothing to do.
        let _ = self.reply_tx.send(reply);
    }
}

/// A request to seek to `position` under `mode` and deliver the resolved
/// frame to `requestor`.
///
/// A negative `request_id` marks the request anonymous: the caller is not
/// waiting on an acknowledgment and failures may be dropped silently. When
/// an anonymous request supersedes a named one in the coalescer it inherits
/// the stored id, so the identity of the named request is never lost.
#[derive(Debug, Clone)]
pub struct SeekRequest {
    pub position: Timestamp,
    pub mode: SeekMode,
    pub requestor: Weak<Requestor>,
    pub requestor_id: RequestorId,
    pub request_id: i64,
}

impl SeekRequest {
    pub fn new(
        position: Timestamp,
        mode: SeekMode,
        requestor: &Arc<Requestor>,
        request_id: i64,
    ) -> Self {
        Self {
            position,
            mode,
            requestor: Arc::downgrade(requestor),
            requestor_id: requestor.id(),
            request_id,
        }
    }

    pub fn anonymous(position: Timestamp, mode: SeekMode, requestor: &Arc<Requestor>) -> Self {
        Self::new(position, mode, requestor, -1)
    }

    pub fn is_anonymous(&self) -> bool {
        self.request_id < 0
    }

    /// Delivers `frame` to the requestor, if it is still alive.
    pub fn send_reply(&self, frame: VideoFrame) {
        if let Some(requestor) = self.requestor.upgrade() {
            requestor.send(FrameReply {
                request_id: self.request_id,
                frame: Some(frame),
            });
        }
    }

    /// Delivers the explicit "no frame" marker, if the requestor is still
    /// alive.
    pub fn discard(&self) {
        if let Some(requestor) = self.requestor.upgrade() {
            requestor.send(FrameReply {
                request_id: self.request_id,
                frame: None,
            });
        }
    }
}
