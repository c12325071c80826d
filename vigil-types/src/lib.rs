//! Value types shared across the vigil video review crates.
//!
//! The central type is [Timestamp], a dual-axis position marker indexing a
//! video stream by continuous time, discrete frame number, or both.
//! [TimeMap] is an ordered container keyed by [Timestamp] whose
//! [find](TimeMap::find) operation implements the seek policies of
//! [SeekMode]. The request types ([Requestor], [SeekRequest], [FrameReply])
//! form the asynchronous frame-delivery protocol spoken between a video
//! source worker and its callers.

mod frame;
mod request;
mod timemap;
mod timestamp;

pub use frame::{FrameImage, FrameMetadata, GeoPoint, VideoFrame, WorldBox};
pub use request::{FrameReply, Requestor, RequestorId, SeekRequest};
pub use timemap::{SeekMode, TimeMap};
pub use timestamp::{Timestamp, INVALID_FRAME_NUMBER, INVALID_TIME};
