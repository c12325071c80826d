use std::collections::HashMap;
use std::sync::Weak;

use tracing::debug;

use vigil_types::{Requestor, RequestorId, SeekMode, SeekRequest, Timestamp, VideoFrame};

use crate::VideoClip;

#[derive(Debug)]
struct LastServed {
    requestor: Weak<Requestor>,
    time: Timestamp,
}

/// Translates seek requests against a clip into delivered frames or
/// explicit discards.
///
/// The helper remembers the last timestamp served to each requestor so that
/// a repeat request for the same position is a cheap no-op instead of a
/// redundant decode. Tracking entries hold the requestor weakly and are
/// purged once the requestor is gone, so a stale entry can never pin a dead
/// reply channel.
#[derive(Debug, Default)]
pub struct VideoHelper {
    last_frame_times: HashMap<RequestorId, LastServed>,
}

impl VideoHelper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `request` against `clip`.
    ///
    /// Returns the frame to deliver, or `None` after handling the failure:
    /// unresolvable position, no progress over the requestor's previous
    /// frame, and unusable pixel payload all discard the request (an
    /// explicit empty reply when the request carries an id, silence when it
    /// is anonymous).
    pub fn update_frame(&mut self, clip: &VideoClip, request: &SeekRequest) -> Option<VideoFrame> {
        self.purge_dead_requestors();

        let last_time = self
            .last_frame_times
            .get(&request.requestor_id)
            .map(|l| l.time);

        let frame = clip
            .resolve(request.position, request.mode)
            .and_then(|ts| clip.frame_at(ts));

        let frame = match frame {
            Some(frame) if Some(frame.timestamp()) != last_time && frame.image.is_valid() => frame,
            _ => {
                debug!(
                    requestor = request.requestor_id,
                    position = %request.position,
                    "seek request not satisfiable; discarding"
                );
                if !request.is_anonymous() {
                    // The caller is waiting on this id; answer it even
                    // though there is no frame to show.
                    request.discard();
                }
                return None;
            }
        };

        self.last_frame_times.insert(
            request.requestor_id,
            LastServed {
                requestor: request.requestor.clone(),
                time: frame.timestamp(),
            },
        );
        Some(frame)
    }

    /// Forgets the last-served position for `requestor`, e.g. when the
    /// caller detaches from the source.
    pub fn clear_last_request(&mut self, requestor: RequestorId) {
        self.last_frame_times.remove(&requestor);
    }

    fn purge_dead_requestors(&mut self) {
        self.last_frame_times
            .retain(|_, l| l.requestor.strong_count() > 0);
    }

    /// Maps a bare frame number to the timestamp of a stored frame.
    ///
    /// For [SeekMode::Exact] this finds the nearest frame and then verifies
    /// the frame number actually matches: the clip is not guaranteed to
    /// resolve a frame-number-only key exactly even when such a frame
    /// exists. All other modes delegate directly to the clip lookup.
    pub fn find_time(clip: &VideoClip, frame_number: u32, mode: SeekMode) -> Option<Timestamp> {
        let pos = Timestamp::from_frame_number(frame_number);
        match mode {
            SeekMode::Exact => {
                let found = clip.resolve(pos, SeekMode::Nearest)?;
                (found.frame_number == frame_number).then_some(found)
            }
            _ => clip.resolve(pos, mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_types::{FrameImage, FrameMetadata};

    fn test_clip() -> VideoClip {
        let mut clip = VideoClip::new();
        for (i, t) in [10.0, 20.0, 30.0].iter().enumerate() {
            let ts = Timestamp::new(*t, i as u32);
            clip.insert_frame(
                FrameMetadata::new(ts, 4, 4),
                FrameImage::new(4, 4, 4, vec![i as u8; 16]),
            );
        }
        clip
    }

    #[test]
    fn repeat_request_is_discarded_no_op() {
        let clip = test_clip();
        let mut helper = VideoHelper::new();
        let (requestor, replies) = Requestor::new();

        let request = SeekRequest::new(Timestamp::from_time(20.0), SeekMode::Nearest, &requestor, 1);
        let frame = helper.update_frame(&clip, &request).unwrap();
        assert_eq!(frame.timestamp().time, 20.0);

        // Same position again: no progress, explicit empty reply.
        let request = SeekRequest::new(Timestamp::from_time(20.0), SeekMode::Nearest, &requestor, 2);
        assert!(helper.update_frame(&clip, &request).is_none());
        let reply = replies.try_recv().unwrap();
        assert_eq!(reply.request_id, 2);
        assert!(reply.frame.is_none());
    }

    #[test]
    fn anonymous_failure_is_silent() {
        let clip = test_clip();
        let mut helper = VideoHelper::new();
        let (requestor, replies) = Requestor::new();

        let request =
            SeekRequest::anonymous(Timestamp::from_time(5.0), SeekMode::Previous, &requestor);
        assert!(helper.update_frame(&clip, &request).is_none());
        assert!(replies.try_recv().is_err());
    }

    #[test]
    fn unresolvable_named_request_gets_empty_reply() {
        let clip = test_clip();
        let mut helper = VideoHelper::new();
        let (requestor, replies) = Requestor::new();

        let request = SeekRequest::new(Timestamp::from_time(5.0), SeekMode::Previous, &requestor, 9);
        assert!(helper.update_frame(&clip, &request).is_none());
        let reply = replies.try_recv().unwrap();
        assert_eq!(reply.request_id, 9);
        assert!(reply.frame.is_none());
    }

    #[test]
    fn invalid_payload_is_a_failure() {
        let mut clip = VideoClip::new();
        let ts = Timestamp::from_time(10.0);
        clip.insert_frame(FrameMetadata::new(ts, 4, 4), FrameImage::empty());

        let mut helper = VideoHelper::new();
        let (requestor, replies) = Requestor::new();
        let request = SeekRequest::new(ts, SeekMode::Exact, &requestor, 4);
        assert!(helper.update_frame(&clip, &request).is_none());
        assert!(replies.try_recv().unwrap().frame.is_none());
    }

    #[test]
    fn clear_last_request_allows_repeat_delivery() {
        let clip = test_clip();
        let mut helper = VideoHelper::new();
        let (requestor, _replies) = Requestor::new();

        let request = SeekRequest::new(Timestamp::from_time(10.0), SeekMode::Nearest, &requestor, 1);
        assert!(helper.update_frame(&clip, &request).is_some());
        helper.clear_last_request(requestor.id());
        assert!(helper.update_frame(&clip, &request).is_some());
    }

    #[test]
    fn dropped_requestor_entry_is_purged() {
        let clip = test_clip();
        let mut helper = VideoHelper::new();

        let (requestor, _replies) = Requestor::new();
        let request = SeekRequest::new(Timestamp::from_time(10.0), SeekMode::Nearest, &requestor, 1);
        assert!(helper.update_frame(&clip, &request).is_some());
        assert_eq!(helper.last_frame_times.len(), 1);

        drop(_replies);
        drop(requestor);

        // Any later request triggers the purge.
        let (other, _other_replies) = Requestor::new();
        let request = SeekRequest::new(Timestamp::from_time(10.0), SeekMode::Nearest, &other, 1);
        assert!(helper.update_frame(&clip, &request).is_some());
        assert_eq!(helper.last_frame_times.len(), 1);
    }

    #[test]
    fn find_time_exact_verifies_frame_number() {
        let clip = test_clip(); // frame numbers 0, 1, 2
        assert_eq!(
            VideoHelper::find_time(&clip, 1, SeekMode::Exact).map(|t| t.time),
            Some(20.0)
        );
        // Frame 7 does not exist; nearest would land on 2, which must be
        // rejected for Exact.
        assert!(VideoHelper::find_time(&clip, 7, SeekMode::Exact).is_none());
        // Non-exact modes delegate straight to the clip.
        assert_eq!(
            VideoHelper::find_time(&clip, 7, SeekMode::Nearest).map(|t| t.frame_number),
            Some(2)
        );
    }
}
