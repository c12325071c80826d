use vigil_types::{FrameImage, FrameMetadata, SeekMode, TimeMap, Timestamp, VideoFrame};

#[derive(Debug, Clone)]
struct ClipFrame {
    image: FrameImage,
    metadata: FrameMetadata,
}

/// A time-indexed in-memory frame store.
///
/// Frames are keyed by the timestamp in their metadata; inserting a frame
/// with an order-equivalent timestamp replaces the previous one. The
/// container itself is passive; seek policy lives in [TimeMap::find] and
/// request bookkeeping in [crate::VideoHelper].
#[derive(Debug, Clone, Default)]
pub struct VideoClip {
    frames: TimeMap<ClipFrame>,
}

impl VideoClip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_frame(&mut self, metadata: FrameMetadata, image: FrameImage) {
        let key = metadata.time;
        self.frames.insert(key, ClipFrame { image, metadata });
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first_time(&self) -> Option<Timestamp> {
        self.frames.first().map(|(k, _)| *k)
    }

    pub fn last_time(&self) -> Option<Timestamp> {
        self.frames.last().map(|(k, _)| *k)
    }

    pub fn frame_range(&self) -> Option<(Timestamp, Timestamp)> {
        Some((self.first_time()?, self.last_time()?))
    }

    /// The timestamp of the frame a seek at `pos` under `mode` lands on.
    pub fn resolve(&self, pos: Timestamp, mode: SeekMode) -> Option<Timestamp> {
        self.frames.find(pos, mode).map(|(k, _)| *k)
    }

    /// The frame stored exactly at `pos` (order-equivalent key).
    pub fn frame_at(&self, pos: Timestamp) -> Option<VideoFrame> {
        self.frames.get(&pos).map(|f| VideoFrame {
            image: f.image.clone(),
            metadata: f.metadata.clone(),
        })
    }

    pub fn metadata_at(&self, pos: Timestamp) -> Option<FrameMetadata> {
        self.frames.get(&pos).map(|f| f.metadata.clone())
    }

    /// Metadata for every frame, in time order.
    pub fn metadata(&self) -> Vec<FrameMetadata> {
        self.frames.values().map(|f| f.metadata.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip_with_times(times: &[f64]) -> VideoClip {
        let mut clip = VideoClip::new();
        for (i, t) in times.iter().enumerate() {
            let ts = Timestamp::new(*t, i as u32);
            clip.insert_frame(
                FrameMetadata::new(ts, 4, 4),
                FrameImage::new(4, 4, 4, vec![0u8; 16]),
            );
        }
        clip
    }

    #[test]
    fn range_and_count() {
        let clip = clip_with_times(&[10.0, 20.0, 30.0]);
        assert_eq!(clip.frame_count(), 3);
        let (first, last) = clip.frame_range().unwrap();
        assert_eq!(first.time, 10.0);
        assert_eq!(last.time, 30.0);
    }

    #[test]
    fn resolve_follows_seek_mode() {
        let clip = clip_with_times(&[10.0, 20.0, 30.0]);
        let pos = Timestamp::from_time(14.0);
        assert_eq!(clip.resolve(pos, SeekMode::Nearest).map(|t| t.time), Some(10.0));
        assert_eq!(clip.resolve(pos, SeekMode::Next).map(|t| t.time), Some(20.0));
        assert_eq!(clip.resolve(pos, SeekMode::Exact), None);
    }

    #[test]
    fn frame_at_returns_stored_payload() {
        let clip = clip_with_times(&[10.0]);
        let ts = clip.first_time().unwrap();
        let frame = clip.frame_at(ts).unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.timestamp(), ts);
        assert!(clip.frame_at(Timestamp::from_time(11.0)).is_none());
    }

    #[test]
    fn empty_clip_has_no_range() {
        let clip = VideoClip::new();
        assert!(clip.frame_range().is_none());
        assert!(clip.resolve(Timestamp::from_time(1.0), SeekMode::Nearest).is_none());
    }
}
