use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Pixel payload of a single decoded frame (8-bit samples, row-major).
///
/// The buffer is shared so replies can be fanned out without copying pixel
/// data.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameImage {
    pub width: u32,
    pub height: u32,
    /// Bytes per row; at least `width`.
    pub stride: usize,
    pub data: Arc<[u8]>,
}

impl FrameImage {
    pub fn new(width: u32, height: u32, stride: usize, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride,
            data: data.into(),
        }
    }

    /// A payload that fails [is_valid](Self::is_valid); used to represent
    /// frames whose decode produced nothing usable.
    pub fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            stride: 0,
            data: Vec::new().into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.stride >= self.width as usize
            && self.data.len() >= self.stride * self.height as usize
    }
}

/// A point in geodetic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// World-space corner points of a frame with the geodetic coordinate
/// system id they are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBox {
    pub gcs: i32,
    pub upper_left: GeoPoint,
    pub upper_right: GeoPoint,
    pub lower_left: GeoPoint,
    pub lower_right: GeoPoint,
}

/// Per-frame metadata carried alongside the pixel payload in a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMetadata {
    pub time: Timestamp,
    pub width: u32,
    pub height: u32,
    /// Ground sample distance in meters per pixel; negative when unknown.
    pub gsd: f64,
    /// Image-to-stabilized homography, row major.
    pub homography: Option<[[f64; 3]; 3]>,
    pub world_location: Option<WorldBox>,
}

impl FrameMetadata {
    pub fn new(time: Timestamp, width: u32, height: u32) -> Self {
        Self {
            time,
            width,
            height,
            gsd: -1.0,
            homography: None,
            world_location: None,
        }
    }
}

/// A frame as delivered to a requestor: pixels plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub image: FrameImage,
    pub metadata: FrameMetadata,
}

impl VideoFrame {
    pub fn timestamp(&self) -> Timestamp {
        self.metadata.time
    }

    pub fn is_valid(&self) -> bool {
        self.metadata.time.is_valid() && self.image.is_valid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_validity() {
        let image = FrameImage::new(4, 2, 4, vec![0u8; 8]);
        assert!(image.is_valid());
        assert!(!FrameImage::empty().is_valid());
        // Short buffer.
        assert!(!FrameImage::new(4, 2, 4, vec![0u8; 7]).is_valid());
        // Stride below width.
        assert!(!FrameImage::new(4, 2, 2, vec![0u8; 8]).is_valid());
    }

    #[test]
    fn frame_validity_needs_timestamp_and_pixels() {
        let metadata = FrameMetadata::new(Timestamp::from_frame_number(0), 2, 2);
        let good = VideoFrame {
            image: FrameImage::new(2, 2, 2, vec![0u8; 4]),
            metadata: metadata.clone(),
        };
        assert!(good.is_valid());

        let no_pixels = VideoFrame {
            image: FrameImage::empty(),
            metadata,
        };
        assert!(!no_pixels.is_valid());

        let no_time = VideoFrame {
            image: FrameImage::new(2, 2, 2, vec![0u8; 4]),
            metadata: FrameMetadata::new(Timestamp::invalid(), 2, 2),
        };
        assert!(!no_time.is_valid());
    }
}
