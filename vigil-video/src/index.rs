//! The on-disk frame index format (`.vfi`).
//!
//! A frame index is a single JSON document describing the frames of a clip:
//! per-frame timestamps plus optional embedded pixel data. It exists to
//! exercise the seek/request and provider-discovery protocols; it is not a
//! production video format. Frames without embedded data are synthesized as
//! a flat 8-bit fill so payload validity checks still have real pixels to
//! look at.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use vigil_types::{FrameImage, FrameMetadata, Timestamp, WorldBox};

use crate::{Error, Result, VideoClip};

pub const FRAME_INDEX_MAGIC: &str = "vigil-frame-index";
pub const FRAME_INDEX_VERSION: u32 = 1;

/// How many leading bytes [sniff] inspects for the magic string.
const SNIFF_LEN: usize = 256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameIndex {
    pub magic: String,
    pub version: u32,
    pub created: chrono::DateTime<chrono::Utc>,
    pub width: u32,
    pub height: u32,
    /// Ground sample distance in meters per pixel; negative when unknown.
    #[serde(default = "unknown_gsd")]
    pub gsd: f64,
    pub frames: Vec<FrameIndexEntry>,
}

fn unknown_gsd() -> f64 {
    -1.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameIndexEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_number: Option<u32>,
    /// Base64 of `width * height` 8-bit samples; synthesized when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homography: Option<[[f64; 3]; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_location: Option<WorldBox>,
}

impl FrameIndexEntry {
    fn timestamp(&self, index: usize) -> Result<Timestamp> {
        let ts = match (self.time, self.frame_number) {
            (Some(time), Some(frame_number)) => Timestamp::new(time, frame_number),
            (Some(time), None) => Timestamp::from_time(time),
            (None, Some(frame_number)) => Timestamp::from_frame_number(frame_number),
            (None, None) => return Err(Error::InvalidFrameEntry { index }),
        };
        Ok(ts)
    }
}

impl FrameIndex {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            magic: FRAME_INDEX_MAGIC.to_string(),
            version: FRAME_INDEX_VERSION,
            created: chrono::Utc::now(),
            width,
            height,
            gsd: unknown_gsd(),
            frames: Vec::new(),
        }
    }

    pub fn push_frame(&mut self, time: Option<f64>, frame_number: Option<u32>) {
        self.frames.push(FrameIndexEntry {
            time,
            frame_number,
            ..Default::default()
        });
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = BufReader::new(File::open(path)?);
        let index: FrameIndex = serde_json::from_reader(file)?;
        if index.magic != FRAME_INDEX_MAGIC {
            return Err(Error::BadMagic { found: index.magic });
        }
        if index.version != FRAME_INDEX_VERSION {
            return Err(Error::UnsupportedVersion {
                version: index.version,
            });
        }
        Ok(index)
    }

    /// Decodes the index into a clip, synthesizing pixels where the index
    /// carries none.
    pub fn into_clip(self) -> Result<VideoClip> {
        let mut clip = VideoClip::new();
        let stride = self.width as usize;
        let frame_len = stride * self.height as usize;

        for (i, entry) in self.frames.iter().enumerate() {
            let ts = entry.timestamp(i)?;
            let data = match &entry.data {
                Some(b64) => {
                    let data = BASE64.decode(b64)?;
                    if data.len() < frame_len {
                        return Err(Error::ShortFrameData {
                            index: i,
                            got: data.len(),
                            expected: frame_len,
                        });
                    }
                    data
                }
                None => {
                    // Deterministic fill derived from the frame position so
                    // frames are distinguishable in dumps.
                    let shade = (i * 31 % 251) as u8;
                    vec![shade; frame_len]
                }
            };

            let mut metadata = FrameMetadata::new(ts, self.width, self.height);
            metadata.gsd = self.gsd;
            metadata.homography = entry.homography;
            metadata.world_location = entry.world_location;

            clip.insert_frame(metadata, FrameImage::new(self.width, self.height, stride, data));
        }
        Ok(clip)
    }
}

/// Loads and decodes a frame index in one step.
pub fn load_clip<P: AsRef<Path>>(path: P) -> Result<VideoClip> {
    let path = path.as_ref();
    let clip = FrameIndex::load(path)?.into_clip()?;
    if clip.is_empty() {
        return Err(Error::EmptyArchive(path.to_path_buf()));
    }
    debug!(path = %path.display(), frames = clip.frame_count(), "loaded frame index");
    Ok(clip)
}

/// Cheap content check: does the head of the file mention the index magic?
///
/// This is the quick-test half of provider discovery; it tolerates files
/// with a wrong or missing extension without paying a full parse.
pub fn sniff<P: AsRef<Path>>(path: P) -> bool {
    let Ok(mut file) = File::open(path) else {
        return false;
    };
    let mut head = [0u8; SNIFF_LEN];
    let n = match file.read(&mut head) {
        Ok(n) => n,
        Err(_) => return false,
    };
    let head = String::from_utf8_lossy(&head[..n]);
    head.contains(FRAME_INDEX_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> FrameIndex {
        let mut index = FrameIndex::new(4, 4);
        for i in 0..3u32 {
            index.push_frame(Some(10.0 * (i + 1) as f64), Some(i));
        }
        index
    }

    #[test]
    fn roundtrip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.vfi");
        sample_index().save(&path).unwrap();

        let clip = load_clip(&path).unwrap();
        assert_eq!(clip.frame_count(), 3);
        let (first, last) = clip.frame_range().unwrap();
        assert_eq!(first.time, 10.0);
        assert_eq!(last.time, 30.0);
        assert!(clip.frame_at(first).unwrap().is_valid());
    }

    #[test]
    fn embedded_pixel_data_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.vfi");
        let mut index = FrameIndex::new(2, 2);
        index.frames.push(FrameIndexEntry {
            time: Some(1.0),
            data: Some(BASE64.encode([1u8, 2, 3, 4])),
            ..Default::default()
        });
        index.save(&path).unwrap();

        let clip = load_clip(&path).unwrap();
        let frame = clip.frame_at(Timestamp::from_time(1.0)).unwrap();
        assert_eq!(&frame.image.data[..], &[1, 2, 3, 4]);
    }

    #[test]
    fn short_pixel_data_is_rejected() {
        let mut index = FrameIndex::new(4, 4);
        index.frames.push(FrameIndexEntry {
            time: Some(1.0),
            data: Some(BASE64.encode([0u8; 3])),
            ..Default::default()
        });
        assert!(matches!(
            index.into_clip(),
            Err(Error::ShortFrameData { expected: 16, .. })
        ));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.vfi");
        let mut index = sample_index();
        index.magic = "something-else".to_string();
        index.save(&path).unwrap();
        assert!(matches!(
            FrameIndex::load(&path),
            Err(Error::BadMagic { .. })
        ));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.vfi");
        let mut index = sample_index();
        index.version = 99;
        index.save(&path).unwrap();
        assert!(matches!(
            FrameIndex::load(&path),
            Err(Error::UnsupportedVersion { version: 99 })
        ));
    }

    #[test]
    fn empty_index_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.vfi");
        FrameIndex::new(4, 4).save(&path).unwrap();
        assert!(matches!(load_clip(&path), Err(Error::EmptyArchive(_))));
    }

    #[test]
    fn entry_without_axes_is_rejected() {
        let mut index = FrameIndex::new(2, 2);
        index.frames.push(FrameIndexEntry::default());
        assert!(matches!(
            index.into_clip(),
            Err(Error::InvalidFrameEntry { index: 0 })
        ));
    }

    #[test]
    fn sniff_finds_magic_regardless_of_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("misnamed.dat");
        sample_index().save(&path).unwrap();
        assert!(sniff(&path));

        let other = dir.path().join("other.dat");
        std::fs::write(&other, b"not an index").unwrap();
        assert!(!sniff(&other));
        assert!(!sniff(dir.path().join("missing.vfi")));
    }
}
