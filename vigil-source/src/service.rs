use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use vigil_video::{index, ArchiveReader, VideoArchive};

/// How much work a provider may spend deciding whether an archive is its
/// own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCreateMode {
    /// Only very cheap checks: file extension, a one-line header sniff.
    QuickTest,
    /// Expensive validation allowed: open and parse enough to be sure.
    ThoroughTest,
}

/// What kind of data an archive holds. Only video archives are served by
/// the built-in provider; track and event kinds exist as registry metadata
/// for external providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveSourceKind {
    Video,
    Track,
    Event,
}

/// Descriptive metadata a provider exposes for file-dialog filters and
/// diagnostics.
#[derive(Debug, Clone)]
pub struct ArchivePluginInfo {
    pub description: String,
    /// Extensions without the leading dot.
    pub extensions: Vec<String>,
    pub kinds: Vec<ArchiveSourceKind>,
}

/// A pluggable archive reader back end.
///
/// Providers are probed in registration order, first under
/// [SourceCreateMode::QuickTest], then under
/// [SourceCreateMode::ThoroughTest]; returning `None` means "not mine"
/// and is never an error.
pub trait ArchiveProvider: Send + Sync {
    fn identifier(&self) -> &'static str;
    fn plugin_info(&self) -> ArchivePluginInfo;
    fn create_archive_source(
        &self,
        uri: &str,
        mode: SourceCreateMode,
    ) -> Option<Box<dyn ArchiveReader>>;
}

/// Registry of archive providers with two-phase matching.
#[derive(Default)]
pub struct SourceService {
    providers: Vec<Arc<dyn ArchiveProvider>>,
}

impl SourceService {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in providers.
    pub fn with_default_providers() -> Self {
        let mut service = Self::new();
        service.register(Arc::new(FrameIndexProvider));
        service
    }

    pub fn register(&mut self, provider: Arc<dyn ArchiveProvider>) {
        debug!(provider = provider.identifier(), "registered archive provider");
        self.providers.push(provider);
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn plugin_info(&self) -> Vec<ArchivePluginInfo> {
        self.providers.iter().map(|p| p.plugin_info()).collect()
    }

    /// Finds a provider willing to read the archive at `uri`.
    ///
    /// Phase one runs every provider in registration order under
    /// QuickTest so common matches short-circuit without anyone paying
    /// full parse cost; phase two repeats under ThoroughTest to tolerate
    /// misleading names and headers. `None` means no provider claims the
    /// input, which callers must treat as a normal outcome.
    pub fn create_archive_source(&self, uri: &str) -> Option<Box<dyn ArchiveReader>> {
        for mode in [SourceCreateMode::QuickTest, SourceCreateMode::ThoroughTest] {
            for provider in &self.providers {
                debug!(provider = provider.identifier(), ?mode, uri, "probing");
                if let Some(source) = provider.create_archive_source(uri, mode) {
                    info!(
                        provider = provider.identifier(),
                        ?mode,
                        uri,
                        "archive source created"
                    );
                    return Some(source);
                }
            }
        }
        debug!(uri, "no provider claims archive");
        None
    }
}

/// Built-in provider for `.vfi` frame index archives.
pub struct FrameIndexProvider;

impl FrameIndexProvider {
    fn open(&self, uri: &str) -> Option<Box<dyn ArchiveReader>> {
        match VideoArchive::open(uri) {
            Ok(archive) => Some(Box::new(archive)),
            Err(e) => {
                debug!(uri, error = %e, "frame index open failed");
                None
            }
        }
    }
}

impl ArchiveProvider for FrameIndexProvider {
    fn identifier(&self) -> &'static str {
        "frame-index"
    }

    fn plugin_info(&self) -> ArchivePluginInfo {
        ArchivePluginInfo {
            description: "vigil frame index".to_string(),
            extensions: vec!["vfi".to_string()],
            kinds: vec![ArchiveSourceKind::Video],
        }
    }

    fn create_archive_source(
        &self,
        uri: &str,
        mode: SourceCreateMode,
    ) -> Option<Box<dyn ArchiveReader>> {
        match mode {
            SourceCreateMode::QuickTest => {
                let claimed = Path::new(uri)
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("vfi"))
                    || index::sniff(uri);
                if !claimed {
                    return None;
                }
                self.open(uri)
            }
            SourceCreateMode::ThoroughTest => self.open(uri),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use vigil_types::{FrameImage, FrameMetadata, Timestamp};
    use vigil_video::VideoClip;

    fn one_frame_clip() -> VideoClip {
        let mut clip = VideoClip::new();
        clip.insert_frame(
            FrameMetadata::new(Timestamp::from_time(1.0), 2, 2),
            FrameImage::new(2, 2, 2, vec![0u8; 4]),
        );
        clip
    }

    /// Counts probes and accepts only in the configured mode.
    struct ProbeCounter {
        id: &'static str,
        accepts_in: Option<SourceCreateMode>,
        quick_probes: AtomicUsize,
        thorough_probes: AtomicUsize,
    }

    impl ProbeCounter {
        fn new(id: &'static str, accepts_in: Option<SourceCreateMode>) -> Self {
            Self {
                id,
                accepts_in,
                quick_probes: AtomicUsize::new(0),
                thorough_probes: AtomicUsize::new(0),
            }
        }
    }

    impl ArchiveProvider for ProbeCounter {
        fn identifier(&self) -> &'static str {
            self.id
        }

        fn plugin_info(&self) -> ArchivePluginInfo {
            ArchivePluginInfo {
                description: self.id.to_string(),
                extensions: vec![],
                kinds: vec![ArchiveSourceKind::Video],
            }
        }

        fn create_archive_source(
            &self,
            uri: &str,
            mode: SourceCreateMode,
        ) -> Option<Box<dyn ArchiveReader>> {
            match mode {
                SourceCreateMode::QuickTest => self.quick_probes.fetch_add(1, Ordering::SeqCst),
                SourceCreateMode::ThoroughTest => {
                    self.thorough_probes.fetch_add(1, Ordering::SeqCst)
                }
            };
            if self.accepts_in == Some(mode) {
                Some(Box::new(
                    VideoArchive::from_clip(uri, one_frame_clip()).unwrap(),
                ))
            } else {
                None
            }
        }
    }

    #[test]
    fn thorough_phase_runs_only_after_quick_phase_fails() {
        let first = Arc::new(ProbeCounter::new("first", None));
        let second = Arc::new(ProbeCounter::new(
            "second",
            Some(SourceCreateMode::ThoroughTest),
        ));

        let mut service = SourceService::new();
        service.register(first.clone());
        service.register(second.clone());

        let source = service.create_archive_source("mystery.bin");
        assert_eq!(source.unwrap().uri(), "mystery.bin");

        // Phase one scanned both providers and found nothing; phase two
        // stopped at the accepting provider.
        assert_eq!(first.quick_probes.load(Ordering::SeqCst), 1);
        assert_eq!(second.quick_probes.load(Ordering::SeqCst), 1);
        assert_eq!(first.thorough_probes.load(Ordering::SeqCst), 1);
        assert_eq!(second.thorough_probes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn quick_match_short_circuits() {
        let first = Arc::new(ProbeCounter::new("first", Some(SourceCreateMode::QuickTest)));
        let second = Arc::new(ProbeCounter::new("second", None));

        let mut service = SourceService::new();
        service.register(first.clone());
        service.register(second.clone());

        assert!(service.create_archive_source("a.vfi").is_some());
        assert_eq!(first.quick_probes.load(Ordering::SeqCst), 1);
        assert_eq!(second.quick_probes.load(Ordering::SeqCst), 0);
        assert_eq!(second.thorough_probes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn no_provider_is_a_normal_outcome() {
        let service = SourceService::new();
        assert!(service.create_archive_source("anything.vfi").is_none());

        let mut service = SourceService::new();
        service.register(Arc::new(ProbeCounter::new("never", None)));
        assert!(service.create_archive_source("anything.vfi").is_none());
    }

    #[test]
    fn default_registry_lists_frame_index_plugin() {
        let service = SourceService::with_default_providers();
        assert_eq!(service.provider_count(), 1);
        let info = &service.plugin_info()[0];
        assert_eq!(info.extensions, vec!["vfi".to_string()]);
        assert_eq!(info.kinds, vec![ArchiveSourceKind::Video]);
    }

    #[test]
    fn frame_index_provider_rejects_foreign_extension_quickly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain text").unwrap();

        let provider = FrameIndexProvider;
        let uri = path.to_str().unwrap();
        assert!(provider
            .create_archive_source(uri, SourceCreateMode::QuickTest)
            .is_none());
        assert!(provider
            .create_archive_source(uri, SourceCreateMode::ThoroughTest)
            .is_none());
    }
}
