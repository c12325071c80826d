use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::debug;

use vigil_types::{RequestorId, SeekRequest, Timestamp};
use vigil_video::{ArchiveReader, VideoArchive};

use crate::{RequestCoalescer, SourceEvent, SourceStatus};

pub(crate) enum SourceCommand {
    Request(SeekRequest),
    ClearLastRequest(RequestorId),
    /// Internal: drain the coalescer. Queued by the worker onto its own
    /// channel so that every request sent in the same dispatch window is
    /// coalesced before the flush is serviced.
    Flush,
    Stop,
}

/// Snapshot state a worker maintains for its handle; shared by archive
/// and stream sources.
#[derive(Default)]
pub(crate) struct SharedState {
    pub(crate) status: Mutex<SourceStatus>,
    pub(crate) frame_range: Mutex<Option<(Timestamp, Timestamp)>>,
}

/// Handle to an archive-backed video source running on its own worker
/// thread.
///
/// The handle never touches the archive: it enqueues commands over a FIFO
/// channel and reads status/frame-range snapshots from shared state the
/// worker maintains. Frames come back asynchronously on each requestor's
/// reply channel; lifecycle notifications arrive on the [SourceEvent]
/// receiver returned at construction. Dropping the handle stops and joins
/// the worker.
pub struct VideoSource {
    command_tx: Sender<SourceCommand>,
    shared: Arc<SharedState>,
    worker: Option<JoinHandle<()>>,
}

impl VideoSource {
    /// Opens the archive at `uri` and starts its worker.
    pub fn open(uri: &str) -> vigil_video::Result<(Self, Receiver<SourceEvent>)> {
        let archive = VideoArchive::open(uri)?;
        Ok(Self::from_reader(Box::new(archive)))
    }

    /// Starts a worker around an already-opened reader (e.g. one produced
    /// by provider discovery).
    pub fn from_reader(reader: Box<dyn ArchiveReader>) -> (Self, Receiver<SourceEvent>) {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let shared = Arc::new(SharedState::default());

        let worker_tx = command_tx.clone();
        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("vigil-video-source".into())
            .spawn(move || {
                SourceWorker {
                    reader,
                    coalescer: RequestCoalescer::new(),
                    command_tx: worker_tx,
                    command_rx,
                    event_tx,
                    shared: worker_shared,
                }
                .run();
            })
            .expect("spawn video source worker");

        (
            Self {
                command_tx,
                shared,
                worker: Some(worker),
            },
            event_rx,
        )
    }

    pub fn status(&self) -> SourceStatus {
        *self.shared.status.lock()
    }

    pub fn frame_range(&self) -> Option<(Timestamp, Timestamp)> {
        *self.shared.frame_range.lock()
    }

    pub fn is_streaming(&self) -> bool {
        self.status().is_streaming()
    }

    /// Enqueues a seek request. Requests from the same requestor arriving
    /// before the worker's next flush are coalesced; only the latest is
    /// serviced, under the id-inheritance rule of [RequestCoalescer].
    pub fn request_frame(&self, request: SeekRequest) {
        let _ = self.command_tx.send(SourceCommand::Request(request));
    }

    /// Forgets the last-served position for `requestor` so its next
    /// request is treated as fresh.
    pub fn clear_last_request(&self, requestor: RequestorId) {
        let _ = self
            .command_tx
            .send(SourceCommand::ClearLastRequest(requestor));
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        let _ = self.command_tx.send(SourceCommand::Stop);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

struct SourceWorker {
    reader: Box<dyn ArchiveReader>,
    coalescer: RequestCoalescer,
    command_tx: Sender<SourceCommand>,
    command_rx: Receiver<SourceCommand>,
    event_tx: Sender<SourceEvent>,
    shared: Arc<SharedState>,
}

impl SourceWorker {
    fn run(mut self) {
        debug!(uri = self.reader.uri(), "video source worker starting");
        self.set_status(SourceStatus::ArchivedIdle);

        if let Some((first, last)) = self.reader.frame_range() {
            *self.shared.frame_range.lock() = Some((first, last));
            let _ = self
                .event_tx
                .send(SourceEvent::FrameRangeAvailable(first, last));
        }
        let metadata = self.reader.metadata();
        if !metadata.is_empty() {
            let _ = self.event_tx.send(SourceEvent::MetadataAvailable(metadata));
        }

        while let Ok(command) = self.command_rx.recv() {
            match command {
                SourceCommand::Request(request) => self.queue_frame_request(request),
                SourceCommand::ClearLastRequest(requestor) => {
                    self.reader.clear_last_request(requestor)
                }
                SourceCommand::Flush => self.flush_frame_requests(),
                SourceCommand::Stop => break,
            }
        }
        debug!(uri = self.reader.uri(), "video source worker halting");
    }

    fn queue_frame_request(&mut self, request: SeekRequest) {
        if self.coalescer.queue(request) {
            // First enqueue of the batch: schedule the deferred flush
            // behind everything already sitting in the command queue.
            let _ = self.command_tx.send(SourceCommand::Flush);
        }
    }

    fn flush_frame_requests(&mut self) {
        let requests = self.coalescer.drain();
        if requests.is_empty() {
            return;
        }
        self.set_status(SourceStatus::ArchivedActive);
        for request in &requests {
            self.reader.request_frame(request);
        }
        self.set_status(SourceStatus::ArchivedIdle);
    }

    fn set_status(&self, status: SourceStatus) {
        let mut current = self.shared.status.lock();
        if *current != status {
            *current = status;
            let _ = self.event_tx.send(SourceEvent::StatusChanged(status));
        }
    }
}
