use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use tracing::debug;

use vigil_types::{FrameImage, FrameMetadata, RequestorId, SeekRequest, Timestamp};
use vigil_video::{VideoClip, VideoHelper};

use crate::video_source::SharedState;
use crate::{RequestCoalescer, SourceEvent, SourceStatus};

enum StreamCommand {
    Ingest(FrameMetadata, FrameImage),
    Request(SeekRequest),
    ClearLastRequest(RequestorId),
    Flush,
    Finish,
    Stop,
}

/// A live source: frames are pushed in over time and extend the clip and
/// the advertised frame range.
///
/// Requests use the same coalesce/flush/reply protocol as an archive-backed
/// [crate::VideoSource]. Status walks StreamingPending (started, nothing
/// received yet) to StreamingActive (data arriving) to StreamingIdle
/// (caught up) and finally StreamingStopped after [finish](Self::finish);
/// archived frames remain requestable after the stream ends.
pub struct StreamSource {
    command_tx: Sender<StreamCommand>,
    shared: Arc<SharedState>,
    worker: Option<JoinHandle<()>>,
}

impl StreamSource {
    pub fn start() -> (Self, Receiver<SourceEvent>) {
        let (command_tx, command_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let shared = Arc::new(SharedState::default());

        let worker_tx = command_tx.clone();
        let worker_shared = shared.clone();
        let worker = std::thread::Builder::new()
            .name("vigil-stream-source".into())
            .spawn(move || {
                StreamWorker {
                    clip: VideoClip::new(),
                    helper: VideoHelper::new(),
                    coalescer: RequestCoalescer::new(),
                    command_tx: worker_tx,
                    command_rx,
                    event_tx,
                    shared: worker_shared,
                    finished: false,
                }
                .run();
            })
            .expect("spawn stream source worker");

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

    /// Feeds one frame into the stream.
    pub fn ingest_frame(&self, metadata: FrameMetadata, image: FrameImage) {
        let _ = self
            .command_tx
            .send(StreamCommand::Ingest(metadata, image));
    }

    /// Marks the end of the stream. Already-ingested frames stay
    /// requestable.
    pub fn finish(&self) {
        let _ = self.command_tx.send(StreamCommand::Finish);
    }

    pub fn request_frame(&self, request: SeekRequest) {
        let _ = self.command_tx.send(StreamCommand::Request(request));
    }

    pub fn clear_last_request(&self, requestor: RequestorId) {
        let _ = self
            .command_tx
            .send(StreamCommand::ClearLastRequest(requestor));
    }
}

impl Drop for StreamSource {
    fn drop(&mut self) {
        let _ = self.command_tx.send(StreamCommand::Stop);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

struct StreamWorker {
    clip: VideoClip,
    helper: VideoHelper,
    coalescer: RequestCoalescer,
    command_tx: Sender<StreamCommand>,
    command_rx: Receiver<StreamCommand>,
    event_tx: Sender<SourceEvent>,
    shared: Arc<SharedState>,
    finished: bool,
}

impl StreamWorker {
    fn run(mut self) {
        debug!("stream source worker starting");
        self.set_status(SourceStatus::StreamingPending);

        loop {
            // Drain without blocking first; an empty queue after activity
            // means the stream is caught up.
            let command = match self.command_rx.try_recv() {
                Ok(command) => command,
                Err(TryRecvError::Empty) => {
                    if !self.finished && self.status() == SourceStatus::StreamingActive {
                        self.set_status(SourceStatus::StreamingIdle);
                    }
                    match self.command_rx.recv() {
                        Ok(command) => command,
                        Err(_) => break,
                    }
                }
                Err(TryRecvError::Disconnected) => break,
            };

            match command {
                StreamCommand::Ingest(metadata, image) => self.ingest(metadata, image),
                StreamCommand::Request(request) => {
                    if self.coalescer.queue(request) {
                        let _ = self.command_tx.send(StreamCommand::Flush);
                    }
                }
                StreamCommand::ClearLastRequest(requestor) => {
                    self.helper.clear_last_request(requestor)
                }
                StreamCommand::Flush => self.flush_frame_requests(),
                StreamCommand::Finish => {
                    self.finished = true;
                    self.set_status(SourceStatus::StreamingStopped);
                }
                StreamCommand::Stop => break,
            }
        }
        debug!("stream source worker halting");
    }

    fn ingest(&mut self, metadata: FrameMetadata, image: FrameImage) {
        if self.finished {
            debug!("frame ingested after stream finish; dropping");
            return;
        }
        self.clip.insert_frame(metadata, image);
        self.set_status(SourceStatus::StreamingActive);

        if let Some((first, last)) = self.clip.frame_range() {
            let changed = {
                let mut range = self.shared.frame_range.lock();
                let changed = *range != Some((first, last));
                *range = Some((first, last));
                changed
            };
            if changed {
                let _ = self
                    .event_tx
                    .send(SourceEvent::FrameRangeAvailable(first, last));
            }
        }
    }

    fn flush_frame_requests(&mut self) {
        for request in self.coalescer.drain() {
            if let Some(frame) = self.helper.update_frame(&self.clip, &request) {
                request.send_reply(frame);
            }
        }
    }

    fn status(&self) -> SourceStatus {
        *self.shared.status.lock()
    }

    fn set_status(&self, status: SourceStatus) {
        let mut current = self.shared.status.lock();
        if *current != status {
            *current = status;
            let _ = self.event_tx.send(SourceEvent::StatusChanged(status));
        }
    }
}
