use std::collections::hash_map::Entry;
use std::collections::HashMap;

use vigil_types::{RequestorId, SeekRequest};

/// Per-requestor coalescing of pending seek requests.
///
/// Within one batch (first enqueue until the next flush) only the most
/// recent request per requestor survives, but a named request's identity is
/// never lost: an anonymous request overwriting a named slot inherits the
/// stored id, so the eventual reply still acknowledges the most recent
/// identified request.
#[derive(Debug, Default)]
pub struct RequestCoalescer {
    pending: HashMap<RequestorId, SeekRequest>,
}

impl RequestCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Stores `request` as the pending request for its requestor,
    /// superseding any earlier one. Returns `true` when this was the first
    /// enqueue of the batch, i.e. the caller must schedule a flush.
    pub fn queue(&mut self, mut request: SeekRequest) -> bool {
        let needs_flush = self.pending.is_empty();

        match self.pending.entry(request.requestor_id) {
            Entry::Occupied(mut slot) => {
                if request.request_id < 0 {
                    // Inherit the stored id so the identity of an earlier
                    // named request awaiting its reply is not erased.
                    request.request_id = slot.get().request_id;
                }
                slot.insert(request);
            }
            Entry::Vacant(slot) => {
                slot.insert(request);
            }
        }

        needs_flush
    }

    /// Takes every pending request, ending the batch.
    pub fn drain(&mut self) -> Vec<SeekRequest> {
        self.pending.drain().map(|(_, request)| request).collect()
    }
}
