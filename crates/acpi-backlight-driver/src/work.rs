//! Deferred work: coalescing requests handed to the panel worker.

use std::sync::Arc;

use bitflags::bitflags;
use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};
use parking_lot::Mutex;

bitflags! {
    /// Pending deferred work.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WorkRequest: u32 {
        /// Write the committed level to the boot-variable store.
        const PERSIST = 1 << 0;
        /// Re-apply the committed level to the hardware.
        const APPLY_BRIGHTNESS = 1 << 1;
    }
}

/// Pending-work mask plus a wake-up signal for the worker.
///
/// Cloning shares the same mask. Repeated schedules before the worker runs
/// coalesce into one wake-up.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    pending: Arc<Mutex<WorkRequest>>,
    signal: Sender<()>,
}

impl WorkQueue {
    /// Create a queue and the receiver the worker waits on.
    #[must_use]
    pub fn new() -> (Self, Receiver<()>) {
        let (signal, wakeups) = bounded(1);
        let queue = Self {
            pending: Arc::new(Mutex::new(WorkRequest::empty())),
            signal,
        };
        (queue, wakeups)
    }

    /// OR `request` into the pending mask and wake the worker.
    pub fn schedule(&self, request: WorkRequest) {
        {
            let mut pending = self.pending.lock();
            *pending |= request;
        }
        match self.signal.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                tracing::debug!(?request, "Work scheduled after the worker stopped");
            }
        }
    }

    /// Snapshot and clear the pending mask.
    pub fn take(&self) -> WorkRequest {
        std::mem::take(&mut *self.pending.lock())
    }

    /// Pending mask without clearing it.
    #[must_use]
    pub fn pending(&self) -> WorkRequest {
        *self.pending.lock()
    }
}

pub(crate) mod request_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::WorkRequest;

    pub fn serialize<S: Serializer>(request: &WorkRequest, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u32(request.bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<WorkRequest, D::Error> {
        u32::deserialize(d).map(WorkRequest::from_bits_truncate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedules_coalesce() {
        let (queue, wakeups) = WorkQueue::new();
        queue.schedule(WorkRequest::PERSIST);
        queue.schedule(WorkRequest::APPLY_BRIGHTNESS);
        queue.schedule(WorkRequest::PERSIST);

        assert_eq!(wakeups.len(), 1);
        assert_eq!(queue.pending(), WorkRequest::all());
        assert_eq!(queue.take(), WorkRequest::all());
        assert_eq!(queue.take(), WorkRequest::empty());
    }

    #[test]
    fn test_clones_share_mask() {
        let (queue, wakeups) = WorkQueue::new();
        let other = queue.clone();
        other.schedule(WorkRequest::PERSIST);
        assert_eq!(queue.take(), WorkRequest::PERSIST);
        assert!(matches!(wakeups.try_recv(), Ok(())));
    }

    #[test]
    fn test_schedule_after_receiver_dropped() {
        let (queue, wakeups) = WorkQueue::new();
        drop(wakeups);
        queue.schedule(WorkRequest::APPLY_BRIGHTNESS);
        assert_eq!(queue.pending(), WorkRequest::APPLY_BRIGHTNESS);
    }
}
