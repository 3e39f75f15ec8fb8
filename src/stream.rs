//! Ordered execution queue for asynchronous invocations.
//!
//! A [`Stream`] is an explicit, ordered task list rather than a thread:
//! the `*_async` entry points validate their parameters eagerly, then
//! either run the pixel work immediately (the default stream) or leave it
//! ordered-but-pending until [`Stream::synchronize`]. Tasks may borrow
//! caller-owned images for the stream's scope, which is what makes the
//! "synchronize before reading the output" contract checkable by the
//! borrow checker. Once enqueued, a task always runs to completion; there
//! is no cancellation.

type Task<'scope> = Box<dyn FnOnce() + Send + 'scope>;

/// An ordered queue of denoising operations.
pub struct Stream<'scope> {
    /// `None` means immediate mode: submitted work runs inline.
    pending: Option<Vec<Task<'scope>>>,
}

impl<'scope> Stream<'scope> {
    /// A stream that executes submitted work immediately, making every
    /// call on it synchronous. This is the default.
    pub fn immediate() -> Self {
        Self { pending: None }
    }

    /// A stream that defers submitted work until [`Stream::synchronize`].
    pub fn queued() -> Self {
        Self {
            pending: Some(Vec::new()),
        }
    }

    pub fn is_immediate(&self) -> bool {
        self.pending.is_none()
    }

    /// Number of operations waiting for synchronization.
    pub fn pending_ops(&self) -> usize {
        self.pending.as_ref().map_or(0, Vec::len)
    }

    /// Add an operation to the queue (or run it now on an immediate
    /// stream). Operations run in submission order.
    pub fn enqueue(&mut self, task: impl FnOnce() + Send + 'scope) {
        match &mut self.pending {
            None => task(),
            Some(queue) => queue.push(Box::new(task)),
        }
    }

    /// Run all pending operations in order and return once they finish.
    /// Output images written by queued operations are valid only after
    /// this returns.
    pub fn synchronize(&mut self) {
        if let Some(queue) = &mut self.pending {
            for task in queue.drain(..) {
                task();
            }
        }
    }
}

impl Default for Stream<'_> {
    fn default() -> Self {
        Self::immediate()
    }
}

impl Drop for Stream<'_> {
    /// Queued work always runs; dropping an unsynchronized stream drains it.
    fn drop(&mut self) {
        self.synchronize();
    }
}
