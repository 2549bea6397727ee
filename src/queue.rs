//! The scheduling collaborator contract.
//!
//! Render work is coordinated by an external queue that batches callbacks
//! into read and write phases aligned with the host's paint cycle. This
//! crate only defines the contract, a synchronous implementation for tests
//! and simple embeddings, and the await-bridges the lifecycle controller
//! uses to sequence live-tree mutation into the write phase. Frame-aligned
//! queues belong to the embedder.

use core::cell::Cell;
use futures::channel::oneshot;

/// Milliseconds timestamp handed to phase callbacks.
pub type Timestamp = f64;

/// Read/write-phased work queue.
///
/// Live-tree mutation must only happen through `write`; `read` is for
/// measurement and must not mutate.
pub trait RenderQueue {
	fn tick(&self, callback: Box<dyn FnOnce(Timestamp)>);
	fn read(&self, callback: Box<dyn FnOnce(Timestamp)>);
	fn write(&self, callback: Box<dyn FnOnce(Timestamp)>);
}

/// The queue dropped a phase callback without running it, cancelling
/// whatever was sequenced behind the phase.
#[derive(Debug, thiserror::Error)]
#[error("the scheduler dropped the phase callback without running it")]
pub struct PhaseCanceled;

/// Resolves inside the queue's next write phase.
pub async fn write_phase<Q: RenderQueue + ?Sized>(queue: &Q) -> Result<Timestamp, PhaseCanceled> {
	let (sender, receiver) = oneshot::channel();
	queue.write(Box::new(move |timestamp| {
		let _ = sender.send(timestamp);
	}));
	receiver.await.map_err(|_| PhaseCanceled)
}

/// Resolves inside the queue's next read phase.
pub async fn read_phase<Q: RenderQueue + ?Sized>(queue: &Q) -> Result<Timestamp, PhaseCanceled> {
	let (sender, receiver) = oneshot::channel();
	queue.read(Box::new(move |timestamp| {
		let _ = sender.send(timestamp);
	}));
	receiver.await.map_err(|_| PhaseCanceled)
}

/// A queue without batching: every callback runs inline, with a
/// monotonically increasing timestamp.
#[derive(Debug, Default)]
pub struct ImmediateQueue {
	now: Cell<Timestamp>,
}

impl ImmediateQueue {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	fn advance(&self) -> Timestamp {
		let now = self.now.get() + 1.0;
		self.now.set(now);
		now
	}
}

impl RenderQueue for ImmediateQueue {
	fn tick(&self, callback: Box<dyn FnOnce(Timestamp)>) {
		callback(self.advance());
	}

	fn read(&self, callback: Box<dyn FnOnce(Timestamp)>) {
		callback(self.advance());
	}

	fn write(&self, callback: Box<dyn FnOnce(Timestamp)>) {
		callback(self.advance());
	}
}
