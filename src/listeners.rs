//! Event listener bookkeeping across patches.
//!
//! The differ never talks to the backend's listener API directly; every
//! attach and detach goes through a [`ListenerMap`] so that, per live node,
//! at most one handler is registered for each (event name, capture, passive)
//! slot at any time, and so a torn-down subtree releases everything it ever
//! registered.

use crate::dom::{Dom, Handler, ListenerOptions, NodeId};
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::trace;

/// The registration slot on one node: event name plus phase/passivity flags.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerKey {
	pub name: String,
	pub options: ListenerOptions,
}

struct ListenerEntry<D: Dom> {
	/// Kept so the registration owns its handler for as long as it is live.
	#[allow(dead_code)]
	handler: Handler<D>,
	handle: D::ListenerHandle,
}

struct NodeSlot<D: Dom> {
	node: D::Node,
	entries: HashMap<ListenerKey, ListenerEntry<D>>,
}

/// All listener registrations owned by one component instance.
pub struct ListenerMap<D: Dom> {
	nodes: HashMap<NodeId, NodeSlot<D>>,
}

impl<D: Dom> Default for ListenerMap<D> {
	fn default() -> Self {
		Self::new()
	}
}

impl<D: Dom> ListenerMap<D> {
	#[must_use]
	pub fn new() -> Self {
		Self { nodes: HashMap::new() }
	}

	/// Registers `handler` on `node`, replacing any previous registration in
	/// the same slot.
	///
	/// The stale registration is removed *before* the new one is added, so
	/// there is no window in which two handlers are live for one slot and no
	/// way for a replaced closure to fire again.
	pub fn attach(&mut self, dom: &D, node: &D::Node, name: &str, options: ListenerOptions, handler: Handler<D>) {
		let id = dom.node_id(node);
		let slot = self.nodes.entry(id).or_insert_with(|| NodeSlot {
			node: node.clone(),
			entries: HashMap::new(),
		});
		let key = ListenerKey { name: name.to_owned(), options };
		if let Some(previous) = slot.entries.remove(&key) {
			trace!(name, "Replacing listener registration.");
			dom.remove_listener(node, name, options, previous.handle);
		}
		let handle = dom.add_listener(node, name, options, Rc::clone(&handler));
		slot.entries.insert(key, ListenerEntry { handler, handle });
	}

	/// Removes the registration in the given slot. Detaching a slot that has
	/// no registration is a no-op, since teardown paths may race with nodes
	/// that are already gone.
	pub fn detach(&mut self, dom: &D, node: &D::Node, name: &str, options: ListenerOptions) {
		let id = dom.node_id(node);
		let slot = match self.nodes.get_mut(&id) {
			Some(slot) => slot,
			None => return trace!(name, "Detach on untracked node ignored."),
		};
		let key = ListenerKey { name: name.to_owned(), options };
		match slot.entries.remove(&key) {
			Some(entry) => dom.remove_listener(node, name, options, entry.handle),
			None => trace!(name, "Detach on empty listener slot ignored."),
		}
		if slot.entries.is_empty() {
			self.nodes.remove(&id);
		}
	}

	/// Releases every registration on `node`. Used when a node leaves the
	/// tree for good.
	pub fn detach_all(&mut self, dom: &D, node: &D::Node) {
		if let Some(slot) = self.nodes.remove(&dom.node_id(node)) {
			let NodeSlot { node, entries } = slot;
			for (key, entry) in entries {
				dom.remove_listener(&node, &key.name, key.options, entry.handle);
			}
		}
	}

	/// Releases everything tracked by this map (component instance teardown).
	pub fn clear(&mut self, dom: &D) {
		for (_, slot) in self.nodes.drain() {
			let NodeSlot { node, entries } = slot;
			for (key, entry) in entries {
				dom.remove_listener(&node, &key.name, key.options, entry.handle);
			}
		}
	}

	/// Number of live registrations across all nodes.
	#[must_use]
	pub fn len(&self) -> usize {
		self.nodes.values().map(|slot| slot.entries.len()).sum()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}
}
