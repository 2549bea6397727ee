//! Tree reconciliation.
//!
//! [`patch`] compares an old [`VNode`] tree (or nothing) against a new one
//! and mutates the live tree under a target node until it matches the new
//! description, reusing live nodes wherever an explicit match signal allows
//! it. Listener registrations are kept consistent through the
//! [`ListenerMap`] as a side effect of element reconciliation.
//!
//! # Correct use
//!
//! The old tree must be the value returned by the previous [`patch`] over
//! the same target (or a [`to_vnode`](`crate::load::to_vnode`) conversion of
//! pre-rendered content): reconciliation trusts its live-node references.
//! Sibling keys must be unique; a duplicate is reported as
//! [`PatchError::DuplicateKey`] rather than guessed around.

use crate::{
	dom::{Dom, DomError},
	listeners::ListenerMap,
	vdom::{Attribute, EventBinding, Key, VNode},
};
use core::convert::TryFrom;
use hashbrown::{hash_map::Entry, HashMap, HashSet};
use std::rc::Rc;
use tracing::{instrument, trace, trace_span};

/// Caller contract violation encountered mid-reconciliation.
///
/// These are defects, not recoverable conditions: the pass fails fast and
/// the live tree may be left partially updated.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
	#[error("old tree refers to a live node that was never materialized")]
	MissingLiveNode,
	#[error("duplicate key {0} among sibling children")]
	DuplicateKey(Key),
	#[error(transparent)]
	Dom(#[from] DomError),
}

/// Reconciles `new` against `old` under `target`, returning `new` with every
/// live-node reference populated.
///
/// With `old` absent the tree is built from scratch and attached; otherwise
/// exactly one live subtree is left under `target`, matching the shape of
/// `new`. Patching a tree against a structurally identical one performs zero
/// live-tree mutations.
#[instrument(skip(dom, listeners, old, new))]
pub fn patch<D: Dom>(
	dom: &D,
	listeners: &mut ListenerMap<D>,
	target: &D::Node,
	old: Option<VNode<D>>,
	new: VNode<D>,
) -> Result<VNode<D>, PatchError> {
	let mut new = new;
	Patcher { dom, listeners }.patch_node(old, &mut new, target, None)?;
	dom.finish_patch();
	Ok(new)
}

/// Removes a previously patched subtree from under `parent`, releasing every
/// listener registered anywhere within it first.
#[instrument(skip(dom, listeners, old))]
pub fn teardown<D: Dom>(dom: &D, listeners: &mut ListenerMap<D>, parent: &D::Node, old: VNode<D>) -> Result<(), PatchError> {
	Patcher { dom, listeners }.remove_node(parent, old)?;
	dom.finish_patch();
	Ok(())
}

/// Attribute reconciliation: stale names are removed, then new or changed
/// names are set. Equal leading and trailing runs are skipped up front, so a
/// repeated attribute list touches nothing.
pub(crate) fn update_attributes<D: Dom>(dom: &D, node: &D::Node, old: &[Attribute], new: &[Attribute]) -> Result<(), DomError> {
	let (mut old, mut new) = (old, new);
	while let (Some(first_old), Some(first_new)) = (old.first(), new.first()) {
		if first_old != first_new {
			break;
		}
		old = &old[1..];
		new = &new[1..];
	}
	while let (Some(last_old), Some(last_new)) = (old.last(), new.last()) {
		if last_old != last_new {
			break;
		}
		old = &old[..old.len() - 1];
		new = &new[..new.len() - 1];
	}
	if old.is_empty() && new.is_empty() {
		return Ok(());
	}

	let kept: HashSet<&str> = new.iter().map(|attribute| attribute.name.as_str()).collect();
	for removed in old.iter().filter(|attribute| !kept.contains(attribute.name.as_str())) {
		trace!(name = %removed.name, "Removing attribute.");
		dom.remove_attribute(node, &removed.name);
	}

	let previous: HashMap<&str, &str> = old.iter().map(|attribute| (attribute.name.as_str(), attribute.value.as_str())).collect();
	for added in new {
		if previous.get(added.name.as_str()) != Some(&added.value.as_str()) {
			trace!(name = %added.name, value = %added.value, "Setting attribute.");
			dom.set_attribute(node, &added.name, &added.value)?;
		}
	}
	Ok(())
}

struct Patcher<'a, D: Dom> {
	dom: &'a D,
	listeners: &'a mut ListenerMap<D>,
}

impl<'a, D: Dom> Patcher<'a, D> {
	fn patch_node(&mut self, old: Option<VNode<D>>, new: &mut VNode<D>, parent: &D::Node, before: Option<&D::Node>) -> Result<(), PatchError> {
		match (old, &mut *new) {
			(None, new) => self.create_node(new, parent, before),

			(Some(VNode::Text(old)), VNode::Text(new)) => {
				let node = old.node.ok_or(PatchError::MissingLiveNode)?;
				if old.text != new.text {
					trace!(from = %old.text, to = %new.text, "Updating text in place.");
					self.dom.set_text(&node, &new.text);
				}
				new.node = Some(node);
				Ok(())
			}

			(Some(VNode::Element(old)), VNode::Element(new)) if old.name == new.name => {
				let span = trace_span!("Updating element", tag = %new.name);
				let _enter = span.enter();
				let node = old.node.clone().ok_or(PatchError::MissingLiveNode)?;
				new.node = Some(node.clone());
				update_attributes(self.dom, &node, &old.attributes, &new.attributes)?;
				self.update_event_bindings(&node, &old.event_bindings, &new.event_bindings);
				self.update_children(&node, old.children, &mut new.children)
			}

			// Mismatching kind or tag: create the replacement in position,
			// then tear the old subtree down. No child reuse across a
			// replacement.
			(Some(old), new) => {
				let span = trace_span!("Replacing mismatching node");
				let _enter = span.enter();
				let old_node = old.node().cloned().ok_or(PatchError::MissingLiveNode)?;
				self.create_node(new, parent, Some(&old_node))?;
				self.remove_node(parent, old)
			}
		}
	}

	fn create_node(&mut self, new: &mut VNode<D>, parent: &D::Node, before: Option<&D::Node>) -> Result<(), PatchError> {
		match new {
			VNode::Text(text) => {
				trace!(text = %text.text, "Creating text node.");
				let node = self.dom.create_text(&text.text);
				self.dom.insert_before(parent, &node, before)?;
				text.node = Some(node);
			}
			VNode::Element(element) => {
				let span = trace_span!("Creating element", tag = %element.name);
				let _enter = span.enter();
				let node = self.dom.create_element(&element.name)?;
				for attribute in &element.attributes {
					self.dom.set_attribute(&node, &attribute.name, &attribute.value)?;
				}
				for binding in &element.event_bindings {
					self.listeners.attach(self.dom, &node, &binding.name, binding.options, Rc::clone(&binding.handler));
				}
				for child in &mut element.children {
					self.create_node(child, &node, None)?;
				}
				self.dom.insert_before(parent, &node, before)?;
				element.node = Some(node);
			}
		}
		Ok(())
	}

	fn remove_node(&mut self, parent: &D::Node, old: VNode<D>) -> Result<(), PatchError> {
		let node = old.node().cloned().ok_or(PatchError::MissingLiveNode)?;
		self.release_subtree(&old);
		self.dom.remove_child(parent, &node)?;
		Ok(())
	}

	/// Releases listener registrations for `old` and everything below it
	/// without touching the live tree itself.
	fn release_subtree(&mut self, old: &VNode<D>) {
		if let VNode::Element(element) = old {
			if let Some(node) = &element.node {
				self.listeners.detach_all(self.dom, node);
			}
			for child in &element.children {
				self.release_subtree(child);
			}
		}
	}

	/// Event binding reconciliation, in the fixed order "remove stale, then
	/// attach changed": a replaced handler's registration is gone before its
	/// successor goes live, so no slot ever carries two handlers and no
	/// stale closure can fire.
	fn update_event_bindings(&mut self, node: &D::Node, old: &[EventBinding<D>], new: &[EventBinding<D>]) {
		let (mut old, mut new) = (old, new);
		while let (Some(first_old), Some(first_new)) = (old.first(), new.first()) {
			if first_old != first_new {
				break;
			}
			old = &old[1..];
			new = &new[1..];
		}
		while let (Some(last_old), Some(last_new)) = (old.last(), new.last()) {
			if last_old != last_new {
				break;
			}
			old = &old[..old.len() - 1];
			new = &new[..new.len() - 1];
		}
		if old.is_empty() && new.is_empty() {
			return;
		}

		let kept: HashSet<BindingIdent<'_>> = new.iter().map(BindingIdent::of).collect();
		for stale in old.iter().filter(|binding| !kept.contains(&BindingIdent::of(binding))) {
			self.listeners.detach(self.dom, node, &stale.name, stale.options);
		}

		let had: HashSet<BindingIdent<'_>> = old.iter().map(BindingIdent::of).collect();
		for added in new.iter().filter(|binding| !had.contains(&BindingIdent::of(binding))) {
			self.listeners.attach(self.dom, node, &added.name, added.options, Rc::clone(&added.handler));
		}
	}

	/// Child list reconciliation: a dual-ends walk with keyed fallback.
	///
	/// Live nodes are reused only on an explicit match signal — key equality
	/// (including "both unkeyed") plus tag equality for elements, or both
	/// sides being text. Unkeyed children never match by lookup, only
	/// positionally at the walk boundaries.
	#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss, clippy::too_many_lines)]
	fn update_children(&mut self, parent: &D::Node, old: Vec<VNode<D>>, new: &mut Vec<VNode<D>>) -> Result<(), PatchError> {
		let span = trace_span!("Reconciling children", old = old.len(), new = new.len());
		let _enter = span.enter();

		let mut old: Vec<Option<VNode<D>>> = old.into_iter().map(Some).collect();
		let mut old_start: usize = 0;
		let mut old_end: isize = old.len() as isize - 1;
		let mut new_start: usize = 0;
		let mut new_end: isize = new.len() as isize - 1;
		let mut keyed_index: Option<HashMap<Key, usize>> = None;

		while old_start as isize <= old_end && new_start as isize <= new_end {
			// Consumed out-of-order slots are skipped over.
			if old[old_start].is_none() {
				old_start += 1;
				continue;
			}
			if old[old_end as usize].is_none() {
				old_end -= 1;
				continue;
			}

			if reusable(&old[old_start], &new[new_start]) {
				let taken = old[old_start].take();
				self.patch_node(taken, &mut new[new_start], parent, None)?;
				old_start += 1;
				new_start += 1;
			} else if reusable(&old[old_end as usize], &new[new_end as usize]) {
				let taken = old[old_end as usize].take();
				self.patch_node(taken, &mut new[new_end as usize], parent, None)?;
				old_end -= 1;
				new_end -= 1;
			} else if reusable(&old[old_start], &new[new_end as usize]) {
				// Leading node moved towards the end: patch, then re-insert
				// right behind the current trailing boundary.
				trace!("Moving leading child towards the end.");
				let anchor = old[old_end as usize].as_ref().and_then(VNode::node).and_then(|node| self.dom.next_sibling(node));
				let taken = old[old_start].take();
				self.patch_node(taken, &mut new[new_end as usize], parent, None)?;
				let moved = new[new_end as usize].node().cloned().ok_or(PatchError::MissingLiveNode)?;
				self.dom.insert_before(parent, &moved, anchor.as_ref())?;
				old_start += 1;
				new_end -= 1;
			} else if reusable(&old[old_end as usize], &new[new_start]) {
				// Trailing node moved towards the start.
				trace!("Moving trailing child towards the start.");
				let anchor = old[old_start].as_ref().and_then(VNode::node).cloned();
				let taken = old[old_end as usize].take();
				self.patch_node(taken, &mut new[new_start], parent, None)?;
				let moved = new[new_start].node().cloned().ok_or(PatchError::MissingLiveNode)?;
				self.dom.insert_before(parent, &moved, anchor.as_ref())?;
				old_end -= 1;
				new_start += 1;
			} else {
				// No boundary match: reuse by key if one is present among
				// the remaining old children, otherwise create fresh.
				if keyed_index.is_none() {
					keyed_index = Some(build_key_index(&old, old_start, old_end)?);
					debug_assert_distinct_keys(&new[new_start..=new_end as usize]);
				}
				let matched = match (new[new_start].key(), &keyed_index) {
					(Some(key), Some(index)) => index.get(&key).copied(),
					_ => None,
				};
				let anchor = old[old_start].as_ref().and_then(VNode::node).cloned();
				match matched {
					Some(i) if reusable(&old[i], &new[new_start]) => {
						trace!("Moving keyed child into position.");
						let taken = old[i].take();
						self.patch_node(taken, &mut new[new_start], parent, None)?;
						let moved = new[new_start].node().cloned().ok_or(PatchError::MissingLiveNode)?;
						self.dom.insert_before(parent, &moved, anchor.as_ref())?;
					}
					_ => {
						trace!("No reuse signal; creating fresh child.");
						self.create_node(&mut new[new_start], parent, anchor.as_ref())?;
					}
				}
				new_start += 1;
			}
		}

		if old_start as isize > old_end {
			// Old children exhausted: whatever is left of the new list goes
			// in before the already-patched trailing boundary.
			let anchor = usize::try_from(new_end + 1)
				.ok()
				.and_then(|i| new.get(i))
				.and_then(VNode::node)
				.cloned();
			let mut i = new_start;
			while i as isize <= new_end {
				self.create_node(&mut new[i], parent, anchor.as_ref())?;
				i += 1;
			}
		} else if new_start as isize > new_end {
			// New children exhausted: unconsumed old children are gone.
			let mut i = old_start;
			while i as isize <= old_end {
				if let Some(removed) = old[i].take() {
					self.remove_node(parent, removed)?;
				}
				i += 1;
			}
		}
		Ok(())
	}
}

/// Identity of an event binding for set comparison: slot plus handler
/// allocation.
#[derive(PartialEq, Eq, Hash)]
struct BindingIdent<'a>(&'a str, crate::dom::ListenerOptions, usize);

impl<'a> BindingIdent<'a> {
	fn of<D: Dom>(binding: &'a EventBinding<D>) -> Self {
		Self(&binding.name, binding.options, Rc::as_ptr(&binding.handler).cast::<()>() as usize)
	}
}

/// The explicit match signal required for live-node reuse: both text, or
/// elements with equal key (possibly both absent) and equal tag.
fn reusable<D: Dom>(old: &Option<VNode<D>>, new: &VNode<D>) -> bool {
	old.as_ref().map_or(false, |old| match (old, new) {
		(VNode::Text(_), VNode::Text(_)) => true,
		(VNode::Element(old), VNode::Element(new)) => old.key == new.key && old.name == new.name,
		_ => false,
	})
}

#[allow(clippy::cast_sign_loss)]
fn build_key_index<D: Dom>(old: &[Option<VNode<D>>], start: usize, end: isize) -> Result<HashMap<Key, usize>, PatchError> {
	let mut index = HashMap::new();
	for (i, slot) in old.iter().enumerate().take(end as usize + 1).skip(start) {
		if let Some(key) = slot.as_ref().and_then(VNode::key) {
			match index.entry(key) {
				Entry::Occupied(_) => return Err(PatchError::DuplicateKey(key)),
				Entry::Vacant(vacant) => {
					vacant.insert(i);
				}
			}
		}
	}
	Ok(index)
}

fn debug_assert_distinct_keys<D: Dom>(new: &[VNode<D>]) {
	if cfg!(debug_assertions) {
		let keyed = new.iter().filter_map(VNode::key).count();
		let distinct = new.iter().filter_map(VNode::key).collect::<HashSet<_>>().len();
		debug_assert_eq!(keyed, distinct, "Duplicate key among new sibling children");
	}
}
