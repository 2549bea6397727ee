//! The declarative tree model produced by component render functions.
//!
//! A [`VNode`] is either an element or a text run; the mutual exclusivity the
//! reconciler relies on is carried by the type rather than checked at run
//! time. Trees are plain owned data until a [patch](`crate::diff::patch`)
//! associates each node with the live node it produced or reused.

use crate::dom::{Dom, Handler, ListenerOptions};
use core::fmt::{self, Debug, Formatter};
use std::rc::Rc;

/// Stable identity used to match element children across reconciliation.
///
/// Uniqueness among siblings is the caller's responsibility; a duplicate is
/// reported as a [`PatchError`](`crate::diff::PatchError`).
pub type Key = u32;

/// One plain attribute on an element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
	pub name: String,
	pub value: String,
}

impl Attribute {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self { name: name.into(), value: value.into() }
	}
}

/// One event subscription on an element.
///
/// Two bindings are equal when they name the same event, use the same
/// [`ListenerOptions`] and share one handler allocation. A handler that is
/// re-created on every render therefore compares unequal each cycle and is
/// re-attached each cycle; hoist handlers that should be stable.
pub struct EventBinding<D: Dom> {
	pub name: String,
	pub options: ListenerOptions,
	pub handler: Handler<D>,
}

impl<D: Dom> Clone for EventBinding<D> {
	fn clone(&self) -> Self {
		Self {
			name: self.name.clone(),
			options: self.options,
			handler: Rc::clone(&self.handler),
		}
	}
}

impl<D: Dom> PartialEq for EventBinding<D> {
	fn eq(&self, other: &Self) -> bool {
		self.name == other.name && self.options == other.options && Rc::ptr_eq(&self.handler, &other.handler)
	}
}

impl<D: Dom> Debug for EventBinding<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventBinding")
			.field("name", &self.name)
			.field("options", &self.options)
			.field("handler", &Rc::as_ptr(&self.handler))
			.finish()
	}
}

/// One node of a declarative tree snapshot.
pub enum VNode<D: Dom> {
	Element(VElement<D>),
	Text(VText<D>),
}

/// An element node: tag, attributes, event bindings, ordered children.
pub struct VElement<D: Dom> {
	/// Lowercase element name.
	pub name: String,
	/// Optional reconciliation identity among siblings.
	pub key: Option<Key>,
	pub attributes: Vec<Attribute>,
	pub event_bindings: Vec<EventBinding<D>>,
	pub children: Vec<VNode<D>>,
	/// The live node this element produced or reused; set by patching.
	pub node: Option<D::Node>,
}

/// A text node.
pub struct VText<D: Dom> {
	pub text: String,
	/// The live node this text run produced or reused; set by patching.
	pub node: Option<D::Node>,
}

impl<D: Dom> VNode<D> {
	/// Creates a text node.
	pub fn text(text: impl Into<String>) -> Self {
		VNode::Text(VText { text: text.into(), node: None })
	}

	/// The live node currently associated with this VNode, if any.
	#[must_use]
	pub fn node(&self) -> Option<&D::Node> {
		match self {
			VNode::Element(element) => element.node.as_ref(),
			VNode::Text(text) => text.node.as_ref(),
		}
	}

	#[must_use]
	pub fn key(&self) -> Option<Key> {
		match self {
			VNode::Element(element) => element.key,
			VNode::Text(_) => None,
		}
	}

	#[must_use]
	pub fn is_element(&self) -> bool {
		matches!(self, VNode::Element(_))
	}
}

impl<D: Dom> VElement<D> {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			key: None,
			attributes: Vec::new(),
			event_bindings: Vec::new(),
			children: Vec::new(),
			node: None,
		}
	}

	#[must_use]
	pub fn key(mut self, key: Key) -> Self {
		self.key = Some(key);
		self
	}

	#[must_use]
	pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.attributes.push(Attribute::new(name, value));
		self
	}

	/// Subscribes `handler` to `name` events in the bubble phase.
	#[must_use]
	pub fn on(self, name: impl Into<String>, handler: Handler<D>) -> Self {
		self.on_with(name, ListenerOptions::new(), handler)
	}

	#[must_use]
	pub fn on_with(mut self, name: impl Into<String>, options: ListenerOptions, handler: Handler<D>) -> Self {
		self.event_bindings.push(EventBinding { name: name.into(), options, handler });
		self
	}

	#[must_use]
	pub fn child(mut self, child: impl Into<VNode<D>>) -> Self {
		self.children.push(child.into());
		self
	}

	#[must_use]
	pub fn children(mut self, children: impl IntoIterator<Item = VNode<D>>) -> Self {
		self.children.extend(children);
		self
	}
}

impl<D: Dom> From<VElement<D>> for VNode<D> {
	fn from(element: VElement<D>) -> Self {
		VNode::Element(element)
	}
}

impl<D: Dom> From<VText<D>> for VNode<D> {
	fn from(text: VText<D>) -> Self {
		VNode::Text(text)
	}
}

impl<D: Dom> Clone for VNode<D> {
	fn clone(&self) -> Self {
		match self {
			VNode::Element(element) => VNode::Element(element.clone()),
			VNode::Text(text) => VNode::Text(text.clone()),
		}
	}
}

impl<D: Dom> Clone for VElement<D> {
	fn clone(&self) -> Self {
		Self {
			name: self.name.clone(),
			key: self.key,
			attributes: self.attributes.clone(),
			event_bindings: self.event_bindings.clone(),
			children: self.children.clone(),
			node: self.node.clone(),
		}
	}
}

impl<D: Dom> Clone for VText<D> {
	fn clone(&self) -> Self {
		Self {
			text: self.text.clone(),
			node: self.node.clone(),
		}
	}
}

impl<D: Dom> Debug for VNode<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			VNode::Element(element) => element.fmt(f),
			VNode::Text(text) => text.fmt(f),
		}
	}
}

impl<D: Dom> Debug for VElement<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("VElement")
			.field("name", &self.name)
			.field("key", &self.key)
			.field("attributes", &self.attributes)
			.field("event_bindings", &self.event_bindings)
			.field("children", &self.children)
			.field("node", &self.node)
			.finish()
	}
}

impl<D: Dom> Debug for VText<D> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("VText").field("text", &self.text).field("node", &self.node).finish()
	}
}
