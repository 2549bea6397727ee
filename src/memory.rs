//! A self-contained live tree.
//!
//! [`MemoryDom`] implements the [`Dom`] seam over plain reference-counted
//! nodes: no platform, no bindings, just enough document semantics for
//! reconciliation to be exercised and *observed*. Event dispatch walks
//! capture → target → bubble so listener behavior is testable end to end, a
//! mutation counter makes "this patch touched nothing" checkable, and a
//! deterministic serializer turns subtrees into compact markup for
//! assertions.

use crate::dom::{Dom, DomError, Handler, ListenerOptions, NodeId, NodeKind};
use core::{
	cell::{Cell, RefCell},
	fmt::{self, Debug, Formatter, Write},
};
use hashbrown::HashMap;
use std::rc::{Rc, Weak};
use tracing::trace;

/// Handle to one node of a [`MemoryDom`] tree. Clones refer to the same
/// node; equality is node identity.
#[derive(Clone)]
pub struct NodeHandle(Rc<RefCell<NodeData>>);

impl PartialEq for NodeHandle {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Debug for NodeHandle {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let data = self.0.borrow();
		match &data.content {
			NodeContent::Element { tag, .. } => write!(f, "NodeHandle(<{}> #{})", tag, data.id),
			NodeContent::Text(text) => write!(f, "NodeHandle({:?} #{})", text, data.id),
			NodeContent::Comment(text) => write!(f, "NodeHandle(<!--{}--> #{})", text, data.id),
			NodeContent::ShadowRoot => write!(f, "NodeHandle(#shadow-root #{})", data.id),
		}
	}
}

/// Event payload delivered to handlers by [`MemoryDom::dispatch`].
#[derive(Clone, Debug)]
pub struct MemoryEvent {
	pub name: String,
	pub target: NodeHandle,
}

struct NodeData {
	id: u64,
	parent: Weak<RefCell<NodeData>>,
	children: Vec<NodeHandle>,
	content: NodeContent,
}

enum NodeContent {
	Element {
		tag: String,
		attributes: Vec<(String, String)>,
		listeners: HashMap<(String, ListenerOptions), Handler<MemoryDom>>,
		shadow: Option<NodeHandle>,
	},
	Text(String),
	Comment(String),
	ShadowRoot,
}

/// The in-memory backend.
#[derive(Debug)]
pub struct MemoryDom {
	head: NodeHandle,
	next_id: Cell<u64>,
	mutations: Cell<u64>,
}

impl Default for MemoryDom {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryDom {
	#[must_use]
	pub fn new() -> Self {
		Self {
			head: NodeHandle(Rc::new(RefCell::new(NodeData {
				id: 0,
				parent: Weak::new(),
				children: Vec::new(),
				content: NodeContent::Element {
					tag: "head".to_owned(),
					attributes: Vec::new(),
					listeners: HashMap::new(),
					shadow: None,
				},
			}))),
			next_id: Cell::new(1),
			mutations: Cell::new(0),
		}
	}

	/// The document-context sink that [`append_style`](`Dom::append_style`)
	/// targets when no subtree root is given.
	#[must_use]
	pub fn head(&self) -> NodeHandle {
		self.head.clone()
	}

	/// Total count of live-tree mutations so far (node moves and removals,
	/// text and attribute writes, listener registrations and removals).
	#[must_use]
	pub fn mutations(&self) -> u64 {
		self.mutations.get()
	}

	pub fn reset_mutations(&self) {
		self.mutations.set(0);
	}

	/// Creates a comment node — a node kind reconciliation does not model,
	/// for exercising the skip paths.
	#[must_use]
	pub fn create_comment(&self, text: &str) -> NodeHandle {
		self.new_node(NodeContent::Comment(text.to_owned()))
	}

	/// The shadow root previously attached to `host`, if any.
	#[must_use]
	pub fn shadow_root(&self, host: &NodeHandle) -> Option<NodeHandle> {
		match &host.0.borrow().content {
			NodeContent::Element { shadow, .. } => shadow.clone(),
			_ => None,
		}
	}

	/// Fires an event at `target`: capture phase down the ancestor chain,
	/// then the target's own handlers, then the bubble phase back up.
	/// Returns how many handlers ran.
	pub fn dispatch(&self, target: &NodeHandle, name: &str) -> usize {
		let event = MemoryEvent { name: name.to_owned(), target: target.clone() };

		// Ancestors, target-closest first.
		let mut chain = Vec::new();
		let mut current = target.0.borrow().parent.upgrade();
		while let Some(node) = current {
			current = node.borrow().parent.upgrade();
			chain.push(NodeHandle(node));
		}

		let mut invoked = 0;
		for ancestor in chain.iter().rev() {
			invoked += invoke(ancestor, name, Some(true), &event);
		}
		invoked += invoke(target, name, None, &event);
		for ancestor in &chain {
			invoked += invoke(ancestor, name, Some(false), &event);
		}
		trace!(name, invoked, "Dispatched event.");
		invoked
	}

	/// Serializes `node` and its subtree as compact markup, attributes in
	/// insertion order. Stable; intended for assertions.
	#[must_use]
	pub fn outer_html(&self, node: &NodeHandle) -> String {
		let mut out = String::new();
		serialize(node, &mut out);
		out
	}

	fn new_node(&self, content: NodeContent) -> NodeHandle {
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		NodeHandle(Rc::new(RefCell::new(NodeData {
			id,
			parent: Weak::new(),
			children: Vec::new(),
			content,
		})))
	}

	fn mutated(&self) {
		self.mutations.set(self.mutations.get() + 1);
	}
}

impl Dom for MemoryDom {
	type Node = NodeHandle;
	type Event = MemoryEvent;
	type ListenerHandle = ();

	fn create_element(&self, tag: &str) -> Result<NodeHandle, DomError> {
		if tag.is_empty() {
			return Err(DomError::Platform("empty tag name".to_owned()));
		}
		Ok(self.new_node(NodeContent::Element {
			tag: tag.to_ascii_lowercase(),
			attributes: Vec::new(),
			listeners: HashMap::new(),
			shadow: None,
		}))
	}

	fn create_text(&self, text: &str) -> NodeHandle {
		self.new_node(NodeContent::Text(text.to_owned()))
	}

	fn kind(&self, node: &NodeHandle) -> NodeKind {
		match &node.0.borrow().content {
			NodeContent::Element { .. } => NodeKind::Element,
			NodeContent::Text(_) => NodeKind::Text,
			NodeContent::Comment(_) | NodeContent::ShadowRoot => NodeKind::Other,
		}
	}

	fn node_id(&self, node: &NodeHandle) -> NodeId {
		NodeId(node.0.borrow().id)
	}

	fn tag_name(&self, node: &NodeHandle) -> Option<String> {
		match &node.0.borrow().content {
			NodeContent::Element { tag, .. } => Some(tag.clone()),
			_ => None,
		}
	}

	fn text(&self, node: &NodeHandle) -> Option<String> {
		match &node.0.borrow().content {
			NodeContent::Text(text) => Some(text.clone()),
			_ => None,
		}
	}

	fn set_text(&self, node: &NodeHandle, text: &str) {
		if let NodeContent::Text(existing) = &mut node.0.borrow_mut().content {
			*existing = text.to_owned();
			self.mutated();
		}
	}

	fn attribute(&self, node: &NodeHandle, name: &str) -> Option<String> {
		match &node.0.borrow().content {
			NodeContent::Element { attributes, .. } => attributes.iter().find(|(attribute, _)| attribute == name).map(|(_, value)| value.clone()),
			_ => None,
		}
	}

	fn attribute_names(&self, node: &NodeHandle) -> Vec<String> {
		match &node.0.borrow().content {
			NodeContent::Element { attributes, .. } => attributes.iter().map(|(name, _)| name.clone()).collect(),
			_ => Vec::new(),
		}
	}

	fn set_attribute(&self, node: &NodeHandle, name: &str, value: &str) -> Result<(), DomError> {
		match &mut node.0.borrow_mut().content {
			NodeContent::Element { attributes, .. } => {
				match attributes.iter_mut().find(|(attribute, _)| attribute == name) {
					Some((_, existing)) => *existing = value.to_owned(),
					None => attributes.push((name.to_owned(), value.to_owned())),
				}
				self.mutated();
				Ok(())
			}
			_ => Err(DomError::NotAnElement),
		}
	}

	fn remove_attribute(&self, node: &NodeHandle, name: &str) {
		if let NodeContent::Element { attributes, .. } = &mut node.0.borrow_mut().content {
			let before = attributes.len();
			attributes.retain(|(attribute, _)| attribute != name);
			if attributes.len() != before {
				self.mutated();
			}
		}
	}

	fn parent(&self, node: &NodeHandle) -> Option<NodeHandle> {
		node.0.borrow().parent.upgrade().map(NodeHandle)
	}

	fn next_sibling(&self, node: &NodeHandle) -> Option<NodeHandle> {
		let parent = self.parent(node)?;
		let siblings = &parent.0.borrow().children;
		let index = siblings.iter().position(|sibling| sibling == node)?;
		siblings.get(index + 1).cloned()
	}

	fn child_count(&self, node: &NodeHandle) -> usize {
		node.0.borrow().children.len()
	}

	fn child(&self, node: &NodeHandle, index: usize) -> Option<NodeHandle> {
		node.0.borrow().children.get(index).cloned()
	}

	fn insert_before(&self, parent: &NodeHandle, node: &NodeHandle, reference: Option<&NodeHandle>) -> Result<(), DomError> {
		if node == parent || is_ancestor(node, parent) {
			return Err(DomError::HierarchyRequest);
		}

		// An attached node moves: detach first, document-style.
		let old_parent = node.0.borrow().parent.upgrade().map(NodeHandle);
		if let Some(old_parent) = old_parent {
			old_parent.0.borrow_mut().children.retain(|child| child != node);
		}

		{
			let mut parent_data = parent.0.borrow_mut();
			let index = match reference {
				None => parent_data.children.len(),
				Some(reference) => parent_data
					.children
					.iter()
					.position(|child| child == reference)
					.ok_or(DomError::HierarchyRequest)?,
			};
			parent_data.children.insert(index, node.clone());
		}
		node.0.borrow_mut().parent = Rc::downgrade(&parent.0);
		self.mutated();
		Ok(())
	}

	fn remove_child(&self, parent: &NodeHandle, node: &NodeHandle) -> Result<(), DomError> {
		{
			let mut parent_data = parent.0.borrow_mut();
			let before = parent_data.children.len();
			parent_data.children.retain(|child| child != node);
			if parent_data.children.len() == before {
				return Err(DomError::HierarchyRequest);
			}
		}
		node.0.borrow_mut().parent = Weak::new();
		self.mutated();
		Ok(())
	}

	fn add_listener(&self, node: &NodeHandle, name: &str, options: ListenerOptions, handler: Handler<Self>) {
		if let NodeContent::Element { listeners, .. } = &mut node.0.borrow_mut().content {
			listeners.insert((name.to_owned(), options), handler);
			self.mutated();
		}
	}

	fn remove_listener(&self, node: &NodeHandle, name: &str, options: ListenerOptions, _handle: ()) {
		if let NodeContent::Element { listeners, .. } = &mut node.0.borrow_mut().content {
			if listeners.remove(&(name.to_owned(), options)).is_some() {
				self.mutated();
			}
		}
	}

	fn attach_shadow(&self, host: &NodeHandle) -> Result<NodeHandle, DomError> {
		let root = self.new_node(NodeContent::ShadowRoot);
		match &mut host.0.borrow_mut().content {
			NodeContent::Element { shadow, .. } => {
				if shadow.is_some() {
					return Err(DomError::Unsupported("shadow root already attached"));
				}
				*shadow = Some(root.clone());
			}
			_ => return Err(DomError::NotAnElement),
		}
		root.0.borrow_mut().parent = Rc::downgrade(&host.0);
		Ok(root)
	}

	fn append_style(&self, css: &str, root: Option<&NodeHandle>) -> Result<(), DomError> {
		let style = self.create_element("style")?;
		let text = self.create_text(css);
		self.insert_before(&style, &text, None)?;
		self.insert_before(root.unwrap_or(&self.head), &style, None)
	}
}

fn is_ancestor(node: &NodeHandle, of: &NodeHandle) -> bool {
	let mut current = of.0.borrow().parent.upgrade();
	while let Some(ancestor) = current {
		if Rc::ptr_eq(&ancestor, &node.0) {
			return true;
		}
		current = ancestor.borrow().parent.upgrade();
	}
	false
}

/// Collects matching handlers under a short-lived borrow, then runs them
/// borrow-free so handlers may touch the tree.
fn invoke(node: &NodeHandle, name: &str, capture: Option<bool>, event: &MemoryEvent) -> usize {
	let handlers: Vec<Handler<MemoryDom>> = match &node.0.borrow().content {
		NodeContent::Element { listeners, .. } => listeners
			.iter()
			.filter(|((event_name, options), _)| event_name == name && capture.map_or(true, |capture| options.capture == capture))
			.map(|(_, handler)| Rc::clone(handler))
			.collect(),
		_ => Vec::new(),
	};
	for handler in &handlers {
		handler(event);
	}
	handlers.len()
}

fn serialize(node: &NodeHandle, out: &mut String) {
	let data = node.0.borrow();
	match &data.content {
		NodeContent::Element { tag, attributes, .. } => {
			let _ = write!(out, "<{}", tag);
			for (name, value) in attributes {
				let _ = write!(out, " {}=\"{}\"", name, value);
			}
			out.push('>');
			for child in &data.children {
				serialize(child, out);
			}
			let _ = write!(out, "</{}>", tag);
		}
		NodeContent::Text(text) => out.push_str(text),
		NodeContent::Comment(text) => {
			let _ = write!(out, "<!--{}-->", text);
		}
		NodeContent::ShadowRoot => {
			for child in &data.children {
				serialize(child, out);
			}
		}
	}
}
