use core::fmt::Debug;
use std::rc::Rc;

/// Shared event handler, compared by allocation identity during
/// reconciliation. Clones of one handler are "the same" handler; two
/// separately-created handlers never are, even if their code is identical.
pub type Handler<D> = Rc<dyn Fn(&<D as Dom>::Event)>;

/// Boxes `f` into a [`Handler`] for the given backend.
///
/// Mainly a coercion aid: `Rc::new(closure)` alone often needs a type
/// annotation to become `Rc<dyn Fn(…)>`.
pub fn handler<D: Dom, F: Fn(&D::Event) + 'static>(f: F) -> Handler<D> {
	Rc::new(f)
}

/// Registration slot identity for one event listener:
/// which phase it runs in and whether it promised not to cancel the event.
///
/// Together with the event name this forms the key under which at most one
/// handler may be registered per live node at any time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ListenerOptions {
	pub capture: bool,
	pub passive: bool,
}

impl ListenerOptions {
	#[must_use]
	pub const fn new() -> Self {
		Self { capture: false, passive: false }
	}

	#[must_use]
	pub const fn captured() -> Self {
		Self { capture: true, passive: false }
	}
}

/// Stable identity of a live node, used to key side tables.
///
/// Ids are assigned by the backend and survive tree moves; they are only
/// meaningful within the backend instance that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// The broad kind of a live node, as far as reconciliation cares.
///
/// Anything that is neither an element nor a text run (comments, processing
/// instructions, …) is `Other` and is skipped by [tree conversion](`crate::load`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
	Element,
	Text,
	Other,
}

/// Live-tree operation failure.
#[derive(Debug, thiserror::Error)]
pub enum DomError {
	#[error("node is not an element")]
	NotAnElement,
	#[error("node cannot be placed here (bad parent or reference sibling)")]
	HierarchyRequest,
	#[error("operation is not supported by this node: {0}")]
	Unsupported(&'static str),
	#[error("platform error: {0}")]
	Platform(String),
}

/// The seam between tree surgery and the platform.
///
/// The [differ](`crate::diff`), [listener tracker](`crate::listeners`) and
/// [lifecycle controller](`crate::lifecycle`) only ever touch a live tree
/// through this trait, so the same reconciliation drives a real document
/// ([`crate::web::WebDom`]) and a self-contained one
/// ([`crate::memory::MemoryDom`]).
///
/// # Correct use
///
/// `Node` handles are cheap clones of the same underlying node; equality is
/// node identity, not structural comparison. A node inserted while already
/// attached elsewhere *moves* (it is detached from its old position first),
/// matching document semantics.
pub trait Dom {
	/// Handle to one live node.
	type Node: Clone + PartialEq + Debug;
	/// Event payload passed to handlers on dispatch.
	type Event;
	/// Backend token returned by [`add_listener`](`Dom::add_listener`) and
	/// consumed by [`remove_listener`](`Dom::remove_listener`).
	type ListenerHandle: Debug;

	fn create_element(&self, tag: &str) -> Result<Self::Node, DomError>;
	fn create_text(&self, text: &str) -> Self::Node;

	fn kind(&self, node: &Self::Node) -> NodeKind;

	/// Stable id for `node`, assigned on first request.
	fn node_id(&self, node: &Self::Node) -> NodeId;

	/// Lowercase tag name; [`None`] for non-elements.
	fn tag_name(&self, node: &Self::Node) -> Option<String>;

	/// Character data; [`None`] for non-text nodes.
	fn text(&self, node: &Self::Node) -> Option<String>;
	fn set_text(&self, node: &Self::Node, text: &str);

	fn attribute(&self, node: &Self::Node, name: &str) -> Option<String>;
	fn attribute_names(&self, node: &Self::Node) -> Vec<String>;
	fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<(), DomError>;
	fn remove_attribute(&self, node: &Self::Node, name: &str);

	fn parent(&self, node: &Self::Node) -> Option<Self::Node>;
	fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;
	fn child_count(&self, node: &Self::Node) -> usize;
	fn child(&self, node: &Self::Node, index: usize) -> Option<Self::Node>;

	/// Inserts `node` under `parent`, before `reference` (append when
	/// `reference` is [`None`]). An attached `node` is moved.
	fn insert_before(&self, parent: &Self::Node, node: &Self::Node, reference: Option<&Self::Node>) -> Result<(), DomError>;
	fn remove_child(&self, parent: &Self::Node, node: &Self::Node) -> Result<(), DomError>;

	/// Registers `handler` for `name` events on `node`.
	///
	/// The backend does not deduplicate; slot exclusivity per
	/// (name, options) triple is the [`crate::listeners::ListenerMap`]'s
	/// responsibility.
	fn add_listener(&self, node: &Self::Node, name: &str, options: ListenerOptions, handler: Handler<Self>) -> Self::ListenerHandle
	where
		Self: Sized;

	fn remove_listener(&self, node: &Self::Node, name: &str, options: ListenerOptions, handle: Self::ListenerHandle);

	/// Attaches an isolated subtree root to `host` and returns it.
	fn attach_shadow(&self, host: &Self::Node) -> Result<Self::Node, DomError>;

	/// Injects stylesheet text, either into an isolated subtree root
	/// (`Some`) or into the shared document context (`None`).
	fn append_style(&self, css: &str, root: Option<&Self::Node>) -> Result<(), DomError>;

	/// Post-patch housekeeping hook; called once after each completed
	/// reconciliation pass.
	fn finish_patch(&self) {}
}
