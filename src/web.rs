//! The browser backend.
//!
//! [`WebDom`] drives a real document through `web-sys`.
//!
//! # Safety
//!
//! Event handlers are wrapped in [`Closure`]s that are reference-counted per
//! [`WebDom`] instance and shared between registrations of the same handler,
//! so re-attaching a hoisted handler across re-renders reuses one JS
//! function. Registrations are memory-safe, including interactions with
//! misbehaving JavaScript code; however, associated event listeners will
//! start throwing errors into JavaScript if the [`WebDom`] instance is
//! dropped while they are still attached.

use crate::{
	dom::{Dom, DomError, Handler, ListenerOptions, NodeId, NodeKind},
	rc_hash_map::RcHashMap,
};
use core::cell::{Cell, RefCell};
use js_sys::Function;
use std::rc::Rc;
use tracing::{error, info, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue, UnwrapThrowExt};

/// Registration token for one attached listener: the bound JS function plus
/// the closure-cache key it holds a count on.
#[derive(Debug)]
pub struct WebListenerHandle {
	function: Function,
	cache_key: usize,
}

/// The `web-sys` backend.
pub struct WebDom {
	document: web_sys::Document,
	ids: js_sys::WeakMap,
	next_id: Cell<u64>,
	closures: RefCell<RcHashMap<usize, u32, Closure<dyn Fn(web_sys::Event)>>>,
	listener_options_cache: RefCell<[Option<web_sys::AddEventListenerOptions>; 4]>,
}

impl WebDom {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self {
			document,
			ids: js_sys::WeakMap::new(),
			next_id: Cell::new(1),
			closures: RefCell::new(RcHashMap::new()),
			listener_options_cache: RefCell::new([None, None, None, None]),
		}
	}

	/// Backend over the current window's document.
	pub fn for_window() -> Result<Self, DomError> {
		let document = web_sys::window()
			.and_then(|window| window.document())
			.ok_or(DomError::Unsupported("no window document available"))?;
		Ok(Self::new(document))
	}

	fn listener_options(&self, options: ListenerOptions) -> web_sys::AddEventListenerOptions {
		let index = options.capture as usize + options.passive as usize * 2;
		let mut cache = self.listener_options_cache.borrow_mut();
		match &mut cache[index] {
			Some(cached) => cached.clone(),
			entry => {
				let mut web_options = web_sys::AddEventListenerOptions::new();
				web_options.capture(options.capture).passive(options.passive);
				let fresh = web_options.clone();
				*entry = Some(web_options);
				fresh
			}
		}
	}
}

fn js_error(context: &'static str, error: &JsValue) -> DomError {
	DomError::Platform(format!("{}: {:?}", context, error))
}

impl Dom for WebDom {
	type Node = web_sys::Node;
	type Event = web_sys::Event;
	type ListenerHandle = WebListenerHandle;

	fn create_element(&self, tag: &str) -> Result<web_sys::Node, DomError> {
		self.document
			.create_element(tag)
			.map(Into::into)
			.map_err(|error| js_error("createElement", &error))
	}

	fn create_text(&self, text: &str) -> web_sys::Node {
		self.document.create_text_node(text).into()
	}

	fn kind(&self, node: &web_sys::Node) -> NodeKind {
		match node.node_type() {
			web_sys::Node::ELEMENT_NODE => NodeKind::Element,
			web_sys::Node::TEXT_NODE => NodeKind::Text,
			_ => NodeKind::Other,
		}
	}

	#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
	fn node_id(&self, node: &web_sys::Node) -> NodeId {
		let key: &js_sys::Object = node.as_ref();
		if let Some(id) = self.ids.get(key).as_f64() {
			return NodeId(id as u64);
		}
		let id = self.next_id.get();
		self.next_id.set(id + 1);
		let _ = self.ids.set(key, &JsValue::from_f64(id as f64));
		NodeId(id)
	}

	fn tag_name(&self, node: &web_sys::Node) -> Option<String> {
		node.dyn_ref::<web_sys::Element>().map(|element| element.tag_name().to_ascii_lowercase())
	}

	fn text(&self, node: &web_sys::Node) -> Option<String> {
		node.dyn_ref::<web_sys::Text>().map(|text| text.data())
	}

	fn set_text(&self, node: &web_sys::Node, text: &str) {
		match node.dyn_ref::<web_sys::Text>() {
			Some(data) => data.set_data(text),
			None => warn!("Expected to update `web_sys::Text` but found {:?}; Ignoring.", node),
		}
	}

	fn attribute(&self, node: &web_sys::Node, name: &str) -> Option<String> {
		node.dyn_ref::<web_sys::Element>().and_then(|element| element.get_attribute(name))
	}

	fn attribute_names(&self, node: &web_sys::Node) -> Vec<String> {
		let element = match node.dyn_ref::<web_sys::Element>() {
			Some(element) => element,
			None => return Vec::new(),
		};
		let attributes = element.attributes();
		(0..attributes.length())
			.filter_map(|i| attributes.item(i))
			.map(|attribute| attribute.local_name())
			.collect()
	}

	fn set_attribute(&self, node: &web_sys::Node, name: &str, value: &str) -> Result<(), DomError> {
		node.dyn_ref::<web_sys::Element>()
			.ok_or(DomError::NotAnElement)?
			.set_attribute(name, value)
			.map_err(|error| js_error("setAttribute", &error))
	}

	fn remove_attribute(&self, node: &web_sys::Node, name: &str) {
		if let Some(element) = node.dyn_ref::<web_sys::Element>() {
			if let Err(error) = element.remove_attribute(name) {
				warn!("Could not remove attribute {:?}: {:?}", name, error);
			}
		}
	}

	fn parent(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.parent_node()
	}

	fn next_sibling(&self, node: &web_sys::Node) -> Option<web_sys::Node> {
		node.next_sibling()
	}

	fn child_count(&self, node: &web_sys::Node) -> usize {
		node.child_nodes().length() as usize
	}

	#[allow(clippy::cast_possible_truncation)]
	fn child(&self, node: &web_sys::Node, index: usize) -> Option<web_sys::Node> {
		node.child_nodes().item(index as u32)
	}

	fn insert_before(&self, parent: &web_sys::Node, node: &web_sys::Node, reference: Option<&web_sys::Node>) -> Result<(), DomError> {
		parent
			.insert_before(node, reference)
			.map(|_| ())
			.map_err(|error| js_error("insertBefore", &error))
	}

	fn remove_child(&self, parent: &web_sys::Node, node: &web_sys::Node) -> Result<(), DomError> {
		parent
			.remove_child(node)
			.map(|_| ())
			.map_err(|error| js_error("removeChild", &error))
	}

	fn add_listener(&self, node: &web_sys::Node, name: &str, options: ListenerOptions, handler: Handler<Self>) -> WebListenerHandle {
		let cache_key = Rc::as_ptr(&handler).cast::<()>() as usize;
		let function = {
			let mut closures = self.closures.borrow_mut();
			let closure = closures
				.acquire_or_insert_with(cache_key, |_| {
					let handler = Rc::clone(&handler);
					Closure::wrap(Box::new(move |event: web_sys::Event| handler(&event)) as Box<dyn Fn(web_sys::Event)>)
				})
				.expect_throw("suberin: too many active registrations of one event handler");
			closure.as_ref().unchecked_ref::<Function>().clone()
		};
		let target: &web_sys::EventTarget = node.as_ref();
		if let Err(error) = target.add_event_listener_with_callback_and_add_event_listener_options(name, &function, &self.listener_options(options)) {
			error!("Failed to add event listener {:?}: {:?}", name, error);
		}
		WebListenerHandle { function, cache_key }
	}

	fn remove_listener(&self, node: &web_sys::Node, name: &str, options: ListenerOptions, handle: WebListenerHandle) {
		let target: &web_sys::EventTarget = node.as_ref();
		if let Err(error) = target.remove_event_listener_with_callback_and_bool(name, &handle.function, options.capture) {
			warn!("Failed to remove event listener {:?} ({:?}): {:?}", name, options, error);
		}
		let _ = self
			.closures
			.borrow_mut()
			.release(&handle.cache_key)
			.expect_throw("suberin: released an event handler more often than registered");
	}

	fn attach_shadow(&self, host: &web_sys::Node) -> Result<web_sys::Node, DomError> {
		host.dyn_ref::<web_sys::Element>()
			.ok_or(DomError::NotAnElement)?
			.attach_shadow(&web_sys::ShadowRootInit::new(web_sys::ShadowRootMode::Open))
			.map(Into::into)
			.map_err(|error| js_error("attachShadow", &error))
	}

	fn append_style(&self, css: &str, root: Option<&web_sys::Node>) -> Result<(), DomError> {
		let style = self
			.document
			.create_element("style")
			.map_err(|error| js_error("createElement", &error))?;
		style.set_text_content(Some(css));
		let parent: web_sys::Node = match root {
			Some(root) => root.clone(),
			None => self
				.document
				.head()
				.ok_or(DomError::Unsupported("document has no head"))?
				.into(),
		};
		parent
			.append_child(style.as_ref())
			.map(|_| ())
			.map_err(|error| js_error("appendChild", &error))
	}

	fn finish_patch(&self) {
		let mut closures = self.closures.borrow_mut();
		{
			let drain = closures.drain_unused();
			trace!("Freed {} event listener closure(s).", drain.count());
		}
		info!("Event listener closure count/cached capacity: {}/{}", closures.len(), closures.capacity());
	}
}
