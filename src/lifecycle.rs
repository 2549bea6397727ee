//! The component lifecycle controller.
//!
//! Walks one component instance through load → update* → unload, calling the
//! instance's hooks around reconciliation in a fixed order and keeping the
//! retained tree, host attributes and listener table consistent across
//! cycles.
//!
//! All state lives behind a shared cell so that a disconnection can land
//! while a "will" hook is suspended; the controller re-checks the connection
//! after every suspension point and skips the render rather than patching a
//! torn-down host. Within one instance cycles never overlap: an update
//! requested while one is in flight sets a pending flag and is coalesced.

use crate::{
	component::{Component, ComponentMeta, HookError, WillRender},
	diff::{self, PatchError},
	dom::{Dom, DomError},
	listeners::ListenerMap,
	load,
	queue::{self, RenderQueue},
	styles::StyleRegistry,
	vdom::{Attribute, VNode},
};
use core::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, error, instrument, warn};

/// Failure of one render cycle. The previous retained tree is left intact
/// for hook failures; patch errors are defects and may leave the live tree
/// partially updated.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
	#[error("component instance is already connected")]
	AlreadyConnected,
	#[error("instance record is inconsistent (no render target)")]
	MissingTarget,
	#[error("`{hook}` failed: {source}")]
	Hook {
		hook: &'static str,
		#[source]
		source: HookError,
	},
	#[error(transparent)]
	Patch(#[from] PatchError),
	#[error(transparent)]
	Dom(#[from] DomError),
}

/// Lifecycle phase of one component instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
	/// Created, never connected.
	Unloaded,
	/// First render cycle in flight.
	Loading,
	/// First render complete; live.
	Loaded,
	/// Re-render cycle in flight.
	Updating,
	/// Disconnected. Terminal; the instance is not reused.
	Destroyed,
}

struct HostState<D: Dom, C: Component<D>> {
	component: C,
	meta: ComponentMeta,
	host: D::Node,
	/// Patch target resolved on first connection (host, or its shadow root).
	target: Option<D::Node>,
	scope_class: Option<String>,
	phase: Phase,
	connected: bool,
	pending_update: bool,
	/// Tree retained from the last successful render.
	rendered: Option<VNode<D>>,
	/// Host attribute set retained from the last `host_data` merge.
	host_attributes: Vec<Attribute>,
	listeners: ListenerMap<D>,
}

/// One live component instance: the record created when a host element
/// connects and destroyed when it disconnects.
///
/// Handles are cheap clones of the same instance, so a disconnection can be
/// delivered while a render cycle is suspended in a "will" hook.
pub struct ComponentHost<D: Dom, C: Component<D>> {
	state: Rc<RefCell<HostState<D, C>>>,
}

impl<D: Dom, C: Component<D>> Clone for ComponentHost<D, C> {
	fn clone(&self) -> Self {
		Self { state: Rc::clone(&self.state) }
	}
}

impl<D: Dom, C: Component<D>> ComponentHost<D, C> {
	pub fn new(component: C, meta: ComponentMeta, host: D::Node) -> Self {
		Self {
			state: Rc::new(RefCell::new(HostState {
				component,
				meta,
				host,
				target: None,
				scope_class: None,
				phase: Phase::Unloaded,
				connected: false,
				pending_update: false,
				rendered: None,
				host_attributes: Vec::new(),
				listeners: ListenerMap::new(),
			})),
		}
	}

	#[must_use]
	pub fn phase(&self) -> Phase {
		self.state.borrow().phase
	}

	/// The resolved patch target, once connected.
	#[must_use]
	pub fn target(&self) -> Option<D::Node> {
		self.state.borrow().target.clone()
	}

	/// First connection: `component_will_load` (awaited if deferred), then
	/// the first render in the queue's write phase, then
	/// `component_did_load`. Runs at most once per instance.
	///
	/// Pre-rendered content already under the resolved target is adopted as
	/// the old tree, so the first patch diffs against it instead of
	/// rebuilding from nothing.
	#[instrument(skip(self, dom, queue, styles))]
	pub async fn connect<Q: RenderQueue>(&self, dom: &D, queue: &Q, styles: &mut StyleRegistry) -> Result<(), LifecycleError> {
		let will = {
			let mut state = self.state.borrow_mut();
			if state.phase != Phase::Unloaded {
				return Err(LifecycleError::AlreadyConnected);
			}
			state.phase = Phase::Loading;
			state.connected = true;
			state.component.component_will_load()
		};
		if let Err(error) = await_will(will, "componentWillLoad").await {
			self.state.borrow_mut().phase = Phase::Unloaded;
			return Err(error);
		}

		if !self.still_connected() {
			debug!("Instance disconnected while loading; skipping the first render.");
			self.state.borrow_mut().phase = Phase::Destroyed;
			return Ok(());
		}

		if queue::write_phase(queue).await.is_err() {
			warn!("Scheduler dropped the write phase; first render skipped.");
			self.state.borrow_mut().phase = Phase::Unloaded;
			return Ok(());
		}

		if !self.still_connected() {
			self.state.borrow_mut().phase = Phase::Destroyed;
			return Ok(());
		}

		let first_render = (|| -> Result<(), LifecycleError> {
			let mut state = self.state.borrow_mut();
			let state = &mut *state;
			let host_style = styles.prepare_host(dom, &state.host, &state.meta)?;
			let target = host_style.target.clone();
			state.target = Some(host_style.target);
			state.scope_class = host_style.scope_class;
			render_and_patch(dom, state, &target, true)?;
			state.phase = Phase::Loaded;
			Ok(())
		})();
		if let Err(error) = first_render {
			self.state.borrow_mut().phase = Phase::Unloaded;
			return Err(error);
		}

		let did = { self.state.borrow_mut().component.component_did_load() };
		if let Err(source) = did {
			error!(%source, "`componentDidLoad` failed.");
			return Err(LifecycleError::Hook { hook: "componentDidLoad", source });
		}

		self.drain_pending(dom, queue).await
	}

	/// One re-render: `component_will_update` (awaited if deferred), render
	/// and patch in the queue's write phase, then `component_did_update`.
	///
	/// While a cycle is in flight for this instance, further update requests
	/// coalesce into a single follow-up cycle. Requests against an instance
	/// that is not loaded are logged no-ops, since teardown paths race
	/// benignly with stray update requests.
	#[instrument(skip(self, dom, queue))]
	pub async fn update<Q: RenderQueue>(&self, dom: &D, queue: &Q) -> Result<(), LifecycleError> {
		{
			let mut state = self.state.borrow_mut();
			match state.phase {
				Phase::Loaded => state.phase = Phase::Updating,
				Phase::Loading | Phase::Updating => {
					debug!("Render already in flight; coalescing.");
					state.pending_update = true;
					return Ok(());
				}
				Phase::Unloaded | Phase::Destroyed => {
					warn!(phase = ?state.phase, "Update request ignored; instance is not loaded.");
					return Ok(());
				}
			}
		}

		let cycle = self.update_cycle(dom, queue).await;
		{
			let mut state = self.state.borrow_mut();
			if state.phase == Phase::Updating {
				state.phase = Phase::Loaded;
			}
		}
		cycle?;

		self.drain_pending(dom, queue).await
	}

	/// Disconnection: fires `component_did_unload` (once, and only if the
	/// load completed), releases every tracked listener and destroys the
	/// instance record. A cycle suspended in a "will" hook notices the
	/// disconnection when it resumes and skips its render.
	#[instrument(skip(self, dom))]
	pub fn disconnect(&self, dom: &D) {
		let mut state = self.state.borrow_mut();
		state.connected = false;
		match state.phase {
			Phase::Loaded | Phase::Updating => {
				let state = &mut *state;
				state.component.component_did_unload();
				state.listeners.clear(dom);
				state.pending_update = false;
				state.phase = Phase::Destroyed;
			}
			Phase::Loading => debug!("Disconnected while the first render was pending."),
			Phase::Unloaded | Phase::Destroyed => {}
		}
	}

	async fn update_cycle<Q: RenderQueue>(&self, dom: &D, queue: &Q) -> Result<(), LifecycleError> {
		let will = { self.state.borrow_mut().component.component_will_update() };
		await_will(will, "componentWillUpdate").await?;

		if !self.still_connected() {
			debug!("Instance disconnected while updating; skipping the render.");
			return Ok(());
		}

		if queue::write_phase(queue).await.is_err() {
			warn!("Scheduler dropped the write phase; re-render skipped.");
			return Ok(());
		}

		if !self.still_connected() {
			return Ok(());
		}

		{
			let mut state = self.state.borrow_mut();
			let state = &mut *state;
			let target = state.target.clone().ok_or(LifecycleError::MissingTarget)?;
			render_and_patch(dom, state, &target, false)?;
		}

		let did = { self.state.borrow_mut().component.component_did_update() };
		did.map_err(|source| {
			error!(%source, "`componentDidUpdate` failed.");
			LifecycleError::Hook { hook: "componentDidUpdate", source }
		})
	}

	/// Runs coalesced update requests until none are pending.
	async fn drain_pending<Q: RenderQueue>(&self, dom: &D, queue: &Q) -> Result<(), LifecycleError> {
		loop {
			{
				let mut state = self.state.borrow_mut();
				if !state.pending_update {
					return Ok(());
				}
				state.pending_update = false;
				if state.phase != Phase::Loaded {
					return Ok(());
				}
				state.phase = Phase::Updating;
			}
			let cycle = self.update_cycle(dom, queue).await;
			{
				let mut state = self.state.borrow_mut();
				if state.phase == Phase::Updating {
					state.phase = Phase::Loaded;
				}
			}
			cycle?;
		}
	}

	fn still_connected(&self) -> bool {
		self.state.borrow().connected
	}
}

async fn await_will(will: Result<WillRender, HookError>, hook: &'static str) -> Result<(), LifecycleError> {
	let pending = match will {
		Ok(WillRender::Now) => return Ok(()),
		Ok(WillRender::After(future)) => future,
		Err(source) => {
			error!(hook, %source, "Lifecycle hook failed.");
			return Err(LifecycleError::Hook { hook, source });
		}
	};
	match pending.await {
		Ok(()) => Ok(()),
		Err(source) => {
			error!(hook, %source, "Lifecycle hook failed.");
			Err(LifecycleError::Hook { hook, source })
		}
	}
}

/// One render: the `host_data` merge onto the host element, then the
/// component's tree patched under `target`.
fn render_and_patch<D: Dom, C: Component<D>>(dom: &D, state: &mut HostState<D, C>, target: &D::Node, first: bool) -> Result<(), LifecycleError> {
	let mut host_attributes = state.component.host_data().unwrap_or_default();
	if let Some(scope_class) = &state.scope_class {
		merge_class(&mut host_attributes, scope_class);
	}
	diff::update_attributes(dom, &state.host, &state.host_attributes, &host_attributes)?;
	state.host_attributes = host_attributes;

	let new = state.component.render();
	let old = state.rendered.take().or_else(|| {
		if first {
			dom.child(target, 0).and_then(|existing| load::to_vnode(dom, &existing))
		} else {
			None
		}
	});

	match new {
		Some(new) => {
			let patched = diff::patch(dom, &mut state.listeners, target, old, new)?;
			state.rendered = Some(patched);
		}
		None => {
			if let Some(old) = old {
				debug!("Render produced nothing; tearing the previous tree down.");
				diff::teardown(dom, &mut state.listeners, target, old)?;
			}
			state.rendered = None;
		}
	}
	Ok(())
}

/// Folds the scoped-mode class into a host attribute set, appending to an
/// existing `class` attribute or adding one.
fn merge_class(attributes: &mut Vec<Attribute>, class: &str) {
	match attributes.iter_mut().find(|attribute| attribute.name == "class") {
		Some(existing) => {
			if !existing.value.split_ascii_whitespace().any(|part| part == class) {
				existing.value.push(' ');
				existing.value.push_str(class);
			}
		}
		None => attributes.push(Attribute::new("class", class)),
	}
}
