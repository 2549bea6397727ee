//! The contract between component instances and the lifecycle controller.
//!
//! A component exposes a synchronous render function plus an optional set of
//! lifecycle hooks; everything but [`Component::render`] has a default. The
//! "will" hooks may hand back a deferred completion which the controller
//! awaits before rendering.

use crate::{
	dom::Dom,
	vdom::{Attribute, VNode},
};
use futures::future::LocalBoxFuture;

/// A lifecycle hook failed. Surfaced through the instance's error channel;
/// sibling instances are unaffected.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl From<&str> for HookError {
	fn from(message: &str) -> Self {
		Self(message.to_owned())
	}
}

impl From<String> for HookError {
	fn from(message: String) -> Self {
		Self(message)
	}
}

/// Deferred completion of a "will" hook.
pub type WillFuture = LocalBoxFuture<'static, Result<(), HookError>>;

/// What a `component_will_load`/`component_will_update` hook decided.
pub enum WillRender {
	/// Proceed to render immediately.
	Now,
	/// Await this before rendering. The instance may disconnect while the
	/// future is pending; the controller then skips the render entirely.
	After(WillFuture),
}

/// One component, as the lifecycle controller sees it.
///
/// `render` and `host_data` must not touch the live tree themselves — all
/// mutation flows through the reconciler.
pub trait Component<D: Dom> {
	/// Produces the declarative tree for this cycle, or [`None`] for an
	/// empty host.
	fn render(&mut self) -> Option<VNode<D>>;

	/// Extra attributes to reconcile onto the host element this cycle;
	/// called immediately before [`render`](`Component::render`).
	fn host_data(&mut self) -> Option<Vec<Attribute>> {
		None
	}

	/// Runs once, before the first render.
	fn component_will_load(&mut self) -> Result<WillRender, HookError> {
		Ok(WillRender::Now)
	}

	/// Runs once, after the first render is in the live tree.
	fn component_did_load(&mut self) -> Result<(), HookError> {
		Ok(())
	}

	/// Runs before every re-render (not the first).
	fn component_will_update(&mut self) -> Result<WillRender, HookError> {
		Ok(WillRender::Now)
	}

	/// Runs after every re-render (not the first).
	fn component_did_update(&mut self) -> Result<(), HookError> {
		Ok(())
	}

	/// Runs once, after disconnection. The instance is not reused.
	fn component_did_unload(&mut self) {}
}

/// How a component's rendered output is isolated from the surrounding
/// document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encapsulation {
	/// Rendered output lives in an isolated subtree attached to the host.
	Shadow,
	/// Rendered output lives in the host, marked with a generated scope
	/// class that its stylesheet selects on.
	Scoped,
	/// No isolation.
	None,
}

impl Default for Encapsulation {
	fn default() -> Self {
		Encapsulation::None
	}
}

/// The narrow metadata contract consumed by the encapsulation resolver:
/// the component's tag, its isolation mode and its stylesheet text.
#[derive(Clone, Debug)]
pub struct ComponentMeta {
	pub tag: String,
	pub encapsulation: Encapsulation,
	pub style: Option<String>,
}

impl ComponentMeta {
	pub fn new(tag: impl Into<String>) -> Self {
		Self {
			tag: tag.into(),
			encapsulation: Encapsulation::default(),
			style: None,
		}
	}

	#[must_use]
	pub fn encapsulation(mut self, encapsulation: Encapsulation) -> Self {
		self.encapsulation = encapsulation;
		self
	}

	#[must_use]
	pub fn style(mut self, css: impl Into<String>) -> Self {
		self.style = Some(css.into());
		self
	}
}
