//! Encapsulation mode resolution and stylesheet injection.
//!
//! Decides, per component instance, where rendered output attaches (an
//! isolated subtree root, the scope-classed host, or the host itself) and
//! makes sure each tag's stylesheet text reaches the document at most once
//! per context. The applied-styles record is process-wide state owned here
//! and passed around by explicit handle, so lifetimes and test resets stay
//! visible.

use crate::{
	component::{ComponentMeta, Encapsulation},
	dom::{Dom, DomError},
};
use hashbrown::HashSet;
use tracing::{debug, instrument};

/// Attachment decision for one host element.
pub struct HostStyle<D: Dom> {
	/// Where the patcher's output goes.
	pub target: D::Node,
	/// Class the host must carry in scoped mode, to be merged into its
	/// host-data attributes each cycle.
	pub scope_class: Option<String>,
}

/// Per-tag record of stylesheets already injected into the shared document
/// context. Monotonic: tags only ever get marked applied.
#[derive(Debug, Default)]
pub struct StyleRegistry {
	applied: HashSet<String>,
}

impl StyleRegistry {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// The generated scope class for a tag in scoped mode.
	#[must_use]
	pub fn scope_class(tag: &str) -> String {
		format!("sc-{}", tag)
	}

	/// Resolves the patch target for `host` and injects stylesheet text
	/// where the mode calls for it.
	///
	/// Shadow roots are their own styling context and receive the
	/// stylesheet on creation; scoped and unencapsulated styles go into the
	/// shared document context, once per tag no matter how many instances
	/// connect.
	#[instrument(skip(self, dom, host, meta), fields(tag = %meta.tag))]
	pub fn prepare_host<D: Dom>(&mut self, dom: &D, host: &D::Node, meta: &ComponentMeta) -> Result<HostStyle<D>, DomError> {
		match meta.encapsulation {
			Encapsulation::Shadow => {
				let target = dom.attach_shadow(host)?;
				if let Some(css) = &meta.style {
					dom.append_style(css, Some(&target))?;
				}
				Ok(HostStyle { target, scope_class: None })
			}
			Encapsulation::Scoped => {
				self.apply_document_style(dom, meta)?;
				Ok(HostStyle {
					target: host.clone(),
					scope_class: Some(Self::scope_class(&meta.tag)),
				})
			}
			Encapsulation::None => {
				self.apply_document_style(dom, meta)?;
				Ok(HostStyle { target: host.clone(), scope_class: None })
			}
		}
	}

	/// Whether `tag`'s stylesheet already reached the shared document
	/// context.
	#[must_use]
	pub fn is_applied(&self, tag: &str) -> bool {
		self.applied.contains(tag)
	}

	/// Forgets every applied-styles record. Intended for tests.
	pub fn reset(&mut self) {
		self.applied.clear();
	}

	fn apply_document_style<D: Dom>(&mut self, dom: &D, meta: &ComponentMeta) -> Result<(), DomError> {
		let css = match &meta.style {
			Some(css) => css,
			None => return Ok(()),
		};
		if self.applied.insert(meta.tag.clone()) {
			dom.append_style(css, None)
		} else {
			debug!("Styles already applied for this tag; skipping injection.");
			Ok(())
		}
	}
}
