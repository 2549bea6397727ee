#![doc(html_root_url = "https://docs.rs/suberin/0.0.1")]
#![warn(clippy::pedantic)]

//! A virtual DOM reconciler and component lifecycle driver.
//!
//! [`diff::patch`] mutates a live tree (through the [`dom::Dom`] seam) until
//! it matches a declarative [`vdom::VNode`] tree, reusing nodes wherever an
//! explicit match signal allows it and keeping event listeners consistent
//! along the way. [`lifecycle::ComponentHost`] drives a
//! [`component::Component`] through load → update* → unload around those
//! patches, with [`styles::StyleRegistry`] deciding where rendered output
//! attaches. [`load::to_vnode`] goes the other way, adopting pre-rendered
//! content as the first tree to diff against.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod component;
pub mod diff;
pub mod dom;
pub mod lifecycle;
pub mod listeners;
pub mod load;
pub mod memory;
pub mod queue;
mod rc_hash_map;
pub mod styles;
pub mod vdom;
pub mod web;
