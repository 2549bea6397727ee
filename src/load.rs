//! Construction of [`VNode`] trees from live nodes.
//!
//! The inverse direction of [`crate::diff`]: walking an already-rendered
//! subtree (server-delivered or static markup) yields the tree the first
//! reconciliation can diff against, so pre-existing content is adopted
//! instead of being thrown away and rebuilt.

use crate::{
	dom::{Dom, NodeKind},
	vdom::{Attribute, VElement, VNode, VText},
};

/// Converts a live subtree into a [`VNode`] tree, depth-first and in sibling
/// order.
///
/// Elements and text runs convert; every other node kind yields [`None`] and
/// is skipped (also when encountered among children). The produced tree has
/// its live-node references populated, ready to serve as the old tree of a
/// [`patch`](`crate::diff::patch`). No side effects on the live tree.
#[must_use]
pub fn to_vnode<D: Dom>(dom: &D, node: &D::Node) -> Option<VNode<D>> {
	match dom.kind(node) {
		NodeKind::Element => {
			let name = dom.tag_name(node)?;
			let attributes = dom
				.attribute_names(node)
				.into_iter()
				.map(|attribute_name| {
					let value = dom.attribute(node, &attribute_name).unwrap_or_default();
					Attribute::new(attribute_name, value)
				})
				.collect();
			let children = load_children(dom, node);
			Some(VNode::Element(VElement {
				name,
				key: None,
				attributes,
				event_bindings: Vec::new(),
				children,
				node: Some(node.clone()),
			}))
		}
		NodeKind::Text => Some(VNode::Text(VText {
			text: dom.text(node).unwrap_or_default(),
			node: Some(node.clone()),
		})),
		NodeKind::Other => None,
	}
}

fn load_children<D: Dom>(dom: &D, node: &D::Node) -> Vec<VNode<D>> {
	(0..dom.child_count(node))
		.filter_map(|i| dom.child(node, i))
		.filter_map(|child| to_vnode(dom, &child))
		.collect()
}
