use suberin::{
	diff::{self, PatchError},
	dom::{handler, Dom, Handler},
	listeners::ListenerMap,
	memory::{MemoryDom, NodeHandle},
	vdom::{VElement, VNode},
};

fn host(dom: &MemoryDom) -> NodeHandle {
	dom.create_element("div").expect("host element")
}

fn patched(dom: &MemoryDom, listeners: &mut ListenerMap<MemoryDom>, target: &NodeHandle, old: Option<VNode<MemoryDom>>, new: VNode<MemoryDom>) -> VNode<MemoryDom> {
	diff::patch(dom, listeners, target, old, new).expect("patch")
}

#[test]
fn creates_tree_under_target() {
	let dom = MemoryDom::new();
	let mut listeners = ListenerMap::new();
	let target = host(&dom);

	let tree = VElement::new("section")
		.attr("id", "app")
		.child(VElement::new("span").child(VNode::text("Hello")))
		.child(VNode::text("!"))
		.into();
	let tree = patched(&dom, &mut listeners, &target, None, tree);

	assert_eq!(dom.outer_html(&target), "<div><section id=\"app\"><span>Hello</span>!</section></div>");
	assert!(tree.node().is_some());
}

#[test]
fn updates_text_in_place() {
	let dom = MemoryDom::new();
	let mut listeners = ListenerMap::new();
	let target = host(&dom);

	let old = patched(&dom, &mut listeners, &target, None, VNode::text("a"));
	let old_node = old.node().cloned().expect("text node");

	let new = patched(&dom, &mut listeners, &target, Some(old), VNode::text("b"));

	assert_eq!(dom.outer_html(&target), "<div>b</div>");
	assert_eq!(new.node().cloned().expect("text node"), old_node, "the live text node must be reused");
}

#[test]
fn tag_change_replaces_node() {
	let dom = MemoryDom::new();
	let mut listeners = ListenerMap::new();
	let target = host(&dom);

	let old = patched(&dom, &mut listeners, &target, None, VElement::new("em").child(VNode::text("x")).into());
	let old_node = old.node().cloned().expect("element node");

	let new = patched(&dom, &mut listeners, &target, Some(old), VElement::new("strong").child(VNode::text("x")).into());

	assert_eq!(dom.outer_html(&target), "<div><strong>x</strong></div>");
	assert_ne!(new.node().cloned().expect("element node"), old_node, "a different tag must not reuse the live node");
	assert_eq!(dom.child_count(&target), 1);
}

fn sample_tree(click: &Handler<MemoryDom>) -> VNode<MemoryDom> {
	VElement::new("ul")
		.attr("class", "list")
		.on("click", click.clone())
		.child(VElement::new("li").key(1).child(VNode::text("one")))
		.child(VElement::new("li").key(2).child(VNode::text("two")))
		.into()
}

#[test]
fn identical_repatch_touches_nothing() {
	let dom = MemoryDom::new();
	let mut listeners = ListenerMap::new();
	let target = host(&dom);
	let click = handler::<MemoryDom, _>(|_| {});

	let old = patched(&dom, &mut listeners, &target, None, sample_tree(&click));
	let rendered = dom.outer_html(&target);
	let before = dom.mutations();

	let _new = patched(&dom, &mut listeners, &target, Some(old), sample_tree(&click));

	assert_eq!(dom.mutations(), before, "re-patching an identical tree must perform zero mutations");
	assert_eq!(dom.outer_html(&target), rendered);
}

#[test]
fn reconciles_attributes() {
	let dom = MemoryDom::new();
	let mut listeners = ListenerMap::new();
	let target = host(&dom);

	let old = patched(&dom, &mut listeners, &target, None, VElement::new("p").attr("a", "1").attr("b", "2").into());
	let before = dom.mutations();

	let new = patched(&dom, &mut listeners, &target, Some(old), VElement::new("p").attr("b", "3").attr("c", "4").into());
	let node = new.node().cloned().expect("element node");

	assert_eq!(dom.attribute(&node, "a"), None);
	assert_eq!(dom.attribute(&node, "b"), Some("3".to_owned()));
	assert_eq!(dom.attribute(&node, "c"), Some("4".to_owned()));
	assert_eq!(dom.mutations() - before, 3, "one removal plus two writes");
}

#[test]
fn missing_live_node_is_a_defect() {
	let dom = MemoryDom::new();
	let mut listeners = ListenerMap::new();
	let target = host(&dom);

	// An "old" tree that was never patched has no live-node references.
	let old: VNode<MemoryDom> = VElement::new("p").into();
	let result = diff::patch(&dom, &mut listeners, &target, Some(old), VElement::new("p").into());

	assert!(matches!(result, Err(PatchError::MissingLiveNode)));
}
