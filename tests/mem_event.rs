use core::cell::RefCell;
use std::rc::Rc;
use suberin::{
	diff,
	dom::{handler, Dom, Handler, ListenerOptions},
	listeners::ListenerMap,
	memory::{MemoryDom, NodeHandle},
	vdom::{VElement, VNode},
};

fn setup() -> (MemoryDom, ListenerMap<MemoryDom>, NodeHandle) {
	let dom = MemoryDom::new();
	let listeners = ListenerMap::new();
	let target = dom.create_element("div").expect("host element");
	(dom, listeners, target)
}

fn counting(count: &Rc<RefCell<usize>>) -> Handler<MemoryDom> {
	let count = Rc::clone(count);
	handler::<MemoryDom, _>(move |_| *count.borrow_mut() += 1)
}

#[test]
fn attaches_click_handler() {
	let (dom, mut listeners, target) = setup();
	let count = Rc::new(RefCell::new(0));

	let tree = diff::patch(
		&dom,
		&mut listeners,
		&target,
		None,
		VElement::new("button").on("click", counting(&count)).child(VNode::text("go")).into(),
	)
	.expect("patch");
	let button = tree.node().cloned().expect("button node");

	assert_eq!(*count.borrow(), 0);
	dom.dispatch(&button, "click");
	assert_eq!(*count.borrow(), 1);
}

#[test]
fn replaced_handlers_stay_exclusive() {
	let (dom, mut listeners, target) = setup();
	let log = Rc::new(RefCell::new(Vec::new()));

	let mut tree = None;
	for generation in 0..3 {
		let log = Rc::clone(&log);
		let click = handler::<MemoryDom, _>(move |_| log.borrow_mut().push(generation));
		let new = VElement::new("button").on("click", click).into();
		tree = Some(diff::patch(&dom, &mut listeners, &target, tree.take(), new).expect("patch"));
	}
	let button = tree.expect("tree").node().cloned().expect("button node");

	let invoked = dom.dispatch(&button, "click");

	assert_eq!(invoked, 1, "exactly one handler may be live per slot");
	assert_eq!(*log.borrow(), vec![2], "only the latest handler fires");
}

#[test]
fn stale_handler_never_fires_between_patches() {
	let (dom, mut listeners, target) = setup();
	let log = Rc::new(RefCell::new(Vec::new()));

	let first = {
		let log = Rc::clone(&log);
		handler::<MemoryDom, _>(move |_| log.borrow_mut().push(1))
	};
	let second = {
		let log = Rc::clone(&log);
		handler::<MemoryDom, _>(move |_| log.borrow_mut().push(2))
	};

	let tree = diff::patch(&dom, &mut listeners, &target, None, VElement::new("a").on("click", first).into()).expect("patch");
	let node = tree.node().cloned().expect("node");
	dom.dispatch(&node, "click");

	let tree = diff::patch(&dom, &mut listeners, &target, Some(tree), VElement::new("a").on("click", second).into()).expect("patch");
	let node = tree.node().cloned().expect("node");
	dom.dispatch(&node, "click");

	assert_eq!(*log.borrow(), vec![1, 2]);
}

#[test]
fn dropping_the_binding_detaches() {
	let (dom, mut listeners, target) = setup();
	let count = Rc::new(RefCell::new(0));

	let tree = diff::patch(&dom, &mut listeners, &target, None, VElement::new("a").on("click", counting(&count)).into()).expect("patch");
	let node = tree.node().cloned().expect("node");
	dom.dispatch(&node, "click");
	dom.dispatch(&node, "click");
	assert_eq!(*count.borrow(), 2);

	let tree = diff::patch(&dom, &mut listeners, &target, Some(tree), VElement::new("a").into()).expect("patch");
	let node = tree.node().cloned().expect("node");
	dom.dispatch(&node, "click");
	dom.dispatch(&node, "click");

	assert_eq!(*count.borrow(), 2, "no handler may fire after its binding is gone");
}

#[test]
fn subtree_removal_detaches_everything_below() {
	let (dom, mut listeners, target) = setup();
	let count = Rc::new(RefCell::new(0));

	let tree = diff::patch(
		&dom,
		&mut listeners,
		&target,
		None,
		VElement::new("section")
			.child(VElement::new("div").on("click", counting(&count)).child(VElement::new("button").on("click", counting(&count))))
			.into(),
	)
	.expect("patch");
	let button = match &tree {
		VNode::Element(section) => match &section.children[0] {
			VNode::Element(div) => div.children[0].node().cloned().expect("button node"),
			VNode::Text(_) => panic!("expected an element"),
		},
		VNode::Text(_) => panic!("expected an element"),
	};
	assert_eq!(dom.dispatch(&button, "click"), 2, "target handler plus the bubbled one");
	assert_eq!(*count.borrow(), 2);

	let _tree = diff::patch(&dom, &mut listeners, &target, Some(tree), VElement::new("section").into()).expect("patch");
	let invoked = dom.dispatch(&button, "click");

	assert_eq!(invoked, 0, "removing a subtree must release every listener within it");
	assert_eq!(*count.borrow(), 2);
	assert!(listeners.is_empty());
}

#[test]
fn capture_and_bubble_slots_are_distinct() {
	let (dom, mut listeners, target) = setup();
	let count = Rc::new(RefCell::new(0));

	let bubbling = counting(&count);
	let capturing = counting(&count);
	let tree = diff::patch(
		&dom,
		&mut listeners,
		&target,
		None,
		VElement::new("a")
			.on("click", bubbling.clone())
			.on_with("click", ListenerOptions::captured(), capturing)
			.into(),
	)
	.expect("patch");
	let node = tree.node().cloned().expect("node");

	assert_eq!(dom.dispatch(&node, "click"), 2, "both phase slots carry a registration");

	// Dropping only the capture-phase binding leaves the other slot alone.
	let tree = diff::patch(&dom, &mut listeners, &target, Some(tree), VElement::new("a").on("click", bubbling).into()).expect("patch");
	let node = tree.node().cloned().expect("node");

	assert_eq!(dom.dispatch(&node, "click"), 1);
}

#[test]
fn shared_handler_bubbles_from_child_to_parent() {
	let (dom, mut listeners, target) = setup();
	let count = Rc::new(RefCell::new(0));

	let shared = counting(&count);
	let tree = diff::patch(
		&dom,
		&mut listeners,
		&target,
		None,
		VElement::new("div")
			.on("click", shared.clone())
			.child(VElement::new("a").attr("href", "#").on("click", shared).child(VNode::text("Click my parent")))
			.into(),
	)
	.expect("patch");
	let div = tree.node().cloned().expect("div node");
	let link = match &tree {
		VNode::Element(element) => element.children[0].node().cloned().expect("link node"),
		VNode::Text(_) => panic!("expected an element"),
	};

	dom.dispatch(&div, "click");
	assert_eq!(*count.borrow(), 1);

	dom.dispatch(&link, "click");
	assert_eq!(*count.borrow(), 3, "the child handler fires and the parent's bubbles");
}

#[test]
fn detaching_a_missing_registration_is_a_no_op() {
	let (dom, mut listeners, target) = setup();

	listeners.detach(&dom, &target, "click", ListenerOptions::new());
	assert!(listeners.is_empty());
}
