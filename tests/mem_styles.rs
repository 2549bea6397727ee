use futures::executor::block_on;
use suberin::{
	component::{Component, ComponentMeta, Encapsulation},
	dom::Dom,
	lifecycle::ComponentHost,
	memory::{MemoryDom, NodeHandle},
	queue::ImmediateQueue,
	styles::StyleRegistry,
	vdom::{VElement, VNode},
};

struct Widget;

impl Component<MemoryDom> for Widget {
	fn render(&mut self) -> Option<VNode<MemoryDom>> {
		Some(VElement::new("span").child(VNode::text("s")).into())
	}
}

fn connect(dom: &MemoryDom, styles: &mut StyleRegistry, meta: &ComponentMeta, host_node: &NodeHandle) -> ComponentHost<MemoryDom, Widget> {
	let queue = ImmediateQueue::new();
	let host = ComponentHost::new(Widget, meta.clone(), host_node.clone());
	block_on(host.connect(dom, &queue, styles)).expect("connect");
	host
}

#[test]
fn shadow_mode_renders_into_an_isolated_root() {
	let dom = MemoryDom::new();
	let mut styles = StyleRegistry::new();
	let meta = ComponentMeta::new("x-card").encapsulation(Encapsulation::Shadow).style(".inner{}");
	let host_node = dom.create_element("x-card").expect("host element");

	let host = connect(&dom, &mut styles, &meta, &host_node);

	assert_eq!(dom.child_count(&host_node), 0, "rendered output must not live among the host's children");
	let shadow = dom.shadow_root(&host_node).expect("shadow root");
	assert_eq!(host.target(), Some(shadow.clone()));
	assert_eq!(dom.outer_html(&shadow), "<style>.inner{}</style><span>s</span>");
	assert_eq!(dom.child_count(&dom.head()), 0, "shadow styles stay out of the document context");
}

#[test]
fn scoped_mode_marks_the_host_and_injects_once_per_tag() {
	let dom = MemoryDom::new();
	let mut styles = StyleRegistry::new();
	let meta = ComponentMeta::new("x-badge").encapsulation(Encapsulation::Scoped).style(".sc-x-badge{}");

	let first = dom.create_element("x-badge").expect("host element");
	let second = dom.create_element("x-badge").expect("host element");
	let host = connect(&dom, &mut styles, &meta, &first);
	connect(&dom, &mut styles, &meta, &second);

	assert_eq!(dom.child_count(&dom.head()), 1, "one stylesheet per tag, no matter how many instances");
	assert_eq!(dom.attribute(&first, "class"), Some("sc-x-badge".to_owned()));
	assert_eq!(dom.attribute(&second, "class"), Some("sc-x-badge".to_owned()));
	assert_eq!(host.target(), Some(first.clone()), "scoped output renders into the host itself");
	assert!(styles.is_applied("x-badge"));
}

#[test]
fn plain_mode_injects_once_and_leaves_the_host_unmarked() {
	let dom = MemoryDom::new();
	let mut styles = StyleRegistry::new();
	let meta = ComponentMeta::new("x-note").style("x-note{}");

	let first = dom.create_element("x-note").expect("host element");
	let second = dom.create_element("x-note").expect("host element");
	connect(&dom, &mut styles, &meta, &first);
	connect(&dom, &mut styles, &meta, &second);

	assert_eq!(dom.child_count(&dom.head()), 1);
	assert_eq!(dom.attribute(&first, "class"), None);
	assert_eq!(dom.outer_html(&first), "<x-note><span>s</span></x-note>");
}

#[test]
fn without_style_text_nothing_is_injected() {
	let dom = MemoryDom::new();
	let mut styles = StyleRegistry::new();
	let meta = ComponentMeta::new("x-bare").encapsulation(Encapsulation::Scoped);
	let host_node = dom.create_element("x-bare").expect("host element");

	connect(&dom, &mut styles, &meta, &host_node);

	assert_eq!(dom.child_count(&dom.head()), 0);
	assert_eq!(dom.attribute(&host_node, "class"), Some("sc-x-bare".to_owned()), "the scope class does not depend on style text");
}

#[test]
fn reset_forgets_applied_records() {
	let dom = MemoryDom::new();
	let mut styles = StyleRegistry::new();
	let meta = ComponentMeta::new("x-note").style("x-note{}");

	connect(&dom, &mut styles, &meta, &dom.create_element("x-note").expect("host element"));
	styles.reset();
	connect(&dom, &mut styles, &meta, &dom.create_element("x-note").expect("host element"));

	assert_eq!(dom.child_count(&dom.head()), 2);
}
