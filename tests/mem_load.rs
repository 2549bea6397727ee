use futures::executor::block_on;
use suberin::{
	component::{Component, ComponentMeta},
	diff,
	dom::Dom,
	lifecycle::ComponentHost,
	listeners::ListenerMap,
	load::to_vnode,
	memory::MemoryDom,
	queue::ImmediateQueue,
	styles::StyleRegistry,
	vdom::{VElement, VNode},
};

#[test]
fn round_trip_patch_is_mutation_free() {
	let dom = MemoryDom::new();
	let mut listeners = ListenerMap::new();
	let host = dom.create_element("div").expect("host element");

	let section = dom.create_element("section").expect("element");
	dom.set_attribute(&section, "id", "top").expect("attribute");
	let span = dom.create_element("span").expect("element");
	dom.insert_before(&span, &dom.create_text("hi"), None).expect("insert");
	dom.insert_before(&section, &span, None).expect("insert");
	dom.insert_before(&section, &dom.create_text("!"), None).expect("insert");
	dom.insert_before(&host, &section, None).expect("insert");

	let old = to_vnode(&dom, &section).expect("conversion");
	let new = old.clone();
	let rendered = dom.outer_html(&host);
	let baseline = dom.mutations();

	let patched = diff::patch(&dom, &mut listeners, &host, Some(old), new).expect("patch");

	assert_eq!(dom.mutations(), baseline, "a converted tree patched against itself must touch nothing");
	assert_eq!(dom.outer_html(&host), rendered);
	assert_eq!(patched.node().cloned(), Some(section));
}

#[test]
fn conversion_skips_other_node_kinds() {
	let dom = MemoryDom::new();
	let section = dom.create_element("section").expect("element");
	dom.insert_before(&section, &dom.create_comment("ignore me"), None).expect("insert");
	let span = dom.create_element("span").expect("element");
	dom.insert_before(&section, &span, None).expect("insert");

	assert!(to_vnode(&dom, &dom.create_comment("top")).is_none());

	let tree = to_vnode(&dom, &section).expect("conversion");
	match tree {
		VNode::Element(element) => {
			assert_eq!(element.children.len(), 1, "comments do not convert");
			assert!(matches!(&element.children[0], VNode::Element(child) if child.name == "span"));
		}
		VNode::Text(_) => panic!("expected an element"),
	}
}

#[test]
fn conversion_preserves_sibling_order_and_attributes() {
	let dom = MemoryDom::new();
	let list = dom.create_element("ol").expect("element");
	dom.set_attribute(&list, "start", "3").expect("attribute");
	for text in &["a", "b", "c"] {
		let item = dom.create_element("li").expect("element");
		dom.insert_before(&item, &dom.create_text(text), None).expect("insert");
		dom.insert_before(&list, &item, None).expect("insert");
	}

	let tree = to_vnode(&dom, &list).expect("conversion");
	match tree {
		VNode::Element(element) => {
			assert_eq!(element.name, "ol");
			assert_eq!(element.attributes.len(), 1);
			assert_eq!(element.attributes[0].name, "start");
			let texts: Vec<String> = element
				.children
				.iter()
				.map(|child| match child {
					VNode::Element(item) => match &item.children[0] {
						VNode::Text(text) => text.text.clone(),
						VNode::Element(_) => panic!("expected text"),
					},
					VNode::Text(_) => panic!("expected an element"),
				})
				.collect();
			assert_eq!(texts, vec!["a", "b", "c"]);
		}
		VNode::Text(_) => panic!("expected an element"),
	}
}

struct Greeting;

impl Component<MemoryDom> for Greeting {
	fn render(&mut self) -> Option<VNode<MemoryDom>> {
		Some(VElement::new("span").child(VNode::text("hi")).into())
	}
}

#[test]
fn first_render_adopts_pre_rendered_content() {
	let dom = MemoryDom::new();
	let queue = ImmediateQueue::new();
	let mut styles = StyleRegistry::new();

	let host_node = dom.create_element("x-greeting").expect("host element");
	let pre_rendered = dom.create_element("span").expect("element");
	dom.insert_before(&pre_rendered, &dom.create_text("hi"), None).expect("insert");
	dom.insert_before(&host_node, &pre_rendered, None).expect("insert");
	let baseline = dom.mutations();

	let host = ComponentHost::new(Greeting, ComponentMeta::new("x-greeting"), host_node.clone());
	block_on(host.connect(&dom, &queue, &mut styles)).expect("connect");

	assert_eq!(dom.child(&host_node, 0), Some(pre_rendered), "matching pre-rendered content is reused, not rebuilt");
	assert_eq!(dom.mutations(), baseline, "adopting identical content must touch nothing");
	assert_eq!(dom.outer_html(&host_node), "<x-greeting><span>hi</span></x-greeting>");
}
