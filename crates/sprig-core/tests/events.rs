use std::cell::RefCell;
use std::rc::Rc;

use sprig_core::prelude::*;

type Trail = Rc<RefCell<Vec<String>>>;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn recorder(trail: &Trail, name: &'static str) -> EventHandler {
    let trail = trail.clone();
    on(move |_| trail.borrow_mut().push(name.to_string()))
}

struct Tree {
    rt: Runtime,
    root: HostId,
}

impl Tree {
    fn render(element: Element) -> Self {
        init_logger();
        let rt = Runtime::new();
        let root = rt.create_container("div");
        rt.render(element, root).unwrap();
        Tree { rt, root }
    }

    fn find(&self, id: &str) -> HostId {
        self.rt.document().get_element_by_id(self.root, id).unwrap()
    }
}

#[test]
fn click_bubbles_from_target_to_ancestors() {
    let trail = Trail::default();
    let tree = Tree::render(element!("div", { "id" => "outer", "onClick" => recorder(&trail, "outer") },
        element!("p", { "id" => "middle" },
            element!("button", { "id" => "inner", "onClick" => recorder(&trail, "inner") }),
        ),
    ));

    let outcome = tree.rt.dispatch_event(NativeEvent::click(tree.find("inner")));

    assert!(outcome.handled);
    assert!(!outcome.propagation_stopped);
    assert_eq!(*trail.borrow(), vec!["inner", "outer"]);
}

#[test]
fn current_target_follows_the_bubbling_path() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = |seen: &Rc<RefCell<Vec<(HostId, HostId)>>>| {
        let seen = seen.clone();
        on(move |ev| seen.borrow_mut().push((ev.target(), ev.current_target())))
    };
    let tree = Tree::render(element!("div", { "id" => "outer", "onClick" => log(&seen) },
        element!("button", { "id" => "inner", "onClick" => log(&seen) }),
    ));
    let (outer, inner) = (tree.find("outer"), tree.find("inner"));

    tree.rt.dispatch_event(NativeEvent::click(inner));

    assert_eq!(*seen.borrow(), vec![(inner, inner), (inner, outer)]);
}

#[test]
fn stop_propagation_halts_bubbling() {
    let trail = Trail::default();
    let t = trail.clone();
    let stopper = on(move |ev| {
        t.borrow_mut().push("inner".into());
        ev.stop_propagation();
    });
    let tree = Tree::render(element!("div", { "onClick" => recorder(&trail, "outer") },
        element!("button", { "id" => "inner", "onClick" => stopper }),
    ));

    let outcome = tree.rt.dispatch_event(NativeEvent::click(tree.find("inner")));

    assert!(outcome.propagation_stopped);
    assert_eq!(*trail.borrow(), vec!["inner"]);
}

#[test]
fn prevent_default_is_reported_to_the_host() {
    let submit = on(|ev| ev.prevent_default());
    let tree = Tree::render(element!("form", { "id" => "form", "onSubmit" => submit }));

    let outcome = tree.rt.dispatch_event(NativeEvent::new("submit", tree.find("form")));

    assert!(outcome.default_prevented);
    assert!(outcome.handled);
}

#[test]
fn event_types_nobody_listens_for_are_ignored() {
    let trail = Trail::default();
    let tree = Tree::render(element!("div", { "id" => "d", "onClick" => recorder(&trail, "click") }));

    let outcome = tree.rt.dispatch_event(NativeEvent::new("scroll", tree.find("d")));

    assert_eq!(outcome, DispatchOutcome::default());
    assert!(trail.borrow().is_empty());
}

#[test]
fn event_payload_reaches_the_handler() {
    let typed = Rc::new(RefCell::new(Vec::new()));
    let keys = Rc::new(RefCell::new(Vec::new()));
    let (t, k) = (typed.clone(), keys.clone());
    let on_input = on(move |ev| t.borrow_mut().push(ev.value().unwrap_or_default().to_string()));
    let on_key = on(move |ev| {
        if let EventData::Keyboard { key } = ev.data() {
            k.borrow_mut().push(key.clone());
        }
    });
    let tree = Tree::render(element!("input", { "id" => "field", "onInput" => on_input, "onKeyDown" => on_key }));
    let field = tree.find("field");

    tree.rt.dispatch_event(NativeEvent::input(field, "hello"));
    tree.rt.dispatch_event(NativeEvent::key_down(field, "Enter"));
    tree.rt.dispatch_event(NativeEvent::new("KeyDown", field).with_data(EventData::Keyboard { key: "a".into() }));

    assert_eq!(*typed.borrow(), vec!["hello"]);
    assert_eq!(*keys.borrow(), vec!["Enter", "a"]);
}

struct Switch;

impl Component for Switch {
    fn create(_props: &Props) -> Self {
        Switch
    }

    fn initial_state(_props: &Props) -> State {
        record! { "armed" => true, "clicks" => 0 }
    }

    fn render(&self, this: &This) -> Option<Element> {
        let clicks = this.state().get_int("clicks").unwrap_or(0);
        let mut props = RawProps::new().with("id", "switch");
        if this.state().get_bool("armed").unwrap_or(false) {
            let handle = this.handle().clone();
            props = props.with(
                "onClick",
                on(move |_| handle.set_state(record! { "armed" => false, "clicks" => clicks + 1 })),
            );
        }
        Some(create_element("button", props, vec![Child::from(clicks)]))
    }
}

#[test]
fn removed_listener_no_longer_fires() {
    let tree = Tree::render(element!(class::<Switch>()));
    let button = tree.find("switch");

    assert!(tree.rt.dispatch_event(NativeEvent::click(button)).handled);
    assert_eq!(tree.rt.document().text_content(button), "1");
    assert!(!tree.rt.document().has_listeners(button));

    assert!(!tree.rt.dispatch_event(NativeEvent::click(button)).handled);
    assert_eq!(tree.rt.document().text_content(button), "1");
}
