use std::cell::Cell;
use std::rc::Rc;

use sprig_core::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn renders_of(props: &Props) -> Rc<Cell<usize>> {
    props
        .get("renders")
        .and_then(|v| v.downcast::<Rc<Cell<usize>>>())
        .cloned()
        .unwrap_or_default()
}

struct Label {
    renders: Rc<Cell<usize>>,
}

impl Component for Label {
    fn create(props: &Props) -> Self {
        Label {
            renders: renders_of(props),
        }
    }

    fn render(&self, this: &This) -> Option<Element> {
        self.renders.set(self.renders.get() + 1);
        let text = this.props().get_str("text").unwrap_or_default().to_string();
        Some(element!("b", {}, text))
    }
}

struct Parent {
    renders: Value,
}

impl Component for Parent {
    fn create(props: &Props) -> Self {
        Parent {
            renders: props.get("renders").cloned().unwrap_or_default(),
        }
    }

    fn initial_state(_props: &Props) -> State {
        record! { "tick" => 0, "text" => "hello" }
    }

    fn render(&self, this: &This) -> Option<Element> {
        let s = this.state();
        let text = s.get_str("text").unwrap_or_default().to_string();
        Some(element!("div", { "data-tick" => s.get_int("tick").unwrap_or(0) },
            element!(class::<Pure<Label>>(), { "text" => text.clone(), "renders" => self.renders.clone() }),
            element!(class::<Label>(), { "text" => text, "renders" => self.renders.clone() }),
        ))
    }
}

#[test]
fn pure_component_skips_equal_props_but_tracks_changes() {
    init_logger();
    let rt = Runtime::new();
    let root = rt.create_container("div");
    let pure_renders = Rc::new(Cell::new(0usize));
    let r = create_ref();
    rt.render(
        element!(class::<Parent>(), { "renders" => Value::any(pure_renders.clone()), "ref" => r.clone() }),
        root,
    )
    .unwrap();
    // One render each for the pure and the plain label.
    assert_eq!(pure_renders.get(), 2);
    let parent = r.instance().unwrap();

    parent.set_state(record! { "tick" => 1 });
    // Only the plain label re-rendered.
    assert_eq!(pure_renders.get(), 3);

    parent.set_state(record! { "text" => "bye" });
    assert_eq!(pure_renders.get(), 5);
    assert_eq!(rt.document().text_content(root), "byebye");
}

struct Sticky {
    renders: Rc<Cell<usize>>,
}

impl Component for Sticky {
    fn create(props: &Props) -> Self {
        Sticky {
            renders: renders_of(props),
        }
    }

    fn initial_state(_props: &Props) -> State {
        record! { "n" => 1 }
    }

    fn render(&self, this: &This) -> Option<Element> {
        self.renders.set(self.renders.get() + 1);
        Some(element!("i", {}, this.state().get_int("n").unwrap_or(0)))
    }
}

#[test]
fn pure_component_skips_equal_state() {
    init_logger();
    let rt = Runtime::new();
    let root = rt.create_container("div");
    let renders = Rc::new(Cell::new(0usize));
    let r = create_ref();
    rt.render(
        element!(class::<Pure<Sticky>>(), { "renders" => Value::any(renders.clone()), "ref" => r.clone() }),
        root,
    )
    .unwrap();
    let handle = r.instance().unwrap();
    assert!(handle.downcast::<Pure<Sticky>>().is_some());

    handle.set_state(record! { "n" => 1 });
    assert_eq!(renders.get(), 1);

    handle.set_state(record! { "n" => 2 });
    assert_eq!(renders.get(), 2);
    assert_eq!(rt.document().text_content(root), "2");
}
