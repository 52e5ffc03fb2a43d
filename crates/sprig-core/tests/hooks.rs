use std::cell::{Cell, RefCell};
use std::rc::Rc;

use sprig_core::*;

type Log = Rc<RefCell<Vec<String>>>;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn log_of(props: &Props) -> Log {
    props
        .get("log")
        .and_then(|v| v.downcast::<Log>())
        .cloned()
        .unwrap_or_default()
}

fn counter(props: &Props) -> Option<Element> {
    let step = props.get_int("step").unwrap_or(1);
    let (count, set_count) = use_state(0i64);
    let inc = on(move |_| set_count.update(|c| c + step));
    Some(element!("button", { "id" => props.get_str("id").unwrap_or("c"), "onClick" => inc }, count))
}

#[test]
fn use_state_updates_on_click() {
    init_logger();
    let rt = Runtime::new();
    let root = rt.create_container("div");
    rt.render(element!(function(counter), { "id" => "c", "step" => 2 }), root)
        .unwrap();
    let button = rt.document().get_element_by_id(root, "c").unwrap();

    rt.dispatch_event(NativeEvent::click(button));
    rt.dispatch_event(NativeEvent::click(button));

    assert_eq!(rt.document().text_content(root), "4");
    assert_eq!(rt.document().get_element_by_id(root, "c"), Some(button));
}

#[test]
fn hook_state_belongs_to_each_mounted_component() {
    init_logger();
    let rt = Runtime::new();
    let root = rt.create_container("div");
    rt.render(
        element!("div", {},
            element!(function(counter), { "id" => "a" }),
            element!(function(counter), { "id" => "b" }),
        ),
        root,
    )
    .unwrap();

    let b = rt.document().get_element_by_id(root, "b").unwrap();
    rt.dispatch_event(NativeEvent::click(b));

    let doc = rt.document();
    let a = doc.get_element_by_id(root, "a").unwrap();
    assert_eq!(doc.text_content(a), "0");
    assert_eq!(doc.text_content(b), "1");
}

#[derive(Clone, Copy)]
enum Action {
    Add(i64),
    Reset,
}

fn tally(_props: &Props) -> Option<Element> {
    let (total, dispatch) = use_reducer(
        |total: &i64, action: Action| match action {
            Action::Add(n) => total + n,
            Action::Reset => 0,
        },
        0,
    );
    let add = dispatch.clone();
    let on_add = on(move |_| {
        add.dispatch(Action::Add(5));
        add.dispatch(Action::Add(1));
    });
    let on_reset = on(move |_| dispatch.dispatch(Action::Reset));
    Some(element!("div", {},
        element!("span", { "id" => "total" }, total),
        element!("button", { "id" => "add", "onClick" => on_add }),
        element!("button", { "id" => "reset", "onClick" => on_reset }),
    ))
}

#[test]
fn use_reducer_folds_actions() {
    init_logger();
    let rt = Runtime::new();
    let root = rt.create_container("div");
    rt.render(element!(function(tally)), root).unwrap();
    let find = |id: &str| rt.document().get_element_by_id(root, id).unwrap();

    rt.dispatch_event(NativeEvent::click(find("add")));
    assert_eq!(rt.document().text_content(find("total")), "6");
    rt.dispatch_event(NativeEvent::click(find("add")));
    assert_eq!(rt.document().text_content(find("total")), "12");
    rt.dispatch_event(NativeEvent::click(find("reset")));
    assert_eq!(rt.document().text_content(find("total")), "0");
}

fn effects(props: &Props) -> Option<Element> {
    let log = log_of(props);
    let dep = props.get_int("dep").unwrap_or(0);
    log.borrow_mut().push(format!("render {dep}"));

    let l = log.clone();
    use_layout_effect(dep, move || {
        l.borrow_mut().push(format!("layout {dep}"));
        let l = l.clone();
        on_unmount(move || l.borrow_mut().push(format!("layout cleanup {dep}")))
    });
    let l = log.clone();
    use_effect(dep, move || {
        l.borrow_mut().push(format!("effect {dep}"));
        let l = l.clone();
        on_unmount(move || l.borrow_mut().push(format!("effect cleanup {dep}")))
    });
    Some(element!("i"))
}

struct EffectHost {
    log: Log,
}

impl Component for EffectHost {
    fn create(props: &Props) -> Self {
        EffectHost { log: log_of(props) }
    }

    fn initial_state(_props: &Props) -> State {
        record! { "dep" => 1, "show" => true }
    }

    fn render(&self, this: &This) -> Option<Element> {
        if !this.state().get_bool("show").unwrap_or(false) {
            return None;
        }
        let dep = this.state().get_int("dep").unwrap_or(0);
        Some(element!(function(effects), { "log" => Value::any(self.log.clone()), "dep" => dep }))
    }
}

#[test]
fn layout_effects_run_before_effects_and_clean_up() {
    init_logger();
    let rt = Runtime::new();
    let root = rt.create_container("div");
    let log = Log::default();
    let host = create_ref();
    rt.render(
        element!(class::<EffectHost>(), { "log" => Value::any(log.clone()), "ref" => host.clone() }),
        root,
    )
    .unwrap();

    assert_eq!(*log.borrow(), vec!["render 1", "layout 1"]);
    rt.run_until_idle();
    assert_eq!(*log.borrow(), vec!["render 1", "layout 1", "effect 1"]);

    let handle = host.instance().unwrap();
    log.borrow_mut().clear();
    handle.set_state(record! { "dep" => 1 });
    rt.run_until_idle();
    assert_eq!(*log.borrow(), vec!["render 1"]);

    log.borrow_mut().clear();
    handle.set_state(record! { "dep" => 2 });
    rt.run_until_idle();
    assert_eq!(
        *log.borrow(),
        vec!["render 2", "layout cleanup 1", "layout 2", "effect cleanup 1", "effect 2"]
    );

    log.borrow_mut().clear();
    handle.set_state(record! { "show" => false });
    rt.run_until_idle();
    assert_eq!(*log.borrow(), vec!["layout cleanup 2", "effect cleanup 2"]);
}

#[test]
fn effect_of_a_component_unmounted_before_it_ran_is_skipped() {
    init_logger();
    let rt = Runtime::new();
    let root = rt.create_container("div");
    let log = Log::default();
    rt.render(element!(function(effects), { "log" => Value::any(log.clone()), "dep" => 7 }), root)
        .unwrap();
    rt.unmount_container(root).unwrap();
    rt.run_until_idle();

    assert_eq!(*log.borrow(), vec!["render 7", "layout 7", "layout cleanup 7"]);
}

fn ref_keeper(props: &Props) -> Option<Element> {
    let r = use_ref(None);
    if let Some(seen) = props.get("seen").and_then(|v| v.downcast::<RefCell<Vec<Ref>>>()) {
        seen.borrow_mut().push(r.clone());
    }
    let (n, set_n) = use_state(0);
    let bump = on(move |_| set_n.set(n + 1));
    Some(element!("div", { "id" => "keeper", "ref" => r, "onClick" => bump }, n))
}

#[test]
fn use_ref_is_stable_across_renders() {
    init_logger();
    let rt = Runtime::new();
    let root = rt.create_container("div");
    let seen = Rc::new(RefCell::new(Vec::<Ref>::new()));
    rt.render(element!(function(ref_keeper), { "seen" => Value::Any(seen.clone()) }), root)
        .unwrap();
    let keeper = rt.document().get_element_by_id(root, "keeper").unwrap();

    rt.dispatch_event(NativeEvent::click(keeper));
    rt.dispatch_event(NativeEvent::click(keeper));

    let seen = seen.borrow();
    assert_eq!(seen.len(), 3);
    assert!(seen[0].ptr_eq(&seen[1]) && seen[1].ptr_eq(&seen[2]));
    assert_eq!(seen[0].host(), Some(keeper));
}

struct FieldHandle {
    set_value: StateSetter<String>,
    focused: Rc<Cell<bool>>,
}

impl FieldHandle {
    fn focus(&self) {
        self.focused.set(true);
    }
}

fn field(_props: &Props, ref_prop: Option<&RefProp>) -> Option<Element> {
    let (value, set_value) = use_state(String::from("initial"));
    let focused = Rc::new(Cell::new(false));
    use_imperative_handle(ref_prop, (), move || FieldHandle { set_value, focused });
    Some(element!("input", { "id" => "field", "value" => value }))
}

#[test]
fn forward_ref_exposes_an_imperative_handle() {
    init_logger();
    let rt = Runtime::new();
    let root = rt.create_container("div");
    let r = create_ref();
    rt.render(element!(forward_ref(field), { "ref" => r.clone() }), root)
        .unwrap();

    let handle = r.handle::<FieldHandle>().expect("handle attached after layout effects");
    handle.focus();
    assert!(handle.focused.get());

    handle.set_value.set("changed".into());
    let doc = rt.document();
    let input = doc.get_element_by_id(root, "field").unwrap();
    assert_eq!(doc.attribute(input, "value"), Some("changed"));
    drop(doc);

    rt.unmount_container(root).unwrap();
    assert!(r.is_empty());
}

fn fancy_input(_props: &Props, ref_prop: Option<&RefProp>) -> Option<Element> {
    let props = RawProps::new()
        .with("className", "fancy")
        .with("ref", ref_prop.cloned());
    Some(create_element("input", props, vec![]))
}

fn plain_box(_props: &Props, _ref_prop: Option<&RefProp>) -> Option<Element> {
    Some(element!("section"))
}

#[test]
fn forward_ref_reaches_the_inner_host_or_falls_back_to_the_output() {
    init_logger();
    let rt = Runtime::new();
    let root = rt.create_container("div");
    let input_ref = create_ref();
    let box_ref = create_ref();
    rt.render(
        element!("div", {},
            element!(forward_ref(fancy_input), { "ref" => input_ref.clone() }),
            element!(forward_ref(plain_box), { "ref" => box_ref.clone() }),
        ),
        root,
    )
    .unwrap();

    let doc = rt.document();
    let input = doc.get_elements_by_tag_name(root, "input")[0];
    let section = doc.get_elements_by_tag_name(root, "section")[0];
    assert_eq!(input_ref.host(), Some(input));
    assert_eq!(doc.attribute(input, "class"), Some("fancy"));
    assert_eq!(box_ref.host(), Some(section));
}

fn shape(props: &Props, _ref_prop: Option<&RefProp>) -> Option<Element> {
    Some(create_element(props.get_str("tag").unwrap_or("section"), RawProps::new(), vec![]))
}

/// Hands one of two refs to a forwarded-ref `shape`.
struct Holder {
    first: Ref,
    second: Ref,
}

impl Component for Holder {
    fn create(props: &Props) -> Self {
        let pick = |name: &str| props.get(name).and_then(|v| v.downcast::<Ref>()).cloned().unwrap_or_default();
        Holder {
            first: pick("first"),
            second: pick("second"),
        }
    }

    fn initial_state(_props: &Props) -> State {
        record! { "second" => false, "tag" => "section" }
    }

    fn render(&self, this: &This) -> Option<Element> {
        let r = if this.state().get_bool("second").unwrap_or(false) {
            self.second.clone()
        } else {
            self.first.clone()
        };
        let tag = this.state().get_str("tag").unwrap_or("section").to_string();
        Some(element!(forward_ref(shape), { "ref" => r, "tag" => tag }))
    }
}

#[test]
fn forwarded_ref_follows_a_replaced_host_and_a_new_ref() {
    init_logger();
    let rt = Runtime::new();
    let root = rt.create_container("div");
    let (first, second, holder) = (create_ref(), create_ref(), create_ref());
    rt.render(
        element!(class::<Holder>(), {
            "first" => Value::any(first.clone()),
            "second" => Value::any(second.clone()),
            "ref" => holder.clone(),
        }),
        root,
    )
    .unwrap();
    let holder = holder.instance().unwrap();
    let section = rt.document().get_elements_by_tag_name(root, "section")[0];
    assert_eq!(first.host(), Some(section));

    holder.set_state(record! { "tag" => "article" });
    let article = rt.document().get_elements_by_tag_name(root, "article")[0];
    assert_eq!(first.host(), Some(article));

    holder.set_state(record! { "second" => true });
    assert!(first.is_empty());
    assert_eq!(second.host(), Some(article));
}
