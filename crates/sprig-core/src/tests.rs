#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use web_time::Duration;

    use crate::batch::{BatchCoordinator, UpdateTarget, Updater};
    use crate::component::{InstanceId, StatePatch};
    use crate::scheduler::Scheduler;
    use crate::*;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_record_insert_replaces_in_place() {
        let mut r = record! { "a" => 1, "b" => 2 };
        r.insert("a", 10);
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(r.get_int("a"), Some(10));
    }

    #[test]
    fn test_record_merge_is_shallow() {
        let base = record! { "a" => 1, "nested" => record! { "x" => 1 } };
        let merged = base.merged(record! { "nested" => record! { "y" => 2 }, "c" => 3 });
        assert_eq!(merged.get_int("a"), Some(1));
        assert_eq!(merged.get_int("c"), Some(3));
        let nested = merged.get("nested").and_then(Value::as_record).unwrap();
        assert!(nested.get("x").is_none());
        assert_eq!(nested.get_int("y"), Some(2));
    }

    #[test]
    fn test_shallow_equal_compares_references_by_identity() {
        let child = element!("span");
        let a = record! { "n" => 1, "child" => child.clone() };
        let b = record! { "child" => child, "n" => 1 };
        assert!(shallow_equal(&a, &b));

        let c = record! { "n" => 1, "child" => element!("span") };
        assert!(!shallow_equal(&a, &c));
    }

    #[test]
    fn test_create_element_multiple_children_are_ordered() {
        let el = element!("ul", {}, element!("li", { "key" => "a" }), element!("li", { "key" => "b" }));
        match el.children() {
            Children::Many(items) => {
                let keys: Vec<_> = items.iter().map(|c| c.key().unwrap()).collect();
                assert_eq!(keys, vec!["a", "b"]);
            }
            other => panic!("expected many children, got {other:?}"),
        }
    }

    #[test]
    fn test_create_element_single_child_is_not_wrapped() {
        let el = element!("div", {}, element!("span"));
        assert!(matches!(el.children(), Children::Single(c) if c.ty().name() == "span"));
    }

    #[test]
    fn test_create_element_lifts_key_and_ref() {
        let r = create_ref();
        let el = element!("div", { "key" => 7, "ref" => r.clone(), "id" => "x" });
        assert_eq!(el.key(), Some("7"));
        assert!(el.ref_prop().is_some_and(|p| p.ptr_eq(&RefProp::Container(r))));
        assert!(el.props().get("key").is_none());
        assert!(el.props().get("ref").is_none());
        assert_eq!(el.props().get_str("id"), Some("x"));
    }

    #[test]
    fn test_create_element_drops_booleans_and_wraps_primitives() {
        let el = create_element(
            "p",
            RawProps::new(),
            vec![
                Child::from(false),
                Child::from("a"),
                Child::from(None::<Element>),
                Child::from(3),
                Child::from(true),
            ],
        );
        let texts: Vec<_> = el.children().iter().map(|c| c.text_value().unwrap()).collect();
        assert_eq!(texts, vec!["a", "3"]);
    }

    #[test]
    fn test_to_vnode_normalises_primitives() {
        assert_eq!(to_vnode("hi").unwrap().text_value(), Some("hi"));
        assert_eq!(to_vnode(42).unwrap().text_value(), Some("42"));
        assert_eq!(to_vnode(true).unwrap().text_value(), Some("true"));
        assert!(to_vnode(None::<Element>).is_none());
        let el = element!("b");
        assert!(to_vnode(el.clone()).unwrap().ptr_eq(&el));
    }

    fn render_nothing(_: &Props) -> Option<Element> {
        None
    }

    struct Plain;

    impl Component for Plain {
        fn create(_: &Props) -> Self {
            Plain
        }

        fn render(&self, _: &This) -> Option<Element> {
            None
        }
    }

    #[test]
    fn test_classify_every_kind() {
        let fwd = forward_ref(|_: &Props, _: Option<&RefProp>| None);
        assert!(is_host_element(&element!("div")));
        assert!(is_class_component(&element!(class::<Plain>())));
        assert!(is_function_component(&element!(function(render_nothing))));
        assert!(is_forward_ref(&element!(fwd)));
        assert!(is_text(&Element::text("x")));
        assert_eq!(classify(&Element::text("x")), NodeKind::Text);
    }

    #[test]
    fn test_element_type_identity() {
        assert_eq!(ElementType::from(function(render_nothing)), ElementType::from(function(render_nothing)));
        assert_eq!(ElementType::from("div"), ElementType::from("div"));
        assert_ne!(ElementType::from("div"), ElementType::from("span"));
        assert_ne!(ElementType::from(class::<Plain>()), ElementType::from(function(render_nothing)));
        assert_eq!(class::<Plain>().name(), "Plain");

        type Render = fn(&Props) -> Option<Element>;
        let a: Render = render_nothing;
        let b: Render = render_empty_text;
        assert_eq!(ElementType::from(function(a)), ElementType::from(function(a)));
        assert_ne!(ElementType::from(function(a)), ElementType::from(function(b)));
    }

    fn render_empty_text(_: &Props) -> Option<Element> {
        Some(Element::text(""))
    }

    #[test]
    fn test_ref_current_is_reassignable() {
        let r = create_ref();
        assert!(r.current().is_none());
        let mut doc = Document::new();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        r.set_current(Some(RefTarget::Host(a)));
        assert_eq!(r.host(), Some(a));
        r.set_current(Some(RefTarget::Host(b)));
        assert_eq!(r.host(), Some(b));
        r.set_current(None);
        assert!(r.is_empty());
    }

    #[test]
    fn test_document_insert_before_and_replace() {
        let mut doc = Document::new();
        let list = doc.create_element("ul");
        let a = doc.create_element("li");
        let b = doc.create_element("li");
        let c = doc.create_element("li");
        doc.append_child(list, a).unwrap();
        doc.append_child(list, c).unwrap();
        doc.insert_before(list, b, Some(c)).unwrap();
        assert_eq!(doc.children(list), &[a, b, c]);

        let d = doc.create_element("li");
        doc.replace_child(list, d, b).unwrap();
        assert_eq!(doc.children(list), &[a, d, c]);
        assert_eq!(doc.parent(b), None);
    }

    #[test]
    fn test_document_rejects_cycles_and_text_parents() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(outer, inner).unwrap();
        assert!(matches!(
            doc.append_child(inner, outer),
            Err(Error::HierarchyRequest { .. })
        ));

        let text = doc.create_text("t");
        assert!(matches!(doc.append_child(text, inner), Err(Error::NotAnElement(_))));

        let stray = doc.create_element("span");
        let orphan = doc.create_element("span");
        assert!(matches!(
            doc.insert_before(outer, stray, Some(orphan)),
            Err(Error::MissingAnchor(_))
        ));
    }

    #[test]
    fn test_document_remove_frees_subtree() {
        let mut doc = Document::new();
        let body = doc.body();
        let div = doc.create_element("div");
        let span = doc.create_element("span");
        doc.set_attribute(span, "id", "s").unwrap();
        doc.append_child(div, span).unwrap();
        doc.append_child(body, div).unwrap();
        assert_eq!(doc.get_element_by_id(body, "s"), Some(span));

        doc.remove(div).unwrap();
        assert!(!doc.exists(span));
        assert_eq!(doc.get_element_by_id(body, "s"), None);
        assert!(matches!(doc.set_attribute(span, "id", "t"), Err(Error::HostNodeMissing(_))));
    }

    #[test]
    fn test_event_name_from_prop() {
        assert_eq!(event_name("onClick").as_deref(), Some("click"));
        assert_eq!(event_name("onKeyDown").as_deref(), Some("keydown"));
        assert_eq!(event_name("once"), None);
        assert_eq!(event_name("on"), None);
    }

    #[test]
    fn test_batch_coordinator_dedups_and_nests() {
        let mut ids = slotmap::SlotMap::<InstanceId, ()>::with_key();
        let a = ids.insert(());
        let b = ids.insert(());

        let mut batch = BatchCoordinator::default();
        batch.begin();
        batch.begin();
        assert!(batch.enqueue(UpdateTarget::Class(a)));
        assert!(batch.enqueue(UpdateTarget::Class(b)));
        assert!(!batch.enqueue(UpdateTarget::Class(a)));
        assert_eq!(batch.end(), None);
        assert!(batch.is_batching());
        assert_eq!(
            batch.end(),
            Some(vec![UpdateTarget::Class(a), UpdateTarget::Class(b)])
        );
        assert!(!batch.is_batching());
    }

    #[test]
    fn test_updater_takes_everything_at_once() {
        let mut updater = Updater::default();
        updater.enqueue(StatePatch::from(record! { "a" => 1 }), None);
        updater.enqueue(StatePatch::from(record! { "b" => 2 }), Some(Box::new(|| {})));
        assert!(updater.has_pending());
        let (patches, callbacks) = updater.take();
        assert_eq!(patches.len(), 2);
        assert_eq!(callbacks.len(), 1);
        assert!(!updater.has_pending());
    }

    #[test]
    fn test_state_patches_fold_over_the_accumulator() {
        let mut state = record! { "n" => 0 };
        let patches = vec![
            StatePatch::from(record! { "n" => 5 }),
            StatePatch::update(|s| record! { "n" => s.get_int("n").unwrap_or(0) * 2 }),
            StatePatch::update(|s| record! { "n" => s.get_int("n").unwrap_or(0) + 1 }),
        ];
        for patch in patches {
            patch.apply_to(&mut state);
        }
        assert_eq!(state.get_int("n"), Some(11));
    }

    #[test]
    fn test_scheduler_timers_fire_in_deadline_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut scheduler = Scheduler::default();
        for (name, ms) in [("late", 20), ("early", 5), ("cleared", 10)] {
            let log = log.clone();
            let id = scheduler.set_timeout(
                Duration::from_millis(ms),
                Box::new(move || log.borrow_mut().push(name)),
            );
            if name == "cleared" {
                assert!(scheduler.clear_timeout(id));
            }
        }

        assert!(scheduler.pop_timer(Some(Duration::from_millis(1))).is_none());
        while let Some(job) = scheduler.pop_timer(None) {
            job();
        }
        assert_eq!(*log.borrow(), vec!["early", "late"]);
        assert_eq!(scheduler.now(), Duration::from_millis(20));
        assert!(scheduler.is_idle());
    }

    #[test]
    fn test_hooks_outside_render_fall_back_to_detached_slots() {
        init_logger();
        let (value, setter) = use_state(3);
        assert_eq!(value, 3);
        setter.set(4);
        let r = use_ref(None);
        assert!(r.is_empty());
    }

    #[test]
    fn test_dispose_runs_once() {
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        let d = on_unmount(move || *c.borrow_mut() += 1);
        assert!(d.is_armed());
        d.run();
        d.run();
        assert_eq!(*count.borrow(), 1);
        assert!(!d.is_armed());
        assert!(!Dispose::from(()).is_armed());
    }
}
