use std::cell::RefCell;
use std::rc::Rc;

use super::{VNode, VNodeId};
use crate::batch::Updater;
use crate::classify::{NodeKind, classify};
use crate::component::{Instance, This};
use crate::dom::HostId;
use crate::element::{Element, ElementType, Props, RefTarget};
use crate::error::Result;
use crate::events::event_name;
use crate::hooks::{HookFrame, HookStore};
use crate::runtime::{Inner, PostPass};
use crate::value::Value;

impl Inner {
    /// Builds a detached subtree for `element`. `parent` is the host node the
    /// subtree will be attached under; attaching is the caller's job.
    pub(crate) fn create(&self, element: &Element, parent: Option<HostId>) -> Result<VNodeId> {
        let id = self
            .vnodes
            .borrow_mut()
            .insert(VNode::new(element.clone(), parent));
        self.bump_stats(|s| s.mounts += 1);

        let result = match classify(element) {
            NodeKind::Text => self.mount_text(id, element),
            NodeKind::Host => self.mount_host(id, element),
            NodeKind::Function | NodeKind::ForwardRef => self.mount_function(id, element, parent),
            NodeKind::Class => self.mount_class(id, element, parent),
        };

        if let Err(err) = result {
            log::warn!("mounting <{}> failed: {err}", element.ty().name());
            let host = self.host_of(id);
            self.unmount(id);
            if let Some(host) = host {
                self.document.borrow_mut().free(host);
            }
            return Err(err);
        }
        Ok(id)
    }

    fn set_host(&self, id: VNodeId, host: HostId) {
        if let Some(node) = self.vnodes.borrow_mut().get_mut(id) {
            node.host = Some(host);
        }
    }

    fn set_rendered(&self, id: VNodeId, rendered: Option<VNodeId>) {
        if let Some(node) = self.vnodes.borrow_mut().get_mut(id) {
            node.rendered = rendered;
        }
    }

    fn mount_text(&self, id: VNodeId, element: &Element) -> Result<()> {
        let text = element.text_value().unwrap_or_default();
        let host = self.document.borrow_mut().create_text(text);
        self.set_host(id, host);
        Ok(())
    }

    fn mount_host(&self, id: VNodeId, element: &Element) -> Result<()> {
        let tag = element.ty().name();
        let host = self.document.borrow_mut().create_element(tag);
        self.set_host(id, host);

        let mut children = Vec::with_capacity(element.children().len());
        for child in element.children().iter() {
            match self.create(child, Some(host)) {
                Ok(child_id) => {
                    children.push(child_id);
                    if let Some(child_host) = self.host_of(child_id) {
                        self.document.borrow_mut().append_child(host, child_host)?;
                    }
                }
                Err(err) => log::warn!("skipping child <{}> of <{tag}>: {err}", child.ty().name()),
            }
        }
        if let Some(node) = self.vnodes.borrow_mut().get_mut(id) {
            node.children = children;
        }

        self.apply_props(host, None, element.props())?;
        self.attach_ref(id, RefTarget::Host(host));
        log::trace!("mounted <{tag}> as {host:?}");
        Ok(())
    }

    fn mount_function(&self, id: VNodeId, element: &Element, parent: Option<HostId>) -> Result<()> {
        if let Some(node) = self.vnodes.borrow_mut().get_mut(id) {
            node.hooks = Some(Rc::new(RefCell::new(HookStore::default())));
        }

        let child = match self.render_function(id) {
            Some(output) => Some(self.create(&output, parent)?),
            None => None,
        };
        self.set_rendered(id, child);
        self.attach_forwarded_ref(id, element);
        Ok(())
    }

    /// A forwarded ref the render did not hand to anything gets the rendered
    /// node itself.
    pub(crate) fn attach_forwarded_ref(&self, id: VNodeId, element: &Element) {
        let (ElementType::ForwardRef(_), Some(ref_prop)) = (element.ty(), element.ref_prop()) else {
            return;
        };
        if !ref_prop.is_vacant() {
            return;
        }
        if let Some(target) = self.forwarded_target(id) {
            self.attach_ref(id, target);
        }
    }

    /// Instance or host node the output of `id` currently resolves to.
    pub(crate) fn forwarded_target(&self, id: VNodeId) -> Option<RefTarget> {
        let child = self.vnodes.borrow().get(id).and_then(|n| n.rendered)?;
        let instance = self.vnodes.borrow().get(child).and_then(|n| n.instance);
        match instance {
            Some(iid) => Some(RefTarget::Instance(self.handle_for(iid))),
            None => self.host_of(child).map(RefTarget::Host),
        }
    }

    /// Calls a function or forward-ref component with its hook frame current.
    pub(crate) fn render_function(&self, id: VNodeId) -> Option<Element> {
        let (element, store) = {
            let vnodes = self.vnodes.borrow();
            let node = vnodes.get(id)?;
            (node.element.clone(), node.hooks.clone()?)
        };
        let frame = HookFrame::new(store, self.weak.clone(), id);
        frame.run(|| match element.ty() {
            ElementType::Function(f) => (f.render)(element.props()),
            ElementType::ForwardRef(f) => (f.render)(element.props(), element.ref_prop()),
            _ => None,
        })
    }

    fn mount_class(&self, id: VNodeId, element: &Element, parent: Option<HostId>) -> Result<()> {
        let ElementType::Class(class) = element.ty() else {
            return Ok(());
        };
        let class = *class;
        let props = element.props().clone();
        let component = class.construct(&props);
        let mut state = class.initial_state(&props);
        if let Some(derived) = class.derive_state(&props, &state) {
            state.merge(derived);
        }

        let iid = self.instances.borrow_mut().insert(Instance {
            component: component.clone(),
            class,
            props: props.clone(),
            state: state.clone(),
            updater: Updater::default(),
            vnode: id,
            mounted: false,
        });
        if let Some(node) = self.vnodes.borrow_mut().get_mut(id) {
            node.instance = Some(iid);
        }
        let handle = self.handle_for(iid);
        self.attach_ref(id, RefTarget::Instance(handle.clone()));

        component.component_will_mount(&This::new(props.clone(), state, handle.clone()));

        // State set during will_mount is folded in before the first render.
        let (patches, callbacks, mut state) = {
            let mut instances = self.instances.borrow_mut();
            let Some(inst) = instances.get_mut(iid) else {
                return Ok(());
            };
            let (patches, callbacks) = inst.updater.take();
            (patches, callbacks, inst.state.clone())
        };
        if !patches.is_empty() {
            for patch in patches {
                patch.apply_to(&mut state);
            }
            if let Some(inst) = self.instances.borrow_mut().get_mut(iid) {
                inst.state = state.clone();
            }
        }
        if !callbacks.is_empty() {
            self.post_pass
                .borrow_mut()
                .push_back(PostPass::Callbacks(callbacks));
        }

        let this = This::new(props, state, handle);
        let child = match component.render(&this) {
            Some(output) => Some(self.create(&output, parent)?),
            None => None,
        };
        self.set_rendered(id, child);
        self.post_pass.borrow_mut().push_back(PostPass::DidMount(iid));
        log::debug!("mounted class {}", class.name());
        Ok(())
    }

    /// Writes `new` onto a host element, diffing against `old` when given.
    pub(crate) fn apply_props(&self, host: HostId, old: Option<&Props>, new: &Props) -> Result<()> {
        for (name, value) in new.iter() {
            let previous = old.and_then(|o| o.get(name));
            if previous == Some(value) {
                continue;
            }
            self.set_prop(host, name, value, previous)?;
        }
        if let Some(old) = old {
            for (name, value) in old.iter() {
                if new.get(name).is_none() {
                    self.remove_prop(host, name, value)?;
                }
            }
        }
        Ok(())
    }

    fn set_prop(&self, host: HostId, name: &str, value: &Value, previous: Option<&Value>) -> Result<()> {
        if let Some(event) = event_name(name) {
            match value {
                Value::Handler(handler) => {
                    self.document
                        .borrow_mut()
                        .set_listener(host, &event, handler.clone())?;
                    self.delegate(&event);
                }
                _ => self.document.borrow_mut().remove_listener(host, &event)?,
            }
            return Ok(());
        }
        match name {
            "style" => self.set_style_prop(host, value, previous),
            "className" => self.set_attribute(host, "class", value),
            _ => self.set_attribute(host, name, value),
        }
    }

    fn set_attribute(&self, host: HostId, name: &str, value: &Value) -> Result<()> {
        let mut doc = self.document.borrow_mut();
        match value {
            Value::Null | Value::Bool(false) => doc.remove_attribute(host, name),
            Value::Bool(true) => doc.set_attribute(host, name, ""),
            other => match other.to_attribute() {
                Some(text) => doc.set_attribute(host, name, text),
                None => {
                    log::trace!("prop '{name}' has no attribute form");
                    doc.remove_attribute(host, name)
                }
            },
        }
    }

    fn set_style_prop(&self, host: HostId, value: &Value, previous: Option<&Value>) -> Result<()> {
        let mut doc = self.document.borrow_mut();
        match previous {
            Some(Value::Record(old)) => {
                let next = value.as_record();
                for key in old.keys() {
                    if !next.is_some_and(|r| r.contains_key(key)) {
                        doc.remove_style(host, key)?;
                    }
                }
            }
            Some(Value::Str(_)) if !matches!(value, Value::Str(_)) => {
                doc.remove_attribute(host, "style")?;
            }
            _ => {}
        }
        match value {
            Value::Record(styles) => {
                for (key, v) in styles.iter() {
                    match v.to_attribute() {
                        Some(text) => doc.set_style(host, key, text)?,
                        None => doc.remove_style(host, key)?,
                    }
                }
            }
            Value::Str(text) => doc.set_attribute(host, "style", text.to_string())?,
            _ => {}
        }
        Ok(())
    }

    fn remove_prop(&self, host: HostId, name: &str, old: &Value) -> Result<()> {
        let mut doc = self.document.borrow_mut();
        if let Some(event) = event_name(name) {
            return doc.remove_listener(host, &event);
        }
        match (name, old) {
            ("style", Value::Record(styles)) => {
                for key in styles.keys() {
                    doc.remove_style(host, key)?;
                }
                Ok(())
            }
            ("className", _) => doc.remove_attribute(host, "class"),
            _ => doc.remove_attribute(host, name),
        }
    }

    fn delegate(&self, event: &str) {
        if self.delegated.borrow_mut().insert(Rc::from(event)) {
            log::debug!("root listener installed for '{event}'");
        }
    }
}
