use super::VNodeId;
use crate::classify::{NodeKind, classify};
use crate::dom::HostId;
use crate::element::{Element, RefTarget};
use crate::error::Result;
use crate::runtime::Inner;

impl Inner {
    /// Patches the subtree at `old` to match `new`, returning the id of the
    /// node that now stands in its place.
    pub(crate) fn update_tree(
        &self,
        old: Option<VNodeId>,
        new: Option<&Element>,
        parent: Option<HostId>,
    ) -> Result<Option<VNodeId>> {
        match (old, new) {
            (None, None) => Ok(None),
            (None, Some(element)) => {
                let id = self.create(element, parent)?;
                if let (Some(parent), Some(host)) = (parent, self.host_of(id)) {
                    self.document.borrow_mut().append_child(parent, host)?;
                }
                Ok(Some(id))
            }
            (Some(old), None) => {
                self.remove(old)?;
                Ok(None)
            }
            (Some(old), Some(element)) => {
                let Some(previous) = self.element_of(old) else {
                    return self.update_tree(None, Some(element), parent);
                };
                if previous.ty() != element.ty() || previous.key() != element.key() {
                    return self.replace(old, element, parent).map(Some);
                }
                self.compare(old, &previous, element)?;
                Ok(Some(old))
            }
        }
    }

    /// Unmounts a subtree, then detaches and frees its host node.
    pub(crate) fn remove(&self, id: VNodeId) -> Result<()> {
        let host = self.host_of(id);
        self.unmount(id);
        if let Some(host) = host {
            self.document.borrow_mut().remove(host)?;
        }
        Ok(())
    }

    /// Tears down arena state for a subtree: children first, then
    /// `component_will_unmount`, effect cleanups and refs. Host nodes are left
    /// for the caller to detach.
    pub(crate) fn unmount(&self, id: VNodeId) {
        let Some((element, children, rendered, instance, hooks)) =
            self.vnodes.borrow().get(id).map(|n| {
                (
                    n.element.clone(),
                    n.children.clone(),
                    n.rendered,
                    n.instance,
                    n.hooks.clone(),
                )
            })
        else {
            return;
        };

        for child in children.into_iter().chain(rendered) {
            self.unmount(child);
        }

        if let Some(iid) = instance {
            if let Some((component, this)) = self.this_for(iid) {
                component.component_will_unmount(&this);
            }
            self.instances.borrow_mut().remove(iid);
        }
        if let Some(store) = hooks {
            let cleanups = store.borrow_mut().dispose();
            for cleanup in cleanups {
                cleanup.run();
            }
        }
        self.detach_ref(id, &element);

        self.vnodes.borrow_mut().remove(id);
        self.bump_stats(|s| s.unmounts += 1);
        log::trace!("unmounted <{}>", element.ty().name());
    }

    /// Mounts `element` and swaps it in for the subtree at `old`.
    fn replace(&self, old: VNodeId, element: &Element, parent: Option<HostId>) -> Result<VNodeId> {
        let old_host = self.host_of(old);
        let new = self.create(element, parent)?;
        let new_host = self.host_of(new);
        self.unmount(old);

        let mut doc = self.document.borrow_mut();
        match (old_host, new_host) {
            (Some(old_host), Some(new_host)) => {
                match doc.parent(old_host) {
                    Some(host_parent) => doc.replace_child(host_parent, new_host, old_host)?,
                    None => {
                        if let Some(parent) = parent {
                            doc.append_child(parent, new_host)?;
                        }
                    }
                }
                doc.free(old_host);
            }
            (Some(old_host), None) => doc.remove(old_host)?,
            (None, Some(new_host)) => {
                if let Some(parent) = parent {
                    doc.append_child(parent, new_host)?;
                }
            }
            (None, None) => {}
        }
        Ok(new)
    }

    /// Same type on both sides: reuse the mounted node and patch in place.
    fn compare(&self, id: VNodeId, old: &Element, new: &Element) -> Result<()> {
        if let Some(node) = self.vnodes.borrow_mut().get_mut(id) {
            node.element = new.clone();
        }
        match classify(new) {
            NodeKind::Text => {
                let host = self.vnodes.borrow().get(id).and_then(|n| n.host);
                if let Some(host) = host
                    && old.text_value() != new.text_value()
                {
                    self.document
                        .borrow_mut()
                        .set_text(host, new.text_value().unwrap_or_default())?;
                }
                Ok(())
            }
            NodeKind::Host => {
                let host = self.vnodes.borrow().get(id).and_then(|n| n.host);
                let Some(host) = host else {
                    return Ok(());
                };
                self.apply_props(host, Some(old.props()), new.props())?;
                self.diff_children(id, host, new.children().as_slice());
                self.update_ref(id, old, new, RefTarget::Host(host));
                Ok(())
            }
            NodeKind::Function => self.update_function(id),
            NodeKind::ForwardRef => {
                self.update_function(id)?;
                self.refresh_forwarded_ref(id, old, new);
                Ok(())
            }
            NodeKind::Class => {
                let instance = self.vnodes.borrow().get(id).and_then(|n| n.instance);
                let Some(iid) = instance else {
                    return Ok(());
                };
                self.update_ref(id, old, new, RefTarget::Instance(self.handle_for(iid)));
                self.launch_update(iid, Some(new.props().clone()))
            }
        }
    }

    /// Keeps the fallback target of a forwarded ref in step with the `ref`
    /// prop and the rendered node.
    fn refresh_forwarded_ref(&self, id: VNodeId, old: &Element, new: &Element) {
        let same_ref = match (old.ref_prop(), new.ref_prop()) {
            (None, None) => true,
            (Some(a), Some(b)) => a.ptr_eq(b),
            _ => false,
        };
        let attached = self.vnodes.borrow().get(id).and_then(|n| n.attached_ref.clone());
        if same_ref {
            match attached {
                // The render owns the ref, or nothing was there to attach yet.
                None => return self.attach_forwarded_ref(id, new),
                Some(attached) => {
                    if self.forwarded_target(id).is_some_and(|t| t.same(&attached)) {
                        return;
                    }
                }
            }
        }
        self.detach_ref(id, old);
        self.attach_forwarded_ref(id, new);
    }

    /// Re-renders a function or forward-ref component from its stored element.
    pub(crate) fn update_function(&self, id: VNodeId) -> Result<()> {
        if !self.vnodes.borrow().contains_key(id) {
            return Ok(());
        }
        let output = self.render_function(id);
        self.update_rendered(id, output.as_ref())
    }

    /// Diffs a component's previous output against `output` and stores the
    /// result.
    pub(crate) fn update_rendered(&self, id: VNodeId, output: Option<&Element>) -> Result<()> {
        let Some((old, parent)) = self
            .vnodes
            .borrow()
            .get(id)
            .map(|n| (n.rendered, n.parent))
        else {
            log::debug!("update of an unmounted component ignored");
            return Ok(());
        };
        let appearing = output.is_some() && self.host_of(id).is_none();
        let next = self.update_tree(old, output, parent)?;
        if let Some(node) = self.vnodes.borrow_mut().get_mut(id) {
            node.rendered = next;
        }

        // Output that had no host node was appended; move it into its slot.
        if appearing
            && let Some(parent) = parent
            && let Some(host) = self.host_of(id)
        {
            let anchor = self.next_sibling_host(id, parent);
            self.document.borrow_mut().insert_before(parent, host, anchor)?;
        }
        Ok(())
    }

    /// Host node of the first later sibling of the subtree holding `id` that
    /// is attached under `parent`.
    fn next_sibling_host(&self, id: VNodeId, parent: HostId) -> Option<HostId> {
        let siblings: Vec<VNodeId> = {
            let vnodes = self.vnodes.borrow();
            match vnodes.values().find(|n| n.host == Some(parent)) {
                Some(owner) => owner.children.clone(),
                None => self
                    .roots
                    .borrow()
                    .iter()
                    .filter(|(container, _)| *container == parent)
                    .map(|(_, root)| *root)
                    .collect(),
            }
        };
        let index = siblings.iter().position(|&s| self.renders_into(s, id))?;
        let later: Vec<HostId> = siblings[index + 1..]
            .iter()
            .filter_map(|&s| self.host_of(s))
            .collect();
        let doc = self.document.borrow();
        later.into_iter().find(|&h| doc.parent(h) == Some(parent))
    }

    /// Whether following render outputs down from `from` reaches `target`.
    fn renders_into(&self, from: VNodeId, target: VNodeId) -> bool {
        let vnodes = self.vnodes.borrow();
        let mut cur = Some(from);
        while let Some(id) = cur {
            if id == target {
                return true;
            }
            cur = vnodes.get(id).and_then(|n| n.rendered);
        }
        false
    }
}
