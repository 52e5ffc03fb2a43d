//! # Reconciler
//!
//! Mounting turns an [`Element`] into a tree of arena records ([`VNode`]s)
//! backed by host nodes in the [`Document`](crate::Document). Every
//! back-reference an element needs once it is live (host node, previous
//! render output, class instance, hook store) is an arena handle on its
//! `VNode`; elements themselves stay immutable.
//!
//! - `mount` creates detached subtrees.
//! - `diff` patches an existing subtree against a new element and handles
//!   removal and replacement.
//! - `keyed` reconciles child lists by key with move detection.
//!
//! User code (renders, lifecycle methods, ref callbacks) is only ever called
//! with no arena borrowed, so it may freely call back into the runtime.

mod diff;
mod keyed;
mod mount;

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::new_key_type;

use crate::component::InstanceId;
use crate::dom::HostId;
use crate::element::{Element, RefTarget};
use crate::hooks::HookStore;
use crate::runtime::Inner;

new_key_type! {
    pub struct VNodeId;
}

/// A mounted element.
pub(crate) struct VNode {
    pub element: Element,
    /// Host node this subtree is (or will be) attached under.
    pub parent: Option<HostId>,
    /// Own host node; only host and text elements have one.
    pub host: Option<HostId>,
    /// Output of the last render, for components.
    pub rendered: Option<VNodeId>,
    pub instance: Option<InstanceId>,
    pub hooks: Option<Rc<RefCell<HookStore>>>,
    /// Mounted children of a host element, in order.
    pub children: Vec<VNodeId>,
    /// What the element's `ref` was given by the reconciler.
    pub attached_ref: Option<RefTarget>,
}

impl VNode {
    fn new(element: Element, parent: Option<HostId>) -> Self {
        Self {
            element,
            parent,
            host: None,
            rendered: None,
            instance: None,
            hooks: None,
            children: Vec::new(),
            attached_ref: None,
        }
    }
}

impl Inner {
    /// Host node that represents a mounted subtree, following component
    /// render outputs down to the first host or text node.
    pub(crate) fn host_of(&self, id: VNodeId) -> Option<HostId> {
        let vnodes = self.vnodes.borrow();
        let mut cur = id;
        loop {
            let node = vnodes.get(cur)?;
            if let Some(host) = node.host {
                return Some(host);
            }
            cur = node.rendered?;
        }
    }

    pub(crate) fn element_of(&self, id: VNodeId) -> Option<Element> {
        self.vnodes.borrow().get(id).map(|n| n.element.clone())
    }

    /// Gives the element's `ref` its target and remembers it for detaching.
    pub(crate) fn attach_ref(&self, id: VNodeId, target: RefTarget) {
        let Some(element) = self.element_of(id) else {
            return;
        };
        let Some(ref_prop) = element.ref_prop() else {
            return;
        };
        if let Some(node) = self.vnodes.borrow_mut().get_mut(id) {
            node.attached_ref = Some(target.clone());
        }
        ref_prop.attach(target);
    }

    pub(crate) fn detach_ref(&self, id: VNodeId, element: &Element) {
        let target = self
            .vnodes
            .borrow_mut()
            .get_mut(id)
            .and_then(|n| n.attached_ref.take());
        if let (Some(ref_prop), Some(target)) = (element.ref_prop(), target) {
            ref_prop.detach(&target);
        }
    }

    /// Re-points the ref when an update swaps the `ref` prop.
    pub(crate) fn update_ref(&self, id: VNodeId, old: &Element, new: &Element, target: RefTarget) {
        let same = match (old.ref_prop(), new.ref_prop()) {
            (None, None) => true,
            (Some(a), Some(b)) => a.ptr_eq(b),
            _ => false,
        };
        if same {
            return;
        }
        self.detach_ref(id, old);
        self.attach_ref(id, target);
    }
}
