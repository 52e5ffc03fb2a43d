use std::collections::HashMap;
use std::rc::Rc;

use smallvec::SmallVec;

use super::VNodeId;
use crate::dom::HostId;
use crate::element::Element;
use crate::runtime::Inner;

/// Identity used to match old and new children: the element key, or its
/// position among its siblings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Key {
    Named(Rc<str>),
    Index(usize),
}

impl Key {
    fn of(element: &Element, index: usize) -> Self {
        match element.key() {
            Some(key) => Key::Named(Rc::from(key)),
            None => Key::Index(index),
        }
    }
}

/// A child whose host node has to be (re)inserted at `pos` of the new list.
#[derive(Clone, Copy, Debug)]
enum Patch {
    Create { pos: usize, id: VNodeId },
    Move { pos: usize, id: VNodeId },
}

impl Patch {
    fn pos(&self) -> usize {
        match self {
            Patch::Create { pos, .. } | Patch::Move { pos, .. } => *pos,
        }
    }

    fn id(&self) -> VNodeId {
        match self {
            Patch::Create { id, .. } | Patch::Move { id, .. } => *id,
        }
    }
}

impl Inner {
    /// Reconciles the children of host element `id` against `next`.
    ///
    /// Old children are matched by key. A matched child whose old index falls
    /// behind the last index left in place is moved; everything unmatched on
    /// the new side is created and everything unmatched on the old side is
    /// removed. Moved nodes are detached, not unmounted, so they keep their
    /// host node and component state.
    pub(crate) fn diff_children(&self, id: VNodeId, host: HostId, next: &[Element]) {
        let old: Vec<VNodeId> = self
            .vnodes
            .borrow()
            .get(id)
            .map(|n| n.children.clone())
            .unwrap_or_default();

        let children = if old.is_empty() {
            self.append_all(host, next)
        } else if next.is_empty() {
            for child in old {
                if let Err(err) = self.remove(child) {
                    log::warn!("removing child of {host:?}: {err}");
                }
            }
            Vec::new()
        } else {
            self.diff_keyed(host, &old, next)
        };

        if let Some(node) = self.vnodes.borrow_mut().get_mut(id) {
            node.children = children;
        }
    }

    fn append_all(&self, host: HostId, next: &[Element]) -> Vec<VNodeId> {
        let mut children = Vec::with_capacity(next.len());
        for element in next {
            match self.update_tree(None, Some(element), Some(host)) {
                Ok(Some(child)) => children.push(child),
                Ok(None) => {}
                Err(err) => log::warn!("skipping child <{}>: {err}", element.ty().name()),
            }
        }
        children
    }

    fn diff_keyed(&self, host: HostId, old: &[VNodeId], next: &[Element]) -> Vec<VNodeId> {
        let mut by_key: HashMap<Key, (usize, VNodeId)> = HashMap::with_capacity(old.len());
        let mut duplicates = Vec::new();
        for (index, &child) in old.iter().enumerate() {
            let Some(element) = self.element_of(child) else {
                continue;
            };
            if let Some(shadowed) = by_key.insert(Key::of(&element, index), (index, child)) {
                log::warn!("duplicate key {:?} among children of {host:?}", element.key());
                duplicates.push(shadowed);
            }
        }

        let mut patches: SmallVec<[Patch; 8]> = SmallVec::new();
        let mut children = Vec::with_capacity(next.len());
        let mut last_in_place: Option<usize> = None;

        for (pos, element) in next.iter().enumerate() {
            let key = Key::of(element, pos);
            let Some((old_index, old_id)) = by_key.remove(&key) else {
                match self.create(element, Some(host)) {
                    Ok(child) => {
                        patches.push(Patch::Create { pos: children.len(), id: child });
                        children.push(child);
                    }
                    Err(err) => log::warn!("skipping child <{}>: {err}", element.ty().name()),
                }
                continue;
            };

            let host_before = self.host_of(old_id);
            let child = match self.update_tree(Some(old_id), Some(element), Some(host)) {
                Ok(Some(child)) => child,
                Ok(None) => continue,
                Err(err) => {
                    log::warn!("patching child <{}> failed: {err}", element.ty().name());
                    if !self.vnodes.borrow().contains_key(old_id) {
                        continue;
                    }
                    old_id
                }
            };
            let host_after = self.host_of(child);

            let moved = match last_in_place {
                Some(last) if old_index < last => true,
                _ => {
                    last_in_place = Some(old_index);
                    false
                }
            };
            // A child that rendered nothing before has no slot to keep.
            let appeared = host_before.is_none() && host_after.is_some();
            if moved || appeared {
                patches.push(Patch::Move { pos: children.len(), id: child });
            }
            children.push(child);
        }

        let mut leftovers: Vec<(usize, VNodeId)> = by_key.into_values().chain(duplicates).collect();
        leftovers.sort_by_key(|(index, _)| *index);
        for (_, child) in leftovers {
            if let Err(err) = self.remove(child) {
                log::warn!("removing child of {host:?}: {err}");
            }
        }

        for patch in &patches {
            if let Patch::Move { id, .. } = patch
                && let Some(child_host) = self.host_of(*id)
                && let Err(err) = self.document.borrow_mut().detach(child_host)
            {
                log::warn!("detaching moved child: {err}");
            }
        }

        for patch in &patches {
            let Some(child_host) = self.host_of(patch.id()) else {
                continue;
            };
            // Everything before `pos` is already in place, so the node now at
            // that host slot is the anchor.
            let slot = children[..patch.pos()]
                .iter()
                .filter(|&&c| self.host_of(c).is_some())
                .count();
            let mut doc = self.document.borrow_mut();
            let anchor = doc.children(host).get(slot).copied();
            if let Err(err) = doc.insert_before(host, child_host, anchor) {
                log::warn!("inserting child of {host:?} abandoned: {err}");
            }
            log::trace!("{patch:?} -> slot {slot} of {host:?}");
        }

        children
    }
}
