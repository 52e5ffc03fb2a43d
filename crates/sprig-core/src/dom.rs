//! # Host tree
//!
//! [`Document`] is the in-memory host environment the reconciler patches: a
//! `slotmap` arena of element and text nodes with attributes, inline style and
//! per-node listeners. Handles are generational, so a [`HostId`] kept after its
//! node was freed simply stops resolving.
//!
//! ```rust
//! use sprig_core::Document;
//!
//! let mut doc = Document::new();
//! let body = doc.body();
//! let p = doc.create_element("p");
//! let t = doc.create_text("hi");
//! doc.append_child(p, t).unwrap();
//! doc.append_child(body, p).unwrap();
//! assert_eq!(doc.text_content(body), "hi");
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};

use crate::error::{Error, Result};
use crate::events::EventHandler;

new_key_type! {
    pub struct HostId;
}

#[derive(Clone, Debug)]
pub enum NodeData {
    Element {
        tag: Rc<str>,
        attributes: Vec<(Rc<str>, String)>,
        style: Vec<(Rc<str>, String)>,
    },
    Text(String),
}

pub struct HostNode {
    pub data: NodeData,
    pub parent: Option<HostId>,
    pub children: Vec<HostId>,
    listeners: HashMap<Rc<str>, EventHandler>,
}

impl HostNode {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            children: Vec::new(),
            listeners: HashMap::new(),
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }
}

pub struct Document {
    nodes: SlotMap<HostId, HostNode>,
    body: HostId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let body = nodes.insert(HostNode::new(NodeData::Element {
            tag: Rc::from("body"),
            attributes: Vec::new(),
            style: Vec::new(),
        }));
        Self { nodes, body }
    }

    /// Root of the document. Delegated listeners conceptually live here.
    pub fn body(&self) -> HostId {
        self.body
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: HostId) -> Option<&HostNode> {
        self.nodes.get(id)
    }

    pub fn exists(&self, id: HostId) -> bool {
        self.nodes.contains_key(id)
    }

    fn node(&self, id: HostId) -> Result<&HostNode> {
        self.nodes.get(id).ok_or(Error::HostNodeMissing(id))
    }

    fn node_mut(&mut self, id: HostId) -> Result<&mut HostNode> {
        self.nodes.get_mut(id).ok_or(Error::HostNodeMissing(id))
    }

    pub fn create_element(&mut self, tag: &str) -> HostId {
        self.nodes.insert(HostNode::new(NodeData::Element {
            tag: Rc::from(tag),
            attributes: Vec::new(),
            style: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> HostId {
        self.nodes.insert(HostNode::new(NodeData::Text(text.to_string())))
    }

    pub fn parent(&self, id: HostId) -> Option<HostId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: HostId) -> &[HostId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn tag(&self, id: HostId) -> Option<&str> {
        self.nodes.get(id).and_then(HostNode::tag)
    }

    /// Inclusive: a node contains itself.
    pub fn contains(&self, ancestor: HostId, node: HostId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent(id);
        }
        false
    }

    fn check_insert(&self, parent: HostId, child: HostId) -> Result<()> {
        let p = self.node(parent)?;
        if p.is_text() {
            return Err(Error::NotAnElement(parent));
        }
        self.node(child)?;
        if self.contains(child, parent) {
            return Err(Error::HierarchyRequest { parent, child });
        }
        Ok(())
    }

    /// Appends `child`, moving it out of its current parent first.
    pub fn append_child(&mut self, parent: HostId, child: HostId) -> Result<()> {
        self.check_insert(parent, child)?;
        self.detach(child)?;
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Inserts `child` before `anchor`, or appends when `anchor` is `None`.
    pub fn insert_before(
        &mut self,
        parent: HostId,
        child: HostId,
        anchor: Option<HostId>,
    ) -> Result<()> {
        let Some(anchor) = anchor else {
            return self.append_child(parent, child);
        };
        if anchor == child {
            return Ok(());
        }
        self.check_insert(parent, child)?;
        self.detach(child)?;
        let p = self.node_mut(parent)?;
        let pos = p
            .children
            .iter()
            .position(|&c| c == anchor)
            .ok_or_else(|| Error::MissingAnchor(format!("{anchor:?} is not a child of {parent:?}")))?;
        p.children.insert(pos, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Puts `new` where `old` is and detaches `old`.
    pub fn replace_child(&mut self, parent: HostId, new: HostId, old: HostId) -> Result<()> {
        if new == old {
            return Ok(());
        }
        self.check_insert(parent, new)?;
        self.detach(new)?;
        let p = self.node_mut(parent)?;
        let pos = p
            .children
            .iter()
            .position(|&c| c == old)
            .ok_or_else(|| Error::MissingAnchor(format!("{old:?} is not a child of {parent:?}")))?;
        p.children[pos] = new;
        self.node_mut(new)?.parent = Some(parent);
        self.node_mut(old)?.parent = None;
        Ok(())
    }

    /// Unlinks a node from its parent. The subtree stays alive.
    pub fn detach(&mut self, id: HostId) -> Result<()> {
        let parent = self.node_mut(id)?.parent.take();
        if let Some(parent) = parent
            && let Some(p) = self.nodes.get_mut(parent)
        {
            p.children.retain(|&c| c != id);
        }
        Ok(())
    }

    /// Detaches and frees a whole subtree.
    pub fn remove(&mut self, id: HostId) -> Result<()> {
        self.detach(id)?;
        self.free(id);
        Ok(())
    }

    /// Frees a subtree without touching its parent's child list.
    pub fn free(&mut self, id: HostId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(id) {
                stack.extend(node.children);
            }
        }
    }

    pub fn set_attribute(&mut self, id: HostId, name: &str, value: impl Into<String>) -> Result<()> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element { attributes, .. } => {
                let value = value.into();
                match attributes.iter_mut().find(|(k, _)| &**k == name) {
                    Some((_, v)) => *v = value,
                    None => attributes.push((Rc::from(name), value)),
                }
                Ok(())
            }
            NodeData::Text(_) => Err(Error::NotAnElement(id)),
        }
    }

    pub fn remove_attribute(&mut self, id: HostId, name: &str) -> Result<()> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element { attributes, .. } => {
                attributes.retain(|(k, _)| &**k != name);
                Ok(())
            }
            NodeData::Text(_) => Err(Error::NotAnElement(id)),
        }
    }

    pub fn attribute(&self, id: HostId, name: &str) -> Option<&str> {
        match &self.nodes.get(id)?.data {
            NodeData::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| &**k == name)
                .map(|(_, v)| v.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn attributes(&self, id: HostId) -> &[(Rc<str>, String)] {
        match self.nodes.get(id).map(|n| &n.data) {
            Some(NodeData::Element { attributes, .. }) => attributes,
            _ => &[],
        }
    }

    pub fn set_style(&mut self, id: HostId, name: &str, value: impl Into<String>) -> Result<()> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element { style, .. } => {
                let value = value.into();
                match style.iter_mut().find(|(k, _)| &**k == name) {
                    Some((_, v)) => *v = value,
                    None => style.push((Rc::from(name), value)),
                }
                Ok(())
            }
            NodeData::Text(_) => Err(Error::NotAnElement(id)),
        }
    }

    pub fn remove_style(&mut self, id: HostId, name: &str) -> Result<()> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element { style, .. } => {
                style.retain(|(k, _)| &**k != name);
                Ok(())
            }
            NodeData::Text(_) => Err(Error::NotAnElement(id)),
        }
    }

    pub fn style(&self, id: HostId, name: &str) -> Option<&str> {
        self.styles(id)
            .iter()
            .find(|(k, _)| &**k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn styles(&self, id: HostId) -> &[(Rc<str>, String)] {
        match self.nodes.get(id).map(|n| &n.data) {
            Some(NodeData::Element { style, .. }) => style,
            _ => &[],
        }
    }

    pub fn set_text(&mut self, id: HostId, text: &str) -> Result<()> {
        match &mut self.node_mut(id)?.data {
            NodeData::Text(t) => {
                t.clear();
                t.push_str(text);
                Ok(())
            }
            NodeData::Element { .. } => {
                log::warn!("set_text on element {id:?}; ignoring");
                Ok(())
            }
        }
    }

    /// Text of a text node.
    pub fn text(&self, id: HostId) -> Option<&str> {
        match &self.nodes.get(id)?.data {
            NodeData::Text(t) => Some(t),
            NodeData::Element { .. } => None,
        }
    }

    /// Concatenated text of every descendant text node, in tree order.
    pub fn text_content(&self, id: HostId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: HostId, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Text(t) => out.push_str(t),
            NodeData::Element { .. } => {
                for &c in &node.children {
                    self.collect_text(c, out);
                }
            }
        }
    }

    /// Depth-first search of `root`'s subtree (inclusive).
    pub fn get_element_by_id(&self, root: HostId, id: &str) -> Option<HostId> {
        self.descendants(root)
            .into_iter()
            .find(|&n| self.attribute(n, "id") == Some(id))
    }

    pub fn get_elements_by_tag_name(&self, root: HostId, tag: &str) -> Vec<HostId> {
        self.descendants(root)
            .into_iter()
            .filter(|&n| n != root && self.tag(n) == Some(tag))
            .collect()
    }

    fn descendants(&self, root: HostId) -> Vec<HostId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            out.push(id);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    pub fn set_listener(&mut self, id: HostId, event: &str, handler: EventHandler) -> Result<()> {
        self.node_mut(id)?.listeners.insert(Rc::from(event), handler);
        Ok(())
    }

    pub fn remove_listener(&mut self, id: HostId, event: &str) -> Result<()> {
        self.node_mut(id)?.listeners.remove(event);
        Ok(())
    }

    pub fn listener(&self, id: HostId, event: &str) -> Option<&EventHandler> {
        self.nodes.get(id)?.listeners.get(event)
    }

    pub fn has_listeners(&self, id: HostId) -> bool {
        self.nodes.get(id).is_some_and(|n| !n.listeners.is_empty())
    }
}
