//! Node classification and primitive normalisation.

use crate::element::{Child, Element, ElementType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Host,
    Class,
    Function,
    ForwardRef,
    Text,
}

pub fn classify(element: &Element) -> NodeKind {
    match element.ty() {
        ElementType::Host(_) => NodeKind::Host,
        ElementType::Class(_) => NodeKind::Class,
        ElementType::Function(_) => NodeKind::Function,
        ElementType::ForwardRef(_) => NodeKind::ForwardRef,
        ElementType::Text => NodeKind::Text,
    }
}

pub fn is_host_element(element: &Element) -> bool {
    classify(element) == NodeKind::Host
}

pub fn is_class_component(element: &Element) -> bool {
    classify(element) == NodeKind::Class
}

pub fn is_function_component(element: &Element) -> bool {
    classify(element) == NodeKind::Function
}

pub fn is_forward_ref(element: &Element) -> bool {
    classify(element) == NodeKind::ForwardRef
}

pub fn is_text(element: &Element) -> bool {
    classify(element) == NodeKind::Text
}

/// Turns strings, numbers and booleans into text elements. Elements pass
/// through; empty children yield `None`.
pub fn to_vnode(child: impl Into<Child>) -> Option<Element> {
    match child.into() {
        Child::Element(e) => Some(e),
        Child::Text(s) => Some(Element::text(s)),
        Child::Int(i) => Some(Element::text(i.to_string())),
        Child::Float(f) => Some(Element::text(f.to_string())),
        Child::Bool(b) => Some(Element::text(b.to_string())),
        Child::Empty => None,
    }
}
