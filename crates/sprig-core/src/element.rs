//! # Element model
//!
//! An [`Element`] is the declarative description of one UI node before it is
//! realised against the host tree. Elements are immutable and cheap to clone;
//! everything the reconciler learns while mounting one (its host node, the
//! output of a component render, a class instance) lives in the runtime's
//! arenas, never on the element itself.
//!
//! ```rust
//! use sprig_core::*;
//!
//! let title = element!("h1", { "id" => "title", "key" => "t" }, "Hello");
//! assert_eq!(title.key(), Some("t"));
//! assert!(title.props().get("key").is_none());
//! ```

use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::component::{ClassType, ComponentHandle};
use crate::dom::HostId;
use crate::value::{Record, Value};

/// Closed set of node kinds.
#[derive(Clone)]
pub enum ElementType {
    Host(Rc<str>),
    Class(ClassType),
    Function(FunctionComponent),
    ForwardRef(ForwardRef),
    Text,
}

impl ElementType {
    pub fn name(&self) -> &str {
        match self {
            ElementType::Host(tag) => tag,
            ElementType::Class(c) => c.name(),
            ElementType::Function(f) => f.name(),
            ElementType::ForwardRef(f) => f.name(),
            ElementType::Text => "#text",
        }
    }
}

impl PartialEq for ElementType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ElementType::Host(a), ElementType::Host(b)) => a == b,
            (ElementType::Class(a), ElementType::Class(b)) => a.id() == b.id(),
            (ElementType::Function(a), ElementType::Function(b)) => a.identity == b.identity,
            (ElementType::ForwardRef(a), ElementType::ForwardRef(b)) => a.identity == b.identity,
            (ElementType::Text, ElementType::Text) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Host(tag) => write!(f, "Host({tag})"),
            ElementType::Class(c) => write!(f, "Class({})", c.name()),
            ElementType::Function(c) => write!(f, "Function({})", c.name()),
            ElementType::ForwardRef(c) => write!(f, "ForwardRef({})", c.name()),
            ElementType::Text => write!(f, "Text"),
        }
    }
}

impl From<&str> for ElementType {
    fn from(tag: &str) -> Self {
        ElementType::Host(Rc::from(tag))
    }
}

impl From<String> for ElementType {
    fn from(tag: String) -> Self {
        ElementType::Host(Rc::from(tag))
    }
}

impl From<ClassType> for ElementType {
    fn from(c: ClassType) -> Self {
        ElementType::Class(c)
    }
}

impl From<FunctionComponent> for ElementType {
    fn from(f: FunctionComponent) -> Self {
        ElementType::Function(f)
    }
}

impl From<ForwardRef> for ElementType {
    fn from(f: ForwardRef) -> Self {
        ElementType::ForwardRef(f)
    }
}

type RenderFn = dyn Fn(&Props) -> Option<Element>;
type ForwardRenderFn = dyn Fn(&Props, Option<&RefProp>) -> Option<Element>;
type RenderPtr = fn(&Props) -> Option<Element>;
type ForwardRenderPtr = fn(&Props, Option<&RefProp>) -> Option<Element>;

/// Identity of a render function: its Rust type, plus the address when the
/// type is a plain `fn` pointer shared by every function of that signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RenderIdentity {
    ty: TypeId,
    addr: Option<usize>,
}

impl RenderIdentity {
    fn of<F: Any, P: Any + Copy>(render: &F, addr: impl Fn(P) -> usize) -> Self {
        Self {
            ty: TypeId::of::<F>(),
            addr: (render as &dyn Any).downcast_ref::<P>().map(|p| addr(*p)),
        }
    }
}

/// A stateless component. Identity is the Rust type of the render function,
/// so wrapping the same `fn` item or closure twice yields equal types; `fn`
/// pointers compare by address.
#[derive(Clone)]
pub struct FunctionComponent {
    identity: RenderIdentity,
    name: &'static str,
    pub(crate) render: Rc<RenderFn>,
}

impl FunctionComponent {
    pub fn name(&self) -> &'static str {
        short_name(self.name)
    }
}

pub fn function<F>(render: F) -> FunctionComponent
where
    F: Fn(&Props) -> Option<Element> + 'static,
{
    FunctionComponent {
        identity: RenderIdentity::of(&render, |p: RenderPtr| p as usize),
        name: type_name::<F>(),
        render: Rc::new(render),
    }
}

/// Wrapper marking a render function that receives the element's `ref`.
#[derive(Clone)]
pub struct ForwardRef {
    identity: RenderIdentity,
    name: &'static str,
    pub(crate) render: Rc<ForwardRenderFn>,
}

impl ForwardRef {
    pub fn name(&self) -> &'static str {
        short_name(self.name)
    }
}

pub fn forward_ref<F>(render: F) -> ForwardRef
where
    F: Fn(&Props, Option<&RefProp>) -> Option<Element> + 'static,
{
    ForwardRef {
        identity: RenderIdentity::of(&render, |p: ForwardRenderPtr| p as usize),
        name: type_name::<F>(),
        render: Rc::new(render),
    }
}

pub(crate) fn short_name(full: &'static str) -> &'static str {
    full.rsplit("::").next().unwrap_or(full)
}

/// Child list stored under the reserved `children` prop.
#[derive(Clone, Default)]
pub enum Children {
    #[default]
    None,
    Single(Element),
    Many(Vec<Element>),
}

impl Children {
    pub fn as_slice(&self) -> &[Element] {
        match self {
            Children::None => &[],
            Children::Single(e) => std::slice::from_ref(e),
            Children::Many(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Element> {
        self.as_slice().iter()
    }

    fn ptr_eq(&self, other: &Children) -> bool {
        let (a, b) = (self.as_slice(), other.as_slice());
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.ptr_eq(y))
    }
}

impl fmt::Debug for Children {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

#[derive(Clone, Default)]
pub struct Props {
    fields: Record,
    children: Children,
}

impl Props {
    pub fn new(fields: Record, children: Children) -> Self {
        Self { fields, children }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Record {
        &self.fields
    }

    pub fn children(&self) -> &Children {
        &self.children
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter()
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.fields.get_int(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get_str(key)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.fields.get_bool(key)
    }

    /// Shallow comparison used by pure components: fields by value, children
    /// by element identity.
    pub fn shallow_eq(&self, other: &Props) -> bool {
        crate::value::shallow_equal(&self.fields, &other.fields) && self.children.ptr_eq(&other.children)
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("fields", &self.fields)
            .field("children", &self.children)
            .finish()
    }
}

/// What a ref can point at once attached.
#[derive(Clone)]
pub enum RefTarget {
    Host(HostId),
    Instance(ComponentHandle),
    Handle(Rc<dyn Any>),
}

impl RefTarget {
    pub(crate) fn same(&self, other: &RefTarget) -> bool {
        match (self, other) {
            (RefTarget::Host(a), RefTarget::Host(b)) => a == b,
            (RefTarget::Instance(a), RefTarget::Instance(b)) => a.same_instance(b),
            (RefTarget::Handle(a), RefTarget::Handle(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefTarget::Host(id) => write!(f, "Host({id:?})"),
            RefTarget::Instance(_) => write!(f, "Instance"),
            RefTarget::Handle(_) => write!(f, "Handle"),
        }
    }
}

/// Mutable single-slot container. The only field is `current`.
#[derive(Clone, Default)]
pub struct Ref {
    current: Rc<RefCell<Option<RefTarget>>>,
}

impl Ref {
    pub fn current(&self) -> Option<RefTarget> {
        self.current.borrow().clone()
    }

    pub fn set_current(&self, target: Option<RefTarget>) {
        *self.current.borrow_mut() = target;
    }

    pub fn host(&self) -> Option<HostId> {
        match &*self.current.borrow() {
            Some(RefTarget::Host(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn instance(&self) -> Option<ComponentHandle> {
        match &*self.current.borrow() {
            Some(RefTarget::Instance(h)) => Some(h.clone()),
            _ => None,
        }
    }

    /// Downcasts an imperative handle installed by `use_imperative_handle`.
    pub fn handle<T: Any>(&self) -> Option<Rc<T>> {
        match &*self.current.borrow() {
            Some(RefTarget::Handle(h)) => h.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current.borrow().is_none()
    }

    pub fn ptr_eq(&self, other: &Ref) -> bool {
        Rc::ptr_eq(&self.current, &other.current)
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ref")
            .field("current", &*self.current.borrow())
            .finish()
    }
}

pub fn create_ref() -> Ref {
    Ref::default()
}

pub type RefCallback = Rc<dyn Fn(Option<RefTarget>)>;

/// The `ref` prop: a container or a callback invoked on attach (`Some`) and
/// detach (`None`).
#[derive(Clone)]
pub enum RefProp {
    Container(Ref),
    Callback(RefCallback),
}

impl RefProp {
    pub fn callback(f: impl Fn(Option<RefTarget>) + 'static) -> Self {
        RefProp::Callback(Rc::new(f))
    }

    pub(crate) fn attach(&self, target: RefTarget) {
        match self {
            RefProp::Container(r) => r.set_current(Some(target)),
            RefProp::Callback(f) => f(Some(target)),
        }
    }

    /// Clears the ref if it still points at `target`.
    pub(crate) fn detach(&self, target: &RefTarget) {
        match self {
            RefProp::Container(r) => {
                let matches = r.current.borrow().as_ref().is_some_and(|t| t.same(target));
                if matches {
                    r.set_current(None);
                }
            }
            RefProp::Callback(f) => f(None),
        }
    }

    /// Containers that nothing has written to yet. Callbacks are never vacant.
    pub(crate) fn is_vacant(&self) -> bool {
        match self {
            RefProp::Container(r) => r.is_empty(),
            RefProp::Callback(_) => false,
        }
    }

    pub fn ptr_eq(&self, other: &RefProp) -> bool {
        match (self, other) {
            (RefProp::Container(a), RefProp::Container(b)) => a.ptr_eq(b),
            (RefProp::Callback(a), RefProp::Callback(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Ref> for RefProp {
    fn from(r: Ref) -> Self {
        RefProp::Container(r)
    }
}

struct ElementData {
    ty: ElementType,
    props: Props,
    key: Option<Rc<str>>,
    ref_: Option<RefProp>,
}

#[derive(Clone)]
pub struct Element(Rc<ElementData>);

impl Element {
    pub(crate) fn new(
        ty: ElementType,
        props: Props,
        key: Option<Rc<str>>,
        ref_: Option<RefProp>,
    ) -> Self {
        Element(Rc::new(ElementData {
            ty,
            props,
            key,
            ref_,
        }))
    }

    pub fn text(text: impl Into<Rc<str>>) -> Self {
        let fields = Record::new().with("text", Value::Str(text.into()));
        Element::new(ElementType::Text, Props::new(fields, Children::None), None, None)
    }

    pub fn ty(&self) -> &ElementType {
        &self.0.ty
    }

    pub fn props(&self) -> &Props {
        &self.0.props
    }

    pub fn key(&self) -> Option<&str> {
        self.0.key.as_deref()
    }

    pub fn ref_prop(&self) -> Option<&RefProp> {
        self.0.ref_.as_ref()
    }

    pub fn children(&self) -> &Children {
        self.0.props.children()
    }

    /// Text content of a text element.
    pub fn text_value(&self) -> Option<&str> {
        match self.0.ty {
            ElementType::Text => self.0.props.get_str("text"),
            _ => None,
        }
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.text_value() {
            return write!(f, "{text:?}");
        }
        let mut d = f.debug_struct("Element");
        d.field("type", &self.0.ty);
        if let Some(key) = &self.0.key {
            d.field("key", key);
        }
        d.field("props", &self.0.props.fields);
        if !self.0.props.children.is_empty() {
            d.field("children", &self.0.props.children);
        }
        d.finish()
    }
}

/// Anything accepted as a child in [`create_element`].
#[derive(Clone, Debug, Default)]
pub enum Child {
    Element(Element),
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    #[default]
    Empty,
}

impl From<Element> for Child {
    fn from(e: Element) -> Self {
        Child::Element(e)
    }
}

impl From<&str> for Child {
    fn from(s: &str) -> Self {
        Child::Text(s.to_string())
    }
}

impl From<String> for Child {
    fn from(s: String) -> Self {
        Child::Text(s)
    }
}

impl From<&String> for Child {
    fn from(s: &String) -> Self {
        Child::Text(s.clone())
    }
}

impl From<i32> for Child {
    fn from(i: i32) -> Self {
        Child::Int(i as i64)
    }
}

impl From<i64> for Child {
    fn from(i: i64) -> Self {
        Child::Int(i)
    }
}

impl From<usize> for Child {
    fn from(i: usize) -> Self {
        Child::Int(i as i64)
    }
}

impl From<f64> for Child {
    fn from(f: f64) -> Self {
        Child::Float(f)
    }
}

impl From<bool> for Child {
    fn from(b: bool) -> Self {
        Child::Bool(b)
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Child::Empty)
    }
}

impl From<&Value> for Child {
    fn from(v: &Value) -> Self {
        match v {
            Value::Str(s) => Child::Text(s.to_string()),
            Value::Int(i) => Child::Int(*i),
            Value::Float(f) => Child::Float(*f),
            Value::Bool(b) => Child::Bool(*b),
            Value::Element(e) => Child::Element(e.clone()),
            _ => Child::Empty,
        }
    }
}

/// Props as written at the call site, before `key` and `ref` are lifted out.
#[derive(Clone, Default)]
pub struct RawProps {
    fields: Record,
    key: Option<Rc<str>>,
    ref_: Option<RefProp>,
}

impl RawProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match name {
            "key" => self.key = key_from(&value),
            "ref" => match value {
                Value::Ref(r) => self.ref_ = Some(r),
                Value::Null => self.ref_ = None,
                other => log::debug!("ignoring ref prop that is not a ref: {other:?}"),
            },
            _ => {
                self.fields.insert(name, value);
            }
        }
        self
    }

    pub fn key(mut self, key: impl Into<Rc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn ref_prop(mut self, r: impl Into<RefProp>) -> Self {
        self.ref_ = Some(r.into());
        self
    }
}

impl From<Record> for RawProps {
    fn from(record: Record) -> Self {
        record
            .iter()
            .fold(RawProps::new(), |raw, (k, v)| raw.with(k, v.clone()))
    }
}

fn key_from(value: &Value) -> Option<Rc<str>> {
    match value {
        Value::Str(s) => Some(s.clone()),
        Value::Int(i) => Some(Rc::from(i.to_string())),
        Value::Float(f) => Some(Rc::from(f.to_string())),
        _ => None,
    }
}

/// Builds an element description. `key` and `ref` are lifted out of `props`;
/// primitive children become text elements and `bool`/empty children are
/// dropped. One surviving child is stored as [`Children::Single`].
pub fn create_element(
    ty: impl Into<ElementType>,
    props: impl Into<RawProps>,
    children: Vec<Child>,
) -> Element {
    let RawProps { fields, key, ref_ } = props.into();
    let mut kids: Vec<Element> = children
        .into_iter()
        .filter(|c| !matches!(c, Child::Bool(_) | Child::Empty))
        .filter_map(crate::classify::to_vnode)
        .collect();
    let children = match kids.len() {
        0 => Children::None,
        1 => Children::Single(kids.remove(0)),
        _ => Children::Many(kids),
    };
    Element::new(ty.into(), Props::new(fields, children), key, ref_)
}

/// `element!(type, { "prop" => value, .. }, child, ..)`
///
/// ```rust
/// use sprig_core::*;
///
/// let list = element!("ul", {},
///     element!("li", { "key" => "a" }, "A"),
///     element!("li", { "key" => "b" }, "B"),
/// );
/// assert_eq!(list.children().len(), 2);
/// ```
#[macro_export]
macro_rules! element {
    ($ty:expr $(,)?) => {
        $crate::create_element($ty, $crate::RawProps::new(), ::std::vec::Vec::new())
    };
    ($ty:expr, { $($key:expr => $value:expr),* $(,)? } $(, $child:expr)* $(,)?) => {
        $crate::create_element(
            $ty,
            $crate::RawProps::new()$(.with($key, $value))*,
            ::std::vec![$($crate::Child::from($child)),*],
        )
    };
}
