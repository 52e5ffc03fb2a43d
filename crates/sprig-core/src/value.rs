//! Dynamic values carried by props and class-component state.
//!
//! Props and state are ordered records of [`Value`]s. Primitive variants
//! compare by value; reference variants (elements, handlers, refs, opaque
//! payloads) compare by identity, which is what shallow comparison needs.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::element::{Element, RefProp};
use crate::events::EventHandler;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Vec<Value>),
    Record(Record),
    Element(Element),
    Handler(EventHandler),
    Ref(RefProp),
    Any(Rc<dyn Any>),
}

impl Value {
    pub fn any<T: Any>(value: T) -> Self {
        Value::Any(Rc::new(value))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Ints widen to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Value::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            Value::Handler(h) => Some(h),
            _ => None,
        }
    }

    pub fn downcast<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Any(v) => v.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// String form used when a value is written as a host attribute.
    /// `None` means the attribute should be absent.
    pub fn to_attribute(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Str(s) => Some(s.to_string()),
            Value::List(items) => Some(
                items
                    .iter()
                    .filter_map(Value::to_attribute)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Value::Record(_)
            | Value::Element(_)
            | Value::Handler(_)
            | Value::Ref(_)
            | Value::Any(_) => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Element(a), Value::Element(b)) => a.ptr_eq(b),
            (Value::Handler(a), Value::Handler(b)) => a.ptr_eq(b),
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            (Value::Any(a), Value::Any(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Record(r) => r.fmt(f),
            Value::Element(e) => e.fmt(f),
            Value::Handler(_) => write!(f, "<handler>"),
            Value::Ref(_) => write!(f, "<ref>"),
            Value::Any(_) => write!(f, "<any>"),
        }
    }
}

macro_rules! value_from {
    ($($t:ty => |$v:ident| $e:expr),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from($v: $t) -> Self {
                    $e
                }
            }
        )*
    };
}

value_from! {
    bool => |v| Value::Bool(v),
    i32 => |v| Value::Int(v as i64),
    i64 => |v| Value::Int(v),
    u32 => |v| Value::Int(v as i64),
    usize => |v| Value::Int(v as i64),
    f32 => |v| Value::Float(v as f64),
    f64 => |v| Value::Float(v),
    &str => |v| Value::Str(Rc::from(v)),
    String => |v| Value::Str(Rc::from(v)),
    Rc<str> => |v| Value::Str(v),
    Vec<Value> => |v| Value::List(v),
    Record => |v| Value::Record(v),
    Element => |v| Value::Element(v),
    EventHandler => |v| Value::Handler(v),
    RefProp => |v| Value::Ref(v),
    crate::element::Ref => |v| Value::Ref(RefProp::Container(v)),
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Ordered key/value map used for props and class-component state.
///
/// Insertion order is preserved; re-inserting a key replaces its value in
/// place.
#[derive(Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<(Rc<str>, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<Rc<str>>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| &**k == key)
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| &**k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Shallow merge: every entry of `other` overwrites (or extends) `self`.
    pub fn merge(&mut self, other: Record) {
        for (k, v) in other.entries {
            self.insert(k, v);
        }
    }

    pub fn merged(mut self, other: Record) -> Self {
        self.merge(other);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (&**k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| &**k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_int)
    }

    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_float)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, v)| (&**k, v)))
            .finish()
    }
}

impl<K: Into<Rc<str>>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

/// Key-by-key comparison, ignoring order. Reference values compare by identity.
pub fn shallow_equal(a: &Record, b: &Record) -> bool {
    a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
}

/// Builds a [`Record`] from `key => value` pairs.
///
/// ```rust
/// use sprig_core::*;
///
/// let state = record! { "count" => 0, "label" => "clicks" };
/// assert_eq!(state.get_int("count"), Some(0));
/// ```
#[macro_export]
macro_rules! record {
    () => { $crate::Record::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::Record::new()$(.with($key, $value))+
    };
}
