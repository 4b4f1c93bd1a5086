//! Live values and object instances

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::ClassId;

/// Shared handle to a live array
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;

/// Shared handle to a live object (typed instance or plain record)
pub type ObjectRef = Rc<RefCell<Object>>;

/// Fields are keyed by property name
pub type Fields = BTreeMap<String, Value>;

/// A value in a live object graph.
///
/// Arrays and objects are reference types: cloning a `Value` clones the
/// handle, not the contents, so two values can point at the same node and
/// graphs may contain cycles. Identity is the address of the shared
/// allocation (see [`Value::ptr_eq`]).
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(ArrayRef),
    Object(ObjectRef),
}

impl Value {
    /// Create a new array node
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    /// Create a new plain (untyped) record node
    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        let mut obj = Object::record();
        for (k, v) in fields {
            obj.set(k, v);
        }
        Value::Object(obj.into_ref())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Identity key of a reference node, `None` for primitives
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(a) => Some(Rc::as_ptr(a) as *const () as usize),
            Value::Object(o) => Some(Rc::as_ptr(o) as *const () as usize),
            _ => None,
        }
    }

    /// True when both values are the same live node.
    ///
    /// Primitives never compare identical, even when equal.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

// Shallow on purpose: a derived impl would recurse forever on cyclic graphs.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Array(a) => match a.try_borrow() {
                Ok(items) => write!(f, "Array(len={}, @{:p})", items.len(), Rc::as_ptr(a)),
                Err(_) => write!(f, "Array(<borrowed>, @{:p})", Rc::as_ptr(a)),
            },
            Value::Object(o) => match o.try_borrow() {
                Ok(obj) => write!(f, "Object({:?}, @{:p})", obj, Rc::as_ptr(o)),
                Err(_) => write!(f, "Object(<borrowed>, @{:p})", Rc::as_ptr(o)),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(n.into())
    }
}

impl From<f64> for Value {
    /// Non-finite floats have no JSON form and become `Null`
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj.into_ref())
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<ArrayRef> for Value {
    fn from(arr: ArrayRef) -> Self {
        Value::Array(arr)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// An object: either an instance of a registered class or a plain record
#[derive(Clone, Default)]
pub struct Object {
    class: Option<ClassId>,
    fields: Fields,
}

impl Object {
    /// Create an empty plain record
    pub fn record() -> Self {
        Self::default()
    }

    /// Create an empty, uninitialized instance of `class`.
    ///
    /// This does not apply defaults or run constructors; use
    /// [`ClassRegistry::instantiate`](super::ClassRegistry::instantiate) for that.
    pub fn with_class(class: ClassId) -> Self {
        Self {
            class: Some(class),
            fields: Fields::new(),
        }
    }

    /// Class of this object, `None` for plain records
    pub fn class(&self) -> Option<ClassId> {
        self.class
    }

    pub fn is_typed(&self) -> bool {
        self.class.is_some()
    }

    /// Wrap into a shared handle
    pub fn into_ref(self) -> ObjectRef {
        Rc::new(RefCell::new(self))
    }

    /// Get a stored field, bypassing accessors
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set a stored field, bypassing accessors
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Remove a stored field
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Get field as string
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    /// Get field as i64
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.fields.get(key).and_then(|v| v.as_i64())
    }

    /// Get field as f64
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(|v| v.as_f64())
    }

    /// Get field as bool
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(|v| v.as_bool())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class)
            .field("keys", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}
