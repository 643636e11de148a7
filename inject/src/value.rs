use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// A value injected into a task body.
///
/// Plain data (defaults, module contents) is kept as data; everything else
/// (the host scheduler, completion handles, helpers) is a `Live` object that
/// the body downcasts to the type it expects.
#[derive(Clone)]
pub enum Value {
    Null,
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Json(serde_json::Value),
    /// default expression we couldn't classify; kept as written.
    Opaque(String),
    Live(Rc<dyn Any>),
}

impl Value {
    /// Wrap any object as a live value.
    pub fn live<T: Any>(value: T) -> Self {
        Self::Live(Rc::new(value))
    }

    /// Borrow the object inside a live value, if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Live(obj) => obj.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// True for live values that point at the very same object.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Live(a), Self::Live(b)) => {
                std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
            }
            _ => false,
        }
    }

    /// A strategy that yields one of these hasn't provided anything.
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Null | Self::Undefined)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::Opaque(s) => Some(s),
            Self::Json(serde_json::Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(json) => Some(json),
            _ => None,
        }
    }

    /// Text form of plain values, for handing to child processes.
    /// Live values have no text form.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => Some(String::from("null")),
            Self::Undefined => Some(String::new()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Str(s) | Self::Opaque(s) => Some(s.clone()),
            Self::Json(serde_json::Value::String(s)) => Some(s.clone()),
            Self::Json(json) => Some(json.to_string()),
            Self::Live(_) => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Undefined => write!(f, "Undefined"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(i) => write!(f, "Int({i})"),
            Self::Float(x) => write!(f, "Float({x})"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Json(json) => write!(f, "Json({json})"),
            Self::Opaque(s) => write!(f, "Opaque({s:?})"),
            Self::Live(_) => write!(f, "Live(*)"),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Self::Json(json)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}
