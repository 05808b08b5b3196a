use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::{CodecError, Result};
use crate::object::ObjRef;

/// A shared, identity-bearing ordered sequence.
///
/// Sequences participate in the reference-preserving protocol the same way
/// objects do: two fields holding the same `SeqRef` serialize to one
/// declaration plus a reference, and round-trip back to one shared instance.
pub type SeqRef = Rc<RefCell<Vec<Value>>>;

/// A dynamically typed field value moved through [`FieldBag`](crate::FieldBag)s.
///
/// Scalars are stored by value; objects and sequences are stored as shared
/// references, so cloning a `Value` never deep-copies graph structure.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Str(String),
    Seq(SeqRef),
    Object(ObjRef),
}

impl Value {
    /// Builds an identity-bearing sequence from the given items.
    pub fn seq(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Seq(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short kind label used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Uint(_) => "uint",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Seq(_) => "sequence",
            Value::Object(_) => "object",
        }
    }

    /// Widens any stored integer (or integral float) for range-checked
    /// narrowing into a concrete integer type.
    fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(i) => Some(i128::from(*i)),
            Value::Uint(u) => Some(i128::from(*u)),
            Value::Float(f)
                if f.is_finite()
                    && f.fract() == 0.0
                    && (i64::MIN as f64..=i64::MAX as f64).contains(f) =>
            {
                Some(*f as i128)
            }
            _ => None,
        }
    }
}

/// Equality is value equality for scalars and *identity* for objects and
/// sequences, matching the protocol's notion of sameness.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// References print as pointers, never as contents. Graphs may be cyclic
/// and a recursive `Debug` would never terminate.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Uint(u) => write!(f, "Uint({u})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Seq(seq) => match seq.try_borrow() {
                Ok(items) => write!(f, "Seq(len {} @{:p})", items.len(), Rc::as_ptr(seq)),
                Err(_) => write!(f, "Seq(<borrowed> @{:p})", Rc::as_ptr(seq)),
            },
            Value::Object(obj) => {
                write!(f, "Object({} @{:p})", obj.type_path(), Rc::as_ptr(obj))
            }
        }
    }
}

/// Conversion out of a [`Value`], with numeric widening/narrowing.
///
/// [`FieldBag::get`](crate::FieldBag::get) funnels every typed read through
/// this trait. Conversions stay within the numeric family: any stored
/// integer or integral float converts to any integer type that can hold it,
/// and any number converts to a float. Everything else must match kinds
/// exactly and fails with [`CodecError::TypeMismatch`] otherwise.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

pub(crate) fn mismatch(expected: &'static str, value: &Value) -> CodecError {
    CodecError::TypeMismatch {
        expected,
        found: value.kind(),
    }
}

macro_rules! impl_from_value_int {
    ($($t:ty),* $(,)?) => {$(
        impl FromValue for $t {
            fn from_value(value: &Value) -> Result<Self> {
                value
                    .as_i128()
                    .and_then(|wide| <$t>::try_from(wide).ok())
                    .ok_or_else(|| mismatch(stringify!($t), value))
            }
        }
    )*};
}

impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! impl_from_value_float {
    ($($t:ty),* $(,)?) => {$(
        impl FromValue for $t {
            fn from_value(value: &Value) -> Result<Self> {
                match value {
                    Value::Int(i) => Ok(*i as $t),
                    Value::Uint(u) => Ok(*u as $t),
                    Value::Float(f) => Ok(*f as $t),
                    other => Err(mismatch(stringify!($t), other)),
                }
            }
        }
    )*};
}

impl_from_value_float!(f32, f64);

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s.clone()),
            other => Err(mismatch("string", other)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for SeqRef {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Seq(seq) => Ok(Rc::clone(seq)),
            other => Err(mismatch("sequence", other)),
        }
    }
}

impl FromValue for ObjRef {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(obj) => Ok(Rc::clone(obj)),
            other => Err(mismatch("object", other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Seq(seq) => seq.borrow().iter().map(T::from_value).collect(),
            other => Err(mismatch("sequence", other)),
        }
    }
}

// Conversions into Value, used by `FieldBag::add` and the derive macro.

macro_rules! impl_value_from_int {
    ($($t:ty),* $(,)?) => {$(
        impl From<$t> for Value {
            fn from(v: $t) -> Value {
                Value::Int(i64::from(v))
            }
        }
    )*};
}

impl_value_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for Value {
    fn from(v: u64) -> Value {
        Value::Uint(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Value {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Value {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Value {
        Value::Bool(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Value {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Value {
        Value::Str(v.to_string())
    }
}

impl From<SeqRef> for Value {
    fn from(v: SeqRef) -> Value {
        Value::Seq(v)
    }
}

impl From<ObjRef> for Value {
    fn from(v: ObjRef) -> Value {
        Value::Object(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Value {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Value {
        Value::seq(v.into_iter().map(Into::into))
    }
}
