use indexmap::IndexMap;

use crate::error::{CodecError, Result};
use crate::value::{FromValue, Value};

/// Ordered, name-keyed container carrying one object's field data across
/// the codec boundary.
///
/// A bag lives for exactly one object during one encode or decode call:
/// the writer fills it via `export_fields` and drains it into the document;
/// the reader fills it from the document and hands it to `import_fields`.
/// Insertion order is preserved and becomes field order on the wire.
#[derive(Debug, Default)]
pub struct FieldBag {
    values: IndexMap<String, Value>,
}

impl FieldBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named value. Each name may appear once; a second `add` with
    /// the same name (including the empty name) fails with
    /// [`CodecError::DuplicateField`].
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let name = name.into();
        if self.values.contains_key(&name) {
            return Err(CodecError::DuplicateField { name });
        }
        self.values.insert(name, value.into());
        Ok(())
    }

    /// Reads a named value coerced to `T`.
    ///
    /// An absent name is not an error: it reads as `T::default()`, so
    /// optional and added-later fields decode from older documents. A
    /// present value of the wrong kind fails with
    /// [`CodecError::TypeMismatch`]. Objects and sequences come back as
    /// shared references, never as deep copies.
    pub fn get<T: FromValue + Default>(&self, name: &str) -> Result<T> {
        match self.values.get(name) {
            Some(value) => T::from_value(value),
            None => Ok(T::default()),
        }
    }

    /// Raw access to a stored value, without coercion.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}
