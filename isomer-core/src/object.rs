use std::any::{Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::bag::FieldBag;
use crate::error::{CodecError, Result};
use crate::value::{FromValue, Value, mismatch};

/// A value participating in reference-preserving graph serialization.
///
/// An implementation moves its field data in and out of [`FieldBag`]s and
/// exposes a settable-field capability so the decoder can patch forward
/// references after construction. Use `#[derive(GraphObject)]` from
/// `isomer-derive` for the mechanical cases.
///
/// Identity is instance identity: two objects with equal fields are still
/// two distinct graph nodes.
pub trait GraphObject: fmt::Debug + Any {
    /// Copies every serializable field into `bag`, one `add` per field,
    /// in declaration order.
    fn export_fields(&self, bag: &mut FieldBag) -> Result<()>;

    /// Populates `self` from `bag`. Absent names read as defaults, so
    /// fields added in later versions decode cleanly from old documents.
    fn import_fields(&mut self, bag: &FieldBag) -> Result<()>;

    /// Sets one named field directly. The decoder uses this to patch
    /// fields whose reference target was declared later in the document.
    fn set_field(&mut self, name: &str, value: Value) -> Result<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Shared cell holding one graph object together with its frozen type
/// metadata.
///
/// The metadata lives outside the `RefCell`, so type checks (handle
/// downcasts, registry lookups) never borrow the value. This matters when
/// an object's own `import_fields` reads a handle back to itself.
pub struct GraphCell<T: ?Sized> {
    type_id: TypeId,
    type_path: &'static str,
    inner: RefCell<T>,
}

/// A shared, type-erased graph object. Identity is the `Rc` pointer.
pub type ObjRef = Rc<GraphCell<dyn GraphObject>>;

impl GraphCell<dyn GraphObject> {
    /// Moves `value` into a fresh shared cell.
    pub fn new<T: GraphObject>(value: T) -> ObjRef {
        Rc::new(GraphCell {
            type_id: TypeId::of::<T>(),
            type_path: std::any::type_name::<T>(),
            inner: RefCell::new(value),
        })
    }

    /// `TypeId` of the concrete value, readable without borrowing.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type path of the concrete value.
    pub fn type_path(&self) -> &'static str {
        self.type_path
    }

    pub fn is<T: GraphObject>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Borrows the object. Panics if it is currently mutably borrowed,
    /// per the standard `RefCell` contract.
    pub fn borrow(&self) -> Ref<'_, dyn GraphObject> {
        self.inner.borrow()
    }

    /// Mutably borrows the object. Panics if any borrow is active.
    pub fn borrow_mut(&self) -> RefMut<'_, dyn GraphObject> {
        self.inner.borrow_mut()
    }
}

impl fmt::Debug for GraphCell<dyn GraphObject> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(value) => f
                .debug_struct("GraphCell")
                .field("type", &self.type_path)
                .field("value", &&*value)
                .finish(),
            Err(_) => f
                .debug_struct("GraphCell")
                .field("type", &self.type_path)
                .field("value", &"<borrowed>")
                .finish(),
        }
    }
}

/// A typed view over an [`ObjRef`].
///
/// Handles are what user types hold in their fields: cheap to clone, typed
/// access through `borrow`/`borrow_mut`, and identity comparison through
/// [`Handle::ptr_eq`]. The downcast is verified once at construction.
pub struct Handle<T: GraphObject> {
    raw: ObjRef,
    _marker: PhantomData<T>,
}

impl<T: GraphObject> Handle<T> {
    /// Moves `value` into a fresh shared cell and returns the typed handle.
    pub fn new(value: T) -> Self {
        Handle {
            raw: GraphCell::new(value),
            _marker: PhantomData,
        }
    }

    /// Checked downcast from a type-erased reference.
    pub fn downcast(raw: ObjRef) -> Result<Self> {
        if raw.is::<T>() {
            Ok(Handle {
                raw,
                _marker: PhantomData,
            })
        } else {
            Err(CodecError::TypeCast {
                expected: std::any::type_name::<T>(),
                found: raw.type_path(),
            })
        }
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        Ref::map(self.raw.borrow(), |obj| {
            obj.as_any()
                .downcast_ref::<T>()
                .expect("handle type verified at construction")
        })
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        RefMut::map(self.raw.borrow_mut(), |obj| {
            obj.as_any_mut()
                .downcast_mut::<T>()
                .expect("handle type verified at construction")
        })
    }

    pub fn as_raw(&self) -> &ObjRef {
        &self.raw
    }

    pub fn into_raw(self) -> ObjRef {
        self.raw
    }

    /// True when both handles point at the same instance.
    pub fn ptr_eq(a: &Handle<T>, b: &Handle<T>) -> bool {
        Rc::ptr_eq(&a.raw, &b.raw)
    }
}

impl<T: GraphObject> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Handle {
            raw: Rc::clone(&self.raw),
            _marker: PhantomData,
        }
    }
}

impl<T: GraphObject> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Handle<{}>(@{:p})",
            self.raw.type_path(),
            Rc::as_ptr(&self.raw)
        )
    }
}

impl<T: GraphObject> From<Handle<T>> for Value {
    fn from(handle: Handle<T>) -> Value {
        Value::Object(handle.into_raw())
    }
}

impl<T: GraphObject> FromValue for Handle<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(raw) => {
                if raw.is::<T>() {
                    Ok(Handle {
                        raw: Rc::clone(raw),
                        _marker: PhantomData,
                    })
                } else {
                    Err(CodecError::TypeMismatch {
                        expected: std::any::type_name::<T>(),
                        found: raw.type_path(),
                    })
                }
            }
            other => Err(mismatch(std::any::type_name::<T>(), other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Blank, Node};

    #[test]
    fn handle_borrow_round_trip() {
        let node = Handle::new(Node {
            label: "x".to_string(),
            ..Node::default()
        });
        node.borrow_mut().label.push('y');
        assert_eq!(node.borrow().label, "xy");
    }

    #[test]
    fn downcast_checks_type() {
        let raw = Handle::new(Blank::default()).into_raw();
        assert!(Handle::<Blank>::downcast(Rc::clone(&raw)).is_ok());
        assert!(matches!(
            Handle::<Node>::downcast(raw),
            Err(CodecError::TypeCast { .. })
        ));
    }

    #[test]
    fn ptr_eq_is_identity() {
        let a = Handle::new(Node::default());
        let b = Handle::new(Node::default());
        assert!(Handle::ptr_eq(&a, &a.clone()));
        assert!(!Handle::ptr_eq(&a, &b));
    }

    #[test]
    fn handle_from_value_requires_matching_type() {
        let value = Value::Object(Handle::new(Blank::default()).into_raw());
        assert!(Handle::<Blank>::from_value(&value).is_ok());
        assert!(matches!(
            Handle::<Node>::from_value(&value),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn type_metadata_readable_while_borrowed() {
        let node = Handle::new(Node::default());
        let guard = node.borrow_mut();
        assert!(node.as_raw().is::<Node>());
        assert_eq!(node.as_raw().type_path(), std::any::type_name::<Node>());
        drop(guard);
    }
}
