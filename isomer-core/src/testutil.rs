//! Hand-written graph objects shared by the in-crate tests. Written
//! against the bare trait so the core tests do not depend on the derive
//! macro.

use std::any::Any;

use crate::bag::FieldBag;
use crate::error::{CodecError, Result};
use crate::object::{GraphObject, Handle};
use crate::registry::TypeRegistry;
use crate::value::{FromValue, Value};

/// Linkable node, enough to build chains, cycles and shared structure.
#[derive(Debug, Default)]
pub(crate) struct Node {
    pub label: String,
    pub next: Option<Handle<Node>>,
}

impl GraphObject for Node {
    fn export_fields(&self, bag: &mut FieldBag) -> Result<()> {
        bag.add("label", self.label.clone())?;
        bag.add("next", self.next.clone())?;
        Ok(())
    }

    fn import_fields(&mut self, bag: &FieldBag) -> Result<()> {
        self.label = bag.get("label")?;
        self.next = bag.get("next")?;
        Ok(())
    }

    fn set_field(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "label" => self.label = FromValue::from_value(&value)?,
            "next" => self.next = FromValue::from_value(&value)?,
            _ => {
                return Err(CodecError::UnknownField {
                    type_path: std::any::type_name::<Self>(),
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Fieldless object, for type-mismatch cases.
#[derive(Debug, Default)]
pub(crate) struct Blank;

impl GraphObject for Blank {
    fn export_fields(&self, _bag: &mut FieldBag) -> Result<()> {
        Ok(())
    }

    fn import_fields(&mut self, _bag: &FieldBag) -> Result<()> {
        Ok(())
    }

    fn set_field(&mut self, name: &str, _value: Value) -> Result<()> {
        Err(CodecError::UnknownField {
            type_path: std::any::type_name::<Self>(),
            name: name.to_string(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Registry with the test types under stable names.
pub(crate) fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register_as::<Node>("test.Node")
        .expect("fresh registry");
    registry
        .register_as::<Blank>("test.Blank")
        .expect("fresh registry");
    registry
}
