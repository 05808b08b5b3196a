use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use crate::error::{CodecError, Result};
use crate::object::{GraphObject, Handle, ObjRef};

/// Wire type name of the built-in sequence container.
///
/// Foreign documents carrying their own list type names are remapped onto
/// this name through the decode-time override table.
pub const SEQUENCE_TYPE: &str = "isomer.seq";

type ObjectFactory = Box<dyn Fn() -> ObjRef>;

pub(crate) enum TypeEntry {
    Object(ObjectFactory),
    Sequence,
}

/// Maps runtime types to stable wire names and back.
///
/// The registry is populated explicitly at program start; there is no
/// global type catalog to fall back on. Each registration records both
/// directions: `TypeId → name` for encoding and `name → factory` for
/// decoding. Factories build the empty shell the reader populates later,
/// which is why registration requires `Default`: a type without
/// parameterless construction cannot participate in the protocol.
pub struct TypeRegistry {
    entries: HashMap<String, TypeEntry>,
    names: HashMap<TypeId, String>,
}

impl TypeRegistry {
    /// Creates a registry with the built-in sequence type pre-registered.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(SEQUENCE_TYPE.to_string(), TypeEntry::Sequence);
        TypeRegistry {
            entries,
            names: HashMap::new(),
        }
    }

    /// Registers `T` under its Rust type path (`std::any::type_name`).
    ///
    /// The full path keeps identical short names in different modules from
    /// colliding. Prefer [`register_as`](Self::register_as) with an explicit
    /// name when documents must stay readable across refactors.
    pub fn register<T: GraphObject + Default>(&mut self) -> Result<()> {
        self.register_as::<T>(std::any::type_name::<T>())
    }

    /// Registers `T` under an explicit wire name.
    ///
    /// Fails with [`CodecError::DuplicateType`] if the name is taken or `T`
    /// is already registered under another name.
    pub fn register_as<T: GraphObject + Default>(&mut self, name: &str) -> Result<()> {
        if self.entries.contains_key(name) || self.names.contains_key(&TypeId::of::<T>()) {
            return Err(CodecError::DuplicateType {
                name: name.to_string(),
            });
        }
        self.names.insert(TypeId::of::<T>(), name.to_string());
        self.entries.insert(
            name.to_string(),
            TypeEntry::Object(Box::new(|| Handle::new(T::default()).into_raw())),
        );
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Wire name for an encoded object, by its concrete runtime type.
    pub fn name_of(&self, object: &ObjRef) -> Result<&str> {
        self.names
            .get(&object.type_id())
            .map(String::as_str)
            .ok_or_else(|| CodecError::TypeNotFound {
                name: object.type_path().to_string(),
            })
    }

    /// Looks up a declared type name, applying the rename table first.
    pub(crate) fn resolve<'r>(
        &'r self,
        name: &str,
        overrides: Option<&HashMap<String, String>>,
    ) -> Result<&'r TypeEntry> {
        let effective = overrides
            .and_then(|table| table.get(name))
            .map(String::as_str)
            .unwrap_or(name);
        self.entries
            .get(effective)
            .ok_or_else(|| CodecError::TypeNotFound {
                name: effective.to_string(),
            })
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}
