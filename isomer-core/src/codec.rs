use std::collections::HashMap;

use crate::error::{CodecError, Result};
use crate::object::{GraphObject, Handle};
use crate::reader::GraphReader;
use crate::registry::TypeRegistry;
use crate::value::Value;
use crate::writer::GraphWriter;

/// Encode/decode entry point.
///
/// A codec owns the type registry and the optional decode-time rename
/// table; each call configures a fresh [`GraphWriter`] or [`GraphReader`]
/// over them, so no identity state ever crosses calls and a codec is
/// freely reusable.
///
/// # Example
///
/// ```
/// use isomer_core::{Codec, GraphObject, Handle, TypeRegistry};
///
/// #[derive(Debug, Default, GraphObject)]
/// struct Node {
///     label: String,
///     next: Option<Handle<Node>>,
/// }
///
/// let mut registry = TypeRegistry::new();
/// registry.register_as::<Node>("demo.Node")?;
/// let codec = Codec::new(registry);
///
/// let node = Handle::new(Node { label: "a".into(), next: None });
/// node.borrow_mut().next = Some(node.clone());
///
/// let text = codec.encode(node)?;
/// let back: Handle<Node> = codec.decode(&text)?;
/// let next = back.borrow().next.clone().unwrap();
/// assert!(Handle::ptr_eq(&back, &next));
/// # Ok::<(), isomer_core::CodecError>(())
/// ```
pub struct Codec {
    registry: TypeRegistry,
    type_overrides: HashMap<String, String>,
}

impl Codec {
    pub fn new(registry: TypeRegistry) -> Self {
        Codec {
            registry,
            type_overrides: HashMap::new(),
        }
    }

    /// Installs a serialized-name → current-name rename table, consulted
    /// once per declaration during decode. For documents written before a
    /// type was renamed.
    pub fn with_type_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.type_overrides = overrides;
        self
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Serializes a graph to text. The root may be an object handle, a
    /// sequence, or a plain scalar.
    pub fn encode(&self, root: impl Into<Value>) -> Result<String> {
        let root = root.into();
        let mut writer = GraphWriter::new(&self.registry);
        let document = writer.write(&root)?;
        Ok(serde_json::to_string_pretty(&document)?)
    }

    /// Deserializes text to a dynamically typed graph value.
    pub fn decode_value(&self, text: &str) -> Result<Value> {
        let document: serde_json::Value = serde_json::from_str(text)?;
        let overrides = if self.type_overrides.is_empty() {
            None
        } else {
            Some(&self.type_overrides)
        };
        GraphReader::new(&self.registry, overrides).read(&document)
    }

    /// Deserializes text and casts the root to `T`.
    pub fn decode<T: GraphObject>(&self, text: &str) -> Result<Handle<T>> {
        match self.decode_value(text)? {
            Value::Object(raw) => Handle::downcast(raw),
            other => Err(CodecError::TypeCast {
                expected: std::any::type_name::<T>(),
                found: other.kind(),
            }),
        }
    }
}
