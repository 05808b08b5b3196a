use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::bag::FieldBag;
use crate::error::{CodecError, Result};
use crate::object::ObjRef;
use crate::registry::{SEQUENCE_TYPE, TypeRegistry};
use crate::value::{SeqRef, Value};

/// Depth-first encoder from a live graph to a generic tree of nodes.
///
/// The writer owns the encode-side identity table, keyed by cell address.
/// The first time an object or sequence is encountered it is assigned the
/// next id (`_1`, `_2`, ...) and emitted as a declaration node; every later
/// encounter emits a reference node instead, which both de-duplicates
/// shared substructure and terminates recursion on cycles. The table is
/// scoped to this writer: one writer per `encode` call, no state across
/// calls.
pub struct GraphWriter<'r> {
    registry: &'r TypeRegistry,
    ids: HashMap<*const (), String>,
    next_id: u64,
}

impl<'r> GraphWriter<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        GraphWriter {
            registry,
            ids: HashMap::new(),
            next_id: 1,
        }
    }

    /// Encodes one value. Scalars delegate to the tree-format library
    /// unchanged; objects and sequences go through the identity protocol.
    pub fn write(&mut self, value: &Value) -> Result<JsonValue> {
        Ok(match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::from(*i),
            Value::Uint(u) => JsonValue::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .ok_or(CodecError::NonFiniteNumber)?,
            Value::Str(s) => JsonValue::String(s.clone()),
            Value::Seq(seq) => self.write_sequence(seq)?,
            Value::Object(obj) => self.write_object(obj)?,
        })
    }

    fn write_object(&mut self, obj: &ObjRef) -> Result<JsonValue> {
        let key = Rc::as_ptr(obj) as *const ();
        if let Some(id) = self.ids.get(&key) {
            return Ok(reference_node(id));
        }
        let id = self.assign(key);
        let type_name = self.registry.name_of(obj)?.to_string();

        let mut bag = FieldBag::new();
        obj.borrow().export_fields(&mut bag)?;

        let mut node = JsonMap::new();
        node.insert("id".to_string(), JsonValue::String(id));
        node.insert("type".to_string(), JsonValue::String(type_name));
        for (name, field) in bag.iter() {
            let encoded = self.write(field)?;
            node.insert(name.to_string(), encoded);
        }
        Ok(JsonValue::Object(node))
    }

    fn write_sequence(&mut self, seq: &SeqRef) -> Result<JsonValue> {
        let key = Rc::as_ptr(seq) as *const ();
        if let Some(id) = self.ids.get(&key) {
            return Ok(reference_node(id));
        }
        let id = self.assign(key);

        // Shallow snapshot: the borrow must not be held while elements
        // recurse, since an element may be this sequence itself.
        let items: Vec<Value> = seq.borrow().clone();
        let mut values = Vec::with_capacity(items.len());
        for item in &items {
            values.push(self.write(item)?);
        }

        let mut node = JsonMap::new();
        node.insert("id".to_string(), JsonValue::String(id));
        node.insert(
            "type".to_string(),
            JsonValue::String(SEQUENCE_TYPE.to_string()),
        );
        node.insert("values".to_string(), JsonValue::Array(values));
        Ok(JsonValue::Object(node))
    }

    fn assign(&mut self, key: *const ()) -> String {
        let id = format!("_{}", self.next_id);
        self.next_id += 1;
        log::trace!("assigned {id}");
        self.ids.insert(key, id.clone());
        id
    }
}

fn reference_node(id: &str) -> JsonValue {
    let mut node = JsonMap::new();
    node.insert("ref".to_string(), JsonValue::String(id.to_string()));
    JsonValue::Object(node)
}
