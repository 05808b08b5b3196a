use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value as JsonValue;

use crate::bag::FieldBag;
use crate::error::{CodecError, Result};
use crate::object::ObjRef;
use crate::registry::{TypeEntry, TypeRegistry};
use crate::value::{SeqRef, Value};

/// A field whose reference target was not yet declared when the field was
/// read. Applied in the finishing pass through the holder's `set_field`.
struct DeferredField {
    holder: ObjRef,
    field: String,
    target: String,
}

/// A sequence slot whose element's target was not yet declared. The slot
/// keeps its declared index, so forward-referenced elements land exactly
/// where the document put them.
struct DeferredSlot {
    seq: SeqRef,
    index: usize,
    target: String,
}

/// Two-pass decoder from a parsed node tree to a live graph.
///
/// Pass 1 is a single recursive descent in document order. Every
/// declaration registers its id *before* its contents are processed, which
/// is what makes back-references (including an object referencing itself)
/// resolve immediately. A reference whose target is not yet known yields a
/// placeholder and an owned deferred record instead of blocking.
///
/// Pass 2 runs once the whole document has been walked, when every id is
/// known: sequence slots are filled first (so imports observe complete,
/// order-correct sequences), then every queued object materializes through
/// `import_fields` in declaration order, then deferred fields are patched
/// through `set_field`. Patches run last so an import can never overwrite
/// one with the parse-time placeholder still sitting in its bag.
///
/// A reader decodes exactly one document; identities and deferred records
/// never outlive the call.
pub struct GraphReader<'r> {
    registry: &'r TypeRegistry,
    overrides: Option<&'r HashMap<String, String>>,
    identities: HashMap<String, Value>,
    deferred_fields: Vec<DeferredField>,
    deferred_slots: Vec<DeferredSlot>,
    pending: Vec<(ObjRef, FieldBag)>,
}

impl<'r> GraphReader<'r> {
    pub fn new(
        registry: &'r TypeRegistry,
        overrides: Option<&'r HashMap<String, String>>,
    ) -> Self {
        GraphReader {
            registry,
            overrides,
            identities: HashMap::new(),
            deferred_fields: Vec::new(),
            deferred_slots: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Decodes a parsed document into a live graph.
    pub fn read(mut self, document: &JsonValue) -> Result<Value> {
        let (root, not_ready) = self.read_node(document)?;
        if let Some(id) = not_ready {
            // A root-level reference has nothing after it that could
            // declare the target.
            return Err(CodecError::UnresolvedReference { id });
        }
        self.finish()?;
        Ok(root)
    }

    /// Reads one node. Returns the decoded value plus, for a reference
    /// whose target is still unknown, the id the caller must defer on
    /// (the returned value is then a placeholder).
    fn read_node(&mut self, node: &JsonValue) -> Result<(Value, Option<String>)> {
        let map = match node {
            JsonValue::Null => return Ok((Value::Null, None)),
            JsonValue::Bool(b) => return Ok((Value::Bool(*b), None)),
            JsonValue::Number(n) => return Ok((read_number(n)?, None)),
            JsonValue::String(s) => return Ok((Value::Str(s.clone()), None)),
            // A bare array only appears in foreign documents; it reads as
            // an anonymous sequence with no identity of its own.
            JsonValue::Array(items) => {
                let seq: SeqRef = Rc::default();
                self.read_elements(&seq, items)?;
                return Ok((Value::Seq(seq), None));
            }
            JsonValue::Object(map) => map,
        };

        if let Some(target) = map.get("ref") {
            let target = expect_str(target, "ref")?;
            return Ok(match self.identities.get(target) {
                Some(value) => (value.clone(), None),
                None => (Value::Null, Some(target.to_string())),
            });
        }

        let Some(id) = map.get("id") else {
            return Err(CodecError::MalformedNode(
                "node is neither a reference nor a declaration".to_string(),
            ));
        };
        let id = expect_str(id, "id")?;
        let Some(declared) = map.get("type") else {
            return Err(CodecError::MalformedNode(format!(
                "declaration {id:?} is missing \"type\""
            )));
        };
        let declared = expect_str(declared, "type")?;
        let entry = self.registry.resolve(declared, self.overrides)?;

        if let Some(values) = map.get("values") {
            let TypeEntry::Sequence = entry else {
                return Err(CodecError::MalformedNode(format!(
                    "\"values\" under non-sequence type {declared:?}"
                )));
            };
            let JsonValue::Array(items) = values else {
                return Err(CodecError::MalformedNode(format!(
                    "\"values\" of {id:?} must be an array"
                )));
            };
            let seq: SeqRef = Rc::default();
            // Registered before the elements so they may reference the
            // sequence itself.
            self.identities
                .insert(id.to_string(), Value::Seq(Rc::clone(&seq)));
            self.read_elements(&seq, items)?;
            return Ok((Value::Seq(seq), None));
        }

        let TypeEntry::Object(factory) = entry else {
            return Err(CodecError::MalformedNode(format!(
                "sequence type {declared:?} without \"values\""
            )));
        };
        let shell = factory();
        log::trace!("declared {id} as {declared}");
        // Registered before the fields so cyclic back-references resolve.
        self.identities
            .insert(id.to_string(), Value::Object(Rc::clone(&shell)));
        // Queue position reserved now: objects materialize in declaration
        // order, not in the order nested declarations complete.
        let queued = self.pending.len();
        self.pending.push((Rc::clone(&shell), FieldBag::new()));

        let mut bag = FieldBag::new();
        for (name, child) in map {
            if matches!(name.as_str(), "id" | "type" | "ref" | "values") {
                continue;
            }
            let (value, not_ready) = self.read_node(child)?;
            bag.add(name.as_str(), value)?;
            if let Some(target) = not_ready {
                self.deferred_fields.push(DeferredField {
                    holder: Rc::clone(&shell),
                    field: name.clone(),
                    target,
                });
            }
        }
        self.pending[queued].1 = bag;
        Ok((Value::Object(shell), None))
    }

    fn read_elements(&mut self, seq: &SeqRef, items: &[JsonValue]) -> Result<()> {
        for (index, item) in items.iter().enumerate() {
            let (value, not_ready) = self.read_node(item)?;
            seq.borrow_mut().push(value);
            if let Some(target) = not_ready {
                self.deferred_slots.push(DeferredSlot {
                    seq: Rc::clone(seq),
                    index,
                    target,
                });
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        log::debug!(
            "finishing: {} slots, {} objects, {} field patches",
            self.deferred_slots.len(),
            self.pending.len(),
            self.deferred_fields.len()
        );
        for slot in &self.deferred_slots {
            let value = self.lookup(&slot.target)?;
            slot.seq.borrow_mut()[slot.index] = value;
        }
        for (object, bag) in &self.pending {
            object.borrow_mut().import_fields(bag)?;
        }
        for patch in &self.deferred_fields {
            let value = self.lookup(&patch.target)?;
            patch.holder.borrow_mut().set_field(&patch.field, value)?;
        }
        Ok(())
    }

    fn lookup(&self, id: &str) -> Result<Value> {
        self.identities
            .get(id)
            .cloned()
            .ok_or_else(|| CodecError::UnresolvedReference { id: id.to_string() })
    }
}

fn read_number(n: &serde_json::Number) -> Result<Value> {
    if let Some(i) = n.as_i64() {
        Ok(Value::Int(i))
    } else if let Some(u) = n.as_u64() {
        Ok(Value::Uint(u))
    } else if let Some(f) = n.as_f64() {
        Ok(Value::Float(f))
    } else {
        Err(CodecError::MalformedNode(format!(
            "unrepresentable number {n}"
        )))
    }
}

fn expect_str<'a>(value: &'a JsonValue, key: &str) -> Result<&'a str> {
    value.as_str().ok_or_else(|| {
        CodecError::MalformedNode(format!("\"{key}\" must be a string"))
    })
}
