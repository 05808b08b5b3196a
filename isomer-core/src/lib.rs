//! Isomer is a reference-preserving object-graph codec.
//!
//! It converts a live graph of interlinked objects, including cycles and
//! shared references, into a tree-structured JSON document, and rebuilds
//! an equivalent graph from that text with the reference topology intact:
//! two fields that pointed at the *same* instance point at the same
//! decoded instance again, and a cycle comes back as a cycle.
//!
//! Core concepts:
//! - **GraphObject**: a value participating in the protocol; it exports
//!   and imports its fields through a [`FieldBag`]
//! - **Handle**: a typed shared reference to a graph object (identity is
//!   pointer identity, not value equality)
//! - **Value**: the dynamically typed field value moved through bags
//! - **TypeRegistry**: explicit name ↔ type mapping with factories,
//!   populated at program start
//! - **Codec**: the encode/decode entry point over the JSON node tree
//!
//! # Example
//!
//! ```
//! use isomer_core::{Codec, GraphObject, Handle, TypeRegistry};
//!
//! #[derive(Debug, Default, GraphObject)]
//! struct Person {
//!     name: String,
//!     mentor: Option<Handle<Person>>,
//! }
//!
//! let mut registry = TypeRegistry::new();
//! registry.register_as::<Person>("example.Person")?;
//! let codec = Codec::new(registry);
//!
//! // Two people share one mentor, and the mentor's mentor is herself.
//! let ada = Handle::new(Person { name: "ada".into(), mentor: None });
//! ada.borrow_mut().mentor = Some(ada.clone());
//! let student = Handle::new(Person { name: "student".into(), mentor: Some(ada.clone()) });
//!
//! let text = codec.encode(student)?;
//! let back: Handle<Person> = codec.decode(&text)?;
//!
//! let mentor = back.borrow().mentor.clone().unwrap();
//! let mentors_mentor = mentor.borrow().mentor.clone().unwrap();
//! assert!(Handle::ptr_eq(&mentor, &mentors_mentor));
//! # Ok::<(), isomer_core::CodecError>(())
//! ```
//!
//! # Wire format
//!
//! An object declares itself once, tagged with a fresh id, and is referred
//! to by id everywhere else:
//!
//! ```json
//! { "id": "_1", "type": "example.Person", "name": "ada", "mentor": { "ref": "_1" } }
//! ```
//!
//! Sequences declare with a reserved `values` field. The reserved names
//! `id`, `type`, `ref` and `values` must not collide with real field names.

mod bag;
mod codec;
mod error;
mod object;
mod reader;
mod registry;
mod value;
mod writer;

#[cfg(test)]
pub(crate) mod testutil;

pub use bag::FieldBag;
pub use codec::Codec;
pub use error::{CodecError, Result};
pub use object::{GraphCell, GraphObject, Handle, ObjRef};
pub use reader::GraphReader;
pub use registry::{SEQUENCE_TYPE, TypeRegistry};
pub use value::{FromValue, SeqRef, Value};
pub use writer::GraphWriter;

#[cfg(feature = "derive")]
pub use isomer_derive::{GraphObject, graph_object};
