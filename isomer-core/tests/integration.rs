//! End-to-end round trips through the derive macro.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use isomer_core::{
    Codec, CodecError, FieldBag, GraphObject, Handle, SeqRef, TypeRegistry, Value, graph_object,
};

/// A person with an optional link to another person.
#[derive(Debug, Default, GraphObject)]
struct Person {
    name: String,
    age: u32,
    friend: Option<Handle<Person>>,
}

/// Two slots, for shared-substructure checks.
#[derive(Debug, Default, GraphObject)]
struct Duo {
    first: Option<Handle<Person>>,
    second: Option<Handle<Person>>,
}

/// Owns a shared member sequence and a plain string list.
#[derive(Debug, Default, GraphObject)]
struct Team {
    name: String,
    members: SeqRef,
    tags: Vec<String>,
}

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry.register_as::<Person>("people.Person").unwrap();
    registry.register_as::<Duo>("people.Duo").unwrap();
    registry.register_as::<Team>("people.Team").unwrap();
    registry
}

fn codec() -> Codec {
    Codec::new(registry())
}

fn person(name: &str, age: u32) -> Handle<Person> {
    Handle::new(Person {
        name: name.to_string(),
        age,
        friend: None,
    })
}

#[test]
fn acyclic_round_trip() {
    let codec = codec();
    let friend = person("grace", 85);
    let root = Handle::new(Person {
        name: "ada".to_string(),
        age: 36,
        friend: Some(friend),
    });

    let text = codec.encode(root).unwrap();
    let back: Handle<Person> = codec.decode(&text).unwrap();

    assert_eq!(back.borrow().name, "ada");
    assert_eq!(back.borrow().age, 36);
    let friend = back.borrow().friend.clone().unwrap();
    assert_eq!(friend.borrow().name, "grace");
    assert_eq!(friend.borrow().age, 85);
    assert!(friend.borrow().friend.is_none());
}

#[test]
fn shared_reference_round_trips_to_one_instance() {
    let codec = codec();
    let shared = person("shared", 1);
    let duo = Handle::new(Duo {
        first: Some(Handle::new(Person {
            name: "x".to_string(),
            age: 2,
            friend: Some(shared.clone()),
        })),
        second: Some(Handle::new(Person {
            name: "y".to_string(),
            age: 3,
            friend: Some(shared),
        })),
    });

    let text = codec.encode(duo).unwrap();
    let back: Handle<Duo> = codec.decode(&text).unwrap();

    let first_friend = back.borrow().first.clone().unwrap().borrow().friend.clone().unwrap();
    let second_friend = back.borrow().second.clone().unwrap().borrow().friend.clone().unwrap();
    assert!(Handle::ptr_eq(&first_friend, &second_friend));
    assert_eq!(first_friend.borrow().name, "shared");
}

#[test]
fn self_reference_round_trips() {
    let codec = codec();
    let narcissus = person("narcissus", 16);
    narcissus.borrow_mut().friend = Some(narcissus.clone());

    let text = codec.encode(narcissus).unwrap();
    let back: Handle<Person> = codec.decode(&text).unwrap();

    let friend = back.borrow().friend.clone().unwrap();
    assert!(Handle::ptr_eq(&back, &friend));
}

#[test]
fn mutual_references_decode_without_recursion() {
    // A and B referencing each other, written out by hand the way the
    // writer would emit them.
    let text = r#"{
        "id": "_1", "type": "people.Person", "name": "a", "age": 1,
        "friend": {
            "id": "_2", "type": "people.Person", "name": "b", "age": 2,
            "friend": {"ref": "_1"}
        }
    }"#;

    let a = codec().decode::<Person>(text).unwrap();
    let b = a.borrow().friend.clone().unwrap();
    assert_eq!(a.borrow().name, "a");
    assert_eq!(b.borrow().name, "b");
    let back = b.borrow().friend.clone().unwrap();
    assert!(Handle::ptr_eq(&a, &back));
}

#[test]
fn sequence_with_duplicate_references_shares_one_instance() {
    let codec = codec();
    let soloist = person("solo", 30);
    let team = Handle::new(Team {
        name: "band".to_string(),
        members: Rc::new(RefCell::new(vec![
            Value::from(soloist.clone()),
            Value::from(soloist.clone()),
            Value::from(soloist),
        ])),
        tags: vec![],
    });

    let text = codec.encode(team).unwrap();
    let back: Handle<Team> = codec.decode(&text).unwrap();

    let members = back.borrow().members.clone();
    let members = members.borrow();
    assert_eq!(members.len(), 3);
    assert_eq!(members[0], members[1]);
    assert_eq!(members[1], members[2]);
}

#[test]
fn forward_referenced_field_survives_import() {
    // "first" names _3 before _3 is declared under "second"; the patch
    // must still be visible after Person materializes.
    let text = r#"{
        "id": "_1", "type": "people.Duo",
        "first": {"ref": "_3"},
        "second": {"id": "_3", "type": "people.Person", "name": "late", "age": 9, "friend": null}
    }"#;

    let duo = codec().decode::<Duo>(text).unwrap();
    let first = duo.borrow().first.clone().expect("patched after import");
    let second = duo.borrow().second.clone().unwrap();
    assert!(Handle::ptr_eq(&first, &second));
}

#[test]
fn plain_vec_field_round_trips() {
    let codec = codec();
    let team = Handle::new(Team {
        name: "tagged".to_string(),
        members: SeqRef::default(),
        tags: vec!["alpha".to_string(), "beta".to_string()],
    });

    let text = codec.encode(team).unwrap();
    let back: Handle<Team> = codec.decode(&text).unwrap();
    assert_eq!(back.borrow().tags, ["alpha", "beta"]);
}

#[test]
fn duplicate_field_name_fails_fast() {
    let mut bag = FieldBag::new();
    bag.add("name", "once").unwrap();
    assert!(matches!(
        bag.add("name", "twice"),
        Err(CodecError::DuplicateField { name }) if name == "name"
    ));
}

#[test]
fn unknown_type_fails() {
    let text = r#"{"id":"_1","type":"people.Stranger","name":"?","age":0,"friend":null}"#;
    assert!(matches!(
        codec().decode::<Person>(text),
        Err(CodecError::TypeNotFound { name }) if name == "people.Stranger"
    ));
}

#[test]
fn renamed_type_decodes_through_override_table() {
    let text = r#"{"id":"_1","type":"old.Person","name":"kept","age":4,"friend":null}"#;

    let codec = Codec::new(registry()).with_type_overrides(HashMap::from([(
        "old.Person".to_string(),
        "people.Person".to_string(),
    )]));

    let back: Handle<Person> = codec.decode(text).unwrap();
    assert_eq!(back.borrow().name, "kept");
}

// --- Derive macro feature tests ---

#[derive(Debug, Default, GraphObject)]
struct Renamed {
    #[graph(rename = "firstName")]
    first_name: String,
    #[graph(skip)]
    cached: u64,
}

#[test]
fn rename_and_skip_attributes() {
    let mut registry = TypeRegistry::new();
    registry.register_as::<Renamed>("attr.Renamed").unwrap();
    let codec = Codec::new(registry);

    let value = Handle::new(Renamed {
        first_name: "ada".to_string(),
        cached: 99,
    });
    let text = codec.encode(value).unwrap();
    assert!(text.contains("firstName"));
    assert!(!text.contains("first_name"));
    assert!(!text.contains("cached"));

    let back: Handle<Renamed> = codec.decode(&text).unwrap();
    assert_eq!(back.borrow().first_name, "ada");
    assert_eq!(back.borrow().cached, 0);
}

/// The attribute macro is sugar for the full derive list.
#[graph_object]
struct Point {
    x: f64,
    y: f64,
}

#[test]
fn graph_object_attribute_macro() {
    let mut registry = TypeRegistry::new();
    registry.register_as::<Point>("geo.Point").unwrap();
    let codec = Codec::new(registry);

    let text = codec.encode(Handle::new(Point { x: 1.5, y: -2.0 })).unwrap();
    let back: Handle<Point> = codec.decode(&text).unwrap();
    assert_eq!(back.borrow().x, 1.5);
    assert_eq!(back.borrow().y, -2.0);
}

#[test]
fn set_field_rejects_unknown_names() {
    let mut point = Point { x: 0.0, y: 0.0 };
    assert!(matches!(
        point.set_field("z", Value::from(1.0f64)),
        Err(CodecError::UnknownField { name, .. }) if name == "z"
    ));
    point.set_field("x", Value::from(3.0f64)).unwrap();
    assert_eq!(point.x, 3.0);
}
