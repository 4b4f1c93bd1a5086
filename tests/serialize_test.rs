//! Serialization round-trip tests

mod common;

use classkit::objects::{Attribute, ClassRegistry, Value};
use classkit::serialize::{deserialize, deserialize_str, serialize, serialize_to_string};
use classkit::{DeserializeError, SerializeConfig};
use common::{field, Fixture};
use serde_json::json;

#[test]
fn test_typed_object_serializes_declared_properties_only() {
    let fx = Fixture::new();
    let sprite = fx.registry.instantiate(fx.sprite, &[]);
    sprite.borrow_mut().set("name", "hero.png");
    sprite.borrow_mut().set("image", "not declared");

    let envelope = serialize(&fx.registry, &Value::Object(sprite), false).unwrap();
    assert_eq!(
        envelope,
        json!([{
            "__type__": "Sprite",
            "name": "hero.png",
            "size": { "__type__": "Vec2", "x": 128, "y": 128 },
            "trimThreshold": 1,
            "frames": [],
        }])
    );
}

#[test]
fn test_editor_only_stripping() {
    let mut registry = ClassRegistry::new();
    let class = registry
        .define("Sprite", None)
        .unwrap()
        .prop("a", 2, &[Attribute::editor_only()])
        .unwrap()
        .prop("_isValid", true, &[Attribute::non_serialized()])
        .unwrap()
        .id();
    let root = Value::Object(registry.instantiate(class, &[]));

    let in_editor = serialize(&registry, &root, false).unwrap();
    let in_player = serialize(&registry, &root, true).unwrap();

    assert_eq!(in_editor, json!([{ "__type__": "Sprite", "a": 2 }]));
    assert_eq!(in_player, json!([{ "__type__": "Sprite" }]));
}

#[test]
fn test_round_trip_restores_fields_and_types() {
    let fx = Fixture::new();
    let sprite = fx.registry.instantiate(fx.sprite, &[]);
    {
        let mut s = sprite.borrow_mut();
        s.set("name", "hero.png");
        s.set("trimThreshold", 4);
        s.set("frames", Value::array(vec![Value::from(1.5), Value::from("b"), Value::Null]));
    }
    let root = Value::Object(sprite);

    let envelope = serialize(&fx.registry, &root, false).unwrap();
    let copy = deserialize(&fx.registry, &envelope).unwrap();

    let obj = copy.as_object().unwrap();
    assert_eq!(obj.borrow().class(), Some(fx.sprite));
    assert_eq!(obj.borrow().get_string("name"), Some("hero.png"));
    assert_eq!(obj.borrow().get_i64("trimThreshold"), Some(4));

    let size = field(&copy, "size");
    assert_eq!(size.as_object().unwrap().borrow().class(), Some(fx.vec2));
    assert_eq!(field(&size, "x").as_i64(), Some(128));

    let frames = field(&copy, "frames");
    let frames = frames.as_array().unwrap().borrow();
    assert_eq!(frames[0].as_f64(), Some(1.5));
    assert_eq!(frames[1].as_str(), Some("b"));
    assert!(frames[2].is_null());
}

#[test]
fn test_reserialize_is_idempotent() {
    let fx = Fixture::new();
    let sprite = fx.registry.instantiate(fx.sprite, &[]);
    sprite.borrow_mut().set("name", "idle");
    let root = Value::Object(sprite);

    for strip in [false, true] {
        let first = serialize(&fx.registry, &root, strip).unwrap();
        let copy = deserialize(&fx.registry, &first).unwrap();
        let second = serialize(&fx.registry, &copy, strip).unwrap();
        assert_eq!(first, second);
        // Serializing the same live graph twice also matches
        assert_eq!(serialize(&fx.registry, &root, strip).unwrap(), first);
    }
}

#[test]
fn test_stripped_field_keeps_default_after_load() {
    let fx = Fixture::new();
    let sprite = fx.registry.instantiate(fx.sprite, &[]);
    sprite.borrow_mut().set("trimThreshold", 9);
    sprite.borrow_mut().set("_dirty", true);

    let envelope = serialize(&fx.registry, &Value::Object(sprite), true).unwrap();
    let copy = deserialize(&fx.registry, &envelope).unwrap();

    assert_eq!(field(&copy, "trimThreshold").as_i64(), Some(1));
    assert_eq!(field(&copy, "_dirty").as_bool(), Some(false));
}

#[test]
fn test_two_arrays_circular_reference() {
    let mut registry = ClassRegistry::new();
    let holder = registry
        .define("Holder", None)
        .unwrap()
        .prop("array1", Value::Null, &[])
        .unwrap()
        .prop("array2", Value::Null, &[])
        .unwrap()
        .id();

    // a = [1, b], b = [a, 2]
    let a = Value::array(vec![Value::from(1)]);
    let b = Value::array(vec![a.clone(), Value::from(2)]);
    a.as_array().unwrap().borrow_mut().push(b.clone());

    let obj = registry.instantiate(holder, &[]);
    obj.borrow_mut().set("array1", a.clone());
    obj.borrow_mut().set("array2", b.clone());
    let root = Value::Object(obj);

    let envelope = serialize(&registry, &root, false).unwrap();
    assert_eq!(
        envelope,
        json!([
            { "__type__": "Holder", "array1": { "__id__": 1 }, "array2": { "__id__": 2 } },
            [1, { "__id__": 2 }],
            [{ "__id__": 1 }, 2],
        ])
    );
    assert_eq!(serialize(&registry, &root, false).unwrap(), envelope);

    let copy = deserialize(&registry, &envelope).unwrap();
    let a2 = field(&copy, "array1");
    let b2 = field(&copy, "array2");
    assert!(!a2.ptr_eq(&b2));
    assert!(!a2.ptr_eq(&a));
    assert_eq!(a2.as_array().unwrap().borrow()[0].as_i64(), Some(1));
    assert!(a2.as_array().unwrap().borrow()[1].ptr_eq(&b2));
    assert!(b2.as_array().unwrap().borrow()[0].ptr_eq(&a2));
    assert_eq!(b2.as_array().unwrap().borrow()[1].as_i64(), Some(2));

    // Break the cycles so the test does not leak
    a.as_array().unwrap().borrow_mut().clear();
    a2.as_array().unwrap().borrow_mut().clear();
}

#[test]
fn test_two_records_circular_reference_and_extra_alias() {
    let registry = ClassRegistry::new();
    let dict1 = Value::record([("num", Value::from(1))]);
    let dict2 = Value::record([("num", Value::from(2)), ("other", dict1.clone())]);
    dict1.as_object().unwrap().borrow_mut().set("other", dict2.clone());

    let root = Value::record([
        ("dict1", dict1.clone()),
        ("dict2", dict2.clone()),
        ("sameRef", dict2.clone()),
    ]);

    let envelope = serialize(&registry, &root, false).unwrap();
    assert_eq!(
        envelope,
        json!([
            { "dict1": { "__id__": 1 }, "dict2": { "__id__": 2 }, "sameRef": { "__id__": 2 } },
            { "num": 1, "other": { "__id__": 2 } },
            { "num": 2, "other": { "__id__": 1 } },
        ])
    );

    let copy = deserialize(&registry, &envelope).unwrap();
    let d1 = field(&copy, "dict1");
    let d2 = field(&copy, "dict2");
    assert!(field(&copy, "sameRef").ptr_eq(&d2));
    assert!(field(&d1, "other").ptr_eq(&d2));
    assert!(field(&d2, "other").ptr_eq(&d1));

    dict1.as_object().unwrap().borrow_mut().remove("other");
    d1.as_object().unwrap().borrow_mut().remove("other");
}

#[test]
fn test_root_inside_cycle() {
    let registry = ClassRegistry::new();
    let root = Value::record([("name", Value::from("root"))]);
    let child = Value::record([("parent", root.clone())]);
    let children = Value::array(vec![child.clone(), child.clone()]);
    root.as_object().unwrap().borrow_mut().set("children", children);

    let envelope = serialize(&registry, &root, false).unwrap();
    assert_eq!(
        envelope,
        json!([
            { "name": "root", "children": [{ "__id__": 1 }, { "__id__": 1 }] },
            { "parent": { "__id__": 0 } },
        ])
    );

    let copy = deserialize(&registry, &envelope).unwrap();
    let kids = field(&copy, "children");
    let kids = kids.as_array().unwrap().borrow().clone();
    assert!(kids[0].ptr_eq(&kids[1]));
    assert!(field(&kids[0], "parent").ptr_eq(&copy));

    root.as_object().unwrap().borrow_mut().remove("children");
    copy.as_object().unwrap().borrow_mut().remove("children");
}

#[test]
fn test_unknown_type_fails_naming_the_type() {
    let registry = ClassRegistry::new();
    let err = deserialize(&registry, &json!([{ "__type__": "NoSuchClass", "a": 1 }])).unwrap_err();
    match err {
        DeserializeError::UnknownType { type_name, path } => {
            assert_eq!(type_name, "NoSuchClass");
            assert_eq!(path.to_string(), "$[0]");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_nested_unknown_type_fails_before_building() {
    let fx = Fixture::new();
    let constructed = std::rc::Rc::new(std::cell::Cell::new(0));
    let counter = constructed.clone();

    let mut registry = fx.registry;
    registry
        .define_with("Probe", None, move |_, _, _| counter.set(counter.get() + 1))
        .unwrap();

    let envelope = json!([
        { "__type__": "Probe", "x": [{ "__type__": "Missing" }] },
    ]);
    let err = deserialize(&registry, &envelope).unwrap_err();
    assert!(err.to_string().contains("Missing"));
    assert_eq!(constructed.get(), 0);
}

#[test]
fn test_unregistered_class_cannot_be_loaded() {
    let mut fx = Fixture::new();
    let sprite = fx.registry.instantiate(fx.sprite, &[]);
    let envelope = serialize(&fx.registry, &Value::Object(sprite), false).unwrap();

    fx.registry.undefine(&[fx.sprite]);
    assert!(matches!(
        deserialize(&fx.registry, &envelope),
        Err(DeserializeError::UnknownType { .. })
    ));
}

#[test]
fn test_extra_and_missing_keys() {
    let fx = Fixture::new();
    let envelope = json!([{ "__type__": "Sprite", "name": "x", "legacy": 1, "_dirty": true }]);

    let copy = deserialize(&fx.registry, &envelope).unwrap();
    let obj = copy.as_object().unwrap().borrow();
    assert_eq!(obj.get_string("name"), Some("x"));
    assert!(!obj.has("legacy"));
    // Non-serialized and missing keys keep defaults
    assert_eq!(obj.get_bool("_dirty"), Some(false));
    assert_eq!(obj.get_i64("trimThreshold"), Some(1));
    assert!(field(&obj.get("size").cloned().unwrap(), "x").as_i64() == Some(128));
}

#[test]
fn test_extra_keys_are_not_validated() {
    let fx = Fixture::new();
    let envelope = json!([{
        "__type__": "Sprite",
        "name": "x",
        "legacy": { "__type__": "RemovedClass" },
        "oldLink": { "__id__": 9 },
        "_dirty": [{ "__type__": "AlsoRemoved" }],
    }]);

    let copy = deserialize(&fx.registry, &envelope).unwrap();
    let obj = copy.as_object().unwrap().borrow();
    assert_eq!(obj.get_string("name"), Some("x"));
    assert!(!obj.has("legacy"));
    assert!(!obj.has("oldLink"));
    assert_eq!(obj.get_bool("_dirty"), Some(false));

    // Declared keys are still checked
    let envelope = json!([{ "__type__": "Sprite", "size": { "__type__": "RemovedClass" } }]);
    assert!(matches!(
        deserialize(&fx.registry, &envelope),
        Err(DeserializeError::UnknownType { .. })
    ));
}

#[test]
fn test_defaults_are_fresh_after_load() {
    let fx = Fixture::new();
    let envelope = json!([{ "__type__": "Sprite" }]);

    let a = deserialize(&fx.registry, &envelope).unwrap();
    let b = deserialize(&fx.registry, &envelope).unwrap();
    assert!(!field(&a, "frames").ptr_eq(&field(&b, "frames")));
    assert!(!field(&a, "size").ptr_eq(&field(&b, "size")));
}

#[test]
fn test_text_round_trip_with_config() {
    let fx = Fixture::new();
    let root = Value::Object(fx.registry.instantiate(fx.sprite, &[]));

    let text = serialize_to_string(&fx.registry, &root, &SerializeConfig::player()).unwrap();
    assert!(!text.contains("trimThreshold"));

    let copy = deserialize_str(&fx.registry, &text).unwrap();
    assert_eq!(copy.as_object().unwrap().borrow().class(), Some(fx.sprite));
}
