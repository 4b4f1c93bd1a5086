//! Common test fixtures - collaborator classes shared by integration tests

#![allow(dead_code)]

use classkit::objects::{Attribute, ClassId, ClassRegistry, Value};

/// Registry preloaded with a small asset-like hierarchy
pub struct Fixture {
    pub registry: ClassRegistry,
    pub vec2: ClassId,
    pub asset: ClassId,
    pub sprite: ClassId,
}

impl Fixture {
    pub fn new() -> Self {
        let mut registry = ClassRegistry::new();

        let vec2 = registry
            .define_with("Vec2", None, |_, obj, args| {
                if let [x, y] = args {
                    obj.set("x", x.clone());
                    obj.set("y", y.clone());
                }
            })
            .unwrap()
            .prop("x", 0, &[])
            .unwrap()
            .prop("y", 0, &[])
            .unwrap()
            .with_clone(|obj| obj.clone())
            .id();

        let asset = registry
            .define("Asset", None)
            .unwrap()
            .prop("name", "", &[])
            .unwrap()
            .prop("_dirty", false, &[Attribute::non_serialized()])
            .unwrap()
            .id();

        let size = registry.instantiate(vec2, &[Value::from(128), Value::from(128)]);
        let sprite = registry
            .define("Sprite", Some(asset))
            .unwrap()
            .prop("size", Value::Object(size), &[])
            .unwrap()
            .prop("trimThreshold", 1, &[Attribute::editor_only()])
            .unwrap()
            .prop("frames", Value::array(Vec::new()), &[])
            .unwrap()
            .id();

        Self {
            registry,
            vec2,
            asset,
            sprite,
        }
    }
}

/// Field of a typed or plain object value
pub fn field(value: &Value, key: &str) -> Value {
    value
        .as_object()
        .expect("object value")
        .borrow()
        .get(key)
        .cloned()
        .unwrap_or_default()
}
