//! classkit - reflective class registry and graph serializer
//!
//! Hosts register named, inheritable classes with declared properties and
//! per-property attributes, build live object graphs from them, and persist
//! those graphs (cycles included) as compact, type-tagged JSON envelopes.
//!
//! ```
//! use classkit::objects::{Attribute, ClassRegistry, Value};
//! use classkit::serialize::{deserialize, serialize};
//!
//! let mut registry = ClassRegistry::new();
//! let sprite = registry
//!     .define("Sprite", None)?
//!     .prop("trimThreshold", 2, &[Attribute::editor_only()])?
//!     .prop("frames", Value::array(Vec::new()), &[])?
//!     .id();
//!
//! let root = Value::Object(registry.instantiate(sprite, &[]));
//! let envelope = serialize(&registry, &root, true)?;
//! assert_eq!(envelope, serde_json::json!([{ "__type__": "Sprite", "frames": [] }]));
//!
//! let copy = deserialize(&registry, &envelope)?;
//! assert_eq!(copy.as_object().unwrap().borrow().class(), Some(sprite));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod objects;
pub mod serialize;

pub use config::SerializeConfig;
pub use objects::{Attribute, ClassError, ClassId, ClassRegistry, Object, ObjectRef, Value};
pub use serialize::{
    deserialize, deserialize_str, inspect, serialize, serialize_to_string, DeserializeError,
    SerializeError,
};
