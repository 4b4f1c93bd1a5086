//! Deserializer: envelope -> live graph

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::objects::{ClassId, ClassRegistry, Object, Value};

use super::envelope::{self, is_restorable, reference_id, NodePath, ID_KEY, TYPE_KEY};
use super::DeserializeError;

/// Rebuild the live graph described by `envelope` and return its root.
///
/// The whole envelope is validated before any object is built, so an
/// unknown `__type__` or a dangling `__id__` fails without leaving a
/// partial graph behind. Typed records restore only their declared,
/// serializable properties; other keys are ignored and missing keys keep
/// the instance's default.
pub fn deserialize(registry: &ClassRegistry, envelope: &JsonValue) -> Result<Value, DeserializeError> {
    let summary = envelope::validate(envelope, Some(registry))?;
    let nodes = envelope::entries(envelope)?;
    let decoder = Decoder { registry };

    // Pass 1: a live placeholder for every entry, so references can resolve
    let mut path = NodePath::new();
    let mut live = Vec::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        path.push_index(index);
        live.push(decoder.instantiate(node, &path)?);
        path.pop();
    }

    // Pass 2: fill contents
    for (index, (node, target)) in nodes.iter().zip(&live).enumerate() {
        path.push_index(index);
        decoder.fill(target, node, &live, &mut path)?;
        path.pop();
    }

    debug!(
        nodes = summary.nodes,
        references = summary.references,
        "deserialized envelope"
    );
    live.into_iter().next().ok_or(DeserializeError::EmptyEnvelope)
}

/// Parse JSON text and deserialize it
pub fn deserialize_str(registry: &ClassRegistry, text: &str) -> Result<Value, DeserializeError> {
    let envelope: JsonValue = serde_json::from_str(text)?;
    deserialize(registry, &envelope)
}

struct Decoder<'r> {
    registry: &'r ClassRegistry,
}

impl Decoder<'_> {
    /// Create the empty live counterpart of a node
    fn instantiate(&self, node: &JsonValue, path: &NodePath) -> Result<Value, DeserializeError> {
        let value = match node {
            JsonValue::Array(_) => Value::array(Vec::new()),
            JsonValue::Object(map) => match map.get(TYPE_KEY) {
                Some(type_name) => {
                    let name = type_name.as_str().unwrap_or_default();
                    let class = self.registry.class_by_name(name).ok_or_else(|| {
                        DeserializeError::UnknownType {
                            type_name: name.to_string(),
                            path: path.clone(),
                        }
                    })?;
                    Value::Object(self.registry.instantiate(class, &[]))
                }
                None => Value::Object(Object::record().into_ref()),
            },
            primitive => from_primitive(primitive),
        };
        Ok(value)
    }

    /// Fill a live placeholder from its node
    fn fill(
        &self,
        target: &Value,
        node: &JsonValue,
        live: &[Value],
        path: &mut NodePath,
    ) -> Result<(), DeserializeError> {
        match (target, node) {
            (Value::Array(items), JsonValue::Array(nodes)) => {
                let mut values = Vec::with_capacity(nodes.len());
                for (i, item) in nodes.iter().enumerate() {
                    path.push_index(i);
                    values.push(self.resolve(item, live, path)?);
                    path.pop();
                }
                items.borrow_mut().extend(values);
            }
            (Value::Object(obj), JsonValue::Object(map)) => {
                let class = obj.borrow().class();
                let fields = match class {
                    Some(class) => self.restorable(class, map),
                    None => map
                        .iter()
                        .filter(|(key, _)| *key != TYPE_KEY && *key != ID_KEY)
                        .map(|(key, node)| (key.clone(), node))
                        .collect(),
                };
                for (key, node) in fields {
                    path.push_key(&key);
                    let value = self.resolve(node, live, path)?;
                    path.pop();
                    obj.borrow_mut().set(key, value);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Declared, serializable properties present in `map`
    fn restorable<'n>(
        &self,
        class: ClassId,
        map: &'n Map<String, JsonValue>,
    ) -> Vec<(String, &'n JsonValue)> {
        self.registry
            .properties(class)
            .iter()
            .filter(|p| is_restorable(self.registry, class, p))
            .filter_map(|p| map.get(p.as_str()).map(|node| (p.clone(), node)))
            .collect()
    }

    /// Turn a node into a live value, following references
    fn resolve(&self, node: &JsonValue, live: &[Value], path: &mut NodePath) -> Result<Value, DeserializeError> {
        match node {
            JsonValue::Object(map) => {
                if let Some(id) = reference_id(map) {
                    return id
                        .as_u64()
                        .and_then(|n| live.get(n as usize))
                        .cloned()
                        .ok_or_else(|| DeserializeError::InvalidReference {
                            id: id.to_string(),
                            path: path.clone(),
                        });
                }
                let value = self.instantiate(node, path)?;
                self.fill(&value, node, live, path)?;
                Ok(value)
            }
            JsonValue::Array(_) => {
                let value = Value::array(Vec::new());
                self.fill(&value, node, live, path)?;
                Ok(value)
            }
            primitive => Ok(from_primitive(primitive)),
        }
    }
}

fn from_primitive(node: &JsonValue) -> Value {
    match node {
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => Value::Number(n.clone()),
        JsonValue::String(s) => Value::String(s.clone()),
        _ => Value::Null,
    }
}
