//! Serializer: live graph -> envelope

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::config::SerializeConfig;
use crate::objects::{ClassId, ClassRegistry, Object, Value};

use super::envelope::{reference_node, NodePath, TYPE_KEY};
use super::SerializeError;

/// Serialize the graph reachable from `root` into an envelope.
///
/// With `strip_editor_only`, properties flagged editor-only are left out.
/// Properties flagged non-serialized are always left out.
pub fn serialize(
    registry: &ClassRegistry,
    root: &Value,
    strip_editor_only: bool,
) -> Result<JsonValue, SerializeError> {
    let encoder = Encoder {
        registry,
        strip_editor_only,
    };
    let plan = encoder.scan(root)?;
    let envelope: Vec<JsonValue> = plan
        .shared
        .iter()
        .map(|node| encoder.encode_body(node, &plan.ids))
        .collect();

    debug!(
        nodes = envelope.len(),
        strip_editor_only, "serialized object graph"
    );
    Ok(JsonValue::Array(envelope))
}

/// Serialize to JSON text using `config` for stripping and layout
pub fn serialize_to_string(
    registry: &ClassRegistry,
    root: &Value,
    config: &SerializeConfig,
) -> Result<String, SerializeError> {
    let envelope = serialize(registry, root, config.strip_editor_only)?;
    let text = if config.pretty {
        serde_json::to_string_pretty(&envelope)?
    } else {
        serde_json::to_string(&envelope)?
    };
    Ok(text)
}

/// Outcome of the reference-counting walk
struct Plan {
    visited: HashSet<usize>,
    /// Envelope index per node reached more than once
    ids: HashMap<usize, usize>,
    /// Envelope entries in order: root, then nodes by first revisit
    shared: Vec<Value>,
}

struct Encoder<'r> {
    registry: &'r ClassRegistry,
    strip_editor_only: bool,
}

impl Encoder<'_> {
    fn scan(&self, root: &Value) -> Result<Plan, SerializeError> {
        let mut plan = Plan {
            visited: HashSet::new(),
            ids: HashMap::new(),
            shared: vec![root.clone()],
        };
        let mut path = NodePath::new();
        self.visit(root, &mut plan, &mut path)?;
        Ok(plan)
    }

    /// Depth-first walk. A node is marked on first visit, so the walk never
    /// re-enters it; the id is assigned on the first revisit.
    fn visit(&self, value: &Value, plan: &mut Plan, path: &mut NodePath) -> Result<(), SerializeError> {
        let Some(key) = value.identity() else {
            return Ok(());
        };

        if !plan.visited.insert(key) {
            if !plan.ids.contains_key(&key) {
                let id = if value.ptr_eq(&plan.shared[0]) {
                    0
                } else {
                    plan.shared.push(value.clone());
                    plan.shared.len() - 1
                };
                plan.ids.insert(key, id);
            }
            return Ok(());
        }

        match value {
            Value::Array(items) => {
                let items = items.borrow().clone();
                for (i, item) in items.iter().enumerate() {
                    path.push_index(i);
                    self.visit(item, plan, path)?;
                    path.pop();
                }
            }
            Value::Object(obj) => {
                let fields = {
                    let obj = obj.borrow();
                    if let Some(class) = obj.class() {
                        if self.registry.class_name(class).is_empty() {
                            return Err(SerializeError::AnonymousClass { path: path.clone() });
                        }
                    }
                    self.persisted(&obj)
                };
                for (key, field) in &fields {
                    path.push_key(key);
                    self.visit(field, plan, path)?;
                    path.pop();
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Encode a value, emitting a reference when it is shared
    fn encode(&self, value: &Value, ids: &HashMap<usize, usize>) -> JsonValue {
        if let Some(id) = value.identity().and_then(|key| ids.get(&key)) {
            return reference_node(*id);
        }
        self.encode_body(value, ids)
    }

    /// Encode a node's own structure
    fn encode_body(&self, value: &Value, ids: &HashMap<usize, usize>) -> JsonValue {
        match value {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Number(n) => JsonValue::Number(n.clone()),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Array(items) => {
                JsonValue::Array(items.borrow().iter().map(|v| self.encode(v, ids)).collect())
            }
            Value::Object(obj) => {
                let obj = obj.borrow();
                let mut map = Map::new();
                if let Some(class) = obj.class() {
                    map.insert(
                        TYPE_KEY.to_string(),
                        JsonValue::String(self.registry.class_name(class).to_string()),
                    );
                }
                for (key, field) in self.persisted(&obj) {
                    map.insert(key, self.encode(&field, ids));
                }
                JsonValue::Object(map)
            }
        }
    }

    /// Fields of `obj` that go into the envelope.
    ///
    /// Plain records persist every field. Typed objects persist only declared
    /// properties that pass the attribute filter and hold a value.
    fn persisted(&self, obj: &Object) -> Vec<(String, Value)> {
        let Some(class) = obj.class() else {
            return obj
                .fields()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        };
        self.registry
            .properties(class)
            .iter()
            .filter(|p| self.is_persisted(class, p))
            .filter_map(|p| obj.get(p).map(|v| (p.clone(), v.clone())))
            .collect()
    }

    fn is_persisted(&self, class: ClassId, property: &str) -> bool {
        match self.registry.attribute(class, property) {
            Some(attrs) => {
                attrs.is_serializable() && !(self.strip_editor_only && attrs.is_editor_only())
            }
            None => true,
        }
    }
}
