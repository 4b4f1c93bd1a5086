//! Envelope format: node paths, reference nodes and structural validation

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::objects::{ClassId, ClassRegistry};

use super::DeserializeError;

/// Key carrying the registered class name of a typed record
pub const TYPE_KEY: &str = "__type__";

/// Key of a back-reference node pointing at an envelope index
pub const ID_KEY: &str = "__id__";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Index(usize),
    Key(String),
}

/// Location of a node, rendered like `$[0].sprite.size`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath(Vec<Segment>);

impl NodePath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_index(&mut self, index: usize) {
        self.0.push(Segment::Index(index));
    }

    pub fn push_key(&mut self, key: &str) {
        self.0.push(Segment::Key(key.to_string()));
    }

    pub fn pop(&mut self) {
        self.0.pop();
    }

    fn with_key(&self, key: &str) -> Self {
        let mut path = self.clone();
        path.push_key(key);
        path
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.0 {
            match segment {
                Segment::Index(i) => write!(f, "[{}]", i)?,
                Segment::Key(k) => write!(f, ".{}", k)?,
            }
        }
        Ok(())
    }
}

/// Build a `{"__id__": n}` node
pub(crate) fn reference_node(id: usize) -> JsonValue {
    let mut map = Map::new();
    map.insert(ID_KEY.to_string(), JsonValue::from(id));
    JsonValue::Object(map)
}

/// The id operand if `map` is a reference node.
///
/// Only a record whose sole key is `__id__` is a reference; an `__id__`
/// next to other keys is an annotation and ignored.
pub(crate) fn reference_id(map: &Map<String, JsonValue>) -> Option<&JsonValue> {
    if map.len() == 1 {
        map.get(ID_KEY)
    } else {
        None
    }
}

/// Whether a typed record's `key` is restored on load.
///
/// Only declared, serializable properties are; any other key is dropped.
pub(crate) fn is_restorable(registry: &ClassRegistry, class: ClassId, key: &str) -> bool {
    registry.properties(class).iter().any(|p| p == key)
        && registry
            .attribute(class, key)
            .map_or(true, |a| a.is_serializable())
}

/// Envelope entries; a bare non-array node is a one-entry envelope
pub(crate) fn entries(envelope: &JsonValue) -> Result<&[JsonValue], DeserializeError> {
    let nodes = match envelope {
        JsonValue::Array(nodes) => nodes.as_slice(),
        node => std::slice::from_ref(node),
    };
    if nodes.is_empty() {
        return Err(DeserializeError::EmptyEnvelope);
    }
    Ok(nodes)
}

/// Structural overview of an envelope
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvelopeSummary {
    /// Number of top-level entries (root plus shared objects)
    pub nodes: usize,
    /// Entries after the root, i.e. objects referenced more than once
    pub shared: usize,
    /// Number of `{"__id__": n}` nodes
    pub references: usize,
    /// Typed records per class name
    pub types: BTreeMap<String, usize>,
}

/// Validate an envelope's structure without resolving class names.
///
/// ```
/// use classkit::serialize::inspect;
/// use serde_json::json;
///
/// let envelope = json!([
///     { "__type__": "Holder", "a": { "__id__": 1 }, "b": { "__id__": 1 } },
///     [1, 2]
/// ]);
/// let summary = inspect(&envelope).unwrap();
/// assert_eq!(summary.shared, 1);
/// assert_eq!(summary.references, 2);
/// assert_eq!(summary.types["Holder"], 1);
///
/// assert!(inspect(&json!([{ "x": { "__id__": 5 } }])).is_err());
/// ```
pub fn inspect(envelope: &JsonValue) -> Result<EnvelopeSummary, DeserializeError> {
    validate(envelope, None)
}

/// Validate an envelope, also checking every type name against `registry`
pub(crate) fn validate(
    envelope: &JsonValue,
    registry: Option<&ClassRegistry>,
) -> Result<EnvelopeSummary, DeserializeError> {
    let nodes = entries(envelope)?;
    let mut validator = Validator {
        len: nodes.len(),
        registry,
        summary: EnvelopeSummary {
            nodes: nodes.len(),
            shared: nodes.len() - 1,
            ..Default::default()
        },
    };

    let mut path = NodePath::new();
    for (index, node) in nodes.iter().enumerate() {
        path.push_index(index);
        if let JsonValue::Object(map) = node {
            if reference_id(map).is_some() {
                return Err(DeserializeError::Malformed {
                    path,
                    reason: "an envelope entry cannot be a reference",
                });
            }
        }
        validator.node(node, &mut path)?;
        path.pop();
    }

    Ok(validator.summary)
}

struct Validator<'r> {
    len: usize,
    registry: Option<&'r ClassRegistry>,
    summary: EnvelopeSummary,
}

impl Validator<'_> {
    fn node(&mut self, node: &JsonValue, path: &mut NodePath) -> Result<(), DeserializeError> {
        match node {
            JsonValue::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    path.push_index(i);
                    self.node(item, path)?;
                    path.pop();
                }
            }
            JsonValue::Object(map) => {
                if let Some(id) = reference_id(map) {
                    return self.reference(id, path);
                }
                let class = match map.get(TYPE_KEY) {
                    Some(type_name) => self.type_name(type_name, path)?,
                    None => None,
                };
                for (key, value) in map {
                    if key == TYPE_KEY || key == ID_KEY {
                        continue;
                    }
                    // Dropped on load, so never checked
                    if let (Some(registry), Some(class)) = (self.registry, class) {
                        if !is_restorable(registry, class, key) {
                            continue;
                        }
                    }
                    path.push_key(key);
                    self.node(value, path)?;
                    path.pop();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn reference(&mut self, id: &JsonValue, path: &NodePath) -> Result<(), DeserializeError> {
        match id.as_u64() {
            Some(n) if (n as usize) < self.len => {
                self.summary.references += 1;
                Ok(())
            }
            _ => Err(DeserializeError::InvalidReference {
                id: id.to_string(),
                path: path.clone(),
            }),
        }
    }

    /// Check a `__type__` operand; the class is resolved when a registry is given
    fn type_name(
        &mut self,
        type_name: &JsonValue,
        path: &NodePath,
    ) -> Result<Option<ClassId>, DeserializeError> {
        let Some(name) = type_name.as_str() else {
            return Err(DeserializeError::Malformed {
                path: path.with_key(TYPE_KEY),
                reason: "__type__ must be a string",
            });
        };
        let class = match self.registry {
            Some(registry) => match registry.class_by_name(name) {
                Some(class) => Some(class),
                None => {
                    return Err(DeserializeError::UnknownType {
                        type_name: name.to_string(),
                        path: path.clone(),
                    })
                }
            },
            None => None,
        };
        *self.summary.types.entry(name.to_string()).or_default() += 1;
        Ok(class)
    }
}
