//! Per-property metadata attached to classes

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::{ClassId, ClassRegistry, Value};

/// Callback run once after every attribute of a declaration has been applied
pub type OnApplied = Rc<dyn Fn(&mut ClassRegistry, ClassId, &str)>;

/// Stored metadata for one property of one class.
///
/// Unset fields (`None`) fall back to the nearest ancestor that sets them.
#[derive(Clone, Debug, Default)]
pub struct AttributeRecord {
    /// Template for the per-instance initial value
    pub default: Option<Value>,
    /// `Some(false)` keeps the property out of every envelope
    pub serializable: Option<bool>,
    /// Persisted only when editor data is not being stripped
    pub editor_only: Option<bool>,
    /// Excluded from the inspector property list
    pub hide_in_inspector: Option<bool>,
    pub has_getter: Option<bool>,
    pub has_setter: Option<bool>,
}

impl AttributeRecord {
    /// Overwrite every key that `other` sets
    pub fn merge(&mut self, other: &AttributeRecord) {
        if let Some(v) = &other.default {
            self.default = Some(v.clone());
        }
        if other.serializable.is_some() {
            self.serializable = other.serializable;
        }
        if other.editor_only.is_some() {
            self.editor_only = other.editor_only;
        }
        if other.hide_in_inspector.is_some() {
            self.hide_in_inspector = other.hide_in_inspector;
        }
        if other.has_getter.is_some() {
            self.has_getter = other.has_getter;
        }
        if other.has_setter.is_some() {
            self.has_setter = other.has_setter;
        }
    }

    pub fn is_serializable(&self) -> bool {
        self.serializable != Some(false)
    }

    pub fn is_editor_only(&self) -> bool {
        self.editor_only == Some(true)
    }

    pub fn is_hidden(&self) -> bool {
        self.hide_in_inspector == Some(true)
    }

    pub fn is_getter(&self) -> bool {
        self.has_getter == Some(true)
    }
}

/// An attribute declaration passed to `prop`/`get`.
///
/// ```
/// use classkit::objects::Attribute;
///
/// let attr = Attribute::editor_only();
/// assert!(attr.record().is_editor_only());
/// assert!(Attribute::non_serialized().record().serializable == Some(false));
/// ```
#[derive(Clone, Default)]
pub struct Attribute {
    record: AttributeRecord,
    on_applied: Option<OnApplied>,
}

impl Attribute {
    pub fn new(record: AttributeRecord) -> Self {
        Self {
            record,
            on_applied: None,
        }
    }

    /// Never persisted
    pub fn non_serialized() -> Self {
        Self::new(AttributeRecord {
            serializable: Some(false),
            ..Default::default()
        })
    }

    /// Persisted only when not stripping editor data
    pub fn editor_only() -> Self {
        Self::new(AttributeRecord {
            editor_only: Some(true),
            ..Default::default()
        })
    }

    /// Persisted, but not listed for the inspector
    pub fn hide_in_inspector() -> Self {
        Self::new(AttributeRecord {
            hide_in_inspector: Some(true),
            ..Default::default()
        })
    }

    /// Override the default value
    pub fn default_value(value: impl Into<Value>) -> Self {
        Self::new(AttributeRecord {
            default: Some(value.into()),
            ..Default::default()
        })
    }

    /// Attach a callback invoked after the whole declaration is applied
    pub fn on_applied(mut self, f: impl Fn(&mut ClassRegistry, ClassId, &str) + 'static) -> Self {
        self.on_applied = Some(Rc::new(f));
        self
    }

    pub fn record(&self) -> &AttributeRecord {
        &self.record
    }

    pub(crate) fn callback(&self) -> Option<&OnApplied> {
        self.on_applied.as_ref()
    }
}

impl From<AttributeRecord> for Attribute {
    fn from(record: AttributeRecord) -> Self {
        Self::new(record)
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("record", &self.record)
            .field("on_applied", &self.on_applied.is_some())
            .finish()
    }
}

/// Side table of attribute records keyed by (class, property)
#[derive(Debug, Default)]
pub struct AttributeStore {
    records: HashMap<(ClassId, String), AttributeRecord>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record owned by `class` itself, ignoring ancestors
    pub fn own(&self, class: ClassId, property: &str) -> Option<&AttributeRecord> {
        self.records.get(&(class, property.to_string()))
    }

    /// Merge `attrs` into the record owned by `class`, creating it if absent
    pub fn merge(&mut self, class: ClassId, property: &str, attrs: &AttributeRecord) -> &AttributeRecord {
        let record = self
            .records
            .entry((class, property.to_string()))
            .or_default();
        record.merge(attrs);
        record
    }

    /// Resolve a property's metadata along an inheritance chain.
    ///
    /// `chain` runs from the class itself up to the root. Each key is taken
    /// from the nearest class that sets it; `None` if no class in the chain
    /// owns a record for the property.
    pub fn resolve(&self, chain: &[ClassId], property: &str) -> Option<AttributeRecord> {
        let mut found = false;
        let mut resolved = AttributeRecord::default();
        for class in chain.iter().rev() {
            if let Some(record) = self.own(*class, property) {
                resolved.merge(record);
                found = true;
            }
        }
        found.then_some(resolved)
    }
}
