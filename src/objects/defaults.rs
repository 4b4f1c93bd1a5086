//! Per-instance default values
//!
//! A property default is a template. Primitives are copied by value; reference
//! defaults are re-created for every instance so no two instances ever share
//! one mutable default.

use super::{ClassError, ClassId, ClassRegistry, Object, Value};

/// Check that `value` is acceptable as the default of `class.name`.
///
/// Allowed: primitives, empty arrays, empty plain records, and instances of a
/// class that defines its own clone hook.
pub(super) fn check_default(
    registry: &ClassRegistry,
    class: ClassId,
    name: &str,
    value: &Value,
) -> Result<(), ClassError> {
    let violation = match value {
        Value::Array(items) => {
            if items.borrow().is_empty() {
                return Ok(());
            }
            ClassError::NonEmptyArrayDefault {
                class: registry.display_name(class).to_string(),
                name: name.to_string(),
            }
        }
        Value::Object(obj) => {
            let obj = obj.borrow();
            let acceptable = match obj.class() {
                Some(of) => registry.def(of).is_cloneable(),
                None => obj.is_empty(),
            };
            if acceptable {
                return Ok(());
            }
            ClassError::NonCloneableDefault {
                class: registry.display_name(class).to_string(),
                name: name.to_string(),
            }
        }
        _ => return Ok(()),
    };
    Err(violation)
}

/// Produce the value an instance receives for a default template
pub(super) fn fresh_default(registry: &ClassRegistry, template: &Value) -> Value {
    match template {
        Value::Array(_) => Value::array(Vec::new()),
        Value::Object(obj) => {
            let obj = obj.borrow();
            let clone_fn = obj.class().and_then(|c| registry.def(c).clone_fn.clone());
            match clone_fn {
                Some(clone_fn) => Value::Object(clone_fn(&obj).into_ref()),
                None => Value::Object(Object::record().into_ref()),
            }
        }
        primitive => primitive.clone(),
    }
}

/// Assign a fresh default to every declared property that has one.
///
/// Getter-backed properties have no stored value and are skipped.
pub(super) fn init_defaults(registry: &ClassRegistry, class: ClassId, obj: &mut Object) {
    for property in registry.properties(class) {
        let Some(attrs) = registry.attribute(class, property) else {
            continue;
        };
        if attrs.is_getter() {
            continue;
        }
        if let Some(template) = &attrs.default {
            obj.set(property.clone(), fresh_default(registry, template));
        }
    }
}
