//! Declarative class building: `prop`, `get`, `set`, `getset`

use std::rc::Rc;

use tracing::warn;

use super::attribute::{Attribute, AttributeRecord, OnApplied};
use super::{defaults, validate_property_name};
use super::{ClassError, ClassId, ClassRegistry, Object, Value};

/// Chainable declaration handle for one class.
///
/// ```
/// use classkit::objects::{Attribute, ClassRegistry};
///
/// let mut registry = ClassRegistry::new();
/// let sprite = registry
///     .define("Sprite", None)?
///     .prop("trimThreshold", 2, &[Attribute::editor_only()])?
///     .prop("_isValid", true, &[Attribute::non_serialized()])?
///     .id();
///
/// assert_eq!(registry.properties(sprite), ["trimThreshold", "_isValid"]);
/// # Ok::<(), classkit::objects::ClassError>(())
/// ```
#[derive(Debug)]
pub struct ClassBuilder<'r> {
    registry: &'r mut ClassRegistry,
    class: ClassId,
}

impl<'r> ClassBuilder<'r> {
    pub(super) fn new(registry: &'r mut ClassRegistry, class: ClassId) -> Self {
        Self { registry, class }
    }

    /// The class being declared
    pub fn id(&self) -> ClassId {
        self.class
    }

    /// Set the constructor body, replacing any previous one
    pub fn constructor(
        &mut self,
        f: impl Fn(&ClassRegistry, &mut Object, &[Value]) + 'static,
    ) -> &mut Self {
        self.registry.def_mut(self.class).constructor = Some(Rc::new(f));
        self
    }

    /// Give instances a clone hook so they may serve as property defaults.
    ///
    /// The hook is responsible for copying nested reference fields.
    pub fn with_clone(&mut self, f: impl Fn(&Object) -> Object + 'static) -> &mut Self {
        self.registry.def_mut(self.class).clone_fn = Some(Rc::new(f));
        self
    }

    /// Declare a serialized, inspectable field.
    ///
    /// Re-declaring an existing property updates its default and attributes
    /// without duplicating it in the property list.
    pub fn prop(
        &mut self,
        name: &str,
        default: impl Into<Value>,
        attrs: &[Attribute],
    ) -> Result<&mut Self, ClassError> {
        let default = default.into();
        validate_property_name(name)?;
        // Attributes are applied after the positional default, so the last one wins
        let effective = attrs
            .iter()
            .rev()
            .find_map(|a| a.record().default.as_ref())
            .unwrap_or(&default);
        defaults::check_default(&*self.registry, self.class, name, effective)?;

        for ancestor in self.registry.chain(self.class).into_iter().skip(1) {
            if self.registry.def(ancestor).accessors.contains_key(name) {
                return Err(ClassError::ShadowsAccessor {
                    class: self.class_name(),
                    name: name.to_string(),
                    ancestor: self.registry.display_name(ancestor).to_string(),
                });
            }
        }

        self.registry.set_attribute(
            self.class,
            name,
            &AttributeRecord {
                default: Some(default),
                ..Default::default()
            },
        );
        self.append_property(name);
        let callbacks = self.apply_attributes(name, attrs);
        self.run_callbacks(name, callbacks);
        Ok(self)
    }

    /// Declare a computed property. Getters are never serialized.
    pub fn get(
        &mut self,
        name: &str,
        getter: impl Fn(&Object) -> Value + 'static,
        attrs: &[Attribute],
    ) -> Result<&mut Self, ClassError> {
        validate_property_name(name)?;
        self.check_getter_free(name)?;
        let visible = self.check_getter_attributes(name, attrs)?;
        self.define_getter(name, Rc::new(getter), attrs, visible);
        Ok(self)
    }

    /// Declare a property setter. A setter alone does not list the property.
    pub fn set(
        &mut self,
        name: &str,
        setter: impl Fn(&mut Object, Value) + 'static,
    ) -> Result<&mut Self, ClassError> {
        validate_property_name(name)?;
        self.check_setter_free(name)?;
        self.define_setter(name, Rc::new(setter));
        Ok(self)
    }

    /// Declare a getter and a setter together
    pub fn getset(
        &mut self,
        name: &str,
        getter: impl Fn(&Object) -> Value + 'static,
        setter: impl Fn(&mut Object, Value) + 'static,
        attrs: &[Attribute],
    ) -> Result<&mut Self, ClassError> {
        validate_property_name(name)?;
        self.check_getter_free(name)?;
        self.check_setter_free(name)?;
        let visible = self.check_getter_attributes(name, attrs)?;
        self.define_getter(name, Rc::new(getter), attrs, visible);
        self.define_setter(name, Rc::new(setter));
        Ok(self)
    }

    fn class_name(&self) -> String {
        self.registry.display_name(self.class).to_string()
    }

    fn append_property(&mut self, name: &str) {
        let properties = &mut self.registry.def_mut(self.class).properties;
        if !properties.iter().any(|p| p == name) {
            properties.push(name.to_string());
        }
    }

    fn apply_attributes(&mut self, name: &str, attrs: &[Attribute]) -> Vec<OnApplied> {
        let mut callbacks = Vec::new();
        for attr in attrs {
            self.registry.set_attribute(self.class, name, attr.record());
            if let Some(cb) = attr.callback() {
                callbacks.push(cb.clone());
            }
        }
        callbacks
    }

    fn run_callbacks(&mut self, name: &str, callbacks: Vec<OnApplied>) {
        for cb in callbacks {
            cb(&mut *self.registry, self.class, name);
        }
    }

    fn check_getter_free(&self, name: &str) -> Result<(), ClassError> {
        let taken = self
            .registry
            .def(self.class)
            .accessor(name)
            .is_some_and(|a| a.getter.is_some());
        if taken {
            return Err(ClassError::GetterRedefined {
                class: self.class_name(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn check_setter_free(&self, name: &str) -> Result<(), ClassError> {
        let taken = self
            .registry
            .def(self.class)
            .accessor(name)
            .is_some_and(|a| a.setter.is_some());
        if taken {
            return Err(ClassError::SetterRedefined {
                class: self.class_name(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    /// Validate getter attributes; returns whether the getter is listed
    fn check_getter_attributes(&self, name: &str, attrs: &[Attribute]) -> Result<bool, ClassError> {
        let mut visible = true;
        for attr in attrs {
            let record = attr.record();
            if record.default.is_some() {
                return Err(ClassError::GetterDefault {
                    class: self.class_name(),
                    name: name.to_string(),
                });
            }
            if record.is_hidden() {
                visible = false;
            }
        }

        if !visible && self.registry.properties(self.class).iter().any(|p| p == name) {
            return Err(ClassError::AlreadyDefined {
                class: self.class_name(),
                name: name.to_string(),
            });
        }

        for attr in attrs {
            let record = attr.record();
            if !record.is_serializable() || record.is_editor_only() {
                warn!(
                    class = %self.class_name(),
                    property = name,
                    "non-serialized and editor-only attributes are redundant on a getter"
                );
            }
        }
        Ok(visible)
    }

    fn define_getter(&mut self, name: &str, getter: super::Getter, attrs: &[Attribute], visible: bool) {
        let callbacks = self.apply_attributes(name, attrs);
        self.registry.set_attribute(
            self.class,
            name,
            &AttributeRecord {
                serializable: Some(false),
                has_getter: Some(true),
                ..Default::default()
            },
        );
        if visible {
            self.append_property(name);
        }
        self.registry
            .def_mut(self.class)
            .accessors
            .entry(name.to_string())
            .or_default()
            .getter = Some(getter);
        self.run_callbacks(name, callbacks);
    }

    fn define_setter(&mut self, name: &str, setter: super::Setter) {
        self.registry.set_attribute(
            self.class,
            name,
            &AttributeRecord {
                has_setter: Some(true),
                ..Default::default()
            },
        );
        self.registry
            .def_mut(self.class)
            .accessors
            .entry(name.to_string())
            .or_default()
            .setter = Some(setter);
    }
}
