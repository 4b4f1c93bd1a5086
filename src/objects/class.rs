//! Class system with inheritance

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

use super::attribute::{AttributeRecord, AttributeStore};
use super::defaults;
use super::{ClassBuilder, Object, ObjectRef, Value};

/// Name reported for classes and records that have no registered name
pub const ANONYMOUS: &str = "anonymous";

/// Instance constructor body, run after defaults are applied
pub type Constructor = Rc<dyn Fn(&ClassRegistry, &mut Object, &[Value])>;
/// Computed property getter
pub type Getter = Rc<dyn Fn(&Object) -> Value>;
/// Computed property setter
pub type Setter = Rc<dyn Fn(&mut Object, Value)>;
/// Produces an independent copy of an instance, used for default values
pub type CloneFn = Rc<dyn Fn(&Object) -> Object>;

/// Stable handle to a class inside its [`ClassRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(usize);

impl ClassId {
    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Declaration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassError {
    #[error("a class already exists with the name \"{0}\"")]
    NameCollision(String),

    #[error("property name \"{0}\" is not a valid identifier")]
    InvalidPropertyName(String),

    #[error("property name \"{0}\" is reserved by the serialized format")]
    ReservedPropertyName(String),

    #[error("cannot declare {class}.{name}: it is already defined as an accessor of {ancestor}")]
    ShadowsAccessor {
        class: String,
        name: String,
        ancestor: String,
    },

    #[error("{class}: the getter of \"{name}\" is already defined")]
    GetterRedefined { class: String, name: String },

    #[error("{class}: the setter of \"{name}\" is already defined")]
    SetterRedefined { class: String, name: String },

    #[error("{class}: cannot set the default value of getter \"{name}\"")]
    GetterDefault { class: String, name: String },

    #[error("{class}.{name} is already defined")]
    AlreadyDefined { class: String, name: String },

    #[error("default array of {class}.{name} must be empty; fill it in the constructor instead")]
    NonEmptyArrayDefault { class: String, name: String },

    #[error("default value of {class}.{name} must be empty unless its class defines clone")]
    NonCloneableDefault { class: String, name: String },
}

/// Getter and/or setter declared for one property name
#[derive(Clone, Default)]
pub struct Accessor {
    pub getter: Option<Getter>,
    pub setter: Option<Setter>,
}

/// A class definition: name, parent link, declared properties and hooks
pub struct ClassDef {
    pub(super) name: String,
    pub(super) parent: Option<ClassId>,
    pub(super) properties: Vec<String>,
    pub(super) constructor: Option<Constructor>,
    pub(super) accessors: HashMap<String, Accessor>,
    pub(super) clone_fn: Option<CloneFn>,
}

impl ClassDef {
    fn new(name: &str, parent: Option<ClassId>, properties: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            properties,
            constructor: None,
            accessors: HashMap::new(),
            clone_fn: None,
        }
    }

    /// Stamped class name, empty for anonymous classes
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<ClassId> {
        self.parent
    }

    /// Declared property names, inherited ones first
    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    pub fn has_constructor(&self) -> bool {
        self.constructor.is_some()
    }

    /// Accessor declared directly on this class
    pub fn accessor(&self, name: &str) -> Option<&Accessor> {
        self.accessors.get(name)
    }

    pub fn is_cloneable(&self) -> bool {
        self.clone_fn.is_some()
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("properties", &self.properties)
            .field("accessors", &self.accessors.keys().collect::<Vec<_>>())
            .field("constructor", &self.constructor.is_some())
            .field("cloneable", &self.clone_fn.is_some())
            .finish()
    }
}

/// Registry of all class definitions.
///
/// Owns the descriptors, the name binding table and the attribute store.
/// Class ids are only minted here, so indexing by a `ClassId` from this
/// registry always succeeds.
///
/// # Panics
///
/// Methods taking a `ClassId`, and `instantiate`/`get_property` on values
/// built elsewhere, panic when the id was minted by a different registry.
/// Use [`ClassRegistry::get`] to check an id of unknown origin.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: Vec<ClassDef>,
    by_name: HashMap<String, ClassId>,
    attributes: AttributeStore,
}

impl ClassRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new class, optionally inheriting from `base`.
    ///
    /// The subclass starts with a copy of the base's property list. Without a
    /// constructor of its own, instances run the nearest ancestor's.
    pub fn define(&mut self, name: &str, base: Option<ClassId>) -> Result<ClassBuilder<'_>, ClassError> {
        let class = self.insert_class(name, base)?;
        Ok(ClassBuilder::new(self, class))
    }

    /// Define a new class with a constructor body
    pub fn define_with(
        &mut self,
        name: &str,
        base: Option<ClassId>,
        constructor: impl Fn(&ClassRegistry, &mut Object, &[Value]) + 'static,
    ) -> Result<ClassBuilder<'_>, ClassError> {
        let class = self.insert_class(name, base)?;
        self.classes[class.0].constructor = Some(Rc::new(constructor));
        Ok(ClassBuilder::new(self, class))
    }

    /// Define a class with a fixed field layout and no defaults.
    ///
    /// Every listed field is persisted but hidden from the inspector; the
    /// constructor is responsible for assigning them.
    pub fn define_fixed(
        &mut self,
        name: &str,
        fields: &[&str],
        constructor: impl Fn(&ClassRegistry, &mut Object, &[Value]) + 'static,
    ) -> Result<ClassId, ClassError> {
        for field in fields {
            super::validate_property_name(field)?;
        }
        let class = self.insert_class(name, None)?;
        let def = &mut self.classes[class.0];
        def.constructor = Some(Rc::new(constructor));
        for field in fields {
            if !def.properties.iter().any(|p| p == field) {
                def.properties.push(field.to_string());
            }
        }
        let hidden = AttributeRecord {
            hide_in_inspector: Some(true),
            ..Default::default()
        };
        for field in fields {
            self.attributes.merge(class, field, &hidden);
        }
        Ok(class)
    }

    /// Reopen an existing class for further declarations
    pub fn declare(&mut self, class: ClassId) -> ClassBuilder<'_> {
        ClassBuilder::new(self, class)
    }

    fn insert_class(&mut self, name: &str, base: Option<ClassId>) -> Result<ClassId, ClassError> {
        if !name.is_empty() && self.by_name.contains_key(name) {
            return Err(ClassError::NameCollision(name.to_string()));
        }

        let properties = base
            .map(|b| self.classes[b.0].properties.clone())
            .unwrap_or_default();
        let class = ClassId(self.classes.len());
        self.classes.push(ClassDef::new(name, base, properties));
        if !name.is_empty() {
            self.by_name.insert(name.to_string(), class);
        }

        debug!(class = name, id = class.0, base = ?base.map(|b| b.0), "defined class");
        Ok(class)
    }

    /// Bind `name` to `class` and stamp the class with it.
    ///
    /// Fails if the name is already bound to a different class; the existing
    /// binding is kept. Otherwise any previous binding of `class` is released.
    /// An empty name only clears the stamp.
    pub fn register_class(&mut self, name: &str, class: ClassId) -> Result<(), ClassError> {
        if let Some(&existing) = self.by_name.get(name) {
            if existing != class {
                return Err(ClassError::NameCollision(name.to_string()));
            }
        }
        self.unregister_class(class);
        self.classes[class.0].name = name.to_string();
        if !name.is_empty() {
            self.by_name.insert(name.to_string(), class);
        }
        debug!(class = name, id = class.0, "registered class");
        Ok(())
    }

    /// Remove the name binding of `class`.
    ///
    /// Existing instances keep working and keep their stamped name.
    pub fn unregister_class(&mut self, class: ClassId) {
        let name = &self.classes[class.0].name;
        if self.by_name.get(name) == Some(&class) {
            self.by_name.remove(name);
            debug!(class = %name, id = class.0, "unregistered class");
        }
    }

    /// Unregister any number of classes
    pub fn undefine(&mut self, classes: &[ClassId]) {
        for class in classes {
            self.unregister_class(*class);
        }
    }

    /// Look up a class by registered name
    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// Get a class definition
    pub fn get(&self, class: ClassId) -> Option<&ClassDef> {
        self.classes.get(class.0)
    }

    pub(super) fn def(&self, class: ClassId) -> &ClassDef {
        &self.classes[class.0]
    }

    pub(super) fn def_mut(&mut self, class: ClassId) -> &mut ClassDef {
        &mut self.classes[class.0]
    }

    /// Stamped name of a class, empty for anonymous classes
    pub fn class_name(&self, class: ClassId) -> &str {
        &self.classes[class.0].name
    }

    /// Class name for messages, [`ANONYMOUS`] when unnamed
    pub fn display_name(&self, class: ClassId) -> &str {
        match self.class_name(class) {
            "" => ANONYMOUS,
            name => name,
        }
    }

    /// Best-effort type name of a live value
    pub fn class_name_of(&self, value: &Value) -> String {
        match value {
            Value::Object(obj) => match obj.borrow().class() {
                Some(class) => self.display_name(class).to_string(),
                None => ANONYMOUS.to_string(),
            },
            Value::Array(_) => "array".to_string(),
            Value::String(_) => "string".to_string(),
            Value::Number(_) => "number".to_string(),
            Value::Bool(_) => "boolean".to_string(),
            Value::Null => "null".to_string(),
        }
    }

    /// Number of classes ever defined, including unregistered ones
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Get the inheritance chain for a class (child -> ... -> root)
    pub fn chain(&self, class: ClassId) -> Vec<ClassId> {
        let mut chain = vec![class];
        let mut current = self.classes[class.0].parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.classes[parent.0].parent;
        }
        chain
    }

    /// Check if `sub` is `sup` or one of its descendants
    pub fn is_child_class_of(&self, sub: ClassId, sup: ClassId) -> bool {
        self.chain(sub).contains(&sup)
    }

    /// Declared properties of a class, inherited ones included
    pub fn properties(&self, class: ClassId) -> &[String] {
        &self.classes[class.0].properties
    }

    /// Declared properties that the inspector should list
    pub fn inspector_properties(&self, class: ClassId) -> Vec<&str> {
        self.properties(class)
            .iter()
            .filter(|p| !self.attribute(class, p).is_some_and(|a| a.is_hidden()))
            .map(String::as_str)
            .collect()
    }

    /// Resolved metadata of a property, falling back along the class chain
    pub fn attribute(&self, class: ClassId, property: &str) -> Option<AttributeRecord> {
        self.attributes.resolve(&self.chain(class), property)
    }

    /// Metadata record owned by `class` itself
    pub fn own_attribute(&self, class: ClassId, property: &str) -> Option<&AttributeRecord> {
        self.attributes.own(class, property)
    }

    /// Merge metadata into the record owned by `class`.
    ///
    /// Ancestors are never written; the class's own record shadows them key
    /// by key from now on.
    pub fn set_attribute(&mut self, class: ClassId, property: &str, attrs: &AttributeRecord) -> &AttributeRecord {
        self.attributes.merge(class, property, attrs)
    }

    /// Construct an instance: apply per-property defaults, then run the
    /// nearest constructor on the chain with `args`.
    pub fn instantiate(&self, class: ClassId, args: &[Value]) -> ObjectRef {
        let mut obj = Object::with_class(class);
        defaults::init_defaults(self, class, &mut obj);

        let constructor = self
            .chain(class)
            .into_iter()
            .find_map(|c| self.classes[c.0].constructor.clone());
        if let Some(constructor) = constructor {
            constructor(self, &mut obj, args);
        }

        obj.into_ref()
    }

    /// Nearest accessor for `name` on the class chain
    pub fn accessor(&self, class: ClassId, name: &str) -> Option<&Accessor> {
        self.chain(class)
            .into_iter()
            .find_map(|c| self.classes[c.0].accessors.get(name))
    }

    /// Read a property, going through a getter when one is declared
    pub fn get_property(&self, obj: &ObjectRef, name: &str) -> Option<Value> {
        let class = obj.borrow().class();
        let getter = class
            .and_then(|c| self.accessor(c, name))
            .and_then(|a| a.getter.clone());
        match getter {
            Some(getter) => Some(getter(&obj.borrow())),
            None => obj.borrow().get(name).cloned(),
        }
    }

    /// Write a property, going through a setter when one is declared
    pub fn set_property(&self, obj: &ObjectRef, name: &str, value: impl Into<Value>) {
        let class = obj.borrow().class();
        let setter = class
            .and_then(|c| self.accessor(c, name))
            .and_then(|a| a.setter.clone());
        match setter {
            Some(setter) => setter(&mut obj.borrow_mut(), value.into()),
            None => obj.borrow_mut().set(name, value),
        }
    }
}
