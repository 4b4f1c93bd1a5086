//! Object system - registered classes, property metadata and live instances

mod attribute;
mod class;
mod defaults;
mod define;
mod name;
mod object;

pub use attribute::{Attribute, AttributeRecord, AttributeStore, OnApplied};
pub use class::{
    Accessor, ClassDef, ClassError, ClassId, ClassRegistry, CloneFn, Constructor, Getter, Setter,
    ANONYMOUS,
};
pub use define::ClassBuilder;
pub use name::validate_property_name;
pub use object::{ArrayRef, Fields, Object, ObjectRef, Value};
