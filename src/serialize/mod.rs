//! Graph-aware serialization of live objects
//!
//! An envelope is a JSON array. Entry 0 is the root; every object reached
//! more than once is written exactly once at its own entry and every
//! occurrence, including self-references, becomes `{"__id__": n}`.
//! Typed records carry their registered class name under `__type__`.

mod decode;
mod encode;
mod envelope;

use thiserror::Error;

pub use decode::{deserialize, deserialize_str};
pub use encode::{serialize, serialize_to_string};
pub use envelope::{inspect, EnvelopeSummary, NodePath, ID_KEY, TYPE_KEY};

/// Errors raised while producing an envelope
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("cannot serialize an instance of an anonymous class at {path}")]
    AnonymousClass { path: NodePath },

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while rebuilding a graph from an envelope
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("envelope is empty")]
    EmptyEnvelope,

    #[error("unknown type \"{type_name}\" at {path}")]
    UnknownType { type_name: String, path: NodePath },

    #[error("invalid reference {id} at {path}")]
    InvalidReference { id: String, path: NodePath },

    #[error("malformed node at {path}: {reason}")]
    Malformed { path: NodePath, reason: &'static str },
}
