//! A tagged value type standing in for the bit-packed GVariant-style config values the
//! original implementation uses for decoder options and session metadata.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The dynamically-typed value kinds `option_set`/`metadata_set` accept.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    U64(u64),
    I64(i64),
    F64(f64),
    String(String),
}

/// The kind of a [`Value`], used to validate incoming values against a schema without
/// comparing the values themselves.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueKind {
    U64,
    I64,
    F64,
    String,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::U64(_) => ValueKind::U64,
            Value::I64(_) => ValueKind::I64,
            Value::F64(_) => ValueKind::F64,
            Value::String(_) => ValueKind::String,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }
}
