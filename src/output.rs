//! Output bindings and the protocol data a decoder instance emits through them.

use std::any::Any;
use std::sync::Arc;

use crate::value::{Value, ValueKind};

/// Stable output-type ints from the public API.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum OutputType {
    Ann = 0,
    Passthrough = 1,
    Binary = 2,
    Logic = 3,
    Meta = 4,
}

/// The type descriptor and human name/description a `Meta` output binding carries
/// (spec.md §3: "META carries a type descriptor and human name/description"; confirmed
/// against `otd_pd_output.meta_type`/`meta_name`/`meta_descr` in
/// `original_source/include/opentracedecode/libopentracedecode.h`).
#[derive(Clone, Debug, PartialEq)]
pub struct MetaDescriptor {
    pub value_kind: ValueKind,
    pub name: String,
    pub description: String,
}

/// A binding a decoder instance registers (roughly `srd_pd_output_new` in the original):
/// a stable id, its output type, the protocol id under which successors recognize it, and
/// the instance that owns it.
#[derive(Clone, Debug)]
pub struct PdOutput {
    pub id: u64,
    pub output_type: OutputType,
    pub proto_id: String,
    pub owner_instance: u64,
    /// Set only for `Meta` bindings: the value's type descriptor plus a human name and
    /// description.
    pub meta: Option<MetaDescriptor>,
}

/// The payload carried by one `put()` call. The active variant must match the owning
/// `PdOutput`'s `output_type`.
#[derive(Clone)]
pub enum Payload {
    Annotation { class_index: usize, strings: Vec<String> },
    Binary { class_index: usize, data: Arc<[u8]> },
    Logic { group: usize, repeat_count: u32, packed_bits: Arc<[u8]> },
    Meta { value: Value },
    /// Opaque, producer-defined data forwarded verbatim to matching successors.
    Passthrough(Arc<dyn Any + Send + Sync>),
}

impl Payload {
    pub fn output_type(&self) -> OutputType {
        match self {
            Payload::Annotation { .. } => OutputType::Ann,
            Payload::Binary { .. } => OutputType::Binary,
            Payload::Logic { .. } => OutputType::Logic,
            Payload::Meta { .. } => OutputType::Meta,
            Payload::Passthrough(_) => OutputType::Passthrough,
        }
    }
}

/// One fully-assembled datum, as delivered to a frontend callback or a stacked successor.
#[derive(Clone)]
pub struct ProtocolDatum {
    pub start_sample: u64,
    pub end_sample: u64,
    pub output_id: u64,
    pub output_type: OutputType,
    pub proto_id: String,
    pub payload: Payload,
}
