//! Class-level decoder metadata: immutable once loaded, shared by reference across every
//! instance created from it.

use crate::value::Value;

/// One declared channel (required or optional).
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelDef {
    pub id: String,
    pub name: String,
    pub desc: String,
    pub order: i32,
}

impl ChannelDef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, desc: impl Into<String>, order: i32) -> Self {
        Self { id: id.into(), name: name.into(), desc: desc.into(), order }
    }
}

/// One entry in a decoder's option schema.
#[derive(Clone, Debug, PartialEq)]
pub struct OptionDef {
    pub id: String,
    pub default: Value,
    /// `Some` restricts `option_set` to one of these values; `None` accepts any value of
    /// the default's kind.
    pub allowed: Option<Vec<Value>>,
}

impl OptionDef {
    pub fn new(id: impl Into<String>, default: Value) -> Self {
        Self { id: id.into(), default, allowed: None }
    }

    pub fn with_allowed(mut self, allowed: Vec<Value>) -> Self {
        self.allowed = Some(allowed);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationClass {
    pub id: String,
    pub desc: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AnnotationRow {
    pub id: String,
    pub desc: String,
    /// Indices into the owning decoder's `annotations`.
    pub classes: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BinaryClass {
    pub id: String,
    pub desc: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogicOutputChannel {
    pub id: String,
    pub name: String,
    pub desc: String,
}

/// Class-level decoder metadata, equivalent to what the scripting runtime would read off a
/// decoder module's attributes (spec.md §6's "Decoder metadata interface"). Immutable after
/// construction; instances hold an `Arc<Decoder>` back-reference.
#[derive(Clone, Debug, PartialEq)]
pub struct Decoder {
    pub id: String,
    pub name: String,
    pub longname: String,
    pub desc: String,
    pub license: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub tags: Vec<String>,
    pub channels: Vec<ChannelDef>,
    pub optional_channels: Vec<ChannelDef>,
    pub options: Vec<OptionDef>,
    pub annotations: Vec<AnnotationClass>,
    pub annotation_rows: Vec<AnnotationRow>,
    pub binary: Vec<BinaryClass>,
    pub logic_output_channels: Vec<LogicOutputChannel>,
    pub api_version: u32,
}

impl Decoder {
    /// Total number of declared channels (required + optional), the size a decoder
    /// instance's channel map and previous-pins snapshot must have.
    pub fn total_channels(&self) -> usize {
        self.channels.len() + self.optional_channels.len()
    }

    /// Looks up a declared channel's index in the combined required+optional channel list
    /// by its short id (e.g. `"scl"`), the form decoder scripts use to name channels.
    pub fn channel_index(&self, id: &str) -> Option<usize> {
        self.channels
            .iter()
            .chain(self.optional_channels.iter())
            .position(|c| c.id == id)
    }

    pub fn option(&self, id: &str) -> Option<&OptionDef> {
        self.options.iter().find(|o| o.id == id)
    }
}
