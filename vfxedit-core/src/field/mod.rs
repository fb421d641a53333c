//! # Fields
//!
//! Scalar values stored one per chunk. Whether a field's chunk was present at all is tracked separately from its
//! value, so a document that omitted a field re-encodes without it instead of gaining a zero.

mod bool;
mod enums;
mod flags;
mod primitive;

pub use self::bool::NullableBool;
pub use enums::{Enumerated, ScalarEnum};
pub use flags::Flags;
pub use primitive::FixedString;

use crate::io::{self, ChunkID, ChunkReader, DecodeError, Sink, Source};

/// Presence of a field.
#[derive(Clone, PartialEq, Debug)]
pub enum FieldState<T> {
    /// The field's chunk is absent, and stays absent on encode.
    Unset,
    /// Present, holding the field's declared default.
    Default,
    /// Present with an explicit value.
    Value(T),
}
impl<T> FieldState<T> {
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        !matches!(self, Self::Unset)
    }
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> FieldState<U> {
        match self {
            Self::Unset => FieldState::Unset,
            Self::Default => FieldState::Default,
            Self::Value(v) => FieldState::Value(f(v)),
        }
    }
    pub fn as_ref(&self) -> FieldState<&T> {
        match self {
            Self::Unset => FieldState::Unset,
            Self::Default => FieldState::Default,
            Self::Value(v) => FieldState::Value(v),
        }
    }
}

/// A value type that can live in a field chunk.
pub trait Scalar: Clone + PartialEq + std::fmt::Debug + 'static {
    /// Decode from a payload of `size` bytes. Reading fewer bytes than `size` is fine, the rest is padding.
    fn decode(reader: &mut dyn std::io::Read, size: u32) -> std::io::Result<Self>;
    fn encode(&self, writer: &mut dyn std::io::Write) -> std::io::Result<()>;
    /// How many payload bytes `decode` needs at minimum.
    fn min_size() -> u32;
    fn to_value(&self) -> ScalarValue;
    fn from_value(value: &ScalarValue) -> Option<Self>;
}

/// A scalar with its type erased, for commands and copy/paste.
#[derive(Clone, Debug)]
pub enum ScalarValue {
    Bool(NullableBool),
    Int(i64),
    Float(f32),
    Text(FixedString),
    Enum(i32),
    Flags(u32),
}
impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            // Bitwise, so a NaN read from a file still matches itself.
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Enum(a), Self::Enum(b)) => a == b,
            (Self::Flags(a), Self::Flags(b)) => a == b,
            _ => false,
        }
    }
}
impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Enum(e) => write!(f, "enum {e}"),
            Self::Flags(bits) => write!(f, "{bits:#010x}"),
        }
    }
}

/// Before and after states of one field, type-erased.
#[derive(Clone, PartialEq, Debug)]
pub struct FieldChange {
    pub from: FieldState<ScalarValue>,
    pub to: FieldState<ScalarValue>,
}

/// A typed scalar bound to its chunk tag.
#[derive(Clone, PartialEq, Debug)]
pub struct Field<T: Scalar> {
    id: ChunkID,
    default: T,
    state: FieldState<T>,
}
impl<T: Scalar> Field<T> {
    /// A field whose chunk is absent.
    #[must_use]
    pub fn unset(id: &str, default: T) -> Self {
        Self {
            id: ChunkID::from_name(id),
            default,
            state: FieldState::Unset,
        }
    }
    /// A field present with its default value.
    #[must_use]
    pub fn new(id: &str, default: T) -> Self {
        Self {
            id: ChunkID::from_name(id),
            default,
            state: FieldState::Default,
        }
    }
    #[must_use]
    pub fn id(&self) -> ChunkID {
        self.id
    }
    #[must_use]
    pub fn state(&self) -> &FieldState<T> {
        &self.state
    }
    #[must_use]
    pub fn default_value(&self) -> &T {
        &self.default
    }
    /// The effective value, or None if unset.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        match &self.state {
            FieldState::Unset => None,
            FieldState::Default => Some(&self.default),
            FieldState::Value(v) => Some(v),
        }
    }
    /// The effective value, falling back to the default when unset.
    #[must_use]
    pub fn value_or_default(&self) -> &T {
        self.get().unwrap_or(&self.default)
    }
    pub fn set(&mut self, value: T) {
        self.state = FieldState::Value(value);
    }
    pub fn set_state(&mut self, state: FieldState<T>) {
        self.state = state;
    }
    /// Describe changing this field to `to`, or None if that changes nothing.
    #[must_use]
    pub fn change_to(&self, to: FieldState<T>) -> Option<FieldChange> {
        (self.state != to).then(|| FieldChange {
            from: self.state.as_ref().map(T::to_value),
            to: to.map(|v| v.to_value()),
        })
    }
    /// Read this field's value from a chunk whose tag has already been matched.
    pub fn decode<R: Source>(&mut self, chunk: &mut ChunkReader<R>) -> Result<(), DecodeError> {
        let have = chunk.remaining();
        let need = T::min_size();
        if have < need {
            return Err(DecodeError::FieldTooShort {
                id: self.id,
                offset: chunk.offset(),
                need,
                have,
            });
        }
        let value = T::decode(chunk, have)?;
        self.state = FieldState::Value(value);
        Ok(())
    }
    /// Write the whole chunk. Unset fields write nothing.
    pub fn encode(&self, writer: &mut dyn Sink) -> std::io::Result<()> {
        match self.get() {
            None => Ok(()),
            Some(value) => io::write_chunk(writer, self.id, |mut w| value.encode(&mut w)),
        }
    }
}
impl Field<NullableBool> {
    /// Null flags read as unassigned.
    #[must_use]
    pub fn get_bool(&self) -> Option<bool> {
        self.get().and_then(NullableBool::get)
    }
}

/// A field with its value type erased.
pub trait DynField {
    fn id(&self) -> ChunkID;
    fn is_assigned(&self) -> bool;
    fn decode(&mut self, chunk: &mut ChunkReader<&mut dyn Source>) -> Result<(), DecodeError>;
    fn encode(&self, writer: &mut dyn Sink) -> std::io::Result<()>;
    fn value_state(&self) -> FieldState<ScalarValue>;
    /// Returns false, leaving the field untouched, if the value has the wrong type.
    fn set_value_state(&mut self, state: &FieldState<ScalarValue>) -> bool;
}
impl<T: Scalar> DynField for Field<T> {
    fn id(&self) -> ChunkID {
        self.id
    }
    fn is_assigned(&self) -> bool {
        self.state.is_assigned()
    }
    fn decode(&mut self, chunk: &mut ChunkReader<&mut dyn Source>) -> Result<(), DecodeError> {
        Field::decode(self, chunk)
    }
    fn encode(&self, writer: &mut dyn Sink) -> std::io::Result<()> {
        Field::encode(self, writer)
    }
    fn value_state(&self) -> FieldState<ScalarValue> {
        self.state.as_ref().map(T::to_value)
    }
    fn set_value_state(&mut self, state: &FieldState<ScalarValue>) -> bool {
        let typed = match state {
            FieldState::Unset => FieldState::Unset,
            FieldState::Default => FieldState::Default,
            FieldState::Value(value) => match T::from_value(value) {
                Some(v) => FieldState::Value(v),
                None => return false,
            },
        };
        self.state = typed;
        true
    }
}

/// Feed `chunk` to whichever of `fields` has its tag. Returns false if none matched.
pub fn read_matching(
    fields: &mut [&mut dyn DynField],
    chunk: &mut ChunkReader<&mut dyn Source>,
) -> Result<bool, DecodeError> {
    match fields.iter_mut().find(|field| field.id() == chunk.id()) {
        Some(field) => {
            field.decode(chunk)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
/// Within `bounds` bytes, decode every chunk whose tag matches one of `fields`, in any order.
/// Chunks with no matching field are skipped. Fields whose tag never appears stay unset.
pub fn read_fields(
    reader: &mut dyn Source,
    bounds: u64,
    within: ChunkID,
    fields: &mut [&mut dyn DynField],
) -> Result<(), DecodeError> {
    io::read_chunks(reader, bounds, within, |chunk| {
        read_matching(fields, chunk).map(|_| ())
    })
}
/// Like [`read_fields`], but chunks matching no field are captured into `extra` instead of skipped.
pub fn read_fields_keeping(
    reader: &mut dyn Source,
    bounds: u64,
    within: ChunkID,
    fields: &mut [&mut dyn DynField],
    extra: &mut Vec<io::RawChunk>,
) -> Result<(), DecodeError> {
    io::read_chunks(reader, bounds, within, |chunk| {
        if !read_matching(fields, chunk)? {
            extra.push(io::RawChunk::capture(chunk)?);
        }
        Ok(())
    })
}
/// Encode fields in declaration order, omitting unset ones.
pub fn write_fields(writer: &mut dyn Sink, fields: &[&dyn DynField]) -> std::io::Result<()> {
    fields.iter().try_for_each(|field| field.encode(writer))
}
