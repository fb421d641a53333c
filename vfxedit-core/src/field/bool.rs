use super::{Scalar, ScalarValue};
use std::io::{Read, Result as IOResult, Write};

/// A one-byte flag with a third "unassigned" state.
///
/// `0x00` and `0x01` are false and true. Every other byte, conventionally `0xFF`, is null. The raw byte is
/// kept so an odd value survives a round trip.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum NullableBool {
    False,
    True,
    Null { raw: u8 },
}
impl NullableBool {
    pub const NULL: Self = Self::Null { raw: 0xFF };
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x00 => Self::False,
            0x01 => Self::True,
            raw => Self::Null { raw },
        }
    }
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            Self::False => 0x00,
            Self::True => 0x01,
            Self::Null { raw } => raw,
        }
    }
    /// None if null.
    #[must_use]
    pub fn get(&self) -> Option<bool> {
        match self {
            Self::False => Some(false),
            Self::True => Some(true),
            Self::Null { .. } => None,
        }
    }
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null { .. })
    }
}
impl From<bool> for NullableBool {
    fn from(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }
}
impl std::fmt::Display for NullableBool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::False => f.write_str("false"),
            Self::True => f.write_str("true"),
            Self::Null { raw } => write!(f, "null ({raw:#04x})"),
        }
    }
}
impl Scalar for NullableBool {
    fn decode(reader: &mut dyn Read, _size: u32) -> IOResult<Self> {
        let mut byte = [0];
        reader.read_exact(&mut byte)?;
        let value = Self::from_byte(byte[0]);
        if let Self::Null { raw } = value {
            if raw != 0xFF {
                log::warn!("flag byte {raw:#04x} read as unassigned");
            }
        }
        Ok(value)
    }
    fn encode(&self, writer: &mut dyn Write) -> IOResult<()> {
        writer.write_all(&[self.to_byte()])
    }
    fn min_size() -> u32 {
        1
    }
    fn to_value(&self) -> ScalarValue {
        ScalarValue::Bool(*self)
    }
    fn from_value(value: &ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}
