//! Integers, floats and strings.

use super::{Scalar, ScalarValue};
use std::io::{Read, Result as IOResult, Write};

macro_rules! int_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Scalar for $ty {
                fn decode(reader: &mut dyn Read, _size: u32) -> IOResult<Self> {
                    let mut bytes = [0; std::mem::size_of::<$ty>()];
                    reader.read_exact(&mut bytes)?;
                    Ok(<$ty>::from_le_bytes(bytes))
                }
                fn encode(&self, writer: &mut dyn Write) -> IOResult<()> {
                    writer.write_all(&self.to_le_bytes())
                }
                fn min_size() -> u32 {
                    std::mem::size_of::<$ty>() as u32
                }
                fn to_value(&self) -> ScalarValue {
                    ScalarValue::Int(i64::from(*self))
                }
                fn from_value(value: &ScalarValue) -> Option<Self> {
                    match value {
                        ScalarValue::Int(i) => <$ty>::try_from(*i).ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}
int_scalar!(i8, u8, i16, u16, i32, u32);

impl Scalar for f32 {
    fn decode(reader: &mut dyn Read, _size: u32) -> IOResult<Self> {
        let mut bytes = [0; 4];
        reader.read_exact(&mut bytes)?;
        Ok(f32::from_le_bytes(bytes))
    }
    fn encode(&self, writer: &mut dyn Write) -> IOResult<()> {
        writer.write_all(&self.to_le_bytes())
    }
    fn min_size() -> u32 {
        4
    }
    fn to_value(&self) -> ScalarValue {
        ScalarValue::Float(*self)
    }
    fn from_value(value: &ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Float(x) => Some(*x),
            _ => None,
        }
    }
}

/// A string stored as the chunk's whole payload, NUL terminated and padded.
///
/// The bytes are kept exactly as read, padding included, so an unedited string re-encodes identically.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct FixedString(pub Vec<u8>);
impl FixedString {
    /// Encode `text` with a terminating NUL.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        Self(bytes)
    }
    /// The text up to the first NUL, lossily decoded.
    #[must_use]
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(self.0.len());
        String::from_utf8_lossy(&self.0[..end])
    }
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}
impl std::fmt::Debug for FixedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.text())
    }
}
impl std::fmt::Display for FixedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text())
    }
}
impl Scalar for FixedString {
    fn decode(reader: &mut dyn Read, size: u32) -> IOResult<Self> {
        let mut bytes = vec![0; size as usize];
        reader.read_exact(&mut bytes)?;
        Ok(Self(bytes))
    }
    fn encode(&self, writer: &mut dyn Write) -> IOResult<()> {
        writer.write_all(&self.0)
    }
    fn min_size() -> u32 {
        0
    }
    fn to_value(&self) -> ScalarValue {
        ScalarValue::Text(self.clone())
    }
    fn from_value(value: &ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}
