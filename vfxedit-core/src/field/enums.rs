use super::{Scalar, ScalarValue};
use std::io::{Read, Result as IOResult, Write};

/// An enumeration stored as a little-endian `i32`.
pub trait ScalarEnum: Copy + PartialEq + std::fmt::Debug + 'static {
    fn from_raw(raw: i32) -> Option<Self>;
    fn to_raw(self) -> i32;
    fn name(self) -> &'static str;
}

/// Implement [`ScalarEnum`] for a `#[repr(i32)]` enum deriving `strum::FromRepr` and `strum::IntoStaticStr`.
#[macro_export]
macro_rules! scalar_enum {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::field::ScalarEnum for $ty {
                fn from_raw(raw: i32) -> Option<Self> {
                    Self::from_repr(raw)
                }
                fn to_raw(self) -> i32 {
                    self as i32
                }
                fn name(self) -> &'static str {
                    self.into()
                }
            }
        )*
    };
}

/// A decoded enum value. Integers with no matching variant are kept as-is rather than failing the load.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Enumerated<E: ScalarEnum> {
    Known(E),
    Unrecognized(i32),
}
impl<E: ScalarEnum> Enumerated<E> {
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        E::from_raw(raw).map_or(Self::Unrecognized(raw), Self::Known)
    }
    #[must_use]
    pub fn raw(&self) -> i32 {
        match self {
            Self::Known(e) => e.to_raw(),
            Self::Unrecognized(raw) => *raw,
        }
    }
    #[must_use]
    pub fn known(&self) -> Option<E> {
        match self {
            Self::Known(e) => Some(*e),
            Self::Unrecognized(_) => None,
        }
    }
}
impl<E: ScalarEnum> From<E> for Enumerated<E> {
    fn from(value: E) -> Self {
        Self::Known(value)
    }
}
impl<E: ScalarEnum> std::fmt::Display for Enumerated<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Known(e) => f.write_str(e.name()),
            Self::Unrecognized(raw) => write!(f, "unrecognized ({raw})"),
        }
    }
}
impl<E: ScalarEnum> Scalar for Enumerated<E> {
    fn decode(reader: &mut dyn Read, _size: u32) -> IOResult<Self> {
        let raw = i32::decode(reader, 4)?;
        let value = Self::from_raw(raw);
        if let Self::Unrecognized(raw) = value {
            log::warn!("{raw} is not a known {}", std::any::type_name::<E>());
        }
        Ok(value)
    }
    fn encode(&self, writer: &mut dyn Write) -> IOResult<()> {
        self.raw().encode(writer)
    }
    fn min_size() -> u32 {
        4
    }
    fn to_value(&self) -> ScalarValue {
        ScalarValue::Enum(self.raw())
    }
    fn from_value(value: &ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Enum(raw) => Some(Self::from_raw(*raw)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vfx::enums::TextureFilter;
    use std::io::Cursor;

    #[test]
    fn out_of_range_is_preserved() {
        let mut cursor = Cursor::new(99i32.to_le_bytes());
        let value = Enumerated::<TextureFilter>::decode(&mut cursor, 4).unwrap();
        assert_eq!(value, Enumerated::Unrecognized(99));
        assert_eq!(value.known(), None);
        assert_eq!(value.to_string(), "unrecognized (99)");

        let mut out = Vec::new();
        value.encode(&mut out).unwrap();
        assert_eq!(out, 99i32.to_le_bytes());
    }
    #[test]
    fn known_values() {
        let value = Enumerated::<TextureFilter>::from_raw(1);
        assert_eq!(value.known(), Some(TextureFilter::Point));
        assert_eq!(value.raw(), 1);
        assert_eq!(value.to_string(), "Point");
        assert_eq!(
            Enumerated::<TextureFilter>::from_value(&ScalarValue::Enum(-7)),
            Some(Enumerated::Unrecognized(-7))
        );
    }
}
