use super::{Scalar, ScalarValue};
use std::io::{Read, Result as IOResult, Write};

/// A `u32` bit set. Bits with no named flag are retained.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Flags<F>(pub F);
impl<F: bitflags::Flags<Bits = u32>> Flags<F> {
    #[must_use]
    pub fn bits(&self) -> u32 {
        self.0.bits()
    }
    /// Bits set that no named flag covers.
    #[must_use]
    pub fn unknown_bits(&self) -> u32 {
        self.0.bits() & !F::all().bits()
    }
}
impl<F: bitflags::Flags<Bits = u32> + std::fmt::Debug> std::fmt::Debug for Flags<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.0, f)
    }
}
impl<F> Scalar for Flags<F>
where
    F: bitflags::Flags<Bits = u32> + Copy + PartialEq + std::fmt::Debug + 'static,
{
    fn decode(reader: &mut dyn Read, _size: u32) -> IOResult<Self> {
        Ok(Self(F::from_bits_retain(u32::decode(reader, 4)?)))
    }
    fn encode(&self, writer: &mut dyn Write) -> IOResult<()> {
        self.bits().encode(writer)
    }
    fn min_size() -> u32 {
        4
    }
    fn to_value(&self) -> ScalarValue {
        ScalarValue::Flags(self.bits())
    }
    fn from_value(value: &ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Flags(bits) => Some(Self(F::from_bits_retain(*bits))),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vfx::enums::ParticleFlags;
    use std::io::Cursor;

    #[test]
    fn unknown_bits_retained() {
        let raw = ParticleFlags::DEPTH_TEST.bits() | 0x8000_0000;
        let mut cursor = Cursor::new(raw.to_le_bytes());
        let flags = Flags::<ParticleFlags>::decode(&mut cursor, 4).unwrap();
        assert!(flags.0.contains(ParticleFlags::DEPTH_TEST));
        assert_eq!(flags.unknown_bits(), 0x8000_0000);

        let mut out = Vec::new();
        flags.encode(&mut out).unwrap();
        assert_eq!(out, raw.to_le_bytes());
    }
}
