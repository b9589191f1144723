// ==============================================================================
// Bit codec for values
// ==============================================================================
//
// The payload width of a value depends on its type, so values are only
// decodable once the type is known:
// - Unit: no bits
// - Sum: one tag bit (0 = left, 1 = right) followed by the chosen branch
// - Product: the left component followed by the right one
// Bits are read most significant first within each byte.

use thiserror::Error;

use crate::{FinalTy, Ty, Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("bit stream ended after {read} bits")]
    EndOfStream { read: usize },
}

/// A cursor over a packed bit stream. Shared by every decode that draws
/// from the same stream, so reads happen in call order.
#[derive(Debug, Clone)]
pub struct BitIter<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitIter<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Number of bits consumed so far.
    pub fn bits_read(&self) -> usize {
        self.pos
    }

    pub fn read_bit(&mut self) -> Result<bool, DecodeError> {
        self.next().ok_or(DecodeError::EndOfStream { read: self.pos })
    }
}

impl Iterator for BitIter<'_> {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        let byte = self.bytes.get(self.pos / 8)?;
        let bit = byte & (0x80 >> (self.pos % 8)) != 0;
        self.pos += 1;
        Some(bit)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    len: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_bit(&mut self, bit: bool) {
        if self.len % 8 == 0 {
            self.bytes.push(0);
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 0x80 >> (self.len % 8);
        }
        self.len += 1;
    }

    /// Number of bits written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The packed bytes, zero padded to a byte boundary.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

pub fn decode_value(ty: &FinalTy, bits: &mut BitIter<'_>) -> Result<Value, DecodeError> {
    match ty {
        Ty::Unit => Ok(Value::Unit),
        Ty::Sum(l, r) => {
            if bits.read_bit()? {
                Ok(Value::right(decode_value(r, bits)?))
            } else {
                Ok(Value::left(decode_value(l, bits)?))
            }
        }
        Ty::Product(l, r) => {
            let left = decode_value(l, bits)?;
            let right = decode_value(r, bits)?;
            Ok(Value::product(left, right))
        }
    }
}

pub fn encode_value(value: &Value, out: &mut BitWriter) {
    match value {
        Value::Unit => {}
        Value::Left(v) => {
            out.write_bit(false);
            encode_value(v, out);
        }
        Value::Right(v) => {
            out.write_bit(true);
            encode_value(v, out);
        }
        Value::Product(l, r) => {
            encode_value(l, out);
            encode_value(r, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_is_read_msb_first() {
        let ty = FinalTy::word(8).unwrap();
        let mut bits = BitIter::new(&[0xa5]);
        let value = decode_value(&ty, &mut bits).unwrap();
        assert_eq!(value.as_word(), Some(0xa5));
        assert_eq!(bits.bits_read(), 8);
    }

    #[test]
    fn units_take_no_bits() {
        let ty = FinalTy::product(FinalTy::unit(), FinalTy::unit());
        let mut bits = BitIter::new(&[]);
        assert_eq!(
            decode_value(&ty, &mut bits),
            Ok(Value::product(Value::Unit, Value::Unit))
        );
    }

    #[test]
    fn consecutive_values_share_the_stream() {
        let bit = FinalTy::bit();
        let nibble = FinalTy::word(4).unwrap();
        // 1 | 0110 | 1...
        let mut bits = BitIter::new(&[0b1011_0100]);
        assert_eq!(decode_value(&bit, &mut bits), Ok(Value::bit(true)));
        assert_eq!(decode_value(&nibble, &mut bits).unwrap().as_word(), Some(0b0110));
        assert_eq!(decode_value(&bit, &mut bits), Ok(Value::bit(true)));
    }

    #[test]
    fn short_stream_is_an_error() {
        let ty = FinalTy::word(16).unwrap();
        let mut bits = BitIter::new(&[0xff]);
        assert_eq!(
            decode_value(&ty, &mut bits),
            Err(DecodeError::EndOfStream { read: 8 })
        );
    }

    #[test]
    fn writer_pads_to_bytes() {
        let mut out = BitWriter::new();
        encode_value(&Value::bit(true), &mut out);
        encode_value(&Value::word(2, 0b01).unwrap(), &mut out);
        assert_eq!(out.len(), 3);
        assert_eq!(out.into_bytes(), vec![0b1010_0000]);
    }

    mod pbt {
        use proptest::prelude::{prop_assert_eq, proptest};

        use super::*;
        use crate::arbitrary::arb_typed_value;

        proptest! {
            #[test]
            fn decode_reads_back_what_encode_wrote((ty, value) in arb_typed_value()) {
                let mut out = BitWriter::new();
                encode_value(&value, &mut out);
                let written = out.len();
                let bytes = out.into_bytes();

                let mut bits = BitIter::new(&bytes);
                prop_assert_eq!(decode_value(&ty, &mut bits), Ok(value));
                prop_assert_eq!(bits.bits_read(), written);
            }
        }
    }
}
