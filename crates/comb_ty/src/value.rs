use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::{FinalTy, Ty};

/// A concrete value inhabiting some [`FinalTy`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Unit,
    Left(Arc<Value>),
    Right(Arc<Value>),
    Product(Arc<Value>, Arc<Value>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("value {value} does not inhabit type {ty}")]
pub struct CastError {
    pub value: Value,
    pub ty: FinalTy,
}

impl Value {
    pub fn left(inner: Value) -> Self {
        Value::Left(Arc::new(inner))
    }

    pub fn right(inner: Value) -> Self {
        Value::Right(Arc::new(inner))
    }

    pub fn product(left: Value, right: Value) -> Self {
        Value::Product(Arc::new(left), Arc::new(right))
    }

    pub fn bit(set: bool) -> Self {
        if set {
            Value::right(Value::Unit)
        } else {
            Value::left(Value::Unit)
        }
    }

    /// A word of `width` bits holding the low bits of `n`, most significant half first.
    /// `width` must be a power of two no larger than 64.
    pub fn word(width: u32, n: u64) -> Option<Self> {
        if width == 0 || width > 64 || !width.is_power_of_two() {
            return None;
        }
        Some(Self::word_inner(width, n))
    }

    fn word_inner(width: u32, n: u64) -> Self {
        if width == 1 {
            return Self::bit(n & 1 == 1);
        }
        let half = width / 2;
        let low = Self::word_inner(half, n);
        let high = Self::word_inner(half, n >> half);
        Self::product(high, low)
    }

    pub fn u8(n: u8) -> Self {
        Self::word_inner(8, n.into())
    }

    /// Read this value back as a word. Fails on non-bit leaves or words wider than 64 bits.
    pub fn as_word(&self) -> Option<u64> {
        let mut bits = Vec::new();
        self.collect_bits(&mut bits)?;
        if bits.is_empty() || bits.len() > 64 {
            return None;
        }
        Some(bits.iter().fold(0, |acc, &b| (acc << 1) | u64::from(b)))
    }

    fn collect_bits(&self, bits: &mut Vec<bool>) -> Option<()> {
        match self {
            Value::Left(inner) if **inner == Value::Unit => bits.push(false),
            Value::Right(inner) if **inner == Value::Unit => bits.push(true),
            Value::Product(l, r) => {
                l.collect_bits(bits)?;
                r.collect_bits(bits)?;
            }
            _ => return None,
        }
        Some(())
    }

    pub fn is_of_type(&self, ty: &FinalTy) -> bool {
        match (self, ty) {
            (Value::Unit, Ty::Unit) => true,
            (Value::Left(v), Ty::Sum(l, _)) => v.is_of_type(l),
            (Value::Right(v), Ty::Sum(_, r)) => v.is_of_type(r),
            (Value::Product(vl, vr), Ty::Product(l, r)) => vl.is_of_type(l) && vr.is_of_type(r),
            _ => false,
        }
    }

    /// Check this value against `ty`, handing it back on success.
    pub fn cast(self, ty: &FinalTy) -> Result<Value, CastError> {
        if self.is_of_type(ty) {
            Ok(self)
        } else {
            Err(CastError {
                value: self,
                ty: ty.clone(),
            })
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Left(v) => write!(f, "L({v})"),
            Value::Right(v) => write!(f, "R({v})"),
            Value::Product(l, r) => write!(f, "({l}, {r})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_read_back() {
        assert_eq!(Value::u8(0xa5).as_word(), Some(0xa5));
        assert_eq!(Value::word(1, 1), Some(Value::bit(true)));
        assert_eq!(Value::word(64, u64::MAX).and_then(|v| v.as_word()), Some(u64::MAX));
        assert_eq!(Value::word(3, 0), None);
        assert_eq!(Value::Unit.as_word(), None);
    }

    #[test]
    fn word_is_high_half_first() {
        let v = Value::word(2, 0b10).unwrap();
        assert_eq!(v, Value::product(Value::bit(true), Value::bit(false)));
    }

    #[test]
    fn cast_checks_shape() {
        let byte = FinalTy::word(8).unwrap();
        assert!(Value::u8(7).is_of_type(&byte));
        assert!(!Value::u8(7).is_of_type(&FinalTy::bit()));

        let err = Value::bit(true).cast(&FinalTy::unit()).unwrap_err();
        assert_eq!(err.ty, FinalTy::unit());
        assert_eq!(err.to_string(), "value R(()) does not inhabit type 1");
    }
}
