mod bits;
mod value;

#[cfg(any(test, feature = "proptest_support"))]
pub mod arbitrary;

use std::fmt;
use std::sync::Arc;

pub use bits::{decode_value, encode_value, BitIter, BitWriter, DecodeError};
pub use value::{CastError, Value};

use derive_more::Debug;

/// The finite type grammar. `R` is how children are referenced: placeholder
/// handles while inferring, shared concrete types afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty<R> {
    #[debug("1")]
    Unit,
    #[debug("Sum({_0:?}, {_1:?})")]
    Sum(R, R),
    #[debug("Product({_0:?}, {_1:?})")]
    Product(R, R),
}

impl<R> Ty<R> {
    pub fn map<S>(self, mut f: impl FnMut(R) -> S) -> Ty<S> {
        match self {
            Ty::Unit => Ty::Unit,
            Ty::Sum(l, r) => Ty::Sum(f(l), f(r)),
            Ty::Product(l, r) => Ty::Product(f(l), f(r)),
        }
    }

    pub fn children(&self) -> Option<(&R, &R)> {
        match self {
            Ty::Unit => None,
            Ty::Sum(l, r) | Ty::Product(l, r) => Some((l, r)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[debug("{_0:?}")]
pub struct TyRef(Arc<FinalTy>);

/// A fully resolved type. No placeholder can appear in one.
pub type FinalTy = Ty<TyRef>;

impl From<FinalTy> for TyRef {
    fn from(value: FinalTy) -> Self {
        TyRef(Arc::new(value))
    }
}

impl TyRef {
    /// Identity of the shared node, for memoizing walks over types built by sharing.
    pub fn as_ptr(&self) -> *const FinalTy {
        Arc::as_ptr(&self.0)
    }
}

impl std::ops::Deref for TyRef {
    type Target = FinalTy;

    fn deref(&self) -> &FinalTy {
        &self.0
    }
}

impl FinalTy {
    pub fn unit() -> Self {
        Ty::Unit
    }

    pub fn sum(left: FinalTy, right: FinalTy) -> Self {
        Ty::Sum(left.into(), right.into())
    }

    pub fn product(left: FinalTy, right: FinalTy) -> Self {
        Ty::Product(left.into(), right.into())
    }

    /// `1 + 1`
    pub fn bit() -> Self {
        Self::sum(Self::unit(), Self::unit())
    }

    /// The word type `2^(2^n)`: `two_two_n(0)` is a bit, `two_two_n(8)` a 256-bit word.
    pub fn two_two_n(n: u32) -> Self {
        let mut ty = Self::bit();
        for _ in 0..n {
            ty = Self::product(ty.clone(), ty);
        }
        ty
    }

    /// The word type of the given bit width, if the width is a power of two.
    pub fn word(width: u32) -> Option<Self> {
        if width == 0 || !width.is_power_of_two() {
            return None;
        }
        Some(Self::two_two_n(width.trailing_zeros()))
    }

    /// Bit width if this type is a word type.
    pub fn word_width(&self) -> Option<u32> {
        match self {
            Ty::Sum(l, r) if **l == Ty::Unit && **r == Ty::Unit => Some(1),
            Ty::Product(l, r) if l == r => l.word_width().and_then(|w| w.checked_mul(2)),
            _ => None,
        }
    }

    pub fn split_sum(&self) -> Option<(&FinalTy, &FinalTy)> {
        match self {
            Ty::Sum(l, r) => Some((l, r)),
            _ => None,
        }
    }

    pub fn split_product(&self) -> Option<(&FinalTy, &FinalTy)> {
        match self {
            Ty::Product(l, r) => Some((l, r)),
            _ => None,
        }
    }
}

impl fmt::Display for Ty<TyRef> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(width) = self.word_width() {
            return if width == 1 {
                write!(f, "2")
            } else {
                write!(f, "2^{width}")
            };
        }
        match self {
            Ty::Unit => write!(f, "1"),
            Ty::Sum(l, r) => write!(f, "({} + {})", **l, **r),
            Ty::Product(l, r) => write!(f, "({} × {})", **l, **r),
        }
    }
}

impl fmt::Display for TyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

/// The `(source, target)` pair of a combinator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[debug("{source:?} -> {target:?}")]
pub struct Arrow<T = FinalTy> {
    pub source: T,
    pub target: T,
}

impl<T> Arrow<T> {
    pub fn new(source: T, target: T) -> Self {
        Self { source, target }
    }
}

impl fmt::Display for Arrow<FinalTy> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}
