use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use comb_ty::{FinalTy, Value};
use thiserror::Error;

/// An operation of the primitive alphabet. Each carries its own fixed
/// signature; `Prim` nodes take their arrow from it.
pub trait Primitive: Clone + Eq + Hash + fmt::Debug + fmt::Display {
    /// Ambient data available to `eval` (e.g. transaction context).
    type Env;

    fn name(&self) -> &str;

    fn source_ty(&self) -> FinalTy;

    fn target_ty(&self) -> FinalTy;

    /// `None` signals an operation specific abort, such as a failed assertion.
    fn eval(&self, input: &Value, env: &Self::Env) -> Option<Value>;
}

/// A small built-in alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CorePrim {
    /// `2 -> 1`, aborts on a clear bit.
    Verify,
    /// `2^8 × 2^8 -> 2 × 2^8`, carry and sum.
    Add8,
    /// `2^8 × 2^8 -> 2`
    Eq8,
    /// `1 -> 2^8`, the zero byte.
    Low8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown primitive {0:?}")]
pub struct UnknownPrimitive(pub String);

impl CorePrim {
    pub const ALL: [CorePrim; 4] = [CorePrim::Verify, CorePrim::Add8, CorePrim::Eq8, CorePrim::Low8];
}

fn byte() -> FinalTy {
    FinalTy::two_two_n(3)
}

fn two_bytes(input: &Value) -> Option<(u64, u64)> {
    match input {
        Value::Product(l, r) => Some((l.as_word()?, r.as_word()?)),
        _ => None,
    }
}

impl Primitive for CorePrim {
    type Env = ();

    fn name(&self) -> &str {
        match self {
            CorePrim::Verify => "verify",
            CorePrim::Add8 => "add8",
            CorePrim::Eq8 => "eq8",
            CorePrim::Low8 => "low8",
        }
    }

    fn source_ty(&self) -> FinalTy {
        match self {
            CorePrim::Verify => FinalTy::bit(),
            CorePrim::Add8 | CorePrim::Eq8 => FinalTy::product(byte(), byte()),
            CorePrim::Low8 => FinalTy::unit(),
        }
    }

    fn target_ty(&self) -> FinalTy {
        match self {
            CorePrim::Verify => FinalTy::unit(),
            CorePrim::Add8 => FinalTy::product(FinalTy::bit(), byte()),
            CorePrim::Eq8 => FinalTy::bit(),
            CorePrim::Low8 => byte(),
        }
    }

    fn eval(&self, input: &Value, _env: &()) -> Option<Value> {
        match self {
            CorePrim::Verify => match input.as_word()? {
                1 => Some(Value::Unit),
                _ => None,
            },
            CorePrim::Add8 => {
                let (x, y) = two_bytes(input)?;
                let sum = x + y;
                Some(Value::product(Value::bit(sum > 0xff), Value::u8(sum as u8)))
            }
            CorePrim::Eq8 => {
                let (x, y) = two_bytes(input)?;
                Some(Value::bit(x == y))
            }
            CorePrim::Low8 => Some(Value::u8(0)),
        }
    }
}

impl fmt::Display for CorePrim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CorePrim {
    type Err = UnknownPrimitive;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CorePrim::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| UnknownPrimitive(s.to_string()))
    }
}
