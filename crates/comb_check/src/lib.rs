mod bind;
mod expr;
mod infer;
pub(crate) mod storage;
mod typecheck;
mod unify;
mod witness;


#[cfg(test)]
mod pbt;

use std::fmt;
use std::sync::Arc;

use comb_dag::{Dag, Offset, Primitive, RefError};
use comb_ty::{Arrow, BitIter, DecodeError, FinalTy, Value};
use derive_more::Debug;
use miette::Diagnostic;
use thiserror::Error;

pub use expr::{Expr, ExprNode, TypeError};
pub use infer::infer;
pub use typecheck::typecheck;
pub use witness::{decode_witnesses, decode_witnesses_from_bits};

/// Handle to a placeholder or type term inside one inference episode.
#[derive(Debug, Clone, PartialEq, Eq, Copy, Hash, PartialOrd, Ord)]
#[debug("TyId({_0:?})")]
pub struct TyId(u32);

impl From<u32> for TyId {
    #[inline]
    fn from(value: u32) -> Self {
        TyId(value)
    }
}

impl From<usize> for TyId {
    #[inline]
    fn from(value: usize) -> Self {
        u32::try_from(value).expect("TyId overflow").into()
    }
}

impl From<TyId> for usize {
    #[inline]
    fn from(value: TyId) -> Self {
        value.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum CheckError {
    #[error("type mismatch: cannot unify {left} with {right}")]
    #[diagnostic(code(comb::unify::mismatch))]
    TypeMismatch { left: String, right: String },

    #[error("occurs check: cannot construct infinite type {var} = {ty}")]
    #[diagnostic(code(comb::unify::occurs))]
    Occurs { var: String, ty: String },

    #[error("child offset {offset} does not point at an earlier node")]
    #[diagnostic(code(comb::dag::index), help("offsets count backwards and must be between 1 and the node's position"))]
    IndexOutOfRange { offset: Offset },

    #[error("child offset {offset} is too large to address a node")]
    #[diagnostic(code(comb::dag::overflow))]
    OffsetOverflow { offset: Offset },

    #[error("hidden node has no arrow")]
    #[diagnostic(code(comb::hidden::arrow), help("hidden nodes may only appear as one branch of a case"))]
    HiddenArrow,

    #[error("illegal use of a hidden node")]
    #[diagnostic(code(comb::hidden::illegal), help("exactly one branch of a case may be hidden"))]
    IllegalHidden,

    #[error("witness decoding failed: {0}")]
    #[diagnostic(code(comb::witness::decode))]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    #[diagnostic(code(comb::typecheck::mismatch))]
    Type(#[from] TypeError),

    #[error("program has no nodes")]
    #[diagnostic(code(comb::dag::empty))]
    EmptyDag,

    #[error("program has type {found} but {expected} was declared")]
    #[diagnostic(code(comb::typecheck::root))]
    TerminalMismatch { expected: Arrow, found: Arrow },
}

impl From<RefError> for CheckError {
    fn from(value: RefError) -> Self {
        match value {
            RefError::Overflow { offset } => CheckError::OffsetOverflow { offset },
            RefError::OutOfRange { offset } => CheckError::IndexOutOfRange { offset },
        }
    }
}

impl From<comb_dag::NoArrow> for CheckError {
    fn from(_: comb_dag::NoArrow) -> Self {
        CheckError::HiddenArrow
    }
}

/// A check error paired with the node where it occurred. `at_node` is only
/// `None` for errors about the program as a whole (an empty DAG).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedError {
    pub error: CheckError,
    pub at_node: Option<usize>,
}

impl LocatedError {
    pub fn at(pos: usize, error: impl Into<CheckError>) -> Self {
        Self {
            error: error.into(),
            at_node: Some(pos),
        }
    }

    pub fn empty_dag() -> Self {
        Self {
            error: CheckError::EmptyDag,
            at_node: None,
        }
    }
}

impl fmt::Display for LocatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.at_node {
            Some(pos) => write!(f, "node {pos}: {}", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for LocatedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl Diagnostic for LocatedError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.error.code()
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.error.help()
    }
}

/// Run the whole pipeline: infer against `arrow`, decode witnesses with
/// `decode` in node order, then type check into an expression.
pub fn check_program<J, T, W, E>(
    dag: Dag<J, T, W>,
    arrow: &Arrow,
    decode: impl FnMut(&FinalTy, W) -> Result<Value, E>,
) -> Result<Arc<Expr<J>>, LocatedError>
where
    J: Primitive,
    E: Into<CheckError>,
{
    let len = dag.len();
    let typed = infer(dag, Some(arrow))?;
    let decoded = decode_witnesses(typed, decode)?;
    let expr = typecheck(&decoded, arrow)?;
    log::info!("checked {len} nodes against {arrow}");
    Ok(expr)
}

/// [`check_program`] with witnesses packed in `bits`.
pub fn check_program_with_bits<J, T, W>(
    dag: Dag<J, T, W>,
    arrow: &Arrow,
    bits: &mut BitIter<'_>,
) -> Result<Arc<Expr<J>>, LocatedError>
where
    J: Primitive,
{
    let len = dag.len();
    let typed = infer(dag, Some(arrow))?;
    let decoded = decode_witnesses_from_bits(typed, bits)?;
    let expr = typecheck(&decoded, arrow)?;
    log::info!("checked {len} nodes against {arrow}, {} witness bits", bits.bits_read());
    Ok(expr)
}
