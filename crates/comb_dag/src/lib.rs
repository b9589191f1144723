mod cmr;
mod dag;
mod prim;
mod term;

#[cfg(any(test, feature = "proptest_support"))]
pub mod arbitrary;

pub use cmr::{Cmr, CmrParseError};
pub use dag::{resolve_offset, Dag, DagNode, Offset, RawDag, RawNode, RefError};
pub use prim::{CorePrim, Primitive, UnknownPrimitive};
pub use term::{ConcreteTys, NoArrow, TermF, TyBuilder};
