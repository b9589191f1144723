use std::fmt;

use comb_ty::{Arrow, FinalTy};
use derive_more::Debug;
use thiserror::Error;

use crate::{Cmr, Primitive};

/// One combinator node. The shape is shared by every phase of checking:
/// - `J` is the primitive alphabet,
/// - `Ty` the type annotation (`()` when untyped, placeholder handles while
///   inferring, [`FinalTy`] afterwards),
/// - `W` the witness payload (raw, then decoded),
/// - `R` the child reference (a backward offset in a DAG, a built
///   expression while type checking).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TermF<J, Ty, W, R> {
    #[debug("Iden({a:?})")]
    Iden { a: Ty },
    #[debug("Unit({a:?})")]
    Unit { a: Ty },
    Injl { a: Ty, b: Ty, c: Ty, s: R },
    Injr { a: Ty, b: Ty, c: Ty, s: R },
    Take { a: Ty, b: Ty, c: Ty, s: R },
    Drop { a: Ty, b: Ty, c: Ty, s: R },
    Comp { a: Ty, b: Ty, c: Ty, s: R, t: R },
    Case { a: Ty, b: Ty, c: Ty, d: Ty, s: R, t: R },
    Pair { a: Ty, b: Ty, c: Ty, s: R, t: R },
    Disconnect { a: Ty, b: Ty, c: Ty, d: Ty, s: R, t: R },
    #[debug("Hidden({_0})")]
    Hidden(Cmr),
    Witness { a: Ty, b: Ty, w: W },
    #[debug("Prim({_0:?})")]
    Prim(J),
}

/// The arrow of a `Hidden` node was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("hidden node has no arrow")]
pub struct NoArrow;

/// Builds type terms in some representation. Lets the arrow rule of each
/// node kind be written once for both placeholder and concrete types.
pub trait TyBuilder<T> {
    fn unit(&mut self) -> T;
    fn sum(&mut self, left: T, right: T) -> T;
    fn product(&mut self, left: T, right: T) -> T;
    /// Bring a concrete type (e.g. a primitive's signature) into this representation.
    fn intern(&mut self, ty: &FinalTy) -> T;
}

/// Builds plain [`FinalTy`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcreteTys;

impl TyBuilder<FinalTy> for ConcreteTys {
    fn unit(&mut self) -> FinalTy {
        FinalTy::unit()
    }

    fn sum(&mut self, left: FinalTy, right: FinalTy) -> FinalTy {
        FinalTy::sum(left, right)
    }

    fn product(&mut self, left: FinalTy, right: FinalTy) -> FinalTy {
        FinalTy::product(left, right)
    }

    fn intern(&mut self, ty: &FinalTy) -> FinalTy {
        ty.clone()
    }
}

impl<J, Ty, W, R> TermF<J, Ty, W, R> {
    pub fn name(&self) -> &'static str {
        match self {
            TermF::Iden { .. } => "iden",
            TermF::Unit { .. } => "unit",
            TermF::Injl { .. } => "injl",
            TermF::Injr { .. } => "injr",
            TermF::Take { .. } => "take",
            TermF::Drop { .. } => "drop",
            TermF::Comp { .. } => "comp",
            TermF::Case { .. } => "case",
            TermF::Pair { .. } => "pair",
            TermF::Disconnect { .. } => "disconnect",
            TermF::Hidden(_) => "hidden",
            TermF::Witness { .. } => "witness",
            TermF::Prim(_) => "prim",
        }
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, TermF::Hidden(_))
    }

    /// Children in left to right order.
    pub fn children(&self) -> (Option<&R>, Option<&R>) {
        match self {
            TermF::Injl { s, .. }
            | TermF::Injr { s, .. }
            | TermF::Take { s, .. }
            | TermF::Drop { s, .. } => (Some(s), None),
            TermF::Comp { s, t, .. }
            | TermF::Case { s, t, .. }
            | TermF::Pair { s, t, .. }
            | TermF::Disconnect { s, t, .. } => (Some(s), Some(t)),
            TermF::Iden { .. }
            | TermF::Unit { .. }
            | TermF::Hidden(_)
            | TermF::Witness { .. }
            | TermF::Prim(_) => (None, None),
        }
    }

    /// Rebuild the node with every annotation, witness and child converted.
    /// `wit` is handed the already converted output type of its witness node.
    pub fn try_map<Ty2, W2, R2, E>(
        self,
        mut ty: impl FnMut(Ty) -> Result<Ty2, E>,
        wit: impl FnOnce(&Ty2, W) -> Result<W2, E>,
        mut child: impl FnMut(R) -> Result<R2, E>,
    ) -> Result<TermF<J, Ty2, W2, R2>, E> {
        Ok(match self {
            TermF::Iden { a } => TermF::Iden { a: ty(a)? },
            TermF::Unit { a } => TermF::Unit { a: ty(a)? },
            TermF::Injl { a, b, c, s } => TermF::Injl {
                a: ty(a)?,
                b: ty(b)?,
                c: ty(c)?,
                s: child(s)?,
            },
            TermF::Injr { a, b, c, s } => TermF::Injr {
                a: ty(a)?,
                b: ty(b)?,
                c: ty(c)?,
                s: child(s)?,
            },
            TermF::Take { a, b, c, s } => TermF::Take {
                a: ty(a)?,
                b: ty(b)?,
                c: ty(c)?,
                s: child(s)?,
            },
            TermF::Drop { a, b, c, s } => TermF::Drop {
                a: ty(a)?,
                b: ty(b)?,
                c: ty(c)?,
                s: child(s)?,
            },
            TermF::Comp { a, b, c, s, t } => TermF::Comp {
                a: ty(a)?,
                b: ty(b)?,
                c: ty(c)?,
                s: child(s)?,
                t: child(t)?,
            },
            TermF::Case { a, b, c, d, s, t } => TermF::Case {
                a: ty(a)?,
                b: ty(b)?,
                c: ty(c)?,
                d: ty(d)?,
                s: child(s)?,
                t: child(t)?,
            },
            TermF::Pair { a, b, c, s, t } => TermF::Pair {
                a: ty(a)?,
                b: ty(b)?,
                c: ty(c)?,
                s: child(s)?,
                t: child(t)?,
            },
            TermF::Disconnect { a, b, c, d, s, t } => TermF::Disconnect {
                a: ty(a)?,
                b: ty(b)?,
                c: ty(c)?,
                d: ty(d)?,
                s: child(s)?,
                t: child(t)?,
            },
            TermF::Hidden(cmr) => TermF::Hidden(cmr),
            TermF::Witness { a, b, w } => {
                let a = ty(a)?;
                let b = ty(b)?;
                let w = wit(&b, w)?;
                TermF::Witness { a, b, w }
            }
            TermF::Prim(j) => TermF::Prim(j),
        })
    }

    pub fn map_tys<Ty2>(self, mut f: impl FnMut(Ty) -> Ty2) -> TermF<J, Ty2, W, R> {
        let res: Result<_, std::convert::Infallible> =
            self.try_map(|t| Ok(f(t)), |_, w| Ok(w), Ok);
        match res {
            Ok(node) => node,
            Err(never) => match never {},
        }
    }

    pub fn map_children<R2>(self, mut f: impl FnMut(R) -> R2) -> TermF<J, Ty, W, R2> {
        let res: Result<_, std::convert::Infallible> = self.try_map_children(|r| Ok(f(r)));
        match res {
            Ok(node) => node,
            Err(never) => match never {},
        }
    }

    pub fn try_map_children<R2, E>(
        self,
        f: impl FnMut(R) -> Result<R2, E>,
    ) -> Result<TermF<J, Ty, W, R2>, E> {
        self.try_map(Ok, |_, w| Ok(w), f)
    }
}

impl<J: Primitive, Ty: Clone, W, R> TermF<J, Ty, W, R> {
    /// The `(source, target)` implied by this node's own annotations.
    pub fn arrow<B: TyBuilder<Ty>>(&self, builder: &mut B) -> Result<Arrow<Ty>, NoArrow> {
        let arrow = match self {
            TermF::Iden { a } => Arrow::new(a.clone(), a.clone()),
            TermF::Unit { a } => Arrow::new(a.clone(), builder.unit()),
            TermF::Injl { a, b, c, .. } | TermF::Injr { a, b, c, .. } => {
                Arrow::new(a.clone(), builder.sum(b.clone(), c.clone()))
            }
            TermF::Take { a, b, c, .. } | TermF::Drop { a, b, c, .. } => {
                Arrow::new(builder.product(a.clone(), b.clone()), c.clone())
            }
            TermF::Comp { a, c, .. } => Arrow::new(a.clone(), c.clone()),
            TermF::Case { a, b, c, d, .. } => {
                let sum = builder.sum(a.clone(), b.clone());
                Arrow::new(builder.product(sum, c.clone()), d.clone())
            }
            TermF::Pair { a, b, c, .. } => Arrow::new(a.clone(), builder.product(b.clone(), c.clone())),
            TermF::Disconnect { a, b, d, .. } => {
                Arrow::new(a.clone(), builder.product(b.clone(), d.clone()))
            }
            TermF::Hidden(_) => return Err(NoArrow),
            TermF::Witness { a, b, .. } => Arrow::new(a.clone(), b.clone()),
            TermF::Prim(j) => Arrow::new(builder.intern(&j.source_ty()), builder.intern(&j.target_ty())),
        };
        Ok(arrow)
    }
}

/// Constructors for untyped nodes.
impl<J, W, R> TermF<J, (), W, R> {
    pub fn iden() -> Self {
        TermF::Iden { a: () }
    }

    pub fn unit() -> Self {
        TermF::Unit { a: () }
    }

    pub fn injl(s: R) -> Self {
        TermF::Injl { a: (), b: (), c: (), s }
    }

    pub fn injr(s: R) -> Self {
        TermF::Injr { a: (), b: (), c: (), s }
    }

    pub fn take(s: R) -> Self {
        TermF::Take { a: (), b: (), c: (), s }
    }

    pub fn drop(s: R) -> Self {
        TermF::Drop { a: (), b: (), c: (), s }
    }

    pub fn comp(s: R, t: R) -> Self {
        TermF::Comp { a: (), b: (), c: (), s, t }
    }

    pub fn case(s: R, t: R) -> Self {
        TermF::Case { a: (), b: (), c: (), d: (), s, t }
    }

    pub fn pair(s: R, t: R) -> Self {
        TermF::Pair { a: (), b: (), c: (), s, t }
    }

    pub fn disconnect(s: R, t: R) -> Self {
        TermF::Disconnect { a: (), b: (), c: (), d: (), s, t }
    }

    pub fn hidden(cmr: Cmr) -> Self {
        TermF::Hidden(cmr)
    }

    pub fn witness(w: W) -> Self {
        TermF::Witness { a: (), b: (), w }
    }

    pub fn prim(j: J) -> Self {
        TermF::Prim(j)
    }
}

/// Renders the node in the line format `kind [children..]`, without annotations.
impl<J: fmt::Display, Ty, W, R: fmt::Display> fmt::Display for TermF<J, Ty, W, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermF::Hidden(cmr) => write!(f, "hidden {cmr}"),
            TermF::Prim(j) => write!(f, "prim {j}"),
            _ => {
                write!(f, "{}", self.name())?;
                let (s, t) = self.children();
                for child in [s, t].into_iter().flatten() {
                    write!(f, " {child}")?;
                }
                Ok(())
            }
        }
    }
}
