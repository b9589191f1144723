// ==============================================================================
// Inference pass
// ==============================================================================
//
// Folds over the DAG in stored order. Each node gets fresh placeholders for
// whatever its children don't determine, then the node-kind constraints are
// asserted against its children's arrows. The whole episode (the
// TypeStorage and every TyId in it) lives inside `infer`; only resolved
// FinalTys leave.

use comb_dag::{resolve_offset, Dag, DagNode, Offset, Primitive, TermF, TyBuilder};
use comb_ty::{Arrow, FinalTy};

use super::{CheckError, LocatedError, TyId};
use crate::bind::Binder;
use crate::storage::TypeStorage;
use crate::unify::UnifyError;

/// Infer concrete types for every node of `dag`. Existing annotations are
/// ignored. When `arrow` is given the root is constrained to it.
/// Placeholders left unconstrained default to `1`.
pub fn infer<J, T, W>(
    dag: Dag<J, T, W>,
    arrow: Option<&Arrow>,
) -> Result<Dag<J, FinalTy, W>, LocatedError>
where
    J: Primitive,
{
    let len = dag.len();
    let mut ctx = InferCtx::new(len);

    for (pos, node) in dag.into_iter().enumerate() {
        ctx.infer_node(pos, node)
            .map_err(|e| LocatedError::at(pos, e))?;
    }

    if let Some(arrow) = arrow {
        let Some(root) = len.checked_sub(1) else {
            return Err(LocatedError::empty_dag());
        };
        ctx.constrain_root(root, arrow)
            .map_err(|e| LocatedError::at(root, e))?;
    }

    log::debug!(
        "inferred {len} nodes using {} type terms",
        ctx.table.len()
    );

    Ok(ctx.finish())
}

struct InferCtx<J, W> {
    table: TypeStorage,
    nodes: Vec<DagNode<J, TyId, W>>,
}

impl<J: Primitive, W> InferCtx<J, W> {
    fn new(len: usize) -> Self {
        Self {
            table: TypeStorage::new(),
            nodes: Vec::with_capacity(len),
        }
    }

    fn fresh(&mut self) -> TyId {
        self.table.new_var()
    }

    fn unify(&mut self, lhs: TyId, rhs: TyId) -> Result<TyId, CheckError> {
        self.table.unify(lhs, rhs).map_err(|e| match e {
            UnifyError::Mismatch(l, r) => CheckError::TypeMismatch {
                left: self.table.render(l),
                right: self.table.render(r),
            },
            UnifyError::Occurs { var, ty } => CheckError::Occurs {
                var: self.table.render(var),
                ty: self.table.render(ty),
            },
        })
    }

    /// Arrow of the already annotated child `offset` back from `pos`.
    fn child_arrow(&mut self, pos: usize, offset: Offset) -> Result<Arrow<TyId>, CheckError> {
        let idx = resolve_offset(pos, offset)?;
        let child = &self.nodes[idx];
        Ok(child.arrow(&mut self.table)?)
    }

    /// Constrain one branch of a case to `(side × env) -> out`. A hidden
    /// branch is left unconstrained.
    fn constrain_branch(
        &mut self,
        pos: usize,
        offset: Offset,
        side: TyId,
        env: TyId,
        out: TyId,
    ) -> Result<(), CheckError> {
        match self.child_arrow(pos, offset) {
            Ok(arrow) => {
                let input = self.table.product(side, env);
                self.unify(arrow.source, input)?;
                self.unify(arrow.target, out)?;
                Ok(())
            }
            Err(CheckError::HiddenArrow) => {
                log::trace!("node {pos}: case branch {offset} back is hidden");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn infer_node<T>(&mut self, pos: usize, node: DagNode<J, T, W>) -> Result<(), CheckError> {
        log::trace!("node {pos}: {}", node.name());

        let typed = match node {
            TermF::Iden { .. } => TermF::Iden { a: self.fresh() },
            TermF::Unit { .. } => TermF::Unit { a: self.fresh() },
            TermF::Injl { s, .. } => {
                let arrow = self.child_arrow(pos, s)?;
                let c = self.fresh();
                TermF::Injl {
                    a: arrow.source,
                    b: arrow.target,
                    c,
                    s,
                }
            }
            TermF::Injr { s, .. } => {
                let arrow = self.child_arrow(pos, s)?;
                let b = self.fresh();
                TermF::Injr {
                    a: arrow.source,
                    b,
                    c: arrow.target,
                    s,
                }
            }
            TermF::Take { s, .. } => {
                let arrow = self.child_arrow(pos, s)?;
                let b = self.fresh();
                TermF::Take {
                    a: arrow.source,
                    b,
                    c: arrow.target,
                    s,
                }
            }
            TermF::Drop { s, .. } => {
                let arrow = self.child_arrow(pos, s)?;
                let a = self.fresh();
                TermF::Drop {
                    a,
                    b: arrow.source,
                    c: arrow.target,
                    s,
                }
            }
            TermF::Comp { s, t, .. } => {
                let left = self.child_arrow(pos, s)?;
                let right = self.child_arrow(pos, t)?;
                let b = self.unify(left.target, right.source)?;
                TermF::Comp {
                    a: left.source,
                    b,
                    c: right.target,
                    s,
                    t,
                }
            }
            TermF::Case { s, t, .. } => {
                let (a, b, c, d) = (self.fresh(), self.fresh(), self.fresh(), self.fresh());
                self.constrain_branch(pos, s, a, c, d)?;
                self.constrain_branch(pos, t, b, c, d)?;
                TermF::Case { a, b, c, d, s, t }
            }
            TermF::Pair { s, t, .. } => {
                let left = self.child_arrow(pos, s)?;
                let right = self.child_arrow(pos, t)?;
                let a = self.unify(left.source, right.source)?;
                TermF::Pair {
                    a,
                    b: left.target,
                    c: right.target,
                    s,
                    t,
                }
            }
            TermF::Disconnect { s, t, .. } => {
                let left = self.child_arrow(pos, s)?;
                let right = self.child_arrow(pos, t)?;
                let (a, b) = (self.fresh(), self.fresh());

                // s : 2^256 × a -> b × c, t : c -> d
                let word = self.table.intern(&FinalTy::two_two_n(8));
                let input = self.table.product(word, a);
                self.unify(left.source, input)?;
                let output = self.table.product(b, right.source);
                self.unify(left.target, output)?;

                TermF::Disconnect {
                    a,
                    b,
                    c: right.source,
                    d: right.target,
                    s,
                    t,
                }
            }
            TermF::Hidden(cmr) => TermF::Hidden(cmr),
            TermF::Witness { w, .. } => TermF::Witness {
                a: self.fresh(),
                b: self.fresh(),
                w,
            },
            TermF::Prim(j) => TermF::Prim(j),
        };

        self.nodes.push(typed);
        Ok(())
    }

    fn constrain_root(&mut self, root: usize, declared: &Arrow) -> Result<(), CheckError> {
        let arrow = self.nodes[root].arrow(&mut self.table)?;
        let source = self.table.intern(&declared.source);
        let target = self.table.intern(&declared.target);
        self.unify(arrow.source, source)?;
        self.unify(arrow.target, target)?;
        Ok(())
    }

    /// Close the episode: substitute and default every annotation.
    fn finish(self) -> Dag<J, FinalTy, W> {
        let mut binder = Binder::new(self.table);
        self.nodes
            .into_iter()
            .map(|node| binder.bind_node(node))
            .collect()
    }
}
