// ==============================================================================
// Type checking
// ==============================================================================
//
// Rebuilds an annotated DAG bottom-up as an `Expr`, verifying every node's
// annotations against its children. Hidden nodes are kept aside as bare
// commitments and only accepted as exactly one branch of a case.

use std::sync::Arc;

use comb_dag::{resolve_offset, Cmr, Dag, DagNode, Offset, Primitive, TermF};
use comb_ty::{Arrow, FinalTy, Value};

use super::{CheckError, Expr, LocatedError};

enum Built<J> {
    Hidden(Cmr),
    Expr(Arc<Expr<J>>),
}

/// Check a fully annotated DAG with decoded witnesses and return its root
/// expression, which must have type `arrow`.
pub fn typecheck<J: Primitive>(
    dag: &Dag<J, FinalTy, Value>,
    arrow: &Arrow,
) -> Result<Arc<Expr<J>>, LocatedError> {
    let Some(root) = dag.len().checked_sub(1) else {
        return Err(LocatedError::empty_dag());
    };

    let mut built: Vec<Built<J>> = Vec::with_capacity(dag.len());
    for (pos, node) in dag.iter().enumerate() {
        let entry = build_node(&built, pos, node).map_err(|e| LocatedError::at(pos, e))?;
        built.push(entry);
    }
    check_hidden_uses(dag, &built)?;

    let expr = match built.pop() {
        Some(Built::Expr(expr)) => expr,
        _ => return Err(LocatedError::at(root, CheckError::IllegalHidden)),
    };
    if expr.arrow() != arrow {
        return Err(LocatedError::at(
            root,
            CheckError::TerminalMismatch {
                expected: arrow.clone(),
                found: expr.arrow().clone(),
            },
        ));
    }

    log::debug!("type checked {} nodes: {}", dag.len(), expr.arrow());
    Ok(expr)
}

/// A hidden node stands in for a pruned case branch, so one that no case
/// refers to is an illegal use.
fn check_hidden_uses<J, Ty, W>(dag: &Dag<J, Ty, W>, built: &[Built<J>]) -> Result<(), LocatedError> {
    let mut pruned = vec![false; dag.len()];
    for (pos, node) in dag.iter().enumerate() {
        if let TermF::Case { s, t, .. } = node {
            for offset in [*s, *t] {
                if let Ok(idx) = resolve_offset(pos, offset) {
                    pruned[idx] = true;
                }
            }
        }
    }

    let orphan = built
        .iter()
        .zip(&pruned)
        .position(|(entry, &pruned)| matches!(entry, Built::Hidden(_)) && !pruned);
    match orphan {
        Some(pos) => Err(LocatedError::at(pos, CheckError::IllegalHidden)),
        None => Ok(()),
    }
}

fn lookup<J>(built: &[Built<J>], pos: usize, offset: Offset) -> Result<&Built<J>, CheckError> {
    let idx = resolve_offset(pos, offset)?;
    Ok(&built[idx])
}

fn child<J>(built: &[Built<J>], pos: usize, offset: Offset) -> Result<Arc<Expr<J>>, CheckError> {
    match lookup(built, pos, offset)? {
        Built::Expr(expr) => Ok(expr.clone()),
        Built::Hidden(_) => Err(CheckError::IllegalHidden),
    }
}

fn build_node<J: Primitive>(
    built: &[Built<J>],
    pos: usize,
    node: &DagNode<J, FinalTy, Value>,
) -> Result<Built<J>, CheckError> {
    let expr = match node {
        TermF::Hidden(cmr) => return Ok(Built::Hidden(*cmr)),
        TermF::Case { a, b, c, d, s, t } => {
            let (a, b, c, d) = (a.clone(), b.clone(), c.clone(), d.clone());
            match (lookup(built, pos, *s)?, lookup(built, pos, *t)?) {
                (Built::Hidden(_), Built::Hidden(_)) => return Err(CheckError::IllegalHidden),
                (Built::Hidden(cmr), Built::Expr(t)) => Expr::assertr(a, b, c, d, *cmr, t.clone())?,
                (Built::Expr(s), Built::Hidden(cmr)) => Expr::assertl(a, b, c, d, s.clone(), *cmr)?,
                (Built::Expr(s), Built::Expr(t)) => Expr::from_term(TermF::Case {
                    a,
                    b,
                    c,
                    d,
                    s: s.clone(),
                    t: t.clone(),
                })?,
            }
        }
        _ => {
            let term = node
                .clone()
                .try_map_children(|offset| child(built, pos, offset))?;
            Expr::from_term(term)?
        }
    };
    Ok(Built::Expr(expr))
}
