// ==============================================================================
// Well-typed expressions
// ==============================================================================
//
// An `Expr` can only be built through `from_term`, `assertl` and `assertr`,
// which check every child's arrow against the node's own annotations. Holding
// an `Arc<Expr<J>>` is therefore proof that the whole subtree type checks.
// Shared subexpressions stay shared: children are `Arc`s.

use std::sync::Arc;

use comb_dag::{Cmr, ConcreteTys, Dag, DagNode, Primitive, TermF};
use comb_ty::{Arrow, CastError, FinalTy, Value};
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("{combinator}: child {child} has type {found}, expected {expected}")]
    ChildMismatch {
        combinator: &'static str,
        child: &'static str,
        expected: Arrow,
        found: Arrow,
    },
    #[error("witness: {0}")]
    Witness(#[from] CastError),
    #[error("a hidden node is not an expression")]
    Hidden,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprNode<J> {
    Term(TermF<J, FinalTy, Value, Arc<Expr<J>>>),
    /// A case whose right branch is pruned; only its commitment remains.
    AssertL {
        a: FinalTy,
        b: FinalTy,
        c: FinalTy,
        d: FinalTy,
        s: Arc<Expr<J>>,
        t: Cmr,
    },
    /// A case whose left branch is pruned.
    AssertR {
        a: FinalTy,
        b: FinalTy,
        c: FinalTy,
        d: FinalTy,
        s: Cmr,
        t: Arc<Expr<J>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Expr<J> {
    arrow: Arrow,
    node: ExprNode<J>,
}

fn expect_child<J>(
    combinator: &'static str,
    child: &'static str,
    expr: &Expr<J>,
    expected: Arrow,
) -> Result<(), TypeError> {
    if expr.arrow == expected {
        Ok(())
    } else {
        Err(TypeError::ChildMismatch {
            combinator,
            child,
            expected,
            found: expr.arrow.clone(),
        })
    }
}

fn case_arrow(a: &FinalTy, b: &FinalTy, c: &FinalTy, d: &FinalTy) -> Arrow {
    Arrow::new(
        FinalTy::product(FinalTy::sum(a.clone(), b.clone()), c.clone()),
        d.clone(),
    )
}

impl<J> Expr<J> {
    pub fn arrow(&self) -> &Arrow {
        &self.arrow
    }

    pub fn source(&self) -> &FinalTy {
        &self.arrow.source
    }

    pub fn target(&self) -> &FinalTy {
        &self.arrow.target
    }

    pub fn node(&self) -> &ExprNode<J> {
        &self.node
    }
}

impl<J: Primitive> Expr<J> {
    /// Build a node from annotated parts, checking that each child's arrow
    /// is the one the combinator requires of it.
    pub fn from_term(
        term: TermF<J, FinalTy, Value, Arc<Expr<J>>>,
    ) -> Result<Arc<Self>, TypeError> {
        let name = term.name();
        let term = match term {
            TermF::Injl { a, b, c, s } => {
                expect_child(name, "s", &s, Arrow::new(a.clone(), b.clone()))?;
                TermF::Injl { a, b, c, s }
            }
            TermF::Injr { a, b, c, s } => {
                expect_child(name, "s", &s, Arrow::new(a.clone(), c.clone()))?;
                TermF::Injr { a, b, c, s }
            }
            TermF::Take { a, b, c, s } => {
                expect_child(name, "s", &s, Arrow::new(a.clone(), c.clone()))?;
                TermF::Take { a, b, c, s }
            }
            TermF::Drop { a, b, c, s } => {
                expect_child(name, "s", &s, Arrow::new(b.clone(), c.clone()))?;
                TermF::Drop { a, b, c, s }
            }
            TermF::Comp { a, b, c, s, t } => {
                expect_child(name, "s", &s, Arrow::new(a.clone(), b.clone()))?;
                expect_child(name, "t", &t, Arrow::new(b.clone(), c.clone()))?;
                TermF::Comp { a, b, c, s, t }
            }
            TermF::Case { a, b, c, d, s, t } => {
                let left_in = FinalTy::product(a.clone(), c.clone());
                expect_child(name, "s", &s, Arrow::new(left_in, d.clone()))?;
                let right_in = FinalTy::product(b.clone(), c.clone());
                expect_child(name, "t", &t, Arrow::new(right_in, d.clone()))?;
                TermF::Case { a, b, c, d, s, t }
            }
            TermF::Pair { a, b, c, s, t } => {
                expect_child(name, "s", &s, Arrow::new(a.clone(), b.clone()))?;
                expect_child(name, "t", &t, Arrow::new(a.clone(), c.clone()))?;
                TermF::Pair { a, b, c, s, t }
            }
            TermF::Disconnect { a, b, c, d, s, t } => {
                let input = FinalTy::product(FinalTy::two_two_n(8), a.clone());
                let output = FinalTy::product(b.clone(), c.clone());
                expect_child(name, "s", &s, Arrow::new(input, output))?;
                expect_child(name, "t", &t, Arrow::new(c.clone(), d.clone()))?;
                TermF::Disconnect { a, b, c, d, s, t }
            }
            TermF::Witness { a, b, w } => {
                let w = w.cast(&b)?;
                TermF::Witness { a, b, w }
            }
            TermF::Hidden(_) => return Err(TypeError::Hidden),
            leaf @ (TermF::Iden { .. } | TermF::Unit { .. } | TermF::Prim(_)) => leaf,
        };
        let arrow = term.arrow(&mut ConcreteTys).map_err(|_| TypeError::Hidden)?;
        Ok(Arc::new(Expr {
            arrow,
            node: ExprNode::Term(term),
        }))
    }

    /// `case s (hidden t)`: only the left branch can run.
    pub fn assertl(
        a: FinalTy,
        b: FinalTy,
        c: FinalTy,
        d: FinalTy,
        s: Arc<Self>,
        t: Cmr,
    ) -> Result<Arc<Self>, TypeError> {
        let left_in = FinalTy::product(a.clone(), c.clone());
        expect_child("assertl", "s", &s, Arrow::new(left_in, d.clone()))?;
        Ok(Arc::new(Expr {
            arrow: case_arrow(&a, &b, &c, &d),
            node: ExprNode::AssertL { a, b, c, d, s, t },
        }))
    }

    /// `case (hidden s) t`: only the right branch can run.
    pub fn assertr(
        a: FinalTy,
        b: FinalTy,
        c: FinalTy,
        d: FinalTy,
        s: Cmr,
        t: Arc<Self>,
    ) -> Result<Arc<Self>, TypeError> {
        let right_in = FinalTy::product(b.clone(), c.clone());
        expect_child("assertr", "t", &t, Arrow::new(right_in, d.clone()))?;
        Ok(Arc::new(Expr {
            arrow: case_arrow(&a, &b, &c, &d),
            node: ExprNode::AssertR { a, b, c, d, s, t },
        }))
    }
}

/// A leaf that owns nothing, left behind when a node's children are moved out.
fn empty_node<J>() -> ExprNode<J> {
    ExprNode::Term(TermF::Unit { a: FinalTy::unit() })
}

fn into_children<J>(node: ExprNode<J>, out: &mut Vec<Arc<Expr<J>>>) {
    match node {
        ExprNode::Term(term) => {
            term.map_children(|child| out.push(child));
        }
        ExprNode::AssertL { s, .. } => out.push(s),
        ExprNode::AssertR { t, .. } => out.push(t),
    }
}

// Chains can be far deeper than the call stack; release them with a worklist.
impl<J> Drop for Expr<J> {
    fn drop(&mut self) {
        let mut stack = Vec::new();
        into_children(std::mem::replace(&mut self.node, empty_node()), &mut stack);
        while let Some(child) = stack.pop() {
            if let Some(mut expr) = Arc::into_inner(child) {
                into_children(std::mem::replace(&mut expr.node, empty_node()), &mut stack);
            }
        }
    }
}

// ==============================================================================
// Flattening
// ==============================================================================

enum Visit<'a, J> {
    Enter(&'a Arc<Expr<J>>),
    /// Emit the pruned branch of an assert.
    Hidden(&'a Arc<Expr<J>>, Cmr),
    Exit(&'a Arc<Expr<J>>),
}

impl<J: Clone> Expr<J> {
    /// Flatten back into an annotated DAG. Each distinct `Arc` becomes one
    /// node; pruned branches of asserts become `hidden` nodes.
    pub fn to_dag(self: &Arc<Self>) -> Dag<J, FinalTy, Value> {
        let mut flat = Flattener {
            nodes: Vec::new(),
            seen: FxHashMap::default(),
            hidden: FxHashMap::default(),
        };

        let mut stack = vec![Visit::Enter(self)];
        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(expr) => {
                    if flat.seen.contains_key(&Arc::as_ptr(expr)) {
                        continue;
                    }
                    stack.push(Visit::Exit(expr));
                    // Reversed, so the left child is emitted first.
                    match &expr.node {
                        ExprNode::Term(term) => {
                            let (s, t) = term.children();
                            stack.extend(t.map(Visit::Enter));
                            stack.extend(s.map(Visit::Enter));
                        }
                        ExprNode::AssertL { s, t, .. } => {
                            stack.push(Visit::Hidden(expr, *t));
                            stack.push(Visit::Enter(s));
                        }
                        ExprNode::AssertR { s, t, .. } => {
                            stack.push(Visit::Enter(t));
                            stack.push(Visit::Hidden(expr, *s));
                        }
                    }
                }
                Visit::Hidden(expr, cmr) => {
                    let pos = flat.push(TermF::Hidden(cmr));
                    flat.hidden.insert(Arc::as_ptr(expr), pos);
                }
                Visit::Exit(expr) => flat.exit(expr),
            }
        }
        Dag::new(flat.nodes)
    }
}

struct Flattener<J> {
    nodes: Vec<DagNode<J, FinalTy, Value>>,
    /// Position of every expression already emitted.
    seen: FxHashMap<*const Expr<J>, usize>,
    /// Position of the hidden node emitted for an assert.
    hidden: FxHashMap<*const Expr<J>, usize>,
}

impl<J: Clone> Flattener<J> {
    fn push(&mut self, node: TermF<J, FinalTy, Value, usize>) -> usize {
        let pos = self.nodes.len();
        self.nodes.push(node.map_children(|idx| (pos - idx) as u64));
        pos
    }

    /// Emit `expr`; its children and pruned branch are already emitted.
    fn exit(&mut self, expr: &Arc<Expr<J>>) {
        let key = Arc::as_ptr(expr);
        let pos = match &expr.node {
            ExprNode::Term(term) => {
                let term = term
                    .clone()
                    .map_children(|child| self.seen[&Arc::as_ptr(&child)]);
                self.push(term)
            }
            ExprNode::AssertL { a, b, c, d, s, .. } => {
                let case = TermF::Case {
                    a: a.clone(),
                    b: b.clone(),
                    c: c.clone(),
                    d: d.clone(),
                    s: self.seen[&Arc::as_ptr(s)],
                    t: self.hidden[&key],
                };
                self.push(case)
            }
            ExprNode::AssertR { a, b, c, d, t, .. } => {
                let case = TermF::Case {
                    a: a.clone(),
                    b: b.clone(),
                    c: c.clone(),
                    d: d.clone(),
                    s: self.hidden[&key],
                    t: self.seen[&Arc::as_ptr(t)],
                };
                self.push(case)
            }
        };
        self.seen.insert(key, pos);
    }
}

#[cfg(test)]
mod tests {
    use comb_dag::CorePrim;

    use super::*;

    type E = Arc<Expr<CorePrim>>;

    fn iden(a: FinalTy) -> E {
        Expr::from_term(TermF::Iden { a }).unwrap()
    }

    fn unit(a: FinalTy) -> E {
        Expr::from_term(TermF::Unit { a }).unwrap()
    }

    #[test]
    fn comp_links_middle_type() {
        let one = FinalTy::unit();
        let bit = FinalTy::bit();
        let s = unit(one.clone());
        let t = Expr::from_term(TermF::Injr {
            a: one.clone(),
            b: one.clone(),
            c: one.clone(),
            s: iden(one.clone()),
        })
        .unwrap();
        let comp = Expr::from_term(TermF::Comp {
            a: one.clone(),
            b: one.clone(),
            c: bit.clone(),
            s,
            t,
        })
        .unwrap();
        assert_eq!(comp.arrow(), &Arrow::new(one, bit));
    }

    #[test]
    fn comp_rejects_mismatched_child() {
        let one = FinalTy::unit();
        let err = Expr::from_term(TermF::Comp {
            a: one.clone(),
            b: FinalTy::bit(),
            c: one.clone(),
            s: unit(one.clone()),
            t: unit(FinalTy::bit()),
        })
        .unwrap_err();
        assert_eq!(
            err,
            TypeError::ChildMismatch {
                combinator: "comp",
                child: "s",
                expected: Arrow::new(one.clone(), FinalTy::bit()),
                found: Arrow::new(one.clone(), one),
            }
        );
    }

    #[test]
    fn witness_value_must_inhabit_output() {
        let err = Expr::<CorePrim>::from_term(TermF::Witness {
            a: FinalTy::unit(),
            b: FinalTy::bit(),
            w: Value::Unit,
        })
        .unwrap_err();
        assert!(matches!(err, TypeError::Witness(_)));
    }

    #[test]
    fn hidden_is_not_an_expression() {
        let err = Expr::<CorePrim>::from_term(TermF::Hidden(Cmr([0; 32]))).unwrap_err();
        assert_eq!(err, TypeError::Hidden);
    }

    #[test]
    fn disconnect_requires_word_prefix() {
        let one = FinalTy::unit();
        let word = FinalTy::two_two_n(8);
        let s = iden(FinalTy::product(word.clone(), one.clone()));
        let t = iden(one.clone());
        let expr = Expr::from_term(TermF::Disconnect {
            a: one.clone(),
            b: word.clone(),
            c: one.clone(),
            d: one.clone(),
            s,
            t: t.clone(),
        })
        .unwrap();
        assert_eq!(
            expr.arrow(),
            &Arrow::new(one.clone(), FinalTy::product(word, one.clone()))
        );

        let err = Expr::from_term(TermF::Disconnect {
            a: one.clone(),
            b: one.clone(),
            c: one.clone(),
            d: one.clone(),
            s: t.clone(),
            t,
        })
        .unwrap_err();
        assert!(matches!(err, TypeError::ChildMismatch { child: "s", .. }));
    }

    #[test]
    fn to_dag_shares_nodes_and_hides_pruned_branch() {
        let one = FinalTy::unit();
        let bit = FinalTy::bit();
        let body = Expr::from_term(TermF::Take {
            a: one.clone(),
            b: one.clone(),
            c: one.clone(),
            s: unit(one.clone()),
        })
        .unwrap();
        let cmr = Cmr([7; 32]);
        let assert = Expr::assertl(one.clone(), one.clone(), one.clone(), one.clone(), body, cmr).unwrap();
        assert_eq!(
            assert.arrow(),
            &Arrow::new(FinalTy::product(bit, one.clone()), one.clone())
        );

        let pair_in = FinalTy::product(FinalTy::bit(), one.clone());
        let pair = Expr::from_term(TermF::Pair {
            a: pair_in,
            b: one.clone(),
            c: one.clone(),
            s: assert.clone(),
            t: assert,
        })
        .unwrap();

        let dag = pair.to_dag();
        let shown: Vec<String> = dag.iter().map(|n| n.to_string()).collect();
        assert_eq!(
            shown,
            vec![
                "unit".to_string(),
                "take 1".to_string(),
                format!("hidden {cmr}"),
                "case 2 1".to_string(),
                "pair 1 1".to_string(),
            ]
        );
    }

    #[test]
    fn deep_chains_flatten_and_drop() {
        let one = FinalTy::unit();
        let mut expr = iden(one.clone());
        for _ in 0..200_000 {
            expr = Expr::from_term(TermF::Comp {
                a: one.clone(),
                b: one.clone(),
                c: one.clone(),
                s: expr.clone(),
                t: expr,
            })
            .unwrap();
        }

        let dag = expr.to_dag();
        assert_eq!(dag.len(), 200_001);
        assert_eq!(dag[0].to_string(), "iden");
        assert_eq!(dag[200_000].to_string(), "comp 1 1");
        drop(expr);
    }
}
