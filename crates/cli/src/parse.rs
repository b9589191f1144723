// ==============================================================================
// Text format
// ==============================================================================
//
// Programs are written one node per line, root last:
//
// ```text
// unit        # 0
// injr 1      # 1
// iden        # 2
// comp 2 1    # 3: the constant `true`
// ```
//
// Types use `1`, `2`, `2^N`, `(A + B)` and `(A * B)`.

use comb_dag::{Cmr, CmrParseError, CorePrim, Offset, RawDag, RawNode, UnknownPrimitive};
use comb_ty::FinalTy;
use miette::Diagnostic;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "dag.pest"]
struct DagParser;

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("{0}")]
    #[diagnostic(code(comb::parse::syntax))]
    Syntax(#[from] Box<pest::error::Error<Rule>>),

    #[error("line {line}: offset {text} does not fit in 64 bits")]
    #[diagnostic(code(comb::parse::offset))]
    Offset { line: usize, text: String },

    #[error("line {line}: {source}")]
    #[diagnostic(code(comb::parse::prim), help("known primitives: verify, add8, eq8, low8"))]
    Prim {
        line: usize,
        #[source]
        source: UnknownPrimitive,
    },

    #[error("line {line}: {source}")]
    #[diagnostic(code(comb::parse::cmr))]
    Cmr {
        line: usize,
        #[source]
        source: CmrParseError,
    },

    #[error("word width {0} is not a power of two")]
    #[diagnostic(code(comb::parse::width))]
    Width(String),
}

pub fn parse_program(src: &str) -> Result<RawDag<CorePrim, ()>, ParseError> {
    let pairs = DagParser::parse(Rule::program, src).map_err(Box::new)?;

    let mut dag = RawDag::default();
    for pair in pairs.flatten() {
        if let Some(node) = collect_node(pair)? {
            dag.push(node);
        }
    }
    log::debug!("parsed {} nodes", dag.len());
    Ok(dag)
}

fn collect_offset(pair: &Pair<Rule>) -> Result<Offset, ParseError> {
    pair.as_str().parse().map_err(|_| ParseError::Offset {
        line: pair.line_col().0,
        text: pair.as_str().to_string(),
    })
}

/// `None` for pairs that are not nodes (the program wrapper, node arguments, EOI).
fn collect_node(pair: Pair<Rule>) -> Result<Option<RawNode<CorePrim, ()>>, ParseError> {
    let line = pair.line_col().0;
    let rule = pair.as_rule();
    let args: Vec<Pair<Rule>> = pair.into_inner().collect();

    let node = match (rule, args.as_slice()) {
        (Rule::iden, []) => RawNode::iden(),
        (Rule::unit, []) => RawNode::unit(),
        (Rule::witness, []) => RawNode::witness(()),
        (Rule::injl, [s]) => RawNode::injl(collect_offset(s)?),
        (Rule::injr, [s]) => RawNode::injr(collect_offset(s)?),
        (Rule::take, [s]) => RawNode::take(collect_offset(s)?),
        (Rule::drop, [s]) => RawNode::drop(collect_offset(s)?),
        (Rule::comp, [s, t]) => RawNode::comp(collect_offset(s)?, collect_offset(t)?),
        (Rule::case, [s, t]) => RawNode::case(collect_offset(s)?, collect_offset(t)?),
        (Rule::pair, [s, t]) => RawNode::pair(collect_offset(s)?, collect_offset(t)?),
        (Rule::disconnect, [s, t]) => {
            RawNode::disconnect(collect_offset(s)?, collect_offset(t)?)
        }
        (Rule::hidden, [cmr]) => {
            let cmr: Cmr = cmr
                .as_str()
                .parse()
                .map_err(|source| ParseError::Cmr { line, source })?;
            RawNode::hidden(cmr)
        }
        (Rule::prim, [name]) => {
            let prim: CorePrim = name
                .as_str()
                .parse()
                .map_err(|source| ParseError::Prim { line, source })?;
            RawNode::prim(prim)
        }
        _ => return Ok(None),
    };
    Ok(Some(node))
}

pub fn parse_ty(src: &str) -> Result<FinalTy, ParseError> {
    let pairs = DagParser::parse(Rule::ty_input, src.trim()).map_err(Box::new)?;
    for pair in pairs {
        if pair.as_rule() != Rule::EOI {
            return collect_ty(pair);
        }
    }
    unreachable!("ty_input always holds one type")
}

fn collect_ty(pair: Pair<Rule>) -> Result<FinalTy, ParseError> {
    match pair.as_rule() {
        Rule::unit_ty => Ok(FinalTy::unit()),
        Rule::bit_ty => Ok(FinalTy::bit()),
        Rule::word_ty => {
            let text = pair.as_str().trim_start_matches("2^");
            text.parse()
                .ok()
                .and_then(FinalTy::word)
                .ok_or_else(|| ParseError::Width(text.to_string()))
        }
        Rule::group => {
            let mut inner = pair.into_inner();
            let (Some(left), Some(op), Some(right)) = (inner.next(), inner.next(), inner.next())
            else {
                unreachable!("group is `( ty op ty )`")
            };
            let left = collect_ty(left)?;
            let right = collect_ty(right)?;
            Ok(match op.as_rule() {
                Rule::sum_op => FinalTy::sum(left, right),
                _ => FinalTy::product(left, right),
            })
        }
        rule => unreachable!("collect_ty should not see {rule:?}"),
    }
}
