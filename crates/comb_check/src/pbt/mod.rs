// ==============================================================================
// Property-Based Tests for Inference and Type Checking
// ==============================================================================
//
// Random DAGs come from comb_dag's generator: always well formed, usually ill
// typed. The properties are about the pipeline as a whole:
// - a well formed DAG never produces an index error and never panics
// - running the pipeline twice gives the same result
// - a program that infers also type checks (hidden misuse and short witness
//   streams aside), and its expression survives a trip through `to_dag`
//
// Known limitations:
// - Most generated DAGs fail inference early, so the round trip properties
//   only see small programs. Keeping `max_len` low keeps the types small;
//   repeated `pair n n` doubles a type per node.

use std::sync::Arc;

use comb_dag::{arbitrary::DagParams, ConcreteTys, CorePrim, RawDag};
use comb_ty::{Arrow, BitIter};
use proptest::prelude::{any_with, prop_assert, prop_assert_eq, proptest, ProptestConfig};

use crate::{decode_witnesses_from_bits, infer, typecheck, CheckError, Expr, LocatedError};

const WITNESS_BYTES: [u8; 4096] = [0; 4096];

fn params() -> DagParams {
    DagParams { max_len: 12 }
}

/// Infer without a declared arrow, then check against whatever the root got.
fn run_pipeline(dag: RawDag<CorePrim, ()>) -> Result<(Arrow, Arc<Expr<CorePrim>>), LocatedError> {
    let typed = infer(dag, None)?;
    let root = typed.len() - 1;
    let arrow = typed[root]
        .arrow(&mut ConcreteTys)
        .map_err(|e| LocatedError::at(root, e))?;
    let decoded = decode_witnesses_from_bits(typed, &mut BitIter::new(&WITNESS_BYTES))?;
    let expr = typecheck(&decoded, &arrow)?;
    Ok((arrow, expr))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 512, .. ProptestConfig::default()
    })]

    #[test]
    fn well_formed_dags_never_misindex(dag in any_with::<RawDag<CorePrim, ()>>(params())) {
        if let Err(err) = infer(dag, None) {
            prop_assert!(
                !matches!(
                    err.error,
                    CheckError::IndexOutOfRange { .. } | CheckError::OffsetOverflow { .. }
                ),
                "unexpected {err}"
            );
        }
    }

    #[test]
    fn pipeline_is_deterministic(dag in any_with::<RawDag<CorePrim, ()>>(params())) {
        let first = run_pipeline(dag.clone());
        let second = run_pipeline(dag);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn inferred_programs_type_check(dag in any_with::<RawDag<CorePrim, ()>>(params())) {
        if let Err(err) = run_pipeline(dag) {
            prop_assert!(
                matches!(
                    err.error,
                    CheckError::TypeMismatch { .. }
                        | CheckError::Occurs { .. }
                        | CheckError::HiddenArrow
                        | CheckError::IllegalHidden
                        | CheckError::Decode(_)
                ),
                "inference accepted a program type checking rejected: {err}"
            );
        }
    }

    #[test]
    fn expressions_survive_to_dag(dag in any_with::<RawDag<CorePrim, ()>>(params())) {
        if let Ok((arrow, expr)) = run_pipeline(dag) {
            let flat = expr.to_dag();
            prop_assert!(flat.validate().is_ok());
            prop_assert_eq!(typecheck(&flat, &arrow), Ok(expr));
        }
    }
}
