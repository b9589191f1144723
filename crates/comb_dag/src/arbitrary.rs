// ==============================================================================
// Random DAG generation
// ==============================================================================
//
// Generated DAGs are always well formed (every child offset `r` at position
// `i` satisfies `0 < r <= i`) but are frequently ill typed. Position 0 can
// only hold a leaf.

use proptest::prelude::{any, prop, Arbitrary, BoxedStrategy, Strategy};

use crate::{Cmr, CorePrim, Offset, RawDag, RawNode};

#[derive(Debug, Clone, Copy)]
pub struct DagParams {
    pub max_len: usize,
}

impl Default for DagParams {
    fn default() -> Self {
        Self { max_len: 24 }
    }
}

/// Kind, two child seeds and a payload seed.
type NodeSeed = (u8, u32, u32, u8);

fn pick_offset(pos: usize, seed: u32) -> Offset {
    (seed as usize % pos + 1) as Offset
}

fn node_from_seed(pos: usize, (kind, s, t, payload): NodeSeed) -> RawNode<CorePrim, ()> {
    let prim = CorePrim::ALL[payload as usize % CorePrim::ALL.len()];
    let cmr = Cmr([payload; 32]);
    if pos == 0 {
        return match kind % 5 {
            0 => RawNode::iden(),
            1 => RawNode::unit(),
            2 => RawNode::witness(()),
            3 => RawNode::prim(prim),
            _ => RawNode::hidden(cmr),
        };
    }

    let s = pick_offset(pos, s);
    let t = pick_offset(pos, t);
    match kind % 13 {
        0 => RawNode::iden(),
        1 => RawNode::unit(),
        2 => RawNode::injl(s),
        3 => RawNode::injr(s),
        4 => RawNode::take(s),
        5 => RawNode::drop(s),
        6 => RawNode::comp(s, t),
        7 => RawNode::case(s, t),
        8 => RawNode::pair(s, t),
        9 => RawNode::disconnect(s, t),
        10 => RawNode::witness(()),
        11 => RawNode::prim(prim),
        _ => RawNode::hidden(cmr),
    }
}

pub fn arb_raw_dag(params: DagParams) -> impl Strategy<Value = RawDag<CorePrim, ()>> {
    prop::collection::vec(any::<NodeSeed>(), 1..=params.max_len.max(1)).prop_map(|seeds| {
        seeds
            .into_iter()
            .enumerate()
            .map(|(pos, seed)| node_from_seed(pos, seed))
            .collect()
    })
}

impl Arbitrary for RawDag<CorePrim, ()> {
    type Parameters = DagParams;
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        arb_raw_dag(args).boxed()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::{prop_assert, proptest};

    use super::*;

    proptest! {
        #[test]
        fn generated_dags_are_well_formed(dag in any::<RawDag<CorePrim, ()>>()) {
            prop_assert!(!dag.is_empty());
            prop_assert!(dag.validate().is_ok());
        }
    }
}
