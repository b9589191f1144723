use proptest::prelude::{any, prop_oneof, Arbitrary, BoxedStrategy, Just, Strategy};

use crate::{FinalTy, Ty, Value};

#[derive(Debug, Clone, Copy)]
pub struct RecursiveParams {
    pub depth: u32,
    pub desired_size: u32,
    pub expected_branch_size: u32,
}

impl Default for RecursiveParams {
    fn default() -> Self {
        Self {
            depth: 4,
            desired_size: 32,
            expected_branch_size: 2,
        }
    }
}

fn arb_final_ty(args: RecursiveParams) -> impl Strategy<Value = FinalTy> {
    let leaf = prop_oneof![
        4 => Just(FinalTy::unit()),
        1 => (0u32..4).prop_map(FinalTy::two_two_n),
    ];

    leaf.prop_recursive(
        args.depth,
        args.desired_size,
        args.expected_branch_size,
        |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(l, r)| FinalTy::sum(l, r)),
                (inner.clone(), inner).prop_map(|(l, r)| FinalTy::product(l, r)),
            ]
        },
    )
}

impl Arbitrary for Ty<crate::TyRef> {
    type Parameters = RecursiveParams;
    type Strategy = BoxedStrategy<FinalTy>;

    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        arb_final_ty(args).boxed()
    }
}

/// Any value inhabiting `ty`.
pub fn arb_value_of(ty: &FinalTy) -> BoxedStrategy<Value> {
    match ty {
        Ty::Unit => Just(Value::Unit).boxed(),
        Ty::Sum(l, r) => {
            let left = arb_value_of(l).prop_map(Value::left);
            let right = arb_value_of(r).prop_map(Value::right);
            (any::<bool>(), left, right)
                .prop_map(|(pick_right, l, r)| if pick_right { r } else { l })
                .boxed()
        }
        Ty::Product(l, r) => (arb_value_of(l), arb_value_of(r))
            .prop_map(|(l, r)| Value::product(l, r))
            .boxed(),
    }
}

/// A type paired with one of its values.
pub fn arb_typed_value() -> impl Strategy<Value = (FinalTy, Value)> {
    any::<FinalTy>().prop_flat_map(|ty| {
        let values = arb_value_of(&ty);
        (Just(ty), values)
    })
}
