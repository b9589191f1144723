// ==============================================================================
// Binding / defaulting
// ==============================================================================
//
// The only exit from an inference episode. Consumes the TypeStorage and
// replaces every TyId annotation with its fully substituted FinalTy;
// placeholders still unbound become `1`.

use comb_dag::DagNode;
use comb_ty::FinalTy;
use rustc_hash::FxHashMap;

use super::TyId;
use crate::storage::TypeStorage;

pub(crate) struct Binder {
    table: TypeStorage,
    cache: FxHashMap<TyId, FinalTy>,
}

impl Binder {
    pub(crate) fn new(table: TypeStorage) -> Self {
        Self {
            table,
            cache: FxHashMap::default(),
        }
    }

    pub(crate) fn bind(&mut self, id: TyId) -> FinalTy {
        self.table.resolve(id, &mut self.cache)
    }

    pub(crate) fn bind_node<J, W>(&mut self, node: DagNode<J, TyId, W>) -> DagNode<J, FinalTy, W> {
        node.map_tys(|id| self.bind(id))
    }
}

#[cfg(test)]
mod tests {
    use comb_dag::{CorePrim, TermF, TyBuilder};

    use super::*;

    #[test]
    fn binds_every_annotation() {
        let mut table = TypeStorage::new();
        let a = table.new_var();
        let b = table.intern(&FinalTy::bit());
        let c = table.new_var();
        let node: DagNode<CorePrim, TyId, ()> = TermF::Injl { a, b, c, s: 1 };

        let mut binder = Binder::new(table);
        let bound = binder.bind_node(node);
        assert_eq!(
            bound,
            TermF::Injl {
                a: FinalTy::unit(),
                b: FinalTy::bit(),
                c: FinalTy::unit(),
                s: 1,
            }
        );
    }

    #[test]
    fn unified_ids_bind_alike() {
        let mut table = TypeStorage::new();
        let a = table.new_var();
        let word = table.intern(&FinalTy::word(8).unwrap());
        table.unify(a, word).unwrap();

        let mut binder = Binder::new(table);
        let first = binder.bind(a);
        let second = binder.bind(word);
        assert_eq!(first, second);
        assert_eq!(first, FinalTy::word(8).unwrap());
    }
}
