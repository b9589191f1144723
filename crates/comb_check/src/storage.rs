use union_find::{QuickFindUf, UnionByRank, UnionFind};

use comb_dag::TyBuilder;
use comb_ty::{FinalTy, Ty};
use rustc_hash::FxHashMap;

use super::TyId;

const RENDER_LIMIT: usize = 512;

/// The mutable state of one inference episode: an arena of type terms
/// joined into equivalence classes. A class root maps to its structure in
/// `types`; a root with no entry is an unbound placeholder.
#[derive(Debug, Clone)]
pub struct TypeStorage {
    pub(crate) uf: QuickFindUf<UnionByRank>,
    pub(crate) types: FxHashMap<TyId, Ty<TyId>>,
}

impl Default for TypeStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeStorage {
    pub fn new() -> Self {
        Self {
            uf: QuickFindUf::new(0),
            types: FxHashMap::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.uf.size()
    }

    pub fn find(&mut self, id: TyId) -> TyId {
        self.uf.find(id.into()).into()
    }

    /// A fresh, unbound placeholder.
    pub fn new_var(&mut self) -> TyId {
        self.uf.insert(UnionByRank::default()).into()
    }

    pub fn new_concrete(&mut self, ty: Ty<TyId>) -> TyId {
        let key = self.new_var();
        self.types.insert(key, ty);
        key
    }

    pub fn get(&mut self, id: TyId) -> Option<Ty<TyId>> {
        self.get_root_value(id).1
    }

    pub fn get_root_value(&mut self, id: TyId) -> (TyId, Option<Ty<TyId>>) {
        let root = self.find(id);
        let val = self.types.get(&root).cloned();
        (root, val)
    }

    /// Merge the classes of `lhs` and `rhs`, giving the merged class the structure `val`.
    pub(crate) fn union(&mut self, lhs: TyId, rhs: TyId, val: Option<Ty<TyId>>) -> TyId {
        let lhs = self.find(lhs);
        let rhs = self.find(rhs);
        if lhs != rhs {
            self.uf.union(lhs.into(), rhs.into());
            self.types.remove(&lhs);
            self.types.remove(&rhs);
        }
        let root = self.find(lhs);
        if let Some(val) = val {
            self.types.insert(root, val);
        }
        root
    }

    /// Fully substitute `id`, defaulting every unbound placeholder to `1`.
    /// `cache` is keyed by class root and only valid once unification is over.
    pub fn resolve(&mut self, id: TyId, cache: &mut FxHashMap<TyId, FinalTy>) -> FinalTy {
        let (root, val) = self.get_root_value(id);
        if let Some(ty) = cache.get(&root) {
            return ty.clone();
        }

        let ty = match val {
            None | Some(Ty::Unit) => FinalTy::unit(),
            Some(Ty::Sum(l, r)) => {
                let l = self.resolve(l, cache);
                let r = self.resolve(r, cache);
                FinalTy::sum(l, r)
            }
            Some(Ty::Product(l, r)) => {
                let l = self.resolve(l, cache);
                let r = self.resolve(r, cache);
                FinalTy::product(l, r)
            }
        };

        cache.insert(root, ty.clone());
        ty
    }

    /// Render `id` for error messages, showing unbound placeholders as `?N`.
    /// Types built by sharing can be exponentially large as trees, so only
    /// the first `RENDER_LIMIT` terms are printed and the rest elided as `…`.
    pub fn render(&mut self, id: TyId) -> String {
        let mut out = String::new();
        let mut budget = RENDER_LIMIT;
        self.render_into(id, &mut out, &mut budget);
        out
    }

    fn render_into(&mut self, id: TyId, out: &mut String, budget: &mut usize) {
        if *budget == 0 {
            out.push('…');
            return;
        }
        *budget -= 1;

        let (root, val) = self.get_root_value(id);
        let (l, op, r) = match val {
            None => {
                out.push_str(&format!("?{}", root.0));
                return;
            }
            Some(Ty::Unit) => {
                out.push('1');
                return;
            }
            Some(Ty::Sum(l, r)) => (l, " + ", r),
            Some(Ty::Product(l, r)) => (l, " × ", r),
        };
        out.push('(');
        self.render_into(l, out, budget);
        out.push_str(op);
        self.render_into(r, out, budget);
        out.push(')');
    }

    fn intern_shared(&mut self, ty: &FinalTy, seen: &mut FxHashMap<*const FinalTy, TyId>) -> TyId {
        let ty = ty.clone().map(|child| {
            if let Some(&id) = seen.get(&child.as_ptr()) {
                return id;
            }
            let id = self.intern_shared(&child, seen);
            seen.insert(child.as_ptr(), id);
            id
        });
        self.new_concrete(ty)
    }
}

impl TyBuilder<TyId> for TypeStorage {
    fn unit(&mut self) -> TyId {
        self.new_concrete(Ty::Unit)
    }

    fn sum(&mut self, left: TyId, right: TyId) -> TyId {
        self.new_concrete(Ty::Sum(left, right))
    }

    fn product(&mut self, left: TyId, right: TyId) -> TyId {
        self.new_concrete(Ty::Product(left, right))
    }

    /// Shared subterms of `ty` are interned once and keep sharing their `TyId`.
    fn intern(&mut self, ty: &FinalTy) -> TyId {
        self.intern_shared(ty, &mut FxHashMap::default())
    }
}
