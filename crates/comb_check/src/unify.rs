// ==============================================================================
// Structural unification with occurs check
// ==============================================================================
//
// Equality constraints over a finite, non-recursive grammar:
// - 1 = 1
// - Sum(a, b) = Sum(c, d) iff a = c and b = d (same for Product)
// - a placeholder unifies with anything by joining its class, unless it
//   occurs inside the other side
// Failures are not recoverable; the episode is abandoned.

use comb_ty::Ty;
use rustc_hash::FxHashSet;

use super::TyId;
use crate::storage::TypeStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnifyError {
    /// Two structures with different constructors.
    Mismatch(TyId, TyId),
    /// The placeholder would have to contain the structure itself.
    Occurs { var: TyId, ty: TyId },
}

impl TypeStorage {
    /// Make `lhs` and `rhs` equal, returning the root of the merged class.
    pub fn unify(&mut self, lhs: TyId, rhs: TyId) -> Result<TyId, UnifyError> {
        let (lhs, lhs_val) = self.get_root_value(lhs);
        let (rhs, rhs_val) = self.get_root_value(rhs);

        if lhs == rhs {
            return Ok(lhs);
        }

        match (lhs_val, rhs_val) {
            (None, None) => Ok(self.union(lhs, rhs, None)),
            (None, Some(ty)) => self.bind_var(lhs, rhs, ty),
            (Some(ty), None) => self.bind_var(rhs, lhs, ty),
            (Some(Ty::Unit), Some(Ty::Unit)) => Ok(self.union(lhs, rhs, Some(Ty::Unit))),
            // Children first: merging the outer classes before their
            // children are equal could tie a class into its own structure.
            (Some(Ty::Sum(l1, r1)), Some(Ty::Sum(l2, r2))) => {
                self.unify(l1, l2)?;
                self.unify(r1, r2)?;
                Ok(self.union(lhs, rhs, Some(Ty::Sum(l1, r1))))
            }
            (Some(Ty::Product(l1, r1)), Some(Ty::Product(l2, r2))) => {
                self.unify(l1, l2)?;
                self.unify(r1, r2)?;
                Ok(self.union(lhs, rhs, Some(Ty::Product(l1, r1))))
            }
            (Some(_), Some(_)) => Err(UnifyError::Mismatch(lhs, rhs)),
        }
    }

    fn bind_var(&mut self, var: TyId, ty_id: TyId, ty: Ty<TyId>) -> Result<TyId, UnifyError> {
        if self.occurs_in(var, &ty) {
            return Err(UnifyError::Occurs { var, ty: ty_id });
        }
        Ok(self.union(var, ty_id, Some(ty)))
    }

    /// Whether the class of `var` appears anywhere below `ty`. Each class is
    /// visited once, so shared structure costs its number of distinct classes.
    fn occurs_in(&mut self, var: TyId, ty: &Ty<TyId>) -> bool {
        let mut seen = FxHashSet::default();
        let mut stack: Vec<TyId> = ty.children().map(|(&l, &r)| vec![l, r]).unwrap_or_default();
        while let Some(child) = stack.pop() {
            let (root, val) = self.get_root_value(child);
            if root == var {
                return true;
            }
            if !seen.insert(root) {
                continue;
            }
            if let Some((&l, &r)) = val.as_ref().and_then(Ty::children) {
                stack.extend([l, r]);
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use comb_dag::TyBuilder;
    use comb_ty::FinalTy;
    use rustc_hash::FxHashMap;

    use super::*;

    fn resolve(table: &mut TypeStorage, id: TyId) -> FinalTy {
        table.resolve(id, &mut FxHashMap::default())
    }

    #[test]
    fn var_takes_structure() {
        let mut table = TypeStorage::new();
        let var = table.new_var();
        let bit = table.intern(&FinalTy::bit());

        let root = table.unify(var, bit).unwrap();
        assert_eq!(table.find(var), root);
        assert_eq!(resolve(&mut table, var), FinalTy::bit());
    }

    #[test]
    fn structure_unifies_componentwise() {
        let mut table = TypeStorage::new();
        let (a, b) = (table.new_var(), table.new_var());
        let unit = table.unit();
        let lhs = table.sum(a, unit);
        let bit = table.intern(&FinalTy::bit());
        let rhs = table.sum(bit, b);

        table.unify(lhs, rhs).unwrap();
        assert_eq!(resolve(&mut table, a), FinalTy::bit());
        assert_eq!(resolve(&mut table, b), FinalTy::unit());
    }

    #[test]
    fn constructor_clash() {
        let mut table = TypeStorage::new();
        let unit = table.unit();
        let bit = table.intern(&FinalTy::bit());
        assert_eq!(table.unify(unit, bit), Err(UnifyError::Mismatch(unit, bit)));
    }

    #[test]
    fn occurs_check_fails() {
        let mut table = TypeStorage::new();
        let a = table.new_var();
        let unit = table.unit();
        let sum = table.product(a, unit);
        assert_eq!(
            table.unify(a, sum),
            Err(UnifyError::Occurs { var: a, ty: sum })
        );
    }

    #[test]
    fn occurs_check_sees_through_bound_vars() {
        let mut table = TypeStorage::new();
        let (a, b) = (table.new_var(), table.new_var());
        let unit = table.unit();
        let wrapped_b = table.sum(b, unit);
        table.unify(a, wrapped_b).unwrap();

        // b := (a × 1) would make a = ((a × 1) + 1)
        let wrapped_a = table.product(a, unit);
        assert!(matches!(
            table.unify(b, wrapped_a),
            Err(UnifyError::Occurs { .. })
        ));
    }

    #[test]
    fn structure_inside_itself_fails() {
        let mut table = TypeStorage::new();
        let (a, b, c) = (table.new_var(), table.new_var(), table.new_var());
        let inner = table.sum(a, b);
        let outer = table.sum(inner, c);
        assert!(matches!(
            table.unify(outer, inner),
            Err(UnifyError::Occurs { .. })
        ));
    }

    #[test]
    fn unbound_defaults_to_unit() {
        let mut table = TypeStorage::new();
        let a = table.new_var();
        let pair = table.product(a, a);
        assert_eq!(
            resolve(&mut table, pair),
            FinalTy::product(FinalTy::unit(), FinalTy::unit())
        );
        assert_eq!(table.render(pair), format!("(?{0} × ?{0})", table.find(a).0));
    }
}
