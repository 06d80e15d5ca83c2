// Constraint language of the solver: the as-declared relation between two
// types, the atomic per-variable constraints it decomposes into, and the
// per-variable constraint lists the storage owns.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    position::ConstraintPosition,
    ty::{ty_hash, Ty, TyVar, TypeVariable},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintKind {
    Lower,
    Upper,
    Equality,
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintKind::Lower => write!(f, ":>"),
            ConstraintKind::Upper => write!(f, "<:"),
            ConstraintKind::Equality => write!(f, "=="),
        }
    }
}

/// The as-declared relation between two types, before decomposition into
/// atomic per-variable constraints. Kept for diagnostics and for rollback
/// bookkeeping. For `Upper` the relation reads `a <: b`; for `Equality`,
/// `a == b`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InitialConstraint {
    pub a: Ty,
    pub b: Ty,
    pub kind: ConstraintKind,
    pub position: ConstraintPosition,
}

impl std::fmt::Display for InitialConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {} from {}", self.a, self.kind, self.b, self.position)
    }
}

/// Position attached to every atomic constraint: the initial constraint it
/// was decomposed or incorporated from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncorporationConstraintPosition {
    pub initial: InitialConstraint,
    pub is_from_declared_upper_bound: bool,
}

impl IncorporationConstraintPosition {
    pub fn new(initial: InitialConstraint) -> Self {
        IncorporationConstraintPosition {
            initial,
            is_from_declared_upper_bound: false,
        }
    }

    /// The originating position of the initial constraint.
    #[inline(always)]
    pub fn from(&self) -> &ConstraintPosition {
        &self.initial.position
    }
}

impl std::fmt::Display for IncorporationConstraintPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "incorporate({})", self.initial)
    }
}

/// One directional (or equality) relation between a variable and a type.
///
/// `derived_from` records which other variables' constraints produced this
/// one through incorporation. It deliberately does not participate in
/// equality or hashing: two constraints of identical shape arrived at
/// through different derivations are the same constraint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub ty: Ty,
    pub position: IncorporationConstraintPosition,
    pub derived_from: BTreeSet<TyVar>,
    pub is_nullability_constraint: bool,
    pub ty_hash: u64,
}

impl Constraint {
    pub fn new(
        kind: ConstraintKind,
        ty: Ty,
        position: IncorporationConstraintPosition,
        derived_from: BTreeSet<TyVar>,
        is_nullability_constraint: bool,
    ) -> Constraint {
        let ty_hash = ty_hash(&ty);
        Constraint {
            kind,
            ty,
            position,
            derived_from,
            is_nullability_constraint,
            ty_hash,
        }
    }

    pub fn initial(kind: ConstraintKind, ty: Ty, position: IncorporationConstraintPosition) -> Constraint {
        Constraint::new(kind, ty, position, BTreeSet::new(), false)
    }

    /// Rebuild this constraint with a different type, refreshing the cached
    /// type hash.
    pub fn replace_ty(&self, ty: Ty) -> Constraint {
        Constraint::new(
            self.kind,
            ty,
            self.position.clone(),
            self.derived_from.clone(),
            self.is_nullability_constraint,
        )
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.ty_hash == other.ty_hash
            && self.position == other.position
            && self.ty == other.ty
    }
}

impl Eq for Constraint {}

impl std::hash::Hash for Constraint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.ty_hash.hash(state);
        self.position.hash(state);
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.ty)
    }
}

/// One branch of a fork point: the constraint set that would satisfy the
/// forked relation if this branch is chosen.
pub type ForkPointBranch = Vec<(TyVar, Constraint)>;

/// All branches of a single fork point, in declaration order. Resolution is
/// first-fit over this order.
pub type ForkPointData = Vec<ForkPointBranch>;

/// A type variable together with its accumulated constraints, in insertion
/// order (later constraints may be derived from earlier ones).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableWithConstraints {
    pub variable: TypeVariable,
    constraints: Vec<Constraint>,
}

impl VariableWithConstraints {
    pub fn new(variable: TypeVariable) -> Self {
        VariableWithConstraints {
            variable,
            constraints: vec![],
        }
    }

    #[inline(always)]
    pub fn var(&self) -> &TyVar {
        &self.variable.var
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Number of stored constraints, including ones a reader might filter;
    /// this is the figure transaction snapshots record.
    pub fn raw_constraints_count(&self) -> usize {
        self.constraints.len()
    }

    /// Add a constraint unless an equivalent one is already present. An
    /// existing equality over the same type subsumes a new lower/upper
    /// bound on that type. Returns the constraint that now represents the
    /// relation and whether anything was inserted.
    pub fn add_constraint(&mut self, constraint: Constraint) -> (Constraint, bool) {
        for existing in &self.constraints {
            if existing.ty_hash == constraint.ty_hash && existing.ty == constraint.ty {
                let subsumed = existing.kind == constraint.kind
                    || existing.kind == ConstraintKind::Equality;
                if subsumed {
                    return (existing.clone(), false);
                }
            }
        }
        self.constraints.push(constraint.clone());
        (constraint, true)
    }

    pub fn remove_constraints(&mut self, mut pred: impl FnMut(&Constraint) -> bool) {
        self.constraints.retain(|c| !pred(c));
    }

    /// Drop every constraint added at or after `since`. Rollback support:
    /// the constraint list is append-only between snapshots, so truncating
    /// restores it exactly.
    pub fn remove_last_constraints(&mut self, since: usize) {
        self.constraints.truncate(since);
    }

    /// The input types supplied directly at call sites for this variable:
    /// underived constraints whose initial position is an input-type
    /// position. This is the candidate set an only-input-types variable
    /// must resolve into.
    pub fn projected_input_call_types(&self) -> Vec<(Ty, ConstraintKind)> {
        self.constraints
            .iter()
            .filter(|c| c.derived_from.is_empty() && c.position.from().is_input_type_position())
            .map(|c| (c.ty.clone(), c.kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::Ty;

    fn pos(position: ConstraintPosition) -> IncorporationConstraintPosition {
        IncorporationConstraintPosition::new(InitialConstraint {
            a: Ty::name("Int"),
            b: Ty::var("?t0"),
            kind: ConstraintKind::Upper,
            position,
        })
    }

    #[test]
    fn equality_ignores_derivation() {
        let p = pos(ConstraintPosition::Argument(0));
        let plain = Constraint::initial(ConstraintKind::Lower, Ty::name("Int"), p.clone());
        let derived = Constraint::new(
            ConstraintKind::Lower,
            Ty::name("Int"),
            p,
            vec![TyVar::new("?t1")].into_iter().collect(),
            false,
        );
        assert_eq!(plain, derived);
    }

    #[test]
    fn add_constraint_dedupes() {
        let mut vwc = VariableWithConstraints::new(TypeVariable::new("?t0"));
        let p = pos(ConstraintPosition::Argument(0));

        let c = Constraint::initial(ConstraintKind::Lower, Ty::name("Int"), p.clone());
        let (_, added) = vwc.add_constraint(c.clone());
        assert!(added);
        let (_, added) = vwc.add_constraint(c);
        assert!(!added);
        assert_eq!(vwc.raw_constraints_count(), 1);

        // An equality over the same type subsumes a later upper bound.
        let eq = Constraint::initial(ConstraintKind::Equality, Ty::name("Num"), p.clone());
        assert!(vwc.add_constraint(eq).1);
        let upper = Constraint::initial(ConstraintKind::Upper, Ty::name("Num"), p);
        let (repr, added) = vwc.add_constraint(upper);
        assert!(!added);
        assert_eq!(repr.kind, ConstraintKind::Equality);
    }

    #[test]
    fn remove_last_constraints_truncates() {
        let mut vwc = VariableWithConstraints::new(TypeVariable::new("?t0"));
        let p = pos(ConstraintPosition::Argument(0));
        for name in ["A", "B", "C"] {
            vwc.add_constraint(Constraint::initial(
                ConstraintKind::Lower,
                Ty::name(name),
                p.clone(),
            ));
        }
        vwc.remove_last_constraints(1);
        assert_eq!(vwc.raw_constraints_count(), 1);
        assert_eq!(vwc.constraints()[0].ty, Ty::name("A"));
    }

    #[test]
    fn projected_input_call_types_filters_derived() {
        let mut vwc = VariableWithConstraints::new(TypeVariable::new("?t0"));
        let arg = pos(ConstraintPosition::Argument(0));
        let bound = pos(ConstraintPosition::DeclaredUpperBound(TyVar::new("?t0")));

        vwc.add_constraint(Constraint::initial(ConstraintKind::Lower, Ty::name("Int"), arg.clone()));
        vwc.add_constraint(Constraint::initial(ConstraintKind::Upper, Ty::name("Num"), bound));
        vwc.add_constraint(Constraint::new(
            ConstraintKind::Lower,
            Ty::name("Str"),
            arg,
            vec![TyVar::new("?t1")].into_iter().collect(),
            false,
        ));

        let inputs = vwc.projected_input_call_types();
        assert_eq!(inputs, vec![(Ty::name("Int"), ConstraintKind::Lower)]);
    }
}
