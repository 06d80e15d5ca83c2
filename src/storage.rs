// The system-of-record for one inference session.
//
// Storage is a passive aggregate: it validates nothing. The engine and the
// injector are the only writers, and the engine's transaction machinery
// relies on every collection here being append-only between snapshots
// (rollback truncates to recorded lengths).

use std::collections::BTreeMap;

use fnv::FnvHashMap;

use crate::{
    constraints::{Constraint, ForkPointData, IncorporationConstraintPosition, InitialConstraint, VariableWithConstraints},
    error::ConstraintSystemError,
    ty::{Ty, TyVar, TypeVariable},
};

#[derive(Clone, Debug, Default)]
pub struct ConstraintStorage {
    /// Every variable ever registered, fixed ones included; the
    /// cross-reference for "is this a variable of this session".
    pub all_type_variables: FnvHashMap<TyVar, TypeVariable>,
    /// Variables still awaiting resolution. Ordered so constraint
    /// propagation visits variables deterministically.
    pub not_fixed_type_variables: BTreeMap<TyVar, VariableWithConstraints>,
    /// Resolved results. A variable is in exactly one of this map and
    /// `not_fixed_type_variables` once registered.
    pub fixed_type_variables: BTreeMap<TyVar, Ty>,
    pub initial_constraints: Vec<InitialConstraint>,
    pub errors: Vec<ConstraintSystemError>,
    /// Constraints the injector skipped under the legacy processing
    /// optimization; re-checked when variables are fixed.
    pub missed_constraints: Vec<(IncorporationConstraintPosition, Vec<(TyVar, Constraint)>)>,
    /// Variables whose analysis is postponed (builder inference).
    pub postponed_type_variables: Vec<TyVar>,
    /// Fork points discovered during decomposition, not yet resolved.
    pub constraints_from_all_fork_points: Vec<(IncorporationConstraintPosition, ForkPointData)>,
    pub max_type_depth_from_initial_constraints: usize,
}

impl ConstraintStorage {
    pub fn new() -> Self {
        ConstraintStorage::default()
    }

    /// Whether any recorded error rules the candidate out. Derived on
    /// demand so rollback cannot leave a stale flag behind.
    pub fn has_contradiction(&self) -> bool {
        self.errors.iter().any(|e| !e.applicability().is_success())
    }

    /// Substitution from every fixed variable to its result type.
    pub fn build_current_substitutor(&self) -> crate::subst::Subst {
        self.fixed_type_variables
            .iter()
            .map(|(var, ty)| (var.clone(), ty.clone()))
            .collect()
    }
}

impl PartialEq for ConstraintStorage {
    fn eq(&self, other: &Self) -> bool {
        // FnvHashMap comparison is order-insensitive; everything else is
        // order-sensitive by design (rollback must restore exact order).
        self.all_type_variables == other.all_type_variables
            && self.not_fixed_type_variables == other.not_fixed_type_variables
            && self.fixed_type_variables == other.fixed_type_variables
            && self.initial_constraints == other.initial_constraints
            && self.errors == other.errors
            && self.missed_constraints == other.missed_constraints
            && self.postponed_type_variables == other.postponed_type_variables
            && self.constraints_from_all_fork_points == other.constraints_from_all_fork_points
            && self.max_type_depth_from_initial_constraints
                == other.max_type_depth_from_initial_constraints
    }
}

impl Eq for ConstraintStorage {}
