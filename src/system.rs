// The constraint system engine: the transactional state machine that owns
// one inference session's storage and drives registration, constraint
// addition, speculative execution, fork resolution and variable fixation.
//
// States: Building -> (Transaction)* -> Completion -> Freezed. Transactions
// nest by recording the state to restore, and are strictly LIFO: whoever
// prepares a transaction closes or rolls it back. Contradictions never roll
// anything back by themselves; the caller of the transaction decides.

use std::collections::BTreeSet;

use fnv::FnvHashMap;

use crate::{
    config::SolverConfig,
    constraints::{
        Constraint, ForkPointData, IncorporationConstraintPosition, VariableWithConstraints,
    },
    context::{SolverContext, State},
    env::{EmptyTypeEnv, TypeEnv},
    error::ConstraintSystemError,
    injector::{ConstraintInjector, StructuralInjector},
    position::ConstraintPosition,
    storage::ConstraintStorage,
    subst::Subst,
    subtype::equal_types,
    ty::{Ty, TyHead, TyVar, TypeVariable},
};

/// Sizes of every mutable collection at `prepare_transaction` time.
/// Rollback truncates each collection back to these lengths, which restores
/// the exact pre-transaction state because every collection is append-only
/// while a transaction is open.
pub struct TransactionSnapshot {
    before_state: State,
    before_initial_constraint_count: usize,
    before_errors_count: usize,
    before_max_type_depth: usize,
    before_type_variables_transaction_size: usize,
    before_missed_constraints_count: usize,
    before_constraint_count_by_variables: FnvHashMap<TyVar, usize>,
    before_fork_points_count: usize,
}

/// Deferred check recorded when an only-input-types variable is fixed; it
/// needs the final substitutor, so it runs once every variable is fixed.
struct PostponedOnlyInputTypesCheck {
    variable: VariableWithConstraints,
    result_type: Ty,
}

pub struct ConstraintSystem<J = StructuralInjector> {
    injector: J,
    ctx: SolverContext,
    postponed_only_input_checks: Vec<PostponedOnlyInputTypesCheck>,
}

impl ConstraintSystem<StructuralInjector> {
    pub fn new() -> Self {
        ConstraintSystem::with_env(Box::new(EmptyTypeEnv))
    }

    pub fn with_env(env: Box<dyn TypeEnv>) -> Self {
        ConstraintSystem::with_config(SolverConfig::default(), env)
    }

    pub fn with_config(config: SolverConfig, env: Box<dyn TypeEnv>) -> Self {
        ConstraintSystem::with_injector(StructuralInjector::new(), config, env)
    }
}

impl Default for ConstraintSystem<StructuralInjector> {
    fn default() -> Self {
        ConstraintSystem::new()
    }
}

impl<J: ConstraintInjector> ConstraintSystem<J> {
    pub fn with_injector(injector: J, config: SolverConfig, env: Box<dyn TypeEnv>) -> Self {
        ConstraintSystem {
            injector,
            ctx: SolverContext::new(config, env),
            postponed_only_input_checks: vec![],
        }
    }

    // -- accessors ---------------------------------------------------------

    pub fn errors(&self) -> &[ConstraintSystemError] {
        &self.ctx.storage.errors
    }

    pub fn has_contradiction(&self) -> bool {
        self.ctx.check_state(&[
            State::Freezed,
            State::Building,
            State::Completion,
            State::Transaction,
        ]);
        self.ctx.storage.has_contradiction()
    }

    /// The live storage. Read-only access for callers that need to inspect
    /// progress mid-session; the frozen view comes from
    /// `as_read_only_storage`.
    pub fn storage(&self) -> &ConstraintStorage {
        self.ctx
            .check_state(&[State::Building, State::Completion, State::Transaction]);
        &self.ctx.storage
    }

    pub fn build_current_substitutor(&self) -> Subst {
        self.ctx
            .check_state(&[State::Building, State::Completion, State::Transaction]);
        self.ctx.storage.build_current_substitutor()
    }

    // -- state transitions -------------------------------------------------

    /// Mark that argument analysis has finished: only fixation-phase
    /// operations remain. Fork points discovered from here on are resolved
    /// as soon as the injector surfaces them.
    pub fn begin_completion(&mut self) {
        self.ctx.check_state(&[State::Building]);
        self.ctx.state = State::Completion;
        self.ctx.at_completion_state = true;
    }

    /// Freeze the system and expose its storage. One-way: no mutation is
    /// permitted afterwards.
    pub fn as_read_only_storage(&mut self) -> &ConstraintStorage {
        self.ctx
            .check_state(&[State::Building, State::Completion, State::Freezed]);
        self.ctx.state = State::Freezed;
        &self.ctx.storage
    }

    // -- registration and constraints --------------------------------------

    pub fn register_variable(&mut self, variable: TypeVariable) {
        self.ctx.register_variable(variable);
    }

    pub fn add_subtype_constraint(&mut self, lower: Ty, upper: Ty, position: ConstraintPosition) {
        self.ctx
            .check_state(&[State::Building, State::Completion, State::Transaction]);
        self.injector
            .add_initial_subtype_constraint(&mut self.ctx, lower, upper, position);
        self.resolve_forks_if_at_completion();
    }

    pub fn add_equality_constraint(&mut self, a: Ty, b: Ty, position: ConstraintPosition) {
        self.ctx
            .check_state(&[State::Building, State::Completion, State::Transaction]);
        self.injector
            .add_initial_equality_constraint(&mut self.ctx, a, b, position);
        self.resolve_forks_if_at_completion();
    }

    // -- transactions ------------------------------------------------------

    pub fn prepare_transaction(&mut self) -> TransactionSnapshot {
        self.ctx
            .check_state(&[State::Building, State::Completion, State::Transaction]);
        let snapshot = TransactionSnapshot {
            before_state: self.ctx.state,
            before_initial_constraint_count: self.ctx.storage.initial_constraints.len(),
            before_errors_count: self.ctx.storage.errors.len(),
            before_max_type_depth: self.ctx.storage.max_type_depth_from_initial_constraints,
            before_type_variables_transaction_size: self.ctx.type_variables_transaction.len(),
            before_missed_constraints_count: self.ctx.storage.missed_constraints.len(),
            before_constraint_count_by_variables: self
                .ctx
                .storage
                .not_fixed_type_variables
                .iter()
                .map(|(var, vwc)| (var.clone(), vwc.raw_constraints_count()))
                .collect(),
            before_fork_points_count: self.ctx.storage.constraints_from_all_fork_points.len(),
        };
        self.ctx.state = State::Transaction;
        snapshot
    }

    /// Keep everything the transaction did; only the state is restored.
    pub fn close_transaction(&mut self, snapshot: TransactionSnapshot) {
        self.ctx.check_state(&[State::Transaction]);
        self.ctx
            .type_variables_transaction
            .truncate(snapshot.before_type_variables_transaction_size);
        self.ctx.state = snapshot.before_state;
    }

    /// Undo everything the transaction did. After this, storage compares
    /// equal to its pre-transaction state, order included.
    pub fn rollback_transaction(&mut self, snapshot: TransactionSnapshot) {
        self.ctx.check_state(&[State::Transaction]);
        let ctx = &mut self.ctx;

        let added: Vec<TyVar> = ctx.type_variables_transaction
            [snapshot.before_type_variables_transaction_size..]
            .to_vec();
        for var in &added {
            ctx.storage.all_type_variables.remove(var);
            ctx.storage.not_fixed_type_variables.remove(var);
        }

        ctx.storage.max_type_depth_from_initial_constraints = snapshot.before_max_type_depth;
        ctx.storage.errors.truncate(snapshot.before_errors_count);
        ctx.storage
            .missed_constraints
            .truncate(snapshot.before_missed_constraints_count);
        ctx.storage
            .constraints_from_all_fork_points
            .truncate(snapshot.before_fork_points_count);
        ctx.storage
            .initial_constraints
            .truncate(snapshot.before_initial_constraint_count);

        for (var, vwc) in ctx.storage.not_fixed_type_variables.iter_mut() {
            if let Some(&count) = snapshot.before_constraint_count_by_variables.get(var) {
                vwc.remove_last_constraints(count);
            }
        }

        ctx.type_variables_transaction
            .truncate(snapshot.before_type_variables_transaction_size);
        ctx.state = snapshot.before_state;
    }

    /// Run `f` inside a transaction. A true return keeps the changes, false
    /// rolls them back; either way the return value is passed through.
    pub fn run_transaction<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&mut Self) -> bool,
    {
        let snapshot = self.prepare_transaction();
        let keep = f(self);
        if keep {
            self.close_transaction(snapshot);
        } else {
            self.rollback_transaction(snapshot);
        }
        keep
    }

    // -- fixation ----------------------------------------------------------

    /// Resolve `variable` to `result_type` and propagate the decision:
    /// an equality is injected (incorporating against every other
    /// variable), missed constraints are re-checked, every remaining
    /// constraint mentioning the variable is purged, and deferred
    /// only-input-types checks run once nothing is left to fix.
    pub fn fix_variable(&mut self, variable: &TyVar, result_type: Ty, position: ConstraintPosition) {
        self.ctx.check_state(&[State::Building, State::Completion]);
        log::debug!("fixing {} := {}", variable, result_type);

        self.check_inferred_empty_intersection(variable, &result_type);

        self.injector.add_initial_equality_constraint(
            &mut self.ctx,
            Ty::Var(variable.clone()),
            result_type.clone(),
            position,
        );
        self.resolve_forks_if_at_completion();

        self.check_missed_constraints();

        let variable_with_constraints =
            match self.ctx.storage.not_fixed_type_variables.remove(variable) {
                Some(vwc) => vwc,
                None => panic!(
                    "type variable {} is already fixed or was never registered",
                    variable
                ),
            };

        for other in self.ctx.storage.not_fixed_type_variables.values_mut() {
            other.remove_constraints(|c| c.ty.contains_var(variable));
        }

        self.ctx
            .storage
            .fixed_type_variables
            .insert(variable.clone(), result_type.clone());

        self.substitute_missed_constraints();

        if variable_with_constraints.variable.only_input_types {
            self.postponed_only_input_checks
                .push(PostponedOnlyInputTypesCheck {
                    variable: variable_with_constraints,
                    result_type,
                });
        }

        self.do_postponed_computations_if_all_variables_are_fixed();
    }

    fn check_inferred_empty_intersection(&mut self, variable: &TyVar, result_type: &Ty) {
        let members = match result_type {
            Ty::Intersection(members) if members.len() > 1 => members.clone(),
            _ => return,
        };

        // The exact same incompatible set may have been diagnosed at the
        // resolution stage already; an equal-list match (and only an
        // equal-list match) suppresses the duplicate.
        let already_reported = self.ctx.storage.errors.iter().any(|e| match e {
            ConstraintSystemError::InferredEmptyIntersectionError {
                incompatible_types, ..
            }
            | ConstraintSystemError::InferredEmptyIntersectionWarning {
                incompatible_types, ..
            } => incompatible_types == &members,
            _ => false,
        });
        if already_reported {
            return;
        }

        let info = match self.ctx.empty_intersection_info(&members) {
            Some(info) => info,
            None => return,
        };

        // A completion-stage verdict supersedes whatever the resolution
        // stage recorded.
        self.ctx
            .storage
            .errors
            .retain(|e| !e.is_inferred_empty_intersection());

        let forbidden = self.ctx.config.forbid_inference_into_empty_intersection
            && info.kind.is_definitely_empty();
        let error = if forbidden {
            ConstraintSystemError::InferredEmptyIntersectionError {
                incompatible_types: members,
                causing_types: info.causing_types,
                variable: variable.clone(),
                kind: info.kind,
            }
        } else {
            ConstraintSystemError::InferredEmptyIntersectionWarning {
                incompatible_types: members,
                causing_types: info.causing_types,
                variable: variable.clone(),
                kind: info.kind,
            }
        };
        self.ctx.add_error(error);
    }

    /// Replay parked constraints against the current store inside a
    /// rolled-back transaction, and report what they would have flagged as
    /// warnings. A direct constraint error on the same call wins: nothing
    /// is reported on top of it.
    fn check_missed_constraints(&mut self) {
        if self.ctx.storage.missed_constraints.is_empty() {
            return;
        }

        let missed = self.ctx.storage.missed_constraints.clone();
        let mut errors_by_missed: Vec<ConstraintSystemError> = vec![];
        self.run_transaction(|s| {
            for (position, constraints) in &missed {
                let still_unfixed: Vec<(TyVar, Constraint)> = constraints
                    .iter()
                    .filter(|(var, _)| s.ctx.storage.not_fixed_type_variables.contains_key(var))
                    .cloned()
                    .collect();
                s.injector
                    .process_missed_constraints(&mut s.ctx, position.clone(), still_unfixed);
            }
            errors_by_missed = s
                .ctx
                .storage
                .errors
                .iter()
                .filter(|e| matches!(e, ConstraintSystemError::NewConstraint { .. }))
                .cloned()
                .collect();
            false
        });

        let has_direct_constraint_errors = self
            .ctx
            .storage
            .errors
            .iter()
            .any(|e| matches!(e, ConstraintSystemError::NewConstraint { .. }));
        if !has_direct_constraint_errors {
            for error in errors_by_missed {
                let warning = error.transform_to_warning();
                self.ctx.add_error(warning);
            }
        }
    }

    /// Fold the freshly-fixed variables into the parked constraints so a
    /// later replay sees current knowledge.
    fn substitute_missed_constraints(&mut self) {
        if self.ctx.storage.missed_constraints.is_empty() {
            return;
        }
        let substitutor = self.ctx.storage.build_current_substitutor();
        for (_, constraints) in self.ctx.storage.missed_constraints.iter_mut() {
            for (_, constraint) in constraints.iter_mut() {
                let new_ty = substitutor.apply(&constraint.ty);
                if new_ty != constraint.ty {
                    *constraint = constraint.replace_ty(new_ty);
                }
            }
        }
    }

    fn do_postponed_computations_if_all_variables_are_fixed(&mut self) {
        if !self.ctx.storage.not_fixed_type_variables.is_empty() {
            return;
        }
        let checks = std::mem::take(&mut self.postponed_only_input_checks);
        for check in checks {
            self.check_only_input_types(check);
        }
    }

    fn check_only_input_types(&mut self, check: PostponedOnlyInputTypesCheck) {
        let substitutor = self.ctx.storage.build_current_substitutor();
        let result_type = substitutor.apply(&check.result_type);
        let env = self.ctx.env.as_ref();

        let matches_input = check
            .variable
            .projected_input_call_types()
            .iter()
            .any(|(input, _kind)| {
                let input = substitutor.apply(input);
                if equal_types(env, &input, &result_type) {
                    return true;
                }
                // An intersection input counts if the result equals any of
                // its members.
                if let Ty::Intersection(members) = &input {
                    return members.iter().any(|m| equal_types(env, m, &result_type));
                }
                false
            });

        if !matches_input {
            self.ctx.add_error(ConstraintSystemError::OnlyInputTypes {
                variable: check.variable.var().clone(),
            });
        }
    }

    // -- fork points -------------------------------------------------------

    fn resolve_forks_if_at_completion(&mut self) {
        if self.ctx.at_completion_state
            && !self.ctx.storage.constraints_from_all_fork_points.is_empty()
        {
            self.resolve_fork_points_constraints();
        }
    }

    /// Find, for each pending fork point, a branch consistent with the rest
    /// of the system, and apply that branch's constraints. Branches are
    /// tried in order and the first that does not contradict wins; there is
    /// no ranking between viable branches. Processing a fork may spawn new
    /// fork points, which are drained in turn.
    pub fn resolve_fork_points_constraints(&mut self) {
        if self.ctx.storage.constraints_from_all_fork_points.is_empty() {
            return;
        }
        let all_fork_points = std::mem::take(&mut self.ctx.storage.constraints_from_all_fork_points);

        for (position, fork_point_data) in all_fork_points {
            if !self.apply_constraints_from_first_successful_branch(&fork_point_data, &position) {
                self.ctx
                    .add_error(ConstraintSystemError::NoSuccessfulFork { position });
            }
        }
    }

    /// Probe whether the pending fork points admit a consistent resolution
    /// without committing anything: the whole search runs in a transaction
    /// that is always rolled back. Returns the first failure, if any.
    pub fn check_if_forks_might_be_successfully_resolved(&mut self) -> Option<ConstraintSystemError> {
        if self.ctx.storage.constraints_from_all_fork_points.is_empty() {
            return None;
        }
        let all_fork_points = std::mem::take(&mut self.ctx.storage.constraints_from_all_fork_points);

        let mut result = None;
        self.run_transaction(|s| {
            for (position, fork_point_data) in &all_fork_points {
                if !s.apply_constraints_from_first_successful_branch(fork_point_data, position) {
                    result = Some(ConstraintSystemError::NoSuccessfulFork {
                        position: position.clone(),
                    });
                    break;
                }
            }
            false
        });

        self.ctx
            .storage
            .constraints_from_all_fork_points
            .extend(all_fork_points);
        result
    }

    fn apply_constraints_from_first_successful_branch(
        &mut self,
        fork_point_data: &ForkPointData,
        position: &IncorporationConstraintPosition,
    ) -> bool {
        fork_point_data.iter().any(|branch| {
            let branch = branch.clone();
            let position = position.clone();
            self.run_transaction(|s| {
                s.injector
                    .process_fork_point_branch_constraints(&mut s.ctx, branch, position);
                if !s.ctx.storage.constraints_from_all_fork_points.is_empty() {
                    s.resolve_fork_points_constraints();
                }
                !s.ctx.storage.has_contradiction()
            })
        })
    }

    // -- merging -----------------------------------------------------------

    /// Fold a completed nested session into this one.
    pub fn add_other_system(&mut self, other: &ConstraintStorage) {
        self.ctx.add_other_system(other);
    }

    // -- proper types and variable queries ---------------------------------

    pub fn is_proper_type(&mut self, ty: &Ty) -> bool {
        self.ctx.is_proper_type(ty)
    }

    pub fn is_type_variable(&self, ty: &Ty) -> bool {
        self.ctx.is_type_variable(ty)
    }

    /// No unfixed variable occurs in `ty` (fixed ones are fine).
    pub fn can_be_proper(&self, ty: &Ty) -> bool {
        self.ctx.check_state(&[State::Building, State::Completion]);
        let not_fixed = &self.ctx.storage.not_fixed_type_variables;
        !ty.mentions_any_var(|v| not_fixed.contains_key(v))
    }

    pub fn contains_only_fixed_variables(&self, ty: &Ty) -> bool {
        self.can_be_proper(ty)
    }

    pub fn contains_only_fixed_or_postponed_variables(&self, ty: &Ty) -> bool {
        self.ctx.check_state(&[State::Building, State::Completion]);
        let storage = &self.ctx.storage;
        !ty.mentions_any_var(|v| {
            storage.not_fixed_type_variables.contains_key(v)
                && !storage.postponed_type_variables.contains(v)
        })
    }

    /// Head constructors of the proper upper bounds of `ty`'s variable; for
    /// a non-variable type, its own head.
    pub fn proper_supertype_heads(&self, ty: &Ty) -> Vec<TyHead> {
        self.ctx
            .check_state(&[State::Building, State::Completion, State::Transaction]);
        let vwc = match ty
            .head_var()
            .and_then(|v| self.ctx.storage.not_fixed_type_variables.get(v))
        {
            Some(vwc) => vwc,
            None => return vec![ty.head()],
        };
        vwc.constraints()
            .iter()
            .filter(|c| c.kind != crate::constraints::ConstraintKind::Lower)
            .filter_map(|c| {
                let head = c.ty.head();
                match &head {
                    TyHead::Var(v) if self.ctx.storage.all_type_variables.contains_key(v) => None,
                    _ => Some(head),
                }
            })
            .collect()
    }

    pub fn has_upper_or_equal_unit_constraint(&self, ty: &Ty) -> bool {
        self.ctx
            .check_state(&[State::Building, State::Completion, State::Freezed]);
        let constraints = match ty
            .head_var()
            .and_then(|v| self.ctx.storage.not_fixed_type_variables.get(v))
        {
            Some(vwc) => vwc.constraints(),
            None => return false,
        };
        constraints.iter().any(|c| {
            matches!(
                c.kind,
                crate::constraints::ConstraintKind::Upper
                    | crate::constraints::ConstraintKind::Equality
            ) && c.ty.is_unit()
        })
    }

    // -- postponed variables (builder inference) ---------------------------

    pub fn mark_postponed_variable(&mut self, var: TyVar) {
        self.ctx.storage.postponed_type_variables.push(var);
    }

    pub fn unmark_postponed_variable(&mut self, var: &TyVar) {
        if let Some(index) = self
            .ctx
            .storage
            .postponed_type_variables
            .iter()
            .position(|v| v == var)
        {
            self.ctx.storage.postponed_type_variables.remove(index);
        }
    }

    pub fn remove_postponed_variables(&mut self) {
        self.ctx.storage.postponed_type_variables.clear();
    }

    pub fn is_postponed_type_variable(&self, var: &TyVar) -> bool {
        self.ctx
            .check_state(&[State::Building, State::Completion, State::Transaction]);
        self.ctx.storage.postponed_type_variables.contains(var)
    }

    pub fn postponed_type_variables(&self) -> &[TyVar] {
        self.ctx
            .check_state(&[State::Building, State::Completion, State::Transaction]);
        &self.ctx.storage.postponed_type_variables
    }

    /// Purge constraints that mention any of the given postponed variables;
    /// used when builder inference takes over those variables.
    pub fn remove_postponed_variables_from_constraints(&mut self, postponed: &BTreeSet<TyVar>) {
        for vwc in self.ctx.storage.not_fixed_type_variables.values_mut() {
            vwc.remove_constraints(|c| c.ty.mentions_any_var(|v| postponed.contains(v)));
        }
    }

    pub fn mark_could_be_resolved_with_unrestricted_builder_inference(&mut self) {
        self.ctx.could_be_resolved_with_unrestricted_builder_inference = true;
    }

    pub fn could_be_resolved_with_unrestricted_builder_inference(&self) -> bool {
        self.ctx.could_be_resolved_with_unrestricted_builder_inference
    }

    /// Rewrite every fixed result through `substitutor`; used when an outer
    /// session's decisions become known after a merge.
    pub fn substitute_fixed_variables(&mut self, substitutor: &Subst) {
        for ty in self.ctx.storage.fixed_type_variables.values_mut() {
            *ty = substitutor.apply(ty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> TyVar {
        TyVar::new(name)
    }

    #[test]
    fn transaction_close_keeps_changes() {
        let mut system = ConstraintSystem::new();
        system.register_variable(TypeVariable::new("?t0"));

        let snapshot = system.prepare_transaction();
        system.register_variable(TypeVariable::new("?t1"));
        system.close_transaction(snapshot);

        assert!(system.storage().all_type_variables.contains_key(&var("?t1")));
    }

    #[test]
    fn transaction_rollback_removes_registered_variables() {
        let mut system = ConstraintSystem::new();
        system.register_variable(TypeVariable::new("?t0"));

        let snapshot = system.prepare_transaction();
        system.register_variable(TypeVariable::new("?t1"));
        system.rollback_transaction(snapshot);

        assert!(!system.storage().all_type_variables.contains_key(&var("?t1")));
        assert!(system.storage().all_type_variables.contains_key(&var("?t0")));
    }

    #[test]
    fn nested_transactions_restore_outer_state() {
        let mut system = ConstraintSystem::new();
        system.register_variable(TypeVariable::new("?t0"));

        let outer = system.prepare_transaction();
        system.register_variable(TypeVariable::new("?t1"));
        let inner = system.prepare_transaction();
        system.register_variable(TypeVariable::new("?t2"));
        system.rollback_transaction(inner);

        assert!(system.storage().all_type_variables.contains_key(&var("?t1")));
        assert!(!system.storage().all_type_variables.contains_key(&var("?t2")));

        system.rollback_transaction(outer);
        assert!(!system.storage().all_type_variables.contains_key(&var("?t1")));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn double_registration_panics() {
        let mut system = ConstraintSystem::new();
        system.register_variable(TypeVariable::new("?t0"));
        system.register_variable(TypeVariable::new("?t0"));
    }

    #[test]
    #[should_panic(expected = "should not be fixed")]
    fn fixing_twice_panics() {
        let mut system = ConstraintSystem::new();
        system.register_variable(TypeVariable::new("?t0"));
        system.fix_variable(
            &var("?t0"),
            Ty::name("Int"),
            ConstraintPosition::FixVariable(var("?t0")),
        );
        system.fix_variable(
            &var("?t0"),
            Ty::name("Int"),
            ConstraintPosition::FixVariable(var("?t0")),
        );
    }

    #[test]
    fn postponed_variable_marking_round_trips() {
        let mut system = ConstraintSystem::new();
        system.register_variable(TypeVariable::new("?t0"));
        system.mark_postponed_variable(var("?t0"));
        assert!(system.is_postponed_type_variable(&var("?t0")));
        system.unmark_postponed_variable(&var("?t0"));
        assert!(!system.is_postponed_type_variable(&var("?t0")));
    }
}
