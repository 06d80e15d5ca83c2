// The mutable surface of one inference session: storage plus the state
// machine, memo caches and configuration. The engine owns one of these and
// hands it to the injector on every call; all writes funnel through the
// methods here so the state assertions cover injector-driven mutation too.
//
// State checks are development-time invariants, not control flow: they
// compile to nothing in release builds and must never change observable
// behavior.

use std::collections::{HashMap, HashSet};

use crate::{
    config::SolverConfig,
    constraints::{
        Constraint, ForkPointData, IncorporationConstraintPosition, InitialConstraint,
        VariableWithConstraints,
    },
    env::TypeEnv,
    error::{ConstraintSystemError, EmptyIntersectionInfo, EmptyIntersectionKind},
    storage::ConstraintStorage,
    subtype::is_subtype,
    ty::{Ty, TyHead, TyVar, TypeVariable},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum State {
    Building,
    Transaction,
    Completion,
    Freezed,
}

pub struct SolverContext {
    pub(crate) config: SolverConfig,
    pub(crate) env: Box<dyn TypeEnv>,
    pub(crate) storage: ConstraintStorage,
    pub(crate) state: State,
    /// Variables registered while a transaction is open, so rollback can
    /// unregister them. Nested transactions truncate, never clear.
    pub(crate) type_variables_transaction: Vec<TyVar>,
    proper_types_cache: HashSet<Ty>,
    not_proper_types_cache: HashSet<Ty>,
    intersection_emptiness_cache: HashMap<Vec<Ty>, Option<EmptyIntersectionInfo>>,
    pub(crate) at_completion_state: bool,
    pub(crate) could_be_resolved_with_unrestricted_builder_inference: bool,
}

impl SolverContext {
    pub fn new(config: SolverConfig, env: Box<dyn TypeEnv>) -> Self {
        SolverContext {
            config,
            env,
            storage: ConstraintStorage::new(),
            state: State::Building,
            type_variables_transaction: vec![],
            proper_types_cache: HashSet::new(),
            not_proper_types_cache: HashSet::new(),
            intersection_emptiness_cache: HashMap::new(),
            at_completion_state: false,
            could_be_resolved_with_unrestricted_builder_inference: false,
        }
    }

    pub(crate) fn check_state(&self, allowed: &[State]) {
        debug_assert!(
            allowed.contains(&self.state),
            "state {:?} is not allowed here (allowed: {:?})",
            self.state,
            allowed
        );
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn env(&self) -> &dyn TypeEnv {
        self.env.as_ref()
    }

    pub fn storage(&self) -> &ConstraintStorage {
        &self.storage
    }

    pub fn at_completion_state(&self) -> bool {
        self.at_completion_state
    }

    // -- registration ------------------------------------------------------

    /// Register a fresh type variable. Registering the same variable twice
    /// is a programming error, not a type error.
    pub fn register_variable(&mut self, variable: TypeVariable) {
        self.check_state(&[State::Building, State::Completion, State::Transaction]);

        let var = variable.var.clone();
        self.transaction_register_variable(&var);
        if let Some(old) = self
            .storage
            .all_type_variables
            .insert(var.clone(), variable.clone())
        {
            panic!(
                "type variable already registered: old: {:?}, new: {:?}",
                old, variable
            );
        }
        // A type judged improper may have mentioned a variable that has
        // since been rolled back; every registration resets that side of
        // the memo. Proper verdicts stay valid unless they mention the new
        // variable.
        self.not_proper_types_cache.clear();
        self.proper_types_cache.retain(|t| !t.contains_var(&var));

        log::trace!("registered type variable {}", var);
        self.storage
            .not_fixed_type_variables
            .insert(var, VariableWithConstraints::new(variable));
    }

    pub(crate) fn transaction_register_variable(&mut self, var: &TyVar) {
        if self.state != State::Transaction {
            return;
        }
        self.type_variables_transaction.push(var.clone());
    }

    // -- injector-facing mutation -----------------------------------------

    pub fn add_initial_constraint(&mut self, initial: InitialConstraint) {
        self.check_state(&[State::Building, State::Completion, State::Transaction]);
        self.storage.initial_constraints.push(initial);
    }

    pub fn add_error(&mut self, error: ConstraintSystemError) {
        self.check_state(&[State::Building, State::Completion, State::Transaction]);
        log::debug!("constraint system error: {}", error);
        self.storage.errors.push(error);
    }

    pub fn add_missed_constraints(
        &mut self,
        position: IncorporationConstraintPosition,
        constraints: Vec<(TyVar, Constraint)>,
    ) {
        self.storage.missed_constraints.push((position, constraints));
    }

    pub fn add_fork_point(
        &mut self,
        position: IncorporationConstraintPosition,
        data: ForkPointData,
    ) {
        self.check_state(&[State::Building, State::Completion, State::Transaction]);
        log::debug!("fork point with {} branches at {}", data.len(), position);
        self.storage.constraints_from_all_fork_points.push((position, data));
    }

    pub fn update_max_type_depth(&mut self, ty: &Ty) {
        self.check_state(&[State::Building, State::Completion, State::Transaction]);
        let depth = ty.depth();
        if depth > self.storage.max_type_depth_from_initial_constraints {
            self.storage.max_type_depth_from_initial_constraints = depth;
        }
    }

    pub fn variable_with_constraints_mut(
        &mut self,
        var: &TyVar,
    ) -> Option<&mut VariableWithConstraints> {
        self.storage.not_fixed_type_variables.get_mut(var)
    }

    pub fn is_registered_variable(&self, var: &TyVar) -> bool {
        self.storage.all_type_variables.contains_key(var)
    }

    // -- queries -----------------------------------------------------------

    /// A type is proper when it mentions no variable of this session. Star
    /// projections count as mentioning nothing, so a capture over a star is
    /// proper regardless of where it was captured.
    pub fn is_proper_type(&mut self, ty: &Ty) -> bool {
        self.check_state(&[State::Building, State::Completion, State::Transaction]);
        if self.storage.all_type_variables.is_empty() {
            return true;
        }
        if self.not_proper_types_cache.contains(ty) {
            return false;
        }
        if self.proper_types_cache.contains(ty) {
            return true;
        }
        let proper = self.is_proper_type_impl(ty);
        if proper {
            self.proper_types_cache.insert(ty.clone());
        } else {
            self.not_proper_types_cache.insert(ty.clone());
        }
        proper
    }

    fn is_proper_type_impl(&self, ty: &Ty) -> bool {
        let all = &self.storage.all_type_variables;
        !ty.mentions_any_var(|v| all.contains_key(v))
    }

    /// Same as `is_proper_type` but without touching the memo caches; safe
    /// to call while iterating storage.
    pub(crate) fn is_proper_type_uncached(&self, ty: &Ty) -> bool {
        self.is_proper_type_impl(ty)
    }

    pub fn is_type_variable(&self, ty: &Ty) -> bool {
        self.check_state(&[State::Building, State::Completion, State::Transaction]);
        match ty.head_var() {
            Some(v) => self.storage.not_fixed_type_variables.contains_key(v),
            None => false,
        }
    }

    // -- intersection emptiness -------------------------------------------

    /// Classify whether an intersection over `members` is empty. Memoized
    /// per member list: fixation can revisit the same intersection many
    /// times while draining missed constraints.
    pub fn empty_intersection_info(&mut self, members: &[Ty]) -> Option<EmptyIntersectionInfo> {
        let key: Vec<Ty> = members.to_vec();
        if let Some(cached) = self.intersection_emptiness_cache.get(&key) {
            return cached.clone();
        }
        let info = self.compute_empty_intersection_info(members);
        self.intersection_emptiness_cache.insert(key, info.clone());
        info
    }

    fn compute_empty_intersection_info(&self, members: &[Ty]) -> Option<EmptyIntersectionInfo> {
        let env = self.env.as_ref();
        for (i, a) in members.iter().enumerate() {
            if !self.is_proper_type_impl(a) {
                continue;
            }
            for b in members.iter().skip(i + 1) {
                if !self.is_proper_type_impl(b) {
                    continue;
                }
                if is_subtype(env, a, b) || is_subtype(env, b, a) {
                    continue;
                }
                let kind = match (a.head(), b.head()) {
                    (TyHead::Name(na), TyHead::Name(nb)) => {
                        if na == nb {
                            EmptyIntersectionKind::IncompatibleTypeArguments
                        } else if env.is_final(&na) && env.is_final(&nb) {
                            EmptyIntersectionKind::MultipleFinalClasses
                        } else {
                            EmptyIntersectionKind::IncompatibleClasses
                        }
                    }
                    _ => EmptyIntersectionKind::IncompatibleClasses,
                };
                return Some(EmptyIntersectionInfo {
                    kind,
                    causing_types: vec![a.clone(), b.clone()],
                });
            }
        }
        None
    }

    // -- merging -----------------------------------------------------------

    /// Fold a completed nested session's storage into this one. Lists are
    /// appended, maps unioned, constraint lists re-wrapped so the two
    /// sessions never share mutable structure.
    pub fn add_other_system(&mut self, other: &ConstraintStorage) {
        if !other.all_type_variables.is_empty() {
            let vars: Vec<TyVar> = other.all_type_variables.keys().cloned().collect();
            for var in vars {
                self.transaction_register_variable(&var);
            }
            self.storage.all_type_variables.extend(
                other
                    .all_type_variables
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
            self.not_proper_types_cache.clear();
        }
        for (var, vwc) in &other.not_fixed_type_variables {
            self.storage
                .not_fixed_type_variables
                .insert(var.clone(), vwc.clone());
        }
        self.storage
            .initial_constraints
            .extend(other.initial_constraints.iter().cloned());
        self.storage.max_type_depth_from_initial_constraints = self
            .storage
            .max_type_depth_from_initial_constraints
            .max(other.max_type_depth_from_initial_constraints);
        self.storage.errors.extend(other.errors.iter().cloned());
        for (var, ty) in &other.fixed_type_variables {
            self.storage
                .fixed_type_variables
                .insert(var.clone(), ty.clone());
        }
        self.storage
            .postponed_type_variables
            .extend(other.postponed_type_variables.iter().cloned());
        self.storage
            .constraints_from_all_fork_points
            .extend(other.constraints_from_all_fork_points.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::SolverConfig, mocks::MockTypeEnv};

    fn ctx() -> SolverContext {
        let mut env = MockTypeEnv::new();
        env.add_supertype("Int", Ty::name("Number"));
        env.mark_final("Int");
        env.mark_final("String");
        SolverContext::new(SolverConfig::default(), Box::new(env))
    }

    #[test]
    fn final_classes_make_emptiness_definite() {
        let mut ctx = ctx();
        let info = ctx
            .empty_intersection_info(&[Ty::name("Int"), Ty::name("String")])
            .expect("disjoint finals should classify as empty");
        assert_eq!(info.kind, EmptyIntersectionKind::MultipleFinalClasses);
        assert!(info.kind.is_definitely_empty());
        assert_eq!(info.causing_types, vec![Ty::name("Int"), Ty::name("String")]);
    }

    #[test]
    fn same_constructor_with_clashing_arguments_is_definite() {
        let mut ctx = ctx();
        let info = ctx
            .empty_intersection_info(&[
                Ty::proj("A", vec![Ty::name("Int")]),
                Ty::proj("A", vec![Ty::name("String")]),
            ])
            .expect("invariant argument clash should classify as empty");
        assert_eq!(info.kind, EmptyIntersectionKind::IncompatibleTypeArguments);
    }

    #[test]
    fn related_types_are_not_empty() {
        let mut ctx = ctx();
        assert!(ctx
            .empty_intersection_info(&[Ty::name("Int"), Ty::name("Number")])
            .is_none());
    }

    #[test]
    fn members_mentioning_variables_are_ignored() {
        let mut ctx = ctx();
        ctx.register_variable(TypeVariable::new("Tv"));
        assert!(ctx
            .empty_intersection_info(&[Ty::var("Tv"), Ty::name("Int")])
            .is_none());
    }
}
