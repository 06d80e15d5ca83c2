// The constraint injector: turns declared relations between two types into
// atomic per-variable constraints, feeds them into storage, and runs
// incorporation on everything it adds.
//
// The engine treats the injector as a pluggable collaborator. The contract
// is that after any trait method returns, every atomic consequence of the
// added relation has been reflected into storage, or an error recorded.

use std::collections::BTreeSet;

use crate::{
    constraints::{
        Constraint, ConstraintKind, ForkPointBranch, ForkPointData,
        IncorporationConstraintPosition, InitialConstraint,
    },
    context::SolverContext,
    env::transitive_supertypes,
    error::ConstraintSystemError,
    incorporation,
    position::ConstraintPosition,
    ty::{CaptureStatus, Ty, TyVar},
};

/// Incorporation may relate types one level deeper than anything written in
/// an initial constraint; beyond that, derived relations are dropped to
/// keep propagation finite.
pub(crate) const ALLOWED_DEPTH_DELTA_FOR_INCORPORATION: usize = 1;

pub trait ConstraintInjector {
    fn add_initial_subtype_constraint(
        &self,
        ctx: &mut SolverContext,
        lower: Ty,
        upper: Ty,
        position: ConstraintPosition,
    );

    fn add_initial_equality_constraint(
        &self,
        ctx: &mut SolverContext,
        a: Ty,
        b: Ty,
        position: ConstraintPosition,
    );

    /// Apply one branch of a fork point. Called by the engine inside a
    /// transaction while searching for a consistent branch.
    fn process_fork_point_branch_constraints(
        &self,
        ctx: &mut SolverContext,
        branch: ForkPointBranch,
        position: IncorporationConstraintPosition,
    );

    /// Re-run constraints that were parked under the legacy processing
    /// shortcut. A no-op when proper constraints processing is enabled.
    fn process_missed_constraints(
        &self,
        ctx: &mut SolverContext,
        position: IncorporationConstraintPosition,
        constraints: Vec<(TyVar, Constraint)>,
    );
}

/// Working state of one injector call: the pending atomic constraints and
/// any fork points discovered while decomposing.
pub(crate) struct Propagation {
    pub position: IncorporationConstraintPosition,
    pub queue: Vec<(TyVar, Constraint)>,
    pub fork_points: Vec<ForkPointData>,
    /// Variables whose resolution is driving the current decomposition;
    /// folded into `derived_from` of everything queued. Empty while
    /// decomposing an initial constraint.
    pub derivation_seed: BTreeSet<TyVar>,
}

impl Propagation {
    pub fn new(position: IncorporationConstraintPosition) -> Self {
        Propagation {
            position,
            queue: vec![],
            fork_points: vec![],
            derivation_seed: BTreeSet::new(),
        }
    }
}

/// The default injector: structural decomposition with nominal subtype
/// edges supplied by the context's `TypeEnv`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StructuralInjector;

impl StructuralInjector {
    pub fn new() -> Self {
        StructuralInjector
    }

    /// Drain the propagation queue, committing constraints to storage and
    /// incorporating each newly-added one. With `allow_missed_shortcut`,
    /// replicates the legacy optimization: once every unfixed variable has
    /// a proper equality constraint, the remaining queue is returned
    /// instead of processed.
    fn process_constraints(
        &self,
        ctx: &mut SolverContext,
        prop: &mut Propagation,
        allow_missed_shortcut: bool,
    ) -> Option<Vec<(TyVar, Constraint)>> {
        while !prop.queue.is_empty() {
            let batch = std::mem::take(&mut prop.queue);
            self.process_given_constraints(ctx, prop, batch);

            if prop.queue.is_empty() {
                break;
            }
            let use_shortcut =
                allow_missed_shortcut && !ctx.config().proper_constraints_processing;
            if use_shortcut && every_variable_has_proper_equality(ctx) {
                return Some(std::mem::take(&mut prop.queue));
            }
        }
        None
    }

    fn process_given_constraints(
        &self,
        ctx: &mut SolverContext,
        prop: &mut Propagation,
        batch: Vec<(TyVar, Constraint)>,
    ) {
        for (var, constraint) in batch {
            if should_skip_constraint(&var, &constraint) {
                continue;
            }

            let vwc = match ctx.variable_with_constraints_mut(&var) {
                Some(vwc) => vwc,
                None => panic!(
                    "type variable {} should not be fixed! base constraint: {}",
                    var, prop.position
                ),
            };

            // Adding before incorporation matters: incorporation reads the
            // variable's constraint list, and must see the new entry.
            let (added, was_added) = vwc.add_constraint(constraint.clone());

            let fixing_this_variable = constraint.kind == ConstraintKind::Equality
                && matches!(constraint.position.from(), ConstraintPosition::FixVariable(v) if *v == var);
            let incorporate_it =
                (was_added && !constraint.is_nullability_constraint) || fixing_this_variable;

            if incorporate_it {
                log::trace!("{} {} (incorporating)", var, added);
                incorporation::incorporate(ctx, prop, &var, &added);
            }
        }
    }

    /// Shared tail of every injector entry point: process the queue, park
    /// any shortcut remainder as missed constraints, publish fork points.
    fn run(&self, ctx: &mut SolverContext, mut prop: Propagation, allow_missed_shortcut: bool) {
        let missed = self.process_constraints(ctx, &mut prop, allow_missed_shortcut);
        if let Some(missed) = missed {
            if !missed.is_empty() {
                log::debug!("parking {} missed constraints at {}", missed.len(), prop.position);
                ctx.add_missed_constraints(prop.position.clone(), missed);
            }
        }
        let position = prop.position;
        for data in prop.fork_points {
            ctx.add_fork_point(position.clone(), data);
        }
    }
}

impl ConstraintInjector for StructuralInjector {
    fn add_initial_subtype_constraint(
        &self,
        ctx: &mut SolverContext,
        lower: Ty,
        upper: Ty,
        position: ConstraintPosition,
    ) {
        let initial = InitialConstraint {
            a: lower.clone(),
            b: upper.clone(),
            kind: ConstraintKind::Upper,
            position,
        };
        ctx.add_initial_constraint(initial.clone());
        ctx.update_max_type_depth(&lower);
        ctx.update_max_type_depth(&upper);

        let mut prop = Propagation::new(IncorporationConstraintPosition::new(initial));
        decompose_subtype(ctx, &mut prop, &lower, &upper);
        self.run(ctx, prop, true);
    }

    fn add_initial_equality_constraint(
        &self,
        ctx: &mut SolverContext,
        a: Ty,
        b: Ty,
        position: ConstraintPosition,
    ) {
        let a_is_var = a.head_var().map_or(false, |v| ctx.is_registered_variable(v));
        let b_is_var = b.head_var().map_or(false, |v| ctx.is_registered_variable(v));

        let (var_ty, other) = if a_is_var {
            (a, b)
        } else if b_is_var {
            (b, a)
        } else {
            // No variable on either side: record the relation and check it
            // as subtyping in both directions.
            let initial = InitialConstraint {
                a: a.clone(),
                b: b.clone(),
                kind: ConstraintKind::Equality,
                position,
            };
            ctx.add_initial_constraint(initial.clone());
            ctx.update_max_type_depth(&a);
            ctx.update_max_type_depth(&b);
            let mut prop = Propagation::new(IncorporationConstraintPosition::new(initial));
            decompose_subtype(ctx, &mut prop, &a, &b);
            decompose_subtype(ctx, &mut prop, &b, &a);
            self.run(ctx, prop, true);
            return;
        };

        let initial = InitialConstraint {
            a: var_ty.clone(),
            b: other.clone(),
            kind: ConstraintKind::Equality,
            position,
        };
        ctx.add_initial_constraint(initial.clone());
        ctx.update_max_type_depth(&other);

        let incorporation_position = IncorporationConstraintPosition::new(initial);
        let mut prop = Propagation::new(incorporation_position);
        let var = var_ty.head_var().unwrap().clone();
        push_new_constraint(
            ctx,
            &mut prop,
            var,
            ConstraintKind::Equality,
            other,
            BTreeSet::new(),
        );
        self.run(ctx, prop, true);
    }

    fn process_fork_point_branch_constraints(
        &self,
        ctx: &mut SolverContext,
        branch: ForkPointBranch,
        position: IncorporationConstraintPosition,
    ) {
        let mut prop = Propagation::new(position);
        prop.queue = branch;
        self.run(ctx, prop, false);
    }

    fn process_missed_constraints(
        &self,
        ctx: &mut SolverContext,
        position: IncorporationConstraintPosition,
        constraints: Vec<(TyVar, Constraint)>,
    ) {
        // With eager processing there is nothing to miss in the first place.
        if ctx.config().proper_constraints_processing {
            return;
        }
        let mut prop = Propagation::new(position);
        prop.queue = constraints;
        self.run(ctx, prop, false);
    }
}

pub(crate) fn is_allowed_type(ctx: &SolverContext, ty: &Ty) -> bool {
    ty.depth()
        <= ctx.storage().max_type_depth_from_initial_constraints
            + ALLOWED_DEPTH_DELTA_FOR_INCORPORATION
}

fn every_variable_has_proper_equality(ctx: &SolverContext) -> bool {
    ctx.storage().not_fixed_type_variables.values().all(|vwc| {
        vwc.constraints()
            .iter()
            .any(|c| c.kind == ConstraintKind::Equality && ctx.is_proper_type_uncached(&c.ty))
    })
}

fn should_skip_constraint(var: &TyVar, constraint: &Constraint) -> bool {
    // T <: T, T :> T, T == T carry no information.
    if constraint.ty.head_var() == Some(var) {
        return true;
    }
    if constraint.kind == ConstraintKind::Equality {
        return false;
    }
    // T <: any from a declared upper bound is trivially true.
    if constraint.kind == ConstraintKind::Upper
        && constraint.ty.is_any()
        && matches!(
            constraint.position.from(),
            ConstraintPosition::DeclaredUpperBound(_)
        )
    {
        return true;
    }
    false
}

/// Queue a new atomic constraint on `var`, screening out types the solver
/// must not store: upstream error types (already reported), and captures
/// that may not outlive the operation that made them.
pub(crate) fn push_new_constraint(
    ctx: &mut SolverContext,
    prop: &mut Propagation,
    var: TyVar,
    kind: ConstraintKind,
    ty: Ty,
    derived_from: BTreeSet<TyVar>,
) {
    if ty.is_error() {
        // The failure that produced this type was reported upstream.
        ctx.add_error(ConstraintSystemError::ConstrainingTypeIsError {
            variable: var,
            ty,
            position: prop.position.clone(),
        });
        return;
    }

    if ty.contains(&mut |t| {
        matches!(t, Ty::Captured(c) if c.status == CaptureStatus::ForIncorporation)
    }) {
        panic!(
            "captured type for incorporation escaped from incorporation: {}\nbase constraint: {}",
            ty, prop.position
        );
    }

    if ty.contains(&mut |t| {
        matches!(t, Ty::Captured(c) if c.status == CaptureStatus::ForSubtyping)
    }) {
        ctx.add_error(ConstraintSystemError::CapturedTypeFromSubtyping {
            variable: var,
            ty,
            position: prop.position.clone(),
        });
        return;
    }

    let mut derived_from = derived_from;
    derived_from.extend(prop.derivation_seed.iter().cloned());
    let constraint = Constraint::new(kind, ty, prop.position.clone(), derived_from, false);
    prop.queue.push((var, constraint));
}

fn mismatch(ctx: &mut SolverContext, prop: &Propagation, lower: &Ty, upper: &Ty) {
    ctx.add_error(ConstraintSystemError::NewConstraint {
        lower: lower.clone(),
        upper: upper.clone(),
        position: prop.position.clone(),
    });
}

/// Decompose `lower <: upper` into atomic constraints, queuing one
/// constraint per registered variable encountered and recursing through
/// structure. Pairs of proper types that fail to relate produce errors.
pub(crate) fn decompose_subtype(
    ctx: &mut SolverContext,
    prop: &mut Propagation,
    lower: &Ty,
    upper: &Ty,
) {
    if lower == upper {
        return;
    }

    let lower_var = lower
        .head_var()
        .filter(|v| ctx.is_registered_variable(v))
        .cloned();
    let upper_var = upper
        .head_var()
        .filter(|v| ctx.is_registered_variable(v))
        .cloned();

    if lower_var.is_some() || upper_var.is_some() {
        if let Some(uv) = upper_var {
            push_new_constraint(ctx, prop, uv, ConstraintKind::Lower, lower.clone(), BTreeSet::new());
        }
        if let Some(lv) = lower_var {
            push_new_constraint(ctx, prop, lv, ConstraintKind::Upper, upper.clone(), BTreeSet::new());
        }
        return;
    }

    if lower.is_error() || upper.is_error() {
        return;
    }
    if lower.is_never() || upper.is_any() || lower.is_any() {
        return;
    }

    match (lower, upper) {
        (Ty::Intersection(members), _) => {
            decompose_intersection_lower(ctx, prop, members, upper);
        }
        (_, Ty::Intersection(members)) => {
            for member in members {
                decompose_subtype(ctx, prop, lower, member);
            }
        }
        (Ty::Captured(c), _) if c.projection.is_some() => {
            let projection = c.projection.clone().unwrap();
            decompose_subtype(ctx, prop, &projection, upper);
        }
        (_, Ty::Captured(c)) if c.projection.is_some() => {
            let projection = c.projection.clone().unwrap();
            decompose_subtype(ctx, prop, lower, &projection);
        }
        (Ty::Func(p1, r1), Ty::Func(p2, r2)) if p1.len() == p2.len() => {
            for (a, b) in p1.iter().zip(p2.iter()) {
                // Parameters are contravariant.
                decompose_subtype(ctx, prop, b, a);
            }
            decompose_subtype(ctx, prop, r1, r2);
        }
        (Ty::Tuple(e1), Ty::Tuple(e2)) if e1.len() == e2.len() => {
            for (a, b) in e1.iter().zip(e2.iter()) {
                decompose_subtype(ctx, prop, a, b);
            }
        }
        (Ty::Proj(n1, a1), Ty::Proj(n2, a2)) if n1 == n2 && a1.len() == a2.len() => {
            // Arguments are invariant.
            for (x, y) in a1.iter().zip(a2.iter()) {
                decompose_equality(ctx, prop, x, y);
            }
        }
        (Ty::Const(name), _) | (Ty::Proj(name, _), _) => {
            let name = name.clone();
            let supers = transitive_supertypes(ctx.env(), &name);
            if supers.iter().any(|s| s == upper) {
                return;
            }
            // A parameterized supertype can still match structurally and
            // bind variables in `upper`'s arguments.
            if let Some(s) = supers.iter().find(|s| s.head() == upper.head()).cloned() {
                decompose_subtype(ctx, prop, &s, upper);
                return;
            }
            mismatch(ctx, prop, lower, upper);
        }
        _ => mismatch(ctx, prop, lower, upper),
    }
}

/// Decompose `a == b`. A registered variable on either side takes the other
/// side as an equality constraint; otherwise the types must agree
/// structurally.
pub(crate) fn decompose_equality(ctx: &mut SolverContext, prop: &mut Propagation, a: &Ty, b: &Ty) {
    if a == b {
        return;
    }

    let a_var = a.head_var().filter(|v| ctx.is_registered_variable(v)).cloned();
    let b_var = b.head_var().filter(|v| ctx.is_registered_variable(v)).cloned();

    match (a_var, b_var) {
        (Some(av), _) => {
            push_new_constraint(ctx, prop, av, ConstraintKind::Equality, b.clone(), BTreeSet::new());
        }
        (None, Some(bv)) => {
            push_new_constraint(ctx, prop, bv, ConstraintKind::Equality, a.clone(), BTreeSet::new());
        }
        (None, None) => {
            if a.is_error() || b.is_error() {
                return;
            }
            match (a, b) {
                (Ty::Func(p1, r1), Ty::Func(p2, r2)) if p1.len() == p2.len() => {
                    for (x, y) in p1.iter().zip(p2.iter()) {
                        decompose_equality(ctx, prop, x, y);
                    }
                    decompose_equality(ctx, prop, r1, r2);
                }
                (Ty::Tuple(e1), Ty::Tuple(e2)) if e1.len() == e2.len() => {
                    for (x, y) in e1.iter().zip(e2.iter()) {
                        decompose_equality(ctx, prop, x, y);
                    }
                }
                (Ty::Proj(n1, a1), Ty::Proj(n2, a2)) if n1 == n2 && a1.len() == a2.len() => {
                    for (x, y) in a1.iter().zip(a2.iter()) {
                        decompose_equality(ctx, prop, x, y);
                    }
                }
                _ => mismatch(ctx, prop, a, b),
            }
        }
    }
}

/// An intersection on the left is satisfied if some member is. Trial-
/// decompose each member; several viable members with distinct constraint
/// sets become a fork point resolved later by first-fit search.
fn decompose_intersection_lower(
    ctx: &mut SolverContext,
    prop: &mut Propagation,
    members: &[Ty],
    upper: &Ty,
) {
    let mut branches: ForkPointData = vec![];
    for member in members {
        match trial_decompose(ctx, &prop.position, member, upper) {
            // A member that satisfies the bound outright settles the whole
            // intersection.
            Some(branch) if branch.is_empty() => return,
            Some(branch) => {
                if !branches.contains(&branch) {
                    branches.push(branch);
                }
            }
            None => {}
        }
    }

    match branches.len() {
        0 => mismatch(ctx, prop, &Ty::Intersection(members.to_vec()), upper),
        1 => prop.queue.extend(branches.pop().unwrap()),
        _ => {
            if ctx.config().allow_forking {
                prop.fork_points.push(branches);
            } else {
                prop.queue.extend(branches.swap_remove(0));
            }
        }
    }
}

/// Decompose `lower <: upper` without committing anything: returns the
/// constraint set the branch would add, or None if it contradicts.
fn trial_decompose(
    ctx: &mut SolverContext,
    position: &IncorporationConstraintPosition,
    lower: &Ty,
    upper: &Ty,
) -> Option<ForkPointBranch> {
    let errors_before = ctx.storage().errors.len();
    let mut scratch = Propagation::new(position.clone());
    decompose_subtype(ctx, &mut scratch, lower, upper);

    if ctx.storage().errors.len() > errors_before {
        ctx.storage.errors.truncate(errors_before);
        return None;
    }

    let mut branch: ForkPointBranch = vec![];
    for pair in scratch.queue {
        if !branch.contains(&pair) {
            branch.push(pair);
        }
    }
    // A fork nested inside a single branch trial pre-commits to its first
    // alternative; outer first-fit search already fixes the order.
    for nested in scratch.fork_points {
        if let Some(first) = nested.into_iter().next() {
            for pair in first {
                if !branch.contains(&pair) {
                    branch.push(pair);
                }
            }
        }
    }
    Some(branch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::SolverConfig,
        mocks::MockTypeEnv,
        ty::TypeVariable,
    };

    fn ctx_with(vars: &[&str]) -> SolverContext {
        let mut env = MockTypeEnv::new();
        env.add_supertype("Int", Ty::name("Number"));
        let mut ctx = SolverContext::new(SolverConfig::default(), Box::new(env));
        for v in vars {
            ctx.register_variable(TypeVariable::new(*v));
        }
        ctx
    }

    fn constraints_of<'a>(ctx: &'a SolverContext, var: &str) -> &'a [Constraint] {
        ctx.storage().not_fixed_type_variables[&TyVar::new(var)].constraints()
    }

    #[test]
    fn subtype_between_two_variables_binds_both_sides() {
        let mut ctx = ctx_with(&["Tv", "Xv"]);
        let injector = StructuralInjector::new();

        injector.add_initial_subtype_constraint(
            &mut ctx,
            Ty::var("Tv"),
            Ty::var("Xv"),
            ConstraintPosition::Argument(0),
        );

        assert!(constraints_of(&ctx, "Xv")
            .iter()
            .any(|c| c.kind == ConstraintKind::Lower && c.ty == Ty::var("Tv")));
        assert!(constraints_of(&ctx, "Tv")
            .iter()
            .any(|c| c.kind == ConstraintKind::Upper && c.ty == Ty::var("Xv")));
    }

    #[test]
    fn nominal_supertype_walk_binds_variable_arguments() {
        // MyList's declared supertype Collection[Int] lines up with the
        // Collection[Xv] bound and pins Xv.
        let mut env = MockTypeEnv::new();
        env.add_supertype("MyList", Ty::proj("Collection", vec![Ty::name("Int")]));
        let mut ctx = SolverContext::new(SolverConfig::default(), Box::new(env));
        ctx.register_variable(TypeVariable::new("Xv"));
        let injector = StructuralInjector::new();

        injector.add_initial_subtype_constraint(
            &mut ctx,
            Ty::name("MyList"),
            Ty::proj("Collection", vec![Ty::var("Xv")]),
            ConstraintPosition::Argument(0),
        );

        assert!(!ctx.storage().has_contradiction());
        assert!(constraints_of(&ctx, "Xv")
            .iter()
            .any(|c| c.kind == ConstraintKind::Equality && c.ty == Ty::name("Int")));
    }

    #[test]
    fn error_type_poisons_the_variable_without_a_mismatch() {
        let mut ctx = ctx_with(&["Tv"]);
        let injector = StructuralInjector::new();

        injector.add_initial_subtype_constraint(
            &mut ctx,
            Ty::Error,
            Ty::var("Tv"),
            ConstraintPosition::Argument(0),
        );

        assert!(ctx.storage().errors.iter().any(|e| matches!(
            e,
            ConstraintSystemError::ConstrainingTypeIsError { variable, .. }
                if *variable == TyVar::new("Tv")
        )));
        assert!(constraints_of(&ctx, "Tv").is_empty());
    }

    #[test]
    fn captured_type_from_subtyping_may_not_escape() {
        let mut ctx = ctx_with(&["Tv"]);
        let injector = StructuralInjector::new();

        let captured = Ty::captured(CaptureStatus::ForSubtyping, Some(Ty::name("Int")));
        injector.add_initial_subtype_constraint(
            &mut ctx,
            captured,
            Ty::var("Tv"),
            ConstraintPosition::Argument(0),
        );

        assert!(ctx
            .storage()
            .errors
            .iter()
            .any(|e| matches!(e, ConstraintSystemError::CapturedTypeFromSubtyping { .. })));
        assert!(constraints_of(&ctx, "Tv").is_empty());
    }

    #[test]
    fn declared_upper_bound_to_any_is_skipped() {
        let mut ctx = ctx_with(&["Tv"]);
        let injector = StructuralInjector::new();

        injector.add_initial_subtype_constraint(
            &mut ctx,
            Ty::var("Tv"),
            Ty::Any,
            ConstraintPosition::DeclaredUpperBound(TyVar::new("Tv")),
        );

        assert!(constraints_of(&ctx, "Tv").is_empty());
        assert!(ctx.storage().errors.is_empty());
    }

    #[test]
    fn intersection_with_one_viable_member_commits_directly() {
        let mut ctx = ctx_with(&["Xv"]);
        let injector = StructuralInjector::new();

        // Only the A member matches the A[..] bound; no fork is needed.
        let lower = Ty::intersection(vec![
            Ty::proj("A", vec![Ty::name("Int")]),
            Ty::name("Unrelated"),
        ]);
        injector.add_initial_subtype_constraint(
            &mut ctx,
            lower,
            Ty::proj("A", vec![Ty::var("Xv")]),
            ConstraintPosition::Argument(0),
        );

        assert!(ctx.storage().constraints_from_all_fork_points.is_empty());
        assert!(constraints_of(&ctx, "Xv")
            .iter()
            .any(|c| c.kind == ConstraintKind::Equality && c.ty == Ty::name("Int")));
    }
}
