// Incorporation: propagate a newly-added constraint against everything the
// store already knows.
//
// Three rules fire for a new constraint `target R ty`:
//  1. if `ty` is itself an unfixed variable, constraints transfer across
//     the relation in both directions;
//  2. if the constraint is an equality with a proper type, that type is
//     substituted into every other variable's constraints mentioning
//     `target`;
//  3. the new bound is cross-checked against the variable's existing bounds,
//     which is where contradictions between proper types surface.

use std::collections::BTreeSet;

use crate::{
    constraints::{Constraint, ConstraintKind},
    context::SolverContext,
    injector::{decompose_subtype, is_allowed_type, push_new_constraint, Propagation},
    ty::TyVar,
};

pub(crate) fn incorporate(
    ctx: &mut SolverContext,
    prop: &mut Propagation,
    target: &TyVar,
    constraint: &Constraint,
) {
    direct_with_variable(ctx, prop, target, constraint);
    inside_other_constraints(ctx, prop, target, constraint);
    check_existing_bounds(ctx, prop, target, constraint);
}

/// Compose two relations that share a middle term: given `x R1 m` and
/// `m R2 t`, the relation of `x` to `t`, if any.
fn combine(r1: ConstraintKind, r2: ConstraintKind) -> Option<ConstraintKind> {
    use ConstraintKind::*;
    match (r1, r2) {
        (Equality, Equality) => Some(Equality),
        (Upper, Upper) | (Upper, Equality) | (Equality, Upper) => Some(Upper),
        (Lower, Lower) | (Lower, Equality) | (Equality, Lower) => Some(Lower),
        (Upper, Lower) | (Lower, Upper) => None,
    }
}

fn invert(kind: ConstraintKind) -> ConstraintKind {
    match kind {
        ConstraintKind::Lower => ConstraintKind::Upper,
        ConstraintKind::Upper => ConstraintKind::Lower,
        ConstraintKind::Equality => ConstraintKind::Equality,
    }
}

/// Rule 1: `target R other` where `other` is an unfixed variable of this
/// session. Constraints of each side derive constraints on the other.
fn direct_with_variable(
    ctx: &mut SolverContext,
    prop: &mut Propagation,
    target: &TyVar,
    constraint: &Constraint,
) {
    let other = match constraint.ty.head_var() {
        Some(v) => v.clone(),
        None => return,
    };
    if !ctx.storage().not_fixed_type_variables.contains_key(&other) {
        if ctx.is_registered_variable(&other) {
            panic!(
                "type variable {} should not be fixed! base constraint: {}",
                other, prop.position
            );
        }
        // Not a variable of this session; opaque.
        return;
    }

    let derive = |from: &Constraint, extra: &TyVar| -> BTreeSet<TyVar> {
        let mut derived = constraint.derived_from.clone();
        derived.extend(from.derived_from.iter().cloned());
        derived.insert(extra.clone());
        derived
    };

    // Constraints of `other` carried over to `target`:
    //   target R1 other, other R2 t  =>  target R3 t.
    let other_constraints: Vec<Constraint> = ctx.storage().not_fixed_type_variables[&other]
        .constraints()
        .to_vec();
    for c in &other_constraints {
        if let Some(kind) = combine(constraint.kind, c.kind) {
            let derived = derive(c, &other);
            push_new_constraint(ctx, prop, target.clone(), kind, c.ty.clone(), derived);
        }
    }

    // Constraints of `target` carried over to `other`: invert the new
    // relation so it reads from `other`'s side, then compose the same way.
    let target_constraints: Vec<Constraint> = ctx.storage().not_fixed_type_variables[target]
        .constraints()
        .to_vec();
    for c in &target_constraints {
        if let Some(kind) = combine(invert(constraint.kind), c.kind) {
            let derived = derive(c, target);
            push_new_constraint(ctx, prop, other.clone(), kind, c.ty.clone(), derived);
        }
    }
}

/// Rule 2: an equality `target == T` with proper `T` rewrites `target`
/// inside every other variable's constraints. The stale constraints are
/// not removed here; fixation purges them once the variable leaves the
/// store.
fn inside_other_constraints(
    ctx: &mut SolverContext,
    prop: &mut Propagation,
    target: &TyVar,
    constraint: &Constraint,
) {
    if constraint.kind != ConstraintKind::Equality {
        return;
    }
    if !ctx.is_proper_type_uncached(&constraint.ty) {
        return;
    }

    let mut rewrites: Vec<(TyVar, Constraint)> = vec![];
    for (other_var, vwc) in ctx.storage().not_fixed_type_variables.iter() {
        if other_var == target {
            continue;
        }
        for c in vwc.constraints() {
            if !c.ty.contains_var(target) {
                continue;
            }
            let new_ty = c.ty.replace_var(target, &constraint.ty);
            let mut derived = c.derived_from.clone();
            derived.insert(target.clone());
            rewrites.push((
                other_var.clone(),
                Constraint::new(c.kind, new_ty, c.position.clone(), derived, c.is_nullability_constraint),
            ));
        }
    }
    for (var, c) in rewrites {
        let derived = c.derived_from.clone();
        push_new_constraint(ctx, prop, var, c.kind, c.ty, derived);
    }
}

/// Rule 3: cross-check the new bound against the variable's existing
/// bounds. Every lower/upper pair that the new constraint completes is
/// related; proper pairs that fail produce errors, pairs mentioning other
/// variables decompose into further constraints.
fn check_existing_bounds(
    ctx: &mut SolverContext,
    prop: &mut Propagation,
    target: &TyVar,
    constraint: &Constraint,
) {
    let existing: Vec<Constraint> = ctx.storage().not_fixed_type_variables[target]
        .constraints()
        .to_vec();

    match constraint.kind {
        ConstraintKind::Upper => {
            for c in &existing {
                if matches!(c.kind, ConstraintKind::Lower | ConstraintKind::Equality) {
                    relate(ctx, prop, target, &c.ty, &constraint.ty);
                }
            }
        }
        ConstraintKind::Lower => {
            for c in &existing {
                if matches!(c.kind, ConstraintKind::Upper | ConstraintKind::Equality) {
                    relate(ctx, prop, target, &constraint.ty, &c.ty);
                }
            }
        }
        ConstraintKind::Equality => {
            for c in &existing {
                match c.kind {
                    ConstraintKind::Lower => relate(ctx, prop, target, &c.ty, &constraint.ty),
                    ConstraintKind::Upper => relate(ctx, prop, target, &constraint.ty, &c.ty),
                    ConstraintKind::Equality => {
                        relate(ctx, prop, target, &constraint.ty, &c.ty);
                        relate(ctx, prop, target, &c.ty, &constraint.ty);
                    }
                }
            }
        }
    }
}

fn relate(
    ctx: &mut SolverContext,
    prop: &mut Propagation,
    target: &TyVar,
    lower: &crate::ty::Ty,
    upper: &crate::ty::Ty,
) {
    if !is_allowed_type(ctx, lower) || !is_allowed_type(ctx, upper) {
        return;
    }
    // Everything this pair decomposes into exists because `target` is being
    // constrained; record the provenance.
    let saved = prop.derivation_seed.clone();
    prop.derivation_seed.insert(target.clone());
    decompose_subtype(ctx, prop, lower, upper);
    prop.derivation_seed = saved;
}
