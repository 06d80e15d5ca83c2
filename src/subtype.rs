//! Subtype and equality checks over proper types.
//!
//! These functions decide relations between types that mention no inference
//! variable of the current session. Variable-aware decomposition lives in
//! the injector; by the time a pair of types reaches this module, a failed
//! check is a genuine type error.

use crate::{
    env::{transitive_supertypes, TypeEnv},
    ty::Ty,
};

/// Is `lower` a subtype of `upper`?
///
/// Structural, with nominal edges supplied by the environment. Error types
/// compare as compatible with everything so one upstream failure does not
/// fan out into spurious mismatches.
pub fn is_subtype(env: &dyn TypeEnv, lower: &Ty, upper: &Ty) -> bool {
    if lower == upper {
        return true;
    }

    if lower.is_error() || upper.is_error() {
        return true;
    }

    if lower.is_never() || upper.is_any() {
        return true;
    }

    match (lower, upper) {
        // An intersection is at least as specific as each of its members.
        (Ty::Intersection(members), _) => members.iter().any(|m| is_subtype(env, m, upper)),
        (_, Ty::Intersection(members)) => members.iter().all(|m| is_subtype(env, lower, m)),

        (Ty::Captured(c), _) => match &c.projection {
            Some(p) => is_subtype(env, p, upper),
            None => false,
        },
        (_, Ty::Captured(c)) => match &c.projection {
            Some(p) => is_subtype(env, lower, p),
            None => false,
        },

        (Ty::Func(p1, r1), Ty::Func(p2, r2)) => {
            p1.len() == p2.len()
                && p1.iter().zip(p2.iter()).all(|(a, b)| is_subtype(env, b, a))
                && is_subtype(env, r1, r2)
        }

        (Ty::Tuple(e1), Ty::Tuple(e2)) => {
            e1.len() == e2.len() && e1.iter().zip(e2.iter()).all(|(a, b)| is_subtype(env, a, b))
        }

        // Same constructor: arguments are invariant.
        (Ty::Proj(n1, a1), Ty::Proj(n2, a2)) if n1 == n2 => {
            a1.len() == a2.len() && a1.iter().zip(a2.iter()).all(|(a, b)| equal_types(env, a, b))
        }

        // Nominal fallback: walk declared supertypes.
        (Ty::Const(name), _) | (Ty::Proj(name, _), _) => transitive_supertypes(env, name)
            .iter()
            .any(|s| s == upper || is_subtype(env, s, upper)),

        _ => false,
    }
}

pub fn equal_types(env: &dyn TypeEnv, a: &Ty, b: &Ty) -> bool {
    a == b || (is_subtype(env, a, b) && is_subtype(env, b, a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockTypeEnv;
    use crate::ty::Ty;

    fn env() -> MockTypeEnv {
        let mut env = MockTypeEnv::new();
        env.add_supertype("Int", Ty::name("Number"));
        env.add_supertype("Number", Ty::name("Comparable"));
        env
    }

    #[test]
    fn nominal_edges_are_transitive() {
        let env = env();
        assert!(is_subtype(&env, &Ty::name("Int"), &Ty::name("Number")));
        assert!(is_subtype(&env, &Ty::name("Int"), &Ty::name("Comparable")));
        assert!(!is_subtype(&env, &Ty::name("Number"), &Ty::name("Int")));
        assert!(!is_subtype(&env, &Ty::name("Str"), &Ty::name("Int")));
    }

    #[test]
    fn functions_are_contravariant_in_parameters() {
        let env = env();
        let f = Ty::Func(vec![Ty::name("Number")], Box::new(Ty::name("Int")));
        let g = Ty::Func(vec![Ty::name("Int")], Box::new(Ty::name("Number")));
        assert!(is_subtype(&env, &f, &g));
        assert!(!is_subtype(&env, &g, &f));
    }

    #[test]
    fn proj_arguments_are_invariant() {
        let env = env();
        let list_int = Ty::proj("List", vec![Ty::name("Int")]);
        let list_num = Ty::proj("List", vec![Ty::name("Number")]);
        assert!(!is_subtype(&env, &list_int, &list_num));
        assert!(is_subtype(&env, &list_int, &list_int.clone()));
    }

    #[test]
    fn intersections_relate_memberwise() {
        let env = env();
        let both = Ty::intersection(vec![Ty::name("Int"), Ty::name("Str")]);
        assert!(is_subtype(&env, &both, &Ty::name("Str")));
        assert!(is_subtype(&env, &both, &Ty::name("Number")));
        assert!(!is_subtype(&env, &Ty::name("Int"), &both));
    }
}
