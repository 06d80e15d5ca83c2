// Nominal environment consulted by the structural checker.

use std::collections::VecDeque;

use crate::ty::{Ty, TyName};

/// Answers the two nominal questions the solver cannot answer structurally:
/// which declared supertypes a named type has, and whether a named type is
/// final (no further subtypes can exist, which makes emptiness of an
/// intersection provable).
pub trait TypeEnv {
    /// Direct declared supertypes of `name`, e.g. `Int -> [Number]`.
    fn supertypes_of(&self, name: &TyName) -> Vec<Ty>;

    fn is_final(&self, name: &TyName) -> bool;
}

/// The empty nominal hierarchy: no declared supertypes, nothing final.
/// Subtyping degenerates to structural equality.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyTypeEnv;

impl TypeEnv for EmptyTypeEnv {
    fn supertypes_of(&self, _name: &TyName) -> Vec<Ty> {
        vec![]
    }

    fn is_final(&self, _name: &TyName) -> bool {
        false
    }
}

/// Walk the declared-supertype graph from `name`, yielding every transitive
/// supertype once. Breadth-first so the nearest ancestors come out first.
pub fn transitive_supertypes(env: &dyn TypeEnv, name: &TyName) -> Vec<Ty> {
    let mut out: Vec<Ty> = vec![];
    let mut queue: VecDeque<TyName> = VecDeque::new();
    queue.push_back(name.clone());
    while let Some(next) = queue.pop_front() {
        for ty in env.supertypes_of(&next) {
            if out.contains(&ty) {
                continue;
            }
            match &ty {
                Ty::Const(n) | Ty::Proj(n, _) => queue.push_back(n.clone()),
                _ => {}
            }
            out.push(ty);
        }
    }
    out
}
