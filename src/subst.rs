// Substitution map for inference variables.

use std::collections::HashMap;
use std::iter::FromIterator;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::ty::{CapturedTy, Ty, TyVar};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subst(HashMap<TyVar, Ty>);

impl Deref for Subst {
    type Target = HashMap<TyVar, Ty>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Subst {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl IntoIterator for Subst {
    type Item = (TyVar, Ty);

    type IntoIter = std::collections::hash_map::IntoIter<TyVar, Ty>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<(TyVar, Ty)> for Subst {
    fn from_iter<T: IntoIterator<Item = (TyVar, Ty)>>(iter: T) -> Self {
        let mut subst = Subst::new();
        for (k, v) in iter {
            subst.insert(k, v);
        }
        subst
    }
}

impl Subst {
    pub fn new() -> Self {
        Subst(HashMap::new())
    }

    /// Apply this substitution to a type, returning the rewritten type.
    /// Bindings are applied repeatedly until the type no longer changes, so
    /// chains like `?t0 -> ?t1 -> Int` resolve fully. Iteration is bounded
    /// by the number of bindings; a binding chain cannot be longer.
    pub fn apply(&self, ty: &Ty) -> Ty {
        let mut current = ty.clone();
        for _ in 0..=self.len() {
            let mut next = current.clone();
            next.apply_subst(self);
            if next == current {
                return next;
            }
            current = next;
        }
        current
    }
}

impl std::fmt::Display for Subst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "{{}}");
        }

        let mut lines = self.iter().collect::<Vec<_>>();
        lines.sort_by_key(|(var, _)| (*var).clone());

        write!(f, "{{")?;
        for (i, (var, ty)) in lines.into_iter().enumerate() {
            if i != 0 {
                write!(f, ",")?;
            }
            write!(f, " {}: {}", var, ty)?;
        }
        write!(f, " }}")
    }
}

pub trait Substitutable {
    fn apply_subst(&mut self, subst: &Subst);
}

impl Substitutable for Ty {
    fn apply_subst(&mut self, subst: &Subst) {
        match self {
            Ty::Var(v) => {
                if let Some(ty) = subst.get(v) {
                    *self = ty.clone();
                }
            }
            Ty::Const(_) | Ty::Any | Ty::Never | Ty::Error => {}
            Ty::Proj(_, args) | Ty::Tuple(args) => {
                for arg in args {
                    arg.apply_subst(subst);
                }
            }
            Ty::Intersection(members) => {
                for member in members.iter_mut() {
                    member.apply_subst(subst);
                }
                // Substitution can merge members; renormalize.
                *self = Ty::intersection(std::mem::take(members));
            }
            Ty::Func(params, ret) => {
                for param in params {
                    param.apply_subst(subst);
                }
                ret.apply_subst(subst);
            }
            Ty::Captured(c) => {
                let CapturedTy { projection, .. } = c.as_mut();
                if let Some(ty) = projection {
                    ty.apply_subst(subst);
                }
            }
        }
    }
}

impl<T: Substitutable> Substitutable for Vec<T> {
    fn apply_subst(&mut self, subst: &Subst) {
        for item in self {
            item.apply_subst(subst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_resolves_chains() {
        let mut subst = Subst::new();
        subst.insert(TyVar::new("?t0"), Ty::var("?t1"));
        subst.insert(TyVar::new("?t1"), Ty::name("Int"));

        let ty = Ty::proj("List", vec![Ty::var("?t0")]);
        assert_eq!(subst.apply(&ty), Ty::proj("List", vec![Ty::name("Int")]));
    }

    #[test]
    fn subst_renormalizes_intersections() {
        let mut subst = Subst::new();
        subst.insert(TyVar::new("?t0"), Ty::name("A"));

        let mut ty = Ty::intersection(vec![Ty::var("?t0"), Ty::name("A")]);
        ty.apply_subst(&subst);
        assert_eq!(ty, Ty::name("A"));
    }
}
