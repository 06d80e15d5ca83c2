// Core type representation for the constraint solver.
//
// The solver only observes a small surface of the type language: head
// constructors, variable mentions, nesting depth and structural shape.
// Everything else (nominal hierarchy, finality) is answered by a `TypeEnv`.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub const META_PREFIX: &'static str = "?t";

/// Name of a nominal type constructor (`Int`, `List`, ...).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TyName(String);

impl TyName {
    pub fn new<S: Into<String>>(name: S) -> TyName {
        TyName(name.into())
    }

    #[inline(always)]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TyName {
    fn from(value: &str) -> Self {
        TyName(value.to_string())
    }
}

impl std::fmt::Display for TyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An inference variable. Identity is the name; the allocator below keeps
/// names unique within a session.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TyVar(String);

impl TyVar {
    pub fn new<S: Into<String>>(name: S) -> TyVar {
        TyVar(name.into())
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TyVar {
    fn from(value: &str) -> Self {
        TyVar(value.to_string())
    }
}

impl std::fmt::Display for TyVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Allocator for fresh inference variables (`?tN`).
///
/// Each inference session owns one so that variable names stay deterministic
/// per call site without global mutable state.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TyVarAllocator {
    next_id: u32,
    #[serde(default)]
    prefix: Option<String>,
}

impl TyVarAllocator {
    pub fn new() -> Self {
        TyVarAllocator::default()
    }

    /// Create an allocator whose variables carry an extra scope marker,
    /// e.g. `?t:f3a1:0` for variables minted while resolving one call.
    pub fn with_scope(scope: impl Into<String>) -> Self {
        TyVarAllocator {
            next_id: 0,
            prefix: Some(format!("{}:{}:", META_PREFIX, scope.into())),
        }
    }

    pub fn alloc(&mut self) -> TyVar {
        let name = if let Some(ref prefix) = self.prefix {
            format!("{}{}", prefix, self.next_id)
        } else {
            format!("{}{}", META_PREFIX, self.next_id)
        };
        self.next_id += 1;
        TyVar::new(name)
    }

    pub fn curr_id(&self) -> u32 {
        self.next_id
    }
}

/// A type variable as registered with the constraint system, together with
/// the attributes the solver needs to honor when fixing it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeVariable {
    pub var: TyVar,
    /// When set, the variable may only be resolved to one of the types that
    /// were directly supplied at its use sites (argument/receiver/expected
    /// types), never to an unrelated supertype.
    pub only_input_types: bool,
}

impl TypeVariable {
    pub fn new<V: Into<TyVar>>(var: V) -> TypeVariable {
        TypeVariable {
            var: var.into(),
            only_input_types: false,
        }
    }

    pub fn with_only_input_types<V: Into<TyVar>>(var: V) -> TypeVariable {
        TypeVariable {
            var: var.into(),
            only_input_types: true,
        }
    }
}

/// How a captured type came to be. Captures made while checking an
/// expression may leak into constraints; captures made for subtyping or
/// incorporation must not outlive the operation that created them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CaptureStatus {
    FromExpression,
    ForSubtyping,
    ForIncorporation,
}

/// A captured projection argument. `projection == None` is a star
/// projection (nothing usable underneath).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CapturedTy {
    pub status: CaptureStatus,
    pub projection: Option<Ty>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Ty {
    // Primitive / nominal types without arguments.
    Const(TyName),

    // Inference variables.
    Var(TyVar),

    // Applied type constructors: List[T], Map[K, V], ...
    Proj(TyName, Vec<Ty>),

    // Function types: (T0, T1, ...) -> Tn.
    Func(Vec<Ty>, Box<Ty>),

    // Product types; the empty tuple is unit.
    Tuple(Vec<Ty>),

    // Intersection of all members. Always flattened, members deduplicated.
    Intersection(Vec<Ty>),

    // A captured projection argument.
    Captured(Box<CapturedTy>),

    // Top type.
    Any,

    // Bottom type.
    #[default]
    Never,

    // Placeholder produced upstream for unresolvable source types.
    Error,
}

/// Head constructor of a type, used for structural matching and for the
/// solver's constructor-level bookkeeping.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TyHead {
    Name(TyName),
    Var(TyVar),
    Func(usize),
    Tuple(usize),
    Intersection,
    Captured,
    Any,
    Never,
    Error,
}

impl Ty {
    /// Unit type `()`, represented as an empty tuple.
    #[inline(always)]
    pub fn unit() -> Self {
        Ty::Tuple(vec![])
    }

    pub fn var<V: Into<TyVar>>(v: V) -> Self {
        Ty::Var(v.into())
    }

    pub fn name<N: Into<TyName>>(n: N) -> Self {
        Ty::Const(n.into())
    }

    pub fn proj<N: Into<TyName>>(n: N, args: Vec<Ty>) -> Self {
        Ty::Proj(n.into(), args)
    }

    /// Build an intersection type, flattening nested intersections and
    /// dropping duplicate members. Zero members is `Any` (the neutral
    /// element); one member is the member itself.
    pub fn intersection(members: Vec<Ty>) -> Self {
        let mut flat: Vec<Ty> = Vec::with_capacity(members.len());
        for member in members {
            match member {
                Ty::Intersection(inner) => {
                    for m in inner {
                        if !flat.contains(&m) {
                            flat.push(m);
                        }
                    }
                }
                m => {
                    if !flat.contains(&m) {
                        flat.push(m);
                    }
                }
            }
        }
        match flat.len() {
            0 => Ty::Any,
            1 => flat.pop().unwrap(),
            _ => Ty::Intersection(flat),
        }
    }

    pub fn captured(status: CaptureStatus, projection: Option<Ty>) -> Self {
        Ty::Captured(Box::new(CapturedTy { status, projection }))
    }

    pub fn head(&self) -> TyHead {
        match self {
            Ty::Const(name) => TyHead::Name(name.clone()),
            Ty::Var(v) => TyHead::Var(v.clone()),
            Ty::Proj(name, _) => TyHead::Name(name.clone()),
            Ty::Func(params, _) => TyHead::Func(params.len()),
            Ty::Tuple(elems) => TyHead::Tuple(elems.len()),
            Ty::Intersection(_) => TyHead::Intersection,
            Ty::Captured(_) => TyHead::Captured,
            Ty::Any => TyHead::Any,
            Ty::Never => TyHead::Never,
            Ty::Error => TyHead::Error,
        }
    }

    /// The variable at the head of this type, if any.
    #[inline(always)]
    pub fn head_var(&self) -> Option<&TyVar> {
        match self {
            Ty::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Ty::Any)
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Ty::Never)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Ty::Error)
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Ty::Tuple(elems) if elems.is_empty())
    }

    /// Walk the type top-down, returning true as soon as `pred` matches any
    /// subterm (including the type itself).
    pub fn contains(&self, pred: &mut impl FnMut(&Ty) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Ty::Const(_) | Ty::Var(_) | Ty::Any | Ty::Never | Ty::Error => false,
            Ty::Proj(_, args) | Ty::Tuple(args) | Ty::Intersection(args) => {
                args.iter().any(|t| t.contains(pred))
            }
            Ty::Func(params, ret) => params.iter().any(|t| t.contains(pred)) || ret.contains(pred),
            Ty::Captured(c) => c.projection.as_ref().map_or(false, |t| t.contains(pred)),
        }
    }

    pub fn contains_var(&self, var: &TyVar) -> bool {
        self.contains(&mut |t| matches!(t, Ty::Var(v) if v == var))
    }

    pub fn mentions_any_var(&self, mut is_tracked: impl FnMut(&TyVar) -> bool) -> bool {
        self.contains(&mut |t| matches!(t, Ty::Var(v) if is_tracked(v)))
    }

    /// Structural nesting depth; leaves are depth 1. Used to bound
    /// incorporation so derived constraints cannot grow without limit.
    pub fn depth(&self) -> usize {
        match self {
            Ty::Const(_) | Ty::Var(_) | Ty::Any | Ty::Never | Ty::Error => 1,
            Ty::Proj(_, args) | Ty::Tuple(args) | Ty::Intersection(args) => {
                1 + args.iter().map(|t| t.depth()).max().unwrap_or(0)
            }
            Ty::Func(params, ret) => {
                1 + params
                    .iter()
                    .map(|t| t.depth())
                    .chain(std::iter::once(ret.depth()))
                    .max()
                    .unwrap_or(0)
            }
            Ty::Captured(c) => 1 + c.projection.as_ref().map_or(0, |t| t.depth()),
        }
    }

    /// Replace every occurrence of `var` with `replacement`.
    pub fn replace_var(&self, var: &TyVar, replacement: &Ty) -> Ty {
        match self {
            Ty::Var(v) if v == var => replacement.clone(),
            Ty::Const(_) | Ty::Var(_) | Ty::Any | Ty::Never | Ty::Error => self.clone(),
            Ty::Proj(name, args) => Ty::Proj(
                name.clone(),
                args.iter().map(|t| t.replace_var(var, replacement)).collect(),
            ),
            Ty::Tuple(elems) => Ty::Tuple(
                elems
                    .iter()
                    .map(|t| t.replace_var(var, replacement))
                    .collect(),
            ),
            Ty::Intersection(members) => Ty::intersection(
                members
                    .iter()
                    .map(|t| t.replace_var(var, replacement))
                    .collect(),
            ),
            Ty::Func(params, ret) => Ty::Func(
                params
                    .iter()
                    .map(|t| t.replace_var(var, replacement))
                    .collect(),
                Box::new(ret.replace_var(var, replacement)),
            ),
            Ty::Captured(c) => Ty::Captured(Box::new(CapturedTy {
                status: c.status,
                projection: c
                    .projection
                    .as_ref()
                    .map(|t| t.replace_var(var, replacement)),
            })),
        }
    }
}

/// Stable hash of a type, cached on constraints so equality checks can bail
/// early. Uses the same hasher the rest of the project uses for identity
/// hashes.
pub fn ty_hash(ty: &Ty) -> u64 {
    let mut h = fnv::FnvHasher::default();
    ty.hash(&mut h);
    h.finish()
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use itertools::Itertools;
        match self {
            Ty::Never => write!(f, "never"),
            Ty::Any => write!(f, "any"),
            Ty::Error => write!(f, "<error>"),
            Ty::Const(name) => write!(f, "{}", name),
            Ty::Var(v) => write!(f, "{}", v),
            Ty::Proj(name, args) => {
                if args.is_empty() {
                    write!(f, "{}", name)
                } else {
                    write!(f, "{}[{}]", name, args.iter().map(|t| t.to_string()).join(", "))
                }
            }
            Ty::Func(params, ret) => {
                write!(
                    f,
                    "({}) -> {}",
                    params.iter().map(|t| t.to_string()).join(", "),
                    ret
                )
            }
            Ty::Tuple(elems) => {
                write!(f, "({})", elems.iter().map(|t| t.to_string()).join(", "))
            }
            Ty::Intersection(members) => {
                write!(f, "{}", members.iter().map(|t| t.to_string()).join(" & "))
            }
            Ty::Captured(c) => match &c.projection {
                Some(ty) => write!(f, "captured({})", ty),
                None => write!(f, "captured(*)"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_flattens_and_dedupes() {
        let a = Ty::name("A");
        let b = Ty::name("B");
        let nested = Ty::intersection(vec![
            a.clone(),
            Ty::intersection(vec![b.clone(), a.clone()]),
        ]);
        assert_eq!(nested, Ty::Intersection(vec![a.clone(), b]));
        assert_eq!(Ty::intersection(vec![a.clone()]), a);
        assert_eq!(Ty::intersection(vec![]), Ty::Any);
    }

    #[test]
    fn depth_counts_nesting() {
        let list_of_list = Ty::proj("List", vec![Ty::proj("List", vec![Ty::name("Int")])]);
        assert_eq!(list_of_list.depth(), 3);
        assert_eq!(Ty::name("Int").depth(), 1);
        let func = Ty::Func(vec![Ty::name("Int")], Box::new(Ty::unit()));
        assert_eq!(func.depth(), 2);
    }

    #[test]
    fn contains_var_sees_through_structure() {
        let v = TyVar::new("?t0");
        let ty = Ty::Func(
            vec![Ty::proj("List", vec![Ty::Var(v.clone())])],
            Box::new(Ty::name("Int")),
        );
        assert!(ty.contains_var(&v));
        assert!(!ty.contains_var(&TyVar::new("?t1")));

        let captured = Ty::captured(CaptureStatus::FromExpression, Some(Ty::Var(v.clone())));
        assert!(captured.contains_var(&v));
        let star = Ty::captured(CaptureStatus::FromExpression, None);
        assert!(!star.contains_var(&v));
    }

    #[test]
    fn replace_var_rebuilds_intersections() {
        let v = TyVar::new("?t0");
        let ty = Ty::intersection(vec![Ty::Var(v.clone()), Ty::name("A")]);
        let replaced = ty.replace_var(&v, &Ty::name("A"));
        // Both members collapse to `A`, so the intersection disappears.
        assert_eq!(replaced, Ty::name("A"));
    }

    #[test]
    fn allocator_names_are_fresh() {
        let mut alloc = TyVarAllocator::new();
        let a = alloc.alloc();
        let b = alloc.alloc();
        assert_ne!(a, b);
        assert_eq!(a.name(), "?t0");

        let mut scoped = TyVarAllocator::with_scope("f3a1");
        assert_eq!(scoped.alloc().name(), "?t:f3a1:0");
    }
}
