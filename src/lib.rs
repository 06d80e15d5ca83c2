//! Transactional constraint solving for generic type inference.
//!
//! One `ConstraintSystem` owns one inference session: the caller registers
//! type variables, adds subtype/equality constraints (decomposed and
//! incorporated by a pluggable injector), speculates inside rollback-exact
//! transactions, resolves fork points by first-fit search, and finally
//! fixes each variable to a result type. Type-system failures accumulate
//! as data in the session's storage; contract violations panic.

pub mod config;
pub mod constraints;
pub mod context;
pub mod env;
pub mod error;
mod incorporation;
pub mod injector;
pub mod logger;
pub mod mocks;
pub mod position;
pub mod storage;
pub mod subst;
pub mod subtype;
pub mod system;
pub mod ty;

pub use config::SolverConfig;
pub use constraints::{
    Constraint, ConstraintKind, ForkPointBranch, ForkPointData, IncorporationConstraintPosition,
    InitialConstraint, VariableWithConstraints,
};
pub use context::SolverContext;
pub use env::{EmptyTypeEnv, TypeEnv};
pub use error::{Applicability, ConstraintSystemError, EmptyIntersectionInfo, EmptyIntersectionKind};
pub use injector::{ConstraintInjector, StructuralInjector};
pub use position::ConstraintPosition;
pub use storage::ConstraintStorage;
pub use subst::{Subst, Substitutable};
pub use system::{ConstraintSystem, TransactionSnapshot};
pub use ty::{CaptureStatus, CapturedTy, Ty, TyHead, TyName, TyVar, TyVarAllocator, TypeVariable};
