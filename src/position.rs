// Constraint positions: why a constraint exists.
//
// Positions are opaque to the solver except for two questions it asks of
// them: is this an "input type" position (argument-like, relevant to the
// only-input-types check), and does a failed constraint trace back to the
// receiver (which downgrades the failure to a wrong-receiver applicability
// when ranking candidates).

use serde::{Deserialize, Serialize};

use crate::ty::TyVar;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstraintPosition {
    /// An explicit type argument written at the call site.
    ExplicitTypeArgument,
    /// The expected type flowing in from the surrounding context.
    ExpectedType,
    /// The n-th value argument of the call.
    Argument(usize),
    /// The receiver of the call.
    Receiver,
    /// The n-th argument, a lambda whose type is analyzed late.
    LambdaArgument(usize),
    /// A declared upper bound of the type parameter behind `var`.
    DeclaredUpperBound(TyVar),
    /// The equality injected when `var` is fixed to its result type.
    FixVariable(TyVar),
    /// A constraint injected by builder inference for `var`.
    BuilderInference(TyVar),
    /// A constraint belonging to one branch of a fork point.
    ForkPointBranch,
}

impl ConstraintPosition {
    /// Positions whose constraints carry directly-supplied call input types.
    /// Only these count when deciding whether an only-input-types variable
    /// was resolved legally.
    pub fn is_input_type_position(&self) -> bool {
        matches!(
            self,
            ConstraintPosition::ExpectedType
                | ConstraintPosition::Argument(_)
                | ConstraintPosition::Receiver
                | ConstraintPosition::LambdaArgument(_)
        )
    }
}

impl std::fmt::Display for ConstraintPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintPosition::ExplicitTypeArgument => write!(f, "explicit type argument"),
            ConstraintPosition::ExpectedType => write!(f, "expected type"),
            ConstraintPosition::Argument(i) => write!(f, "argument #{}", i),
            ConstraintPosition::Receiver => write!(f, "receiver"),
            ConstraintPosition::LambdaArgument(i) => write!(f, "lambda argument #{}", i),
            ConstraintPosition::DeclaredUpperBound(v) => write!(f, "declared upper bound of {}", v),
            ConstraintPosition::FixVariable(v) => write!(f, "fix variable {}", v),
            ConstraintPosition::BuilderInference(v) => write!(f, "builder inference for {}", v),
            ConstraintPosition::ForkPointBranch => write!(f, "fork point branch"),
        }
    }
}
