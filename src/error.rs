// Constraint-system errors.
//
// Errors are data, not control flow: the solver accumulates them in storage
// and keeps going, and the caller renders them after resolution finishes.
// The one permitted transformation is the explicit error-to-warning
// downgrade used by the missed-constraint re-check.

use itertools::Itertools;

use crate::{
    constraints::IncorporationConstraintPosition,
    position::ConstraintPosition,
    ty::{Ty, TyVar},
};

/// How an error affects the candidate carrying it during overload ranking.
/// Ordered from worst to best.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Applicability {
    Inapplicable,
    InapplicableWrongReceiver,
    ResolvedNeedsCompatFlag,
    ResolvedWithWarning,
}

impl Applicability {
    /// Warnings leave the candidate usable; anything below does not.
    pub fn is_success(self) -> bool {
        self >= Applicability::ResolvedNeedsCompatFlag
    }
}

/// Why an inferred intersection type is (or may be) empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EmptyIntersectionKind {
    /// Two final classes with no subtype relation; provably empty.
    MultipleFinalClasses,
    /// Same constructor applied to incompatible proper arguments; provably
    /// empty under invariant arguments.
    IncompatibleTypeArguments,
    /// Structurally incompatible but not provably uninhabited (open
    /// classes may share an unseen subtype).
    IncompatibleClasses,
}

impl EmptyIntersectionKind {
    pub fn is_definitely_empty(self) -> bool {
        match self {
            EmptyIntersectionKind::MultipleFinalClasses
            | EmptyIntersectionKind::IncompatibleTypeArguments => true,
            EmptyIntersectionKind::IncompatibleClasses => false,
        }
    }
}

/// Result of classifying an intersection's member types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmptyIntersectionInfo {
    pub kind: EmptyIntersectionKind,
    /// The members that proved (or suggested) emptiness.
    pub causing_types: Vec<Ty>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConstraintSystemError {
    /// A subtype relation that does not hold: `lower </: upper`.
    NewConstraint {
        lower: Ty,
        upper: Ty,
        position: IncorporationConstraintPosition,
    },
    /// The warning form of `NewConstraint`, produced only by
    /// `transform_to_warning`.
    NewConstraintWarning {
        lower: Ty,
        upper: Ty,
        position: IncorporationConstraintPosition,
    },
    /// A capture made for subtyping escaped into a constraint on `variable`.
    CapturedTypeFromSubtyping {
        variable: TyVar,
        ty: Ty,
        position: IncorporationConstraintPosition,
    },
    /// An upstream error type reached a constraint on `variable`; the
    /// original failure was already reported, so this only marks the
    /// variable as poisoned.
    ConstrainingTypeIsError {
        variable: TyVar,
        ty: Ty,
        position: IncorporationConstraintPosition,
    },
    /// No branch of a fork point produced a consistent system.
    NoSuccessfulFork { position: IncorporationConstraintPosition },
    /// A variable was fixed to a provably empty intersection type.
    InferredEmptyIntersectionError {
        incompatible_types: Vec<Ty>,
        causing_types: Vec<Ty>,
        variable: TyVar,
        kind: EmptyIntersectionKind,
    },
    /// As above, but the emptiness is suspected rather than proven, or the
    /// forbidding feature is off.
    InferredEmptyIntersectionWarning {
        incompatible_types: Vec<Ty>,
        causing_types: Vec<Ty>,
        variable: TyVar,
        kind: EmptyIntersectionKind,
    },
    /// An only-input-types variable was resolved to a type that matches
    /// none of its supplied input types.
    OnlyInputTypes { variable: TyVar },
}

impl ConstraintSystemError {
    pub fn applicability(&self) -> Applicability {
        match self {
            ConstraintSystemError::NewConstraint { position, .. } => {
                // A failure whose initial constraint came from the receiver
                // ranks as wrong-receiver, which overload resolution treats
                // as less disqualifying than a plain mismatch.
                if matches!(position.from(), ConstraintPosition::Receiver) {
                    Applicability::InapplicableWrongReceiver
                } else {
                    Applicability::Inapplicable
                }
            }
            ConstraintSystemError::NewConstraintWarning { .. } => Applicability::ResolvedWithWarning,
            ConstraintSystemError::CapturedTypeFromSubtyping { .. } => Applicability::Inapplicable,
            ConstraintSystemError::ConstrainingTypeIsError { .. } => Applicability::Inapplicable,
            ConstraintSystemError::NoSuccessfulFork { .. } => Applicability::Inapplicable,
            ConstraintSystemError::InferredEmptyIntersectionError { .. } => {
                Applicability::Inapplicable
            }
            ConstraintSystemError::InferredEmptyIntersectionWarning { .. } => {
                Applicability::ResolvedWithWarning
            }
            ConstraintSystemError::OnlyInputTypes { .. } => Applicability::Inapplicable,
        }
    }

    /// Downgrade a constraint error to its warning form; every other
    /// variant is returned unchanged.
    pub fn transform_to_warning(self) -> ConstraintSystemError {
        match self {
            ConstraintSystemError::NewConstraint {
                lower,
                upper,
                position,
            } => ConstraintSystemError::NewConstraintWarning {
                lower,
                upper,
                position,
            },
            other => other,
        }
    }

    pub fn is_inferred_empty_intersection(&self) -> bool {
        matches!(
            self,
            ConstraintSystemError::InferredEmptyIntersectionError { .. }
                | ConstraintSystemError::InferredEmptyIntersectionWarning { .. }
        )
    }
}

impl std::fmt::Display for ConstraintSystemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintSystemError::NewConstraint { lower, upper, position } => {
                write!(f, "type mismatch: `{}` is not a subtype of `{}` ({})", lower, upper, position)
            }
            ConstraintSystemError::NewConstraintWarning { lower, upper, position } => {
                write!(
                    f,
                    "type mismatch (warning): `{}` is not a subtype of `{}` ({})",
                    lower, upper, position
                )
            }
            ConstraintSystemError::CapturedTypeFromSubtyping { variable, ty, .. } => {
                write!(f, "captured type `{}` escaped into a constraint on {}", ty, variable)
            }
            ConstraintSystemError::ConstrainingTypeIsError { variable, .. } => {
                write!(f, "constraint on {} mentions an unresolved type", variable)
            }
            ConstraintSystemError::NoSuccessfulFork { position } => {
                write!(f, "no branch satisfies the forked constraint ({})", position)
            }
            ConstraintSystemError::InferredEmptyIntersectionError {
                incompatible_types,
                variable,
                ..
            } => {
                write!(
                    f,
                    "{} was inferred into the empty intersection {}",
                    variable,
                    incompatible_types.iter().map(|t| t.to_string()).join(" & ")
                )
            }
            ConstraintSystemError::InferredEmptyIntersectionWarning {
                incompatible_types,
                variable,
                ..
            } => {
                write!(
                    f,
                    "{} may have been inferred into the empty intersection {}",
                    variable,
                    incompatible_types.iter().map(|t| t.to_string()).join(" & ")
                )
            }
            ConstraintSystemError::OnlyInputTypes { variable } => {
                write!(f, "{} must resolve to one of its input types", variable)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{ConstraintKind, InitialConstraint};

    fn position(from: ConstraintPosition) -> IncorporationConstraintPosition {
        IncorporationConstraintPosition::new(InitialConstraint {
            a: Ty::name("Str"),
            b: Ty::name("Int"),
            kind: ConstraintKind::Upper,
            position: from,
        })
    }

    #[test]
    fn receiver_failures_rank_as_wrong_receiver() {
        let err = ConstraintSystemError::NewConstraint {
            lower: Ty::name("Str"),
            upper: Ty::name("Int"),
            position: position(ConstraintPosition::Receiver),
        };
        assert_eq!(err.applicability(), Applicability::InapplicableWrongReceiver);

        let err = ConstraintSystemError::NewConstraint {
            lower: Ty::name("Str"),
            upper: Ty::name("Int"),
            position: position(ConstraintPosition::Argument(1)),
        };
        assert_eq!(err.applicability(), Applicability::Inapplicable);
    }

    #[test]
    fn warning_downgrade_keeps_fields() {
        let err = ConstraintSystemError::NewConstraint {
            lower: Ty::name("Str"),
            upper: Ty::name("Int"),
            position: position(ConstraintPosition::Argument(0)),
        };
        let warn = err.transform_to_warning();
        match &warn {
            ConstraintSystemError::NewConstraintWarning { lower, upper, .. } => {
                assert_eq!(lower, &Ty::name("Str"));
                assert_eq!(upper, &Ty::name("Int"));
            }
            other => panic!("unexpected variant: {:?}", other),
        }
        assert!(warn.applicability().is_success());
    }
}
