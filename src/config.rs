// Feature toggles for the solver.

/// Behavior switches that change how strictly the solver processes
/// constraints. Defaults match the long-standing behavior; the stricter
/// modes exist behind flags so callers can stage migrations.
#[derive(Clone, Copy, Debug)]
pub struct SolverConfig {
    /// When a variable is fixed to a provably empty intersection, report a
    /// hard error instead of a warning.
    pub forbid_inference_into_empty_intersection: bool,
    /// Process every derived constraint eagerly. When off, the legacy
    /// shortcut applies: once every unfixed variable holds a proper
    /// equality constraint, remaining work is parked as missed constraints
    /// and re-checked at fixation time.
    pub proper_constraints_processing: bool,
    /// Allow fork points. When off, an ambiguous intersection decomposition
    /// commits to its first viable branch immediately.
    pub allow_forking: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            forbid_inference_into_empty_intersection: false,
            proper_constraints_processing: false,
            allow_forking: true,
        }
    }
}
