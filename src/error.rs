/// Errors returned by model construction, compilation and synthesis.
///
/// Unrealizability is not an error: it is reported through [`SynthesisResult`][crate::synthesis::SynthesisResult].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A fluent shared with an auxiliary automaton is not a state variable of the domain.
    #[error("fluent '{fluent}' is not a state variable of the domain")]
    UnknownFluent { fluent: String },
    /// The algorithm selector does not name a known synthesis procedure.
    #[error("unsupported algorithm '{0}' (expected one of: adversarial, cooperative, best-effort)")]
    UnsupportedAlgorithm(String),
    /// The agent-error selector does not name a known encoding.
    #[error("unsupported agent error mode '{0}' (expected one of: invariant, error-bit)")]
    UnsupportedAgentErrorMode(String),
    /// A variable name is already registered with another role.
    #[error("variable '{name}' is already a {existing} variable, cannot register it as {requested}")]
    RoleConflict {
        name: String,
        existing: &'static str,
        requested: &'static str,
    },

    #[error("initial state has {actual} values but the domain has {expected} variables")]
    InitialStateLength { expected: usize, actual: usize },
    #[error("{context} refers to variable index {index}, but the domain has {count} variables")]
    IndexOutOfRange {
        context: String,
        index: usize,
        count: usize,
    },
    #[error("domain has no actions")]
    NoActions,
    #[error("variable '{0}' is declared twice")]
    DuplicateVariable(String),
    #[error("malformed automaton: {0}")]
    MalformedAutomaton(String),
    #[error("automaton has {state_vars} state variables, but {initial} initial values and {transitions} transition functions")]
    ArityMismatch {
        state_vars: usize,
        initial: usize,
        transitions: usize,
    },
    #[error("{kind} id {id} does not fit in {bits} bits")]
    IdOutOfRange { kind: &'static str, id: usize, bits: usize },
    #[error("state has {actual} values, expected {expected}")]
    StateLength { expected: usize, actual: usize },

    /// The fixpoint did not stabilise within the bound implied by the state space.
    #[error("fixpoint did not converge after {iterations} iterations")]
    FixpointDiverged { iterations: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
