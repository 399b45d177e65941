use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::Error;

/// Sizing of the BDD manager tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BddConfig {
    /// Initial unique-table capacity is `2^storage_bits` (it grows on demand).
    pub storage_bits: usize,
    /// The computed table has `2^cache_bits` slots.
    pub cache_bits: usize,
}

impl Default for BddConfig {
    fn default() -> Self {
        Self {
            storage_bits: 20,
            cache_bits: 16,
        }
    }
}

/// Which synthesis procedure to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Adversarial reachability only.
    Adversarial,
    /// Cooperative reachability only.
    Cooperative,
    /// Adversarial reachability, falling back to cooperative reachability when unrealizable.
    #[default]
    BestEffort,
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adversarial" => Ok(Algorithm::Adversarial),
            "cooperative" => Ok(Algorithm::Cooperative),
            "best-effort" => Ok(Algorithm::BestEffort),
            _ => Err(Error::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Adversarial => write!(f, "adversarial"),
            Algorithm::Cooperative => write!(f, "cooperative"),
            Algorithm::BestEffort => write!(f, "best-effort"),
        }
    }
}

/// How violations of agent preconditions are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentErrorMode {
    /// Fold the agent precondition into the invariant predicate (state space restriction).
    #[default]
    Invariant,
    /// Allocate a sticky `agent_err` state bit, set whenever the agent moves illegally.
    ErrorBit,
}

impl FromStr for AgentErrorMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invariant" => Ok(AgentErrorMode::Invariant),
            "error-bit" => Ok(AgentErrorMode::ErrorBit),
            _ => Err(Error::UnsupportedAgentErrorMode(s.to_string())),
        }
    }
}

impl Display for AgentErrorMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentErrorMode::Invariant => write!(f, "invariant"),
            AgentErrorMode::ErrorBit => write!(f, "error-bit"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub bdd: BddConfig,
    pub algorithm: Algorithm,
    pub agent_error: AgentErrorMode,
    /// Hard cap on fixpoint iterations; `None` derives it from the number of state variables.
    pub max_iterations: Option<usize>,
}
