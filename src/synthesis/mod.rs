//! Reachability games on symbolic arenas.
//!
//! A game is played on a [`SymbolicAutomaton`]: in every round one player fixes its variables
//! (the agent owns the output variables, the environment the input variables), then the other
//! player answers, and the arena moves to the successor state. The synthesizers compute the
//! states from which the protagonist can force (or, cooperatively, reach) a goal predicate by
//! backward fixpoint iteration:
//!
//! ```text
//! W₀ = ∃X,Y (S ∧ G)            M₀ = S ∧ G
//! Mₖ₊₁ = Mₖ ∨ (S ∧ ¬Wₖ ∧ pre(Wₖ))
//! Wₖ₊₁ = project(Mₖ₊₁)
//! ```
//!
//! until the initial state is winning or `Wₖ₊₁ = Wₖ`. Here `X` are the inputs, `Y` the outputs,
//! `S` the admissible state space and `G` the goal.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{Display, Formatter};

use log::{debug, info, trace};

use crate::automaton::SymbolicAutomaton;
use crate::bdd::Bdd;
use crate::compiler::CompiledDomain;
use crate::config::{Algorithm, Config};
use crate::error::{Error, Result};
use crate::reference::Ref;
use crate::transducer::Transducer;

pub mod best_effort;
pub mod cooperative;
pub mod reachability;

pub use best_effort::{BestEffortResult, BestEffortSynthesizer, Region};
pub use cooperative::CooperativeReachabilitySynthesizer;
pub use reachability::ReachabilitySynthesizer;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Player {
    Agent,
    Environment,
}

impl Display for Player {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Player::Agent => write!(f, "agent"),
            Player::Environment => write!(f, "environment"),
        }
    }
}

/// Outcome of a reachability game.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub realizable: bool,
    /// States from which the protagonist wins, over state variables only.
    pub winning_states: Ref,
    /// Winning (state, move) pairs.
    pub winning_moves: Ref,
    /// Strategy extracted from `winning_moves`, also present for unrealizable games.
    pub transducer: Option<Transducer>,
    pub iterations: usize,
    /// Winning states after each iteration.
    pub layers: Vec<Ref>,
}

/// Arena and players shared by the reachability synthesizers.
#[derive(Debug, Clone)]
pub struct DfaGame {
    arena: SymbolicAutomaton,
    starting: Player,
    protagonist: Player,
    /// Legal environment moves.
    env_constraint: Ref,
    max_iterations: Option<usize>,
    substitution: HashMap<u32, Ref>,
    inputs: Vec<u32>,
    outputs: Vec<u32>,
}

impl DfaGame {
    /// The players own the arena's input and output variables, whatever else the manager holds.
    pub fn new(arena: SymbolicAutomaton, starting: Player, protagonist: Player) -> Self {
        let inputs = arena.input_variables().to_vec();
        let outputs = arena.output_variables().to_vec();
        let substitution = arena.transition_substitution();
        Self {
            arena,
            starting,
            protagonist,
            env_constraint: Ref::ONE,
            max_iterations: None,
            substitution,
            inputs,
            outputs,
        }
    }

    pub fn arena(&self) -> &SymbolicAutomaton {
        &self.arena
    }

    pub fn bdd(&self) -> &Bdd {
        self.arena.mgr().bdd()
    }

    pub fn starting_player(&self) -> Player {
        self.starting
    }

    pub fn protagonist_player(&self) -> Player {
        self.protagonist
    }

    pub fn env_constraint(&self) -> Ref {
        self.env_constraint
    }

    pub fn set_env_constraint(&mut self, constraint: Ref) {
        self.env_constraint = constraint;
    }

    pub fn set_max_iterations(&mut self, max_iterations: Option<usize>) {
        self.max_iterations = max_iterations;
    }

    /// Variables the protagonist sets.
    pub fn protagonist_variables(&self) -> &[u32] {
        match self.protagonist {
            Player::Agent => &self.outputs,
            Player::Environment => &self.inputs,
        }
    }

    fn opponent_variables(&self) -> &[u32] {
        match self.protagonist {
            Player::Agent => &self.inputs,
            Player::Environment => &self.outputs,
        }
    }

    /// `W[s ↦ δ(s)]`: moves leading into `w` in one step.
    pub fn next_step(&self, w: Ref) -> Ref {
        self.bdd().vector_compose(w, &self.substitution)
    }

    /// `∀X (E → f)`
    fn forall_inputs(&self, f: Ref) -> Ref {
        let bdd = self.bdd();
        bdd.forall(bdd.apply_imply(self.env_constraint, f), &self.inputs)
    }

    /// `∃X (E ∧ f)`
    fn exists_inputs(&self, f: Ref) -> Ref {
        let bdd = self.bdd();
        bdd.exists(bdd.apply_and(self.env_constraint, f), &self.inputs)
    }

    /// Moves from which every answer of the opponent leads into `w`.
    pub fn adversarial_preimage(&self, w: Ref) -> Ref {
        let next = self.next_step(w);
        match (self.starting, self.protagonist) {
            (Player::Agent, Player::Agent) => self.forall_inputs(next),
            (Player::Environment, Player::Environment) => self.bdd().forall(next, &self.outputs),
            _ => next,
        }
    }

    /// Moves from which some answer of the opponent leads into `w`.
    pub fn cooperative_preimage(&self, w: Ref) -> Ref {
        let next = self.next_step(w);
        match self.protagonist {
            Player::Agent => self.exists_inputs(next),
            Player::Environment => self.bdd().exists(next, &self.outputs),
        }
    }

    /// States where the protagonist has a move in `moves` whatever the opponent does first.
    pub fn adversarial_project(&self, moves: Ref) -> Ref {
        let bdd = self.bdd();
        match (self.starting, self.protagonist) {
            (Player::Agent, Player::Agent) => bdd.exists(moves, &self.outputs),
            (Player::Agent, Player::Environment) => bdd.forall(self.exists_inputs(moves), &self.outputs),
            (Player::Environment, Player::Agent) => self.forall_inputs(bdd.exists(moves, &self.outputs)),
            (Player::Environment, Player::Environment) => self.exists_inputs(moves),
        }
    }

    /// States with some move in `moves`.
    pub fn cooperative_project(&self, moves: Ref) -> Ref {
        let bdd = self.bdd();
        bdd.exists(self.exists_inputs(moves), &self.outputs)
    }

    pub fn includes_initial_state(&self, states: Ref) -> bool {
        self.arena.contains_state(states, self.arena.initial_state())
    }

    /// Iterations after which the fixpoint is considered broken.
    pub fn iteration_bound(&self) -> usize {
        self.max_iterations.unwrap_or_else(|| {
            let n = self.arena.initial_state().len() as u32;
            1usize.checked_shl(n).unwrap_or(usize::MAX).saturating_add(1)
        })
    }

    /// One function per protagonist variable, choosing a move in `moves` for every state that has one.
    ///
    /// Variables are fixed in increasing order: with `M₁ = moves`,
    /// `gᵢ = (∃yᵢ₊₁..yₙ Mᵢ)|yᵢ=1` and `Mᵢ₊₁ = Mᵢ[yᵢ ↦ gᵢ]`.
    pub fn synthesize_strategy(&self, moves: Ref) -> BTreeMap<u32, Ref> {
        let bdd = self.bdd();
        let vars = self.protagonist_variables();
        let mut m = moves;
        let mut strategy = BTreeMap::new();
        for (i, &y) in vars.iter().enumerate() {
            let f = bdd.exists(m, &vars[i + 1..]);
            let g = bdd.restrict(f, y, true);
            m = bdd.compose(m, y, g);
            strategy.insert(y, g);
        }
        debug!("Extracted strategy over {} variables", strategy.len());
        strategy
    }

    /// Backward fixpoint shared by the adversarial and cooperative games.
    fn solve(
        &self,
        goal: Ref,
        state_space: Ref,
        preimage: impl Fn(Ref) -> Ref,
        project: impl Fn(Ref) -> Ref,
    ) -> Result<SynthesisResult> {
        let bdd = self.bdd();
        let non_state: Vec<u32> = self.inputs.iter().chain(self.outputs.iter()).copied().collect();
        let bound = self.iteration_bound();

        let mut moves = bdd.apply_and(state_space, goal);
        let mut states = bdd.exists(moves, &non_state);
        let mut layers = Vec::new();
        let mut iterations = 0;

        loop {
            if iterations >= bound {
                return Err(Error::FixpointDiverged { iterations });
            }
            iterations += 1;

            let pre = preimage(states);
            let fresh = bdd.apply_and(bdd.apply_and(state_space, -states), pre);
            let new_moves = bdd.apply_or(moves, fresh);
            let new_states = project(new_moves);
            trace!(
                "Iteration {}: |W| = {}, |M| = {}",
                iterations,
                bdd.size(new_states),
                bdd.size(new_moves)
            );
            layers.push(new_states);

            let realizable = self.includes_initial_state(new_states);
            if realizable || new_states == states {
                info!(
                    "Fixpoint after {} iterations: {} for the {}",
                    iterations,
                    if realizable { "realizable" } else { "unrealizable" },
                    self.protagonist
                );
                let strategy = self.synthesize_strategy(new_moves);
                let transducer = Transducer::new(&self.arena, strategy, self.starting, self.protagonist);
                return Ok(SynthesisResult {
                    realizable,
                    winning_states: new_states,
                    winning_moves: new_moves,
                    transducer: Some(transducer),
                    iterations,
                    layers,
                });
            }

            moves = new_moves;
            states = new_states;
        }
    }
}

/// Result of [`synthesize`], shaped by the selected [`Algorithm`].
#[derive(Debug, Clone)]
pub enum SynthesisOutcome {
    Adversarial(SynthesisResult),
    Cooperative(SynthesisResult),
    BestEffort(BestEffortResult),
}

impl SynthesisOutcome {
    /// Whether the primary game of the selected algorithm is realizable.
    pub fn is_realizable(&self) -> bool {
        match self {
            SynthesisOutcome::Adversarial(r) | SynthesisOutcome::Cooperative(r) => r.realizable,
            SynthesisOutcome::BestEffort(r) => r.adversarial.realizable,
        }
    }
}

/// Solve the FOND game of `compiled` with the algorithm selected in `config`.
pub fn synthesize(compiled: &CompiledDomain, config: &Config) -> Result<SynthesisOutcome> {
    let synthesizer = BestEffortSynthesizer::new(config);
    info!("Running {} synthesis", config.algorithm);
    Ok(match config.algorithm {
        Algorithm::Adversarial => SynthesisOutcome::Adversarial(synthesizer.adversarial(compiled)?),
        Algorithm::Cooperative => SynthesisOutcome::Cooperative(synthesizer.cooperative(compiled)?),
        Algorithm::BestEffort => SynthesisOutcome::BestEffort(synthesizer.run(compiled)?),
    })
}
