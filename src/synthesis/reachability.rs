//! Adversarial reachability: the protagonist must reach the goal whatever the opponent does.

use crate::automaton::SymbolicAutomaton;
use crate::error::Result;
use crate::reference::Ref;
use crate::synthesis::{DfaGame, Player, SynthesisResult};

pub struct ReachabilitySynthesizer {
    game: DfaGame,
    goal: Ref,
    state_space: Ref,
}

impl ReachabilitySynthesizer {
    pub fn new(arena: SymbolicAutomaton, starting: Player, protagonist: Player, goal: Ref, state_space: Ref) -> Self {
        Self {
            game: DfaGame::new(arena, starting, protagonist),
            goal,
            state_space,
        }
    }

    /// Only environment moves satisfying `constraint` are considered.
    pub fn with_env_constraint(mut self, constraint: Ref) -> Self {
        self.game.set_env_constraint(constraint);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: Option<usize>) -> Self {
        self.game.set_max_iterations(max_iterations);
        self
    }

    pub fn game(&self) -> &DfaGame {
        &self.game
    }

    pub fn run(&self) -> Result<SynthesisResult> {
        self.game.solve(
            self.goal,
            self.state_space,
            |w| self.game.adversarial_preimage(w),
            |m| self.game.adversarial_project(m),
        )
    }
}
