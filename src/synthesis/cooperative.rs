//! Cooperative reachability: the opponent is assumed to help the protagonist reach the goal.

use crate::automaton::SymbolicAutomaton;
use crate::error::Result;
use crate::reference::Ref;
use crate::synthesis::{DfaGame, Player, SynthesisResult};

pub struct CooperativeReachabilitySynthesizer {
    game: DfaGame,
    goal: Ref,
    state_space: Ref,
}

impl CooperativeReachabilitySynthesizer {
    pub fn new(arena: SymbolicAutomaton, starting: Player, protagonist: Player, goal: Ref, state_space: Ref) -> Self {
        Self {
            game: DfaGame::new(arena, starting, protagonist),
            goal,
            state_space,
        }
    }

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
            |w| self.game.cooperative_preimage(w),
            |m| self.game.cooperative_project(m),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use test_log::test;

    use super::*;
    use crate::var_mgr::VarMgr;

    /// Two bits counting up while input `tick` holds; the goal is the value 3.
    fn counter(mgr: &Rc<VarMgr>) -> SymbolicAutomaton {
        let tick_var = mgr.create_input_variables(&["tick"]).unwrap()[0];
        let id = mgr.create_named_state_variables(&["lo", "hi"]).unwrap();
        let bdd = mgr.bdd();
        let lo = mgr.state_variable(id, 0);
        let hi = mgr.state_variable(id, 1);
        let tick = bdd.mk_var(tick_var);
        let next_lo = bdd.apply_xor(lo, tick);
        let next_hi = bdd.apply_xor(hi, bdd.apply_and(lo, tick));
        SymbolicAutomaton::new(Rc::clone(mgr), id, vec![false, false], vec![next_lo, next_hi], bdd.apply_and(lo, hi))
            .unwrap()
            .with_io_variables(vec![tick_var], vec![])
    }

    #[test]
    fn test_layers_grow() {
        let mgr = Rc::new(VarMgr::default());
        let arena = counter(&mgr);
        let goal = arena.final_states();
        let result = CooperativeReachabilitySynthesizer::new(arena, Player::Agent, Player::Agent, goal, Ref::ONE)
            .run()
            .unwrap();

        assert!(result.realizable);
        assert_eq!(result.iterations, 3);
        assert_eq!(result.layers.len(), 3);
        let bdd = mgr.bdd();
        for pair in result.layers.windows(2) {
            assert!(bdd.is_implies(pair[0], pair[1]));
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn test_adversarial_counter_is_lost() {
        let mgr = Rc::new(VarMgr::default());
        let arena = counter(&mgr);
        let goal = arena.final_states();
        let result = crate::synthesis::ReachabilitySynthesizer::new(arena, Player::Agent, Player::Agent, goal, Ref::ONE)
            .run()
            .unwrap();

        assert!(!result.realizable);
        assert_eq!(result.winning_states, goal);
        assert!(result.transducer.is_some());
    }
}
