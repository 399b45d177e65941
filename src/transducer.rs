//! Strategies extracted from winning moves.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use crate::automaton::SymbolicAutomaton;
use crate::error::{Error, Result};
use crate::reference::Ref;
use crate::synthesis::Player;
use crate::utils::from_bits;
use crate::var_mgr::VarMgr;

/// A strategy as a Mealy machine over the arena.
///
/// Every protagonist variable has an output function over state variables and, when the
/// opponent moves first, the opponent's variables. The functions are only meaningful inside the
/// winning region they were extracted from.
#[derive(Clone)]
pub struct Transducer {
    mgr: Rc<VarMgr>,
    arena: SymbolicAutomaton,
    output_function: BTreeMap<u32, Ref>,
    starting: Player,
    protagonist: Player,
}

impl Transducer {
    pub fn new(arena: &SymbolicAutomaton, output_function: BTreeMap<u32, Ref>, starting: Player, protagonist: Player) -> Self {
        Self {
            mgr: Rc::clone(arena.mgr()),
            arena: arena.clone(),
            output_function,
            starting,
            protagonist,
        }
    }

    pub fn output_function(&self) -> &BTreeMap<u32, Ref> {
        &self.output_function
    }

    pub fn initial_state(&self) -> &[bool] {
        self.arena.initial_state()
    }

    pub fn starting_player(&self) -> Player {
        self.starting
    }

    pub fn protagonist_player(&self) -> Player {
        self.protagonist
    }

    fn check_state(&self, state: &[bool]) -> Result<()> {
        let expected = self.arena.initial_state().len();
        if state.len() != expected {
            return Err(Error::StateLength {
                expected,
                actual: state.len(),
            });
        }
        Ok(())
    }

    /// Protagonist move at `state`; `observed` holds the opponent's move when it plays first.
    pub fn output(&self, state: &[bool], observed: &HashMap<u32, bool>) -> Result<BTreeMap<u32, bool>> {
        self.check_state(state)?;
        let mut values = observed.clone();
        values.extend(self.arena.state_variables().into_iter().zip(state.iter().copied()));
        Ok(self
            .output_function
            .iter()
            .map(|(&v, &g)| (v, self.mgr.eval(g, &values)))
            .collect())
    }

    /// Variables the protagonist sets, in the arena's bit order.
    fn protagonist_variables(&self) -> &[u32] {
        match self.protagonist {
            Player::Agent => self.arena.output_variables(),
            Player::Environment => self.arena.input_variables(),
        }
    }

    /// The protagonist move read as a binary id, in the arena's bit order.
    pub fn choice_id(&self, state: &[bool], observed: &HashMap<u32, bool>) -> Result<usize> {
        let values = self.output(state, observed)?;
        let bits: Vec<bool> = self
            .protagonist_variables()
            .iter()
            .map(|v| values.get(v).copied().unwrap_or(false))
            .collect();
        Ok(from_bits(&bits))
    }

    /// Successor of `state` when the protagonist follows the strategy against `opponent`.
    pub fn next_state(&self, state: &[bool], opponent: &HashMap<u32, bool>) -> Result<Vec<bool>> {
        let mut values = opponent.clone();
        values.extend(self.output(state, opponent)?);
        self.arena.step(state, &values)
    }

    /// States visited from the initial state against a sequence of opponent moves.
    pub fn play(&self, opponent: &[HashMap<u32, bool>]) -> Result<Vec<Vec<bool>>> {
        let mut trace = vec![self.initial_state().to_vec()];
        for moves in opponent {
            let next = self.next_state(&trace[trace.len() - 1], moves)?;
            trace.push(next);
        }
        Ok(trace)
    }
}

impl Debug for Transducer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let bdd = self.mgr.bdd();
        f.debug_struct("Transducer")
            .field("starting", &self.starting)
            .field("protagonist", &self.protagonist)
            .field(
                "output_function",
                &self
                    .output_function
                    .iter()
                    .map(|(v, &g)| (self.mgr.variable_name(*v).unwrap_or_default(), bdd.size(g)))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::synthesis::{DfaGame, ReachabilitySynthesizer};

    /// Three-valued position moved by two agent bits: `up` increments, `up ∧ jump` adds two.
    fn ladder(mgr: &Rc<VarMgr>) -> SymbolicAutomaton {
        let outs = mgr.create_output_variables(&["up", "jump"]).unwrap();
        let id = mgr.create_named_state_variables(&["p0", "p1"]).unwrap();
        let bdd = mgr.bdd();
        let up = bdd.mk_var(outs[0]);
        let jump = bdd.mk_var(outs[1]);
        let p0 = mgr.state_variable(id, 0);
        let p1 = mgr.state_variable(id, 1);

        // position 0 --up--> 1 --up--> 2, and 0 --up&jump--> 2
        let at0 = bdd.apply_and(-p0, -p1);
        let at1 = bdd.apply_and(p0, -p1);
        let step1 = bdd.apply_and_many([at0, up, -jump]);
        let step2 = bdd.apply_or(bdd.apply_and(at1, up), bdd.apply_and_many([at0, up, jump]));
        let next_p0 = bdd.apply_or(step1, bdd.apply_and(at1, -up));
        let next_p1 = bdd.apply_or(step2, p1);
        SymbolicAutomaton::new(Rc::clone(mgr), id, vec![false, false], vec![next_p0, next_p1], p1)
            .unwrap()
            .with_io_variables(vec![], outs)
    }

    #[test]
    fn test_strategy_stays_in_winning_moves() {
        let mgr = Rc::new(VarMgr::default());
        let arena = ladder(&mgr);
        let goal = arena.final_states();
        let result = ReachabilitySynthesizer::new(arena.clone(), Player::Agent, Player::Agent, goal, Ref::ONE)
            .run()
            .unwrap();
        assert!(result.realizable);
        let t = result.transducer.unwrap();
        assert_eq!(t.output_function().len(), 2);

        for state in [[false, false], [true, false], [false, true], [true, true]] {
            if !arena.contains_state(result.winning_states, &state) {
                continue;
            }
            let mut values: HashMap<u32, bool> = t.output(&state, &HashMap::new()).unwrap().into_iter().collect();
            values.extend(arena.state_variables().into_iter().zip(state));
            assert!(mgr.eval(result.winning_moves, &values), "state {:?}", state);
        }
    }

    #[test]
    fn test_play_reaches_goal() {
        let mgr = Rc::new(VarMgr::default());
        let arena = ladder(&mgr);
        let goal = arena.final_states();
        let result = ReachabilitySynthesizer::new(arena.clone(), Player::Agent, Player::Agent, goal, Ref::ONE)
            .run()
            .unwrap();
        let t = result.transducer.unwrap();

        let trace = t.play(&[HashMap::new(), HashMap::new()]).unwrap();
        assert_eq!(trace[0], vec![false, false]);
        assert!(trace.iter().any(|s| arena.contains_state(goal, s)));
        assert!(t.output(&[true], &HashMap::new()).is_err());
    }

    #[test]
    fn test_extraction_fixes_variables_in_order() {
        let mgr = Rc::new(VarMgr::default());
        let arena = ladder(&mgr);
        let game = DfaGame::new(arena, Player::Agent, Player::Agent);
        let bdd = mgr.bdd();
        let outs = mgr.output_variables();

        // Only `up ∧ ¬jump` or `¬up ∧ jump` are allowed.
        let moves = bdd.apply_xor(bdd.mk_var(outs[0]), bdd.mk_var(outs[1]));
        let strategy = game.synthesize_strategy(moves);
        assert_eq!(strategy[&outs[0]], Ref::ONE);
        assert_eq!(strategy[&outs[1]], Ref::ZERO);
    }
}
