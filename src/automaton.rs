//! Symbolic automata: state bits, a transition function per bit, and a final-state predicate.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use log::debug;

use crate::error::{Error, Result};
use crate::reference::Ref;
use crate::var_mgr::{AutomatonId, VarMgr};

/// Deterministic automaton over the state variables of `id`.
///
/// `transition[i]` is the next value of the `i`-th state bit, as a function of the current
/// state bits and of the input, output and alphabet variables.
///
/// The automaton also records which input and output variables its players own. A manager may
/// hold variables of other automata, so games never take them from the manager.
#[derive(Clone)]
pub struct SymbolicAutomaton {
    mgr: Rc<VarMgr>,
    id: AutomatonId,
    initial: Vec<bool>,
    transition: Vec<Ref>,
    finals: Ref,
    inputs: Vec<u32>,
    outputs: Vec<u32>,
}

/// Union of variable lists, keeping the first occurrence of each.
fn merge_variables<'a>(lists: impl IntoIterator<Item = &'a [u32]>) -> Vec<u32> {
    let mut merged: Vec<u32> = Vec::new();
    for &v in lists.into_iter().flatten() {
        if !merged.contains(&v) {
            merged.push(v);
        }
    }
    merged
}

impl SymbolicAutomaton {
    pub fn new(mgr: Rc<VarMgr>, id: AutomatonId, initial: Vec<bool>, transition: Vec<Ref>, finals: Ref) -> Result<Self> {
        let state_vars = mgr.state_variable_count(id);
        if initial.len() != state_vars || transition.len() != state_vars {
            return Err(Error::ArityMismatch {
                state_vars,
                initial: initial.len(),
                transitions: transition.len(),
            });
        }
        Ok(Self {
            mgr,
            id,
            initial,
            transition,
            finals,
            inputs: Vec::new(),
            outputs: Vec::new(),
        })
    }

    /// The same automaton, with `inputs` owned by the environment and `outputs` by the agent.
    ///
    /// Both lists are in bit order: the first variable is the least significant bit of an id.
    pub fn with_io_variables(self, inputs: Vec<u32>, outputs: Vec<u32>) -> Self {
        Self { inputs, outputs, ..self }
    }

    pub fn input_variables(&self) -> &[u32] {
        &self.inputs
    }

    pub fn output_variables(&self) -> &[u32] {
        &self.outputs
    }

    pub fn mgr(&self) -> &Rc<VarMgr> {
        &self.mgr
    }

    pub fn id(&self) -> AutomatonId {
        self.id
    }

    pub fn initial_state(&self) -> &[bool] {
        &self.initial
    }

    pub fn transition_function(&self) -> &[Ref] {
        &self.transition
    }

    pub fn final_states(&self) -> Ref {
        self.finals
    }

    pub fn state_variables(&self) -> Vec<u32> {
        self.mgr.state_variables(self.id)
    }

    /// Cube of the initial state.
    pub fn initial_state_bdd(&self) -> Ref {
        self.mgr.state_vector_to_bdd(self.id, &self.initial)
    }

    /// The same automaton with another final-state predicate.
    pub fn with_final_states(&self, finals: Ref) -> Self {
        Self {
            finals,
            ..self.clone()
        }
    }

    /// Substitution mapping every state variable to its transition function.
    pub fn transition_substitution(&self) -> HashMap<u32, Ref> {
        self.state_variables()
            .into_iter()
            .zip(self.transition.iter().copied())
            .collect()
    }

    /// Whether `state` (one value per state bit) satisfies `f`, with every other variable false.
    pub fn contains_state(&self, f: Ref, state: &[bool]) -> bool {
        let values = self.state_variables().into_iter().zip(state.iter().copied()).collect();
        self.mgr.eval(f, &values)
    }

    /// Next state from `state` under the given values of non-state variables (missing ones are false).
    pub fn step(&self, state: &[bool], letters: &HashMap<u32, bool>) -> Result<Vec<bool>> {
        if state.len() != self.initial.len() {
            return Err(Error::StateLength {
                expected: self.initial.len(),
                actual: state.len(),
            });
        }
        let mut values = letters.clone();
        values.extend(self.state_variables().into_iter().zip(state.iter().copied()));
        Ok(self.transition.iter().map(|&t| self.mgr.eval(t, &values)).collect())
    }

    /// Synchronous product: all automata read the same letters.
    ///
    /// The product accepts when every component accepts.
    pub fn product(automata: &[&SymbolicAutomaton]) -> Result<Self> {
        let first = automata
            .first()
            .ok_or_else(|| Error::MalformedAutomaton("product of zero automata".to_string()))?;
        let mgr = Rc::clone(&first.mgr);
        let ids: Vec<AutomatonId> = automata.iter().map(|a| a.id).collect();
        let id = mgr.create_product_state_space(&ids);
        debug!("Product of {:?} is {}", ids, id);

        let initial = automata.iter().flat_map(|a| a.initial.iter().copied()).collect();
        let transition = automata.iter().flat_map(|a| a.transition.iter().copied()).collect();
        let finals = mgr.bdd().apply_and_many(automata.iter().map(|a| a.finals));
        let inputs = merge_variables(automata.iter().map(|a| a.inputs.as_slice()));
        let outputs = merge_variables(automata.iter().map(|a| a.outputs.as_slice()));
        Ok(Self::new(mgr, id, initial, transition, finals)?.with_io_variables(inputs, outputs))
    }
}

impl Debug for SymbolicAutomaton {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let bdd = self.mgr.bdd();
        f.debug_struct("SymbolicAutomaton")
            .field("id", &self.id)
            .field("initial", &self.initial)
            .field("transition_sizes", &self.transition.iter().map(|&t| bdd.size(t)).collect::<Vec<_>>())
            .field("finals_size", &bdd.size(self.finals))
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    /// Two-bit counter incremented while input `inc` holds; accepts at 3.
    fn counter(mgr: &Rc<VarMgr>) -> SymbolicAutomaton {
        let inc_var = mgr.create_input_variables(&["inc"]).unwrap()[0];
        let id = mgr.create_named_state_variables(&["b0", "b1"]).unwrap();
        let bdd = mgr.bdd();
        let b0 = mgr.state_variable(id, 0);
        let b1 = mgr.state_variable(id, 1);
        let inc = bdd.mk_var(inc_var);
        let next0 = bdd.apply_xor(b0, inc);
        let next1 = bdd.apply_xor(b1, bdd.apply_and(b0, inc));
        let finals = bdd.apply_and(b0, b1);
        SymbolicAutomaton::new(Rc::clone(mgr), id, vec![false, false], vec![next0, next1], finals)
            .unwrap()
            .with_io_variables(vec![inc_var], vec![])
    }

    #[test]
    fn test_arity_checked() {
        let mgr = Rc::new(VarMgr::default());
        let id = mgr.create_state_variables(2);
        let err = SymbolicAutomaton::new(Rc::clone(&mgr), id, vec![false], vec![Ref::ONE, Ref::ONE], Ref::ONE).unwrap_err();
        assert!(matches!(err, Error::ArityMismatch { state_vars: 2, initial: 1, transitions: 2 }));
    }

    #[test]
    fn test_step() {
        let mgr = Rc::new(VarMgr::default());
        let a = counter(&mgr);
        let inc = a.input_variables()[0];

        let on = HashMap::from([(inc, true)]);
        let mut state = a.initial_state().to_vec();
        for _ in 0..3 {
            state = a.step(&state, &on).unwrap();
        }
        assert_eq!(state, vec![true, true]);
        assert!(a.contains_state(a.final_states(), &state));
        assert_eq!(a.step(&state, &HashMap::new()).unwrap(), state);
        assert!(a.step(&[true], &on).is_err());
    }

    #[test]
    fn test_initial_state_bdd() {
        let mgr = Rc::new(VarMgr::default());
        let a = counter(&mgr);
        let init = a.initial_state_bdd();
        assert!(a.contains_state(init, &[false, false]));
        assert!(!a.contains_state(init, &[true, false]));
    }

    #[test]
    fn test_product() {
        let mgr = Rc::new(VarMgr::default());
        let a = counter(&mgr);
        let id = mgr.create_state_variables(1);
        let flag = mgr.state_variable(id, 0);
        let out = mgr.create_output_variables(&["out"]).unwrap();
        let b = SymbolicAutomaton::new(Rc::clone(&mgr), id, vec![true], vec![-flag], flag)
            .unwrap()
            .with_io_variables(a.input_variables().to_vec(), out.clone());

        let p = SymbolicAutomaton::product(&[&a, &b]).unwrap();
        assert_eq!(p.input_variables(), a.input_variables());
        assert_eq!(p.output_variables(), out.as_slice());
        assert_eq!(p.initial_state(), &[false, false, true]);
        assert_eq!(p.transition_function().len(), 3);
        assert!(p.contains_state(p.final_states(), &[true, true, true]));
        assert!(!p.contains_state(p.final_states(), &[true, true, false]));
        assert!(SymbolicAutomaton::product(&[]).is_err());
    }

    #[test]
    fn test_with_final_states() {
        let mgr = Rc::new(VarMgr::default());
        let a = counter(&mgr);
        let b = a.with_final_states(Ref::ONE);
        assert_eq!(b.final_states(), Ref::ONE);
        assert_eq!(b.id(), a.id());
        assert_eq!(a.transition_substitution().len(), 2);
    }
}
