//! Synchronisation of a domain automaton with an auxiliary automaton reading its fluents.

use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info};

use crate::automaton::SymbolicAutomaton;
use crate::error::{Error, Result};
use crate::reference::Ref;

/// Compose `first` with `second`, where `second` reads the fluents named in `shared`.
///
/// Every shared fluent must be a named state variable of `first` and an alphabet variable of the
/// manager. The alphabet variables in `second`'s transition function are replaced by `first`'s
/// next-state functions, so `second` observes the state `first` is moving to.
///
/// Every alphabet variable `second` reads must be listed in `shared`, otherwise the first one
/// left over is reported as [`Error::UnknownFluent`].
///
/// The initial state of `second` is advanced by one step, reading `first`'s initial state.
/// The result has a constant-true final predicate, and the input and output variables of both.
pub fn compose<S: AsRef<str>>(first: &SymbolicAutomaton, second: &SymbolicAutomaton, shared: &[S]) -> Result<SymbolicAutomaton> {
    let mgr = Rc::clone(first.mgr());
    let bdd = mgr.bdd();

    let mut subst: HashMap<u32, Ref> = HashMap::new();
    let mut letters: HashMap<u32, bool> = HashMap::new();
    for fluent in shared.iter().map(AsRef::as_ref) {
        let unknown = || Error::UnknownFluent {
            fluent: fluent.to_string(),
        };
        let index = mgr.state_variable_index(first.id(), fluent).ok_or_else(unknown)?;
        let letter = mgr.name_to_variable(fluent).ok_or_else(unknown)?;
        let v = bdd.variable(letter.index());
        debug!("Fluent '{}' is state bit {} of the domain, read through variable {}", fluent, index, v);
        subst.insert(v, first.transition_function()[index]);
        letters.insert(v, first.initial_state()[index]);
    }

    let id = mgr.create_product_state_space(&[first.id(), second.id()]);

    // Evaluate `second` with all inputs and outputs false, its letters read from `first`'s initial state.
    let mut values = letters;
    values.extend(first.state_variables().into_iter().zip(first.initial_state().iter().copied()));
    let stepped = second.step(second.initial_state(), &values)?;

    let mut initial = first.initial_state().to_vec();
    initial.extend(stepped);

    let mut transition = first.transition_function().to_vec();
    for &t in second.transition_function() {
        let composed = bdd.vector_compose(t, &subst);
        if let Some(&v) = mgr.alphabet_support(composed).iter().next() {
            return Err(Error::UnknownFluent {
                fluent: mgr.variable_name(v).unwrap_or_else(|| format!("x{}", v)),
            });
        }
        transition.push(composed);
    }

    info!(
        "Composed game arena {} with {} state bits over {} shared fluents",
        id,
        transition.len(),
        shared.len()
    );
    let inputs = merge([first.input_variables(), second.input_variables()]);
    let outputs = merge([first.output_variables(), second.output_variables()]);
    Ok(SymbolicAutomaton::new(mgr, id, initial, transition, Ref::ONE)?.with_io_variables(inputs, outputs))
}

fn merge(lists: [&[u32]; 2]) -> Vec<u32> {
    let mut merged = lists[0].to_vec();
    merged.extend(lists[1].iter().filter(|v| !lists[0].contains(v)));
    merged
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::compiler::compile;
    use crate::config::Config;
    use crate::dfa::ExplicitDfa;
    use crate::domain::{Action, DomainBuilder};
    use crate::var_mgr::VarMgr;

    fn light_domain(initially_on: bool) -> crate::domain::Domain {
        let mut b = DomainBuilder::new();
        let on = b.variable("on", initially_on);
        b.action(Action::new("switch_on", "_REACT_0").add(on));
        b.action(Action::new("switch_off", "_REACT_0").del(on));
        b.goal(on, true);
        b.build().unwrap()
    }

    #[test]
    fn test_unknown_fluent() {
        let mgr = Rc::new(VarMgr::default());
        let c = compile(&light_domain(false), &mgr, &Config::default()).unwrap();
        let goal = ExplicitDfa::eventually("missing").to_symbolic(&mgr).unwrap();

        let err = compose(c.automaton(), &goal, &["missing"]).unwrap_err();
        assert!(matches!(err, Error::UnknownFluent { fluent } if fluent == "missing"));
    }

    #[test]
    fn test_no_alphabet_variable() {
        let mgr = Rc::new(VarMgr::default());
        let c = compile(&light_domain(false), &mgr, &Config::default()).unwrap();
        let goal = ExplicitDfa::eventually("on").to_symbolic(&mgr).unwrap();

        // Domain fluent exists but "env_err" was never read by any automaton.
        let err = compose(c.automaton(), &goal, &["env_err"]).unwrap_err();
        assert!(matches!(err, Error::UnknownFluent { .. }));
    }

    #[test]
    fn test_unshared_letter() {
        let mut b = DomainBuilder::new();
        let on = b.variable("on", false);
        b.variable("hot", false);
        b.action(Action::new("switch_on", "_REACT_0").add(on));
        b.goal(on, true);
        let mgr = Rc::new(VarMgr::default());
        let c = compile(&b.build().unwrap(), &mgr, &Config::default()).unwrap();
        let goal = ExplicitDfa::eventually_all(&["on", "hot"]).unwrap().to_symbolic(&mgr).unwrap();

        // `hot` is a domain fluent, but it is not wired into the goal automaton.
        let err = compose(c.automaton(), &goal, &["on"]).unwrap_err();
        assert!(matches!(err, Error::UnknownFluent { ref fluent } if fluent == "hot"));
        assert!(compose(c.automaton(), &goal, &["on", "hot"]).is_ok());
    }

    #[test]
    fn test_compose_tracks_fluent() {
        let mgr = Rc::new(VarMgr::default());
        let c = compile(&light_domain(false), &mgr, &Config::default()).unwrap();
        let goal = ExplicitDfa::eventually("on").to_symbolic(&mgr).unwrap();
        let arena = compose(c.automaton(), &goal, &["on"]).unwrap();

        // (on, env_err, dfa bit)
        assert_eq!(arena.initial_state(), &[false, false, false]);
        assert_eq!(arena.final_states(), Ref::ONE);
        assert_eq!(arena.output_variables(), c.output_variables());
        assert_eq!(arena.input_variables(), c.input_variables());
        for &t in arena.transition_function() {
            assert!(mgr.alphabet_support(t).is_empty());
        }

        // switch_off has id 0, switch_on has id 1.
        let a0 = mgr.bdd().variable(mgr.name_to_variable("a_0").unwrap().index());
        let on = HashMap::from([(a0, true)]);
        let off = HashMap::from([(a0, false)]);

        let s1 = arena.step(arena.initial_state(), &off).unwrap();
        assert_eq!(s1, vec![false, false, false]);
        let s2 = arena.step(&s1, &on).unwrap();
        assert_eq!(s2, vec![true, false, true]);
        let s3 = arena.step(&s2, &off).unwrap();
        assert_eq!(s3, vec![false, false, true]);
    }

    #[test]
    fn test_initial_state_is_stepped() {
        let mgr = Rc::new(VarMgr::default());
        let c = compile(&light_domain(true), &mgr, &Config::default()).unwrap();
        let goal = ExplicitDfa::eventually("on").to_symbolic(&mgr).unwrap();
        let arena = compose(c.automaton(), &goal, &["on"]).unwrap();

        // The goal automaton has already read the initial domain state.
        assert_eq!(arena.initial_state(), &[true, false, true]);
        assert!(arena.contains_state(goal.final_states(), arena.initial_state()));
    }
}
