//! Temporal goals: a domain composed with an explicit goal automaton over its fluents.

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use fond_bdd::compiler::{compile, CompiledDomain};
use fond_bdd::compose::compose;
use fond_bdd::config::Config;
use fond_bdd::dfa::ExplicitDfa;
use fond_bdd::domain::{Action, DomainBuilder};
use fond_bdd::error::Error;
use fond_bdd::stepper::Stepper;
use fond_bdd::synthesis::{BestEffortSynthesizer, Region};
use fond_bdd::utils::from_bits;
use fond_bdd::var_mgr::VarMgr;
use test_log::test;

/// `set_a` makes `a` true and `b` false, `set_b` the other way round. The domain goal is `a`.
fn seesaw(mgr: &Rc<VarMgr>) -> CompiledDomain {
    let mut b = DomainBuilder::new();
    let a = b.variable("a", false);
    let bb = b.variable("b", false);
    b.action(Action::new("set_a", "_REACT_0").add(a).del(bb));
    b.action(Action::new("set_b", "_REACT_0").add(bb).del(a));
    b.goal(a, true);
    compile(&b.build().unwrap(), mgr, &Config::default()).unwrap()
}

/// `a` and later `b`. Letters: bit 0 is `a`, bit 1 is `b`.
fn a_then_b() -> ExplicitDfa {
    ExplicitDfa::new(
        vec!["a".to_string(), "b".to_string()],
        0,
        BTreeSet::from([2]),
        vec![vec![0, 1, 0, 1], vec![1, 1, 2, 2], vec![2, 2, 2, 2]],
    )
    .unwrap()
}

#[test]
fn sequence_goal_is_realizable() {
    let mgr = Rc::new(VarMgr::default());
    let c = seesaw(&mgr);
    let result = BestEffortSynthesizer::default().run_with_goal(&c, &a_then_b()).unwrap();

    assert!(result.adversarial.realizable);
    assert!(result.cooperative.is_none());
    // The domain goal alone is one step away; the sequence needs two.
    assert_eq!(result.adversarial.iterations, 2);

    let arena = &result.arena;
    assert_eq!(arena.initial_state().len(), 5);
    assert_eq!(result.region(arena.initial_state()), Region::Winning);

    let t = result.adversarial.transducer.as_ref().unwrap();
    let init = arena.initial_state();
    assert_eq!(t.choice_id(init, &HashMap::new()).unwrap(), c.action_id("set_a").unwrap());

    let trace = t.play(&[HashMap::new(), HashMap::new()]).unwrap();
    // Domain bits (a, b, env_err), then the goal automaton state.
    assert_eq!(from_bits(&trace[1][3..]), 1);
    assert_eq!(from_bits(&trace[2][3..]), 2);
    assert_eq!(&trace[2][..3], &[false, true, false]);
}

#[test]
fn stepper_follows_the_arena() {
    let mgr = Rc::new(VarMgr::default());
    let c = seesaw(&mgr);
    let result = BestEffortSynthesizer::default().run_with_goal(&c, &a_then_b()).unwrap();
    let stepper = Stepper::with_arena(&c, &result.arena);
    let t = result.adversarial.transducer.as_ref().unwrap();

    let first = stepper.strategy_step(stepper.initial_state(), t, 0).unwrap();
    assert_eq!(first.action_name.as_deref(), Some("set_a"));
    assert!(first.is_final);
    let second = stepper.strategy_step(&first.next, t, 0).unwrap();
    assert_eq!(second.action_name.as_deref(), Some("set_b"));
    assert_eq!(from_bits(&second.next[3..]), 2);
}

#[test]
fn eventually_needs_cooperation() {
    // `roll` may or may not produce `six`.
    let mut b = DomainBuilder::new();
    let six = b.variable("six", false);
    b.action(Action::new("roll", "_REACT_0").add(six));
    b.action(Action::new("roll", "_REACT_1").del(six));
    let mgr = Rc::new(VarMgr::default());
    let c = compile(&b.build().unwrap(), &mgr, &Config::default()).unwrap();

    let result = BestEffortSynthesizer::default()
        .run_with_goal(&c, &ExplicitDfa::eventually("six"))
        .unwrap();
    assert!(!result.adversarial.realizable);
    let coop = result.cooperative.as_ref().unwrap();
    assert!(coop.realizable);
    assert_eq!(result.region(result.arena.initial_state()), Region::Cooperative);
}

#[test]
fn initial_fluents_are_read_by_the_goal() {
    let mut b = DomainBuilder::new();
    b.variable("done", true);
    b.action(Action::new("idle", "_REACT_0"));
    let mgr = Rc::new(VarMgr::default());
    let c = compile(&b.build().unwrap(), &mgr, &Config::default()).unwrap();

    let result = BestEffortSynthesizer::default()
        .run_with_goal(&c, &ExplicitDfa::eventually("done"))
        .unwrap();
    assert!(result.adversarial.realizable);
    assert_eq!(result.adversarial.iterations, 1);
}

#[test]
fn unknown_fluent_is_rejected() {
    let mgr = Rc::new(VarMgr::default());
    let c = seesaw(&mgr);
    let err = BestEffortSynthesizer::default()
        .run_with_goal(&c, &ExplicitDfa::eventually("c"))
        .unwrap_err();
    assert!(matches!(err, Error::UnknownFluent { ref fluent } if fluent == "c"));
    assert_eq!(err.to_string(), "fluent 'c' is not a state variable of the domain");
}

#[test]
fn compose_keeps_domain_transitions() {
    let mgr = Rc::new(VarMgr::default());
    let c = seesaw(&mgr);
    let goal = a_then_b().to_symbolic(&mgr).unwrap();
    let arena = compose(c.automaton(), &goal, &["a", "b"]).unwrap();

    let n = c.automaton().transition_function().len();
    assert_eq!(&arena.transition_function()[..n], c.automaton().transition_function());
    for &t in &arena.transition_function()[n..] {
        assert!(mgr.alphabet_support(t).is_empty());
    }
}
