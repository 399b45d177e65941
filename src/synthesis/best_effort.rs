//! Best-effort synthesis for FOND planning games.
//!
//! The agent first tries to win adversarially: reach the goal, or a state where the environment
//! has broken its own rules. When that fails, it settles for a cooperative strategy that reaches
//! the adversarially winning region along environment-legal plays.

use std::rc::Rc;

use log::info;

use crate::automaton::SymbolicAutomaton;
use crate::compiler::CompiledDomain;
use crate::compose::compose;
use crate::config::Config;
use crate::dfa::ExplicitDfa;
use crate::error::Result;
use crate::reference::Ref;
use crate::synthesis::{CooperativeReachabilitySynthesizer, Player, ReachabilitySynthesizer, SynthesisResult};
use crate::transducer::Transducer;

/// Where a state lies with respect to a best-effort solution.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Region {
    /// The agent wins against every environment.
    Winning,
    /// The agent wins if the environment cooperates.
    Cooperative,
    Losing,
}

#[derive(Debug, Clone)]
pub struct BestEffortResult {
    /// Arena both games were played on.
    pub arena: SymbolicAutomaton,
    pub adversarial: SynthesisResult,
    /// Present when the adversarial game is unrealizable.
    pub cooperative: Option<SynthesisResult>,
}

impl BestEffortResult {
    pub fn region(&self, state: &[bool]) -> Region {
        if self.arena.contains_state(self.adversarial.winning_states, state) {
            return Region::Winning;
        }
        match &self.cooperative {
            Some(coop) if self.arena.contains_state(coop.winning_states, state) => Region::Cooperative,
            _ => Region::Losing,
        }
    }

    /// Strategy to follow from `state`, if any.
    pub fn strategy(&self, state: &[bool]) -> Option<&Transducer> {
        match self.region(state) {
            Region::Winning => self.adversarial.transducer.as_ref(),
            Region::Cooperative => self.cooperative.as_ref().and_then(|c| c.transducer.as_ref()),
            Region::Losing => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BestEffortSynthesizer {
    max_iterations: Option<usize>,
}

impl BestEffortSynthesizer {
    pub fn new(config: &Config) -> Self {
        Self {
            max_iterations: config.max_iterations,
        }
    }

    /// Invariants hold and the agent has selected an applicable action.
    ///
    /// The agent precondition is required at the initial state too, which the invariant exempts.
    fn state_space(compiled: &CompiledDomain) -> Ref {
        let bdd = compiled.mgr().bdd();
        bdd.apply_and_many([compiled.invariant(), compiled.agent_mutex(), compiled.agent_precondition()])
    }

    /// `¬agent_err ∧ (env_err ∨ target) ∧ S`
    fn adversarial_goal(compiled: &CompiledDomain, target: Ref, state_space: Ref) -> Ref {
        let bdd = compiled.mgr().bdd();
        bdd.apply_and_many([
            -compiled.agent_error(),
            bdd.apply_or(compiled.env_error(), target),
            state_space,
        ])
    }

    /// `¬agent_err ∧ ¬env_err ∧ target ∧ S`
    fn cooperative_goal(compiled: &CompiledDomain, target: Ref, state_space: Ref) -> Ref {
        let bdd = compiled.mgr().bdd();
        bdd.apply_and_many([-compiled.agent_error(), -compiled.env_error(), target, state_space])
    }

    fn solve_adversarial(&self, arena: &SymbolicAutomaton, goal: Ref, state_space: Ref) -> Result<SynthesisResult> {
        ReachabilitySynthesizer::new(arena.clone(), Player::Agent, Player::Agent, goal, state_space)
            .with_max_iterations(self.max_iterations)
            .run()
    }

    fn solve_cooperative(&self, arena: &SymbolicAutomaton, goal: Ref, state_space: Ref) -> Result<SynthesisResult> {
        CooperativeReachabilitySynthesizer::new(arena.clone(), Player::Agent, Player::Agent, goal, state_space)
            .with_max_iterations(self.max_iterations)
            .run()
    }

    /// Adversarial game only.
    pub fn adversarial(&self, compiled: &CompiledDomain) -> Result<SynthesisResult> {
        let s = Self::state_space(compiled);
        let goal = Self::adversarial_goal(compiled, compiled.automaton().final_states(), s);
        self.solve_adversarial(compiled.automaton(), goal, s)
    }

    /// Cooperative game only, towards the domain goal along environment-legal plays.
    pub fn cooperative(&self, compiled: &CompiledDomain) -> Result<SynthesisResult> {
        let s = Self::state_space(compiled);
        let goal = Self::cooperative_goal(compiled, compiled.automaton().final_states(), s);
        self.solve_cooperative(compiled.automaton(), goal, s)
    }

    /// Solve the adversarial game, then the cooperative one towards its winning region if needed.
    pub fn run(&self, compiled: &CompiledDomain) -> Result<BestEffortResult> {
        let arena = compiled.automaton();
        let s = Self::state_space(compiled);
        let adversarial = self.adversarial(compiled)?;
        if adversarial.realizable {
            info!("Adversarial game is realizable after {} iterations", adversarial.iterations);
            return Ok(BestEffortResult {
                arena: arena.clone(),
                adversarial,
                cooperative: None,
            });
        }

        info!("Adversarial game is unrealizable, falling back to cooperative synthesis");
        let goal = Self::cooperative_goal(compiled, adversarial.winning_states, s);
        let cooperative = self.solve_cooperative(arena, goal, s)?;
        info!(
            "Cooperative game is {} after {} iterations",
            if cooperative.realizable { "realizable" } else { "unrealizable" },
            cooperative.iterations
        );
        Ok(BestEffortResult {
            arena: arena.clone(),
            adversarial,
            cooperative: Some(cooperative),
        })
    }

    /// Best-effort synthesis for a temporal goal given as a DFA over domain fluents.
    ///
    /// The domain goal is ignored: the arena is the domain composed with `goal`, and the target is
    /// the accepting states of `goal`.
    pub fn run_with_goal(&self, compiled: &CompiledDomain, goal: &ExplicitDfa) -> Result<BestEffortResult> {
        let mgr = Rc::clone(compiled.mgr());
        let symbolic = goal.to_symbolic(&mgr)?;
        let arena = compose(compiled.automaton(), &symbolic, goal.alphabet())?;
        let target = symbolic.final_states();
        let s = Self::state_space(compiled);

        let adversarial = self.solve_adversarial(&arena, Self::adversarial_goal(compiled, target, s), s)?;
        let cooperative = if adversarial.realizable {
            None
        } else {
            Some(self.solve_cooperative(&arena, Self::cooperative_goal(compiled, target, s), s)?)
        };
        info!(
            "Temporal goal: adversarial {}, cooperative {}",
            adversarial.realizable,
            cooperative.as_ref().map_or("skipped".to_string(), |c| c.realizable.to_string())
        );
        Ok(BestEffortResult {
            arena,
            adversarial,
            cooperative,
        })
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::compiler::compile;
    use crate::domain::{Action, DomainBuilder};
    use crate::var_mgr::VarMgr;

    /// `try` may or may not set `done`; `force` sets it but needs `key`, which nothing provides.
    fn gamble() -> crate::domain::Domain {
        let mut b = DomainBuilder::new();
        let done = b.variable("done", false);
        let key = b.variable("key", false);
        b.action(Action::new("try", "_REACT_0").add(done));
        b.action(Action::new("try", "_REACT_1"));
        b.action(Action::new("force", "_REACT_0").pre(key).add(done));
        b.goal(done, true);
        b.build().unwrap()
    }

    #[test]
    fn test_falls_back_to_cooperation() {
        let mgr = Rc::new(VarMgr::default());
        let c = compile(&gamble(), &mgr, &Config::default()).unwrap();
        let result = BestEffortSynthesizer::default().run(&c).unwrap();

        assert!(!result.adversarial.realizable);
        let coop = result.cooperative.as_ref().unwrap();
        assert!(coop.realizable);

        let init = c.automaton().initial_state();
        assert_eq!(result.region(init), Region::Cooperative);
        let t = result.strategy(init).unwrap();
        assert_eq!(t.choice_id(init, &Default::default()).unwrap(), c.action_id("try").unwrap());
    }

    #[test]
    fn test_realizable_skips_cooperation() {
        let mut b = DomainBuilder::new();
        let done = b.variable("done", false);
        b.action(Action::new("finish", "_REACT_0").add(done));
        b.goal(done, true);
        let mgr = Rc::new(VarMgr::default());
        let c = compile(&b.build().unwrap(), &mgr, &Config::default()).unwrap();

        let result = BestEffortSynthesizer::default().run(&c).unwrap();
        assert!(result.adversarial.realizable);
        assert!(result.cooperative.is_none());
        assert_eq!(result.region(c.automaton().initial_state()), Region::Winning);
    }

    #[test]
    fn test_error_bit_mode() {
        let mgr = Rc::new(VarMgr::default());
        let config = Config {
            agent_error: crate::config::AgentErrorMode::ErrorBit,
            ..Config::default()
        };
        let c = compile(&gamble(), &mgr, &config).unwrap();
        let result = BestEffortSynthesizer::new(&config).run(&c).unwrap();

        assert!(!result.adversarial.realizable);
        assert!(result.cooperative.unwrap().realizable);
        // A state with the agent error bit set is never winning.
        assert!(!c.automaton().contains_state(result.adversarial.winning_states, &[true, false, false, true]));
    }
}
