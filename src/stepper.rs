//! Textual stepping through a compiled domain, one action-reaction pair at a time.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use log::debug;

use crate::automaton::SymbolicAutomaton;
use crate::compiler::CompiledDomain;
use crate::error::{Error, Result};
use crate::synthesis::Player;
use crate::transducer::Transducer;
use crate::utils::to_bits;

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub state: Vec<bool>,
    pub action: usize,
    pub reaction: usize,
    pub action_name: Option<String>,
    pub reaction_name: Option<String>,
    pub next: Vec<bool>,
    /// The selected agent action is undefined or not applicable in `state`.
    pub agent_violation: bool,
    /// `env_err` holds in `next`.
    pub env_error: bool,
    /// `agent_err` holds in `next`, or, without an error bit, `agent_violation`.
    pub agent_error: bool,
    /// The domain goal holds in `next`.
    pub is_final: bool,
    before: String,
    after: String,
}

fn bits(state: &[bool]) -> String {
    state.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

impl Display for StepReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "State: {} ({})", self.before, bits(&self.state))?;
        writeln!(
            f,
            "Action {}: {}",
            self.action,
            self.action_name.as_deref().unwrap_or("<undefined>")
        )?;
        writeln!(
            f,
            "Reaction {}: {}",
            self.reaction,
            self.reaction_name.as_deref().unwrap_or("<undefined>")
        )?;
        writeln!(f, "Next state: {} ({})", self.after, bits(&self.next))?;
        writeln!(f, "Agent error: {}", yes_no(self.agent_error))?;
        writeln!(f, "Environment error: {}", yes_no(self.env_error))?;
        write!(f, "Final: {}", yes_no(self.is_final))
    }
}

pub struct Stepper<'a> {
    compiled: &'a CompiledDomain,
    arena: SymbolicAutomaton,
}

impl<'a> Stepper<'a> {
    pub fn new(compiled: &'a CompiledDomain) -> Self {
        Self {
            compiled,
            arena: compiled.automaton().clone(),
        }
    }

    /// Step through `arena` instead, whose leading state bits are those of the compiled domain.
    pub fn with_arena(compiled: &'a CompiledDomain, arena: &SymbolicAutomaton) -> Self {
        Self {
            compiled,
            arena: arena.clone(),
        }
    }

    pub fn initial_state(&self) -> &[bool] {
        self.arena.initial_state()
    }

    fn encode(kind: &'static str, id: usize, vars: &[u32]) -> Result<HashMap<u32, bool>> {
        if vars.len() < usize::BITS as usize && id >> vars.len() != 0 {
            return Err(Error::IdOutOfRange {
                kind,
                id,
                bits: vars.len(),
            });
        }
        Ok(vars.iter().copied().zip(to_bits(id, vars.len())).collect())
    }

    /// Apply agent action `action` and reaction `reaction` to `state`.
    ///
    /// Ids are encoded least significant bit first. Ids that fit the allocated bits but name no
    /// action or reaction are accepted: they exercise the mutex encoding.
    pub fn step(&self, state: &[bool], action: usize, reaction: usize) -> Result<StepReport> {
        let c = self.compiled;
        let mut values = Self::encode("action", action, c.output_variables())?;
        values.extend(Self::encode("reaction", reaction, c.input_variables())?);

        let next = self.arena.step(state, &values)?;
        values.extend(self.arena.state_variables().into_iter().zip(state.iter().copied()));

        let mgr = c.mgr();
        let agent_ok = mgr.bdd().apply_and(c.agent_precondition(), c.agent_mutex());
        let agent_violation = !mgr.eval(agent_ok, &values);
        let agent_error = match c.agent_error_bit() {
            Some(i) => next[i],
            None => agent_violation,
        };
        let n = c.domain().variables().len();
        let report = StepReport {
            state: state.to_vec(),
            action,
            reaction,
            action_name: c.action_name(action).map(str::to_string),
            reaction_name: c.reaction_name(reaction).map(str::to_string),
            agent_violation,
            env_error: next[c.env_error_bit()],
            agent_error,
            is_final: self.arena.contains_state(c.automaton().final_states(), &next),
            before: c.domain().describe_state(&state[..n]),
            after: c.domain().describe_state(&next[..n]),
            next,
        };
        debug!("Step {} x {} from {}", action, reaction, bits(state));
        Ok(report)
    }

    /// Step with the agent action chosen by `strategy`.
    pub fn strategy_step(&self, state: &[bool], strategy: &Transducer, reaction: usize) -> Result<StepReport> {
        let observed = match strategy.starting_player() {
            Player::Environment => Self::encode("reaction", reaction, self.compiled.input_variables())?,
            Player::Agent => HashMap::new(),
        };
        let action = strategy.choice_id(state, &observed)?;
        self.step(state, action, reaction)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use test_log::test;

    use super::*;
    use crate::compiler::compile;
    use crate::config::Config;
    use crate::domain::{Action, DomainBuilder};
    use crate::synthesis::BestEffortSynthesizer;
    use crate::var_mgr::VarMgr;

    fn compiled(mgr: &Rc<VarMgr>) -> CompiledDomain {
        let mut b = DomainBuilder::new();
        let lit = b.variable("lit", false);
        let fuel = b.variable("fuel", true);
        b.action(Action::new("ignite", "_REACT_0").pre(fuel).add(lit).del(fuel));
        b.action(Action::new("ignite", "_REACT_1").pre(fuel).del(fuel));
        b.action(Action::new("wait", "_REACT_0"));
        b.goal(lit, true);
        compile(&b.build().unwrap(), mgr, &Config::default()).unwrap()
    }

    #[test]
    fn test_step_report() {
        let mgr = Rc::new(VarMgr::default());
        let c = compiled(&mgr);
        let stepper = Stepper::new(&c);
        let init = stepper.initial_state().to_vec();

        let r = stepper.step(&init, 0, 0).unwrap();
        assert_eq!(r.next, vec![true, false, false]);
        assert!(r.is_final);
        assert!(!r.env_error);
        assert!(!r.agent_error);
        assert_eq!(r.action_name.as_deref(), Some("ignite"));

        let text = r.to_string();
        assert!(text.contains("State: {fuel} (010)"));
        assert!(text.contains("Next state: {lit} (100)"));
        assert!(text.contains("Final: yes"));
    }

    #[test]
    fn test_step_flags_errors() {
        let mgr = Rc::new(VarMgr::default());
        let c = compiled(&mgr);
        let stepper = Stepper::new(&c);

        // `wait` has no second outcome.
        let r = stepper.step(&[false, true, false], 1, 1).unwrap();
        assert!(r.env_error);
        assert!(!r.agent_error);

        // `ignite` without fuel.
        let r = stepper.step(&[false, false, false], 0, 0).unwrap();
        assert!(r.agent_violation);
        assert!(!r.env_error);
    }

    #[test]
    fn test_ids_must_fit() {
        let mgr = Rc::new(VarMgr::default());
        let c = compiled(&mgr);
        let stepper = Stepper::new(&c);
        let err = stepper.step(&[false, true, false], 2, 0).unwrap_err();
        assert!(matches!(err, Error::IdOutOfRange { kind: "action", id: 2, bits: 1 }));
        assert!(stepper.step(&[false, true], 0, 0).is_err());
    }

    #[test]
    fn test_strategy_step() {
        let mgr = Rc::new(VarMgr::default());
        let c = compiled(&mgr);
        let result = BestEffortSynthesizer::default().run(&c).unwrap();
        assert!(!result.adversarial.realizable);

        let stepper = Stepper::new(&c);
        let init = stepper.initial_state().to_vec();
        let strategy = result.strategy(&init).unwrap();
        let r = stepper.strategy_step(&init, strategy, 0).unwrap();
        assert_eq!(r.action_name.as_deref(), Some("ignite"));
        assert!(r.is_final);
    }
}
