//! Compilation of a grounded [`Domain`] into a symbolic game arena.
//!
//! State bits are the domain fluents followed by the sticky `env_err` bit (and the `agent_err`
//! bit when agent errors are tracked in the state). The agent's choice is encoded in binary on
//! the output variables `a_0, a_1, ..`, the environment's choice on the input variables
//! `r_0, r_1, ..`, both least significant bit first. Names are numbered in lexicographic order.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use log::{debug, info};

use crate::automaton::SymbolicAutomaton;
use crate::bdd::Bdd;
use crate::config::{AgentErrorMode, Config};
use crate::domain::{Domain, Invariant};
use crate::error::Result;
use crate::reference::Ref;
use crate::utils::{bit_width, to_bits};
use crate::var_mgr::{AutomatonId, VarMgr};

pub const ENV_ERROR_VARIABLE: &str = "env_err";
pub const AGENT_ERROR_VARIABLE: &str = "agent_err";

/// Predicates derived for one action-reaction pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ActionPredicates {
    /// Output assignment selecting the agent component.
    pub agent: Ref,
    /// Input assignment selecting the reaction component.
    pub env: Ref,
    /// `agent ∧ env`.
    pub action: Ref,
}

/// Result of compiling a domain.
#[derive(Debug, Clone)]
pub struct CompiledDomain {
    domain: Domain,
    automaton: SymbolicAutomaton,
    invariant: Ref,
    agent_mutex: Ref,
    env_mutex: Ref,
    agent_precondition: Ref,
    env_precondition: Ref,
    predicates: BTreeMap<String, ActionPredicates>,
    agent_names: Vec<String>,
    reaction_names: Vec<String>,
    output_variables: Vec<u32>,
    input_variables: Vec<u32>,
    agent_error_mode: AgentErrorMode,
}

impl CompiledDomain {
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn automaton(&self) -> &SymbolicAutomaton {
        &self.automaton
    }

    pub fn mgr(&self) -> &Rc<VarMgr> {
        self.automaton.mgr()
    }

    /// State-space restriction: domain invariants plus agent safety.
    pub fn invariant(&self) -> Ref {
        self.invariant
    }

    /// Holds iff the outputs encode some agent action.
    pub fn agent_mutex(&self) -> Ref {
        self.agent_mutex
    }

    /// Holds iff the inputs encode some reaction.
    pub fn env_mutex(&self) -> Ref {
        self.env_mutex
    }

    /// Holds iff the selected agent action is applicable in the current state.
    pub fn agent_precondition(&self) -> Ref {
        self.agent_precondition
    }

    /// Holds iff the selected reaction is a legal response to the selected agent action.
    pub fn env_precondition(&self) -> Ref {
        self.env_precondition
    }

    pub fn predicates(&self) -> &BTreeMap<String, ActionPredicates> {
        &self.predicates
    }

    pub fn agent_error_mode(&self) -> AgentErrorMode {
        self.agent_error_mode
    }

    /// Position of the `env_err` bit in the state vector.
    pub fn env_error_bit(&self) -> usize {
        self.domain.variables().len()
    }

    /// Position of the `agent_err` bit, if agent errors are tracked in the state.
    pub fn agent_error_bit(&self) -> Option<usize> {
        match self.agent_error_mode {
            AgentErrorMode::Invariant => None,
            AgentErrorMode::ErrorBit => Some(self.domain.variables().len() + 1),
        }
    }

    pub fn env_error(&self) -> Ref {
        self.mgr().state_variable(self.automaton.id(), self.env_error_bit())
    }

    /// The `agent_err` state bit, or constant false when agent errors are not tracked in the state.
    pub fn agent_error(&self) -> Ref {
        match self.agent_error_bit() {
            Some(i) => self.mgr().state_variable(self.automaton.id(), i),
            None => Ref::ZERO,
        }
    }

    /// Agent component names, indexed by action id.
    pub fn agent_names(&self) -> &[String] {
        &self.agent_names
    }

    /// Reaction names, indexed by reaction id.
    pub fn reaction_names(&self) -> &[String] {
        &self.reaction_names
    }

    pub fn action_id(&self, agent: &str) -> Option<usize> {
        self.agent_names.binary_search_by(|n| n.as_str().cmp(agent)).ok()
    }

    pub fn reaction_id(&self, reaction: &str) -> Option<usize> {
        self.reaction_names.binary_search_by(|n| n.as_str().cmp(reaction)).ok()
    }

    pub fn action_name(&self, id: usize) -> Option<&str> {
        self.agent_names.get(id).map(String::as_str)
    }

    pub fn reaction_name(&self, id: usize) -> Option<&str> {
        self.reaction_names.get(id).map(String::as_str)
    }

    /// Output variables `a_0, a_1, ..`, least significant first.
    pub fn output_variables(&self) -> &[u32] {
        &self.output_variables
    }

    /// Input variables `r_0, r_1, ..`, least significant first.
    pub fn input_variables(&self) -> &[u32] {
        &self.input_variables
    }
}

/// Compile `domain` into a symbolic automaton over fresh state variables of `mgr`.
pub fn compile(domain: &Domain, mgr: &Rc<VarMgr>, config: &Config) -> Result<CompiledDomain> {
    let bdd = mgr.bdd();
    let mode = config.agent_error;

    let mut state_names: Vec<&str> = domain.variables().iter().map(String::as_str).collect();
    state_names.push(ENV_ERROR_VARIABLE);
    if mode == AgentErrorMode::ErrorBit {
        state_names.push(AGENT_ERROR_VARIABLE);
    }
    let id = mgr.create_named_state_variables(&state_names)?;
    let n = domain.variables().len();

    let agent_names: Vec<String> = domain
        .actions()
        .map(|a| a.agent.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let reaction_names: Vec<String> = domain
        .actions()
        .map(|a| a.reaction.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let output_bits = bit_width(agent_names.len() - 1);
    let input_bits = bit_width(reaction_names.len() - 1);
    let output_variables = mgr.create_output_variables(&(0..output_bits).map(|i| format!("a_{}", i)).collect::<Vec<_>>())?;
    let input_variables = mgr.create_input_variables(&(0..input_bits).map(|i| format!("r_{}", i)).collect::<Vec<_>>())?;
    debug!(
        "Encoding {} agent actions on {} bits and {} reactions on {} bits",
        agent_names.len(),
        output_bits,
        reaction_names.len(),
        input_bits
    );

    let agent_codes: Vec<Ref> = (0..agent_names.len()).map(|i| encode(bdd, i, &output_variables)).collect();
    let reaction_codes: Vec<Ref> = (0..reaction_names.len()).map(|i| encode(bdd, i, &input_variables)).collect();
    let agent_code = |name: &str| agent_codes[agent_names.binary_search_by(|n| n.as_str().cmp(name)).unwrap_or(0)];
    let reaction_code = |name: &str| reaction_codes[reaction_names.binary_search_by(|n| n.as_str().cmp(name)).unwrap_or(0)];

    let predicates: BTreeMap<String, ActionPredicates> = domain
        .actions()
        .map(|a| {
            let agent = agent_code(&a.agent);
            let env = reaction_code(&a.reaction);
            let action = bdd.apply_and(agent, env);
            (a.name.clone(), ActionPredicates { agent, env, action })
        })
        .collect();

    let agent_mutex = bdd.apply_or_many(agent_codes.iter().copied());
    let env_mutex = bdd.apply_or_many(reaction_codes.iter().copied());

    let state = |i: usize| mgr.state_variable(id, i);

    let mut transition = Vec::with_capacity(state_names.len());
    for i in 0..n {
        let adds = domain.actions().filter(|a| a.add.contains(&i)).map(|a| predicates[&a.name].action);
        let add = bdd.apply_or_many(adds.collect::<Vec<_>>());
        let dels = domain.actions().filter(|a| a.del.contains(&i)).map(|a| predicates[&a.name].action);
        let del = bdd.apply_or_many(dels.collect::<Vec<_>>());
        let keep = bdd.apply_and(state(i), -del);
        transition.push(bdd.apply_or(keep, add));
    }

    // Legal agent actions for each reaction.
    let mut legal: BTreeMap<&str, Ref> = BTreeMap::new();
    for a in domain.actions() {
        let acts = legal.entry(a.reaction.as_str()).or_insert(Ref::ZERO);
        *acts = bdd.apply_or(*acts, predicates[&a.name].agent);
    }
    let env_precondition = bdd.apply_and_many(
        legal
            .iter()
            .map(|(&reaction, &acts)| bdd.apply_imply(reaction_code(reaction), acts))
            .collect::<Vec<_>>(),
    );

    // Applicability of each agent action, taken from the first pair carrying it.
    let mut seen = BTreeSet::new();
    let mut agent_precondition = Ref::ONE;
    for a in domain.actions() {
        if !seen.insert(a.agent.as_str()) {
            continue;
        }
        let pre = bdd.cube(
            a.pos_pre
                .iter()
                .map(|&i| lit(mgr, id, i, true))
                .chain(a.neg_pre.iter().map(|&i| lit(mgr, id, i, false))),
        );
        agent_precondition = bdd.apply_and(agent_precondition, bdd.apply_imply(agent_code(&a.agent), pre));
    }

    let env_err = state(n);
    let env_violation = bdd.apply_or(-env_mutex, -env_precondition);
    transition.push(bdd.apply_or(env_err, env_violation));

    let agent_ok = bdd.apply_and(agent_precondition, agent_mutex);
    if mode == AgentErrorMode::ErrorBit {
        let agent_err = state(n + 1);
        transition.push(bdd.apply_or(agent_err, -agent_ok));
    }

    let finals = bdd.cube(
        domain
            .goal_pos()
            .iter()
            .map(|&i| lit(mgr, id, i, true))
            .chain(domain.goal_neg().iter().map(|&i| lit(mgr, id, i, false))),
    );

    let mut initial = domain.initial_state().to_vec();
    initial.push(false);
    if mode == AgentErrorMode::ErrorBit {
        initial.push(false);
    }

    let automaton = SymbolicAutomaton::new(Rc::clone(mgr), id, initial, transition, finals)?
        .with_io_variables(input_variables.clone(), output_variables.clone());

    let invariants = bdd.apply_and_many(
        domain
            .invariants()
            .iter()
            .map(|inv| invariant_to_bdd(mgr, id, inv))
            .collect::<Vec<_>>(),
    );
    let safety = match mode {
        AgentErrorMode::Invariant => bdd.apply_or(agent_ok, automaton.initial_state_bdd()),
        AgentErrorMode::ErrorBit => -state(n + 1),
    };
    let invariant = bdd.apply_and(invariants, safety);

    info!(
        "Compiled domain: {} fluents, {} action-reaction pairs, {} state bits, {} output bits, {} input bits",
        n,
        domain.action_count(),
        state_names.len(),
        output_bits,
        input_bits
    );

    Ok(CompiledDomain {
        domain: domain.clone(),
        automaton,
        invariant,
        agent_mutex,
        env_mutex,
        agent_precondition,
        env_precondition,
        predicates,
        agent_names,
        reaction_names,
        output_variables,
        input_variables,
        agent_error_mode: mode,
    })
}

/// Cube assigning the binary encoding of `id` to `vars`.
fn encode(bdd: &Bdd, id: usize, vars: &[u32]) -> Ref {
    bdd.cube(
        vars.iter()
            .zip(to_bits(id, vars.len()))
            .map(|(&v, b)| if b { v as i32 } else { -(v as i32) }),
    )
}

fn lit(mgr: &VarMgr, id: AutomatonId, i: usize, value: bool) -> i32 {
    let v = mgr.state_variables(id)[i] as i32;
    if value {
        v
    } else {
        -v
    }
}

/// Mutual exclusion over the positive fluents, and over the negative ones.
fn invariant_to_bdd(mgr: &VarMgr, id: AutomatonId, inv: &Invariant) -> Ref {
    let bdd = mgr.bdd();
    let var = |i: usize| mgr.state_variable(id, i);

    let mut res = Ref::ONE;
    for &v in inv.positive.iter() {
        let others = inv.positive.iter().filter(|&&p| p != v).map(|&p| -var(p));
        let negs = inv.negative.iter().map(|&q| var(q));
        let mutex = bdd.apply_and_many(others.chain(negs).collect::<Vec<_>>());
        res = bdd.apply_and(res, bdd.apply_imply(var(v), mutex));
    }
    for &v in inv.negative.iter() {
        let poss = inv.positive.iter().map(|&p| -var(p));
        let others = inv.negative.iter().filter(|&&q| q != v).map(|&q| var(q));
        let mutex = bdd.apply_and_many(poss.chain(others).collect::<Vec<_>>());
        res = bdd.apply_and(res, bdd.apply_imply(var(v), mutex));
    }
    res
}
