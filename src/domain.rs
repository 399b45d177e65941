//! Grounded FOND planning domains.
//!
//! A domain is a set of Boolean fluents, an initial assignment, a conjunctive goal and a set of
//! grounded action-reaction pairs. Each pair is identified by the agent's choice (`agent`) and the
//! environment's response (`reaction`); its precondition and effects are given as sets of
//! fluent indices.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

use crate::error::{Error, Result};

/// Marker separating the agent and reaction components of an encoded action name.
pub const REACTION_MARKER: &str = "_REACT";

/// Reaction assigned to actions whose encoded name carries no reaction component.
pub const DEFAULT_REACTION: &str = "_REACT_0";

/// A grounded action-reaction pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub name: String,
    pub agent: String,
    pub reaction: String,
    pub pos_pre: BTreeSet<usize>,
    pub neg_pre: BTreeSet<usize>,
    pub add: BTreeSet<usize>,
    pub del: BTreeSet<usize>,
}

impl Action {
    /// A pair with no preconditions and no effects; its name is `agent` followed by `reaction`.
    pub fn new(agent: impl Into<String>, reaction: impl Into<String>) -> Self {
        let agent = agent.into();
        let reaction = reaction.into();
        Self {
            name: format!("{}{}", agent, reaction),
            agent,
            reaction,
            pos_pre: BTreeSet::new(),
            neg_pre: BTreeSet::new(),
            add: BTreeSet::new(),
            del: BTreeSet::new(),
        }
    }

    /// Split an encoded name such as `move_a_b_REACT_1` at the first [`REACTION_MARKER`].
    ///
    /// A name without the marker gets the [`DEFAULT_REACTION`].
    pub fn from_encoded_name(name: &str) -> Self {
        match name.find(REACTION_MARKER) {
            Some(i) => Self::new(&name[..i], &name[i..]),
            None => Self::new(name, DEFAULT_REACTION),
        }
    }

    pub fn pre(mut self, var: usize) -> Self {
        self.pos_pre.insert(var);
        self
    }

    pub fn neg_pre(mut self, var: usize) -> Self {
        self.neg_pre.insert(var);
        self
    }

    pub fn add(mut self, var: usize) -> Self {
        self.add.insert(var);
        self
    }

    pub fn del(mut self, var: usize) -> Self {
        self.del.insert(var);
        self
    }

    fn indices(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        self.pos_pre
            .iter()
            .map(|&i| ("precondition", i))
            .chain(self.neg_pre.iter().map(|&i| ("precondition", i)))
            .chain(self.add.iter().map(|&i| ("add effect", i)))
            .chain(self.del.iter().map(|&i| ("delete effect", i)))
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Action: {} (agent: {}, reaction: {})", self.name, self.agent, self.reaction)?;
        writeln!(f, "  pre+: {:?}", self.pos_pre)?;
        writeln!(f, "  pre-: {:?}", self.neg_pre)?;
        writeln!(f, "  add:  {:?}", self.add)?;
        write!(f, "  del:  {:?}", self.del)
    }
}

/// Mutual-exclusion constraint: at most one positive fluent holds, and if one does,
/// every negative fluent holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invariant {
    pub positive: BTreeSet<usize>,
    pub negative: BTreeSet<usize>,
}

impl Invariant {
    pub fn new(positive: impl IntoIterator<Item = usize>, negative: impl IntoIterator<Item = usize>) -> Self {
        Self {
            positive: positive.into_iter().collect(),
            negative: negative.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Domain {
    variables: Vec<String>,
    initial: Vec<bool>,
    actions: BTreeMap<String, Action>,
    goal_pos: BTreeSet<usize>,
    goal_neg: BTreeSet<usize>,
    invariants: Vec<Invariant>,
}

impl Domain {
    /// Validate and assemble a domain. Actions with the same name collapse to the first one.
    pub fn new(
        variables: Vec<String>,
        initial: Vec<bool>,
        actions: impl IntoIterator<Item = Action>,
        goal_pos: BTreeSet<usize>,
        goal_neg: BTreeSet<usize>,
        invariants: Vec<Invariant>,
    ) -> Result<Self> {
        let count = variables.len();
        if initial.len() != count {
            return Err(Error::InitialStateLength {
                expected: count,
                actual: initial.len(),
            });
        }

        let mut seen = BTreeSet::new();
        for name in variables.iter() {
            if !seen.insert(name.as_str()) {
                return Err(Error::DuplicateVariable(name.clone()));
            }
        }

        let check = |context: &str, index: usize| -> Result<()> {
            if index < count {
                Ok(())
            } else {
                Err(Error::IndexOutOfRange {
                    context: context.to_string(),
                    index,
                    count,
                })
            }
        };

        for &i in goal_pos.iter().chain(goal_neg.iter()) {
            check("goal", i)?;
        }
        for inv in invariants.iter() {
            for &i in inv.positive.iter().chain(inv.negative.iter()) {
                check("invariant", i)?;
            }
        }

        let mut by_name = BTreeMap::new();
        for action in actions {
            for (what, i) in action.indices() {
                check(&format!("{} of action '{}'", what, action.name), i)?;
            }
            by_name.entry(action.name.clone()).or_insert(action);
        }
        if by_name.is_empty() {
            return Err(Error::NoActions);
        }

        Ok(Self {
            variables,
            initial,
            actions: by_name,
            goal_pos,
            goal_neg,
            invariants,
        })
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn variable_index(&self, name: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == name)
    }

    pub fn initial_state(&self) -> &[bool] {
        &self.initial
    }

    /// Actions in name order.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.values()
    }

    pub fn action(&self, name: &str) -> Option<&Action> {
        self.actions.get(name)
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    pub fn goal_pos(&self) -> &BTreeSet<usize> {
        &self.goal_pos
    }

    pub fn goal_neg(&self) -> &BTreeSet<usize> {
        &self.goal_neg
    }

    pub fn invariants(&self) -> &[Invariant] {
        &self.invariants
    }

    /// Whether a fluent assignment satisfies the goal.
    pub fn is_goal(&self, state: &[bool]) -> bool {
        self.goal_pos.iter().all(|&i| state[i]) && self.goal_neg.iter().all(|&i| !state[i])
    }

    /// Names of the fluents that hold in `state`, as `{a, b}`.
    pub fn describe_state(&self, state: &[bool]) -> String {
        let holding: Vec<&str> = self
            .variables
            .iter()
            .zip(state)
            .filter(|(_, &b)| b)
            .map(|(name, _)| name.as_str())
            .collect();
        format!("{{{}}}", holding.join(", "))
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Domain variables:")?;
        for (i, name) in self.variables.iter().enumerate() {
            writeln!(f, "  {}: {}", i, name)?;
        }
        let bits: String = self.initial.iter().map(|&b| if b { '1' } else { '0' }).collect();
        writeln!(f, "Initial state: {}", bits)?;
        let goal: Vec<String> = self
            .goal_pos
            .iter()
            .map(|&i| self.variables[i].clone())
            .chain(self.goal_neg.iter().map(|&i| format!("!{}", self.variables[i])))
            .collect();
        writeln!(f, "Goal: {{{}}}", goal.join(", "))?;
        writeln!(f, "Number of action-reaction pairs: {}", self.actions.len())?;
        for action in self.actions.values() {
            writeln!(f, "{}", action)?;
        }
        writeln!(f, "Number of invariants: {}", self.invariants.len())?;
        for inv in self.invariants.iter() {
            writeln!(f, "  +{:?} -{:?}", inv.positive, inv.negative)?;
        }
        Ok(())
    }
}

/// Name-based convenience for assembling a [`Domain`].
#[derive(Debug, Default)]
pub struct DomainBuilder {
    variables: Vec<String>,
    initial: Vec<bool>,
    actions: Vec<Action>,
    goal_pos: BTreeSet<usize>,
    goal_neg: BTreeSet<usize>,
    invariants: Vec<Invariant>,
}

impl DomainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a fluent with its initial value and return its index.
    pub fn variable(&mut self, name: impl Into<String>, initial: bool) -> usize {
        self.variables.push(name.into());
        self.initial.push(initial);
        self.variables.len() - 1
    }

    pub fn action(&mut self, action: Action) -> &mut Self {
        self.actions.push(action);
        self
    }

    /// Require fluent `var` to be `value` in the goal.
    pub fn goal(&mut self, var: usize, value: bool) -> &mut Self {
        if value {
            self.goal_pos.insert(var);
        } else {
            self.goal_neg.insert(var);
        }
        self
    }

    pub fn invariant(&mut self, invariant: Invariant) -> &mut Self {
        self.invariants.push(invariant);
        self
    }

    pub fn build(self) -> Result<Domain> {
        Domain::new(
            self.variables,
            self.initial,
            self.actions,
            self.goal_pos,
            self.goal_neg,
            self.invariants,
        )
    }
}
