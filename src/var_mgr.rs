//! Variable manager.
//!
//! Owns the [`Bdd`] manager and keeps track of what every BDD variable stands for:
//! a state bit of some automaton, an environment-controlled input, an agent-controlled
//! output, or an alphabet letter read by an auxiliary automaton.
//!
//! The manager is shared by every automaton, synthesizer and strategy built on top of it,
//! through an `Rc<VarMgr>`. Variable indices are allocated in creation order, which is also
//! the BDD variable order.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};

use log::debug;

use crate::bdd::Bdd;
use crate::config::BddConfig;
use crate::error::{Error, Result};
use crate::reference::Ref;

/// Identifier of a block of state variables.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct AutomatonId(usize);

impl Display for AutomatonId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a BDD variable stands for.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    State(AutomatonId),
    Input,
    Output,
    Alphabet,
}

impl Role {
    fn describe(&self) -> &'static str {
        match self {
            Role::State(_) => "state",
            Role::Input => "input",
            Role::Output => "output",
            Role::Alphabet => "alphabet",
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    /// Name of variable `v` is at `v - 1`.
    names: Vec<String>,
    roles: Vec<Role>,
    /// Input, output and alphabet variables share one global namespace.
    by_name: HashMap<String, u32>,
    /// State variables of each automaton, in bit order.
    automata: Vec<Vec<u32>>,
    /// Per-automaton state variable names.
    state_names: Vec<HashMap<String, usize>>,
}

impl Registry {
    fn alloc(&mut self, name: String, role: Role) -> u32 {
        self.names.push(name);
        self.roles.push(role);
        self.names.len() as u32
    }

    fn register_automaton(&mut self, vars: Vec<u32>, names: HashMap<String, usize>) -> AutomatonId {
        self.automata.push(vars);
        self.state_names.push(names);
        AutomatonId(self.automata.len() - 1)
    }

    fn named(&mut self, name: &str, role: Role) -> Result<u32> {
        if let Some(&v) = self.by_name.get(name) {
            let existing = self.roles[v as usize - 1];
            if existing != role {
                return Err(Error::RoleConflict {
                    name: name.to_string(),
                    existing: existing.describe(),
                    requested: role.describe(),
                });
            }
            return Ok(v);
        }
        let v = self.alloc(name.to_string(), role);
        self.by_name.insert(name.to_string(), v);
        Ok(v)
    }

    fn names_of(&self, vars: &[u32]) -> Vec<&str> {
        vars.iter().map(|&v| self.names[v as usize - 1].as_str()).collect()
    }

    fn with_role(&self, pred: impl Fn(Role) -> bool) -> Vec<u32> {
        (1..=self.roles.len() as u32)
            .filter(|&v| pred(self.roles[v as usize - 1]))
            .collect()
    }
}

pub struct VarMgr {
    bdd: Bdd,
    registry: RefCell<Registry>,
}

impl VarMgr {
    pub fn new(config: &BddConfig) -> Self {
        Self {
            bdd: Bdd::with_config(config),
            registry: RefCell::new(Registry::default()),
        }
    }

    pub fn bdd(&self) -> &Bdd {
        &self.bdd
    }

    /// Allocate `count` anonymous state variables for a new automaton.
    pub fn create_state_variables(&self, count: usize) -> AutomatonId {
        let mut reg = self.registry.borrow_mut();
        let id = AutomatonId(reg.automata.len());
        let vars = (0..count)
            .map(|i| reg.alloc(format!("q{}{}", i, id), Role::State(id)))
            .collect();
        let id = reg.register_automaton(vars, HashMap::new());
        debug!("Created automaton {} with {} state variables", id, count);
        id
    }

    /// Allocate one state variable per name for a new automaton, in the given order.
    pub fn create_named_state_variables<S: AsRef<str>>(&self, names: &[S]) -> Result<AutomatonId> {
        let mut index = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            let name = name.as_ref();
            if index.insert(name.to_string(), i).is_some() {
                return Err(Error::DuplicateVariable(name.to_string()));
            }
        }

        let mut reg = self.registry.borrow_mut();
        let id = AutomatonId(reg.automata.len());
        let vars = names
            .iter()
            .map(|name| reg.alloc(name.as_ref().to_string(), Role::State(id)))
            .collect();
        let id = reg.register_automaton(vars, index);
        debug!("Created automaton {} with state variables {:?}", id, names.iter().map(|s| s.as_ref()).collect::<Vec<_>>());
        Ok(id)
    }

    /// Register an automaton whose state vector is the concatenation of the given ones.
    ///
    /// No new BDD variables are created.
    pub fn create_product_state_space(&self, ids: &[AutomatonId]) -> AutomatonId {
        let mut reg = self.registry.borrow_mut();
        let mut vars = Vec::new();
        let mut names = HashMap::new();
        for id in ids {
            let offset = vars.len();
            vars.extend(reg.automata[id.0].iter().copied());
            for (name, &i) in reg.state_names[id.0].iter() {
                names.entry(name.clone()).or_insert(offset + i);
            }
        }
        let id = reg.register_automaton(vars, names);
        debug!("Created product state space {} of {:?}", id, ids);
        id
    }

    pub fn state_variables(&self, id: AutomatonId) -> Vec<u32> {
        self.registry.borrow().automata[id.0].clone()
    }

    pub fn state_variable_count(&self, id: AutomatonId) -> usize {
        self.registry.borrow().automata[id.0].len()
    }

    /// The `i`-th state bit of automaton `id`, as a BDD.
    pub fn state_variable(&self, id: AutomatonId, i: usize) -> Ref {
        let v = self.registry.borrow().automata[id.0][i];
        self.bdd.mk_var(v)
    }

    /// Position of the state variable called `name` in automaton `id`.
    pub fn state_variable_index(&self, id: AutomatonId, name: &str) -> Option<usize> {
        self.registry.borrow().state_names[id.0].get(name).copied()
    }

    pub fn create_input_variables<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<u32>> {
        let mut reg = self.registry.borrow_mut();
        names.iter().map(|name| reg.named(name.as_ref(), Role::Input)).collect()
    }

    pub fn create_output_variables<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<u32>> {
        let mut reg = self.registry.borrow_mut();
        names.iter().map(|name| reg.named(name.as_ref(), Role::Output)).collect()
    }

    /// Create (or look up) the alphabet variable read by auxiliary automata for fluent `name`.
    pub fn create_alphabet_variable(&self, name: &str) -> Result<u32> {
        self.registry.borrow_mut().named(name, Role::Alphabet)
    }

    /// Look up an input, output or alphabet variable by name.
    pub fn name_to_variable(&self, name: &str) -> Option<Ref> {
        let v = self.registry.borrow().by_name.get(name).copied()?;
        Some(self.bdd.mk_var(v))
    }

    pub fn variable_name(&self, v: u32) -> Option<String> {
        self.registry.borrow().names.get(v.checked_sub(1)? as usize).cloned()
    }

    pub fn role(&self, v: u32) -> Option<Role> {
        self.registry.borrow().roles.get(v.checked_sub(1)? as usize).copied()
    }

    pub fn input_variables(&self) -> Vec<u32> {
        self.registry.borrow().with_role(|r| r == Role::Input)
    }

    pub fn output_variables(&self) -> Vec<u32> {
        self.registry.borrow().with_role(|r| r == Role::Output)
    }

    pub fn alphabet_variables(&self) -> Vec<u32> {
        self.registry.borrow().with_role(|r| r == Role::Alphabet)
    }

    pub fn input_variable_count(&self) -> usize {
        self.input_variables().len()
    }

    pub fn output_variable_count(&self) -> usize {
        self.output_variables().len()
    }

    /// Cube fixing the state bits of automaton `id` to `bits`.
    pub fn state_vector_to_bdd(&self, id: AutomatonId, bits: &[bool]) -> Ref {
        let vars = self.state_variables(id);
        assert_eq!(vars.len(), bits.len(), "State vector length mismatch");
        self.bdd.cube(
            vars.iter()
                .zip(bits)
                .map(|(&v, &b)| if b { v as i32 } else { -(v as i32) }),
        )
    }

    /// Evaluate `f` with the given variable values; unmentioned variables are false.
    pub fn eval(&self, f: Ref, values: &HashMap<u32, bool>) -> bool {
        self.bdd.eval(f, |v| values.get(&v).copied().unwrap_or(false))
    }

    /// Variables of `f` that are neither state variables nor inputs/outputs.
    pub fn alphabet_support(&self, f: Ref) -> BTreeSet<u32> {
        self.bdd
            .support(f)
            .into_iter()
            .filter(|&v| self.role(v) == Some(Role::Alphabet))
            .collect()
    }

    /// Graphviz dump of the given diagrams, with nodes labelled by variable name.
    pub fn to_dot(&self, roots: &[Ref]) -> std::result::Result<String, std::fmt::Error> {
        self.bdd
            .to_dot_with_labels(roots, |v| self.variable_name(v).unwrap_or_else(|| format!("x{}", v)))
    }
}

impl Default for VarMgr {
    fn default() -> Self {
        VarMgr::new(&BddConfig::default())
    }
}

impl Display for VarMgr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let reg = self.registry.borrow();
        writeln!(f, "Input variables: {:?}", reg.names_of(&reg.with_role(|r| r == Role::Input)))?;
        writeln!(f, "Output variables: {:?}", reg.names_of(&reg.with_role(|r| r == Role::Output)))?;
        writeln!(f, "Alphabet variables: {:?}", reg.names_of(&reg.with_role(|r| r == Role::Alphabet)))?;
        for (i, vars) in reg.automata.iter().enumerate() {
            writeln!(f, "State variables of automaton {}: {:?}", AutomatonId(i), reg.names_of(vars))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_roles_are_disjoint() {
        let mgr = VarMgr::default();

        let outputs = mgr.create_output_variables(&["a_0", "a_1"]).unwrap();
        let inputs = mgr.create_input_variables(&["r_0"]).unwrap();
        assert_eq!(outputs, vec![1, 2]);
        assert_eq!(inputs, vec![3]);
        assert_eq!(mgr.role(1), Some(Role::Output));
        assert_eq!(mgr.role(3), Some(Role::Input));
        assert_eq!(mgr.output_variable_count(), 2);
        assert_eq!(mgr.input_variable_count(), 1);

        // Re-creating with the same role is a lookup.
        assert_eq!(mgr.create_output_variables(&["a_1"]).unwrap(), vec![2]);

        let err = mgr.create_input_variables(&["a_0"]).unwrap_err();
        assert!(matches!(err, Error::RoleConflict { existing: "output", requested: "input", .. }));
    }

    #[test]
    fn test_named_state_variables() {
        let mgr = VarMgr::default();

        let id = mgr.create_named_state_variables(&["p", "q", "env_err"]).unwrap();
        assert_eq!(mgr.state_variable_count(id), 3);
        assert_eq!(mgr.state_variable_index(id, "q"), Some(1));
        assert_eq!(mgr.state_variable_index(id, "r"), None);
        assert_eq!(mgr.variable_name(3).as_deref(), Some("env_err"));
        assert_eq!(mgr.role(1), Some(Role::State(id)));
        // State variables are not in the global namespace.
        assert!(mgr.name_to_variable("p").is_none());

        let err = mgr.create_named_state_variables(&["x", "x"]).unwrap_err();
        assert!(matches!(err, Error::DuplicateVariable(name) if name == "x"));
    }

    #[test]
    fn test_product_state_space() {
        let mgr = VarMgr::default();

        let a = mgr.create_named_state_variables(&["p", "q"]).unwrap();
        let b = mgr.create_state_variables(2);
        let ab = mgr.create_product_state_space(&[a, b]);
        assert_eq!(mgr.state_variables(ab), vec![1, 2, 3, 4]);
        assert_eq!(mgr.state_variable_index(ab, "q"), Some(1));
        // The product reuses the variables of its components.
        assert_eq!(mgr.bdd().node_count(), 1);
    }

    #[test]
    fn test_state_vector_to_bdd() {
        let mgr = VarMgr::default();

        let id = mgr.create_state_variables(2);
        let s = mgr.state_vector_to_bdd(id, &[true, false]);
        let values = HashMap::from([(1, true), (2, false)]);
        assert!(mgr.eval(s, &values));
        assert!(!mgr.eval(s, &HashMap::from([(1, true), (2, true)])));
        assert!(!mgr.eval(s, &HashMap::new()));
    }

    #[test]
    fn test_alphabet_variables() {
        let mgr = VarMgr::default();

        let p = mgr.create_alphabet_variable("p").unwrap();
        assert_eq!(mgr.create_alphabet_variable("p").unwrap(), p);
        assert_eq!(mgr.name_to_variable("p"), Some(mgr.bdd().mk_var(p)));
        assert_eq!(mgr.alphabet_variables(), vec![p]);
        let f = mgr.bdd().apply_and(mgr.bdd().mk_var(p), mgr.bdd().mk_var(p));
        assert_eq!(mgr.alphabet_support(f), BTreeSet::from([p]));
        assert!(mgr.create_output_variables(&["p"]).is_err());
    }

    #[test]
    fn test_display_and_dot() {
        let mgr = VarMgr::default();

        mgr.create_output_variables(&["a_0"]).unwrap();
        let id = mgr.create_named_state_variables(&["door_open"]).unwrap();
        let text = mgr.to_string();
        assert!(text.contains("Output variables: [\"a_0\"]"));
        assert!(text.contains("door_open"));

        let dot = mgr.to_dot(&[mgr.state_variable(id, 0)]).unwrap();
        assert!(dot.contains("label=\"door_open\""));
    }
}
