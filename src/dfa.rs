//! Explicit deterministic automata over fluent valuations.
//!
//! A letter is a valuation of the alphabet fluents, numbered by the bitmask that has bit `i` set
//! iff `alphabet[i]` holds. [`ExplicitDfa::to_symbolic`] binary-encodes the states and reads
//! the letters through alphabet variables of the manager, which [`compose`][crate::compose::compose]
//! later replaces by the fluents of a domain.

use std::collections::{BTreeSet, HashSet};
use std::rc::Rc;

use log::debug;

use crate::automaton::SymbolicAutomaton;
use crate::error::{Error, Result};
use crate::reference::Ref;
use crate::utils::{bit_width, to_bits};
use crate::var_mgr::VarMgr;

/// Largest alphabet an explicit transition table may have: every state has `2^k` successors.
pub const MAX_ALPHABET: usize = 20;

fn check_alphabet_size(len: usize) -> Result<()> {
    if len > MAX_ALPHABET {
        return Err(Error::MalformedAutomaton(format!(
            "alphabet has {} letters, at most {} are supported",
            len, MAX_ALPHABET
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitDfa {
    alphabet: Vec<String>,
    initial: usize,
    accepting: BTreeSet<usize>,
    /// `transitions[q][letter]` is the successor of `q`.
    transitions: Vec<Vec<usize>>,
}

impl ExplicitDfa {
    pub fn new(alphabet: Vec<String>, initial: usize, accepting: BTreeSet<usize>, transitions: Vec<Vec<usize>>) -> Result<Self> {
        let num_states = transitions.len();
        if num_states == 0 {
            return Err(Error::MalformedAutomaton("no states".to_string()));
        }
        if initial >= num_states {
            return Err(Error::MalformedAutomaton(format!("initial state {} out of range", initial)));
        }
        if let Some(q) = accepting.iter().find(|&&q| q >= num_states) {
            return Err(Error::MalformedAutomaton(format!("accepting state {} out of range", q)));
        }
        check_alphabet_size(alphabet.len())?;
        let mut seen = HashSet::new();
        if let Some(dup) = alphabet.iter().find(|&a| !seen.insert(a)) {
            return Err(Error::MalformedAutomaton(format!("letter '{}' appears twice in the alphabet", dup)));
        }
        let letters = 1usize << alphabet.len();
        for (q, row) in transitions.iter().enumerate() {
            if row.len() != letters {
                return Err(Error::MalformedAutomaton(format!(
                    "state {} has {} successors, expected {}",
                    q,
                    row.len(),
                    letters
                )));
            }
            if let Some(next) = row.iter().find(|&&next| next >= num_states) {
                return Err(Error::MalformedAutomaton(format!("successor {} of state {} out of range", next, q)));
            }
        }
        Ok(Self {
            alphabet,
            initial,
            accepting,
            transitions,
        })
    }

    /// Accepts once `fluent` has held.
    pub fn eventually(fluent: &str) -> Self {
        Self {
            alphabet: vec![fluent.to_string()],
            initial: 0,
            accepting: BTreeSet::from([1]),
            transitions: vec![vec![0, 1], vec![1, 1]],
        }
    }

    /// Accepts once all `fluents` have held at the same time.
    pub fn eventually_all(fluents: &[&str]) -> Result<Self> {
        check_alphabet_size(fluents.len())?;
        let full = (1usize << fluents.len()) - 1;
        let waiting = (0..=full).map(|l| if l == full { 1 } else { 0 }).collect();
        let done = vec![1; full + 1];
        Self::new(
            fluents.iter().map(|s| s.to_string()).collect(),
            0,
            BTreeSet::from([1]),
            vec![waiting, done],
        )
    }

    pub fn alphabet(&self) -> &[String] {
        &self.alphabet
    }

    pub fn num_states(&self) -> usize {
        self.transitions.len()
    }

    pub fn initial_state(&self) -> usize {
        self.initial
    }

    pub fn is_accepting(&self, q: usize) -> bool {
        self.accepting.contains(&q)
    }

    /// Successor of `q` on `letter`, or `None` if either is out of range.
    pub fn successor(&self, q: usize, letter: usize) -> Option<usize> {
        self.transitions.get(q)?.get(letter).copied()
    }

    /// State reached after reading `word` from the initial state, or `None` on a bad letter.
    pub fn run(&self, word: &[usize]) -> Option<usize> {
        word.iter().try_fold(self.initial, |q, &l| self.successor(q, l))
    }

    /// Binary-encode the automaton over fresh state variables of `mgr`.
    pub fn to_symbolic(&self, mgr: &Rc<VarMgr>) -> Result<SymbolicAutomaton> {
        let bdd = mgr.bdd();
        let bits = bit_width(self.num_states() - 1);
        let id = mgr.create_state_variables(bits);
        let letters: Vec<u32> = self
            .alphabet
            .iter()
            .map(|name| mgr.create_alphabet_variable(name))
            .collect::<Result<_>>()?;

        let state_cube = |q: usize| mgr.state_vector_to_bdd(id, &to_bits(q, bits));
        let letter_cube = |l: usize| {
            bdd.cube(
                letters
                    .iter()
                    .zip(to_bits(l, letters.len()))
                    .map(|(&v, b)| if b { v as i32 } else { -(v as i32) }),
            )
        };

        let mut transition = vec![Ref::ZERO; bits];
        for (q, row) in self.transitions.iter().enumerate() {
            let from = state_cube(q);
            for (l, &next) in row.iter().enumerate() {
                let next_bits = to_bits(next, bits);
                if !next_bits.contains(&true) {
                    continue;
                }
                let edge = bdd.apply_and(from, letter_cube(l));
                for (t, _) in transition.iter_mut().zip(next_bits).filter(|(_, b)| *b) {
                    *t = bdd.apply_or(*t, edge);
                }
            }
        }

        let finals = bdd.apply_or_many(self.accepting.iter().map(|&q| state_cube(q)).collect::<Vec<_>>());
        debug!(
            "Encoded DFA with {} states over {:?} on {} state bits",
            self.num_states(),
            self.alphabet,
            bits
        );
        SymbolicAutomaton::new(Rc::clone(mgr), id, to_bits(self.initial, bits), transition, finals)
    }
}
