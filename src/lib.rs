//! # fond-bdd: symbolic FOND planning games over BDDs
//!
//! **`fond-bdd`** turns a grounded fully observable non-deterministic (FOND) planning problem into a
//! two-player game over Boolean variables and solves it by backward fixpoint iteration on
//! **Binary Decision Diagrams**.
//!
//! The agent picks an action, encoded in binary on *output* variables; the environment picks one
//! of the action's outcomes (a *reaction*), encoded on *input* variables. The state holds one bit
//! per fluent plus a sticky `env_err` bit that records an environment answering with a reaction
//! the chosen action does not have.
//!
//! ## Key Features
//!
//! - **Manager-Centric BDDs**: all diagram operations go through the [`Bdd`][crate::bdd::Bdd] manager,
//!   shared by everything else through a [`VarMgr`][crate::var_mgr::VarMgr].
//! - **Symbolic Compilation**: [`compile`][crate::compiler::compile] builds the transition function,
//!   mutexes, preconditions, invariants and goal of a [`Domain`][crate::domain::Domain].
//! - **Temporal Goals**: an explicit DFA over fluents is [composed][crate::compose::compose] with the domain.
//! - **Synthesis**: adversarial, cooperative and best-effort reachability, with strategies extracted
//!   as [`Transducer`][crate::transducer::Transducer]s.
//!
//! ## Basic Usage
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use fond_bdd::compiler::compile;
//! use fond_bdd::config::Config;
//! use fond_bdd::domain::{Action, DomainBuilder};
//! use fond_bdd::synthesis::BestEffortSynthesizer;
//! use fond_bdd::var_mgr::VarMgr;
//!
//! // 1. Describe the grounded problem
//! let mut b = DomainBuilder::new();
//! let open = b.variable("open", false);
//! b.action(Action::new("push", "_REACT_0").add(open));
//! b.action(Action::new("push", "_REACT_1"));
//! b.goal(open, true);
//! let domain = b.build().unwrap();
//!
//! // 2. Compile it into a symbolic game
//! let mgr = Rc::new(VarMgr::default());
//! let compiled = compile(&domain, &mgr, &Config::default()).unwrap();
//!
//! // 3. Solve: the door may never open, but a cooperative environment opens it
//! let result = BestEffortSynthesizer::default().run(&compiled).unwrap();
//! assert!(!result.adversarial.realizable);
//! assert!(result.cooperative.unwrap().realizable);
//! ```
//!
//! ## Core Components
//!
//! - **[`bdd`]**: The decision-diagram manager, with [`sat`] and [`dot`] utilities.
//! - **[`var_mgr`]**: Variable roles (state, input, output, alphabet) on top of the manager.
//! - **[`domain`]** and **[`compiler`]**: Grounded problems and their symbolic encoding.
//! - **[`automaton`]**, **[`dfa`]** and **[`compose`]**: Symbolic automata and their products.
//! - **[`synthesis`]** and **[`transducer`]**: Games, fixpoints and strategies.
//! - **[`stepper`]**: Textual step-by-step inspection.

pub mod automaton;
pub mod bdd;
pub mod cache;
pub mod compiler;
pub mod compose;
pub mod config;
pub mod dfa;
pub mod domain;
pub mod dot;
pub mod error;
pub mod node;
pub mod reference;
pub mod sat;
pub mod stepper;
pub mod synthesis;
pub mod table;
pub mod transducer;
pub mod utils;
pub mod var_mgr;

pub use error::{Error, Result};
