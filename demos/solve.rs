use std::rc::Rc;

use clap::Parser;
use log::info;

use fond_bdd::automaton::SymbolicAutomaton;
use fond_bdd::compiler::{compile, CompiledDomain};
use fond_bdd::config::{AgentErrorMode, Algorithm, Config};
use fond_bdd::dfa::ExplicitDfa;
use fond_bdd::domain::{Action, Domain, DomainBuilder};
use fond_bdd::stepper::Stepper;
use fond_bdd::synthesis::{synthesize, BestEffortResult, BestEffortSynthesizer, SynthesisOutcome, SynthesisResult};
use fond_bdd::transducer::Transducer;
use fond_bdd::var_mgr::VarMgr;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Synthesis procedure: adversarial, cooperative or best-effort.
    #[arg(long, value_name = "ALGO", default_value = "best-effort")]
    algorithm: Algorithm,

    /// Agent precondition tracking: invariant or error-bit.
    #[arg(long, value_name = "MODE", default_value = "invariant")]
    agent_error: AgentErrorMode,

    /// Fixpoint iteration cap.
    #[arg(long, value_name = "INT")]
    max_iterations: Option<usize>,

    /// Replace the domain goal by "eventually all of these fluents at once".
    #[arg(long, value_name = "FLUENT")]
    eventually: Vec<String>,

    /// Number of strategy steps to simulate.
    #[arg(long, value_name = "INT", default_value = "0")]
    steps: usize,

    /// Reaction ids chosen by the environment during simulation (default: 0).
    #[arg(long, value_name = "INT")]
    reaction: Vec<usize>,

    /// Print the winning region as a DOT graph.
    #[arg(long)]
    dot: bool,
}

/// A small tireworld: driving may puncture the tire, and the only spare lies at `l1`.
fn tireworld() -> fond_bdd::Result<Domain> {
    let mut b = DomainBuilder::new();
    let at = [b.variable("at_l0", true), b.variable("at_l1", false), b.variable("at_l2", false)];
    let spare = b.variable("spare_l1", true);
    let flat = b.variable("flat", false);

    for (from, to) in [(0, 1), (1, 2), (0, 2)] {
        let name = format!("move_l{}_l{}", from, to);
        let drive = |reaction: &str| Action::new(&name, reaction).pre(at[from]).neg_pre(flat).del(at[from]).add(at[to]);
        b.action(drive("_REACT_0"));
        b.action(drive("_REACT_1").add(flat));
    }
    b.action(Action::new("change_tire", "_REACT_0").pre(at[1]).pre(spare).pre(flat).del(spare).del(flat));
    b.goal(at[2], true);
    b.build()
}

fn print_result(label: &str, compiled: &CompiledDomain, arena: &SymbolicAutomaton, result: &SynthesisResult) {
    let bdd = compiled.mgr().bdd();
    let bits = arena.initial_state().len();
    println!(
        "{}: {} after {} iterations, {} winning states (of {})",
        label,
        if result.realizable { "realizable" } else { "unrealizable" },
        result.iterations,
        bdd.sat_count(result.winning_states, bits),
        1u64 << bits
    );
}

fn print_best_effort(compiled: &CompiledDomain, result: &BestEffortResult) {
    print_result("Adversarial", compiled, &result.arena, &result.adversarial);
    if let Some(coop) = &result.cooperative {
        print_result("Cooperative", compiled, &result.arena, coop);
    }
    println!("Initial state region: {:?}", result.region(result.arena.initial_state()));
}

fn simulate(
    compiled: &CompiledDomain,
    arena: &SymbolicAutomaton,
    strategy: &Transducer,
    args: &Cli,
) -> color_eyre::Result<()> {
    let stepper = Stepper::with_arena(compiled, arena);
    let mut state = stepper.initial_state().to_vec();
    for i in 0..args.steps {
        let reaction = args.reaction.get(i).copied().unwrap_or(0);
        let report = stepper.strategy_step(&state, strategy, reaction)?;
        println!("--- step {} ---\n{}", i + 1, report);
        state = report.next;
    }
    Ok(())
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let config = Config {
        algorithm: args.algorithm,
        agent_error: args.agent_error,
        max_iterations: args.max_iterations,
        ..Config::default()
    };

    let domain = tireworld()?;
    let mgr = Rc::new(VarMgr::new(&config.bdd));
    let compiled = compile(&domain, &mgr, &config)?;
    info!(
        "Compiled {} actions over {} fluents: {} output bits, {} input bits",
        domain.action_count(),
        domain.variables().len(),
        compiled.output_variables().len(),
        compiled.input_variables().len()
    );

    // Arena and strategy to simulate, if any.
    let (arena, strategy, winning) = if args.eventually.is_empty() {
        match synthesize(&compiled, &config)? {
            SynthesisOutcome::Adversarial(r) | SynthesisOutcome::Cooperative(r) => {
                print_result(&config.algorithm.to_string(), &compiled, compiled.automaton(), &r);
                (compiled.automaton().clone(), r.transducer.clone(), r.winning_states)
            }
            SynthesisOutcome::BestEffort(r) => {
                print_best_effort(&compiled, &r);
                let strategy = r.strategy(r.arena.initial_state()).cloned();
                (r.arena.clone(), strategy, r.adversarial.winning_states)
            }
        }
    } else {
        let fluents: Vec<&str> = args.eventually.iter().map(String::as_str).collect();
        let goal = ExplicitDfa::eventually_all(&fluents)?;
        let r = BestEffortSynthesizer::new(&config).run_with_goal(&compiled, &goal)?;
        print_best_effort(&compiled, &r);
        let strategy = r.strategy(r.arena.initial_state()).cloned();
        (r.arena.clone(), strategy, r.adversarial.winning_states)
    };

    match &strategy {
        Some(t) => simulate(&compiled, &arena, t, &args)?,
        None if args.steps > 0 => println!("No strategy from the initial state, nothing to simulate"),
        None => {}
    }

    if args.dot {
        println!("{}", mgr.to_dot(&[winning])?);
    }

    let (hits, misses) = mgr.bdd().cache_stats();
    info!("BDD: {} nodes, cache hits = {}, misses = {}", mgr.bdd().node_count(), hits, misses);

    let time_total = time_total.elapsed();
    println!("\nAll done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
