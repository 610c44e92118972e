use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, LevelFilter};

use refsm::fa::{DotOptions, StateNames, TransitionTable};
use refsm::{CompileOptions, Compiled, FiniteAutomaton, Regex, Step, StateId};

#[derive(Debug, Parser)]
#[command(name = "refsm", version, about = "Regular expressions to finite automata")]
struct Cli {
    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the expression tree and its position sets
    Parse { regex: String },
    /// Print one automaton
    Show {
        regex: String,
        #[arg(short, long, value_enum, default_value_t = Automaton::Minimal)]
        automaton: Automaton,
        /// Materialize the trap state in the DFAs
        #[arg(long)]
        trap: bool,
        #[arg(short, long, value_enum, default_value_t = ShowFormat::Table)]
        format: ShowFormat,
        /// Name states q0..qn instead of by their construction labels
        #[arg(long)]
        aliases: bool,
    },
    /// Run every automaton on each input
    Check {
        regex: String,
        #[arg(required = true)]
        inputs: Vec<String>,
    },
    /// Print the recognition steps of one automaton
    Trace {
        regex: String,
        input: String,
        #[arg(short, long, value_enum, default_value_t = Automaton::Glushkov)]
        automaton: Automaton,
        #[arg(long)]
        trap: bool,
        #[arg(short, long, value_enum, default_value_t = TraceFormat::Text)]
        format: TraceFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Automaton {
    Glushkov,
    Thompson,
    Dfa,
    Minimal,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ShowFormat {
    Table,
    Dot,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TraceFormat {
    Text,
    Json,
}

fn compile(regex: &str, trap: bool) -> Result<Compiled> {
    let options = CompileOptions {
        dfa_dead_state: trap,
        minimal_dead_state: trap,
    };
    Compiled::compile(regex, &options).with_context(|| format!("invalid regular expression {:?}", regex))
}

fn select(compiled: &Compiled, automaton: Automaton) -> &dyn FiniteAutomaton {
    match automaton {
        Automaton::Glushkov => &compiled.glushkov,
        Automaton::Thompson => &compiled.thompson,
        Automaton::Dfa => &compiled.dfa,
        Automaton::Minimal => &compiled.minimal,
    }
}

fn join<T: ToString>(items: impl IntoIterator<Item = T>) -> String {
    items.into_iter().map(|item| item.to_string()).collect::<Vec<_>>().join(", ")
}

fn parse(text: &str) -> Result<()> {
    let regex: Regex = text
        .parse()
        .with_context(|| format!("invalid regular expression {:?}", text))?;
    let linear = regex.linearized();

    println!("regex      = {}", regex);
    println!("tree       = {:?}", regex);
    println!("linearized = {}", linear);
    println!("nullable   = {}", regex.nullable());
    println!("P          = {{{}}}", join(linear.prefixes()));
    println!("D          = {{{}}}", join(linear.suffixes()));
    println!(
        "F          = {{{}}}",
        join(linear.pairs().iter().map(|(a, b)| format!("{}{}", a, b)))
    );
    Ok(())
}

fn show(fa: &dyn FiniteAutomaton, format: ShowFormat, aliases: bool) -> Result<()> {
    match format {
        ShowFormat::Table if aliases => print!("{}", TransitionTable::with_aliases(fa)),
        ShowFormat::Table => print!("{}", TransitionTable::new(fa)),
        ShowFormat::Dot => {
            let names = if aliases { StateNames::Aliases } else { StateNames::Labels };
            print!("{}", fa.to_dot(&DotOptions { names }));
        }
        ShowFormat::Json => {
            let json = serde_json::to_string_pretty(&fa.summary()).context("failed to serialize automaton")?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn check(compiled: &Compiled, inputs: &[String]) {
    for input in inputs {
        let results = compiled
            .automata()
            .map(|(name, fa)| format!("{}: {}", name, if fa.accepts(input) { "accept" } else { "reject" }));
        println!("{:?}  {}", input, results.join("  "));
    }
}

fn names(fa: &dyn FiniteAutomaton, states: impl IntoIterator<Item = StateId>) -> String {
    format!("{{{}}}", join(states.into_iter().map(|id| &fa.state(id).label)))
}

fn describe(fa: &dyn FiniteAutomaton, step: &Step) -> String {
    match step {
        Step::Initial { states, edges } => {
            format!("initial    {} via {} epsilon edge(s)", names(fa, states.iter().copied()), edges.len())
        }
        Step::State { index: None, states } => format!("state      {}", names(fa, states.iter().copied())),
        Step::State {
            index: Some(index),
            states,
        } => format!("state #{:<3} {}", index, names(fa, states.iter().copied())),
        Step::Transition { index, symbol, edges } if edges.is_empty() => {
            format!("read #{:<4} {:?}: no edge", index, symbol)
        }
        Step::Transition { index, symbol, edges } => format!(
            "read #{:<4} {:?}: {}",
            index,
            symbol,
            join(edges.iter().map(|edge| format!(
                "{} -{}-> {}",
                fa.state(edge.source).label,
                edge.symbol,
                fa.state(edge.target).label
            )))
        ),
        Step::Error { index, symbol } => format!("error #{:<3} {:?} is not in the alphabet", index, symbol),
        Step::Complete { status, states } => format!("complete   {:?} {}", status, names(fa, states.iter().copied())),
    }
}

fn trace(fa: &dyn FiniteAutomaton, input: &str, format: TraceFormat) -> Result<()> {
    let trace = fa.trace(input);
    debug!("trace of {:?}: {} steps", input, trace.len());

    match format {
        TraceFormat::Text => {
            for step in trace.steps() {
                println!("{}", describe(fa, step));
            }
        }
        TraceFormat::Json => {
            let json = serde_json::to_string_pretty(&trace).context("failed to serialize trace")?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();

    match cli.command {
        Command::Parse { regex } => parse(&regex),
        Command::Show {
            regex,
            automaton,
            trap,
            format,
            aliases,
        } => {
            let compiled = compile(&regex, trap)?;
            show(select(&compiled, automaton), format, aliases)
        }
        Command::Check { regex, inputs } => {
            let compiled = compile(&regex, false)?;
            check(&compiled, &inputs);
            Ok(())
        }
        Command::Trace {
            regex,
            input,
            automaton,
            trap,
            format,
        } => {
            let compiled = compile(&regex, trap)?;
            trace(select(&compiled, automaton), &input, format)
        }
    }
}
