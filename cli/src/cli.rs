//! Command line interface.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use symon::automata::{Automaton, Boolean, DataParametric, Parametric};
use symon::core::Rational;
use symon::monitor::{BooleanMonitor, DataParametricMonitor, ParametricMonitor};

use crate::ast::ModeBuild;
use crate::dot;
use crate::lang;
use crate::printer::{BooleanPrinter, DataParametricPrinter, ParametricPrinter};
use crate::signature::Signature;
use crate::words::TimedWordSource;

/// Online monitoring of timed data words against timed data automata.
#[derive(Parser, Debug)]
#[command(name = "symon", version, about)]
pub struct Args {
    /// Non-parametric boolean mode (the default)
    #[arg(short = 'b', long)]
    pub boolean: bool,

    /// Data-parametric mode
    #[arg(short = 'd', long)]
    pub dataparametric: bool,

    /// Parametric mode
    #[arg(short = 'p', long)]
    pub parametric: bool,

    /// Use the high-level specification syntax
    #[arg(short = 'n', long = "new")]
    pub high_level: bool,

    /// Input file of the timed automaton
    #[arg(short = 'f', long = "automaton")]
    pub automaton: PathBuf,

    /// Input file of the signature (required with the low-level syntax)
    #[arg(short = 's', long)]
    pub signature: Option<PathBuf>,

    /// Input file of the timed word; standard input when omitted
    #[arg(short = 'i', long)]
    pub input: Option<PathBuf>,
}

pub fn parse_args() -> Args {
    Args::parse()
}

pub fn run(args: &Args) -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
    let modes = u8::from(args.boolean) + u8::from(args.dataparametric) + u8::from(args.parametric);
    ensure!(modes <= 1, "only one mode can be specified");
    let source = read_file(&args.automaton)?;
    if args.parametric {
        run_parametric(args, &source)
    } else if args.dataparametric {
        run_data_parametric(args, &source)
    } else {
        run_boolean(args, &source)
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn load<M: ModeBuild>(args: &Args, source: &str) -> Result<(Automaton<M>, Signature)> {
    if args.high_level {
        let parsed = lang::parse_spec::<M>(source)
            .with_context(|| format!("parsing {}", args.automaton.display()))?;
        Ok((parsed.automaton, parsed.signature))
    } else {
        let automaton = dot::parse_automaton::<M>(source)
            .with_context(|| format!("parsing {}", args.automaton.display()))?;
        let path = args
            .signature
            .as_ref()
            .context("a signature file is required with the low-level syntax")?;
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let signature = Signature::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok((automaton, signature))
    }
}

fn open_word_input(args: &Args) -> Result<Box<dyn BufRead>> {
    Ok(match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

fn run_boolean(args: &Args, source: &str) -> Result<()> {
    let (automaton, signature) = load::<Boolean>(args, source)?;
    let mut monitor = BooleanMonitor::new(automaton);
    let printer = Rc::new(RefCell::new(BooleanPrinter::new(io::stdout().lock())));
    monitor.set_match_observer(printer);
    let monitor = Rc::new(RefCell::new(monitor));
    let mut words = TimedWordSource::<_, f64, f64>::new(open_word_input(args)?, signature);
    words.events.set_observer(monitor);
    words.run()
}

fn run_data_parametric(args: &Args, source: &str) -> Result<()> {
    let (automaton, signature) = load::<DataParametric>(args, source)?;
    let mut monitor = DataParametricMonitor::new(automaton);
    let printer = Rc::new(RefCell::new(DataParametricPrinter::new(io::stdout().lock())));
    monitor.set_match_observer(printer);
    let monitor = Rc::new(RefCell::new(monitor));
    let mut words = TimedWordSource::<_, Rational, f64>::new(open_word_input(args)?, signature);
    words.events.set_observer(monitor);
    words.run()
}

fn run_parametric(args: &Args, source: &str) -> Result<()> {
    let (automaton, signature) = load::<Parametric>(args, source)?;
    let mut monitor = ParametricMonitor::new(automaton);
    let printer = Rc::new(RefCell::new(ParametricPrinter::new(io::stdout().lock())));
    monitor.set_match_observer(printer);
    let monitor = Rc::new(RefCell::new(monitor));
    let mut words = TimedWordSource::<_, Rational, Rational>::new(open_word_input(args)?, signature);
    words.events.set_observer(monitor.clone());
    words.run()?;
    // Unobservable transitions may still fire after the last event; report
    // them while the printer is attached.
    monitor.borrow_mut().finish();
    Ok(())
}
