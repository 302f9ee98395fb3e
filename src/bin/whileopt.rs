// Command-line driver: reads a normalized while program, optimizes it, and
// prints the result.

use std::error::Error;
use std::io::Read;
use std::path::PathBuf;

use ::optimization::front_end::*;
use ::optimization::interpreter::interpret_with_output;
use ::optimization::middle_end::analysis::{constant_prop, liveness, zero};
use ::optimization::middle_end::cfg::Cfg;
use ::optimization::middle_end::optimization::{optimize, Options};
use clap::{Parser, ValueEnum};
use log::debug;

#[derive(Parser, Debug)]
#[command(name = "whileopt", about = "Optimize normalized while-language programs.")]
struct Args {
    /// Program to read; stdin if absent
    input: Option<PathBuf>,

    /// Read the input as a JSON-serialized AST
    #[arg(long)]
    json_in: bool,

    #[arg(long, value_enum, default_value_t = Emit::Source)]
    emit: Emit,

    /// Print the state table of an analysis of the input instead of
    /// optimizing it
    #[arg(long, value_enum)]
    analysis: Option<AnalysisKind>,

    /// Disable constant folding
    #[arg(long)]
    no_fold: bool,

    /// Disable dead code elimination
    #[arg(long)]
    no_dce: bool,

    #[arg(long)]
    max_rounds: Option<usize>,

    /// Print the control-flow graph of the input as a Mermaid flowchart
    #[arg(long)]
    mermaid: bool,

    /// Run the optimized program with these arguments and print its output
    #[arg(long, num_args = 0.., allow_negative_numbers = true, value_name = "ARG")]
    run: Option<Vec<i64>>,

    /// Log debug information (state tables, rounds) to stderr
    #[arg(short, long)]
    debug: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Emit {
    Source,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AnalysisKind {
    Constant,
    Zero,
    Liveness,
}

fn load(args: &Args) -> Result<Program, Box<dyn Error>> {
    let code = match &args.input {
        Some(path) if !args.json_in => return read_program(path),
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut code = String::new();
            std::io::stdin().read_to_string(&mut code)?;
            code
        }
    };

    if args.json_in {
        Ok(serde_json::from_str(&code)?)
    } else {
        Ok(parse(&code)?)
    }
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_default_env();
    if args.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let program = load(&args)?;
    debug!("loaded {} functions", program.functions.len());

    if args.mermaid {
        print!("{}", Cfg::new(&program)?.to_mermaid());
        return Ok(());
    }

    if let Some(kind) = args.analysis {
        let cfg = Cfg::new(&program)?;
        let table = match kind {
            AnalysisKind::Constant => constant_prop::analyze(&cfg)?.render(&cfg),
            AnalysisKind::Zero => zero::analyze(&cfg)?.render(&cfg),
            AnalysisKind::Liveness => liveness::analyze(&cfg)?.render(&cfg),
        };
        print!("{table}");
        return Ok(());
    }

    let options = Options {
        constant_folding: !args.no_fold,
        dead_code_elimination: !args.no_dce,
        max_rounds: args.max_rounds,
    };
    let (program, report) = optimize(program, &options)?;
    debug!("{report:?}");

    match args.emit {
        Emit::Source => print!("{program}"),
        Emit::Json => println!("{}", serde_json::to_string_pretty(&program)?),
    }

    if let Some(run_args) = &args.run {
        let (ret, output) = interpret_with_output(&program, run_args)?;
        for val in output {
            eprintln!("output: {val}");
        }
        if let Some(ret) = ret {
            eprintln!("returned: {ret}");
        }
    }

    Ok(())
}
