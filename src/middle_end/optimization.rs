//! Rewrite passes over the AST and the driver that runs them to a fixpoint.
//!
//! Each pass builds a fresh [Cfg] from its input, runs the analysis it needs,
//! and returns a new program together with whether it rewrote anything.

use log::{debug, info};

use super::cfg::Cfg;
use crate::errors::Error;
use crate::front_end::Program;

pub mod constant_prop;
pub mod dead_code;

pub use constant_prop::constant_prop;
pub use dead_code::dead_code_elimination;


/// Which passes the driver runs, and for how long.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Options {
    pub constant_folding: bool,
    pub dead_code_elimination: bool,
    /// Stop after this many rounds even if the last one changed something.
    pub max_rounds: Option<usize>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            constant_folding: true,
            dead_code_elimination: true,
            max_rounds: None,
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OptimizationReport {
    pub rounds: usize,
    pub instructions_before: usize,
    pub instructions_after: usize,
    pub changed: bool,
}

/// Alternate constant folding and dead code elimination until a round
/// changes nothing.
pub fn optimize(mut program: Program, options: &Options) -> Result<(Program, OptimizationReport), Error> {
    let mut report = OptimizationReport::default();

    if program.functions.is_empty() {
        return Ok((program, report));
    }
    report.instructions_before = Cfg::new(&program)?.len();

    loop {
        if options.max_rounds.map_or(false, |max| report.rounds >= max) {
            debug!("stopping after {} rounds", report.rounds);
            break;
        }
        report.rounds += 1;

        let mut changed = false;
        if options.constant_folding {
            let (folded, c) = constant_prop(&program)?;
            program = folded;
            changed |= c;
        }
        if options.dead_code_elimination {
            let (pruned, c) = dead_code_elimination(&program)?;
            program = pruned;
            changed |= c;
        }
        debug!("round {}: changed = {changed}", report.rounds);

        if !changed {
            break;
        }
        report.changed = true;
    }

    report.instructions_after = Cfg::new(&program)?.len();
    info!(
        "optimized in {} rounds: {} -> {} instructions",
        report.rounds, report.instructions_before, report.instructions_after
    );

    Ok((program, report))
}
