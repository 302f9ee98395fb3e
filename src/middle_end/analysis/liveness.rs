//! Interprocedural liveness analysis.
//!
//! This is a backward analysis: the joined state of an instruction is the set
//! of variables live after it, and the transferred state the set live before
//! it.

use std::collections::BTreeSet as Set;

use super::*;

// SECTION: analysis interface

// The abstract environment: the set of live variables.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Env {
    pub live: Set<VarId>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Liveness;

pub fn analyze(cfg: &Cfg) -> Result<StateTable<Env>, Error> {
    let table = solve(&Liveness, cfg)?;
    debug!("liveness:\n{}", table.render(cfg));
    Ok(table)
}

impl StateTable<Env> {
    /// Whether `var` may be read after `inst` executes.
    pub fn is_live_out(&self, inst: InstId, var: &VarId) -> bool {
        self.joined(inst).contains(var)
    }

    /// Whether `var` may be read at or after `inst`.
    pub fn is_live_in(&self, inst: InstId, var: &VarId) -> bool {
        self.transferred(inst).contains(var)
    }
}

// SECTION: analysis implementation

impl Env {
    pub fn contains(&self, var: &VarId) -> bool {
        self.live.contains(var)
    }
}

// sets of variables also form a lattice, so the same state type is both the
// value and the environment.
impl AbstractValue for Env {
    const BOTTOM: Self = Env { live: Set::new() };

    fn join(&self, rhs: &Self) -> Self {
        Env {
            live: self.live.union(&rhs.live).cloned().collect(),
        }
    }
}

impl AbstractEnv for Env {
    fn join_with(&mut self, rhs: &Self) -> Result<bool, Error> {
        let before = self.live.len();
        self.live.extend(rhs.live.iter().cloned());
        Ok(self.live.len() != before)
    }
}

impl Analysis for Liveness {
    type Env = Env;

    const DIRECTION: Direction = Direction::Backward;

    fn bottom(&self, _cfg: &Cfg) -> Env {
        Env::default()
    }

    fn boundary(&self, _cfg: &Cfg) -> Env {
        Env::default()
    }

    fn flow(&self, inst: InstId, table: &StateTable<Env>, cfg: &Cfg) -> Env {
        let instruction = cfg.instruction(inst);
        let mut env = table.joined(inst).clone();

        for var in instruction.defs() {
            env.live.remove(var);
        }
        for var in instruction.uses() {
            env.live.insert(var.clone());
        }

        env
    }
}

impl Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let vars = self.live.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        write!(f, "{{{}}}", vars.join(", "))
    }
}

impl TableRow for Env {
    fn cell(&self, var: &VarId) -> String {
        if self.contains(var) {
            "live".to_string()
        } else {
            "-".to_string()
        }
    }
}
