//! Static analysis over the instruction-level control-flow graph.
//!
//! Every analysis is an [Analysis]: a lattice of abstract states plus a flow
//! function per instruction.  [solve] runs any of them to a fixpoint with a
//! single worklist algorithm; only the direction of the edges differs between
//! forward and backward analyses.

use std::collections::{BTreeMap as Map, VecDeque};
use std::fmt::{self, Display};
use std::marker::PhantomData;

use log::{debug, trace};

use super::cfg::*;
use crate::errors::Error;
use crate::front_end::ArithOp;

pub mod constant_prop;
pub mod liveness;
pub mod zero;


/// An abstract value from an abstract lattice.
///
/// Any abstract domain for a variable implements this.
pub trait AbstractValue: Clone + Display + Eq + PartialEq {
    /// The bottom value of the join semi-lattice.
    const BOTTOM: Self;

    /// The join of two abstract values.
    fn join(&self, rhs: &Self) -> Self;
}

/// The abstract environment (the abstract state) of a dataflow analysis: one
/// element of the analysis lattice.
pub trait AbstractEnv: Clone + Display + Eq {
    // compute self = self ⊔ rhs.
    //
    // return whether self has changed as the result of this operation, or an
    // error if the two states do not describe the same variables.
    fn join_with(&mut self, rhs: &Self) -> Result<bool, Error>;
}

/// An abstract environment built as a pointwise extension of the abstract
/// domain `A`.  It is a map from variables to abstract values.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PointwiseEnv<A: AbstractValue> {
    pub values: Map<VarId, A>,
}

impl<A: AbstractValue> PointwiseEnv<A> {
    pub fn new(values: Map<VarId, A>) -> Self {
        Self { values }
    }

    /// Every variable of the graph mapped to `val`.
    pub fn uniform(cfg: &Cfg, val: A) -> Self {
        Self::new(cfg.vars().iter().map(|x| (x.clone(), val.clone())).collect())
    }

    // get the value of a variable, or bottom if it isn't present.
    pub fn get(&self, key: &VarId) -> A {
        self.values.get(key).unwrap_or(&A::BOTTOM).clone()
    }

    // insert a value for a variable.
    pub fn insert(&mut self, key: &VarId, val: A) {
        self.values.insert(key.clone(), val);
    }
}

impl<A: AbstractValue> AbstractEnv for PointwiseEnv<A> {
    fn join_with(&mut self, rhs: &Self) -> Result<bool, Error> {
        if self.values.len() != rhs.values.len() {
            return Err(Error::StateShapeMismatch);
        }

        let mut changed = false;
        for ((var, curr), (rhs_var, rhs_val)) in self.values.iter_mut().zip(&rhs.values) {
            if var != rhs_var {
                return Err(Error::StateShapeMismatch);
            }
            let joined = curr.join(rhs_val);
            if joined != *curr {
                *curr = joined;
                changed = true;
            }
        }

        Ok(changed)
    }
}

impl<A: AbstractValue> Display for PointwiseEnv<A> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let str = self
            .values
            .iter()
            .fold("".to_string(), |acc, (var, val)| {
                if *val == A::BOTTOM {
                    acc
                } else {
                    format!("{acc}{var} -> {val}\n")
                }
            });
        write!(f, "{str}")
    }
}

// SECTION: the dataflow framework

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    Forward,
    Backward,
}

/// A monotone dataflow analysis over a [Cfg].
pub trait Analysis {
    type Env: AbstractEnv;

    const DIRECTION: Direction;

    /// The least element of the lattice for this graph.
    fn bottom(&self, cfg: &Cfg) -> Self::Env;

    /// The state assumed where the analysis starts: before the program entry
    /// for forward analyses, after every exit for backward ones.
    fn boundary(&self, cfg: &Cfg) -> Self::Env;

    /// The flow function of `inst`.  Its input is `table.joined(inst)`; flow
    /// functions may also read the joined states of the instruction's
    /// neighbors, which is how calls pass values between functions.
    fn flow(&self, inst: InstId, table: &StateTable<Self::Env>, cfg: &Cfg) -> Self::Env;
}

/// The result of an analysis: two states per instruction.
///
/// For a forward analysis `joined` holds the state before each instruction
/// and `transferred` the state after it; a backward analysis swaps the two.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StateTable<S> {
    joined: Vec<S>,
    transferred: Vec<S>,
}

impl<S> StateTable<S> {
    /// The join of the states flowing into the instruction.
    pub fn joined(&self, inst: InstId) -> &S {
        &self.joined[inst]
    }

    /// The state produced by the instruction's flow function.
    pub fn transferred(&self, inst: InstId) -> &S {
        &self.transferred[inst]
    }

    pub fn len(&self) -> usize {
        self.joined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joined.is_empty()
    }
}

impl<A: AbstractValue> StateTable<PointwiseEnv<A>> {
    /// The value of `var` right after `inst`.
    pub fn get_lattice_value(&self, inst: InstId, var: &VarId) -> A {
        self.transferred[inst].get(var)
    }

    /// The value of `var` right before `inst`.
    pub fn value_before(&self, inst: InstId, var: &VarId) -> A {
        self.joined[inst].get(var)
    }
}

/// A state that can be printed as one row of a table with a column per
/// variable.
pub trait TableRow {
    fn cell(&self, var: &VarId) -> String;
}

impl<A: AbstractValue> TableRow for PointwiseEnv<A> {
    fn cell(&self, var: &VarId) -> String {
        self.get(var).to_string()
    }
}

impl<S: TableRow> StateTable<S> {
    /// Print the transferred states, one row per instruction.
    pub fn render(&self, cfg: &Cfg) -> String {
        let vars: Vec<&VarId> = cfg.vars().iter().collect();
        let mut rows: Vec<Vec<String>> = vec![];

        let mut header = vec!["#".to_string(), "instruction".to_string()];
        header.extend(vars.iter().map(|x| x.to_string()));
        rows.push(header);

        for (inst, instruction) in cfg.instructions() {
            let mut row = vec![inst.to_string(), instruction.to_string()];
            row.extend(vars.iter().map(|x| self.transferred[inst].cell(x)));
            rows.push(row);
        }

        let widths: Vec<usize> = (0..rows[0].len())
            .map(|col| rows.iter().map(|row| row[col].chars().count()).max().unwrap_or(0))
            .collect();

        rows.iter()
            .map(|row| {
                let cells: Vec<String> = row
                    .iter()
                    .zip(&widths)
                    .map(|(cell, &width)| format!("{cell:width$}"))
                    .collect();
                format!("{}\n", cells.join(" | ").trim_end())
            })
            .collect()
    }
}

/// Run the analysis to its fixpoint over the graph.
///
/// Forward analyses start from the program entry, so instructions that the
/// entry cannot reach keep the bottom state; backward analyses start from
/// every instruction.
pub fn solve<A: Analysis>(analysis: &A, cfg: &Cfg) -> Result<StateTable<A::Env>, Error> {
    if cfg.is_empty() {
        return Err(Error::EmptyProgram);
    }

    let n = cfg.len();
    let bottom = analysis.bottom(cfg);
    let mut table = StateTable {
        joined: vec![bottom.clone(); n],
        transferred: vec![bottom; n],
    };

    let seeds: Vec<InstId> = match A::DIRECTION {
        Direction::Forward => {
            table.joined[cfg.entry] = analysis.boundary(cfg);
            vec![cfg.entry]
        }
        Direction::Backward => {
            for exit in cfg.exits() {
                table.joined[exit] = analysis.boundary(cfg);
            }
            (0..n).rev().collect()
        }
    };

    let mut worklist: VecDeque<InstId> = VecDeque::new();
    let mut queued = vec![false; n];
    let mut visited = vec![false; n];
    for inst in seeds {
        queued[inst] = true;
        worklist.push_back(inst);
    }

    let mut steps = 0usize;
    while let Some(inst) = worklist.pop_front() {
        queued[inst] = false;
        visited[inst] = true;
        steps += 1;

        let out = analysis.flow(inst, &table, cfg);
        trace!("{inst}: {} => {out}", cfg.instruction(inst));

        // flow functions at function entries and call results read their
        // predecessors' states directly, so a changed result has to be
        // propagated even when the neighbor's join absorbs it.
        let out_changed = out != table.transferred[inst];

        let targets: Vec<InstId> = match A::DIRECTION {
            Direction::Forward => cfg.succ(inst).collect(),
            Direction::Backward => cfg.pred(inst).collect(),
        };
        for next in targets {
            let changed = table.joined[next].join_with(&out)?;
            if (changed || out_changed || !visited[next]) && !queued[next] {
                queued[next] = true;
                worklist.push_back(next);
            }
        }

        table.transferred[inst] = out;
    }

    debug!("{:?} analysis stabilized after {steps} steps", A::DIRECTION);

    Ok(table)
}

// SECTION: interprocedural value analyses

/// An abstract domain for integer variables that can interpret the
/// arithmetic operators.
pub trait ValueDomain: AbstractValue {
    const TOP: Self;

    /// The abstraction of a concrete value.
    fn alpha(val: i64) -> Self;

    /// The abstract counterpart of `op`.
    fn arith(op: ArithOp, lhs: &Self, rhs: &Self) -> Self;
}

/// A forward, context-insensitive interprocedural analysis with the
/// pointwise extension of the domain `D` as its lattice.
///
/// Parameters of `main` are unknown.  The parameters of every other function
/// get the join of the corresponding arguments over all call sites, and the
/// result of a call is the join of the values at the callee's returns.
/// Variables of other functions are reset to bottom when entering a function;
/// the caller's own variables reach the call result over the edge from the
/// call.
#[derive(Clone, Copy, Debug)]
pub struct ValueAnalysis<D> {
    domain: PhantomData<D>,
}

impl<D: ValueDomain> ValueAnalysis<D> {
    pub fn new() -> Self {
        ValueAnalysis {
            domain: PhantomData,
        }
    }
}

impl<D: ValueDomain> Default for ValueAnalysis<D> {
    fn default() -> Self {
        Self::new()
    }
}

// the abstract value of an operand in the given state.
pub fn eval<D: ValueDomain>(op: &Operand, env: &PointwiseEnv<D>) -> D {
    match op {
        Operand::CInt(n) => D::alpha(*n),
        Operand::Var(x) => env.get(x),
    }
}

impl<D: ValueDomain> Analysis for ValueAnalysis<D> {
    type Env = PointwiseEnv<D>;

    const DIRECTION: Direction = Direction::Forward;

    fn bottom(&self, cfg: &Cfg) -> Self::Env {
        PointwiseEnv::uniform(cfg, D::BOTTOM)
    }

    fn boundary(&self, cfg: &Cfg) -> Self::Env {
        PointwiseEnv::uniform(cfg, D::TOP)
    }

    fn flow(&self, inst: InstId, table: &StateTable<Self::Env>, cfg: &Cfg) -> Self::Env {
        use Instruction::*;

        let mut env = table.joined(inst).clone();

        match cfg.instruction(inst) {
            Entry { func, params } => {
                if let Some(scope) = cfg.function_vars(func) {
                    for (var, val) in env.values.iter_mut() {
                        if !scope.contains(var) {
                            *val = D::BOTTOM;
                        }
                    }
                }

                for (k, param) in params.iter().enumerate() {
                    let val = if inst == cfg.entry {
                        D::TOP
                    } else {
                        cfg.call_sites(inst)
                            .fold(D::BOTTOM, |acc, call| match cfg.instruction(call) {
                                Call { args, .. } => match args.get(k) {
                                    Some(arg) => acc.join(&eval(arg, table.joined(call))),
                                    None => acc,
                                },
                                _ => acc,
                            })
                    };
                    env.insert(param, val);
                }
            }
            Copy { lhs, op } => {
                let val = eval(op, &env);
                env.insert(lhs, val);
            }
            Arith { lhs, aop, op1, op2 } => {
                let val = D::arith(*aop, &eval(op1, &env), &eval(op2, &env));
                env.insert(lhs, val);
            }
            CallResult { lhs, .. } => {
                let val = cfg
                    .pred(inst)
                    .fold(D::BOTTOM, |acc, pred| match cfg.instruction(pred) {
                        Return(op) => acc.join(&eval(op, table.joined(pred))),
                        _ => acc,
                    });
                env.insert(lhs, val);
            }
            Skip | Call { .. } | Output(_) | Return(_) | Branch(_) => {}
        }

        env
    }
}
