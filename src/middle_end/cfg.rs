//! The control-flow graph of a whole program.
//!
//! Nodes are single instructions rather than basic blocks: every assignment,
//! output, return, skip, boolean test, function entry, and each half of a
//! call gets its own node.  Instruction ids are indices into the instruction
//! vector, so they are only meaningful for the graph that assigned them; any
//! rewrite of the AST means building a new graph.

use std::collections::{BTreeMap as Map, BTreeSet as Set};
use std::fmt::{self, Display, Write};

use arbitrary::Arbitrary;
use log::debug;

use crate::errors::Error;
use crate::front_end::{ArithOp, Atom, BExpr, CmpOp, Expr, FunctionDef, Program, Stmt};

#[cfg(test)]
mod tests;

/// Instruction IDs: the position of the instruction in [Cfg::instructions].
pub type InstId = usize;

/// A variable qualified by the function that declares it.
#[derive(Arbitrary, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct VarId {
    scope: String,
    name: String,
}

impl VarId {
    pub fn new(scope: &str, name: &str) -> Self {
        VarId {
            scope: scope.to_string(),
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scope, self.name)
    }
}

/// The position of a node in the AST, as the child indices leading to it.
///
/// The first index selects the function; statements number their children
/// as follows: block statements by position, `if` as (test, then, else),
/// `while` as (test, body), and an assignment from a call has its call at
/// child 0.  Rewrite passes use these paths to find the instruction that a
/// node was lowered to.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn function(index: usize) -> Self {
        NodePath(vec![index])
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        NodePath(path)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Operand {
    CInt(i64),
    Var(VarId),
}

impl Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::CInt(n) => write!(f, "{n}"),
            Operand::Var(x) => write!(f, "{x}"),
        }
    }
}

/// A boolean test over operands.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Cond {
    Const(bool),
    Not(Box<Cond>),
    And(Box<Cond>, Box<Cond>),
    Or(Box<Cond>, Box<Cond>),
    Cmp {
        rop: CmpOp,
        op1: Operand,
        op2: Operand,
    },
}

impl Cond {
    fn operands(&self) -> Vec<&Operand> {
        match self {
            Cond::Const(_) => vec![],
            Cond::Not(c) => c.operands(),
            Cond::And(l, r) | Cond::Or(l, r) => {
                let mut ops = l.operands();
                ops.extend(r.operands());
                ops
            }
            Cond::Cmp { op1, op2, .. } => vec![op1, op2],
        }
    }
}

impl Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cond::Const(b) => write!(f, "{b}"),
            Cond::Not(c) => write!(f, "not ({c})"),
            Cond::And(l, r) => write!(f, "({l}) and ({r})"),
            Cond::Or(l, r) => write!(f, "({l}) or ({r})"),
            Cond::Cmp { rop, op1, op2 } => write!(f, "{op1} {rop} {op2}"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Instruction {
    /// Entry of a function; binds the parameters.
    Entry { func: String, params: Vec<VarId> },
    Skip,
    Copy {
        lhs: VarId,
        op: Operand,
    },
    Arith {
        lhs: VarId,
        aop: ArithOp,
        op1: Operand,
        op2: Operand,
    },
    /// The call half of `lhs := callee(args)`; flows into the callee.
    Call { callee: String, args: Vec<Operand> },
    /// The assignment half of `lhs := callee(args)`; the callee's returns
    /// flow into it.
    CallResult { lhs: VarId, callee: String },
    Output(Operand),
    Return(Operand),
    /// The test of an `if` or `while`.
    Branch(Cond),
}

impl Instruction {
    /// The variable the instruction assigns, if any.  Parameters count as
    /// assigned by their function's entry.
    pub fn defs(&self) -> Vec<&VarId> {
        match self {
            Instruction::Entry { params, .. } => params.iter().collect(),
            Instruction::Copy { lhs, .. }
            | Instruction::Arith { lhs, .. }
            | Instruction::CallResult { lhs, .. } => vec![lhs],
            _ => vec![],
        }
    }

    /// The variables the instruction reads.
    pub fn uses(&self) -> Vec<&VarId> {
        let operands: Vec<&Operand> = match self {
            Instruction::Copy { op, .. } | Instruction::Output(op) | Instruction::Return(op) => {
                vec![op]
            }
            Instruction::Arith { op1, op2, .. } => vec![op1, op2],
            Instruction::Call { args, .. } => args.iter().collect(),
            Instruction::Branch(cond) => cond.operands(),
            Instruction::Entry { .. } | Instruction::Skip | Instruction::CallResult { .. } => {
                vec![]
            }
        };

        operands
            .into_iter()
            .filter_map(|op| match op {
                Operand::Var(x) => Some(x),
                Operand::CInt(_) => None,
            })
            .collect()
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;

        match self {
            Entry { func, params } => {
                let params = params.iter().map(|p| p.to_string()).collect::<Vec<_>>();
                write!(f, "entry {func}({})", params.join(", "))
            }
            Skip => write!(f, "skip"),
            Copy { lhs, op } => write!(f, "{lhs} := {op}"),
            Arith { lhs, aop, op1, op2 } => write!(f, "{lhs} := {op1} {aop} {op2}"),
            Call { callee, args } => {
                let args = args.iter().map(|a| a.to_string()).collect::<Vec<_>>();
                write!(f, "call {callee}({})", args.join(", "))
            }
            CallResult { lhs, callee } => write!(f, "{lhs} := ret {callee}"),
            Output(op) => write!(f, "output {op}"),
            Return(op) => write!(f, "return {op}"),
            Branch(cond) => write!(f, "test {cond}"),
        }
    }
}

/// The interprocedural control-flow graph of a program.
#[derive(Clone, Debug)]
pub struct Cfg {
    /// The entry instruction of `main`.
    pub entry: InstId,
    instructions: Vec<Instruction>,
    owners: Vec<String>,
    succ_edges: Vec<Set<InstId>>,
    pred_edges: Vec<Set<InstId>>,
    vars: Set<VarId>,
    func_vars: Map<String, Set<VarId>>,
    func_entries: Map<String, InstId>,
    call_to_def: Map<InstId, InstId>,
    def_to_calls: Map<InstId, Set<InstId>>,
    locations: Map<NodePath, InstId>,
}

impl Cfg {
    /// Build the graph of the given program.
    pub fn new(program: &Program) -> Result<Self, Error> {
        let mut builder = Builder::default();

        for (index, func) in program.functions.iter().enumerate() {
            builder.function(index, func)?;
        }

        let cfg = builder.finish()?;
        debug!(
            "built cfg with {} instructions and {} variables",
            cfg.len(),
            cfg.vars.len()
        );

        Ok(cfg)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instruction(&self, inst: InstId) -> &Instruction {
        &self.instructions[inst]
    }

    pub fn instructions(&self) -> impl Iterator<Item = (InstId, &Instruction)> {
        self.instructions.iter().enumerate()
    }

    /// The name of the function containing the instruction.
    pub fn function_of(&self, inst: InstId) -> &str {
        &self.owners[inst]
    }

    // an iterator over the successor edges of inst.
    pub fn succ(&self, inst: InstId) -> impl Iterator<Item = InstId> + '_ {
        self.succ_edges[inst].iter().copied()
    }

    // an iterator over the predecessor edges of inst.
    pub fn pred(&self, inst: InstId) -> impl Iterator<Item = InstId> + '_ {
        self.pred_edges[inst].iter().copied()
    }

    /// Instructions without successors: returns of uncalled functions, the
    /// last instructions of function bodies, and so on.
    pub fn exits(&self) -> impl Iterator<Item = InstId> + '_ {
        (0..self.len()).filter(|inst| self.succ_edges[*inst].is_empty())
    }

    /// Every variable of every function.
    pub fn vars(&self) -> &Set<VarId> {
        &self.vars
    }

    /// The variables declared (as parameters, assignment targets, or
    /// operands) inside the given function.
    pub fn function_vars(&self, func: &str) -> Option<&Set<VarId>> {
        self.func_vars.get(func)
    }

    pub fn function_entry(&self, func: &str) -> Option<InstId> {
        self.func_entries.get(func).copied()
    }

    /// The entry of the function called by the given call instruction.
    pub fn call_def(&self, call: InstId) -> Option<InstId> {
        self.call_to_def.get(&call).copied()
    }

    /// The call instructions targeting the function with the given entry.
    pub fn call_sites(&self, def: InstId) -> impl Iterator<Item = InstId> + '_ {
        self.def_to_calls.get(&def).into_iter().flatten().copied()
    }

    /// The instruction the AST node at `path` was lowered to.
    pub fn inst_at(&self, path: &NodePath) -> Option<InstId> {
        self.locations.get(path).copied()
    }

    /// Render the graph as a Mermaid flowchart.
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("flowchart TD\n");

        for (inst, instruction) in self.instructions() {
            let label = instruction.to_string().replace('"', "'");
            let _ = writeln!(out, "    i{inst}[\"{inst}: {label}\"]");
        }
        for (inst, succs) in self.succ_edges.iter().enumerate() {
            for succ in succs {
                let _ = writeln!(out, "    i{inst} --> i{succ}");
            }
        }

        out
    }
}

impl Display for Cfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (inst, instruction) in self.instructions() {
            let succs = self.succ(inst).map(|s| s.to_string()).collect::<Vec<_>>();
            writeln!(f, "{inst}: {instruction} -> [{}]", succs.join(", "))?;
        }
        Ok(())
    }
}

// SECTION: construction

// The instructions a statement was lowered to, seen from outside: where
// control enters it and which instructions it may leave from.
struct Fragment {
    entry: InstId,
    exits: Set<InstId>,
}

impl Fragment {
    fn single(inst: InstId) -> Self {
        Fragment {
            entry: inst,
            exits: Set::from([inst]),
        }
    }
}

// a call site, resolved once every function has been lowered.
struct PendingCall {
    call: InstId,
    result: InstId,
    callee: String,
    arity: usize,
}

#[derive(Default)]
struct Builder {
    instructions: Vec<Instruction>,
    owners: Vec<String>,
    succ_edges: Vec<Set<InstId>>,
    pred_edges: Vec<Set<InstId>>,
    locations: Map<NodePath, InstId>,
    func_vars: Map<String, Set<VarId>>,
    func_entries: Map<String, InstId>,
    func_arity: Map<String, usize>,
    returns: Map<String, Vec<InstId>>,
    calls: Vec<PendingCall>,
    curr_func: String,
}

impl Builder {
    fn add(&mut self, inst: Instruction, path: NodePath) -> InstId {
        let id = self.instructions.len();
        self.instructions.push(inst);
        self.owners.push(self.curr_func.clone());
        self.succ_edges.push(Set::new());
        self.pred_edges.push(Set::new());
        self.locations.insert(path, id);
        id
    }

    fn edge(&mut self, from: InstId, to: InstId) {
        self.succ_edges[from].insert(to);
        self.pred_edges[to].insert(from);
    }

    fn edges(&mut self, from: &Set<InstId>, to: InstId) {
        for prev in from {
            self.edge(*prev, to);
        }
    }

    // qualify a name by the current function and record it as one of the
    // function's variables.
    fn var(&mut self, name: &str) -> VarId {
        let var = VarId::new(&self.curr_func, name);
        self.func_vars
            .entry(self.curr_func.clone())
            .or_default()
            .insert(var.clone());
        var
    }

    fn operand(&mut self, atom: &Atom) -> Operand {
        match atom {
            Atom::Int(n) => Operand::CInt(*n),
            Atom::Var(x) => Operand::Var(self.var(x)),
        }
    }

    fn cond(&mut self, b: &BExpr) -> Cond {
        match b {
            BExpr::True => Cond::Const(true),
            BExpr::False => Cond::Const(false),
            BExpr::Not(b) => Cond::Not(Box::new(self.cond(b))),
            BExpr::And(l, r) => Cond::And(Box::new(self.cond(l)), Box::new(self.cond(r))),
            BExpr::Or(l, r) => Cond::Or(Box::new(self.cond(l)), Box::new(self.cond(r))),
            BExpr::Cmp { op, lhs, rhs } => Cond::Cmp {
                rop: *op,
                op1: self.operand(lhs),
                op2: self.operand(rhs),
            },
        }
    }

    fn function(&mut self, index: usize, func: &FunctionDef) -> Result<(), Error> {
        if self.func_entries.contains_key(&func.name) {
            return Err(Error::DuplicateFunction(func.name.clone()));
        }

        self.curr_func = func.name.clone();
        self.func_vars.entry(func.name.clone()).or_default();
        self.returns.entry(func.name.clone()).or_default();

        let params = func.params.iter().map(|p| self.var(p)).collect();
        let path = NodePath::function(index);
        let entry = self.add(
            Instruction::Entry {
                func: func.name.clone(),
                params,
            },
            path.clone(),
        );
        self.func_entries.insert(func.name.clone(), entry);
        self.func_arity.insert(func.name.clone(), func.params.len());

        if let Some(body) = self.stmt(&func.body, path.child(0)) {
            self.edge(entry, body.entry);
        }

        Ok(())
    }

    // lower a statement, returning None if it contains no instruction (an
    // empty block).
    fn stmt(&mut self, stmt: &Stmt, path: NodePath) -> Option<Fragment> {
        match stmt {
            Stmt::Skip => Some(Fragment::single(self.add(Instruction::Skip, path))),
            Stmt::Assign { lhs, rhs } => Some(self.assign(lhs, rhs, path)),
            Stmt::Output(atom) => {
                let op = self.operand(atom);
                Some(Fragment::single(self.add(Instruction::Output(op), path)))
            }
            Stmt::Return(atom) => {
                let op = self.operand(atom);
                let ret = self.add(Instruction::Return(op), path);
                self.returns
                    .entry(self.curr_func.clone())
                    .or_default()
                    .push(ret);
                // control leaves the function; the edges to the call sites
                // are added once all calls are known.
                Some(Fragment {
                    entry: ret,
                    exits: Set::new(),
                })
            }
            Stmt::If { cond, tt, ff } => {
                let cond = self.cond(cond);
                let test = self.add(Instruction::Branch(cond), path.child(0));
                let mut exits = Set::new();

                for (index, arm) in [(1, tt), (2, ff)] {
                    match self.stmt(arm, path.child(index)) {
                        Some(arm) => {
                            self.edge(test, arm.entry);
                            exits.extend(arm.exits);
                        }
                        None => {
                            exits.insert(test);
                        }
                    }
                }

                Some(Fragment { entry: test, exits })
            }
            Stmt::While { cond, body } => {
                let cond = self.cond(cond);
                let test = self.add(Instruction::Branch(cond), path.child(0));

                if let Some(body) = self.stmt(body, path.child(1)) {
                    self.edge(test, body.entry);
                    self.edges(&body.exits, test);
                }

                Some(Fragment::single(test))
            }
            Stmt::Block(stmts) => {
                let mut entry = None;
                let mut exits = Set::new();

                for (index, stmt) in stmts.iter().enumerate() {
                    let Some(frag) = self.stmt(stmt, path.child(index)) else {
                        continue;
                    };
                    match entry {
                        None => entry = Some(frag.entry),
                        Some(_) => self.edges(&exits, frag.entry),
                    }
                    exits = frag.exits;
                }

                entry.map(|entry| Fragment { entry, exits })
            }
        }
    }

    fn assign(&mut self, lhs: &str, rhs: &Expr, path: NodePath) -> Fragment {
        let lhs = self.var(lhs);

        match rhs {
            Expr::Atom(atom) => {
                let op = self.operand(atom);
                Fragment::single(self.add(Instruction::Copy { lhs, op }, path))
            }
            Expr::Arith { op, lhs: a, rhs: b } => {
                let op1 = self.operand(a);
                let op2 = self.operand(b);
                let inst = Instruction::Arith {
                    lhs,
                    aop: *op,
                    op1,
                    op2,
                };
                Fragment::single(self.add(inst, path))
            }
            Expr::Call { callee, args } => {
                let args: Vec<Operand> = args.iter().map(|a| self.operand(a)).collect();
                let arity = args.len();
                let call = self.add(
                    Instruction::Call {
                        callee: callee.clone(),
                        args,
                    },
                    path.child(0),
                );
                let result = self.add(
                    Instruction::CallResult {
                        lhs,
                        callee: callee.clone(),
                    },
                    path,
                );
                // the caller's own state goes around the call.
                self.edge(call, result);
                self.calls.push(PendingCall {
                    call,
                    result,
                    callee: callee.clone(),
                    arity,
                });

                Fragment {
                    entry: call,
                    exits: Set::from([result]),
                }
            }
        }
    }

    // resolve calls and pick the program entry.
    fn finish(mut self) -> Result<Cfg, Error> {
        if self.instructions.is_empty() {
            return Err(Error::EmptyProgram);
        }

        let mut call_to_def = Map::new();
        let mut def_to_calls: Map<InstId, Set<InstId>> = Map::new();
        let calls = std::mem::take(&mut self.calls);

        for PendingCall {
            call,
            result,
            callee,
            arity,
        } in calls
        {
            let def = self
                .func_entries
                .get(&callee)
                .copied()
                .ok_or_else(|| Error::UnknownFunction(callee.clone()))?;
            let expected = self.func_arity[&callee];
            if expected != arity {
                return Err(Error::ArityMismatch {
                    callee,
                    expected,
                    found: arity,
                });
            }

            self.edge(call, def);
            call_to_def.insert(call, def);
            def_to_calls.entry(def).or_default().insert(call);

            // every return of the callee goes back to every call site.
            let returns = self.returns.get(&callee).cloned().unwrap_or_default();
            for ret in returns {
                self.edge(ret, result);
            }
        }

        let entry = self
            .func_entries
            .get("main")
            .copied()
            .ok_or(Error::NoMainFunction)?;

        let vars = self.func_vars.values().flatten().cloned().collect();

        Ok(Cfg {
            entry,
            instructions: self.instructions,
            owners: self.owners,
            succ_edges: self.succ_edges,
            pred_edges: self.pred_edges,
            vars,
            func_vars: self.func_vars,
            func_entries: self.func_entries,
            call_to_def,
            def_to_calls,
            locations: self.locations,
        })
    }
}
