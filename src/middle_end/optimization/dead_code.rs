//! Dead code elimination driven by liveness.
//!
//! Removes assignments to variables that are never read afterwards, branches
//! and loops whose condition is decided statically, and functions that are
//! never called.  The block structure is normalized on the way: nested
//! blocks are spliced into their parent and redundant `skip`s dropped, so
//! that running the pass on its own output changes nothing.

use log::debug;

use crate::errors::Error;
use crate::front_end::*;
use crate::middle_end::analysis::liveness::{self, Env};
use crate::middle_end::analysis::StateTable;
use crate::middle_end::cfg::*;

/// The actual optimization pass.  Returns the rewritten program and whether
/// anything changed.
pub fn dead_code_elimination(program: &Program) -> Result<(Program, bool), Error> {
    let cfg = Cfg::new(program)?;
    let table = liveness::analyze(&cfg)?;

    let mut eliminator = Eliminator {
        cfg: &cfg,
        table: &table,
        scope: "",
        changed: false,
    };
    let mut functions = vec![];

    for (index, f) in program.functions.iter().enumerate() {
        let called = cfg
            .function_entry(&f.name)
            .map_or(false, |entry| cfg.call_sites(entry).next().is_some());
        if f.name != "main" && !called {
            debug!("removing uncalled function `{}`", f.name);
            eliminator.changed = true;
            continue;
        }

        eliminator.scope = &f.name;
        functions.push(FunctionDef {
            name: f.name.clone(),
            params: f.params.clone(),
            body: eliminator.body(&f.body, NodePath::function(index).child(0)),
        });
    }

    debug!("dead code elimination changed the program: {}", eliminator.changed);

    Ok((Program { functions }, eliminator.changed))
}

struct Eliminator<'a> {
    cfg: &'a Cfg,
    table: &'a StateTable<Env>,
    scope: &'a str,
    changed: bool,
}

impl Eliminator<'_> {
    // a statement in a position that needs exactly one: an if arm, a loop
    // body, or a function body.
    fn body(&mut self, stmt: &Stmt, path: NodePath) -> Stmt {
        let mut stmts = self.stmt(stmt, path);

        if let Stmt::Block(_) = stmt {
            if stmts.is_empty() {
                self.changed = true;
                stmts.push(Stmt::Skip);
            }
            return Stmt::Block(stmts);
        }

        match stmts.len() {
            0 => Stmt::Skip,
            1 => stmts.remove(0),
            _ => Stmt::Block(stmts),
        }
    }

    // the statements replacing `stmt` in its enclosing block.
    fn stmt(&mut self, stmt: &Stmt, path: NodePath) -> Vec<Stmt> {
        match stmt {
            // the callee may print; keep the call even if its result is never
            // read.
            Stmt::Assign {
                rhs: Expr::Call { .. },
                ..
            } => vec![stmt.clone()],
            Stmt::Assign { lhs, .. } => match self.cfg.inst_at(&path) {
                Some(inst) if !self.table.is_live_out(inst, &VarId::new(self.scope, lhs)) => {
                    self.changed = true;
                    vec![]
                }
                _ => vec![stmt.clone()],
            },
            Stmt::Skip | Stmt::Output(_) | Stmt::Return(_) => vec![stmt.clone()],
            Stmt::If { cond, tt, ff } => match cond.static_value() {
                Some(true) => {
                    self.changed = true;
                    self.stmt(tt, path.child(1))
                }
                Some(false) => {
                    self.changed = true;
                    self.stmt(ff, path.child(2))
                }
                None => vec![Stmt::If {
                    cond: cond.clone(),
                    tt: Box::new(self.body(tt, path.child(1))),
                    ff: Box::new(self.body(ff, path.child(2))),
                }],
            },
            Stmt::While { cond, body } => match cond.static_value() {
                Some(false) => {
                    self.changed = true;
                    vec![]
                }
                _ => vec![Stmt::While {
                    cond: cond.clone(),
                    body: Box::new(self.body(body, path.child(1))),
                }],
            },
            Stmt::Block(stmts) => {
                let mut result = vec![];
                for (index, s) in stmts.iter().enumerate() {
                    if let Stmt::Block(_) = s {
                        // spliced into this block.
                        self.changed = true;
                    }
                    result.extend(self.stmt(s, path.child(index)));
                }
                self.drop_skips(result)
            }
        }
    }

    // keep a `skip` only if it is all there is.
    fn drop_skips(&mut self, stmts: Vec<Stmt>) -> Vec<Stmt> {
        let len = stmts.len();
        let mut kept: Vec<Stmt> = stmts.into_iter().filter(|s| *s != Stmt::Skip).collect();
        if kept.is_empty() && len > 0 {
            kept.push(Stmt::Skip);
        }
        if kept.len() != len {
            self.changed = true;
        }
        kept
    }
}
