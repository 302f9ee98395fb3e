//! Constant folding & propagation optimization.

use log::debug;

use crate::errors::Error;
use crate::front_end::*;
use crate::middle_end::analysis::constant_prop::{self, Value};
use crate::middle_end::analysis::{PointwiseEnv, StateTable};
use crate::middle_end::cfg::*;

/// The actual optimization pass.  Returns the rewritten program and whether
/// anything changed.
pub fn constant_prop(program: &Program) -> Result<(Program, bool), Error> {
    let cfg = Cfg::new(program)?;
    let table = constant_prop::analyze(&cfg)?;

    let mut folder = Folder {
        cfg: &cfg,
        table: &table,
        scope: "",
        changed: false,
    };

    let functions = program
        .functions
        .iter()
        .enumerate()
        .map(|(index, f)| {
            folder.scope = &f.name;
            FunctionDef {
                name: f.name.clone(),
                params: f.params.clone(),
                body: folder.stmt(&f.body, NodePath::function(index).child(0)),
            }
        })
        .collect();

    debug!("constant folding changed the program: {}", folder.changed);

    Ok((Program { functions }, folder.changed))
}

// rewrites statements using the constant propagation results of the
// instructions they were lowered to.
struct Folder<'a> {
    cfg: &'a Cfg,
    table: &'a StateTable<PointwiseEnv<Value>>,
    scope: &'a str,
    changed: bool,
}

impl Folder<'_> {
    fn stmt(&mut self, stmt: &Stmt, path: NodePath) -> Stmt {
        match stmt {
            Stmt::Skip => Stmt::Skip,
            Stmt::Assign { lhs, rhs } => {
                let rhs = self.assign(lhs, rhs, &path);
                Stmt::Assign {
                    lhs: lhs.clone(),
                    rhs,
                }
            }
            Stmt::Output(a) => Stmt::Output(self.atom_at(&path, a)),
            Stmt::Return(a) => Stmt::Return(self.atom_at(&path, a)),
            Stmt::If { cond, tt, ff } => Stmt::If {
                cond: self.cond(cond, &path.child(0)),
                tt: Box::new(self.stmt(tt, path.child(1))),
                ff: Box::new(self.stmt(ff, path.child(2))),
            },
            Stmt::While { cond, body } => Stmt::While {
                cond: self.cond(cond, &path.child(0)),
                body: Box::new(self.stmt(body, path.child(1))),
            },
            Stmt::Block(stmts) => Stmt::Block(
                stmts
                    .iter()
                    .enumerate()
                    .map(|(index, s)| self.stmt(s, path.child(index)))
                    .collect(),
            ),
        }
    }

    fn assign(&mut self, lhs: &str, rhs: &Expr, path: &NodePath) -> Expr {
        // the call may print, so only its arguments are touched.
        if let Expr::Call { callee, args } = rhs {
            let call = path.child(0);
            return Expr::Call {
                callee: callee.clone(),
                args: args.iter().map(|a| self.atom_at(&call, a)).collect(),
            };
        }

        if let Some(inst) = self.cfg.inst_at(path) {
            let var = VarId::new(self.scope, lhs);
            if let Value::Constant(n) = self.table.get_lattice_value(inst, &var) {
                let folded = Expr::Atom(Atom::Int(n));
                if *rhs != folded {
                    self.changed = true;
                }
                return folded;
            }
        }

        match rhs {
            Expr::Arith { op, lhs: a, rhs: b } => {
                let a = self.atom_at(path, a);
                let b = self.atom_at(path, b);
                match (a.as_int(), b.as_int()) {
                    // possible in code the analysis never reached.
                    (Some(x), Some(y)) => {
                        self.changed = true;
                        Expr::Atom(Atom::Int(op.apply(x, y)))
                    }
                    _ => Expr::Arith {
                        op: *op,
                        lhs: a,
                        rhs: b,
                    },
                }
            }
            Expr::Atom(a) => Expr::Atom(self.atom_at(path, a)),
            Expr::Call { .. } => rhs.clone(),
        }
    }

    fn cond(&mut self, cond: &BExpr, path: &NodePath) -> BExpr {
        match cond {
            BExpr::True | BExpr::False => cond.clone(),
            BExpr::Not(b) => BExpr::Not(Box::new(self.cond(b, path))),
            BExpr::And(l, r) => BExpr::And(Box::new(self.cond(l, path)), Box::new(self.cond(r, path))),
            BExpr::Or(l, r) => BExpr::Or(Box::new(self.cond(l, path)), Box::new(self.cond(r, path))),
            BExpr::Cmp { op, lhs, rhs } => BExpr::Cmp {
                op: *op,
                lhs: self.atom_at(path, lhs),
                rhs: self.atom_at(path, rhs),
            },
        }
    }

    // the atom with a variable replaced by its value right before the
    // instruction at `path`, if that value is a constant.
    fn atom_at(&mut self, path: &NodePath, atom: &Atom) -> Atom {
        let Atom::Var(x) = atom else {
            return atom.clone();
        };
        let Some(inst) = self.cfg.inst_at(path) else {
            return atom.clone();
        };

        match self.table.value_before(inst, &VarId::new(self.scope, x)) {
            Value::Constant(n) => {
                self.changed = true;
                Atom::Int(n)
            }
            _ => atom.clone(),
        }
    }
}
