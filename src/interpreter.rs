//! A reference interpreter for the normalized while language.
//!
//! Used to check that optimized programs behave like the originals.  Runs are
//! bounded by a step budget and a call depth, so nonterminating programs
//! produce an error instead of hanging.

use std::collections::BTreeMap as Map;

use derive_more::Display;

use crate::front_end::*;


const STEP_LIMIT: u64 = 1_000_000;
const DEPTH_LIMIT: usize = 128;

#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub struct RuntimeError(pub String);
impl std::error::Error for RuntimeError {}

/// Run `main` on the given arguments and return its result.
pub fn interpret(program: &Program, args: &[i64]) -> Result<Option<i64>, RuntimeError> {
    interpret_with_output(program, args).map(|(ret, _)| ret)
}

/// Run `main` on the given arguments and return its result together with
/// every value printed by `output`.
pub fn interpret_with_output(
    program: &Program,
    args: &[i64],
) -> Result<(Option<i64>, Vec<i64>), RuntimeError> {
    let mut interpreter = Interpreter {
        program,
        output: vec![],
        steps: 0,
        depth: 0,
    };
    let ret = interpreter.call("main", args.to_vec())?;
    Ok((ret, interpreter.output))
}

struct Interpreter<'a> {
    program: &'a Program,
    output: Vec<i64>,
    steps: u64,
    depth: usize,
}

// what happens after a statement: either keep going or leave the function.
enum Flow {
    Next,
    Return(i64),
}

type Frame = Map<String, i64>;

impl Interpreter<'_> {
    fn call(&mut self, name: &str, args: Vec<i64>) -> Result<Option<i64>, RuntimeError> {
        let program = self.program;
        let func = program
            .function(name)
            .ok_or_else(|| RuntimeError(format!("call to undefined function `{name}`")))?;
        if func.params.len() != args.len() {
            return Err(RuntimeError(format!(
                "`{name}` expects {} arguments, got {}",
                func.params.len(),
                args.len()
            )));
        }
        if self.depth >= DEPTH_LIMIT {
            return Err(RuntimeError("call depth limit exceeded".to_string()));
        }

        let mut frame: Frame = func.params.iter().cloned().zip(args).collect();

        self.depth += 1;
        let flow = self.exec(&func.body, &mut frame);
        self.depth -= 1;

        match flow? {
            Flow::Return(val) => Ok(Some(val)),
            Flow::Next => Ok(None),
        }
    }

    fn tick(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;
        if self.steps > STEP_LIMIT {
            return Err(RuntimeError("step limit exceeded".to_string()));
        }
        Ok(())
    }

    fn exec(&mut self, stmt: &Stmt, frame: &mut Frame) -> Result<Flow, RuntimeError> {
        self.tick()?;

        match stmt {
            Stmt::Skip => {}
            Stmt::Assign { lhs, rhs } => {
                let val = self.expr(rhs, frame)?;
                frame.insert(lhs.clone(), val);
            }
            Stmt::Output(a) => {
                let val = atom(a, frame)?;
                self.output.push(val);
            }
            Stmt::Return(a) => return Ok(Flow::Return(atom(a, frame)?)),
            Stmt::If { cond, tt, ff } => {
                let branch = if bexpr(cond, frame)? { tt } else { ff };
                return self.exec(branch, frame);
            }
            Stmt::While { cond, body } => {
                while bexpr(cond, frame)? {
                    self.tick()?;
                    if let Flow::Return(val) = self.exec(body, frame)? {
                        return Ok(Flow::Return(val));
                    }
                }
            }
            Stmt::Block(stmts) => {
                for s in stmts {
                    if let Flow::Return(val) = self.exec(s, frame)? {
                        return Ok(Flow::Return(val));
                    }
                }
            }
        }

        Ok(Flow::Next)
    }

    fn expr(&mut self, expr: &Expr, frame: &Frame) -> Result<i64, RuntimeError> {
        match expr {
            Expr::Atom(a) => atom(a, frame),
            Expr::Arith { op, lhs, rhs } => Ok(op.apply(atom(lhs, frame)?, atom(rhs, frame)?)),
            Expr::Call { callee, args } => {
                let args = args
                    .iter()
                    .map(|a| atom(a, frame))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(callee, args)?
                    .ok_or_else(|| RuntimeError(format!("`{callee}` returned no value")))
            }
        }
    }
}

fn atom(a: &Atom, frame: &Frame) -> Result<i64, RuntimeError> {
    match a {
        Atom::Int(n) => Ok(*n),
        Atom::Var(x) => frame
            .get(x)
            .copied()
            .ok_or_else(|| RuntimeError(format!("read of undefined variable `{x}`"))),
    }
}

fn bexpr(b: &BExpr, frame: &Frame) -> Result<bool, RuntimeError> {
    Ok(match b {
        BExpr::True => true,
        BExpr::False => false,
        BExpr::Not(b) => !bexpr(b, frame)?,
        BExpr::And(l, r) => bexpr(l, frame)? && bexpr(r, frame)?,
        BExpr::Or(l, r) => bexpr(l, frame)? || bexpr(r, frame)?,
        BExpr::Cmp { op, lhs, rhs } => op.apply(atom(lhs, frame)?, atom(rhs, frame)?),
    })
}
