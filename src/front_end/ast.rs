// the normalized while-language AST.
//
// every operand position holds an atom, arithmetic has exactly two atomic
// operands, and calls only appear as the whole right-hand side of an
// assignment.  the Display impls print source that `parse` accepts again.

use std::fmt::{self, Display, Formatter};

use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub functions: Vec<FunctionDef>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Stmt,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Skip,
    Assign {
        lhs: String,
        rhs: Expr,
    },
    Output(Atom),
    Return(Atom),
    If {
        cond: BExpr,
        tt: Box<Stmt>,
        ff: Box<Stmt>,
    },
    While {
        cond: BExpr,
        body: Box<Stmt>,
    },
    Block(Vec<Stmt>),
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Atom(Atom),
    Arith {
        op: ArithOp,
        lhs: Atom,
        rhs: Atom,
    },
    Call {
        callee: String,
        args: Vec<Atom>,
    },
}

#[derive(Clone, Debug, Display, Eq, PartialEq, Serialize, Deserialize)]
pub enum Atom {
    #[display(fmt = "{}", _0)]
    Int(i64),
    #[display(fmt = "{}", _0)]
    Var(String),
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum BExpr {
    True,
    False,
    Not(Box<BExpr>),
    And(Box<BExpr>, Box<BExpr>),
    Or(Box<BExpr>, Box<BExpr>),
    Cmp { op: CmpOp, lhs: Atom, rhs: Atom },
}

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum ArithOp {
    #[display(fmt = "+")]
    Add,
    #[display(fmt = "-")]
    Sub,
    #[display(fmt = "*")]
    Mul,
}

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum CmpOp {
    #[display(fmt = "<")]
    Lt,
    #[display(fmt = "=")]
    Eq,
}

// SECTION: helpers shared by the passes

impl ArithOp {
    // 64-bit two's complement semantics: overflow wraps.
    pub fn apply(self, x: i64, y: i64) -> i64 {
        match self {
            ArithOp::Add => x.wrapping_add(y),
            ArithOp::Sub => x.wrapping_sub(y),
            ArithOp::Mul => x.wrapping_mul(y),
        }
    }
}

impl CmpOp {
    pub fn apply(self, x: i64, y: i64) -> bool {
        match self {
            CmpOp::Lt => x < y,
            CmpOp::Eq => x == y,
        }
    }
}

impl Atom {
    pub fn var(name: &str) -> Self {
        Atom::Var(name.to_string())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Atom::Int(n) => Some(*n),
            Atom::Var(_) => None,
        }
    }
}

impl BExpr {
    /// The value of the condition if it does not depend on any variable.
    pub fn static_value(&self) -> Option<bool> {
        match self {
            BExpr::True => Some(true),
            BExpr::False => Some(false),
            BExpr::Not(b) => b.static_value().map(|b| !b),
            BExpr::And(l, r) => match (l.static_value(), r.static_value()) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            },
            BExpr::Or(l, r) => match (l.static_value(), r.static_value()) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            },
            BExpr::Cmp { op, lhs, rhs } => Some(op.apply(lhs.as_int()?, rhs.as_int()?)),
        }
    }
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.name == name)
    }
}

// SECTION: printing

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, func) in self.functions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{func}")?;
        }
        Ok(())
    }
}

impl Display for FunctionDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "fun {}({}) {{", self.name, self.params.join(", "))?;
        match &self.body {
            Stmt::Block(stmts) if !stmts.is_empty() => write_stmts(f, stmts, 1)?,
            Stmt::Block(_) => write!(f, "  skip")?,
            stmt => {
                indent(f, 1)?;
                write_stmt(f, stmt, 1)?;
            }
        }
        writeln!(f, "\n}}")
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_stmt(f, self, 0)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Atom(a) => write!(f, "{a}"),
            Expr::Arith { op, lhs, rhs } => write!(f, "{lhs} {op} {rhs}"),
            Expr::Call { callee, args } => {
                let args = args.iter().map(|a| a.to_string()).collect::<Vec<_>>();
                write!(f, "{callee}({})", args.join(", "))
            }
        }
    }
}

impl Display for BExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BExpr::True => write!(f, "true"),
            BExpr::False => write!(f, "false"),
            BExpr::Not(b) => write!(f, "not {}", Parens(b)),
            BExpr::And(l, r) => write!(f, "{} and {}", Parens(l), Parens(r)),
            BExpr::Or(l, r) => write!(f, "{} or {}", Parens(l), Parens(r)),
            BExpr::Cmp { op, lhs, rhs } => write!(f, "{lhs} {op} {rhs}"),
        }
    }
}

// prints compound conditions in parentheses so that printing never depends on
// operator precedence.
struct Parens<'a>(&'a BExpr);

impl Display for Parens<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.0 {
            BExpr::Not(_) | BExpr::And(..) | BExpr::Or(..) => write!(f, "({})", self.0),
            b => write!(f, "{b}"),
        }
    }
}

fn indent(f: &mut Formatter<'_>, depth: usize) -> fmt::Result {
    write!(f, "{:width$}", "", width = depth * 2)
}

fn write_stmts(f: &mut Formatter<'_>, stmts: &[Stmt], depth: usize) -> fmt::Result {
    for (i, stmt) in stmts.iter().enumerate() {
        if i > 0 {
            writeln!(f, ";")?;
        }
        indent(f, depth)?;
        write_stmt(f, stmt, depth)?;
    }
    Ok(())
}

fn write_stmt(f: &mut Formatter<'_>, stmt: &Stmt, depth: usize) -> fmt::Result {
    match stmt {
        Stmt::Skip => write!(f, "skip"),
        Stmt::Assign { lhs, rhs } => write!(f, "{lhs} := {rhs}"),
        Stmt::Output(a) => write!(f, "output {a}"),
        Stmt::Return(a) => write!(f, "return {a}"),
        Stmt::If { cond, tt, ff } => {
            write!(f, "if {cond} then ")?;
            write_stmt(f, tt, depth)?;
            write!(f, " else ")?;
            write_stmt(f, ff, depth)
        }
        Stmt::While { cond, body } => {
            write!(f, "while {cond} do ")?;
            write_stmt(f, body, depth)
        }
        // `{}` is not valid source; an empty block prints as the statement
        // it is equivalent to.
        Stmt::Block(stmts) if stmts.is_empty() => write!(f, "skip"),
        Stmt::Block(stmts) => {
            writeln!(f, "{{")?;
            write_stmts(f, stmts, depth + 1)?;
            writeln!(f)?;
            indent(f, depth)?;
            write!(f, "}}")
        }
    }
}
