//! Interprocedural zero analysis: which variables are known to be zero, and
//! which are known not to be.

use arbitrary::Arbitrary;
use derive_more::Display;

use super::*;

#[derive(Arbitrary, Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum Value {
    Bottom,
    Zero,
    NonZero,
    Top,
}

pub type Env = PointwiseEnv<Value>;

pub type ZeroAnalysis = ValueAnalysis<Value>;

pub fn analyze(cfg: &Cfg) -> Result<StateTable<Env>, Error> {
    let table = solve(&ZeroAnalysis::new(), cfg)?;
    debug!("zero analysis:\n{}", table.render(cfg));
    Ok(table)
}

use Value as V;

impl AbstractValue for Value {
    const BOTTOM: Self = V::Bottom;

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (V::Bottom, val) | (val, V::Bottom) => *val,
            (s, o) if s == o => *s,
            _ => V::Top,
        }
    }
}

impl ValueDomain for Value {
    const TOP: Self = V::Top;

    fn alpha(val: i64) -> Self {
        if val == 0 {
            V::Zero
        } else {
            V::NonZero
        }
    }

    // nonzero operands can still wrap around to zero, so only a zero operand
    // tells us anything.
    fn arith(op: ArithOp, lhs: &Self, rhs: &Self) -> Self {
        match (op, lhs, rhs) {
            (_, V::Bottom, _) | (_, _, V::Bottom) => V::Bottom,
            (ArithOp::Mul, V::Zero, _) | (ArithOp::Mul, _, V::Zero) => V::Zero,
            (ArithOp::Add, V::Zero, x) | (ArithOp::Add, x, V::Zero) => *x,
            (ArithOp::Sub, x, V::Zero) => *x,
            _ => V::Top,
        }
    }
}
