//! Interprocedural integer constant propagation.

use arbitrary::Arbitrary;
use derive_more::Display;

use super::*;

// SECTION: analysis interface

// The constant lattice.  It represents the abstract value for an integer
// variable.
#[derive(Arbitrary, Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum Value {
    Bottom,
    Constant(i64),
    Top,
}

// Abstract environment
pub type Env = PointwiseEnv<Value>;

pub type ConstantPropagation = ValueAnalysis<Value>;

// Performs the analysis over the whole program.
pub fn analyze(cfg: &Cfg) -> Result<StateTable<Env>, Error> {
    let table = solve(&ConstantPropagation::new(), cfg)?;
    debug!("constant propagation:\n{}", table.render(cfg));
    Ok(table)
}

// SECTION: analysis implementation

use Value as V;

impl Value {
    pub fn as_constant(&self) -> Option<i64> {
        match self {
            V::Constant(n) => Some(*n),
            _ => None,
        }
    }
}

impl AbstractValue for Value {
    const BOTTOM: Self = V::Bottom;

    fn join(&self, other: &Self) -> Self {
        match (self, other) {
            (V::Bottom, val) | (val, V::Bottom) => *val,
            (V::Constant(s), V::Constant(o)) if s == o => *self,
            _ => V::Top,
        }
    }
}

impl ValueDomain for Value {
    const TOP: Self = V::Top;

    fn alpha(val: i64) -> Self {
        V::Constant(val)
    }

    fn arith(op: ArithOp, lhs: &Self, rhs: &Self) -> Self {
        match (lhs, rhs) {
            // unreachable
            (V::Bottom, _) | (_, V::Bottom) => V::Bottom,
            (V::Constant(x), V::Constant(y)) => V::Constant(op.apply(*x, *y)),
            _ => V::Top,
        }
    }
}
