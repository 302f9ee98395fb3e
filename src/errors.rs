//! Error types.

use derive_more::Display;

/// A fatal error raised while building a control-flow graph or running an
/// analysis over it.  None of these are recoverable: they mean the input
/// program broke a precondition of the optimizer.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
pub enum Error {
    /// No function named `main` exists.
    #[display(fmt = "no main function found, please define a main function")]
    NoMainFunction,
    /// The control-flow graph has no instructions.
    #[display(fmt = "no instructions exist for this program")]
    EmptyProgram,
    /// Two states with different variable sets were joined.
    #[display(fmt = "joined states do not have the same variables")]
    StateShapeMismatch,
    /// A call names a function that is not defined.
    #[display(fmt = "call to undefined function `{}`", _0)]
    UnknownFunction(String),
    /// Two functions share a name.
    #[display(fmt = "function `{}` is defined more than once", _0)]
    DuplicateFunction(String),
    /// A call passes the wrong number of arguments.
    #[display(
        fmt = "function `{}` takes {} argument(s) but is called with {}",
        callee,
        expected,
        found
    )]
    ArityMismatch {
        callee: String,
        expected: usize,
        found: usize,
    },
}

impl std::error::Error for Error {}
