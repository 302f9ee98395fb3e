pub mod errors;
pub mod front_end;
pub mod interpreter;
pub mod middle_end;

pub use errors::Error;
