//! Front end for the normalized while language: tokens, AST, and parser.

use std::error::Error;
use std::path::Path;

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use lexer::*;
pub use parser::*;


/// Load a program from a file: `.json` files hold a serialized AST, anything
/// else is parsed as source.
pub fn read_program(path: &Path) -> Result<Program, Box<dyn Error>> {
    let code = std::fs::read_to_string(path)?;

    if path.extension().map_or(false, |ext| ext == "json") {
        Ok(serde_json::from_str(&code)?)
    } else {
        Ok(parse(&code)?)
    }
}
