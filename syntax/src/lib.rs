#[macro_use]
mod macros;
mod parse;
pub use parse::{parse_param, parse_params, parse_signature, Error};
pub mod ast;
