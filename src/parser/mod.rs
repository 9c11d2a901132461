//! Ruby source analysis: tokenizer, structural parser and target extraction.

mod analyze;
mod lexer;
mod syntax;

pub use analyze::{analyze, Analysis};
