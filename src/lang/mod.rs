/*!
## Language module

Lexical analysis, preprocessing, and parsing of the scripting language.

*/

#[macro_use]
mod error;
pub mod ast;
mod lex;
mod parse;
mod prepro;
pub mod token;

pub use error::{Error, ErrorCode};
pub use lex::Tokenizer;
pub use parse::{parse, parse_expression, TokenStream};
pub use prepro::preprocess;
