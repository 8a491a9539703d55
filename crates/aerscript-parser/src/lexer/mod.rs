//! Lexical analysis for AerScript.

mod chunks;
mod cursor;
#[allow(clippy::module_inception)]
mod lexer;
mod token;

pub use chunks::{Chunk, ChunkKind, split_embedded};
pub use lexer::{Lexer, tokenize, tokenize_embedded};
pub use token::{Keyword, Payload, Token, TokenKind};
