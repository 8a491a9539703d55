//! AerScript parser crate.
//!
//! The collaborators the code generator drives:
//! - [`lexer`]: tokenization of code spans and the raw/code splitter for
//!   embedded documents
//! - [`TokenStream`]: a cursor with delimiter narrowing and balanced scans
//! - [`expr`]: the operator table and the expression-tree builder
//!
//! # Example
//!
//! ```
//! use aerscript_parser::expr::{build_tree, ExprOp};
//! use aerscript_parser::lexer::tokenize;
//! use bumpalo::Bump;
//!
//! let (tokens, errors) = tokenize("$total = $price * 2", 1);
//! assert!(errors.is_empty());
//!
//! let arena = Bump::new();
//! let root = build_tree(&tokens, 0..tokens.len(), &arena).unwrap().unwrap();
//! assert_eq!(root.op, Some(ExprOp::Assign));
//! ```

pub mod expr;
pub mod lexer;
pub mod stream;

pub use expr::{ExprNode, ExprOp, LeafKind};
pub use lexer::{Keyword, Lexer, Token, TokenKind};
pub use stream::TokenStream;
