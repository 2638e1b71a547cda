//! The abstract syntax tree produced by the parser and walked by the
//! resolver and evaluator.
//!
//! AST traversal is direct pattern matching, not visitor-pattern double
//! dispatch. Lox has exactly two node families (`Expr`, `Stmt`) and no need
//! for the open-ended extensibility a visitor buys.

pub mod expr;
pub mod stmt;

pub use expr::{Expr, ExprId, ExprKind, LitValue};
pub use stmt::{FunctionDecl, Stmt};
