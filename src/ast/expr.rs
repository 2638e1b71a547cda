//! Expression nodes.
//!
//! Every node carries a stable `ExprId`, assigned once at construction time
//! and never reused, independent of where the node ends up living in the
//! tree. A monotonic integer is preferable to pointer identity here, since
//! it survives serialization and is trivial to hash. The resolver's
//! side-table is keyed on this id.
//!
//! The counter is a single process-wide `AtomicU32` rather than a field
//! threaded through the parser, so that ids stay unique across independent
//! parses within one REPL session: a closure declared on one REPL line and
//! invoked after several more lines still resolves against the same
//! `ExprId` the resolver originally recorded for it.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::token::Token;

pub type ExprId = u32;

static NEXT_EXPR_ID: AtomicU32 = AtomicU32::new(0);

fn next_id() -> ExprId {
	NEXT_EXPR_ID.fetch_add(1, Ordering::Relaxed)
}

/// An expression node together with its stable identity.
#[derive(Debug, Clone)]
pub struct Expr {
	pub id: ExprId,
	pub kind: ExprKind,
}

/// The value carried by a `Literal` expression node, one of the
/// four literal kinds {nil, bool, number, string}. Distinct from
/// [`crate::token::LiteralValue`], which describes what a *token* carries
/// (and has no `Bool` case, since `true`/`false` are reserved-word tokens,
/// not `NUMBER`/`STRING` tokens with a decoded payload).
#[derive(Debug, Clone, PartialEq)]
pub enum LitValue {
	Nil,
	Bool(bool),
	Number(f64),
	Str(String),
}

#[derive(Debug, Clone)]
pub enum ExprKind {
	Literal(LitValue),
	Grouping(Box<Expr>),
	Unary(Token, Box<Expr>),
	Binary(Box<Expr>, Token, Box<Expr>),
	Logical(Box<Expr>, Token, Box<Expr>),
	Variable(Token),
	Assign(Token, Box<Expr>),
	Call(Box<Expr>, Token, Vec<Expr>),
	Get(Box<Expr>, Token),
	Set(Box<Expr>, Token, Box<Expr>),
	This(Token),
	Super(Token, Token),
}

impl Expr {
	#[must_use]
	pub fn new(kind: ExprKind) -> Self {
		Self { id: next_id(), kind }
	}
}
