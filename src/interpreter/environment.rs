//! Lexical environments. Chained frames, each a child of the one active
//! when it was pushed; `Rc<RefCell<_>>` so a closure's captured frame can
//! outlive the block that created it while the call stack still mutates it
//! in place.
//!
//! This is the simplest-correct-choice tradeoff: environments (and the
//! functions/instances that capture them) can form reference cycles, which
//! a pure `Rc` never collects. Nothing here runs a collector; the whole
//! interpreter session is itself an arena-of-one whose lifetime ends at
//! process exit, which reclaims whatever a session leaked. A long-running
//! embedding would need a mark-sweep pass instead.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::diagnostics::RuntimeError;
use crate::interpreter::value::Value;
use crate::token::Token;

struct EnvironmentData {
	values: HashMap<String, Value>,
	enclosing: Option<Environment>,
}

/// A lexical frame. Cloning an `Environment` clones the `Rc`, not the
/// frame; every clone shares the same underlying bindings.
#[derive(Clone)]
pub struct Environment(Rc<RefCell<EnvironmentData>>);

impl Environment {
	#[must_use]
	pub fn new_global() -> Self {
		Self(Rc::new(RefCell::new(EnvironmentData { values: HashMap::new(), enclosing: None })))
	}

	#[must_use]
	pub fn new_enclosed(enclosing: &Self) -> Self {
		Self(Rc::new(RefCell::new(EnvironmentData { values: HashMap::new(), enclosing: Some(enclosing.clone_ref()) })))
	}

	/// Explicit `Rc` clone, named to satisfy `clippy::clone_on_ref_ptr`
	/// without hiding that it's a pointer copy, not a deep copy.
	fn clone_ref(&self) -> Self {
		Self(Rc::clone(&self.0))
	}

	/// Defines (or redefines) a binding in this frame. Used for `var`
	/// declarations, function declarations, and parameter binding, all of
	/// which are unconditional inserts, never conditioned on prior presence.
	pub fn define(&self, name: &str, value: Value) {
		self.0.borrow_mut().values.insert(name.to_owned(), value);
	}

	fn ancestor(&self, distance: usize) -> Self {
		let mut current = self.clone_ref();
		for _ in 0..distance {
			let next = current.0.borrow().enclosing.as_ref().map(Environment::clone_ref).expect("resolver-recorded depth must stay within the environment chain");
			current = next;
		}
		current
	}

	/// Reads a binding at a resolver-recorded depth. Panics if the binding
	/// is missing there: the resolver and evaluator agree on environment
	/// shape, so a miss here means the two have drifted apart, not a user
	/// error.
	#[must_use]
	pub fn get_at(&self, distance: usize, name: &str) -> Value {
		self.ancestor(distance).0.borrow().values.get(name).cloned().expect("resolver-recorded binding must exist at the recorded depth")
	}

	pub fn assign_at(&self, distance: usize, name: &str, value: Value) {
		self.ancestor(distance).0.borrow_mut().values.insert(name.to_owned(), value);
	}

	/// Looks a name up directly in this frame, bypassing resolver depth.
	/// Used only for the globals frame, for the "otherwise, look up in
	/// globals" fallback.
	pub fn get_global(&self, name: &Token) -> Result<Value, RuntimeError> {
		self.0.borrow().values.get(name.lexeme.as_str()).cloned().ok_or_else(|| RuntimeError::new(name.line, format!("Undefined variable '{}'.", name.lexeme)))
	}

	pub fn assign_global(&self, name: &Token, value: Value) -> Result<(), RuntimeError> {
		let mut data = self.0.borrow_mut();
		if data.values.contains_key(name.lexeme.as_str()) {
			data.values.insert(name.lexeme.clone(), value);
			Ok(())
		} else {
			Err(RuntimeError::new(name.line, format!("Undefined variable '{}'.", name.lexeme)))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::token::TokenKind;

	fn token(lexeme: &str) -> Token {
		Token::new(TokenKind::Identifier, lexeme, crate::token::LiteralValue::None, 1)
	}

	#[test]
	fn nested_scope_reads_parent_binding_at_its_depth() {
		let globals = Environment::new_global();
		globals.define("a", Value::Number(1.0));
		let child = Environment::new_enclosed(&globals);
		let grandchild = Environment::new_enclosed(&child);
		assert_eq!(grandchild.get_at(2, "a"), Value::Number(1.0));
	}

	#[test]
	fn assign_at_mutates_shared_frame() {
		let globals = Environment::new_global();
		globals.define("a", Value::Number(1.0));
		let child = Environment::new_enclosed(&globals);
		child.assign_at(1, "a", Value::Number(2.0));
		assert_eq!(globals.get_global(&token("a")).unwrap(), Value::Number(2.0));
	}

	#[test]
	fn undefined_global_is_a_runtime_error() {
		let globals = Environment::new_global();
		assert!(globals.get_global(&token("missing")).is_err());
	}

	#[test]
	fn assign_global_to_undefined_name_errors() {
		let globals = Environment::new_global();
		assert!(globals.assign_global(&token("missing"), Value::Nil).is_err());
	}
}
