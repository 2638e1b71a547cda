//! User-declared functions and methods as runtime values.

use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::interpreter::class::Instance;
use crate::interpreter::environment::Environment;
use crate::interpreter::value::Value;

/// A function or method value: its declaration plus the environment it
/// closed over at the point it was declared, a function value whose
/// closure is the environment active at its declaration site.
pub struct LoxFunction {
	pub declaration: Rc<FunctionDecl>,
	pub closure: Environment,
	/// True only for a class's `init` method. Governs the special-cased
	/// return value in [`crate::interpreter::Interpreter::call_function`].
	pub is_initializer: bool,
}

impl LoxFunction {
	#[must_use]
	pub fn arity(&self) -> usize {
		self.declaration.params.len()
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.declaration.name.lexeme
	}

	/// Produces the method bound to `instance`: a new function value whose
	/// closure is a fresh environment, chained onto this function's own
	/// closure, defining `this`. Per the glossary's "Binding (a method)"
	/// entry.
	#[must_use]
	pub fn bind(self: &Rc<Self>, instance: Rc<Instance>) -> Rc<Self> {
		let env = Environment::new_enclosed(&self.closure);
		env.define("this", Value::Instance(instance));
		Rc::new(Self { declaration: Rc::clone(&self.declaration), closure: env, is_initializer: self.is_initializer })
	}
}
