//! Classes and the instances they produce.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::diagnostics::RuntimeError;
use crate::interpreter::function::LoxFunction;
use crate::interpreter::value::{Callable, Value};
use crate::token::Token;

pub struct LoxClass {
	pub name: String,
	pub superclass: Option<Rc<LoxClass>>,
	pub methods: HashMap<String, Rc<LoxFunction>>,
}

impl LoxClass {
	/// Walks the superclass chain looking for a method.
	#[must_use]
	pub fn find_method(&self, name: &str) -> Option<Rc<LoxFunction>> {
		self.methods.get(name).map(Rc::clone).or_else(|| self.superclass.as_ref().and_then(|superclass| superclass.find_method(name)))
	}

	/// A class's call arity is its initializer's arity, or zero if it (and
	/// no ancestor) defines one.
	#[must_use]
	pub fn arity(&self) -> usize {
		self.find_method("init").map_or(0, |init| init.arity())
	}
}

pub struct Instance {
	pub class: Rc<LoxClass>,
	fields: RefCell<HashMap<String, Value>>,
}

impl Instance {
	#[must_use]
	pub fn new(class: Rc<LoxClass>) -> Rc<Self> {
		Rc::new(Self { class, fields: RefCell::new(HashMap::new()) })
	}

	/// Fields shadow methods: check the instance's own fields first,
	/// falling back to a bound method, falling back to an error.
	pub fn get(self: &Rc<Self>, name: &Token) -> Result<Value, RuntimeError> {
		if let Some(value) = self.fields.borrow().get(name.lexeme.as_str()) {
			return Ok(value.clone());
		}
		if let Some(method) = self.class.find_method(&name.lexeme) {
			let bound = method.bind(Rc::clone(self));
			return Ok(Value::Callable(Callable::Function(bound)));
		}
		Err(RuntimeError::new(name.line, format!("Undefined property '{}'.", name.lexeme)))
	}

	pub fn set(&self, name: &Token, value: Value) {
		self.fields.borrow_mut().insert(name.lexeme.clone(), value);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn class(name: &str, superclass: Option<Rc<LoxClass>>, methods: HashMap<String, Rc<LoxFunction>>) -> Rc<LoxClass> {
		Rc::new(LoxClass { name: name.to_owned(), superclass, methods })
	}

	#[test]
	fn find_method_falls_back_through_superclass_chain() {
		let mut parent_methods = HashMap::new();
		parent_methods.insert("greet".to_owned(), Rc::new(LoxFunction { declaration: Rc::new(crate::ast::FunctionDecl { name: crate::token::Token::new(crate::token::TokenKind::Identifier, "greet", crate::token::LiteralValue::None, 1), params: Vec::new(), body: Vec::new() }), closure: crate::interpreter::environment::Environment::new_global(), is_initializer: false }));
		let parent = class("Parent", None, parent_methods);
		let child = class("Child", Some(Rc::clone(&parent)), HashMap::new());
		assert!(child.find_method("greet").is_some());
		assert!(child.find_method("nope").is_none());
	}

	#[test]
	fn arity_with_no_initializer_is_zero() {
		let c = class("Empty", None, HashMap::new());
		assert_eq!(c.arity(), 0);
	}
}
