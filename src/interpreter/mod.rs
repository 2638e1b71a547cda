//! The evaluator: walks the AST, consulting the resolver's side-table,
//! producing effects (`print`, REPL echo) and runtime errors. It owns a
//! single globals environment and a mutable current-environment pointer
//! threaded through execution.

pub mod class;
pub mod environment;
pub mod function;
pub mod native;
pub mod value;

use std::io::Write;
use std::rc::Rc;

use crate::ast::{Expr, ExprId, ExprKind, LitValue, Stmt};
use crate::diagnostics::{Diagnostics, RuntimeError};
use crate::interpreter::class::{Instance, LoxClass};
use crate::interpreter::environment::Environment;
use crate::interpreter::function::LoxFunction;
use crate::interpreter::value::{stringify, Callable, Value};
use crate::resolver::Locals;
use crate::token::{Token, TokenKind};

/// How a statement execution can end other than falling through normally.
/// This replaces a thrown-value approach to `return` with an explicit
/// result-union that block execution propagates up to the call frame;
/// it's never surfaced to user code.
pub enum Unwind {
	Return(Value),
	Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
	fn from(error: RuntimeError) -> Self {
		Unwind::Error(error)
	}
}

type ExecResult = Result<(), Unwind>;
type EvalResult = Result<Value, RuntimeError>;

pub struct Interpreter {
	globals: Environment,
	environment: Environment,
	locals: Locals,
	out: Box<dyn Write>,
}

impl Interpreter {
	#[must_use]
	pub fn new(out: impl Write + 'static) -> Self {
		let globals = Environment::new_global();
		globals.define("clock", Value::Callable(Callable::Native(Rc::new(crate::interpreter::native::clock_function()))));
		Self { environment: globals.clone(), globals, locals: Locals::new(), out: Box::new(out) }
	}

	/// Merges in one REPL line's (or one file's) worth of resolver output.
	/// Cumulative across a REPL session, since `ExprId`s are unique
	/// process-wide: a closure declared several prompts ago still carries
	/// the depth recorded for it then.
	pub fn load_locals(&mut self, locals: Locals) {
		self.locals.extend(locals);
	}

	/// Runs a full statement sequence. In REPL mode, a trailing `Expression`
	/// statement is evaluated and its value printed instead of discarded.
	pub fn interpret(&mut self, statements: &[Stmt], diagnostics: &mut Diagnostics, repl: bool) {
		if repl {
			if let [init @ .., Stmt::Expression(expr)] = statements {
				for stmt in init {
					if let Err(Unwind::Error(error)) = self.execute(stmt) {
						diagnostics.runtime_error(&error);
						return;
					}
				}
				match self.evaluate(expr) {
					Ok(value) => {
						let _ = writeln!(self.out, "{}", stringify(&value));
					},
					Err(error) => diagnostics.runtime_error(&error),
				}
				return;
			}
		}
		for stmt in statements {
			match self.execute(stmt) {
				Ok(()) => {},
				Err(Unwind::Error(error)) => {
					diagnostics.runtime_error(&error);
					return;
				},
				Err(Unwind::Return(_)) => unreachable!("the resolver forbids `return` outside a function"),
			}
		}
	}

	fn execute(&mut self, stmt: &Stmt) -> ExecResult {
		match stmt {
			Stmt::Expression(expr) => {
				self.evaluate(expr)?;
				Ok(())
			},
			Stmt::Print(expr) => {
				let value = self.evaluate(expr)?;
				writeln!(self.out, "{}", stringify(&value)).expect("writing to the print sink should not fail");
				Ok(())
			},
			Stmt::Var(name, initializer) => {
				let value = match initializer {
					Some(expr) => self.evaluate(expr)?,
					None => Value::Nil,
				};
				self.environment.define(&name.lexeme, value);
				Ok(())
			},
			Stmt::Block(statements) => self.execute_block(statements, Environment::new_enclosed(&self.environment)),
			Stmt::If(condition, then_branch, else_branch) => {
				if self.evaluate(condition)?.is_truthy() {
					self.execute(then_branch)
				} else if let Some(else_branch) = else_branch {
					self.execute(else_branch)
				} else {
					Ok(())
				}
			},
			Stmt::While(condition, body) => {
				while self.evaluate(condition)?.is_truthy() {
					self.execute(body)?;
				}
				Ok(())
			},
			Stmt::Function(decl) => {
				let function = Rc::new(LoxFunction { declaration: Rc::clone(decl), closure: self.environment.clone(), is_initializer: false });
				self.environment.define(&decl.name.lexeme, Value::Callable(Callable::Function(function)));
				Ok(())
			},
			Stmt::Return(_, value) => {
				let value = match value {
					Some(expr) => self.evaluate(expr)?,
					None => Value::Nil,
				};
				Err(Unwind::Return(value))
			},
			Stmt::Class(name, superclass_expr, methods) => self.execute_class(name, superclass_expr.as_ref(), methods),
		}
	}

	/// Runs `statements` with `new_env` as the current environment,
	/// restoring the previous one on every exit path: normal completion,
	/// a runtime error, or a non-local `return`.
	fn execute_block(&mut self, statements: &[Stmt], new_env: Environment) -> ExecResult {
		let previous = std::mem::replace(&mut self.environment, new_env);
		let result = statements.iter().try_for_each(|stmt| self.execute(stmt));
		self.environment = previous;
		result
	}

	fn execute_class(&mut self, name: &Token, superclass_expr: Option<&Expr>, methods: &[Rc<crate::ast::FunctionDecl>]) -> ExecResult {
		let superclass = match superclass_expr {
			Some(expr) => match self.evaluate(expr)? {
				Value::Callable(Callable::Class(class)) => Some(class),
				_ => return Err(RuntimeError::new(name.line, "Superclass must be a class.").into()),
			},
			None => None,
		};

		self.environment.define(&name.lexeme, Value::Nil);

		let previous_env = self.environment.clone();
		if let Some(superclass) = &superclass {
			let super_env = Environment::new_enclosed(&self.environment);
			super_env.define("super", Value::Callable(Callable::Class(Rc::clone(superclass))));
			self.environment = super_env;
		}

		let method_map = methods
			.iter()
			.map(|decl| {
				let is_initializer = decl.name.lexeme == "init";
				let function = Rc::new(LoxFunction { declaration: Rc::clone(decl), closure: self.environment.clone(), is_initializer });
				(decl.name.lexeme.clone(), function)
			})
			.collect();

		let class = Rc::new(LoxClass { name: name.lexeme.clone(), superclass, methods: method_map });

		self.environment = previous_env;
		self.environment.define(&name.lexeme, Value::Callable(Callable::Class(class)));
		Ok(())
	}

	fn evaluate(&mut self, expr: &Expr) -> EvalResult {
		match &expr.kind {
			ExprKind::Literal(literal) => Ok(literal_value(literal)),
			ExprKind::Grouping(inner) => self.evaluate(inner),
			ExprKind::Unary(operator, operand) => self.evaluate_unary(operator, operand),
			ExprKind::Binary(left, operator, right) => self.evaluate_binary(left, operator, right),
			ExprKind::Logical(left, operator, right) => self.evaluate_logical(left, operator, right),
			ExprKind::Variable(name) => self.look_up_variable(expr.id, name),
			ExprKind::Assign(name, value) => self.evaluate_assign(expr.id, name, value),
			ExprKind::Call(callee, paren, arguments) => self.evaluate_call(callee, paren, arguments),
			ExprKind::Get(object, name) => self.evaluate_get(object, name),
			ExprKind::Set(object, name, value) => self.evaluate_set(object, name, value),
			ExprKind::This(keyword) => self.look_up_variable(expr.id, keyword),
			ExprKind::Super(_, method_name) => self.evaluate_super(expr.id, method_name),
		}
	}

	fn evaluate_unary(&mut self, operator: &Token, operand: &Expr) -> EvalResult {
		let value = self.evaluate(operand)?;
		match operator.kind {
			TokenKind::Minus => Ok(Value::Number(-number_operand(&value, operator)?)),
			TokenKind::Bang => Ok(Value::Bool(!value.is_truthy())),
			_ => unreachable!("the parser only ever builds Unary with `!` or `-`"),
		}
	}

	fn evaluate_binary(&mut self, left: &Expr, operator: &Token, right: &Expr) -> EvalResult {
		let left = self.evaluate(left)?;
		let right = self.evaluate(right)?;
		match operator.kind {
			TokenKind::Minus => {
				let (a, b) = number_operands(&left, &right, operator)?;
				Ok(Value::Number(a - b))
			},
			TokenKind::Slash => {
				let (a, b) = number_operands(&left, &right, operator)?;
				Ok(Value::Number(a / b))
			},
			TokenKind::Star => {
				let (a, b) = number_operands(&left, &right, operator)?;
				Ok(Value::Number(a * b))
			},
			TokenKind::Plus => evaluate_plus(&left, &right, operator),
			TokenKind::Greater => {
				let (a, b) = number_operands(&left, &right, operator)?;
				Ok(Value::Bool(a > b))
			},
			TokenKind::GreaterEqual => {
				let (a, b) = number_operands(&left, &right, operator)?;
				Ok(Value::Bool(a >= b))
			},
			TokenKind::Less => {
				let (a, b) = number_operands(&left, &right, operator)?;
				Ok(Value::Bool(a < b))
			},
			TokenKind::LessEqual => {
				let (a, b) = number_operands(&left, &right, operator)?;
				Ok(Value::Bool(a <= b))
			},
			TokenKind::BangEqual => Ok(Value::Bool(left != right)),
			TokenKind::EqualEqual => Ok(Value::Bool(left == right)),
			_ => unreachable!("the parser only ever builds Binary with an arithmetic/comparison/equality operator"),
		}
	}

	fn evaluate_logical(&mut self, left: &Expr, operator: &Token, right: &Expr) -> EvalResult {
		let left = self.evaluate(left)?;
		let left_decides = if operator.kind == TokenKind::Or { left.is_truthy() } else { !left.is_truthy() };
		if left_decides {
			Ok(left)
		} else {
			self.evaluate(right)
		}
	}

	fn look_up_variable(&self, id: ExprId, name: &Token) -> EvalResult {
		if let Some(&distance) = self.locals.get(&id) {
			Ok(self.environment.get_at(distance, &name.lexeme))
		} else {
			self.globals.get_global(name)
		}
	}

	fn evaluate_assign(&mut self, id: ExprId, name: &Token, value_expr: &Expr) -> EvalResult {
		let value = self.evaluate(value_expr)?;
		if let Some(&distance) = self.locals.get(&id) {
			self.environment.assign_at(distance, &name.lexeme, value.clone());
		} else {
			self.globals.assign_global(name, value.clone())?;
		}
		Ok(value)
	}

	fn evaluate_call(&mut self, callee: &Expr, paren: &Token, argument_exprs: &[Expr]) -> EvalResult {
		let callee = self.evaluate(callee)?;
		let mut arguments = Vec::with_capacity(argument_exprs.len());
		for argument in argument_exprs {
			arguments.push(self.evaluate(argument)?);
		}
		let Value::Callable(callable) = callee else {
			return Err(RuntimeError::new(paren.line, "Can only call functions and classes."));
		};
		let arity = match &callable {
			Callable::Function(f) => f.arity(),
			Callable::Native(n) => n.arity,
			Callable::Class(c) => c.arity(),
		};
		if arguments.len() != arity {
			return Err(RuntimeError::new(paren.line, format!("Expected {arity} arguments but got {}.", arguments.len())));
		}
		match callable {
			Callable::Function(function) => self.call_function(&function, arguments),
			Callable::Native(native) => Ok((native.func)(&arguments)),
			Callable::Class(class) => self.instantiate(&class, arguments),
		}
	}

	/// Calls a user function or bound method. A `return` (including the
	/// initializer's implicit one) unwinds out of [`Self::execute_block`]
	/// as `Unwind::Return` and is caught here, never reaching the caller of
	/// `call_function` as a control-flow event, only as its return value.
	fn call_function(&mut self, function: &Rc<LoxFunction>, arguments: Vec<Value>) -> EvalResult {
		let call_env = Environment::new_enclosed(&function.closure);
		for (param, argument) in function.declaration.params.iter().zip(arguments) {
			call_env.define(&param.lexeme, argument);
		}
		let outcome = self.execute_block(&function.declaration.body, call_env);
		if function.is_initializer {
			return Ok(function.closure.get_at(0, "this"));
		}
		match outcome {
			Ok(()) => Ok(Value::Nil),
			Err(Unwind::Return(value)) => Ok(value),
			Err(Unwind::Error(error)) => Err(error),
		}
	}

	fn instantiate(&mut self, class: &Rc<LoxClass>, arguments: Vec<Value>) -> EvalResult {
		let instance = Instance::new(Rc::clone(class));
		if let Some(initializer) = class.find_method("init") {
			let bound = initializer.bind(Rc::clone(&instance));
			self.call_function(&bound, arguments)?;
		}
		Ok(Value::Instance(instance))
	}

	fn evaluate_get(&mut self, object: &Expr, name: &Token) -> EvalResult {
		match self.evaluate(object)? {
			Value::Instance(instance) => instance.get(name),
			_ => Err(RuntimeError::new(name.line, "Only instances have properties.")),
		}
	}

	fn evaluate_set(&mut self, object: &Expr, name: &Token, value_expr: &Expr) -> EvalResult {
		let Value::Instance(instance) = self.evaluate(object)? else {
			return Err(RuntimeError::new(name.line, "Only instances have fields."));
		};
		let value = self.evaluate(value_expr)?;
		instance.set(name, value.clone());
		Ok(value)
	}

	fn evaluate_super(&mut self, id: ExprId, method_name: &Token) -> EvalResult {
		let distance = *self.locals.get(&id).expect("the resolver always records a depth for a valid Super node");
		let Value::Callable(Callable::Class(superclass)) = self.environment.get_at(distance, "super") else {
			unreachable!("`super` always resolves to a class value");
		};
		let Value::Instance(instance) = self.environment.get_at(distance - 1, "this") else {
			unreachable!("`this` always sits exactly one environment inside `super`");
		};
		let method = superclass.find_method(&method_name.lexeme).ok_or_else(|| RuntimeError::new(method_name.line, format!("Undefined property '{}'.", method_name.lexeme)))?;
		Ok(Value::Callable(Callable::Function(method.bind(instance))))
	}
}

fn literal_value(literal: &LitValue) -> Value {
	match literal {
		LitValue::Nil => Value::Nil,
		LitValue::Bool(b) => Value::Bool(*b),
		LitValue::Number(n) => Value::Number(*n),
		LitValue::Str(s) => Value::Str(Rc::from(s.as_str())),
	}
}

fn number_operand(value: &Value, operator: &Token) -> Result<f64, RuntimeError> {
	match value {
		Value::Number(n) => Ok(*n),
		_ => Err(RuntimeError::new(operator.line, "Operand must be a number.")),
	}
}

fn number_operands(left: &Value, right: &Value, operator: &Token) -> Result<(f64, f64), RuntimeError> {
	match (left, right) {
		(Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
		_ => Err(RuntimeError::new(operator.line, "Operands must be numbers.")),
	}
}

fn evaluate_plus(left: &Value, right: &Value, operator: &Token) -> EvalResult {
	match (left, right) {
		(Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
		(Value::Str(a), Value::Str(b)) => Ok(Value::Str(Rc::from(format!("{a}{b}")))),
		_ => Err(RuntimeError::new(operator.line, "Operands must be two numbers or two strings.")),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::parser::parse;
	use crate::resolver::Resolver;
	use crate::scanner::Scanner;

	fn run(source: &str) -> (String, bool, bool) {
		let mut diagnostics = Diagnostics::new_boxed(Vec::new());
		let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
		let statements = parse(&tokens, &mut diagnostics, false);
		let locals = Resolver::new(&mut diagnostics).resolve(&statements);
		let out = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
		let mut interpreter = Interpreter::new(SharedWriter(std::rc::Rc::clone(&out)));
		interpreter.load_locals(locals);
		interpreter.interpret(&statements, &mut diagnostics, false);
		let output = String::from_utf8(out.borrow().clone()).unwrap();
		(output, diagnostics.had_error, diagnostics.had_runtime_error)
	}

	struct SharedWriter(std::rc::Rc<std::cell::RefCell<Vec<u8>>>);
	impl Write for SharedWriter {
		fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
			self.0.borrow_mut().write(buf)
		}
		fn flush(&mut self) -> std::io::Result<()> {
			Ok(())
		}
	}

	#[test]
	fn arithmetic_precedence() {
		let (output, had_error, had_runtime_error) = run("print 1 + 2 * 3;");
		assert!(!had_error && !had_runtime_error);
		assert_eq!(output, "7\n");
	}

	#[test]
	fn closure_captures_outer_binding_per_resolver_depth() {
		let (output, had_error, had_runtime_error) = run(r#"var a = "global"; { fun f() { print a; } var a = "local"; f(); }"#);
		assert!(!had_error && !had_runtime_error);
		assert_eq!(output, "global\n");
	}

	#[test]
	fn method_call_on_instance() {
		let (output, had_error, had_runtime_error) = run(r#"class Bagel { eat() { print "yum"; } } Bagel().eat();"#);
		assert!(!had_error && !had_runtime_error);
		assert_eq!(output, "yum\n");
	}

	#[test]
	fn super_call_dispatches_to_parent_method() {
		let (output, had_error, had_runtime_error) = run(r#"class A { hi() { print "A"; } } class B < A { hi() { super.hi(); print "B"; } } B().hi();"#);
		assert!(!had_error && !had_runtime_error);
		assert_eq!(output, "A\nB\n");
	}

	#[test]
	fn closure_over_mutable_counter_observes_latest_assignment() {
		let (output, had_error, had_runtime_error) = run("fun makeCounter() { var i = 0; fun c() { i = i + 1; print i; } return c; } var c = makeCounter(); c(); c();");
		assert!(!had_error && !had_runtime_error);
		assert_eq!(output, "1\n2\n");
	}

	#[test]
	fn adding_string_and_number_is_a_runtime_error() {
		let (_, _, had_runtime_error) = run(r#"print "a" + 1;"#);
		assert!(had_runtime_error);
	}

	#[test]
	fn initializer_always_returns_the_instance() {
		let (output, had_error, had_runtime_error) = run(r#"class Thing { init() { return; } } var t = Thing(); print t;"#);
		assert!(!had_error && !had_runtime_error);
		assert_eq!(output, "Thing instance\n");
	}

	#[test]
	fn for_loop_executes_body_exactly_n_times() {
		let (output, had_error, had_runtime_error) = run("for (var i = 0; i < 3; i = i + 1) print i;");
		assert!(!had_error && !had_runtime_error);
		assert_eq!(output, "0\n1\n2\n");
	}

	#[test]
	fn accessing_undefined_field_is_a_runtime_error() {
		let (_, _, had_runtime_error) = run("class A {} var a = A(); print a.missing;");
		assert!(had_runtime_error);
	}
}
