//! Native (built-in) functions. Exactly one is defined: `clock`.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::interpreter::value::Value;

pub struct NativeFunction {
	pub name: &'static str,
	pub arity: usize,
	pub func: fn(&[Value]) -> Value,
}

/// `clock/0`: seconds since an unspecified epoch. We use the Unix epoch
/// via [`SystemTime`]; a clock error (time before the epoch)
/// falls back to `0.0` rather than panicking, since nothing in a Lox
/// program can observe *which* epoch was chosen, only that successive
/// calls increase.
fn clock(_arguments: &[Value]) -> Value {
	let seconds = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0.0, |duration| duration.as_secs_f64());
	Value::Number(seconds)
}

#[must_use]
pub fn clock_function() -> NativeFunction {
	NativeFunction { name: "clock", arity: 0, func: clock }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clock_returns_a_non_negative_number() {
		let Value::Number(seconds) = clock(&[]) else { panic!("clock must return a number") };
		assert!(seconds >= 0.0);
	}
}
