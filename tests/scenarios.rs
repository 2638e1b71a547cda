//! End-to-end tests driving the compiled `lox` binary: closures, classes,
//! inheritance, runtime errors, and the CLI exit-code contract.

use std::io::Write as _;

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use unindent::Unindent as _;

fn lox() -> Command {
	Command::cargo_bin("lox").expect("the `lox` binary should build")
}

fn script_file(source: &str) -> tempfile::NamedTempFile {
	let mut file = tempfile::Builder::new().suffix(".lox").tempfile().expect("tempfile creation should succeed");
	file.write_all(source.unindent().as_bytes()).expect("writing the fixture script should succeed");
	file
}

#[test]
fn scenario_1_arithmetic_precedence() {
	let file = script_file("print 1 + 2 * 3;");
	lox().arg(file.path()).assert().success().stdout("7\n");
}

#[test]
fn scenario_2_closure_captures_outer_binding() {
	let file = script_file(
		r#"
		var a = "global";
		{
			fun f() { print a; }
			var a = "local";
			f();
		}
		"#,
	);
	lox().arg(file.path()).assert().success().stdout("global\n");
}

#[test]
fn scenario_3_method_call() {
	let file = script_file(
		r#"
		class Bagel {
			eat() { print "yum"; }
		}
		Bagel().eat();
		"#,
	);
	lox().arg(file.path()).assert().success().stdout("yum\n");
}

#[test]
fn scenario_4_super_dispatch() {
	let file = script_file(
		r#"
		class A {
			hi() { print "A"; }
		}
		class B < A {
			hi() {
				super.hi();
				print "B";
			}
		}
		B().hi();
		"#,
	);
	lox().arg(file.path()).assert().success().stdout("A\nB\n");
}

#[test]
fn scenario_5_closure_over_mutable_counter() {
	let file = script_file(
		r#"
		fun makeCounter() {
			var i = 0;
			fun c() {
				i = i + 1;
				print i;
			}
			return c;
		}
		var c = makeCounter();
		c();
		c();
		"#,
	);
	lox().arg(file.path()).assert().success().stdout("1\n2\n");
}

#[test]
fn scenario_6_runtime_type_error_exits_70() {
	let file = script_file(r#"print "a" + 1;"#);
	lox().arg(file.path()).assert().code(70).stdout("").stderr(predicate::str::contains("Operands must be two numbers or two strings."));
}

#[test]
fn parse_error_exits_65_and_skips_evaluation() {
	let file = script_file("print ;");
	lox().arg(file.path()).assert().code(65).stdout("").stderr(predicate::str::contains("Error"));
}

#[test]
fn missing_script_file_exits_74() {
	lox().arg("/no/such/file.lox").assert().code(74);
}

#[test]
fn too_many_arguments_is_a_usage_error() {
	lox().args(["a.lox", "b.lox"]).assert().code(64).stderr(predicate::str::contains("Usage"));
}

#[test]
fn for_loop_runs_exactly_n_times() {
	let file = script_file("for (var i = 0; i < 3; i = i + 1) print i;");
	let output = lox().arg(file.path()).assert().success();
	assert_eq!(String::from_utf8(output.get_output().stdout.clone()).unwrap(), "0\n1\n2\n");
}

#[test]
fn repl_echoes_trailing_bare_expression() {
	lox().write_stdin("1 + 1\n").assert().success().stdout(predicate::str::contains("2"));
}
