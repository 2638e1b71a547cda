//! The scanner: source text in, an ordered token sequence out.
//!
//! Single-pass and character-at-a-time, tracking a `start`/`current` byte
//! offset pair and a 1-based line counter, matched character-by-character
//! rather than by trying every token type's regex against the remaining
//! input, since Lox's lexical grammar needs at most one character of
//! lookahead.

use crate::diagnostics::Diagnostics;
use crate::token::{LiteralValue, Token, TokenKind};

/// Reserved words recognized after an identifier has been scanned in full.
/// A `phf::Map` gives O(1), allocation-free lookup with no runtime
/// construction cost.
static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
	"and" => TokenKind::And,
	"class" => TokenKind::Class,
	"else" => TokenKind::Else,
	"false" => TokenKind::False,
	"for" => TokenKind::For,
	"fun" => TokenKind::Fun,
	"if" => TokenKind::If,
	"nil" => TokenKind::Nil,
	"or" => TokenKind::Or,
	"print" => TokenKind::Print,
	"return" => TokenKind::Return,
	"super" => TokenKind::Super,
	"this" => TokenKind::This,
	"true" => TokenKind::True,
	"var" => TokenKind::Var,
	"while" => TokenKind::While,
};

/// Scans one source string into a token sequence terminated by a single
/// `EOF` token. Lexical errors (an unterminated string, an unrecognized
/// character) are reported through `diagnostics` and scanning continues, so
/// that a single run can surface more than one lexical error; scanning
/// itself never fails outright.
pub struct Scanner<'src> {
	source: &'src [u8],
	tokens: Vec<Token>,
	start: usize,
	current: usize,
	line: usize,
}

impl<'src> Scanner<'src> {
	#[must_use]
	pub fn new(source: &'src str) -> Self {
		Self { source: source.as_bytes(), tokens: Vec::new(), start: 0, current: 0, line: 1 }
	}

	pub fn scan_tokens(mut self, diagnostics: &mut Diagnostics) -> Vec<Token> {
		while !self.is_at_end() {
			self.start = self.current;
			self.scan_token(diagnostics);
		}

		self.tokens.push(Token::new(TokenKind::Eof, "", LiteralValue::None, self.line));
		self.tokens
	}

	fn scan_token(&mut self, diagnostics: &mut Diagnostics) {
		let c = self.advance();
		match c {
			b'(' => self.add_token(TokenKind::LeftParen),
			b')' => self.add_token(TokenKind::RightParen),
			b'{' => self.add_token(TokenKind::LeftBrace),
			b'}' => self.add_token(TokenKind::RightBrace),
			b',' => self.add_token(TokenKind::Comma),
			b'.' => self.add_token(TokenKind::Dot),
			b'-' => self.add_token(TokenKind::Minus),
			b'+' => self.add_token(TokenKind::Plus),
			b';' => self.add_token(TokenKind::Semicolon),
			b'*' => self.add_token(TokenKind::Star),
			b'!' => {
				let kind = if self.match_next(b'=') { TokenKind::BangEqual } else { TokenKind::Bang };
				self.add_token(kind);
			},
			b'=' => {
				let kind = if self.match_next(b'=') { TokenKind::EqualEqual } else { TokenKind::Equal };
				self.add_token(kind);
			},
			b'<' => {
				let kind = if self.match_next(b'=') { TokenKind::LessEqual } else { TokenKind::Less };
				self.add_token(kind);
			},
			b'>' => {
				let kind = if self.match_next(b'=') { TokenKind::GreaterEqual } else { TokenKind::Greater };
				self.add_token(kind);
			},
			b'/' => {
				if self.match_next(b'/') {
					// A line comment runs to the end of the line and emits nothing.
					while self.peek() != b'\n' && !self.is_at_end() {
						self.advance();
					}
				} else {
					self.add_token(TokenKind::Slash);
				}
			},
			b' ' | b'\r' | b'\t' => {},
			b'\n' => self.line += 1,
			b'"' => self.string(diagnostics),
			c if c.is_ascii_digit() => self.number(),
			c if is_identifier_start(c) => self.identifier(),
			_ => diagnostics.error(self.line, "Unexpected character."),
		}
	}

	fn string(&mut self, diagnostics: &mut Diagnostics) {
		while self.peek() != b'"' && !self.is_at_end() {
			if self.peek() == b'\n' {
				self.line += 1;
			}
			self.advance();
		}

		if self.is_at_end() {
			diagnostics.error(self.line, "Unterminated string.");
			return;
		}

		// Consume the closing quote.
		self.advance();

		let value = std::str::from_utf8(&self.source[self.start + 1..self.current - 1]).expect("Lox source is valid UTF-8").to_owned();
		self.add_literal(TokenKind::String, LiteralValue::Str(value));
	}

	fn number(&mut self) {
		while self.peek().is_ascii_digit() {
			self.advance();
		}

		// A fractional part requires a digit after the dot; a trailing dot
		// with nothing following is not consumed as part of the number.
		if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
			self.advance();
			while self.peek().is_ascii_digit() {
				self.advance();
			}
		}

		let text = self.lexeme_text();
		let value: f64 = text.parse().expect("scanned number lexeme is always a valid float literal");
		self.add_literal(TokenKind::Number, LiteralValue::Number(value));
	}

	fn identifier(&mut self) {
		while is_identifier_continue(self.peek()) {
			self.advance();
		}

		let text = self.lexeme_text();
		let kind = KEYWORDS.get(text.as_str()).copied().unwrap_or(TokenKind::Identifier);
		self.add_token(kind);
	}

	fn is_at_end(&self) -> bool {
		self.current >= self.source.len()
	}

	fn advance(&mut self) -> u8 {
		let c = self.source[self.current];
		self.current += 1;
		c
	}

	fn match_next(&mut self, expected: u8) -> bool {
		if self.is_at_end() || self.source[self.current] != expected {
			return false;
		}
		self.current += 1;
		true
	}

	fn peek(&self) -> u8 {
		if self.is_at_end() {
			b'\0'
		} else {
			self.source[self.current]
		}
	}

	fn peek_next(&self) -> u8 {
		self.source.get(self.current + 1).copied().unwrap_or(b'\0')
	}

	fn lexeme_text(&self) -> String {
		std::str::from_utf8(&self.source[self.start..self.current]).expect("Lox source is valid UTF-8").to_owned()
	}

	fn add_token(&mut self, kind: TokenKind) {
		self.add_literal(kind, LiteralValue::None);
	}

	fn add_literal(&mut self, kind: TokenKind, literal: LiteralValue) {
		let lexeme = self.lexeme_text();
		self.tokens.push(Token::new(kind, lexeme, literal, self.line));
	}
}

fn is_identifier_start(c: u8) -> bool {
	c.is_ascii_alphabetic() || c == b'_'
}

fn is_identifier_continue(c: u8) -> bool {
	c.is_ascii_alphanumeric() || c == b'_'
}

#[cfg(test)]
mod tests {
	use super::*;

	fn scan(source: &str) -> (Vec<Token>, Diagnostics) {
		let mut diagnostics = Diagnostics::new_boxed(Vec::new());
		let tokens = Scanner::new(source).scan_tokens(&mut diagnostics);
		(tokens, diagnostics)
	}

	#[test]
	fn scans_single_and_double_char_operators() {
		let (tokens, diagnostics) = scan("!= == <= >= < > = !");
		assert!(!diagnostics.had_error);
		let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
		assert_eq!(
			kinds,
			vec![
				TokenKind::BangEqual,
				TokenKind::EqualEqual,
				TokenKind::LessEqual,
				TokenKind::GreaterEqual,
				TokenKind::Less,
				TokenKind::Greater,
				TokenKind::Equal,
				TokenKind::Bang,
				TokenKind::Eof,
			]
		);
	}

	#[test]
	fn division_vs_line_comment() {
		let (tokens, _) = scan("1 / 2 // three\n4");
		let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
		assert_eq!(kinds, vec![TokenKind::Number, TokenKind::Slash, TokenKind::Number, TokenKind::Number, TokenKind::Eof]);
	}

	#[test]
	fn keywords_beat_identifiers() {
		let (tokens, _) = scan("class classy");
		assert_eq!(tokens[0].kind, TokenKind::Class);
		assert_eq!(tokens[1].kind, TokenKind::Identifier);
		assert_eq!(tokens[1].lexeme, "classy");
	}

	#[test]
	fn string_literal_strips_quotes_and_counts_newlines() {
		let (tokens, diagnostics) = scan("\"a\nb\" 1");
		assert!(!diagnostics.had_error);
		let TokenKind::String = tokens[0].kind else { panic!("expected string token") };
		assert_eq!(tokens[0].literal, LiteralValue::Str("a\nb".to_owned()));
		// The token after the string is on line 2.
		assert_eq!(tokens[1].line, 2);
	}

	#[test]
	fn unterminated_string_reports_error() {
		let (_, diagnostics) = scan("\"unterminated");
		assert!(diagnostics.had_error);
	}

	#[test]
	fn number_with_dangling_dot_stops_before_it() {
		let (tokens, _) = scan("4.");
		let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
		assert_eq!(kinds, vec![TokenKind::Number, TokenKind::Dot, TokenKind::Eof]);
	}

	#[test]
	fn unexpected_character_reports_error_and_is_discarded() {
		let (tokens, diagnostics) = scan("1 @ 2");
		assert!(diagnostics.had_error);
		let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
		assert_eq!(kinds, vec![TokenKind::Number, TokenKind::Number, TokenKind::Eof]);
	}
}
