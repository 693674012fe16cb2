use once_cell::sync::Lazy;
use regex::Regex;

use crate::style::{
	parser::ParseError,
	shared::TextRange,
	token::{Token, TokenKind},
};

const KEYWORDS: [&str; 7] = ["not", "and", "or", "nil", "true", "false", "self"];
const VALUE_KEYWORDS: [&str; 4] = ["nil", "true", "false", "self"];
const OPERATORS: [&str; 21] = [
	"||=", "&&=", "==", "!=", "<=", ">=", "&&", "||", "+=", "-=", "*=", "/=", "=", "+", "-", "*",
	"/", "%", "<", ">", "!",
];

static WORD_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:[?!](?:[^=]|$|==))?")
		.expect("Expected operation to succeed.")
});
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"^[0-9][0-9_]*(?:\.[0-9][0-9_]*)?").expect("Expected operation to succeed.")
});

pub(crate) fn tokenize(text: &str) -> Result<Vec<Token>, ParseError> {
	let bytes = text.as_bytes();
	let mut tokens: Vec<Token> = Vec::new();
	let mut idx = 0_usize;

	while idx < bytes.len() {
		let byte = bytes[idx];

		match byte {
			b' ' | b'\t' | b'\r' => {
				idx += 1;

				continue;
			},
			b'\\' if bytes.get(idx + 1) == Some(&b'\n') => {
				idx += 2;

				continue;
			},
			b'#' => {
				while idx < bytes.len() && bytes[idx] != b'\n' {
					idx += 1;
				}

				continue;
			},
			_ => {},
		}

		let (kind, end) = match byte {
			b'\n' => (TokenKind::Newline, idx + 1),
			b';' => (TokenKind::Semicolon, idx + 1),
			b',' => (TokenKind::Comma, idx + 1),
			b'(' => (TokenKind::LeftParen, idx + 1),
			b')' => (TokenKind::RightParen, idx + 1),
			b']' => (TokenKind::RightBracket, idx + 1),
			b'[' => {
				let kind = if tokens.last().is_some_and(|prev| ends_value(prev) && prev.range.end == idx)
				{
					TokenKind::LeftIndexBracket
				} else {
					TokenKind::LeftBracket
				};

				(kind, idx + 1)
			},
			b'.' => (TokenKind::Dot, idx + 1),
			b':' if bytes.get(idx + 1) == Some(&b':') => (TokenKind::DoubleColon, idx + 2),
			b':' => match WORD_RE.find(&text[idx + 1..]) {
				Some(word) => (TokenKind::Symbol, idx + 1 + word_len(word.as_str())),
				None => return Err(ParseError::UnexpectedChar { ch: ':', offset: idx }),
			},
			b'@' => match WORD_RE.find(&text[idx + 1..]) {
				Some(word) => (TokenKind::InstanceVariable, idx + 1 + word_len(word.as_str())),
				None => return Err(ParseError::UnexpectedChar { ch: '@', offset: idx }),
			},
			b'"' | b'\'' => (TokenKind::String, string_end(bytes, idx)?),
			b'0'..=b'9' => {
				let len = NUMBER_RE.find(&text[idx..]).map_or(1, |number| number.end());

				(TokenKind::Number, idx + len)
			},
			b'A'..=b'Z' | b'a'..=b'z' | b'_' => {
				let len = WORD_RE.find(&text[idx..]).map_or(1, |word| word_len(word.as_str()));
				let word = &text[idx..idx + len];
				let kind = if KEYWORDS.contains(&word) {
					TokenKind::Keyword
				} else if byte.is_ascii_uppercase() {
					TokenKind::Constant
				} else {
					TokenKind::Identifier
				};

				(kind, idx + len)
			},
			_ => match OPERATORS.iter().find(|op| text[idx..].starts_with(**op)) {
				Some(op) => {
					let kind = match *op {
						"=" => TokenKind::Assign,
						"||=" | "&&=" | "+=" | "-=" | "*=" | "/=" => TokenKind::OpAssign,
						_ => TokenKind::Operator,
					};

					(kind, idx + op.len())
				},
				None => {
					let ch = text[idx..].chars().next().unwrap_or_default();

					return Err(ParseError::UnexpectedChar { ch, offset: idx });
				},
			},
		};

		tokens.push(Token::new(kind, TextRange::new(idx, end), &text[idx..end]));

		idx = end;
	}

	Ok(tokens)
}

fn ends_value(token: &Token) -> bool {
	match token.kind {
		TokenKind::Identifier
		| TokenKind::Constant
		| TokenKind::InstanceVariable
		| TokenKind::Number
		| TokenKind::String
		| TokenKind::Symbol
		| TokenKind::RightParen
		| TokenKind::RightBracket => true,
		TokenKind::Keyword => VALUE_KEYWORDS.contains(&token.text.as_str()),
		_ => false,
	}
}

/// `WORD_RE` peeks one byte past a trailing `?`/`!` to reject `!=`; keep only the name.
fn word_len(matched: &str) -> usize {
	let bytes = matched.as_bytes();

	match bytes.iter().position(|byte| matches!(byte, b'?' | b'!')) {
		Some(pos) => pos + 1,
		None => bytes.len(),
	}
}

fn string_end(bytes: &[u8], start: usize) -> Result<usize, ParseError> {
	let quote = bytes[start];
	let mut idx = start + 1;

	while idx < bytes.len() {
		match bytes[idx] {
			b'\\' => idx += 2,
			byte if byte == quote => return Ok(idx + 1),
			_ => idx += 1,
		}
	}

	Err(ParseError::UnterminatedString { offset: start })
}
