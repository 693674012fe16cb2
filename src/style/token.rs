use std::ops::Range;

use crate::style::shared::TextRange;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum TokenKind {
	Identifier,
	Constant,
	InstanceVariable,
	Keyword,
	Number,
	String,
	Symbol,
	LeftParen,
	RightParen,
	/// `[` opening an array literal.
	LeftBracket,
	/// `[` directly after a receiver, opening a reference access.
	LeftIndexBracket,
	RightBracket,
	Dot,
	DoubleColon,
	Comma,
	Operator,
	Assign,
	OpAssign,
	Newline,
	Semicolon,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Token {
	pub(crate) kind: TokenKind,
	pub(crate) range: TextRange,
	pub(crate) text: String,
}
impl Token {
	pub(crate) fn new(kind: TokenKind, range: TextRange, text: &str) -> Self {
		Self { kind, range, text: text.to_owned() }
	}

	pub(crate) fn is_keyword(&self, keyword: &str) -> bool {
		self.kind == TokenKind::Keyword && self.text == keyword
	}
}

/// Tokens ordered by start offset. Span lookups binary-search both boundaries, so scans
/// stay inside the queried node.
#[derive(Debug, Default)]
pub(crate) struct TokenIndex {
	tokens: Vec<Token>,
}
impl TokenIndex {
	pub(crate) fn new(mut tokens: Vec<Token>) -> Self {
		tokens.sort_by_key(|token| (token.range.start, token.range.end));

		Self { tokens }
	}

	pub(crate) fn get(&self, idx: usize) -> Option<&Token> {
		self.tokens.get(idx)
	}

	pub(crate) fn next_token(&self, idx: usize) -> Option<&Token> {
		self.tokens.get(idx.checked_add(1)?)
	}

	pub(crate) fn previous_token(&self, idx: usize) -> Option<&Token> {
		self.tokens.get(idx.checked_sub(1)?)
	}

	pub(crate) fn tokens_in(&self, range: TextRange) -> &[Token] {
		&self.tokens[self.bounds(range)]
	}

	/// Nearest token of `kind` ending at or before `pos`, scanning backward inside `within`.
	pub(crate) fn last_of_kind_at_or_before(
		&self,
		kind: TokenKind,
		pos: usize,
		within: TextRange,
	) -> Option<usize> {
		let bounds = self.bounds(within);
		let span = &self.tokens[bounds.clone()];
		let upper = span.partition_point(|token| token.range.end <= pos);

		span[..upper].iter().rposition(|token| token.kind == kind).map(|idx| bounds.start + idx)
	}

	/// First token of `kind` starting at or after `pos`, scanning forward inside `within`.
	pub(crate) fn first_of_kind_after(
		&self,
		kind: TokenKind,
		pos: usize,
		within: TextRange,
	) -> Option<usize> {
		let bounds = self.bounds(within);
		let span = &self.tokens[bounds.clone()];
		let lower = span.partition_point(|token| token.range.start < pos);

		span[lower..].iter().position(|token| token.kind == kind).map(|idx| bounds.start + lower + idx)
	}

	fn bounds(&self, range: TextRange) -> Range<usize> {
		let lower = self.tokens.partition_point(|token| token.range.start < range.start);
		let upper = self.tokens.partition_point(|token| token.range.end <= range.end);

		lower..upper.max(lower)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn index() -> TokenIndex {
		// a[b[c]]
		TokenIndex::new(vec![
			Token::new(TokenKind::Identifier, TextRange::new(0, 1), "a"),
			Token::new(TokenKind::LeftIndexBracket, TextRange::new(1, 2), "["),
			Token::new(TokenKind::Identifier, TextRange::new(2, 3), "b"),
			Token::new(TokenKind::LeftIndexBracket, TextRange::new(3, 4), "["),
			Token::new(TokenKind::Identifier, TextRange::new(4, 5), "c"),
			Token::new(TokenKind::RightBracket, TextRange::new(5, 6), "]"),
			Token::new(TokenKind::RightBracket, TextRange::new(6, 7), "]"),
		])
	}

	#[test]
	fn span_query_returns_contained_tokens() {
		let index = index();
		let texts = index
			.tokens_in(TextRange::new(2, 6))
			.iter()
			.map(|token| token.text.as_str())
			.collect::<Vec<_>>();

		assert_eq!(texts, vec!["b", "[", "c", "]"]);
		assert!(index.tokens_in(TextRange::new(3, 3)).is_empty());
	}

	#[test]
	fn backward_scan_respects_position() {
		let index = index();
		let whole = TextRange::new(0, 7);

		assert_eq!(index.last_of_kind_at_or_before(TokenKind::LeftIndexBracket, 7, whole), Some(3));
		assert_eq!(index.last_of_kind_at_or_before(TokenKind::LeftIndexBracket, 2, whole), Some(1));
		assert_eq!(index.last_of_kind_at_or_before(TokenKind::LeftIndexBracket, 1, whole), None);
		assert_eq!(
			index.last_of_kind_at_or_before(TokenKind::LeftIndexBracket, 7, TextRange::new(2, 7)),
			Some(3)
		);
	}

	#[test]
	fn forward_scan_is_bounded_by_span() {
		let index = index();

		assert_eq!(
			index.first_of_kind_after(TokenKind::RightBracket, 6, TextRange::new(0, 7)),
			Some(6)
		);
		assert_eq!(
			index.first_of_kind_after(TokenKind::RightBracket, 2, TextRange::new(0, 7)),
			Some(5)
		);
		assert_eq!(index.first_of_kind_after(TokenKind::RightBracket, 2, TextRange::new(2, 5)), None);
	}

	#[test]
	fn neighbours_stop_at_the_ends() {
		let index = index();

		assert_eq!(index.next_token(1).map(|token| token.text.as_str()), Some("b"));
		assert_eq!(index.previous_token(1).map(|token| token.text.as_str()), Some("a"));
		assert!(index.previous_token(0).is_none());
		assert!(index.next_token(6).is_none());
	}
}
