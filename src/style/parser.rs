//! Recursive-descent front-end for the Ruby expression subset the rules inspect.

use std::collections::HashSet;

use thiserror::Error;

use crate::style::{
	lexer,
	shared::TextRange,
	syntax::{
		Assign, Call, LiteralKind, LogicalOp, Node, NodeId, NodeKind, SyntaxTree, VarScope,
	},
	token::{Token, TokenKind},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ParseError {
	#[error("Unexpected character `{ch}` at byte {offset}.")]
	UnexpectedChar { ch: char, offset: usize },
	#[error("Unterminated string literal starting at byte {offset}.")]
	UnterminatedString { offset: usize },
	#[error("Unexpected `{found}` at byte {offset}, expected {expected}.")]
	UnexpectedToken { found: String, offset: usize, expected: &'static str },
	#[error("Unexpected end of input, expected {expected}.")]
	UnexpectedEof { expected: &'static str },
	#[error("Cannot assign to the expression at byte {offset}.")]
	InvalidTarget { offset: usize },
}

type ParseResult<T> = Result<T, ParseError>;

/// Tokenizes and parses `text` into its token stream and syntax tree.
pub(crate) fn parse(text: &str) -> ParseResult<(Vec<Token>, SyntaxTree)> {
	let tokens = lexer::tokenize(text)?;
	let tree = Parser::new(&tokens).parse_program(text.len())?;

	Ok((tokens, tree))
}

struct Parser<'a> {
	tokens: &'a [Token],
	pos: usize,
	tree: SyntaxTree,
	locals: HashSet<String>,
}
impl<'a> Parser<'a> {
	fn new(tokens: &'a [Token]) -> Self {
		Self { tokens, pos: 0, tree: SyntaxTree::default(), locals: HashSet::new() }
	}

	fn parse_program(mut self, len: usize) -> ParseResult<SyntaxTree> {
		let mut body = Vec::new();

		loop {
			self.skip_separators();

			if self.peek().is_none() {
				break;
			}

			body.push(self.statement()?);

			match self.peek_kind() {
				None | Some(TokenKind::Newline | TokenKind::Semicolon) => {},
				Some(_) => return Err(self.unexpected("end of statement")),
			}
		}

		let root = self.tree.push(Node::new(NodeKind::Program { body }, TextRange::new(0, len)));

		self.tree.set_root(root);

		Ok(self.tree)
	}

	fn statement(&mut self) -> ParseResult<NodeId> {
		self.keyword_logical(true)
	}

	fn keyword_logical(&mut self, allow_multi: bool) -> ParseResult<NodeId> {
		let mut lhs = self.not_expr(allow_multi)?;

		while let Some(op) = self.peek().filter(|t| t.is_keyword("and") || t.is_keyword("or")) {
			self.bump();
			self.skip_newlines();

			let operator = if op.text == "and" { LogicalOp::And } else { LogicalOp::Or };
			let rhs = self.not_expr(false)?;
			let range = self.range(lhs).cover(self.range(rhs));

			lhs = self.tree.push(Node::new(NodeKind::Logical { operator, lhs, rhs }, range));
		}

		Ok(lhs)
	}

	fn not_expr(&mut self, allow_multi: bool) -> ParseResult<NodeId> {
		let Some(keyword) = self.peek().filter(|t| t.is_keyword("not")) else {
			return self.assignment(allow_multi);
		};

		self.bump();

		if self.at(TokenKind::LeftParen) {
			let open = self.expect(TokenKind::LeftParen, "`(`")?.range;

			self.skip_newlines();

			let operand = self.statement()?;

			self.skip_newlines();

			let close = self.expect(TokenKind::RightParen, "`)`")?.range;
			let node = Node::new(
				NodeKind::Send(Call { receiver: Some(operand), method: "!".to_owned(), args: Vec::new() }),
				TextRange::new(keyword.range.start, close.end),
			)
			.with_selector(Some(keyword.range))
			.with_delimiters(open, close);

			return Ok(self.tree.push(node));
		}

		let operand = self.not_expr(false)?;
		let node = Node::new(
			NodeKind::Send(Call { receiver: Some(operand), method: "!".to_owned(), args: Vec::new() }),
			keyword.range.cover(self.range(operand)),
		)
		.with_selector(Some(keyword.range));

		Ok(self.tree.push(node))
	}

	fn assignment(&mut self, allow_multi: bool) -> ParseResult<NodeId> {
		let lhs = self.logical_or()?;

		match self.peek() {
			Some(token) if token.kind == TokenKind::Assign => {
				self.bump();
				self.skip_newlines();
				self.simple_assignment(lhs)
			},
			Some(token) if token.kind == TokenKind::OpAssign => {
				self.bump();
				self.skip_newlines();
				self.compound_assignment(lhs, token)
			},
			Some(token) if token.kind == TokenKind::Comma && allow_multi =>
				self.multiple_assignment(lhs),
			_ => Ok(lhs),
		}
	}

	fn simple_assignment(&mut self, lhs: NodeId) -> ParseResult<NodeId> {
		let node = self.tree.node(lhs).clone();

		if let Some((scope, name)) = variable_target(&node) {
			self.declare(scope, &name);

			let value = self.not_expr(false)?;
			let range = node.range.cover(self.range(value));

			self.tree.replace(
				lhs,
				Node::new(
					NodeKind::Assign(Assign::Variable { scope, name, value: Some(value) }),
					range,
				),
			);

			return Ok(lhs);
		}

		let NodeKind::Send(call) = &node.kind else {
			return Err(ParseError::InvalidTarget { offset: node.range.start });
		};

		if !is_setter_target(&node) {
			return Err(ParseError::InvalidTarget { offset: node.range.start });
		}

		let value = self.not_expr(false)?;
		let mut call = call.clone();

		call.method = if call.method == "[]" { "[]=".to_owned() } else { format!("{}=", call.method) };
		call.args.push(value);

		let range = node.range.cover(self.range(value));

		self.tree.replace(lhs, Node { kind: NodeKind::Send(call), range, ..node });

		Ok(lhs)
	}

	fn compound_assignment(&mut self, lhs: NodeId, operator: &Token) -> ParseResult<NodeId> {
		let node = self.tree.node(lhs).clone();

		if let Some((scope, name)) = variable_target(&node) {
			self.declare(scope, &name);
			self.tree.replace(
				lhs,
				Node::new(NodeKind::Assign(Assign::Variable { scope, name, value: None }), node.range),
			);
		} else if !is_setter_target(&node) {
			return Err(ParseError::InvalidTarget { offset: node.range.start });
		}

		let target = lhs;
		let value = self.not_expr(false)?;
		let range = node.range.cover(self.range(value));
		let assign = match operator.text.as_str() {
			"||=" => Assign::OrAssign { target, value },
			"&&=" => Assign::AndAssign { target, value },
			other => Assign::OpAssign {
				target,
				operator: other.trim_end_matches('=').to_owned(),
				value,
			},
		};

		Ok(self.tree.push(Node::new(NodeKind::Assign(assign), range)))
	}

	fn multiple_assignment(&mut self, first: NodeId) -> ParseResult<NodeId> {
		let mut targets = vec![self.multiple_target(first)?];

		while self.at(TokenKind::Comma) {
			self.bump();

			let next = self.logical_or()?;

			targets.push(self.multiple_target(next)?);
		}

		self.expect(TokenKind::Assign, "`=`")?;
		self.skip_newlines();

		let mut values = vec![self.not_expr(false)?];

		while self.at(TokenKind::Comma) {
			self.bump();
			self.skip_newlines();
			values.push(self.not_expr(false)?);
		}

		let value = match values.as_slice() {
			[single] => *single,
			[first_value, .., last_value] => {
				let range = self.range(*first_value).cover(self.range(*last_value));

				self.tree.push(Node::new(NodeKind::Array { elements: values.clone() }, range))
			},
			[] => return Err(self.unexpected("value")),
		};
		let range = self.range(targets[0]).cover(self.range(value));

		Ok(self.tree.push(Node::new(NodeKind::Assign(Assign::Multi { targets, value }), range)))
	}

	fn multiple_target(&mut self, id: NodeId) -> ParseResult<NodeId> {
		let node = self.tree.node(id).clone();

		if let Some((scope, name)) = variable_target(&node) {
			self.declare(scope, &name);
			self.tree.replace(
				id,
				Node::new(NodeKind::Assign(Assign::Variable { scope, name, value: None }), node.range),
			);

			return Ok(id);
		}
		if is_setter_target(&node) {
			return Ok(id);
		}

		Err(ParseError::InvalidTarget { offset: node.range.start })
	}

	fn logical_or(&mut self) -> ParseResult<NodeId> {
		self.binary(&["||"], Self::logical_and)
	}

	fn logical_and(&mut self) -> ParseResult<NodeId> {
		self.binary(&["&&"], Self::equality)
	}

	fn equality(&mut self) -> ParseResult<NodeId> {
		self.binary(&["==", "!="], Self::comparison)
	}

	fn comparison(&mut self) -> ParseResult<NodeId> {
		self.binary(&["<", ">", "<=", ">="], Self::additive)
	}

	fn additive(&mut self) -> ParseResult<NodeId> {
		self.binary(&["+", "-"], Self::multiplicative)
	}

	fn multiplicative(&mut self) -> ParseResult<NodeId> {
		self.binary(&["*", "/", "%"], Self::unary)
	}

	fn binary(
		&mut self,
		operators: &[&str],
		operand: fn(&mut Self) -> ParseResult<NodeId>,
	) -> ParseResult<NodeId> {
		let mut lhs = operand(self)?;

		while let Some(op) = self.peek().filter(|t| {
			t.kind == TokenKind::Operator && operators.contains(&t.text.as_str())
		}) {
			self.bump();
			self.skip_newlines();

			let rhs = operand(self)?;
			let range = self.range(lhs).cover(self.range(rhs));
			let node = match op.text.as_str() {
				"&&" => Node::new(NodeKind::Logical { operator: LogicalOp::And, lhs, rhs }, range),
				"||" => Node::new(NodeKind::Logical { operator: LogicalOp::Or, lhs, rhs }, range),
				method => Node::new(
					NodeKind::Send(Call {
						receiver: Some(lhs),
						method: method.to_owned(),
						args: vec![rhs],
					}),
					range,
				)
				.with_selector(Some(op.range)),
			};

			lhs = self.tree.push(node);
		}

		Ok(lhs)
	}

	fn unary(&mut self) -> ParseResult<NodeId> {
		let Some(op) = self
			.peek()
			.filter(|t| t.kind == TokenKind::Operator && matches!(t.text.as_str(), "!" | "-"))
		else {
			return self.postfix();
		};

		self.bump();

		let operand = self.unary()?;
		let method = if op.text == "!" { "!" } else { "-@" };
		let node = Node::new(
			NodeKind::Send(Call { receiver: Some(operand), method: method.to_owned(), args: Vec::new() }),
			op.range.cover(self.range(operand)),
		)
		.with_selector(Some(op.range));

		Ok(self.tree.push(node))
	}

	fn postfix(&mut self) -> ParseResult<NodeId> {
		let mut receiver = self.primary()?;

		while let Some(token) = self.peek() {
			match token.kind {
				TokenKind::Dot => {
					self.bump();
					self.skip_newlines();

					match self.peek() {
						Some(name)
							if matches!(
								name.kind,
								TokenKind::Identifier | TokenKind::Constant | TokenKind::Keyword
							) =>
						{
							self.bump();

							receiver = self.call(Some(receiver), name)?;
						},
						Some(paren) if paren.kind == TokenKind::LeftParen => {
							let (args, open, close) = self.delimited(TokenKind::RightParen, "`)`")?;
							let range = TextRange::new(self.range(receiver).start, close.end);
							let node = Node::new(
								NodeKind::Send(Call {
									receiver: Some(receiver),
									method: "call".to_owned(),
									args,
								}),
								range,
							)
							.with_delimiters(open, close);

							receiver = self.tree.push(node);
						},
						_ => return Err(self.unexpected("method name after `.`")),
					}
				},
				TokenKind::DoubleColon => {
					self.bump();

					let Some(name) = self.peek().filter(|t| t.kind == TokenKind::Constant) else {
						return Err(self.unexpected("constant name after `::`"));
					};

					self.bump();

					receiver = if self.parens_follow(name) {
						self.call(Some(receiver), name)?
					} else {
						let range = TextRange::new(self.range(receiver).start, name.range.end);

						self.tree.push(Node::new(
							NodeKind::Const { scope: Some(receiver), name: name.text.clone() },
							range,
						))
					};
				},
				TokenKind::LeftIndexBracket => {
					let (args, open, close) = self.delimited(TokenKind::RightBracket, "`]`")?;
					let range = TextRange::new(self.range(receiver).start, close.end);
					let node = Node::new(
						NodeKind::Send(Call { receiver: Some(receiver), method: "[]".to_owned(), args }),
						range,
					)
					.with_delimiters(open, close);

					receiver = self.tree.push(node);
				},
				_ => break,
			}
		}

		Ok(receiver)
	}

	fn primary(&mut self) -> ParseResult<NodeId> {
		let Some(token) = self.peek() else {
			return Err(ParseError::UnexpectedEof { expected: "expression" });
		};

		match token.kind {
			TokenKind::Number => self.literal(LiteralKind::Number),
			TokenKind::String => self.literal(LiteralKind::String),
			TokenKind::Symbol => self.literal(LiteralKind::Symbol),
			TokenKind::Keyword => match token.text.as_str() {
				"nil" => self.literal(LiteralKind::Nil),
				"true" => self.literal(LiteralKind::True),
				"false" => self.literal(LiteralKind::False),
				"self" => self.literal(LiteralKind::SelfRef),
				_ => Err(self.unexpected("expression")),
			},
			TokenKind::InstanceVariable => {
				self.bump();

				Ok(self.tree.push(Node::new(
					NodeKind::Variable { scope: VarScope::Instance, name: token.text.clone() },
					token.range,
				)))
			},
			TokenKind::Identifier => {
				self.bump();

				if !self.parens_follow(token) && self.locals.contains(&token.text) {
					return Ok(self.tree.push(Node::new(
						NodeKind::Variable { scope: VarScope::Local, name: token.text.clone() },
						token.range,
					)));
				}

				self.call(None, token)
			},
			TokenKind::Constant => {
				self.bump();

				if self.parens_follow(token) {
					return self.call(None, token);
				}

				Ok(self.tree.push(Node::new(
					NodeKind::Const { scope: None, name: token.text.clone() },
					token.range,
				)))
			},
			TokenKind::LeftParen => self.parenthesized(),
			TokenKind::LeftBracket => {
				let (elements, open, close) = self.delimited(TokenKind::RightBracket, "`]`")?;
				let node = Node::new(
					NodeKind::Array { elements },
					TextRange::new(open.start, close.end),
				)
				.with_delimiters(open, close);

				Ok(self.tree.push(node))
			},
			_ => Err(self.unexpected("expression")),
		}
	}

	fn parenthesized(&mut self) -> ParseResult<NodeId> {
		let open = self.expect(TokenKind::LeftParen, "`(`")?.range;
		let mut body = Vec::new();

		loop {
			self.skip_separators();

			if self.at(TokenKind::RightParen) {
				break;
			}

			body.push(self.statement()?);

			if !matches!(
				self.peek_kind(),
				Some(TokenKind::Newline | TokenKind::Semicolon | TokenKind::RightParen)
			) {
				return Err(self.unexpected("`)`"));
			}
		}

		let close = self.expect(TokenKind::RightParen, "`)`")?.range;
		let node = Node::new(NodeKind::Paren { body }, TextRange::new(open.start, close.end))
			.with_delimiters(open, close);

		Ok(self.tree.push(node))
	}

	fn call(&mut self, receiver: Option<NodeId>, name: &Token) -> ParseResult<NodeId> {
		let start = receiver.map_or(name.range.start, |receiver| self.range(receiver).start);
		let call = |args| Call { receiver, method: name.text.clone(), args };

		if !self.parens_follow(name) {
			let node = Node::new(
				NodeKind::Send(call(Vec::new())),
				TextRange::new(start, name.range.end),
			)
			.with_selector(Some(name.range));

			return Ok(self.tree.push(node));
		}

		let (args, open, close) = self.delimited(TokenKind::RightParen, "`)`")?;
		let shadows_local =
			receiver.is_none() && args.is_empty() && self.locals.contains(&name.text);
		let mut node = Node::new(NodeKind::Send(call(args)), TextRange::new(start, close.end))
			.with_selector(Some(name.range))
			.with_delimiters(open, close);

		node.shadows_local = shadows_local;

		Ok(self.tree.push(node))
	}

	/// Parses a comma-separated list between the current opening token and `close`.
	fn delimited(
		&mut self,
		close: TokenKind,
		expected: &'static str,
	) -> ParseResult<(Vec<NodeId>, TextRange, TextRange)> {
		let open = self.bump().map(|token| token.range).ok_or(ParseError::UnexpectedEof { expected })?;
		let mut items = Vec::new();

		self.skip_newlines();

		if !self.at(close) {
			loop {
				items.push(self.not_expr(false)?);
				self.skip_newlines();

				if !self.at(TokenKind::Comma) {
					break;
				}

				self.bump();
				self.skip_newlines();
			}
		}

		let close = self.expect(close, expected)?.range;

		Ok((items, open, close))
	}

	fn literal(&mut self, kind: LiteralKind) -> ParseResult<NodeId> {
		let range = self.bump().map(|token| token.range).unwrap_or_default();

		Ok(self.tree.push(Node::new(NodeKind::Literal(kind), range)))
	}

	fn declare(&mut self, scope: VarScope, name: &str) {
		if scope == VarScope::Local {
			self.locals.insert(name.to_owned());
		}
	}

	/// `name(`: only parentheses touching the name open an argument list.
	fn parens_follow(&self, name: &Token) -> bool {
		self.peek().is_some_and(|next| {
			next.kind == TokenKind::LeftParen && next.range.start == name.range.end
		})
	}

	fn range(&self, id: NodeId) -> TextRange {
		self.tree.node(id).range
	}

	fn peek(&self) -> Option<&'a Token> {
		self.tokens.get(self.pos)
	}

	fn peek_kind(&self) -> Option<TokenKind> {
		self.peek().map(|token| token.kind)
	}

	fn at(&self, kind: TokenKind) -> bool {
		self.peek_kind() == Some(kind)
	}

	fn bump(&mut self) -> Option<&'a Token> {
		let token = self.tokens.get(self.pos)?;

		self.pos += 1;

		Some(token)
	}

	fn expect(&mut self, kind: TokenKind, expected: &'static str) -> ParseResult<&'a Token> {
		match self.peek() {
			Some(token) if token.kind == kind => {
				self.pos += 1;

				Ok(token)
			},
			_ => Err(self.unexpected(expected)),
		}
	}

	fn skip_newlines(&mut self) {
		while self.at(TokenKind::Newline) {
			self.pos += 1;
		}
	}

	fn skip_separators(&mut self) {
		while matches!(self.peek_kind(), Some(TokenKind::Newline | TokenKind::Semicolon)) {
			self.pos += 1;
		}
	}

	fn unexpected(&self, expected: &'static str) -> ParseError {
		match self.peek() {
			Some(token) => ParseError::UnexpectedToken {
				found: if token.kind == TokenKind::Newline {
					"newline".to_owned()
				} else {
					token.text.clone()
				},
				offset: token.range.start,
				expected,
			},
			None => ParseError::UnexpectedEof { expected },
		}
	}
}

/// `x` / `@x` written as a plain name, the shapes that become variable assignment targets.
fn variable_target(node: &Node) -> Option<(VarScope, String)> {
	match &node.kind {
		NodeKind::Variable { scope, name } => Some((*scope, name.clone())),
		NodeKind::Send(call)
			if call.receiver.is_none()
				&& call.args.is_empty()
				&& node.begin.is_none()
				&& starts_lowercase(&call.method) =>
			Some((VarScope::Local, call.method.clone())),
		_ => None,
	}
}

/// `recv.attr` or `recv[...]`, assigned through a setter call.
fn is_setter_target(node: &Node) -> bool {
	let NodeKind::Send(call) = &node.kind else {
		return false;
	};

	if call.receiver.is_none() {
		return false;
	}
	if call.method == "[]" {
		return true;
	}

	node.begin.is_none() && node.selector.is_some() && starts_lowercase(&call.method)
}

fn starts_lowercase(name: &str) -> bool {
	name.chars().next().is_some_and(|ch| ch.is_ascii_lowercase() || ch == '_')
}
