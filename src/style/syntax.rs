use std::fmt;

use crate::style::shared::TextRange;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum NodeCategory {
	Program,
	Send,
	Variable,
	Const,
	Literal,
	Array,
	Paren,
	Logical,
	Assign,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum VarScope {
	Local,
	Instance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LiteralKind {
	Number,
	String,
	Symbol,
	Nil,
	True,
	False,
	SelfRef,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LogicalOp {
	And,
	Or,
}

/// A method call. Operators, `not`, reference access and setters are all sends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Call {
	pub(crate) receiver: Option<NodeId>,
	pub(crate) method: String,
	pub(crate) args: Vec<NodeId>,
}
impl Call {
	pub(crate) fn is_index_call(&self) -> bool {
		self.receiver.is_some() && matches!(self.method.as_str(), "[]" | "[]=")
	}

	/// Arguments written between the reference brackets; the assigned value of `[]=` is not one.
	pub(crate) fn index_args(&self) -> &[NodeId] {
		match self.method.as_str() {
			"[]=" => &self.args[..self.args.len().saturating_sub(1)],
			_ => &self.args,
		}
	}
}

/// The closed family of assignment shapes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Assign {
	/// `x = v`. Targets inside multiple or compound assignment carry no value.
	Variable { scope: VarScope, name: String, value: Option<NodeId> },
	Multi { targets: Vec<NodeId>, value: NodeId },
	OrAssign { target: NodeId, value: NodeId },
	AndAssign { target: NodeId, value: NodeId },
	OpAssign { target: NodeId, operator: String, value: NodeId },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum NodeKind {
	Program { body: Vec<NodeId> },
	Send(Call),
	Variable { scope: VarScope, name: String },
	Const { scope: Option<NodeId>, name: String },
	Literal(LiteralKind),
	Array { elements: Vec<NodeId> },
	Paren { body: Vec<NodeId> },
	Logical { operator: LogicalOp, lhs: NodeId, rhs: NodeId },
	Assign(Assign),
}
impl NodeKind {
	pub(crate) fn category(&self) -> NodeCategory {
		match self {
			NodeKind::Program { .. } => NodeCategory::Program,
			NodeKind::Send(_) => NodeCategory::Send,
			NodeKind::Variable { .. } => NodeCategory::Variable,
			NodeKind::Const { .. } => NodeCategory::Const,
			NodeKind::Literal(_) => NodeCategory::Literal,
			NodeKind::Array { .. } => NodeCategory::Array,
			NodeKind::Paren { .. } => NodeCategory::Paren,
			NodeKind::Logical { .. } => NodeCategory::Logical,
			NodeKind::Assign(_) => NodeCategory::Assign,
		}
	}

	fn child_ids(&self) -> Vec<NodeId> {
		match self {
			NodeKind::Program { body } | NodeKind::Paren { body } => body.clone(),
			NodeKind::Send(send) => send.receiver.iter().chain(&send.args).copied().collect(),
			NodeKind::Variable { .. } | NodeKind::Literal(_) => Vec::new(),
			NodeKind::Const { scope, .. } => scope.iter().copied().collect(),
			NodeKind::Array { elements } => elements.clone(),
			NodeKind::Logical { lhs, rhs, .. } => vec![*lhs, *rhs],
			NodeKind::Assign(assign) => match assign {
				Assign::Variable { value, .. } => value.iter().copied().collect(),
				Assign::Multi { targets, value } =>
					targets.iter().copied().chain(std::iter::once(*value)).collect(),
				Assign::OrAssign { target, value }
				| Assign::AndAssign { target, value }
				| Assign::OpAssign { target, value, .. } => vec![*target, *value],
			},
		}
	}
}

impl fmt::Display for NodeKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			NodeKind::Program { body } => write!(f, "program ({} statements)", body.len()),
			NodeKind::Send(call) => write!(f, "send `{}`", call.method),
			NodeKind::Variable { scope: VarScope::Local, name } => write!(f, "lvar `{name}`"),
			NodeKind::Variable { scope: VarScope::Instance, name } => write!(f, "ivar `{name}`"),
			NodeKind::Const { name, .. } => write!(f, "const `{name}`"),
			NodeKind::Literal(kind) => write!(f, "literal {kind:?}"),
			NodeKind::Array { elements } => write!(f, "array ({} elements)", elements.len()),
			NodeKind::Paren { .. } => f.write_str("begin"),
			NodeKind::Logical { operator: LogicalOp::And, .. } => f.write_str("and"),
			NodeKind::Logical { operator: LogicalOp::Or, .. } => f.write_str("or"),
			NodeKind::Assign(Assign::Variable { name, .. }) => write!(f, "asgn `{name}`"),
			NodeKind::Assign(Assign::Multi { targets, .. }) =>
				write!(f, "masgn ({} targets)", targets.len()),
			NodeKind::Assign(Assign::OrAssign { .. }) => f.write_str("or_asgn"),
			NodeKind::Assign(Assign::AndAssign { .. }) => f.write_str("and_asgn"),
			NodeKind::Assign(Assign::OpAssign { operator, .. }) => write!(f, "op_asgn `{operator}`"),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Node {
	pub(crate) kind: NodeKind,
	pub(crate) range: TextRange,
	pub(crate) parent: Option<NodeId>,
	/// The callee name as written, absent for `recv.()`, operators keep their symbol.
	pub(crate) selector: Option<TextRange>,
	/// Opening delimiter of the argument list, when written in source.
	pub(crate) begin: Option<TextRange>,
	pub(crate) end: Option<TextRange>,
	/// A receiverless call whose name is a local variable at that point, as in `x = 1; x()`.
	pub(crate) shadows_local: bool,
}
impl Node {
	pub(crate) fn new(kind: NodeKind, range: TextRange) -> Self {
		Self {
			kind,
			range,
			parent: None,
			selector: None,
			begin: None,
			end: None,
			shadows_local: false,
		}
	}

	pub(crate) fn with_selector(mut self, selector: Option<TextRange>) -> Self {
		self.selector = selector;

		self
	}

	pub(crate) fn with_delimiters(mut self, begin: TextRange, end: TextRange) -> Self {
		self.begin = Some(begin);
		self.end = Some(end);

		self
	}

	pub(crate) fn as_send(&self) -> Option<&Call> {
		match &self.kind {
			NodeKind::Send(send) => Some(send),
			_ => None,
		}
	}
}

/// Node arena for one source unit. Children are created before their parents.
#[derive(Debug, Default)]
pub(crate) struct SyntaxTree {
	nodes: Vec<Node>,
	root: Option<NodeId>,
}
impl SyntaxTree {
	pub(crate) fn push(&mut self, node: Node) -> NodeId {
		let id = NodeId(self.nodes.len());

		for child in node.kind.child_ids() {
			self.nodes[child.0].parent = Some(id);
		}

		self.nodes.push(node);

		id
	}

	/// Replaces a node in place, re-linking the children of the new shape.
	pub(crate) fn replace(&mut self, id: NodeId, node: Node) {
		let parent = self.nodes[id.0].parent;

		for child in node.kind.child_ids() {
			self.nodes[child.0].parent = Some(id);
		}

		self.nodes[id.0] = Node { parent, ..node };
	}

	pub(crate) fn set_root(&mut self, id: NodeId) {
		self.root = Some(id);
	}

	pub(crate) fn root(&self) -> Option<NodeId> {
		self.root
	}

	pub(crate) fn node(&self, id: NodeId) -> &Node {
		&self.nodes[id.0]
	}

	pub(crate) fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Children in source order.
	pub(crate) fn children(&self, id: NodeId) -> Vec<NodeId> {
		let mut children = self.node(id).kind.child_ids();

		children.sort_by_key(|child| (self.node(*child).range.start, self.node(*child).range.end));

		children
	}

	pub(crate) fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
		std::iter::successors(self.node(id).parent, |current| self.node(*current).parent)
	}

	/// Every node once, parents before children, siblings in source order.
	pub(crate) fn preorder(&self) -> Vec<NodeId> {
		let mut order = Vec::with_capacity(self.nodes.len());
		let mut stack = self.root().into_iter().collect::<Vec<_>>();

		while let Some(id) = stack.pop() {
			order.push(id);
			stack.extend(self.children(id).into_iter().rev());
		}

		order
	}
}
