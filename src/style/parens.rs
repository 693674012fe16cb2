use once_cell::sync::Lazy;
use regex::Regex;

use crate::style::{
	dispatch::Rule,
	offense::{Corrector, OffenseCollector},
	shared::FileContext,
	syntax::{Assign, Call, Node, NodeCategory, NodeId, NodeKind, VarScope},
};

pub(crate) const RULE_ID: &str = "Style/MethodCallWithoutArgsParentheses";

const MESSAGE: &str = "Do not use parentheses for method calls with no arguments.";

static CONSTANT_NAME_RE: Lazy<Regex> =
	Lazy::new(|| Regex::new(r"^[A-Z]").expect("Expected operation to succeed."));

/// `object.some_method()` written without arguments keeps its parentheses.
#[derive(Debug)]
pub(crate) struct MethodCallWithoutArgsParentheses;
impl Rule for MethodCallWithoutArgsParentheses {
	fn id(&self) -> &'static str {
		RULE_ID
	}

	fn interests(&self) -> &'static [NodeCategory] {
		&[NodeCategory::Send]
	}

	fn check(&self, ctx: &FileContext, node_id: NodeId, offenses: &mut OffenseCollector) {
		let node = ctx.tree.node(node_id);
		let Some(call) = node.as_send() else {
			return;
		};

		if CONSTANT_NAME_RE.is_match(&call.method) {
			return;
		}

		let (Some(begin), Some(end)) = (node.begin, node.end) else {
			return;
		};

		if !call.args.is_empty() || call.is_index_call() {
			return;
		}
		if node.shadows_local
			|| assigns_same_name(ctx, node_id, &call.method)
			|| is_call_shorthand(node, call)
			|| is_keyword_not(ctx, node_id)
		{
			return;
		}

		offenses.push(
			ctx,
			RULE_ID,
			begin,
			MESSAGE,
			Some(Box::new(move |corrector: &mut Corrector| {
				corrector.remove(begin);
				corrector.remove(end);
			})),
		);
	}
}

/// `x = x()` and friends: dropping the parentheses would read the variable instead.
fn assigns_same_name(ctx: &FileContext, node_id: NodeId, method: &str) -> bool {
	ctx.tree.ancestors(node_id).any(|ancestor| {
		let NodeKind::Assign(assign) = &ctx.tree.node(ancestor).kind else {
			return false;
		};

		match assign {
			Assign::Variable { scope: VarScope::Local, name, .. } => name == method,
			Assign::Variable { .. } => false,
			Assign::Multi { targets, .. } =>
				targets.iter().any(|target| target_name(ctx, *target) == Some(method)),
			// A setter target such as `obj.attr ||= v` is skipped, not compared.
			Assign::OrAssign { target, .. }
			| Assign::AndAssign { target, .. }
			| Assign::OpAssign { target, .. } => target_name(ctx, *target) == Some(method),
		}
	})
}

fn target_name(ctx: &FileContext, target: NodeId) -> Option<&str> {
	match &ctx.tree.node(target).kind {
		NodeKind::Assign(Assign::Variable { name, .. }) => Some(name),
		_ => None,
	}
}

/// `lambda.()`
fn is_call_shorthand(node: &Node, call: &Call) -> bool {
	call.method == "call" && node.selector.is_none()
}

/// `not(x)` itself, or the operand of `not`.
fn is_keyword_not(ctx: &FileContext, node_id: NodeId) -> bool {
	if is_not_send(ctx, ctx.tree.node(node_id)) {
		return true;
	}

	let mut operand = node_id;

	for ancestor in ctx.tree.ancestors(node_id) {
		let node = ctx.tree.node(ancestor);

		match &node.kind {
			NodeKind::Paren { body } if body.len() == 1 => operand = ancestor,
			NodeKind::Send(call) =>
				return is_not_send(ctx, node) && call.receiver == Some(operand),
			_ => return false,
		}
	}

	false
}

fn is_not_send(ctx: &FileContext, node: &Node) -> bool {
	node.as_send().is_some_and(|call| call.method == "!")
		&& node.selector.is_some_and(|selector| ctx.slice(selector) == "not")
}
