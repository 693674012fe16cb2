use crate::style::{
	config::BracketSpacingStyle,
	dispatch::Rule,
	offense::{Corrector, OffenseCollector},
	shared::{FileContext, TextRange},
	syntax::{Call, Node, NodeCategory, NodeId},
	token::TokenKind,
};

pub(crate) const RULE_ID: &str = "Layout/SpaceInsideReferenceBrackets";

const UNNECESSARY_SPACE: &str = "Unnecessary space inside reference brackets.";
const MISSING_SPACE: &str = "Missing space inside reference brackets.";

/// Spacing just inside the brackets of `recv[...]` and `recv[...] = value`.
#[derive(Debug)]
pub(crate) struct ReferenceBracketSpacing {
	style: BracketSpacingStyle,
}
impl ReferenceBracketSpacing {
	pub(crate) fn new(style: BracketSpacingStyle) -> Self {
		Self { style }
	}

	fn check_no_space(
		&self,
		ctx: &FileContext,
		left: usize,
		right: usize,
		offenses: &mut OffenseCollector,
	) {
		for run in [ctx.space_after(left), ctx.space_before(right)].into_iter().flatten() {
			report_unnecessary_space(ctx, run, offenses);
		}
	}

	fn check_space(
		&self,
		ctx: &FileContext,
		left: TextRange,
		right: TextRange,
		(left_idx, right_idx): (usize, usize),
		offenses: &mut OffenseCollector,
	) {
		if ctx.space_after(left_idx).is_none() {
			offenses.push(
				ctx,
				RULE_ID,
				left,
				MISSING_SPACE,
				Some(Box::new(move |corrector: &mut Corrector| corrector.insert_after(left, " "))),
			);
		}
		if ctx.space_before(right_idx).is_none() {
			offenses.push(
				ctx,
				RULE_ID,
				right,
				MISSING_SPACE,
				Some(Box::new(move |corrector: &mut Corrector| {
					corrector.insert_before(right.start, " ")
				})),
			);
		}
	}
}
impl Rule for ReferenceBracketSpacing {
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

		if !call.is_index_call() || ctx.is_multiline(node.range) {
			return;
		}

		let Some((left_idx, right_idx)) = reference_brackets(ctx, node, call) else {
			return;
		};
		let (Some(left), Some(right)) = (ctx.tokens.get(left_idx), ctx.tokens.get(right_idx)) else {
			return;
		};
		let interior = TextRange::new(left.range.end, right.range.start);

		if ctx.tokens.tokens_in(interior).is_empty() {
			// `a[]` / `a[ ]`: one run at most, and nothing to pad.
			if self.style == BracketSpacingStyle::NoSpace
				&& let Some(run) = ctx.space_after(left_idx)
			{
				report_unnecessary_space(ctx, run, offenses);
			}

			return;
		}

		match self.style {
			BracketSpacingStyle::NoSpace => self.check_no_space(ctx, left_idx, right_idx, offenses),
			BracketSpacingStyle::Space =>
				self.check_space(ctx, left.range, right.range, (left_idx, right_idx), offenses),
		}
	}
}

fn report_unnecessary_space(ctx: &FileContext, run: TextRange, offenses: &mut OffenseCollector) {
	offenses.push(
		ctx,
		RULE_ID,
		run,
		UNNECESSARY_SPACE,
		Some(Box::new(move |corrector: &mut Corrector| corrector.remove(run))),
	);
}

/// Token indices of the reference brackets of an index call, bounded by the node span.
fn reference_brackets(ctx: &FileContext, node: &Node, call: &Call) -> Option<(usize, usize)> {
	let index_args = call.index_args();
	let scan_from = index_args
		.first()
		.or(call.args.last())
		.map_or(node.range.end, |arg| ctx.tree.node(*arg).range.start);
	let left =
		ctx.tokens.last_of_kind_at_or_before(TokenKind::LeftIndexBracket, scan_from, node.range)?;
	let left_end = ctx.tokens.get(left)?.range.end;
	let after = index_args
		.last()
		.map_or(left_end, |arg| ctx.tree.node(*arg).range.end.max(left_end));
	let right = ctx.tokens.first_of_kind_after(TokenKind::RightBracket, after, node.range)?;

	Some((left, right))
}
