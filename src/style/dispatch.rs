use std::collections::HashMap;

use crate::style::{
	config::StyleConfig,
	offense::{Offense, OffenseCollector},
	parens::MethodCallWithoutArgsParentheses,
	shared::FileContext,
	spacing::ReferenceBracketSpacing,
	syntax::{NodeCategory, NodeId},
};

/// A style rule. Rules are stateless between nodes and shared across worker threads.
pub(crate) trait Rule: Send + Sync {
	fn id(&self) -> &'static str;

	/// Node categories this rule wants to see.
	fn interests(&self) -> &'static [NodeCategory];

	fn check(&self, ctx: &FileContext, node: NodeId, offenses: &mut OffenseCollector);
}

/// Enabled rules plus the category table built once from them.
pub(crate) struct Registry {
	rules: Vec<Box<dyn Rule>>,
	table: HashMap<NodeCategory, Vec<usize>>,
}
impl Registry {
	pub(crate) fn new(rules: Vec<Box<dyn Rule>>) -> Self {
		let mut table: HashMap<NodeCategory, Vec<usize>> = HashMap::new();

		for (idx, rule) in rules.iter().enumerate() {
			for category in rule.interests() {
				table.entry(*category).or_default().push(idx);
			}
		}

		Self { rules, table }
	}

	pub(crate) fn from_config(config: &StyleConfig) -> Self {
		let candidates: Vec<Box<dyn Rule>> = vec![
			Box::new(ReferenceBracketSpacing::new(config.bracket_spacing)),
			Box::new(MethodCallWithoutArgsParentheses),
		];
		let rules = candidates.into_iter().filter(|rule| config.is_enabled(rule.id())).collect();

		Self::new(rules)
	}

	pub(crate) fn rule_ids(&self) -> Vec<&'static str> {
		self.rules.iter().map(|rule| rule.id()).collect()
	}

	/// Visits every node once in source order, handing it to each interested rule in
	/// registration order.
	pub(crate) fn run(&self, ctx: &FileContext) -> Vec<Offense> {
		let mut offenses = OffenseCollector::default();

		for node in ctx.tree.preorder() {
			let kind = &ctx.tree.node(node).kind;
			let Some(rule_indices) = self.table.get(&kind.category()) else {
				continue;
			};

			tracing::trace!(node = %kind, rules = rule_indices.len(), "Dispatching node.");

			for idx in rule_indices {
				self.rules[*idx].check(ctx, node, &mut offenses);
			}
		}

		if !offenses.is_empty() {
			tracing::debug!(path = %ctx.path.display(), count = offenses.len(), "Collected offenses.");
		}

		offenses.into_offenses()
	}
}

#[cfg(test)]
mod tests {
	use std::path::Path;

	use pretty_assertions::assert_eq;

	use super::*;
	use crate::style::{
		config::BracketSpacingStyle,
		parens,
		shared::{TextRange, read_file_context_from_text},
		spacing,
	};

	struct EverySend(&'static str);
	impl Rule for EverySend {
		fn id(&self) -> &'static str {
			self.0
		}

		fn interests(&self) -> &'static [NodeCategory] {
			&[NodeCategory::Send]
		}

		fn check(&self, ctx: &FileContext, node: NodeId, offenses: &mut OffenseCollector) {
			offenses.push(ctx, self.0, ctx.tree.node(node).range, "send", None);
		}
	}

	fn context(text: &str) -> FileContext {
		read_file_context_from_text(Path::new("a.rb"), text.to_owned()).expect("parse")
	}

	#[test]
	fn dispatches_in_traversal_then_registration_order() {
		let ctx = context("a.b(c)");
		let registry =
			Registry::new(vec![Box::new(EverySend("Test/One")), Box::new(EverySend("Test/Two"))]);
		let seen = registry
			.run(&ctx)
			.into_iter()
			.map(|offense| (offense.rule, offense.range))
			.collect::<Vec<_>>();

		assert_eq!(
			seen,
			vec![
				("Test/One", TextRange::new(0, 6)),
				("Test/Two", TextRange::new(0, 6)),
				("Test/One", TextRange::new(0, 1)),
				("Test/Two", TextRange::new(0, 1)),
				("Test/One", TextRange::new(4, 5)),
				("Test/Two", TextRange::new(4, 5)),
			]
		);
	}

	#[test]
	fn disabled_rules_are_not_registered() {
		let config = StyleConfig::from_yaml("Style/MethodCallWithoutArgsParentheses:\n  Enabled: false\n")
			.expect("config");
		let registry = Registry::from_config(&config);

		assert_eq!(registry.rule_ids(), vec![spacing::RULE_ID]);
		assert_eq!(config.bracket_spacing, BracketSpacingStyle::NoSpace);
		assert_eq!(
			Registry::from_config(&StyleConfig::default()).rule_ids(),
			vec![spacing::RULE_ID, parens::RULE_ID]
		);
	}

	#[test]
	fn both_rules_report_on_one_line() {
		let ctx = context("hash[ key() ]");
		let rules = Registry::from_config(&StyleConfig::default())
			.run(&ctx)
			.into_iter()
			.map(|offense| (offense.rule, offense.column))
			.collect::<Vec<_>>();

		assert_eq!(rules, vec![(spacing::RULE_ID, 6), (spacing::RULE_ID, 12), (parens::RULE_ID, 10)]);
	}

	#[test]
	fn repeated_runs_report_identically() {
		let text = "x = 1\nhash[ key() ]\nobj.run()\nlist[ a[ b ] ] = x()\nnot ready()\n";
		let registry = Registry::from_config(&StyleConfig::default());
		let report = |ctx: &FileContext| {
			registry
				.run(ctx)
				.into_iter()
				.map(|offense| (offense.rule, offense.range, offense.is_correctable()))
				.collect::<Vec<_>>()
		};
		let first = report(&context(text));

		assert!(first.iter().any(|(rule, ..)| *rule == spacing::RULE_ID));
		assert!(first.iter().any(|(rule, ..)| *rule == parens::RULE_ID));
		assert_eq!(report(&context(text)), first);
		assert_eq!(report(&context(text)), first);
	}
}
