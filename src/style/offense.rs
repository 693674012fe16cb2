use std::fmt;

use crate::style::shared::{Edit, FileContext, TextRange, Violation};

/// Deferred edit producer for one offense. Invoked only when autocorrecting.
pub(crate) type Correction = Box<dyn Fn(&mut Corrector) + Send + Sync>;

pub(crate) struct Offense {
	pub(crate) rule: &'static str,
	pub(crate) range: TextRange,
	pub(crate) line: usize,
	pub(crate) column: usize,
	pub(crate) message: String,
	pub(crate) correction: Option<Correction>,
}
impl Offense {
	pub(crate) fn is_correctable(&self) -> bool {
		self.correction.is_some()
	}

	pub(crate) fn to_violation(&self, ctx: &FileContext) -> Violation {
		Violation {
			file: ctx.path.clone(),
			line: self.line,
			column: self.column,
			rule: self.rule,
			message: self.message.clone(),
			fixable: self.is_correctable(),
		}
	}
}
impl fmt::Debug for Offense {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Offense")
			.field("rule", &self.rule)
			.field("range", &self.range)
			.field("line", &self.line)
			.field("column", &self.column)
			.field("message", &self.message)
			.field("correctable", &self.is_correctable())
			.finish()
	}
}

/// Append-only offense list for one file, in the order rules report them.
#[derive(Debug, Default)]
pub(crate) struct OffenseCollector {
	offenses: Vec<Offense>,
}
impl OffenseCollector {
	pub(crate) fn push(
		&mut self,
		ctx: &FileContext,
		rule: &'static str,
		range: TextRange,
		message: impl Into<String>,
		correction: Option<Correction>,
	) {
		let (line, column) = ctx.line_col(range.start);

		self.offenses.push(Offense { rule, range, line, column, message: message.into(), correction });
	}

	pub(crate) fn len(&self) -> usize {
		self.offenses.len()
	}

	pub(crate) fn is_empty(&self) -> bool {
		self.offenses.is_empty()
	}

	pub(crate) fn into_offenses(self) -> Vec<Offense> {
		self.offenses
	}
}

/// Records the edits a correction asks for, tagged with the owning rule.
#[derive(Debug)]
pub(crate) struct Corrector {
	rule: &'static str,
	edits: Vec<Edit>,
}
impl Corrector {
	pub(crate) fn new(rule: &'static str) -> Self {
		Self { rule, edits: Vec::new() }
	}

	pub(crate) fn remove(&mut self, range: TextRange) {
		self.replace(range, "");
	}

	pub(crate) fn insert_before(&mut self, offset: usize, text: &str) {
		self.replace(TextRange::empty(offset), text);
	}

	pub(crate) fn insert_after(&mut self, range: TextRange, text: &str) {
		self.replace(TextRange::empty(range.end), text);
	}

	pub(crate) fn replace(&mut self, range: TextRange, replacement: &str) {
		self.edits.push(Edit {
			start: range.start,
			end: range.end,
			replacement: replacement.to_owned(),
			rule: self.rule,
		});
	}

	pub(crate) fn into_edits(self) -> Vec<Edit> {
		self.edits
	}
}

#[cfg(test)]
mod tests {
	use std::path::Path;

	use pretty_assertions::assert_eq;

	use super::*;
	use crate::style::shared::read_file_context_from_text;

	#[test]
	fn collector_keeps_push_order_and_positions() {
		let ctx = read_file_context_from_text(Path::new("a.rb"), "a\nbb()\n".to_owned())
			.expect("parse");
		let mut offenses = OffenseCollector::default();

		offenses.push(&ctx, "Test/Second", TextRange::new(4, 5), "second", None);
		offenses.push(
			&ctx,
			"Test/First",
			TextRange::new(0, 1),
			"first",
			Some(Box::new(|corrector: &mut Corrector| corrector.remove(TextRange::new(0, 1)))),
		);

		assert_eq!(offenses.len(), 2);

		let offenses = offenses.into_offenses();

		assert_eq!(offenses[0].rule, "Test/Second");
		assert_eq!((offenses[0].line, offenses[0].column), (2, 3));
		assert!(!offenses[0].is_correctable());
		assert_eq!((offenses[1].line, offenses[1].column), (1, 1));
		assert!(offenses[1].is_correctable());
	}

	#[test]
	fn corrector_tags_edits_with_rule() {
		let mut corrector = Corrector::new("Test/Rule");

		corrector.remove(TextRange::new(3, 5));
		corrector.insert_before(7, " ");
		corrector.insert_after(TextRange::new(1, 2), " ");

		assert_eq!(
			corrector.into_edits(),
			vec![
				Edit { start: 3, end: 5, replacement: String::new(), rule: "Test/Rule" },
				Edit { start: 7, end: 7, replacement: " ".to_owned(), rule: "Test/Rule" },
				Edit { start: 2, end: 2, replacement: " ".to_owned(), rule: "Test/Rule" },
			]
		);
	}
}
