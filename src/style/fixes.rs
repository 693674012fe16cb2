use thiserror::Error;

use crate::style::{
	offense::{Corrector, Offense},
	shared::{Edit, TextRange},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum EditError {
	#[error("Conflicting edits: {first_rule} at {first} overlaps {second_rule} at {second}.")]
	Conflict {
		first_rule: &'static str,
		first: TextRange,
		second_rule: &'static str,
		second: TextRange,
	},
	#[error("Invalid edit range {range} from {rule} for text length {len}.")]
	InvalidRange { rule: &'static str, range: TextRange, len: usize },
}

/// Runs every correction once, in offense order.
pub(crate) fn plan_edits(offenses: &[Offense]) -> Vec<Edit> {
	let mut edits = Vec::new();

	for offense in offenses {
		let Some(correction) = &offense.correction else {
			continue;
		};
		let mut corrector = Corrector::new(offense.rule);

		correction(&mut corrector);
		edits.extend(corrector.into_edits());
	}

	edits
}

/// Applies `edits` to `text` in one pass. Nothing is written unless every edit is valid and no
/// two edits touch the same bytes or insert at the same offset.
pub(crate) fn apply_edits(text: &mut String, mut edits: Vec<Edit>) -> Result<usize, EditError> {
	if edits.is_empty() {
		return Ok(0);
	}

	let whole = TextRange::new(0, text.len());

	for edit in &edits {
		if edit.start > edit.end
			|| !whole.contains_range(edit.range())
			|| !text.is_char_boundary(edit.start)
			|| !text.is_char_boundary(edit.end)
		{
			return Err(EditError::InvalidRange {
				rule: edit.rule,
				range: edit.range(),
				len: text.len(),
			});
		}
	}

	edits.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)).then(a.rule.cmp(b.rule)));
	edits.dedup();

	for pair in edits.windows(2) {
		let (prev, next) = (&pair[0], &pair[1]);

		let same_insertion_point =
			prev.is_insertion() && next.is_insertion() && prev.start == next.start;

		if next.start < prev.end || same_insertion_point {
			return Err(EditError::Conflict {
				first_rule: prev.rule,
				first: prev.range(),
				second_rule: next.rule,
				second: next.range(),
			});
		}
	}

	for edit in edits.iter().rev() {
		text.replace_range(edit.start..edit.end, &edit.replacement);
	}

	tracing::debug!(applied = edits.len(), "Applied edits.");

	Ok(edits.len())
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn edit(start: usize, end: usize, replacement: &str, rule: &'static str) -> Edit {
		Edit { start, end, replacement: replacement.to_owned(), rule }
	}

	#[test]
	fn applies_non_overlapping_edits_in_reverse() {
		let mut text = "a[ 1 ] + b[ 2 ]".to_owned();
		let applied = apply_edits(
			&mut text,
			vec![
				edit(13, 14, "", "Layout/A"),
				edit(2, 3, "", "Layout/A"),
				edit(4, 5, "", "Layout/A"),
				edit(11, 12, "", "Layout/A"),
			],
		)
		.expect("apply");

		assert_eq!(applied, 4);
		assert_eq!(text, "a[1] + b[2]");
	}

	#[test]
	fn adjacent_edits_do_not_conflict() {
		let mut text = "foo()".to_owned();

		apply_edits(&mut text, vec![edit(4, 5, "", "Style/B"), edit(3, 4, "", "Style/B")])
			.expect("apply");

		assert_eq!(text, "foo");
	}

	#[test]
	fn overlap_fails_the_whole_file() {
		let mut text = "a[ 1 ]".to_owned();
		let err = apply_edits(&mut text, vec![edit(2, 4, "", "Layout/A"), edit(3, 5, "x", "Style/B")])
			.expect_err("conflict");

		assert_eq!(
			err,
			EditError::Conflict {
				first_rule: "Layout/A",
				first: TextRange::new(2, 4),
				second_rule: "Style/B",
				second: TextRange::new(3, 5),
			}
		);
		assert_eq!(text, "a[ 1 ]");
	}

	#[test]
	fn insertions_at_one_offset_conflict() {
		let mut text = "a[1]".to_owned();
		let err = apply_edits(&mut text, vec![edit(2, 2, " ", "Layout/A"), edit(2, 2, "  ", "Layout/C")])
			.expect_err("conflict");

		assert!(matches!(err, EditError::Conflict { .. }));
		assert_eq!(text, "a[1]");
	}

	#[test]
	fn rejects_out_of_bounds_and_split_characters() {
		let mut text = "é".to_owned();

		assert_eq!(
			apply_edits(&mut text, vec![edit(1, 2, "", "Layout/A")]),
			Err(EditError::InvalidRange { rule: "Layout/A", range: TextRange::new(1, 2), len: 2 })
		);
		assert!(matches!(
			apply_edits(&mut text, vec![edit(0, 9, "", "Layout/A")]),
			Err(EditError::InvalidRange { .. })
		));
		assert_eq!(text, "é");
	}
}
