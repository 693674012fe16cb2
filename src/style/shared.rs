use std::{
	fmt, fs,
	path::{Path, PathBuf},
	process::Command,
};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
	prelude::*,
	style::{
		parens, parser,
		parser::ParseError,
		spacing,
		syntax::SyntaxTree,
		token::{Token, TokenIndex},
	},
};

pub(crate) const STYLE_RULE_IDS: [&str; 2] = [spacing::RULE_ID, parens::RULE_ID];

pub(crate) static RUBY_FILE_RE: Lazy<Regex> = Lazy::new(|| {
	Regex::new(r"(?:\.(?:rb|rake|gemspec|ru)|(?:^|/)(?:Rakefile|Gemfile))$")
		.expect("Expected operation to succeed.")
});

/// Half-open byte range `[start, end)` into a source text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct TextRange {
	pub(crate) start: usize,
	pub(crate) end: usize,
}
impl TextRange {
	pub(crate) const fn new(start: usize, end: usize) -> Self {
		Self { start, end }
	}

	pub(crate) const fn empty(offset: usize) -> Self {
		Self { start: offset, end: offset }
	}

	pub(crate) const fn is_empty(&self) -> bool {
		self.start == self.end
	}

	pub(crate) const fn contains_range(&self, other: TextRange) -> bool {
		self.start <= other.start && other.end <= self.end
	}

	pub(crate) fn cover(self, other: TextRange) -> Self {
		Self { start: self.start.min(other.start), end: self.end.max(other.end) }
	}
}
impl fmt::Display for TextRange {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}..{}", self.start, self.end)
	}
}

#[derive(Debug, Clone)]
pub(crate) struct Violation {
	pub(crate) file: PathBuf,
	pub(crate) line: usize,
	pub(crate) column: usize,
	pub(crate) rule: &'static str,
	pub(crate) message: String,
	pub(crate) fixable: bool,
}
impl Violation {
	pub(crate) fn format(&self) -> String {
		format!(
			"{}:{}:{}: [{}] {}{}",
			self.file.display(),
			self.line,
			self.column,
			self.rule,
			self.message,
			if self.fixable { " (correctable)" } else { "" }
		)
	}
}

/// A byte-range replacement produced by a correction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Edit {
	pub(crate) start: usize,
	pub(crate) end: usize,
	pub(crate) replacement: String,
	pub(crate) rule: &'static str,
}
impl Edit {
	pub(crate) fn range(&self) -> TextRange {
		TextRange::new(self.start, self.end)
	}

	pub(crate) fn is_insertion(&self) -> bool {
		self.range().is_empty()
	}
}

#[derive(Debug, Clone, Default)]
pub(crate) struct RunSummary {
	pub(crate) file_count: usize,
	pub(crate) violation_count: usize,
	pub(crate) unfixable_count: usize,
	pub(crate) applied_fix_count: usize,
	pub(crate) output_lines: Vec<String>,
	pub(crate) fix_errors: Vec<String>,
}
impl RunSummary {
	/// Offenses remain, or some file could not be corrected.
	pub(crate) fn has_failures(&self) -> bool {
		self.violation_count > 0 || !self.fix_errors.is_empty()
	}
}

/// One parsed source unit: text, token stream and syntax tree, read-only during a pass.
#[derive(Debug)]
pub(crate) struct FileContext {
	pub(crate) path: PathBuf,
	pub(crate) text: String,
	pub(crate) line_starts: Vec<usize>,
	pub(crate) tokens: TokenIndex,
	pub(crate) tree: SyntaxTree,
}
impl FileContext {
	pub(crate) fn new(path: &Path, text: String, tokens: Vec<Token>, tree: SyntaxTree) -> Self {
		let line_starts = build_line_starts(&text);

		Self { path: path.to_path_buf(), text, line_starts, tokens: TokenIndex::new(tokens), tree }
	}

	pub(crate) fn slice(&self, range: TextRange) -> &str {
		self.text.get(range.start..range.end).unwrap_or_default()
	}

	pub(crate) fn is_multiline(&self, range: TextRange) -> bool {
		self.slice(range).contains('\n')
	}

	/// 1-based line and column of a byte offset.
	pub(crate) fn line_col(&self, offset: usize) -> (usize, usize) {
		let line = line_from_offset(&self.line_starts, offset);
		let line_start = offset_from_line(&self.line_starts, line).unwrap_or_default();

		(line, offset.saturating_sub(line_start) + 1)
	}

	/// Horizontal whitespace between the token at `idx` and its successor.
	pub(crate) fn space_after(&self, idx: usize) -> Option<TextRange> {
		let token = self.tokens.get(idx)?;
		let next_start = self.tokens.next_token(idx).map_or(self.text.len(), |next| next.range.start);

		self.horizontal_gap(TextRange::new(token.range.end, next_start))
	}

	/// Horizontal whitespace between the token at `idx` and its predecessor.
	pub(crate) fn space_before(&self, idx: usize) -> Option<TextRange> {
		let token = self.tokens.get(idx)?;
		let previous_end = self.tokens.previous_token(idx).map_or(0, |previous| previous.range.end);

		self.horizontal_gap(TextRange::new(previous_end, token.range.start))
	}

	fn horizontal_gap(&self, gap: TextRange) -> Option<TextRange> {
		if gap.start >= gap.end {
			return None;
		}

		self.slice(gap).bytes().all(|byte| matches!(byte, b' ' | b'\t')).then_some(gap)
	}
}

pub(crate) fn is_ruby_file(path: &Path) -> bool {
	RUBY_FILE_RE.is_match(&path.to_string_lossy())
}

pub(crate) fn resolve_files(requested_files: &[PathBuf]) -> Result<Vec<PathBuf>> {
	if !requested_files.is_empty() {
		return Ok(requested_files.iter().filter(|file| is_ruby_file(file)).cloned().collect());
	}

	git_ls_files_ruby()
}

/// Reads and parses `path`. Unreadable or unparsable files are skipped with a warning.
pub(crate) fn read_file_context(path: &Path) -> Option<FileContext> {
	let text = match fs::read_to_string(path) {
		Ok(text) => text,
		Err(err) => {
			tracing::warn!(path = %path.display(), error = %err, "Skipping unreadable file.");

			return None;
		},
	};

	match read_file_context_from_text(path, text) {
		Ok(ctx) => Some(ctx),
		Err(err) => {
			tracing::warn!(path = %path.display(), error = %err, "Skipping unparsable file.");

			None
		},
	}
}

pub(crate) fn read_file_context_from_text(
	path: &Path,
	text: String,
) -> std::result::Result<FileContext, ParseError> {
	let (tokens, tree) = parser::parse(&text)?;

	tracing::trace!(
		path = %path.display(),
		tokens = tokens.len(),
		nodes = tree.len(),
		"Parsed source."
	);

	Ok(FileContext::new(path, text, tokens, tree))
}

pub(crate) fn line_from_offset(line_starts: &[usize], offset: usize) -> usize {
	match line_starts.binary_search(&offset) {
		Ok(pos) => pos + 1,
		Err(pos) => pos,
	}
}

pub(crate) fn offset_from_line(line_starts: &[usize], line_one_based: usize) -> Option<usize> {
	if line_one_based == 0 {
		return None;
	}

	line_starts.get(line_one_based - 1).copied()
}

fn git_ls_files_ruby() -> Result<Vec<PathBuf>> {
	let output = Command::new("git")
		.args(["ls-files"])
		.output()
		.map_err(|err| eyre::eyre!("Failed to run git ls-files: {err}."))?;

	if !output.status.success() {
		return Err(eyre::eyre!("git ls-files failed with status {}.", output.status));
	}

	let stdout = String::from_utf8(output.stdout)?;
	let mut files = Vec::new();

	for line in stdout.lines() {
		if !line.is_empty() && RUBY_FILE_RE.is_match(line) {
			files.push(PathBuf::from(line));
		}
	}

	Ok(files)
}

fn build_line_starts(text: &str) -> Vec<usize> {
	let mut starts = vec![0_usize];

	for (idx, ch) in text.char_indices() {
		if ch == '\n' {
			starts.push(idx + 1);
		}
	}

	starts
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn skipped_corrections_fail_the_run() {
		let clean = RunSummary { file_count: 2, ..RunSummary::default() };
		let skipped = RunSummary { fix_errors: vec!["a.rb: conflict".to_owned()], ..clean.clone() };
		let remaining = RunSummary { violation_count: 1, ..clean.clone() };

		assert!(!clean.has_failures());
		assert!(skipped.has_failures());
		assert!(remaining.has_failures());
	}

	#[test]
	fn line_col_is_one_based() {
		let ctx = read_file_context_from_text(Path::new("a.rb"), "foo\n  bar()\n".to_owned())
			.expect("parse");

		assert_eq!(ctx.line_col(0), (1, 1));
		assert_eq!(ctx.line_col(4), (2, 1));
		assert_eq!(ctx.line_col(9), (2, 6));
	}

	#[test]
	fn detects_ruby_files() {
		assert!(is_ruby_file(Path::new("lib/app.rb")));
		assert!(is_ruby_file(Path::new("Rakefile")));
		assert!(is_ruby_file(Path::new("app/Gemfile")));
		assert!(!is_ruby_file(Path::new("src/main.rs")));
		assert!(!is_ruby_file(Path::new("notes.rbx")));
	}

	#[test]
	fn whitespace_runs_stop_at_tokens() {
		let ctx = read_file_context_from_text(Path::new("a.rb"), "a[ \t1  ]".to_owned())
			.expect("parse");
		let tokens = ctx.tokens.tokens_in(TextRange::new(0, ctx.text.len()));

		assert_eq!(tokens.len(), 4);
		assert_eq!(ctx.space_after(1), Some(TextRange::new(2, 4)));
		assert_eq!(ctx.space_before(3), Some(TextRange::new(5, 7)));
		assert_eq!(ctx.space_after(0), None);
		assert_eq!(ctx.space_after(3), None);
	}
}
