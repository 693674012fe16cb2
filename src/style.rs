mod config;
mod dispatch;
mod fixes;
mod lexer;
mod offense;
mod parens;
mod parser;
mod shared;
mod spacing;
mod syntax;
mod token;

pub(crate) use config::StyleConfig;
pub(crate) use shared::RunSummary;

use std::{
	fs,
	path::{Path, PathBuf},
};

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::prelude::*;
use dispatch::Registry;
use fixes::EditError;
use shared::{FileContext, Violation};

const FILE_BATCH_SIZE: usize = 64;
const MAX_FIX_PASSES: usize = 8;

#[derive(Debug)]
struct FileFixOutcome {
	path: PathBuf,
	rewritten_text: Option<String>,
	applied_count: usize,
	error: Option<EditError>,
}

pub(crate) fn run_check(requested_files: &[PathBuf], config: &StyleConfig) -> Result<RunSummary> {
	let files = shared::resolve_files(requested_files)?;

	Ok(check_files(&files, &Registry::from_config(config)))
}

pub(crate) fn run_fix(requested_files: &[PathBuf], config: &StyleConfig) -> Result<RunSummary> {
	let files = shared::resolve_files(requested_files)?;
	let registry = Registry::from_config(config);
	let mut total_applied = 0_usize;
	let mut fix_errors = Vec::new();

	for batch in files.chunks(FILE_BATCH_SIZE) {
		let outcomes = batch.par_iter().map(|file| fix_file(&registry, file)).collect::<Vec<_>>();

		for outcome in outcomes {
			if let Some(err) = outcome.error {
				tracing::warn!(path = %outcome.path.display(), error = %err, "Leaving file unchanged.");

				fix_errors.push(format!("{}: {err}", outcome.path.display()));

				continue;
			}

			total_applied += outcome.applied_count;

			if let Some(text) = outcome.rewritten_text {
				fs::write(&outcome.path, text)?;
			}
		}
	}

	let checked = check_files(&files, &registry);

	Ok(RunSummary { applied_fix_count: total_applied, fix_errors, ..checked })
}

pub(crate) fn print_coverage(config: &StyleConfig) {
	let enabled = Registry::from_config(config).rule_ids();

	for rule in shared::STYLE_RULE_IDS {
		let status = if enabled.contains(&rule) { "enabled" } else { "disabled" };

		println!("{rule}\t{status}");
	}
}

fn check_files(files: &[PathBuf], registry: &Registry) -> RunSummary {
	let mut violations: Vec<Violation> = Vec::new();

	for batch in files.chunks(FILE_BATCH_SIZE) {
		let batch_results = batch
			.par_iter()
			.map(|file| {
				let Some(ctx) = shared::read_file_context(file) else {
					return Vec::new();
				};

				collect_violations(registry, &ctx)
			})
			.collect::<Vec<_>>();

		for found in batch_results {
			violations.extend(found);
		}
	}

	violations.sort_by(|a, b| {
		a.file.cmp(&b.file).then(a.line.cmp(&b.line)).then(a.column.cmp(&b.column))
	});

	let unfixable_count = violations.iter().filter(|v| !v.fixable).count();
	let output_lines = violations.into_iter().map(|v| v.format()).collect::<Vec<_>>();

	RunSummary {
		file_count: files.len(),
		violation_count: output_lines.len(),
		unfixable_count,
		applied_fix_count: 0,
		output_lines,
		fix_errors: Vec::new(),
	}
}

fn fix_file(registry: &Registry, path: &Path) -> FileFixOutcome {
	let mut outcome =
		FileFixOutcome { path: path.to_path_buf(), rewritten_text: None, applied_count: 0, error: None };
	let original_text = match fs::read_to_string(path) {
		Ok(text) => text,
		Err(err) => {
			tracing::warn!(path = %path.display(), error = %err, "Skipping unreadable file.");

			return outcome;
		},
	};

	match apply_fix_passes(registry, path, &original_text) {
		Ok((text, applied_count)) => {
			outcome.applied_count = applied_count;
			outcome.rewritten_text = (applied_count > 0 && text != original_text).then_some(text);
		},
		Err(err) => outcome.error = Some(err),
	}

	outcome
}

/// Corrects and re-parses until a pass produces no edits. Any conflict discards every pass.
fn apply_fix_passes(
	registry: &Registry,
	path: &Path,
	initial_text: &str,
) -> std::result::Result<(String, usize), EditError> {
	let mut text = initial_text.to_owned();
	let mut applied_count = 0_usize;

	for pass in 1..=MAX_FIX_PASSES {
		let ctx = match shared::read_file_context_from_text(path, text.clone()) {
			Ok(ctx) => ctx,
			Err(err) => {
				tracing::warn!(path = %path.display(), pass, error = %err, "Stopping fix passes.");

				break;
			},
		};
		let edits = fixes::plan_edits(&registry.run(&ctx));

		if edits.is_empty() {
			break;
		}

		let applied = fixes::apply_edits(&mut text, edits)?;

		tracing::debug!(path = %path.display(), pass, applied, "Applied fix pass.");

		if applied == 0 {
			break;
		}

		applied_count += applied;
	}

	Ok((text, applied_count))
}

fn collect_violations(registry: &Registry, ctx: &FileContext) -> Vec<Violation> {
	registry.run(ctx).iter().map(|offense| offense.to_violation(ctx)).collect()
}

#[cfg(test)]
mod tests {
	use std::{
		fs,
		path::Path,
		time::{SystemTime, UNIX_EPOCH},
	};

	use pretty_assertions::assert_eq;

	use crate::style::{
		StyleConfig, apply_fix_passes, collect_violations,
		dispatch::{Registry, Rule},
		fix_file,
		fixes::EditError,
		offense::{Corrector, OffenseCollector},
		shared::{self, FileContext, TextRange},
		syntax::{NodeCategory, NodeId},
	};

	/// Rewrites every call to a fixed text, so two of them always collide.
	struct RenameSend(&'static str, &'static str);
	impl Rule for RenameSend {
		fn id(&self) -> &'static str {
			self.0
		}

		fn interests(&self) -> &'static [NodeCategory] {
			&[NodeCategory::Send]
		}

		fn check(&self, ctx: &FileContext, node: NodeId, offenses: &mut OffenseCollector) {
			let range = ctx.tree.node(node).range;
			let replacement = self.1;

			offenses.push(
				ctx,
				self.0,
				range,
				"rename",
				Some(Box::new(move |corrector: &mut Corrector| {
					corrector.replace(range, replacement);
				})),
			);
		}
	}

	fn colliding_registry() -> Registry {
		Registry::new(vec![
			Box::new(RenameSend("Test/Upper", "FOO()")),
			Box::new(RenameSend("Test/Lower", "bar()")),
		])
	}

	fn fixed(config: &StyleConfig, text: &str) -> (String, usize) {
		apply_fix_passes(&Registry::from_config(config), Path::new("a.rb"), text).expect("fix")
	}

	#[test]
	fn violations_carry_position_and_correctable_flag() {
		let ctx = shared::read_file_context_from_text(
			Path::new("lib/a.rb"),
			"x = 1\nhash[ :key ]\n".to_owned(),
		)
		.expect("context");
		let lines = collect_violations(&Registry::from_config(&StyleConfig::default()), &ctx)
			.iter()
			.map(|violation| violation.format())
			.collect::<Vec<_>>();

		assert_eq!(
			lines,
			vec![
				"lib/a.rb:2:6: [Layout/SpaceInsideReferenceBrackets] Unnecessary space inside reference brackets. (correctable)",
				"lib/a.rb:2:11: [Layout/SpaceInsideReferenceBrackets] Unnecessary space inside reference brackets. (correctable)",
			]
		);
	}

	#[test]
	fn fix_passes_apply_both_rules() {
		let (text, applied) = fixed(&StyleConfig::default(), "value = hash[ key() ]\nobj.run()\n");

		assert_eq!(text, "value = hash[key]\nobj.run\n");
		assert_eq!(applied, 6);
	}

	#[test]
	fn fix_passes_respect_configuration() {
		let config = StyleConfig::from_yaml(
			"Layout/SpaceInsideReferenceBrackets:\n  EnforcedStyle: space\nStyle/MethodCallWithoutArgsParentheses:\n  Enabled: false\n",
		)
		.expect("config");

		assert_eq!(fixed(&config, "a[b()]").0, "a[ b() ]");
	}

	#[test]
	fn clean_text_is_left_alone() {
		assert_eq!(fixed(&StyleConfig::default(), "x = x()\nh[1]\n"), ("x = x()\nh[1]\n".to_owned(), 0));
	}

	#[test]
	fn conflicting_corrections_are_reported_without_rewriting() {
		let err = apply_fix_passes(&colliding_registry(), Path::new("a.rb"), "foo()\n")
			.expect_err("conflict");

		assert!(matches!(
			err,
			EditError::Conflict { first: TextRange { start: 0, end: 5 }, .. }
		));

		let stamp = SystemTime::now().duration_since(UNIX_EPOCH).expect("Clock.").as_nanos();
		let path = std::env::temp_dir().join(format!("rbstyle-conflict-{stamp}.rb"));

		fs::write(&path, "foo()\n").expect("write source");

		let outcome = fix_file(&colliding_registry(), &path);

		assert!(outcome.error.is_some());
		assert_eq!(outcome.rewritten_text, None);
		assert_eq!(outcome.applied_count, 0);
		assert_eq!(fs::read_to_string(&path).expect("read source"), "foo()\n");

		let _ = fs::remove_file(&path);
	}
}
