// crates.io
use clap::{
	ArgAction, Parser, Subcommand,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};

// std
use std::{path::PathBuf, process::ExitCode};

// self
use crate::{
	prelude::*,
	style::{self, RunSummary, StyleConfig},
};

/// Command-line interface for the Ruby style checker.
#[derive(Debug, Parser)]
#[command(
	version = concat!(
		env!("CARGO_PKG_VERSION"),
		"-",
		env!("VERGEN_GIT_SHA"),
		"-",
		env!("VERGEN_CARGO_TARGET_TRIPLE"),
	),
	rename_all = "kebab",
	styles = styles(),
)]
pub(crate) struct Cli {
	/// Style config file. Defaults to `.rbstyle.yml` when present.
	#[arg(long, global = true, value_name = "PATH")]
	config: Option<PathBuf>,
	/// Raise log verbosity; repeat for more detail. `RUST_LOG` takes precedence.
	#[arg(short, long, global = true, action = ArgAction::Count)]
	verbose: u8,
	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Run style checks and report offenses.
	Check {
		/// Optional Ruby files. Defaults to git-tracked Ruby sources.
		files: Vec<PathBuf>,
	},
	/// Apply all safe automatic corrections, then re-check.
	Fix {
		/// Optional Ruby files. Defaults to git-tracked Ruby sources.
		files: Vec<PathBuf>,
	},
	/// Print implemented rule IDs and whether the config enables them.
	Coverage,
}

impl Cli {
	pub(crate) fn log_directive(&self) -> &'static str {
		match self.verbose {
			0 => "warn",
			1 => "info",
			2 => "debug",
			_ => "trace",
		}
	}

	pub(crate) fn run(&self) -> Result<ExitCode> {
		let config = StyleConfig::load(self.config.as_deref())?;

		match &self.command {
			Command::Check { files } => {
				let summary = style::run_check(files, &config)?;
				print_summary(&summary, false);
				if summary.has_failures() {
					eprintln!("\nFound {} offense(s).", summary.violation_count);
					return Ok(ExitCode::FAILURE);
				}
			},
			Command::Fix { files } => {
				let summary = style::run_fix(files, &config)?;
				print_summary(&summary, true);
				if summary.has_failures() {
					eprintln!("\nFound {} remaining offense(s) after fix.", summary.violation_count);
					return Ok(ExitCode::FAILURE);
				}
			},
			Command::Coverage => style::print_coverage(&config),
		}

		Ok(ExitCode::SUCCESS)
	}
}

fn print_summary(summary: &RunSummary, fix_mode: bool) {
	for line in &summary.output_lines {
		println!("{line}");
	}

	if fix_mode {
		println!(
			"\nChecked {} file(s). Applied {} correction(s).",
			summary.file_count, summary.applied_fix_count
		);

		for error in &summary.fix_errors {
			eprintln!("Skipped correcting {error}");
		}
	} else {
		println!("\nChecked {} file(s).", summary.file_count);
	}

	if summary.unfixable_count > 0 {
		println!("{} offense(s) require manual fixes.", summary.unfixable_count);
	}
}

fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn parses_check_subcommand() {
		let cli = Cli::parse_from(["app", "check"]);
		assert!(matches!(cli.command, Command::Check { .. }));
	}

	#[test]
	fn global_flags_follow_subcommand() {
		let cli = Cli::parse_from(["app", "fix", "a.rb", "--config", "style.yml", "-vv"]);

		assert!(matches!(&cli.command, Command::Fix { files } if files == &[PathBuf::from("a.rb")]));
		assert_eq!(cli.config, Some(PathBuf::from("style.yml")));
		assert_eq!(cli.log_directive(), "debug");
		assert_eq!(Cli::parse_from(["app", "coverage"]).log_directive(), "warn");
	}
}
