use std::{
	collections::{BTreeMap, BTreeSet},
	fs,
	path::{Path, PathBuf},
	str::FromStr,
};

use serde::Deserialize;
use thiserror::Error;

use crate::style::{shared::STYLE_RULE_IDS, spacing};

pub(crate) const DEFAULT_CONFIG_FILE: &str = ".rbstyle.yml";

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
	#[error("Failed to read config file {}: {source}.", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("Invalid config YAML: {0}.")]
	Yaml(#[from] serde_yaml::Error),
	#[error("Unknown EnforcedStyle `{style}` for {rule}; supported styles are no_space and space.")]
	UnknownStyle { rule: &'static str, style: String },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum BracketSpacingStyle {
	#[default]
	NoSpace,
	Space,
}
impl FromStr for BracketSpacingStyle {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"no_space" => Ok(Self::NoSpace),
			"space" => Ok(Self::Space),
			other =>
				Err(ConfigError::UnknownStyle { rule: spacing::RULE_ID, style: other.to_owned() }),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RuleSection {
	enabled: Option<bool>,
	enforced_style: Option<String>,
}

/// Resolved rule settings, fixed for the whole run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct StyleConfig {
	pub(crate) bracket_spacing: BracketSpacingStyle,
	disabled: BTreeSet<&'static str>,
}
impl StyleConfig {
	/// Loads `explicit`, or `.rbstyle.yml` in the working directory when present.
	pub(crate) fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
		let path = match explicit {
			Some(path) => path.to_path_buf(),
			None => {
				let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);

				if !default_path.is_file() {
					return Ok(Self::default());
				}

				default_path
			},
		};
		let text = fs::read_to_string(&path)
			.map_err(|source| ConfigError::Io { path: path.clone(), source })?;

		tracing::debug!(path = %path.display(), "Loaded style config.");

		Self::from_yaml(&text)
	}

	pub(crate) fn from_yaml(text: &str) -> Result<Self, ConfigError> {
		let mut config = Self::default();

		if text.trim().is_empty() {
			return Ok(config);
		}

		let sections: Option<BTreeMap<String, serde_yaml::Value>> = serde_yaml::from_str(text)?;

		for (name, value) in sections.unwrap_or_default() {
			let Some(rule) = STYLE_RULE_IDS.iter().copied().find(|rule| *rule == name) else {
				tracing::warn!(section = %name, "Ignoring unknown config section.");

				continue;
			};

			if value.is_null() {
				continue;
			}

			let section: RuleSection = serde_yaml::from_value(value)?;

			if section.enabled == Some(false) {
				config.disabled.insert(rule);
			}
			if rule == spacing::RULE_ID
				&& let Some(style) = &section.enforced_style
			{
				config.bracket_spacing = style.parse()?;
			}
		}

		Ok(config)
	}

	pub(crate) fn is_enabled(&self, rule: &str) -> bool {
		!self.disabled.contains(rule)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::style::parens;

	#[test]
	fn defaults_enable_every_rule_without_space() {
		let config = StyleConfig::from_yaml("").expect("config");

		assert_eq!(config, StyleConfig::default());
		assert_eq!(config.bracket_spacing, BracketSpacingStyle::NoSpace);
		assert!(STYLE_RULE_IDS.iter().all(|rule| config.is_enabled(rule)));
	}

	#[test]
	fn reads_style_and_enabled_flags() {
		let config = StyleConfig::from_yaml(
			"Layout/SpaceInsideReferenceBrackets:\n  EnforcedStyle: space\nStyle/MethodCallWithoutArgsParentheses:\n  Enabled: false\nAllCops:\n  TargetRubyVersion: 3.3\n",
		)
		.expect("config");

		assert_eq!(config.bracket_spacing, BracketSpacingStyle::Space);
		assert!(config.is_enabled(spacing::RULE_ID));
		assert!(!config.is_enabled(parens::RULE_ID));
	}

	#[test]
	fn ignores_top_level_keys_that_are_not_rule_sections() {
		let config = StyleConfig::from_yaml(
			"inherit_from: .rubocop_todo.yml\nrequire:\n  - rubocop-rails\nEnabled: pending\nLayout/SpaceInsideReferenceBrackets:\n  EnforcedStyle: space\n",
		)
		.expect("config");

		assert_eq!(config.bracket_spacing, BracketSpacingStyle::Space);
		assert!(STYLE_RULE_IDS.iter().all(|rule| config.is_enabled(rule)));
	}

	#[test]
	fn empty_rule_section_keeps_defaults() {
		let config =
			StyleConfig::from_yaml("Style/MethodCallWithoutArgsParentheses:\n").expect("config");

		assert_eq!(config, StyleConfig::default());
	}

	#[test]
	fn malformed_rule_section_is_an_error() {
		let err = StyleConfig::from_yaml("Layout/SpaceInsideReferenceBrackets: space\n")
			.expect_err("scalar section");

		assert!(matches!(err, ConfigError::Yaml(_)));
	}

	#[test]
	fn rejects_unknown_style() {
		let err =
			StyleConfig::from_yaml("Layout/SpaceInsideReferenceBrackets:\n  EnforcedStyle: compact\n")
				.expect_err("unknown style");

		assert!(matches!(
			err,
			ConfigError::UnknownStyle { rule: spacing::RULE_ID, ref style } if style == "compact"
		));
	}

	#[test]
	fn reports_missing_explicit_file() {
		let err = StyleConfig::load(Some(Path::new("/nonexistent/rbstyle/config.yml")))
			.expect_err("missing file");

		assert!(matches!(err, ConfigError::Io { .. }));
	}
}
