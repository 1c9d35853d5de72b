// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! XDG Base Directory compliant path resolution.

use std::path::PathBuf;

use crate::ConfigError;

const APP_DIR: &str = "teamboard";

/// Resolved XDG paths for teamboard.
#[derive(Debug, Clone)]
pub struct PathsConfig {
	/// User config file: ~/.config/teamboard/config.toml
	pub user_config_file: PathBuf,
	/// System config file: /etc/teamboard/config.toml
	pub system_config_file: PathBuf,
	/// Data directory: ~/.local/share/teamboard/
	pub data_dir: PathBuf,
	/// Cache directory: ~/.cache/teamboard/
	pub cache_dir: PathBuf,
}

impl PathsConfig {
	pub fn config_dir(&self) -> PathBuf {
		self
			.user_config_file
			.parent()
			.map(|p| p.to_path_buf())
			.unwrap_or_else(|| self.user_config_file.clone())
	}
}

impl Default for PathsConfig {
	fn default() -> Self {
		Self {
			user_config_file: PathBuf::from("~/.config/teamboard/config.toml"),
			system_config_file: PathBuf::from("/etc/teamboard/config.toml"),
			data_dir: PathBuf::from("~/.local/share/teamboard"),
			cache_dir: PathBuf::from("~/.cache/teamboard"),
		}
	}
}

/// Resolve XDG paths, honouring `XDG_CONFIG_HOME`, `XDG_DATA_HOME` and
/// `XDG_CACHE_HOME` when set.
pub fn resolve_xdg_paths() -> Result<PathsConfig, ConfigError> {
	let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;

	let config_home = std::env::var_os("XDG_CONFIG_HOME")
		.map(PathBuf::from)
		.unwrap_or_else(|| home.join(".config"));

	let data_home = std::env::var_os("XDG_DATA_HOME")
		.map(PathBuf::from)
		.unwrap_or_else(|| home.join(".local/share"));

	let cache_home = std::env::var_os("XDG_CACHE_HOME")
		.map(PathBuf::from)
		.unwrap_or_else(|| home.join(".cache"));

	tracing::debug!(
		config_home = %config_home.display(),
		data_home = %data_home.display(),
		cache_home = %cache_home.display(),
		"resolved XDG paths"
	);

	Ok(PathsConfig {
		user_config_file: config_home.join(APP_DIR).join("config.toml"),
		system_config_file: PathBuf::from("/etc").join(APP_DIR).join("config.toml"),
		data_dir: data_home.join(APP_DIR),
		cache_dir: cache_home.join(APP_DIR),
	})
}
