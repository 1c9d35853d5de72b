// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TeamCodeError {
	#[error("team code is empty")]
	Empty,

	#[error("team code contains whitespace: '{0}'")]
	Whitespace(String),
}
