// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Backend key escaping.
//!
//! Item names become path and map-key segments on the backend, which rejects a
//! handful of structural characters. Each one maps to a distinct literal token.
//! The display name always travels separately in the payload, so
//! [`unescape_key`] is only used to label entries whose payload lacks one.

const SUBSTITUTIONS: &[(char, &str)] = &[
	('.', "_DOT_"),
	('$', "_DOLLAR_"),
	('#', "_HASH_"),
	('[', "_LBRACKET_"),
	(']', "_RBRACKET_"),
	('/', "_SLASH_"),
	('\\', "_BACKSLASH_"),
	('?', "_QMARK_"),
	('%', "_PERCENT_"),
];

/// Escapes `name` for use as a backend key segment.
pub fn escape_key(name: &str) -> String {
	let mut escaped = String::with_capacity(name.len());
	for c in name.chars() {
		match SUBSTITUTIONS.iter().find(|(unsafe_char, _)| *unsafe_char == c) {
			Some((_, token)) => escaped.push_str(token),
			None => escaped.push(c),
		}
	}
	escaped
}

/// Reverses [`escape_key`].
pub fn unescape_key(key: &str) -> String {
	let mut name = key.to_string();
	for (unsafe_char, token) in SUBSTITUTIONS {
		if name.contains(token) {
			name = name.replace(token, &unsafe_char.to_string());
		}
	}
	name
}
