// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TeamCodeError;
use crate::item::Item;

/// Backend-assigned identifier of a shared board.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamCode(String);

impl TeamCode {
	/// Create a TeamCode from an existing string without validation.
	/// Use `parse()` if you need validation.
	pub fn from_string(s: String) -> Self {
		Self(s)
	}

	pub fn parse(s: &str) -> Result<Self, TeamCodeError> {
		let trimmed = s.trim();
		if trimmed.is_empty() {
			return Err(TeamCodeError::Empty);
		}
		if trimmed.chars().any(char::is_whitespace) {
			return Err(TeamCodeError::Whitespace(trimmed.to_string()));
		}
		Ok(Self(trimmed.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for TeamCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for TeamCode {
	type Err = TeamCodeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

/// Where a team's item definitions come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemSourceType {
	/// Items are entered as text when the team is created.
	#[default]
	Manual,
	/// Items are read from an externally hosted document.
	Remote,
}

impl ItemSourceType {
	pub fn as_str(&self) -> &'static str {
		match self {
			ItemSourceType::Manual => "MANUAL",
			ItemSourceType::Remote => "REMOTE",
		}
	}
}

impl FromStr for ItemSourceType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_uppercase().as_str() {
			"MANUAL" => Ok(ItemSourceType::Manual),
			"REMOTE" => Ok(ItemSourceType::Remote),
			_ => Err(format!("invalid item source type: {s}")),
		}
	}
}

impl fmt::Display for ItemSourceType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A team as stored by the backend. The engine only ever holds copies.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TeamRecord {
	pub team_code: Option<TeamCode>,
	pub team_name: String,
	pub webhook: String,
	pub item_source_type: ItemSourceType,
	pub remote_url: String,
	pub manual_items: String,
	pub refresh_interval_minutes: u32,
	pub persist_obtained: bool,
	pub items: Vec<Item>,
}

impl TeamRecord {
	pub fn is_remote(&self) -> bool {
		self.item_source_type == ItemSourceType::Remote && !self.remote_url.trim().is_empty()
	}

	pub fn find_item(&self, name: &str) -> Option<&Item> {
		self.items.iter().find(|item| item.matches(name))
	}
}

/// Everything needed to create a team on the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
	pub team_name: String,
	pub webhook: String,
	pub item_source_type: ItemSourceType,
	pub remote_url: String,
	pub manual_items: String,
	#[serde(rename = "refreshInterval")]
	pub refresh_interval_minutes: u32,
	pub persist_obtained: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub leader: Option<String>,
}

impl CreateTeamRequest {
	pub fn new(team_name: impl Into<String>) -> Self {
		Self {
			team_name: team_name.into(),
			..Self::default()
		}
	}

	pub fn with_manual_items(mut self, text: impl Into<String>) -> Self {
		self.item_source_type = ItemSourceType::Manual;
		self.manual_items = text.into();
		self
	}

	pub fn with_remote_url(mut self, url: impl Into<String>) -> Self {
		self.item_source_type = ItemSourceType::Remote;
		self.remote_url = url.into();
		self
	}

	pub fn with_webhook(mut self, webhook: impl Into<String>) -> Self {
		self.webhook = webhook.into();
		self
	}

	pub fn with_refresh_interval(mut self, minutes: u32) -> Self {
		self.refresh_interval_minutes = minutes;
		self
	}

	pub fn with_persist_obtained(mut self, persist: bool) -> Self {
		self.persist_obtained = persist;
		self
	}

	pub fn with_leader(mut self, leader: impl Into<String>) -> Self {
		self.leader = Some(leader.into());
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn team_code_parse_trims() {
		let code = TeamCode::parse("  ABC123 ").unwrap();
		assert_eq!(code.as_str(), "ABC123");
	}

	#[test]
	fn team_code_rejects_empty_and_whitespace() {
		assert_eq!(TeamCode::parse("   "), Err(TeamCodeError::Empty));
		assert!(matches!(
			TeamCode::parse("AB C"),
			Err(TeamCodeError::Whitespace(_))
		));
	}

	#[test]
	fn source_type_wire_format_is_uppercase() {
		let json = serde_json::to_string(&ItemSourceType::Remote).unwrap();
		assert_eq!(json, "\"REMOTE\"");
		let parsed: ItemSourceType = serde_json::from_str("\"MANUAL\"").unwrap();
		assert_eq!(parsed, ItemSourceType::Manual);
		assert_eq!("remote".parse::<ItemSourceType>().unwrap(), ItemSourceType::Remote);
	}

	#[test]
	fn record_is_remote_requires_url() {
		let mut record = TeamRecord {
			item_source_type: ItemSourceType::Remote,
			..TeamRecord::default()
		};
		assert!(!record.is_remote());
		record.remote_url = "https://pastebin.com/abc".to_string();
		assert!(record.is_remote());
	}

	#[test]
	fn create_request_serializes_refresh_interval_name() {
		let request = CreateTeamRequest::new("Raiders")
			.with_remote_url("https://example.com/list.txt")
			.with_refresh_interval(10);
		let json = serde_json::to_value(&request).unwrap();
		assert_eq!(json["teamName"], "Raiders");
		assert_eq!(json["refreshInterval"], 10);
		assert_eq!(json["itemSourceType"], "REMOTE");
		assert!(json.get("leader").is_none());
	}
}
