//! GitHub account types embedded in seat assignments.
//!
//! Only the fields the dashboard reads are modelled; everything else in the
//! API payload is ignored on decode.

use serde::{Deserialize, Serialize};

/// A GitHub user (seat assignee).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Numeric user ID.
    #[serde(default)]
    pub id: u64,
    /// Login handle.
    pub login: String,
    /// Display name, when public.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub html_url: String,
    /// Account type (`"User"`, `"Bot"`, ...).
    #[serde(default, rename = "type")]
    pub account_type: String,
    #[serde(default)]
    pub site_admin: bool,
}

/// A GitHub team (seat assigner).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Numeric team ID.
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub node_id: String,
    /// Display name.
    pub name: String,
    /// URL-safe slug used in team-scoped API paths.
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub html_url: String,
    #[serde(default)]
    pub privacy: String,
}

/// A GitHub organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Numeric organization ID.
    #[serde(default)]
    pub id: u64,
    /// Login handle.
    pub login: String,
    #[serde(default)]
    pub node_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
