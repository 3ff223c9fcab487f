#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Copilot metrics, usage, and seat record types.
//!
//! These are the canonical shapes the ingestion pipeline produces and
//! persists. [`MetricsRecord`] and [`SeatAssignment`] arrive (almost) intact
//! from the GitHub API; [`UsageSummary`] is either derived from metrics by
//! the aggregator or decoded from the legacy usage endpoint.
//!
//! Every top-level record carries a natural-key identifier computed by
//! [`identity::record_id`] from its date and scope. See [`Identified`].

pub mod github;
pub mod identity;
pub mod metrics;
pub mod seats;
pub mod usage;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use github::{Organization, Team, User};
pub use metrics::{
    CodeCompletionEditor, CodeCompletionLanguage, CodeCompletionModel, DotcomChat,
    DotcomChatModel, DotcomPullRequests, IdeChat, IdeChatEditor, IdeChatModel, IdeCodeCompletions,
    LanguageEngagement, MetricsRecord, PullRequestModel, PullRequestRepository,
};
pub use seats::{Seat, SeatAssignment, SeatsPage};
pub use usage::{UsageBreakdown, UsageSummary};

/// Which kind of organizational boundary an ingestion run targets.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ScopeKind {
    /// A single GitHub organization.
    #[default]
    Organization,
    /// A GitHub enterprise account spanning many organizations.
    Enterprise,
}

/// The top-level scope an ingestion run fetches data for.
///
/// Exactly one of organization or enterprise is ever set on a record. Teams
/// further qualify either and are carried separately on each record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum Scope {
    /// Organization login (e.g. `"acme"`).
    Organization(String),
    /// Enterprise slug.
    Enterprise(String),
}

impl Scope {
    /// Creates a scope of the given kind.
    #[must_use]
    pub fn new(kind: ScopeKind, name: impl Into<String>) -> Self {
        match kind {
            ScopeKind::Organization => Self::Organization(name.into()),
            ScopeKind::Enterprise => Self::Enterprise(name.into()),
        }
    }

    /// Returns the kind of this scope.
    #[must_use]
    pub const fn kind(&self) -> ScopeKind {
        match self {
            Self::Organization(_) => ScopeKind::Organization,
            Self::Enterprise(_) => ScopeKind::Enterprise,
        }
    }

    /// Returns the organization login or enterprise slug.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Organization(name) | Self::Enterprise(name) => name,
        }
    }

    /// Returns the organization name when this is an organization scope.
    #[must_use]
    pub fn organization(&self) -> Option<&str> {
        match self {
            Self::Organization(name) => Some(name),
            Self::Enterprise(_) => None,
        }
    }

    /// Returns the enterprise name when this is an enterprise scope.
    #[must_use]
    pub fn enterprise(&self) -> Option<&str> {
        match self {
            Self::Enterprise(name) => Some(name),
            Self::Organization(_) => None,
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind(), self.name())
    }
}

/// A top-level record that is persisted under a natural-key identifier.
///
/// Implemented by [`MetricsRecord`], [`SeatAssignment`], and
/// [`UsageSummary`]. Storage backends are generic over this trait.
pub trait Identified {
    /// Collection (table / key prefix) the record is stored in.
    const COLLECTION: &'static str;

    /// Returns the assigned identifier, or an empty string if none has been
    /// assigned yet.
    fn id(&self) -> &str;

    /// Returns the calendar day (`YYYY-MM-DD`) this record describes.
    fn date(&self) -> &str;

    /// Computes the natural-key identifier from the record's date and scope
    /// and stores it on the record.
    ///
    /// Must be called after the scope fields are final.
    fn assign_id(&mut self) -> &str;
}

/// Treats `Some("")` the same as `None`.
pub(crate) fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scope_kind_case_insensitively() {
        assert_eq!(
            "Enterprise".parse::<ScopeKind>().unwrap(),
            ScopeKind::Enterprise
        );
        assert_eq!(
            "organization".parse::<ScopeKind>().unwrap(),
            ScopeKind::Organization
        );
        assert!("team".parse::<ScopeKind>().is_err());
    }

    #[test]
    fn scope_accessors() {
        let scope = Scope::new(ScopeKind::Enterprise, "octo-ent");
        assert_eq!(scope.kind(), ScopeKind::Enterprise);
        assert_eq!(scope.enterprise(), Some("octo-ent"));
        assert_eq!(scope.organization(), None);
        assert_eq!(scope.to_string(), "enterprise octo-ent");
    }
}
