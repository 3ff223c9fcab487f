//! Flattened daily usage summaries.
//!
//! A [`UsageSummary`] is normally derived from one or more
//! [`crate::MetricsRecord`]s by the aggregator, but the same shape is also
//! served directly by the legacy `copilot/usage` endpoints.

use serde::{Deserialize, Serialize};

use crate::{Identified, identity, non_empty};

/// Aggregated Copilot usage for one calendar day and one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Natural-key identifier. Empty until [`Identified::assign_id`] runs.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Calendar day (`YYYY-MM-DD`).
    pub day: String,
    /// Code suggestions shown.
    #[serde(default)]
    pub total_suggestions_count: u64,
    /// Code suggestions accepted.
    #[serde(default)]
    pub total_acceptances_count: u64,
    /// Lines suggested.
    #[serde(default)]
    pub total_lines_suggested: u64,
    /// Lines accepted.
    #[serde(default)]
    pub total_lines_accepted: u64,
    /// Distinct active users (never summed across scopes).
    #[serde(default)]
    pub total_active_users: u64,
    /// Chat suggestions copied or inserted.
    #[serde(default)]
    pub total_chat_acceptances: u64,
    /// Chat turns across IDE and GitHub.com chat.
    #[serde(default)]
    pub total_chat_turns: u64,
    /// Distinct active chat users (never summed across scopes).
    #[serde(default)]
    pub total_active_chat_users: u64,
    /// Per-language, per-editor rows in input order.
    #[serde(default)]
    pub breakdown: Vec<UsageBreakdown>,
    /// Enterprise scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enterprise: Option<String>,
    /// Organization scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Team slug.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

impl UsageSummary {
    /// Creates an empty summary for `day` with no scope.
    #[must_use]
    pub fn new(day: impl Into<String>) -> Self {
        Self {
            day: day.into(),
            ..Self::default()
        }
    }
}

impl Identified for UsageSummary {
    const COLLECTION: &'static str = "usage_history";

    fn id(&self) -> &str {
        &self.id
    }

    fn date(&self) -> &str {
        &self.day
    }

    fn assign_id(&mut self) -> &str {
        self.id = identity::resolve(
            "usage",
            &self.day,
            non_empty(self.organization.as_ref()),
            non_empty(self.enterprise.as_ref()),
            non_empty(self.team.as_ref()),
        );
        &self.id
    }
}

/// One flattened (day, language, editor) usage fact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageBreakdown {
    /// Calendar day. The legacy usage endpoint omits it; it is filled in
    /// from the parent summary after decoding.
    #[serde(default)]
    pub day: String,
    /// Language name.
    pub language: String,
    /// Editor name.
    pub editor: String,
    #[serde(default)]
    pub suggestions_count: u64,
    #[serde(default)]
    pub acceptances_count: u64,
    #[serde(default)]
    pub lines_suggested: u64,
    #[serde(default)]
    pub lines_accepted: u64,
    #[serde(default)]
    pub active_users: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enterprise: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_legacy_usage_payload() {
        let json = serde_json::json!({
            "day": "2023-10-15",
            "total_suggestions_count": 1000,
            "total_acceptances_count": 800,
            "total_lines_suggested": 1800,
            "total_lines_accepted": 1200,
            "total_active_users": 10,
            "total_chat_acceptances": 32,
            "total_chat_turns": 200,
            "total_active_chat_users": 4,
            "breakdown": [{
                "language": "python",
                "editor": "vscode",
                "suggestions_count": 300,
                "acceptances_count": 250,
                "lines_suggested": 900,
                "lines_accepted": 700,
                "active_users": 5
            }]
        });

        let summary: UsageSummary = serde_json::from_value(json).unwrap();
        assert_eq!(summary.total_chat_turns, 200);
        assert_eq!(summary.breakdown.len(), 1);
        assert_eq!(summary.breakdown[0].day, "");
        assert!(summary.id.is_empty());
    }

    #[test]
    fn enterprise_id() {
        let mut summary = UsageSummary {
            enterprise: Some("octo".to_string()),
            ..UsageSummary::new("2024-03-01")
        };
        assert_eq!(summary.assign_id(), "2024-03-01-ENT-octo");
    }
}
