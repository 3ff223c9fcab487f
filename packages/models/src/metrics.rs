//! Daily Copilot metrics documents as returned by the `copilot/metrics`
//! endpoints.
//!
//! One [`MetricsRecord`] describes one calendar day for one scope. The four
//! optional sections each nest editor → model → language (or repository)
//! breakdowns with per-leaf counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Identified, identity, non_empty};

/// One calendar day of Copilot usage for an organization, enterprise, or
/// team.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsRecord {
    /// Natural-key identifier. Empty until [`Identified::assign_id`] runs.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Calendar day (`YYYY-MM-DD`).
    pub date: String,
    /// Users with any Copilot activity on this day.
    #[serde(default)]
    pub total_active_users: u64,
    /// Users who engaged with at least one Copilot feature on this day.
    #[serde(default)]
    pub total_engaged_users: u64,
    /// IDE code completion breakdown.
    #[serde(
        default,
        rename = "copilot_ide_code_completions",
        skip_serializing_if = "Option::is_none"
    )]
    pub ide_code_completions: Option<IdeCodeCompletions>,
    /// IDE chat breakdown.
    #[serde(
        default,
        rename = "copilot_ide_chat",
        skip_serializing_if = "Option::is_none"
    )]
    pub ide_chat: Option<IdeChat>,
    /// GitHub.com chat breakdown.
    #[serde(
        default,
        rename = "copilot_dotcom_chat",
        skip_serializing_if = "Option::is_none"
    )]
    pub dotcom_chat: Option<DotcomChat>,
    /// GitHub.com pull request summary breakdown.
    #[serde(
        default,
        rename = "copilot_dotcom_pull_requests",
        skip_serializing_if = "Option::is_none"
    )]
    pub dotcom_pull_requests: Option<DotcomPullRequests>,
    /// Enterprise scope, set after decoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enterprise: Option<String>,
    /// Organization scope, set after decoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Team slug when the document came from a team-scoped request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    /// When this document was fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

impl Identified for MetricsRecord {
    const COLLECTION: &'static str = "metrics_history";

    fn id(&self) -> &str {
        &self.id
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn assign_id(&mut self) -> &str {
        self.id = identity::resolve(
            "metrics",
            &self.date,
            non_empty(self.organization.as_ref()),
            non_empty(self.enterprise.as_ref()),
            non_empty(self.team.as_ref()),
        );
        &self.id
    }
}

/// IDE code completion metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeCodeCompletions {
    /// Users who accepted at least one completion.
    #[serde(default)]
    pub total_engaged_users: u64,
    /// Per-language engagement, across all editors.
    #[serde(default)]
    pub languages: Vec<LanguageEngagement>,
    /// Per-editor breakdown.
    #[serde(default)]
    pub editors: Vec<CodeCompletionEditor>,
}

/// Engagement for one language, aggregated across editors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageEngagement {
    /// Language name (e.g. `"rust"`).
    pub name: String,
    /// Engaged users for this language.
    #[serde(default)]
    pub total_engaged_users: u64,
}

/// Code completion metrics for one editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeCompletionEditor {
    /// Editor name (e.g. `"vscode"`).
    pub name: String,
    /// Engaged users in this editor.
    #[serde(default)]
    pub total_engaged_users: u64,
    /// Per-model breakdown.
    #[serde(default)]
    pub models: Vec<CodeCompletionModel>,
}

/// Code completion metrics for one model within an editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeCompletionModel {
    /// Model name (`"default"` for the stock model).
    pub name: String,
    /// Whether this is a custom-trained model.
    #[serde(default)]
    pub is_custom_model: bool,
    /// Training date of a custom model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_model_training_date: Option<String>,
    /// Engaged users for this model.
    #[serde(default)]
    pub total_engaged_users: u64,
    /// Per-language leaf counters.
    #[serde(default)]
    pub languages: Vec<CodeCompletionLanguage>,
}

/// Leaf counters for one language within an editor/model pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeCompletionLanguage {
    /// Language name.
    pub name: String,
    /// Engaged users for this language.
    #[serde(default)]
    pub total_engaged_users: u64,
    /// Suggestions shown.
    #[serde(default)]
    pub total_code_suggestions: u64,
    /// Suggestions accepted.
    #[serde(default)]
    pub total_code_acceptances: u64,
    /// Lines suggested.
    #[serde(default)]
    pub total_code_lines_suggested: u64,
    /// Lines accepted.
    #[serde(default)]
    pub total_code_lines_accepted: u64,
}

/// IDE chat metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeChat {
    /// Users who used chat in an IDE.
    #[serde(default)]
    pub total_engaged_users: u64,
    /// Per-editor breakdown.
    #[serde(default)]
    pub editors: Vec<IdeChatEditor>,
}

/// IDE chat metrics for one editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeChatEditor {
    /// Editor name.
    pub name: String,
    /// Engaged users in this editor.
    #[serde(default)]
    pub total_engaged_users: u64,
    /// Per-model breakdown.
    #[serde(default)]
    pub models: Vec<IdeChatModel>,
}

/// IDE chat counters for one model within an editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdeChatModel {
    /// Model name.
    pub name: String,
    /// Whether this is a custom-trained model.
    #[serde(default)]
    pub is_custom_model: bool,
    /// Training date of a custom model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_model_training_date: Option<String>,
    /// Engaged users for this model.
    #[serde(default)]
    pub total_engaged_users: u64,
    /// Chat turns.
    #[serde(default)]
    pub total_chats: u64,
    /// Times a chat suggestion was inserted into a file.
    #[serde(default)]
    pub total_chat_insertion_events: u64,
    /// Times a chat suggestion was copied.
    #[serde(default)]
    pub total_chat_copy_events: u64,
}

/// GitHub.com chat metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DotcomChat {
    /// Users who used chat on GitHub.com.
    #[serde(default)]
    pub total_engaged_users: u64,
    /// Per-model breakdown.
    #[serde(default)]
    pub models: Vec<DotcomChatModel>,
}

/// GitHub.com chat counters for one model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DotcomChatModel {
    /// Model name.
    pub name: String,
    /// Whether this is a custom-trained model.
    #[serde(default)]
    pub is_custom_model: bool,
    /// Training date of a custom model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_model_training_date: Option<String>,
    /// Engaged users for this model.
    #[serde(default)]
    pub total_engaged_users: u64,
    /// Chat turns.
    #[serde(default)]
    pub total_chats: u64,
}

/// GitHub.com pull request summary metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DotcomPullRequests {
    /// Users who generated a pull request summary.
    #[serde(default)]
    pub total_engaged_users: u64,
    /// Per-repository breakdown.
    #[serde(default)]
    pub repositories: Vec<PullRequestRepository>,
}

/// Pull request summary metrics for one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRepository {
    /// Repository name.
    pub name: String,
    /// Engaged users in this repository.
    #[serde(default)]
    pub total_engaged_users: u64,
    /// Per-model breakdown.
    #[serde(default)]
    pub models: Vec<PullRequestModel>,
}

/// Pull request summary counters for one model within a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestModel {
    /// Model name.
    pub name: String,
    /// Whether this is a custom-trained model.
    #[serde(default)]
    pub is_custom_model: bool,
    /// Training date of a custom model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_model_training_date: Option<String>,
    /// Engaged users for this model.
    #[serde(default)]
    pub total_engaged_users: u64,
    /// Pull request summaries generated.
    #[serde(default)]
    pub total_pr_summaries_created: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_api_document() {
        let json = serde_json::json!({
            "date": "2024-06-24",
            "total_active_users": 24,
            "total_engaged_users": 20,
            "copilot_ide_code_completions": {
                "total_engaged_users": 20,
                "languages": [{"name": "python", "total_engaged_users": 10}],
                "editors": [{
                    "name": "vscode",
                    "total_engaged_users": 13,
                    "models": [{
                        "name": "default",
                        "is_custom_model": false,
                        "custom_model_training_date": null,
                        "total_engaged_users": 13,
                        "languages": [{
                            "name": "python",
                            "total_engaged_users": 6,
                            "total_code_suggestions": 249,
                            "total_code_acceptances": 123,
                            "total_code_lines_suggested": 225,
                            "total_code_lines_accepted": 135
                        }]
                    }]
                }]
            },
            "copilot_dotcom_chat": {"total_engaged_users": 14, "models": []}
        });

        let record: MetricsRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.date, "2024-06-24");
        assert_eq!(record.total_engaged_users, 20);
        assert!(record.ide_chat.is_none());
        let completions = record.ide_code_completions.unwrap();
        let leaf = &completions.editors[0].models[0].languages[0];
        assert_eq!(leaf.total_code_suggestions, 249);
        assert_eq!(leaf.total_code_lines_accepted, 135);
        assert_eq!(record.dotcom_chat.unwrap().total_engaged_users, 14);
    }

    #[test]
    fn assigns_team_scoped_id() {
        let mut record = MetricsRecord {
            date: "2024-01-01".to_string(),
            organization: Some("acme".to_string()),
            team: Some("platform".to_string()),
            ..MetricsRecord::default()
        };
        assert_eq!(record.assign_id(), "2024-01-01-ORG-acme-platform");
        assert_eq!(record.id(), "2024-01-01-ORG-acme-platform");
    }

    #[test]
    fn empty_scope_strings_are_unscoped() {
        let mut record = MetricsRecord {
            date: "2024-01-01".to_string(),
            organization: Some(String::new()),
            ..MetricsRecord::default()
        };
        assert_eq!(record.assign_id(), "2024-01-01-XXX");
    }
}
