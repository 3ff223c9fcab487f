#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Metrics aggregation.
//!
//! Converts nested daily [`MetricsRecord`] documents into flat
//! [`UsageSummary`] records, one per distinct date, each with a list of
//! per-(language, editor) [`UsageBreakdown`] rows.
//!
//! Aggregation rules:
//!
//! - Counters (suggestions, acceptances, lines, chat acceptances, chat
//!   turns) are **summed** across documents that share a date.
//! - User counts (active users, active chat users) take the **maximum**
//!   across documents sharing a date, so an organization document and its
//!   per-team documents do not double-count the same people.
//! - Breakdown rows are appended in input order and never deduplicated.
//!
//! This crate performs no I/O.

use std::collections::BTreeMap;

use copilot_metrics_models::{Identified as _, MetricsRecord, UsageBreakdown, UsageSummary};

/// Aggregates metrics documents into per-day usage summaries.
///
/// Output is sorted by date and every summary has its identifier assigned.
/// Deterministic for a given input order.
#[must_use]
pub fn aggregate(documents: &[MetricsRecord]) -> Vec<UsageSummary> {
    let mut by_date: BTreeMap<&str, UsageSummary> = BTreeMap::new();

    for document in documents {
        let contribution = contribution(document);

        match by_date.get_mut(document.date.as_str()) {
            Some(summary) => merge(summary, contribution),
            None => {
                by_date.insert(&document.date, contribution);
            }
        }
    }

    log::debug!(
        "Aggregated {} metrics documents into {} daily summaries",
        documents.len(),
        by_date.len()
    );

    by_date
        .into_values()
        .map(|mut summary| {
            summary.assign_id();
            summary
        })
        .collect()
}

/// Computes a single document's contribution as a standalone summary.
fn contribution(document: &MetricsRecord) -> UsageSummary {
    let mut summary = UsageSummary {
        enterprise: document.enterprise.clone(),
        organization: document.organization.clone(),
        team: document.team.clone(),
        total_active_users: document.total_engaged_users,
        ..UsageSummary::new(document.date.clone())
    };

    if let Some(completions) = &document.ide_code_completions {
        summary.total_active_users = completions.total_engaged_users;

        for editor in &completions.editors {
            for model in &editor.models {
                for language in &model.languages {
                    summary.total_suggestions_count += language.total_code_suggestions;
                    summary.total_acceptances_count += language.total_code_acceptances;
                    summary.total_lines_suggested += language.total_code_lines_suggested;
                    summary.total_lines_accepted += language.total_code_lines_accepted;

                    summary.breakdown.push(UsageBreakdown {
                        day: document.date.clone(),
                        language: language.name.clone(),
                        editor: editor.name.clone(),
                        suggestions_count: language.total_code_suggestions,
                        acceptances_count: language.total_code_acceptances,
                        lines_suggested: language.total_code_lines_suggested,
                        lines_accepted: language.total_code_lines_accepted,
                        active_users: language.total_engaged_users,
                        enterprise: document.enterprise.clone(),
                        organization: document.organization.clone(),
                        team: document.team.clone(),
                    });
                }
            }
        }
    }

    if let Some(chat) = &document.ide_chat {
        for model in chat.editors.iter().flat_map(|editor| &editor.models) {
            summary.total_chat_turns += model.total_chats;
            summary.total_chat_acceptances +=
                model.total_chat_copy_events + model.total_chat_insertion_events;
        }
        summary.total_active_chat_users = chat.total_engaged_users;
    }

    if let Some(web_chat) = document
        .dotcom_chat
        .as_ref()
        .filter(|chat| chat.total_engaged_users > 0)
    {
        summary.total_active_chat_users += web_chat.total_engaged_users;
        summary.total_chat_turns += web_chat
            .models
            .iter()
            .map(|model| model.total_chats)
            .sum::<u64>();
    }

    summary
}

/// Folds `contribution` into the accumulating summary for the same date.
///
/// Scope fields stay those of the first contributing document.
fn merge(summary: &mut UsageSummary, contribution: UsageSummary) {
    summary.total_suggestions_count += contribution.total_suggestions_count;
    summary.total_acceptances_count += contribution.total_acceptances_count;
    summary.total_lines_suggested += contribution.total_lines_suggested;
    summary.total_lines_accepted += contribution.total_lines_accepted;
    summary.total_chat_acceptances += contribution.total_chat_acceptances;
    summary.total_chat_turns += contribution.total_chat_turns;

    summary.total_active_users = summary
        .total_active_users
        .max(contribution.total_active_users);
    summary.total_active_chat_users = summary
        .total_active_chat_users
        .max(contribution.total_active_chat_users);

    summary.breakdown.extend(contribution.breakdown);
}
