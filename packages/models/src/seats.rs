//! Copilot seat assignment snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::github::{Organization, Team, User};
use crate::{Identified, identity, non_empty};

/// All seats assigned at the time of one ingestion run, for one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatAssignment {
    /// Natural-key identifier. Empty until [`Identified::assign_id`] runs.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Snapshot day (`YYYY-MM-DD`, UTC).
    #[serde(default)]
    pub date: String,
    /// Number of seats in [`Self::seats`].
    #[serde(default)]
    pub total_seats: u64,
    /// Per-user seat rows, in page order.
    #[serde(default)]
    pub seats: Vec<Seat>,
    /// Enterprise scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enterprise: Option<String>,
    /// Organization scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// When this snapshot was taken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
}

impl SeatAssignment {
    /// Builds a snapshot of `seats` taken at `now`.
    #[must_use]
    pub fn snapshot(seats: Vec<Seat>, now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            date: now.format("%Y-%m-%d").to_string(),
            total_seats: seats.len() as u64,
            seats,
            enterprise: None,
            organization: None,
            last_update: Some(now),
        }
    }
}

impl Identified for SeatAssignment {
    const COLLECTION: &'static str = "seats_history";

    fn id(&self) -> &str {
        &self.id
    }

    fn date(&self) -> &str {
        &self.date
    }

    fn assign_id(&mut self) -> &str {
        self.id = identity::resolve(
            "seats",
            &self.date,
            non_empty(self.organization.as_ref()),
            non_empty(self.enterprise.as_ref()),
            None,
        );
        &self.id
    }
}

/// A single Copilot seat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// When the seat was assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the assignment last changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Date the seat will be removed, if cancellation is pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_cancellation_date: Option<String>,
    /// Last time the assignee used Copilot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<DateTime<Utc>>,
    /// Editor the assignee last used Copilot in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_editor: Option<String>,
    /// Plan type (`"business"`, `"enterprise"`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<String>,
    /// The user holding the seat.
    pub assignee: User,
    /// Team through which the seat was assigned, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigning_team: Option<Team>,
    /// Organization the seat belongs to (enterprise listings only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
}

/// One page of the `copilot/billing/seats` listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SeatsPage {
    /// Total seats across all pages, as reported by the server.
    #[serde(default)]
    pub total_seats: u64,
    /// Seats on this page.
    #[serde(default)]
    pub seats: Vec<Seat>,
}
