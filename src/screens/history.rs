//! Activity history: who changed what, newest first as the backend orders it.
//!
//! DESIGN
//! ======
//! Filters map onto `GET /activity-logs/` query parameters, except the
//! "assignment" action group (assign and unassign together), which the
//! backend cannot express and is applied to the fetched page locally.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::api::types::{ActionType, ActivityLog, ActivityLogStats, Id};
use crate::api::{ActivityQuery, ApiError, Backend};

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;

pub const FILTER_FAILED_MESSAGE: &str = "Erreur lors du filtrage";

const MONTHS_FR: [&str; 12] = [
    "janvier",
    "février",
    "mars",
    "avril",
    "mai",
    "juin",
    "juillet",
    "août",
    "septembre",
    "octobre",
    "novembre",
    "décembre",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActionFilter {
    #[default]
    All,
    Only(ActionType),
    /// Assign and unassign together.
    Assignment,
}

impl ActionFilter {
    fn server_side(self) -> Option<ActionType> {
        match self {
            Self::Only(action) => Some(action),
            Self::All | Self::Assignment => None,
        }
    }

    fn admits(self, action: ActionType) -> bool {
        match self {
            Self::Assignment => matches!(action, ActionType::Assign | ActionType::Unassign),
            Self::All | Self::Only(_) => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub user_id: Option<Id>,
    pub action: ActionFilter,
    pub model_name: Option<String>,
    pub search: String,
}

impl HistoryFilter {
    #[must_use]
    pub fn query(&self) -> ActivityQuery {
        ActivityQuery {
            user_id: self.user_id,
            action_type: self.action.server_side(),
            model_name: self.model_name.clone(),
            search: Some(self.search.clone()).filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryUser {
    pub id: Id,
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryView {
    pub activities: Vec<ActivityLog>,
    pub stats: Option<ActivityLogStats>,
    pub filter: HistoryFilter,
    pub last_error: Option<String>,
}

impl HistoryView {
    /// Unfiltered activities and statistics, fetched together.
    ///
    /// # Errors
    ///
    /// The first failing fetch.
    pub async fn load(backend: &dyn Backend) -> Result<Self, ApiError> {
        let query = ActivityQuery::default();
        let (activities, stats) = tokio::try_join!(backend.activity_logs(&query), backend.activity_stats())?;
        Ok(Self { activities, stats: Some(stats), ..Self::default() })
    }

    /// Refetch with the current filter.
    ///
    /// # Errors
    ///
    /// Backend errors; the previous activities are kept and `last_error` set.
    pub async fn apply_filter(&mut self, backend: &dyn Backend) -> Result<(), ApiError> {
        match backend.activity_logs(&self.filter.query()).await {
            Ok(mut activities) => {
                let action = self.filter.action;
                activities.retain(|a| action.admits(a.action_type));
                self.activities = activities;
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "activity filter failed");
                self.last_error = Some(FILTER_FAILED_MESSAGE.to_owned());
                Err(err)
            }
        }
    }

    /// Distinct authors of the loaded activities, in first-seen order.
    #[must_use]
    pub fn users(&self) -> Vec<HistoryUser> {
        let mut users: Vec<HistoryUser> = Vec::new();
        for activity in &self.activities {
            if let Some(id) = activity.user {
                if !users.iter().any(|u| u.id == id) {
                    users.push(HistoryUser { id, name: activity.user_name.clone() });
                }
            }
        }
        users
    }
}

/// `2 juillet 2024 à 09:30`, or the raw text when it is not RFC 3339.
#[must_use]
pub fn format_timestamp(raw: &str) -> String {
    OffsetDateTime::parse(raw, &Rfc3339).map_or_else(
        |_| raw.to_owned(),
        |at| {
            let month = MONTHS_FR[usize::from(u8::from(at.month())) - 1];
            format!("{} {month} {} à {:02}:{:02}", at.day(), at.year(), at.hour(), at.minute())
        },
    )
}
