//! One state holder per screen. Each fetches its own data, derives what it
//! shows, and refetches after every mutation.

pub mod assignments;
pub mod dashboard;
pub mod frequency;
pub mod history;
pub mod import;
pub mod languages;
pub mod participants;
pub mod reports;
pub mod stage_detail;
pub mod stages;
pub mod villages;

use crate::api::ApiError;
use crate::api::types::{Participant, Stage};
use crate::notice::NoticeBoard;
use crate::period::DateRange;

/// Rejections raised by the create/edit forms before or after a backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Le champ {0} est obligatoire")]
    Required(&'static str),

    #[error("La date de début doit être antérieure à la date de fin")]
    DatesInverted,

    #[error("Veuillez sélectionner une période (date de début et date de fin)")]
    PeriodRequired,

    #[error("La date d'arrivée doit être antérieure à la date de départ")]
    ArrivalAfterDeparture,

    #[error("La capacité doit être supérieure à 0")]
    CapacityNotPositive,

    #[error("Adresse email invalide")]
    InvalidEmail,

    #[error(
        "Impossible de supprimer le stage \"{name}\" car il contient {count} participant(s). Veuillez d'abord supprimer ou réassigner les participants."
    )]
    StageNotEmpty { name: String, count: usize },

    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
}

impl FormError {
    /// Blocked-but-harmless outcomes show as warnings, the rest as errors.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::StageNotEmpty { .. })
    }
}

/// Log a failed form action and post it to `notices`.
pub(crate) fn report_form<T>(notices: &mut NoticeBoard, result: Result<T, FormError>) -> Result<T, FormError> {
    if let Err(err) = &result {
        tracing::warn!(error = ?err, "form action rejected");
        if err.is_warning() {
            notices.warning(err.to_string());
        } else {
            notices.error(err.to_string());
        }
    }
    result
}

/// Trimmed `value`, or `Required(label)` when blank.
pub(crate) fn required(value: &str, label: &'static str) -> Result<String, FormError> {
    let value = value.trim();
    if value.is_empty() { Err(FormError::Required(label)) } else { Ok(value.to_owned()) }
}

/// Whether `participant` is enrolled in a stage overlapping `period`. Stages
/// that are unknown or lack a date never match.
pub(crate) fn attends_during(participant: &Participant, stages: &[Stage], period: &DateRange) -> bool {
    participant
        .stage_ids
        .iter()
        .filter_map(|id| stages.iter().find(|s| s.id == *id).and_then(Stage::period))
        .any(|range| range.overlaps(period))
}

/// Participants present during `period`; everyone when there is no period.
pub(crate) fn in_period<'a>(
    participants: &'a [Participant],
    stages: &'a [Stage],
    period: Option<DateRange>,
) -> impl Iterator<Item = &'a Participant> + 'a {
    participants.iter().filter(move |p| period.is_none_or(|period| attends_during(p, stages, &period)))
}
