//! Room assignment board: who sleeps where during the selected period.
//!
//! DESIGN
//! ======
//! The board holds participants, stages and bungalows exactly as the backend
//! returned them. Everything shown (period membership, occupants, occupancy,
//! the next free bed) is derived on demand from those three lists plus the
//! selected period and stage filter. Mutations go to the backend and are
//! followed by a refetch of participants and bungalows; local records are
//! never patched.
//!
//! Two flows share the board:
//! - participant-level: a participant is dropped on a bungalow (or picked in
//!   the manual form) and assigned for their first stage;
//! - registration-level: one stage registration is assigned for its own stay
//!   dates, may hit a backend rule that asks for confirmation, and can be
//!   resubmitted with `force`.
//!
//! ERROR HANDLING
//! ==============
//! Pre-checks (missing fields, no stage, full bungalow) reject before any
//! network call. Every failure, local or remote, is posted to the notice
//! board and also returned so callers can react. Capacity checks here are
//! advisory; the backend re-validates on assign.

use std::collections::HashSet;

use time::Date;

use crate::api::types::{
    AssignParticipant, AssignRegistration, AutoAssignReport, Bungalow, Id, Participant, ParticipantStage, Stage,
};
use crate::api::{ApiError, Backend, ParticipantQuery};
use crate::notice::{NoticeBoard, NoticeKind};
use crate::period::DateRange;
use crate::screens::in_period;

#[cfg(test)]
#[path = "assignments_test.rs"]
mod tests;

pub const UNKNOWN_STAGE_NAME: &str = "Événement inconnu";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignError {
    #[error("Veuillez remplir tous les champs")]
    MissingFields,

    #[error("{first_name} n'est inscrit à aucun stage. Inscrivez-le d'abord à un stage.")]
    NoStage { first_name: String },

    #[error("Le bungalow {name} est complet ({capacity}/{capacity})")]
    BungalowFull { name: String, capacity: u32 },

    #[error("Participant {0} introuvable")]
    UnknownParticipant(Id),

    #[error("Inscription {0} introuvable")]
    UnknownRegistration(Id),

    #[error("Bungalow {0} introuvable")]
    UnknownBungalow(Id),

    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
}

impl AssignError {
    /// True when the backend flagged a soft rule and a forced retry may pass.
    #[must_use]
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Self::Api(err) if err.requires_confirmation())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccupancyStatus {
    Empty,
    Partial,
    Full,
}

impl OccupancyStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Partial => "partial",
            Self::Full => "full",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    pub occupied: usize,
    pub capacity: u32,
}

impl Occupancy {
    #[must_use]
    pub fn status(&self) -> OccupancyStatus {
        if self.occupied == 0 {
            OccupancyStatus::Empty
        } else if self.is_full() {
            OccupancyStatus::Full
        } else {
            OccupancyStatus::Partial
        }
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.occupied >= self.capacity as usize
    }
}

impl std::fmt::Display for Occupancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.occupied, self.capacity)
    }
}

/// Bed totals across every bungalow, from the backend's bed lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BedSummary {
    pub total_beds: u32,
    pub occupied_beds: usize,
    pub empty_bungalows: usize,
}

impl BedSummary {
    #[must_use]
    pub fn available_beds(&self) -> usize {
        (self.total_beds as usize).saturating_sub(self.occupied_beds)
    }
}

/// Manual assignment form; every field must be filled before submitting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualAssignForm {
    pub target_id: Option<Id>,
    pub bungalow_id: Option<Id>,
    pub bed: String,
}

impl ManualAssignForm {
    /// `(target, bungalow, bed)` once complete.
    ///
    /// # Errors
    ///
    /// [`AssignError::MissingFields`] when any field is unset or blank.
    pub fn validate(&self) -> Result<(Id, Id, String), AssignError> {
        let bed = self.bed.trim();
        match (self.target_id, self.bungalow_id) {
            (Some(target), Some(bungalow)) if !bed.is_empty() => Ok((target, bungalow, bed.to_owned())),
            _ => Err(AssignError::MissingFields),
        }
    }
}

// =============================================================================
// BOARD
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct AssignmentBoard {
    pub participants: Vec<Participant>,
    pub stages: Vec<Stage>,
    pub bungalows: Vec<Bungalow>,
    /// Unassigned registrations for the registration-level flow.
    pub registrations: Vec<ParticipantStage>,
    pub period_start: Option<Date>,
    pub period_end: Option<Date>,
    pub stage_filter: Option<Id>,
    pub notices: NoticeBoard,
}

impl AssignmentBoard {
    /// Replace the notice board, typically with one built from the configured TTL.
    #[must_use]
    pub fn with_notices(mut self, notices: NoticeBoard) -> Self {
        self.notices = notices;
        self
    }

    /// Fetch participants, stages and bungalows concurrently. The period
    /// starts as the first stage that has both dates.
    ///
    /// # Errors
    ///
    /// Returns the first failing fetch's [`ApiError`].
    pub async fn load(backend: &dyn Backend) -> Result<Self, ApiError> {
        let query = ParticipantQuery::default();
        let (participants, stages, bungalows) =
            tokio::try_join!(backend.list_participants(&query), backend.list_stages(), backend.list_bungalows())?;

        let initial = stages.iter().find_map(Stage::period);
        tracing::info!(
            participants = participants.len(),
            stages = stages.len(),
            bungalows = bungalows.len(),
            "assignment board loaded"
        );

        Ok(Self {
            participants,
            stages,
            bungalows,
            period_start: initial.map(|r| r.start),
            period_end: initial.map(|r| r.end),
            ..Self::default()
        })
    }

    pub fn set_period(&mut self, start: Option<Date>, end: Option<Date>) {
        self.period_start = start;
        self.period_end = end;
    }

    /// Selected period; `None` unless both bounds are set.
    #[must_use]
    pub fn period(&self) -> Option<DateRange> {
        DateRange::from_bounds(self.period_start, self.period_end)
    }

    #[must_use]
    pub fn stage(&self, id: Id) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    #[must_use]
    pub fn stage_name(&self, id: Id) -> &str {
        self.stage(id).map_or(UNKNOWN_STAGE_NAME, |s| s.name.as_str())
    }

    #[must_use]
    pub fn bungalow(&self, id: Id) -> Option<&Bungalow> {
        self.bungalows.iter().find(|b| b.id == id)
    }

    // -------------------------------------------------------------------------
    // Derived views
    // -------------------------------------------------------------------------

    /// Participants enrolled in at least one stage overlapping the period,
    /// narrowed by the stage filter. Without a period everyone matches.
    #[must_use]
    pub fn participants_in_period(&self) -> Vec<&Participant> {
        in_period(&self.participants, &self.stages, self.period())
            .filter(|p| self.stage_filter.is_none_or(|id| p.stage_ids.contains(&id)))
            .collect()
    }

    #[must_use]
    pub fn unassigned_in_period(&self) -> Vec<&Participant> {
        self.participants_in_period().into_iter().filter(|p| p.assigned_bungalow_id.is_none()).collect()
    }

    #[must_use]
    pub fn assigned_in_period(&self) -> Vec<&Participant> {
        self.participants_in_period().into_iter().filter(|p| p.assigned_bungalow_id.is_some()).collect()
    }

    /// Everyone assigned to the bungalow and present in the period. The stage
    /// filter narrows the lists only, never a room's headcount.
    #[must_use]
    pub fn occupants_of(&self, bungalow_id: Id) -> Vec<&Participant> {
        in_period(&self.participants, &self.stages, self.period())
            .filter(|p| p.assigned_bungalow_id == Some(bungalow_id))
            .collect()
    }

    #[must_use]
    pub fn occupancy(&self, bungalow: &Bungalow) -> Occupancy {
        Occupancy { occupied: self.occupants_of(bungalow.id).len(), capacity: bungalow.capacity }
    }

    /// First bed of the bungalow not held by a current occupant, else
    /// `bed{n+1}` for `n` occupants.
    #[must_use]
    pub fn next_bed_label(&self, bungalow: &Bungalow) -> String {
        let occupants = self.occupants_of(bungalow.id);
        let taken: HashSet<&str> = occupants.iter().filter_map(|p| p.assigned_bed.as_deref()).collect();
        bungalow
            .beds
            .iter()
            .map(|bed| bed.id.as_str())
            .find(|id| !taken.contains(id))
            .map_or_else(|| format!("bed{}", occupants.len() + 1), str::to_owned)
    }

    #[must_use]
    pub fn bed_summary(&self) -> BedSummary {
        self.bungalows.iter().fold(BedSummary::default(), |mut acc, b| {
            let occupied = b.occupied_beds();
            acc.total_beds += b.capacity;
            acc.occupied_beds += occupied;
            if occupied == 0 {
                acc.empty_bungalows += 1;
            }
            acc
        })
    }

    // -------------------------------------------------------------------------
    // Participant-level mutations
    // -------------------------------------------------------------------------

    /// Drop a participant on a bungalow: next free bed, first stage.
    ///
    /// # Errors
    ///
    /// Pre-check failures and backend errors, also posted as an error notice.
    pub async fn drop_participant(
        &mut self,
        backend: &dyn Backend,
        participant_id: Id,
        bungalow_id: Id,
    ) -> Result<(), AssignError> {
        let result = self.assign_checked(backend, participant_id, bungalow_id, None).await;
        self.report(result)
    }

    /// Submit the manual form (participant, bungalow, bed).
    ///
    /// # Errors
    ///
    /// [`AssignError::MissingFields`] without a backend call when the form is
    /// incomplete; otherwise as [`Self::drop_participant`].
    pub async fn submit_manual(&mut self, backend: &dyn Backend, form: &ManualAssignForm) -> Result<(), AssignError> {
        let result = match form.validate() {
            Ok((participant_id, bungalow_id, bed)) => {
                self.assign_checked(backend, participant_id, bungalow_id, Some(bed)).await
            }
            Err(err) => Err(err),
        };
        self.report(result)
    }

    async fn assign_checked(
        &mut self,
        backend: &dyn Backend,
        participant_id: Id,
        bungalow_id: Id,
        bed: Option<String>,
    ) -> Result<(), AssignError> {
        let participant =
            self.participants.iter().find(|p| p.id == participant_id).ok_or(AssignError::UnknownParticipant(participant_id))?;
        let bungalow = self.bungalow(bungalow_id).ok_or(AssignError::UnknownBungalow(bungalow_id))?;

        if self.occupancy(bungalow).is_full() {
            return Err(AssignError::BungalowFull { name: bungalow.name.clone(), capacity: bungalow.capacity });
        }
        let stage_id =
            participant.first_stage_id().ok_or_else(|| AssignError::NoStage { first_name: participant.first_name.clone() })?;

        let body = AssignParticipant {
            bungalow_id,
            bed: bed.unwrap_or_else(|| self.next_bed_label(bungalow)),
            stage_id,
        };
        let message = format!("{} assigné au bungalow {}", participant.full_name(), bungalow.name);

        backend.assign_participant(participant_id, &body).await?;
        self.refresh(backend).await?;
        self.notices.success(message);
        Ok(())
    }

    /// Remove a participant from their bed.
    ///
    /// # Errors
    ///
    /// Backend errors, also posted as an error notice.
    pub async fn unassign(&mut self, backend: &dyn Backend, participant_id: Id) -> Result<(), AssignError> {
        let name = self
            .participants
            .iter()
            .find(|p| p.id == participant_id)
            .map_or_else(|| format!("Participant {participant_id}"), Participant::full_name);

        let result = async {
            backend.unassign_participant(participant_id).await?;
            self.refresh(backend).await?;
            Ok::<_, AssignError>(())
        }
        .await;
        if result.is_ok() {
            self.notices.warning(format!("{name} retiré de sa chambre"));
        }
        self.report(result)
    }

    /// Refetch participants and bungalows.
    ///
    /// # Errors
    ///
    /// Returns the first failing fetch; current lists are kept in that case.
    pub async fn refresh(&mut self, backend: &dyn Backend) -> Result<(), ApiError> {
        let query = ParticipantQuery::default();
        let (participants, bungalows) =
            tokio::try_join!(backend.list_participants(&query), backend.list_bungalows())?;
        self.participants = participants;
        self.bungalows = bungalows;
        Ok(())
    }

    fn report<T>(&mut self, result: Result<T, AssignError>) -> Result<T, AssignError> {
        if let Err(err) = &result {
            tracing::warn!(error = ?err, "assignment rejected");
            let kind = if err.requires_confirmation() { NoticeKind::Warning } else { NoticeKind::Error };
            self.notices.post(kind, err.to_string());
        }
        result
    }

    // -------------------------------------------------------------------------
    // Registration-level flow
    // -------------------------------------------------------------------------

    /// Refetch unassigned registrations for the current period.
    ///
    /// # Errors
    ///
    /// Backend errors; the previous list is kept.
    pub async fn load_registrations(&mut self, backend: &dyn Backend) -> Result<(), ApiError> {
        self.registrations = backend.unassigned_registrations(self.period()).await?;
        Ok(())
    }

    /// Unassigned registrations, narrowed by the stage filter.
    #[must_use]
    pub fn filtered_registrations(&self) -> Vec<&ParticipantStage> {
        self.registrations.iter().filter(|r| self.stage_filter.is_none_or(|id| r.stage_id == id)).collect()
    }

    /// First bed the backend reports free, else `bed{n+1}`.
    #[must_use]
    pub fn next_free_bed(bungalow: &Bungalow) -> String {
        bungalow
            .beds
            .iter()
            .find(|bed| bed.is_free())
            .map_or_else(|| format!("bed{}", bungalow.occupied_beds() + 1), |bed| bed.id.clone())
    }

    /// Drop a registration on a bungalow. With `force`, soft backend rules
    /// (gender mix, overlapping events, instructor rooms) are overridden.
    ///
    /// # Errors
    ///
    /// Pre-check failures and backend errors. A rule that needs confirmation
    /// is posted as a warning and reported through
    /// [`AssignError::requires_confirmation`].
    pub async fn drop_registration(
        &mut self,
        backend: &dyn Backend,
        registration_id: Id,
        bungalow_id: Id,
        force: bool,
    ) -> Result<(), AssignError> {
        let result = self.assign_registration_checked(backend, registration_id, bungalow_id, None, force).await;
        self.report(result)
    }

    /// Manual form for the registration flow; `target_id` is the registration.
    ///
    /// # Errors
    ///
    /// As [`Self::drop_registration`], plus [`AssignError::MissingFields`].
    pub async fn submit_manual_registration(
        &mut self,
        backend: &dyn Backend,
        form: &ManualAssignForm,
        force: bool,
    ) -> Result<(), AssignError> {
        let result = match form.validate() {
            Ok((registration_id, bungalow_id, bed)) => {
                self.assign_registration_checked(backend, registration_id, bungalow_id, Some(bed), force).await
            }
            Err(err) => Err(err),
        };
        self.report(result)
    }

    async fn assign_registration_checked(
        &mut self,
        backend: &dyn Backend,
        registration_id: Id,
        bungalow_id: Id,
        bed: Option<String>,
        force: bool,
    ) -> Result<(), AssignError> {
        let registration = self
            .registrations
            .iter()
            .find(|r| r.id == registration_id)
            .ok_or(AssignError::UnknownRegistration(registration_id))?;
        let bungalow = self.bungalow(bungalow_id).ok_or(AssignError::UnknownBungalow(bungalow_id))?;

        if bungalow.occupied_beds() >= bungalow.capacity as usize {
            return Err(AssignError::BungalowFull { name: bungalow.name.clone(), capacity: bungalow.capacity });
        }

        let body = AssignRegistration {
            bungalow_id,
            bed: bed.unwrap_or_else(|| Self::next_free_bed(bungalow)),
            force,
        };
        let message = format!(
            "{} assigné au bungalow {} ({})",
            registration.participant_name, bungalow.name, registration.stage_name
        );

        backend.assign_registration(registration_id, &body).await?;
        self.refresh_registrations(backend).await?;
        self.notices.success(message);
        Ok(())
    }

    /// # Errors
    ///
    /// Backend errors, also posted as an error notice.
    pub async fn unassign_registration(
        &mut self,
        backend: &dyn Backend,
        registration_id: Id,
        participant_name: &str,
    ) -> Result<(), AssignError> {
        let result = async {
            backend.unassign_registration(registration_id).await?;
            self.refresh_registrations(backend).await?;
            Ok::<_, AssignError>(())
        }
        .await;
        if result.is_ok() {
            self.notices.warning(format!("{participant_name} retiré de sa chambre"));
        }
        self.report(result)
    }

    /// Ask the backend to place every unassigned registration of a stage.
    ///
    /// # Errors
    ///
    /// Backend errors, also posted as an error notice.
    pub async fn auto_assign(&mut self, backend: &dyn Backend, stage_id: Id) -> Result<AutoAssignReport, AssignError> {
        let result = async {
            let report = backend.auto_assign_stage(stage_id).await?;
            self.refresh_registrations(backend).await?;
            Ok::<_, AssignError>(report)
        }
        .await;
        if let Ok(report) = &result {
            let kind = if report.summary.total_failed == 0 { NoticeKind::Success } else { NoticeKind::Warning };
            self.notices.post(kind, report.message.clone());
        }
        self.report(result)
    }

    async fn refresh_registrations(&mut self, backend: &dyn Backend) -> Result<(), ApiError> {
        let period = self.period();
        let (registrations, bungalows) =
            tokio::try_join!(backend.unassigned_registrations(period), backend.list_bungalows())?;
        self.registrations = registrations;
        self.bungalows = bungalows;
        Ok(())
    }
}
