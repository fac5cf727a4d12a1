//! One stage with its registrations and the backend's roster stats.

use time::Date;

use crate::api::types::{
    Id, Participant, ParticipantStage, RegistrationDraft, RegistrationPatch, RoleBreakdown, Stage, StageParticipantsStats,
    StageRole,
};
use crate::api::{ApiError, Backend, ParticipantQuery};
use crate::notice::NoticeBoard;
use crate::screens::{FormError, report_form};

#[cfg(test)]
#[path = "stage_detail_test.rs"]
mod tests;

/// Search terms shorter than this return no candidates.
pub const MIN_SEARCH_LEN: usize = 2;

/// Badge color for a role on the roster.
#[must_use]
pub fn role_color(role: StageRole) -> &'static str {
    match role {
        StageRole::Musician => "#9333ea",
        StageRole::Instructor => "#0891b2",
        StageRole::Staff => "#059669",
        StageRole::Participant => "#3b82f6",
    }
}

/// Registration form; dates default to the stage's own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub arrival_date: Option<Date>,
    pub arrival_time: String,
    pub departure_date: Option<Date>,
    pub departure_time: String,
    pub role: StageRole,
    pub notes: String,
}

impl RegistrationForm {
    #[must_use]
    pub fn for_stage(stage: &Stage) -> Self {
        Self { arrival_date: stage.start_date, departure_date: stage.end_date, ..Self::default() }
    }

    #[must_use]
    pub fn from_registration(registration: &ParticipantStage) -> Self {
        Self {
            arrival_date: registration.arrival_date,
            arrival_time: registration.arrival_time.clone().unwrap_or_default(),
            departure_date: registration.departure_date,
            departure_time: registration.departure_time.clone().unwrap_or_default(),
            role: registration.role,
            notes: registration.notes.clone().unwrap_or_default(),
        }
    }

    fn check_dates(&self) -> Result<(), FormError> {
        match (self.arrival_date, self.departure_date) {
            (Some(arrival), Some(departure)) if arrival > departure => Err(FormError::ArrivalAfterDeparture),
            _ => Ok(()),
        }
    }

    /// # Errors
    ///
    /// [`FormError::ArrivalAfterDeparture`].
    pub fn draft(&self, participant_id: Id, stage_id: Id) -> Result<RegistrationDraft, FormError> {
        self.check_dates()?;
        Ok(RegistrationDraft {
            participant_id,
            stage_id,
            arrival_date: self.arrival_date,
            arrival_time: non_blank(&self.arrival_time),
            departure_date: self.departure_date,
            departure_time: non_blank(&self.departure_time),
            role: self.role,
            notes: non_blank(&self.notes),
        })
    }

    /// # Errors
    ///
    /// [`FormError::ArrivalAfterDeparture`].
    pub fn patch(&self) -> Result<RegistrationPatch, FormError> {
        self.check_dates()?;
        Ok(RegistrationPatch {
            arrival_date: self.arrival_date,
            arrival_time: non_blank(&self.arrival_time),
            departure_date: self.departure_date,
            departure_time: non_blank(&self.departure_time),
            role: Some(self.role),
            notes: non_blank(&self.notes),
        })
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

#[derive(Debug, Clone)]
pub struct StageDetailView {
    pub stage: Stage,
    pub registrations: Vec<ParticipantStage>,
    pub stats: StageParticipantsStats,
    pub notices: NoticeBoard,
}

impl StageDetailView {
    #[must_use]
    pub fn with_notices(mut self, notices: NoticeBoard) -> Self {
        self.notices = notices;
        self
    }

    /// Stage, registrations and stats, fetched together.
    ///
    /// # Errors
    ///
    /// The first failing fetch.
    pub async fn load(backend: &dyn Backend, stage_id: Id) -> Result<Self, ApiError> {
        let (stage, registrations, stats) = tokio::try_join!(
            backend.get_stage(stage_id),
            backend.stage_registrations(stage_id),
            backend.stage_registration_stats(stage_id)
        )?;
        Ok(Self { stage, registrations, stats, notices: NoticeBoard::default() })
    }

    /// # Errors
    ///
    /// As [`Self::load`]; current data is kept on failure.
    pub async fn refresh(&mut self, backend: &dyn Backend) -> Result<(), ApiError> {
        let fresh = Self::load(backend, self.stage.id).await?;
        self.stage = fresh.stage;
        self.registrations = fresh.registrations;
        self.stats = fresh.stats;
        Ok(())
    }

    /// Role counts over the loaded registrations.
    #[must_use]
    pub fn counts_by_role(&self) -> RoleBreakdown {
        let mut counts = RoleBreakdown::default();
        for registration in &self.registrations {
            match registration.role {
                StageRole::Participant => counts.participant += 1,
                StageRole::Musician => counts.musician += 1,
                StageRole::Instructor => counts.instructor += 1,
                StageRole::Staff => counts.staff += 1,
            }
        }
        counts
    }

    #[must_use]
    pub fn is_registered(&self, participant_id: Id) -> bool {
        self.registrations.iter().any(|r| r.participant_id == participant_id)
    }

    /// Participants matching `term` who are not yet on this stage.
    ///
    /// # Errors
    ///
    /// Backend errors from the search.
    pub async fn search_candidates(&self, backend: &dyn Backend, term: &str) -> Result<Vec<Participant>, ApiError> {
        let term = term.trim();
        if term.chars().count() < MIN_SEARCH_LEN {
            return Ok(Vec::new());
        }
        let query = ParticipantQuery { search: Some(term.to_owned()), ..ParticipantQuery::default() };
        let found = backend.list_participants(&query).await?;
        Ok(found.into_iter().filter(|p| !self.is_registered(p.id)).collect())
    }

    /// # Errors
    ///
    /// Form rejections and backend errors, also posted as an error notice.
    pub async fn add(
        &mut self,
        backend: &dyn Backend,
        participant_id: Id,
        form: &RegistrationForm,
    ) -> Result<ParticipantStage, FormError> {
        let stage_id = self.stage.id;
        let result = async {
            let draft = form.draft(participant_id, stage_id)?;
            let created = backend.add_registration(&draft).await?;
            self.refresh(backend).await?;
            Ok::<_, FormError>(created)
        }
        .await;
        if let Ok(created) = &result {
            tracing::info!(registration_id = created.id, stage_id, participant_id, "registration added");
            self.notices.success("Participant ajouté avec succès");
        }
        report_form(&mut self.notices, result)
    }

    /// # Errors
    ///
    /// As [`Self::add`].
    pub async fn update(
        &mut self,
        backend: &dyn Backend,
        registration_id: Id,
        form: &RegistrationForm,
    ) -> Result<ParticipantStage, FormError> {
        let result = async {
            let patch = form.patch()?;
            let updated = backend.update_registration(registration_id, &patch).await?;
            self.refresh(backend).await?;
            Ok::<_, FormError>(updated)
        }
        .await;
        if result.is_ok() {
            self.notices.success("Participant mis à jour");
        }
        report_form(&mut self.notices, result)
    }

    /// # Errors
    ///
    /// Backend errors, posted as an error notice.
    pub async fn remove(&mut self, backend: &dyn Backend, registration_id: Id) -> Result<(), FormError> {
        let name = self
            .registrations
            .iter()
            .find(|r| r.id == registration_id)
            .map_or_else(|| format!("Inscription {registration_id}"), |r| r.participant_name.clone());
        let result = async {
            backend.remove_registration(registration_id).await?;
            self.refresh(backend).await?;
            Ok::<_, FormError>(())
        }
        .await;
        if result.is_ok() {
            tracing::info!(registration_id, "registration removed");
            self.notices.success(format!("{name} a été retiré de l'événement"));
        }
        report_form(&mut self.notices, result)
    }
}
