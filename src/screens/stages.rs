//! Stage catalogue: lifecycle status, progress and CRUD.
//!
//! DESIGN
//! ======
//! Status is derived from the stage dates and the caller's `today`, never
//! stored. The list shown is the last fetch narrowed by a [`StageFilter`],
//! which defaults to upcoming plus active stages.
//!
//! ERROR HANDLING
//! ==============
//! Form checks run before any request. A stage that still has registrations
//! cannot be deleted; the refusal is a warning, not an error.

use time::Date;

use crate::api::types::{EventType, Id, Stage, StageDraft};
use crate::api::{ApiError, Backend};
use crate::notice::NoticeBoard;
use crate::screens::{FormError, report_form, required};

#[cfg(test)]
#[path = "stages_test.rs"]
mod tests;

pub const LOAD_FAILED_MESSAGE: &str = "Erreur lors du chargement des stages";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Upcoming,
    Active,
    Completed,
}

impl Lifecycle {
    /// Position of `stage` relative to `today`; `None` when a date is missing.
    #[must_use]
    pub fn of(stage: &Stage, today: Date) -> Option<Self> {
        let range = stage.period()?;
        Some(if today < range.start {
            Self::Upcoming
        } else if today > range.end {
            Self::Completed
        } else {
            Self::Active
        })
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Upcoming => "À venir",
            Self::Active => "Actif",
            Self::Completed => "Terminé",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StageFilter {
    #[default]
    UpcomingAndActive,
    Upcoming,
    Active,
    Completed,
    All,
}

impl StageFilter {
    #[must_use]
    pub fn admits(self, lifecycle: Option<Lifecycle>) -> bool {
        match (self, lifecycle) {
            (Self::All, _) => true,
            (Self::UpcomingAndActive, Some(Lifecycle::Upcoming | Lifecycle::Active))
            | (Self::Upcoming, Some(Lifecycle::Upcoming))
            | (Self::Active, Some(Lifecycle::Active))
            | (Self::Completed, Some(Lifecycle::Completed)) => true,
            _ => false,
        }
    }
}

/// Fill progress in percent: 0 before the start, 100 once over, otherwise
/// current participants over capacity.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn progress(stage: &Stage, today: Date) -> u32 {
    match Lifecycle::of(stage, today) {
        Some(Lifecycle::Completed) => 100,
        Some(Lifecycle::Active) if stage.capacity > 0 => {
            (f64::from(stage.current_participants) / f64::from(stage.capacity) * 100.0).round() as u32
        }
        _ => 0,
    }
}

// =============================================================================
// FORM
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageForm {
    pub name: String,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub event_type: EventType,
    pub instructor: String,
    pub capacity: u32,
}

impl StageForm {
    #[must_use]
    pub fn from_stage(stage: &Stage) -> Self {
        Self {
            name: stage.name.clone(),
            start_date: stage.start_date,
            end_date: stage.end_date,
            event_type: stage.event_type,
            instructor: stage.instructor.clone().unwrap_or_default(),
            capacity: stage.capacity,
        }
    }

    /// # Errors
    ///
    /// Blank name or missing date, start after end, zero capacity.
    pub fn validate(&self) -> Result<StageDraft, FormError> {
        let name = required(&self.name, "Nom")?;
        let start = self.start_date.ok_or(FormError::Required("Date de début"))?;
        let end = self.end_date.ok_or(FormError::Required("Date de fin"))?;
        if start > end {
            return Err(FormError::DatesInverted);
        }
        if self.capacity == 0 {
            return Err(FormError::CapacityNotPositive);
        }
        let instructor = self.instructor.trim();

        Ok(StageDraft {
            name,
            start_date: Some(start),
            end_date: Some(end),
            event_type: self.event_type,
            instructor: (!instructor.is_empty()).then(|| instructor.to_owned()),
            capacity: self.capacity,
            constraints: Vec::new(),
        })
    }
}

// =============================================================================
// VIEW
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct StagesView {
    pub stages: Vec<Stage>,
    pub filter: StageFilter,
    pub notices: NoticeBoard,
}

impl StagesView {
    #[must_use]
    pub fn with_notices(mut self, notices: NoticeBoard) -> Self {
        self.notices = notices;
        self
    }

    /// # Errors
    ///
    /// Backend errors from the stage list fetch.
    pub async fn load(backend: &dyn Backend) -> Result<Self, ApiError> {
        let stages = backend.list_stages().await?;
        Ok(Self { stages, ..Self::default() })
    }

    /// # Errors
    ///
    /// Backend errors, posted with the load-failure wording; the current
    /// list is kept.
    pub async fn refresh(&mut self, backend: &dyn Backend) -> Result<(), ApiError> {
        match backend.list_stages().await {
            Ok(stages) => {
                self.stages = stages;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "stage list fetch failed");
                self.notices.error(LOAD_FAILED_MESSAGE);
                Err(err)
            }
        }
    }

    /// Stages admitted by the filter, in backend order.
    #[must_use]
    pub fn visible(&self, today: Date) -> Vec<&Stage> {
        self.stages.iter().filter(|s| self.filter.admits(Lifecycle::of(s, today))).collect()
    }

    #[must_use]
    pub fn get(&self, id: Id) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// # Errors
    ///
    /// Form rejections and backend errors, also posted as an error notice.
    pub async fn create(&mut self, backend: &dyn Backend, form: &StageForm) -> Result<Stage, FormError> {
        let result = async {
            let draft = form.validate()?;
            let created = backend.create_stage(&draft).await?;
            self.refresh(backend).await?;
            Ok::<_, FormError>(created)
        }
        .await;
        if let Ok(stage) = &result {
            tracing::info!(stage_id = stage.id, "stage created");
            self.notices.success(format!("Stage \"{}\" créé avec succès", stage.name));
        }
        report_form(&mut self.notices, result)
    }

    /// # Errors
    ///
    /// As [`Self::create`].
    pub async fn update(&mut self, backend: &dyn Backend, id: Id, form: &StageForm) -> Result<Stage, FormError> {
        let result = async {
            let draft = form.validate()?;
            let updated = backend.update_stage(id, &draft).await?;
            self.refresh(backend).await?;
            Ok::<_, FormError>(updated)
        }
        .await;
        if let Ok(stage) = &result {
            self.notices.success(format!("Stage \"{}\" modifié avec succès", stage.name));
        }
        report_form(&mut self.notices, result)
    }

    /// Delete a stage that has no registrations left.
    ///
    /// # Errors
    ///
    /// [`FormError::StageNotEmpty`] (posted as a warning) when registrations
    /// remain, plus backend errors.
    pub async fn delete(&mut self, backend: &dyn Backend, id: Id) -> Result<(), FormError> {
        let name = self.get(id).map_or_else(|| format!("Stage {id}"), |s| s.name.clone());
        let result = async {
            let registrations = backend.stage_registrations(id).await?;
            if !registrations.is_empty() {
                return Err(FormError::StageNotEmpty { name: name.clone(), count: registrations.len() });
            }
            backend.delete_stage(id).await?;
            self.refresh(backend).await?;
            Ok::<_, FormError>(())
        }
        .await;
        if result.is_ok() {
            tracing::info!(stage_id = id, "stage deleted");
            self.notices.success(format!("Stage \"{name}\" supprimé avec succès"));
        }
        report_form(&mut self.notices, result)
    }
}
