//! Backend access: wire types, error mapping, and the HTTP client.
//!
//! DESIGN
//! ======
//! Screens talk to [`Backend`], never to `reqwest` directly. The production
//! implementation is [`ApiClient`]; tests substitute an in-memory mock that
//! records each call.

pub mod client;
pub mod error;
pub mod types;

pub use client::ApiClient;
pub use error::ApiError;

use crate::period::DateRange;
use types::{
    ActionType, ActivityLog, ActivityLogStats, AssignParticipant, AssignRegistration, AutoAssignReport, Bungalow,
    DashboardStats, FrequencyReport, Id, ImportOutcome, ImportSelection, ImportValidation, Language, LanguageDraft,
    LanguagePatch, LanguageStatistics, NetworkInfo, Participant, ParticipantDraft, ParticipantPatch, ParticipantStage,
    ParticipantStatus, RegistrationDraft, RegistrationExport, RegistrationPatch, Stage, StageDraft,
    StageParticipantsStats, Village,
};

/// Server-side filters for `GET /participants/`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParticipantQuery {
    pub stage_id: Option<Id>,
    pub status: Option<ParticipantStatus>,
    pub search: Option<String>,
    pub assigned: Option<bool>,
}

impl ParticipantQuery {
    pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(stage_id) = self.stage_id {
            pairs.push(("stageId", stage_id.to_string()));
        }
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_owned()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_owned()));
        }
        if let Some(assigned) = self.assigned {
            pairs.push(("assigned", assigned.to_string()));
        }
        pairs
    }
}

/// Server-side filters for `GET /activity-logs/`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActivityQuery {
    pub user_id: Option<Id>,
    pub action_type: Option<ActionType>,
    pub model_name: Option<String>,
    pub search: Option<String>,
}

impl ActivityQuery {
    pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(user_id) = self.user_id {
            pairs.push(("user_id", user_id.to_string()));
        }
        if let Some(action) = self.action_type {
            pairs.push(("action_type", action.as_str().to_owned()));
        }
        if let Some(model) = self.model_name.as_deref().filter(|m| !m.is_empty()) {
            pairs.push(("model_name", model.to_owned()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_owned()));
        }
        pairs
    }
}

// =============================================================================
// BACKEND TRAIT
// =============================================================================

/// Every backend operation the screens use.
///
/// # Errors
///
/// All methods return [`ApiError`] on transport failure, a non-success
/// status, or an undecodable body.
#[async_trait::async_trait]
pub trait Backend: Send + Sync {
    async fn list_participants(&self, query: &ParticipantQuery) -> Result<Vec<Participant>, ApiError>;
    async fn create_participant(&self, draft: &ParticipantDraft) -> Result<Participant, ApiError>;
    async fn update_participant(&self, id: Id, patch: &ParticipantPatch) -> Result<Participant, ApiError>;
    async fn delete_participant(&self, id: Id) -> Result<(), ApiError>;

    async fn list_stages(&self) -> Result<Vec<Stage>, ApiError>;
    async fn get_stage(&self, id: Id) -> Result<Stage, ApiError>;
    async fn create_stage(&self, draft: &StageDraft) -> Result<Stage, ApiError>;
    async fn update_stage(&self, id: Id, draft: &StageDraft) -> Result<Stage, ApiError>;
    async fn delete_stage(&self, id: Id) -> Result<(), ApiError>;

    async fn list_bungalows(&self) -> Result<Vec<Bungalow>, ApiError>;
    async fn list_villages(&self) -> Result<Vec<Village>, ApiError>;

    /// Participant-level assignment: bungalow, bed, and the stage it is for.
    async fn assign_participant(&self, participant_id: Id, body: &AssignParticipant) -> Result<(), ApiError>;
    async fn unassign_participant(&self, participant_id: Id) -> Result<(), ApiError>;

    async fn stage_registrations(&self, stage_id: Id) -> Result<Vec<ParticipantStage>, ApiError>;
    async fn stage_registration_stats(&self, stage_id: Id) -> Result<StageParticipantsStats, ApiError>;
    async fn add_registration(&self, draft: &RegistrationDraft) -> Result<ParticipantStage, ApiError>;
    async fn update_registration(&self, id: Id, patch: &RegistrationPatch) -> Result<ParticipantStage, ApiError>;
    async fn remove_registration(&self, id: Id) -> Result<(), ApiError>;

    /// Registrations without a bed, optionally limited to stays overlapping
    /// `period`.
    async fn unassigned_registrations(&self, period: Option<DateRange>) -> Result<Vec<ParticipantStage>, ApiError>;
    async fn assign_registration(&self, registration_id: Id, body: &AssignRegistration) -> Result<(), ApiError>;
    async fn unassign_registration(&self, registration_id: Id) -> Result<(), ApiError>;
    async fn export_registrations(&self, stage_id: Option<Id>) -> Result<RegistrationExport, ApiError>;
    async fn auto_assign_stage(&self, stage_id: Id) -> Result<AutoAssignReport, ApiError>;

    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError>;
    async fn network_info(&self) -> Result<NetworkInfo, ApiError>;

    async fn list_languages(&self) -> Result<Vec<Language>, ApiError>;
    async fn create_language(&self, draft: &LanguageDraft) -> Result<Language, ApiError>;
    async fn update_language(&self, id: Id, patch: &LanguagePatch) -> Result<Language, ApiError>;
    async fn delete_language(&self, id: Id) -> Result<(), ApiError>;
    async fn language_statistics(&self) -> Result<LanguageStatistics, ApiError>;

    async fn activity_logs(&self, query: &ActivityQuery) -> Result<Vec<ActivityLog>, ApiError>;
    async fn activity_stats(&self) -> Result<ActivityLogStats, ApiError>;

    /// Attendance figures for every event overlapping `period`.
    async fn frequency_report(&self, period: DateRange) -> Result<FrequencyReport, ApiError>;

    /// Upload a spreadsheet for a dry run; nothing is written server-side.
    async fn validate_import(&self, file_name: &str, content: Vec<u8>) -> Result<ImportValidation, ApiError>;
    async fn execute_import(&self, selection: &ImportSelection) -> Result<ImportOutcome, ApiError>;
}
