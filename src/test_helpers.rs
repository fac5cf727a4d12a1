//! In-memory `Backend` and record builders shared by screen tests.

use std::collections::HashMap;
use std::sync::Mutex;

use time::Date;

use crate::api::types::{
    ActionType, ActivityLog, ActivityLogStats, AssignParticipant, AssignRegistration, AutoAssignReport,
    AutoAssignSummary, Bed, BedKind, BedOccupant, Bungalow, DashboardStats, FrequencyReport, Gender, Id, ImportOutcome,
    ImportSelection, ImportValidation, Language, LanguageDraft, LanguagePatch, LanguageStatistics, NetworkInfo,
    Participant, ParticipantDraft, ParticipantPatch, ParticipantStage, ParticipantStatus, RegistrationDraft,
    RegistrationExport, RegistrationPatch, Stage, StageDraft, StageParticipantsStats, Village,
};
use crate::api::{ActivityQuery, ApiError, Backend, ParticipantQuery};
use crate::period::DateRange;

// =============================================================================
// CALL LOG
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    ListParticipants(ParticipantQuery),
    CreateParticipant(ParticipantDraft),
    UpdateParticipant(Id, ParticipantPatch),
    DeleteParticipant(Id),
    ListStages,
    GetStage(Id),
    CreateStage(StageDraft),
    UpdateStage(Id, StageDraft),
    DeleteStage(Id),
    ListBungalows,
    ListVillages,
    AssignParticipant(Id, AssignParticipant),
    UnassignParticipant(Id),
    StageRegistrations(Id),
    StageRegistrationStats(Id),
    AddRegistration(RegistrationDraft),
    UpdateRegistration(Id, RegistrationPatch),
    RemoveRegistration(Id),
    UnassignedRegistrations(Option<DateRange>),
    AssignRegistration(Id, AssignRegistration),
    UnassignRegistration(Id),
    ExportRegistrations(Option<Id>),
    AutoAssignStage(Id),
    DashboardStats,
    NetworkInfo,
    ListLanguages,
    CreateLanguage(LanguageDraft),
    UpdateLanguage(Id, LanguagePatch),
    DeleteLanguage(Id),
    LanguageStatistics,
    ActivityLogs(ActivityQuery),
    ActivityStats,
    FrequencyReport(DateRange),
    ValidateImport(String, Vec<u8>),
    ExecuteImport(ImportSelection),
}

impl Call {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::ListParticipants(_) => "list_participants",
            Self::CreateParticipant(_) => "create_participant",
            Self::UpdateParticipant(..) => "update_participant",
            Self::DeleteParticipant(_) => "delete_participant",
            Self::ListStages => "list_stages",
            Self::GetStage(_) => "get_stage",
            Self::CreateStage(_) => "create_stage",
            Self::UpdateStage(..) => "update_stage",
            Self::DeleteStage(_) => "delete_stage",
            Self::ListBungalows => "list_bungalows",
            Self::ListVillages => "list_villages",
            Self::AssignParticipant(..) => "assign_participant",
            Self::UnassignParticipant(_) => "unassign_participant",
            Self::StageRegistrations(_) => "stage_registrations",
            Self::StageRegistrationStats(_) => "stage_registration_stats",
            Self::AddRegistration(_) => "add_registration",
            Self::UpdateRegistration(..) => "update_registration",
            Self::RemoveRegistration(_) => "remove_registration",
            Self::UnassignedRegistrations(_) => "unassigned_registrations",
            Self::AssignRegistration(..) => "assign_registration",
            Self::UnassignRegistration(_) => "unassign_registration",
            Self::ExportRegistrations(_) => "export_registrations",
            Self::AutoAssignStage(_) => "auto_assign_stage",
            Self::DashboardStats => "dashboard_stats",
            Self::NetworkInfo => "network_info",
            Self::ListLanguages => "list_languages",
            Self::CreateLanguage(_) => "create_language",
            Self::UpdateLanguage(..) => "update_language",
            Self::DeleteLanguage(_) => "delete_language",
            Self::LanguageStatistics => "language_statistics",
            Self::ActivityLogs(_) => "activity_logs",
            Self::ActivityStats => "activity_stats",
            Self::FrequencyReport(_) => "frequency_report",
            Self::ValidateImport(..) => "validate_import",
            Self::ExecuteImport(_) => "execute_import",
        }
    }
}

// =============================================================================
// MockBackend
// =============================================================================

/// Backend double holding canned records. Mutations update the records so a
/// refetch observes them, and every call lands in `calls`.
#[derive(Default)]
pub(crate) struct MockBackend {
    pub participants: Mutex<Vec<Participant>>,
    pub stages: Mutex<Vec<Stage>>,
    pub bungalows: Mutex<Vec<Bungalow>>,
    pub villages: Mutex<Vec<Village>>,
    pub registrations: Mutex<Vec<ParticipantStage>>,
    pub stats: Mutex<Option<StageParticipantsStats>>,
    pub dashboard: Mutex<Option<DashboardStats>>,
    pub export: Mutex<RegistrationExport>,
    pub network: Mutex<Option<NetworkInfo>>,
    pub languages: Mutex<Vec<Language>>,
    pub language_stats: Mutex<LanguageStatistics>,
    pub activities: Mutex<Vec<ActivityLog>>,
    pub activity_stats: Mutex<ActivityLogStats>,
    pub frequency: Mutex<FrequencyReport>,
    pub import_validation: Mutex<ImportValidation>,
    pub import_outcome: Mutex<ImportOutcome>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<&'static str, ApiError>>,
}

impl MockBackend {
    pub(crate) fn new(participants: Vec<Participant>, stages: Vec<Stage>, bungalows: Vec<Bungalow>) -> Self {
        Self {
            participants: Mutex::new(participants),
            stages: Mutex::new(stages),
            bungalows: Mutex::new(bungalows),
            ..Self::default()
        }
    }

    /// Make the next call to `operation` fail with `err`.
    pub(crate) fn fail_next(&self, operation: &'static str, err: ApiError) {
        self.failures.lock().unwrap().insert(operation, err);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_names(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(Call::name).collect()
    }

    pub(crate) fn count(&self, operation: &str) -> usize {
        self.call_names().into_iter().filter(|name| *name == operation).count()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: Call) -> Result<(), ApiError> {
        let name = call.name();
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().remove(name) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn not_found() -> ApiError {
        ApiError::NotFound { detail: None }
    }
}

#[async_trait::async_trait]
impl Backend for MockBackend {
    async fn list_participants(&self, query: &ParticipantQuery) -> Result<Vec<Participant>, ApiError> {
        self.record(Call::ListParticipants(query.clone()))?;
        let participants = self.participants.lock().unwrap();
        Ok(participants
            .iter()
            .filter(|p| query.stage_id.is_none_or(|id| p.stage_ids.contains(&id)))
            .cloned()
            .collect())
    }

    async fn create_participant(&self, draft: &ParticipantDraft) -> Result<Participant, ApiError> {
        self.record(Call::CreateParticipant(draft.clone()))?;
        let mut participants = self.participants.lock().unwrap();
        let id = participants.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let created = Participant {
            id,
            first_name: draft.first_name.clone(),
            last_name: draft.last_name.clone(),
            email: draft.email.clone(),
            gender: draft.gender,
            age: draft.age,
            language: draft.language.clone(),
            status: draft.status,
            ..Participant::default()
        };
        participants.push(created.clone());
        Ok(created)
    }

    async fn update_participant(&self, id: Id, patch: &ParticipantPatch) -> Result<Participant, ApiError> {
        self.record(Call::UpdateParticipant(id, patch.clone()))?;
        let mut participants = self.participants.lock().unwrap();
        let participant = participants.iter_mut().find(|p| p.id == id).ok_or_else(Self::not_found)?;
        if let Some(first_name) = &patch.first_name {
            participant.first_name.clone_from(first_name);
        }
        if let Some(last_name) = &patch.last_name {
            participant.last_name.clone_from(last_name);
        }
        if let Some(email) = &patch.email {
            participant.email.clone_from(email);
        }
        if let Some(status) = patch.status {
            participant.status = status;
        }
        Ok(participant.clone())
    }

    async fn delete_participant(&self, id: Id) -> Result<(), ApiError> {
        self.record(Call::DeleteParticipant(id))?;
        self.participants.lock().unwrap().retain(|p| p.id != id);
        Ok(())
    }

    async fn list_stages(&self) -> Result<Vec<Stage>, ApiError> {
        self.record(Call::ListStages)?;
        Ok(self.stages.lock().unwrap().clone())
    }

    async fn get_stage(&self, id: Id) -> Result<Stage, ApiError> {
        self.record(Call::GetStage(id))?;
        self.stages.lock().unwrap().iter().find(|s| s.id == id).cloned().ok_or_else(Self::not_found)
    }

    async fn create_stage(&self, draft: &StageDraft) -> Result<Stage, ApiError> {
        self.record(Call::CreateStage(draft.clone()))?;
        let mut stages = self.stages.lock().unwrap();
        let id = stages.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        let created = Stage {
            id,
            name: draft.name.clone(),
            start_date: draft.start_date,
            end_date: draft.end_date,
            event_type: draft.event_type,
            instructor: draft.instructor.clone(),
            capacity: draft.capacity,
            ..Stage::default()
        };
        stages.push(created.clone());
        Ok(created)
    }

    async fn update_stage(&self, id: Id, draft: &StageDraft) -> Result<Stage, ApiError> {
        self.record(Call::UpdateStage(id, draft.clone()))?;
        let mut stages = self.stages.lock().unwrap();
        let stage = stages.iter_mut().find(|s| s.id == id).ok_or_else(Self::not_found)?;
        stage.name.clone_from(&draft.name);
        stage.start_date = draft.start_date;
        stage.end_date = draft.end_date;
        stage.capacity = draft.capacity;
        Ok(stage.clone())
    }

    async fn delete_stage(&self, id: Id) -> Result<(), ApiError> {
        self.record(Call::DeleteStage(id))?;
        self.stages.lock().unwrap().retain(|s| s.id != id);
        Ok(())
    }

    async fn list_bungalows(&self) -> Result<Vec<Bungalow>, ApiError> {
        self.record(Call::ListBungalows)?;
        Ok(self.bungalows.lock().unwrap().clone())
    }

    async fn list_villages(&self) -> Result<Vec<Village>, ApiError> {
        self.record(Call::ListVillages)?;
        Ok(self.villages.lock().unwrap().clone())
    }

    async fn assign_participant(&self, participant_id: Id, body: &AssignParticipant) -> Result<(), ApiError> {
        self.record(Call::AssignParticipant(participant_id, body.clone()))?;
        let mut participants = self.participants.lock().unwrap();
        let participant = participants.iter_mut().find(|p| p.id == participant_id).ok_or_else(Self::not_found)?;
        participant.assigned_bungalow_id = Some(body.bungalow_id);
        participant.assigned_bed = Some(body.bed.clone());
        participant.is_assigned = true;
        Ok(())
    }

    async fn unassign_participant(&self, participant_id: Id) -> Result<(), ApiError> {
        self.record(Call::UnassignParticipant(participant_id))?;
        let mut participants = self.participants.lock().unwrap();
        let participant = participants.iter_mut().find(|p| p.id == participant_id).ok_or_else(Self::not_found)?;
        participant.assigned_bungalow_id = None;
        participant.assigned_bed = None;
        participant.is_assigned = false;
        Ok(())
    }

    async fn stage_registrations(&self, stage_id: Id) -> Result<Vec<ParticipantStage>, ApiError> {
        self.record(Call::StageRegistrations(stage_id))?;
        Ok(self.registrations.lock().unwrap().iter().filter(|r| r.stage_id == stage_id).cloned().collect())
    }

    async fn stage_registration_stats(&self, stage_id: Id) -> Result<StageParticipantsStats, ApiError> {
        self.record(Call::StageRegistrationStats(stage_id))?;
        Ok(self.stats.lock().unwrap().clone().unwrap_or_default())
    }

    async fn add_registration(&self, draft: &RegistrationDraft) -> Result<ParticipantStage, ApiError> {
        self.record(Call::AddRegistration(draft.clone()))?;
        let mut registrations = self.registrations.lock().unwrap();
        let id = registrations.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let created = ParticipantStage {
            id,
            participant_id: draft.participant_id,
            stage_id: draft.stage_id,
            arrival_date: draft.arrival_date,
            departure_date: draft.departure_date,
            role: draft.role,
            ..ParticipantStage::default()
        };
        registrations.push(created.clone());
        Ok(created)
    }

    async fn update_registration(&self, id: Id, patch: &RegistrationPatch) -> Result<ParticipantStage, ApiError> {
        self.record(Call::UpdateRegistration(id, patch.clone()))?;
        let mut registrations = self.registrations.lock().unwrap();
        let registration = registrations.iter_mut().find(|r| r.id == id).ok_or_else(Self::not_found)?;
        if let Some(role) = patch.role {
            registration.role = role;
        }
        if patch.arrival_date.is_some() {
            registration.arrival_date = patch.arrival_date;
        }
        if patch.departure_date.is_some() {
            registration.departure_date = patch.departure_date;
        }
        Ok(registration.clone())
    }

    async fn remove_registration(&self, id: Id) -> Result<(), ApiError> {
        self.record(Call::RemoveRegistration(id))?;
        self.registrations.lock().unwrap().retain(|r| r.id != id);
        Ok(())
    }

    async fn unassigned_registrations(&self, period: Option<DateRange>) -> Result<Vec<ParticipantStage>, ApiError> {
        self.record(Call::UnassignedRegistrations(period))?;
        Ok(self
            .registrations
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !r.is_assigned)
            .filter(|r| match (period, r.stay()) {
                (Some(period), Some(stay)) => stay.overlaps(&period),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .cloned()
            .collect())
    }

    async fn assign_registration(&self, registration_id: Id, body: &AssignRegistration) -> Result<(), ApiError> {
        self.record(Call::AssignRegistration(registration_id, body.clone()))?;
        let mut registrations = self.registrations.lock().unwrap();
        let registration = registrations.iter_mut().find(|r| r.id == registration_id).ok_or_else(Self::not_found)?;
        registration.assigned_bungalow_id = Some(body.bungalow_id);
        registration.assigned_bed = Some(body.bed.clone());
        registration.is_assigned = true;
        Ok(())
    }

    async fn unassign_registration(&self, registration_id: Id) -> Result<(), ApiError> {
        self.record(Call::UnassignRegistration(registration_id))?;
        let mut registrations = self.registrations.lock().unwrap();
        let registration = registrations.iter_mut().find(|r| r.id == registration_id).ok_or_else(Self::not_found)?;
        registration.assigned_bungalow_id = None;
        registration.assigned_bed = None;
        registration.is_assigned = false;
        Ok(())
    }

    async fn export_registrations(&self, stage_id: Option<Id>) -> Result<RegistrationExport, ApiError> {
        self.record(Call::ExportRegistrations(stage_id))?;
        Ok(self.export.lock().unwrap().clone())
    }

    async fn auto_assign_stage(&self, stage_id: Id) -> Result<AutoAssignReport, ApiError> {
        self.record(Call::AutoAssignStage(stage_id))?;
        Ok(AutoAssignReport {
            success: true,
            summary: AutoAssignSummary { total_assigned: 2, total_failed: 1, success_rate: 66.7 },
            message: "Assignation automatique terminée: 2 participant(s) assigné(s), 1 échec(s)".into(),
        })
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.record(Call::DashboardStats)?;
        Ok(self.dashboard.lock().unwrap().clone().unwrap_or_default())
    }

    async fn network_info(&self) -> Result<NetworkInfo, ApiError> {
        self.record(Call::NetworkInfo)?;
        self.network.lock().unwrap().clone().ok_or_else(Self::not_found)
    }

    async fn list_languages(&self) -> Result<Vec<Language>, ApiError> {
        self.record(Call::ListLanguages)?;
        Ok(self.languages.lock().unwrap().clone())
    }

    async fn create_language(&self, draft: &LanguageDraft) -> Result<Language, ApiError> {
        self.record(Call::CreateLanguage(draft.clone()))?;
        let mut languages = self.languages.lock().unwrap();
        let id = languages.iter().map(|l| l.id).max().unwrap_or(0) + 1;
        let created = Language {
            id,
            code: draft.code.clone(),
            name: draft.name.clone(),
            native_name: draft.native_name.clone(),
            is_active: draft.is_active,
            display_order: draft.display_order,
            participant_count: Some(0),
        };
        languages.push(created.clone());
        Ok(created)
    }

    async fn update_language(&self, id: Id, patch: &LanguagePatch) -> Result<Language, ApiError> {
        self.record(Call::UpdateLanguage(id, patch.clone()))?;
        let mut languages = self.languages.lock().unwrap();
        let language = languages.iter_mut().find(|l| l.id == id).ok_or_else(Self::not_found)?;
        if let Some(code) = &patch.code {
            language.code.clone_from(code);
        }
        if let Some(name) = &patch.name {
            language.name.clone_from(name);
        }
        if let Some(is_active) = patch.is_active {
            language.is_active = is_active;
        }
        Ok(language.clone())
    }

    async fn delete_language(&self, id: Id) -> Result<(), ApiError> {
        self.record(Call::DeleteLanguage(id))?;
        self.languages.lock().unwrap().retain(|l| l.id != id);
        Ok(())
    }

    async fn language_statistics(&self) -> Result<LanguageStatistics, ApiError> {
        self.record(Call::LanguageStatistics)?;
        Ok(self.language_stats.lock().unwrap().clone())
    }

    async fn activity_logs(&self, query: &ActivityQuery) -> Result<Vec<ActivityLog>, ApiError> {
        self.record(Call::ActivityLogs(query.clone()))?;
        let needle = query.search.as_deref().unwrap_or_default().to_lowercase();
        Ok(self
            .activities
            .lock()
            .unwrap()
            .iter()
            .filter(|a| query.user_id.is_none_or(|id| a.user == Some(id)))
            .filter(|a| query.action_type.is_none_or(|t| a.action_type == t))
            .filter(|a| query.model_name.as_deref().is_none_or(|m| a.model_name == m))
            .filter(|a| needle.is_empty() || a.description.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn activity_stats(&self) -> Result<ActivityLogStats, ApiError> {
        self.record(Call::ActivityStats)?;
        Ok(self.activity_stats.lock().unwrap().clone())
    }

    async fn frequency_report(&self, period: DateRange) -> Result<FrequencyReport, ApiError> {
        self.record(Call::FrequencyReport(period))?;
        Ok(self.frequency.lock().unwrap().clone())
    }

    async fn validate_import(&self, file_name: &str, content: Vec<u8>) -> Result<ImportValidation, ApiError> {
        self.record(Call::ValidateImport(file_name.to_owned(), content))?;
        Ok(self.import_validation.lock().unwrap().clone())
    }

    async fn execute_import(&self, selection: &ImportSelection) -> Result<ImportOutcome, ApiError> {
        self.record(Call::ExecuteImport(selection.clone()))?;
        Ok(self.import_outcome.lock().unwrap().clone())
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

pub(crate) fn participant(id: Id, first_name: &str, last_name: &str, stage_ids: &[Id]) -> Participant {
    Participant {
        id,
        first_name: first_name.into(),
        last_name: last_name.into(),
        email: format!("{}.{}@example.org", first_name.to_lowercase(), last_name.to_lowercase()),
        gender: Gender::Female,
        age: 30,
        language: "Français".into(),
        status: ParticipantStatus::Student,
        stage_ids: stage_ids.to_vec(),
        ..Participant::default()
    }
}

pub(crate) fn assigned(mut participant: Participant, bungalow_id: Id, bed: &str) -> Participant {
    participant.assigned_bungalow_id = Some(bungalow_id);
    participant.assigned_bed = Some(bed.into());
    participant.is_assigned = true;
    participant
}

pub(crate) fn stage(id: Id, name: &str, start: Date, end: Date) -> Stage {
    Stage { id, name: name.into(), start_date: Some(start), end_date: Some(end), capacity: 20, ..Stage::default() }
}

/// Bungalow with `capacity` free beds named `bed1..bedN`.
pub(crate) fn bungalow(id: Id, name: &str, village: &str, capacity: u32) -> Bungalow {
    Bungalow {
        id,
        name: name.into(),
        village: village.into(),
        layout: "standard".into(),
        capacity,
        occupancy: 0,
        beds: (1..=capacity).map(|n| Bed { id: format!("bed{n}"), kind: BedKind::Single, occupied_by: None }).collect(),
        amenities: Vec::new(),
    }
}

pub(crate) fn occupy(mut bungalow: Bungalow, bed_id: &str, participant_id: Id) -> Bungalow {
    if let Some(bed) = bungalow.beds.iter_mut().find(|bed| bed.id == bed_id) {
        bed.occupied_by = Some(BedOccupant::ParticipantId(participant_id));
    }
    bungalow.occupancy = u32::try_from(bungalow.occupied_beds()).unwrap();
    bungalow
}

pub(crate) fn registration(id: Id, participant_id: Id, stage: &Stage) -> ParticipantStage {
    ParticipantStage {
        id,
        participant_id,
        participant_name: format!("Participant {participant_id}"),
        stage_id: stage.id,
        stage_name: stage.name.clone(),
        stage_start_date: stage.start_date,
        stage_end_date: stage.end_date,
        ..ParticipantStage::default()
    }
}

pub(crate) fn village(id: Id, name: &str, total: u32, occupied: u32) -> Village {
    Village {
        id,
        name: name.into(),
        amenities_type: "shared".into(),
        total_bungalows: total,
        occupied_bungalows: occupied,
    }
}

pub(crate) fn language(id: Id, code: &str, name: &str, active: bool, participants: u32) -> Language {
    Language {
        id,
        code: code.into(),
        name: name.into(),
        native_name: None,
        is_active: active,
        display_order: u32::try_from(id).unwrap(),
        participant_count: Some(participants),
    }
}

pub(crate) fn activity(id: Id, user: Option<(Id, &str)>, action: ActionType, model: &str, description: &str) -> ActivityLog {
    ActivityLog {
        id,
        user: user.map(|(id, _)| id),
        user_name: user.map_or_else(|| "Système".to_owned(), |(_, name)| name.to_owned()),
        user_email: None,
        action_type: action,
        action_type_display: action.label().to_owned(),
        model_name: model.into(),
        model_name_display: model.into(),
        object_id: None,
        object_repr: String::new(),
        description: description.into(),
        changes: serde_json::Value::Null,
        timestamp: "2024-07-02T09:30:00Z".into(),
    }
}
