//! Wire types mirrored from the backend's camelCase JSON.
//!
//! Records are held transiently by screens and never persisted client-side.
//! Fields the backend sometimes omits carry `#[serde(default)]` so an older
//! server build still deserializes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::period::DateRange;

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

pub type Id = i64;

// =============================================================================
// ENUMS
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[default]
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "Homme",
            Self::Female => "Femme",
        }
    }
}

/// Participant category, independent of any stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
    #[default]
    Student,
    Instructor,
    Professional,
    Staff,
}

impl ParticipantStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Student => "Élève",
            Self::Instructor => "Enseignant-e",
            Self::Professional => "Professionnel-le",
            Self::Staff => "Salarié-e",
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Instructor => "instructor",
            Self::Professional => "professional",
            Self::Staff => "staff",
        }
    }
}

/// Role a participant holds within one stage registration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageRole {
    #[default]
    Participant,
    Musician,
    Instructor,
    Staff,
}

impl StageRole {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Participant => "Participant-e",
            Self::Musician => "Musicien-ne",
            Self::Instructor => "Encadrant-e",
            Self::Staff => "Staff",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    #[default]
    Stage,
    Resident,
    Autres,
}

impl EventType {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Stage => "Stage",
            Self::Resident => "Résidence",
            Self::Autres => "Autre",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BedKind {
    #[default]
    Single,
    Double,
    #[serde(other)]
    Other,
}

// =============================================================================
// PARTICIPANTS
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: Id,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub language_ids: Vec<Id>,
    #[serde(default)]
    pub status: ParticipantStatus,
    #[serde(default)]
    pub assigned_bungalow_id: Option<Id>,
    #[serde(default)]
    pub assigned_bed: Option<String>,
    #[serde(default)]
    pub is_assigned: bool,
    #[serde(default)]
    pub stage_ids: Vec<Id>,
    #[serde(default)]
    pub stage_count: Option<u32>,
}

impl Participant {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Stage used when assigning a room: the first one the participant is
    /// enrolled in.
    #[must_use]
    pub fn first_stage_id(&self) -> Option<Id> {
        self.stage_ids.first().copied()
    }
}

/// Body for creating or replacing a participant's own fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: Gender,
    pub age: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    pub language: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub language_ids: Vec<Id>,
    pub status: ParticipantStatus,
}

/// Partial update; unset fields are left alone by the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ParticipantStatus>,
}

/// Body of `POST /participants/{id}/assign/`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignParticipant {
    pub bungalow_id: Id,
    pub bed: String,
    pub stage_id: Id,
}

// =============================================================================
// STAGES
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: Id,
    pub name: String,
    #[serde(default, with = "calendar_date")]
    pub start_date: Option<Date>,
    #[serde(default, with = "calendar_date")]
    pub end_date: Option<Date>,
    #[serde(default)]
    pub event_type: EventType,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub instructor2: Option<String>,
    #[serde(default)]
    pub instructor3: Option<String>,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub current_participants: u32,
    #[serde(default)]
    pub musicians_count: u32,
    #[serde(default)]
    pub constraints: Vec<String>,
}

impl Stage {
    /// The stage's date range, when both bounds are known.
    #[must_use]
    pub fn period(&self) -> Option<DateRange> {
        DateRange::from_bounds(self.start_date, self.end_date)
    }

    #[must_use]
    pub fn instructors(&self) -> Vec<&str> {
        [&self.instructor, &self.instructor2, &self.instructor3]
            .into_iter()
            .filter_map(|name| name.as_deref())
            .filter(|name| !name.trim().is_empty())
            .collect()
    }
}

/// Body for creating or updating a stage.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageDraft {
    pub name: String,
    #[serde(with = "calendar_date")]
    pub start_date: Option<Date>,
    #[serde(with = "calendar_date")]
    pub end_date: Option<Date>,
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructor: Option<String>,
    pub capacity: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBreakdown {
    #[serde(default)]
    pub participant: u32,
    #[serde(default)]
    pub musician: u32,
    #[serde(default)]
    pub instructor: u32,
    #[serde(default)]
    pub staff: u32,
}

/// `GET /stages/{id}/participants/stats/`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageParticipantsStats {
    pub stage_id: Id,
    pub stage_name: String,
    pub total_participants: u32,
    pub capacity: u32,
    pub available_spots: u32,
    pub assigned_to_bungalow: u32,
    pub not_assigned: u32,
    #[serde(default)]
    pub by_role: RoleBreakdown,
}

// =============================================================================
// BUNGALOWS & VILLAGES
// =============================================================================

/// Structured occupant sent by newer backends for an occupied bed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupantDetails {
    #[serde(default)]
    pub registration_id: Option<Id>,
    pub participant_id: Id,
    pub name: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub role: Option<StageRole>,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub stage_name: String,
    #[serde(default)]
    pub was_forced: bool,
}

/// A bed's occupant in whichever shape the backend sent it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BedOccupant {
    Details(Box<OccupantDetails>),
    ParticipantId(Id),
    Label(String),
}

impl BedOccupant {
    #[must_use]
    pub fn participant_id(&self) -> Option<Id> {
        match self {
            Self::Details(details) => Some(details.participant_id),
            Self::ParticipantId(id) => Some(*id),
            Self::Label(_) => None,
        }
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Details(details) => details.name.clone(),
            Self::ParticipantId(id) => format!("Participant {id}"),
            Self::Label(label) => label.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bed {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: BedKind,
    #[serde(default)]
    pub occupied_by: Option<BedOccupant>,
}

impl Bed {
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.occupied_by.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bungalow {
    pub id: Id,
    pub name: String,
    pub village: String,
    #[serde(rename = "type", default)]
    pub layout: String,
    pub capacity: u32,
    #[serde(default)]
    pub occupancy: u32,
    #[serde(default)]
    pub beds: Vec<Bed>,
    #[serde(default)]
    pub amenities: Vec<String>,
}

impl Bungalow {
    /// Beds the backend reports as occupied.
    #[must_use]
    pub fn occupied_beds(&self) -> usize {
        self.beds.iter().filter(|bed| !bed.is_free()).count()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Village {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub amenities_type: String,
    #[serde(default)]
    pub total_bungalows: u32,
    #[serde(default)]
    pub occupied_bungalows: u32,
}

// =============================================================================
// REGISTRATIONS (participant <-> stage)
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantStage {
    pub id: Id,
    pub participant_id: Id,
    pub participant_name: String,
    #[serde(default)]
    pub participant_email: String,
    #[serde(default)]
    pub participant_gender: Gender,
    #[serde(default)]
    pub participant_age: u32,
    #[serde(default)]
    pub participant_nationality: Option<String>,
    #[serde(default)]
    pub participant_status: ParticipantStatus,
    #[serde(default)]
    pub participant_language: String,
    pub stage_id: Id,
    pub stage_name: String,
    #[serde(default, with = "calendar_date")]
    pub stage_start_date: Option<Date>,
    #[serde(default, with = "calendar_date")]
    pub stage_end_date: Option<Date>,
    #[serde(default, with = "calendar_date")]
    pub arrival_date: Option<Date>,
    #[serde(default)]
    pub arrival_time: Option<String>,
    #[serde(default, with = "calendar_date")]
    pub departure_date: Option<Date>,
    #[serde(default)]
    pub departure_time: Option<String>,
    #[serde(default)]
    pub role: StageRole,
    #[serde(default)]
    pub role_display: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default, with = "calendar_date")]
    pub effective_arrival_date: Option<Date>,
    #[serde(default, with = "calendar_date")]
    pub effective_departure_date: Option<Date>,
    #[serde(default)]
    pub assigned_bungalow_id: Option<Id>,
    #[serde(default)]
    pub assigned_bungalow_name: Option<String>,
    #[serde(default)]
    pub assigned_bed: Option<String>,
    #[serde(default)]
    pub is_assigned: bool,
}

impl ParticipantStage {
    /// Stay period: effective dates, falling back to the stage's own dates.
    #[must_use]
    pub fn stay(&self) -> Option<DateRange> {
        DateRange::from_bounds(
            self.effective_arrival_date.or(self.arrival_date).or(self.stage_start_date),
            self.effective_departure_date.or(self.departure_date).or(self.stage_end_date),
        )
    }
}

/// Body of `POST /participant-stages/`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDraft {
    pub participant_id: Id,
    pub stage_id: Id,
    #[serde(with = "calendar_date", skip_serializing_if = "Option::is_none")]
    pub arrival_date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<String>,
    #[serde(with = "calendar_date", skip_serializing_if = "Option::is_none")]
    pub departure_date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<String>,
    pub role: StageRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body of `PATCH /participant-stages/{id}/`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPatch {
    #[serde(with = "calendar_date", skip_serializing_if = "Option::is_none")]
    pub arrival_date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<String>,
    #[serde(with = "calendar_date", skip_serializing_if = "Option::is_none")]
    pub departure_date: Option<Date>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<StageRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Body of `POST /registrations/{id}/assign/`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRegistration {
    pub bungalow_id: Id,
    pub bed: String,
    #[serde(rename = "force_assign", skip_serializing_if = "std::ops::Not::not")]
    pub force: bool,
}

/// One line of `GET /registrations/export/`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationExportLine {
    #[serde(default)]
    pub village: String,
    #[serde(default)]
    pub bungalow: String,
    #[serde(default)]
    pub participant_name: String,
    #[serde(default)]
    pub arrival_date: String,
    #[serde(default)]
    pub arrival_time: String,
    #[serde(default)]
    pub departure_date: String,
    #[serde(default)]
    pub departure_time: String,
    #[serde(default)]
    pub stage_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RegistrationExport {
    #[serde(default)]
    pub assignments: Vec<RegistrationExportLine>,
    #[serde(default)]
    pub count: usize,
}

/// Summary block of `POST /stages/{id}/auto-assign/`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AutoAssignSummary {
    #[serde(default)]
    pub total_assigned: u32,
    #[serde(default)]
    pub total_failed: u32,
    #[serde(default)]
    pub success_rate: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AutoAssignReport {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub summary: AutoAssignSummary,
    #[serde(default)]
    pub message: String,
}

// =============================================================================
// DASHBOARD
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardOverview {
    pub total_events: u32,
    pub active_events: u32,
    pub upcoming_events: u32,
    pub past_events: u32,
    pub total_participants: u32,
    pub new_participants_this_month: u32,
    pub total_bungalows: u32,
    pub occupied_bungalows: u32,
    pub total_bed_capacity: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventTypeCounts {
    pub stages: u32,
    pub residences: u32,
    pub autres: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEvent {
    pub id: Id,
    pub name: String,
    #[serde(rename = "type", default)]
    pub event_type: EventType,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub registrations: u32,
    #[serde(default)]
    pub assigned: u32,
    #[serde(default)]
    pub days_remaining: i64,
    #[serde(default)]
    pub fill_rate: f64,
    #[serde(default)]
    pub instructor: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingEvent {
    pub id: Id,
    pub name: String,
    #[serde(rename = "type", default)]
    pub event_type: EventType,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default)]
    pub registrations: u32,
    #[serde(default)]
    pub days_until: i64,
    #[serde(default)]
    pub fill_rate: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardEvents {
    pub by_type: EventTypeCounts,
    pub active: Vec<ActiveEvent>,
    pub upcoming: Vec<UpcomingEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleTotals {
    pub participants: u32,
    pub instructors: u32,
    pub musicians: u32,
    pub staff: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationTotals {
    pub active_total: u32,
    pub assigned: u32,
    pub unassigned: u32,
    pub by_role: RoleTotals,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VillageOccupancyStat {
    pub id: Id,
    pub name: String,
    pub bungalow_count: u32,
    pub total_capacity: u32,
    pub current_occupants: u32,
    pub occupancy_rate: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAlert {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub severity: String,
    pub message: String,
    #[serde(default)]
    pub event_id: Option<Id>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecentActivity {
    pub id: Id,
    pub action_type: String,
    pub entity_type: String,
    pub entity_name: String,
    pub description: String,
    pub timestamp: String,
    pub user: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardTrends {
    pub participants_trend: f64,
    pub events_trend: f64,
    pub new_participants_this_month: u32,
    pub new_participants_last_month: u32,
    pub events_this_month: u32,
    pub events_last_month: u32,
}

/// `GET /dashboard/stats/`: aggregated server-side, only formatted here.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub overview: DashboardOverview,
    pub events: DashboardEvents,
    pub registrations: RegistrationTotals,
    pub villages: Vec<VillageOccupancyStat>,
    pub alerts: Vec<DashboardAlert>,
    pub recent_activities: Vec<RecentActivity>,
    pub trends: DashboardTrends,
    pub last_updated: Option<String>,
}

// =============================================================================
// NETWORK INFO
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub local_ip: String,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl NetworkInfo {
    pub const LOOPBACK: &'static str = "127.0.0.1";

    /// Address to advertise; loopback when discovery failed server-side.
    #[must_use]
    pub fn host(&self) -> &str {
        let ip = self.local_ip.trim();
        if self.success && !ip.is_empty() { ip } else { Self::LOOPBACK }
    }

    #[must_use]
    pub fn lan_url(&self, port: u16) -> String {
        format!("http://{}:{port}", self.host())
    }
}

// =============================================================================
// LANGUAGES
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub id: Id,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub native_name: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub display_order: u32,
    #[serde(default)]
    pub participant_count: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageDraft {
    pub code: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_name: Option<String>,
    pub is_active: bool,
    pub display_order: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguagePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_order: Option<u32>,
}

impl From<LanguageDraft> for LanguagePatch {
    fn from(draft: LanguageDraft) -> Self {
        Self {
            code: Some(draft.code),
            name: Some(draft.name),
            native_name: draft.native_name,
            is_active: Some(draft.is_active),
            display_order: Some(draft.display_order),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguageUsage {
    pub id: Id,
    pub name: String,
    pub code: String,
    pub count: u32,
}

/// `GET /languages/statistics/`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LanguageStatistics {
    pub total: u32,
    pub active: u32,
    pub inactive: u32,
    pub top_languages: Vec<LanguageUsage>,
}

// =============================================================================
// ACTIVITY LOG
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Create,
    Update,
    Delete,
    Assign,
    Unassign,
    #[serde(other)]
    Other,
}

impl ActionType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Assign => "assign",
            Self::Unassign => "unassign",
            Self::Other => "other",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Create => "Création",
            Self::Update => "Modification",
            Self::Delete => "Suppression",
            Self::Assign => "Assignation",
            Self::Unassign => "Désassignation",
            Self::Other => "Autre",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: Id,
    #[serde(default)]
    pub user: Option<Id>,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_email: Option<String>,
    pub action_type: ActionType,
    #[serde(default)]
    pub action_type_display: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub model_name_display: String,
    #[serde(default)]
    pub object_id: Option<Id>,
    #[serde(default)]
    pub object_repr: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub changes: serde_json::Value,
    pub timestamp: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub kind: String,
    pub count: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelCount {
    pub model: String,
    pub count: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserActivity {
    pub id: Id,
    pub username: String,
    pub name: String,
    pub count: u32,
}

/// `GET /activity-logs/statistics/`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityLogStats {
    pub total: u32,
    #[serde(rename = "recent24h")]
    pub recent_24h: u32,
    pub by_type: Vec<TypeCount>,
    pub by_model: Vec<ModelCount>,
    pub top_users: Vec<UserActivity>,
}

// =============================================================================
// FREQUENCY REPORT
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportPeriod {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportEvent {
    pub id: Id,
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub start_date: String,
    pub end_date: String,
    pub capacity: u32,
    pub current_participants: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportEvents {
    pub total: u32,
    pub stages: u32,
    pub residences: u32,
    pub autres: u32,
    pub list: Vec<ReportEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleCounts {
    pub participants: u32,
    pub instructors: u32,
    pub musicians: u32,
    pub staff: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusCounts {
    pub students: u32,
    pub instructors: u32,
    pub professionals: u32,
    pub staff: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportParticipants {
    pub total_registrations: u32,
    pub unique_participants: u32,
    pub by_role: RoleCounts,
    pub by_status: StatusCounts,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenderSplit {
    pub men: u32,
    pub women: u32,
    pub men_percentage: f64,
    pub women_percentage: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgeSpread {
    pub average: f64,
    pub min: u32,
    pub max: u32,
    /// Age bracket label to headcount.
    pub distribution: BTreeMap<String, u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Demographics {
    pub gender: GenderSplit,
    pub age: AgeSpread,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NationalityCount {
    pub nationality: String,
    pub count: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Nationalities {
    pub total: u32,
    pub list: Vec<NationalityCount>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageCount {
    pub language: String,
    pub count: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportOccupancy {
    pub total_bed_capacity: u32,
    pub total_event_capacity: u32,
    pub total_registrations: u32,
    pub assigned_to_bungalows: u32,
    pub event_fill_rate: f64,
    pub assignment_rate: f64,
}

/// `GET /reports/frequency/?start_date&end_date`: aggregated server-side.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyReport {
    pub period: ReportPeriod,
    pub events: ReportEvents,
    pub participants: ReportParticipants,
    pub demographics: Demographics,
    pub nationalities: Nationalities,
    pub languages: Vec<LanguageCount>,
    pub occupancy: ReportOccupancy,
}

// =============================================================================
// PARTICIPANT IMPORT
// =============================================================================

/// One row the backend resolved while validating an import file. Only the
/// fields shown are typed; the rest is sent back untouched on execute.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default)]
    pub stage_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_warning: Option<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

impl ImportRow {
    #[must_use]
    pub fn display_name(&self) -> String {
        match (&self.participant_name, &self.first_name, &self.last_name) {
            (Some(name), _, _) => name.clone(),
            (None, first, last) => {
                format!("{} {}", first.as_deref().unwrap_or_default(), last.as_deref().unwrap_or_default())
                    .trim()
                    .to_owned()
            }
        }
    }
}

/// A row the backend refused, with its spreadsheet line number.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportRejection {
    pub row: Option<u32>,
    pub email: Option<String>,
    pub reason: String,
}

impl ImportRejection {
    /// Individual reasons; the backend joins several with ` | `.
    #[must_use]
    pub fn reasons(&self) -> Vec<&str> {
        self.reason.split(" | ").map(str::trim).filter(|r| !r.is_empty()).collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportSummary {
    pub total_rows: u32,
    pub valid_imports: u32,
    pub new_participants: u32,
    pub already_registered: u32,
    pub errors: u32,
}

/// `POST /import/validate/`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImportValidation {
    pub summary: ImportSummary,
    pub valid_imports: Vec<ImportRow>,
    pub new_participants: Vec<ImportRow>,
    pub already_registered: Vec<ImportRow>,
    pub errors: Vec<ImportRejection>,
}

/// Body of `POST /import/execute/`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ImportSelection {
    pub valid_imports: Vec<ImportRow>,
    pub new_participants: Vec<ImportRow>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOutcomeSummary {
    pub imported: u32,
    pub created_and_imported: u32,
    pub errors: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImportOutcome {
    pub summary: ImportOutcomeSummary,
    pub imported: Vec<ImportRow>,
    pub created_and_imported: Vec<ImportRow>,
    pub errors: Vec<ImportRejection>,
}

// =============================================================================
// SERDE HELPERS
// =============================================================================

/// `Option<Date>` as `YYYY-MM-DD`; `null`, missing and `""` all read as `None`.
pub(crate) mod calendar_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    use crate::period::{format_date, parse_date};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.serialize_str(&format_date(*date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Date>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => parse_date(text).map(Some).map_err(serde::de::Error::custom),
        }
    }
}
