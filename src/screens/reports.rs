//! Reports and spreadsheet exports.
//!
//! DESIGN
//! ======
//! Exports are semicolon-separated CSV with a UTF-8 byte-order mark, which
//! spreadsheet tools open directly with accents intact. Every id in a row is
//! resolved to a name from the loaded lookup tables before it is written.
//!
//! TRADE-OFFS
//! ==========
//! Writers take any `io::Write`, so tests render into a `Vec<u8>` and the
//! binary into a file.

use std::io::Write;

use serde::Serialize;
use time::Date;

use crate::api::types::{Bungalow, Id, Participant, RegistrationExport, Stage};
use crate::api::{ApiError, Backend, ParticipantQuery};
use crate::period::{DateRange, format_date};
use crate::screens::in_period;

#[cfg(test)]
#[path = "reports_test.rs"]
mod tests;

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
pub const MISSING: &str = "-";
pub const NO_STAGE: &str = "Aucun";

pub const ASSIGNMENT_HEADERS: [&str; 12] = [
    "Prénom",
    "Nom",
    "Email",
    "Sexe",
    "Âge",
    "Statut",
    "Langue",
    "Stage(s)",
    "Village",
    "Bungalow",
    "Lit",
    "Capacité Bungalow",
];

pub const REGISTRATION_HEADERS: [&str; 7] = [
    "Village",
    "Chambre",
    "Nom et Prénom",
    "Date d'arrivée",
    "Heure d'arrivée",
    "Date de départ",
    "Heure de départ",
];

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Aucune assignation à exporter")]
    NothingToExport,

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
}

// =============================================================================
// ROWS
// =============================================================================

/// One line of the room assignment export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentRow {
    #[serde(rename = "Prénom")]
    pub first_name: String,
    #[serde(rename = "Nom")]
    pub last_name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Sexe")]
    pub gender: String,
    #[serde(rename = "Âge")]
    pub age: u32,
    #[serde(rename = "Statut")]
    pub status: String,
    #[serde(rename = "Langue")]
    pub language: String,
    #[serde(rename = "Stage(s)")]
    pub stages: String,
    #[serde(rename = "Village")]
    pub village: String,
    #[serde(rename = "Bungalow")]
    pub bungalow: String,
    #[serde(rename = "Lit")]
    pub bed: String,
    #[serde(rename = "Capacité Bungalow")]
    pub bungalow_capacity: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VillageOccupancy {
    pub village: String,
    pub occupied: usize,
    pub total: usize,
    /// Rounded percentage of bungalows with at least one occupant.
    pub rate: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterMember {
    pub name: String,
    pub assigned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRoster {
    pub stage_id: Id,
    pub stage_name: String,
    pub members: Vec<RosterMember>,
}

impl StageRoster {
    #[must_use]
    pub fn assigned(&self) -> usize {
        self.members.iter().filter(|m| m.assigned).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalMetrics {
    pub occupancy_rate: u32,
    pub assigned_participants: usize,
    pub available_bungalows: usize,
    pub stages: usize,
}

// =============================================================================
// VIEW
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ReportsView {
    pub participants: Vec<Participant>,
    pub stages: Vec<Stage>,
    pub bungalows: Vec<Bungalow>,
    pub period_start: Option<Date>,
    pub period_end: Option<Date>,
}

impl ReportsView {
    /// # Errors
    ///
    /// Returns the first failing fetch.
    pub async fn load(backend: &dyn Backend) -> Result<Self, ApiError> {
        let query = ParticipantQuery::default();
        let (participants, stages, bungalows) =
            tokio::try_join!(backend.list_participants(&query), backend.list_stages(), backend.list_bungalows())?;
        Ok(Self { participants, stages, bungalows, ..Self::default() })
    }

    pub fn set_period(&mut self, start: Option<Date>, end: Option<Date>) {
        self.period_start = start;
        self.period_end = end;
    }

    #[must_use]
    pub fn period(&self) -> Option<DateRange> {
        DateRange::from_bounds(self.period_start, self.period_end)
    }

    /// Assigned participants in the period, one row each.
    #[must_use]
    pub fn assignment_rows(&self) -> Vec<AssignmentRow> {
        in_period(&self.participants, &self.stages, self.period())
            .filter(|p| p.assigned_bungalow_id.is_some())
            .map(|p| self.assignment_row(p))
            .collect()
    }

    fn assignment_row(&self, participant: &Participant) -> AssignmentRow {
        let bungalow =
            participant.assigned_bungalow_id.and_then(|id| self.bungalows.iter().find(|b| b.id == id));
        let stages = if participant.stage_ids.is_empty() {
            NO_STAGE.to_owned()
        } else {
            participant
                .stage_ids
                .iter()
                .map(|id| {
                    self.stages.iter().find(|s| s.id == *id).map_or_else(|| format!("Stage {id}"), |s| s.name.clone())
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        AssignmentRow {
            first_name: participant.first_name.clone(),
            last_name: participant.last_name.clone(),
            email: participant.email.clone(),
            gender: participant.gender.label().to_owned(),
            age: participant.age,
            status: participant.status.label().to_owned(),
            language: participant.language.clone(),
            stages,
            village: bungalow.map_or_else(|| MISSING.to_owned(), |b| b.village.clone()),
            bungalow: bungalow.map_or_else(|| MISSING.to_owned(), |b| b.name.clone()),
            bed: participant.assigned_bed.clone().unwrap_or_else(|| MISSING.to_owned()),
            bungalow_capacity: bungalow.map_or_else(|| MISSING.to_owned(), |b| b.capacity.to_string()),
        }
    }

    /// Write the assignment export; returns the number of rows.
    ///
    /// # Errors
    ///
    /// Write failures from the underlying writer.
    pub fn write_assignments<W: Write>(&self, writer: W) -> Result<usize, ReportError> {
        let rows = self.assignment_rows();
        write_csv(writer, &ASSIGNMENT_HEADERS, &rows)?;
        tracing::info!(rows = rows.len(), "assignment export written");
        Ok(rows.len())
    }

    /// `Assignations_Chambres_{start}_{end}.csv`, or with today's date when
    /// no period is selected.
    #[must_use]
    pub fn assignment_file_name(&self, today: Date) -> String {
        match self.period() {
            Some(range) => {
                format!("Assignations_Chambres_{}_{}.csv", format_date(range.start), format_date(range.end))
            }
            None => format!("Assignations_Chambres_{}.csv", format_date(today)),
        }
    }

    /// Bungalows with at least one occupant, per village in name order.
    #[must_use]
    pub fn village_occupancy(&self) -> Vec<VillageOccupancy> {
        let mut villages: Vec<&str> = self.bungalows.iter().map(|b| b.village.as_str()).collect();
        villages.sort_unstable();
        villages.dedup();

        villages
            .into_iter()
            .map(|village| {
                let in_village: Vec<&Bungalow> = self.bungalows.iter().filter(|b| b.village == village).collect();
                let occupied = in_village.iter().filter(|b| b.occupancy > 0).count();
                VillageOccupancy {
                    village: village.to_owned(),
                    occupied,
                    total: in_village.len(),
                    rate: rounded_percent(occupied, in_village.len()),
                }
            })
            .collect()
    }

    #[must_use]
    pub fn stage_rosters(&self) -> Vec<StageRoster> {
        self.stages
            .iter()
            .map(|stage| StageRoster {
                stage_id: stage.id,
                stage_name: stage.name.clone(),
                members: self
                    .participants
                    .iter()
                    .filter(|p| p.stage_ids.contains(&stage.id))
                    .map(|p| RosterMember { name: p.full_name(), assigned: p.assigned_bungalow_id.is_some() })
                    .collect(),
            })
            .collect()
    }

    #[must_use]
    pub fn global_metrics(&self) -> GlobalMetrics {
        let occupied = self.bungalows.iter().filter(|b| b.occupancy > 0).count();
        GlobalMetrics {
            occupancy_rate: rounded_percent(occupied, self.bungalows.len()),
            assigned_participants: self.participants.iter().filter(|p| p.assigned_bungalow_id.is_some()).count(),
            available_bungalows: self.bungalows.len() - occupied,
            stages: self.stages.len(),
        }
    }
}

// =============================================================================
// REGISTRATION EXPORT
// =============================================================================

/// Fetch `/registrations/export/` and write it; returns the row count.
///
/// # Errors
///
/// [`ReportError::NothingToExport`] when the backend returns no lines, plus
/// backend and write failures.
pub async fn export_registrations<W: Write>(
    backend: &dyn Backend,
    stage_id: Option<Id>,
    writer: W,
) -> Result<usize, ReportError> {
    let export = backend.export_registrations(stage_id).await?;
    write_registration_export(&export, writer)
}

/// # Errors
///
/// As [`export_registrations`], without the fetch.
pub fn write_registration_export<W: Write>(export: &RegistrationExport, writer: W) -> Result<usize, ReportError> {
    if export.assignments.is_empty() {
        return Err(ReportError::NothingToExport);
    }
    let rows: Vec<[&str; 7]> = export
        .assignments
        .iter()
        .map(|a| {
            [
                a.village.as_str(),
                a.bungalow.as_str(),
                a.participant_name.as_str(),
                a.arrival_date.as_str(),
                a.arrival_time.as_str(),
                a.departure_date.as_str(),
                a.departure_time.as_str(),
            ]
        })
        .collect();
    write_csv(writer, &REGISTRATION_HEADERS, &rows)?;
    tracing::info!(rows = rows.len(), "registration export written");
    Ok(rows.len())
}

/// `assignations_{stage}_{today}.csv` with the stage name reduced to ASCII
/// alphanumerics, or `tous` for every stage.
#[must_use]
pub fn registration_file_name(stage: Option<(Id, Option<&str>)>, today: Date) -> String {
    let label = match stage {
        None => "tous".to_owned(),
        Some((_, Some(name))) => name.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }).collect(),
        Some((id, None)) => id.to_string(),
    };
    format!("assignations_{label}_{}.csv", format_date(today))
}

// =============================================================================
// CSV
// =============================================================================

fn write_csv<W: Write, R: Serialize>(mut writer: W, headers: &[&str], rows: &[R]) -> Result<(), ReportError> {
    writer.write_all(UTF8_BOM)?;
    let mut csv = csv::WriterBuilder::new().delimiter(b';').has_headers(false).from_writer(writer);
    csv.write_record(headers)?;
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn rounded_percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}
