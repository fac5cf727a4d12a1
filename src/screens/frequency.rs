//! Attendance report ("bilan de fréquentation") over a chosen period.
//!
//! The backend aggregates everything; this screen checks the period, fetches
//! the report and lays it out as one semicolon CSV with a section per table.

use std::io::Write;

use time::{Date, Month};

use crate::api::types::FrequencyReport;
use crate::api::Backend;
use crate::period::{DateRange, format_date, format_date_fr, parse_date};
use crate::screens::FormError;
use crate::screens::reports::{ReportError, UTF8_BOM};

#[cfg(test)]
#[path = "frequency_test.rs"]
mod tests;

#[derive(Debug, Clone, Default)]
pub struct FrequencyView {
    pub start: Option<Date>,
    pub end: Option<Date>,
    pub report: Option<FrequencyReport>,
    pub error: Option<String>,
}

impl FrequencyView {
    pub fn set_period(&mut self, start: Option<Date>, end: Option<Date>) {
        self.start = start;
        self.end = end;
    }

    /// The last `months` months up to `today`.
    pub fn quick_period(&mut self, months: u32, today: Date) {
        self.set_period(Some(months_before(today, months)), Some(today));
    }

    /// January 1st to December 31st of `year`.
    pub fn year_period(&mut self, year: i32) {
        let start = Date::from_calendar_date(year, Month::January, 1).ok();
        let end = Date::from_calendar_date(year, Month::December, 31).ok();
        self.set_period(start, end);
    }

    /// # Errors
    ///
    /// [`FormError::PeriodRequired`] or [`FormError::DatesInverted`] without a
    /// backend call.
    pub fn period(&self) -> Result<DateRange, FormError> {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return Err(FormError::PeriodRequired);
        };
        if start > end {
            return Err(FormError::DatesInverted);
        }
        Ok(DateRange::new(start, end))
    }

    /// Fetch the report for the selected period. On failure the previous
    /// report is dropped and `error` holds the message to show.
    ///
    /// # Errors
    ///
    /// Period rejections and backend errors.
    pub async fn generate(&mut self, backend: &dyn Backend) -> Result<&FrequencyReport, FormError> {
        let result = match self.period() {
            Ok(period) => backend.frequency_report(period).await.map_err(FormError::from),
            Err(err) => Err(err),
        };
        match result {
            Ok(report) => {
                tracing::info!(
                    events = report.events.total,
                    registrations = report.participants.total_registrations,
                    "frequency report loaded"
                );
                self.error = None;
                Ok(&*self.report.insert(report))
            }
            Err(err) => {
                tracing::warn!(error = ?err, "frequency report failed");
                self.error = Some(err.to_string());
                self.report = None;
                Err(err)
            }
        }
    }

    /// `Bilan_Frequentation_{start}_{end}.csv`.
    #[must_use]
    pub fn file_name(&self) -> Option<String> {
        self.period()
            .ok()
            .map(|p| format!("Bilan_Frequentation_{}_{}.csv", format_date(p.start), format_date(p.end)))
    }

    /// # Errors
    ///
    /// [`ReportError::NothingToExport`] before a report is generated, plus
    /// write failures.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        let report = self.report.as_ref().ok_or(ReportError::NothingToExport)?;
        write_report(report, writer)
    }
}

/// Label/value lines of the summary section, in display order. Section
/// titles carry an empty value.
#[must_use]
pub fn summary_lines(report: &FrequencyReport) -> Vec<(String, String)> {
    let p = &report.participants;
    let g = &report.demographics.gender;
    let age = &report.demographics.age;
    let o = &report.occupancy;
    let line = |label: &str, value: String| (label.to_owned(), value);
    vec![
        line(
            "Période",
            format!("{} - {}", display_date(&report.period.start_date), display_date(&report.period.end_date)),
        ),
        line("=== ÉVÉNEMENTS ===", String::new()),
        line("Total événements", report.events.total.to_string()),
        line("Stages", report.events.stages.to_string()),
        line("Résidences", report.events.residences.to_string()),
        line("Autres activités", report.events.autres.to_string()),
        line("=== PARTICIPANTS ===", String::new()),
        line("Total inscriptions", p.total_registrations.to_string()),
        line("Participants uniques", p.unique_participants.to_string()),
        line("Participants", p.by_role.participants.to_string()),
        line("Encadrants", p.by_role.instructors.to_string()),
        line("Musiciens", p.by_role.musicians.to_string()),
        line("Staff", p.by_role.staff.to_string()),
        line("Élèves", p.by_status.students.to_string()),
        line("Enseignant-e-s", p.by_status.instructors.to_string()),
        line("Professionnel-le-s", p.by_status.professionals.to_string()),
        line("Salarié-e-s", p.by_status.staff.to_string()),
        line("=== DÉMOGRAPHIE ===", String::new()),
        line("Hommes", format!("{} ({}%)", g.men, g.men_percentage)),
        line("Femmes", format!("{} ({}%)", g.women, g.women_percentage)),
        line("Âge moyen", age.average.to_string()),
        line("Âge minimum", age.min.to_string()),
        line("Âge maximum", age.max.to_string()),
        line("=== TAUX DE FRÉQUENTATION ===", String::new()),
        line("Capacité totale événements", o.total_event_capacity.to_string()),
        line("Inscriptions totales", o.total_registrations.to_string()),
        line("Taux de remplissage", format!("{}%", o.event_fill_rate)),
        line("Assignés aux chambres", o.assigned_to_bungalows.to_string()),
        line("Taux d'assignation", format!("{}%", o.assignment_rate)),
    ]
}

fn write_report<W: Write>(report: &FrequencyReport, mut writer: W) -> Result<(), ReportError> {
    writer.write_all(UTF8_BOM)?;
    let mut csv = csv::WriterBuilder::new().delimiter(b';').flexible(true).has_headers(false).from_writer(writer);

    csv.write_record(["BILAN DE FRÉQUENTATION"])?;
    for (label, value) in summary_lines(report) {
        csv.write_record([label, value])?;
    }

    csv.write_record([""])?;
    csv.write_record(["Nom", "Type", "Date début", "Date fin", "Capacité", "Participants"])?;
    for event in &report.events.list {
        csv.write_record([
            event.name.clone(),
            event.event_type.label().to_owned(),
            display_date(&event.start_date),
            display_date(&event.end_date),
            event.capacity.to_string(),
            event.current_participants.to_string(),
        ])?;
    }

    csv.write_record([""])?;
    csv.write_record(["Nationalité", "Nombre de personnes"])?;
    for n in &report.nationalities.list {
        csv.write_record([n.nationality.clone(), n.count.to_string()])?;
    }

    csv.write_record([""])?;
    csv.write_record(["Langue", "Nombre de personnes"])?;
    for l in &report.languages {
        csv.write_record([l.language.clone(), l.count.to_string()])?;
    }

    csv.write_record([""])?;
    csv.write_record(["Tranche d'âge", "Nombre"])?;
    for (bracket, count) in &report.demographics.age.distribution {
        csv.write_record([bracket.clone(), count.to_string()])?;
    }

    csv.flush()?;
    tracing::info!(events = report.events.list.len(), "frequency report written");
    Ok(())
}

fn display_date(raw: &str) -> String {
    parse_date(raw).map_or_else(|_| raw.to_owned(), format_date_fr)
}

/// Same day `months` earlier, clamped to the end of shorter months.
fn months_before(date: Date, months: u32) -> Date {
    let back = i32::try_from(months).unwrap_or(i32::MAX / 24);
    let total = date.year() * 12 + i32::from(u8::from(date.month())) - 1 - back;
    let year = total.div_euclid(12);
    let Some(month) = u8::try_from(total.rem_euclid(12) + 1).ok().and_then(|m| Month::try_from(m).ok()) else {
        return date;
    };
    (1..=date.day()).rev().find_map(|day| Date::from_calendar_date(year, month, day).ok()).unwrap_or(date)
}
