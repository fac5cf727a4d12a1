use super::*;
use crate::api::types::{Gender, ParticipantStatus, RegistrationExportLine};
use crate::test_helpers::{MockBackend, assigned, bungalow, occupy, participant, stage};
use time::macros::date;

fn view() -> ReportsView {
    let mut jane = assigned(participant(1, "Jane", "Doe", &[7]), 3, "bed2");
    jane.email = "jane@example.org".into();
    jane.gender = Gender::Female;
    jane.age = 34;
    jane.status = ParticipantStatus::Professional;
    jane.language = "Anglais".into();

    ReportsView {
        participants: vec![
            jane,
            participant(2, "Ana", "Silva", &[7]),
            assigned(participant(3, "Kofi", "Mensah", &[8, 99]), 5, "bed1"),
            assigned(participant(4, "Lena", "Roux", &[]), 5, "bed2"),
        ],
        stages: vec![
            stage(7, "July Intensive", date!(2024 - 07 - 01), date!(2024 - 07 - 10)),
            stage(8, "August Residency", date!(2024 - 08 - 01), date!(2024 - 08 - 10)),
        ],
        bungalows: vec![
            occupy(bungalow(3, "B3", "B", 2), "bed2", 1),
            occupy(bungalow(5, "C1", "C", 2), "bed1", 3),
            bungalow(6, "C2", "C", 1),
        ],
        ..ReportsView::default()
    }
}

fn render(view: &ReportsView) -> String {
    let mut out = Vec::new();
    view.write_assignments(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn jane_doe_row_resolves_names() {
    let mut view = view();
    view.set_period(Some(date!(2024 - 07 - 05)), Some(date!(2024 - 07 - 20)));

    let rows = view.assignment_rows();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.first_name, "Jane");
    assert_eq!(row.last_name, "Doe");
    assert_eq!(row.village, "B");
    assert_eq!(row.bungalow, "B3");
    assert_eq!(row.bed, "bed2");
    assert_eq!(row.stages, "July Intensive");
    assert_eq!(row.gender, "Femme");
    assert_eq!(row.status, "Professionnel-le");
    assert_eq!(row.bungalow_capacity, "2");
}

#[test]
fn without_period_every_assigned_participant_is_exported() {
    let rows = view().assignment_rows();
    let names: Vec<&str> = rows.iter().map(|r| r.first_name.as_str()).collect();
    assert_eq!(names, vec!["Jane", "Kofi", "Lena"]);
}

#[test]
fn unknown_stage_and_missing_stage_fallbacks() {
    let rows = view().assignment_rows();
    assert_eq!(rows[1].stages, "August Residency, Stage 99");
    assert_eq!(rows[2].stages, NO_STAGE);
}

#[test]
fn missing_bungalow_renders_dash() {
    let mut view = view();
    view.participants = vec![assigned(participant(9, "Sam", "Ng", &[]), 404, "bed1")];
    let row = &view.assignment_rows()[0];
    assert_eq!(row.village, MISSING);
    assert_eq!(row.bungalow, MISSING);
    assert_eq!(row.bungalow_capacity, MISSING);
    assert_eq!(row.bed, "bed1");
}

#[test]
fn csv_has_bom_semicolons_and_header() {
    let mut view = view();
    view.set_period(Some(date!(2024 - 07 - 05)), Some(date!(2024 - 07 - 20)));
    let text = render(&view);

    assert!(text.starts_with('\u{feff}'));
    let mut lines = text.trim_start_matches('\u{feff}').lines();
    assert_eq!(
        lines.next().unwrap(),
        "Prénom;Nom;Email;Sexe;Âge;Statut;Langue;Stage(s);Village;Bungalow;Lit;Capacité Bungalow"
    );
    assert_eq!(
        lines.next().unwrap(),
        "Jane;Doe;jane@example.org;Femme;34;Professionnel-le;Anglais;July Intensive;B;B3;bed2;2"
    );
    assert!(lines.next().is_none());
}

#[test]
fn csv_quotes_fields_containing_separator() {
    let mut view = view();
    view.participants[0].last_name = "Doe; Smith".into();
    let text = render(&view);
    assert!(text.contains("Jane;\"Doe; Smith\";"));
}

#[test]
fn empty_export_still_has_header() {
    let mut view = view();
    view.set_period(Some(date!(2025 - 01 - 01)), Some(date!(2025 - 01 - 31)));
    let text = render(&view);
    assert_eq!(text.trim_start_matches('\u{feff}').lines().count(), 1);
}

#[test]
fn file_name_uses_period_or_today() {
    let mut view = view();
    assert_eq!(view.assignment_file_name(date!(2024 - 07 - 15)), "Assignations_Chambres_2024-07-15.csv");
    view.set_period(Some(date!(2024 - 07 - 05)), Some(date!(2024 - 07 - 20)));
    assert_eq!(
        view.assignment_file_name(date!(2024 - 07 - 15)),
        "Assignations_Chambres_2024-07-05_2024-07-20.csv"
    );
}

#[test]
fn village_occupancy_rounds_per_village() {
    let occupancy = view().village_occupancy();
    assert_eq!(occupancy.len(), 2);
    assert_eq!(occupancy[0], VillageOccupancy { village: "B".into(), occupied: 1, total: 1, rate: 100 });
    assert_eq!(occupancy[1], VillageOccupancy { village: "C".into(), occupied: 1, total: 2, rate: 50 });
}

#[test]
fn stage_roster_counts_assigned_members() {
    let rosters = view().stage_rosters();
    assert_eq!(rosters[0].stage_name, "July Intensive");
    assert_eq!(rosters[0].members.len(), 2);
    assert_eq!(rosters[0].assigned(), 1);
    assert_eq!(rosters[1].members, vec![RosterMember { name: "Kofi Mensah".into(), assigned: true }]);
}

#[test]
fn global_metrics_summarise_view() {
    let metrics = view().global_metrics();
    assert_eq!(metrics.occupancy_rate, 67);
    assert_eq!(metrics.assigned_participants, 3);
    assert_eq!(metrics.available_bungalows, 1);
    assert_eq!(metrics.stages, 2);
}

// =============================================================================
// registration export
// =============================================================================

fn export_line(name: &str) -> RegistrationExportLine {
    RegistrationExportLine {
        village: "A".into(),
        bungalow: "A4".into(),
        participant_name: name.into(),
        arrival_date: "2024-07-01".into(),
        arrival_time: "14:00".into(),
        departure_date: "2024-07-10".into(),
        departure_time: String::new(),
        stage_name: "July Intensive".into(),
    }
}

#[tokio::test]
async fn registration_export_writes_backend_lines() {
    let backend = MockBackend::default();
    *backend.export.lock().unwrap() =
        RegistrationExport { assignments: vec![export_line("Doe Jane"), export_line("Silva Ana")], count: 2 };

    let mut out = Vec::new();
    let written = export_registrations(&backend, Some(7), &mut out).await.unwrap();
    assert_eq!(written, 2);

    let text = String::from_utf8(out).unwrap();
    let mut lines = text.trim_start_matches('\u{feff}').lines();
    assert_eq!(
        lines.next().unwrap(),
        "Village;Chambre;Nom et Prénom;Date d'arrivée;Heure d'arrivée;Date de départ;Heure de départ"
    );
    assert_eq!(lines.next().unwrap(), "A;A4;Doe Jane;2024-07-01;14:00;2024-07-10;");
}

#[tokio::test]
async fn empty_registration_export_is_refused() {
    let backend = MockBackend::default();
    let mut out = Vec::new();
    let err = export_registrations(&backend, None, &mut out).await.unwrap_err();
    assert!(matches!(err, ReportError::NothingToExport));
    assert!(out.is_empty());
    assert_eq!(err.to_string(), "Aucune assignation à exporter");
}

#[test]
fn registration_file_name_sanitizes_stage() {
    let today = date!(2024 - 07 - 15);
    assert_eq!(registration_file_name(None, today), "assignations_tous_2024-07-15.csv");
    assert_eq!(
        registration_file_name(Some((7, Some("Danse & Voix"))), today),
        "assignations_Danse___Voix_2024-07-15.csv"
    );
    assert_eq!(registration_file_name(Some((7, None)), today), "assignations_7_2024-07-15.csv");
}
