use super::*;
use time::macros::date;

fn parse(args: &[&str]) -> Command {
    Cli::try_parse_from(std::iter::once("sables").chain(args.iter().copied())).unwrap().command
}

#[test]
fn reports_take_an_optional_period() {
    let Command::Reports(period) = parse(&["reports", "--start", "2024-07-01", "--end", "2024-07-31"]) else {
        panic!("expected reports");
    };
    assert_eq!((period.start, period.end), (Some(date!(2024 - 07 - 01)), Some(date!(2024 - 07 - 31))));
    assert!(matches!(parse(&["reports"]), Command::Reports(PeriodArgs { start: None, end: None })));
}

#[test]
fn participant_update_carries_only_given_fields() {
    let Command::Participants(cmd) = parse(&["participants", "update", "4", "--age", "31", "--gender", "m"]) else {
        panic!("expected participants");
    };
    let ParticipantsSubcommand::Update { id, first_name, details, .. } = cmd.command else {
        panic!("expected update");
    };
    assert_eq!((id, first_name), (4, None));
    assert_eq!((details.age, details.gender, details.status), (Some(31), Some(Gender::Male), None));

    let mut form = ParticipantForm { age: 20, language: "Wolof".into(), ..ParticipantForm::default() };
    details.apply(&mut form);
    assert_eq!((form.age, form.gender, form.language.as_str()), (31, Gender::Male, "Wolof"));
}

#[test]
fn participant_create_requires_names_and_email() {
    assert!(Cli::try_parse_from(["sables", "participants", "create", "Awa", "Diop"]).is_err());
    let Command::Participants(cmd) =
        parse(&["participants", "create", "Awa", "Diop", "awa@example.org", "--language", "Wolof", "--status", "staff"])
    else {
        panic!("expected participants");
    };
    assert!(matches!(
        cmd.command,
        ParticipantsSubcommand::Create { details: ParticipantArgs { status: Some(ParticipantStatus::Staff), .. }, .. }
    ));
}

#[test]
fn stage_update_parses_partial_changes() {
    let Command::Stages(cmd) = parse(&["stages", "update", "7", "--capacity", "25", "--event-type", "resident"]) else {
        panic!("expected stages");
    };
    let StagesSubcommand::Update { id, capacity, event_type, name, .. } = cmd.command else {
        panic!("expected update");
    };
    assert_eq!((id, capacity, event_type, name), (7, Some(25), Some(EventType::Resident), None));
}

#[test]
fn frequency_quick_ranges_exclude_explicit_dates() {
    assert!(Cli::try_parse_from(["sables", "frequency", "--months", "3", "--start", "2024-01-01"]).is_err());
    assert!(matches!(parse(&["frequency", "--year", "2024"]), Command::Frequency { year: Some(2024), months: None, .. }));
}

#[test]
fn history_actions_accept_the_assignment_group() {
    assert_eq!(action_arg("Assignment"), Ok(ActionFilter::Assignment));
    assert_eq!(action_arg("delete"), Ok(ActionFilter::Only(ActionType::Delete)));
    assert!(action_arg("export").is_err());
}
