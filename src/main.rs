use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use time::{Date, OffsetDateTime};
use tracing_subscriber::EnvFilter;

use sables::api::types::{ActionType, EventType, Gender, Id, ParticipantStatus, StageRole};
use sables::api::{ApiClient, ApiError, Backend};
use sables::config::ClientConfig;
use sables::notice::NoticeBoard;
use sables::period::{format_date_fr, parse_date};
use sables::screens::FormError;
use sables::screens::assignments::{AssignError, AssignmentBoard, ManualAssignForm};
use sables::screens::dashboard::DashboardView;
use sables::screens::frequency::{FrequencyView, summary_lines};
use sables::screens::history::{ActionFilter, HistoryFilter, HistoryView, format_timestamp};
use sables::screens::import::{ImportError, ImportView, TEMPLATE_FILE_NAME, write_template};
use sables::screens::languages::{LanguageForm, LanguagesView};
use sables::screens::participants::{ParticipantForm, ParticipantsView, StatusFilter};
use sables::screens::reports::{ReportError, ReportsView, export_registrations, registration_file_name};
use sables::screens::stage_detail::{RegistrationForm, StageDetailView};
use sables::screens::stages::{Lifecycle, StageFilter, StageForm, StagesView, progress};
use sables::screens::villages::VillagesView;

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
    #[error(transparent)]
    Assign(#[from] AssignError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid log filter: {0}")]
    LogFilter(String),
}

#[derive(Parser, Debug)]
#[command(name = "sables", about = "Residence management client for the training center")]
struct Cli {
    /// Backend base URL; overrides the configured one.
    #[arg(long, env = "SABLES_API_URL")]
    api_url: Option<String>,

    #[arg(long, env = "SABLES_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the dashboard, optionally refreshing on the configured interval.
    Dashboard {
        #[arg(long, default_value_t = false)]
        watch: bool,
    },
    Participants(ParticipantsCommand),
    Stages(StagesCommand),
    /// Bed occupancy per village.
    Villages(PeriodArgs),
    /// Assign a participant to a bungalow for their first stage.
    Assign {
        participant_id: Id,
        bungalow_id: Id,
        #[arg(long)]
        bed: Option<String>,
    },
    Unassign {
        participant_id: Id,
    },
    Registrations(RegistrationsCommand),
    Export(ExportCommand),
    /// Occupancy, rosters and headline figures for a period.
    Reports(PeriodArgs),
    Languages(LanguagesCommand),
    /// Recent changes, newest first.
    History {
        #[arg(long)]
        user: Option<Id>,
        /// create, update, delete, assign, unassign or assignment
        #[arg(long, value_parser = action_arg)]
        action: Option<ActionFilter>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long, default_value = "")]
        search: String,
    },
    /// Attendance report over a period, written as CSV.
    Frequency {
        #[command(flatten)]
        period: PeriodArgs,
        /// The last N months up to today.
        #[arg(long, conflicts_with_all = ["start", "end", "year"])]
        months: Option<u32>,
        #[arg(long, conflicts_with_all = ["start", "end"])]
        year: Option<i32>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Import(ImportCommand),
    /// LAN address the frontend can be reached on.
    Network {
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone, Copy)]
struct PeriodArgs {
    #[arg(long, value_parser = date_arg)]
    start: Option<Date>,
    #[arg(long, value_parser = date_arg)]
    end: Option<Date>,
}

#[derive(Args, Debug)]
struct ParticipantsCommand {
    #[command(subcommand)]
    command: ParticipantsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ParticipantsSubcommand {
    List {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, value_parser = status_arg)]
        status: Option<ParticipantStatus>,
    },
    Create {
        first_name: String,
        last_name: String,
        email: String,
        #[command(flatten)]
        details: ParticipantArgs,
    },
    /// Change only the given fields.
    Update {
        id: Id,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[command(flatten)]
        details: ParticipantArgs,
    },
    Delete {
        id: Id,
    },
}

#[derive(Args, Debug, Default)]
struct ParticipantArgs {
    #[arg(long, value_parser = gender_arg)]
    gender: Option<Gender>,
    #[arg(long)]
    age: Option<u32>,
    #[arg(long)]
    nationality: Option<String>,
    #[arg(long)]
    language: Option<String>,
    #[arg(long, value_parser = status_arg)]
    status: Option<ParticipantStatus>,
}

impl ParticipantArgs {
    fn apply(self, form: &mut ParticipantForm) {
        if let Some(gender) = self.gender {
            form.gender = gender;
        }
        if let Some(age) = self.age {
            form.age = age;
        }
        if let Some(nationality) = self.nationality {
            form.nationality = nationality;
        }
        if let Some(language) = self.language {
            form.language = language;
        }
        if let Some(status) = self.status {
            form.status = status;
        }
    }
}

#[derive(Args, Debug)]
struct StagesCommand {
    #[command(subcommand)]
    command: StagesSubcommand,
}

#[derive(Subcommand, Debug)]
enum StagesSubcommand {
    List {
        /// upcoming-active, upcoming, active, completed or all
        #[arg(long, default_value = "upcoming-active", value_parser = filter_arg)]
        filter: StageFilter,
    },
    Create {
        name: String,
        #[arg(long, value_parser = date_arg)]
        start: Date,
        #[arg(long, value_parser = date_arg)]
        end: Date,
        #[arg(long)]
        capacity: u32,
        #[arg(long, default_value = "")]
        instructor: String,
        /// stage, resident or autres
        #[arg(long, value_parser = event_type_arg, default_value = "stage")]
        event_type: EventType,
    },
    /// Change only the given fields.
    Update {
        id: Id,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_parser = date_arg)]
        start: Option<Date>,
        #[arg(long, value_parser = date_arg)]
        end: Option<Date>,
        #[arg(long)]
        capacity: Option<u32>,
        #[arg(long)]
        instructor: Option<String>,
        #[arg(long, value_parser = event_type_arg)]
        event_type: Option<EventType>,
    },
    Delete {
        id: Id,
    },
    /// Roster of one stage.
    Show {
        id: Id,
    },
    /// Register a participant on a stage.
    Register {
        stage_id: Id,
        participant_id: Id,
        #[arg(long, value_parser = date_arg)]
        arrival: Option<Date>,
        #[arg(long, value_parser = date_arg)]
        departure: Option<Date>,
        #[arg(long, value_parser = role_arg, default_value = "participant")]
        role: StageRole,
    },
}

#[derive(Args, Debug)]
struct RegistrationsCommand {
    #[command(subcommand)]
    command: RegistrationsSubcommand,
}

#[derive(Subcommand, Debug)]
enum RegistrationsSubcommand {
    /// Registrations without a bed during the period.
    Unassigned(PeriodArgs),
    Assign {
        registration_id: Id,
        bungalow_id: Id,
        #[arg(long)]
        bed: Option<String>,
        /// Override soft rules the backend asks to confirm.
        #[arg(long, default_value_t = false)]
        force: bool,
        #[command(flatten)]
        period: PeriodArgs,
    },
    Unassign {
        registration_id: Id,
    },
    AutoAssign {
        stage_id: Id,
    },
}

#[derive(Args, Debug)]
struct ExportCommand {
    #[command(subcommand)]
    command: ExportSubcommand,
}

#[derive(Subcommand, Debug)]
enum ExportSubcommand {
    /// Room assignments as CSV.
    Assignments {
        #[command(flatten)]
        period: PeriodArgs,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Backend registration export as CSV.
    Registrations {
        #[arg(long)]
        stage: Option<Id>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct LanguagesCommand {
    #[command(subcommand)]
    command: LanguagesSubcommand,
}

#[derive(Subcommand, Debug)]
enum LanguagesSubcommand {
    List {
        #[arg(long, default_value = "")]
        search: String,
    },
    Create {
        code: String,
        name: String,
        #[arg(long, default_value = "")]
        native_name: String,
        #[arg(long, default_value_t = 0)]
        order: u32,
    },
    /// Activate or deactivate a language.
    Toggle {
        id: Id,
    },
    Delete {
        id: Id,
    },
    Stats,
}

#[derive(Args, Debug)]
struct ImportCommand {
    #[command(subcommand)]
    command: ImportSubcommand,
}

#[derive(Subcommand, Debug)]
enum ImportSubcommand {
    /// Write an empty template with one example row.
    Template {
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Check a .csv, .xlsx or .xls file and print what an import would do.
    Validate { file: PathBuf },
    /// Validate then import a file.
    Execute {
        file: PathBuf,
        /// Only register participants that already exist.
        #[arg(long, default_value_t = false)]
        skip_new: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| CliError::LogFilter(e.to_string()))?;
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env().with_overrides(cli.api_url.as_deref(), cli.token);
    let client = ApiClient::new(&config)?;
    tracing::debug!(base_url = client.base_url(), "client ready");

    match cli.command {
        Command::Dashboard { watch } => run_dashboard(&client, &config, watch).await,
        Command::Participants(cmd) => run_participants(&client, &config, cmd.command).await,
        Command::Stages(cmd) => run_stages(&client, &config, cmd.command).await,
        Command::Villages(period) => run_villages(&client, period).await,
        Command::Assign { participant_id, bungalow_id, bed } => {
            let mut board = AssignmentBoard::load(&client).await?.with_notices(notices(&config));
            let result = match bed {
                Some(bed) => {
                    let form = ManualAssignForm { target_id: Some(participant_id), bungalow_id: Some(bungalow_id), bed };
                    board.submit_manual(&client, &form).await
                }
                None => board.drop_participant(&client, participant_id, bungalow_id).await,
            };
            show_notice(&board.notices);
            Ok(result?)
        }
        Command::Unassign { participant_id } => {
            let mut board = AssignmentBoard::load(&client).await?.with_notices(notices(&config));
            let result = board.unassign(&client, participant_id).await;
            show_notice(&board.notices);
            Ok(result?)
        }
        Command::Registrations(cmd) => run_registrations(&client, &config, cmd.command).await,
        Command::Export(cmd) => run_export(&client, cmd.command).await,
        Command::Reports(period) => run_reports(&client, period).await,
        Command::Languages(cmd) => run_languages(&client, &config, cmd.command).await,
        Command::History { user, action, model, search } => {
            let filter = HistoryFilter { user_id: user, action: action.unwrap_or_default(), model_name: model, search };
            run_history(&client, filter).await
        }
        Command::Frequency { period, months, year, output } => {
            let mut view = FrequencyView::default();
            match (months, year) {
                (Some(months), _) => view.quick_period(months, now().date()),
                (None, Some(year)) => view.year_period(year),
                (None, None) => view.set_period(period.start, period.end),
            }
            run_frequency(&client, view, output).await
        }
        Command::Import(cmd) => run_import(&client, cmd.command).await,
        Command::Network { port } => {
            let info = client.network_info().await?;
            println!("{}", info.lan_url(port));
            Ok(())
        }
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn run_dashboard(client: &ApiClient, config: &ClientConfig, watch: bool) -> Result<(), CliError> {
    let mut view = DashboardView::new(config.dashboard_refresh_interval()).with_notices(notices(config));
    if !watch {
        view.refresh(client).await?;
        println!("{}", view.render(now()));
        return Ok(());
    }

    let mut ticker = tokio::time::interval(config.dashboard_refresh_interval());
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // A failed refresh keeps the previous snapshot on screen.
                if view.refresh(client).await.is_err() {
                    show_notice(&view.notices);
                }
                println!("{}\n", view.render(now()));
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

async fn run_participants(
    client: &ApiClient,
    config: &ClientConfig,
    cmd: ParticipantsSubcommand,
) -> Result<(), CliError> {
    let mut view = ParticipantsView::load(client).await?.with_notices(notices(config));
    match cmd {
        ParticipantsSubcommand::List { search, status } => {
            view.search = search;
            view.status_filter = status.map_or(StatusFilter::All, StatusFilter::Only);
            for p in view.filtered() {
                let room = match (p.assigned_bungalow_id, p.assigned_bed.as_deref()) {
                    (Some(bungalow), Some(bed)) => format!("bungalow {bungalow}, {bed}"),
                    _ => "sans chambre".to_owned(),
                };
                println!("{:>5}  {:<30} {:<12} {}", p.id, p.full_name(), p.status.label(), room);
            }
            Ok(())
        }
        ParticipantsSubcommand::Create { first_name, last_name, email, details } => {
            let mut form = ParticipantForm {
                first_name,
                last_name,
                email,
                gender: Gender::Female,
                age: 25,
                ..ParticipantForm::default()
            };
            details.apply(&mut form);
            let result = view.create(client, &form).await;
            show_notice(&view.notices);
            result.map(|_| ()).map_err(CliError::from)
        }
        ParticipantsSubcommand::Update { id, first_name, last_name, email, details } => {
            let current = view.get(id).ok_or(ApiError::NotFound { detail: None })?;
            let mut form = ParticipantForm::from_participant(current);
            form.first_name = first_name.unwrap_or(form.first_name);
            form.last_name = last_name.unwrap_or(form.last_name);
            form.email = email.unwrap_or(form.email);
            details.apply(&mut form);
            let result = view.update(client, id, &form).await;
            show_notice(&view.notices);
            result.map(|_| ()).map_err(CliError::from)
        }
        ParticipantsSubcommand::Delete { id } => {
            let result = view.delete(client, id).await;
            show_notice(&view.notices);
            Ok(result?)
        }
    }
}

async fn run_stages(client: &ApiClient, config: &ClientConfig, cmd: StagesSubcommand) -> Result<(), CliError> {
    match cmd {
        StagesSubcommand::List { filter } => {
            let mut view = StagesView::load(client).await?;
            view.filter = filter;
            let today = now().date();
            for stage in view.visible(today) {
                let status = Lifecycle::of(stage, today).map_or("Inconnu", Lifecycle::label);
                println!(
                    "{:>5}  {:<30} {:<9} {}/{} ({} %)",
                    stage.id,
                    stage.name,
                    status,
                    stage.current_participants,
                    stage.capacity,
                    progress(stage, today)
                );
            }
            Ok(())
        }
        StagesSubcommand::Create { name, start, end, capacity, instructor, event_type } => {
            let mut view = StagesView::load(client).await?.with_notices(notices(config));
            let form = StageForm { name, start_date: Some(start), end_date: Some(end), event_type, instructor, capacity };
            let result = view.create(client, &form).await;
            show_notice(&view.notices);
            result.map(|_| ()).map_err(CliError::from)
        }
        StagesSubcommand::Update { id, name, start, end, capacity, instructor, event_type } => {
            let mut view = StagesView::load(client).await?.with_notices(notices(config));
            let current = view.get(id).ok_or(ApiError::NotFound { detail: None })?;
            let mut form = StageForm::from_stage(current);
            form.name = name.unwrap_or(form.name);
            form.start_date = start.or(form.start_date);
            form.end_date = end.or(form.end_date);
            form.capacity = capacity.unwrap_or(form.capacity);
            form.instructor = instructor.unwrap_or(form.instructor);
            form.event_type = event_type.unwrap_or(form.event_type);
            let result = view.update(client, id, &form).await;
            show_notice(&view.notices);
            result.map(|_| ()).map_err(CliError::from)
        }
        StagesSubcommand::Delete { id } => {
            let mut view = StagesView::load(client).await?.with_notices(notices(config));
            let result = view.delete(client, id).await;
            show_notice(&view.notices);
            Ok(result?)
        }
        StagesSubcommand::Show { id } => {
            let view = StageDetailView::load(client, id).await?;
            let stats = &view.stats;
            println!("{} : {}/{} inscrits", view.stage.name, stats.total_participants, stats.capacity);
            println!("Avec chambre : {}, sans chambre : {}", stats.assigned_to_bungalow, stats.not_assigned);
            let roles = view.counts_by_role();
            println!(
                "Participant-e-s {} · Musicien-ne-s {} · Encadrant-e-s {} · Staff {}",
                roles.participant, roles.musician, roles.instructor, roles.staff
            );
            for r in &view.registrations {
                let stay = r.stay().map_or_else(String::new, |range| {
                    format!("{} → {}", format_date_fr(range.start), format_date_fr(range.end))
                });
                println!("{:>5}  {:<30} {:<14} {}", r.id, r.participant_name, r.role.label(), stay);
            }
            Ok(())
        }
        StagesSubcommand::Register { stage_id, participant_id, arrival, departure, role } => {
            let mut view = StageDetailView::load(client, stage_id).await?.with_notices(notices(config));
            let defaults = RegistrationForm::for_stage(&view.stage);
            let form = RegistrationForm {
                arrival_date: arrival.or(defaults.arrival_date),
                departure_date: departure.or(defaults.departure_date),
                role,
                ..defaults
            };
            let result = view.add(client, participant_id, &form).await;
            show_notice(&view.notices);
            result.map(|_| ()).map_err(CliError::from)
        }
    }
}

async fn run_villages(client: &ApiClient, period: PeriodArgs) -> Result<(), CliError> {
    let mut view = VillagesView::load(client).await?;
    view.set_period(period.start, period.end);
    for group in view.groups() {
        println!("Village {} : {}/{} lits occupés", group.name, group.occupied_beds(), group.total_beds());
        for line in &group.bungalows {
            let names: Vec<&str> = line.occupants.iter().map(|o| o.name.as_str()).collect();
            println!(
                "  {:<6} {}/{}  {}",
                line.bungalow.name,
                line.occupants.len(),
                line.bungalow.beds.len(),
                names.join(", ")
            );
        }
    }
    Ok(())
}

async fn run_registrations(
    client: &ApiClient,
    config: &ClientConfig,
    cmd: RegistrationsSubcommand,
) -> Result<(), CliError> {
    let mut board = AssignmentBoard::load(client).await?.with_notices(notices(config));
    match cmd {
        RegistrationsSubcommand::Unassigned(period) => {
            override_period(&mut board, period);
            board.load_registrations(client).await?;
            for r in board.filtered_registrations() {
                println!("{:>5}  {:<30} {}", r.id, r.participant_name, r.stage_name);
            }
            Ok(())
        }
        RegistrationsSubcommand::Assign { registration_id, bungalow_id, bed, force, period } => {
            override_period(&mut board, period);
            board.load_registrations(client).await?;
            let result = match bed {
                Some(bed) => {
                    let form =
                        ManualAssignForm { target_id: Some(registration_id), bungalow_id: Some(bungalow_id), bed };
                    board.submit_manual_registration(client, &form, force).await
                }
                None => board.drop_registration(client, registration_id, bungalow_id, force).await,
            };
            show_notice(&board.notices);
            if result.as_ref().is_err_and(AssignError::requires_confirmation) {
                eprintln!("Relancez avec --force pour confirmer.");
            }
            Ok(result?)
        }
        RegistrationsSubcommand::Unassign { registration_id } => {
            let label = format!("Inscription {registration_id}");
            let result = board.unassign_registration(client, registration_id, &label).await;
            show_notice(&board.notices);
            Ok(result?)
        }
        RegistrationsSubcommand::AutoAssign { stage_id } => {
            let result = board.auto_assign(client, stage_id).await;
            show_notice(&board.notices);
            result.map(|_| ()).map_err(CliError::from)
        }
    }
}

async fn run_export(client: &ApiClient, cmd: ExportSubcommand) -> Result<(), CliError> {
    let today = now().date();
    match cmd {
        ExportSubcommand::Assignments { period, output } => {
            let mut view = ReportsView::load(client).await?;
            view.set_period(period.start, period.end);
            let path = output.unwrap_or_else(|| PathBuf::from(view.assignment_file_name(today)));
            let rows = view.write_assignments(BufWriter::new(File::create(&path)?))?;
            eprintln!("{rows} ligne(s) écrite(s) dans {}", path.display());
            Ok(())
        }
        ExportSubcommand::Registrations { stage, output } => {
            let stage_name = match stage {
                Some(id) => client.get_stage(id).await.ok().map(|s| s.name),
                None => None,
            };
            let path = output.unwrap_or_else(|| {
                PathBuf::from(registration_file_name(stage.map(|id| (id, stage_name.as_deref())), today))
            });
            let mut buffer = Vec::new();
            let rows = export_registrations(client, stage, &mut buffer).await?;
            std::fs::write(&path, buffer)?;
            eprintln!("{rows} ligne(s) écrite(s) dans {}", path.display());
            Ok(())
        }
    }
}

async fn run_reports(client: &ApiClient, period: PeriodArgs) -> Result<(), CliError> {
    let mut view = ReportsView::load(client).await?;
    view.set_period(period.start, period.end);

    let metrics = view.global_metrics();
    println!(
        "Occupation {} % · {} participant(s) logé(s) · {} bungalow(s) libre(s) · {} stage(s)",
        metrics.occupancy_rate, metrics.assigned_participants, metrics.available_bungalows, metrics.stages
    );

    println!("\nOccupation par village");
    for v in view.village_occupancy() {
        println!("  {:<10} {}/{} bungalows ({} %)", v.village, v.occupied, v.total, v.rate);
    }

    println!("\nParticipants par stage");
    for roster in view.stage_rosters() {
        println!("  {} : {}/{} logé(s)", roster.stage_name, roster.assigned(), roster.members.len());
        for member in &roster.members {
            let mark = if member.assigned { "✓" } else { "·" };
            println!("    {mark} {}", member.name);
        }
    }
    Ok(())
}

async fn run_languages(client: &ApiClient, config: &ClientConfig, cmd: LanguagesSubcommand) -> Result<(), CliError> {
    let mut view = LanguagesView::load(client).await?.with_notices(notices(config));
    match cmd {
        LanguagesSubcommand::List { search } => {
            view.search = search;
            for l in view.filtered() {
                let state = if l.is_active { "active" } else { "inactive" };
                let spoken_by = l.participant_count.unwrap_or_default();
                println!("{:>5}  {:<4} {:<20} {:<8} {spoken_by} participant(s)", l.id, l.code, l.name, state);
            }
            Ok(())
        }
        LanguagesSubcommand::Create { code, name, native_name, order } => {
            let form = LanguageForm { code, name, native_name, display_order: order, ..LanguageForm::default() };
            let result = view.create(client, &form).await;
            show_notice(&view.notices);
            result.map(|_| ()).map_err(CliError::from)
        }
        LanguagesSubcommand::Toggle { id } => {
            let result = view.toggle_active(client, id).await;
            show_notice(&view.notices);
            Ok(result?)
        }
        LanguagesSubcommand::Delete { id } => {
            let result = view.delete(client, id).await;
            show_notice(&view.notices);
            Ok(result?)
        }
        LanguagesSubcommand::Stats => {
            let Some(stats) = &view.stats else {
                return Ok(());
            };
            println!("{} langue(s) : {} active(s), {} inactive(s)", stats.total, stats.active, stats.inactive);
            for top in &stats.top_languages {
                println!("  {:<20} {}", top.name, top.count);
            }
            Ok(())
        }
    }
}

async fn run_history(client: &ApiClient, filter: HistoryFilter) -> Result<(), CliError> {
    let mut view = HistoryView::load(client).await?;
    if filter != HistoryFilter::default() {
        view.filter = filter;
        view.apply_filter(client).await?;
    }
    if let Some(stats) = &view.stats {
        println!("{} action(s), {} ces dernières 24 h", stats.total, stats.recent_24h);
    }
    for a in &view.activities {
        println!(
            "{:<26} {:<20} {:<15} {}",
            format_timestamp(&a.timestamp),
            a.user_name,
            a.action_type.label(),
            a.description
        );
    }
    Ok(())
}

async fn run_frequency(client: &ApiClient, mut view: FrequencyView, output: Option<PathBuf>) -> Result<(), CliError> {
    let report = view.generate(client).await?;
    for (label, value) in summary_lines(report) {
        if value.is_empty() {
            println!("{label}");
        } else {
            println!("  {label:<28} {value}");
        }
    }
    let Some(path) = output.or_else(|| view.file_name().map(PathBuf::from)) else {
        return Ok(());
    };
    view.write_csv(BufWriter::new(File::create(&path)?))?;
    eprintln!("Bilan écrit dans {}", path.display());
    Ok(())
}

async fn run_import(client: &ApiClient, cmd: ImportSubcommand) -> Result<(), CliError> {
    let (file, execute, skip_new) = match cmd {
        ImportSubcommand::Template { output } => {
            let path = output.unwrap_or_else(|| PathBuf::from(TEMPLATE_FILE_NAME));
            write_template(BufWriter::new(File::create(&path)?))?;
            eprintln!("Modèle écrit dans {}", path.display());
            return Ok(());
        }
        ImportSubcommand::Validate { file } => (file, false, false),
        ImportSubcommand::Execute { file, skip_new } => (file, true, skip_new),
    };

    let file_name = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let content = std::fs::read(&file)?;
    let mut view = ImportView::default();
    let validation = view.validate(client, &file_name, content).await?;
    let s = &validation.summary;
    println!(
        "{} ligne(s) : {} à inscrire, {} à créer, {} déjà inscrit(s), {} erreur(s)",
        s.total_rows, s.valid_imports, s.new_participants, s.already_registered, s.errors
    );
    for row in &validation.new_participants {
        println!("  + {} <{}> → {}", row.display_name(), row.email, row.stage_name);
    }
    for rejection in &validation.errors {
        let line = rejection.row.map_or_else(String::new, |r| format!("ligne {r} "));
        println!("  ! {line}{} : {}", rejection.email.as_deref().unwrap_or("-"), rejection.reasons().join(", "));
    }
    if !execute {
        return Ok(());
    }

    if skip_new {
        view.deselect_all();
    }
    view.execute(client).await?;
    for line in view.outcome_lines() {
        println!("{line}");
    }
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

fn notices(config: &ClientConfig) -> NoticeBoard {
    NoticeBoard::new(config.notice_ttl())
}

fn override_period(board: &mut AssignmentBoard, period: PeriodArgs) {
    if period.start.is_some() || period.end.is_some() {
        board.set_period(period.start, period.end);
    }
}

fn show_notice(notices: &NoticeBoard) {
    if let Some(notice) = notices.visible() {
        eprintln!("[{}] {}", notice.kind.label(), notice.message);
    }
}

fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn date_arg(raw: &str) -> Result<Date, String> {
    parse_date(raw).map_err(|e| e.to_string())
}

fn gender_arg(raw: &str) -> Result<Gender, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_uppercase()))
        .map_err(|_| format!("unknown gender `{raw}` (M, F)"))
}

fn event_type_arg(raw: &str) -> Result<EventType, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_lowercase()))
        .map_err(|_| format!("unknown event type `{raw}` (stage, resident, autres)"))
}

fn action_arg(raw: &str) -> Result<ActionFilter, String> {
    if raw.eq_ignore_ascii_case("assignment") {
        return Ok(ActionFilter::Assignment);
    }
    match serde_json::from_value(serde_json::Value::String(raw.to_lowercase())) {
        Ok(ActionType::Other) | Err(_) => {
            Err(format!("unknown action `{raw}` (create, update, delete, assign, unassign, assignment)"))
        }
        Ok(action) => Ok(ActionFilter::Only(action)),
    }
}

fn status_arg(raw: &str) -> Result<ParticipantStatus, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_lowercase()))
        .map_err(|_| format!("unknown status `{raw}` (student, instructor, professional, staff)"))
}

fn role_arg(raw: &str) -> Result<StageRole, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_lowercase()))
        .map_err(|_| format!("unknown role `{raw}` (participant, musician, instructor, staff)"))
}

fn filter_arg(raw: &str) -> Result<StageFilter, String> {
    match raw {
        "upcoming-active" => Ok(StageFilter::UpcomingAndActive),
        "upcoming" => Ok(StageFilter::Upcoming),
        "active" => Ok(StageFilter::Active),
        "completed" => Ok(StageFilter::Completed),
        "all" => Ok(StageFilter::All),
        other => Err(format!("unknown filter `{other}`")),
    }
}
