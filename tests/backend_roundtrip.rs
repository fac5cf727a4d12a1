//! `ApiClient` against a fake backend served by axum on an ephemeral port.

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use time::macros::date;

use sables::api::types::{ActionType, AssignParticipant, AssignRegistration, ImportSelection, ParticipantDraft};
use sables::api::{ActivityQuery, ApiClient, ApiError, Backend, ParticipantQuery};
use sables::config::ClientConfig;
use sables::period::DateRange;

#[derive(Clone, Default)]
struct Seen {
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
    auth: Arc<Mutex<Vec<String>>>,
}

impl Seen {
    fn push(&self, route: &str, query: Option<String>, body: Value, headers: &HeaderMap) {
        self.requests.lock().unwrap().push((route.to_owned(), query, body));
        if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
            self.auth.lock().unwrap().push(auth.to_owned());
        }
    }

    fn last(&self) -> (String, Option<String>, Value) {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

async fn list_participants(State(seen): State<Seen>, headers: HeaderMap, RawQuery(query): RawQuery) -> Json<Value> {
    seen.push("list_participants", query, Value::Null, &headers);
    Json(json!({
        "count": 2,
        "results": [
            {"id": 1, "firstName": "Jane", "lastName": "Doe", "email": "jane@example.org", "gender": "F",
             "status": "professional", "assignedBungalowId": 3, "assignedBed": "bed2", "stageIds": [7]},
            {"id": 2, "firstName": "Ana", "lastName": "Silva"}
        ]
    }))
}

async fn create_participant(State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    seen.push("create_participant", None, body, &headers);
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"email": ["Un participant avec cet email existe déjà."], "age": ["Valeur invalide."]})),
    )
}

async fn list_stages() -> Json<Value> {
    Json(json!([
        {"id": 7, "name": "July Intensive", "startDate": "2024-07-01", "endDate": "2024-07-10", "capacity": 20},
        {"id": 8, "name": "Draft", "startDate": null, "endDate": ""}
    ]))
}

async fn delete_participant(Path(id): Path<i64>) -> impl IntoResponse {
    match id {
        403 => (StatusCode::FORBIDDEN, Json(json!({"detail": "forbidden"}))).into_response(),
        404 => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response(),
        _ => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn assign_participant(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> StatusCode {
    seen.push(&format!("assign_participant/{id}"), None, body, &headers);
    StatusCode::NO_CONTENT
}

async fn unassigned(State(seen): State<Seen>, headers: HeaderMap, RawQuery(query): RawQuery) -> Json<Value> {
    seen.push("unassigned", query, Value::Null, &headers);
    Json(json!({
        "registrations": [{
            "id": 40, "participantId": 1, "participantName": "Jane Doe", "stageId": 7,
            "stageName": "July Intensive", "stageStartDate": "2024-07-01", "stageEndDate": "2024-07-10",
            "arrivalDate": "2024-07-02", "role": "musician"
        }],
        "count": 1
    }))
}

async fn assign_registration(State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
    let forced = body.get("force_assign").and_then(Value::as_bool).unwrap_or(false);
    seen.push("assign_registration", None, body, &headers);
    if forced {
        return (StatusCode::OK, Json(json!({"success": true}))).into_response();
    }
    (
        StatusCode::CONFLICT,
        Json(json!({"error": "Mixité non respectée dans ce bungalow", "requires_confirmation": true})),
    )
        .into_response()
}

async fn dashboard() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn network_info() -> Json<Value> {
    Json(json!({"local_ip": "192.168.1.20", "success": true}))
}

async fn list_languages() -> Json<Value> {
    Json(json!({"languages": [
        {"id": 1, "code": "fr", "name": "Français", "isActive": true, "displayOrder": 1, "participantCount": 12},
        {"id": 2, "code": "wo", "name": "Wolof", "nativeName": "Wolof", "isActive": false}
    ]}))
}

async fn activity_logs(State(seen): State<Seen>, headers: HeaderMap, RawQuery(query): RawQuery) -> Json<Value> {
    seen.push("activity_logs", query, Value::Null, &headers);
    Json(json!({"count": 1, "results": [{
        "id": 9, "user": 2, "userName": "Awa Diop", "actionType": "assign",
        "modelName": "Participant", "description": "Jane Doe assignée à B3",
        "changes": null, "timestamp": "2024-07-02T09:30:00Z"
    }]}))
}

async fn frequency_report(State(seen): State<Seen>, headers: HeaderMap, RawQuery(query): RawQuery) -> Json<Value> {
    seen.push("frequency_report", query, Value::Null, &headers);
    Json(json!({
        "period": {"startDate": "2024-01-01", "endDate": "2024-12-31"},
        "events": {"total": 3, "stages": 2, "residences": 1, "autres": 0, "list": []},
        "demographics": {"gender": {"men": 4, "women": 6, "menPercentage": 40.0, "womenPercentage": 60.0},
                         "age": {"average": 31.5, "min": 19, "max": 64, "distribution": {"18-25": 3}}},
        "occupancy": {"eventFillRate": 72.5}
    }))
}

async fn validate_import(State(seen): State<Seen>, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let content_type = headers.get("content-type").and_then(|v| v.to_str().ok()).unwrap_or_default().to_owned();
    seen.push("validate_import", Some(content_type), Value::String(String::from_utf8_lossy(&body).into_owned()), &headers);
    Json(json!({
        "summary": {"totalRows": 2, "validImports": 1, "newParticipants": 0, "alreadyRegistered": 0, "errors": 1},
        "valid_imports": [{"row": 2, "email": "jane@example.org", "participantId": 1,
                           "participantName": "Jane Doe", "stageId": 7, "stageName": "July Intensive"}],
        "new_participants": [],
        "already_registered": [],
        "errors": [{"row": 3, "email": "x@example.org", "reason": "Événement \"Nope\" non trouvé"}]
    }))
}

async fn execute_import(State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    seen.push("execute_import", None, body, &headers);
    Json(json!({"summary": {"imported": 1, "createdAndImported": 0, "errors": 0},
                "imported": [{"email": "jane@example.org", "participantName": "Jane Doe", "stageName": "July Intensive"}]}))
}

async fn start() -> (ApiClient, Seen) {
    let seen = Seen::default();
    let app = Router::new()
        .route("/api/participants/", get(list_participants).post(create_participant))
        .route("/api/participants/{id}/", delete(delete_participant))
        .route("/api/participants/{id}/assign/", post(assign_participant))
        .route("/api/stages/", get(list_stages))
        .route("/api/registrations/unassigned/", get(unassigned))
        .route("/api/registrations/{id}/assign/", post(assign_registration))
        .route("/api/dashboard/stats/", get(dashboard))
        .route("/api/network-info/", get(network_info))
        .route("/api/languages/", get(list_languages))
        .route("/api/activity-logs/", get(activity_logs))
        .route("/api/reports/frequency/", get(frequency_report))
        .route("/api/import/validate/", post(validate_import))
        .route("/api/import/execute/", post(execute_import))
        .with_state(seen.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = ClientConfig::default().with_overrides(Some(&format!("http://{addr}/api/")), Some("secret".into()));
    (ApiClient::new(&config).unwrap(), seen)
}

#[tokio::test]
async fn paged_list_decodes_with_defaults_and_query() {
    let (client, seen) = start().await;
    let query = ParticipantQuery { stage_id: Some(7), search: Some("  ".into()), ..ParticipantQuery::default() };

    let participants = client.list_participants(&query).await.unwrap();
    assert_eq!(participants.len(), 2);
    assert_eq!(participants[0].assigned_bed.as_deref(), Some("bed2"));
    assert_eq!(participants[1].email, "");
    assert!(participants[1].stage_ids.is_empty());

    let (_, raw_query, _) = seen.last();
    assert_eq!(raw_query.as_deref(), Some("stageId=7"));
    assert_eq!(seen.auth.lock().unwrap().as_slice(), ["Bearer secret"]);
}

#[tokio::test]
async fn bare_array_list_and_blank_dates() {
    let (client, _) = start().await;
    let stages = client.list_stages().await.unwrap();
    assert_eq!(stages[0].period(), Some(DateRange::new(date!(2024 - 07 - 01), date!(2024 - 07 - 10))));
    assert_eq!(stages[1].start_date, None);
    assert_eq!(stages[1].end_date, None);
}

#[tokio::test]
async fn assign_posts_camel_case_body_and_accepts_no_content() {
    let (client, seen) = start().await;
    let body = AssignParticipant { bungalow_id: 3, bed: "bed2".into(), stage_id: 7 };
    client.assign_participant(1, &body).await.unwrap();

    let (route, _, sent) = seen.last();
    assert_eq!(route, "assign_participant/1");
    assert_eq!(sent, json!({"bungalowId": 3, "bed": "bed2", "stageId": 7}));
}

#[tokio::test]
async fn delete_maps_403_and_404() {
    let (client, _) = start().await;
    client.delete_participant(5).await.unwrap();
    assert!(matches!(client.delete_participant(403).await, Err(ApiError::PermissionDenied { .. })));

    let err = client.delete_participant(404).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.user_message(), sables::api::error::NOT_FOUND_MESSAGE);
}

#[tokio::test]
async fn field_errors_become_validation_message() {
    let (client, _) = start().await;
    let draft = ParticipantDraft { first_name: "Jane".into(), last_name: "Doe".into(), ..ParticipantDraft::default() };
    let err = client.create_participant(&draft).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation { .. }));
    let message = err.user_message();
    assert!(message.contains("Email: Un participant avec cet email existe déjà."));
    assert!(message.contains("Âge: Valeur invalide."));
    assert_eq!(message.matches(" | ").count(), 1);
}

#[tokio::test]
async fn unassigned_sends_period_and_unwraps_envelope() {
    let (client, seen) = start().await;
    let period = DateRange::new(date!(2024 - 07 - 01), date!(2024 - 07 - 10));
    let registrations = client.unassigned_registrations(Some(period)).await.unwrap();

    assert_eq!(registrations.len(), 1);
    assert_eq!(registrations[0].stay(), Some(DateRange::new(date!(2024 - 07 - 02), date!(2024 - 07 - 10))));
    let (_, raw_query, _) = seen.last();
    assert_eq!(raw_query.as_deref(), Some("start_date=2024-07-01&end_date=2024-07-10"));
}

#[tokio::test]
async fn conflict_requires_confirmation_then_force_passes() {
    let (client, seen) = start().await;
    let mut body = AssignRegistration { bungalow_id: 3, bed: "bed1".into(), force: false };

    let err = client.assign_registration(40, &body).await.unwrap_err();
    assert!(err.requires_confirmation());
    assert_eq!(err.user_message(), "Mixité non respectée dans ce bungalow");
    assert_eq!(seen.last().2, json!({"bungalowId": 3, "bed": "bed1"}));

    body.force = true;
    client.assign_registration(40, &body).await.unwrap();
    assert_eq!(seen.last().2["force_assign"], json!(true));
}

#[tokio::test]
async fn server_error_and_network_info() {
    let (client, _) = start().await;
    let err = client.dashboard_stats().await.unwrap_err();
    assert_eq!(err, ApiError::Server { status: 500, detail: None });

    let info = client.network_info().await.unwrap();
    assert_eq!(info.lan_url(3000), "http://192.168.1.20:3000");
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig::default().with_overrides(Some(&format!("http://{addr}/api")), None);
    let client = ApiClient::new(&config).unwrap();
    assert!(matches!(client.list_stages().await, Err(ApiError::Transport(_))));
}

#[tokio::test]
async fn languages_unwrap_named_envelope() {
    let (client, _) = start().await;
    let languages = client.list_languages().await.unwrap();
    assert_eq!(languages.len(), 2);
    assert_eq!(languages[0].participant_count, Some(12));
    assert!(!languages[1].is_active);
}

#[tokio::test]
async fn activity_filters_travel_as_snake_case_query() {
    let (client, seen) = start().await;
    let query = ActivityQuery { user_id: Some(2), action_type: Some(ActionType::Assign), ..ActivityQuery::default() };
    let logs = client.activity_logs(&query).await.unwrap();

    assert_eq!(logs[0].action_type, ActionType::Assign);
    assert!(logs[0].changes.is_null());
    let (_, raw_query, _) = seen.last();
    assert_eq!(raw_query.as_deref(), Some("user_id=2&action_type=assign"));
}

#[tokio::test]
async fn frequency_report_sends_period_and_fills_defaults() {
    let (client, seen) = start().await;
    let period = DateRange::new(date!(2024 - 01 - 01), date!(2024 - 12 - 31));
    let report = client.frequency_report(period).await.unwrap();

    assert_eq!(report.events.stages, 2);
    assert_eq!(report.demographics.age.distribution.get("18-25"), Some(&3));
    assert_eq!(report.participants.total_registrations, 0);
    let (_, raw_query, _) = seen.last();
    assert_eq!(raw_query.as_deref(), Some("start_date=2024-01-01&end_date=2024-12-31"));
}

#[tokio::test]
async fn import_uploads_multipart_then_posts_selection() {
    let (client, seen) = start().await;
    let content = b"email;stage_name\njane@example.org;July Intensive\n".to_vec();
    let validation = client.validate_import("liste.csv", content).await.unwrap();

    let (_, content_type, body) = seen.last();
    assert!(content_type.unwrap().starts_with("multipart/form-data; boundary="));
    let body = body.as_str().unwrap().to_owned();
    assert!(body.contains(r#"name="file"; filename="liste.csv""#));
    assert!(body.contains("jane@example.org;July Intensive"));

    assert_eq!(validation.summary.valid_imports, 1);
    assert_eq!(validation.valid_imports[0].display_name(), "Jane Doe");
    assert_eq!(validation.errors[0].row, Some(3));

    let selection = ImportSelection { valid_imports: validation.valid_imports.clone(), new_participants: Vec::new() };
    let outcome = client.execute_import(&selection).await.unwrap();
    assert_eq!(outcome.summary.imported, 1);

    let (_, _, sent) = seen.last();
    assert_eq!(sent["valid_imports"][0]["participantId"], json!(1));
    assert_eq!(sent["valid_imports"][0]["stageName"], json!("July Intensive"));
    assert_eq!(sent["new_participants"], json!([]));
}
