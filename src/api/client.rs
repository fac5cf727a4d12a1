//! `reqwest` implementation of [`Backend`].
//!
//! Thin wrapper over the REST endpoints. Response decoding lives in pure
//! helpers (`decode`, `decode_list`) so it is testable without a server.

use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::types::{
    ActivityLog, ActivityLogStats, AssignParticipant, AssignRegistration, AutoAssignReport, Bungalow, DashboardStats,
    FrequencyReport, Id, ImportOutcome, ImportSelection, ImportValidation, Language, LanguageDraft, LanguagePatch,
    LanguageStatistics, NetworkInfo, Participant, ParticipantDraft, ParticipantPatch, ParticipantStage,
    RegistrationDraft, RegistrationExport, RegistrationPatch, Stage, StageDraft, StageParticipantsStats, Village,
};
use super::{ActivityQuery, ApiError, Backend, ParticipantQuery};
use crate::config::ClientConfig;
use crate::period::{DateRange, format_date};

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

type Query = Vec<(&'static str, String)>;

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl ApiClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the TLS backend fails to
    /// initialise.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.base_url.clone(), access_token: config.access_token.clone() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: Method, path: &str, query: &Query) -> reqwest::RequestBuilder {
        let mut request = self.http.request(method, self.url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Send one JSON request; `Ok(None)` for `204 No Content` or an empty body.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &Query,
        body: Option<Value>,
    ) -> Result<Option<String>, ApiError> {
        let mut request = self.request(method.clone(), path, query);
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.dispatch(method, path, request).await
    }

    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<Option<String>, ApiError> {
        tracing::debug!(%method, path, "api request");

        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "api request failed");
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| ApiError::Transport(e.to_string()))?;

        if !(200..300).contains(&status) {
            let err = ApiError::from_response(status, &text);
            tracing::warn!(%method, path, status, error = %err, "api error response");
            return Err(err);
        }
        if status == 204 || text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(text))
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str, query: &Query) -> Result<T, ApiError> {
        let text = self.send(Method::GET, path, query, None).await?;
        decode(path, text.as_deref())
    }

    async fn fetch_list<T: DeserializeOwned>(&self, path: &str, query: &Query) -> Result<Vec<T>, ApiError> {
        let text = self.send(Method::GET, path, query, None).await?;
        decode_list(path, text.as_deref())
    }

    async fn write<T: DeserializeOwned>(&self, method: Method, path: &str, body: Value) -> Result<T, ApiError> {
        let text = self.send(method, path, &Query::new(), Some(body)).await?;
        decode(path, text.as_deref())
    }

    /// Mutation whose response body is ignored.
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<(), ApiError> {
        self.send(method, path, &Query::new(), body).await.map(|_| ())
    }
}

// =============================================================================
// DECODING
// =============================================================================

/// Django list endpoints answer either a bare array or a paginated page.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody<T> {
    Plain(Vec<T>),
    Paged { results: Vec<T> },
}

#[derive(Deserialize)]
struct UnassignedBody {
    #[serde(default)]
    registrations: Vec<ParticipantStage>,
}

pub(crate) fn decode<T: DeserializeOwned>(path: &str, text: Option<&str>) -> Result<T, ApiError> {
    let text = text.ok_or_else(|| ApiError::Decode(format!("{path}: empty response body")))?;
    serde_json::from_str(text).map_err(|e| ApiError::Decode(format!("{path}: {e}")))
}

pub(crate) fn decode_list<T: DeserializeOwned>(path: &str, text: Option<&str>) -> Result<Vec<T>, ApiError> {
    match text {
        None => Ok(Vec::new()),
        Some(_) => Ok(match decode::<ListBody<T>>(path, text)? {
            ListBody::Plain(items) | ListBody::Paged { results: items } => items,
        }),
    }
}

/// `/languages/` answers a bare array, a page, or `{"languages": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum LanguagesBody {
    Listed(ListBody<Language>),
    Wrapped { languages: Vec<Language> },
}

pub(crate) fn decode_languages(path: &str, text: Option<&str>) -> Result<Vec<Language>, ApiError> {
    match text {
        None => Ok(Vec::new()),
        Some(_) => Ok(match decode::<LanguagesBody>(path, text)? {
            LanguagesBody::Listed(ListBody::Plain(items) | ListBody::Paged { results: items })
            | LanguagesBody::Wrapped { languages: items } => items,
        }),
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Decode(format!("request body: {e}")))
}

pub(crate) fn period_query(period: Option<DateRange>) -> Query {
    period.map_or_else(Vec::new, |range| {
        vec![("start_date", format_date(range.start)), ("end_date", format_date(range.end))]
    })
}

// =============================================================================
// ENDPOINTS
// =============================================================================

#[async_trait::async_trait]
impl Backend for ApiClient {
    async fn list_participants(&self, query: &ParticipantQuery) -> Result<Vec<Participant>, ApiError> {
        self.fetch_list("/participants/", &query.pairs()).await
    }

    async fn create_participant(&self, draft: &ParticipantDraft) -> Result<Participant, ApiError> {
        let created: Participant = self.write(Method::POST, "/participants/", encode(draft)?).await?;
        tracing::info!(participant_id = created.id, "participant created");
        Ok(created)
    }

    async fn update_participant(&self, id: Id, patch: &ParticipantPatch) -> Result<Participant, ApiError> {
        self.write(Method::PATCH, &format!("/participants/{id}/"), encode(patch)?).await
    }

    async fn delete_participant(&self, id: Id) -> Result<(), ApiError> {
        self.command(Method::DELETE, &format!("/participants/{id}/"), None).await?;
        tracing::info!(participant_id = id, "participant deleted");
        Ok(())
    }

    async fn list_stages(&self) -> Result<Vec<Stage>, ApiError> {
        self.fetch_list("/stages/", &Query::new()).await
    }

    async fn get_stage(&self, id: Id) -> Result<Stage, ApiError> {
        self.fetch(&format!("/stages/{id}/"), &Query::new()).await
    }

    async fn create_stage(&self, draft: &StageDraft) -> Result<Stage, ApiError> {
        let created: Stage = self.write(Method::POST, "/stages/", encode(draft)?).await?;
        tracing::info!(stage_id = created.id, "stage created");
        Ok(created)
    }

    async fn update_stage(&self, id: Id, draft: &StageDraft) -> Result<Stage, ApiError> {
        self.write(Method::PATCH, &format!("/stages/{id}/"), encode(draft)?).await
    }

    async fn delete_stage(&self, id: Id) -> Result<(), ApiError> {
        self.command(Method::DELETE, &format!("/stages/{id}/"), None).await?;
        tracing::info!(stage_id = id, "stage deleted");
        Ok(())
    }

    async fn list_bungalows(&self) -> Result<Vec<Bungalow>, ApiError> {
        self.fetch_list("/bungalows/", &Query::new()).await
    }

    async fn list_villages(&self) -> Result<Vec<Village>, ApiError> {
        self.fetch_list("/villages/", &Query::new()).await
    }

    async fn assign_participant(&self, participant_id: Id, body: &AssignParticipant) -> Result<(), ApiError> {
        self.command(Method::POST, &format!("/participants/{participant_id}/assign/"), Some(encode(body)?))
            .await?;
        tracing::info!(participant_id, bungalow_id = body.bungalow_id, bed = %body.bed, "participant assigned");
        Ok(())
    }

    async fn unassign_participant(&self, participant_id: Id) -> Result<(), ApiError> {
        self.command(Method::POST, &format!("/participants/{participant_id}/unassign/"), None).await?;
        tracing::info!(participant_id, "participant unassigned");
        Ok(())
    }

    async fn stage_registrations(&self, stage_id: Id) -> Result<Vec<ParticipantStage>, ApiError> {
        self.fetch_list(&format!("/stages/{stage_id}/participants/"), &Query::new()).await
    }

    async fn stage_registration_stats(&self, stage_id: Id) -> Result<StageParticipantsStats, ApiError> {
        self.fetch(&format!("/stages/{stage_id}/participants/stats/"), &Query::new()).await
    }

    async fn add_registration(&self, draft: &RegistrationDraft) -> Result<ParticipantStage, ApiError> {
        let created: ParticipantStage = self.write(Method::POST, "/participant-stages/", encode(draft)?).await?;
        tracing::info!(registration_id = created.id, stage_id = draft.stage_id, "registration added");
        Ok(created)
    }

    async fn update_registration(&self, id: Id, patch: &RegistrationPatch) -> Result<ParticipantStage, ApiError> {
        self.write(Method::PATCH, &format!("/participant-stages/{id}/"), encode(patch)?).await
    }

    async fn remove_registration(&self, id: Id) -> Result<(), ApiError> {
        self.command(Method::DELETE, &format!("/participant-stages/{id}/"), None).await?;
        tracing::info!(registration_id = id, "registration removed");
        Ok(())
    }

    async fn unassigned_registrations(&self, period: Option<DateRange>) -> Result<Vec<ParticipantStage>, ApiError> {
        let path = "/registrations/unassigned/";
        let text = self.send(Method::GET, path, &period_query(period), None).await?;
        match text.as_deref() {
            None => Ok(Vec::new()),
            Some(_) => decode::<UnassignedBody>(path, text.as_deref()).map(|body| body.registrations),
        }
    }

    async fn assign_registration(&self, registration_id: Id, body: &AssignRegistration) -> Result<(), ApiError> {
        self.command(Method::POST, &format!("/registrations/{registration_id}/assign/"), Some(encode(body)?))
            .await?;
        tracing::info!(registration_id, bungalow_id = body.bungalow_id, forced = body.force, "registration assigned");
        Ok(())
    }

    async fn unassign_registration(&self, registration_id: Id) -> Result<(), ApiError> {
        self.command(Method::POST, &format!("/registrations/{registration_id}/unassign/"), None).await?;
        tracing::info!(registration_id, "registration unassigned");
        Ok(())
    }

    async fn export_registrations(&self, stage_id: Option<Id>) -> Result<RegistrationExport, ApiError> {
        let query = stage_id.map_or_else(Vec::new, |id| vec![("stage_id", id.to_string())]);
        self.fetch("/registrations/export/", &query).await
    }

    async fn auto_assign_stage(&self, stage_id: Id) -> Result<AutoAssignReport, ApiError> {
        let path = format!("/stages/{stage_id}/auto-assign/");
        let report: AutoAssignReport = self.write(Method::POST, &path, serde_json::json!({})).await?;
        tracing::info!(
            stage_id,
            assigned = report.summary.total_assigned,
            failed = report.summary.total_failed,
            "auto-assignment finished"
        );
        Ok(report)
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.fetch("/dashboard/stats/", &Query::new()).await
    }

    async fn network_info(&self) -> Result<NetworkInfo, ApiError> {
        self.fetch("/network-info/", &Query::new()).await
    }

    async fn list_languages(&self) -> Result<Vec<Language>, ApiError> {
        let path = "/languages/";
        let text = self.send(Method::GET, path, &Query::new(), None).await?;
        decode_languages(path, text.as_deref())
    }

    async fn create_language(&self, draft: &LanguageDraft) -> Result<Language, ApiError> {
        let created: Language = self.write(Method::POST, "/languages/", encode(draft)?).await?;
        tracing::info!(language_id = created.id, code = %created.code, "language created");
        Ok(created)
    }

    async fn update_language(&self, id: Id, patch: &LanguagePatch) -> Result<Language, ApiError> {
        self.write(Method::PATCH, &format!("/languages/{id}/"), encode(patch)?).await
    }

    async fn delete_language(&self, id: Id) -> Result<(), ApiError> {
        self.command(Method::DELETE, &format!("/languages/{id}/"), None).await?;
        tracing::info!(language_id = id, "language deleted");
        Ok(())
    }

    async fn language_statistics(&self) -> Result<LanguageStatistics, ApiError> {
        self.fetch("/languages/statistics/", &Query::new()).await
    }

    async fn activity_logs(&self, query: &ActivityQuery) -> Result<Vec<ActivityLog>, ApiError> {
        self.fetch_list("/activity-logs/", &query.pairs()).await
    }

    async fn activity_stats(&self) -> Result<ActivityLogStats, ApiError> {
        self.fetch("/activity-logs/statistics/", &Query::new()).await
    }

    async fn frequency_report(&self, period: DateRange) -> Result<FrequencyReport, ApiError> {
        self.fetch("/reports/frequency/", &period_query(Some(period))).await
    }

    async fn validate_import(&self, file_name: &str, content: Vec<u8>) -> Result<ImportValidation, ApiError> {
        let path = "/import/validate/";
        let size = content.len();
        let part = reqwest::multipart::Part::bytes(content).file_name(file_name.to_owned());
        let request = self
            .request(Method::POST, path, &Query::new())
            .multipart(reqwest::multipart::Form::new().part("file", part));
        let text = self.dispatch(Method::POST, path, request).await?;
        let validation: ImportValidation = decode(path, text.as_deref())?;
        tracing::info!(
            file_name,
            bytes = size,
            rows = validation.summary.total_rows,
            errors = validation.summary.errors,
            "import validated"
        );
        Ok(validation)
    }

    async fn execute_import(&self, selection: &ImportSelection) -> Result<ImportOutcome, ApiError> {
        let outcome: ImportOutcome = self.write(Method::POST, "/import/execute/", encode(selection)?).await?;
        tracing::info!(
            imported = outcome.summary.imported,
            created = outcome.summary.created_and_imported,
            errors = outcome.summary.errors,
            "import executed"
        );
        Ok(outcome)
    }
}
