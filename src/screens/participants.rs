//! Participant directory: search, status filter and CRUD.
//!
//! Filtering is local over the last fetched list; every create, edit or
//! delete goes to the backend and is followed by a full refetch.

use crate::api::types::{Gender, Id, Participant, ParticipantDraft, ParticipantPatch, ParticipantStatus};
use crate::api::{ApiError, Backend, ParticipantQuery};
use crate::notice::NoticeBoard;
use crate::screens::{FormError, report_form, required};

#[cfg(test)]
#[path = "participants_test.rs"]
mod tests;

pub const DELETE_FORBIDDEN_MESSAGE: &str =
    "Permission refusée: Vous n'avez pas les droits pour supprimer ce participant.";
pub const DELETE_GONE_MESSAGE: &str = "Ce participant n'existe plus dans le système.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ParticipantStatus),
}

impl StatusFilter {
    #[must_use]
    pub fn matches(self, status: ParticipantStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }
}

// =============================================================================
// FORM
// =============================================================================

/// Create/edit form as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: Gender,
    pub age: u32,
    pub nationality: String,
    pub language: String,
    pub status: ParticipantStatus,
}

impl ParticipantForm {
    #[must_use]
    pub fn from_participant(participant: &Participant) -> Self {
        Self {
            first_name: participant.first_name.clone(),
            last_name: participant.last_name.clone(),
            email: participant.email.clone(),
            gender: participant.gender,
            age: participant.age,
            nationality: participant.nationality.clone().unwrap_or_default(),
            language: participant.language.clone(),
            status: participant.status,
        }
    }

    /// # Errors
    ///
    /// `Required` for a blank name, email or language; `InvalidEmail` when
    /// the address has no `local@domain.tld` shape.
    pub fn validate(&self) -> Result<ParticipantDraft, FormError> {
        let first_name = required(&self.first_name, "Prénom")?;
        let last_name = required(&self.last_name, "Nom")?;
        let email = required(&self.email, "Email")?;
        if !looks_like_email(&email) {
            return Err(FormError::InvalidEmail);
        }
        let language = required(&self.language, "Langue")?;
        let nationality = self.nationality.trim();

        Ok(ParticipantDraft {
            first_name,
            last_name,
            email,
            gender: self.gender,
            age: self.age,
            nationality: (!nationality.is_empty()).then(|| nationality.to_owned()),
            language,
            language_ids: Vec::new(),
            status: self.status,
        })
    }
}

impl From<ParticipantDraft> for ParticipantPatch {
    fn from(draft: ParticipantDraft) -> Self {
        Self {
            first_name: Some(draft.first_name),
            last_name: Some(draft.last_name),
            email: Some(draft.email),
            gender: Some(draft.gender),
            age: Some(draft.age),
            nationality: draft.nationality,
            language: Some(draft.language),
            status: Some(draft.status),
        }
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.split('.').count() >= 2
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    }
}

// =============================================================================
// VIEW
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct ParticipantsView {
    pub participants: Vec<Participant>,
    pub search: String,
    pub status_filter: StatusFilter,
    pub notices: NoticeBoard,
}

impl ParticipantsView {
    #[must_use]
    pub fn with_notices(mut self, notices: NoticeBoard) -> Self {
        self.notices = notices;
        self
    }

    /// # Errors
    ///
    /// Backend errors from the directory fetch.
    pub async fn load(backend: &dyn Backend) -> Result<Self, ApiError> {
        let participants = backend.list_participants(&ParticipantQuery::default()).await?;
        Ok(Self { participants, ..Self::default() })
    }

    /// # Errors
    ///
    /// Backend errors; the current list is kept.
    pub async fn refresh(&mut self, backend: &dyn Backend) -> Result<(), ApiError> {
        self.participants = backend.list_participants(&ParticipantQuery::default()).await?;
        Ok(())
    }

    /// Case-insensitive search over first name, last name, email and
    /// nationality, combined with the status filter.
    #[must_use]
    pub fn filtered(&self) -> Vec<&Participant> {
        let needle = self.search.trim().to_lowercase();
        self.participants
            .iter()
            .filter(|p| self.status_filter.matches(p.status))
            .filter(|p| needle.is_empty() || matches_search(p, &needle))
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: Id) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// # Errors
    ///
    /// Form rejections and backend errors, also posted as an error notice.
    pub async fn create(&mut self, backend: &dyn Backend, form: &ParticipantForm) -> Result<Participant, FormError> {
        let result = async {
            let draft = form.validate()?;
            let created = backend.create_participant(&draft).await?;
            self.refresh(backend).await?;
            Ok::<_, FormError>(created)
        }
        .await;
        if let Ok(created) = &result {
            tracing::info!(participant_id = created.id, "participant created");
            self.notices.success(format!("Participant \"{}\" créé avec succès !", created.full_name()));
        }
        report_form(&mut self.notices, result)
    }

    /// # Errors
    ///
    /// As [`Self::create`].
    pub async fn update(
        &mut self,
        backend: &dyn Backend,
        id: Id,
        form: &ParticipantForm,
    ) -> Result<Participant, FormError> {
        let result = async {
            let patch = ParticipantPatch::from(form.validate()?);
            let updated = backend.update_participant(id, &patch).await?;
            self.refresh(backend).await?;
            Ok::<_, FormError>(updated)
        }
        .await;
        if let Ok(updated) = &result {
            self.notices.success(format!("Participant \"{}\" modifié avec succès !", updated.full_name()));
        }
        report_form(&mut self.notices, result)
    }

    /// Delete a participant. 403 and 404 get their own wording.
    ///
    /// # Errors
    ///
    /// Backend errors, posted as an error notice.
    pub async fn delete(&mut self, backend: &dyn Backend, id: Id) -> Result<(), ApiError> {
        let name = self.get(id).map_or_else(|| format!("Participant {id}"), Participant::full_name);
        let result = async {
            backend.delete_participant(id).await?;
            self.refresh(backend).await
        }
        .await;
        match &result {
            Ok(()) => {
                tracing::info!(participant_id = id, "participant deleted");
                self.notices.success(format!("Participant \"{name}\" supprimé."));
            }
            Err(err) => {
                tracing::warn!(participant_id = id, error = %err, "participant delete failed");
                self.notices.error(delete_failure_message(err, &name));
            }
        }
        result
    }
}

fn matches_search(participant: &Participant, needle: &str) -> bool {
    [
        Some(participant.first_name.as_str()),
        Some(participant.last_name.as_str()),
        Some(participant.email.as_str()),
        participant.nationality.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(needle))
}

/// Notice text for a failed delete of `name`.
#[must_use]
pub fn delete_failure_message(err: &ApiError, name: &str) -> String {
    match err {
        ApiError::PermissionDenied { .. } => DELETE_FORBIDDEN_MESSAGE.to_owned(),
        ApiError::NotFound { .. } => DELETE_GONE_MESSAGE.to_owned(),
        ApiError::Rejected { message, .. } | ApiError::Conflict { message, .. } => message.clone(),
        ApiError::Server { detail: Some(detail), .. } => detail.clone(),
        _ => format!("Impossible de supprimer {name}"),
    }
}
