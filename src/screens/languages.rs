//! Spoken-language catalogue offered on participant forms.
//!
//! Inactive languages stay in the catalogue but are hidden from pickers.
//! Counts shown in the header are derived from the loaded list.

use crate::api::types::{Id, Language, LanguageDraft, LanguagePatch, LanguageStatistics};
use crate::api::{ApiError, Backend};
use crate::notice::NoticeBoard;
use crate::screens::{FormError, report_form, required};

#[cfg(test)]
#[path = "languages_test.rs"]
mod tests;

pub const LOAD_FAILED_MESSAGE: &str = "Erreur lors du chargement des langues";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActiveFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl ActiveFilter {
    #[must_use]
    pub fn matches(self, language: &Language) -> bool {
        match self {
            Self::All => true,
            Self::Active => language.is_active,
            Self::Inactive => !language.is_active,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LanguageCounts {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub participants: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageForm {
    pub code: String,
    pub name: String,
    pub native_name: String,
    pub is_active: bool,
    pub display_order: u32,
}

impl Default for LanguageForm {
    fn default() -> Self {
        Self { code: String::new(), name: String::new(), native_name: String::new(), is_active: true, display_order: 0 }
    }
}

impl LanguageForm {
    #[must_use]
    pub fn from_language(language: &Language) -> Self {
        Self {
            code: language.code.clone(),
            name: language.name.clone(),
            native_name: language.native_name.clone().unwrap_or_default(),
            is_active: language.is_active,
            display_order: language.display_order,
        }
    }

    /// Codes are stored lowercase.
    ///
    /// # Errors
    ///
    /// [`FormError::Required`] for a blank code or name.
    pub fn validate(&self) -> Result<LanguageDraft, FormError> {
        let code = required(&self.code, "Code")?.to_lowercase();
        let name = required(&self.name, "Nom")?;
        let native_name = Some(self.native_name.trim().to_owned()).filter(|n| !n.is_empty());
        Ok(LanguageDraft { code, name, native_name, is_active: self.is_active, display_order: self.display_order })
    }
}

#[derive(Debug, Clone, Default)]
pub struct LanguagesView {
    pub languages: Vec<Language>,
    pub stats: Option<LanguageStatistics>,
    pub search: String,
    pub filter: ActiveFilter,
    pub notices: NoticeBoard,
}

impl LanguagesView {
    /// Catalogue and usage statistics, fetched together.
    ///
    /// # Errors
    ///
    /// The first failing fetch.
    pub async fn load(backend: &dyn Backend) -> Result<Self, ApiError> {
        let (languages, stats) = tokio::try_join!(backend.list_languages(), backend.language_statistics())?;
        Ok(Self { languages, stats: Some(stats), ..Self::default() })
    }

    #[must_use]
    pub fn with_notices(mut self, notices: NoticeBoard) -> Self {
        self.notices = notices;
        self
    }

    /// # Errors
    ///
    /// Backend errors; the list is emptied and an error notice posted.
    pub async fn refresh(&mut self, backend: &dyn Backend) -> Result<(), ApiError> {
        match backend.list_languages().await {
            Ok(languages) => {
                self.languages = languages;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "language catalogue fetch failed");
                self.languages.clear();
                self.notices.error(LOAD_FAILED_MESSAGE);
                Err(err)
            }
        }
    }

    /// Search over name, code and native name, combined with the filter.
    #[must_use]
    pub fn filtered(&self) -> Vec<&Language> {
        let needle = self.search.trim().to_lowercase();
        self.languages
            .iter()
            .filter(|l| self.filter.matches(l))
            .filter(|l| {
                needle.is_empty()
                    || [Some(l.name.as_str()), Some(l.code.as_str()), l.native_name.as_deref()]
                        .into_iter()
                        .flatten()
                        .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Active languages in display order, for participant pickers.
    #[must_use]
    pub fn choices(&self) -> Vec<&Language> {
        let mut active: Vec<&Language> = self.languages.iter().filter(|l| l.is_active).collect();
        active.sort_by(|a, b| a.display_order.cmp(&b.display_order).then_with(|| a.name.cmp(&b.name)));
        active
    }

    #[must_use]
    pub fn counts(&self) -> LanguageCounts {
        let active = self.languages.iter().filter(|l| l.is_active).count();
        LanguageCounts {
            total: self.languages.len(),
            active,
            inactive: self.languages.len() - active,
            participants: self.languages.iter().filter_map(|l| l.participant_count).sum(),
        }
    }

    #[must_use]
    pub fn get(&self, id: Id) -> Option<&Language> {
        self.languages.iter().find(|l| l.id == id)
    }

    /// # Errors
    ///
    /// Form rejections and backend errors, also posted as an error notice.
    pub async fn create(&mut self, backend: &dyn Backend, form: &LanguageForm) -> Result<Language, FormError> {
        let result = async {
            let draft = form.validate()?;
            let created = backend.create_language(&draft).await?;
            self.refresh(backend).await?;
            Ok::<_, FormError>(created)
        }
        .await;
        if let Ok(created) = &result {
            self.notices.success(format!("Langue {} créée avec succès", created.name));
        }
        report_form(&mut self.notices, result)
    }

    /// # Errors
    ///
    /// As [`Self::create`].
    pub async fn update(&mut self, backend: &dyn Backend, id: Id, form: &LanguageForm) -> Result<Language, FormError> {
        let result = async {
            let patch = LanguagePatch::from(form.validate()?);
            let updated = backend.update_language(id, &patch).await?;
            self.refresh(backend).await?;
            Ok::<_, FormError>(updated)
        }
        .await;
        if let Ok(updated) = &result {
            self.notices.success(format!("Langue {} modifiée avec succès", updated.name));
        }
        report_form(&mut self.notices, result)
    }

    /// Flip the active flag of one language.
    ///
    /// # Errors
    ///
    /// Backend errors, also posted as an error notice.
    pub async fn toggle_active(&mut self, backend: &dyn Backend, id: Id) -> Result<(), FormError> {
        let Some(language) = self.get(id).cloned() else {
            return report_form(&mut self.notices, Err(ApiError::NotFound { detail: None }.into()));
        };
        let activate = !language.is_active;
        let result = async {
            let patch = LanguagePatch { is_active: Some(activate), ..LanguagePatch::default() };
            backend.update_language(id, &patch).await?;
            self.refresh(backend).await?;
            Ok::<_, FormError>(())
        }
        .await;
        if result.is_ok() {
            let state = if activate { "activée" } else { "désactivée" };
            self.notices.success(format!("Langue {} {state}", language.name));
        }
        report_form(&mut self.notices, result)
    }

    /// # Errors
    ///
    /// Backend errors, also posted as an error notice. The backend refuses to
    /// delete a language still spoken by participants.
    pub async fn delete(&mut self, backend: &dyn Backend, id: Id) -> Result<(), FormError> {
        let name = self.get(id).map_or_else(|| format!("#{id}"), |l| l.name.clone());
        let result = async {
            backend.delete_language(id).await?;
            self.refresh(backend).await?;
            Ok::<_, FormError>(())
        }
        .await;
        if result.is_ok() {
            tracing::info!(language_id = id, "language deleted");
            self.notices.warning(format!("Langue {name} supprimée"));
        }
        report_form(&mut self.notices, result)
    }
}
