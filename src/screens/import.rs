//! Bulk registration from a spreadsheet.
//!
//! DESIGN
//! ======
//! Two passes against the backend. `validate` uploads the file and gets the
//! rows sorted into four buckets: registrations for known participants,
//! participants to create, rows already registered and rejected rows.
//! `execute` sends back the known-participant rows plus whichever new
//! participants the user kept selected.
//!
//! CSV files are read locally first so a file without the required columns
//! is refused before any upload. Excel files go to the backend as they are.

use std::io::Write;

use thiserror::Error;

use crate::api::types::{ImportOutcome, ImportRow, ImportSelection, ImportValidation};
use crate::api::{ApiError, Backend};
use crate::screens::reports::UTF8_BOM;

#[cfg(test)]
#[path = "import_test.rs"]
mod tests;

pub const VALIDATE_FAILED_MESSAGE: &str = "Erreur lors de la validation";
pub const EXECUTE_FAILED_MESSAGE: &str = "Erreur lors de l'import";
pub const TEMPLATE_FILE_NAME: &str = "template_import_participants.csv";

const REQUIRED_COLUMNS: [&str; 2] = ["email", "stage_name"];

const TEMPLATE_HEADERS: [&str; 14] = [
    "email",
    "stage_name",
    "first_name",
    "last_name",
    "gender",
    "age",
    "nationality",
    "status",
    "role",
    "arrival_date",
    "arrival_time",
    "departure_date",
    "departure_time",
    "languages",
];

const TEMPLATE_EXAMPLE: [&str; 14] = [
    "exemple@email.com",
    "Nom de l'événement",
    "Jean",
    "Dupont",
    "M",
    "30",
    "Française",
    "student",
    "participant",
    "2025-01-15",
    "10:00",
    "2025-01-20",
    "16:00",
    "Français, English, Wolof",
];

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Format non supporté. Utilisez un fichier .xlsx, .xls ou .csv")]
    UnsupportedFormat,

    #[error("Le fichier CSV est vide")]
    EmptyFile,

    #[error("Colonnes manquantes: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),

    #[error("Aucun participant à importer")]
    NothingSelected,

    #[error("Aucune validation en cours")]
    NotValidated,

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Csv,
    Excel,
}

fn file_kind(file_name: &str) -> Result<FileKind, ImportError> {
    let lower = file_name.to_lowercase();
    if lower.ends_with(".csv") {
        Ok(FileKind::Csv)
    } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") {
        Ok(FileKind::Excel)
    } else {
        Err(ImportError::UnsupportedFormat)
    }
}

/// Delimiter of a CSV file, guessed from its header line: tab, then
/// semicolon, then comma.
fn sniff_delimiter(header_line: &str) -> u8 {
    if header_line.contains('\t') {
        b'\t'
    } else if header_line.contains(';') {
        b';'
    } else {
        b','
    }
}

fn clean_header(raw: &str) -> String {
    raw.replace(['\u{feff}', '\u{200b}'], "").trim().to_lowercase()
}

/// Check that a CSV upload carries the required columns and return the
/// number of non-blank data rows.
///
/// # Errors
///
/// [`ImportError::EmptyFile`], [`ImportError::MissingColumns`] or a CSV
/// parse error.
pub fn check_csv(content: &[u8]) -> Result<usize, ImportError> {
    let text = String::from_utf8_lossy(content);
    let first_line = text.lines().next().unwrap_or_default();
    if first_line.trim().is_empty() {
        return Err(ImportError::EmptyFile);
    }
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(first_line))
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(clean_header).collect();
    let missing: Vec<&'static str> =
        REQUIRED_COLUMNS.into_iter().filter(|col| !headers.iter().any(|h| h == *col)).collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns(missing));
    }

    let mut rows = 0;
    for record in reader.records() {
        if record?.iter().any(|field| !field.trim().is_empty()) {
            rows += 1;
        }
    }
    Ok(rows)
}

/// Empty import template with one example row, semicolon separated.
///
/// # Errors
///
/// Write failures.
pub fn write_template<W: Write>(mut writer: W) -> Result<(), ImportError> {
    writer.write_all(UTF8_BOM)?;
    let mut csv = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);
    csv.write_record(TEMPLATE_HEADERS)?;
    csv.write_record(TEMPLATE_EXAMPLE)?;
    csv.flush()?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct ImportView {
    pub file_name: Option<String>,
    pub validation: Option<ImportValidation>,
    /// Indices into `validation.new_participants` that will be created.
    pub selected_new: Vec<usize>,
    pub outcome: Option<ImportOutcome>,
    pub error: Option<String>,
}

impl ImportView {
    /// Upload a file for validation. Every new participant starts selected.
    ///
    /// # Errors
    ///
    /// Local format and column rejections (no upload), and backend errors.
    /// Any earlier validation is dropped either way.
    pub async fn validate(
        &mut self,
        backend: &dyn Backend,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<&ImportValidation, ImportError> {
        self.validation = None;
        self.selected_new.clear();
        self.outcome = None;
        let result = async {
            if file_kind(file_name)? == FileKind::Csv {
                let rows = check_csv(&content)?;
                tracing::debug!(file = file_name, rows, "import file passed local checks");
            }
            Ok::<_, ImportError>(backend.validate_import(file_name, content).await?)
        }
        .await;
        match result {
            Ok(validation) => {
                tracing::info!(
                    file = file_name,
                    total = validation.summary.total_rows,
                    valid = validation.summary.valid_imports,
                    new = validation.summary.new_participants,
                    errors = validation.summary.errors,
                    "import validated"
                );
                self.file_name = Some(file_name.to_owned());
                self.error = None;
                self.selected_new = (0..validation.new_participants.len()).collect();
                Ok(&*self.validation.insert(validation))
            }
            Err(err) => {
                tracing::warn!(file = file_name, error = %err, "import validation failed");
                self.error = Some(failure_message(&err, VALIDATE_FAILED_MESSAGE));
                Err(err)
            }
        }
    }

    pub fn toggle(&mut self, index: usize) {
        if let Some(pos) = self.selected_new.iter().position(|&i| i == index) {
            self.selected_new.remove(pos);
        } else if self.validation.as_ref().is_some_and(|v| index < v.new_participants.len()) {
            self.selected_new.push(index);
            self.selected_new.sort_unstable();
        }
    }

    pub fn select_all(&mut self) {
        self.selected_new = (0..self.validation.as_ref().map_or(0, |v| v.new_participants.len())).collect();
    }

    pub fn deselect_all(&mut self) {
        self.selected_new.clear();
    }

    #[must_use]
    pub fn is_selected(&self, index: usize) -> bool {
        self.selected_new.contains(&index)
    }

    /// Rows `execute` would send.
    #[must_use]
    pub fn selection(&self) -> ImportSelection {
        let Some(validation) = &self.validation else {
            return ImportSelection::default();
        };
        let new_participants: Vec<ImportRow> =
            self.selected_new.iter().filter_map(|&i| validation.new_participants.get(i).cloned()).collect();
        ImportSelection { valid_imports: validation.valid_imports.clone(), new_participants }
    }

    /// Number of registrations `execute` would create.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.validation.as_ref().map_or(0, |v| v.valid_imports.len()) + self.selected_new.len()
    }

    /// # Errors
    ///
    /// [`ImportError::NotValidated`] or [`ImportError::NothingSelected`]
    /// without a call, and backend errors. The validation is kept on failure
    /// so the user can retry.
    pub async fn execute(&mut self, backend: &dyn Backend) -> Result<&ImportOutcome, ImportError> {
        let result = async {
            if self.validation.is_none() {
                return Err(ImportError::NotValidated);
            }
            let selection = self.selection();
            if selection.valid_imports.is_empty() && selection.new_participants.is_empty() {
                return Err(ImportError::NothingSelected);
            }
            Ok::<_, ImportError>(backend.execute_import(&selection).await?)
        }
        .await;
        match result {
            Ok(outcome) => {
                tracing::info!(
                    imported = outcome.summary.imported,
                    created = outcome.summary.created_and_imported,
                    errors = outcome.summary.errors,
                    "import executed"
                );
                self.validation = None;
                self.selected_new.clear();
                self.error = None;
                Ok(&*self.outcome.insert(outcome))
            }
            Err(err) => {
                tracing::warn!(error = %err, "import execution failed");
                self.error = Some(failure_message(&err, EXECUTE_FAILED_MESSAGE));
                Err(err)
            }
        }
    }

    /// One line per outcome bucket, empty buckets omitted.
    #[must_use]
    pub fn outcome_lines(&self) -> Vec<String> {
        let Some(outcome) = &self.outcome else {
            return Vec::new();
        };
        let s = &outcome.summary;
        [
            (s.imported, "inscription(s) de participants existants"),
            (s.created_and_imported, "participant(s) créé(s) et inscrit(s)"),
            (s.errors, "erreur(s)"),
        ]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{count} {label}"))
        .collect()
    }
}

/// Local rejections and backend validation messages are shown as they are;
/// transport and server failures fall back to `fallback`.
fn failure_message(err: &ImportError, fallback: &str) -> String {
    match err {
        ImportError::Api(ApiError::Rejected { message, .. }) => message.clone(),
        ImportError::Api(_) | ImportError::Io(_) => fallback.to_owned(),
        other => other.to_string(),
    }
}
