//! Backend error classification and the user-facing text derived from it.
//!
//! ERROR HANDLING
//! ==============
//! `from_response` turns a non-success status plus raw body into a variant;
//! `user_message` is what a notice shows. The backend speaks Django REST
//! Framework: either `{"error": ".."}` / `{"detail": ".."}` or a map of
//! field name to message list.

use serde_json::Value;

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

pub const GENERIC_MESSAGE: &str = "Une erreur est survenue lors de la requête";
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expirée. Veuillez vous reconnecter.";
pub const PERMISSION_DENIED_MESSAGE: &str =
    "Permission refusée : vous n'avez pas les droits pour effectuer cette action.";
pub const NOT_FOUND_MESSAGE: &str = "Cet élément n'existe plus dans le système. Actualisez la page.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, connect, timeout).
    #[error("request failed: {0}")]
    Transport(String),

    /// A success response whose body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    #[error("session expired (401)")]
    SessionExpired,

    #[error("permission denied (403)")]
    PermissionDenied { detail: Option<String> },

    #[error("not found (404)")]
    NotFound { detail: Option<String> },

    /// 409 from an assignment rule; resubmitting with `force` overrides it
    /// when `requires_confirmation` is set.
    #[error("conflict (409): {message}")]
    Conflict { message: String, requires_confirmation: bool },

    /// Field-level validation errors, in backend order.
    #[error("validation failed: {}", format_fields(fields))]
    Validation { fields: Vec<FieldError> },

    /// Any other 4xx carrying a plain message.
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("server error ({status})")]
    Server { status: u16, detail: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub messages: Vec<String>,
}

impl ApiError {
    /// Classify a non-success response.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let json = serde_json::from_str::<Value>(body).ok();
        let detail = json.as_ref().and_then(message_field);

        match status {
            401 => Self::SessionExpired,
            403 => Self::PermissionDenied { detail },
            404 => Self::NotFound { detail },
            409 => Self::Conflict {
                message: detail.unwrap_or_else(|| GENERIC_MESSAGE.to_owned()),
                requires_confirmation: json
                    .as_ref()
                    .and_then(|v| v.get("requires_confirmation"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            },
            400..=499 => {
                if let Some(message) = detail {
                    return Self::Rejected { status, message };
                }
                let fields = json.as_ref().map(field_errors).unwrap_or_default();
                if !fields.is_empty() {
                    return Self::Validation { fields };
                }
                let text = body.trim();
                let message = if text.is_empty() || json.is_some() { GENERIC_MESSAGE } else { text };
                Self::Rejected { status, message: message.to_owned() }
            }
            _ if status >= 500 => Self::Server { status, detail },
            _ => Self::Rejected { status, message: detail.unwrap_or_else(|| GENERIC_MESSAGE.to_owned()) },
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::SessionExpired => Some(401),
            Self::PermissionDenied { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Conflict { .. } => Some(409),
            Self::Rejected { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::Validation { .. } => Some(400),
            Self::Transport(_) | Self::Decode(_) | Self::HttpClientBuild(_) => None,
        }
    }

    #[must_use]
    pub fn requires_confirmation(&self) -> bool {
        matches!(self, Self::Conflict { requires_confirmation: true, .. })
    }

    /// Text for an error notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::SessionExpired => SESSION_EXPIRED_MESSAGE.to_owned(),
            Self::PermissionDenied { .. } => PERMISSION_DENIED_MESSAGE.to_owned(),
            Self::NotFound { .. } => NOT_FOUND_MESSAGE.to_owned(),
            Self::Conflict { message, .. } | Self::Rejected { message, .. } => message.clone(),
            Self::Validation { fields } => format_fields(fields),
            Self::Server { detail, .. } => detail.clone().unwrap_or_else(|| GENERIC_MESSAGE.to_owned()),
            Self::Transport(_) | Self::Decode(_) | Self::HttpClientBuild(_) => GENERIC_MESSAGE.to_owned(),
        }
    }
}

/// French label for a backend field name; unknown fields pass through.
#[must_use]
pub fn field_label(field: &str) -> &str {
    match field {
        "email" => "Email",
        "age" => "Âge",
        "firstName" | "first_name" => "Prénom",
        "lastName" | "last_name" | "name" => "Nom",
        "gender" => "Sexe",
        "status" => "Statut",
        "language" => "Langue",
        "nationality" => "Nationalité",
        "startDate" | "start_date" => "Date de début",
        "endDate" | "end_date" => "Date de fin",
        "capacity" => "Capacité",
        "bed" => "Lit",
        "bungalowId" | "bungalow_id" => "Bungalow",
        "non_field_errors" => "Erreur",
        other => other,
    }
}

fn format_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{}: {}", field_label(&f.field), f.messages.join(", ")))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn message_field(json: &Value) -> Option<String> {
    ["error", "detail", "message"]
        .into_iter()
        .find_map(|key| json.get(key).and_then(Value::as_str))
        .map(str::to_owned)
}

fn field_errors(json: &Value) -> Vec<FieldError> {
    let Some(object) = json.as_object() else {
        return Vec::new();
    };
    object
        .iter()
        .filter_map(|(field, value)| {
            let messages = match value {
                Value::String(text) => vec![text.clone()],
                Value::Array(items) => items.iter().filter_map(Value::as_str).map(str::to_owned).collect(),
                _ => return None,
            };
            (!messages.is_empty()).then(|| FieldError { field: field.clone(), messages })
        })
        .collect()
}
