//! Error rendering for the HTTP layer. Every failure becomes `{"slug": ...}`.

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::json;
use validator::ValidationErrors;

use tally_models::error::{slugs, AppError, ErrorKind};

#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Authorization => StatusCode::UNAUTHORIZED,
            ErrorKind::IncorrectInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.0.kind() == ErrorKind::Unknown {
            tracing::error!(slug = self.0.slug(), error = %self.0, "Request failed");
        }

        HttpResponse::build(self.status_code()).json(json!({ "slug": self.0.slug() }))
    }
}

/// Field, slug when the value is empty, slug when it is present but breaks
/// its rule. Checked in this order; the first failing field wins.
const FIELD_SLUGS: [(&str, &str, &str); 5] = [
    ("email", slugs::FIELD_EMAIL_REQUIRED, slugs::FIELD_EMAIL_INVALID),
    ("password", slugs::FIELD_PASSWORD_REQUIRED, slugs::FIELD_PASSWORD_INVALID_LENGTH),
    ("name", slugs::FIELD_NAME_REQUIRED, slugs::FIELD_NAME_INVALID_LENGTH),
    ("refresh", slugs::INVALID_TOKEN, slugs::INVALID_TOKEN),
    ("currency", slugs::FIELD_CURRENCY_REQUIRED, slugs::FIELD_CURRENCY_REQUIRED),
];

pub fn validation_error(errors: &ValidationErrors) -> ApiError {
    let field_errors = errors.field_errors();

    for (field, required, invalid) in FIELD_SLUGS {
        let Some(failures) = field_errors.get(field) else {
            continue;
        };

        let empty = failures
            .iter()
            .any(|failure| failure.params.get("value").and_then(|v| v.as_str()) == Some(""));

        let slug = if empty { required } else { invalid };
        return AppError::incorrect_input(format!("{field} failed validation"), slug).into();
    }

    AppError::incorrect_input(errors.to_string(), slugs::INVALID_INPUT).into()
}

/// Unparseable bodies are rejected with `invalid-input`.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        tracing::debug!(error = %err, "Rejected request body");
        ApiError::from(AppError::incorrect_input(err.to_string(), slugs::INVALID_INPUT)).into()
    })
}
