use actix_web::{HttpResponse, ResponseError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Db(rusqlite::Error),
    Pool(r2d2::Error),
    /// Bad input or invalid configuration (ambiguous defaults, blank reject
    /// reason, missing recipient).
    Validation(String),
    /// Missing row: no workflow status for the order, unknown stage, etc.
    NotFound(String),
    /// The current stage has no configured destination for the requested
    /// action. Callers treat this as "terminal", not as a server fault.
    NoNextStage(String),
    /// Optimistic-concurrency failure: another transition won the race.
    Conflict(String),
    TemplateNotFound(String),
    /// Messaging provider disabled or missing from the settings store.
    NotConfigured(String),
    /// Outbound delivery failure reported by the messaging gateway.
    Gateway(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Pool(e) => write!(f, "Pool error: {e}"),
            AppError::Validation(msg) => write!(f, "Validation error: {msg}"),
            AppError::NotFound(msg) => write!(f, "Not found: {msg}"),
            AppError::NoNextStage(msg) => write!(f, "No next stage: {msg}"),
            AppError::Conflict(msg) => write!(f, "Conflict: {msg}"),
            AppError::TemplateNotFound(code) => write!(f, "Notification template not found: {code}"),
            AppError::NotConfigured(msg) => write!(f, "Not configured: {msg}"),
            AppError::Gateway(msg) => write!(f, "Gateway error: {msg}"),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = |msg: &str| serde_json::json!({ "error": msg });
        match self {
            AppError::NotFound(msg) => HttpResponse::NotFound().json(body(msg)),
            AppError::Validation(msg) => HttpResponse::BadRequest().json(body(msg)),
            AppError::NoNextStage(msg) | AppError::Conflict(msg) => {
                HttpResponse::Conflict().json(body(msg))
            }
            _ => {
                log::error!("{self}");
                HttpResponse::InternalServerError()
                    .json(serde_json::json!({ "error": "Internal Server Error" }))
            }
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Db(e)
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        AppError::Pool(e)
    }
}
