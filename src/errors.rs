use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Db(rusqlite::Error),
    Pool(r2d2::Error),
    Validation(String),
    Session(String),
    PermissionDenied,
    NotFound,
    InvalidOption,
    PollEnded,
    PollExpired,
    AlreadyVoted,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Pool(e) => write!(f, "Pool error: {e}"),
            AppError::Validation(msg) => write!(f, "{msg}"),
            AppError::Session(msg) => write!(f, "Session error: {msg}"),
            AppError::PermissionDenied => write!(f, "Permission denied"),
            AppError::NotFound => write!(f, "Poll not found"),
            AppError::InvalidOption => write!(f, "Invalid option"),
            AppError::PollEnded => write!(f, "This poll has ended"),
            AppError::PollExpired => write!(f, "This poll has expired"),
            AppError::AlreadyVoted => write!(f, "You can only vote once on each poll"),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = json!({ "error": self.to_string() });
        match self {
            AppError::NotFound => HttpResponse::NotFound().json(body),
            AppError::Validation(_) | AppError::InvalidOption => {
                HttpResponse::BadRequest().json(body)
            }
            AppError::PollEnded | AppError::PollExpired | AppError::AlreadyVoted => {
                HttpResponse::Conflict().json(body)
            }
            AppError::Session(_) => HttpResponse::Unauthorized().json(body),
            AppError::PermissionDenied => HttpResponse::Forbidden().json(body),
            AppError::Db(_) | AppError::Pool(_) => {
                log::error!("{self}");
                HttpResponse::InternalServerError().json(json!({ "error": "Internal Server Error" }))
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
