use actix_session::Session;

use crate::errors::AppError;

/// The admin capability is a session flag set at login. Handlers never
/// inspect anything framework-specific beyond this.
pub fn is_admin(session: &Session) -> bool {
    session.get::<bool>("is_admin").unwrap_or(None).unwrap_or(false)
}

/// Guard for admin-only operations.
pub fn require_admin(session: &Session) -> Result<(), AppError> {
    if is_admin(session) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

pub fn grant_admin(session: &Session, username: &str) -> Result<(), AppError> {
    session
        .insert("is_admin", true)
        .and_then(|_| session.insert("username", username))
        .map_err(|e| AppError::Session(e.to_string()))
}

pub fn clear(session: &Session) {
    session.purge();
}
