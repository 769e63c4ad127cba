use actix_session::Session;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{password, rate_limit::RateLimiter, session};
use crate::errors::AppError;
use crate::identity;

/// Admin credentials loaded from the environment at startup. The password
/// is argon2-hashed immediately so the plaintext never lives past boot.
#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password_hash: String,
}

impl AdminCredentials {
    pub fn from_env() -> Self {
        let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let plaintext = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| {
            log::warn!("No ADMIN_PASSWORD set — using default credentials");
            "admin123".to_string()
        });
        let password_hash =
            password::hash_password(&plaintext).expect("Failed to hash admin password");
        Self { username, password_hash }
    }
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// POST /api/v1/auth/login — grants the admin capability for this session.
pub async fn login(
    req: HttpRequest,
    session: Session,
    credentials: web::Data<AdminCredentials>,
    limiter: web::Data<RateLimiter>,
    form: web::Json<LoginForm>,
) -> Result<HttpResponse, AppError> {
    let ip: std::net::IpAddr = identity::client_ip(&req)
        .parse()
        .unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));

    if limiter.is_blocked(ip) {
        return Err(AppError::Session(
            "Too many failed login attempts. Please try again later.".to_string(),
        ));
    }

    let username_ok = form.username == credentials.username;
    let password_ok =
        password::verify_password(&form.password, &credentials.password_hash).unwrap_or(false);

    if !(username_ok && password_ok) {
        limiter.record_failure(ip);
        log::warn!("Failed admin login for '{}' from {ip}", form.username);
        return Err(AppError::Session("Invalid username or password".to_string()));
    }

    limiter.clear(ip);
    session::grant_admin(&session, &form.username)?;
    log::info!("Admin '{}' logged in from {ip}", form.username);

    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

/// POST /api/v1/auth/logout
pub async fn logout(session: Session) -> Result<HttpResponse, AppError> {
    session::clear(&session);
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}
