pub mod auth_handlers;
pub mod poll_handlers;

use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web,
};

/// CSRF protection for the mutation endpoints.
///
/// Rejects POST/DELETE requests that don't have Content-Type: application/json.
/// Browsers cannot send cross-origin JSON with cookies via simple form POST,
/// so the Content-Type check acts as a CSRF guard without requiring tokens.
/// GET requests are exempt (read-only, no state changes).
async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let method = req.method().clone();

    if method == actix_web::http::Method::POST || method == actix_web::http::Method::DELETE {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("application/json") {
            let body = serde_json::json!({
                "error": "Content-Type must be application/json for mutation requests"
            });
            let response = HttpResponse::BadRequest().json(body);
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Configure API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(
                web::scope("/auth")
                    .wrap(actix_web::middleware::from_fn(require_json_content_type))
                    .route("/login", web::post().to(auth_handlers::login))
                    .route("/logout", web::post().to(auth_handlers::logout)),
            )
            .service(
                web::scope("/polls")
                    .wrap(actix_web::middleware::from_fn(require_json_content_type))
                    .route("", web::get().to(poll_handlers::list))
                    .route("", web::post().to(poll_handlers::create))
                    .route("/{id}", web::delete().to(poll_handlers::delete))
                    .route("/{id}/visibility", web::post().to(poll_handlers::set_visibility))
                    .route("/{id}/end", web::post().to(poll_handlers::end))
                    .route("/{id}/voted", web::get().to(poll_handlers::voted))
                    .route("/{id}/vote", web::post().to(poll_handlers::vote)),
            ),
    );
}
