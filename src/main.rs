use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};

use javarock_polls::auth::rate_limit::RateLimiter;
use javarock_polls::db;
use javarock_polls::handlers::{self, auth_handlers::AdminCredentials};
use javarock_polls::identity::IdentityHasher;
use javarock_polls::webhook::Webhook;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    // Ensure data directory exists
    std::fs::create_dir_all("data").expect("Failed to create data directory");

    // Initialize database
    let database_path =
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| "data/polls.db".to_string());
    let pool = db::init_pool(&database_path);
    db::run_migrations(&pool);

    let credentials = AdminCredentials::from_env();
    let hasher = IdentityHasher::from_env();
    let webhook = Webhook::from_env();
    let limiter = RateLimiter::for_login();

    // Session encryption key — load from SESSION_KEY env var for persistent sessions across restarts
    let secret_key = match std::env::var("SESSION_KEY") {
        Ok(val) if val.len() >= 64 => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(val.as_bytes())
        }
        Ok(val) => {
            log::warn!("SESSION_KEY too short ({} bytes, need 64+) — generating random key", val.len());
            Key::generate()
        }
        Err(_) => {
            log::warn!("No SESSION_KEY set — generating random key (sessions lost on restart)");
            Key::generate()
        }
    };

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    log::info!("Starting poll server at http://{bind_addr}");

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(
            CookieSessionStore::default(),
            secret_key.clone(),
        )
        .cookie_secure(false)
        .cookie_http_only(true)
        .build();

        App::new()
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(credentials.clone()))
            .app_data(web::Data::new(hasher.clone()))
            .app_data(web::Data::new(webhook.clone()))
            .app_data(web::Data::new(limiter.clone()))
            .configure(handlers::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
