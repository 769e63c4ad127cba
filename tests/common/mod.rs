//! Shared test infrastructure for the poll engine tests.
#![allow(dead_code)]

use rusqlite::Connection;
use tempfile::TempDir;

use javarock_polls::db::{self, DbPool, MIGRATIONS};
use javarock_polls::identity::{IdentityHasher, VoterIdentity};
use javarock_polls::models::poll::NewPoll;

/// Open a temporary SQLite database with the schema applied.
///
/// Returns (TempDir, Connection); the TempDir must be kept alive for the
/// Connection to remain valid.
pub fn setup_test_db() -> (TempDir, Connection) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");
    let conn = Connection::open(&db_path).expect("Failed to open test DB");

    conn.execute_batch("PRAGMA foreign_keys=ON; PRAGMA journal_mode=WAL;")
        .expect("Failed to set pragmas");
    conn.execute_batch(MIGRATIONS)
        .expect("Failed to run migrations");

    (dir, conn)
}

/// Pooled variant for handler-level tests.
pub fn setup_test_pool() -> (TempDir, DbPool) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");
    let pool = db::init_pool(db_path.to_str().expect("utf8 path"));
    db::run_migrations(&pool);
    (dir, pool)
}

pub fn test_hasher() -> IdentityHasher {
    IdentityHasher::new("test-pepper")
}

/// An identity pair for a named voter: IP and fingerprint both derived
/// from the suffix, so distinct suffixes never collide.
pub fn voter(suffix: &str) -> VoterIdentity {
    test_hasher().identity(&format!("10.0.0.{suffix}"), &format!("fp-{suffix}"))
}

pub fn new_poll(question: &str, answers: &[&str]) -> NewPoll {
    NewPoll {
        question: question.to_string(),
        answers: answers.iter().map(|s| s.to_string()).collect(),
        until: None,
    }
}
