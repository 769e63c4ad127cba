use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::AppError;
use crate::identity::VoterIdentity;
use super::types::*;

/// Polls must offer between 2 and 10 answer options.
const MIN_ANSWERS: usize = 2;
const MAX_ANSWERS: usize = 10;

fn load_options(conn: &Connection, poll_id: i64) -> Result<Vec<PollOption>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT label, votes FROM poll_options WHERE poll_id = ?1 ORDER BY option_index",
    )?;
    let options = stmt
        .query_map(params![poll_id], |row| {
            Ok(PollOption {
                label: row.get("label")?,
                votes: row.get("votes")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(options)
}

struct PollRow {
    id: i64,
    question: String,
    visible: bool,
    until: Option<String>,
    ended_at: Option<String>,
    created_at: String,
    updated_at: String,
}

fn row_to_poll_row(row: &rusqlite::Row) -> rusqlite::Result<PollRow> {
    Ok(PollRow {
        id: row.get("id")?,
        question: row.get("question")?,
        visible: row.get::<_, i64>("visible")? != 0,
        until: row.get("until")?,
        ended_at: row.get("ended_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn assemble(conn: &Connection, row: PollRow) -> Result<Poll, AppError> {
    let options = load_options(conn, row.id)?;
    Ok(Poll {
        id: row.id,
        question: row.question,
        options,
        visible: row.visible,
        until: row.until,
        ended_at: row.ended_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn validate_new_poll(new: &NewPoll) -> Result<(), AppError> {
    if new.question.trim().is_empty() {
        return Err(AppError::Validation("Question is required".to_string()));
    }
    let count = new.answers.len();
    if !(MIN_ANSWERS..=MAX_ANSWERS).contains(&count) {
        return Err(AppError::Validation(format!(
            "Poll must have between {MIN_ANSWERS} and {MAX_ANSWERS} answers, got {count}"
        )));
    }
    if new.answers.iter().any(|a| a.trim().is_empty()) {
        return Err(AppError::Validation("Answer labels must not be empty".to_string()));
    }
    if let Some(until) = new.until {
        if until <= Utc::now() {
            return Err(AppError::Validation("Poll deadline must be in the future".to_string()));
        }
    }
    Ok(())
}

/// Create a poll with zeroed tallies. Polls start invisible; an admin
/// publishes them with `set_visibility`.
pub fn create_poll(conn: &mut Connection, new: &NewPoll) -> Result<Poll, AppError> {
    validate_new_poll(new)?;

    let now = now_string();
    let until = new.until.map(format_timestamp);

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO polls (question, visible, until, ended_at, created_at, updated_at) \
         VALUES (?1, 0, ?2, NULL, ?3, ?3)",
        params![new.question.trim(), until, now],
    )?;
    let poll_id = tx.last_insert_rowid();

    for (index, label) in new.answers.iter().enumerate() {
        tx.execute(
            "INSERT INTO poll_options (poll_id, option_index, label, votes) \
             VALUES (?1, ?2, ?3, 0)",
            params![poll_id, index as i64, label.trim()],
        )?;
    }
    tx.commit()?;

    log::info!("Created poll {poll_id}: {}", new.question.trim());
    find_by_id(conn, poll_id)?.ok_or(AppError::NotFound)
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Poll>, AppError> {
    let row = conn
        .query_row(
            "SELECT id, question, visible, until, ended_at, created_at, updated_at \
             FROM polls WHERE id = ?1",
            params![id],
            row_to_poll_row,
        )
        .optional()?;
    match row {
        Some(row) => Ok(Some(assemble(conn, row)?)),
        None => Ok(None),
    }
}

/// All polls newest-created-first. Non-admin callers only see published ones.
pub fn find_all(conn: &Connection, include_hidden: bool) -> Result<Vec<Poll>, AppError> {
    let sql = if include_hidden {
        "SELECT id, question, visible, until, ended_at, created_at, updated_at \
         FROM polls ORDER BY created_at DESC, id DESC"
    } else {
        "SELECT id, question, visible, until, ended_at, created_at, updated_at \
         FROM polls WHERE visible = 1 ORDER BY created_at DESC, id DESC"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([], row_to_poll_row)?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(|row| assemble(conn, row)).collect()
}

pub fn set_visibility(conn: &Connection, id: i64, visible: bool) -> Result<Poll, AppError> {
    let changed = conn.execute(
        "UPDATE polls SET visible = ?1, updated_at = ?2 WHERE id = ?3",
        params![visible as i64, now_string(), id],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound);
    }
    find_by_id(conn, id)?.ok_or(AppError::NotFound)
}

/// Transition a poll to ended: `ended_at` set, visibility forced off.
///
/// This is the single transition used by both the explicit admin path and
/// the lazy-expiry path in `vote`. Ending an already-ended poll is a no-op
/// returning the poll unchanged, so repeated admin clicks and racing expiry
/// checks cannot move `ended_at` or re-notify.
pub fn end_poll(conn: &Connection, id: i64) -> Result<Poll, AppError> {
    let poll = find_by_id(conn, id)?.ok_or(AppError::NotFound)?;
    if poll.is_ended() {
        return Ok(poll);
    }

    conn.execute(
        "UPDATE polls SET ended_at = ?1, visible = 0, updated_at = ?1 WHERE id = ?2",
        params![now_string(), id],
    )?;
    log::info!("Ended poll {id} with {} votes", poll.total_votes());
    find_by_id(conn, id)?.ok_or(AppError::NotFound)
}

/// Delete a poll and its vote records in one transaction.
/// Returns the deleted poll (final tallies included) for notification.
pub fn delete_poll(conn: &mut Connection, id: i64) -> Result<Poll, AppError> {
    let poll = find_by_id(conn, id)?.ok_or(AppError::NotFound)?;

    let tx = conn.transaction()?;
    tx.execute("DELETE FROM poll_votes WHERE poll_id = ?1", params![id])?;
    tx.execute("DELETE FROM poll_options WHERE poll_id = ?1", params![id])?;
    tx.execute("DELETE FROM polls WHERE id = ?1", params![id])?;
    tx.commit()?;

    log::info!("Deleted poll {id}: {}", poll.question);
    Ok(poll)
}

/// Whether a vote record exists for this poll matching the identity on
/// either dimension (IP hash or fingerprint hash). Pure read; an unknown
/// poll id simply has no records.
pub fn has_voted(conn: &Connection, poll_id: i64, identity: &VoterIdentity) -> Result<bool, AppError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM poll_votes \
         WHERE poll_id = ?1 AND (ip_hash = ?2 OR fingerprint_hash = ?3)",
        params![poll_id, identity.ip_hash, identity.fingerprint_hash],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Record a vote. Preconditions are checked in order (unknown poll, bad
/// option index, ended, expired, duplicate identity), then the vote record
/// insert and the tally increment commit in one transaction.
///
/// A poll past its deadline is ended here before the call fails with
/// `PollExpired` — expiry is enforced at vote time, not by a scheduler.
///
/// The UNIQUE constraints on poll_votes back up the duplicate pre-check:
/// if two requests from the same identity race past `has_voted`, the
/// second insert fails and is reported as `AlreadyVoted`, never as a
/// double count.
pub fn vote(
    conn: &mut Connection,
    poll_id: i64,
    option_index: usize,
    identity: &VoterIdentity,
) -> Result<Poll, AppError> {
    let poll = find_by_id(conn, poll_id)?.ok_or(AppError::NotFound)?;

    if option_index >= poll.options.len() {
        return Err(AppError::InvalidOption);
    }
    if poll.is_ended() {
        return Err(AppError::PollEnded);
    }
    if poll.is_expired(Utc::now()) {
        end_poll(conn, poll_id)?;
        return Err(AppError::PollExpired);
    }
    if has_voted(conn, poll_id, identity)? {
        return Err(AppError::AlreadyVoted);
    }

    let now = now_string();
    let tx = conn.transaction()?;
    if let Err(e) = tx.execute(
        "INSERT INTO poll_votes (poll_id, ip_hash, fingerprint_hash, voted_option, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![poll_id, identity.ip_hash, identity.fingerprint_hash, option_index as i64, now],
    ) {
        if is_unique_violation(&e) {
            return Err(AppError::AlreadyVoted);
        }
        return Err(e.into());
    }
    // Increment in SQL so concurrent votes never lose updates.
    tx.execute(
        "UPDATE poll_options SET votes = votes + 1 WHERE poll_id = ?1 AND option_index = ?2",
        params![poll_id, option_index as i64],
    )?;
    tx.execute(
        "UPDATE polls SET updated_at = ?1 WHERE id = ?2",
        params![now, poll_id],
    )?;
    tx.commit()?;

    find_by_id(conn, poll_id)?.ok_or(AppError::NotFound)
}
