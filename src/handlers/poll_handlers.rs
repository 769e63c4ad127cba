use actix_session::Session;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::session;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::identity::{client_ip, IdentityHasher};
use crate::models::poll;
use crate::models::poll::{NewPoll, Poll};
use crate::webhook::Webhook;

/// Poll as exposed on the wire: answers and tallies as parallel arrays in
/// option order, matching what the site's UI consumes.
#[derive(Debug, Serialize)]
pub struct ApiPoll {
    pub id: i64,
    pub question: String,
    pub answers: Vec<String>,
    pub votes: Vec<i64>,
    pub total_votes: i64,
    pub visible: bool,
    pub until: Option<String>,
    pub ended_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Poll> for ApiPoll {
    fn from(poll: Poll) -> Self {
        ApiPoll {
            id: poll.id,
            question: poll.question.clone(),
            answers: poll.answers(),
            votes: poll.votes(),
            total_votes: poll.total_votes(),
            visible: poll.visible,
            until: poll.until,
            ended_at: poll.ended_at,
            created_at: poll.created_at,
            updated_at: poll.updated_at,
        }
    }
}

/// GET /api/v1/polls — newest first. Unpublished polls only for admins.
pub async fn list(pool: web::Data<DbPool>, session: Session) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let polls = poll::find_all(&conn, session::is_admin(&session))?;
    let items: Vec<ApiPoll> = polls.into_iter().map(ApiPoll::from).collect();
    Ok(HttpResponse::Ok().json(items))
}

/// POST /api/v1/polls — admin only.
pub async fn create(
    pool: web::Data<DbPool>,
    session: Session,
    webhook: web::Data<Webhook>,
    body: web::Json<NewPoll>,
) -> Result<HttpResponse, AppError> {
    session::require_admin(&session)?;

    let mut conn = pool.get()?;
    let created = poll::create_poll(&mut conn, &body)?;
    webhook.poll_created(&created);

    Ok(HttpResponse::Created().json(ApiPoll::from(created)))
}

#[derive(Deserialize)]
pub struct VisibilityForm {
    pub visible: bool,
}

/// POST /api/v1/polls/{id}/visibility — admin only.
pub async fn set_visibility(
    pool: web::Data<DbPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<VisibilityForm>,
) -> Result<HttpResponse, AppError> {
    session::require_admin(&session)?;

    let conn = pool.get()?;
    let updated = poll::set_visibility(&conn, path.into_inner(), body.visible)?;
    Ok(HttpResponse::Ok().json(ApiPoll::from(updated)))
}

/// POST /api/v1/polls/{id}/end — admin only. Idempotent: ending an
/// already-ended poll changes nothing and sends no second notification.
pub async fn end(
    pool: web::Data<DbPool>,
    session: Session,
    webhook: web::Data<Webhook>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    session::require_admin(&session)?;

    let id = path.into_inner();
    let conn = pool.get()?;
    let was_ended = poll::find_by_id(&conn, id)?
        .ok_or(AppError::NotFound)?
        .is_ended();
    let ended = poll::end_poll(&conn, id)?;
    if !was_ended {
        webhook.poll_ended(&ended);
    }

    Ok(HttpResponse::Ok().json(ApiPoll::from(ended)))
}

/// DELETE /api/v1/polls/{id} — admin only. Removes the poll and its vote
/// records in one transaction and returns the deleted record.
pub async fn delete(
    pool: web::Data<DbPool>,
    session: Session,
    webhook: web::Data<Webhook>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    session::require_admin(&session)?;

    let mut conn = pool.get()?;
    let deleted = poll::delete_poll(&mut conn, path.into_inner())?;
    webhook.poll_deleted(&deleted);

    Ok(HttpResponse::Ok().json(ApiPoll::from(deleted)))
}

#[derive(Deserialize)]
pub struct VotedQuery {
    pub fingerprint: String,
}

/// GET /api/v1/polls/{id}/voted?fingerprint=… — whether this identity has
/// already voted. The IP comes from the request, never from the caller.
pub async fn voted(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    hasher: web::Data<IdentityHasher>,
    path: web::Path<i64>,
    query: web::Query<VotedQuery>,
) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let identity = hasher.identity(&client_ip(&req), &query.fingerprint);
    let voted = poll::has_voted(&conn, path.into_inner(), &identity)?;
    Ok(HttpResponse::Ok().json(json!({ "voted": voted })))
}

#[derive(Deserialize)]
pub struct VoteForm {
    pub option_index: usize,
    pub fingerprint: String,
}

/// POST /api/v1/polls/{id}/vote
pub async fn vote(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    hasher: web::Data<IdentityHasher>,
    webhook: web::Data<Webhook>,
    path: web::Path<i64>,
    body: web::Json<VoteForm>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let mut conn = pool.get()?;
    let identity = hasher.identity(&client_ip(&req), &body.fingerprint);

    match poll::vote(&mut conn, id, body.option_index, &identity) {
        Ok(updated) => {
            webhook.vote_received(&updated, body.option_index);
            Ok(HttpResponse::Ok().json(ApiPoll::from(updated)))
        }
        // The vote call just performed the lazy expiry transition; announce
        // the ended poll before surfacing the error.
        Err(AppError::PollExpired) => {
            if let Some(ended) = poll::find_by_id(&conn, id)? {
                webhook.poll_ended(&ended);
            }
            Err(AppError::PollExpired)
        }
        Err(e) => Err(e),
    }
}
